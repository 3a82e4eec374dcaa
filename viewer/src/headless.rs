use crate::session::{Session, SessionStats};
use crate::{Result, ViewerError};
use histeq_videoio::backends::PngSequenceWriter;
use histeq_videoio::VideoWriter;
use std::path::PathBuf;

#[derive(Debug, Clone, Default)]
pub struct HeadlessOptions {
    /// Where to write `frame_*.png` and `hist_*.png`; nothing is written when unset.
    pub output_dir: Option<PathBuf>,
    pub max_frames: Option<u64>,
    /// Sleep between frames to match the source rate.
    pub pace: bool,
}

/// Drives `session` without a window until the source ends or `max_frames`
/// frames have been processed.
pub fn run_headless(mut session: Session, options: &HeadlessOptions) -> Result<SessionStats> {
    if session.config().loop_playback && options.max_frames.is_none() {
        return Err(ViewerError::InvalidOptions(
            "looping playback needs a frame limit when running headless".into(),
        ));
    }

    let mut writers = match &options.output_dir {
        Some(dir) => Some((
            PngSequenceWriter::new(dir, "frame")?,
            PngSequenceWriter::new(dir, "hist")?,
        )),
        None => None,
    };

    while options.max_frames.map_or(true, |max| session.stats().frames < max) {
        let Some(frame) = session.next_frame()? else {
            break;
        };

        if let Some((frame_writer, hist_writer)) = writers.as_mut() {
            frame_writer.write(&frame.image)?;
            hist_writer.write(&frame.histogram)?;
        }

        if options.pace {
            std::thread::sleep(session.wait_after(&frame));
        }
    }

    Ok(session.finish())
}
