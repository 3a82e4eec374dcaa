use crate::Result;
use histeq_imgproc::{equalize_histogram, render_histogram};
use histeq_videoio::{VideoCapture, VideoError};
use image::GrayImage;
use std::fmt;
use std::time::{Duration, Instant};

/// Playback rate used when the source does not report one.
pub const DEFAULT_FPS: f64 = 30.0;

/// Shortest wait between frames, so input is still polled on slow frames.
pub const MIN_FRAME_WAIT: Duration = Duration::from_millis(1);

pub const DEFAULT_CANVAS_WIDTH: u32 = 1024;
pub const DEFAULT_CANVAS_HEIGHT: u32 = 512;

/// Per-frame processing parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingConfig {
    pub canvas_width: u32,
    pub canvas_height: u32,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            canvas_width: DEFAULT_CANVAS_WIDTH,
            canvas_height: DEFAULT_CANVAS_HEIGHT,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub processing: ProcessingConfig,
    /// Initial state of the equalization toggle.
    pub equalize: bool,
    /// Rewind the source at end of stream instead of stopping.
    pub loop_playback: bool,
    pub fallback_fps: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            processing: ProcessingConfig::default(),
            equalize: false,
            loop_playback: true,
            fallback_fps: DEFAULT_FPS,
        }
    }
}

/// Result of running one frame through the pipeline.
#[derive(Debug, Clone)]
pub struct ProcessedFrame {
    /// Equalized frame, or the input frame when equalization is off.
    pub image: GrayImage,
    /// Histogram of `image` drawn on a black canvas.
    pub histogram: GrayImage,
    pub equalized: bool,
    pub equalization_time: Option<Duration>,
    pub processing_time: Duration,
}

/// Runs one grayscale frame through equalization (when `equalize` is set)
/// and histogram rendering.
pub fn process_frame(frame: GrayImage, config: &ProcessingConfig, equalize: bool) -> Result<ProcessedFrame> {
    let started = Instant::now();

    let (image, equalization_time) = if equalize {
        let eq_started = Instant::now();
        let out = equalize_histogram(&frame)?;
        (out, Some(eq_started.elapsed()))
    } else {
        (frame, None)
    };

    let histogram = render_histogram(&image, config.canvas_width, config.canvas_height)?;

    Ok(ProcessedFrame {
        image,
        histogram,
        equalized: equalize,
        equalization_time,
        processing_time: started.elapsed(),
    })
}

/// User commands understood by the frame loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ToggleEqualization,
    Quit,
}

impl Command {
    /// `e` toggles equalization, `q` quits.
    pub fn from_key(key: char) -> Option<Self> {
        match key.to_ascii_lowercase() {
            'e' => Some(Command::ToggleEqualization),
            'q' => Some(Command::Quit),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

/// Mutable loop state, owned by the session rather than the caller's stack.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionState {
    pub equalize: bool,
}

impl SessionState {
    pub fn apply(&mut self, command: Command) -> Control {
        match command {
            Command::ToggleEqualization => {
                self.equalize = !self.equalize;
                tracing::info!("equalization: {}", if self.equalize { "on" } else { "off" });
                Control::Continue
            }
            Command::Quit => Control::Quit,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames: u64,
    pub equalized_frames: u64,
    pub equalization_time: Duration,
    pub processing_time: Duration,
}

impl SessionStats {
    pub fn record(&mut self, frame: &ProcessedFrame) {
        self.frames += 1;
        self.processing_time += frame.processing_time;
        if let Some(t) = frame.equalization_time {
            self.equalized_frames += 1;
            self.equalization_time += t;
        }
    }

    /// `None` until at least one frame has been equalized.
    pub fn mean_equalization_time(&self) -> Option<Duration> {
        u32::try_from(self.equalized_frames)
            .ok()
            .filter(|&n| n > 0)
            .map(|n| self.equalization_time / n)
    }

    pub fn mean_processing_time(&self) -> Option<Duration> {
        u32::try_from(self.frames)
            .ok()
            .filter(|&n| n > 0)
            .map(|n| self.processing_time / n)
    }

    pub fn log_summary(&self) {
        match self.mean_equalization_time() {
            Some(mean) => tracing::info!(
                frames = self.frames,
                equalized_frames = self.equalized_frames,
                "mean equalization time: {:.3} ms",
                mean.as_secs_f64() * 1000.0
            ),
            None => tracing::info!(frames = self.frames, "no frames were equalized"),
        }
    }
}

/// One-line end-of-session report.
impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "processed {} frames, ", self.frames)?;
        match self.mean_equalization_time() {
            Some(mean) => write!(f, "mean equalization time: {:.3} ms", mean.as_secs_f64() * 1000.0),
            None => write!(f, "no frames were equalized"),
        }
    }
}

/// Time between frames for a given rate; invalid rates fall back to `fallback`.
pub fn frame_delay(fps: Option<f64>, fallback: f64) -> Duration {
    let fps = fps
        .filter(|f| f.is_finite() && *f > 0.0)
        .unwrap_or(fallback);
    if fps.is_finite() && fps > 0.0 {
        Duration::from_secs_f64(1.0 / fps)
    } else {
        Duration::from_secs_f64(1.0 / DEFAULT_FPS)
    }
}

/// How long to wait before the next frame: the remainder of the frame
/// delay after processing, but never less than [`MIN_FRAME_WAIT`].
pub fn frame_wait(delay: Duration, elapsed: Duration) -> Duration {
    delay.saturating_sub(elapsed).max(MIN_FRAME_WAIT)
}

/// A capture source plus everything the frame loop needs to carry between
/// frames.
#[derive(Debug)]
pub struct Session {
    capture: Box<dyn VideoCapture>,
    config: SessionConfig,
    state: SessionState,
    stats: SessionStats,
    frame_delay: Duration,
}

impl Session {
    pub fn new(capture: Box<dyn VideoCapture>, config: SessionConfig) -> Self {
        let frame_delay = frame_delay(capture.fps(), config.fallback_fps);
        tracing::info!(
            fps = 1.0 / frame_delay.as_secs_f64(),
            equalize = config.equalize,
            loop_playback = config.loop_playback,
            "session started"
        );
        Self {
            capture,
            state: SessionState {
                equalize: config.equalize,
            },
            config,
            stats: SessionStats::default(),
            frame_delay,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn frame_delay(&self) -> Duration {
        self.frame_delay
    }

    pub fn handle(&mut self, command: Command) -> Control {
        self.state.apply(command)
    }

    /// Reads, processes and records the next frame. Returns `None` once the
    /// source is exhausted and looping is off.
    pub fn next_frame(&mut self) -> Result<Option<ProcessedFrame>> {
        let started = Instant::now();
        let Some(frame) = self.read_frame()? else {
            return Ok(None);
        };

        let mut processed = process_frame(frame, &self.config.processing, self.state.equalize)?;
        processed.processing_time = started.elapsed();
        self.stats.record(&processed);

        tracing::debug!(
            frame = self.stats.frames,
            equalized = processed.equalized,
            "processing time of one frame: {:.3} ms",
            processed.processing_time.as_secs_f64() * 1000.0
        );
        Ok(Some(processed))
    }

    /// Wait before the next frame, given how long `frame` took.
    pub fn wait_after(&self, frame: &ProcessedFrame) -> Duration {
        frame_wait(self.frame_delay, frame.processing_time)
    }

    pub fn finish(self) -> SessionStats {
        self.stats.log_summary();
        self.stats
    }

    fn read_frame(&mut self) -> Result<Option<GrayImage>> {
        match self.capture.read() {
            Ok(frame) => Ok(Some(frame)),
            Err(VideoError::EndOfStream) if self.config.loop_playback => {
                tracing::info!("end of stream, restarting playback");
                self.capture.rewind()?;
                match self.capture.read() {
                    Ok(frame) => Ok(Some(frame)),
                    Err(VideoError::EndOfStream) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            }
            Err(VideoError::EndOfStream) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[derive(Debug)]
    struct ScriptedCapture {
        frames: Vec<GrayImage>,
        idx: usize,
        fps: Option<f64>,
    }

    impl ScriptedCapture {
        fn boxed(values: &[u8], fps: Option<f64>) -> Box<dyn VideoCapture> {
            let frames = values
                .iter()
                .map(|&v| {
                    let mut img = GrayImage::from_pixel(8, 8, Luma([v]));
                    img.put_pixel(0, 0, Luma([v.wrapping_add(40)]));
                    img
                })
                .collect();
            Box::new(Self { frames, idx: 0, fps })
        }
    }

    impl VideoCapture for ScriptedCapture {
        fn is_opened(&self) -> bool {
            true
        }
        fn grab(&mut self) -> histeq_videoio::Result<()> {
            if self.idx < self.frames.len() {
                Ok(())
            } else {
                Err(VideoError::EndOfStream)
            }
        }
        fn retrieve(&mut self) -> histeq_videoio::Result<GrayImage> {
            let frame = self.frames[self.idx].clone();
            self.idx += 1;
            Ok(frame)
        }
        fn fps(&self) -> Option<f64> {
            self.fps
        }
        fn rewind(&mut self) -> histeq_videoio::Result<()> {
            self.idx = 0;
            Ok(())
        }
    }

    fn small_config(loop_playback: bool) -> SessionConfig {
        SessionConfig {
            processing: ProcessingConfig {
                canvas_width: 256,
                canvas_height: 64,
            },
            loop_playback,
            ..SessionConfig::default()
        }
    }

    #[test]
    fn keys_map_to_commands() {
        assert_eq!(Command::from_key('e'), Some(Command::ToggleEqualization));
        assert_eq!(Command::from_key('Q'), Some(Command::Quit));
        assert_eq!(Command::from_key('x'), None);
    }

    #[test]
    fn toggle_flips_state() {
        let mut state = SessionState::default();
        assert_eq!(state.apply(Command::ToggleEqualization), Control::Continue);
        assert!(state.equalize);
        state.apply(Command::ToggleEqualization);
        assert!(!state.equalize);
        assert_eq!(state.apply(Command::Quit), Control::Quit);
    }

    #[test]
    fn process_frame_passes_through_when_off() {
        let frame = GrayImage::from_fn(16, 16, |x, _| Luma([x as u8 + 100]));
        let out = process_frame(frame.clone(), &ProcessingConfig::default(), false).unwrap();
        assert_eq!(out.image, frame);
        assert!(!out.equalized);
        assert!(out.equalization_time.is_none());
        assert_eq!(out.histogram.dimensions(), (1024, 512));
    }

    #[test]
    fn process_frame_equalizes_when_on() {
        let frame = GrayImage::from_fn(16, 16, |x, _| Luma([x as u8 + 100]));
        let out = process_frame(frame, &ProcessingConfig::default(), true).unwrap();
        assert!(out.equalized);
        assert!(out.equalization_time.is_some());
        assert_eq!(out.image.get_pixel(0, 0)[0], 0);
        assert!(out.image.get_pixel(15, 0)[0] >= 254);
    }

    #[test]
    fn mean_equalization_time_without_equalized_frames_is_none() {
        let stats = SessionStats::default();
        assert_eq!(stats.mean_equalization_time(), None);
        assert_eq!(stats.mean_processing_time(), None);
    }

    #[test]
    fn stats_average_only_equalized_frames() {
        let mut stats = SessionStats::default();
        let frame = |eq: Option<u64>| ProcessedFrame {
            image: GrayImage::new(1, 1),
            histogram: GrayImage::new(1, 1),
            equalized: eq.is_some(),
            equalization_time: eq.map(Duration::from_millis),
            processing_time: Duration::from_millis(10),
        };
        stats.record(&frame(Some(4)));
        stats.record(&frame(None));
        stats.record(&frame(Some(8)));

        assert_eq!(stats.frames, 3);
        assert_eq!(stats.equalized_frames, 2);
        assert_eq!(stats.mean_equalization_time(), Some(Duration::from_millis(6)));
        assert_eq!(stats.mean_processing_time(), Some(Duration::from_millis(10)));
        assert_eq!(stats.to_string(), "processed 3 frames, mean equalization time: 6.000 ms");
    }

    #[test]
    fn summary_without_equalized_frames() {
        let stats = SessionStats { frames: 5, ..Default::default() };
        assert_eq!(stats.to_string(), "processed 5 frames, no frames were equalized");
    }

    #[test]
    fn frame_delay_uses_source_rate_then_fallback() {
        assert_eq!(frame_delay(Some(25.0), 30.0), Duration::from_millis(40));
        assert_eq!(frame_delay(None, 50.0), Duration::from_millis(20));
        assert_eq!(frame_delay(Some(0.0), 50.0), Duration::from_millis(20));
        assert_eq!(frame_delay(Some(f64::NAN), -1.0), Duration::from_secs_f64(1.0 / DEFAULT_FPS));
    }

    #[test]
    fn frame_wait_never_drops_below_minimum() {
        let delay = Duration::from_millis(40);
        assert_eq!(frame_wait(delay, Duration::from_millis(15)), Duration::from_millis(25));
        assert_eq!(frame_wait(delay, Duration::from_millis(90)), MIN_FRAME_WAIT);
    }

    #[test]
    fn session_stops_at_end_without_looping() {
        let mut session = Session::new(ScriptedCapture::boxed(&[10, 20], Some(25.0)), small_config(false));
        assert_eq!(session.frame_delay(), Duration::from_millis(40));
        assert!(session.next_frame().unwrap().is_some());
        assert!(session.next_frame().unwrap().is_some());
        assert!(session.next_frame().unwrap().is_none());
        assert_eq!(session.stats().frames, 2);
    }

    #[test]
    fn session_rewinds_when_looping() {
        let mut session = Session::new(ScriptedCapture::boxed(&[10, 20], None), small_config(true));
        let values: Vec<u8> = (0..5)
            .map(|_| session.next_frame().unwrap().unwrap().image.get_pixel(1, 1)[0])
            .collect();
        assert_eq!(values, vec![10, 20, 10, 20, 10]);
    }

    #[test]
    fn session_toggle_applies_to_following_frames() {
        let mut session = Session::new(ScriptedCapture::boxed(&[10, 20, 30], None), small_config(false));
        assert!(!session.next_frame().unwrap().unwrap().equalized);

        assert_eq!(session.handle(Command::ToggleEqualization), Control::Continue);
        let frame = session.next_frame().unwrap().unwrap();
        assert!(frame.equalized);
        // Two levels: 63 pixels at 20 map to 0, the marker pixel to 255.
        assert_eq!(frame.image.get_pixel(1, 1)[0], 0);
        assert_eq!(frame.image.get_pixel(0, 0)[0], 255);

        let stats = session.finish();
        assert_eq!(stats.frames, 2);
        assert_eq!(stats.equalized_frames, 1);
    }
}
