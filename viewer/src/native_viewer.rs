use crate::session::{Command, Control, ProcessedFrame, Session, SessionStats};
use crate::{Result, ViewerError};
use eframe::egui;
use std::sync::{Arc, Mutex};
use std::time::Instant;

/// Receives the final stats when the window is torn down.
type StatsSlot = Arc<Mutex<Option<SessionStats>>>;

#[derive(Debug, Clone)]
pub struct ViewerOptions {
    pub title: String,
    pub window_size: [f32; 2],
}

impl Default for ViewerOptions {
    fn default() -> Self {
        Self {
            title: "histeq".to_string(),
            window_size: [1600.0, 700.0],
        }
    }
}

/// Window showing the processed frame next to its histogram.
pub struct HistogramViewer {
    session: Session,
    frame_texture: Option<egui::TextureHandle>,
    hist_texture: Option<egui::TextureHandle>,
    next_frame_at: Instant,
    finished: bool,
    last_error: Option<String>,
    stats_out: StatsSlot,
}

/// Keyboard shortcuts: `E` toggles equalization, `Q` quits.
pub fn command_for_key(key: egui::Key) -> Option<Command> {
    match key {
        egui::Key::E => Command::from_key('e'),
        egui::Key::Q => Command::from_key('q'),
        _ => None,
    }
}

fn to_color_image(img: &image::GrayImage) -> egui::ColorImage {
    let (w, h) = img.dimensions();
    egui::ColorImage::from_gray([w as usize, h as usize], img.as_raw())
}

fn upload(
    ctx: &egui::Context,
    slot: &mut Option<egui::TextureHandle>,
    name: &str,
    img: &image::GrayImage,
) {
    let color = to_color_image(img);
    match slot {
        Some(texture) => texture.set(color, egui::TextureOptions::LINEAR),
        None => *slot = Some(ctx.load_texture(name, color, egui::TextureOptions::LINEAR)),
    }
}

impl HistogramViewer {
    fn new(session: Session, stats_out: StatsSlot) -> Self {
        Self {
            session,
            frame_texture: None,
            hist_texture: None,
            next_frame_at: Instant::now(),
            finished: false,
            last_error: None,
            stats_out,
        }
    }

    fn handle_input(&mut self, ctx: &egui::Context) {
        let commands: Vec<Command> = ctx.input(|i| {
            i.events
                .iter()
                .filter_map(|event| match event {
                    egui::Event::Key {
                        key, pressed: true, repeat: false, ..
                    } => command_for_key(*key),
                    _ => None,
                })
                .collect()
        });

        for command in commands {
            if self.session.handle(command) == Control::Quit {
                ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            }
        }
    }

    fn show_frame(&mut self, ctx: &egui::Context, frame: &ProcessedFrame) {
        upload(ctx, &mut self.frame_texture, "frame", &frame.image);
        upload(ctx, &mut self.hist_texture, "histogram", &frame.histogram);
    }

    fn advance(&mut self, ctx: &egui::Context) {
        if self.finished || Instant::now() < self.next_frame_at {
            return;
        }

        match self.session.next_frame() {
            Ok(Some(frame)) => {
                self.show_frame(ctx, &frame);
                self.next_frame_at = Instant::now() + self.session.wait_after(&frame);
            }
            Ok(None) => {
                tracing::info!("end of stream");
                self.finished = true;
            }
            Err(e) => {
                tracing::error!("frame processing failed: {e}");
                self.last_error = Some(e.to_string());
                self.finished = true;
            }
        }
    }
}

impl eframe::App for HistogramViewer {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_input(ctx);
        self.advance(ctx);

        let stats = self.session.stats();
        let equalize = self.session.state().equalize;
        egui::TopBottomPanel::top("status").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label(format!("equalization: {}", if equalize { "on" } else { "off" }));
                ui.separator();
                ui.label(format!("frames: {}", stats.frames));
                if let Some(mean) = stats.mean_equalization_time() {
                    ui.separator();
                    ui.label(format!("mean equalization: {:.2} ms", mean.as_secs_f64() * 1000.0));
                }
                ui.separator();
                ui.label("E: toggle  Q: quit");
                if let Some(err) = &self.last_error {
                    ui.separator();
                    ui.colored_label(egui::Color32::RED, err);
                }
            });
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.columns(2, |cols| {
                if let Some(texture) = &self.frame_texture {
                    cols[0].add(egui::Image::new(texture).shrink_to_fit());
                }
                if let Some(texture) = &self.hist_texture {
                    cols[1].add(egui::Image::new(texture).shrink_to_fit());
                }
            });
        });

        if !self.finished {
            ctx.request_repaint_after(self.next_frame_at.saturating_duration_since(Instant::now()));
        }
    }
}

impl Drop for HistogramViewer {
    fn drop(&mut self) {
        let stats = self.session.stats();
        stats.log_summary();
        if let Ok(mut slot) = self.stats_out.lock() {
            *slot = Some(stats.clone());
        }
    }
}

/// Opens the viewer window and blocks until it is closed, then returns the
/// stats of the session it played.
pub fn run_native_viewer(session: Session, options: ViewerOptions) -> Result<SessionStats> {
    let native = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(options.window_size)
            .with_title(options.title.clone()),
        ..Default::default()
    };

    let stats_out = StatsSlot::default();
    let slot = Arc::clone(&stats_out);
    eframe::run_native(
        &options.title,
        native,
        Box::new(move |_cc| Ok(Box::new(HistogramViewer::new(session, slot)))),
    )
    .map_err(|e| ViewerError::Ui(e.to_string()))?;

    let stats = stats_out
        .lock()
        .map_err(|_| ViewerError::Ui("viewer stats lock poisoned".to_string()))?
        .take()
        .unwrap_or_default();
    Ok(stats)
}
