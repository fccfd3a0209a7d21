use std::collections::VecDeque;

use eframe::egui::{self, Context, Pos2, Sense, Vec2};

use crate::config::FieldConfig;
use crate::field::surface::PainterSurface;
use crate::field::{FrameInput, FrameStats, ParticleField};

mod driver;
mod ui;

use driver::AnimationDriver;

pub struct LumenDriftApp {
    field: ParticleField,
    driver: AnimationDriver,
    show_stats: bool,
    last_stats: FrameStats,
    fps_current: f32,
    fps_samples: VecDeque<f32>,
}

impl LumenDriftApp {
    pub fn new(config: FieldConfig, seed: Option<u64>) -> Self {
        let driver = AnimationDriver::from_config(&config);
        let show_stats = config.show_stats;
        tracing::info!(
            max_particles = config.max_particles,
            dedup_connections = config.dedup_connections,
            cadence = ?driver.next_frame(),
            "starting particle field"
        );

        Self {
            field: ParticleField::new(config, Vec2::ZERO, seed),
            driver,
            show_stats,
            last_stats: FrameStats::default(),
            fps_current: 0.0,
            fps_samples: VecDeque::new(),
        }
    }

    fn pointer_in_field(ctx: &Context, rect: egui::Rect) -> Option<Pos2> {
        ctx.input(|input| input.pointer.hover_pos())
            .filter(|position| rect.contains(*position))
            .map(|position| (position - rect.min).to_pos2())
    }

    fn draw_field(&mut self, ui: &mut egui::Ui) {
        let (rect, _response) = ui.allocate_exact_size(ui.available_size(), Sense::hover());

        if self.field.resize(rect.size()) {
            tracing::debug!(
                frame = self.driver.frames(),
                generation = self.field.generation(),
                extent = ?self.field.extent(),
                "surface resized"
            );
        }

        let input = FrameInput {
            pointer: Self::pointer_in_field(ui.ctx(), rect),
            time_secs: ui.input(|input| input.time),
        };

        let painter = ui.painter_at(rect);
        let mut surface = PainterSurface::new(&painter, rect);
        let field = &mut self.field;
        self.last_stats = self
            .driver
            .drive(ui.ctx(), || field.render_frame(&input, &mut surface));

        if let Some(text) = self.stats_display_text() {
            painter.text(
                rect.left_top() + egui::vec2(10.0, 10.0),
                egui::Align2::LEFT_TOP,
                text,
                egui::FontId::monospace(12.0),
                egui::Color32::from_gray(220),
            );
        }
    }
}

impl eframe::App for LumenDriftApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        if ctx.input(|input| input.key_pressed(egui::Key::F3)) {
            self.show_stats = !self.show_stats;
        }
        self.update_fps_counter(ctx);

        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| self.draw_field(ui));
    }
}
