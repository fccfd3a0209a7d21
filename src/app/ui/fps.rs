use eframe::egui::Context;

use super::super::LumenDriftApp;

const FPS_SAMPLE_WINDOW: usize = 180;

impl LumenDriftApp {
    pub(in crate::app) fn update_fps_counter(&mut self, ctx: &Context) {
        let dt = ctx.input(|input| input.stable_dt);
        self.record_frame_time(dt);
    }

    fn record_frame_time(&mut self, dt: f32) {
        if dt <= f32::EPSILON {
            return;
        }

        self.fps_current = (1.0 / dt).clamp(0.0, 1000.0);
        self.fps_samples.push_back(self.fps_current);
        while self.fps_samples.len() > FPS_SAMPLE_WINDOW {
            self.fps_samples.pop_front();
        }
    }

    pub(in crate::app) fn stats_display_text(&self) -> Option<String> {
        if !self.show_stats {
            return None;
        }

        let mut parts = vec![format!("FPS {:.0}", self.fps_current)];

        if !self.fps_samples.is_empty() {
            let avg = self.fps_samples.iter().sum::<f32>() / self.fps_samples.len() as f32;
            parts.push(format!("avg {avg:.1}"));
        }
        if let Some(low) = self.fps_samples.iter().copied().reduce(f32::min) {
            parts.push(format!("low {low:.0}"));
        }
        if let Some(high) = self.fps_samples.iter().copied().reduce(f32::max) {
            parts.push(format!("high {high:.0}"));
        }
        if self.fps_current > f32::EPSILON {
            parts.push(format!("{:.1} ms", 1000.0 / self.fps_current));
        }

        let stats = self.last_stats;
        parts.push(format!(
            "{} particles / {} links / {} cells",
            stats.drawn_particles, stats.connections, stats.index_cells
        ));
        if stats.omitted_from_index > 0 {
            parts.push(format!("{} off-surface", stats.omitted_from_index));
        }

        Some(parts.join(" | "))
    }
}
