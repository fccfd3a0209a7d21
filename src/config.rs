use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use eframe::egui::Vec2;
use serde::Deserialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameCadence {
    /// Ask the host for the next display repaint.
    NextRepaint,
    /// Repaint on a fixed timer of `fallback_interval_ms`.
    Interval,
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct FieldConfig {
    pub max_particles: usize,
    pub area_per_particle: f32,
    pub max_speed: f32,
    pub min_radius: f32,
    pub max_radius: f32,
    pub min_opacity: f32,
    pub max_opacity: f32,
    pub glow_color: [u8; 3],
    pub background: [u8; 3],
    pub shadow_blur: f32,
    pub shadow_alpha: f32,
    pub pulse_rate: f32,
    pub phase_spread: f32,
    pub pointer_radius: f32,
    pub repulsion_scale: f32,
    pub connection_distance: f32,
    pub neighbor_query_extent: f32,
    pub connection_opacity: f32,
    pub connection_width: f32,
    pub dedup_connections: bool,
    pub quadtree_capacity: usize,
    pub show_quadtree: bool,
    pub show_stats: bool,
    pub frame_cadence: FrameCadence,
    pub fallback_interval_ms: f32,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            max_particles: 150,
            area_per_particle: 15_000.0,
            max_speed: 0.35,
            min_radius: 1.0,
            max_radius: 3.0,
            min_opacity: 0.5,
            max_opacity: 1.0,
            glow_color: [0, 180, 255],
            background: [9, 12, 18],
            shadow_blur: 15.0,
            shadow_alpha: 0.5,
            pulse_rate: 3.0,
            phase_spread: 10.0,
            pointer_radius: 150.0,
            repulsion_scale: 2.0,
            connection_distance: 100.0,
            neighbor_query_extent: 200.0,
            connection_opacity: 0.2,
            connection_width: 0.5,
            dedup_connections: false,
            quadtree_capacity: 4,
            show_quadtree: false,
            show_stats: false,
            frame_cadence: FrameCadence::NextRepaint,
            fallback_interval_ms: 1000.0 / 60.0,
        }
    }
}

impl FieldConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("invalid field config JSON in {}", path.display()))
    }

    /// Replaces values the field cannot run with, logging each change.
    pub fn sanitized(mut self) -> Self {
        let defaults = Self::default();

        if self.quadtree_capacity == 0 {
            tracing::warn!("quadtree_capacity must be at least 1, using 1");
            self.quadtree_capacity = 1;
        }
        if !is_positive(self.area_per_particle) {
            tracing::warn!(
                value = self.area_per_particle,
                "area_per_particle must be positive, using default"
            );
            self.area_per_particle = defaults.area_per_particle;
        }
        if !is_positive(self.min_radius) {
            tracing::warn!(value = self.min_radius, "min_radius must be positive, using default");
            self.min_radius = defaults.min_radius;
        }
        if !(self.max_radius - self.min_radius).is_finite() {
            tracing::warn!(
                min = self.min_radius,
                max = self.max_radius,
                "radius range is not finite, using default"
            );
            self.max_radius = defaults.max_radius.max(self.min_radius);
        }
        if self.max_radius < self.min_radius {
            tracing::warn!(
                min = self.min_radius,
                max = self.max_radius,
                "max_radius below min_radius, clamping"
            );
            self.max_radius = self.min_radius;
        }

        let min_opacity = self.min_opacity.clamp(0.0, 1.0);
        let max_opacity = self.max_opacity.clamp(min_opacity, 1.0);
        if min_opacity != self.min_opacity || max_opacity != self.max_opacity {
            tracing::warn!(
                min = self.min_opacity,
                max = self.max_opacity,
                "opacity range must lie in [0, 1], clamping"
            );
            self.min_opacity = min_opacity;
            self.max_opacity = max_opacity;
        }

        for (name, value, fallback) in [
            ("max_speed", &mut self.max_speed, defaults.max_speed),
            ("pointer_radius", &mut self.pointer_radius, defaults.pointer_radius),
            ("repulsion_scale", &mut self.repulsion_scale, defaults.repulsion_scale),
            (
                "connection_distance",
                &mut self.connection_distance,
                defaults.connection_distance,
            ),
            ("shadow_blur", &mut self.shadow_blur, defaults.shadow_blur),
        ] {
            if !value.is_finite() || *value < 0.0 {
                tracing::warn!(field = name, value = *value, "must be non-negative, using default");
                *value = fallback;
            }
        }

        // Velocity is sampled from -max_speed..max_speed.
        if !(self.max_speed * 2.0).is_finite() {
            tracing::warn!(value = self.max_speed, "max_speed range overflows, using default");
            self.max_speed = defaults.max_speed;
        }

        let min_query = self.connection_distance * 2.0;
        if self.neighbor_query_extent.is_nan() || self.neighbor_query_extent < min_query {
            tracing::warn!(
                value = self.neighbor_query_extent,
                min_query,
                "neighbor_query_extent cannot cover connection_distance, widening"
            );
            self.neighbor_query_extent = min_query;
        }

        self.connection_opacity = self.connection_opacity.clamp(0.0, 1.0);
        self.shadow_alpha = self.shadow_alpha.clamp(0.0, 1.0);

        if !is_positive(self.fallback_interval_ms) {
            tracing::warn!(
                value = self.fallback_interval_ms,
                "fallback_interval_ms must be positive, using default"
            );
            self.fallback_interval_ms = defaults.fallback_interval_ms;
        }

        self
    }

    /// Particle count for a surface: one per `area_per_particle`, capped at
    /// `max_particles`.
    pub fn particle_count(&self, extent: Vec2) -> usize {
        if !extent.x.is_finite() || !extent.y.is_finite() || extent.x <= 0.0 || extent.y <= 0.0 {
            return 0;
        }

        let area = f64::from(extent.x) * f64::from(extent.y);
        let by_density = (area / f64::from(self.area_per_particle)).floor();
        if by_density >= self.max_particles as f64 {
            self.max_particles
        } else {
            by_density as usize
        }
    }

    pub fn fallback_interval(&self) -> Duration {
        Duration::from_micros((self.fallback_interval_ms.max(1.0) * 1000.0).round() as u64)
    }
}

fn is_positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::ParticleField;
    use eframe::egui::vec2;

    #[test]
    fn full_hd_surface_yields_capped_density() {
        let config = FieldConfig::default();
        assert_eq!(config.particle_count(vec2(1920.0, 1080.0)), 138);

        let capped = FieldConfig {
            max_particles: 100,
            ..FieldConfig::default()
        };
        assert_eq!(capped.particle_count(vec2(1920.0, 1080.0)), 100);
        assert_eq!(config.particle_count(vec2(4000.0, 4000.0)), 150);
    }

    #[test]
    fn degenerate_surfaces_have_no_particles() {
        let config = FieldConfig::default();
        assert_eq!(config.particle_count(vec2(0.0, 600.0)), 0);
        assert_eq!(config.particle_count(vec2(800.0, -1.0)), 0);
        assert_eq!(config.particle_count(vec2(f32::NAN, 600.0)), 0);
        assert_eq!(config.particle_count(vec2(100.0, 100.0)), 0);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: FieldConfig =
            serde_json::from_str(r#"{ "max_particles": 300, "frame_cadence": "interval" }"#)
                .expect("valid config");
        assert_eq!(config.max_particles, 300);
        assert_eq!(config.frame_cadence, FrameCadence::Interval);
        assert_eq!(config.connection_distance, 100.0);
        assert_eq!(config.quadtree_capacity, 4);
    }

    #[test]
    fn sanitize_repairs_invalid_values() {
        let config = FieldConfig {
            quadtree_capacity: 0,
            area_per_particle: 0.0,
            min_opacity: -0.5,
            max_opacity: 3.0,
            neighbor_query_extent: 20.0,
            fallback_interval_ms: 0.0,
            pointer_radius: f32::NAN,
            ..FieldConfig::default()
        }
        .sanitized();

        assert_eq!(config.quadtree_capacity, 1);
        assert_eq!(config.area_per_particle, 15_000.0);
        assert_eq!(config.min_opacity, 0.0);
        assert_eq!(config.max_opacity, 1.0);
        assert_eq!(config.neighbor_query_extent, 200.0);
        assert_eq!(config.pointer_radius, 150.0);
        assert!(config.fallback_interval_ms > 0.0);
    }

    #[test]
    fn sanitize_keeps_sampling_ranges_finite() {
        let config: FieldConfig =
            serde_json::from_str(r#"{ "max_speed": 3e38, "max_radius": 3e38, "min_radius": 2.0 }"#)
                .expect("valid config");
        let config = config.sanitized();
        assert_eq!(config.max_speed, 0.35);
        assert!((config.max_radius - config.min_radius).is_finite());

        let infinite = FieldConfig {
            max_radius: f32::INFINITY,
            ..FieldConfig::default()
        }
        .sanitized();
        assert_eq!(infinite.max_radius, 3.0);

        let huge_min = FieldConfig {
            min_radius: 3e38,
            max_radius: -3e38,
            ..FieldConfig::default()
        }
        .sanitized();
        assert_eq!(huge_min.max_radius, huge_min.min_radius);

        let field = ParticleField::new(config, vec2(800.0, 600.0), Some(9));
        assert_eq!(field.generation(), 1);
    }

    #[test]
    fn default_config_is_already_sane() {
        assert_eq!(FieldConfig::default().sanitized(), FieldConfig::default());
    }

    #[test]
    fn load_reports_missing_file() {
        let error = FieldConfig::load(Path::new("/nonexistent/lumen-drift.json"))
            .expect_err("missing file must fail");
        assert!(format!("{error:#}").contains("failed to read config"));
    }
}
