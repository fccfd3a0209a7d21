use eframe::egui::{Color32, Pos2, Vec2, pos2, vec2};
use rand::Rng;

use crate::config::FieldConfig;

const RADIUS_SWELL: f32 = 0.3;
const OPACITY_FLOOR: f32 = 0.8;
const OPACITY_SWELL: f32 = 0.2;

/// Pointer as seen by one tick. `position` is `None` while no pointer hovers
/// the surface, which turns repulsion off.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Pointer {
    pub(crate) position: Option<Pos2>,
    pub(crate) influence_radius: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct PulseParams {
    pub(crate) rate: f32,
    pub(crate) phase_spread: f32,
}

impl PulseParams {
    pub(crate) fn from_config(config: &FieldConfig) -> Self {
        Self {
            rate: config.pulse_rate,
            phase_spread: config.phase_spread,
        }
    }
}

/// Everything a particle reads during its update.
#[derive(Clone, Copy, Debug)]
pub(crate) struct StepInput {
    pub(crate) extent: Vec2,
    pub(crate) pointer: Pointer,
    pub(crate) repulsion_scale: f32,
    pub(crate) pulse: PulseParams,
    pub(crate) time_secs: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Particle {
    pub(crate) position: Pos2,
    pub(crate) velocity: Vec2,
    pub(crate) base_radius: f32,
    pub(crate) radius: f32,
    pub(crate) base_opacity: f32,
    pub(crate) opacity: f32,
    pub(crate) glow_phase: f32,
    pub(crate) color: Color32,
}

impl Particle {
    pub(crate) fn spawn(rng: &mut impl Rng, extent: Vec2, config: &FieldConfig) -> Self {
        let position = pos2(sample_below(rng, extent.x), sample_below(rng, extent.y));
        let speed = config.max_speed;
        let velocity = if speed > 0.0 {
            vec2(rng.gen_range(-speed..speed), rng.gen_range(-speed..speed))
        } else {
            Vec2::ZERO
        };
        let base_radius = sample_span(rng, config.min_radius, config.max_radius);
        let base_opacity = sample_span(rng, config.min_opacity, config.max_opacity);
        let [r, g, b] = config.glow_color;

        Self {
            position,
            velocity,
            base_radius,
            radius: base_radius,
            base_opacity,
            opacity: base_opacity,
            glow_phase: rng.gen_range(0.0..1.0),
            color: Color32::from_rgb(r, g, b),
        }
    }

    /// Runs motion, wraparound, repulsion and pulsing in that order.
    pub(crate) fn step(&mut self, input: &StepInput) {
        self.advance();
        self.wrap(input.extent);
        self.repel(input.pointer, input.repulsion_scale);
        self.pulse(input.time_secs, input.pulse);
    }

    pub(crate) fn advance(&mut self) {
        self.position += self.velocity;
    }

    pub(crate) fn wrap(&mut self, extent: Vec2) {
        self.position.x = wrap_axis(self.position.x, extent.x);
        self.position.y = wrap_axis(self.position.y, extent.y);
    }

    /// Nudges the particle straight away from the pointer and returns the
    /// displacement applied. Velocity is left untouched.
    pub(crate) fn repel(&mut self, pointer: Pointer, scale: f32) -> Vec2 {
        let Some(target) = pointer.position else {
            return Vec2::ZERO;
        };
        if pointer.influence_radius <= 0.0 {
            return Vec2::ZERO;
        }

        let delta = target - self.position;
        let distance = delta.length();
        if distance.is_nan() || distance >= pointer.influence_radius {
            return Vec2::ZERO;
        }

        let angle = delta.y.atan2(delta.x);
        let falloff = (pointer.influence_radius - distance) / pointer.influence_radius;
        let displacement = -vec2(angle.cos(), angle.sin()) * (falloff * scale);
        self.position += displacement;
        displacement
    }

    pub(crate) fn pulse(&mut self, time_secs: f64, params: PulseParams) {
        let glow = pulse_factor(time_secs, self.glow_phase, params);
        self.radius = self.base_radius * (1.0 + RADIUS_SWELL * glow);
        self.opacity = self.base_opacity * (OPACITY_FLOOR + OPACITY_SWELL * glow);
    }

    pub(crate) fn is_finite(&self) -> bool {
        self.position.x.is_finite()
            && self.position.y.is_finite()
            && self.radius.is_finite()
            && self.opacity.is_finite()
    }
}

/// Shared breathing oscillation in `[0, 1]`, offset per particle.
pub(crate) fn pulse_factor(time_secs: f64, glow_phase: f32, params: PulseParams) -> f32 {
    let phase = f64::from(params.rate) * time_secs
        + f64::from(params.phase_spread) * f64::from(glow_phase);
    (0.5 * phase.sin() + 0.5).clamp(0.0, 1.0) as f32
}

/// Low exits land just inside the far edge so the result stays in `[0, extent)`.
pub(crate) fn wrap_axis(value: f32, extent: f32) -> f32 {
    if value < 0.0 {
        largest_below(extent)
    } else if value >= extent {
        0.0
    } else {
        value
    }
}

fn largest_below(extent: f32) -> f32 {
    if extent > 0.0 && extent.is_finite() {
        f32::from_bits(extent.to_bits() - 1)
    } else {
        0.0
    }
}

fn sample_below(rng: &mut impl Rng, extent: f32) -> f32 {
    if extent > 0.0 && extent.is_finite() {
        rng.gen_range(0.0..extent)
    } else {
        0.0
    }
}

fn sample_span(rng: &mut impl Rng, low: f32, high: f32) -> f32 {
    if high > low {
        rng.gen_range(low..high)
    } else {
        low
    }
}
