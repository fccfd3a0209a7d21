mod particle;
mod quadtree;
pub(crate) mod surface;

use eframe::egui::{Color32, Pos2, Rect, Vec2, vec2};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::FieldConfig;
use particle::{Particle, Pointer, PulseParams, StepInput};
use quadtree::{IndexedPoint, QuadNode, QuadtreeCell};
use surface::Surface;

const OVERLAY_COLOR: Color32 = Color32::from_rgb(106, 198, 255);

/// What the host hands the pipeline for one tick.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct FrameInput {
    /// Pointer in field coordinates, `None` when no pointer is over the surface.
    pub(crate) pointer: Option<Pos2>,
    /// Monotonic clock driving the pulse, in seconds.
    pub(crate) time_secs: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct FrameStats {
    pub(crate) particles: usize,
    pub(crate) drawn_particles: usize,
    pub(crate) skipped_particles: usize,
    pub(crate) omitted_from_index: usize,
    pub(crate) connections: usize,
    pub(crate) index_cells: usize,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Connection {
    pub(crate) from: usize,
    pub(crate) to: usize,
    pub(crate) opacity: f32,
}

/// Line opacity for two particles `distance` apart; zero at and beyond
/// `threshold`, `max_opacity` when they coincide.
pub(crate) fn connection_opacity(distance: f32, threshold: f32, max_opacity: f32) -> f32 {
    if distance.is_nan() || threshold <= 0.0 || distance >= threshold {
        return 0.0;
    }
    max_opacity * (1.0 - distance.max(0.0) / threshold)
}

#[derive(Default)]
struct FrameScratch {
    points: Vec<IndexedPoint>,
    indexed: Vec<bool>,
    neighbors: Vec<IndexedPoint>,
    connections: Vec<Connection>,
    cells: Vec<QuadtreeCell>,
}

pub(crate) struct ParticleField {
    config: FieldConfig,
    extent: Vec2,
    particles: Vec<Particle>,
    rng: StdRng,
    generation: u64,
    scratch: FrameScratch,
}

impl ParticleField {
    pub(crate) fn new(config: FieldConfig, extent: Vec2, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let mut field = Self {
            config,
            extent,
            particles: Vec::new(),
            rng,
            generation: 0,
            scratch: FrameScratch::default(),
        };
        field.regenerate();
        field
    }

    #[cfg(test)]
    fn with_particles(config: FieldConfig, extent: Vec2, particles: Vec<Particle>) -> Self {
        Self {
            config,
            extent,
            particles,
            rng: StdRng::seed_from_u64(0),
            generation: 1,
            scratch: FrameScratch::default(),
        }
    }

    pub(crate) fn extent(&self) -> Vec2 {
        self.extent
    }

    #[cfg(test)]
    pub(crate) fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Bumped every time the particle set is regenerated.
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Regenerates the whole particle set when the extent changed. Returns
    /// whether it did.
    pub(crate) fn resize(&mut self, extent: Vec2) -> bool {
        if extent == self.extent {
            return false;
        }
        self.extent = extent;
        self.regenerate();
        true
    }

    fn regenerate(&mut self) {
        let count = self.config.particle_count(self.extent);
        let extent = self.extent;
        let config = &self.config;
        let rng = &mut self.rng;
        self.particles = (0..count)
            .map(|_| Particle::spawn(rng, extent, config))
            .collect();
        self.generation = self.generation.wrapping_add(1);

        tracing::info!(
            width = extent.x,
            height = extent.y,
            count,
            generation = self.generation,
            "regenerated particle field"
        );
    }

    /// Advances, indexes and draws one tick.
    pub(crate) fn render_frame(
        &mut self,
        input: &FrameInput,
        surface: &mut impl Surface,
    ) -> FrameStats {
        let [r, g, b] = self.config.background;
        surface.clear(Color32::from_rgb(r, g, b));

        self.advance(input);
        let (tree, omitted_from_index) = self.build_index();
        self.collect_connections(&tree);

        let mut stats = FrameStats {
            particles: self.particles.len(),
            omitted_from_index,
            connections: self.scratch.connections.len(),
            ..FrameStats::default()
        };

        self.scratch.cells.clear();
        tree.collect_cells(&mut self.scratch.cells);
        stats.index_cells = self.scratch.cells.len();
        if self.config.show_quadtree {
            self.draw_index_overlay(surface);
        }

        self.draw_particles(surface, &mut stats);
        self.draw_connections(surface);

        tracing::debug!(?stats, "frame rendered");
        stats
    }

    /// Every particle moves before the index is built, so no update sees a
    /// neighbor from a different tick.
    fn advance(&mut self, input: &FrameInput) {
        let step = StepInput {
            extent: self.extent,
            pointer: Pointer {
                position: input.pointer,
                influence_radius: self.config.pointer_radius,
            },
            repulsion_scale: self.config.repulsion_scale,
            pulse: PulseParams::from_config(&self.config),
            time_secs: input.time_secs,
        };

        for particle in &mut self.particles {
            particle.step(&step);
        }
    }

    /// Particles pushed off the surface by repulsion stay out of the index
    /// until wraparound brings them back next tick.
    fn build_index(&mut self) -> (QuadNode, usize) {
        let region = Rect::from_min_size(Pos2::ZERO, self.extent);
        let mut tree = QuadNode::new(region, self.config.quadtree_capacity);

        let scratch = &mut self.scratch;
        scratch.points.clear();
        scratch.points.extend(
            self.particles
                .iter()
                .enumerate()
                .map(|(index, particle)| IndexedPoint::new(particle.position, index)),
        );
        scratch.indexed.clear();
        scratch.indexed.resize(self.particles.len(), false);

        let mut omitted = 0usize;
        for point in &scratch.points {
            if tree.insert(*point) {
                scratch.indexed[point.index] = true;
            } else {
                omitted += 1;
            }
        }

        (tree, omitted)
    }

    fn collect_connections(&mut self, tree: &QuadNode) {
        let threshold = self.config.connection_distance;
        let max_opacity = self.config.connection_opacity;
        let query_extent = self.config.neighbor_query_extent;
        let dedup = self.config.dedup_connections;

        let scratch = &mut self.scratch;
        scratch.connections.clear();

        for (index, particle) in self.particles.iter().enumerate() {
            if !scratch.indexed.get(index).copied().unwrap_or(false) {
                continue;
            }

            let range =
                Rect::from_center_size(particle.position, vec2(query_extent, query_extent));
            scratch.neighbors.clear();
            tree.query(range, &mut scratch.neighbors);

            for candidate in &scratch.neighbors {
                if candidate.index == index || (dedup && candidate.index < index) {
                    continue;
                }

                let distance = (candidate.position - particle.position).length();
                let opacity = connection_opacity(distance, threshold, max_opacity);
                if opacity > 0.0 {
                    scratch.connections.push(Connection {
                        from: index,
                        to: candidate.index,
                        opacity,
                    });
                }
            }
        }
    }

    fn draw_index_overlay(&self, surface: &mut impl Surface) {
        for cell in &self.scratch.cells {
            let opacity = if cell.is_leaf { 0.43 } else { 0.22 };
            let width = (1.4 - cell.depth as f32 * 0.09).clamp(0.45, 1.4);
            surface.outline_rect(cell.region, width, OVERLAY_COLOR, opacity);
        }
    }

    fn draw_particles(&self, surface: &mut impl Surface, stats: &mut FrameStats) {
        let blur = self.config.shadow_blur;
        let shadow_alpha = self.config.shadow_alpha;

        for particle in &self.particles {
            if !particle.is_finite() {
                stats.skipped_particles += 1;
                continue;
            }

            surface.halo(
                particle.position,
                particle.radius,
                blur,
                particle.color,
                particle.opacity * shadow_alpha,
            );
            surface.fill_glow(
                particle.position,
                particle.radius,
                particle.color,
                particle.opacity,
            );
            stats.drawn_particles += 1;
        }
    }

    fn draw_connections(&self, surface: &mut impl Surface) {
        let [r, g, b] = self.config.glow_color;
        let color = Color32::from_rgb(r, g, b);
        let width = self.config.connection_width;

        for connection in &self.scratch.connections {
            let (Some(from), Some(to)) = (
                self.particles.get(connection.from),
                self.particles.get(connection.to),
            ) else {
                continue;
            };
            surface.line(from.position, to.position, width, color, connection.opacity);
        }
    }
}
