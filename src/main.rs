mod app;
mod config;
mod field;

use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use config::{FieldConfig, FrameCadence};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// JSON file with field settings; missing keys keep their defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    max_particles: Option<usize>,

    /// Draw each link once instead of once from each end.
    #[arg(long)]
    dedup_connections: bool,

    #[arg(long)]
    show_quadtree: bool,

    /// Show the FPS and frame statistics bar (toggle with F3).
    #[arg(long)]
    show_stats: bool,

    /// Repaint on a fixed ~60 Hz timer instead of every display refresh.
    #[arg(long)]
    timer_fallback: bool,

    /// Seed for particle generation, for reproducible runs.
    #[arg(long)]
    seed: Option<u64>,

    #[arg(long, default_value_t = 1280.0)]
    width: f32,

    #[arg(long, default_value_t = 800.0)]
    height: f32,
}

impl Args {
    fn field_config(&self) -> Result<FieldConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let config = FieldConfig::load(path)?;
                tracing::info!(path = %path.display(), "loaded field config");
                config
            }
            None => FieldConfig::default(),
        };

        if let Some(max_particles) = self.max_particles {
            config.max_particles = max_particles;
        }
        config.dedup_connections |= self.dedup_connections;
        config.show_quadtree |= self.show_quadtree;
        config.show_stats |= self.show_stats;
        if self.timer_fallback {
            config.frame_cadence = FrameCadence::Interval;
        }

        Ok(config.sanitized())
    }
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let config = args.field_config()?;
    let seed = args.seed;

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default()
            .with_inner_size([args.width, args.height])
            .with_min_inner_size([160.0, 120.0]),
        ..Default::default()
    };

    eframe::run_native(
        "lumen-drift",
        options,
        Box::new(move |_cc| Ok(Box::new(app::LumenDriftApp::new(config, seed)))),
    )
    .map_err(|error| anyhow!("failed to run the particle window: {error}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let args = Args::parse_from([
            "lumen-drift",
            "--max-particles",
            "300",
            "--dedup-connections",
            "--timer-fallback",
            "--seed",
            "17",
        ]);
        let config = args.field_config().expect("no config file to read");

        assert_eq!(config.max_particles, 300);
        assert!(config.dedup_connections);
        assert!(!config.show_quadtree);
        assert_eq!(config.frame_cadence, FrameCadence::Interval);
        assert_eq!(args.seed, Some(17));
    }

    #[test]
    fn missing_config_file_is_an_error() {
        let args = Args::parse_from(["lumen-drift", "--config", "/nonexistent/field.json"]);
        assert!(args.field_config().is_err());
    }
}
