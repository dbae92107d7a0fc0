use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::{config::Config, pattern::Pattern};

/// Draws a turtle-graphics pattern, then waits for a click on the window.
#[derive(Parser, Debug)]
#[command(version)]
pub struct Cli {
    /// TOML file with window, pen and pattern settings.
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Seed for every random choice. Logged when omitted, to replay a run.
    #[arg(long)]
    pub seed: Option<u64>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// A ring of randomly coloured circles.
    Spirograph {
        /// Degrees between consecutive circles.
        #[arg(long, allow_negative_numbers = true)]
        gap: Option<f32>,
        #[arg(long, allow_negative_numbers = true)]
        radius: Option<f32>,
    },
    /// Randomly coloured segments in random axis directions.
    #[command(name = "randomwalk", alias = "random-walk")]
    RandomWalk {
        #[arg(long)]
        steps: Option<u32>,
        #[arg(long, allow_negative_numbers = true)]
        distance: Option<f32>,
    },
    /// A square made of dashes.
    DashedSquare {
        #[arg(long, allow_negative_numbers = true)]
        side: Option<f32>,
    },
    /// Regular polygons sharing one corner, one per side count.
    Polygons {
        #[arg(long)]
        from: Option<u32>,
        #[arg(long)]
        to: Option<u32>,
        #[arg(long, allow_negative_numbers = true)]
        side: Option<f32>,
    },
}

impl Command {
    /// The pattern to draw: command-line values first, then the config file.
    pub fn pattern(&self, config: &Config) -> Pattern {
        match *self {
            Command::Spirograph { gap, radius } => Pattern::Spirograph {
                gap: gap.unwrap_or(config.spirograph.gap),
                radius: radius.unwrap_or(config.spirograph.radius),
                width: config.spirograph.width,
            },
            Command::RandomWalk { steps, distance } => Pattern::RandomWalk {
                steps: steps.unwrap_or(config.random_walk.steps),
                distance: distance.unwrap_or(config.random_walk.distance),
                width: config.random_walk.width,
            },
            Command::DashedSquare { side } => Pattern::DashedSquare {
                side: side.unwrap_or(config.dashed_square.side),
                width: config.dashed_square.width,
            },
            Command::Polygons { from, to, side } => Pattern::Polygons {
                sides: from.unwrap_or(config.polygons.from)..=to.unwrap_or(config.polygons.to),
                side: side.unwrap_or(config.polygons.side),
                width: config.polygons.width,
            },
        }
    }
}
