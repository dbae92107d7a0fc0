use std::{fs, path::Path, time::Duration};

use anyhow::Context;
use serde::Deserialize;

use crate::{
    color::Rgb,
    error::{Error, Result},
    pen::DEFAULT_ARC_STEP,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub window: Window,
    pub pen: PenStyle,
    pub spirograph: Spirograph,
    pub random_walk: RandomWalk,
    pub dashed_square: DashedSquare,
    pub polygons: Polygons,
}

impl Config {
    pub fn load<A: AsRef<Path>>(path: A) -> anyhow::Result<Self> {
        Self::load_impl(path.as_ref())
    }

    fn load_impl(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file `{}`", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| Error::config(format!("`{}`: {e}", path.display())))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks the settings that apply to every pattern.
    ///
    /// Pattern parameters are checked once the command line has been merged in.
    pub fn validate(&self) -> Result<()> {
        if self.window.width == 0 || self.window.height == 0 {
            return Err(Error::config(format!(
                "window size must be non-zero (got {}x{})",
                self.window.width, self.window.height
            )));
        }
        if !(self.pen.arc_step.is_finite() && self.pen.arc_step > 0.0) {
            return Err(Error::config(format!(
                "`pen.arc_step` must be a positive number (got {})",
                self.pen.arc_step
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Window {
    pub title: String,
    /// Canvas size in pixels. The turtle origin is its centre.
    pub width: u32,
    pub height: u32,
    pub background: Rgb,
}

impl Default for Window {
    fn default() -> Self {
        Self {
            title: "Turtle".into(),
            width: 800,
            height: 800,
            background: Rgb::WHITE,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PenStyle {
    pub color: Rgb,
    /// Longest segment used when approximating circles.
    pub arc_step: f32,
    /// Pause after each drawn segment, in milliseconds. 0 draws as fast as possible.
    pub step_delay_ms: u64,
}

impl PenStyle {
    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.step_delay_ms)
    }
}

impl Default for PenStyle {
    fn default() -> Self {
        Self {
            color: Rgb::BLACK,
            arc_step: DEFAULT_ARC_STEP,
            step_delay_ms: 0,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Spirograph {
    pub gap: f32,
    pub radius: f32,
    pub width: u32,
}

impl Default for Spirograph {
    fn default() -> Self {
        Self {
            gap: 10.0,
            radius: 100.0,
            width: 1,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RandomWalk {
    pub steps: u32,
    pub distance: f32,
    pub width: u32,
}

impl Default for RandomWalk {
    fn default() -> Self {
        Self {
            steps: 100,
            distance: 30.0,
            width: 15,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashedSquare {
    pub side: f32,
    pub width: u32,
}

impl Default for DashedSquare {
    fn default() -> Self {
        Self {
            side: 200.0,
            width: 1,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Polygons {
    pub from: u32,
    pub to: u32,
    pub side: f32,
    pub width: u32,
}

impl Default for Polygons {
    fn default() -> Self {
        Self {
            from: 3,
            to: 10,
            side: 50.0,
            width: 1,
        }
    }
}
