use crate::{
    cmd::Cmd,
    color::Rgb,
    error::{Error, Result},
    math::{vec2, Vec2f},
};

/// Default upper bound on the length of one circle tessellation segment.
pub const DEFAULT_ARC_STEP: f32 = 2.0;

/// Upper bound on the segments of one arc; larger arcs are rejected before drawing.
pub const MAX_ARC_SEGMENTS: u32 = 100_000;

/// Receives the drawing commands a [`Pen`] issues.
pub trait Surface {
    fn submit(&mut self, cmd: Cmd) -> Result<()>;
}

impl<S: Surface + ?Sized> Surface for &mut S {
    fn submit(&mut self, cmd: Cmd) -> Result<()> {
        (**self).submit(cmd)
    }
}

#[cfg(test)]
impl Surface for Vec<Cmd> {
    fn submit(&mut self, cmd: Cmd) -> Result<()> {
        self.push(cmd);
        Ok(())
    }
}

/// The operations the pattern drivers issue.
///
/// Headings are in degrees, counter-clockwise from +x, always normalized into `0..360`.
pub trait Turtle {
    /// Moves along the current heading, drawing a line if the pen is down.
    /// Negative distances move backwards.
    fn forward(&mut self, distance: f32) -> Result<()>;

    /// Turns counter-clockwise by `degrees` (clockwise if negative).
    fn turn(&mut self, degrees: f32) -> Result<()>;

    fn set_heading(&mut self, degrees: f32) -> Result<()>;

    fn heading(&self) -> f32;

    /// Maximum length of one circle segment.
    fn arc_step(&self) -> f32;

    fn set_color(&mut self, color: Rgb);

    fn set_pen_down(&mut self, down: bool);

    fn set_width(&mut self, width: u32) -> Result<()>;

    /// Draws a full circle tangent to the current heading.
    ///
    /// The centre lies `radius` units to the left; a negative radius curves to the right.
    fn circle(&mut self, radius: f32) -> Result<()>;

    fn left(&mut self, degrees: f32) -> Result<()> {
        self.turn(degrees)
    }

    fn right(&mut self, degrees: f32) -> Result<()> {
        self.turn(-degrees)
    }
}

/// Folds any angle into `0..360`.
pub fn normalize_heading(degrees: f32) -> f32 {
    let h = degrees.rem_euclid(360.0);
    // `rem_euclid` rounds tiny negative inputs up to exactly 360.
    if h >= 360.0 {
        0.0
    } else {
        h
    }
}

/// Number of segments an arc of `extent` degrees on a circle of `radius` is drawn with.
///
/// Fails if the arc would take more than [`MAX_ARC_SEGMENTS`] segments.
pub fn arc_segments(radius: f32, extent: f32, arc_step: f32) -> Result<u32> {
    let arc_len = radius.abs() * extent.abs().to_radians();
    let steps = (arc_len / arc_step).ceil();
    if steps > MAX_ARC_SEGMENTS as f32 {
        return Err(Error::config(format!(
            "an arc of radius {radius} would need {steps} segments of {arc_step} \
             (at most {MAX_ARC_SEGMENTS} allowed)"
        )));
    }
    Ok((steps as u32).max(1))
}

fn finite(what: &str, value: f32) -> Result<f32> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::config(format!("{what} must be finite (got {value})")))
    }
}

/// A stateful cursor over the canvas.
#[derive(Debug)]
pub struct Pen<S> {
    surface: S,
    position: Vec2f,
    heading: f32,
    down: bool,
    width: u32,
    color: Rgb,
    arc_step: f32,
}

impl<S: Surface> Pen<S> {
    /// A pen at the origin, heading 0, pen down, 1 unit wide, drawing black.
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            position: vec2(0.0, 0.0),
            heading: 0.0,
            down: true,
            width: 1,
            color: Rgb::BLACK,
            arc_step: DEFAULT_ARC_STEP,
        }
    }

    /// Sets the maximum segment length used to approximate circles.
    pub fn with_arc_step(mut self, arc_step: f32) -> Result<Self> {
        if !(arc_step.is_finite() && arc_step > 0.0) {
            return Err(Error::config(format!(
                "arc step must be a positive number (got {arc_step})"
            )));
        }
        self.arc_step = arc_step;
        Ok(self)
    }

    pub fn position(&self) -> Vec2f {
        self.position
    }

    #[cfg(test)]
    pub fn is_down(&self) -> bool {
        self.down
    }

    #[cfg(test)]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[cfg(test)]
    pub fn color(&self) -> Rgb {
        self.color
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    #[cfg(test)]
    pub fn into_surface(self) -> S {
        self.surface
    }

    /// Draws an arc of `extent` degrees on a circle of `radius`.
    ///
    /// Positive extents travel forwards. The arc is split into segments no longer than the arc
    /// step. A whole number of turns leaves the pen exactly where it started.
    pub fn circle_arc(&mut self, radius: f32, extent: f32) -> Result<()> {
        finite("circle radius", radius)?;
        finite("circle extent", extent)?;

        let start = self.position;
        let start_heading = self.heading;
        let sweep = if radius < 0.0 { -extent } else { extent };

        let steps = arc_segments(radius, extent, self.arc_step)?;
        let center = start + Vec2f::from_heading(start_heading).perp() * radius;
        let spoke = start - center;
        let closed = sweep % 360.0 == 0.0;

        for i in 1..=steps {
            let point = if closed && i == steps {
                start
            } else {
                center + spoke.rotate(sweep * i as f32 / steps as f32)
            };
            self.line_to(point)?;
        }

        self.heading = normalize_heading(start_heading + sweep % 360.0);
        self.report_cursor()
    }

    fn line_to(&mut self, to: Vec2f) -> Result<()> {
        if self.down {
            self.surface.submit(Cmd::Segment {
                from: self.position,
                to,
                color: self.color,
                width: self.width,
            })?;
        }
        self.position = to;
        Ok(())
    }

    fn report_cursor(&mut self) -> Result<()> {
        self.surface.submit(Cmd::Cursor {
            position: self.position,
            heading: self.heading,
        })
    }
}

impl<S: Surface> Turtle for Pen<S> {
    fn forward(&mut self, distance: f32) -> Result<()> {
        let distance = finite("distance", distance)?;
        let to = self.position + Vec2f::from_heading(self.heading) * distance;
        self.line_to(to)?;
        self.report_cursor()
    }

    fn turn(&mut self, degrees: f32) -> Result<()> {
        let degrees = finite("turn angle", degrees)?;
        self.heading = normalize_heading(self.heading + degrees);
        self.report_cursor()
    }

    fn set_heading(&mut self, degrees: f32) -> Result<()> {
        let degrees = finite("heading", degrees)?;
        self.heading = normalize_heading(degrees);
        self.report_cursor()
    }

    fn heading(&self) -> f32 {
        self.heading
    }

    fn arc_step(&self) -> f32 {
        self.arc_step
    }

    fn set_color(&mut self, color: Rgb) {
        self.color = color;
    }

    fn set_pen_down(&mut self, down: bool) {
        self.down = down;
    }

    fn set_width(&mut self, width: u32) -> Result<()> {
        if width == 0 {
            return Err(Error::config("pen width must be at least 1"));
        }
        self.width = width;
        Ok(())
    }

    fn circle(&mut self, radius: f32) -> Result<()> {
        self.circle_arc(radius, 360.0)
    }
}
