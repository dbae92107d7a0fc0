use crate::{color::Rgb, math::Vec2f};

/// What the pen tells the surface to render.
///
/// Positions are in turtle coordinates: origin at the canvas centre, y pointing up.
#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    /// A straight line drawn with the pen down.
    Segment {
        from: Vec2f,
        to: Vec2f,
        color: Rgb,
        width: u32,
    },

    /// The pen moved or turned.
    Cursor { position: Vec2f, heading: f32 },

    /// The pattern is complete; the surface now waits for a click.
    Finished,
}
