use std::{fmt, ops::RangeInclusive};

use crate::{
    color::{random_color, PALETTE},
    error::{Error, Result},
    pen::{arc_segments, Turtle},
    random::Entropy,
};

/// Absolute headings the random walk picks from.
pub const DIRECTIONS: [f32; 4] = [0.0, 90.0, 180.0, 270.0];

/// Number of dash periods along each side of the dashed square.
const DASHES_PER_SIDE: u32 = 10;

/// A drawing routine along with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Pattern {
    /// A ring of randomly coloured circles, rotated by `gap` degrees each.
    Spirograph { gap: f32, radius: f32, width: u32 },
    /// Randomly coloured segments along randomly chosen axis directions.
    RandomWalk {
        steps: u32,
        distance: f32,
        width: u32,
    },
    DashedSquare { side: f32, width: u32 },
    /// One regular polygon per side count, each in a colour from [`PALETTE`].
    Polygons {
        sides: RangeInclusive<u32>,
        side: f32,
        width: u32,
    },
}

impl Pattern {
    /// Checks every parameter, so a pattern that validates never fails halfway through.
    ///
    /// `arc_step` is the segment length circles will be drawn with.
    pub fn validate(&self, arc_step: f32) -> Result<()> {
        match self {
            Pattern::Spirograph { gap, radius, width } => {
                circle_count(*gap)?;
                finite("spirograph radius", *radius)?;
                arc_segments(*radius, 360.0, arc_step)?;
                positive_width(*width)
            }
            Pattern::RandomWalk {
                distance, width, ..
            } => {
                finite("random walk distance", *distance)?;
                positive_width(*width)
            }
            Pattern::DashedSquare { side, width } => {
                finite("dashed square side", *side)?;
                positive_width(*width)
            }
            Pattern::Polygons { sides, side, width } => {
                if *sides.start() < 3 {
                    return Err(Error::config(format!(
                        "a polygon needs at least 3 sides (got {})",
                        sides.start()
                    )));
                }
                if sides.is_empty() {
                    return Err(Error::config(format!(
                        "polygon side counts {}..={} are empty",
                        sides.start(),
                        sides.end()
                    )));
                }
                finite("polygon side", *side)?;
                positive_width(*width)
            }
        }
    }

    /// Validates, then issues the whole pattern to `pen`.
    pub fn draw(&self, pen: &mut impl Turtle, rng: &mut impl Entropy) -> Result<()> {
        self.validate(pen.arc_step())?;
        pen.set_pen_down(true);
        match self {
            Pattern::Spirograph { gap, radius, width } => {
                pen.set_width(*width)?;
                spirograph(pen, rng, *gap, *radius)
            }
            Pattern::RandomWalk {
                steps,
                distance,
                width,
            } => {
                pen.set_width(*width)?;
                random_walk(pen, rng, *steps, *distance)
            }
            Pattern::DashedSquare { side, width } => {
                pen.set_width(*width)?;
                dashed_square(pen, *side)
            }
            Pattern::Polygons { sides, side, width } => {
                pen.set_width(*width)?;
                polygons(pen, rng, sides.clone(), *side)
            }
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Spirograph { gap, radius, .. } => {
                write!(f, "spirograph (gap {gap}°, radius {radius})")
            }
            Pattern::RandomWalk {
                steps, distance, ..
            } => write!(f, "random walk ({steps} steps of {distance})"),
            Pattern::DashedSquare { side, .. } => write!(f, "dashed square (side {side})"),
            Pattern::Polygons { sides, side, .. } => write!(
                f,
                "polygons ({}..={} sides of {side})",
                sides.start(),
                sides.end()
            ),
        }
    }
}

fn finite(what: &str, value: f32) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(Error::config(format!("{what} must be finite (got {value})")))
    }
}

fn positive_width(width: u32) -> Result<()> {
    if width == 0 {
        return Err(Error::config("pen width must be at least 1"));
    }
    Ok(())
}

/// How many circles a spirograph with `gap` degrees between them draws.
pub fn circle_count(gap: f32) -> Result<u32> {
    if !(gap.is_finite() && gap > 0.0) {
        return Err(Error::config(format!(
            "spirograph gap must be a positive number of degrees (got {gap})"
        )));
    }
    Ok((360.0 / gap).floor() as u32)
}

/// Draws `floor(360 / gap)` circles, each in a fresh random colour, turning `gap` degrees
/// after each one.
pub fn spirograph(
    pen: &mut impl Turtle,
    rng: &mut impl Entropy,
    gap: f32,
    radius: f32,
) -> Result<()> {
    let count = circle_count(gap)?;
    finite("spirograph radius", radius)?;

    for _ in 0..count {
        pen.set_color(random_color(rng));
        pen.circle(radius)?;
        pen.turn(gap)?;
    }
    Ok(())
}

/// Draws `steps` segments of `distance`, each in a random colour and a random direction out
/// of [`DIRECTIONS`]. Segments are free to leave the visible canvas.
pub fn random_walk(
    pen: &mut impl Turtle,
    rng: &mut impl Entropy,
    steps: u32,
    distance: f32,
) -> Result<()> {
    finite("random walk distance", distance)?;

    for _ in 0..steps {
        pen.set_color(random_color(rng));
        pen.set_heading(*rng.choose(&DIRECTIONS))?;
        pen.forward(distance)?;
    }
    Ok(())
}

/// Draws a square turning clockwise, each side made of alternating dashes and gaps.
///
/// Every dash period moves half a period, lowers the pen, moves the other half and lifts it
/// again. The pen starts down, so the first half-period is drawn too.
pub fn dashed_square(pen: &mut impl Turtle, side: f32) -> Result<()> {
    finite("dashed square side", side)?;
    let half = side / (2 * DASHES_PER_SIDE) as f32;

    for _ in 0..4 {
        for _ in 0..DASHES_PER_SIDE {
            pen.forward(half)?;
            pen.set_pen_down(true);
            pen.forward(half)?;
            pen.set_pen_down(false);
        }
        pen.right(90.0)?;
    }
    Ok(())
}

/// Draws a regular polygon with `sides` sides, turning clockwise.
pub fn polygon(pen: &mut impl Turtle, sides: u32, side: f32) -> Result<()> {
    let angle = 360.0 / sides as f32;
    for _ in 0..sides {
        pen.forward(side)?;
        pen.right(angle)?;
    }
    Ok(())
}

/// Draws one polygon per side count in `sides`, all sharing the starting corner.
pub fn polygons(
    pen: &mut impl Turtle,
    rng: &mut impl Entropy,
    sides: RangeInclusive<u32>,
    side: f32,
) -> Result<()> {
    finite("polygon side", side)?;
    if *sides.start() < 3 {
        return Err(Error::config("a polygon needs at least 3 sides"));
    }

    for n in sides {
        pen.set_color(*rng.choose(&PALETTE));
        polygon(pen, n, side)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cmd::Cmd,
        color::Rgb,
        math::{vec2, Vec2f},
        pen::{normalize_heading, Pen, DEFAULT_ARC_STEP, MAX_ARC_SEGMENTS},
        random::{RngSource, Scripted},
    };

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Op {
        Forward(f32),
        Turn(f32),
        SetHeading(f32),
        Color(Rgb),
        PenDown(bool),
        Width(u32),
        Circle(f32),
    }

    /// Records every call without drawing anything.
    #[derive(Default)]
    struct Recorder {
        ops: Vec<Op>,
        heading: f32,
    }

    impl Recorder {
        fn count(&self, pred: impl Fn(&Op) -> bool) -> usize {
            self.ops.iter().filter(|op| pred(op)).count()
        }

        fn total_turn(&self) -> f32 {
            self.ops
                .iter()
                .filter_map(|op| match op {
                    Op::Turn(d) => Some(*d),
                    _ => None,
                })
                .sum()
        }
    }

    impl Turtle for Recorder {
        fn forward(&mut self, distance: f32) -> Result<()> {
            self.ops.push(Op::Forward(distance));
            Ok(())
        }

        fn turn(&mut self, degrees: f32) -> Result<()> {
            self.heading = normalize_heading(self.heading + degrees);
            self.ops.push(Op::Turn(degrees));
            Ok(())
        }

        fn set_heading(&mut self, degrees: f32) -> Result<()> {
            self.heading = normalize_heading(degrees);
            self.ops.push(Op::SetHeading(degrees));
            Ok(())
        }

        fn heading(&self) -> f32 {
            self.heading
        }

        fn arc_step(&self) -> f32 {
            DEFAULT_ARC_STEP
        }

        fn set_color(&mut self, color: Rgb) {
            self.ops.push(Op::Color(color));
        }

        fn set_pen_down(&mut self, down: bool) {
            self.ops.push(Op::PenDown(down));
        }

        fn set_width(&mut self, width: u32) -> Result<()> {
            self.ops.push(Op::Width(width));
            Ok(())
        }

        fn circle(&mut self, radius: f32) -> Result<()> {
            self.ops.push(Op::Circle(radius));
            Ok(())
        }
    }

    #[test]
    fn spirograph_circle_count_and_total_turn() {
        for gap in [0.5, 1.0, 7.0, 10.0, 45.0, 90.0, 100.0, 250.0, 360.0] {
            let mut rec = Recorder::default();
            spirograph(&mut rec, &mut RngSource::seeded(3), gap, 100.0).unwrap();

            let expected = (360.0 / gap).floor() as usize;
            assert_eq!(rec.count(|op| matches!(op, Op::Circle(_))), expected, "gap {gap}");
            assert_eq!(rec.count(|op| matches!(op, Op::Color(_))), expected);
            assert_eq!(rec.total_turn(), expected as f32 * gap, "gap {gap}");
        }
    }

    #[test]
    fn spirograph_order_is_color_circle_turn() {
        let mut rec = Recorder::default();
        spirograph(&mut rec, &mut Scripted::new([9]), 120.0, 100.0).unwrap();
        let step = [
            Op::Color(Rgb::new(9, 9, 9)),
            Op::Circle(100.0),
            Op::Turn(120.0),
        ];
        assert_eq!(rec.ops, step.repeat(3));
    }

    #[test]
    fn spirograph_rejects_non_positive_gap() {
        for gap in [0.0, -10.0, f32::NAN, f32::NEG_INFINITY] {
            let mut rec = Recorder::default();
            let res = spirograph(&mut rec, &mut RngSource::seeded(0), gap, 100.0);
            assert!(matches!(res, Err(Error::Config(_))), "gap {gap}");
            assert!(rec.ops.is_empty());
        }
    }

    #[test]
    fn spirograph_ten_degrees_comes_full_circle() {
        let mut rec = Recorder::default();
        spirograph(&mut rec, &mut RngSource::seeded(1), 10.0, 100.0).unwrap();
        assert_eq!(rec.count(|op| matches!(op, Op::Circle(_))), 36);

        let mut pen = Pen::new(Vec::<Cmd>::new());
        spirograph(&mut pen, &mut RngSource::seeded(1), 10.0, 100.0).unwrap();
        assert_eq!(pen.heading(), 0.0);
        assert_eq!(pen.position(), vec2(0.0, 0.0));
    }

    #[test]
    fn spirograph_forty_five_degrees() {
        let mut rec = Recorder::default();
        spirograph(&mut rec, &mut RngSource::seeded(2), 45.0, 100.0).unwrap();
        assert_eq!(rec.count(|op| matches!(op, Op::Circle(_))), 8);
        assert_eq!(rec.heading(), 0.0);

        let mut pen = Pen::new(Vec::<Cmd>::new());
        spirograph(&mut pen, &mut RngSource::seeded(2), 45.0, 100.0).unwrap();
        assert_eq!(pen.heading(), 0.0);
    }

    #[test]
    fn random_walk_steps_and_directions() {
        let mut rec = Recorder::default();
        random_walk(&mut rec, &mut RngSource::seeded(42), 100, 30.0).unwrap();

        assert_eq!(rec.count(|op| *op == Op::Forward(30.0)), 100);
        assert_eq!(rec.count(|op| matches!(op, Op::Forward(_))), 100);
        assert_eq!(rec.count(|op| matches!(op, Op::Turn(_))), 0);
        let headings: Vec<f32> = rec
            .ops
            .iter()
            .filter_map(|op| match op {
                Op::SetHeading(h) => Some(*h),
                _ => None,
            })
            .collect();
        assert_eq!(headings.len(), 100);
        assert!(headings.iter().all(|h| DIRECTIONS.contains(h)));
    }

    #[test]
    fn random_walk_never_leaves_the_axis_directions() {
        // Every possible index draw, repeated for many seeds.
        for seed in 0..50 {
            let mut rec = Recorder::default();
            random_walk(&mut rec, &mut RngSource::seeded(seed), 100, 30.0).unwrap();
            assert!(rec.ops.iter().all(|op| match op {
                Op::SetHeading(h) => DIRECTIONS.contains(h),
                _ => true,
            }));
        }
    }

    #[test]
    fn scripted_random_walk_is_reproducible() {
        // Each step draws r, g, b and then a direction index.
        let script = [
            10, 20, 30, 0, //
            10, 20, 30, 1, //
            10, 20, 30, 2, //
            10, 20, 30, 3, //
            10, 20, 30, 0, //
            10, 20, 30, 0,
        ];
        let mut pen = Pen::new(Vec::<Cmd>::new());
        random_walk(&mut pen, &mut Scripted::new(script), 6, 30.0).unwrap();

        let trail: Vec<(Vec2f, f32)> = pen
            .into_surface()
            .into_iter()
            .filter_map(|cmd| match cmd {
                Cmd::Segment { color, .. } => {
                    assert_eq!(color, Rgb::new(10, 20, 30));
                    None
                }
                Cmd::Cursor { position, heading } => Some((position, heading)),
                Cmd::Finished => None,
            })
            .collect();

        // Each step reports the new heading, then the new position.
        let after_moves: Vec<(Vec2f, f32)> = trail.chunks(2).map(|pair| pair[1]).collect();
        assert_eq!(
            after_moves,
            [
                (vec2(30.0, 0.0), 0.0),
                (vec2(30.0, 30.0), 90.0),
                (vec2(0.0, 30.0), 180.0),
                (vec2(0.0, 0.0), 270.0),
                (vec2(30.0, 0.0), 0.0),
                (vec2(60.0, 0.0), 0.0),
            ]
        );
    }

    #[test]
    fn dashed_square_returns_home() {
        let mut pen = Pen::new(Vec::<Cmd>::new());
        dashed_square(&mut pen, 200.0).unwrap();
        assert_eq!(pen.position(), vec2(0.0, 0.0));
        assert_eq!(pen.heading(), 0.0);
        assert!(!pen.is_down());

        let segments = pen
            .into_surface()
            .iter()
            .filter(|cmd| matches!(cmd, Cmd::Segment { .. }))
            .count();
        // 10 dashes per side, plus the leading half-period drawn while the pen starts down.
        assert_eq!(segments, 41);
    }

    #[test]
    fn polygons_pick_from_palette() {
        let mut rec = Recorder::default();
        polygons(&mut rec, &mut Scripted::new([0, 1, 2, 3]), 3..=10, 50.0).unwrap();

        let colors: Vec<Rgb> = rec
            .ops
            .iter()
            .filter_map(|op| match op {
                Op::Color(c) => Some(*c),
                _ => None,
            })
            .collect();
        assert_eq!(colors.len(), 8);
        assert_eq!(colors[..4], PALETTE);
        assert_eq!(colors[4..], PALETTE);

        // 3 + 4 + ... + 10 sides.
        assert_eq!(rec.count(|op| *op == Op::Forward(50.0)), 52);
        assert!((rec.total_turn() + 8.0 * 360.0).abs() < 1e-2);
    }

    #[test]
    fn triangle_closes() {
        let mut pen = Pen::new(Vec::<Cmd>::new());
        polygon(&mut pen, 3, 50.0).unwrap();
        assert!(pen.position().dist(vec2(0.0, 0.0)) < 1e-3);
        assert_eq!(pen.heading(), 0.0);
    }

    #[test]
    fn validate_rejects_bad_parameters() {
        let bad = [
            Pattern::Spirograph {
                gap: 0.0,
                radius: 100.0,
                width: 1,
            },
            Pattern::Spirograph {
                gap: 10.0,
                radius: f32::INFINITY,
                width: 1,
            },
            Pattern::Spirograph {
                gap: 10.0,
                radius: 1e30,
                width: 1,
            },
            Pattern::RandomWalk {
                steps: 100,
                distance: 30.0,
                width: 0,
            },
            Pattern::Polygons {
                sides: 2..=5,
                side: 50.0,
                width: 1,
            },
            Pattern::Polygons {
                sides: 6..=5,
                side: 50.0,
                width: 1,
            },
        ];
        for pattern in bad {
            let mut rec = Recorder::default();
            let res = pattern.draw(&mut rec, &mut RngSource::seeded(0));
            assert!(matches!(res, Err(Error::Config(_))), "{pattern:?}");
            assert!(rec.ops.is_empty(), "{pattern:?} drew before failing");
        }
    }

    #[test]
    fn spirograph_radius_limit_follows_arc_step() {
        let radius = MAX_ARC_SEGMENTS as f32 * DEFAULT_ARC_STEP;
        let pattern = Pattern::Spirograph {
            gap: 10.0,
            radius,
            width: 1,
        };
        assert!(matches!(
            pattern.validate(DEFAULT_ARC_STEP),
            Err(Error::Config(_))
        ));
        // A coarser tessellation brings the same circle back under the limit.
        pattern.validate(DEFAULT_ARC_STEP * 10.0).unwrap();
    }

    #[test]
    fn draw_sets_width_first() {
        let pattern = Pattern::RandomWalk {
            steps: 2,
            distance: 30.0,
            width: 15,
        };
        let mut rec = Recorder::default();
        pattern.draw(&mut rec, &mut RngSource::seeded(0)).unwrap();
        assert_eq!(rec.ops[..2], [Op::PenDown(true), Op::Width(15)]);
        assert_eq!(rec.count(|op| matches!(op, Op::Forward(_))), 2);
    }
}
