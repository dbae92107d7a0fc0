use std::{
    panic::{catch_unwind, AssertUnwindSafe},
    process, thread,
    time::Duration,
};

use winit::event_loop::EventLoopProxy;

use crate::{
    cmd::Cmd,
    color::Rgb,
    error::{Error, Result},
    pattern::Pattern,
    pen::{Pen, Surface, Turtle},
    random::RngSource,
};

/// Everything the drawing thread needs to produce one pattern.
#[derive(Debug, Clone)]
pub struct Job {
    pub pattern: Pattern,
    pub seed: u64,
    pub color: Rgb,
    pub arc_step: f32,
    pub step_delay: Duration,
}

/// Forwards pen commands to the event loop, pacing segments by `step_delay`.
struct ProxySurface {
    proxy: EventLoopProxy<Cmd>,
    step_delay: Duration,
}

impl Surface for ProxySurface {
    fn submit(&mut self, cmd: Cmd) -> Result<()> {
        let pace = matches!(cmd, Cmd::Segment { .. }) && !self.step_delay.is_zero();
        self.proxy
            .send_event(cmd)
            .map_err(|_| Error::surface("window closed while drawing"))?;
        if pace {
            thread::sleep(self.step_delay);
        }
        Ok(())
    }
}

/// Draws `job` on a background thread, streaming commands to the event loop behind `proxy`.
pub fn spawn(job: Job, proxy: EventLoopProxy<Cmd>) {
    thread::spawn(move || {
        wrap(move || {
            let step_delay = job.step_delay;
            run(&job, ProxySurface { proxy, step_delay })
        })
    });
}

fn wrap(f: impl FnOnce() -> Result<()>) {
    let res = catch_unwind(AssertUnwindSafe(f));
    match res {
        Ok(Ok(())) => {}
        Ok(Err(Error::SurfaceUnavailable(e))) => {
            log::debug!("drawing stopped: {e}");
        }
        Ok(Err(e)) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
        Err(_panic) => {
            // Panic message and backtrace are printed by the default panic hook.
            eprintln!("drawing thread panicked, exiting");
            process::exit(101);
        }
    }
}

/// Draws the whole pattern onto `surface` and reports completion.
pub fn run<S: Surface>(job: &Job, surface: S) -> Result<()> {
    let mut pen = Pen::new(surface).with_arc_step(job.arc_step)?;
    pen.set_color(job.color);
    let mut rng = RngSource::seeded(job.seed);

    job.pattern.draw(&mut pen, &mut rng)?;
    log::info!(
        "finished drawing {}, pen at {:?}",
        job.pattern,
        pen.position()
    );

    pen.surface_mut().submit(Cmd::Finished)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(pattern: Pattern, seed: u64) -> Job {
        Job {
            pattern,
            seed,
            color: Rgb::BLACK,
            arc_step: 2.0,
            step_delay: Duration::ZERO,
        }
    }

    #[test]
    fn finishes_after_the_last_segment() {
        let job = job(
            Pattern::RandomWalk {
                steps: 100,
                distance: 30.0,
                width: 15,
            },
            5,
        );
        let mut cmds = Vec::<Cmd>::new();
        run(&job, &mut cmds).unwrap();

        assert_eq!(cmds.last(), Some(&Cmd::Finished));
        let segments: Vec<_> = cmds
            .iter()
            .filter_map(|cmd| match cmd {
                Cmd::Segment { from, to, width, .. } => Some((from.dist(*to), *width)),
                _ => None,
            })
            .collect();
        assert_eq!(segments.len(), 100);
        assert!(segments.iter().all(|&(len, width)| len == 30.0 && width == 15));
    }

    #[test]
    fn same_seed_same_drawing() {
        let job = job(
            Pattern::Spirograph {
                gap: 30.0,
                radius: 50.0,
                width: 1,
            },
            99,
        );
        let (mut a, mut b) = (Vec::<Cmd>::new(), Vec::<Cmd>::new());
        run(&job, &mut a).unwrap();
        run(&job, &mut b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_pattern_draws_nothing() {
        let job = job(
            Pattern::Spirograph {
                gap: -1.0,
                radius: 100.0,
                width: 1,
            },
            0,
        );
        let mut cmds = Vec::<Cmd>::new();
        assert!(matches!(run(&job, &mut cmds), Err(Error::Config(_))));
        assert!(cmds.is_empty());
    }

    #[test]
    fn initial_color_reaches_dashed_square() {
        let mut job = job(
            Pattern::DashedSquare {
                side: 200.0,
                width: 3,
            },
            0,
        );
        job.color = Rgb::new(12, 34, 56);
        let mut cmds = Vec::<Cmd>::new();
        run(&job, &mut cmds).unwrap();
        assert!(cmds.iter().all(|cmd| match cmd {
            Cmd::Segment { color, width, .. } => *color == Rgb::new(12, 34, 56) && *width == 3,
            _ => true,
        }));
    }
}
