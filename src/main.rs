use app::App;
use clap::Parser;
use cli::Cli;
use config::Config;
use error::Error;
use winit::event_loop::EventLoop;
use worker::Job;

mod app;
mod cli;
mod cmd;
mod color;
mod config;
mod error;
mod math;
mod pattern;
mod pen;
mod random;
mod worker;

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_module(env!("CARGO_CRATE_NAME"), log::LevelFilter::Debug)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    // Reject bad parameters before a window ever opens.
    let pattern = cli.command.pattern(&config);
    pattern.validate(config.pen.arc_step)?;

    let seed = cli.seed.unwrap_or_else(|| {
        let seed: u64 = rand::random();
        log::info!("no --seed given, using {seed}");
        seed
    });
    let job = Job {
        pattern,
        seed,
        color: config.pen.color,
        arc_step: config.pen.arc_step,
        step_delay: config.pen.step_delay(),
    };

    let event_loop = EventLoop::<cmd::Cmd>::with_user_event()
        .build()
        .map_err(|e| Error::surface(e.to_string()))?;
    let proxy = event_loop.create_proxy();

    let mut app = App::new(config.window, job, proxy);
    event_loop
        .run_app(&mut app)
        .map_err(|e| Error::surface(e.to_string()))?;
    app.finish()
}
