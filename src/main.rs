use std::env;

use anyhow::bail;
use app::App;
use config::Config;

mod app;
mod canvas;
mod cmd;
mod config;
mod error;
mod input;
mod math;
mod raster;
mod view;

fn main() -> anyhow::Result<()> {
    env_logger::builder()
        .filter_module(env!("CARGO_CRATE_NAME"), log::LevelFilter::Debug)
        .parse_default_env()
        .init();

    if env::args_os().len() > 1 {
        bail!("usage: {}", env!("CARGO_PKG_NAME"));
    }

    let config = Config::builtin()?;

    let event_loop = winit::event_loop::EventLoop::new()?;
    let mut app = App::new(config);
    Ok(event_loop.run_app(&mut app)?)
}
