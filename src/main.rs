use log::{error, info, LevelFilter};
use std::error::Error;

mod anim;
mod app;
mod config;
mod core;
mod screens;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(LevelFilter::Info)
        .filter_module("ridevis::core::gfx", LevelFilter::Info)
        .filter_module("ridevis::screens", LevelFilter::Debug)
        .init();

    info!("Application starting...");

    config::load();

    if let Err(e) = app::run() {
        error!("Application exited with error: {}", e);
        return Err(e);
    }

    info!("Application exited gracefully.");
    Ok(())
}
