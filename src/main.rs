use crate::app::App;
use crate::config::AppConfig;
use anyhow::Result;
use std::path::PathBuf;
use winit::event_loop::EventLoop;

mod app;
mod config;

fn main() -> Result<()> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let config_path = std::env::args_os().nth(1).map(PathBuf::from);
    let config = AppConfig::load(config_path.as_deref())?;

    let mut app = App::new(config);
    let event_loop = EventLoop::new()?;
    event_loop.run_app(&mut app)?;

    if let Some(code) = app.exit_code() {
        std::process::exit(code);
    }
    Ok(())
}
