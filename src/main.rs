use anyhow::Result;

mod animation;
mod assets;
mod camera;
mod config;
mod controls;
mod debug_panel;
mod host;
mod lights;
mod model;
mod rendering;
mod scene_graph;
mod session;
mod ui;
mod view;
mod window;

fn main() -> Result<()> {
    pretty_env_logger::init();

    pollster::block_on(window::run())?;

    Ok(())
}
