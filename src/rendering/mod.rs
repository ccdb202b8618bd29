pub mod instance;
pub mod passes;
pub mod render_common;
pub mod render_model;
pub mod renderer;
pub mod scene_renderer;
pub mod texture;
pub mod ui_layer;
