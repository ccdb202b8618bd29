pub mod overlay_pass;
pub mod pass;
pub mod scene_pass;
