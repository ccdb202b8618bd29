use std::{f32::consts::PI, path::PathBuf};

use glam::Vec3;

const ASSET_DIR_ENV: &str = "PLUGOUT_ASSET_DIR";

#[derive(Debug, Clone)]
pub struct CameraConfig {
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub position: Vec3,
}

#[derive(Debug, Clone, Copy)]
pub struct DirectionalLightConfig {
    pub color: u32,
    pub intensity: f32,
    pub position: Vec3,
}

#[derive(Debug, Clone, Copy)]
pub struct SpotLightConfig {
    pub color: u32,
    pub intensity: f32,
    pub distance: f32,
    pub angle: f32,
    pub penumbra: f32,
    pub decay: f32,
    pub position: Vec3,
    pub target: Vec3,
}

#[derive(Debug, Clone)]
pub struct LightingConfig {
    pub directional: DirectionalLightConfig,
    pub ambient_intensity: f32,
    pub projector: SpotLightConfig,
    pub projector_ambient_intensity: f32,
}

/// Inclusive slider range plus step for one debug panel control.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlRange {
    pub min: f32,
    pub max: f32,
    pub step: f32,
}

impl ControlRange {
    pub const fn new(min: f32, max: f32, step: f32) -> Self {
        Self { min, max, step }
    }
}

#[derive(Debug, Clone)]
pub struct PanelConfig {
    pub folder: &'static str,
    pub intensity: ControlRange,
    pub position_x: ControlRange,
    pub position_y: ControlRange,
    pub position_z: ControlRange,
    pub angle: ControlRange,
    pub distance: ControlRange,
    pub penumbra: ControlRange,
}

/// Where a loaded model is put in the scene, and where along X it travels.
#[derive(Debug, Clone)]
pub struct Placement {
    pub path: PathBuf,
    pub scale: Vec3,
    pub rotation_y: f32,
    pub start: Vec3,
    pub end_x: f32,
}

#[derive(Debug, Clone)]
pub struct ViewConfig {
    /// Seconds between the fade starting and the fallback surface replacing the scene.
    pub fallback_delay: f64,
    /// Seconds the overlay takes to reach full opacity.
    pub fade_duration: f64,
    pub fallback_text: &'static str,
    pub start_label: &'static str,
}

#[derive(Debug, Clone)]
pub struct SceneConfig {
    pub asset_dir: PathBuf,
    pub camera: CameraConfig,
    pub lighting: LightingConfig,
    pub panel: PanelConfig,
    pub socket: Placement,
    pub plug: Placement,
    /// Seconds the connection animation runs for.
    pub animation_duration: f64,
    pub view: ViewConfig,
}

impl SceneConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Some(dir) = std::env::var_os(ASSET_DIR_ENV) {
            config.asset_dir = PathBuf::from(dir);
        }

        config
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            asset_dir: PathBuf::from("assets"),
            camera: CameraConfig {
                fov_y_degrees: 75.0,
                near: 0.1,
                far: 1000.0,
                position: Vec3::new(0.0, 0.0, 30.0),
            },
            lighting: LightingConfig {
                directional: DirectionalLightConfig {
                    color: 0xffffff,
                    intensity: 1.0,
                    position: Vec3::new(3.0, 3.0, 3.0),
                },
                ambient_intensity: 0.6,
                projector: SpotLightConfig {
                    color: 0xffffff,
                    intensity: 0.6,
                    distance: 300.0,
                    angle: PI / 6.0,
                    penumbra: 0.5,
                    decay: 1.0,
                    position: Vec3::new(0.0, 40.0, 50.0),
                    target: Vec3::ZERO,
                },
                projector_ambient_intensity: 0.15,
            },
            panel: PanelConfig {
                folder: "Projector Light",
                intensity: ControlRange::new(0.0, 2.0, 0.01),
                position_x: ControlRange::new(-100.0, 100.0, 1.0),
                position_y: ControlRange::new(0.0, 100.0, 1.0),
                position_z: ControlRange::new(-100.0, 100.0, 1.0),
                angle: ControlRange::new(0.1, PI / 2.0, 0.01),
                distance: ControlRange::new(0.0, 500.0, 1.0),
                penumbra: ControlRange::new(0.0, 1.0, 0.01),
            },
            socket: Placement {
                path: PathBuf::from("models/soket/scene.gltf"),
                scale: Vec3::new(99.7, 75.3, 58.1),
                rotation_y: PI / 2.0,
                start: Vec3::new(111.5, -1.6, 106.6),
                end_x: 120.0,
            },
            plug: Placement {
                path: PathBuf::from("models/plug2/PLUGmy_custom_3d_model.gltf"),
                scale: Vec3::ONE,
                rotation_y: 0.0,
                start: Vec3::new(-11.4, 0.0, -6.5),
                end_x: -26.2 + 11.4,
            },
            animation_duration: 2.0,
            view: ViewConfig {
                fallback_delay: 1.5,
                fade_duration: 1.2,
                fallback_text: "aaand here goes our main UI and stuff",
                start_label: "Start Animation",
            },
        }
    }
}

/// Splits a 0xRRGGBB colour into linear-ish RGB components in `0..=1`.
pub fn rgb(hex: u32) -> Vec3 {
    Vec3::new(
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    )
}
