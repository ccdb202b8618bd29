use glam::Vec3;

use crate::config::{rgb, LightingConfig, SpotLightConfig};

#[derive(Debug, Clone, Copy)]
pub struct DirectionalLight {
    pub color: Vec3,
    pub intensity: f32,
    /// Shines from here towards the origin.
    pub position: Vec3,
}

#[derive(Debug, Clone, Copy)]
pub struct AmbientLight {
    pub color: Vec3,
    pub intensity: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpotLight {
    pub color: Vec3,
    pub intensity: f32,
    pub position: Vec3,
    pub target: Vec3,
    /// Half-angle of the cone in radians.
    pub angle: f32,
    /// Range of the light; zero means unlimited.
    pub distance: f32,
    pub penumbra: f32,
    pub decay: f32,
}

impl SpotLight {
    pub fn from_config(config: &SpotLightConfig) -> Self {
        Self {
            color: rgb(config.color),
            intensity: config.intensity,
            position: config.position,
            target: config.target,
            angle: config.angle,
            distance: config.distance,
            penumbra: config.penumbra,
            decay: config.decay,
        }
    }
}

/// Every light in the scene: the general fill lights and the projector pair.
#[derive(Debug, Clone)]
pub struct Lights {
    pub directional: DirectionalLight,
    pub ambient: AmbientLight,
    pub projector: SpotLight,
    pub projector_ambient: AmbientLight,
}

impl Lights {
    pub fn from_config(config: &LightingConfig) -> Self {
        let white = rgb(0xffffff);

        Self {
            directional: DirectionalLight {
                color: rgb(config.directional.color),
                intensity: config.directional.intensity,
                position: config.directional.position,
            },
            ambient: AmbientLight {
                color: white,
                intensity: config.ambient_intensity,
            },
            projector: SpotLight::from_config(&config.projector),
            projector_ambient: AmbientLight {
                color: white,
                intensity: config.projector_ambient_intensity,
            },
        }
    }

    fn total_ambient(&self) -> Vec3 {
        self.ambient.color * self.ambient.intensity
            + self.projector_ambient.color * self.projector_ambient.intensity
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable, Default)]
pub struct LightsUniform {
    /// xyz: unit vector towards the light, w: unused.
    directional_direction: [f32; 4],
    directional_color: [f32; 4],
    ambient: [f32; 4],
    /// xyz: position, w: range (0 = unlimited).
    spot_position: [f32; 4],
    /// xyz: unit vector the cone points along, w: decay.
    spot_direction: [f32; 4],
    spot_color: [f32; 4],
    /// x: cos of outer angle, y: cos of inner angle.
    spot_cone: [f32; 4],
}

impl LightsUniform {
    pub fn update(&mut self, lights: &Lights) {
        let directional = &lights.directional;
        let spot = &lights.projector;

        self.directional_direction = directional.position.normalize_or_zero().extend(0.0).into();
        self.directional_color = (directional.color * directional.intensity)
            .extend(1.0)
            .into();
        self.ambient = lights.total_ambient().extend(1.0).into();

        self.spot_position = spot.position.extend(spot.distance).into();
        self.spot_direction = (spot.target - spot.position)
            .normalize_or_zero()
            .extend(spot.decay)
            .into();
        self.spot_color = (spot.color * spot.intensity).extend(1.0).into();

        let (outer, inner) = spot_cone_cosines(spot.angle, spot.penumbra);
        self.spot_cone = [outer, inner, 0.0, 0.0];
    }
}

/// Cosines of the outer cone edge and of the fully lit inner cone.
pub fn spot_cone_cosines(angle: f32, penumbra: f32) -> (f32, f32) {
    let outer = angle.cos();
    let inner = (angle * (1.0 - penumbra)).cos();
    (outer, inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SceneConfig;

    #[test]
    fn ambient_lights_add_up() {
        let lights = Lights::from_config(&SceneConfig::default().lighting);
        assert!((lights.total_ambient().x - 0.75).abs() < 1e-6);
    }

    #[test]
    fn penumbra_widens_the_soft_edge() {
        let (outer, hard) = spot_cone_cosines(0.5, 0.0);
        assert_eq!(outer, hard);

        let (outer, soft) = spot_cone_cosines(0.5, 0.5);
        assert!(soft > outer);
    }

    #[test]
    fn spot_points_from_position_to_target() {
        let lights = Lights::from_config(&SceneConfig::default().lighting);
        let mut uniform = LightsUniform::default();
        uniform.update(&lights);

        let expected = (Vec3::ZERO - Vec3::new(0.0, 40.0, 50.0)).normalize();
        let [x, y, z, decay] = uniform.spot_direction;
        assert!((Vec3::new(x, y, z) - expected).length() < 1e-6);
        assert_eq!(decay, 1.0);
        assert_eq!(uniform.spot_position[3], 300.0);
    }
}
