use crate::config::{ControlRange, PanelConfig};
use crate::lights::SpotLight;

/// A spotlight property a panel control writes through to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpotProperty {
    Intensity,
    PositionX,
    PositionY,
    PositionZ,
    Angle,
    Distance,
    Penumbra,
}

impl SpotProperty {
    pub fn get(self, light: &SpotLight) -> f32 {
        match self {
            SpotProperty::Intensity => light.intensity,
            SpotProperty::PositionX => light.position.x,
            SpotProperty::PositionY => light.position.y,
            SpotProperty::PositionZ => light.position.z,
            SpotProperty::Angle => light.angle,
            SpotProperty::Distance => light.distance,
            SpotProperty::Penumbra => light.penumbra,
        }
    }

    fn set(self, light: &mut SpotLight, value: f32) {
        match self {
            SpotProperty::Intensity => light.intensity = value,
            SpotProperty::PositionX => light.position.x = value,
            SpotProperty::PositionY => light.position.y = value,
            SpotProperty::PositionZ => light.position.z = value,
            SpotProperty::Angle => light.angle = value,
            SpotProperty::Distance => light.distance = value,
            SpotProperty::Penumbra => light.penumbra = value,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NumericControl {
    pub label: &'static str,
    pub property: SpotProperty,
    pub range: ControlRange,
}

impl NumericControl {
    /// Clamps into range and snaps to the nearest step counted from `min`.
    pub fn quantize(&self, value: f32) -> f32 {
        let ControlRange { min, max, step } = self.range;
        let clamped = value.clamp(min, max);

        if step <= 0.0 {
            return clamped;
        }

        let snapped = min + ((clamped - min) / step).round() * step;
        snapped.clamp(min, max)
    }
}

/// Live-editing panel for the projector light. Owned by one session and disposed with it.
pub struct DebugPanel {
    pub title: &'static str,
    pub open: bool,
    controls: Vec<NumericControl>,
    disposed: bool,
}

impl DebugPanel {
    pub fn for_projector(config: &PanelConfig) -> Self {
        let control = |label, property, range| NumericControl {
            label,
            property,
            range,
        };

        let controls = vec![
            control("Intensity", SpotProperty::Intensity, config.intensity),
            control("X", SpotProperty::PositionX, config.position_x),
            control("Y", SpotProperty::PositionY, config.position_y),
            control("Z", SpotProperty::PositionZ, config.position_z),
            control("Angle", SpotProperty::Angle, config.angle),
            control("Distance", SpotProperty::Distance, config.distance),
            control("Penumbra", SpotProperty::Penumbra, config.penumbra),
        ];

        Self {
            title: config.folder,
            open: true,
            controls,
            disposed: false,
        }
    }

    pub fn controls(&self) -> &[NumericControl] {
        &self.controls
    }

    /// Writes an edited value straight into the live light.
    ///
    /// Returns the value actually applied, or `None` once the panel is disposed.
    pub fn apply(&self, index: usize, value: f32, light: &mut SpotLight) -> Option<f32> {
        if self.disposed {
            return None;
        }

        let control = self.controls.get(index)?;
        let value = control.quantize(value);
        control.property.set(light, value);
        Some(value)
    }

    pub fn dispose(&mut self) {
        if !self.disposed {
            log::debug!("Disposing debug panel '{}'", self.title);
        }
        self.disposed = true;
        self.open = false;
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}
