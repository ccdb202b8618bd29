use glam::{Vec2, Vec3};

use crate::camera::Camera;

const MIN_DISTANCE: f32 = 1.0;
const MAX_POLAR: f32 = std::f32::consts::PI - 0.01;

/// Orbit-style camera manipulation: left-drag rotates around `target`, scroll dollies.
///
/// Input is ignored entirely while `enabled` is false.
pub struct OrbitControls {
    pub enabled: bool,
    pub target: Vec3,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    attached: bool,
    dragging: bool,
    last_cursor: Option<Vec2>,
    pending_rotation: Vec2,
    pending_zoom: f32,
}

impl OrbitControls {
    pub fn new(target: Vec3) -> Self {
        Self {
            enabled: true,
            target,
            rotate_speed: 0.005,
            zoom_speed: 0.1,
            attached: false,
            dragging: false,
            last_cursor: None,
            pending_rotation: Vec2::ZERO,
            pending_zoom: 0.0,
        }
    }

    pub fn attach(&mut self) {
        self.attached = true;
    }

    pub fn detach(&mut self) {
        self.attached = false;
        self.dragging = false;
        self.last_cursor = None;
        self.pending_rotation = Vec2::ZERO;
        self.pending_zoom = 0.0;
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    fn accepts_input(&self) -> bool {
        self.attached && self.enabled
    }

    pub fn handle_button(&mut self, pressed: bool) {
        if !self.accepts_input() {
            return;
        }

        self.dragging = pressed;
        if !pressed {
            self.last_cursor = None;
        }
    }

    pub fn handle_cursor(&mut self, position: Vec2) {
        if !self.accepts_input() {
            return;
        }

        if self.dragging {
            if let Some(last) = self.last_cursor {
                self.pending_rotation += (position - last) * self.rotate_speed;
            }
        }
        self.last_cursor = Some(position);
    }

    pub fn handle_scroll(&mut self, lines: f32) {
        if !self.accepts_input() {
            return;
        }

        self.pending_zoom += lines;
    }

    /// Applies accumulated input to the camera.
    pub fn update(&mut self, camera: &mut Camera) {
        let rotation = std::mem::take(&mut self.pending_rotation);
        let zoom = std::mem::take(&mut self.pending_zoom);

        if !self.accepts_input() || (rotation == Vec2::ZERO && zoom == 0.0) {
            return;
        }

        let offset = camera.eye - self.target;
        let radius = offset.length();
        let mut azimuth = offset.x.atan2(offset.z);
        let mut polar = (offset.y / radius).clamp(-1.0, 1.0).acos();

        azimuth -= rotation.x;
        polar = (polar - rotation.y).clamp(0.01, MAX_POLAR);

        let radius = (radius * (1.0 - zoom * self.zoom_speed)).max(MIN_DISTANCE);

        let offset = Vec3::new(
            radius * polar.sin() * azimuth.sin(),
            radius * polar.cos(),
            radius * polar.sin() * azimuth.cos(),
        );

        camera.eye = self.target + offset;
        camera.target = self.target;
    }
}
