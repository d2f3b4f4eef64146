//! Orbit camera with damped inertia.

use macroquad::prelude::*;

const MIN_DISTANCE: f32 = 5.0;
const MAX_DISTANCE: f32 = 50.0;
const MIN_PITCH: f32 = 0.03;
const MAX_PITCH: f32 = std::f32::consts::FRAC_PI_2 - 0.03;
const MAX_PAN: f32 = 18.0;
const ORBIT_SPEED: f32 = 0.005;
const PAN_SPEED: f32 = 0.03;
const ZOOM_STEP: f32 = 0.08;
// Fraction of velocity shed per 60 Hz frame once input stops.
const DAMPING: f32 = 0.05;

/// Left-drag orbits, right-drag pans, wheel zooms. Distance and
/// elevation are clamped so the view can never flip under the floor or
/// fly out of range; released drags coast and decay.
pub struct OrbitCamera {
    yaw: f32,
    pitch: f32,
    distance: f32,
    target: Vec3,
    yaw_vel: f32,
    pitch_vel: f32,
    zoom_vel: f32,
    last_mouse: Vec2,
    orbiting: bool,
    panning: bool,
}

impl OrbitCamera {
    pub fn new() -> Self {
        Self {
            yaw: 1.1,
            pitch: 0.5,
            distance: 26.0,
            target: Vec3::ZERO,
            yaw_vel: 0.0,
            pitch_vel: 0.0,
            zoom_vel: 0.0,
            last_mouse: Vec2::ZERO,
            orbiting: false,
            panning: false,
        }
    }

    /// Apply one tick of input and inertia. `ui_captured` suppresses
    /// drags that would start on a control surface.
    pub fn update(&mut self, dt: f32, ui_captured: bool) {
        let (mx, my) = mouse_position();
        let mouse = vec2(mx, my);

        if !ui_captured {
            let wheel = mouse_wheel().1;
            if wheel != 0.0 {
                self.zoom_vel -= wheel.signum() * ZOOM_STEP;
            }
            if is_mouse_button_pressed(MouseButton::Left) {
                self.orbiting = true;
                self.last_mouse = mouse;
            }
            if is_mouse_button_pressed(MouseButton::Right) {
                self.panning = true;
                self.last_mouse = mouse;
            }
        }
        if is_mouse_button_released(MouseButton::Left) {
            self.orbiting = false;
        }
        if is_mouse_button_released(MouseButton::Right) {
            self.panning = false;
        }

        if self.orbiting {
            let delta = mouse - self.last_mouse;
            self.last_mouse = mouse;
            self.yaw_vel = delta.x * ORBIT_SPEED;
            self.pitch_vel = delta.y * ORBIT_SPEED;
        } else if self.panning {
            let delta = mouse - self.last_mouse;
            self.last_mouse = mouse;
            let (right, up) = self.frame_axes();
            let scale = PAN_SPEED * (0.3 + self.distance / MAX_DISTANCE);
            self.target -= right * delta.x * scale;
            self.target += up * delta.y * scale;
            self.target = self.target.clamp_length_max(MAX_PAN);
        }

        self.yaw += self.yaw_vel;
        self.pitch = (self.pitch + self.pitch_vel).clamp(MIN_PITCH, MAX_PITCH);
        self.distance = (self.distance * (1.0 + self.zoom_vel)).clamp(MIN_DISTANCE, MAX_DISTANCE);

        let keep = (1.0 - DAMPING).powf(dt * 60.0);
        if !self.orbiting {
            self.yaw_vel *= keep;
            self.pitch_vel *= keep;
        }
        self.zoom_vel *= keep;
    }

    fn offset(&self) -> Vec3 {
        vec3(
            self.pitch.cos() * self.yaw.cos(),
            self.pitch.sin(),
            self.pitch.cos() * self.yaw.sin(),
        ) * self.distance
    }

    fn frame_axes(&self) -> (Vec3, Vec3) {
        let forward = -self.offset().normalize();
        let mut right = forward.cross(Vec3::Y);
        if right.length_squared() < 1e-8 {
            right = Vec3::X;
        }
        let right = right.normalize();
        let up = right.cross(forward).normalize();
        (right, up)
    }

    /// Projection parameters derive from the live screen size inside
    /// macroquad each frame, so a viewport resize needs no reset here.
    pub fn camera(&self) -> Camera3D {
        Camera3D {
            position: self.target + self.offset(),
            target: self.target,
            up: vec3(0.0, 1.0, 0.0),
            ..Default::default()
        }
    }
}
