use glam::{Mat4, Vec3};

/// Camera circling the origin at a fixed height.
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub radius: f32,
    pub height: f32,
    /// Orbit time in seconds; one radian of orbit every four seconds.
    pub time: f32,
    pub paused: bool,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            fov_y_degrees: 80.0,
            near: 0.1,
            far: 256.0,
            radius: 3.0,
            height: 2.0,
            time: 0.0,
            paused: false,
        }
    }
}

impl OrbitCamera {
    const MIN_RADIUS: f32 = 0.25;
    const MAX_RADIUS: f32 = 128.0;
    const ZOOM_PER_LINE: f32 = 0.9;

    pub fn advance(&mut self, dt: f32) {
        if !self.paused {
            self.time += dt;
        }
    }

    /// Scroll up moves closer.
    pub fn zoom(&mut self, wheel_lines: f32) {
        if wheel_lines == 0.0 {
            return;
        }
        self.radius = (self.radius * Self::ZOOM_PER_LINE.powf(wheel_lines))
            .clamp(Self::MIN_RADIUS, Self::MAX_RADIUS);
    }

    pub fn eye(&self) -> Vec3 {
        let angle = self.time / 4.0;
        Vec3::new(
            self.radius * angle.cos(),
            self.height,
            -self.radius * angle.sin(),
        )
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), Vec3::ZERO, Vec3::Y)
    }

    pub fn projection(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_degrees.to_radians(),
            aspect.max(f32::EPSILON),
            self.near,
            self.far,
        )
    }
}
