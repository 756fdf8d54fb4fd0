//! Camera state and the flag-driven movement controller.

use std::fmt;

use glam::{Mat4, Vec3};

use crate::config::CameraConfig;
use crate::gfx::TextureFormat;

/// Length of the per-frame input vector. Slots 6..10 are reserved and inert.
pub const INPUT_FLAG_COUNT: usize = 10;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum InputFlag {
    Forward,
    StrafeLeft,
    Back,
    StrafeRight,
    Up,
    Down,
    YawLeft,
    YawRight,
    PitchUp,
    PitchDown,
}

impl InputFlag {
    pub const ALL: [InputFlag; INPUT_FLAG_COUNT] = [
        InputFlag::Forward,
        InputFlag::StrafeLeft,
        InputFlag::Back,
        InputFlag::StrafeRight,
        InputFlag::Up,
        InputFlag::Down,
        InputFlag::YawLeft,
        InputFlag::YawRight,
        InputFlag::PitchUp,
        InputFlag::PitchDown,
    ];

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Unit translation for a movement flag; `None` for the rotation slots.
    pub fn axis(self) -> Option<Vec3> {
        match self {
            InputFlag::Forward => Some(Vec3::Z),
            InputFlag::StrafeLeft => Some(Vec3::NEG_X),
            InputFlag::Back => Some(Vec3::NEG_Z),
            InputFlag::StrafeRight => Some(Vec3::X),
            InputFlag::Up => Some(Vec3::Y),
            InputFlag::Down => Some(Vec3::NEG_Y),
            InputFlag::YawLeft | InputFlag::YawRight | InputFlag::PitchUp | InputFlag::PitchDown => {
                None
            }
        }
    }
}

/// Input vector had the wrong number of flags.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct InputError {
    pub expected: usize,
    pub actual: usize,
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "input vector has {} flags, expected exactly {}",
            self.actual, self.expected
        )
    }
}

impl std::error::Error for InputError {}

/// A validated input vector.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct MovementInput([bool; INPUT_FLAG_COUNT]);

impl MovementInput {
    pub fn from_flags(flags: &[InputFlag]) -> Self {
        let mut out = Self::default();
        for f in flags {
            out.0[f.index()] = true;
        }
        out
    }

    pub fn is_active(&self, flag: InputFlag) -> bool {
        self.0[flag.index()]
    }

    pub fn as_slice(&self) -> &[bool] {
        &self.0
    }

    /// Sum of the active flags' axes scaled by `dt`.
    ///
    /// Not normalised: two axes held together move `sqrt(2)` times faster.
    pub fn translation(&self, dt: f32) -> Vec3 {
        InputFlag::ALL
            .into_iter()
            .filter(|f| self.is_active(*f))
            .filter_map(InputFlag::axis)
            .fold(Vec3::ZERO, |acc, axis| acc + axis * dt)
    }
}

impl TryFrom<&[bool]> for MovementInput {
    type Error = InputError;

    fn try_from(flags: &[bool]) -> Result<Self, Self::Error> {
        let array: [bool; INPUT_FLAG_COUNT] = flags.try_into().map_err(|_| InputError {
            expected: INPUT_FLAG_COUNT,
            actual: flags.len(),
        })?;
        Ok(Self(array))
    }
}

/// Elapsed and total seconds from the frame timer.
#[derive(Debug, Copy, Clone, Default, PartialEq)]
pub struct FrameTiming {
    pub elapsed_seconds: f64,
    pub total_seconds: f64,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub look_at: Vec3,
    pub up: Vec3,
}

impl Camera {
    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            eye: Vec3::from_array(config.eye),
            look_at: Vec3::from_array(config.look_at),
            up: Vec3::from_array(config.up),
        }
    }

    /// Moves eye and target together; the view direction is unchanged.
    pub fn translate(&mut self, delta: Vec3) {
        self.eye += delta;
        self.look_at += delta;
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_lh(self.eye, self.look_at, self.up)
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

/// Integrates input flags into camera translation.
#[derive(Debug, Clone)]
pub struct CameraController {
    camera: Camera,
}

impl CameraController {
    pub fn new(camera: Camera) -> Self {
        Self { camera }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Applies one frame of input. Rejects a malformed vector before moving.
    pub fn advance(&mut self, flags: &[bool], dt: f32) -> Result<Vec3, InputError> {
        let input = MovementInput::try_from(flags)?;
        let delta = input.translation(dt);
        self.camera.translate(delta);
        Ok(delta)
    }
}

/// Lens parameters for the window-size dependent projection.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Lens {
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
}

impl Lens {
    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            fov_y_degrees: config.fov_y_degrees,
            near: config.near,
            far: config.far,
        }
    }

    /// Left-handed perspective, followed by the display orientation transform.
    pub fn projection(&self, output: &OutputInfo) -> Mat4 {
        let aspect = output.aspect_ratio();
        let mut fov = self.fov_y_degrees.to_radians();
        // Portrait outputs widen the vertical FOV so the scene still fits.
        if aspect < 1.0 {
            fov *= 2.0;
        }
        output.orientation * Mat4::perspective_lh(fov, aspect, self.near, self.far)
    }
}

/// Output surface properties supplied by the windowing side.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct OutputInfo {
    pub width: u32,
    pub height: u32,
    /// Back-buffer format; the underwater render target matches it.
    pub format: TextureFormat,
    pub orientation: Mat4,
}

impl OutputInfo {
    pub fn new(width: u32, height: u32, format: TextureFormat) -> Self {
        Self {
            width,
            height,
            format,
            orientation: Mat4::IDENTITY,
        }
    }

    pub fn aspect_ratio(&self) -> f32 {
        self.width.max(1) as f32 / self.height.max(1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(active: &[usize]) -> Vec<bool> {
        let mut v = vec![false; INPUT_FLAG_COUNT];
        for &i in active {
            v[i] = true;
        }
        v
    }

    #[test]
    fn forward_for_half_a_second_moves_half_a_unit_each_call() {
        let mut ctl = CameraController::new(Camera::default());
        let start = *ctl.camera();

        ctl.advance(&flags(&[0]), 0.5).unwrap();
        assert_eq!(ctl.camera().eye, start.eye + Vec3::new(0.0, 0.0, 0.5));
        assert_eq!(ctl.camera().look_at, start.look_at + Vec3::new(0.0, 0.0, 0.5));

        ctl.advance(&flags(&[0]), 0.5).unwrap();
        assert_eq!(ctl.camera().eye, start.eye + Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn opposite_flags_cancel_and_diagonals_are_not_normalised() {
        let input = MovementInput::try_from(flags(&[0, 2]).as_slice()).unwrap();
        assert_eq!(input.translation(1.0), Vec3::ZERO);

        let diagonal = MovementInput::from_flags(&[InputFlag::Forward, InputFlag::StrafeRight]);
        let d = diagonal.translation(1.0);
        assert_eq!(d, Vec3::new(1.0, 0.0, 1.0));
        assert!((d.length() - 2f32.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn each_movement_flag_maps_to_its_axis() {
        let expected = [
            Vec3::Z,
            Vec3::NEG_X,
            Vec3::NEG_Z,
            Vec3::X,
            Vec3::Y,
            Vec3::NEG_Y,
        ];
        for (i, axis) in expected.into_iter().enumerate() {
            let input = MovementInput::try_from(flags(&[i]).as_slice()).unwrap();
            assert_eq!(input.translation(2.0), axis * 2.0, "flag {i}");
        }
    }

    #[test]
    fn rotation_slots_are_inert() {
        let mut ctl = CameraController::new(Camera::default());
        let start = *ctl.camera();
        let delta = ctl.advance(&flags(&[6, 7, 8, 9]), 1.0).unwrap();
        assert_eq!(delta, Vec3::ZERO);
        assert_eq!(*ctl.camera(), start);
    }

    #[test]
    fn wrong_length_is_rejected_without_moving() {
        let mut ctl = CameraController::new(Camera::default());
        let start = *ctl.camera();

        let err = ctl.advance(&[true; 6], 1.0).unwrap_err();
        assert_eq!(err, InputError { expected: 10, actual: 6 });
        assert!(ctl.advance(&[true; 11], 1.0).is_err());
        assert_eq!(*ctl.camera(), start);
    }

    #[test]
    fn translation_keeps_view_direction() {
        let mut cam = Camera::default();
        let dir = cam.look_at - cam.eye;
        cam.translate(Vec3::new(3.0, -1.0, 2.0));
        assert_eq!(cam.look_at - cam.eye, dir);
    }

    #[test]
    fn portrait_doubles_the_field_of_view() {
        let lens = Lens::from_config(&CameraConfig::default());
        let landscape = lens.projection(&OutputInfo::new(1600, 900, TextureFormat::Bgra8Unorm));
        let portrait = lens.projection(&OutputInfo::new(900, 1600, TextureFormat::Bgra8Unorm));

        let expected_landscape =
            Mat4::perspective_lh(70f32.to_radians(), 1600.0 / 900.0, 0.01, 1000.0);
        let expected_portrait =
            Mat4::perspective_lh(140f32.to_radians(), 900.0 / 1600.0, 0.01, 1000.0);
        assert!(landscape.abs_diff_eq(expected_landscape, 1e-6));
        assert!(portrait.abs_diff_eq(expected_portrait, 1e-6));
    }

    #[test]
    fn orientation_is_applied_after_perspective() {
        let lens = Lens::from_config(&CameraConfig::default());
        let mut output = OutputInfo::new(800, 600, TextureFormat::Bgra8Unorm);
        output.orientation = Mat4::from_rotation_z(std::f32::consts::FRAC_PI_2);

        let p = Mat4::perspective_lh(70f32.to_radians(), 800.0 / 600.0, 0.01, 1000.0);
        assert!(lens.projection(&output).abs_diff_eq(output.orientation * p, 1e-6));
    }
}
