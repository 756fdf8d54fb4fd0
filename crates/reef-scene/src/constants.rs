//! Camera, light and time uniform data and the buffers that hold it.

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::camera::Camera;
use crate::config::LightConfig;
use crate::gfx::{
    BufferDesc, BufferHandle, DeviceContext, DeviceResult, GraphicsDevice, Resource, ShaderStage,
};

/// Row-major copy of `m` as the shaders expect it.
pub fn transposed(m: Mat4) -> [[f32; 4]; 4] {
    m.transpose().to_cols_array_2d()
}

// ── uniform layouts (16-byte aligned) ─────────────────────────────────────

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct CameraConstants {
    pub view: [[f32; 4]; 4],
    pub projection: [[f32; 4]; 4],
    pub eye: [f32; 4],
    pub look_at: [f32; 4],
    pub up: [f32; 4],
}

impl CameraConstants {
    pub fn set_camera(&mut self, camera: &Camera) {
        self.view = transposed(camera.view_matrix());
        self.eye = camera.eye.extend(1.0).to_array();
        self.look_at = camera.look_at.extend(1.0).to_array();
        self.up = camera.up.extend(0.0).to_array();
    }

    pub fn set_projection(&mut self, projection: Mat4) {
        self.projection = transposed(projection);
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct LightConstants {
    pub position: [f32; 4],
    pub colour: [f32; 4],
}

impl From<&LightConfig> for LightConstants {
    fn from(c: &LightConfig) -> Self {
        Self {
            position: c.position,
            colour: c.colour,
        }
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct TimeConstants {
    pub total_seconds: f32,
    pub _pad: [f32; 3],
}

// ── fixed bindings ────────────────────────────────────────────────────────

pub const CAMERA_BINDINGS: &[(ShaderStage, u32)] = &[
    (ShaderStage::Vertex, 0),
    (ShaderStage::Pixel, 0),
    (ShaderStage::Geometry, 0),
    (ShaderStage::Domain, 0),
];
pub const LIGHT_BINDINGS: &[(ShaderStage, u32)] = &[(ShaderStage::Pixel, 1)];
pub const TIME_BINDINGS: &[(ShaderStage, u32)] = &[
    (ShaderStage::Vertex, 1),
    (ShaderStage::Geometry, 1),
    (ShaderStage::Domain, 1),
];

/// CPU-side uniform data, mutated by `update` and uploaded once per frame.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ConstantBufferBank {
    pub camera: CameraConstants,
    pub light: LightConstants,
    pub time: TimeConstants,
}

impl ConstantBufferBank {
    pub fn new(camera: &Camera, light: &LightConfig) -> Self {
        let mut bank = Self {
            camera: CameraConstants::zeroed(),
            light: LightConstants::from(light),
            time: TimeConstants::zeroed(),
        };
        bank.camera.set_camera(camera);
        bank.camera.set_projection(Mat4::IDENTITY);
        bank
    }

    pub fn set_total_seconds(&mut self, total: f64) {
        self.time.total_seconds = total as f32;
    }
}

/// Device buffers backing a [`ConstantBufferBank`].
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ConstantBuffers {
    pub camera: BufferHandle,
    pub light: BufferHandle,
    pub time: BufferHandle,
}

fn constant_desc<T: Pod>() -> BufferDesc {
    BufferDesc::constant(std::mem::size_of::<T>() as u32)
}

impl ConstantBuffers {
    pub fn create(device: &dyn GraphicsDevice, bank: &ConstantBufferBank) -> DeviceResult<Self> {
        let camera = device.create_buffer(
            &constant_desc::<CameraConstants>(),
            Some(bytemuck::bytes_of(&bank.camera)),
        )?;
        let light = device
            .create_buffer(&constant_desc::<LightConstants>(), Some(bytemuck::bytes_of(&bank.light)))
            .inspect_err(|_| device.release(camera.into()))?;
        let time = device
            .create_buffer(&constant_desc::<TimeConstants>(), Some(bytemuck::bytes_of(&bank.time)))
            .inspect_err(|_| {
                device.release(camera.into());
                device.release(light.into());
            })?;
        Ok(Self { camera, light, time })
    }

    /// One upload per buffer.
    pub fn upload(&self, ctx: &mut dyn DeviceContext, bank: &ConstantBufferBank) -> DeviceResult<()> {
        ctx.update_buffer(self.camera, bytemuck::bytes_of(&bank.camera))?;
        ctx.update_buffer(self.light, bytemuck::bytes_of(&bank.light))?;
        ctx.update_buffer(self.time, bytemuck::bytes_of(&bank.time))
    }

    /// Binds every buffer to its fixed stage/slot pairs. Done once when loading completes.
    pub fn bind(&self, ctx: &mut dyn DeviceContext) -> DeviceResult<()> {
        let table = [
            (self.camera, CAMERA_BINDINGS),
            (self.light, LIGHT_BINDINGS),
            (self.time, TIME_BINDINGS),
        ];
        for (buffer, slots) in table {
            for &(stage, slot) in slots {
                ctx.set_constant_buffer(stage, slot, Some(buffer))?;
            }
        }
        Ok(())
    }

    pub fn release(&self, device: &dyn GraphicsDevice) {
        for r in [self.camera, self.light, self.time].map(Resource::from) {
            device.release(r);
        }
    }
}
