//! Per-family shader programs, filled in as bytecode loads complete.

use std::collections::BTreeMap;

use crate::family::PassFamily;
use crate::gfx::{
    DeviceContext, DeviceError, DeviceResult, GraphicsDevice, InputLayoutHandle, ShaderHandle,
    ShaderStage, StageBindings,
};

/// Shader objects bound together for one pass.
///
/// Binding a program writes all five stage slots, so a stage the program does
/// not use is cleared rather than left to whatever the previous pass bound.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct ShaderProgram {
    stages: StageBindings,
}

impl ShaderProgram {
    pub fn stage(&self, stage: ShaderStage) -> Option<ShaderHandle> {
        self.stages.get(stage)
    }

    pub fn set_stage(&mut self, stage: ShaderStage, shader: ShaderHandle) {
        self.stages.set(stage, Some(shader));
    }

    pub fn active_stages(&self) -> Vec<ShaderStage> {
        self.stages.active()
    }

    /// True once every stage the family needs has a shader.
    pub fn is_complete_for(&self, family: PassFamily) -> bool {
        family.stages().iter().all(|s| self.stage(*s).is_some())
    }

    pub fn bind(&self, ctx: &mut dyn DeviceContext) -> DeviceResult<()> {
        for stage in ShaderStage::ALL {
            ctx.set_shader(stage, self.stage(stage))?;
        }
        Ok(())
    }

    fn release(&self, device: &dyn GraphicsDevice) {
        for stage in ShaderStage::ALL {
            if let Some(h) = self.stage(stage) {
                device.release(h.into());
            }
        }
    }
}

/// All programs plus the primary input layout.
#[derive(Debug, Default)]
pub struct ShaderProgramSet {
    programs: BTreeMap<PassFamily, ShaderProgram>,
    input_layout: Option<InputLayoutHandle>,
}

impl ShaderProgramSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, family: PassFamily, stage: ShaderStage, shader: ShaderHandle) {
        self.programs.entry(family).or_default().set_stage(stage, shader);
    }

    pub fn set_input_layout(&mut self, layout: InputLayoutHandle) {
        self.input_layout = Some(layout);
    }

    pub fn input_layout(&self) -> Option<InputLayoutHandle> {
        self.input_layout
    }

    pub fn get(&self, family: PassFamily) -> Option<&ShaderProgram> {
        self.programs.get(&family)
    }

    /// The program for `family`, which must be complete to be drawn with.
    pub fn require(&self, family: PassFamily) -> DeviceResult<&ShaderProgram> {
        self.get(family)
            .filter(|p| p.is_complete_for(family))
            .ok_or(DeviceError::MissingResource(family.name()))
    }

    pub fn release_all(&mut self, device: &dyn GraphicsDevice) {
        for (_, program) in std::mem::take(&mut self.programs) {
            program.release(device);
        }
        if let Some(layout) = self.input_layout.take() {
            device.release(layout.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::{Command, RecordingDevice};

    #[test]
    fn binding_clears_unused_stages() {
        let device = RecordingDevice::new();
        let mut ctx = device.immediate_context();
        let mut set = ShaderProgramSet::new();
        for stage in PassFamily::Terrain.stages() {
            let h = device.create_shader(*stage, &[0xAB]).unwrap();
            set.insert(PassFamily::Terrain, *stage, h);
        }
        for stage in PassFamily::Spheres.stages() {
            let h = device.create_shader(*stage, &[0xCD]).unwrap();
            set.insert(PassFamily::Spheres, *stage, h);
        }

        set.require(PassFamily::Terrain).unwrap().bind(&mut ctx).unwrap();
        assert_eq!(ctx.state().active_stages().len(), 4);

        set.require(PassFamily::Spheres).unwrap().bind(&mut ctx).unwrap();
        assert_eq!(
            ctx.state().active_stages(),
            vec![ShaderStage::Vertex, ShaderStage::Pixel]
        );
        let shader_calls = ctx
            .commands()
            .iter()
            .filter(|c| matches!(c, Command::SetShader { .. }))
            .count();
        assert_eq!(shader_calls, 10);
    }

    #[test]
    fn incomplete_program_is_not_drawable() {
        let device = RecordingDevice::new();
        let mut set = ShaderProgramSet::new();
        let vs = device.create_shader(ShaderStage::Vertex, &[1]).unwrap();
        set.insert(PassFamily::Water, ShaderStage::Vertex, vs);

        assert_eq!(
            set.require(PassFamily::Water),
            Err(DeviceError::MissingResource("water"))
        );

        set.release_all(&device);
        assert_eq!(device.live_objects(), 0);
    }
}
