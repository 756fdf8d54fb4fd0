use std::collections::BTreeMap;

use super::handle::{
    BlendStateHandle, BufferHandle, DepthStencilStateHandle, DepthTargetHandle, InputLayoutHandle,
    RasterizerStateHandle, RenderTargetHandle, SamplerHandle, ShaderHandle, TextureHandle,
};
use super::types::{IndexFormat, ShaderStage, Topology};

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct VertexBufferBinding {
    pub buffer: BufferHandle,
    pub stride: u32,
    pub offset: u32,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct IndexBufferBinding {
    pub buffer: BufferHandle,
    pub format: IndexFormat,
    pub offset: u32,
}

/// Shader bound to each programmable stage.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct StageBindings([Option<ShaderHandle>; 5]);

impl StageBindings {
    #[inline]
    pub fn get(&self, stage: ShaderStage) -> Option<ShaderHandle> {
        self.0[stage.index()]
    }

    #[inline]
    pub fn set(&mut self, stage: ShaderStage, shader: Option<ShaderHandle>) {
        self.0[stage.index()] = shader;
    }

    /// Stages that currently have a shader, in pipeline order.
    pub fn active(&self) -> Vec<ShaderStage> {
        ShaderStage::ALL
            .into_iter()
            .filter(|s| self.get(*s).is_some())
            .collect()
    }
}

/// Snapshot of everything bound on a device context.
///
/// The recording backend mutates one of these per context call, so two points
/// in a command stream can be compared field by field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineState {
    pub topology: Option<Topology>,
    pub vertex_buffer: Option<VertexBufferBinding>,
    pub index_buffer: Option<IndexBufferBinding>,
    pub input_layout: Option<InputLayoutHandle>,
    pub rasterizer: Option<RasterizerStateHandle>,
    pub blend: Option<BlendStateHandle>,
    pub depth_stencil: Option<DepthStencilStateHandle>,
    pub stencil_ref: u32,
    pub render_targets: Vec<RenderTargetHandle>,
    pub depth_target: Option<DepthTargetHandle>,
    pub shaders: StageBindings,
    pub constant_buffers: BTreeMap<(ShaderStage, u32), BufferHandle>,
    pub shader_resources: BTreeMap<(ShaderStage, u32), TextureHandle>,
    pub samplers: BTreeMap<(ShaderStage, u32), SamplerHandle>,
}

impl PipelineState {
    pub fn active_stages(&self) -> Vec<ShaderStage> {
        self.shaders.active()
    }

    pub(crate) fn set_slot<T>(
        map: &mut BTreeMap<(ShaderStage, u32), T>,
        stage: ShaderStage,
        slot: u32,
        value: Option<T>,
    ) {
        match value {
            Some(v) => {
                map.insert((stage, slot), v);
            }
            None => {
                map.remove(&(stage, slot));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn active_stages_follow_pipeline_order() {
        let mut shaders: SlotMap<ShaderHandle, ()> = SlotMap::with_key();
        let a = shaders.insert(());
        let b = shaders.insert(());

        let mut bindings = StageBindings::default();
        bindings.set(ShaderStage::Pixel, Some(a));
        bindings.set(ShaderStage::Vertex, Some(b));

        assert_eq!(bindings.active(), vec![ShaderStage::Vertex, ShaderStage::Pixel]);

        bindings.set(ShaderStage::Pixel, None);
        assert_eq!(bindings.active(), vec![ShaderStage::Vertex]);
    }

    #[test]
    fn clearing_a_slot_removes_it() {
        let mut buffers: SlotMap<BufferHandle, ()> = SlotMap::with_key();
        let cb = buffers.insert(());

        let mut state = PipelineState::default();
        PipelineState::set_slot(&mut state.constant_buffers, ShaderStage::Vertex, 0, Some(cb));
        assert_eq!(state.constant_buffers.get(&(ShaderStage::Vertex, 0)), Some(&cb));

        PipelineState::set_slot::<BufferHandle>(
            &mut state.constant_buffers,
            ShaderStage::Vertex,
            0,
            None,
        );
        assert!(state.constant_buffers.is_empty());
    }
}
