use super::desc::{
    BlendDesc, BufferDesc, DepthStencilDesc, InputElement, RasterizerDesc, RenderTargetDesc,
    SamplerDesc,
};
use super::error::DeviceError;
use super::handle::{
    BlendStateHandle, BufferHandle, DepthStencilStateHandle, DepthTargetHandle, InputLayoutHandle,
    RasterizerStateHandle, RenderTargetHandle, Resource, SamplerHandle, ShaderHandle, TextureHandle,
};
use super::types::{IndexFormat, ShaderStage, Topology};

pub type DeviceResult<T> = Result<T, DeviceError>;

/// Object-creation half of the graphics API.
///
/// Creation calls are only ever issued from the thread that owns the device
/// context, so implementations do not need to be `Sync`.
pub trait GraphicsDevice {
    /// Creates a buffer, optionally initialised with `data` (`data.len()` must equal `desc.size`).
    fn create_buffer(&self, desc: &BufferDesc, data: Option<&[u8]>) -> DeviceResult<BufferHandle>;

    /// Compiles opaque bytecode into a shader object for `stage`.
    fn create_shader(&self, stage: ShaderStage, bytecode: &[u8]) -> DeviceResult<ShaderHandle>;

    /// Builds an input layout validated against vertex-shader bytecode.
    fn create_input_layout(
        &self,
        elements: &[InputElement],
        vertex_bytecode: &[u8],
    ) -> DeviceResult<InputLayoutHandle>;

    fn create_rasterizer_state(&self, desc: &RasterizerDesc) -> DeviceResult<RasterizerStateHandle>;

    fn create_blend_state(&self, desc: &BlendDesc) -> DeviceResult<BlendStateHandle>;

    fn create_depth_stencil_state(
        &self,
        desc: &DepthStencilDesc,
    ) -> DeviceResult<DepthStencilStateHandle>;

    fn create_sampler(&self, desc: &SamplerDesc) -> DeviceResult<SamplerHandle>;

    /// Creates a shader-resource texture from the raw contents of a DDS file.
    fn create_texture_from_dds(&self, file_data: &[u8]) -> DeviceResult<TextureHandle>;

    /// Creates a colour render target together with a view for sampling it.
    fn create_render_target(
        &self,
        desc: &RenderTargetDesc,
    ) -> DeviceResult<(RenderTargetHandle, TextureHandle)>;

    /// Releases a device object. Releasing an unknown handle is a no-op.
    fn release(&self, resource: Resource);
}

/// Immediate-mode context: a single stateful command stream.
///
/// Every setter replaces exactly one piece of pipeline state; the state
/// persists across draws (and frames) until it is set again.
pub trait DeviceContext {
    fn set_vertex_buffer(
        &mut self,
        slot: u32,
        buffer: Option<BufferHandle>,
        stride: u32,
        offset: u32,
    ) -> DeviceResult<()>;

    fn set_index_buffer(
        &mut self,
        buffer: Option<BufferHandle>,
        format: IndexFormat,
        offset: u32,
    ) -> DeviceResult<()>;

    fn set_primitive_topology(&mut self, topology: Topology) -> DeviceResult<()>;

    fn set_input_layout(&mut self, layout: Option<InputLayoutHandle>) -> DeviceResult<()>;

    fn set_rasterizer_state(&mut self, state: RasterizerStateHandle) -> DeviceResult<()>;

    fn set_blend_state(&mut self, state: BlendStateHandle) -> DeviceResult<()>;

    fn set_depth_stencil_state(
        &mut self,
        state: Option<DepthStencilStateHandle>,
        stencil_ref: u32,
    ) -> DeviceResult<()>;

    /// Currently bound depth-stencil state and stencil reference.
    fn depth_stencil_state(&self) -> (Option<DepthStencilStateHandle>, u32);

    fn set_render_targets(
        &mut self,
        colors: &[RenderTargetHandle],
        depth: Option<DepthTargetHandle>,
    ) -> DeviceResult<()>;

    /// Binds `shader` to `stage`; `None` clears the stage.
    fn set_shader(&mut self, stage: ShaderStage, shader: Option<ShaderHandle>) -> DeviceResult<()>;

    fn set_constant_buffer(
        &mut self,
        stage: ShaderStage,
        slot: u32,
        buffer: Option<BufferHandle>,
    ) -> DeviceResult<()>;

    fn set_shader_resource(
        &mut self,
        stage: ShaderStage,
        slot: u32,
        texture: Option<TextureHandle>,
    ) -> DeviceResult<()>;

    fn set_sampler(
        &mut self,
        stage: ShaderStage,
        slot: u32,
        sampler: Option<SamplerHandle>,
    ) -> DeviceResult<()>;

    /// Replaces the whole contents of `buffer`.
    fn update_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> DeviceResult<()>;

    fn draw_indexed(&mut self, index_count: u32, start_index: u32, base_vertex: i32)
        -> DeviceResult<()>;

    /// Opens a named debug region. Backends without annotation support ignore it.
    fn begin_event(&mut self, label: &'static str) {
        let _ = label;
    }

    fn end_event(&mut self) {}
}
