//! Recording backend.
//!
//! `RecordingDevice` keeps every created object in a registry and
//! `RecordingContext` applies each context call to a [`PipelineState`],
//! validating handles the way a debug-layer device would. The context keeps
//! the full command stream plus a state snapshot per draw, which is what the
//! tests and the headless trace inspect.

use std::cell::RefCell;
use std::rc::Rc;

use slotmap::SlotMap;

use super::desc::{
    BlendDesc, BufferDesc, BufferKind, DepthStencilDesc, InputElement, RasterizerDesc,
    RenderTargetDesc, SamplerDesc,
};
use super::device::{DeviceContext, DeviceResult, GraphicsDevice};
use super::error::DeviceError;
use super::handle::{
    BlendStateHandle, BufferHandle, DepthStencilStateHandle, DepthTargetHandle, InputLayoutHandle,
    RasterizerStateHandle, RenderTargetHandle, Resource, SamplerHandle, ShaderHandle, TextureHandle,
};
use super::state::{IndexBufferBinding, PipelineState, VertexBufferBinding};
use super::types::{IndexFormat, ShaderStage, TextureFormat, Topology};

const DDS_MAGIC: &[u8; 4] = b"DDS ";
const DDS_HEADER_SIZE: u32 = 124;
const DDS_FILE_HEADER_LEN: usize = 4 + DDS_HEADER_SIZE as usize;

#[derive(Debug, Clone)]
pub struct BufferRecord {
    pub desc: BufferDesc,
    pub contents: Vec<u8>,
}

#[derive(Debug, Copy, Clone)]
pub struct ShaderRecord {
    pub stage: ShaderStage,
    pub bytecode_len: usize,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum TextureOrigin {
    Dds,
    RenderTarget(TextureFormat),
}

#[derive(Debug, Copy, Clone)]
pub struct TextureRecord {
    pub width: u32,
    pub height: u32,
    pub origin: TextureOrigin,
}

#[derive(Debug, Copy, Clone)]
pub struct TargetRecord {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

/// Every live object created through a [`RecordingDevice`].
#[derive(Default)]
pub struct Registry {
    pub buffers: SlotMap<BufferHandle, BufferRecord>,
    pub shaders: SlotMap<ShaderHandle, ShaderRecord>,
    pub input_layouts: SlotMap<InputLayoutHandle, Vec<InputElement>>,
    pub rasterizers: SlotMap<RasterizerStateHandle, RasterizerDesc>,
    pub blends: SlotMap<BlendStateHandle, BlendDesc>,
    pub depth_stencils: SlotMap<DepthStencilStateHandle, DepthStencilDesc>,
    pub samplers: SlotMap<SamplerHandle, SamplerDesc>,
    pub textures: SlotMap<TextureHandle, TextureRecord>,
    pub render_targets: SlotMap<RenderTargetHandle, TargetRecord>,
    pub depth_targets: SlotMap<DepthTargetHandle, TargetRecord>,
}

impl Registry {
    pub fn contains(&self, resource: Resource) -> bool {
        match resource {
            Resource::Buffer(h) => self.buffers.contains_key(h),
            Resource::Shader(h) => self.shaders.contains_key(h),
            Resource::InputLayout(h) => self.input_layouts.contains_key(h),
            Resource::Rasterizer(h) => self.rasterizers.contains_key(h),
            Resource::Blend(h) => self.blends.contains_key(h),
            Resource::DepthStencil(h) => self.depth_stencils.contains_key(h),
            Resource::Sampler(h) => self.samplers.contains_key(h),
            Resource::Texture(h) => self.textures.contains_key(h),
            Resource::RenderTarget(h) => self.render_targets.contains_key(h),
            Resource::DepthTarget(h) => self.depth_targets.contains_key(h),
        }
    }

    /// Number of live objects of every kind.
    pub fn live_objects(&self) -> usize {
        self.buffers.len()
            + self.shaders.len()
            + self.input_layouts.len()
            + self.rasterizers.len()
            + self.blends.len()
            + self.depth_stencils.len()
            + self.samplers.len()
            + self.textures.len()
            + self.render_targets.len()
            + self.depth_targets.len()
    }

    fn require(&self, resource: impl Into<Resource>) -> DeviceResult<()> {
        let resource = resource.into();
        if self.contains(resource) {
            Ok(())
        } else {
            Err(DeviceError::UnknownHandle(resource))
        }
    }
}

/// Device double that validates creation calls and keeps what was created.
#[derive(Clone, Default)]
pub struct RecordingDevice {
    registry: Rc<RefCell<Registry>>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the immediate context sharing this device's registry.
    pub fn immediate_context(&self) -> RecordingContext {
        RecordingContext::new(Rc::clone(&self.registry))
    }

    /// Stands in for the swapchain: a back-buffer colour target plus depth target.
    pub fn create_swap_chain_targets(
        &self,
        width: u32,
        height: u32,
        format: TextureFormat,
    ) -> DeviceResult<(RenderTargetHandle, DepthTargetHandle)> {
        if width == 0 || height == 0 {
            return Err(DeviceError::InvalidDescriptor(format!(
                "swap chain extent {width}x{height} is empty"
            )));
        }
        if format.is_depth() {
            return Err(DeviceError::InvalidDescriptor(format!(
                "back buffer cannot use depth format {format:?}"
            )));
        }

        let mut reg = self.registry.borrow_mut();
        let color = reg.render_targets.insert(TargetRecord { width, height, format });
        let depth = reg.depth_targets.insert(TargetRecord {
            width,
            height,
            format: TextureFormat::Depth32Float,
        });
        Ok((color, depth))
    }

    /// Read access to the registry for inspection.
    pub fn with_registry<R>(&self, f: impl FnOnce(&Registry) -> R) -> R {
        f(&self.registry.borrow())
    }

    pub fn live_objects(&self) -> usize {
        self.registry.borrow().live_objects()
    }

    /// Current contents of a buffer, if it exists.
    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<Vec<u8>> {
        self.registry
            .borrow()
            .buffers
            .get(buffer)
            .map(|b| b.contents.clone())
    }
}

impl GraphicsDevice for RecordingDevice {
    fn create_buffer(&self, desc: &BufferDesc, data: Option<&[u8]>) -> DeviceResult<BufferHandle> {
        if desc.size == 0 {
            return Err(DeviceError::InvalidDescriptor(format!(
                "{:?} buffer with zero size",
                desc.kind
            )));
        }
        if desc.kind == BufferKind::Constant && desc.size % 16 != 0 {
            return Err(DeviceError::InvalidDescriptor(format!(
                "constant buffer size {} is not a multiple of 16",
                desc.size
            )));
        }

        let contents = match data {
            Some(bytes) if bytes.len() != desc.size as usize => {
                return Err(DeviceError::InvalidDescriptor(format!(
                    "initial data is {} bytes, buffer is {}",
                    bytes.len(),
                    desc.size
                )));
            }
            Some(bytes) => bytes.to_vec(),
            None => vec![0; desc.size as usize],
        };

        Ok(self
            .registry
            .borrow_mut()
            .buffers
            .insert(BufferRecord { desc: *desc, contents }))
    }

    fn create_shader(&self, stage: ShaderStage, bytecode: &[u8]) -> DeviceResult<ShaderHandle> {
        if bytecode.is_empty() {
            return Err(DeviceError::InvalidBytecode {
                stage,
                reason: "empty bytecode".to_string(),
            });
        }

        Ok(self.registry.borrow_mut().shaders.insert(ShaderRecord {
            stage,
            bytecode_len: bytecode.len(),
        }))
    }

    fn create_input_layout(
        &self,
        elements: &[InputElement],
        vertex_bytecode: &[u8],
    ) -> DeviceResult<InputLayoutHandle> {
        if vertex_bytecode.is_empty() {
            return Err(DeviceError::InvalidBytecode {
                stage: ShaderStage::Vertex,
                reason: "input layout needs the vertex shader signature".to_string(),
            });
        }
        if elements.is_empty() {
            return Err(DeviceError::InvalidDescriptor(
                "input layout without elements".to_string(),
            ));
        }

        Ok(self
            .registry
            .borrow_mut()
            .input_layouts
            .insert(elements.to_vec()))
    }

    fn create_rasterizer_state(&self, desc: &RasterizerDesc) -> DeviceResult<RasterizerStateHandle> {
        Ok(self.registry.borrow_mut().rasterizers.insert(*desc))
    }

    fn create_blend_state(&self, desc: &BlendDesc) -> DeviceResult<BlendStateHandle> {
        Ok(self.registry.borrow_mut().blends.insert(*desc))
    }

    fn create_depth_stencil_state(
        &self,
        desc: &DepthStencilDesc,
    ) -> DeviceResult<DepthStencilStateHandle> {
        Ok(self.registry.borrow_mut().depth_stencils.insert(*desc))
    }

    fn create_sampler(&self, desc: &SamplerDesc) -> DeviceResult<SamplerHandle> {
        Ok(self.registry.borrow_mut().samplers.insert(*desc))
    }

    fn create_texture_from_dds(&self, file_data: &[u8]) -> DeviceResult<TextureHandle> {
        let (width, height) = parse_dds_extent(file_data)?;
        Ok(self.registry.borrow_mut().textures.insert(TextureRecord {
            width,
            height,
            origin: TextureOrigin::Dds,
        }))
    }

    fn create_render_target(
        &self,
        desc: &RenderTargetDesc,
    ) -> DeviceResult<(RenderTargetHandle, TextureHandle)> {
        if desc.width == 0 || desc.height == 0 {
            return Err(DeviceError::InvalidDescriptor(format!(
                "render target extent {}x{} is empty",
                desc.width, desc.height
            )));
        }
        if desc.format.is_depth() {
            return Err(DeviceError::InvalidDescriptor(format!(
                "colour render target cannot use {:?}",
                desc.format
            )));
        }

        let mut reg = self.registry.borrow_mut();
        let target = reg.render_targets.insert(TargetRecord {
            width: desc.width,
            height: desc.height,
            format: desc.format,
        });
        let view = reg.textures.insert(TextureRecord {
            width: desc.width,
            height: desc.height,
            origin: TextureOrigin::RenderTarget(desc.format),
        });
        Ok((target, view))
    }

    fn release(&self, resource: Resource) {
        let mut reg = self.registry.borrow_mut();
        let removed = match resource {
            Resource::Buffer(h) => reg.buffers.remove(h).is_some(),
            Resource::Shader(h) => reg.shaders.remove(h).is_some(),
            Resource::InputLayout(h) => reg.input_layouts.remove(h).is_some(),
            Resource::Rasterizer(h) => reg.rasterizers.remove(h).is_some(),
            Resource::Blend(h) => reg.blends.remove(h).is_some(),
            Resource::DepthStencil(h) => reg.depth_stencils.remove(h).is_some(),
            Resource::Sampler(h) => reg.samplers.remove(h).is_some(),
            Resource::Texture(h) => reg.textures.remove(h).is_some(),
            Resource::RenderTarget(h) => reg.render_targets.remove(h).is_some(),
            Resource::DepthTarget(h) => reg.depth_targets.remove(h).is_some(),
        };
        if !removed {
            log::debug!("release of unknown handle {resource:?} ignored");
        }
    }
}

/// Reads width/height from a DDS file header.
pub(crate) fn parse_dds_extent(data: &[u8]) -> DeviceResult<(u32, u32)> {
    if data.len() < DDS_FILE_HEADER_LEN {
        return Err(DeviceError::InvalidTexture(format!(
            "{} bytes is too short for a DDS header",
            data.len()
        )));
    }
    if &data[..4] != DDS_MAGIC {
        return Err(DeviceError::InvalidTexture("missing DDS magic".to_string()));
    }

    let read_u32 = |at: usize| u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]]);

    let header_size = read_u32(4);
    if header_size != DDS_HEADER_SIZE {
        return Err(DeviceError::InvalidTexture(format!(
            "DDS header size {header_size}, expected {DDS_HEADER_SIZE}"
        )));
    }

    let height = read_u32(12);
    let width = read_u32(16);
    if width == 0 || height == 0 {
        return Err(DeviceError::InvalidTexture(format!(
            "DDS extent {width}x{height} is empty"
        )));
    }
    Ok((width, height))
}

/// Builds a header-only DDS file of the given extent.
pub fn encode_dds_header(width: u32, height: u32) -> Vec<u8> {
    let mut out = vec![0u8; DDS_FILE_HEADER_LEN];
    out[..4].copy_from_slice(DDS_MAGIC);
    out[4..8].copy_from_slice(&DDS_HEADER_SIZE.to_le_bytes());
    out[12..16].copy_from_slice(&height.to_le_bytes());
    out[16..20].copy_from_slice(&width.to_le_bytes());
    out
}

/// One recorded context call.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetVertexBuffer {
        slot: u32,
        buffer: Option<BufferHandle>,
        stride: u32,
        offset: u32,
    },
    SetIndexBuffer {
        buffer: Option<BufferHandle>,
        format: IndexFormat,
        offset: u32,
    },
    SetTopology(Topology),
    SetInputLayout(Option<InputLayoutHandle>),
    SetRasterizer(RasterizerStateHandle),
    SetBlend(BlendStateHandle),
    SetDepthStencil {
        state: Option<DepthStencilStateHandle>,
        stencil_ref: u32,
    },
    SetRenderTargets {
        colors: Vec<RenderTargetHandle>,
        depth: Option<DepthTargetHandle>,
    },
    SetShader {
        stage: ShaderStage,
        shader: Option<ShaderHandle>,
    },
    SetConstantBuffer {
        stage: ShaderStage,
        slot: u32,
        buffer: Option<BufferHandle>,
    },
    SetShaderResource {
        stage: ShaderStage,
        slot: u32,
        texture: Option<TextureHandle>,
    },
    SetSampler {
        stage: ShaderStage,
        slot: u32,
        sampler: Option<SamplerHandle>,
    },
    UpdateBuffer {
        buffer: BufferHandle,
        len: usize,
    },
    DrawIndexed {
        index_count: u32,
        start_index: u32,
        base_vertex: i32,
    },
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CommandKind {
    SetVertexBuffer,
    SetIndexBuffer,
    SetTopology,
    SetInputLayout,
    SetRasterizer,
    SetBlend,
    SetDepthStencil,
    SetRenderTargets,
    SetShader,
    SetConstantBuffer,
    SetShaderResource,
    SetSampler,
    UpdateBuffer,
    DrawIndexed,
}

impl Command {
    pub fn kind(&self) -> CommandKind {
        match self {
            Command::SetVertexBuffer { .. } => CommandKind::SetVertexBuffer,
            Command::SetIndexBuffer { .. } => CommandKind::SetIndexBuffer,
            Command::SetTopology(_) => CommandKind::SetTopology,
            Command::SetInputLayout(_) => CommandKind::SetInputLayout,
            Command::SetRasterizer(_) => CommandKind::SetRasterizer,
            Command::SetBlend(_) => CommandKind::SetBlend,
            Command::SetDepthStencil { .. } => CommandKind::SetDepthStencil,
            Command::SetRenderTargets { .. } => CommandKind::SetRenderTargets,
            Command::SetShader { .. } => CommandKind::SetShader,
            Command::SetConstantBuffer { .. } => CommandKind::SetConstantBuffer,
            Command::SetShaderResource { .. } => CommandKind::SetShaderResource,
            Command::SetSampler { .. } => CommandKind::SetSampler,
            Command::UpdateBuffer { .. } => CommandKind::UpdateBuffer,
            Command::DrawIndexed { .. } => CommandKind::DrawIndexed,
        }
    }
}

/// A draw call together with the state it executed under.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawRecord {
    /// Innermost debug region open at the draw.
    pub region: Option<&'static str>,
    pub index_count: u32,
    pub start_index: u32,
    pub base_vertex: i32,
    pub state: PipelineState,
}

/// Context double: applies calls to a [`PipelineState`] and records them.
pub struct RecordingContext {
    registry: Rc<RefCell<Registry>>,
    state: PipelineState,
    commands: Vec<Command>,
    draws: Vec<DrawRecord>,
    regions: Vec<&'static str>,
    /// Kind to fail and how many matching calls to let through first.
    fault: Option<(CommandKind, usize)>,
}

impl RecordingContext {
    fn new(registry: Rc<RefCell<Registry>>) -> Self {
        Self {
            registry,
            state: PipelineState::default(),
            commands: Vec::new(),
            draws: Vec::new(),
            regions: Vec::new(),
            fault: None,
        }
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn draws(&self) -> &[DrawRecord] {
        &self.draws
    }

    /// Drops the recorded stream; bound state is kept, as on a real context.
    pub fn clear_log(&mut self) {
        self.commands.clear();
        self.draws.clear();
    }

    /// Makes the next call of `kind` fail without touching state.
    pub fn fail_next(&mut self, kind: CommandKind) {
        self.fail_after(kind, 0);
    }

    /// Lets `skip` calls of `kind` succeed, then fails the one after.
    pub fn fail_after(&mut self, kind: CommandKind, skip: usize) {
        self.fault = Some((kind, skip));
    }

    fn require(&self, resource: impl Into<Resource>) -> DeviceResult<()> {
        self.registry.borrow().require(resource)
    }

    fn require_opt<H: Into<Resource>>(&self, handle: Option<H>) -> DeviceResult<()> {
        match handle {
            Some(h) => self.require(h),
            None => Ok(()),
        }
    }

    fn check_fault(&mut self, kind: CommandKind) -> DeviceResult<()> {
        let Some((target, skip)) = self.fault else {
            return Ok(());
        };
        if target != kind {
            return Ok(());
        }
        if skip > 0 {
            self.fault = Some((target, skip - 1));
            return Ok(());
        }
        self.fault = None;
        Err(DeviceError::Rejected(format!("injected failure on {kind:?}")))
    }

    fn push(&mut self, cmd: Command) {
        log::trace!("ctx: {cmd:?}");
        self.commands.push(cmd);
    }

    fn validate_draw(&self, index_count: u32, start_index: u32) -> DeviceResult<()> {
        let topology = self
            .state
            .topology
            .ok_or(DeviceError::MissingResource("primitive topology"))?;
        let index = self
            .state
            .index_buffer
            .ok_or(DeviceError::MissingResource("index buffer"))?;
        if self.state.vertex_buffer.is_none() {
            return Err(DeviceError::MissingResource("vertex buffer"));
        }
        if self.state.shaders.get(ShaderStage::Vertex).is_none() {
            return Err(DeviceError::MissingResource("vertex shader"));
        }

        let tessellating = self.state.shaders.get(ShaderStage::Hull).is_some()
            || self.state.shaders.get(ShaderStage::Domain).is_some();
        match (topology, tessellating) {
            (Topology::PatchList4, false) => {
                return Err(DeviceError::Rejected(
                    "patch topology without hull and domain shaders".to_string(),
                ));
            }
            (Topology::PatchList4, true) => {
                if self.state.shaders.get(ShaderStage::Hull).is_none()
                    || self.state.shaders.get(ShaderStage::Domain).is_none()
                {
                    return Err(DeviceError::Rejected(
                        "tessellation needs both hull and domain shaders".to_string(),
                    ));
                }
            }
            (other, true) => {
                return Err(DeviceError::Rejected(format!(
                    "hull/domain shaders bound with {other:?} topology"
                )));
            }
            (_, false) => {}
        }

        let reg = self.registry.borrow();
        let buffer = reg
            .buffers
            .get(index.buffer)
            .ok_or(DeviceError::UnknownHandle(Resource::Buffer(index.buffer)))?;
        let available = buffer.desc.size.saturating_sub(index.offset) / index.format.size();
        let end = u64::from(start_index) + u64::from(index_count);
        if end > u64::from(available) {
            return Err(DeviceError::Rejected(format!(
                "draw reads indices {start_index}..{end} of {available}"
            )));
        }
        Ok(())
    }
}

impl DeviceContext for RecordingContext {
    fn set_vertex_buffer(
        &mut self,
        slot: u32,
        buffer: Option<BufferHandle>,
        stride: u32,
        offset: u32,
    ) -> DeviceResult<()> {
        self.check_fault(CommandKind::SetVertexBuffer)?;
        self.require_opt(buffer)?;
        if slot == 0 {
            self.state.vertex_buffer = buffer.map(|buffer| VertexBufferBinding { buffer, stride, offset });
        }
        self.push(Command::SetVertexBuffer { slot, buffer, stride, offset });
        Ok(())
    }

    fn set_index_buffer(
        &mut self,
        buffer: Option<BufferHandle>,
        format: IndexFormat,
        offset: u32,
    ) -> DeviceResult<()> {
        self.check_fault(CommandKind::SetIndexBuffer)?;
        self.require_opt(buffer)?;
        self.state.index_buffer = buffer.map(|buffer| IndexBufferBinding { buffer, format, offset });
        self.push(Command::SetIndexBuffer { buffer, format, offset });
        Ok(())
    }

    fn set_primitive_topology(&mut self, topology: Topology) -> DeviceResult<()> {
        self.check_fault(CommandKind::SetTopology)?;
        self.state.topology = Some(topology);
        self.push(Command::SetTopology(topology));
        Ok(())
    }

    fn set_input_layout(&mut self, layout: Option<InputLayoutHandle>) -> DeviceResult<()> {
        self.check_fault(CommandKind::SetInputLayout)?;
        self.require_opt(layout)?;
        self.state.input_layout = layout;
        self.push(Command::SetInputLayout(layout));
        Ok(())
    }

    fn set_rasterizer_state(&mut self, state: RasterizerStateHandle) -> DeviceResult<()> {
        self.check_fault(CommandKind::SetRasterizer)?;
        self.require(state)?;
        self.state.rasterizer = Some(state);
        self.push(Command::SetRasterizer(state));
        Ok(())
    }

    fn set_blend_state(&mut self, state: BlendStateHandle) -> DeviceResult<()> {
        self.check_fault(CommandKind::SetBlend)?;
        self.require(state)?;
        self.state.blend = Some(state);
        self.push(Command::SetBlend(state));
        Ok(())
    }

    fn set_depth_stencil_state(
        &mut self,
        state: Option<DepthStencilStateHandle>,
        stencil_ref: u32,
    ) -> DeviceResult<()> {
        self.check_fault(CommandKind::SetDepthStencil)?;
        self.require_opt(state)?;
        self.state.depth_stencil = state;
        self.state.stencil_ref = stencil_ref;
        self.push(Command::SetDepthStencil { state, stencil_ref });
        Ok(())
    }

    fn depth_stencil_state(&self) -> (Option<DepthStencilStateHandle>, u32) {
        (self.state.depth_stencil, self.state.stencil_ref)
    }

    fn set_render_targets(
        &mut self,
        colors: &[RenderTargetHandle],
        depth: Option<DepthTargetHandle>,
    ) -> DeviceResult<()> {
        self.check_fault(CommandKind::SetRenderTargets)?;
        for c in colors {
            self.require(*c)?;
        }
        self.require_opt(depth)?;
        self.state.render_targets = colors.to_vec();
        self.state.depth_target = depth;
        self.push(Command::SetRenderTargets {
            colors: colors.to_vec(),
            depth,
        });
        Ok(())
    }

    fn set_shader(&mut self, stage: ShaderStage, shader: Option<ShaderHandle>) -> DeviceResult<()> {
        self.check_fault(CommandKind::SetShader)?;
        if let Some(h) = shader {
            let created_for = self
                .registry
                .borrow()
                .shaders
                .get(h)
                .map(|r| r.stage)
                .ok_or(DeviceError::UnknownHandle(Resource::Shader(h)))?;
            if created_for != stage {
                return Err(DeviceError::StageMismatch {
                    expected: stage,
                    actual: created_for,
                });
            }
        }
        self.state.shaders.set(stage, shader);
        self.push(Command::SetShader { stage, shader });
        Ok(())
    }

    fn set_constant_buffer(
        &mut self,
        stage: ShaderStage,
        slot: u32,
        buffer: Option<BufferHandle>,
    ) -> DeviceResult<()> {
        self.check_fault(CommandKind::SetConstantBuffer)?;
        if let Some(h) = buffer {
            let kind = self
                .registry
                .borrow()
                .buffers
                .get(h)
                .map(|b| b.desc.kind)
                .ok_or(DeviceError::UnknownHandle(Resource::Buffer(h)))?;
            if kind != BufferKind::Constant {
                return Err(DeviceError::InvalidDescriptor(format!(
                    "{kind:?} buffer bound as constant buffer"
                )));
            }
        }
        PipelineState::set_slot(&mut self.state.constant_buffers, stage, slot, buffer);
        self.push(Command::SetConstantBuffer { stage, slot, buffer });
        Ok(())
    }

    fn set_shader_resource(
        &mut self,
        stage: ShaderStage,
        slot: u32,
        texture: Option<TextureHandle>,
    ) -> DeviceResult<()> {
        self.check_fault(CommandKind::SetShaderResource)?;
        self.require_opt(texture)?;
        PipelineState::set_slot(&mut self.state.shader_resources, stage, slot, texture);
        self.push(Command::SetShaderResource { stage, slot, texture });
        Ok(())
    }

    fn set_sampler(
        &mut self,
        stage: ShaderStage,
        slot: u32,
        sampler: Option<SamplerHandle>,
    ) -> DeviceResult<()> {
        self.check_fault(CommandKind::SetSampler)?;
        self.require_opt(sampler)?;
        PipelineState::set_slot(&mut self.state.samplers, stage, slot, sampler);
        self.push(Command::SetSampler { stage, slot, sampler });
        Ok(())
    }

    fn update_buffer(&mut self, buffer: BufferHandle, data: &[u8]) -> DeviceResult<()> {
        self.check_fault(CommandKind::UpdateBuffer)?;
        {
            let mut reg = self.registry.borrow_mut();
            let record = reg
                .buffers
                .get_mut(buffer)
                .ok_or(DeviceError::UnknownHandle(Resource::Buffer(buffer)))?;
            if record.contents.len() != data.len() {
                return Err(DeviceError::InvalidDescriptor(format!(
                    "update of {} bytes into a {} byte buffer",
                    data.len(),
                    record.contents.len()
                )));
            }
            record.contents.copy_from_slice(data);
        }
        self.push(Command::UpdateBuffer {
            buffer,
            len: data.len(),
        });
        Ok(())
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        start_index: u32,
        base_vertex: i32,
    ) -> DeviceResult<()> {
        self.check_fault(CommandKind::DrawIndexed)?;
        self.validate_draw(index_count, start_index)?;
        self.draws.push(DrawRecord {
            region: self.regions.last().copied(),
            index_count,
            start_index,
            base_vertex,
            state: self.state.clone(),
        });
        self.push(Command::DrawIndexed {
            index_count,
            start_index,
            base_vertex,
        });
        Ok(())
    }

    fn begin_event(&mut self, label: &'static str) {
        self.regions.push(label);
    }

    fn end_event(&mut self) {
        self.regions.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vs(device: &RecordingDevice) -> ShaderHandle {
        device.create_shader(ShaderStage::Vertex, &[1, 2, 3]).unwrap()
    }

    #[test]
    fn empty_bytecode_is_rejected() {
        let device = RecordingDevice::new();
        let err = device.create_shader(ShaderStage::Hull, &[]).unwrap_err();
        assert!(matches!(
            err,
            DeviceError::InvalidBytecode { stage: ShaderStage::Hull, .. }
        ));
    }

    #[test]
    fn constant_buffers_must_be_16_byte_multiples() {
        let device = RecordingDevice::new();
        assert!(device.create_buffer(&BufferDesc::constant(20), None).is_err());
        assert!(device.create_buffer(&BufferDesc::constant(32), None).is_ok());
    }

    #[test]
    fn initial_data_must_match_size() {
        let device = RecordingDevice::new();
        let err = device
            .create_buffer(&BufferDesc::vertex(12), Some(&[0u8; 8]))
            .unwrap_err();
        assert!(matches!(err, DeviceError::InvalidDescriptor(_)));
    }

    #[test]
    fn dds_header_round_trips_extent() {
        let device = RecordingDevice::new();
        let tex = device
            .create_texture_from_dds(&encode_dds_header(256, 128))
            .unwrap();
        let (w, h) = device.with_registry(|r| {
            let t = r.textures[tex];
            (t.width, t.height)
        });
        assert_eq!((w, h), (256, 128));
    }

    #[test]
    fn dds_without_magic_is_rejected() {
        let mut data = encode_dds_header(4, 4);
        data[0] = b'X';
        assert!(matches!(
            parse_dds_extent(&data),
            Err(DeviceError::InvalidTexture(_))
        ));
        assert!(parse_dds_extent(&data[..64]).is_err());
    }

    #[test]
    fn shader_bound_to_wrong_stage_fails() {
        let device = RecordingDevice::new();
        let mut ctx = device.immediate_context();
        let shader = vs(&device);

        let err = ctx.set_shader(ShaderStage::Pixel, Some(shader)).unwrap_err();
        assert_eq!(
            err,
            DeviceError::StageMismatch {
                expected: ShaderStage::Pixel,
                actual: ShaderStage::Vertex,
            }
        );
        assert!(ctx.commands().is_empty());
    }

    #[test]
    fn released_handles_are_unknown() {
        let device = RecordingDevice::new();
        let mut ctx = device.immediate_context();
        let shader = vs(&device);
        device.release(shader.into());

        assert_eq!(
            ctx.set_shader(ShaderStage::Vertex, Some(shader)),
            Err(DeviceError::UnknownHandle(Resource::Shader(shader)))
        );
        assert_eq!(device.live_objects(), 0);
    }

    #[test]
    fn draw_snapshots_state_and_checks_index_range() {
        let device = RecordingDevice::new();
        let mut ctx = device.immediate_context();
        let vb = device.create_buffer(&BufferDesc::vertex(36), None).unwrap();
        let ib = device.create_buffer(&BufferDesc::index(12), None).unwrap();
        let shader = vs(&device);

        ctx.set_vertex_buffer(0, Some(vb), 12, 0).unwrap();
        ctx.set_index_buffer(Some(ib), IndexFormat::U16, 0).unwrap();
        ctx.set_primitive_topology(Topology::TriangleList).unwrap();
        ctx.set_shader(ShaderStage::Vertex, Some(shader)).unwrap();

        ctx.begin_event("probe");
        ctx.draw_indexed(6, 0, 0).unwrap();
        ctx.end_event();
        assert!(ctx.draw_indexed(7, 0, 0).is_err());

        assert_eq!(ctx.draws().len(), 1);
        let draw = &ctx.draws()[0];
        assert_eq!(draw.region, Some("probe"));
        assert_eq!(draw.state.topology, Some(Topology::TriangleList));
        assert_eq!(draw.state.active_stages(), vec![ShaderStage::Vertex]);
    }

    #[test]
    fn hull_shader_with_triangle_topology_is_rejected() {
        let device = RecordingDevice::new();
        let mut ctx = device.immediate_context();
        let vb = device.create_buffer(&BufferDesc::vertex(48), None).unwrap();
        let ib = device.create_buffer(&BufferDesc::index(8), None).unwrap();
        let hs = device.create_shader(ShaderStage::Hull, &[1]).unwrap();
        let ds = device.create_shader(ShaderStage::Domain, &[1]).unwrap();

        ctx.set_vertex_buffer(0, Some(vb), 12, 0).unwrap();
        ctx.set_index_buffer(Some(ib), IndexFormat::U16, 0).unwrap();
        ctx.set_shader(ShaderStage::Vertex, Some(vs(&device))).unwrap();
        ctx.set_shader(ShaderStage::Hull, Some(hs)).unwrap();
        ctx.set_shader(ShaderStage::Domain, Some(ds)).unwrap();

        ctx.set_primitive_topology(Topology::TriangleList).unwrap();
        assert!(ctx.draw_indexed(3, 0, 0).is_err());

        ctx.set_primitive_topology(Topology::PatchList4).unwrap();
        assert!(ctx.draw_indexed(4, 0, 0).is_ok());
    }

    #[test]
    fn injected_fault_fires_once() {
        let device = RecordingDevice::new();
        let mut ctx = device.immediate_context();
        ctx.fail_next(CommandKind::SetTopology);

        assert!(ctx.set_primitive_topology(Topology::PointList).is_err());
        assert_eq!(ctx.state().topology, None);
        assert!(ctx.set_primitive_topology(Topology::PointList).is_ok());
    }

    #[test]
    fn delayed_fault_skips_earlier_calls() {
        let device = RecordingDevice::new();
        let mut ctx = device.immediate_context();
        ctx.fail_after(CommandKind::SetTopology, 2);

        assert!(ctx.set_primitive_topology(Topology::PointList).is_ok());
        assert!(ctx.set_primitive_topology(Topology::LineStrip).is_ok());
        assert!(ctx.set_primitive_topology(Topology::TriangleList).is_err());
        assert_eq!(ctx.state().topology, Some(Topology::LineStrip));
    }

    #[test]
    fn update_buffer_replaces_contents() {
        let device = RecordingDevice::new();
        let mut ctx = device.immediate_context();
        let cb = device.create_buffer(&BufferDesc::constant(16), None).unwrap();

        ctx.update_buffer(cb, &[7u8; 16]).unwrap();
        assert_eq!(device.buffer_contents(cb), Some(vec![7u8; 16]));
        assert!(ctx.update_buffer(cb, &[0u8; 4]).is_err());
    }
}
