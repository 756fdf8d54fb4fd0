//! Frame renderer: owns every device object of the scene, drives loading, and
//! issues the fixed pass sequence once loading is complete.

mod passes;
mod scope;

pub use passes::{FrameTargets, UNDERWATER_INDEX_COUNT};
pub use scope::DepthStencilScope;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::camera::{Camera, CameraController, FrameTiming, InputError, Lens, OutputInfo};
use crate::config::SceneConfig;
use crate::constants::{ConstantBufferBank, ConstantBuffers};
use crate::family::TextureSlot;
use crate::geometry::{GeometryStore, Vertex};
use crate::gfx::{
    DeviceContext, DeviceError, DeviceResult, GraphicsDevice, RenderTargetDesc, RenderTargetHandle,
    ShaderStage, TextureHandle,
};
use crate::loader::{AssetSource, LoadCoordinator, LoadError, LoadManifest, LoadState, LoadStep};
use crate::shaders::ShaderProgramSet;
use crate::states::StateRegistry;

#[derive(Debug)]
pub enum SceneError {
    Device(DeviceError),
    Load(LoadError),
}

impl fmt::Display for SceneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneError::Device(_) => f.write_str("failed to create scene device resources"),
            SceneError::Load(_) => f.write_str("failed to start asset loading"),
        }
    }
}

impl std::error::Error for SceneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SceneError::Device(e) => Some(e),
            SceneError::Load(e) => Some(e),
        }
    }
}

impl From<DeviceError> for SceneError {
    fn from(e: DeviceError) -> Self {
        SceneError::Device(e)
    }
}

impl From<LoadError> for SceneError {
    fn from(e: LoadError) -> Self {
        SceneError::Load(e)
    }
}

/// Objects created synchronously, before any asset arrives.
#[derive(Debug)]
struct CoreResources {
    states: StateRegistry,
    constants: ConstantBuffers,
}

/// Off-screen copy of the output for the underwater effect.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct UnderwaterTarget {
    pub target: RenderTargetHandle,
    pub view: TextureHandle,
}

pub struct SceneRenderer {
    config: SceneConfig,
    source: Arc<dyn AssetSource>,
    loader: LoadCoordinator,
    controller: CameraController,
    lens: Lens,
    bank: ConstantBufferBank,

    core: Option<CoreResources>,
    shaders: ShaderProgramSet,
    geometry: GeometryStore,
    textures: BTreeMap<TextureSlot, TextureHandle>,

    output: Option<OutputInfo>,
    underwater_target: Option<UnderwaterTarget>,
}

/// Device work for one [`LoadStep`], run on the context thread.
struct LoadSink<'a> {
    device: &'a dyn GraphicsDevice,
    ctx: &'a mut dyn DeviceContext,
    core: Option<&'a CoreResources>,
    shaders: &'a mut ShaderProgramSet,
    geometry: &'a mut GeometryStore,
    textures: &'a mut BTreeMap<TextureSlot, TextureHandle>,
}

impl LoadSink<'_> {
    fn apply(&mut self, step: LoadStep<'_>) -> DeviceResult<()> {
        match step {
            LoadStep::Shader {
                family,
                stage,
                bytecode,
            } => {
                let shader = self.device.create_shader(stage, bytecode)?;
                self.shaders.insert(family, stage, shader);
                if stage == ShaderStage::Vertex && family.derives_input_layout() {
                    let layout = self.device.create_input_layout(&Vertex::layout(), bytecode)?;
                    self.shaders.set_input_layout(layout);
                }
            }
            LoadStep::Texture { slot, data } => {
                let texture = self.device.create_texture_from_dds(data)?;
                if let Some(old) = self.textures.insert(slot, texture) {
                    self.device.release(old.into());
                }
            }
            LoadStep::Mesh(kind) => {
                let mesh = kind.build().upload(self.device)?;
                if let Err(e) = self.geometry.insert(kind, mesh) {
                    mesh.release(self.device);
                    return Err(e);
                }
            }
            LoadStep::Ready => {
                let core = self
                    .core
                    .ok_or(DeviceError::MissingResource("constant buffers"))?;
                core.constants.bind(self.ctx)?;
            }
        }
        Ok(())
    }
}

impl SceneRenderer {
    pub fn new(config: SceneConfig, source: Arc<dyn AssetSource>) -> Result<Self, LoadError> {
        let loader = LoadCoordinator::new(config.loader.worker_threads)?;
        let camera = Camera::from_config(&config.camera);
        let lens = Lens::from_config(&config.camera);
        let bank = ConstantBufferBank::new(&camera, &config.light);

        Ok(Self {
            config,
            source,
            loader,
            controller: CameraController::new(camera),
            lens,
            bank,
            core: None,
            shaders: ShaderProgramSet::new(),
            geometry: GeometryStore::new(),
            textures: BTreeMap::new(),
            output: None,
            underwater_target: None,
        })
    }

    /// Creates the fixed state objects and constant buffers, then starts
    /// loading every shader and texture. Only valid while `NotLoaded`.
    pub fn create_device_resources(&mut self, device: &dyn GraphicsDevice) -> Result<(), SceneError> {
        if self.loader.state() != LoadState::NotLoaded {
            return Err(LoadError::InvalidState(self.loader.state()).into());
        }

        let states = StateRegistry::create(device)?;
        let constants = match ConstantBuffers::create(device, &self.bank) {
            Ok(c) => c,
            Err(e) => {
                states.release(device);
                return Err(e.into());
            }
        };
        self.core = Some(CoreResources { states, constants });

        let manifest = LoadManifest::scene(&self.config.assets);
        self.loader.begin(&manifest, Arc::clone(&self.source))?;
        Ok(())
    }

    /// Rebuilds the projection and the underwater target for a new output size.
    pub fn create_window_size_resources(
        &mut self,
        device: &dyn GraphicsDevice,
        output: OutputInfo,
    ) -> DeviceResult<()> {
        self.bank.camera.set_projection(self.lens.projection(&output));

        if let Some(old) = self.underwater_target.take() {
            device.release(old.target.into());
            device.release(old.view.into());
        }
        let (target, view) = device.create_render_target(&RenderTargetDesc {
            width: output.width,
            height: output.height,
            format: output.format,
        })?;
        self.underwater_target = Some(UnderwaterTarget { target, view });
        self.output = Some(output);

        log::debug!(
            "window size resources: {}x{} {:?}",
            output.width,
            output.height,
            output.format
        );
        Ok(())
    }

    /// Runs device work for every asset that has arrived. Never blocks.
    pub fn poll_loading(
        &mut self,
        device: &dyn GraphicsDevice,
        ctx: &mut dyn DeviceContext,
    ) -> Result<LoadState, LoadError> {
        let mut sink = LoadSink {
            device,
            ctx,
            core: self.core.as_ref(),
            shaders: &mut self.shaders,
            geometry: &mut self.geometry,
            textures: &mut self.textures,
        };
        self.loader.poll(|step| sink.apply(step))
    }

    /// Blocks until loading completes or fails.
    pub fn finish_loading(
        &mut self,
        device: &dyn GraphicsDevice,
        ctx: &mut dyn DeviceContext,
    ) -> Result<LoadState, LoadError> {
        let mut sink = LoadSink {
            device,
            ctx,
            core: self.core.as_ref(),
            shaders: &mut self.shaders,
            geometry: &mut self.geometry,
            textures: &mut self.textures,
        };
        self.loader.finish_blocking(|step| sink.apply(step))
    }

    /// Applies one frame of input and timing to the camera and time constants.
    pub fn update(&mut self, input: &[bool], timing: FrameTiming) -> Result<(), InputError> {
        self.controller
            .advance(input, timing.elapsed_seconds as f32)?;
        self.bank.camera.set_camera(self.controller.camera());
        self.bank.set_total_seconds(timing.total_seconds);
        Ok(())
    }

    /// Issues one frame. Before loading completes this makes no device calls.
    pub fn render(&self, ctx: &mut dyn DeviceContext, targets: &FrameTargets) -> DeviceResult<()> {
        if !self.loader.is_ready() {
            return Ok(());
        }
        let core = self
            .core
            .as_ref()
            .ok_or(DeviceError::MissingResource("scene state objects"))?;

        let res = passes::FrameResources {
            states: &core.states,
            constants: &core.constants,
            bank: &self.bank,
            shaders: &self.shaders,
            geometry: &self.geometry,
            textures: &self.textures,
            passes: &self.config.passes,
        };
        passes::render_frame(&res, ctx, targets)
    }

    /// Device-loss teardown: releases every device object and returns to `NotLoaded`.
    ///
    /// Camera position and elapsed time survive; the next
    /// [`SceneRenderer::create_device_resources`] reloads everything.
    pub fn release_device_resources(&mut self, device: &dyn GraphicsDevice) {
        self.loader.reset();
        self.shaders.release_all(device);
        self.geometry.release_all(device);
        for (_, texture) in std::mem::take(&mut self.textures) {
            device.release(texture.into());
        }
        if let Some(core) = self.core.take() {
            core.states.release(device);
            core.constants.release(device);
        }
        if let Some(uw) = self.underwater_target.take() {
            device.release(uw.target.into());
            device.release(uw.view.into());
        }
        log::info!("scene device resources released");
    }

    pub fn state(&self) -> LoadState {
        self.loader.state()
    }

    pub fn is_ready(&self) -> bool {
        self.loader.is_ready()
    }

    pub fn pending_reads(&self) -> usize {
        self.loader.pending_reads()
    }

    pub fn camera(&self) -> &Camera {
        self.controller.camera()
    }

    pub fn constants(&self) -> &ConstantBufferBank {
        &self.bank
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn output(&self) -> Option<&OutputInfo> {
        self.output.as_ref()
    }

    pub fn underwater_target(&self) -> Option<UnderwaterTarget> {
        self.underwater_target
    }

    pub fn states(&self) -> Option<&StateRegistry> {
        self.core.as_ref().map(|c| &c.states)
    }

    pub fn constant_buffers(&self) -> Option<&ConstantBuffers> {
        self.core.as_ref().map(|c| &c.constants)
    }

    pub fn shaders(&self) -> &ShaderProgramSet {
        &self.shaders
    }

    pub fn geometry(&self) -> &GeometryStore {
        &self.geometry
    }

    pub fn texture(&self, slot: TextureSlot) -> Option<TextureHandle> {
        self.textures.get(&slot).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::{encode_dds_header, RecordingDevice, TextureFormat};
    use crate::loader::MemorySource;

    fn full_source(config: &SceneConfig) -> Arc<dyn AssetSource> {
        let mut src = MemorySource::new();
        for read in LoadManifest::scene(&config.assets).reads {
            let bytes = if read.file.ends_with(".dds") {
                encode_dds_header(64, 64)
            } else {
                vec![0x44, 0x58, 0x42, 0x43]
            };
            src.insert(read.file, bytes);
        }
        Arc::new(src)
    }

    #[test]
    fn resize_recreates_the_underwater_target_in_back_buffer_format() {
        let config = SceneConfig::default();
        let device = RecordingDevice::new();
        let mut scene = SceneRenderer::new(config.clone(), full_source(&config)).unwrap();

        scene
            .create_window_size_resources(&device, OutputInfo::new(800, 600, TextureFormat::Bgra8Unorm))
            .unwrap();
        let first = scene.underwater_target().unwrap();
        scene
            .create_window_size_resources(&device, OutputInfo::new(1024, 768, TextureFormat::Rgba16Float))
            .unwrap();
        let second = scene.underwater_target().unwrap();

        assert_ne!(first, second);
        device.with_registry(|r| {
            assert!(!r.render_targets.contains_key(first.target));
            let t = r.render_targets[second.target];
            assert_eq!((t.width, t.height, t.format), (1024, 768, TextureFormat::Rgba16Float));
        });
        let expected = Lens::from_config(&config.camera)
            .projection(&OutputInfo::new(1024, 768, TextureFormat::Rgba16Float));
        assert_eq!(scene.constants().camera.projection, crate::constants::transposed(expected));
    }

    #[test]
    fn invalid_bytecode_keeps_the_scene_unready() {
        let config = SceneConfig::default();
        let mut src = MemorySource::new();
        for read in LoadManifest::scene(&config.assets).reads {
            src.insert(read.file, encode_dds_header(4, 4));
        }
        src.insert("WaterHull.cso", Vec::new());

        let device = RecordingDevice::new();
        let mut ctx = device.immediate_context();
        let mut scene = SceneRenderer::new(config, Arc::new(src)).unwrap();
        scene.create_device_resources(&device).unwrap();

        let err = scene.finish_loading(&device, &mut ctx).unwrap_err();
        assert!(matches!(
            err,
            LoadError::Device { source: DeviceError::InvalidBytecode { stage: ShaderStage::Hull, .. }, .. }
        ));
        assert_eq!(scene.state(), LoadState::Failed);
        assert!(!scene.is_ready());
    }

    #[test]
    fn create_twice_without_teardown_is_rejected() {
        let config = SceneConfig::default();
        let device = RecordingDevice::new();
        let mut scene = SceneRenderer::new(config.clone(), full_source(&config)).unwrap();
        scene.create_device_resources(&device).unwrap();
        assert!(matches!(
            scene.create_device_resources(&device),
            Err(SceneError::Load(LoadError::InvalidState(LoadState::Loading)))
        ));
    }

    #[test]
    fn update_moves_camera_and_time_before_loading() {
        let config = SceneConfig::default();
        let mut scene = SceneRenderer::new(config.clone(), full_source(&config)).unwrap();
        let mut flags = vec![false; 10];
        flags[4] = true;

        scene
            .update(&flags, FrameTiming { elapsed_seconds: 0.25, total_seconds: 3.0 })
            .unwrap();
        assert_eq!(scene.camera().eye.y, 5.25);
        assert_eq!(scene.constants().camera.eye[1], 5.25);
        assert_eq!(scene.constants().time.total_seconds, 3.0);
    }
}
