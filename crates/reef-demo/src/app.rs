//! Windowed driver: the scene renders into the recording backend every frame
//! while the wgpu surface is cleared and presented.

use std::sync::Arc;

use anyhow::{Context, Result};
use reef_engine::core::{App, AppControl, FrameCtx};
use reef_engine::device::Gpu;
use reef_engine::input::Key;
use reef_scene::gfx::{GraphicsDevice, RecordingContext, RecordingDevice, Resource, TextureFormat};
use reef_scene::{
    AssetSource, DirectorySource, FrameTargets, FrameTiming, LoadState, OutputInfo, SceneConfig,
    SceneRenderer,
};

use crate::bindings::FlagBindings;

/// Colour shown behind the scene.
const CLEAR_COLOUR: wgpu::Color = wgpu::Color {
    r: 0.0,
    g: 0.2,
    b: 0.4,
    a: 1.0,
};

pub struct ReefApp {
    scene: SceneRenderer,
    device: RecordingDevice,
    ctx: RecordingContext,
    targets: Option<FrameTargets>,
    bindings: FlagBindings,
    /// Last load state reported, so transitions are logged once.
    reported: LoadState,
}

impl ReefApp {
    pub fn new(config: SceneConfig) -> Result<Self> {
        let source = Arc::new(DirectorySource::new(&config.assets.directory));
        Self::with_source(config, source)
    }

    fn with_source(config: SceneConfig, source: Arc<dyn AssetSource>) -> Result<Self> {
        let scene = SceneRenderer::new(config, source).context("failed to start loader")?;
        let device = RecordingDevice::new();
        let ctx = device.immediate_context();

        Ok(Self {
            scene,
            device,
            ctx,
            targets: None,
            bindings: FlagBindings::default(),
            reported: LoadState::NotLoaded,
        })
    }

    fn rebuild_targets(&mut self, output: OutputInfo) -> Result<()> {
        if let Some(old) = self.targets.take() {
            self.device.release(Resource::from(old.color));
            self.device.release(Resource::from(old.depth));
        }
        let (color, depth) =
            self.device
                .create_swap_chain_targets(output.width, output.height, output.format)?;
        self.targets = Some(FrameTargets { color, depth });

        self.scene.create_window_size_resources(&self.device, output)?;
        if self.scene.state() == LoadState::NotLoaded {
            self.scene.create_device_resources(&self.device)?;
        }
        Ok(())
    }

    /// Drops every scene device object and reloads, as after a lost device.
    fn simulate_device_lost(&mut self) -> Result<()> {
        log::warn!("simulating device loss");
        self.scene.release_device_resources(&self.device);
        let output = self
            .scene
            .output()
            .copied()
            .context("no output size recorded")?;
        self.rebuild_targets(output)
    }

    fn poll(&mut self) -> Result<LoadState> {
        let state = self
            .scene
            .poll_loading(&self.device, &mut self.ctx)
            .context("scene failed to load")?;
        if state != self.reported {
            log::info!("scene {state}");
            self.reported = state;
        }
        Ok(state)
    }

    /// Advances loading, then updates and renders one frame. Any error is fatal.
    fn step(&mut self, flags: &[bool], timing: FrameTiming, frame_index: u64) -> Result<()> {
        self.poll()?;
        self.scene.update(flags, timing).context("frame input rejected")?;

        if let Some(targets) = self.targets {
            self.ctx.clear_log();
            self.scene
                .render(&mut self.ctx, &targets)
                .with_context(|| format!("frame {frame_index} failed"))?;
            log::trace!(
                "frame {frame_index}: {} commands, {} draws",
                self.ctx.commands().len(),
                self.ctx.draws().len()
            );
        }
        Ok(())
    }
}

impl App for ReefApp {
    fn on_resize(&mut self, gpu: &Gpu<'_>) -> AppControl {
        let size = gpu.size();
        let Some(format) = scene_format(gpu.surface_format()) else {
            log::error!("unsupported surface format {:?}", gpu.surface_format());
            return AppControl::Exit;
        };

        match self.rebuild_targets(OutputInfo::new(size.width, size.height, format)) {
            Ok(()) => AppControl::Continue,
            Err(e) => {
                log::error!("failed to rebuild window size resources: {e:#}");
                AppControl::Exit
            }
        }
    }

    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl {
        if ctx.input_frame.pressed(Key::Escape) {
            return AppControl::Exit;
        }
        if ctx.input_frame.pressed(Key::F5) {
            if let Err(e) = self.simulate_device_lost() {
                log::error!("reload failed: {e:#}");
                return AppControl::Exit;
            }
        }

        let flags = self.bindings.flags(ctx.input);
        let timing = FrameTiming {
            elapsed_seconds: ctx.time.elapsed_seconds,
            total_seconds: ctx.time.total_seconds,
        };
        if let Err(e) = self.step(&flags, timing, ctx.time.frame_index) {
            ctx.runtime.fail(e);
            return AppControl::Exit;
        }

        ctx.clear_and_present(CLEAR_COLOUR)
    }
}

/// The scene's view of a wgpu surface format.
fn scene_format(format: wgpu::TextureFormat) -> Option<TextureFormat> {
    let f = match format {
        wgpu::TextureFormat::Bgra8Unorm => TextureFormat::Bgra8Unorm,
        wgpu::TextureFormat::Bgra8UnormSrgb => TextureFormat::Bgra8UnormSrgb,
        wgpu::TextureFormat::Rgba8Unorm => TextureFormat::Rgba8Unorm,
        wgpu::TextureFormat::Rgba8UnormSrgb => TextureFormat::Rgba8UnormSrgb,
        wgpu::TextureFormat::Rgba16Float => TextureFormat::Rgba16Float,
        wgpu::TextureFormat::Rgb10a2Unorm => TextureFormat::Rgb10a2Unorm,
        _ => return None,
    };
    Some(f)
}

#[cfg(test)]
mod tests {
    use std::thread;
    use std::time::{Duration, Instant};

    use reef_scene::gfx::{encode_dds_header, CommandKind};
    use reef_scene::loader::LoadManifest;
    use reef_scene::{MemorySource, INPUT_FLAG_COUNT};

    use super::*;

    const TIMING: FrameTiming = FrameTiming {
        elapsed_seconds: 1.0 / 60.0,
        total_seconds: 1.0,
    };

    fn memory_app(config: SceneConfig) -> ReefApp {
        let mut src = MemorySource::new();
        for read in LoadManifest::scene(&config.assets).reads {
            let bytes = if read.file.ends_with(".dds") {
                encode_dds_header(64, 64)
            } else {
                b"DXBC".to_vec()
            };
            src.insert(read.file, bytes);
        }
        ReefApp::with_source(config, Arc::new(src)).unwrap()
    }

    /// Steps frames until loading leaves `Loading` or a step fails.
    fn step_until_settled(app: &mut ReefApp) -> Result<()> {
        let flags = [false; INPUT_FLAG_COUNT];
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut frame = 0;
        loop {
            app.step(&flags, TIMING, frame)?;
            if app.scene.state() != LoadState::Loading {
                return Ok(());
            }
            assert!(Instant::now() < deadline, "loading never settled");
            frame += 1;
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn surface_formats_map_to_colour_formats() {
        assert_eq!(
            scene_format(wgpu::TextureFormat::Bgra8UnormSrgb),
            Some(TextureFormat::Bgra8UnormSrgb)
        );
        assert_eq!(scene_format(wgpu::TextureFormat::Depth32Float), None);
    }

    #[test]
    fn resize_replaces_swap_chain_targets() {
        let mut app = ReefApp::new(SceneConfig::default()).unwrap();
        app.rebuild_targets(OutputInfo::new(800, 600, TextureFormat::Bgra8Unorm))
            .unwrap();
        let first = app.targets.unwrap();
        let live = app.device.live_objects();

        app.rebuild_targets(OutputInfo::new(1024, 768, TextureFormat::Bgra8Unorm))
            .unwrap();
        assert_ne!(app.targets.unwrap(), first);
        assert_eq!(app.device.live_objects(), live);
        assert_eq!(app.scene.output().map(|o| o.width), Some(1024));
    }

    #[test]
    fn missing_assets_fail_the_frame_step() {
        let mut config = SceneConfig::default();
        config.assets.directory = std::env::temp_dir().join("reef-demo-assets-that-do-not-exist");
        let mut app = ReefApp::new(config).unwrap();
        app.rebuild_targets(OutputInfo::new(800, 600, TextureFormat::Bgra8Unorm))
            .unwrap();

        let err = step_until_settled(&mut app).unwrap_err();
        assert!(format!("{err:#}").starts_with("scene failed to load"));
        assert_eq!(app.scene.state(), LoadState::Failed);
    }

    #[test]
    fn render_error_fails_the_frame_step() {
        let mut app = memory_app(SceneConfig::default());
        app.rebuild_targets(OutputInfo::new(800, 600, TextureFormat::Bgra8Unorm))
            .unwrap();
        step_until_settled(&mut app).unwrap();
        assert_eq!(app.scene.state(), LoadState::Ready);

        app.ctx.fail_next(CommandKind::DrawIndexed);
        let err = app
            .step(&[false; INPUT_FLAG_COUNT], TIMING, 7)
            .unwrap_err();
        assert!(err.to_string().contains("frame 7 failed"));

        // Draws issue normally once the fault is consumed.
        app.step(&[false; INPUT_FLAG_COUNT], TIMING, 8).unwrap();
        assert!(!app.ctx.draws().is_empty());
    }
}
