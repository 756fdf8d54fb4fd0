//! Loads the scene against the recording backend and renders a fixed number
//! of frames without opening a window.

use std::collections::BTreeMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use reef_scene::gfx::{RecordingContext, RecordingDevice, TextureFormat};
use reef_scene::{
    DirectorySource, FrameTargets, FrameTiming, OutputInfo, SceneConfig, SceneRenderer,
    INPUT_FLAG_COUNT,
};

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;
const STEP_SECONDS: f64 = 1.0 / 60.0;

/// Draw counts for one frame, keyed by pass region.
#[derive(Debug, Default, PartialEq)]
pub struct FrameSummary {
    pub commands: usize,
    pub draws: BTreeMap<&'static str, usize>,
}

impl FrameSummary {
    pub fn from_context(ctx: &RecordingContext) -> Self {
        let mut draws = BTreeMap::new();
        for draw in ctx.draws() {
            *draws.entry(draw.region.unwrap_or("unscoped")).or_insert(0) += 1;
        }
        Self {
            commands: ctx.commands().len(),
            draws,
        }
    }

    pub fn total_draws(&self) -> usize {
        self.draws.values().sum()
    }
}

pub fn run(config: SceneConfig, frames: u32) -> Result<()> {
    let device = RecordingDevice::new();
    let mut ctx = device.immediate_context();
    let (color, depth) = device
        .create_swap_chain_targets(WIDTH, HEIGHT, TextureFormat::Bgra8Unorm)
        .context("failed to create swap chain targets")?;
    let targets = FrameTargets { color, depth };

    let source = Arc::new(DirectorySource::new(&config.assets.directory));
    let mut scene = SceneRenderer::new(config, source).context("failed to start loader")?;
    scene
        .create_window_size_resources(&device, OutputInfo::new(WIDTH, HEIGHT, TextureFormat::Bgra8Unorm))
        .context("failed to create window size resources")?;
    scene
        .create_device_resources(&device)
        .context("failed to create device resources")?;
    let state = scene
        .finish_loading(&device, &mut ctx)
        .context("scene failed to load")?;
    log::info!("scene {state}, {} live device objects", device.live_objects());

    let idle = [false; INPUT_FLAG_COUNT];
    let mut last = FrameSummary::default();
    for frame in 0..frames {
        let timing = FrameTiming {
            elapsed_seconds: STEP_SECONDS,
            total_seconds: STEP_SECONDS * f64::from(frame + 1),
        };
        scene.update(&idle, timing)?;

        ctx.clear_log();
        scene
            .render(&mut ctx, &targets)
            .with_context(|| format!("frame {frame} failed"))?;
        last = FrameSummary::from_context(&ctx);
        log::debug!("frame {frame}: {} draws", last.total_draws());
    }

    println!("rendered {frames} frame(s)");
    println!("  commands per frame : {}", last.commands);
    println!("  draws per frame    : {}", last.total_draws());
    for (region, count) in &last.draws {
        println!("    {region:<20} {count}");
    }

    scene.release_device_resources(&device);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reef_scene::gfx::{DeviceContext, ShaderStage, Topology};

    #[test]
    fn summary_groups_draws_by_region() {
        let device = RecordingDevice::new();
        let mut ctx = device.immediate_context();
        assert_eq!(FrameSummary::from_context(&ctx), FrameSummary::default());

        // State changes count as commands even with nothing drawn.
        ctx.set_primitive_topology(Topology::TriangleList).unwrap();
        ctx.set_shader(ShaderStage::Vertex, None).unwrap();

        let summary = FrameSummary::from_context(&ctx);
        assert_eq!(summary.commands, 2);
        assert_eq!(summary.total_draws(), 0);
    }
}
