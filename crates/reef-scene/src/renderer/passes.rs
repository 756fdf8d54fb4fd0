//! The fixed per-frame pass sequence.
//!
//! Every pass leaves state behind for the next one, so the order here is
//! load-bearing: the snake pass moves the vertex buffer off the cube, which is
//! why terrain rebinds it, and plants leave alpha blending and read-only depth
//! bound until the next frame's setup resets them.

use std::collections::BTreeMap;

use super::scope::DepthStencilScope;
use crate::config::PassConfig;
use crate::constants::{ConstantBufferBank, ConstantBuffers};
use crate::family::{PassFamily, TextureSlot};
use crate::geometry::{GeometryStore, Mesh, MeshKind};
use crate::gfx::{
    DepthTargetHandle, DeviceContext, DeviceError, DeviceResult, RenderTargetHandle, ShaderStage,
    TextureHandle, Topology,
};
use crate::shaders::ShaderProgramSet;
use crate::states::StateRegistry;

/// Two triangles covering the screen.
pub const UNDERWATER_INDEX_COUNT: u32 = 6;

/// Main colour and depth targets for the frame.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct FrameTargets {
    pub color: RenderTargetHandle,
    pub depth: DepthTargetHandle,
}

/// Everything a frame reads, borrowed from the renderer.
pub(crate) struct FrameResources<'a> {
    pub states: &'a StateRegistry,
    pub constants: &'a ConstantBuffers,
    pub bank: &'a ConstantBufferBank,
    pub shaders: &'a ShaderProgramSet,
    pub geometry: &'a GeometryStore,
    pub textures: &'a BTreeMap<TextureSlot, TextureHandle>,
    pub passes: &'a PassConfig,
}

impl FrameResources<'_> {
    fn texture(&self, slot: TextureSlot) -> DeviceResult<TextureHandle> {
        self.textures
            .get(&slot)
            .copied()
            .ok_or(DeviceError::MissingResource(slot.name()))
    }
}

/// Runs `f` inside a named debug region, closing it on every exit path.
fn region<C, F>(ctx: &mut C, family: PassFamily, f: F) -> DeviceResult<()>
where
    C: DeviceContext + ?Sized,
    F: FnOnce(&mut C) -> DeviceResult<()>,
{
    ctx.begin_event(family.name());
    let result = f(ctx);
    ctx.end_event();
    result
}

pub(crate) fn render_frame(
    res: &FrameResources<'_>,
    ctx: &mut dyn DeviceContext,
    targets: &FrameTargets,
) -> DeviceResult<()> {
    res.constants.upload(ctx, res.bank)?;

    let cube = res.geometry.require(MeshKind::Cube)?;
    bind_steady_state(res, ctx, cube, targets)?;

    draw_program(ctx, res, PassFamily::Spheres, cube)?;
    if res.passes.implicit_shapes {
        draw_program(ctx, res, PassFamily::ImplicitShapes, cube)?;
    }
    draw_program(ctx, res, PassFamily::ImplicitPrimitives, cube)?;
    if res.passes.fractals {
        draw_program(ctx, res, PassFamily::Fractals, cube)?;
    }

    // Set even when snakes are off so the state entering the patch passes is fixed.
    ctx.set_primitive_topology(Topology::LineStrip)?;
    if res.passes.snakes {
        draw_snakes(ctx, res)?;
    }

    ctx.set_primitive_topology(Topology::PatchList4)?;
    region(ctx, PassFamily::Terrain, |ctx| {
        cube.bind(ctx)?;
        res.shaders.require(PassFamily::Terrain)?.bind(ctx)?;
        cube.draw(ctx)
    })?;
    draw_program(ctx, res, PassFamily::Water, cube)?;

    ctx.set_primitive_topology(Topology::PointList)?;
    draw_plants(ctx, res)?;

    if res.passes.underwater {
        draw_underwater(ctx, res, targets)?;
    }
    Ok(())
}

fn bind_steady_state(
    res: &FrameResources<'_>,
    ctx: &mut dyn DeviceContext,
    cube: &Mesh,
    targets: &FrameTargets,
) -> DeviceResult<()> {
    let layout = res
        .shaders
        .input_layout()
        .ok_or(DeviceError::MissingResource("primary input layout"))?;

    cube.bind(ctx)?;
    ctx.set_primitive_topology(Topology::TriangleList)?;
    ctx.set_input_layout(Some(layout))?;
    ctx.set_rasterizer_state(res.states.rasterizer(res.passes.wireframe))?;
    ctx.set_blend_state(res.states.opaque)?;
    ctx.set_depth_stencil_state(Some(res.states.depth_write), 0)?;
    ctx.set_render_targets(&[targets.color], Some(targets.depth))
}

/// Binds `family`'s program and draws `mesh` with whatever else is bound.
fn draw_program(
    ctx: &mut dyn DeviceContext,
    res: &FrameResources<'_>,
    family: PassFamily,
    mesh: &Mesh,
) -> DeviceResult<()> {
    region(ctx, family, |ctx| {
        res.shaders.require(family)?.bind(ctx)?;
        mesh.draw(ctx)
    })
}

/// Each strip is drawn with its own program.
fn draw_snakes(ctx: &mut dyn DeviceContext, res: &FrameResources<'_>) -> DeviceResult<()> {
    for (family, kind) in [
        (PassFamily::Snakes, MeshKind::SnakeStripX),
        (PassFamily::Snakes2, MeshKind::SnakeStripZ),
    ] {
        let strip = res.geometry.require(kind)?;
        region(ctx, family, |ctx| {
            strip.bind(ctx)?;
            res.shaders.require(family)?.bind(ctx)?;
            strip.draw(ctx)
        })?;
    }
    Ok(())
}

fn draw_plants(ctx: &mut dyn DeviceContext, res: &FrameResources<'_>) -> DeviceResult<()> {
    region(ctx, PassFamily::Plants, |ctx| {
        let grid = res.geometry.require(MeshKind::PlantGrid)?;
        grid.bind(ctx)?;
        res.shaders.require(PassFamily::Plants)?.bind(ctx)?;
        ctx.set_shader_resource(
            ShaderStage::Pixel,
            0,
            Some(res.texture(TextureSlot::PlantBillboard)?),
        )?;
        ctx.set_sampler(ShaderStage::Pixel, 0, Some(res.states.linear_wrap))?;
        ctx.set_depth_stencil_state(Some(res.states.depth_read_only), 0)?;
        ctx.set_blend_state(res.states.alpha_blend)?;
        grid.draw(ctx)
    })
}

fn draw_underwater(
    ctx: &mut dyn DeviceContext,
    res: &FrameResources<'_>,
    targets: &FrameTargets,
) -> DeviceResult<()> {
    let quad = res.geometry.require(MeshKind::FullScreenQuad)?;
    let screen = res.texture(TextureSlot::UnderwaterScreen)?;
    let program = res.shaders.require(PassFamily::Underwater)?;

    region(ctx, PassFamily::Underwater, |ctx| {
        let mut scope = DepthStencilScope::enter(ctx, res.states.depth_disabled)?;
        let ctx = scope.ctx();
        ctx.set_render_targets(&[targets.color], Some(targets.depth))?;
        ctx.set_input_layout(None)?;
        ctx.set_primitive_topology(Topology::TriangleList)?;
        quad.bind(ctx)?;
        ctx.set_shader_resource(ShaderStage::Pixel, 0, Some(screen))?;
        ctx.set_sampler(ShaderStage::Pixel, 0, Some(res.states.linear_wrap))?;
        program.bind(ctx)?;
        ctx.draw_indexed(UNDERWATER_INDEX_COUNT, 0, 0)?;
        scope.finish()
    })
}
