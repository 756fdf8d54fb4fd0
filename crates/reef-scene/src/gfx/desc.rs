//! Creation descriptors for device objects.

use super::types::{
    AddressMode, BlendFactor, BlendOp, ComparisonFunc, CullMode, DepthWriteMask, FillMode, Filter,
    TextureFormat, VertexFormat,
};

/// Bind point a buffer is created for.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BufferKind {
    Vertex,
    Index,
    Constant,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct BufferDesc {
    pub kind: BufferKind,
    /// Size in bytes. Constant buffers must be a multiple of 16.
    pub size: u32,
}

impl BufferDesc {
    pub fn vertex(size: u32) -> Self {
        Self { kind: BufferKind::Vertex, size }
    }

    pub fn index(size: u32) -> Self {
        Self { kind: BufferKind::Index, size }
    }

    pub fn constant(size: u32) -> Self {
        Self { kind: BufferKind::Constant, size }
    }
}

/// One element of an input layout.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct InputElement {
    pub semantic: &'static str,
    pub semantic_index: u32,
    pub format: VertexFormat,
    pub input_slot: u32,
    pub byte_offset: u32,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct RasterizerDesc {
    pub fill: FillMode,
    pub cull: CullMode,
    pub front_counter_clockwise: bool,
    pub depth_clip: bool,
}

impl Default for RasterizerDesc {
    /// Device defaults: solid fill, back-face culling, clockwise front faces.
    fn default() -> Self {
        Self {
            fill: FillMode::Solid,
            cull: CullMode::Back,
            front_counter_clockwise: false,
            depth_clip: true,
        }
    }
}

/// Blend configuration for render target 0.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct BlendDesc {
    pub enabled: bool,
    pub src: BlendFactor,
    pub dst: BlendFactor,
    pub op: BlendOp,
    pub src_alpha: BlendFactor,
    pub dst_alpha: BlendFactor,
    pub op_alpha: BlendOp,
}

impl BlendDesc {
    /// Straight alpha: `src * a + dst * (1 - a)`, alpha channel overwritten.
    pub fn alpha() -> Self {
        Self {
            enabled: true,
            src: BlendFactor::SrcAlpha,
            dst: BlendFactor::InvSrcAlpha,
            op: BlendOp::Add,
            src_alpha: BlendFactor::One,
            dst_alpha: BlendFactor::Zero,
            op_alpha: BlendOp::Add,
        }
    }

    pub fn opaque() -> Self {
        Self { enabled: false, ..Self::alpha() }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct DepthStencilDesc {
    pub depth_enable: bool,
    pub write_mask: DepthWriteMask,
    pub func: ComparisonFunc,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct SamplerDesc {
    pub filter: Filter,
    pub address_u: AddressMode,
    pub address_v: AddressMode,
    pub address_w: AddressMode,
    pub comparison: ComparisonFunc,
}

impl SamplerDesc {
    pub fn linear_wrap() -> Self {
        Self {
            filter: Filter::Linear,
            address_u: AddressMode::Wrap,
            address_v: AddressMode::Wrap,
            address_w: AddressMode::Wrap,
            comparison: ComparisonFunc::Never,
        }
    }
}

/// Off-screen colour target that can also be sampled.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct RenderTargetDesc {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}
