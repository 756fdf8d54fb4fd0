use std::fmt;

/// Programmable pipeline stage.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub enum ShaderStage {
    Vertex,
    Hull,
    Domain,
    Geometry,
    Pixel,
}

impl ShaderStage {
    /// All stages in pipeline order.
    pub const ALL: [ShaderStage; 5] = [
        ShaderStage::Vertex,
        ShaderStage::Hull,
        ShaderStage::Domain,
        ShaderStage::Geometry,
        ShaderStage::Pixel,
    ];

    #[inline]
    pub(crate) fn index(self) -> usize {
        match self {
            ShaderStage::Vertex => 0,
            ShaderStage::Hull => 1,
            ShaderStage::Domain => 2,
            ShaderStage::Geometry => 3,
            ShaderStage::Pixel => 4,
        }
    }

    pub fn short_name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "VS",
            ShaderStage::Hull => "HS",
            ShaderStage::Domain => "DS",
            ShaderStage::Geometry => "GS",
            ShaderStage::Pixel => "PS",
        }
    }
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Primitive assembly mode for the bound vertex/index data.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Topology {
    TriangleList,
    LineStrip,
    /// Patch list with four control points (quad-domain tessellation).
    PatchList4,
    PointList,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum IndexFormat {
    U16,
    U32,
}

impl IndexFormat {
    pub fn size(self) -> u32 {
        match self {
            IndexFormat::U16 => 2,
            IndexFormat::U32 => 4,
        }
    }
}

/// Texel formats the demo's render targets can take.
///
/// Colour targets follow the swapchain back-buffer format.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum TextureFormat {
    Bgra8Unorm,
    Bgra8UnormSrgb,
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Rgba16Float,
    Rgb10a2Unorm,
    Depth32Float,
}

impl TextureFormat {
    pub fn is_depth(self) -> bool {
        matches!(self, TextureFormat::Depth32Float)
    }
}

/// Vertex attribute formats accepted by input layouts.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum VertexFormat {
    Float32x2,
    Float32x3,
    Float32x4,
}

impl VertexFormat {
    pub fn size(self) -> u32 {
        match self {
            VertexFormat::Float32x2 => 8,
            VertexFormat::Float32x3 => 12,
            VertexFormat::Float32x4 => 16,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum FillMode {
    Solid,
    Wireframe,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum CullMode {
    None,
    Front,
    Back,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    InvSrcAlpha,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum BlendOp {
    Add,
    Subtract,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ComparisonFunc {
    Never,
    Less,
    LessEqual,
    Equal,
    Always,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum DepthWriteMask {
    Zero,
    All,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Filter {
    Point,
    Linear,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum AddressMode {
    Wrap,
    Clamp,
    Mirror,
}
