use slotmap::new_key_type;

// Generational handles: a handle outliving its object is detected instead of
// silently aliasing a newer one.
new_key_type! { pub struct BufferHandle; }
new_key_type! { pub struct ShaderHandle; }
new_key_type! { pub struct InputLayoutHandle; }
new_key_type! { pub struct RasterizerStateHandle; }
new_key_type! { pub struct BlendStateHandle; }
new_key_type! { pub struct DepthStencilStateHandle; }
new_key_type! { pub struct SamplerHandle; }
new_key_type! { pub struct TextureHandle; }
new_key_type! { pub struct RenderTargetHandle; }
new_key_type! { pub struct DepthTargetHandle; }

/// Any releasable device object.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Resource {
    Buffer(BufferHandle),
    Shader(ShaderHandle),
    InputLayout(InputLayoutHandle),
    Rasterizer(RasterizerStateHandle),
    Blend(BlendStateHandle),
    DepthStencil(DepthStencilStateHandle),
    Sampler(SamplerHandle),
    Texture(TextureHandle),
    RenderTarget(RenderTargetHandle),
    DepthTarget(DepthTargetHandle),
}

macro_rules! impl_from_handle {
    ($($handle:ident => $variant:ident),* $(,)?) => {
        $(
            impl From<$handle> for Resource {
                #[inline]
                fn from(h: $handle) -> Self {
                    Resource::$variant(h)
                }
            }
        )*
    };
}

impl_from_handle! {
    BufferHandle => Buffer,
    ShaderHandle => Shader,
    InputLayoutHandle => InputLayout,
    RasterizerStateHandle => Rasterizer,
    BlendStateHandle => Blend,
    DepthStencilStateHandle => DepthStencil,
    SamplerHandle => Sampler,
    TextureHandle => Texture,
    RenderTargetHandle => RenderTarget,
    DepthTargetHandle => DepthTarget,
}
