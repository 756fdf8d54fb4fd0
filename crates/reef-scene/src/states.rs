//! Rasteriser, blend, depth-stencil and sampler objects, created once per device.

use crate::gfx::{
    BlendDesc, BlendStateHandle, ComparisonFunc, CullMode, DepthStencilDesc,
    DepthStencilStateHandle, DepthWriteMask, FillMode, GraphicsDevice, DeviceResult, RasterizerDesc,
    RasterizerStateHandle, Resource, SamplerDesc, SamplerHandle,
};

pub fn solid_no_cull() -> RasterizerDesc {
    RasterizerDesc {
        fill: FillMode::Solid,
        cull: CullMode::None,
        ..RasterizerDesc::default()
    }
}

pub fn wireframe_back_cull() -> RasterizerDesc {
    RasterizerDesc {
        fill: FillMode::Wireframe,
        cull: CullMode::Back,
        ..RasterizerDesc::default()
    }
}

/// Less-equal test, full depth write. The steady state for opaque passes.
pub fn depth_write() -> DepthStencilDesc {
    DepthStencilDesc {
        depth_enable: true,
        write_mask: DepthWriteMask::All,
        func: ComparisonFunc::LessEqual,
    }
}

/// Less-equal test without write, for translucent billboards.
pub fn depth_read_only() -> DepthStencilDesc {
    DepthStencilDesc {
        write_mask: DepthWriteMask::Zero,
        ..depth_write()
    }
}

pub fn depth_disabled() -> DepthStencilDesc {
    DepthStencilDesc {
        depth_enable: false,
        write_mask: DepthWriteMask::Zero,
        func: ComparisonFunc::Always,
    }
}

/// Every fixed-function state object the passes switch between.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct StateRegistry {
    pub solid: RasterizerStateHandle,
    pub wireframe: RasterizerStateHandle,
    pub opaque: BlendStateHandle,
    pub alpha_blend: BlendStateHandle,
    pub depth_write: DepthStencilStateHandle,
    pub depth_read_only: DepthStencilStateHandle,
    pub depth_disabled: DepthStencilStateHandle,
    pub linear_wrap: SamplerHandle,
}

impl StateRegistry {
    pub fn create(device: &dyn GraphicsDevice) -> DeviceResult<Self> {
        Ok(Self {
            solid: device.create_rasterizer_state(&solid_no_cull())?,
            wireframe: device.create_rasterizer_state(&wireframe_back_cull())?,
            opaque: device.create_blend_state(&BlendDesc::opaque())?,
            alpha_blend: device.create_blend_state(&BlendDesc::alpha())?,
            depth_write: device.create_depth_stencil_state(&depth_write())?,
            depth_read_only: device.create_depth_stencil_state(&depth_read_only())?,
            depth_disabled: device.create_depth_stencil_state(&depth_disabled())?,
            linear_wrap: device.create_sampler(&SamplerDesc::linear_wrap())?,
        })
    }

    pub fn rasterizer(&self, wireframe: bool) -> RasterizerStateHandle {
        if wireframe { self.wireframe } else { self.solid }
    }

    pub fn release(&self, device: &dyn GraphicsDevice) {
        let all: [Resource; 8] = [
            self.solid.into(),
            self.wireframe.into(),
            self.opaque.into(),
            self.alpha_blend.into(),
            self.depth_write.into(),
            self.depth_read_only.into(),
            self.depth_disabled.into(),
            self.linear_wrap.into(),
        ];
        for r in all {
            device.release(r);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::RecordingDevice;

    #[test]
    fn creates_distinct_objects_with_expected_descriptors() {
        let device = RecordingDevice::new();
        let states = StateRegistry::create(&device).unwrap();
        assert_eq!(device.live_objects(), 8);

        device.with_registry(|r| {
            assert_eq!(r.rasterizers[states.solid].cull, CullMode::None);
            assert_eq!(r.rasterizers[states.wireframe].fill, FillMode::Wireframe);
            assert!(r.blends[states.alpha_blend].enabled);
            assert!(!r.blends[states.opaque].enabled);
            assert_eq!(r.depth_stencils[states.depth_read_only].write_mask, DepthWriteMask::Zero);
            assert!(!r.depth_stencils[states.depth_disabled].depth_enable);
        });

        assert_ne!(states.depth_write, states.depth_read_only);
        assert_eq!(states.rasterizer(true), states.wireframe);

        states.release(&device);
        assert_eq!(device.live_objects(), 0);
    }
}
