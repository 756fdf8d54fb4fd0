use crate::gfx::{DepthStencilStateHandle, DeviceContext, DeviceResult};

/// Temporarily overrides the bound depth-stencil state.
///
/// The state and stencil reference bound at [`DepthStencilScope::enter`] are
/// put back by [`DepthStencilScope::finish`], or on drop if the scope is left
/// early (e.g. through `?`).
pub struct DepthStencilScope<'a, C: DeviceContext + ?Sized> {
    ctx: &'a mut C,
    saved: (Option<DepthStencilStateHandle>, u32),
    restored: bool,
}

impl<'a, C: DeviceContext + ?Sized> DepthStencilScope<'a, C> {
    pub fn enter(ctx: &'a mut C, state: DepthStencilStateHandle) -> DeviceResult<Self> {
        let saved = ctx.depth_stencil_state();
        ctx.set_depth_stencil_state(Some(state), 0)?;
        Ok(Self {
            ctx,
            saved,
            restored: false,
        })
    }

    pub fn ctx(&mut self) -> &mut C {
        &mut *self.ctx
    }

    /// Restores the saved state, reporting a failed restore.
    pub fn finish(mut self) -> DeviceResult<()> {
        self.restore()
    }

    fn restore(&mut self) -> DeviceResult<()> {
        self.restored = true;
        let (state, stencil_ref) = self.saved;
        self.ctx.set_depth_stencil_state(state, stencil_ref)
    }
}

impl<C: DeviceContext + ?Sized> Drop for DepthStencilScope<'_, C> {
    fn drop(&mut self) {
        if !self.restored
            && let Err(e) = self.restore()
        {
            log::error!("failed to restore depth-stencil state: {e}");
        }
    }
}
