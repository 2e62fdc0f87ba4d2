use winit::event::WindowEvent;

use super::ctx::{FrameCtx, LoadCtx};

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Lifecycle hooks implemented by the application.
///
/// The runtime calls them in a fixed order: `load` once after the device
/// exists, then `update` and `render` once per frame, then `unload` once
/// before the device is dropped.
pub trait App {
    /// Creates GPU resources. An error aborts startup and is returned from
    /// [`Runtime::run`](crate::window::Runtime::run).
    fn load(&mut self, ctx: &mut LoadCtx<'_, '_>) -> anyhow::Result<()>;

    /// Called for every window event before the runtime handles it.
    fn on_window_event(&mut self, event: &WindowEvent) -> AppControl {
        let _ = event;
        AppControl::Continue
    }

    /// Per-frame simulation step.
    fn update(&mut self, ctx: &mut FrameCtx<'_, '_>) {
        let _ = ctx;
    }

    /// Records and presents one frame.
    fn render(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;

    /// Releases application resources. The device is still alive here.
    fn unload(&mut self) {}
}
