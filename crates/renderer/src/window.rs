use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use tracing::{error, info};
use winit::dpi::PhysicalSize;
use winit::event::{Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::window::{Window, WindowBuilder};

use crate::gpu::WgpuContext;
use crate::session::{mount_effect, FrameScheduler, FrameStatus, RenderSession, SurfaceHost};
use crate::types::RendererConfig;

impl SurfaceHost for Window {
    fn surface_size(&self) -> (u32, u32) {
        let size = self.inner_size();
        (size.width, size.height)
    }
}

/// Schedules the next tick as a winit redraw, which the compositor paces.
struct RedrawScheduler<'a>(&'a Window);

impl FrameScheduler for RedrawScheduler<'_> {
    fn request_frame(&mut self) {
        self.0.request_redraw();
    }
}

/// Owns the mounted effect and the window backing its surface.
///
/// Field order matters: the session (and its wgpu surface) drops before the
/// window it was created from.
struct WindowState {
    session: Option<RenderSession<WgpuContext>>,
    window: Arc<Window>,
    max_frames: Option<u64>,
}

impl WindowState {
    fn new(window: Arc<Window>, config: &RendererConfig) -> Self {
        let context = WgpuContext::new(
            window.as_ref(),
            window.as_ref().surface_size(),
            config.power_preference,
        );
        let session = mount_effect(context, window.as_ref());
        if session.is_none() {
            info!("window stays blank; close it to exit");
        }
        Self {
            session,
            window,
            max_frames: config.max_frames,
        }
    }

    /// Runs one tick; returns `false` once the loop should end.
    fn redraw(&mut self) -> bool {
        let Some(session) = self.session.as_mut() else {
            return true;
        };
        let mut scheduler = RedrawScheduler(self.window.as_ref());
        match session.frame(self.window.as_ref(), &mut scheduler) {
            Ok(FrameStatus::Rescheduled) => {
                if let Some(limit) = self.max_frames {
                    if session.frames_rendered() >= limit {
                        info!(frames = limit, "frame limit reached");
                        session.stop_handle().request_stop();
                    }
                }
                true
            }
            Ok(FrameStatus::Stopped) => false,
            Err(err) => {
                error!(error = %err, "render loop stopped");
                false
            }
        }
    }
}

/// Opens the window and drives the `winit` event loop until it closes or the
/// effect stops.
pub(crate) fn run_window(config: &RendererConfig) -> Result<()> {
    let event_loop = EventLoop::new().context("failed to initialize event loop")?;
    let window_size = PhysicalSize::new(config.surface_size.0, config.surface_size.1);
    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(window_size)
        .build(&event_loop)
        .context("failed to create window")?;
    let window = Arc::new(window);

    let mut state = WindowState::new(window, config);
    state.window.request_redraw();

    event_loop
        .run(move |event, elwt| {
            elwt.set_control_flow(ControlFlow::Wait);

            let Event::WindowEvent { window_id, event } = event else {
                return;
            };
            if window_id != state.window.id() {
                return;
            }
            match event {
                WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                    if let Some(session) = state.session.as_ref() {
                        session.stop_handle().request_stop();
                    }
                    elwt.exit();
                }
                WindowEvent::CursorMoved { position, .. } => {
                    if let Some(session) = state.session.as_mut() {
                        session.handle_pointer_moved(position.x, position.y);
                    }
                }
                WindowEvent::Resized(_) | WindowEvent::ScaleFactorChanged { .. } => {
                    let window = Arc::clone(&state.window);
                    if let Some(session) = state.session.as_mut() {
                        session.handle_resize(window.as_ref());
                    }
                }
                WindowEvent::RedrawRequested => {
                    if !state.redraw() {
                        elwt.exit();
                    }
                }
                _ => {}
            }
        })
        .map_err(|err| anyhow!("event loop error: {err}"))
}
