//! The frame driver: one object owning every piece of mutable render state.
//!
//! The host forwards three kinds of callbacks into a [`RenderSession`], all on
//! one thread:
//!
//! ```text
//!   viewport resized ──▶ handle_resize()        (also run once at mount)
//!   pointer moved    ──▶ handle_pointer_moved() (updates raw only)
//!   refresh tick     ──▶ frame() ─▶ smooth ─▶ uniforms ─▶ draw ─▶ reschedule
//! ```
//!
//! The loop ends when the session's [`StopHandle`] is triggered; the flag is
//! checked before drawing and again before asking for the next tick.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error, warn};

use crate::backend::{DrawCall, GraphicsContext, PrimitiveTopology, Viewport, CLEAR_WHITE};
use crate::error::{FrameError, SetupError};
use crate::geometry::{setup_geometry, GeometryBuffer};
use crate::pipeline::{build_pipeline, GridProgram};
use crate::pointer::PointerState;
use crate::shaders::{grid_fragment_source, grid_vertex_source, ShaderSource};

/// Anything that owns the drawable surface and can report its size.
pub trait SurfaceHost {
    /// Current size in device pixels.
    fn surface_size(&self) -> (u32, u32);
}

/// Requests a callback on the host's next display refresh.
pub trait FrameScheduler {
    fn request_frame(&mut self);
}

/// Surface dimensions in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewportState {
    pub width: u32,
    pub height: u32,
}

/// Shared cancellation flag for a running session.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    /// The next refresh tick was requested.
    Rescheduled,
    /// The stop flag was set; no further ticks were requested.
    Stopped,
}

pub struct RenderSession<C: GraphicsContext> {
    context: C,
    program: GridProgram<C>,
    geometry: GeometryBuffer<C::Buffer>,
    pointer: PointerState,
    viewport: ViewportState,
    stop: StopHandle,
    frames_rendered: u64,
}

impl<C: GraphicsContext> RenderSession<C> {
    /// Mounts the grid effect onto `context`.
    pub fn mount<H: SurfaceHost + ?Sized>(context: C, host: &H) -> Result<Self, SetupError> {
        Self::mount_with_sources(context, host, &grid_vertex_source(), &grid_fragment_source())
    }

    /// Builds the pipeline from explicit sources, uploads the quad, and runs
    /// the resize handler once so the first frame sees real dimensions.
    pub fn mount_with_sources<H: SurfaceHost + ?Sized>(
        mut context: C,
        host: &H,
        vertex: &ShaderSource,
        fragment: &ShaderSource,
    ) -> Result<Self, SetupError> {
        let program = build_pipeline(&mut context, vertex, fragment)?;
        let geometry = setup_geometry(&mut context, &program);
        let mut session = Self {
            context,
            program,
            geometry,
            pointer: PointerState::new(),
            viewport: ViewportState::default(),
            stop: StopHandle::new(),
            frames_rendered: 0,
        };
        session.handle_resize(host);
        Ok(session)
    }

    /// Matches the backing surface, viewport, and `resolution` uniform to the
    /// host's current size.
    pub fn handle_resize<H: SurfaceHost + ?Sized>(&mut self, host: &H) {
        let (width, height) = host.surface_size();
        self.viewport = ViewportState { width, height };
        self.context.resize_surface(width, height);
        self.context.set_viewport(Viewport {
            x: 0,
            y: 0,
            width,
            height,
        });
        self.context.set_uniform_vec2(
            self.program.resolution.as_ref(),
            [width as f32, height as f32],
        );
        debug!(width, height, "surface resized");
    }

    /// Records pointer motion in top-left-origin surface pixels. Takes effect
    /// on the next frame.
    pub fn handle_pointer_moved(&mut self, x: f64, y: f64) {
        self.pointer.record_move(x, y, self.viewport.height);
    }

    /// Runs one refresh tick: smooth, push uniforms, draw, reschedule.
    pub fn frame<H: SurfaceHost + ?Sized, S: FrameScheduler + ?Sized>(
        &mut self,
        host: &H,
        scheduler: &mut S,
    ) -> Result<FrameStatus, FrameError> {
        if self.stop.is_stopped() {
            return Ok(FrameStatus::Stopped);
        }

        self.pointer.advance();
        self.context
            .set_uniform_vec2(self.program.mouse.as_ref(), self.pointer.raw().to_array());
        self.context.set_uniform_vec2(
            self.program.delayed_mouse.as_ref(),
            self.pointer.smoothed().to_array(),
        );

        let call = DrawCall {
            clear_color: CLEAR_WHITE,
            topology: PrimitiveTopology::TriangleStrip,
            first: 0,
            count: self.geometry.vertex_count(),
        };
        match self.context.draw(&call) {
            Ok(()) => self.frames_rendered += 1,
            Err(FrameError::SurfaceLost | FrameError::SurfaceOutdated) => {
                self.handle_resize(host);
            }
            Err(FrameError::Timeout) => {
                warn!("surface timeout; retrying next frame");
            }
            Err(FrameError::OutOfMemory) => {
                error!("surface out of memory; stopping the effect");
                self.stop.request_stop();
                return Err(FrameError::OutOfMemory);
            }
            Err(other) => {
                warn!(error = %other, "frame failed; retrying next frame");
            }
        }

        if self.stop.is_stopped() {
            return Ok(FrameStatus::Stopped);
        }
        scheduler.request_frame();
        Ok(FrameStatus::Rescheduled)
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn pointer(&self) -> &PointerState {
        &self.pointer
    }

    pub fn viewport(&self) -> ViewportState {
        self.viewport
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    pub fn program(&self) -> &GridProgram<C> {
        &self.program
    }
}

/// Mounts the effect, logging any setup failure instead of returning it.
///
/// `None` means the surface stays inert; the host keeps running.
pub fn mount_effect<C, H>(context: Result<C, SetupError>, host: &H) -> Option<RenderSession<C>>
where
    C: GraphicsContext,
    H: SurfaceHost + ?Sized,
{
    match context.and_then(|context| RenderSession::mount(context, host)) {
        Ok(session) => Some(session),
        Err(err) => {
            error!(error = %err, "grid effect disabled");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::backend::recording::RecordingContext;
    use crate::shaders::{DELAYED_MOUSE_UNIFORM, MOUSE_UNIFORM, RESOLUTION_UNIFORM};

    struct FixedHost(Cell<(u32, u32)>);

    impl FixedHost {
        fn new(width: u32, height: u32) -> Self {
            Self(Cell::new((width, height)))
        }

        fn set(&self, width: u32, height: u32) {
            self.0.set((width, height));
        }
    }

    impl SurfaceHost for FixedHost {
        fn surface_size(&self) -> (u32, u32) {
            self.0.get()
        }
    }

    #[derive(Default)]
    struct CountingScheduler {
        requests: usize,
    }

    impl FrameScheduler for CountingScheduler {
        fn request_frame(&mut self) {
            self.requests += 1;
        }
    }

    fn mounted(width: u32, height: u32) -> (RenderSession<RecordingContext>, FixedHost) {
        let host = FixedHost::new(width, height);
        let session = RenderSession::mount(RecordingContext::new(), &host).unwrap();
        (session, host)
    }

    fn assert_close(actual: [f32; 2], expected: [f32; 2]) {
        for axis in 0..2 {
            assert!(
                (actual[axis] - expected[axis]).abs() < 1e-3,
                "expected {expected:?}, got {actual:?}"
            );
        }
    }

    #[test]
    fn mount_resizes_before_the_first_frame() {
        let (session, _host) = mounted(800, 600);
        let context = session.context();

        assert_eq!(context.surface_size, Some((800, 600)));
        assert_eq!(
            context.viewport,
            Some(Viewport {
                x: 0,
                y: 0,
                width: 800,
                height: 600
            })
        );
        assert_eq!(context.uniforms[RESOLUTION_UNIFORM], [800.0, 600.0]);
        assert!(context.draws.is_empty());
        assert_eq!(session.pointer().raw().to_array(), [0.0, 0.0]);
    }

    #[test]
    fn resize_is_idempotent() {
        let (mut session, host) = mounted(800, 600);
        host.set(1024, 768);
        session.handle_resize(&host);
        let viewport = session.context().viewport;
        let resolution = session.context().uniforms[RESOLUTION_UNIFORM];

        session.handle_resize(&host);
        assert_eq!(session.context().viewport, viewport);
        assert_eq!(session.context().uniforms[RESOLUTION_UNIFORM], resolution);
        assert_eq!(resolution, [1024.0, 768.0]);
        assert_eq!(
            session.viewport(),
            ViewportState {
                width: 1024,
                height: 768
            }
        );
    }

    #[test]
    fn pointer_events_flip_against_surface_height() {
        let (mut session, _host) = mounted(800, 600);
        session.handle_pointer_moved(10.0, 100.0);
        assert_eq!(session.pointer().raw().to_array(), [10.0, 500.0]);
    }

    #[test]
    fn frame_draws_a_white_cleared_strip_and_reschedules() {
        let (mut session, host) = mounted(800, 600);
        let mut scheduler = CountingScheduler::default();

        let status = session.frame(&host, &mut scheduler).unwrap();
        assert_eq!(status, FrameStatus::Rescheduled);
        assert_eq!(scheduler.requests, 1);
        assert_eq!(
            session.context().draws,
            vec![DrawCall {
                clear_color: [1.0, 1.0, 1.0, 1.0],
                topology: PrimitiveTopology::TriangleStrip,
                first: 0,
                count: 4,
            }]
        );
        assert_eq!(session.frames_rendered(), 1);
    }

    #[test]
    fn uniforms_are_pushed_every_frame_without_dirty_checks() {
        let (mut session, host) = mounted(800, 600);
        let mut scheduler = CountingScheduler::default();
        let writes_after_mount = session.context().uniform_writes;

        for _ in 0..3 {
            session.frame(&host, &mut scheduler).unwrap();
        }
        assert_eq!(session.context().uniform_writes, writes_after_mount + 6);
    }

    #[test]
    fn pointer_motion_reaches_the_next_frame_only() {
        let (mut session, host) = mounted(800, 600);
        let mut scheduler = CountingScheduler::default();

        session.frame(&host, &mut scheduler).unwrap();
        session.handle_pointer_moved(400.0, 300.0);
        assert_eq!(session.context().draw_snapshots[0][MOUSE_UNIFORM], [0.0, 0.0]);

        session.frame(&host, &mut scheduler).unwrap();
        let snapshot = &session.context().draw_snapshots[1];
        assert_eq!(snapshot[MOUSE_UNIFORM], [400.0, 300.0]);
        assert_close(snapshot[DELAYED_MOUSE_UNIFORM], [40.0, 30.0]);
    }

    #[test]
    fn smoothed_pointer_follows_the_reference_scenario() {
        let (mut session, host) = mounted(800, 600);
        let mut scheduler = CountingScheduler::default();
        session.handle_pointer_moved(400.0, 300.0);
        assert_eq!(session.pointer().raw().to_array(), [400.0, 300.0]);

        for _ in 0..10 {
            session.frame(&host, &mut scheduler).unwrap();
        }
        let remaining = 0.9_f32.powi(10);
        assert_close(
            session.pointer().smoothed().to_array(),
            [400.0 * (1.0 - remaining), 300.0 * (1.0 - remaining)],
        );
        assert_close(
            session.context().uniforms[DELAYED_MOUSE_UNIFORM],
            session.pointer().smoothed().to_array(),
        );
    }

    #[test]
    fn stop_handle_ends_the_loop() {
        let (mut session, host) = mounted(800, 600);
        let mut scheduler = CountingScheduler::default();
        let stop = session.stop_handle();

        session.frame(&host, &mut scheduler).unwrap();
        stop.request_stop();
        let status = session.frame(&host, &mut scheduler).unwrap();

        assert_eq!(status, FrameStatus::Stopped);
        assert_eq!(scheduler.requests, 1);
        assert_eq!(session.context().draws.len(), 1);
    }

    #[test]
    fn missing_uniform_writes_are_dropped() {
        let host = FixedHost::new(320, 240);
        let mut context = RecordingContext::new();
        context.hidden_uniforms.insert(MOUSE_UNIFORM.to_string());
        let mut session = RenderSession::mount(context, &host).unwrap();
        let mut scheduler = CountingScheduler::default();

        session.frame(&host, &mut scheduler).unwrap();
        assert_eq!(session.context().dropped_uniform_writes, 1);
        assert!(!session.context().uniforms.contains_key(MOUSE_UNIFORM));
        assert_eq!(session.context().draws.len(), 1);
    }

    #[test]
    fn lost_surface_is_resized_and_the_loop_continues() {
        let host = FixedHost::new(640, 480);
        let mut context = RecordingContext::new();
        context.queued_frame_errors.push(FrameError::SurfaceLost);
        let mut session = RenderSession::mount(context, &host).unwrap();
        let mut scheduler = CountingScheduler::default();
        let resizes = session.context().surface_resizes;

        let status = session.frame(&host, &mut scheduler).unwrap();
        assert_eq!(status, FrameStatus::Rescheduled);
        assert_eq!(session.context().surface_resizes, resizes + 1);
        assert_eq!(session.frames_rendered(), 0);
    }

    #[test]
    fn out_of_memory_stops_the_loop() {
        let host = FixedHost::new(640, 480);
        let mut context = RecordingContext::new();
        context.queued_frame_errors.push(FrameError::OutOfMemory);
        let mut session = RenderSession::mount(context, &host).unwrap();
        let mut scheduler = CountingScheduler::default();

        let err = session.frame(&host, &mut scheduler).unwrap_err();
        assert_eq!(err, FrameError::OutOfMemory);
        assert_eq!(scheduler.requests, 0);
        assert!(session.stop_handle().is_stopped());
    }

    #[test]
    fn setup_failure_leaves_the_surface_inert() {
        let host = FixedHost::new(640, 480);
        let unavailable: Result<RecordingContext, SetupError> =
            Err(SetupError::ContextUnavailable {
                reason: "no adapter".to_string(),
            });
        assert!(mount_effect(unavailable, &host).is_none());

        let mut context = RecordingContext::new();
        context.fail_link = true;
        assert!(mount_effect(Ok(context), &host).is_none());
    }

    #[test]
    fn broken_fragment_fails_the_mount() {
        let host = FixedHost::new(640, 480);
        let err = RenderSession::mount_with_sources(
            RecordingContext::new(),
            &host,
            &grid_vertex_source(),
            &ShaderSource::fragment("#version 450\nvoid main() {"),
        )
        .err()
        .expect("mount must fail");
        assert!(matches!(err, SetupError::ShaderCompile { .. }));
    }
}
