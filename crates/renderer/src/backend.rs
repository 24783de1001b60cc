//! The drawing-context seam between the effect and a graphics API.
//!
//! [`GraphicsContext`] is shaped after the classic compile/link/uniform model:
//! stages compile to opaque handles, a program links two of them, and values
//! are written through resolved locations. The wgpu implementation lives in
//! [`crate::gpu`]; tests drive the same code through a recording context.

use crate::error::FrameError;
use crate::shaders::ShaderSource;

/// Opaque white, the effect's background.
pub const CLEAR_WHITE: [f64; 4] = [1.0, 1.0, 1.0, 1.0];

/// Component type of a vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentType {
    Float32,
}

/// How one attribute is read from a vertex buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttributeLayout {
    pub components: u32,
    pub component_type: ComponentType,
    pub normalized: bool,
    /// Bytes between consecutive vertices; zero means tightly packed.
    pub stride: u64,
    pub offset: u64,
}

impl VertexAttributeLayout {
    /// Tightly packed, non-normalized `f32` components starting at offset zero.
    pub const fn packed_f32(components: u32) -> Self {
        Self {
            components,
            component_type: ComponentType::Float32,
            normalized: false,
            stride: 0,
            offset: 0,
        }
    }

    pub fn effective_stride(&self) -> u64 {
        if self.stride == 0 {
            u64::from(self.components) * 4
        } else {
            self.stride
        }
    }
}

/// Rectangle of the surface that draws map onto, in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveTopology {
    TriangleStrip,
}

/// Clear-then-draw request for one presented frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawCall {
    pub clear_color: [f64; 4],
    pub topology: PrimitiveTopology,
    pub first: u32,
    pub count: u32,
}

/// A hardware-accelerated drawing context bound to one surface.
pub trait GraphicsContext {
    type Stage;
    type Program;
    type Buffer;
    type UniformLocation;

    /// Compiles one stage. On failure the context has already released
    /// anything it allocated and returns its diagnostic text.
    fn compile_stage(&mut self, source: &ShaderSource) -> Result<Self::Stage, String>;

    fn release_stage(&mut self, stage: Self::Stage);

    /// Links two compiled stages; the program takes ownership of both.
    fn link_program(
        &mut self,
        vertex: Self::Stage,
        fragment: Self::Stage,
    ) -> Result<Self::Program, String>;

    /// Sets the current program, or clears the binding with `None`.
    fn use_program(&mut self, program: Option<&Self::Program>);

    fn attribute_location(&self, program: &Self::Program, name: &str) -> Option<u32>;

    /// `None` is the "not found" sentinel; writes through it are no-ops.
    fn uniform_location(&self, program: &Self::Program, name: &str)
        -> Option<Self::UniformLocation>;

    fn create_vertex_buffer(&mut self, data: &[f32]) -> Self::Buffer;

    fn bind_vertex_attribute(
        &mut self,
        location: u32,
        buffer: &Self::Buffer,
        layout: VertexAttributeLayout,
    );

    /// Resizes the backing surface to `width` x `height` device pixels.
    fn resize_surface(&mut self, width: u32, height: u32);

    fn set_viewport(&mut self, viewport: Viewport);

    fn set_uniform_vec2(&mut self, location: Option<&Self::UniformLocation>, value: [f32; 2]);

    /// Clears, draws with the current program, and presents.
    fn draw(&mut self, call: &DrawCall) -> Result<(), FrameError>;
}

#[cfg(test)]
pub(crate) mod recording {
    //! In-memory [`GraphicsContext`] that records every call.

    use std::collections::{BTreeMap, HashSet};

    use super::*;

    pub(crate) struct RecordedStage {
        pub id: u32,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct RecordedProgram {
        pub id: u32,
    }

    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub(crate) struct RecordedUniform {
        pub program: u32,
        pub name: String,
    }

    #[derive(Default)]
    pub(crate) struct RecordingContext {
        next_id: u32,
        pub fail_link: bool,
        pub hidden_uniforms: HashSet<String>,
        pub queued_frame_errors: Vec<FrameError>,
        pub live_stages: HashSet<u32>,
        pub released_stages: Vec<u32>,
        pub current_program: Option<u32>,
        pub buffers: BTreeMap<u32, Vec<f32>>,
        pub attribute_bindings: BTreeMap<u32, (u32, VertexAttributeLayout)>,
        pub surface_size: Option<(u32, u32)>,
        pub surface_resizes: usize,
        pub viewport: Option<Viewport>,
        pub uniforms: BTreeMap<String, [f32; 2]>,
        pub uniform_writes: usize,
        pub dropped_uniform_writes: usize,
        pub draws: Vec<DrawCall>,
        pub draw_snapshots: Vec<BTreeMap<String, [f32; 2]>>,
    }

    impl RecordingContext {
        pub(crate) fn new() -> Self {
            Self::default()
        }

        fn allocate(&mut self) -> u32 {
            self.next_id += 1;
            self.next_id
        }
    }

    impl GraphicsContext for RecordingContext {
        type Stage = RecordedStage;
        type Program = RecordedProgram;
        type Buffer = u32;
        type UniformLocation = RecordedUniform;

        fn compile_stage(&mut self, source: &ShaderSource) -> Result<RecordedStage, String> {
            let text = source.text.as_ref();
            let balanced = text.matches('{').count() == text.matches('}').count();
            if !text.contains("void main()") || !balanced {
                return Err(format!("{} stage: syntax error", source.stage));
            }
            let id = self.allocate();
            self.live_stages.insert(id);
            Ok(RecordedStage { id })
        }

        fn release_stage(&mut self, stage: RecordedStage) {
            self.live_stages.remove(&stage.id);
            self.released_stages.push(stage.id);
        }

        fn link_program(
            &mut self,
            vertex: RecordedStage,
            fragment: RecordedStage,
        ) -> Result<RecordedProgram, String> {
            if self.fail_link {
                self.release_stage(vertex);
                self.release_stage(fragment);
                return Err("fragment input has no matching vertex output".to_string());
            }
            Ok(RecordedProgram {
                id: self.allocate(),
            })
        }

        fn use_program(&mut self, program: Option<&RecordedProgram>) {
            self.current_program = program.map(|program| program.id);
        }

        fn attribute_location(&self, _program: &RecordedProgram, name: &str) -> Option<u32> {
            (name == crate::shaders::POSITION_ATTRIBUTE).then_some(0)
        }

        fn uniform_location(
            &self,
            program: &RecordedProgram,
            name: &str,
        ) -> Option<RecordedUniform> {
            if self.hidden_uniforms.contains(name) {
                return None;
            }
            Some(RecordedUniform {
                program: program.id,
                name: name.to_string(),
            })
        }

        fn create_vertex_buffer(&mut self, data: &[f32]) -> u32 {
            let id = self.allocate();
            self.buffers.insert(id, data.to_vec());
            id
        }

        fn bind_vertex_attribute(
            &mut self,
            location: u32,
            buffer: &u32,
            layout: VertexAttributeLayout,
        ) {
            self.attribute_bindings.insert(location, (*buffer, layout));
        }

        fn resize_surface(&mut self, width: u32, height: u32) {
            self.surface_size = Some((width, height));
            self.surface_resizes += 1;
        }

        fn set_viewport(&mut self, viewport: Viewport) {
            self.viewport = Some(viewport);
        }

        fn set_uniform_vec2(&mut self, location: Option<&RecordedUniform>, value: [f32; 2]) {
            match location {
                Some(location) => {
                    self.uniforms.insert(location.name.clone(), value);
                    self.uniform_writes += 1;
                }
                None => self.dropped_uniform_writes += 1,
            }
        }

        fn draw(&mut self, call: &DrawCall) -> Result<(), FrameError> {
            if !self.queued_frame_errors.is_empty() {
                return Err(self.queued_frame_errors.remove(0));
            }
            self.draws.push(*call);
            self.draw_snapshots.push(self.uniforms.clone());
            Ok(())
        }
    }
}
