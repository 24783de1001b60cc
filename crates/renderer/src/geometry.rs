use tracing::warn;

use crate::backend::{GraphicsContext, VertexAttributeLayout};
use crate::pipeline::GridProgram;

/// Full-viewport quad in normalized device coordinates, ordered for a
/// triangle strip: (0, 1, 2) and (1, 2, 3) cover the surface.
pub const QUAD_VERTICES: [f32; 8] = [-1.0, -1.0, 1.0, -1.0, -1.0, 1.0, 1.0, 1.0];
pub const QUAD_COMPONENTS: u32 = 2;
pub const QUAD_VERTEX_COUNT: u32 = QUAD_VERTICES.len() as u32 / QUAD_COMPONENTS;

/// The uploaded quad; immutable for the life of the surface.
pub struct GeometryBuffer<B> {
    buffer: B,
    vertex_count: u32,
}

impl<B> GeometryBuffer<B> {
    pub fn buffer(&self) -> &B {
        &self.buffer
    }

    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }
}

/// Uploads the quad and wires it to the program's `position` attribute.
pub fn setup_geometry<C: GraphicsContext>(
    context: &mut C,
    program: &GridProgram<C>,
) -> GeometryBuffer<C::Buffer> {
    let buffer = context.create_vertex_buffer(&QUAD_VERTICES);
    match program.position_location() {
        Some(location) => context.bind_vertex_attribute(
            location,
            &buffer,
            VertexAttributeLayout::packed_f32(QUAD_COMPONENTS),
        ),
        None => warn!("grid program has no position attribute; quad left unbound"),
    }
    GeometryBuffer {
        buffer,
        vertex_count: QUAD_VERTEX_COUNT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::RecordingContext;
    use crate::backend::ComponentType;
    use crate::pipeline::build_pipeline;
    use crate::shaders::{grid_fragment_source, grid_vertex_source};

    #[test]
    fn uploads_the_quad_and_binds_position() {
        let mut context = RecordingContext::new();
        let program =
            build_pipeline(&mut context, &grid_vertex_source(), &grid_fragment_source()).unwrap();
        let geometry = setup_geometry(&mut context, &program);

        assert_eq!(geometry.vertex_count(), 4);
        assert_eq!(
            context.buffers.get(geometry.buffer()).map(Vec::as_slice),
            Some(&QUAD_VERTICES[..])
        );

        let (buffer, layout) = context.attribute_bindings[&0];
        assert_eq!(buffer, *geometry.buffer());
        assert_eq!(layout.components, 2);
        assert_eq!(layout.component_type, ComponentType::Float32);
        assert!(!layout.normalized);
        assert_eq!(layout.stride, 0);
        assert_eq!(layout.offset, 0);
        assert_eq!(layout.effective_stride(), 8);
    }

    #[test]
    fn strip_triangles_cover_both_corners() {
        let vertex = |index: usize| (QUAD_VERTICES[index * 2], QUAD_VERTICES[index * 2 + 1]);
        assert_eq!(vertex(0), (-1.0, -1.0));
        assert_eq!(vertex(3), (1.0, 1.0));
        // The shared edge (1, 2) is the diagonal from bottom-right to top-left.
        assert_eq!(vertex(1), (1.0, -1.0));
        assert_eq!(vertex(2), (-1.0, 1.0));
    }
}
