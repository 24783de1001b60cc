use tracing::debug;

use crate::backend::GraphicsContext;
use crate::error::SetupError;
use crate::shaders::{
    ShaderSource, DELAYED_MOUSE_UNIFORM, MOUSE_UNIFORM, POSITION_ATTRIBUTE, RESOLUTION_UNIFORM,
};

/// A linked, active grid program and the handles resolved from it.
///
/// Only [`build_pipeline`] creates one, so holding a `GridProgram` means the
/// program linked and was made current.
pub struct GridProgram<C: GraphicsContext> {
    pub(crate) handle: C::Program,
    pub(crate) position: Option<u32>,
    pub(crate) resolution: Option<C::UniformLocation>,
    pub(crate) mouse: Option<C::UniformLocation>,
    pub(crate) delayed_mouse: Option<C::UniformLocation>,
}

impl<C: GraphicsContext> GridProgram<C> {
    pub fn handle(&self) -> &C::Program {
        &self.handle
    }

    pub fn position_location(&self) -> Option<u32> {
        self.position
    }
}

/// Compiles both stages, links them, activates the program, and resolves the
/// attribute and uniform handles.
///
/// Nothing is left bound on failure: a failed stage is released by the
/// context, the surviving stage is released here, and a failed link consumes
/// both.
pub fn build_pipeline<C: GraphicsContext>(
    context: &mut C,
    vertex: &ShaderSource,
    fragment: &ShaderSource,
) -> Result<GridProgram<C>, SetupError> {
    let vertex_stage = compile(context, vertex)?;
    let fragment_stage = match compile(context, fragment) {
        Ok(stage) => stage,
        Err(err) => {
            context.release_stage(vertex_stage);
            return Err(err);
        }
    };

    let handle = context
        .link_program(vertex_stage, fragment_stage)
        .map_err(|diagnostic| SetupError::ProgramLink { diagnostic })?;
    context.use_program(Some(&handle));

    let position = context.attribute_location(&handle, POSITION_ATTRIBUTE);
    let resolution = context.uniform_location(&handle, RESOLUTION_UNIFORM);
    let mouse = context.uniform_location(&handle, MOUSE_UNIFORM);
    let delayed_mouse = context.uniform_location(&handle, DELAYED_MOUSE_UNIFORM);
    debug!(
        ?position,
        resolution = resolution.is_some(),
        mouse = mouse.is_some(),
        delayed_mouse = delayed_mouse.is_some(),
        "grid program linked"
    );

    Ok(GridProgram {
        handle,
        position,
        resolution,
        mouse,
        delayed_mouse,
    })
}

fn compile<C: GraphicsContext>(
    context: &mut C,
    source: &ShaderSource,
) -> Result<C::Stage, SetupError> {
    context
        .compile_stage(source)
        .map_err(|diagnostic| SetupError::ShaderCompile {
            stage: source.stage,
            diagnostic,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::recording::RecordingContext;
    use crate::shaders::{grid_fragment_source, grid_vertex_source, ShaderStageKind};

    fn broken_fragment() -> ShaderSource {
        ShaderSource::fragment("#version 450\nvoid main() {\n    outColor = vec4(1.0)\n")
    }

    #[test]
    fn builds_and_activates_the_grid_program() {
        let mut context = RecordingContext::new();
        let program =
            build_pipeline(&mut context, &grid_vertex_source(), &grid_fragment_source()).unwrap();

        assert_eq!(context.current_program, Some(program.handle().id));
        assert_eq!(program.position_location(), Some(0));
        assert!(program.resolution.is_some());
        assert!(program.mouse.is_some());
        assert!(program.delayed_mouse.is_some());
    }

    #[test]
    fn fragment_compile_failure_leaves_nothing_bound() {
        let mut context = RecordingContext::new();
        let err = build_pipeline(&mut context, &grid_vertex_source(), &broken_fragment())
            .err()
            .expect("broken fragment must fail");

        match err {
            SetupError::ShaderCompile { stage, diagnostic } => {
                assert_eq!(stage, ShaderStageKind::Fragment);
                assert!(diagnostic.contains("syntax error"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(context.current_program, None);
        assert!(context.live_stages.is_empty());
        assert_eq!(context.released_stages.len(), 1);
    }

    #[test]
    fn rebuild_after_compile_failure_succeeds() {
        let mut context = RecordingContext::new();
        assert!(build_pipeline(&mut context, &grid_vertex_source(), &broken_fragment()).is_err());

        let program =
            build_pipeline(&mut context, &grid_vertex_source(), &grid_fragment_source()).unwrap();
        assert_eq!(context.current_program, Some(program.handle().id));
    }

    #[test]
    fn link_failure_is_reported_without_activation() {
        let mut context = RecordingContext::new();
        context.fail_link = true;

        let err = build_pipeline(&mut context, &grid_vertex_source(), &grid_fragment_source())
            .err()
            .expect("link must fail");
        assert!(matches!(err, SetupError::ProgramLink { .. }));
        assert_eq!(context.current_program, None);
        assert!(context.live_stages.is_empty());
    }

    #[test]
    fn missing_uniform_is_not_an_error() {
        let mut context = RecordingContext::new();
        context.hidden_uniforms.insert(MOUSE_UNIFORM.to_string());

        let program =
            build_pipeline(&mut context, &grid_vertex_source(), &grid_fragment_source()).unwrap();
        assert!(program.mouse.is_none());
        assert!(program.delayed_mouse.is_some());
    }
}
