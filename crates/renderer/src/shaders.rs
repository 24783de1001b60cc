use std::borrow::Cow;
use std::fmt;

/// Pipeline stage a shader source targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStageKind {
    Vertex,
    Fragment,
}

impl ShaderStageKind {
    pub(crate) fn to_naga(self) -> wgpu::naga::ShaderStage {
        match self {
            ShaderStageKind::Vertex => wgpu::naga::ShaderStage::Vertex,
            ShaderStageKind::Fragment => wgpu::naga::ShaderStage::Fragment,
        }
    }
}

impl fmt::Display for ShaderStageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderStageKind::Vertex => f.write_str("vertex"),
            ShaderStageKind::Fragment => f.write_str("fragment"),
        }
    }
}

/// Immutable GLSL text paired with the stage it compiles for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    pub stage: ShaderStageKind,
    pub text: Cow<'static, str>,
}

impl ShaderSource {
    pub fn vertex(text: impl Into<Cow<'static, str>>) -> Self {
        Self {
            stage: ShaderStageKind::Vertex,
            text: text.into(),
        }
    }

    pub fn fragment(text: impl Into<Cow<'static, str>>) -> Self {
        Self {
            stage: ShaderStageKind::Fragment,
            text: text.into(),
        }
    }
}

/// Name of the single per-vertex input.
pub const POSITION_ATTRIBUTE: &str = "position";
/// Surface size in device pixels.
pub const RESOLUTION_UNIFORM: &str = "resolution";
/// Last observed pointer position, bottom-left origin.
pub const MOUSE_UNIFORM: &str = "mouse";
/// Exponentially lagged pointer position.
pub const DELAYED_MOUSE_UNIFORM: &str = "delayedMouse";

pub fn grid_vertex_source() -> ShaderSource {
    ShaderSource::vertex(GRID_VERTEX_GLSL)
}

pub fn grid_fragment_source() -> ShaderSource {
    ShaderSource::fragment(GRID_FRAGMENT_GLSL)
}

/// Passes the full-screen quad straight through in clip space.
const GRID_VERTEX_GLSL: &str = r"#version 450
layout(location = 0) in vec2 position;

void main() {
    gl_Position = vec4(position, 0.0, 1.0);
}
";

/// Pointer-reactive grid. The math mirrors [`crate::effect::sample`]; keep the
/// two in lockstep.
///
/// The uniform block layout must match [`crate::effect::GridUniforms`].
const GRID_FRAGMENT_GLSL: &str = r"#version 450
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform GridParams {
    vec2 resolution;
    vec2 mouse;
    vec2 delayedMouse;
};

float lineMask(float coord, float width, float feather) {
    return smoothstep(0.0, feather, coord) - smoothstep(width - feather, width, coord);
}

void main() {
    // Framebuffer origin is top-left; the effect works bottom-left.
    vec2 fragCoord = vec2(gl_FragCoord.x, resolution.y - gl_FragCoord.y);
    vec2 st = fragCoord / resolution;
    vec2 pointer = mouse / resolution;
    vec2 delayed = delayedMouse / resolution;

    float distToMouse = distance(st, delayed);
    float visibility = smoothstep(0.3, 0.0, distToMouse);
    float proximity = smoothstep(0.2, 0.0, distToMouse);
    float lineWidth = mix(0.02, 0.1, proximity);
    float lineFeather = mix(0.002, 0.05, proximity);

    vec2 grid = fract(st * 20.0);
    vec2 toPointer = pointer - st;
    if (length(toPointer) > 0.000001) {
        grid += normalize(toPointer) * proximity * 0.05;
    }

    float line = lineMask(grid.x, lineWidth, lineFeather) + lineMask(grid.y, lineWidth, lineFeather);
    float intensity = line * visibility;

    outColor = vec4(mix(vec3(1.0), vec3(0.0), clamp(intensity, 0.0, 1.0)), 1.0);
}
";
