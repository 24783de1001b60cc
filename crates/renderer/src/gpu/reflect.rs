//! GLSL front-end checks and program reflection, all on the CPU via naga.
//!
//! Compiling a stage means parsing and validating it; linking means checking
//! that the two stages agree on their interface and that every resource sits
//! where the pipeline layout expects it:
//!
//! ```text
//!   vertex  ── location N out ──▶ location N in ── fragment
//!   uniform block @ set 0 / binding 0 (shared, std140)
//! ```

use wgpu::naga::front::glsl;
use wgpu::naga::valid::{Capabilities, ValidationFlags, Validator};
use wgpu::naga::{
    AddressSpace, Binding, Handle, Module, Scalar, ShaderStage, Type, TypeInner, VectorSize,
};

use crate::shaders::{ShaderSource, ShaderStageKind};

/// Set and binding reserved for the program's uniform block.
pub(crate) const UNIFORM_GROUP: u32 = 0;
pub(crate) const UNIFORM_BINDING: u32 = 0;

/// A stage that parsed and validated.
#[derive(Debug)]
pub(crate) struct CheckedStage {
    pub stage: ShaderStageKind,
    pub module: Module,
}

/// Parses and validates GLSL, returning the front-end diagnostic on failure.
pub(crate) fn check_stage(source: &ShaderSource) -> Result<CheckedStage, String> {
    let mut frontend = glsl::Frontend::default();
    let options = glsl::Options::from(source.stage.to_naga());
    let module = frontend
        .parse(&options, &source.text)
        .map_err(|errors| errors.to_string())?;

    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|err| err.to_string())?;

    let expected = source.stage.to_naga();
    if !module
        .entry_points
        .iter()
        .any(|entry| entry.stage == expected)
    {
        return Err(format!("no {} entry point", source.stage));
    }

    Ok(CheckedStage {
        stage: source.stage,
        module,
    })
}

#[derive(Debug, Clone, PartialEq)]
struct Varying {
    name: Option<String>,
    location: u32,
    inner: TypeInner,
}

/// One per-vertex input read from its own tightly packed buffer slot.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct VertexInput {
    pub name: Option<String>,
    pub location: u32,
    pub format: wgpu::VertexFormat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UniformMember {
    pub name: String,
    pub offset: u32,
    pub size: u32,
}

/// The std140 block at [`UNIFORM_GROUP`] / [`UNIFORM_BINDING`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct UniformBlock {
    pub span: u32,
    pub members: Vec<UniformMember>,
}

impl UniformBlock {
    pub fn member(&self, name: &str) -> Option<&UniformMember> {
        self.members.iter().find(|member| member.name == name)
    }

    /// Buffer size rounded up to the 16-byte std140 block alignment.
    pub fn buffer_size(&self) -> u64 {
        u64::from(self.span).max(16).next_multiple_of(16)
    }
}

/// Everything the wgpu context needs from a linked program.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ProgramInterface {
    pub attributes: Vec<VertexInput>,
    pub uniform_block: Option<UniformBlock>,
}

impl ProgramInterface {
    pub fn attribute(&self, name: &str) -> Option<&VertexInput> {
        self.attributes
            .iter()
            .find(|input| input.name.as_deref() == Some(name))
    }
}

/// Checks the vertex/fragment interface and reflects attributes and uniforms.
pub(crate) fn link_stages(
    vertex: &CheckedStage,
    fragment: &CheckedStage,
) -> Result<ProgramInterface, String> {
    if vertex.stage != ShaderStageKind::Vertex || fragment.stage != ShaderStageKind::Fragment {
        return Err("program needs one vertex and one fragment stage".to_string());
    }

    let (vertex_inputs, vertex_outputs) = entry_varyings(&vertex.module, ShaderStage::Vertex)?;
    let (fragment_inputs, _) = entry_varyings(&fragment.module, ShaderStage::Fragment)?;

    for input in &fragment_inputs {
        let Some(output) = vertex_outputs
            .iter()
            .find(|output| output.location == input.location)
        else {
            return Err(format!(
                "fragment input at location {} has no matching vertex output",
                input.location
            ));
        };
        if output.inner != input.inner {
            return Err(format!(
                "type mismatch at location {}: vertex writes {:?}, fragment reads {:?}",
                input.location, output.inner, input.inner
            ));
        }
    }

    let mut attributes = Vec::with_capacity(vertex_inputs.len());
    for input in vertex_inputs {
        let format = vertex_format(&input.inner).ok_or_else(|| {
            format!(
                "vertex input at location {} must be a 32-bit float scalar or vector",
                input.location
            )
        })?;
        attributes.push(VertexInput {
            name: input.name,
            location: input.location,
            format,
        });
    }
    attributes.sort_by_key(|input| input.location);

    let vertex_block = uniform_block(&vertex.module)?;
    let fragment_block = uniform_block(&fragment.module)?;
    let uniform_block = match (vertex_block, fragment_block) {
        (Some(a), Some(b)) if a != b => {
            return Err("uniform block differs between vertex and fragment stages".to_string())
        }
        (Some(block), _) | (None, Some(block)) => Some(block),
        (None, None) => None,
    };

    Ok(ProgramInterface {
        attributes,
        uniform_block,
    })
}

fn entry_varyings(
    module: &Module,
    stage: ShaderStage,
) -> Result<(Vec<Varying>, Vec<Varying>), String> {
    let entry = module
        .entry_points
        .iter()
        .find(|entry| entry.stage == stage)
        .ok_or_else(|| format!("missing {stage:?} entry point"))?;

    let mut inputs = Vec::new();
    for argument in &entry.function.arguments {
        collect_varyings(
            module,
            argument.name.as_deref(),
            argument.ty,
            argument.binding.as_ref(),
            &mut inputs,
        );
    }

    let mut outputs = Vec::new();
    if let Some(result) = entry.function.result.as_ref() {
        collect_varyings(module, None, result.ty, result.binding.as_ref(), &mut outputs);
    }

    Ok((inputs, outputs))
}

fn collect_varyings(
    module: &Module,
    name: Option<&str>,
    ty: Handle<Type>,
    binding: Option<&Binding>,
    out: &mut Vec<Varying>,
) {
    match binding {
        Some(Binding::Location { location, .. }) => out.push(Varying {
            name: name.map(str::to_owned),
            location: *location,
            inner: module.types[ty].inner.clone(),
        }),
        Some(Binding::BuiltIn(_)) => {}
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[ty].inner {
                for member in members {
                    collect_varyings(
                        module,
                        member.name.as_deref(),
                        member.ty,
                        member.binding.as_ref(),
                        out,
                    );
                }
            }
        }
    }
}

fn vertex_format(inner: &TypeInner) -> Option<wgpu::VertexFormat> {
    match *inner {
        TypeInner::Scalar(scalar) if scalar == Scalar::F32 => Some(wgpu::VertexFormat::Float32),
        TypeInner::Vector { size, scalar } if scalar == Scalar::F32 => Some(match size {
            VectorSize::Bi => wgpu::VertexFormat::Float32x2,
            VectorSize::Tri => wgpu::VertexFormat::Float32x3,
            VectorSize::Quad => wgpu::VertexFormat::Float32x4,
        }),
        _ => None,
    }
}

fn uniform_block(module: &Module) -> Result<Option<UniformBlock>, String> {
    let mut found = None;
    for (_, variable) in module.global_variables.iter() {
        match variable.space {
            AddressSpace::Uniform => {}
            AddressSpace::Storage { .. } | AddressSpace::Handle => {
                return Err(format!(
                    "unsupported resource {:?}; only one uniform block is bound",
                    variable.name.as_deref().unwrap_or("<unnamed>")
                ));
            }
            _ => continue,
        }

        let placed = variable.binding.as_ref().is_some_and(|binding| {
            binding.group == UNIFORM_GROUP && binding.binding == UNIFORM_BINDING
        });
        if !placed || found.is_some() {
            return Err(format!(
                "uniform block must be the only resource at set {UNIFORM_GROUP}, binding {UNIFORM_BINDING}"
            ));
        }

        let TypeInner::Struct { members, span } = &module.types[variable.ty].inner else {
            return Err("uniform block is not a struct".to_string());
        };
        let members = members
            .iter()
            .filter_map(|member| {
                let name = member.name.clone()?;
                let size = module.types[member.ty].inner.size(module.to_ctx());
                Some(UniformMember {
                    name,
                    offset: member.offset,
                    size,
                })
            })
            .collect();
        found = Some(UniformBlock {
            span: *span,
            members,
        });
    }
    Ok(found)
}
