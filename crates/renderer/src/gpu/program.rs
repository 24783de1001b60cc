use super::reflect::{ProgramInterface, UNIFORM_BINDING};

/// A compiled stage: the naga-checked module plus its wgpu shader module.
pub struct WgpuStage {
    pub(crate) checked: super::reflect::CheckedStage,
    pub(crate) module: wgpu::ShaderModule,
}

/// CPU image of the uniform block, uploaded before draws when dirty.
struct UniformStorage {
    buffer: wgpu::Buffer,
    bind_group: wgpu::BindGroup,
    image: Vec<u8>,
    dirty: bool,
}

/// A linked program: its reflected interface, triangle-strip pipeline, and
/// uniform storage.
pub(crate) struct LinkedProgram {
    pub interface: ProgramInterface,
    pipeline: wgpu::RenderPipeline,
    uniforms: Option<UniformStorage>,
}

impl LinkedProgram {
    /// Links two stages; the interface checks come first, then the
    /// triangle-strip pipeline is built so device-side errors surface here.
    pub(crate) fn link(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        vertex: WgpuStage,
        fragment: WgpuStage,
    ) -> Result<Self, String> {
        let interface = super::reflect::link_stages(&vertex.checked, &fragment.checked)?;

        let uniforms = interface.uniform_block.as_ref().map(|block| {
            let layout = uniform_layout(device);
            let size = block.buffer_size();
            let buffer = device.create_buffer(&wgpu::BufferDescriptor {
                label: Some("grid uniform buffer"),
                size,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            });
            let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("grid uniform bind group"),
                layout: &layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: UNIFORM_BINDING,
                    resource: buffer.as_entire_binding(),
                }],
            });
            (
                layout,
                UniformStorage {
                    buffer,
                    bind_group,
                    image: vec![0; size as usize],
                    dirty: true,
                },
            )
        });

        let (bind_layouts, uniforms) = match uniforms {
            Some((layout, storage)) => (vec![layout], Some(storage)),
            None => (Vec::new(), None),
        };
        let bind_layout_refs: Vec<&wgpu::BindGroupLayout> = bind_layouts.iter().collect();
        let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("grid pipeline layout"),
            bind_group_layouts: &bind_layout_refs,
            push_constant_ranges: &[],
        });

        let pipeline = create_pipeline(device, format, &layout, &vertex, &fragment, &interface)?;
        Ok(Self {
            interface,
            pipeline,
            uniforms,
        })
    }

    pub(crate) fn pipeline(&self) -> &wgpu::RenderPipeline {
        &self.pipeline
    }

    /// Writes `bytes` at `offset` in the uniform image.
    pub(crate) fn write_uniform(&mut self, offset: u32, bytes: &[u8]) {
        let Some(storage) = self.uniforms.as_mut() else {
            return;
        };
        let start = offset as usize;
        let Some(slot) = storage.image.get_mut(start..start + bytes.len()) else {
            return;
        };
        slot.copy_from_slice(bytes);
        storage.dirty = true;
    }

    /// Uploads the uniform image if it changed since the last draw.
    pub(crate) fn flush_uniforms(&mut self, queue: &wgpu::Queue) {
        if let Some(storage) = self.uniforms.as_mut() {
            if storage.dirty {
                queue.write_buffer(&storage.buffer, 0, &storage.image);
                storage.dirty = false;
            }
        }
    }

    pub(crate) fn bind_group(&self) -> Option<&wgpu::BindGroup> {
        self.uniforms.as_ref().map(|storage| &storage.bind_group)
    }
}

fn create_pipeline(
    device: &wgpu::Device,
    format: wgpu::TextureFormat,
    layout: &wgpu::PipelineLayout,
    vertex: &WgpuStage,
    fragment: &WgpuStage,
    interface: &ProgramInterface,
) -> Result<wgpu::RenderPipeline, String> {
    let attributes: Vec<[wgpu::VertexAttribute; 1]> = interface
        .attributes
        .iter()
        .map(|input| {
            [wgpu::VertexAttribute {
                format: input.format,
                offset: 0,
                shader_location: input.location,
            }]
        })
        .collect();
    let buffers: Vec<wgpu::VertexBufferLayout<'_>> = interface
        .attributes
        .iter()
        .zip(&attributes)
        .map(|(input, attribute)| wgpu::VertexBufferLayout {
            array_stride: input.format.size(),
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: attribute,
        })
        .collect();

    device.push_error_scope(wgpu::ErrorFilter::Validation);
    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some("grid pipeline"),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module: &vertex.module,
            entry_point: Some("main"),
            buffers: &buffers,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: wgpu::PrimitiveTopology::TriangleStrip,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: None,
            polygon_mode: wgpu::PolygonMode::Fill,
            unclipped_depth: false,
            conservative: false,
        },
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        fragment: Some(wgpu::FragmentState {
            module: &fragment.module,
            entry_point: Some("main"),
            targets: &[Some(wgpu::ColorTargetState {
                format,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview: None,
        cache: None,
    });
    match pollster::block_on(device.pop_error_scope()) {
        Some(err) => Err(err.to_string()),
        None => Ok(pipeline),
    }
}

fn uniform_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("grid uniform layout"),
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: UNIFORM_BINDING,
            visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
    })
}
