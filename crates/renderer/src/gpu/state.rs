use std::collections::HashMap;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::{debug, warn};
use wgpu::util::DeviceExt;

use crate::backend::{
    ComponentType, DrawCall, GraphicsContext, PrimitiveTopology, VertexAttributeLayout, Viewport,
};
use crate::error::{FrameError, SetupError};
use crate::shaders::{ShaderSource, ShaderStageKind};
use crate::types::GpuPowerPreference;

use super::context::GpuContext;
use super::program::{LinkedProgram, WgpuStage};
use super::reflect;

/// Handle to a program linked by a [`WgpuContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WgpuProgram(usize);

/// Byte range of one uniform inside a program's uniform block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WgpuUniformLocation {
    program: usize,
    offset: u32,
    size: u32,
}

/// A vertex buffer created by a [`WgpuContext`].
#[derive(Debug, Clone)]
pub struct WgpuBuffer {
    buffer: wgpu::Buffer,
}

struct VertexBinding {
    buffer: wgpu::Buffer,
    layout: VertexAttributeLayout,
}

/// [`GraphicsContext`] backed by a wgpu device and a window surface.
pub struct WgpuContext {
    gpu: GpuContext,
    programs: Vec<LinkedProgram>,
    current: Option<usize>,
    vertex_bindings: HashMap<u32, VertexBinding>,
    viewport: Option<Viewport>,
}

impl WgpuContext {
    /// Acquires a device and configures a surface for `target`.
    ///
    /// `target` must outlive the returned context.
    pub fn new<T>(
        target: &T,
        initial_size: (u32, u32),
        power: GpuPowerPreference,
    ) -> Result<Self, SetupError>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let gpu = GpuContext::new(target, initial_size, power).map_err(|err| {
            SetupError::ContextUnavailable {
                reason: format!("{err:#}"),
            }
        })?;
        Ok(Self {
            gpu,
            programs: Vec::new(),
            current: None,
            vertex_bindings: HashMap::new(),
            viewport: None,
        })
    }

    /// Maps a bottom-left-origin viewport onto the surface, clamped to it.
    fn clamped_viewport(&self) -> Viewport {
        let (surface_width, surface_height) = self.gpu.surface_size();
        let requested = self.viewport.unwrap_or(Viewport {
            x: 0,
            y: 0,
            width: surface_width,
            height: surface_height,
        });
        let x = requested.x.min(surface_width);
        let y = requested.y.min(surface_height);
        let width = requested.width.min(surface_width - x);
        let height = requested.height.min(surface_height - y);
        Viewport {
            x,
            y: surface_height - y - height,
            width,
            height,
        }
    }

    /// Vertex buffers for every attribute the program reads, in declaration
    /// order; `None` when one is unbound or bound with a mismatched layout.
    fn vertex_buffers(&self, program: &LinkedProgram) -> Option<Vec<wgpu::Buffer>> {
        program
            .interface
            .attributes
            .iter()
            .map(|input| {
                let Some(binding) = self.vertex_bindings.get(&input.location) else {
                    warn!(location = input.location, "vertex attribute has no buffer bound");
                    return None;
                };
                if binding.layout.effective_stride() != input.format.size() {
                    warn!(
                        location = input.location,
                        components = binding.layout.components,
                        expected = ?input.format,
                        "vertex attribute layout does not match the shader input"
                    );
                    return None;
                }
                Some(binding.buffer.clone())
            })
            .collect()
    }
}

impl GraphicsContext for WgpuContext {
    type Stage = WgpuStage;
    type Program = WgpuProgram;
    type Buffer = WgpuBuffer;
    type UniformLocation = WgpuUniformLocation;

    fn compile_stage(&mut self, source: &ShaderSource) -> Result<WgpuStage, String> {
        let checked = reflect::check_stage(source)?;
        let label = match source.stage {
            ShaderStageKind::Vertex => "grid vertex shader",
            ShaderStageKind::Fragment => "grid fragment shader",
        };

        let device = &self.gpu.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(label),
            source: wgpu::ShaderSource::Glsl {
                shader: source.text.clone(),
                stage: source.stage.to_naga(),
                defines: &[],
            },
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(err.to_string());
        }
        Ok(WgpuStage { checked, module })
    }

    fn release_stage(&mut self, stage: WgpuStage) {
        drop(stage);
    }

    fn link_program(
        &mut self,
        vertex: WgpuStage,
        fragment: WgpuStage,
    ) -> Result<WgpuProgram, String> {
        let program =
            LinkedProgram::link(&self.gpu.device, self.gpu.surface_format, vertex, fragment)?;
        self.programs.push(program);
        Ok(WgpuProgram(self.programs.len() - 1))
    }

    fn use_program(&mut self, program: Option<&WgpuProgram>) {
        self.current = program.map(|program| program.0);
    }

    fn attribute_location(&self, program: &WgpuProgram, name: &str) -> Option<u32> {
        self.programs
            .get(program.0)?
            .interface
            .attribute(name)
            .map(|input| input.location)
    }

    fn uniform_location(&self, program: &WgpuProgram, name: &str) -> Option<WgpuUniformLocation> {
        let member = self
            .programs
            .get(program.0)?
            .interface
            .uniform_block
            .as_ref()?
            .member(name)?;
        Some(WgpuUniformLocation {
            program: program.0,
            offset: member.offset,
            size: member.size,
        })
    }

    fn create_vertex_buffer(&mut self, data: &[f32]) -> WgpuBuffer {
        let buffer = self
            .gpu
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("grid vertex buffer"),
                contents: bytemuck::cast_slice(data),
                usage: wgpu::BufferUsages::VERTEX,
            });
        WgpuBuffer { buffer }
    }

    fn bind_vertex_attribute(
        &mut self,
        location: u32,
        buffer: &WgpuBuffer,
        layout: VertexAttributeLayout,
    ) {
        let packed = layout.component_type == ComponentType::Float32
            && !layout.normalized
            && layout.offset == 0
            && layout.effective_stride() == u64::from(layout.components) * 4;
        if !packed {
            warn!(location, ?layout, "only tightly packed f32 attributes are supported");
            return;
        }
        self.vertex_bindings.insert(
            location,
            VertexBinding {
                buffer: buffer.buffer.clone(),
                layout,
            },
        );
    }

    fn resize_surface(&mut self, width: u32, height: u32) {
        self.gpu.resize(width, height);
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
    }

    fn set_uniform_vec2(&mut self, location: Option<&WgpuUniformLocation>, value: [f32; 2]) {
        let Some(location) = location else {
            return;
        };
        if location.size < 8 {
            return;
        }
        if let Some(program) = self.programs.get_mut(location.program) {
            program.write_uniform(location.offset, bytemuck::cast_slice(&value));
        }
    }

    fn draw(&mut self, call: &DrawCall) -> Result<(), FrameError> {
        let frame = self.gpu.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let viewport = self.clamped_viewport();
        let buffers = self
            .current
            .and_then(|index| self.programs.get(index))
            .and_then(|program| self.vertex_buffers(program));

        let mut pipeline = None;
        let mut bind_group = None;
        if let (Some(index), Some(_)) = (self.current, buffers.as_ref()) {
            if let Some(program) = self.programs.get_mut(index) {
                program.flush_uniforms(&self.gpu.queue);
                pipeline = Some(match call.topology {
                    PrimitiveTopology::TriangleStrip => program.pipeline().clone(),
                });
                bind_group = program.bind_group().cloned();
            }
        }

        let mut encoder = self
            .gpu
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("grid encoder"),
            });
        {
            let [r, g, b, a] = call.clear_color;
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("grid pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    depth_slice: None,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r, g, b, a }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            match (pipeline.as_ref(), buffers.as_ref()) {
                (Some(pipeline), Some(buffers)) if viewport.width > 0 && viewport.height > 0 => {
                    pass.set_viewport(
                        viewport.x as f32,
                        viewport.y as f32,
                        viewport.width as f32,
                        viewport.height as f32,
                        0.0,
                        1.0,
                    );
                    pass.set_pipeline(pipeline);
                    if let Some(bind_group) = bind_group.as_ref() {
                        pass.set_bind_group(reflect::UNIFORM_GROUP, bind_group, &[]);
                    }
                    for (slot, buffer) in buffers.iter().enumerate() {
                        pass.set_vertex_buffer(slot as u32, buffer.slice(..));
                    }
                    pass.draw(call.first..call.first + call.count, 0..1);
                }
                _ => debug!("no drawable program bound; presenting clear colour only"),
            }
        }

        self.gpu.queue.submit(Some(encoder.finish()));
        frame.present();
        Ok(())
    }
}
