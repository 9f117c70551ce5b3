//! wgpu renderer: one textured pipeline and one line-strip wireframe
//! pipeline over the body meshes, plus a cube-mapped sky pass.

use crate::geometry::SKYBOX_VERTICES;
use crate::mat4::Mat4;
use crate::resources::TextureSet;
use crate::scene::Scene;
use std::borrow::Cow;
use wgpu::util::DeviceExt;
use wgpu::PipelineCompilationOptions;

/// Sky cube edge length; far enough out that no body ever crosses it.
const SKY_SURROUND: f32 = 100_000.0;

const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct ModelUniform {
  model: [f32; 16],
  light_pos: [f32; 3],
  intrinsic: f32,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct SkyUniform {
  view_proj: [f32; 16],
}

struct BodyBuffers {
  vertex_buffer: wgpu::Buffer,
  uv_buffer: wgpu::Buffer,
  index_buffer: wgpu::Buffer,
  index_count: u32,
  model_buffer: wgpu::Buffer,
  bind_group: wgpu::BindGroup,
}

pub struct Render {
  surface_pipeline: wgpu::RenderPipeline,
  wire_pipeline: wgpu::RenderPipeline,
  sky_pipeline: wgpu::RenderPipeline,
  bodies: Vec<BodyBuffers>,
  sky_vertex_buffer: wgpu::Buffer,
  sky_uniform_buffer: wgpu::Buffer,
  sky_bind_group: wgpu::BindGroup,
  depth_view: wgpu::TextureView,
}

impl Render {
  #[must_use]
  pub fn init(
    config: &wgpu::SurfaceConfiguration,
    _adapter: &wgpu::Adapter,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    camera_bind_group_layout: &wgpu::BindGroupLayout,
    scene: &Scene,
    textures: &TextureSet,
  ) -> Self {
    let body_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
      label: Some("body shader"),
      source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!("shaders/body.wgsl"))),
    });
    let sky_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
      label: Some("sky shader"),
      source: wgpu::ShaderSource::Wgsl(Cow::Borrowed(include_str!("shaders/sky.wgsl"))),
    });

    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
      label: Some("surface sampler"),
      mag_filter: wgpu::FilterMode::Linear,
      min_filter: wgpu::FilterMode::Linear,
      ..Default::default()
    });

    // ========================================================================
    // body pipelines
    // ========================================================================

    let body_bind_group_layout =
      device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
          wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Buffer {
              ty: wgpu::BufferBindingType::Uniform,
              has_dynamic_offset: false,
              min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<ModelUniform>() as _),
            },
            count: None,
          },
          wgpu::BindGroupLayoutEntry {
            binding: 1,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
              sample_type: wgpu::TextureSampleType::Float { filterable: true },
              view_dimension: wgpu::TextureViewDimension::D2,
              multisampled: false,
            },
            count: None,
          },
          wgpu::BindGroupLayoutEntry {
            binding: 2,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
          },
        ],
        label: Some("body_bind_group_layout"),
      });
    let body_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
      label: Some("body"),
      bind_group_layouts: &[camera_bind_group_layout, &body_bind_group_layout],
      push_constant_ranges: &[],
    });

    let position_buffer = wgpu::VertexBufferLayout {
      array_stride: 3 * 4,
      step_mode: wgpu::VertexStepMode::Vertex,
      attributes: &wgpu::vertex_attr_array![0 => Float32x3],
    };
    let uv_buffer = wgpu::VertexBufferLayout {
      array_stride: 2 * 4,
      step_mode: wgpu::VertexStepMode::Vertex,
      attributes: &wgpu::vertex_attr_array![1 => Float32x2],
    };

    let depth_stencil = wgpu::DepthStencilState {
      format: DEPTH_FORMAT,
      depth_write_enabled: true,
      depth_compare: wgpu::CompareFunction::Less,
      stencil: wgpu::StencilState::default(),
      bias: wgpu::DepthBiasState::default(),
    };

    let surface_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
      label: Some("Surface Pipeline"),
      layout: Some(&body_pipeline_layout),
      vertex: wgpu::VertexState {
        module: &body_shader,
        entry_point: "vs_main",
        compilation_options: PipelineCompilationOptions::default(),
        buffers: &[position_buffer.clone(), uv_buffer.clone()],
      },
      fragment: Some(wgpu::FragmentState {
        module: &body_shader,
        entry_point: "fs_main",
        compilation_options: PipelineCompilationOptions::default(),
        targets: &[Some(config.view_formats[0].into())],
      }),
      primitive: wgpu::PrimitiveState::default(),
      depth_stencil: Some(depth_stencil.clone()),
      multisample: wgpu::MultisampleState::default(),
      multiview: None,
      cache: None,
    });

    let wire_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
      label: Some("Wire Pipeline"),
      layout: Some(&body_pipeline_layout),
      vertex: wgpu::VertexState {
        module: &body_shader,
        entry_point: "vs_main",
        compilation_options: PipelineCompilationOptions::default(),
        buffers: &[position_buffer, uv_buffer],
      },
      fragment: Some(wgpu::FragmentState {
        module: &body_shader,
        entry_point: "fs_wire",
        compilation_options: PipelineCompilationOptions::default(),
        targets: &[Some(config.view_formats[0].into())],
      }),
      primitive: wgpu::PrimitiveState {
        topology: wgpu::PrimitiveTopology::LineStrip,
        strip_index_format: Some(wgpu::IndexFormat::Uint16),
        ..Default::default()
      },
      depth_stencil: Some(depth_stencil),
      multisample: wgpu::MultisampleState::default(),
      multiview: None,
      cache: None,
    });

    let light_pos = scene.light_pos();
    let mut bodies = Vec::with_capacity(scene.bodies.len());
    for body in &scene.bodies {
      let mesh = &body.mesh;
      let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{} vertices", body.info.name)),
        contents: bytemuck::cast_slice(&mesh.vertices),
        usage: wgpu::BufferUsages::VERTEX,
      });
      let uv_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{} uvs", body.info.name)),
        contents: bytemuck::cast_slice(&mesh.tex_coords),
        usage: wgpu::BufferUsages::VERTEX,
      });
      let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{} indices", body.info.name)),
        contents: bytemuck::cast_slice(&mesh.tri_indices),
        usage: wgpu::BufferUsages::INDEX,
      });
      let model_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(&format!("{} model", body.info.name)),
        contents: bytemuck::cast_slice(&[ModelUniform {
          model: body.model_matrix(),
          light_pos,
          intrinsic: body.intrinsic,
        }]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
      });

      let texture = textures
        .body(&body.info.name)
        .unwrap_or_else(|| panic!("no texture generated for {}", body.info.name));
      let view = upload_texture(device, queue, texture.width, texture.height, 1, &texture.pixels);

      let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: &body_bind_group_layout,
        entries: &[
          wgpu::BindGroupEntry {
            binding: 0,
            resource: model_buffer.as_entire_binding(),
          },
          wgpu::BindGroupEntry {
            binding: 1,
            resource: wgpu::BindingResource::TextureView(&view),
          },
          wgpu::BindGroupEntry {
            binding: 2,
            resource: wgpu::BindingResource::Sampler(&sampler),
          },
        ],
        label: Some(&format!("{} bind group", body.info.name)),
      });

      bodies.push(BodyBuffers {
        vertex_buffer,
        uv_buffer,
        index_buffer,
        index_count: mesh.tri_indices.len() as u32,
        model_buffer,
        bind_group,
      });
    }

    // ========================================================================
    // sky pipeline
    // ========================================================================

    let sky_bind_group_layout =
      device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
          wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
              ty: wgpu::BufferBindingType::Uniform,
              has_dynamic_offset: false,
              min_binding_size: wgpu::BufferSize::new(std::mem::size_of::<SkyUniform>() as _),
            },
            count: None,
          },
          wgpu::BindGroupLayoutEntry {
            binding: 1,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
              sample_type: wgpu::TextureSampleType::Float { filterable: true },
              view_dimension: wgpu::TextureViewDimension::Cube,
              multisampled: false,
            },
            count: None,
          },
          wgpu::BindGroupLayoutEntry {
            binding: 2,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
          },
        ],
        label: Some("sky_bind_group_layout"),
      });
    let sky_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
      label: Some("sky"),
      bind_group_layouts: &[&sky_bind_group_layout],
      push_constant_ranges: &[],
    });
    let sky_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
      label: Some("Sky Pipeline"),
      layout: Some(&sky_pipeline_layout),
      vertex: wgpu::VertexState {
        module: &sky_shader,
        entry_point: "vs_main",
        compilation_options: PipelineCompilationOptions::default(),
        buffers: &[wgpu::VertexBufferLayout {
          array_stride: 3 * 4,
          step_mode: wgpu::VertexStepMode::Vertex,
          attributes: &wgpu::vertex_attr_array![0 => Float32x3],
        }],
      },
      fragment: Some(wgpu::FragmentState {
        module: &sky_shader,
        entry_point: "fs_main",
        compilation_options: PipelineCompilationOptions::default(),
        targets: &[Some(config.view_formats[0].into())],
      }),
      primitive: wgpu::PrimitiveState::default(),
      depth_stencil: Some(wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: false,
        depth_compare: wgpu::CompareFunction::LessEqual,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
      }),
      multisample: wgpu::MultisampleState::default(),
      multiview: None,
      cache: None,
    });

    let sky_vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
      label: Some("Sky Vertex Buffer"),
      contents: bytemuck::cast_slice(&SKYBOX_VERTICES),
      usage: wgpu::BufferUsages::VERTEX,
    });
    let sky_uniform_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
      label: Some("Sky Uniform Buffer"),
      contents: bytemuck::cast_slice(&[SkyUniform {
        view_proj: crate::mat4::IDENTITY,
      }]),
      usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });

    let face = &textures.sky[0];
    let mut sky_pixels = Vec::with_capacity(textures.sky.len() * face.pixels.len());
    for f in &textures.sky {
      sky_pixels.extend_from_slice(&f.pixels);
    }
    let sky_view = upload_texture(device, queue, face.width, face.height, 6, &sky_pixels);

    let sky_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
      layout: &sky_bind_group_layout,
      entries: &[
        wgpu::BindGroupEntry {
          binding: 0,
          resource: sky_uniform_buffer.as_entire_binding(),
        },
        wgpu::BindGroupEntry {
          binding: 1,
          resource: wgpu::BindingResource::TextureView(&sky_view),
        },
        wgpu::BindGroupEntry {
          binding: 2,
          resource: wgpu::BindingResource::Sampler(&sampler),
        },
      ],
      label: Some("sky_bind_group"),
    });

    let depth_view = create_depth_view(device, config);

    Render {
      surface_pipeline,
      wire_pipeline,
      sky_pipeline,
      bodies,
      sky_vertex_buffer,
      sky_uniform_buffer,
      sky_bind_group,
      depth_view,
    }
  }

  pub fn render(
    &mut self,
    view: &wgpu::TextureView,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    camera_bind_group: &wgpu::BindGroup,
    scene: &mut Scene,
    aspect: f32,
  ) {
    let light_pos = scene.light_pos();
    for (body, buffers) in scene.bodies.iter().zip(self.bodies.iter()) {
      queue.write_buffer(
        &buffers.model_buffer,
        0,
        bytemuck::cast_slice(&[ModelUniform {
          model: body.model_matrix(),
          light_pos,
          intrinsic: body.intrinsic,
        }]),
      );
    }
    let sky_mat: Mat4 = scene.camera.sky_matrix(aspect, SKY_SURROUND);
    queue.write_buffer(
      &self.sky_uniform_buffer,
      0,
      bytemuck::cast_slice(&[SkyUniform { view_proj: sky_mat }]),
    );

    let color_attachments = [Some(wgpu::RenderPassColorAttachment {
      view,
      resolve_target: None,
      ops: wgpu::Operations {
        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
        store: wgpu::StoreOp::Store,
      },
    })];
    let render_pass_descriptor = wgpu::RenderPassDescriptor {
      label: None,
      color_attachments: &color_attachments,
      depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
        view: &self.depth_view,
        depth_ops: Some(wgpu::Operations {
          load: wgpu::LoadOp::Clear(1.0),
          store: wgpu::StoreOp::Store,
        }),
        stencil_ops: None,
      }),
      timestamp_writes: None,
      occlusion_query_set: None,
    };
    let mut command_encoder =
      device.create_command_encoder(&wgpu::CommandEncoderDescriptor { label: None });
    {
      let mut rpass = command_encoder.begin_render_pass(&render_pass_descriptor);
      rpass.set_pipeline(if scene.wireframe {
        &self.wire_pipeline
      } else {
        &self.surface_pipeline
      });
      rpass.set_bind_group(0, camera_bind_group, &[]);
      for buffers in &self.bodies {
        rpass.set_bind_group(1, &buffers.bind_group, &[]);
        rpass.set_vertex_buffer(0, buffers.vertex_buffer.slice(..));
        rpass.set_vertex_buffer(1, buffers.uv_buffer.slice(..));
        rpass.set_index_buffer(buffers.index_buffer.slice(..), wgpu::IndexFormat::Uint16);
        rpass.draw_indexed(0..buffers.index_count, 0, 0..1);
      }

      rpass.set_pipeline(&self.sky_pipeline);
      rpass.set_bind_group(0, &self.sky_bind_group, &[]);
      rpass.set_vertex_buffer(0, self.sky_vertex_buffer.slice(..));
      rpass.draw(0..36, 0..1);
    }
    queue.submit(Some(command_encoder.finish()));
  }
}

fn create_depth_view(
  device: &wgpu::Device,
  config: &wgpu::SurfaceConfiguration,
) -> wgpu::TextureView {
  let texture = device.create_texture(&wgpu::TextureDescriptor {
    label: Some("depth texture"),
    size: wgpu::Extent3d {
      width: config.width.max(1),
      height: config.height.max(1),
      depth_or_array_layers: 1,
    },
    mip_level_count: 1,
    sample_count: 1,
    dimension: wgpu::TextureDimension::D2,
    format: DEPTH_FORMAT,
    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
    view_formats: &[],
  });
  texture.create_view(&wgpu::TextureViewDescriptor::default())
}

fn upload_texture(
  device: &wgpu::Device,
  queue: &wgpu::Queue,
  width: u32,
  height: u32,
  layers: u32,
  pixels: &[u8],
) -> wgpu::TextureView {
  let size = wgpu::Extent3d {
    width,
    height,
    depth_or_array_layers: layers,
  };
  let texture = device.create_texture(&wgpu::TextureDescriptor {
    label: None,
    size,
    mip_level_count: 1,
    sample_count: 1,
    dimension: wgpu::TextureDimension::D2,
    format: wgpu::TextureFormat::Rgba8Unorm,
    usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
    view_formats: &[],
  });
  queue.write_texture(
    wgpu::ImageCopyTexture {
      texture: &texture,
      mip_level: 0,
      origin: wgpu::Origin3d::ZERO,
      aspect: wgpu::TextureAspect::All,
    },
    pixels,
    wgpu::ImageDataLayout {
      offset: 0,
      bytes_per_row: Some(4 * width),
      rows_per_image: Some(height),
    },
    size,
  );
  texture.create_view(&wgpu::TextureViewDescriptor {
    dimension: Some(if layers == 6 {
      wgpu::TextureViewDimension::Cube
    } else {
      wgpu::TextureViewDimension::D2
    }),
    ..Default::default()
  })
}
