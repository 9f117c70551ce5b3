//! Window/event plumbing and the fixed-interval tick loop. Input handlers
//! write intents into the scene; the timer advances it; redraws render it.

use crate::render::Render;
use crate::resources::{Loader, TextureRequest};
use crate::scene::Scene;
use crate::vec3;
use crate::{CameraParams, SimParams};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use wgpu::util::DeviceExt;
use winit::event::ElementState;
use winit::keyboard::*;
use winit::{
  dpi::PhysicalSize,
  event::{Event, KeyEvent, StartCause, WindowEvent},
  event_loop::{ControlFlow, EventLoop, EventLoopWindowTarget},
  window::Window,
};

struct EventLoopWrapper {
  event_loop: EventLoop<()>,
  window: Arc<Window>,
}

impl EventLoopWrapper {
  pub fn new(title: &str) -> Self {
    let event_loop = EventLoop::new().unwrap();
    let mut builder = winit::window::WindowBuilder::new();
    builder = builder.with_title(title).with_resizable(false);
    let window = Arc::new(builder.build(&event_loop).unwrap());

    Self { event_loop, window }
  }
}

struct SurfaceWrapper {
  surface: Option<wgpu::Surface<'static>>,
  config: Option<wgpu::SurfaceConfiguration>,
}

impl SurfaceWrapper {
  fn new() -> Self {
    Self {
      surface: None,
      config: None,
    }
  }

  fn resume(&mut self, context: &State, window: Arc<Window>) {
    let window_size = window.inner_size();
    let width = window_size.width.max(1);
    let height = window_size.height.max(1);
    self.surface = Some(context.instance.create_surface(window).unwrap());
    let surface = self.surface.as_ref().unwrap();
    let mut config = surface
      .get_default_config(&context.adapter, width, height)
      .unwrap();
    let view_format = config.format.add_srgb_suffix();
    config.view_formats.push(view_format);
    surface.configure(&context.device, &config);
    self.config = Some(config);
  }

  fn acquire(&mut self, context: &State) -> wgpu::SurfaceTexture {
    let surface = self.surface.as_ref().unwrap();

    match surface.get_current_texture() {
      Ok(frame) => frame,
      Err(wgpu::SurfaceError::Timeout) => surface.get_current_texture().unwrap(),
      Err(
        wgpu::SurfaceError::Outdated | wgpu::SurfaceError::Lost | wgpu::SurfaceError::OutOfMemory,
      ) => {
        surface.configure(&context.device, self.config());
        surface.get_current_texture().unwrap()
      }
    }
  }

  fn suspend(&mut self) {}

  fn config(&self) -> &wgpu::SurfaceConfiguration {
    self.config.as_ref().unwrap()
  }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
struct CameraUniform {
  view_proj: [f32; 16],
}

impl CameraUniform {
  fn new() -> Self {
    Self {
      view_proj: crate::mat4::IDENTITY,
    }
  }
}

/// Maps key presses to scene intents. Movement keys set the camera velocity
/// from the basis at press time and clear it on release; arrow keys drive
/// the angular velocities the same way. Each control owns exactly one field.
struct InputController {
  speed: f32,
  rotation_speed: f32,
}

impl InputController {
  fn init(params: &CameraParams) -> Self {
    Self {
      speed: params.speed,
      rotation_speed: params.rotational_speed,
    }
  }

  fn process_events(&self, event: &WindowEvent, scene: &mut Scene) -> bool {
    match event {
      WindowEvent::KeyboardInput {
        event:
          KeyEvent {
            state,
            physical_key: PhysicalKey::Code(keycode),
            ..
          },
        ..
      } => {
        let is_pressed = *state == ElementState::Pressed;
        let cam = &mut scene.camera;
        match keycode {
          KeyCode::KeyW => {
            if is_pressed {
              vec3::scale(&mut cam.velocity, vec3::negate(cam.dir), self.speed);
            } else {
              cam.velocity = vec3::ZERO;
            }
            true
          }
          KeyCode::KeyS => {
            if is_pressed {
              vec3::scale(&mut cam.velocity, cam.dir, self.speed);
            } else {
              cam.velocity = vec3::ZERO;
            }
            true
          }
          KeyCode::KeyA => {
            if is_pressed {
              vec3::scale(&mut cam.velocity, vec3::negate(cam.right), self.speed);
            } else {
              cam.velocity = vec3::ZERO;
            }
            true
          }
          KeyCode::KeyD => {
            if is_pressed {
              vec3::scale(&mut cam.velocity, cam.right, self.speed);
            } else {
              cam.velocity = vec3::ZERO;
            }
            true
          }
          KeyCode::KeyR => {
            if is_pressed {
              vec3::scale(&mut cam.velocity, cam.up, self.speed);
            } else {
              cam.velocity = vec3::ZERO;
            }
            true
          }
          KeyCode::KeyF => {
            if is_pressed {
              vec3::scale(&mut cam.velocity, vec3::negate(cam.up), self.speed);
            } else {
              cam.velocity = vec3::ZERO;
            }
            true
          }
          KeyCode::ArrowUp => {
            cam.omega_x = if is_pressed { self.rotation_speed } else { 0.0 };
            true
          }
          KeyCode::ArrowDown => {
            cam.omega_x = if is_pressed { -self.rotation_speed } else { 0.0 };
            true
          }
          KeyCode::ArrowLeft => {
            cam.omega_y = if is_pressed { self.rotation_speed } else { 0.0 };
            true
          }
          KeyCode::ArrowRight => {
            cam.omega_y = if is_pressed { -self.rotation_speed } else { 0.0 };
            true
          }
          KeyCode::KeyC => {
            if is_pressed {
              cam.recenter();
            }
            true
          }
          KeyCode::KeyT => {
            if is_pressed {
              scene.request_track();
            }
            true
          }
          KeyCode::Tab => {
            if is_pressed {
              scene.cycle_target();
            }
            true
          }
          KeyCode::Space => {
            if is_pressed {
              scene.paused = !scene.paused;
            }
            true
          }
          KeyCode::KeyM => {
            if is_pressed {
              scene.wireframe = !scene.wireframe;
            }
            true
          }
          _ => false,
        }
      }
      _ => false,
    }
  }
}

struct State {
  instance: wgpu::Instance,
  adapter: wgpu::Adapter,
  device: wgpu::Device,
  queue: wgpu::Queue,
  scene: Scene,
  aspect: f32,
  camera_uniform: CameraUniform,
  camera_buffer: wgpu::Buffer,
  camera_bind_group: wgpu::BindGroup,
  controller: InputController,
  camera_bind_group_layout: wgpu::BindGroupLayout,
}

impl State {
  fn input(&mut self, event: &WindowEvent) -> bool {
    self.controller.process_events(event, &mut self.scene)
  }

  fn update(&mut self, delta: f32) {
    self.scene.tick(delta);
    self.camera_uniform.view_proj = self.scene.camera.view_projection(self.aspect);
    self.queue.write_buffer(
      &self.camera_buffer,
      0,
      bytemuck::cast_slice(&[self.camera_uniform]),
    );
  }

  async fn init(surface: &SurfaceWrapper, size: &PhysicalSize<u32>, scene: Scene) -> Self {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
      #[cfg(not(target_arch = "wasm32"))]
      backends: wgpu::Backends::PRIMARY,
      ..Default::default()
    });

    let adapter = instance
      .request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::default(),
        compatible_surface: surface.surface.as_ref(),
        force_fallback_adapter: false,
      })
      .await
      .unwrap();

    let (device, queue) = adapter
      .request_device(
        &wgpu::DeviceDescriptor {
          label: None,
          required_features: wgpu::Features::empty(),
          required_limits: wgpu::Limits::default(),
          memory_hints: Default::default(),
        },
        None,
      )
      .await
      .unwrap();

    let aspect = size.width.max(1) as f32 / size.height.max(1) as f32;
    let camera_uniform = CameraUniform::new();
    let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
      label: Some("Camera Buffer"),
      contents: bytemuck::cast_slice(&[camera_uniform]),
      usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    });
    let camera_bind_group_layout =
      device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
          binding: 0,
          visibility: wgpu::ShaderStages::VERTEX,
          ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
          },
          count: None,
        }],
        label: Some("camera_bind_group_layout"),
      });
    let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
      layout: &camera_bind_group_layout,
      entries: &[wgpu::BindGroupEntry {
        binding: 0,
        resource: camera_buffer.as_entire_binding(),
      }],
      label: Some("camera_bind_group"),
    });
    let controller = InputController::init(&CameraParams::default());

    Self {
      instance,
      adapter,
      device,
      queue,
      scene,
      aspect,
      camera_uniform,
      camera_buffer,
      camera_bind_group,
      controller,
      camera_bind_group_layout,
    }
  }
}

fn texture_requests(scene: &Scene) -> Vec<TextureRequest> {
  scene
    .bodies
    .iter()
    .map(|b| TextureRequest {
      name: b.info.name.clone(),
      kind: b.info.kind,
    })
    .collect()
}

async fn start(params: SimParams, cancel: Arc<AtomicBool>) -> anyhow::Result<()> {
  let scene = Scene::new(&params);
  let loader = Loader::spawn(texture_requests(&scene));

  let window_loop = EventLoopWrapper::new("Orrery");
  let mut surface = SurfaceWrapper::new();
  let mut context = State::init(&surface, &window_loop.window.inner_size(), scene).await;

  // nothing ticks until every texture is in
  let textures = loader.wait(&cancel)?;

  let tick_interval = Duration::from_millis(params.tick_interval_ms);
  let delta = params.delta_t;
  let mut next_tick = Instant::now() + tick_interval;
  let mut ticks: u64 = 0;
  let mut example = None;
  let event_loop_function = EventLoop::run;

  let _ = (event_loop_function)(
    window_loop.event_loop,
    move |event, target: &EventLoopWindowTarget<()>| match event {
      Event::NewEvents(StartCause::Init) => {
        surface.resume(&context, window_loop.window.clone());
        if example.is_none() {
          example = Some(Render::init(
            surface.config(),
            &context.adapter,
            &context.device,
            &context.queue,
            &context.camera_bind_group_layout,
            &context.scene,
            &textures,
          ));
        }
        target.set_control_flow(ControlFlow::WaitUntil(next_tick));
      }
      Event::NewEvents(StartCause::ResumeTimeReached { .. }) => {
        if cancel.load(Ordering::Relaxed) {
          target.exit();
          return;
        }
        context.update(delta);
        ticks += 1;
        if ticks % 10 == 0 {
          window_loop.window.set_title(&format!(
            "Orrery | {:.0} mi to the Sun",
            context.scene.distance_to_sun_mi()
          ));
        }
        window_loop.window.request_redraw();
        next_tick += tick_interval;
        target.set_control_flow(ControlFlow::WaitUntil(next_tick));
      }
      Event::Suspended => {
        surface.suspend();
      }
      Event::WindowEvent { event, window_id } if window_id == window_loop.window.id() => {
        if !context.input(&event) {
          match event {
            WindowEvent::CloseRequested
            | WindowEvent::KeyboardInput {
              event:
                KeyEvent {
                  state: ElementState::Pressed,
                  physical_key: PhysicalKey::Code(KeyCode::Escape),
                  ..
                },
              ..
            } => target.exit(),
            WindowEvent::RedrawRequested => {
              if let Some(example) = &mut example {
                let frame = surface.acquire(&context);
                let view = frame.texture.create_view(&wgpu::TextureViewDescriptor {
                  format: Some(surface.config().view_formats[0]),
                  ..wgpu::TextureViewDescriptor::default()
                });
                let aspect = context.aspect;
                example.render(
                  &view,
                  &context.device,
                  &context.queue,
                  &context.camera_bind_group,
                  &mut context.scene,
                  aspect,
                );
                frame.present();
              }
            }
            _ => {}
          }
        }
      }
      _ => {}
    },
  );
  Ok(())
}

fn run_headless(params: &SimParams, cancel: &AtomicBool) -> anyhow::Result<()> {
  let mut scene = Scene::new(params);
  let loader = Loader::spawn(texture_requests(&scene));
  let _textures = loader.wait(cancel)?;

  let interval = Duration::from_millis(params.tick_interval_ms);
  let mut ticks: u64 = 0;
  loop {
    if cancel.load(Ordering::Relaxed) {
      break;
    }
    scene.tick(params.delta_t);
    ticks += 1;
    if ticks % 10 == 0 {
      log::info!(
        "tick {ticks}: {:.0} mi to the sun",
        scene.distance_to_sun_mi()
      );
    }
    if params.max_ticks > 0 && ticks >= params.max_ticks {
      break;
    }
    std::thread::sleep(interval);
  }
  log::info!("stopped after {ticks} ticks");
  Ok(())
}

pub fn run(params: SimParams, headless: bool) -> anyhow::Result<()> {
  env_logger::init();
  let cancel = Arc::new(AtomicBool::new(false));
  {
    let cancel = cancel.clone();
    ctrlc::set_handler(move || cancel.store(true, Ordering::Relaxed))?;
  }
  if headless {
    run_headless(&params, &cancel)
  } else {
    pollster::block_on(start(params, cancel))
  }
}
