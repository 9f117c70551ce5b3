//! Texture preparation behind a poll-with-timeout gate.
//!
//! Workers produce RGBA8 textures on background threads; the main thread
//! polls at a fixed interval and either collects the full set or gives up
//! past the timeout. The tick loop must not start until the gate reports
//! ready.

use crate::body::BodyKind;
use anyhow::{bail, Result};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;
use std::time::{Duration, Instant};

pub const POLL_INTERVAL: Duration = Duration::from_millis(50);
pub const LOAD_TIMEOUT: Duration = Duration::from_secs(10);

const BODY_TEXTURE_SIZE: u32 = 256;
const SKY_TEXTURE_SIZE: u32 = 512;

/// Sky face order matches wgpu cube-map layer order.
pub const SKY_FACES: [&str; 6] = ["px", "nx", "py", "ny", "pz", "nz"];

#[derive(Debug)]
pub struct TextureData {
  pub name: String,
  pub width: u32,
  pub height: u32,
  pub pixels: Vec<u8>, // rgba8, row-major
}

#[derive(Debug)]
pub struct TextureSet {
  pub bodies: Vec<TextureData>,
  pub sky: Vec<TextureData>, // six faces, SKY_FACES order
}

impl TextureSet {
  #[must_use]
  pub fn body(&self, name: &str) -> Option<&TextureData> {
    self.bodies.iter().find(|t| t.name == name)
  }
}

#[derive(Debug, PartialEq, Eq)]
pub enum LoadState {
  Pending,
  Ready,
  TimedOut,
}

enum Loaded {
  Body(TextureData),
  Sky(usize, TextureData),
}

pub struct TextureRequest {
  pub name: String,
  pub kind: BodyKind,
}

pub struct Loader {
  rx: Receiver<Loaded>,
  expected: usize,
  timeout: Duration,
  started: Instant,
  bodies: Vec<TextureData>,
  sky: Vec<Option<TextureData>>,
}

impl Loader {
  /// Starts one worker per body texture plus six for the sky faces.
  #[must_use]
  pub fn spawn(requests: Vec<TextureRequest>) -> Self {
    let (tx, rx) = channel();
    let expected = requests.len() + SKY_FACES.len();
    for req in requests {
      let tx: Sender<Loaded> = tx.clone();
      thread::spawn(move || {
        let seed = req.name.bytes().map(u64::from).sum::<u64>();
        let tex = gen_body_texture(&req.name, req.kind, seed);
        let _ = tx.send(Loaded::Body(tex));
      });
    }
    for (i, face) in SKY_FACES.into_iter().enumerate() {
      let tx = tx.clone();
      thread::spawn(move || {
        let tex = gen_sky_face(face, 97 + i as u64);
        let _ = tx.send(Loaded::Sky(i, tex));
      });
    }
    Self::collecting(rx, expected, LOAD_TIMEOUT)
  }

  fn collecting(rx: Receiver<Loaded>, expected: usize, timeout: Duration) -> Self {
    Self {
      rx,
      expected,
      timeout,
      started: Instant::now(),
      bodies: Vec::new(),
      sky: (0..SKY_FACES.len()).map(|_| None).collect(),
    }
  }

  fn received(&self) -> usize {
    self.bodies.len() + self.sky.iter().filter(|f| f.is_some()).count()
  }

  pub fn poll(&mut self) -> LoadState {
    while let Ok(loaded) = self.rx.try_recv() {
      match loaded {
        Loaded::Body(tex) => self.bodies.push(tex),
        Loaded::Sky(i, tex) => self.sky[i] = Some(tex),
      }
    }
    if self.received() >= self.expected {
      LoadState::Ready
    } else if self.started.elapsed() >= self.timeout {
      LoadState::TimedOut
    } else {
      LoadState::Pending
    }
  }

  /// Blocks until every texture arrived, polling at [`POLL_INTERVAL`].
  /// Errors on timeout or when `cancel` flips.
  pub fn wait(mut self, cancel: &AtomicBool) -> Result<TextureSet> {
    loop {
      match self.poll() {
        LoadState::Ready => {
          log::info!(
            "{} textures ready in {:?}",
            self.expected,
            self.started.elapsed()
          );
          return Ok(TextureSet {
            bodies: self.bodies,
            sky: self.sky.into_iter().map(|f| f.expect("counted above")).collect(),
          });
        }
        LoadState::TimedOut => {
          bail!(
            "textures taking too long: {}/{} after {:?}",
            self.received(),
            self.expected,
            self.timeout
          )
        }
        LoadState::Pending => {
          if cancel.load(Ordering::Relaxed) {
            bail!("texture load cancelled");
          }
          thread::sleep(POLL_INTERVAL);
        }
      }
    }
  }
}

fn gen_body_texture(name: &str, kind: BodyKind, seed: u64) -> TextureData {
  let size = BODY_TEXTURE_SIZE;
  let mut rng = SmallRng::seed_from_u64(seed);
  let mut pixels = vec![0u8; (size * size * 4) as usize];
  match kind {
    BodyKind::Star => star_surface(&mut pixels, size, &mut rng),
    BodyKind::Planet => banded_surface(&mut pixels, size, &mut rng),
    BodyKind::Moon => cratered_surface(&mut pixels, size, &mut rng),
  }
  TextureData {
    name: name.to_string(),
    width: size,
    height: size,
    pixels,
  }
}

fn star_surface(pixels: &mut [u8], size: u32, rng: &mut SmallRng) {
  for y in 0..size {
    for x in 0..size {
      let i = ((y * size + x) * 4) as usize;
      let flicker = rng.gen_range(0..30u8);
      pixels[i] = 255;
      pixels[i + 1] = 190 + flicker / 2;
      pixels[i + 2] = 40 + flicker;
      pixels[i + 3] = 255;
    }
  }
}

fn banded_surface(pixels: &mut [u8], size: u32, rng: &mut SmallRng) {
  let bands = rng.gen_range(6..14);
  let base: [u8; 3] = [rng.gen_range(10..90), rng.gen_range(60..160), rng.gen_range(90..200)];
  let alt: [u8; 3] = [rng.gen_range(30..120), rng.gen_range(90..200), rng.gen_range(40..140)];
  for y in 0..size {
    let band = (y * bands / size) % 2 == 0;
    let color = if band { base } else { alt };
    for x in 0..size {
      let i = ((y * size + x) * 4) as usize;
      let jitter = rng.gen_range(0..25u8);
      pixels[i] = color[0].saturating_add(jitter);
      pixels[i + 1] = color[1].saturating_add(jitter);
      pixels[i + 2] = color[2].saturating_add(jitter);
      pixels[i + 3] = 255;
    }
  }
}

fn cratered_surface(pixels: &mut [u8], size: u32, rng: &mut SmallRng) {
  for px in pixels.chunks_exact_mut(4) {
    let g = 120 + rng.gen_range(0..30u8);
    px.copy_from_slice(&[g, g, g, 255]);
  }
  for _ in 0..40 {
    let cx = rng.gen_range(0..size) as i32;
    let cy = rng.gen_range(0..size) as i32;
    let r = rng.gen_range(3..14) as i32;
    for dy in -r..=r {
      for dx in -r..=r {
        if dx * dx + dy * dy > r * r {
          continue;
        }
        let x = cx + dx;
        let y = cy + dy;
        if x < 0 || y < 0 || x >= size as i32 || y >= size as i32 {
          continue;
        }
        let i = ((y as u32 * size + x as u32) * 4) as usize;
        for c in 0..3 {
          pixels[i + c] = pixels[i + c].saturating_sub(35);
        }
      }
    }
  }
}

fn gen_sky_face(face: &str, seed: u64) -> TextureData {
  let size = SKY_TEXTURE_SIZE;
  let mut rng = SmallRng::seed_from_u64(seed);
  let brightness = Normal::new(180.0f32, 40.0).expect("valid distribution");
  let mut pixels = vec![0u8; (size * size * 4) as usize];
  for px in pixels.chunks_exact_mut(4) {
    px[3] = 255;
  }
  for _ in 0..600 {
    let x = rng.gen_range(0..size);
    let y = rng.gen_range(0..size);
    let b = brightness.sample(&mut rng).clamp(40.0, 255.0) as u8;
    let i = ((y * size + x) * 4) as usize;
    pixels[i] = b;
    pixels[i + 1] = b;
    pixels[i + 2] = b.saturating_add(20);
  }
  TextureData {
    name: format!("sky_{face}"),
    width: size,
    height: size,
    pixels,
  }
}
