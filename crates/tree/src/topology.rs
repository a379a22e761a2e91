use std::fs;
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info};

use crate::color::{ColorError, Rgb};
use crate::easing::Easing;
use crate::frame::{Frame, RawFrame};
use crate::pixel::Pixel;
use crate::state::ColorState;

#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("failed to read coordinate file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line}: {reason}")]
    Malformed { line: usize, reason: String },
    #[error("coordinate source contains no pixels")]
    Empty,
}

/// Geometry of every pixel plus the published color of each one.
///
/// Colors are stored as one packed atomic word per pixel so a reader always
/// sees a consistent triple for a given pixel. Only [`Canvas`] writes them.
#[derive(Debug)]
pub struct Topology {
    pixels: Vec<Pixel>,
    height: f64,
    published: Vec<AtomicU32>,
}

impl Topology {
    /// Reads a coordinate file with one `x,y,z` line per pixel.
    pub fn load(path: impl AsRef<Path>) -> Result<Canvas, TopologyError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| TopologyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let canvas = Self::parse(&raw)?;
        info!(
            path = %path.display(),
            pixels = canvas.topology().len(),
            height = canvas.topology().height(),
            "loaded tree topology"
        );
        Ok(canvas)
    }

    /// Parses coordinate text. Blank lines and `#` comments are skipped, and
    /// a leading header such as `x,y,z` is tolerated.
    pub fn parse(source: &str) -> Result<Canvas, TopologyError> {
        let mut coords = Vec::new();
        let mut seen_data = false;
        for (index, line) in source.lines().enumerate() {
            let line_no = index + 1;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            if !seen_data && is_header(trimmed) {
                debug!(line = line_no, header = trimmed, "skipping coordinate header");
                seen_data = true;
                continue;
            }
            seen_data = true;
            coords.push(parse_coordinate(trimmed, line_no)?);
        }
        Self::from_coords(coords)
    }

    pub fn from_coords(coords: Vec<[f64; 3]>) -> Result<Canvas, TopologyError> {
        if coords.is_empty() {
            return Err(TopologyError::Empty);
        }
        let pixels: Vec<Pixel> = coords
            .into_iter()
            .enumerate()
            .map(|(id, xyz)| Pixel::new(id, xyz))
            .collect();
        let height = pixels.iter().map(Pixel::z).fold(f64::MIN, f64::max);
        let published = pixels
            .iter()
            .map(|_| AtomicU32::new(Rgb::BLACK.to_packed()))
            .collect();
        let states = vec![ColorState::default(); pixels.len()];
        let topology = Arc::new(Self {
            pixels,
            height,
            published,
        });
        Ok(Canvas { topology, states })
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Highest `z` of any pixel.
    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    pub fn pixel(&self, id: usize) -> Option<&Pixel> {
        self.pixels.get(id)
    }

    /// Last color published for `id`.
    pub fn color(&self, id: usize) -> Option<Rgb> {
        self.published.get(id).map(load_color)
    }

    /// Reads every pixel in wire order. Each pixel is read atomically; the
    /// frame as a whole is not.
    pub fn snapshot_frame(&self) -> Frame {
        Frame::new(self.published.iter().map(load_color).collect())
    }

    /// The `count` pixels closest to `id`, nearest first, excluding itself.
    pub fn nearest(&self, id: usize, count: usize) -> Vec<&Pixel> {
        let Some(origin) = self.pixel(id) else {
            return Vec::new();
        };
        let mut others: Vec<(f64, &Pixel)> = self
            .pixels
            .iter()
            .filter(|pixel| pixel.id() != id)
            .map(|pixel| (origin.distance_to(pixel), pixel))
            .collect();
        others.sort_by(|a, b| a.0.total_cmp(&b.0));
        others.into_iter().take(count).map(|(_, pixel)| pixel).collect()
    }

    /// Every other pixel within `radius` of `id`.
    pub fn within(&self, id: usize, radius: f64) -> Vec<&Pixel> {
        let Some(origin) = self.pixel(id) else {
            return Vec::new();
        };
        self.pixels
            .iter()
            .filter(|pixel| pixel.id() != id && origin.distance_to(pixel) <= radius)
            .collect()
    }
}

fn load_color(slot: &AtomicU32) -> Rgb {
    let word = slot.load(Ordering::Acquire);
    Rgb::new(
        ((word >> 8) & 0xff) as u8,
        ((word >> 16) & 0xff) as u8,
        (word & 0xff) as u8,
    )
}

/// Only a literal `x,y,z` line (any case) counts as a header.
fn is_header(line: &str) -> bool {
    let fields: Vec<String> = line
        .split(',')
        .map(|field| field.trim().to_ascii_lowercase())
        .collect();
    fields == ["x", "y", "z"]
}

fn parse_coordinate(line: &str, line_no: usize) -> Result<[f64; 3], TopologyError> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != 3 {
        return Err(TopologyError::Malformed {
            line: line_no,
            reason: format!("expected 3 comma-separated values, found {}", fields.len()),
        });
    }
    let mut xyz = [0.0; 3];
    for (slot, field) in xyz.iter_mut().zip(&fields) {
        let value: f64 = field.parse().map_err(|_| TopologyError::Malformed {
            line: line_no,
            reason: format!("'{field}' is not a number"),
        })?;
        if !value.is_finite() {
            return Err(TopologyError::Malformed {
                line: line_no,
                reason: format!("'{field}' is not finite"),
            });
        }
        *slot = value;
    }
    Ok(xyz)
}

/// Exclusive write access to every pixel's color.
///
/// There is exactly one `Canvas` per loaded topology. It can be moved to a
/// pattern thread and handed back, which is how the pipeline keeps a single
/// writer without locking individual pixels.
#[derive(Debug)]
pub struct Canvas {
    topology: Arc<Topology>,
    states: Vec<ColorState>,
}

impl Canvas {
    pub fn topology(&self) -> &Arc<Topology> {
        &self.topology
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn height(&self) -> f64 {
        self.topology.height
    }

    pub fn state(&self, id: usize) -> Option<&ColorState> {
        self.states.get(id)
    }

    pub fn pixel_mut(&mut self, id: usize) -> Option<PixelMut<'_>> {
        let topology = &*self.topology;
        let state = self.states.get_mut(id)?;
        Some(PixelMut {
            pixel: &topology.pixels[id],
            slot: &topology.published[id],
            state,
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = PixelMut<'_>> {
        let topology = &*self.topology;
        self.states
            .iter_mut()
            .zip(topology.pixels.iter().zip(topology.published.iter()))
            .map(|(state, (pixel, slot))| PixelMut { pixel, slot, state })
    }

    /// Sets one pixel immediately. Returns `false` for unknown ids.
    pub fn set(&mut self, id: usize, color: Rgb) -> bool {
        match self.pixel_mut(id) {
            Some(mut pixel) => {
                pixel.set(color);
                true
            }
            None => false,
        }
    }

    pub fn fill(&mut self, color: Rgb) {
        for mut pixel in self.iter_mut() {
            pixel.set(color);
        }
    }

    /// Overwrites every colored slot; `None` slots and slots past the end of
    /// the tree are left alone. Returns how many pixels changed.
    pub fn apply_raw_frame(&mut self, frame: &RawFrame) -> usize {
        let mut applied = 0;
        for (id, color) in frame.assignments() {
            if self.set(id, color) {
                applied += 1;
            }
        }
        applied
    }
}

/// Mutable view of one pixel. Every change is published immediately.
#[derive(Debug)]
pub struct PixelMut<'a> {
    pixel: &'a Pixel,
    slot: &'a AtomicU32,
    state: &'a mut ColorState,
}

impl PixelMut<'_> {
    pub fn color(&self) -> Rgb {
        self.state.color()
    }

    pub fn state(&self) -> &ColorState {
        self.state
    }

    pub fn set(&mut self, color: Rgb) {
        self.state.set_instant(color);
        self.publish();
    }

    pub fn set_rgb(&mut self, r: i64, g: i64, b: i64) {
        self.state.set_rgb(r, g, b);
        self.publish();
    }

    pub fn on(&mut self) {
        self.set(Rgb::WHITE);
    }

    pub fn off(&mut self) {
        self.set(Rgb::BLACK);
    }

    pub fn schedule(
        &mut self,
        target: Rgb,
        steps: u32,
        easing: Easing,
        force_restart: bool,
    ) -> Result<(), ColorError> {
        self.state
            .schedule_interpolation(target, steps, easing, force_restart)
    }

    pub fn advance(&mut self) -> Rgb {
        let color = self.state.advance();
        self.publish();
        color
    }

    pub fn lerp(&mut self, target: Rgb, steps: u32, easing: Easing) -> Result<Rgb, ColorError> {
        let color = self.state.lerp(target, steps, easing)?;
        self.publish();
        Ok(color)
    }

    pub fn fade(&mut self, factor: f64) {
        self.state.fade(factor);
        self.publish();
    }

    fn publish(&self) {
        self.slot
            .store(self.state.color().to_packed(), Ordering::Release);
    }
}

impl Deref for PixelMut<'_> {
    type Target = Pixel;

    fn deref(&self) -> &Pixel {
        self.pixel
    }
}
