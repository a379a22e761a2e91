//! Pixel model for the GRIDmas tree.
//!
//! The crate owns everything the rendering pipeline knows about the physical
//! light string: colors and their encodings, the per-pixel interpolation state
//! machine, and the loaded topology. The ownership split is:
//!
//! ```text
//!   coordinate file ──▶ Topology::load ──▶ Canvas (unique writer)
//!                                            │  owns Vec<ColorState>
//!                                            │  publishes packed colors
//!                                            ▼
//!                         Arc<Topology> ◀── readers (snapshot_frame)
//! ```
//!
//! `Topology` is immutable geometry plus one atomic color word per pixel, so
//! any thread may snapshot a frame without locking. `Canvas` is the only type
//! that can change colors and it is not `Clone`; whoever holds it (or a
//! `&mut` to it) is the single writer.

mod color;
mod easing;
mod frame;
mod pixel;
mod state;
mod topology;

pub use color::{ColorError, Rgb};
pub use easing::Easing;
pub use frame::{Frame, RawFrame};
pub use pixel::Pixel;
pub use state::ColorState;
pub use topology::{Canvas, PixelMut, Topology, TopologyError};
