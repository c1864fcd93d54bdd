//! Single-channel image views and sub-pixel sampling.
//!
//! The tracker consumes a borrowed [`ImageU8`] view per frame and never
//! copies the pixel buffer. [`ImageF32`] is an owned float buffer used by
//! the edge-map stage. Sub-pixel access goes through [`sample`], which
//! clamps at the border (replicate) so no read ever leaves the buffer.

pub mod f32;
pub mod sample;
pub mod traits;
pub mod u8;

pub use self::f32::ImageF32;
pub use self::sample::{bilinear_sample, gradient_at};
pub use self::traits::{ImageView, ImageViewMut};
pub use self::u8::ImageU8;
