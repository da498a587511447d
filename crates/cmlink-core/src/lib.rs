//! # cmlink-core
//!
//! Leaf value types for ICC transform chains.
//!
//! This crate has no dependency on any native color engine. It provides:
//!
//! - [`PixelLayout`] and its bit-packed 32-bit wire word codec
//! - [`ColorSpace`] / [`DeviceClass`] ICC signatures
//! - [`ColorProfile`]: immutable ICC bytes plus parsed header attributes
//!   and an MD5 content hash
//! - [`PixelBuffer`] / [`PixelBufferMut`]: borrowed views over caller rows
//!
//! # Example
//!
//! ```rust
//! use cmlink_core::{ColorSpace, PixelLayout};
//!
//! let layout = PixelLayout::decode(PixelLayout::RGBA_8.encode()).unwrap();
//! assert_eq!(layout.color_space, ColorSpace::Rgb);
//! assert_eq!(layout.total_channels(), 4);
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod buffer;
mod error;
mod layout;
mod profile;
mod signature;

pub use buffer::{PixelBuffer, PixelBufferMut};
pub use error::{Error, Result};
pub use layout::PixelLayout;
pub use profile::ColorProfile;
pub use signature::{ColorSpace, DeviceClass};
