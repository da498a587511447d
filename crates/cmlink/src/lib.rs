//! ICC transform chains over a pluggable color engine.
//!
//! This crate turns ordered profile lists into runnable pixel transforms:
//!
//! - [`ProfileCache`] keeps at most one open native handle per profile
//!   identity and shares checkouts by reference count;
//! - [`build`] classifies a [`TransformSpec`] and compiles it, splicing
//!   synthesized abstract proofing profiles in when simulation is
//!   requested (see [`synthesize`]);
//! - [`run`] executes a compiled transform row-parallel over caller
//!   memory;
//! - [`to_bytes`] / [`from_bytes`] / [`reload`] round-trip a compiled
//!   transform through an ICC device-link stream with provenance tags.
//!
//! The color math itself lives behind the [`cmlink_engine::Engine`] trait;
//! production uses the Little CMS backend, tests substitute
//! [`cmlink_engine::MockEngine`].
//!
//! # Example
//!
//! ```rust
//! use cmlink::{ProfileCache, TransformSpec, TransformOptions};
//! use cmlink_core::{ColorProfile, PixelLayout, PixelBuffer, PixelBufferMut};
//! use cmlink_engine::{MockEngine, stub_profile_bytes};
//! use std::sync::Arc;
//!
//! let cache = ProfileCache::new(Arc::new(MockEngine::new()));
//! let srgb = ColorProfile::from_bytes(stub_profile_bytes(b"mntr", b"RGB "))?;
//! let printer = ColorProfile::from_bytes(stub_profile_bytes(b"prtr", b"CMYK"))?;
//!
//! let spec = TransformSpec::builder(srgb)
//!     .output(printer)
//!     .layouts(PixelLayout::RGB_8, PixelLayout::CMYK_8)
//!     .build();
//! let transform = cmlink::build(&cache, &spec)?;
//!
//! let src_data = [200u8, 180, 40];
//! let mut dst_data = [0u8; 4];
//! let src = PixelBuffer::new(&src_data, PixelLayout::RGB_8, 1, 3)?;
//! let mut dst = PixelBufferMut::new(&mut dst_data, PixelLayout::CMYK_8, 1, 4)?;
//! cmlink::run(&transform, &src, &mut dst)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]

mod cache;
mod chain;
mod devicelink;
mod error;
mod options;
mod proof;
mod run;
mod spec;
pub mod tags;

pub use cache::{CachedProfile, ProfileCache, ProfileIdentity, SharedProfile};
pub use chain::{CompiledTransform, build};
pub use devicelink::{DEFAULT_COPYRIGHT, from_bytes, reload, to_bytes};
pub use error::{BuildError, OpenError, RunError};
pub use options::{BlackPreservation, Intent, Precalculation, TransformOptions};
pub use proof::{PROOF_GRID_POINTS, synthesize};
pub use run::{XYZ_SCALE, run};
pub use spec::{TransformSpec, TransformSpecBuilder};
