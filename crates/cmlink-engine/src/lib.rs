//! # cmlink-engine
//!
//! The native color engine seam for ICC transform chains.
//!
//! All color math in this subsystem is delegated to an engine behind the
//! object-safe [`Engine`] trait: opening profiles, building N-profile and
//! proofing transforms, packaging abstract profiles, exporting device
//! links, and converting pixel rows. Two implementations ship here:
//!
//! - [`LcmsEngine`]: the production backend over Little CMS 2
//! - [`MockEngine`]: scriptable identity engine for tests
//!
//! # Example
//!
//! ```rust
//! use cmlink_engine::{Engine, LcmsEngine};
//! use std::sync::Arc;
//!
//! let engine: Arc<dyn Engine> = Arc::new(LcmsEngine::new());
//! assert!(engine.is_available());
//! ```
//!
//! # Thread Safety
//!
//! Engines, profiles, and transforms are all `Send + Sync`; transforms
//! are built with the engine's result cache disabled so one handle can
//! serve every row worker concurrently.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod engine;
mod error;
pub mod flags;
mod lcms;
mod mock;

pub use engine::{AbstractRequest, Engine, EngineProfile, EngineTransform, TransformRequest};
pub use error::{EngineError, EngineResult};
pub use lcms::LcmsEngine;
pub use mock::{BuildRecord, MockEngine, stub_profile_bytes};
