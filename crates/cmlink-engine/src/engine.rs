//! The engine seam: object-safe traits over a native color engine.
//!
//! The original design reached its engine through a table of function
//! pointers resolved from a dynamic library. Here that table is a trait
//! object chosen once at startup; the production backend wraps Little CMS 2
//! and [`crate::MockEngine`] stands in for tests.

use crate::EngineResult;
use cmlink_core::{ColorSpace, DeviceClass};
use std::any::Any;

/// Parameters for an N-profile extended transform build.
///
/// The per-profile arrays (`intents`, `bpc`, `adaptation`) must each have
/// one entry per profile. Intents above the standard 0..=3 range are the
/// engine's black-preservation encodings and pass through verbatim.
pub struct TransformRequest<'a> {
    /// Chain profiles, input first, output last.
    pub profiles: &'a [&'a dyn EngineProfile],
    /// Rendering intent per profile.
    pub intents: &'a [u32],
    /// Black point compensation per profile.
    pub bpc: &'a [bool],
    /// Observer adaptation state per profile (0.0..=1.0).
    pub adaptation: &'a [f64],
    /// Input pixel layout wire word.
    pub input_format: u32,
    /// Output pixel layout wire word.
    pub output_format: u32,
    /// Engine flag word (see [`crate::flags`]).
    pub flags: u32,
}

/// Parameters for packaging a sampled grid as an abstract profile.
pub struct AbstractRequest<'a> {
    /// 16-bit CLUT table, three output channels per grid node, first grid
    /// axis varying slowest.
    pub table: &'a [u16],
    /// Grid nodes per axis.
    pub grid_points: u32,
    /// ICC version for the emitted profile (e.g. 4.2 or 2.4).
    pub version: f64,
    /// Profile description text.
    pub description: &'a str,
    /// Copyright text.
    pub copyright: &'a str,
}

/// A native color engine.
///
/// All methods may fail with [`crate::EngineError::Unavailable`] when the
/// backend probed as unusable; the failure is identical on every call.
pub trait Engine: Send + Sync + std::fmt::Debug {
    /// Backend name for provenance tags and log lines.
    fn name(&self) -> &str;

    /// Encoded backend version number.
    fn version(&self) -> u32;

    /// Whether the backend probe succeeded.
    fn is_available(&self) -> bool;

    /// Opens an ICC profile byte stream.
    fn open_profile(&self, bytes: &[u8]) -> EngineResult<Box<dyn EngineProfile>>;

    /// Creates a D50 CIE L*a*b* version 4 profile.
    fn lab_profile(&self) -> EngineResult<Box<dyn EngineProfile>>;

    /// Builds an N-profile transform.
    fn create_transform(&self, request: &TransformRequest<'_>)
    -> EngineResult<Box<dyn EngineTransform>>;

    /// Builds a Lab float to Lab float round trip through `proof`, forward
    /// with `proofing_intent` and back with `intent`. Used for sampling
    /// proofing behavior on a grid.
    fn proofing_roundtrip(
        &self,
        proof: &dyn EngineProfile,
        intent: u32,
        proofing_intent: u32,
        flags: u32,
    ) -> EngineResult<Box<dyn EngineTransform>>;

    /// Packages a sampled CLUT as an abstract Lab-to-Lab profile and
    /// returns its ICC byte stream.
    fn assemble_abstract(&self, request: &AbstractRequest<'_>) -> EngineResult<Vec<u8>>;

    /// Exports a compiled transform as a device-link profile byte stream.
    fn device_link(
        &self,
        transform: &dyn EngineTransform,
        version: f64,
        flags: u32,
    ) -> EngineResult<Vec<u8>>;
}

/// An opened profile handle owned by a backend.
pub trait EngineProfile: Send + Sync {
    /// Data color space reported by the backend.
    fn color_space(&self) -> ColorSpace;

    /// Device class, when the backend reports a known one.
    fn device_class(&self) -> Option<DeviceClass>;

    /// Description text, empty when the profile carries none.
    fn description(&self) -> String;

    /// Backend downcast hook.
    fn as_any(&self) -> &dyn Any;
}

/// A compiled transform handle owned by a backend.
///
/// Implementations must be safe to call from multiple threads at once;
/// the row loop shares one transform across all workers.
pub trait EngineTransform: Send + Sync {
    /// Converts `pixels` pixels from `src` into `dst`, interpreting both
    /// according to the layouts the transform was built with.
    fn run_bytes(&self, src: &[u8], dst: &mut [u8], pixels: usize) -> EngineResult<()>;

    /// Converts Lab float triplets. Only valid for transforms built over
    /// Lab float endpoints, such as proofing round trips.
    fn run_lab(&self, src: &[[f32; 3]], dst: &mut [[f32; 3]]) -> EngineResult<()>;

    /// Backend downcast hook.
    fn as_any(&self) -> &dyn Any;
}
