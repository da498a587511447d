//! Mock engine for tests.
//!
//! Applies identity math, counts opens and builds, and can be configured
//! to probe as unavailable, fail opens, or distort Lab round trips so
//! gamut behavior becomes observable without a real narrow-gamut profile.

use crate::{
    AbstractRequest, Engine, EngineError, EngineProfile, EngineResult, EngineTransform,
    TransformRequest,
};
use cmlink_core::{ColorProfile, ColorSpace, DeviceClass, PixelLayout};
use std::any::Any;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One recorded [`MockEngine::create_transform`] call.
#[derive(Debug, Clone)]
pub struct BuildRecord {
    /// Number of profiles in the chain.
    pub profiles: usize,
    /// Intent array as passed.
    pub intents: Vec<u32>,
    /// Input pixel word as passed.
    pub input_format: u32,
    /// Output pixel word as passed.
    pub output_format: u32,
    /// Flag word as passed.
    pub flags: u32,
}

/// A scriptable in-memory engine.
///
/// # Example
///
/// ```rust
/// use cmlink_engine::{Engine, MockEngine};
///
/// let engine = MockEngine::new();
/// assert!(engine.is_available());
/// assert_eq!(engine.opens(), 0);
/// ```
#[derive(Debug, Default)]
pub struct MockEngine {
    available: bool,
    fail_opens: bool,
    lab_clamp: Option<f32>,
    opens: AtomicUsize,
    builds: Mutex<Vec<BuildRecord>>,
}

impl MockEngine {
    /// A fresh, available engine with identity behavior.
    pub fn new() -> Self {
        Self {
            available: true,
            ..Self::default()
        }
    }

    /// An engine whose probe failed; every call errors.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::default()
        }
    }

    /// Makes every profile open fail, for retry tests.
    pub fn with_failing_opens(mut self) -> Self {
        self.fail_opens = true;
        self
    }

    /// Clamps a and b to the given magnitude in Lab round trips,
    /// simulating a narrow-gamut proof profile.
    pub fn with_lab_clamp(mut self, clamp: f32) -> Self {
        self.lab_clamp = Some(clamp);
        self
    }

    /// Number of profile opens so far.
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Number of transform builds so far.
    pub fn builds(&self) -> usize {
        self.builds.lock().map(|log| log.len()).unwrap_or(0)
    }

    /// All recorded transform builds, in order.
    pub fn build_log(&self) -> Vec<BuildRecord> {
        self.builds.lock().map(|log| log.clone()).unwrap_or_default()
    }

    fn ensure_available(&self) -> EngineResult<()> {
        if self.available {
            Ok(())
        } else {
            Err(EngineError::Unavailable)
        }
    }
}

/// Builds a minimal ICC header so mock outputs parse as [`ColorProfile`]s.
pub fn stub_profile_bytes(class: &[u8; 4], space: &[u8; 4]) -> Vec<u8> {
    let mut bytes = vec![0u8; 132];
    bytes[..4].copy_from_slice(&(132u32).to_be_bytes());
    bytes[8] = 4;
    bytes[9] = 0x30;
    bytes[12..16].copy_from_slice(class);
    bytes[16..20].copy_from_slice(space);
    bytes[20..24].copy_from_slice(b"Lab ");
    bytes[36..40].copy_from_slice(b"acsp");
    bytes
}

struct MockProfile {
    parsed: ColorProfile,
}

impl EngineProfile for MockProfile {
    fn color_space(&self) -> ColorSpace {
        self.parsed.color_space()
    }

    fn device_class(&self) -> Option<DeviceClass> {
        Some(self.parsed.device_class())
    }

    fn description(&self) -> String {
        format!("mock {}", self.parsed.nickname())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct MockTransform {
    input_format: u32,
    output_format: u32,
    lab_clamp: Option<f32>,
}

impl EngineTransform for MockTransform {
    fn run_bytes(&self, src: &[u8], dst: &mut [u8], pixels: usize) -> EngineResult<()> {
        let in_bpp = PixelLayout::decode(self.input_format)
            .map(|l| l.bytes_per_pixel())
            .map_err(|e| EngineError::RunFailed(e.to_string()))?;
        let out_bpp = PixelLayout::decode(self.output_format)
            .map(|l| l.bytes_per_pixel())
            .map_err(|e| EngineError::RunFailed(e.to_string()))?;
        let copy = in_bpp.min(out_bpp);
        for i in 0..pixels {
            let s = &src[i * in_bpp..i * in_bpp + copy];
            dst[i * out_bpp..i * out_bpp + copy].copy_from_slice(s);
        }
        Ok(())
    }

    fn run_lab(&self, src: &[[f32; 3]], dst: &mut [[f32; 3]]) -> EngineResult<()> {
        for (s, d) in src.iter().zip(dst.iter_mut()) {
            *d = *s;
            if let Some(clamp) = self.lab_clamp {
                d[1] = d[1].clamp(-clamp, clamp);
                d[2] = d[2].clamp(-clamp, clamp);
            }
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Engine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    fn version(&self) -> u32 {
        1
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn open_profile(&self, bytes: &[u8]) -> EngineResult<Box<dyn EngineProfile>> {
        self.ensure_available()?;
        if self.fail_opens {
            return Err(EngineError::OpenFailed("scripted open failure".into()));
        }
        let parsed = ColorProfile::from_bytes(bytes.to_vec())
            .map_err(|e| EngineError::OpenFailed(e.to_string()))?;
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockProfile { parsed }))
    }

    fn lab_profile(&self) -> EngineResult<Box<dyn EngineProfile>> {
        self.ensure_available()?;
        let parsed = ColorProfile::from_bytes(stub_profile_bytes(b"spac", b"Lab "))
            .map_err(|e| EngineError::OpenFailed(e.to_string()))?;
        Ok(Box::new(MockProfile { parsed }))
    }

    fn create_transform(
        &self,
        request: &TransformRequest<'_>,
    ) -> EngineResult<Box<dyn EngineTransform>> {
        self.ensure_available()?;
        if request.profiles.is_empty() {
            return Err(EngineError::BuildFailed("empty profile chain".into()));
        }
        if let Ok(mut log) = self.builds.lock() {
            log.push(BuildRecord {
                profiles: request.profiles.len(),
                intents: request.intents.to_vec(),
                input_format: request.input_format,
                output_format: request.output_format,
                flags: request.flags,
            });
        }
        Ok(Box::new(MockTransform {
            input_format: request.input_format,
            output_format: request.output_format,
            lab_clamp: None,
        }))
    }

    fn proofing_roundtrip(
        &self,
        _proof: &dyn EngineProfile,
        _intent: u32,
        _proofing_intent: u32,
        _flags: u32,
    ) -> EngineResult<Box<dyn EngineTransform>> {
        self.ensure_available()?;
        let word = PixelLayout::LAB_FLT.encode();
        Ok(Box::new(MockTransform {
            input_format: word,
            output_format: word,
            lab_clamp: self.lab_clamp,
        }))
    }

    fn assemble_abstract(&self, request: &AbstractRequest<'_>) -> EngineResult<Vec<u8>> {
        self.ensure_available()?;
        let nodes = (request.grid_points as usize).pow(3) * 3;
        if request.table.len() != nodes {
            return Err(EngineError::BuildFailed(format!(
                "CLUT table has {} entries, grid {} needs {}",
                request.table.len(),
                request.grid_points,
                nodes
            )));
        }
        Ok(stub_profile_bytes(b"abst", b"Lab "))
    }

    fn device_link(
        &self,
        _transform: &dyn EngineTransform,
        _version: f64,
        _flags: u32,
    ) -> EngineResult<Vec<u8>> {
        self.ensure_available()?;
        Ok(stub_profile_bytes(b"link", b"RGB "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_opens() {
        let engine = MockEngine::new();
        let bytes = stub_profile_bytes(b"mntr", b"RGB ");
        engine.open_profile(&bytes).unwrap();
        engine.open_profile(&bytes).unwrap();
        assert_eq!(engine.opens(), 2);
    }

    #[test]
    fn test_unavailable() {
        let engine = MockEngine::unavailable();
        let bytes = stub_profile_bytes(b"mntr", b"RGB ");
        assert!(matches!(
            engine.open_profile(&bytes),
            Err(EngineError::Unavailable)
        ));
        assert!(matches!(engine.lab_profile(), Err(EngineError::Unavailable)));
    }

    #[test]
    fn test_identity_run() {
        let engine = MockEngine::new();
        let bytes = stub_profile_bytes(b"mntr", b"RGB ");
        let profile = engine.open_profile(&bytes).unwrap();
        let word = PixelLayout::RGB_8.encode();
        let transform = engine
            .create_transform(&TransformRequest {
                profiles: &[profile.as_ref()],
                intents: &[0],
                bpc: &[false],
                adaptation: &[1.0],
                input_format: word,
                output_format: word,
                flags: 0,
            })
            .unwrap();
        let src = [1u8, 2, 3, 4, 5, 6];
        let mut dst = [0u8; 6];
        transform.run_bytes(&src, &mut dst, 2).unwrap();
        assert_eq!(src, dst);
        assert_eq!(engine.builds(), 1);
        assert_eq!(engine.build_log()[0].profiles, 1);
    }

    #[test]
    fn test_lab_clamp() {
        let engine = MockEngine::new().with_lab_clamp(20.0);
        let lab = engine.lab_profile().unwrap();
        let roundtrip = engine.proofing_roundtrip(lab.as_ref(), 0, 1, 0).unwrap();
        let src = [[50.0f32, 80.0, -90.0], [50.0, 5.0, 5.0]];
        let mut dst = [[0.0f32; 3]; 2];
        roundtrip.run_lab(&src, &mut dst).unwrap();
        assert_eq!(dst[0], [50.0, 20.0, -20.0]);
        assert_eq!(dst[1], src[1]);
    }
}
