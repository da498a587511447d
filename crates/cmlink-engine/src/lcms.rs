//! Little CMS 2 backend.
//!
//! Wraps the raw engine handles in RAII types and implements the
//! [`Engine`] seam over them. The dynamic pixel formats, extended and
//! proofing transform builds, and device-link export this subsystem needs
//! sit below the high-level `lcms2` crate API, so the calls here go
//! straight to the `lcms2-sys` bindings.

use crate::{
    AbstractRequest, Engine, EngineError, EngineProfile, EngineResult, EngineTransform,
    TransformRequest, flags,
};
use cmlink_core::{ColorSpace, DeviceClass, PixelLayout};
use lcms2_sys as ffi;
use std::any::Any;
use std::ffi::c_void;
use std::os::raw::c_char;
use tracing::{debug, trace};

const GLOBAL_CONTEXT: ffi::Context = std::ptr::null_mut();

const LANG_EN: *const c_char = c"en".as_ptr();
const COUNTRY_US: *const c_char = c"US".as_ptr();

/// Maps a numeric intent code, including the black-preservation
/// encodings above 3, onto the engine's intent enum.
fn icc_intent(code: u32) -> ffi::Intent {
    match code {
        1 => ffi::Intent::RelativeColorimetric,
        2 => ffi::Intent::Saturation,
        3 => ffi::Intent::AbsoluteColorimetric,
        10 => ffi::Intent::PreserveKOnlyPerceptual,
        11 => ffi::Intent::PreserveKOnlyRelativeColorimetric,
        12 => ffi::Intent::PreserveKOnlySaturation,
        13 => ffi::Intent::PreserveKPlanePerceptual,
        14 => ffi::Intent::PreserveKPlaneRelativeColorimetric,
        15 => ffi::Intent::PreserveKPlaneSaturation,
        _ => ffi::Intent::Perceptual,
    }
}

/// The production engine backend over Little CMS 2.
///
/// Probes the library version once at construction; when the probe fails
/// every later call returns [`EngineError::Unavailable`].
///
/// # Example
///
/// ```rust
/// use cmlink_engine::{Engine, LcmsEngine};
///
/// let engine = LcmsEngine::new();
/// assert!(engine.is_available());
/// ```
#[derive(Debug)]
pub struct LcmsEngine {
    version: u32,
    available: bool,
}

impl LcmsEngine {
    /// Probes the engine and records its version.
    pub fn new() -> Self {
        let version = unsafe { ffi::cmsGetEncodedCMMversion() }.max(0) as u32;
        let available = version >= 2000;
        debug!(version, available, "lcms engine probe");
        Self { version, available }
    }

    fn ensure_available(&self) -> EngineResult<()> {
        if self.available {
            Ok(())
        } else {
            Err(EngineError::Unavailable)
        }
    }
}

impl Default for LcmsEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// An open native profile handle.
struct LcmsProfile {
    handle: ffi::HPROFILE,
}

// Profile handles are not mutated after open; the engine only reads them
// when building transforms.
unsafe impl Send for LcmsProfile {}
unsafe impl Sync for LcmsProfile {}

impl Drop for LcmsProfile {
    fn drop(&mut self) {
        unsafe {
            ffi::cmsCloseProfile(self.handle);
        }
    }
}

impl EngineProfile for LcmsProfile {
    fn color_space(&self) -> ColorSpace {
        let sig = unsafe { ffi::cmsGetColorSpace(self.handle) };
        ColorSpace::from_icc_signature(sig as u32).unwrap_or(ColorSpace::Any)
    }

    fn device_class(&self) -> Option<DeviceClass> {
        let sig = unsafe { ffi::cmsGetDeviceClass(self.handle) };
        DeviceClass::from_icc_signature(sig as u32).ok()
    }

    fn description(&self) -> String {
        let mut buf = [0u8; 256];
        let len = unsafe {
            ffi::cmsGetProfileInfoASCII(
                self.handle,
                ffi::InfoType::Description,
                LANG_EN,
                COUNTRY_US,
                buf.as_mut_ptr() as *mut c_char,
                buf.len() as u32,
            )
        } as usize;
        let end = len.min(buf.len()).saturating_sub(1);
        String::from_utf8_lossy(&buf[..end])
            .trim_end_matches('\0')
            .to_string()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// A compiled native transform handle.
struct LcmsTransform {
    handle: ffi::HTRANSFORM,
}

// Every transform is created with the no-cache flag, which removes the
// engine's only piece of per-call mutable state; concurrent cmsDoTransform
// calls on one handle are then permitted by the engine contract.
unsafe impl Send for LcmsTransform {}
unsafe impl Sync for LcmsTransform {}

impl Drop for LcmsTransform {
    fn drop(&mut self) {
        unsafe {
            ffi::cmsDeleteTransform(self.handle);
        }
    }
}

impl EngineTransform for LcmsTransform {
    fn run_bytes(&self, src: &[u8], dst: &mut [u8], pixels: usize) -> EngineResult<()> {
        unsafe {
            ffi::cmsDoTransform(
                self.handle,
                src.as_ptr() as *const c_void,
                dst.as_mut_ptr() as *mut c_void,
                pixels as u32,
            );
        }
        Ok(())
    }

    fn run_lab(&self, src: &[[f32; 3]], dst: &mut [[f32; 3]]) -> EngineResult<()> {
        if dst.len() < src.len() {
            return Err(EngineError::RunFailed(format!(
                "lab output holds {} samples, need {}",
                dst.len(),
                src.len()
            )));
        }
        unsafe {
            ffi::cmsDoTransform(
                self.handle,
                src.as_ptr() as *const c_void,
                dst.as_mut_ptr() as *mut c_void,
                src.len() as u32,
            );
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn native_handle<'a>(profile: &'a dyn EngineProfile) -> EngineResult<&'a LcmsProfile> {
    profile
        .as_any()
        .downcast_ref::<LcmsProfile>()
        .ok_or_else(|| EngineError::BuildFailed("profile belongs to a different engine".into()))
}

/// Saves a native profile to a byte vector.
fn save_to_mem(handle: ffi::HPROFILE) -> EngineResult<Vec<u8>> {
    let mut size: u32 = 0;
    let ok = unsafe { ffi::cmsSaveProfileToMem(handle, std::ptr::null_mut(), &mut size) };
    if ok == 0 || size == 0 {
        return Err(EngineError::ExportFailed("profile size query failed".into()));
    }
    let mut bytes = vec![0u8; size as usize];
    let ok = unsafe {
        ffi::cmsSaveProfileToMem(handle, bytes.as_mut_ptr() as *mut c_void, &mut size)
    };
    if ok == 0 {
        return Err(EngineError::ExportFailed("profile serialization failed".into()));
    }
    bytes.truncate(size as usize);
    Ok(bytes)
}

impl Engine for LcmsEngine {
    fn name(&self) -> &str {
        "lcms2"
    }

    fn version(&self) -> u32 {
        self.version
    }

    fn is_available(&self) -> bool {
        self.available
    }

    fn open_profile(&self, bytes: &[u8]) -> EngineResult<Box<dyn EngineProfile>> {
        self.ensure_available()?;
        let handle = unsafe {
            ffi::cmsOpenProfileFromMemTHR(
                GLOBAL_CONTEXT,
                bytes.as_ptr() as *const c_void,
                bytes.len() as u32,
            )
        };
        if handle.is_null() {
            return Err(EngineError::OpenFailed(format!(
                "engine rejected {} profile bytes",
                bytes.len()
            )));
        }
        trace!(len = bytes.len(), "opened profile");
        Ok(Box::new(LcmsProfile { handle }))
    }

    fn lab_profile(&self) -> EngineResult<Box<dyn EngineProfile>> {
        self.ensure_available()?;
        let handle = unsafe { ffi::cmsCreateLab4ProfileTHR(GLOBAL_CONTEXT, ffi::cmsD50_xyY()) };
        if handle.is_null() {
            return Err(EngineError::OpenFailed("Lab profile creation failed".into()));
        }
        Ok(Box::new(LcmsProfile { handle }))
    }

    fn create_transform(
        &self,
        request: &TransformRequest<'_>,
    ) -> EngineResult<Box<dyn EngineTransform>> {
        self.ensure_available()?;
        let n = request.profiles.len();
        if n == 0 {
            return Err(EngineError::BuildFailed("empty profile chain".into()));
        }
        if request.intents.len() != n || request.bpc.len() != n || request.adaptation.len() != n {
            return Err(EngineError::BuildFailed(format!(
                "per-profile arrays must all have {n} entries"
            )));
        }

        let mut handles: Vec<ffi::HPROFILE> = Vec::with_capacity(n);
        for profile in request.profiles {
            handles.push(native_handle(*profile)?.handle);
        }
        let mut bpc: Vec<ffi::Bool> = request.bpc.iter().map(|&b| b as ffi::Bool).collect();
        let mut intents: Vec<u32> = request.intents.to_vec();
        let mut adaptation: Vec<f64> = request.adaptation.to_vec();
        let flags_word = request.flags | flags::NO_CACHE;

        let handle = unsafe {
            ffi::cmsCreateExtendedTransform(
                GLOBAL_CONTEXT,
                n as u32,
                handles.as_mut_ptr(),
                bpc.as_mut_ptr(),
                intents.as_mut_ptr(),
                adaptation.as_mut_ptr(),
                std::ptr::null_mut(),
                0,
                ffi::PixelFormat(request.input_format),
                ffi::PixelFormat(request.output_format),
                flags_word,
            )
        };
        if handle.is_null() {
            return Err(EngineError::BuildFailed(format!(
                "extended transform refused: {} profiles, in 0x{:x}, out 0x{:x}, flags {}",
                n,
                request.input_format,
                request.output_format,
                flags::describe(flags_word),
            )));
        }
        trace!(
            profiles = n,
            flags = %flags::describe(flags_word),
            "built transform"
        );
        Ok(Box::new(LcmsTransform { handle }))
    }

    fn proofing_roundtrip(
        &self,
        proof: &dyn EngineProfile,
        intent: u32,
        proofing_intent: u32,
        flags_word: u32,
    ) -> EngineResult<Box<dyn EngineTransform>> {
        self.ensure_available()?;
        let lab = self.lab_profile()?;
        let lab = native_handle(lab.as_ref())?;
        let proof = native_handle(proof)?;
        let lab_word = ffi::PixelFormat(PixelLayout::LAB_FLT.encode());

        let handle = unsafe {
            ffi::cmsCreateProofingTransformTHR(
                GLOBAL_CONTEXT,
                lab.handle,
                lab_word,
                lab.handle,
                lab_word,
                proof.handle,
                icc_intent(intent),
                icc_intent(proofing_intent),
                flags_word | flags::NO_CACHE,
            )
        };
        if handle.is_null() {
            return Err(EngineError::BuildFailed(format!(
                "proofing transform refused: intent {intent}, proofing intent {proofing_intent}, flags {}",
                flags::describe(flags_word),
            )));
        }
        Ok(Box::new(LcmsTransform { handle }))
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

        unsafe {
            let profile = ffi::cmsCreateProfilePlaceholder(GLOBAL_CONTEXT);
            if profile.is_null() {
                return Err(EngineError::ExportFailed("profile allocation failed".into()));
            }
            // RAII guard so every early return below closes the handle.
            let guard = LcmsProfile { handle: profile };

            ffi::cmsSetProfileVersion(profile, request.version);
            ffi::cmsSetDeviceClass(profile, ffi::ProfileClassSignature::AbstractClass);
            ffi::cmsSetColorSpace(profile, ffi::ColorSpaceSignature::LabData);
            ffi::cmsSetPCS(profile, ffi::ColorSpaceSignature::LabData);
            ffi::cmsSetHeaderRenderingIntent(profile, ffi::Intent::Perceptual);

            let pipeline = ffi::cmsPipelineAlloc(GLOBAL_CONTEXT, 3, 3);
            if pipeline.is_null() {
                return Err(EngineError::ExportFailed("pipeline allocation failed".into()));
            }
            let stage = ffi::cmsStageAllocCLut16bit(
                GLOBAL_CONTEXT,
                request.grid_points,
                3,
                3,
                request.table.as_ptr(),
            );
            if stage.is_null()
                || ffi::cmsPipelineInsertStage(pipeline, ffi::StageLoc::AT_END, stage) == 0
            {
                ffi::cmsPipelineFree(pipeline);
                return Err(EngineError::ExportFailed("CLUT stage allocation failed".into()));
            }
            let wrote = ffi::cmsWriteTag(
                profile,
                ffi::TagSignature::AToB0Tag,
                pipeline as *const c_void,
            );
            ffi::cmsPipelineFree(pipeline);
            if wrote == 0 {
                return Err(EngineError::ExportFailed("AToB0 tag write failed".into()));
            }

            for (sig, text) in [
                (ffi::TagSignature::ProfileDescriptionTag, request.description),
                (ffi::TagSignature::CopyrightTag, request.copyright),
            ] {
                let mlu = ffi::cmsMLUalloc(GLOBAL_CONTEXT, 1);
                if mlu.is_null() {
                    return Err(EngineError::ExportFailed("text tag allocation failed".into()));
                }
                let text = std::ffi::CString::new(text.as_bytes())
                    .unwrap_or_else(|_| std::ffi::CString::default());
                let ok = ffi::cmsMLUsetASCII(mlu, LANG_EN, COUNTRY_US, text.as_ptr());
                let wrote = ok != 0 && ffi::cmsWriteTag(profile, sig, mlu as *const c_void) != 0;
                ffi::cmsMLUfree(mlu);
                if !wrote {
                    return Err(EngineError::ExportFailed("text tag write failed".into()));
                }
            }

            let bytes = save_to_mem(profile)?;
            drop(guard);
            debug!(
                grid = request.grid_points,
                len = bytes.len(),
                "assembled abstract profile"
            );
            Ok(bytes)
        }
    }

    fn device_link(
        &self,
        transform: &dyn EngineTransform,
        version: f64,
        flags_word: u32,
    ) -> EngineResult<Vec<u8>> {
        self.ensure_available()?;
        let transform = transform
            .as_any()
            .downcast_ref::<LcmsTransform>()
            .ok_or_else(|| {
                EngineError::ExportFailed("transform belongs to a different engine".into())
            })?;
        let handle = unsafe { ffi::cmsTransform2DeviceLink(transform.handle, version, flags_word) };
        if handle.is_null() {
            return Err(EngineError::ExportFailed(
                "device-link extraction refused".into(),
            ));
        }
        let guard = LcmsProfile { handle };
        let bytes = save_to_mem(guard.handle)?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn srgb_bytes() -> Vec<u8> {
        lcms2::Profile::new_srgb().icc().unwrap()
    }

    #[test]
    fn test_probe() {
        let engine = LcmsEngine::new();
        assert!(engine.is_available());
        assert!(engine.version() >= 2000);
        assert_eq!(engine.name(), "lcms2");
    }

    #[test]
    fn test_intent_codes_match_engine_enum() {
        assert_eq!(icc_intent(0) as u32, 0);
        assert_eq!(icc_intent(3) as u32, 3);
        // Black-preservation encodings pass through at their offsets.
        assert_eq!(icc_intent(11) as u32, 11);
        assert_eq!(icc_intent(14) as u32, 14);
    }

    #[test]
    fn test_open_and_inspect() {
        let engine = LcmsEngine::new();
        let profile = engine.open_profile(&srgb_bytes()).unwrap();
        assert_eq!(profile.color_space(), ColorSpace::Rgb);
        assert_eq!(profile.device_class(), Some(DeviceClass::Display));
        assert!(!profile.description().is_empty());
    }

    #[test]
    fn test_open_rejects_garbage() {
        let engine = LcmsEngine::new();
        assert!(engine.open_profile(&[0u8; 64]).is_err());
    }

    #[test]
    fn test_identity_transform() {
        let engine = LcmsEngine::new();
        let srgb = engine.open_profile(&srgb_bytes()).unwrap();
        let word = PixelLayout::RGB_8.encode();
        let transform = engine
            .create_transform(&TransformRequest {
                profiles: &[srgb.as_ref(), srgb.as_ref()],
                intents: &[0, 0],
                bpc: &[false, false],
                adaptation: &[1.0, 1.0],
                input_format: word,
                output_format: word,
                flags: 0,
            })
            .unwrap();

        let src = [128u8, 128, 128, 10, 20, 30];
        let mut dst = [0u8; 6];
        transform.run_bytes(&src, &mut dst, 2).unwrap();
        for (a, b) in src.iter().zip(dst.iter()) {
            assert!(a.abs_diff(*b) <= 1, "{a} vs {b}");
        }
    }

    #[test]
    fn test_proofing_roundtrip_runs() {
        let engine = LcmsEngine::new();
        let proof = engine.open_profile(&srgb_bytes()).unwrap();
        let roundtrip = engine
            .proofing_roundtrip(proof.as_ref(), 1, 1, flags::SOFT_PROOFING)
            .unwrap();
        let src = [[50.0f32, 0.0, 0.0]];
        let mut dst = [[0.0f32; 3]];
        roundtrip.run_lab(&src, &mut dst).unwrap();
        // Neutral mid gray survives a proof through sRGB.
        assert!((dst[0][0] - 50.0).abs() < 2.0);
    }

    #[test]
    fn test_assemble_abstract_parses() {
        let engine = LcmsEngine::new();
        let grid = 3u32;
        // Identity grid.
        let mut table = Vec::new();
        for r in 0..grid {
            for g in 0..grid {
                for b in 0..grid {
                    for v in [r, g, b] {
                        table.push((v * 65535 / (grid - 1)) as u16);
                    }
                }
            }
        }
        let bytes = engine
            .assemble_abstract(&AbstractRequest {
                table: &table,
                grid_points: grid,
                version: 4.2,
                description: "identity abstract",
                copyright: "no copyright; use freely",
            })
            .unwrap();
        let profile = cmlink_core::ColorProfile::from_bytes(bytes).unwrap();
        assert_eq!(profile.device_class(), DeviceClass::Abstract);
        assert_eq!(profile.color_space(), ColorSpace::Lab);
    }

    #[test]
    fn test_device_link_export() {
        let engine = LcmsEngine::new();
        let srgb = engine.open_profile(&srgb_bytes()).unwrap();
        let word = PixelLayout::RGB_8.encode();
        let transform = engine
            .create_transform(&TransformRequest {
                profiles: &[srgb.as_ref(), srgb.as_ref()],
                intents: &[0, 0],
                bpc: &[false, false],
                adaptation: &[1.0, 1.0],
                input_format: word,
                output_format: word,
                flags: flags::KEEP_SEQUENCE,
            })
            .unwrap();
        let bytes = engine
            .device_link(transform.as_ref(), 4.3, flags::KEEP_SEQUENCE)
            .unwrap();
        let profile = cmlink_core::ColorProfile::from_bytes(bytes).unwrap();
        assert!(profile.is_device_link());
    }
}
