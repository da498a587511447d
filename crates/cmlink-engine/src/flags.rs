//! Engine flag word.
//!
//! These values are part of the native engine's C ABI and pass through
//! this subsystem unchanged; they must match the engine build exactly.

/// Post-linearization curves around CLUT precalculation.
pub const CLUT_POST_LINEARIZATION: u32 = 0x0001;
/// Suppress the white-on-white fixup.
pub const NO_WHITE_ON_WHITE_FIXUP: u32 = 0x0004;
/// Pre-linearization curves around CLUT precalculation.
pub const CLUT_PRE_LINEARIZATION: u32 = 0x0010;
/// Disable the engine's one-pixel result cache. Required for transforms
/// shared across worker threads.
pub const NO_CACHE: u32 = 0x0040;
/// Keep the profile sequence description through device-link export.
pub const KEEP_SEQUENCE: u32 = 0x0080;
/// Skip CLUT precalculation entirely.
pub const NO_OPTIMIZE: u32 = 0x0100;
/// Precalculate with a high resolution grid.
pub const HIGH_RES_PRECALC: u32 = 0x0400;
/// Precalculate with a low resolution grid.
pub const LOW_RES_PRECALC: u32 = 0x0800;
/// Flag out-of-gamut colors during proofing.
pub const GAMUT_CHECK: u32 = 0x1000;
/// Black point compensation.
pub const BLACK_POINT_COMPENSATION: u32 = 0x2000;
/// Soft proofing through a simulation profile.
pub const SOFT_PROOFING: u32 = 0x4000;

/// Encodes a CLUT grid point count hint into the flag word.
#[inline]
pub const fn gridpoints(n: u32) -> u32 {
    (n & 0xFF) << 16
}

/// Renders set flags as text for log lines and error messages.
pub fn describe(flags: u32) -> String {
    let names = [
        (CLUT_POST_LINEARIZATION, "post-linearization"),
        (NO_WHITE_ON_WHITE_FIXUP, "no-white-fixup"),
        (CLUT_PRE_LINEARIZATION, "pre-linearization"),
        (NO_CACHE, "no-cache"),
        (KEEP_SEQUENCE, "keep-sequence"),
        (NO_OPTIMIZE, "no-optimize"),
        (HIGH_RES_PRECALC, "high-res"),
        (LOW_RES_PRECALC, "low-res"),
        (GAMUT_CHECK, "gamut-check"),
        (BLACK_POINT_COMPENSATION, "bpc"),
        (SOFT_PROOFING, "soft-proofing"),
    ];
    let mut parts: Vec<String> = names
        .iter()
        .filter(|(bit, _)| flags & bit != 0)
        .map(|(_, name)| (*name).to_string())
        .collect();
    let grid = (flags >> 16) & 0xFF;
    if grid != 0 {
        parts.push(format!("grid:{grid}"));
    }
    if parts.is_empty() {
        "none".into()
    } else {
        parts.join("|")
    }
}
