//! Conversion options and their engine flag word.

use cmlink_engine::flags;
use serde::{Deserialize, Serialize};

/// Rendering intent for out-of-gamut color mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Intent {
    /// Compress the source gamut to fit the destination.
    #[default]
    Perceptual,
    /// Clip out-of-gamut colors, keep in-gamut colors exact.
    RelativeColorimetric,
    /// Favor saturation over accuracy.
    Saturation,
    /// Relative colorimetric without white point adaptation.
    AbsoluteColorimetric,
}

impl Intent {
    /// The engine's numeric intent code.
    #[inline]
    pub fn code(self) -> u32 {
        match self {
            Self::Perceptual => 0,
            Self::RelativeColorimetric => 1,
            Self::Saturation => 2,
            Self::AbsoluteColorimetric => 3,
        }
    }
}

/// CMYK-to-CMYK black channel preservation strategy.
///
/// The non-zero variants select engine-specific intent encodings by
/// offsetting the rendering intent code; the offsets are part of the
/// engine ABI and must not be altered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlackPreservation {
    /// No preservation.
    #[default]
    Off,
    /// Preserve the black channel only.
    BlackOnly,
    /// Preserve the whole black plane.
    BlackPlane,
}

impl BlackPreservation {
    /// Intent code offset selecting this strategy.
    #[inline]
    pub fn intent_offset(self) -> u32 {
        match self {
            Self::Off => 0,
            Self::BlackOnly => 10,
            Self::BlackPlane => 13,
        }
    }
}

/// Speed/quality trade-off for transform precalculation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Precalculation {
    /// Engine default grid.
    #[default]
    Normal,
    /// No precalculation, highest fidelity, slowest per pixel.
    Disabled,
    /// High resolution grid.
    HighRes,
    /// Low resolution grid.
    LowRes,
}

/// Numeric and boolean knobs of one conversion, serializable so callers
/// can persist a conversion setup alongside their documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformOptions {
    /// Rendering intent for the main chain.
    pub intent: Intent,
    /// Intent for the forward leg of proofing simulation.
    pub proofing_intent: Intent,
    /// Black point compensation.
    pub black_point_compensation: bool,
    /// CMYK black preservation strategy.
    pub black_preservation: BlackPreservation,
    /// Flag out-of-gamut colors through the proofing profile.
    pub gamut_check: bool,
    /// Simulate the proofing device in the output.
    pub soft_proof: bool,
    /// Suppress the engine's white-on-white fixup.
    pub no_white_on_white_fixup: bool,
    /// Precalculation trade-off.
    pub precalculation: Precalculation,
    /// Wrap precalculated CLUTs in linearization curves.
    pub curve_linearization: bool,
    /// Observer adaptation state, 0.0..=1.0.
    pub adaptation_state: f64,
    /// Emit ICC version 2 material instead of version 4.
    pub icc_version_2: bool,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            intent: Intent::Perceptual,
            proofing_intent: Intent::RelativeColorimetric,
            black_point_compensation: false,
            black_preservation: BlackPreservation::Off,
            gamut_check: false,
            soft_proof: false,
            // Upstream behavior: the fixup is suppressed unless asked for.
            no_white_on_white_fixup: true,
            precalculation: Precalculation::Normal,
            curve_linearization: false,
            adaptation_state: 1.0,
            icc_version_2: false,
        }
    }
}

impl TransformOptions {
    /// Rendering intent code including the black preservation offset.
    ///
    /// The offset encodings (+10, +13) signal the engine's preservation
    /// strategies and pass through bit-for-bit.
    #[inline]
    pub fn effective_intent(&self) -> u32 {
        self.intent.code() + self.black_preservation.intent_offset()
    }

    /// Whether proofing behavior (simulation or gamut check) is requested.
    #[inline]
    pub fn wants_proofing(&self) -> bool {
        self.soft_proof || self.gamut_check
    }

    /// Engine flag word derived from the boolean and enum knobs.
    pub fn flags(&self) -> u32 {
        let mut word = 0;
        if self.black_point_compensation {
            word |= flags::BLACK_POINT_COMPENSATION;
        }
        if self.gamut_check {
            word |= flags::GAMUT_CHECK;
        }
        if self.soft_proof {
            word |= flags::SOFT_PROOFING;
        }
        if self.no_white_on_white_fixup {
            word |= flags::NO_WHITE_ON_WHITE_FIXUP;
        }
        word |= match self.precalculation {
            Precalculation::Normal => 0,
            Precalculation::Disabled => flags::NO_OPTIMIZE,
            Precalculation::HighRes => flags::HIGH_RES_PRECALC,
            Precalculation::LowRes => flags::LOW_RES_PRECALC,
        };
        if self.curve_linearization {
            word |= flags::CLUT_PRE_LINEARIZATION | flags::CLUT_POST_LINEARIZATION;
        }
        word
    }

    /// ICC version for device-link export.
    #[inline]
    pub fn device_link_version(&self) -> f64 {
        if self.icc_version_2 { 2.4 } else { 4.3 }
    }

    /// ICC version for synthesized abstract profiles.
    #[inline]
    pub fn abstract_version(&self) -> f64 {
        if self.icc_version_2 { 2.4 } else { 4.2 }
    }
}
