//! Pixel layout descriptor and its 32-bit wire word codec.
//!
//! The image pipeline boundary describes a pixel encoding as a single
//! bit-packed integer. This module is the only place that touches those
//! bits; everything else works with the named fields of [`PixelLayout`].
//!
//! Wire word bit layout:
//!
//! | bits  | field                                   |
//! |-------|-----------------------------------------|
//! | 0-2   | bytes per sample (0 = 8-byte double)    |
//! | 3-6   | color channel count                     |
//! | 7-9   | extra (non-color) channel count         |
//! | 10    | full channel order swap                 |
//! | 11    | 16-bit byte-order (endian) swap         |
//! | 12    | planar (vs interleaved)                 |
//! | 13    | flavor: minimum is white                |
//! | 14    | swap first channel to the end           |
//! | 16-20 | color-space code ([`ColorSpace`])       |
//! | 22    | floating point samples                  |
//!
//! # Example
//!
//! ```rust
//! use cmlink_core::PixelLayout;
//!
//! let word = PixelLayout::RGB_8.encode();
//! let layout = PixelLayout::decode(word).unwrap();
//! assert_eq!(layout, PixelLayout::RGB_8);
//! assert_eq!(layout.bytes_per_sample(), 1);
//! ```

use crate::{ColorSpace, Error, Result};

const BYTES_MASK: u32 = 0x7;
const CHANNELS_SHIFT: u32 = 3;
const CHANNELS_MASK: u32 = 0xF;
const EXTRA_SHIFT: u32 = 7;
const EXTRA_MASK: u32 = 0x7;
const DOSWAP_SHIFT: u32 = 10;
const ENDIAN16_SHIFT: u32 = 11;
const PLANAR_SHIFT: u32 = 12;
const FLAVOR_SHIFT: u32 = 13;
const SWAPFIRST_SHIFT: u32 = 14;
const COLORSPACE_SHIFT: u32 = 16;
const COLORSPACE_MASK: u32 = 0x1F;
const FLOAT_SHIFT: u32 = 22;

/// Pixel encoding of one buffer: channel topology, sample width, ordering.
///
/// A pure value type. Construct well-known encodings from the associated
/// constants, or any encoding with [`PixelLayout::new`] plus field updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelLayout {
    /// Color space of the color channels.
    pub color_space: ColorSpace,
    /// Number of color channels (1..=15).
    pub channels: u8,
    /// Number of extra channels such as alpha (0..=7).
    pub extra: u8,
    /// Bytes per sample: 1, 2, 4, or 0 meaning an 8-byte double.
    pub bytes: u8,
    /// Samples are floating point (half, float, or double).
    pub is_float: bool,
    /// Channel order is fully reversed (e.g. BGR).
    pub swap: bool,
    /// First channel is moved to the end (e.g. ARGB vs RGBA).
    pub swap_first: bool,
    /// 16-bit samples are byte swapped.
    pub endian16: bool,
    /// Channels are stored in separate planes rather than interleaved.
    pub planar: bool,
    /// Minimum sample value represents white (inverted flavor).
    pub min_is_white: bool,
}

impl PixelLayout {
    /// 8-bit grayscale.
    pub const GRAY_8: Self = Self::base(ColorSpace::Gray, 1, 1, false);
    /// 8-bit interleaved RGB.
    pub const RGB_8: Self = Self::base(ColorSpace::Rgb, 3, 1, false);
    /// 8-bit interleaved RGB with one alpha channel.
    pub const RGBA_8: Self = Self {
        extra: 1,
        ..Self::base(ColorSpace::Rgb, 3, 1, false)
    };
    /// 16-bit interleaved RGB.
    pub const RGB_16: Self = Self::base(ColorSpace::Rgb, 3, 2, false);
    /// 32-bit float interleaved RGB.
    pub const RGB_FLT: Self = Self::base(ColorSpace::Rgb, 3, 4, true);
    /// 64-bit double interleaved RGB.
    pub const RGB_DBL: Self = Self::base(ColorSpace::Rgb, 3, 0, true);
    /// 8-bit interleaved CMYK.
    pub const CMYK_8: Self = Self::base(ColorSpace::Cmyk, 4, 1, false);
    /// 32-bit float CIE L*a*b*.
    pub const LAB_FLT: Self = Self::base(ColorSpace::Lab, 3, 4, true);
    /// 64-bit double CIE L*a*b*.
    pub const LAB_DBL: Self = Self::base(ColorSpace::Lab, 3, 0, true);
    /// 32-bit float CIE XYZ.
    pub const XYZ_FLT: Self = Self::base(ColorSpace::Xyz, 3, 4, true);
    /// 64-bit double CIE XYZ.
    pub const XYZ_DBL: Self = Self::base(ColorSpace::Xyz, 3, 0, true);

    const fn base(color_space: ColorSpace, channels: u8, bytes: u8, is_float: bool) -> Self {
        Self {
            color_space,
            channels,
            extra: 0,
            bytes,
            is_float,
            swap: false,
            swap_first: false,
            endian16: false,
            planar: false,
            min_is_white: false,
        }
    }

    /// Creates an interleaved layout with no extra channels or flags.
    ///
    /// # Errors
    ///
    /// Returns an error for channel counts over 15 or byte widths outside
    /// {0, 1, 2, 4}.
    pub fn new(color_space: ColorSpace, channels: u8, bytes: u8, is_float: bool) -> Result<Self> {
        let layout = Self::base(color_space, channels, bytes, is_float);
        layout.validate()?;
        Ok(layout)
    }

    /// Checks field ranges against the wire format.
    pub fn validate(&self) -> Result<()> {
        if self.channels == 0 || self.channels > 15 {
            return Err(Error::TooManyChannels { got: self.channels });
        }
        if self.extra > 7 {
            return Err(Error::TooManyExtra { got: self.extra });
        }
        if !matches!(self.bytes, 0 | 1 | 2 | 4) {
            return Err(Error::InvalidByteWidth { got: self.bytes });
        }
        Ok(())
    }

    /// Packs this layout into the 32-bit wire word.
    pub fn encode(&self) -> u32 {
        (self.bytes as u32 & BYTES_MASK)
            | ((self.channels as u32 & CHANNELS_MASK) << CHANNELS_SHIFT)
            | ((self.extra as u32 & EXTRA_MASK) << EXTRA_SHIFT)
            | ((self.swap as u32) << DOSWAP_SHIFT)
            | ((self.endian16 as u32) << ENDIAN16_SHIFT)
            | ((self.planar as u32) << PLANAR_SHIFT)
            | ((self.min_is_white as u32) << FLAVOR_SHIFT)
            | ((self.swap_first as u32) << SWAPFIRST_SHIFT)
            | ((self.color_space.code() as u32) << COLORSPACE_SHIFT)
            | ((self.is_float as u32) << FLOAT_SHIFT)
    }

    /// Unpacks a 32-bit wire word.
    ///
    /// # Errors
    ///
    /// Rejects zero channel counts, invalid byte widths, and unknown
    /// color-space codes.
    pub fn decode(word: u32) -> Result<Self> {
        let layout = Self {
            color_space: ColorSpace::from_code(
                ((word >> COLORSPACE_SHIFT) & COLORSPACE_MASK) as u8,
            )?,
            channels: ((word >> CHANNELS_SHIFT) & CHANNELS_MASK) as u8,
            extra: ((word >> EXTRA_SHIFT) & EXTRA_MASK) as u8,
            bytes: (word & BYTES_MASK) as u8,
            is_float: (word >> FLOAT_SHIFT) & 1 != 0,
            swap: (word >> DOSWAP_SHIFT) & 1 != 0,
            swap_first: (word >> SWAPFIRST_SHIFT) & 1 != 0,
            endian16: (word >> ENDIAN16_SHIFT) & 1 != 0,
            planar: (word >> PLANAR_SHIFT) & 1 != 0,
            min_is_white: (word >> FLAVOR_SHIFT) & 1 != 0,
        };
        layout.validate()?;
        Ok(layout)
    }

    /// Returns a copy with the color-space tag cleared to [`ColorSpace::Any`].
    ///
    /// Device-link transforms use this: the link profile already encodes
    /// both endpoint spaces, so the pixel words must not redeclare them.
    pub fn with_any_space(mut self) -> Self {
        self.color_space = ColorSpace::Any;
        self
    }

    /// Bytes occupied by one sample (0 maps to 8).
    #[inline]
    pub fn bytes_per_sample(&self) -> usize {
        if self.bytes == 0 { 8 } else { self.bytes as usize }
    }

    /// Total channels per pixel, color plus extra.
    #[inline]
    pub fn total_channels(&self) -> usize {
        self.channels as usize + self.extra as usize
    }

    /// Bytes occupied by one pixel.
    #[inline]
    pub fn bytes_per_pixel(&self) -> usize {
        self.bytes_per_sample() * self.total_channels()
    }
}

impl std::fmt::Display for PixelLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let width = match (self.bytes, self.is_float) {
            (0, _) => "f64",
            (4, true) => "f32",
            (2, true) => "f16",
            (1, _) => "u8",
            (2, false) => "u16",
            (4, false) => "u32",
            _ => "?",
        };
        write!(f, "{:?} {}ch", self.color_space, self.channels)?;
        if self.extra > 0 {
            write!(f, "+{}", self.extra)?;
        }
        write!(f, " {}", width)?;
        if self.planar {
            write!(f, " planar")?;
        }
        if self.swap {
            write!(f, " swapped")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Reference words from the engine's TYPE_* table.
    const TYPE_RGB_8: u32 = 262169;
    const TYPE_RGBA_8: u32 = 262297;
    const TYPE_CMYK_8: u32 = 393249;
    const TYPE_XYZ_DBL: u32 = 4784152;
    const TYPE_LAB_FLT: u32 = 4849692;

    #[test]
    fn test_known_words() {
        assert_eq!(PixelLayout::RGB_8.encode(), TYPE_RGB_8);
        assert_eq!(PixelLayout::RGBA_8.encode(), TYPE_RGBA_8);
        assert_eq!(PixelLayout::CMYK_8.encode(), TYPE_CMYK_8);
        assert_eq!(PixelLayout::XYZ_DBL.encode(), TYPE_XYZ_DBL);
        assert_eq!(PixelLayout::LAB_FLT.encode(), TYPE_LAB_FLT);
    }

    #[test]
    fn test_round_trip() {
        for layout in [
            PixelLayout::GRAY_8,
            PixelLayout::RGB_8,
            PixelLayout::RGBA_8,
            PixelLayout::RGB_16,
            PixelLayout::RGB_FLT,
            PixelLayout::RGB_DBL,
            PixelLayout::CMYK_8,
            PixelLayout::LAB_FLT,
            PixelLayout::XYZ_DBL,
        ] {
            assert_eq!(PixelLayout::decode(layout.encode()).unwrap(), layout);
        }
    }

    #[test]
    fn test_flags_round_trip() {
        let mut layout = PixelLayout::RGB_16;
        layout.swap = true;
        layout.endian16 = true;
        layout.planar = true;
        let decoded = PixelLayout::decode(layout.encode()).unwrap();
        assert!(decoded.swap);
        assert!(decoded.endian16);
        assert!(decoded.planar);
        assert!(!decoded.swap_first);
    }

    #[test]
    fn test_rejects_malformed() {
        // zero channels
        assert!(PixelLayout::decode(1).is_err());
        // byte width 3
        assert!(PixelLayout::decode(TYPE_RGB_8 & !0x7 | 3).is_err());
        // unknown color space code 2
        assert!(PixelLayout::decode((2 << 16) | (3 << 3) | 1).is_err());
        // channels over 15 via constructor
        assert!(PixelLayout::new(ColorSpace::Rgb, 16, 1, false).is_err());
    }

    #[test]
    fn test_helpers() {
        assert_eq!(PixelLayout::XYZ_DBL.bytes_per_sample(), 8);
        assert_eq!(PixelLayout::RGBA_8.total_channels(), 4);
        assert_eq!(PixelLayout::RGB_16.bytes_per_pixel(), 6);
        assert_eq!(
            PixelLayout::RGB_8.with_any_space().color_space,
            ColorSpace::Any
        );
    }

    #[test]
    fn test_display() {
        let s = PixelLayout::RGBA_8.to_string();
        assert!(s.contains("Rgb"));
        assert!(s.contains("3ch+1"));
    }
}
