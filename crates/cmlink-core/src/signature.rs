//! ICC color-space and device-class signatures.
//!
//! Two alphabets exist for the same concepts: the four-byte big-endian
//! signatures stored in ICC profile headers, and the small numeric
//! color-space codes used inside pixel layout words. [`ColorSpace`] carries
//! the layout-word code and converts from the header signature;
//! [`DeviceClass`] only ever appears in headers.

use crate::{Error, Result};

/// Color space of a profile or pixel buffer.
///
/// The discriminant is the 5-bit code used in the pixel layout wire word.
/// `Any` (0) means "unspecified" and is what device-link transforms use for
/// their endpoints, since the link profile already pins both sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ColorSpace {
    /// Unspecified; accepted by any transform endpoint.
    #[default]
    Any = 0,
    /// Single-channel grayscale.
    Gray = 3,
    /// Red, green, blue.
    Rgb = 4,
    /// Cyan, magenta, yellow.
    Cmy = 5,
    /// Cyan, magenta, yellow, key.
    Cmyk = 6,
    /// Luma plus chroma difference channels.
    YCbCr = 7,
    /// CIE Yxy chromaticity.
    Yxy = 8,
    /// CIE 1931 XYZ.
    Xyz = 9,
    /// CIE L*a*b*.
    Lab = 10,
    /// CIE L*u*v*.
    Luv = 11,
    /// Hue, saturation, value.
    Hsv = 12,
    /// Hue, lightness, saturation.
    Hls = 13,
}

impl ColorSpace {
    /// Returns the 5-bit layout-word code.
    #[inline]
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Decodes a layout-word color-space code.
    pub fn from_code(code: u8) -> Result<Self> {
        Ok(match code {
            0 => Self::Any,
            3 => Self::Gray,
            4 => Self::Rgb,
            5 => Self::Cmy,
            6 => Self::Cmyk,
            7 => Self::YCbCr,
            8 => Self::Yxy,
            9 => Self::Xyz,
            10 => Self::Lab,
            11 => Self::Luv,
            12 => Self::Hsv,
            13 => Self::Hls,
            _ => return Err(Error::UnknownColorSpace { code }),
        })
    }

    /// Converts a four-byte ICC header signature.
    ///
    /// # Example
    ///
    /// ```rust
    /// use cmlink_core::ColorSpace;
    ///
    /// let cs = ColorSpace::from_icc_signature(u32::from_be_bytes(*b"RGB ")).unwrap();
    /// assert_eq!(cs, ColorSpace::Rgb);
    /// ```
    pub fn from_icc_signature(sig: u32) -> Result<Self> {
        Ok(match &sig.to_be_bytes() {
            b"GRAY" => Self::Gray,
            b"RGB " => Self::Rgb,
            b"CMY " => Self::Cmy,
            b"CMYK" => Self::Cmyk,
            b"YCbr" => Self::YCbCr,
            b"Yxy " => Self::Yxy,
            b"XYZ " => Self::Xyz,
            b"Lab " => Self::Lab,
            b"Luv " => Self::Luv,
            b"HSV " => Self::Hsv,
            b"HLS " => Self::Hls,
            _ => return Err(Error::UnknownSignature { sig }),
        })
    }

    /// Number of color channels this space carries.
    ///
    /// `Any` reports 3, matching how unspecified endpoints are treated.
    #[inline]
    pub fn channels(self) -> u8 {
        match self {
            Self::Gray => 1,
            Self::Cmyk => 4,
            _ => 3,
        }
    }
}

/// ICC profile device class from the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceClass {
    /// Input device (scanner, camera).
    Input,
    /// Display device (monitor).
    Display,
    /// Output device (printer).
    Output,
    /// Device link: a complete precomputed conversion.
    DeviceLink,
    /// Color space conversion profile.
    ColorSpace,
    /// Abstract transform profile (PCS to PCS).
    Abstract,
    /// Named color profile.
    NamedColor,
}

impl DeviceClass {
    /// Converts a four-byte ICC header signature.
    pub fn from_icc_signature(sig: u32) -> Result<Self> {
        Ok(match &sig.to_be_bytes() {
            b"scnr" => Self::Input,
            b"mntr" => Self::Display,
            b"prtr" => Self::Output,
            b"link" => Self::DeviceLink,
            b"spac" => Self::ColorSpace,
            b"abst" => Self::Abstract,
            b"nmcl" => Self::NamedColor,
            _ => return Err(Error::UnknownSignature { sig }),
        })
    }

    /// Returns the four-byte header signature.
    pub fn icc_signature(self) -> u32 {
        u32::from_be_bytes(match self {
            Self::Input => *b"scnr",
            Self::Display => *b"mntr",
            Self::Output => *b"prtr",
            Self::DeviceLink => *b"link",
            Self::ColorSpace => *b"spac",
            Self::Abstract => *b"abst",
            Self::NamedColor => *b"nmcl",
        })
    }
}
