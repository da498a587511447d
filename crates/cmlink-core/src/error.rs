//! Error types for cmlink-core operations.
//!
//! One unified error enum covers the leaf concerns of this crate: pixel
//! layout encoding/decoding, ICC profile header parsing, and pixel buffer
//! validation.
//!
//! # Dependencies
//!
//! - [`thiserror`] - For derive macro error implementation
//!
//! # Used By
//!
//! - [`crate::layout::PixelLayout`] - Wire word codec
//! - [`crate::profile::ColorProfile`] - Header validation
//! - [`crate::buffer`] - Buffer size checks
//! - `cmlink` - Open/build/run errors wrap these

use thiserror::Error;

/// Result type alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors for pixel layout, profile header, and buffer validation.
#[derive(Debug, Error)]
pub enum Error {
    /// Channel count exceeds the 4-bit field of the layout word.
    ///
    /// The wire format supports at most 15 color channels.
    #[error("channel count {got} exceeds the supported maximum of 15")]
    TooManyChannels {
        /// Requested channel count
        got: u8,
    },

    /// Extra (non-color) channel count exceeds the 3-bit field.
    #[error("extra channel count {got} exceeds the supported maximum of 7")]
    TooManyExtra {
        /// Requested extra channel count
        got: u8,
    },

    /// Sample byte width is not one of 0 (double), 1, 2, or 4.
    #[error("invalid sample byte width {got} (expected 0, 1, 2 or 4)")]
    InvalidByteWidth {
        /// Encoded byte width
        got: u8,
    },

    /// Color-space code in a layout word is not recognized.
    #[error("unknown color-space code {code} in pixel layout word")]
    UnknownColorSpace {
        /// Raw 5-bit color-space code
        code: u8,
    },

    /// A four-byte ICC signature is not one this subsystem understands.
    #[error("unknown ICC signature 0x{sig:08x} ({})", fourcc(*sig))]
    UnknownSignature {
        /// Raw big-endian signature value
        sig: u32,
    },

    /// Profile byte stream is too short to hold an ICC header.
    #[error("profile data too short: {len} bytes, header needs 132")]
    ProfileTooShort {
        /// Actual byte length
        len: usize,
    },

    /// Profile header magic is not `acsp`.
    #[error("profile header magic mismatch (not an ICC profile)")]
    BadProfileMagic,

    /// Declared profile size disagrees with the byte stream.
    #[error("profile declares {declared} bytes but {actual} were provided")]
    ProfileSizeMismatch {
        /// Size field from the header
        declared: usize,
        /// Bytes actually available
        actual: usize,
    },

    /// Pixel buffer memory is smaller than its declared geometry.
    #[error("buffer of {got} bytes cannot hold {rows} rows of {row_bytes} bytes")]
    UndersizedBuffer {
        /// Rows declared
        rows: usize,
        /// Bytes per row implied by the layout
        row_bytes: usize,
        /// Bytes actually provided
        got: usize,
    },
}

impl Error {
    /// Returns `true` if this error came from the layout codec.
    #[inline]
    pub fn is_layout_error(&self) -> bool {
        matches!(
            self,
            Self::TooManyChannels { .. }
                | Self::TooManyExtra { .. }
                | Self::InvalidByteWidth { .. }
                | Self::UnknownColorSpace { .. }
        )
    }

    /// Returns `true` if this error came from profile header parsing.
    #[inline]
    pub fn is_profile_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownSignature { .. }
                | Self::ProfileTooShort { .. }
                | Self::BadProfileMagic
                | Self::ProfileSizeMismatch { .. }
        )
    }
}

/// Renders a big-endian signature as printable ASCII for messages.
fn fourcc(sig: u32) -> String {
    sig.to_be_bytes()
        .iter()
        .map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '?'
            }
        })
        .collect()
}
