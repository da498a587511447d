//! ICC profile byte streams with parsed header attributes.

use crate::{ColorSpace, DeviceClass, Error, Result};
use std::sync::Arc;

/// Offset of the `acsp` magic in the ICC header.
const MAGIC_OFFSET: usize = 36;
/// Minimum byte length: 128-byte header plus the tag count word.
const MIN_PROFILE_LEN: usize = 132;

/// An immutable ICC profile: raw bytes plus the header attributes this
/// subsystem cares about.
///
/// The byte stream is owned behind an `Arc` so profiles can be shared
/// cheaply between the cache, chain builder, and serializer. Parsing
/// happens once, at construction; the color math inside the profile is
/// never interpreted here, only by the native engine.
///
/// # Example
///
/// ```rust,no_run
/// use cmlink_core::ColorProfile;
///
/// let data = std::fs::read("srgb.icc").unwrap();
/// let profile = ColorProfile::from_bytes(data).unwrap();
/// println!("{:?} {:?}", profile.color_space(), profile.device_class());
/// ```
#[derive(Clone)]
pub struct ColorProfile {
    bytes: Arc<[u8]>,
    device_class: DeviceClass,
    color_space: ColorSpace,
    pcs: ColorSpace,
    version: (u8, u8),
    hash: [u8; 16],
}

impl ColorProfile {
    /// Parses and validates an ICC byte stream.
    ///
    /// # Errors
    ///
    /// Fails when the stream is shorter than an ICC header, the `acsp`
    /// magic is missing, the declared size exceeds the provided bytes, or
    /// a header signature is unknown.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let bytes: Vec<u8> = bytes.into();
        if bytes.len() < MIN_PROFILE_LEN {
            return Err(Error::ProfileTooShort { len: bytes.len() });
        }
        if &bytes[MAGIC_OFFSET..MAGIC_OFFSET + 4] != b"acsp" {
            return Err(Error::BadProfileMagic);
        }
        let declared = read_u32(&bytes, 0) as usize;
        if declared < MIN_PROFILE_LEN || declared > bytes.len() {
            return Err(Error::ProfileSizeMismatch {
                declared,
                actual: bytes.len(),
            });
        }

        let device_class = DeviceClass::from_icc_signature(read_u32(&bytes, 12))?;
        let color_space = ColorSpace::from_icc_signature(read_u32(&bytes, 16))?;
        let pcs = ColorSpace::from_icc_signature(read_u32(&bytes, 20))?;
        let version = (bytes[8], bytes[9] >> 4);
        let hash = md5::compute(&bytes[..declared]).0;

        Ok(Self {
            bytes: bytes.into(),
            device_class,
            color_space,
            pcs,
            version,
            hash,
        })
    }

    /// The raw ICC byte stream.
    #[inline]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// MD5 digest of the byte stream; the content half of a cache identity.
    #[inline]
    pub fn content_hash(&self) -> [u8; 16] {
        self.hash
    }

    /// Device class from the header.
    #[inline]
    pub fn device_class(&self) -> DeviceClass {
        self.device_class
    }

    /// Data color space from the header.
    #[inline]
    pub fn color_space(&self) -> ColorSpace {
        self.color_space
    }

    /// Profile connection space from the header.
    #[inline]
    pub fn pcs(&self) -> ColorSpace {
        self.pcs
    }

    /// Profile version as (major, minor).
    #[inline]
    pub fn version(&self) -> (u8, u8) {
        self.version
    }

    /// Whether this is a device-link class profile.
    #[inline]
    pub fn is_device_link(&self) -> bool {
        self.device_class == DeviceClass::DeviceLink
    }

    /// Short identifier derived from the content hash, used in cache key
    /// texts and log lines.
    pub fn nickname(&self) -> String {
        self.hash[..4].iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Debug for ColorProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ColorProfile")
            .field("nickname", &self.nickname())
            .field("device_class", &self.device_class)
            .field("color_space", &self.color_space)
            .field("pcs", &self.pcs)
            .field("version", &self.version)
            .field("len", &self.bytes.len())
            .finish()
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}
