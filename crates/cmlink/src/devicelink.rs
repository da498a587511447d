//! Device-link export and import.
//!
//! [`to_bytes`] serializes a compiled transform as an ICC device-link
//! profile carrying provenance: a `psid` tag identifying every chain
//! profile, an `Info` text tag with the caller's build description plus
//! the engine name and version, and a default copyright when the engine
//! emitted none. [`from_bytes`] and [`reload`] bring such a stream back
//! through the cache.

use crate::{
    BuildError, CompiledTransform, OpenError, ProfileCache, SharedProfile, TransformOptions,
    TransformSpec, chain, tags,
};
use cmlink_core::{ColorProfile, PixelLayout};
use cmlink_engine::flags;
use tracing::debug;

/// Copyright text written when the exported stream carries none.
pub const DEFAULT_COPYRIGHT: &str = "no copyright; use freely";

/// Serializes `transform` as a device-link ICC stream.
///
/// `info` is free-form text describing how the transform was set up; it
/// lands in the `Info` tag together with the engine name and version, so
/// a reloaded link can be traced back to its build.
pub fn to_bytes(
    cache: &ProfileCache,
    transform: &CompiledTransform,
    options: &TransformOptions,
    info: &str,
) -> Result<Vec<u8>, BuildError> {
    let engine = cache.engine();
    let link_flags = options.flags() | flags::KEEP_SEQUENCE;
    let bytes = engine.device_link(
        transform.transform(),
        options.device_link_version(),
        link_flags,
    )?;

    let mut extra: Vec<(u32, Vec<u8>)> = Vec::with_capacity(3);

    let sequence: Vec<([u8; 16], String)> = transform
        .chain_profiles()
        .iter()
        .map(|profile| {
            let hash = profile
                .source()
                .map(|source| source.content_hash())
                .unwrap_or_default();
            (hash, profile.handle().description())
        })
        .collect();
    if !sequence.is_empty() {
        extra.push((tags::TAG_PSID, tags::psid_tag(&sequence)));
    }

    let info_text = format!("{info}\nengine:{} version:{}", engine.name(), engine.version());
    extra.push((tags::TAG_INFO, tags::text_tag(&info_text)));

    if !tags::has_tag(&bytes, tags::TAG_COPYRIGHT) {
        extra.push((tags::TAG_COPYRIGHT, tags::text_tag(DEFAULT_COPYRIGHT)));
    }

    let out = tags::append_tags(&bytes, &extra)?;
    debug!(
        profiles = sequence.len(),
        size = out.len(),
        version = options.device_link_version(),
        "serialized device link"
    );
    Ok(out)
}

/// Reopens a serialized device link as a cached profile handle.
pub fn from_bytes(cache: &ProfileCache, bytes: Vec<u8>) -> Result<SharedProfile, OpenError> {
    let profile = ColorProfile::from_bytes(bytes)?;
    cache.acquire_profile(&profile)
}

/// Rebuilds a runnable transform from a serialized device link.
///
/// The link profile becomes a single-profile chain; `options` still
/// matter for flags, but intents baked into the link win over offset
/// encodings.
pub fn reload(
    cache: &ProfileCache,
    bytes: Vec<u8>,
    input_layout: PixelLayout,
    output_layout: PixelLayout,
    options: &TransformOptions,
) -> Result<CompiledTransform, BuildError> {
    let profile = ColorProfile::from_bytes(bytes)?;
    let spec = TransformSpec::builder(profile)
        .layouts(input_layout, output_layout)
        .options(options.clone())
        .build();
    chain::build(cache, &spec)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmlink_engine::{MockEngine, stub_profile_bytes};
    use std::sync::Arc;

    fn compiled(cache: &ProfileCache) -> CompiledTransform {
        let input =
            ColorProfile::from_bytes(stub_profile_bytes(b"mntr", b"RGB ")).unwrap();
        let output =
            ColorProfile::from_bytes(stub_profile_bytes(b"prtr", b"CMYK")).unwrap();
        let spec = TransformSpec::builder(input)
            .output(output)
            .layouts(PixelLayout::RGB_8, PixelLayout::CMYK_8)
            .build();
        chain::build(cache, &spec).unwrap()
    }

    #[test]
    fn test_export_carries_provenance() {
        let cache = ProfileCache::new(Arc::new(MockEngine::new()));
        let transform = compiled(&cache);
        let options = TransformOptions::default();

        let bytes = to_bytes(&cache, &transform, &options, "rgb to cmyk proof").unwrap();
        assert!(tags::has_tag(&bytes, tags::TAG_PSID));
        let info = tags::read_text_tag(&bytes, tags::TAG_INFO).unwrap();
        assert!(info.starts_with("rgb to cmyk proof"));
        assert!(info.contains("engine:mock"));
    }

    #[test]
    fn test_export_defaults_copyright() {
        let cache = ProfileCache::new(Arc::new(MockEngine::new()));
        let transform = compiled(&cache);
        let bytes =
            to_bytes(&cache, &transform, &TransformOptions::default(), "").unwrap();
        assert_eq!(
            tags::read_text_tag(&bytes, tags::TAG_COPYRIGHT).as_deref(),
            Some(DEFAULT_COPYRIGHT)
        );
    }

    #[test]
    fn test_from_bytes_goes_through_cache() {
        let engine = Arc::new(MockEngine::new());
        let cache = ProfileCache::new(engine.clone());
        let transform = compiled(&cache);
        let bytes =
            to_bytes(&cache, &transform, &TransformOptions::default(), "").unwrap();

        let opens_before = engine.opens();
        let a = from_bytes(&cache, bytes.clone()).unwrap();
        let b = from_bytes(&cache, bytes).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(engine.opens(), opens_before + 1);
        assert!(a.source().unwrap().is_device_link());
    }

    #[test]
    fn test_reload_builds_link_transform() {
        let engine = Arc::new(MockEngine::new());
        let cache = ProfileCache::new(engine.clone());
        let transform = compiled(&cache);
        let bytes =
            to_bytes(&cache, &transform, &TransformOptions::default(), "").unwrap();

        let reloaded = reload(
            &cache,
            bytes,
            PixelLayout::RGB_8,
            PixelLayout::CMYK_8,
            &TransformOptions::default(),
        )
        .unwrap();
        assert_eq!(reloaded.chain_profiles().len(), 1);
        assert_eq!(engine.build_log().last().unwrap().profiles, 1);
    }

    #[test]
    fn test_reload_rejects_garbage() {
        let cache = ProfileCache::new(Arc::new(MockEngine::new()));
        let result = reload(
            &cache,
            vec![0u8; 64],
            PixelLayout::RGB_8,
            PixelLayout::RGB_8,
            &TransformOptions::default(),
        );
        assert!(matches!(result, Err(BuildError::Layout(_))));
    }
}
