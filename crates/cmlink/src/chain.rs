//! Transform chain construction.
//!
//! Classifies a [`TransformSpec`] into one of three build paths and
//! produces a [`CompiledTransform`]:
//!
//! 1. one profile, or a device-link lead profile: a single-profile build
//!    with the pixel color-space tags cleared, since the link already
//!    encodes both endpoint spaces;
//! 2. exactly two profiles and no proofing: the direct build;
//! 3. otherwise: one synthesized abstract profile per simulation profile,
//!    spliced immediately before the output profile, then an N-profile
//!    build.

use crate::{BuildError, ProfileCache, SharedProfile, TransformSpec, proof};
use cmlink_core::PixelLayout;
use cmlink_engine::{EngineTransform, TransformRequest, flags};
use tracing::debug;

/// A compiled conversion: the native transform plus the pixel layouts it
/// was built for and the profile handles that keep its chain alive.
pub struct CompiledTransform {
    transform: Box<dyn EngineTransform>,
    input_layout: PixelLayout,
    output_layout: PixelLayout,
    chain: Vec<SharedProfile>,
}

impl CompiledTransform {
    /// The native transform handle.
    pub fn transform(&self) -> &dyn EngineTransform {
        self.transform.as_ref()
    }

    /// Pixel layout of source buffers.
    pub fn input_layout(&self) -> PixelLayout {
        self.input_layout
    }

    /// Pixel layout of destination buffers.
    pub fn output_layout(&self) -> PixelLayout {
        self.output_layout
    }

    /// The resolved chain, in build order, abstract splices included.
    pub fn chain_profiles(&self) -> &[SharedProfile] {
        &self.chain
    }
}

impl std::fmt::Debug for CompiledTransform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompiledTransform")
            .field("input_layout", &self.input_layout.to_string())
            .field("output_layout", &self.output_layout.to_string())
            .field("chain_len", &self.chain.len())
            .finish_non_exhaustive()
    }
}

/// Compiles `spec` into a transform, resolving every profile through the
/// cache.
pub fn build(cache: &ProfileCache, spec: &TransformSpec) -> Result<CompiledTransform, BuildError> {
    let profiles = spec.chain();
    if profiles.is_empty() {
        return Err(BuildError::EmptyChain);
    }
    spec.input_layout().validate()?;
    spec.output_layout().validate()?;

    let mut resolved: Vec<SharedProfile> = Vec::with_capacity(profiles.len() + 1);
    for (index, profile) in profiles.iter().enumerate() {
        let shared = cache
            .acquire_profile(profile)
            .map_err(|source| BuildError::Profile { index, source })?;
        resolved.push(shared);
    }

    let options = spec.options();
    let mut flags_word = options.flags() | flags::KEEP_SEQUENCE;
    let mut intent = options.effective_intent();
    let mut input_word = spec.input_layout().encode();
    let mut output_word = spec.output_layout().encode();

    let link_path = resolved.len() == 1 || profiles[0].is_device_link();
    let direct_path = !link_path
        && resolved.len() == 2
        && (spec.simulation().is_empty() || !options.wants_proofing());

    if link_path {
        // The link profile pins both endpoint spaces itself.
        input_word = spec.input_layout().with_any_space().encode();
        output_word = spec.output_layout().with_any_space().encode();
        // Offset intents are meaningless for a prebuilt link.
        if intent > 3 {
            intent = 0;
        }
        resolved.truncate(1);
        debug!(intent, "building device-link transform");
    } else if direct_path {
        debug!(intent, "building direct two-profile transform");
    } else {
        // Simulation profiles only enter the chain when proofing is
        // actually requested; otherwise they ride along inert.
        if options.wants_proofing() {
            let mut abstracts = Vec::with_capacity(spec.simulation().len());
            for simulation in spec.simulation() {
                let abstract_profile =
                    proof::synthesize(cache, simulation, options).map_err(BuildError::Synthesis)?;
                abstracts.push(abstract_profile);
            }
            // Splice immediately before the output profile.
            let output = resolved.pop();
            resolved.extend(abstracts);
            resolved.extend(output);

            if options.gamut_check {
                flags_word |= flags::gridpoints(proof::PROOF_GRID_POINTS);
            }
        }
        debug!(
            profiles = resolved.len(),
            proofing = options.wants_proofing(),
            intent,
            "building multi-profile transform"
        );
    }

    let handles: Vec<&dyn cmlink_engine::EngineProfile> =
        resolved.iter().map(|p| p.handle()).collect();
    let n = handles.len();
    let request = TransformRequest {
        profiles: &handles,
        intents: &vec![intent; n],
        bpc: &vec![options.black_point_compensation; n],
        adaptation: &vec![options.adaptation_state; n],
        input_format: input_word,
        output_format: output_word,
        flags: flags_word,
    };
    let transform = cache.engine().create_transform(&request)?;

    Ok(CompiledTransform {
        transform,
        input_layout: spec.input_layout(),
        output_layout: spec.output_layout(),
        chain: resolved,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Intent, TransformOptions};
    use cmlink_core::{ColorProfile, ColorSpace};
    use cmlink_engine::{MockEngine, stub_profile_bytes};
    use std::sync::Arc;

    fn profile(class: &[u8; 4], space: &[u8; 4]) -> ColorProfile {
        ColorProfile::from_bytes(stub_profile_bytes(class, space)).unwrap()
    }

    fn rgb_spec(output: bool) -> TransformSpec {
        let mut builder = TransformSpec::builder(profile(b"mntr", b"RGB "))
            .layouts(PixelLayout::RGB_8, PixelLayout::RGB_8);
        if output {
            builder = builder.output(profile(b"mntr", b"RGB "));
        }
        builder.build()
    }

    #[test]
    fn test_link_path_clears_color_space() {
        let engine = Arc::new(MockEngine::new());
        let cache = ProfileCache::new(engine.clone());
        let spec = TransformSpec::builder(profile(b"link", b"RGB "))
            .layouts(PixelLayout::RGB_8, PixelLayout::CMYK_8)
            .build();

        let compiled = build(&cache, &spec).unwrap();
        let record = &engine.build_log()[0];
        assert_eq!(record.profiles, 1);
        let input = PixelLayout::decode(record.input_format).unwrap();
        let output = PixelLayout::decode(record.output_format).unwrap();
        assert_eq!(input.color_space, ColorSpace::Any);
        assert_eq!(output.color_space, ColorSpace::Any);
        // The recorded layouts keep the caller's declared spaces.
        assert_eq!(compiled.input_layout(), PixelLayout::RGB_8);
        assert_eq!(compiled.output_layout(), PixelLayout::CMYK_8);
    }

    #[test]
    fn test_link_path_drops_offset_intent() {
        let engine = Arc::new(MockEngine::new());
        let cache = ProfileCache::new(engine.clone());
        let spec = TransformSpec::builder(profile(b"link", b"CMYK"))
            .options(TransformOptions {
                black_preservation: crate::BlackPreservation::BlackOnly,
                ..Default::default()
            })
            .layouts(PixelLayout::CMYK_8, PixelLayout::CMYK_8)
            .build();

        build(&cache, &spec).unwrap();
        assert_eq!(engine.build_log()[0].intents, vec![0]);
    }

    #[test]
    fn test_direct_two_profile_path() {
        let engine = Arc::new(MockEngine::new());
        let cache = ProfileCache::new(engine.clone());
        let compiled = build(&cache, &rgb_spec(true)).unwrap();

        assert_eq!(engine.builds(), 1);
        let record = &engine.build_log()[0];
        assert_eq!(record.profiles, 2);
        assert_eq!(
            PixelLayout::decode(record.input_format).unwrap().color_space,
            ColorSpace::Rgb
        );
        assert_eq!(compiled.chain_profiles().len(), 2);
    }

    #[test]
    fn test_black_preservation_offsets() {
        let engine = Arc::new(MockEngine::new());
        let cache = ProfileCache::new(engine.clone());
        let spec = TransformSpec::builder(profile(b"prtr", b"CMYK"))
            .output(profile(b"prtr", b"CMYK"))
            .options(TransformOptions {
                intent: Intent::RelativeColorimetric,
                black_preservation: crate::BlackPreservation::BlackPlane,
                ..Default::default()
            })
            .layouts(PixelLayout::CMYK_8, PixelLayout::CMYK_8)
            .build();

        build(&cache, &spec).unwrap();
        assert_eq!(engine.build_log()[0].intents, vec![14, 14]);
    }

    #[test]
    fn test_proofing_splices_abstract() {
        let engine = Arc::new(MockEngine::new());
        let cache = ProfileCache::new(engine.clone());
        let spec = TransformSpec::builder(profile(b"mntr", b"RGB "))
            .simulation(profile(b"prtr", b"CMYK"))
            .output(profile(b"mntr", b"RGB "))
            .options(TransformOptions {
                soft_proof: true,
                gamut_check: true,
                ..Default::default()
            })
            .layouts(PixelLayout::RGB_8, PixelLayout::RGB_8)
            .build();

        let compiled = build(&cache, &spec).unwrap();
        let record = engine.build_log().last().cloned().unwrap();
        assert_eq!(record.profiles, 3, "input + abstract + output");
        assert_ne!(record.flags & flags::gridpoints(53), 0);

        // The splice sits immediately before the output profile.
        let chain = compiled.chain_profiles();
        assert_eq!(
            chain[1].handle().device_class(),
            Some(cmlink_core::DeviceClass::Abstract)
        );
    }

    #[test]
    fn test_simulation_ignored_without_proofing() {
        let engine = Arc::new(MockEngine::new());
        let cache = ProfileCache::new(engine.clone());
        let spec = TransformSpec::builder(profile(b"mntr", b"RGB "))
            .effect(profile(b"abst", b"Lab "))
            .simulation(profile(b"prtr", b"CMYK"))
            .output(profile(b"mntr", b"RGB "))
            .layouts(PixelLayout::RGB_8, PixelLayout::RGB_8)
            .build();

        let compiled = build(&cache, &spec).unwrap();
        // No proofing flags set, so no abstract profile is synthesized
        // and the chain is exactly input + effect + output.
        assert_eq!(engine.build_log()[0].profiles, 3);
        assert_eq!(compiled.chain_profiles().len(), 3);
        assert!(
            compiled
                .chain_profiles()
                .iter()
                .all(|p| p.identity().params().is_empty()),
            "no synthesized profile may enter an unproofed chain"
        );
    }

    #[test]
    fn test_two_profiles_with_simulation_but_no_proofing_stays_direct() {
        let engine = Arc::new(MockEngine::new());
        let cache = ProfileCache::new(engine.clone());
        let spec = TransformSpec::builder(profile(b"mntr", b"RGB "))
            .simulation(profile(b"prtr", b"CMYK"))
            .output(profile(b"mntr", b"RGB "))
            .layouts(PixelLayout::RGB_8, PixelLayout::RGB_8)
            .build();

        build(&cache, &spec).unwrap();
        assert_eq!(engine.build_log()[0].profiles, 2);
    }

    #[test]
    fn test_unresolved_profile_names_index() {
        let engine = Arc::new(MockEngine::new().with_failing_opens());
        let cache = ProfileCache::new(engine);
        let err = build(&cache, &rgb_spec(true)).unwrap_err();
        assert!(matches!(err, BuildError::Profile { index: 0, .. }));
    }
}
