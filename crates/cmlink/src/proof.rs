//! Abstract proofing profile synthesis.
//!
//! A proofing or gamut-check request turns into an abstract Lab-to-Lab
//! profile spliced into the chain: the proof profile's behavior is sampled
//! by round-tripping a Lab grid through it, and the sampled grid becomes a
//! CLUT. Synthesis is O(grid cubed) and chains are rebuilt often with
//! identical proofing parameters, so results are always cached under an
//! identity derived from the proof profile and the intents/flags.

use crate::{CachedProfile, OpenError, ProfileCache, ProfileIdentity, SharedProfile, TransformOptions};
use cmlink_core::ColorProfile;
use cmlink_engine::{AbstractRequest, EngineTransform, flags};
use tracing::{debug, trace};

/// Grid nodes per axis of a synthesized abstract profile.
pub const PROOF_GRID_POINTS: u32 = 53;

/// Round-trip color distance above which a sample is out of gamut.
const GAMUT_THRESHOLD: f32 = 10.0;

/// Neutral gray replacing flagged out-of-gamut samples.
const GAMUT_MARK: [f32; 3] = [50.0, 0.0, 0.0];

/// Synthesizes (or fetches) the abstract profile for `proof` under
/// `options`, routed through the cache.
///
/// The forward leg of the round trip uses the proofing intent, the return
/// leg the rendering intent. With `options.gamut_check` set, grid samples
/// whose round trip drifts more than the gamut threshold are replaced by
/// neutral gray so out-of-gamut colors become visible.
pub fn synthesize(
    cache: &ProfileCache,
    proof: &ColorProfile,
    options: &TransformOptions,
) -> Result<SharedProfile, OpenError> {
    let identity = ProfileIdentity::with_params(proof, identity_params(proof, options));

    cache.acquire(identity.clone(), || {
        let engine = cache.engine();
        let proof_handle = cache.acquire_profile(proof)?;

        let mut roundtrip_flags = flags::SOFT_PROOFING | flags::KEEP_SEQUENCE;
        if options.gamut_check {
            roundtrip_flags |= flags::GAMUT_CHECK;
        }
        let roundtrip = engine.proofing_roundtrip(
            proof_handle.handle(),
            options.intent.code(),
            options.proofing_intent.code(),
            roundtrip_flags,
        )?;

        let sampled = sample_grid(roundtrip.as_ref(), options.gamut_check)?;
        debug!(
            proof = %proof.nickname(),
            flagged = sampled.flagged,
            gamut_check = options.gamut_check,
            "sampled proofing grid"
        );

        let description = format!(
            "proof of {} intent:{} intent_proof:{}",
            describe_proof(&proof_handle, proof),
            options.intent.code(),
            options.proofing_intent.code(),
        );
        let bytes = engine.assemble_abstract(&AbstractRequest {
            table: &sampled.table,
            grid_points: PROOF_GRID_POINTS,
            version: options.abstract_version(),
            description: &description,
            copyright: "no copyright; use freely",
        })?;

        let parsed = ColorProfile::from_bytes(bytes)?;
        let handle = engine.open_profile(parsed.bytes())?;
        Ok(CachedProfile::new(identity.clone(), handle, Some(parsed)))
    })
}

/// Parameter text of the cache identity, spelling out every field that
/// changes the synthesized result.
fn identity_params(proof: &ColorProfile, options: &TransformOptions) -> String {
    format!(
        "abstract proofing profile {} intent:{} intent_proof:{} flags|gmtCheck|softPrf:{}|{}|{}",
        proof.nickname(),
        options.intent.code(),
        options.proofing_intent.code(),
        options.flags(),
        options.gamut_check as u8,
        options.soft_proof as u8,
    )
}

fn describe_proof(handle: &SharedProfile, proof: &ColorProfile) -> String {
    let text = handle.handle().description();
    if text.is_empty() {
        proof.nickname()
    } else {
        text
    }
}

/// A sampled proofing grid: the 16-bit CLUT and how many nodes were
/// flagged out of gamut.
struct SampledGrid {
    table: Vec<u16>,
    flagged: usize,
}

/// Samples the Lab round trip on the fixed grid.
///
/// Grid coordinate t in [0,1] per axis maps to L = t*100 and
/// a/b = t*257 - 128; outputs re-encode through the inverse mapping into
/// 16-bit table entries, first axis varying slowest.
fn sample_grid(
    roundtrip: &dyn EngineTransform,
    gamut_check: bool,
) -> Result<SampledGrid, OpenError> {
    let n = PROOF_GRID_POINTS as usize;
    let step = 1.0 / (n - 1) as f32;

    let mut input = Vec::with_capacity(n * n * n);
    for l in 0..n {
        for a in 0..n {
            for b in 0..n {
                input.push([
                    l as f32 * step * 100.0,
                    a as f32 * step * 257.0 - 128.0,
                    b as f32 * step * 257.0 - 128.0,
                ]);
            }
        }
    }

    let mut output = vec![[0.0f32; 3]; input.len()];
    roundtrip.run_lab(&input, &mut output)?;

    let mut table = Vec::with_capacity(input.len() * 3);
    let mut flagged = 0usize;
    for (sample_in, sample_out) in input.iter().zip(output.iter()) {
        let mut lab = *sample_out;
        if gamut_check && delta_e(sample_in, sample_out) > GAMUT_THRESHOLD {
            lab = GAMUT_MARK;
            flagged += 1;
        }
        table.push(encode16(lab[0] / 100.0));
        table.push(encode16((lab[1] + 128.0) / 257.0));
        table.push(encode16((lab[2] + 128.0) / 257.0));
    }
    trace!(nodes = input.len(), flagged, "encoded proofing CLUT");

    Ok(SampledGrid { table, flagged })
}

/// CIE76 color difference.
#[inline]
fn delta_e(a: &[f32; 3], b: &[f32; 3]) -> f32 {
    let dl = a[0] - b[0];
    let da = a[1] - b[1];
    let db = a[2] - b[2];
    (dl * dl + da * da + db * db).sqrt()
}

#[inline]
fn encode16(t: f32) -> u16 {
    (t.clamp(0.0, 1.0) * 65535.0).round() as u16
}
