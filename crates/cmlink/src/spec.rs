//! Transform specification: the immutable input to chain building.

use crate::TransformOptions;
use cmlink_core::{ColorProfile, PixelLayout};

/// An ordered profile list plus conversion options and pixel layouts.
///
/// Built once with [`TransformSpec::builder`], then handed to
/// [`crate::build`]. A single-profile spec (device link) carries only the
/// input profile; a conversion carries input, optional effect profiles,
/// optional simulation (proofing) profiles, and an output profile.
///
/// # Example
///
/// ```rust,no_run
/// use cmlink::{TransformOptions, TransformSpec};
/// use cmlink_core::{ColorProfile, PixelLayout};
///
/// # let srgb = ColorProfile::from_bytes(vec![]).unwrap();
/// # let printer = ColorProfile::from_bytes(vec![]).unwrap();
/// let spec = TransformSpec::builder(srgb)
///     .output(printer)
///     .layouts(PixelLayout::RGB_8, PixelLayout::CMYK_8)
///     .options(TransformOptions::default())
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct TransformSpec {
    input: ColorProfile,
    effects: Vec<ColorProfile>,
    simulation: Vec<ColorProfile>,
    output: Option<ColorProfile>,
    options: TransformOptions,
    input_layout: PixelLayout,
    output_layout: PixelLayout,
}

impl TransformSpec {
    /// Starts a spec with the input (or device-link) profile.
    pub fn builder(input: ColorProfile) -> TransformSpecBuilder {
        TransformSpecBuilder {
            spec: Self {
                input,
                effects: Vec::new(),
                simulation: Vec::new(),
                output: None,
                options: TransformOptions::default(),
                input_layout: PixelLayout::RGB_8,
                output_layout: PixelLayout::RGB_8,
            },
        }
    }

    /// The conversion chain in order: input, effects, output.
    ///
    /// Simulation profiles are not part of the chain; the builder splices
    /// their synthesized abstract counterparts in when proofing is on.
    pub fn chain(&self) -> Vec<&ColorProfile> {
        let mut profiles = Vec::with_capacity(2 + self.effects.len());
        profiles.push(&self.input);
        profiles.extend(self.effects.iter());
        if let Some(output) = &self.output {
            profiles.push(output);
        }
        profiles
    }

    /// Simulation (proofing) profiles in order.
    pub fn simulation(&self) -> &[ColorProfile] {
        &self.simulation
    }

    /// Conversion options.
    pub fn options(&self) -> &TransformOptions {
        &self.options
    }

    /// Pixel layout the source buffers will use.
    pub fn input_layout(&self) -> PixelLayout {
        self.input_layout
    }

    /// Pixel layout the destination buffers will use.
    pub fn output_layout(&self) -> PixelLayout {
        self.output_layout
    }
}

/// Builder for [`TransformSpec`].
#[derive(Debug)]
pub struct TransformSpecBuilder {
    spec: TransformSpec,
}

impl TransformSpecBuilder {
    /// Appends an effect profile between input and output.
    pub fn effect(mut self, profile: ColorProfile) -> Self {
        self.spec.effects.push(profile);
        self
    }

    /// Appends a simulation profile for proofing.
    pub fn simulation(mut self, profile: ColorProfile) -> Self {
        self.spec.simulation.push(profile);
        self
    }

    /// Sets the output profile.
    pub fn output(mut self, profile: ColorProfile) -> Self {
        self.spec.output = Some(profile);
        self
    }

    /// Sets the conversion options.
    pub fn options(mut self, options: TransformOptions) -> Self {
        self.spec.options = options;
        self
    }

    /// Sets source and destination pixel layouts.
    pub fn layouts(mut self, input: PixelLayout, output: PixelLayout) -> Self {
        self.spec.input_layout = input;
        self.spec.output_layout = output;
        self
    }

    /// Finishes the spec.
    pub fn build(self) -> TransformSpec {
        self.spec
    }
}
