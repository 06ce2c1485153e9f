// Copyright 2024 Adobe. All rights reserved.
// This file is licensed to you under the Apache License,
// Version 2.0 (http://www.apache.org/licenses/LICENSE-2.0)
// or the MIT license (http://opensource.org/licenses/MIT),
// at your option.

// Unless required by applicable law or agreed to in writing,
// this software is distributed on an "AS IS" BASIS, WITHOUT
// WARRANTIES OR REPRESENTATIONS OF ANY KIND, either express or
// implied. See the LICENSE-MIT and LICENSE-APACHE files for the
// specific language governing permissions and limitations under
// each license.

//! Permitted value ranges for segment fields.
//!
//! Most field ranges in ITU T.81 depend on the coding process (Tables B.2
//! through B.7 and B.11). Each [`Bounds`] descriptor records one inclusive
//! range per [`ModeClass`] plus an optional range that overrides them all
//! inside a hierarchical image.

use crate::{BoundsViolation, DataMode, Error, FrameContext};

/// Inclusive range of permitted values.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Range {
    /// Smallest permitted value.
    pub min: u32,

    /// Largest permitted value.
    pub max: u32,
}

impl Range {
    /// Returns `true` if `value` lies within this range.
    pub const fn contains(&self, value: u32) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Named field descriptor with mode-dependent ranges.
///
/// [`ModeClass`]: crate::ModeClass
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Bounds {
    /// Field name as used in ITU T.81.
    pub name: &'static str,

    /// Width of the field on disk in bits.
    pub bits: u8,

    /// Ranges for sequential, progressive, lossless, and unspecified frame
    /// modes, in that order.
    pub ranges: [Range; 4],

    /// Range that applies to every frame mode inside a hierarchical image.
    pub hierarchical: Option<Range>,
}

impl Bounds {
    /// Descriptor with one `(min, max)` pair per mode class.
    pub const fn new(name: &'static str, bits: u8, ranges: [(u32, u32); 4]) -> Self {
        Self {
            name,
            bits,
            ranges: [
                Range {
                    min: ranges[0].0,
                    max: ranges[0].1,
                },
                Range {
                    min: ranges[1].0,
                    max: ranges[1].1,
                },
                Range {
                    min: ranges[2].0,
                    max: ranges[2].1,
                },
                Range {
                    min: ranges[3].0,
                    max: ranges[3].1,
                },
            ],
            hierarchical: None,
        }
    }

    /// Descriptor whose range does not depend on the frame mode.
    pub const fn uniform(name: &'static str, bits: u8, min: u32, max: u32) -> Self {
        Self::new(name, bits, [(min, max); 4])
    }

    /// Same descriptor with a range for hierarchical images.
    pub const fn hierarchical(self, min: u32, max: u32) -> Self {
        Self {
            hierarchical: Some(Range { min, max }),
            ..self
        }
    }

    /// Return the range that applies in `context`.
    pub fn range(&self, context: FrameContext) -> Range {
        match self.hierarchical {
            Some(range) if context.hierarchical => range,
            _ => self.ranges[context.class().index()],
        }
    }

    /// Check `value` against the range for `context`.
    pub fn check(&self, value: u32, context: FrameContext) -> Result<(), BoundsViolation> {
        let range = self.range(context);
        if range.contains(value) {
            Ok(())
        } else {
            Err(BoundsViolation {
                field: self.name,
                value,
                min: range.min,
                max: range.max,
            })
        }
    }

    /// Check `value` and fail only if `data_mode` is strict.
    ///
    /// Field setters call this before they mutate anything.
    pub fn validate(
        &self,
        value: u32,
        context: FrameContext,
        data_mode: DataMode,
    ) -> Result<(), Error> {
        match self.check(value, context) {
            Err(violation) if data_mode.is_strict() => Err(violation.into()),
            _ => Ok(()),
        }
    }

    /// Check `value` and append any violation to `results`.
    pub fn accumulate(&self, value: u32, context: FrameContext, results: &mut Vec<Error>) {
        if let Err(violation) = self.check(value, context) {
            results.push(violation.into());
        }
    }
}

// Quantization tables (B.2.4.1).

/// Pq: quantization table element precision.
pub const QUANTIZATION_PRECISION: Bounds = Bounds::uniform("Pq", 4, 0, 1);

/// Tq: quantization table destination identifier.
pub const QUANTIZATION_TABLE_ID: Bounds = Bounds::uniform("Tq", 4, 0, 3);

/// Qk: quantization table element, 8-bit precision.
pub const QUANTIZATION_VALUE_8: Bounds = Bounds::uniform("Qk", 8, 1, 255);

/// Qk: quantization table element, 16-bit precision.
pub const QUANTIZATION_VALUE_16: Bounds = Bounds::uniform("Qk", 16, 1, 65535);

// Huffman tables (B.2.4.2).

/// Tc: Huffman table class. Lossless processes use DC tables only.
pub const HUFFMAN_CLASS: Bounds =
    Bounds::new("Tc", 4, [(0, 1), (0, 1), (0, 0), (0, 1)]).hierarchical(0, 1);

/// Th: Huffman table destination identifier.
pub const HUFFMAN_TABLE_ID: Bounds = Bounds::uniform("Th", 4, 0, 3);

/// Vij for DC tables: difference magnitude category.
pub const HUFFMAN_DC_VALUE: Bounds =
    Bounds::new("Vij", 8, [(0, 15), (0, 15), (0, 16), (0, 16)]).hierarchical(0, 16);

// Arithmetic conditioning (B.2.4.3).

/// Tc: arithmetic conditioning table class.
pub const ARITHMETIC_CLASS: Bounds =
    Bounds::new("Tc", 4, [(0, 1), (0, 1), (0, 0), (0, 1)]).hierarchical(0, 1);

/// Tb: arithmetic coding conditioning table destination identifier.
pub const ARITHMETIC_TABLE_ID: Bounds = Bounds::uniform("Tb", 4, 0, 3);

/// Cs for DC (and lossless) conditioning: packed `U|L` bounds.
pub const ARITHMETIC_DC_BOUND: Bounds = Bounds::uniform("U|L", 4, 0, 15);

/// Cs for AC conditioning: Kx.
pub const ARITHMETIC_AC_KX: Bounds = Bounds::uniform("Kx", 8, 1, 63);

// Frame header (B.2.2).

/// P: sample precision.
pub const SAMPLE_PRECISION: Bounds =
    Bounds::new("P", 8, [(8, 12), (8, 12), (2, 16), (2, 16)]).hierarchical(2, 16);

/// Y: number of lines.
pub const LINES: Bounds = Bounds::uniform("Y", 16, 0, 65535);

/// X: number of samples per line.
pub const SAMPLES_PER_LINE: Bounds = Bounds::uniform("X", 16, 1, 65535);

/// Nf: number of image components in frame.
pub const FRAME_COMPONENT_COUNT: Bounds =
    Bounds::new("Nf", 8, [(1, 255), (1, 4), (1, 255), (1, 255)]);

/// Ci: component identifier.
pub const COMPONENT_ID: Bounds = Bounds::uniform("Ci", 8, 0, 255);

/// Hi and Vi: sampling factors.
pub const SAMPLING_FACTOR: Bounds = Bounds::uniform("Hi|Vi", 4, 1, 4);

/// Tqi: quantization table destination selector.
pub const FRAME_QUANTIZATION_ID: Bounds =
    Bounds::new("Tqi", 8, [(0, 3), (0, 3), (0, 0), (0, 3)]).hierarchical(0, 3);

// Scan header (B.2.3).

/// Ns: number of image components in scan.
pub const SCAN_COMPONENT_COUNT: Bounds = Bounds::uniform("Ns", 8, 1, 4);

/// Tdj: DC entropy coding table destination selector.
pub const DC_TABLE_SELECTOR: Bounds = Bounds::uniform("Tdj", 4, 0, 3);

/// Taj: AC entropy coding table destination selector.
pub const AC_TABLE_SELECTOR: Bounds =
    Bounds::new("Taj", 4, [(0, 3), (0, 3), (0, 0), (0, 3)]).hierarchical(0, 3);

/// Ss: start of spectral selection, or predictor selection when lossless.
pub const SPECTRAL_START: Bounds =
    Bounds::new("Ss", 8, [(0, 0), (0, 63), (1, 7), (0, 63)]).hierarchical(0, 63);

/// Se: end of spectral selection.
pub const SPECTRAL_END: Bounds =
    Bounds::new("Se", 8, [(63, 63), (0, 63), (0, 0), (0, 63)]).hierarchical(0, 63);

/// Ah: successive approximation bit position high.
pub const APPROXIMATION_HIGH: Bounds =
    Bounds::new("Ah", 4, [(0, 0), (0, 13), (0, 0), (0, 13)]).hierarchical(0, 13);

/// Al: successive approximation bit position low, or point transform.
pub const APPROXIMATION_LOW: Bounds =
    Bounds::new("Al", 4, [(0, 0), (0, 13), (0, 15), (0, 15)]).hierarchical(0, 15);

// Other parameter segments (B.2.4.4, B.3.2, B.3.3).

/// Ri: restart interval.
pub const RESTART_INTERVAL: Bounds = Bounds::uniform("Ri", 16, 0, 65535);

/// NL: number of lines.
pub const LINE_COUNT: Bounds = Bounds::uniform("NL", 16, 1, 65535);

/// Eh and Ev: expand horizontally / vertically.
pub const EXPAND_FACTOR: Bounds = Bounds::uniform("Eh|Ev", 4, 0, 1);

// JFIF APP0.

/// Major version of the JFIF format.
pub const JFIF_MAJOR_VERSION: Bounds = Bounds::uniform("JFIF major version", 8, 1, 1);

/// Minor version of the JFIF format.
pub const JFIF_MINOR_VERSION: Bounds = Bounds::uniform("JFIF minor version", 8, 0, 2);

/// Density units: none, dots per inch, or dots per centimeter.
pub const JFIF_UNITS: Bounds = Bounds::uniform("JFIF units", 8, 0, 2);

/// Horizontal or vertical pixel density.
pub const JFIF_DENSITY: Bounds = Bounds::uniform("JFIF density", 16, 1, 65535);

/// Thumbnail width or height.
pub const THUMBNAIL_DIMENSION: Bounds = Bounds::uniform("thumbnail dimension", 8, 0, 255);

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::unwrap_used)]

    use pretty_assertions_sorted::assert_eq;

    use crate::{
        bounds::{self, Range},
        BoundsViolation, DataMode, Error, FrameContext, FrameMode,
    };

    fn ctx(frame_mode: FrameMode) -> FrameContext {
        FrameContext::new(Some(frame_mode))
    }

    #[test]
    fn range_by_class() {
        let ss = bounds::SPECTRAL_START;
        assert_eq!(ss.range(ctx(FrameMode::Baseline)), Range { min: 0, max: 0 });
        assert_eq!(
            ss.range(ctx(FrameMode::ProgressiveArithmetic)),
            Range { min: 0, max: 63 }
        );
        assert_eq!(ss.range(ctx(FrameMode::Lossless)), Range { min: 1, max: 7 });
        assert_eq!(
            ss.range(FrameContext::default()),
            Range { min: 0, max: 63 }
        );
    }

    #[test]
    fn hierarchical_override() {
        let p = bounds::SAMPLE_PRECISION;
        let baseline = ctx(FrameMode::Baseline);
        assert!(p.check(4, baseline).is_err());
        assert!(p.check(4, baseline.hierarchical()).is_ok());

        // Descriptors without a hierarchical range keep the class range.
        let nf = bounds::FRAME_COMPONENT_COUNT;
        let progressive = ctx(FrameMode::Progressive).hierarchical();
        assert!(nf.check(5, progressive).is_err());
    }

    #[test]
    fn validate_depends_on_data_mode() {
        let tq = bounds::QUANTIZATION_TABLE_ID;
        let context = FrameContext::default();

        assert_eq!(
            tq.validate(4, context, DataMode::Strict),
            Err(Error::BoundsViolation(BoundsViolation {
                field: "Tq",
                value: 4,
                min: 0,
                max: 3
            }))
        );
        assert_eq!(tq.validate(4, context, DataMode::Lax), Ok(()));
        assert_eq!(tq.validate(3, context, DataMode::Strict), Ok(()));
    }

    #[test]
    fn accumulate_never_fails() {
        let mut results = vec![];
        let context = ctx(FrameMode::Baseline);

        bounds::SPECTRAL_END.accumulate(63, context, &mut results);
        assert!(results.is_empty());

        bounds::SPECTRAL_END.accumulate(10, context, &mut results);
        bounds::APPROXIMATION_HIGH.accumulate(1, context, &mut results);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].to_string(), "Se = 10 is outside 63..=63");
    }

    #[test]
    fn lossless_tables() {
        let tc = bounds::HUFFMAN_CLASS;
        assert!(tc.check(1, ctx(FrameMode::Baseline)).is_ok());
        assert!(tc.check(1, ctx(FrameMode::Lossless)).is_err());
        assert!(tc.check(1, ctx(FrameMode::Lossless).hierarchical()).is_ok());

        let tq = bounds::FRAME_QUANTIZATION_ID;
        assert!(tq.check(0, ctx(FrameMode::LosslessArithmetic)).is_ok());
        assert!(tq.check(2, ctx(FrameMode::LosslessArithmetic)).is_err());
    }
}
