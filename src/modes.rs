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

use crate::{Item, MarkerCode};

/// The coding process introduced by a start-of-frame marker.
///
/// There is exactly one frame mode per SOF code (Table B.1 of ITU T.81).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FrameMode {
    /// SOF0: baseline DCT.
    Baseline,
    /// SOF1: extended sequential DCT, Huffman coding.
    ExtendedSequential,
    /// SOF2: progressive DCT, Huffman coding.
    Progressive,
    /// SOF3: lossless, Huffman coding.
    Lossless,
    /// SOF5: differential sequential DCT, Huffman coding.
    DifferentialSequential,
    /// SOF6: differential progressive DCT, Huffman coding.
    DifferentialProgressive,
    /// SOF7: differential lossless, Huffman coding.
    DifferentialLossless,
    /// SOF9: extended sequential DCT, arithmetic coding.
    ExtendedSequentialArithmetic,
    /// SOF10: progressive DCT, arithmetic coding.
    ProgressiveArithmetic,
    /// SOF11: lossless, arithmetic coding.
    LosslessArithmetic,
    /// SOF13: differential sequential DCT, arithmetic coding.
    DifferentialSequentialArithmetic,
    /// SOF14: differential progressive DCT, arithmetic coding.
    DifferentialProgressiveArithmetic,
    /// SOF15: differential lossless, arithmetic coding.
    DifferentialLosslessArithmetic,
}

impl FrameMode {
    /// Derive the frame mode from an SOF marker code.
    ///
    /// Returns `None` for any code outside the SOF family.
    pub fn from_code(code: MarkerCode) -> Option<Self> {
        Some(match code.0 {
            0xC0 => Self::Baseline,
            0xC1 => Self::ExtendedSequential,
            0xC2 => Self::Progressive,
            0xC3 => Self::Lossless,
            0xC5 => Self::DifferentialSequential,
            0xC6 => Self::DifferentialProgressive,
            0xC7 => Self::DifferentialLossless,
            0xC9 => Self::ExtendedSequentialArithmetic,
            0xCA => Self::ProgressiveArithmetic,
            0xCB => Self::LosslessArithmetic,
            0xCD => Self::DifferentialSequentialArithmetic,
            0xCE => Self::DifferentialProgressiveArithmetic,
            0xCF => Self::DifferentialLosslessArithmetic,
            _ => return None,
        })
    }

    /// Return the SOF marker code for this frame mode.
    pub fn code(self) -> MarkerCode {
        MarkerCode(match self {
            Self::Baseline => 0xC0,
            Self::ExtendedSequential => 0xC1,
            Self::Progressive => 0xC2,
            Self::Lossless => 0xC3,
            Self::DifferentialSequential => 0xC5,
            Self::DifferentialProgressive => 0xC6,
            Self::DifferentialLossless => 0xC7,
            Self::ExtendedSequentialArithmetic => 0xC9,
            Self::ProgressiveArithmetic => 0xCA,
            Self::LosslessArithmetic => 0xCB,
            Self::DifferentialSequentialArithmetic => 0xCD,
            Self::DifferentialProgressiveArithmetic => 0xCE,
            Self::DifferentialLosslessArithmetic => 0xCF,
        })
    }

    /// Return the coarse class used to look up field bounds.
    pub fn class(self) -> ModeClass {
        match self {
            Self::Baseline
            | Self::ExtendedSequential
            | Self::DifferentialSequential
            | Self::ExtendedSequentialArithmetic
            | Self::DifferentialSequentialArithmetic => ModeClass::Sequential,

            Self::Progressive
            | Self::DifferentialProgressive
            | Self::ProgressiveArithmetic
            | Self::DifferentialProgressiveArithmetic => ModeClass::Progressive,

            Self::Lossless
            | Self::DifferentialLossless
            | Self::LosslessArithmetic
            | Self::DifferentialLosslessArithmetic => ModeClass::Lossless,
        }
    }

    /// Returns `true` for the differential (hierarchical) frame modes.
    pub fn is_differential(self) -> bool {
        matches!(self.code().0, 0xC5..=0xC7 | 0xCD..=0xCF)
    }

    /// Returns `true` for the arithmetic-coded frame modes.
    pub fn is_arithmetic(self) -> bool {
        self.code().0 >= 0xC9
    }
}

/// Coarse grouping of frame modes used as the index into a bounds table.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ModeClass {
    /// Baseline and extended sequential DCT.
    Sequential,
    /// Progressive DCT.
    Progressive,
    /// Lossless.
    Lossless,
    /// No frame mode is known yet.
    Unspecified,
}

impl ModeClass {
    /// Return the class for an optional frame mode.
    pub fn of(frame_mode: Option<FrameMode>) -> Self {
        frame_mode.map_or(Self::Unspecified, FrameMode::class)
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Self::Sequential => 0,
            Self::Progressive => 1,
            Self::Lossless => 2,
            Self::Unspecified => 3,
        }
    }
}

/// Validation regime.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum DataMode {
    /// Reject any violation as soon as it is found.
    #[default]
    Strict,

    /// Record violations as problems, keep going, and preserve any bytes
    /// that don't fit the field model so the input can be re-written
    /// exactly.
    Lax,
}

impl DataMode {
    /// Returns `true` for [`DataMode::Strict`].
    pub fn is_strict(self) -> bool {
        self == Self::Strict
    }
}

/// The interpretive modes in effect for a single item.
///
/// Items that belong to a [`Document`] have their context derived by the
/// document; it is recomputed after every structural edit.
///
/// [`Document`]: crate::Document
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub struct FrameContext {
    /// Frame mode of the frame this item belongs to, if known.
    pub frame_mode: Option<FrameMode>,

    /// True if the item is part of a hierarchical (DHP) image.
    pub hierarchical: bool,
}

impl FrameContext {
    /// Context with the given frame mode, not hierarchical.
    pub fn new(frame_mode: Option<FrameMode>) -> Self {
        Self {
            frame_mode,
            hierarchical: false,
        }
    }

    /// Same context with the hierarchical flag set.
    pub fn hierarchical(self) -> Self {
        Self {
            hierarchical: true,
            ..self
        }
    }

    /// Coarse class of the frame mode.
    pub fn class(self) -> ModeClass {
        ModeClass::of(self.frame_mode)
    }
}

/// Derive the frame context of every item from the item sequence.
///
/// * A DHP segment switches hierarchical mode on for every item from the
///   start of the list up to and including itself. Items after it keep
///   the default.
/// * An SOF segment sets the frame mode for every item since the last
///   entropy-coded data (or the start) up to and including itself.
/// * Every item then receives the current pair.
///
/// Running this twice over an unchanged list yields the same result.
pub(crate) fn propagate(items: &mut [Item], defaults: FrameContext) {
    let mut frame_mode = defaults.frame_mode;
    let hierarchical = defaults.hierarchical;
    let mut last_entropy: Option<usize> = None;

    for index in 0..items.len() {
        let dhp = items[index].is_dhp();
        if dhp {
            for item in &mut items[..=index] {
                item.context_mut().hierarchical = true;
            }
        }

        if let Some(mode) = items[index].introduced_frame_mode() {
            frame_mode = Some(mode);
            let first = last_entropy.map_or(0, |i| i + 1);
            for item in &mut items[first..=index] {
                item.context_mut().frame_mode = frame_mode;
            }
        }

        items[index].set_context(FrameContext {
            frame_mode,
            hierarchical: hierarchical || dhp,
        });

        if items[index].is_entropy_data() {
            last_entropy = Some(index);
        }
    }
}
