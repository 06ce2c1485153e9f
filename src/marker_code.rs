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

use std::fmt::{Debug, Display, Formatter};

/// The second byte of a JPEG marker.
///
/// Every marker in a JPEG stream is encoded as `0xFF` followed by a single
/// code byte that is neither `0x00` nor `0xFF`. This crate refers to markers
/// by that code byte alone (see Table B.1 of ITU T.81).
#[derive(Clone, Copy, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct MarkerCode(pub u8);

impl MarkerCode {
    /// Temporary private use in arithmetic coding.
    pub const TEM: Self = Self(0x01);

    /// Baseline DCT.
    pub const SOF0: Self = Self(0xC0);
    /// Extended sequential DCT, Huffman coding.
    pub const SOF1: Self = Self(0xC1);
    /// Progressive DCT, Huffman coding.
    pub const SOF2: Self = Self(0xC2);
    /// Lossless (sequential), Huffman coding.
    pub const SOF3: Self = Self(0xC3);
    /// Define Huffman table(s).
    pub const DHT: Self = Self(0xC4);
    /// Differential sequential DCT, Huffman coding.
    pub const SOF5: Self = Self(0xC5);
    /// Differential progressive DCT, Huffman coding.
    pub const SOF6: Self = Self(0xC6);
    /// Differential lossless (sequential), Huffman coding.
    pub const SOF7: Self = Self(0xC7);
    /// Reserved for JPEG extensions.
    pub const JPG: Self = Self(0xC8);
    /// Extended sequential DCT, arithmetic coding.
    pub const SOF9: Self = Self(0xC9);
    /// Progressive DCT, arithmetic coding.
    pub const SOF10: Self = Self(0xCA);
    /// Lossless (sequential), arithmetic coding.
    pub const SOF11: Self = Self(0xCB);
    /// Define arithmetic coding conditioning(s).
    pub const DAC: Self = Self(0xCC);
    /// Differential sequential DCT, arithmetic coding.
    pub const SOF13: Self = Self(0xCD);
    /// Differential progressive DCT, arithmetic coding.
    pub const SOF14: Self = Self(0xCE);
    /// Differential lossless (sequential), arithmetic coding.
    pub const SOF15: Self = Self(0xCF);

    /// Restart with modulo 8 count 0.
    pub const RST0: Self = Self(0xD0);
    /// Restart with modulo 8 count 7.
    pub const RST7: Self = Self(0xD7);

    /// Start of image.
    pub const SOI: Self = Self(0xD8);
    /// End of image.
    pub const EOI: Self = Self(0xD9);
    /// Start of scan.
    pub const SOS: Self = Self(0xDA);
    /// Define quantization table(s).
    pub const DQT: Self = Self(0xDB);
    /// Define number of lines.
    pub const DNL: Self = Self(0xDC);
    /// Define restart interval.
    pub const DRI: Self = Self(0xDD);
    /// Define hierarchical progression.
    pub const DHP: Self = Self(0xDE);
    /// Expand reference component(s).
    pub const EXP: Self = Self(0xDF);

    /// First application segment (JFIF, JFXX).
    pub const APP0: Self = Self(0xE0);
    /// Last application segment.
    pub const APP15: Self = Self(0xEF);

    /// First reserved JPEG extension.
    pub const JPG0: Self = Self(0xF0);
    /// Last reserved JPEG extension.
    pub const JPG13: Self = Self(0xFD);

    /// Comment.
    pub const COM: Self = Self(0xFE);

    /// Return the code for restart marker `RSTn`; `n` is taken modulo 8.
    pub const fn rst(n: u8) -> Self {
        Self(0xD0 | (n & 0x07))
    }

    /// Return the code for application segment `APPn`; `n` is taken
    /// modulo 16.
    pub const fn app(n: u8) -> Self {
        Self(0xE0 | (n & 0x0F))
    }

    /// Returns `true` if this marker is followed by a 2-byte length and a
    /// payload.
    ///
    /// Only SOI, EOI, TEM, and the eight restart markers stand alone.
    pub const fn has_length(self) -> bool {
        !matches!(self.0, 0x01 | 0xD0..=0xD9)
    }

    /// Returns `true` for the start-of-frame codes that introduce a frame
    /// mode (`0xC0..=0xCF` except DHT, JPG, and DAC).
    pub const fn is_sof(self) -> bool {
        matches!(self.0, 0xC0..=0xC3 | 0xC5..=0xC7 | 0xC9..=0xCB | 0xCD..=0xCF)
    }

    /// Returns `true` for RST0 through RST7.
    pub const fn is_restart(self) -> bool {
        matches!(self.0, 0xD0..=0xD7)
    }

    /// Returns `true` for APP0 through APP15.
    pub const fn is_app(self) -> bool {
        matches!(self.0, 0xE0..=0xEF)
    }

    /// Return the mnemonic used by ITU T.81, if this code has one.
    pub fn mnemonic(self) -> Option<String> {
        let name = match self.0 {
            0x01 => "TEM",
            0xC4 => "DHT",
            0xC8 => "JPG",
            0xCC => "DAC",
            0xC0..=0xCF => return Some(format!("SOF{}", self.0 - 0xC0)),
            0xD0..=0xD7 => return Some(format!("RST{}", self.0 - 0xD0)),
            0xD8 => "SOI",
            0xD9 => "EOI",
            0xDA => "SOS",
            0xDB => "DQT",
            0xDC => "DNL",
            0xDD => "DRI",
            0xDE => "DHP",
            0xDF => "EXP",
            0xE0..=0xEF => return Some(format!("APP{}", self.0 - 0xE0)),
            0xF0..=0xFD => return Some(format!("JPG{}", self.0 - 0xF0)),
            0xFE => "COM",
            _ => return None,
        };

        Some(name.to_string())
    }
}

impl Debug for MarkerCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self.mnemonic() {
            Some(name) => write!(f, "MarkerCode({:#04x} {name})", self.0),
            None => write!(f, "MarkerCode({:#04x})", self.0),
        }
    }
}

impl Display for MarkerCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        match self.mnemonic() {
            Some(name) => f.write_str(&name),
            None => write!(f, "{:#04x}", self.0),
        }
    }
}

impl From<u8> for MarkerCode {
    fn from(code: u8) -> Self {
        Self(code)
    }
}

/// Acceptance predicate over marker codes.
///
/// Segment variants declare which codes they can parse with exactly one
/// of these forms. Predicates of different variants may overlap; the
/// [`Registry`] resolves the overlap by order.
///
/// [`Registry`]: crate::registry::Registry
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MarkerCodes {
    /// Exactly one code.
    Single(MarkerCode),

    /// An inclusive range of codes.
    Range(MarkerCode, MarkerCode),

    /// An explicit set of codes.
    Set(&'static [MarkerCode]),
}

impl MarkerCodes {
    /// Returns `true` if `code` satisfies this predicate.
    pub fn accepts(&self, code: MarkerCode) -> bool {
        match self {
            Self::Single(c) => *c == code,
            Self::Range(first, last) => (*first..=*last).contains(&code),
            Self::Set(codes) => codes.contains(&code),
        }
    }
}

/// Codes that introduce a frame mode.
pub(crate) const SOF_CODES: &[MarkerCode] = &[
    MarkerCode::SOF0,
    MarkerCode::SOF1,
    MarkerCode::SOF2,
    MarkerCode::SOF3,
    MarkerCode::SOF5,
    MarkerCode::SOF6,
    MarkerCode::SOF7,
    MarkerCode::SOF9,
    MarkerCode::SOF10,
    MarkerCode::SOF11,
    MarkerCode::SOF13,
    MarkerCode::SOF14,
    MarkerCode::SOF15,
];

/// SOF family plus DHP, which shares the frame header layout.
pub(crate) const FRAME_HEADER_CODES: &[MarkerCode] = &[
    MarkerCode::SOF0,
    MarkerCode::SOF1,
    MarkerCode::SOF2,
    MarkerCode::SOF3,
    MarkerCode::SOF5,
    MarkerCode::SOF6,
    MarkerCode::SOF7,
    MarkerCode::SOF9,
    MarkerCode::SOF10,
    MarkerCode::SOF11,
    MarkerCode::SOF13,
    MarkerCode::SOF14,
    MarkerCode::SOF15,
    MarkerCode::DHP,
];

/// Markers without a length or payload.
pub(crate) const STANDALONE_CODES: &[MarkerCode] = &[
    MarkerCode::TEM,
    MarkerCode(0xD0),
    MarkerCode(0xD1),
    MarkerCode(0xD2),
    MarkerCode(0xD3),
    MarkerCode(0xD4),
    MarkerCode(0xD5),
    MarkerCode(0xD6),
    MarkerCode(0xD7),
    MarkerCode::SOI,
    MarkerCode::EOI,
];

/// JPG and JPG0 through JPG13.
pub(crate) const EXTENSION_CODES: &[MarkerCode] = &[
    MarkerCode::JPG,
    MarkerCode(0xF0),
    MarkerCode(0xF1),
    MarkerCode(0xF2),
    MarkerCode(0xF3),
    MarkerCode(0xF4),
    MarkerCode(0xF5),
    MarkerCode(0xF6),
    MarkerCode(0xF7),
    MarkerCode(0xF8),
    MarkerCode(0xF9),
    MarkerCode(0xFA),
    MarkerCode(0xFB),
    MarkerCode(0xFC),
    MarkerCode(0xFD),
];

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::unwrap_used)]

    use pretty_assertions_sorted::assert_eq;

    use crate::marker_code::{MarkerCode, MarkerCodes, SOF_CODES, STANDALONE_CODES};

    #[test]
    fn standalone_markers() {
        for code in 0x01..=0xFE {
            let code = MarkerCode(code);
            assert_eq!(code.has_length(), !STANDALONE_CODES.contains(&code));
        }
    }

    #[test]
    fn sof_family() {
        let sofs: Vec<MarkerCode> = (0xC0..=0xCF)
            .map(MarkerCode)
            .filter(|c| c.is_sof())
            .collect();
        assert_eq!(sofs, SOF_CODES.to_vec());
        assert!(!MarkerCode::DHT.is_sof());
        assert!(!MarkerCode::JPG.is_sof());
        assert!(!MarkerCode::DAC.is_sof());
    }

    #[test]
    fn constructors() {
        assert_eq!(MarkerCode::rst(3), MarkerCode(0xD3));
        assert_eq!(MarkerCode::rst(9), MarkerCode(0xD1));
        assert_eq!(MarkerCode::app(14), MarkerCode(0xEE));
        assert!(MarkerCode::app(1).is_app());
        assert!(MarkerCode::rst(7).is_restart());
    }

    #[test]
    fn names() {
        assert_eq!(MarkerCode::DQT.to_string(), "DQT");
        assert_eq!(MarkerCode::SOF10.to_string(), "SOF10");
        assert_eq!(MarkerCode::app(2).to_string(), "APP2");
        assert_eq!(MarkerCode(0xF4).to_string(), "JPG4");
        assert_eq!(MarkerCode(0x42).to_string(), "0x42");
        assert_eq!(format!("{:?}", MarkerCode::SOI), "MarkerCode(0xd8 SOI)");
        assert_eq!(format!("{:?}", MarkerCode(0x42)), "MarkerCode(0x42)");
    }

    #[test]
    fn predicates() {
        let single = MarkerCodes::Single(MarkerCode::APP0);
        assert!(single.accepts(MarkerCode::APP0));
        assert!(!single.accepts(MarkerCode::app(1)));

        let range = MarkerCodes::Range(MarkerCode::APP0, MarkerCode::APP15);
        assert!(range.accepts(MarkerCode::APP0));
        assert!(range.accepts(MarkerCode::app(7)));
        assert!(range.accepts(MarkerCode::APP15));
        assert!(!range.accepts(MarkerCode::COM));

        let set = MarkerCodes::Set(SOF_CODES);
        assert!(set.accepts(MarkerCode::SOF2));
        assert!(!set.accepts(MarkerCode::DHT));
    }
}
