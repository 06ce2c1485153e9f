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

#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]
#![doc = include_str!("../README.md")]

pub mod bounds;

mod debug;

mod document;
pub use document::{Document, Fallback, ParseOptions, Problem};

mod error;
pub use error::{BoundsViolation, Error, ErrorKind};

pub mod io;

mod item;
pub use item::{EntropyData, Item, Marker, Padding};

mod marker_code;
pub use marker_code::{MarkerCode, MarkerCodes};

mod modes;
pub use modes::{DataMode, FrameContext, FrameMode, ModeClass};

pub mod registry;

pub mod segment;

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::unwrap_used)]

    use hex_literal::hex;
    use pretty_assertions_sorted::assert_eq;

    use crate::{DataMode, Document, FrameMode, Item, MarkerCode, ParseOptions};

    #[test]
    fn test_readme_example() {
        let jpeg = hex!(
            "ffd8" // SOI
            "ffdd" "0004" "0010" // DRI, restart interval = 16
            "ffd9" // EOI
        );

        let doc = Document::from_slice(&jpeg).unwrap();
        assert_eq!(doc.len(), 3);
        assert_eq!(doc.to_vec().unwrap(), jpeg.to_vec());
    }

    #[test]
    fn lax_document_keeps_malformed_bytes() {
        let jpeg = hex!(
            "ffd8" // SOI
            "ffc0" "000b" "08" "0010" "0010" "01" "011100" // SOF0
            "ffdd" "0006" "0010" "abcd" // DRI with two extra bytes
            "ffd9" // EOI
        );

        assert!(Document::from_slice(&jpeg).is_err());

        let doc = Document::from_slice_with_options(&jpeg, &ParseOptions::lax()).unwrap();
        assert_eq!(doc.data_mode(), DataMode::Lax);
        assert_eq!(doc.to_vec().unwrap(), jpeg.to_vec());

        let dri = doc.get(2).unwrap();
        assert_eq!(dri.code(), Some(MarkerCode::DRI));
        assert_eq!(dri.frame_mode(), Some(FrameMode::Baseline));
        assert!(matches!(dri, Item::Segment(_)));
        assert_eq!(doc.validate().len(), 1);
    }
}
