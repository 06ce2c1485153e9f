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

use std::io::{Read, Write};

use crate::{
    bounds,
    io::BoundedReader,
    segment::{pack_nibbles, ArithmeticSegment, ParamSegment, Segment, Table, Tables},
    Error, FrameContext, MarkerCode,
};

/// One conditioning entry from a DAC segment (B.2.4.3).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ArithmeticConditioning {
    /// Tc: 0 for DC (or lossless), 1 for AC.
    pub class: u8,

    /// Tb: destination identifier.
    pub id: u8,

    /// Cs: `U << 4 | L` for DC tables, Kx for AC tables.
    pub value: u8,
}

impl Table for ArithmeticConditioning {
    const CODE: MarkerCode = MarkerCode::DAC;

    fn read<R: Read + ?Sized>(reader: &mut BoundedReader<'_, R>) -> Result<Self, Error> {
        let (class, id) = reader.read_nibbles()?;
        let value = reader.read_u8()?;
        Ok(Self { class, id, value })
    }

    fn size(&self) -> usize {
        2
    }

    fn write(&self, to: &mut dyn Write) -> Result<(), Error> {
        to.write_all(&[pack_nibbles("Tc|Tb", self.class, self.id)?, self.value])?;
        Ok(())
    }

    fn validate(&self, context: FrameContext, results: &mut Vec<Error>) {
        bounds::ARITHMETIC_CLASS.accumulate(self.class.into(), context, results);
        bounds::ARITHMETIC_TABLE_ID.accumulate(self.id.into(), context, results);

        if self.class == 0 {
            let (upper, lower) = (self.value >> 4, self.value & 0x0F);
            if lower > upper {
                results.push(Error::format(format!(
                    "DC conditioning lower bound {lower} exceeds upper bound {upper}"
                )));
            }
        } else {
            bounds::ARITHMETIC_AC_KX.accumulate(self.value.into(), context, results);
        }
    }

    fn wrap(segment: ParamSegment<Tables<Self>>) -> Segment {
        Segment::Arithmetic(segment)
    }
}

impl ArithmeticSegment {
    /// Set Tc of the entry at `index`.
    pub fn set_class(&mut self, index: usize, class: u8) -> Result<(), Error> {
        self.edit_table(index, |entry| {
            entry.class = class;
            Ok(())
        })
    }

    /// Set Tb of the entry at `index`.
    pub fn set_table_id(&mut self, index: usize, id: u8) -> Result<(), Error> {
        self.edit_table(index, |entry| {
            entry.id = id;
            Ok(())
        })
    }

    /// Set Cs of the entry at `index`.
    pub fn set_value(&mut self, index: usize, value: u8) -> Result<(), Error> {
        self.edit_table(index, |entry| {
            entry.value = value;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::unwrap_used)]

    use hex_literal::hex;
    use pretty_assertions_sorted::assert_eq;

    use crate::{
        segment::{ArithmeticConditioning, ParamSegment, Segment, Tables},
        Document, FrameMode, Item, MarkerCode, ParseOptions,
    };

    #[test]
    fn parse_in_document() {
        let jpeg = hex!(
            "ffd8"
            "ffc9" "000b" "08" "0010" "0010" "01" "011100" // SOF9
            "ffcc" "0006" "00" "10" "11" "05" // DAC
            "ffd9"
        );

        let doc = Document::from_slice(&jpeg).unwrap();
        let Some(Item::Segment(Segment::Arithmetic(dac))) = doc.get(2) else {
            panic!("expected DAC");
        };

        assert_eq!(
            dac.tables(),
            &[
                ArithmeticConditioning {
                    class: 0,
                    id: 0,
                    value: 0x10
                },
                ArithmeticConditioning {
                    class: 1,
                    id: 1,
                    value: 5
                }
            ]
        );
        assert_eq!(dac.context().frame_mode, Some(FrameMode::ExtendedSequentialArithmetic));
        assert_eq!(doc.to_vec().unwrap(), jpeg.to_vec());
    }

    #[test]
    fn dc_bounds_order() {
        let mut dac = ParamSegment::new(
            MarkerCode::DAC,
            Tables::new(vec![ArithmeticConditioning {
                class: 0,
                id: 0,
                value: 0x21,
            }]),
        )
        .unwrap();

        assert!(dac.set_value(0, 0x12).is_err());
        assert_eq!(dac.tables()[0].value, 0x21);

        dac.set_class(0, 1).unwrap();
        assert!(dac.set_value(0, 0).is_err());
        dac.set_value(0, 63).unwrap();

        // Kx 63 read as DC bounds gives L = 15 above U = 3.
        assert!(dac.set_class(0, 0).is_err());
        assert_eq!(dac.tables()[0].class, 1);
    }

    #[test]
    fn lax_dac_keeps_bad_kx() {
        let jpeg = hex!("ffd8 ffcc 0004 1000 ffd9");
        assert!(Document::from_slice(&jpeg).is_err());

        let doc = Document::from_slice_with_options(&jpeg, &ParseOptions::lax()).unwrap();
        assert_eq!(doc.validate().len(), 1);
        assert_eq!(doc.to_vec().unwrap(), jpeg.to_vec());
    }
}
