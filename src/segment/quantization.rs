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
    segment::{pack_nibbles, ParamSegment, QuantizationSegment, Segment, Table, Tables},
    Error, FrameContext, MarkerCode,
};

/// One quantization table from a DQT segment (B.2.4.1).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct QuantizationTable {
    /// Pq: 0 for 8-bit elements, 1 for 16-bit elements.
    pub precision: u8,

    /// Tq: destination identifier.
    pub id: u8,

    /// Qk in zig-zag order.
    pub values: [u16; 64],
}

impl QuantizationTable {
    /// 8-bit table with every element set to `value`.
    pub fn flat(id: u8, value: u8) -> Self {
        Self {
            precision: 0,
            id,
            values: [u16::from(value); 64],
        }
    }

    fn element_size(&self) -> usize {
        if self.precision == 0 {
            1
        } else {
            2
        }
    }
}

impl Table for QuantizationTable {
    const CODE: MarkerCode = MarkerCode::DQT;

    fn read<R: Read + ?Sized>(reader: &mut BoundedReader<'_, R>) -> Result<Self, Error> {
        let (precision, id) = reader.read_nibbles()?;

        let mut values = [0u16; 64];
        for value in &mut values {
            *value = if precision == 0 {
                u16::from(reader.read_u8()?)
            } else {
                reader.read_u16()?
            };
        }

        Ok(Self {
            precision,
            id,
            values,
        })
    }

    fn size(&self) -> usize {
        1 + 64 * self.element_size()
    }

    fn write(&self, to: &mut dyn Write) -> Result<(), Error> {
        to.write_all(&[pack_nibbles("Pq|Tq", self.precision, self.id)?])?;

        if self.precision == 0 {
            let mut bytes = [0u8; 64];
            for (byte, value) in bytes.iter_mut().zip(self.values) {
                *byte = u8::try_from(value).map_err(|_| {
                    Error::format(format!("Qk = {value} does not fit an 8-bit table"))
                })?;
            }
            to.write_all(&bytes)?;
        } else {
            for value in self.values {
                to.write_all(&value.to_be_bytes())?;
            }
        }

        Ok(())
    }

    fn validate(&self, context: FrameContext, results: &mut Vec<Error>) {
        bounds::QUANTIZATION_PRECISION.accumulate(self.precision.into(), context, results);
        bounds::QUANTIZATION_TABLE_ID.accumulate(self.id.into(), context, results);

        let element = if self.precision == 0 {
            bounds::QUANTIZATION_VALUE_8
        } else {
            bounds::QUANTIZATION_VALUE_16
        };
        for value in self.values {
            element.accumulate(value.into(), context, results);
        }
    }

    fn wrap(segment: ParamSegment<Tables<Self>>) -> Segment {
        Segment::Quantization(segment)
    }
}

impl QuantizationSegment {
    /// Set Tq of the table at `index`.
    pub fn set_table_id(&mut self, index: usize, id: u8) -> Result<(), Error> {
        self.edit_table(index, |table| {
            table.id = id;
            Ok(())
        })
    }

    /// Set Pq of the table at `index`.
    ///
    /// In strict mode this fails if any element does not fit the new
    /// precision.
    pub fn set_precision(&mut self, index: usize, precision: u8) -> Result<(), Error> {
        self.edit_table(index, |table| {
            table.precision = precision;
            Ok(())
        })
    }

    /// Set element `k` (zig-zag order) of the table at `index`.
    pub fn set_value(&mut self, index: usize, k: usize, value: u16) -> Result<(), Error> {
        self.edit_table(index, |table| {
            let slot = table
                .values
                .get_mut(k)
                .ok_or(Error::IndexOutOfRange { index: k, len: 64 })?;
            *slot = value;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::unwrap_used)]

    use std::io::Cursor;

    use hex_literal::hex;
    use pretty_assertions_sorted::assert_eq;

    use crate::{
        io::BoundedReader,
        segment::{ParamSegment, QuantizationTable, SegmentPayload, Tables},
        BoundsViolation, DataMode, Error, MarkerCode,
    };

    fn dqt() -> ParamSegment<Tables<QuantizationTable>> {
        ParamSegment::new(
            MarkerCode::DQT,
            Tables::new(vec![QuantizationTable::flat(0, 1)]),
        )
        .unwrap()
    }

    #[test]
    fn strict_rejects_table_id_4() {
        let mut dqt = dqt();

        assert_eq!(
            dqt.set_table_id(0, 4),
            Err(Error::BoundsViolation(BoundsViolation {
                field: "Tq",
                value: 4,
                min: 0,
                max: 3
            }))
        );
        assert_eq!(dqt.tables()[0].id, 0);

        dqt.set_table_id(0, 3).unwrap();
        assert_eq!(dqt.tables()[0].id, 3);
    }

    #[test]
    fn lax_accepts_table_id_4() {
        let mut dqt = dqt();
        dqt.set_data_mode(DataMode::Lax).unwrap();

        dqt.set_table_id(0, 4).unwrap();
        assert_eq!(dqt.tables()[0].id, 4);
        assert_eq!(dqt.validate().len(), 1);

        assert!(dqt.set_data_mode(DataMode::Strict).is_err());
        assert_eq!(dqt.data_mode(), DataMode::Lax);
    }

    #[test]
    fn read_two_tables() {
        let mut payload = hex!("00").to_vec();
        payload.extend([2u8; 64]);
        payload.push(0x11);
        for _ in 0..64 {
            payload.extend(hex!("0100"));
        }

        let mut source = Cursor::new(payload.clone());
        let mut reader = BoundedReader::new(&mut source, payload.len());
        let tables = Tables::<QuantizationTable>::read(MarkerCode::DQT, &mut reader).unwrap();

        assert_eq!(tables.tables.len(), 2);
        assert_eq!(tables.tables[0], QuantizationTable::flat(0, 2));
        assert_eq!(tables.tables[1].precision, 1);
        assert_eq!(tables.tables[1].id, 1);
        assert_eq!(tables.tables[1].values[63], 0x0100);
        assert_eq!(tables.payload_size(), payload.len());

        let mut out = vec![];
        tables.write_payload(&mut out).unwrap();
        assert_eq!(out, payload);
    }

    #[test]
    fn set_value() {
        let mut dqt = dqt();
        dqt.set_value(0, 5, 99).unwrap();
        assert_eq!(dqt.tables()[0].values[5], 99);

        assert!(dqt.set_value(0, 5, 0).is_err());
        assert!(dqt.set_value(0, 5, 256).is_err());
        assert!(dqt.set_value(0, 64, 1).is_err());
        assert!(dqt.set_value(1, 0, 1).is_err());

        dqt.set_precision(0, 1).unwrap();
        dqt.set_value(0, 5, 256).unwrap();
    }

    #[test]
    fn precision_change_checks_every_element() {
        let mut dqt = dqt();
        dqt.set_precision(0, 1).unwrap();
        dqt.set_value(0, 5, 256).unwrap();

        assert_eq!(
            dqt.set_precision(0, 0),
            Err(Error::BoundsViolation(BoundsViolation {
                field: "Qk",
                value: 256,
                min: 1,
                max: 255
            }))
        );
        assert_eq!(dqt.tables()[0].precision, 1);
        assert!(dqt.validate().is_empty());

        let mut out = vec![];
        dqt.write_to(&mut out).unwrap();
        assert_eq!(out.len(), 4 + 1 + 128);

        dqt.set_value(0, 5, 255).unwrap();
        dqt.set_precision(0, 0).unwrap();
        assert_eq!(dqt.length(), 2 + 65);
    }

    #[test]
    fn eight_bit_overflow_fails_to_write() {
        let mut table = QuantizationTable::flat(0, 1);
        table.values[0] = 300;
        let tables = Tables::new(vec![table]);

        let mut out = vec![];
        assert!(tables.write_payload(&mut out).is_err());
    }

    #[test]
    fn push_and_remove() {
        let mut dqt = dqt();
        dqt.push_table(QuantizationTable::flat(1, 8)).unwrap();
        assert!(dqt.push_table(QuantizationTable::flat(7, 8)).is_err());
        assert_eq!(dqt.tables().len(), 2);

        assert_eq!(dqt.remove_table(0).unwrap(), QuantizationTable::flat(0, 1));
        assert_eq!(
            dqt.remove_table(3),
            Err(Error::IndexOutOfRange { index: 3, len: 1 })
        );
        assert_eq!(dqt.length(), 2 + 65);
    }
}
