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
    segment::{pack_nibbles, HuffmanSegment, ParamSegment, Segment, Table, Tables},
    Error, FrameContext, MarkerCode,
};

/// One Huffman table from a DHT segment (B.2.4.2).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HuffmanTable {
    /// Tc: 0 for DC (or lossless) tables, 1 for AC tables.
    pub class: u8,

    /// Th: destination identifier.
    pub id: u8,

    /// Li: number of codes of each length 1 through 16.
    pub counts: [u8; 16],

    /// Vij: symbol values in order of increasing code length.
    pub values: Vec<u8>,
}

impl HuffmanTable {
    /// Build a table from code counts and symbol values.
    ///
    /// Fails if the number of values does not match the counts.
    pub fn new(class: u8, id: u8, counts: [u8; 16], values: Vec<u8>) -> Result<Self, Error> {
        let total = counts.iter().map(|&c| usize::from(c)).sum::<usize>();
        if total != values.len() {
            return Err(Error::format(format!(
                "code counts total {total} but {} value(s) were supplied",
                values.len()
            )));
        }

        Ok(Self {
            class,
            id,
            counts,
            values,
        })
    }

    /// Total number of codes.
    pub fn code_count(&self) -> usize {
        self.counts.iter().map(|&c| usize::from(c)).sum()
    }
}

impl Table for HuffmanTable {
    const CODE: MarkerCode = MarkerCode::DHT;

    fn read<R: Read + ?Sized>(reader: &mut BoundedReader<'_, R>) -> Result<Self, Error> {
        let (class, id) = reader.read_nibbles()?;

        let mut counts = [0u8; 16];
        reader.read_exact(&mut counts)?;

        let total = counts.iter().map(|&c| usize::from(c)).sum();
        let values = reader.read_bytes(total)?;

        Ok(Self {
            class,
            id,
            counts,
            values,
        })
    }

    fn size(&self) -> usize {
        17 + self.values.len()
    }

    fn write(&self, to: &mut dyn Write) -> Result<(), Error> {
        to.write_all(&[pack_nibbles("Tc|Th", self.class, self.id)?])?;
        to.write_all(&self.counts)?;
        to.write_all(&self.values)?;
        Ok(())
    }

    fn validate(&self, context: FrameContext, results: &mut Vec<Error>) {
        bounds::HUFFMAN_CLASS.accumulate(self.class.into(), context, results);
        bounds::HUFFMAN_TABLE_ID.accumulate(self.id.into(), context, results);

        let total = self.code_count();
        if total > 256 {
            results.push(Error::format(format!(
                "Huffman table defines {total} codes, more than 256"
            )));
        }
        if total != self.values.len() {
            results.push(Error::format(format!(
                "code counts total {total} but the table holds {} value(s)",
                self.values.len()
            )));
        }

        if self.class == 0 {
            for &value in &self.values {
                bounds::HUFFMAN_DC_VALUE.accumulate(value.into(), context, results);
            }
        }
    }

    fn wrap(segment: ParamSegment<Tables<Self>>) -> Segment {
        Segment::Huffman(segment)
    }
}

impl HuffmanSegment {
    /// Set Tc of the table at `index`.
    ///
    /// In strict mode this fails if the values do not suit the new class.
    pub fn set_class(&mut self, index: usize, class: u8) -> Result<(), Error> {
        self.edit_table(index, |table| {
            table.class = class;
            Ok(())
        })
    }

    /// Set Th of the table at `index`.
    pub fn set_table_id(&mut self, index: usize, id: u8) -> Result<(), Error> {
        self.edit_table(index, |table| {
            table.id = id;
            Ok(())
        })
    }

    /// Replace the codes of the table at `index`.
    pub fn set_codes(&mut self, index: usize, counts: [u8; 16], values: Vec<u8>) -> Result<(), Error> {
        self.edit_table(index, |table| {
            *table = HuffmanTable::new(table.class, table.id, counts, values)?;
            Ok(())
        })
    }
}
