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

use std::{
    fmt::Debug,
    io::{Read, Write},
};

use crate::{
    io::BoundedReader,
    segment::{ParamSegment, Segment, SegmentPayload},
    Error, FrameContext, MarkerCode, MarkerCodes,
};

/// One self-describing entry of a table-definition segment (DQT, DHT,
/// DAC).
pub trait Table: Sized + Clone + Debug + PartialEq {
    /// Marker code of the segment that carries this kind of table.
    const CODE: MarkerCode;

    /// Read one table.
    fn read<R: Read + ?Sized>(reader: &mut BoundedReader<'_, R>) -> Result<Self, Error>;

    /// Encoded size in bytes.
    fn size(&self) -> usize;

    /// Write the encoded table.
    fn write(&self, to: &mut dyn Write) -> Result<(), Error>;

    /// Append every bounds or format violation to `results`.
    fn validate(&self, context: FrameContext, results: &mut Vec<Error>);

    /// Wrap a segment of these tables as a [`Segment`].
    fn wrap(segment: ParamSegment<Tables<Self>>) -> Segment;
}

/// Payload made of tables packed back to back until the declared length
/// is used up.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Tables<T> {
    /// Tables in the order they appear.
    pub tables: Vec<T>,
}

impl<T> Tables<T> {
    /// Payload holding `tables`.
    pub fn new(tables: Vec<T>) -> Self {
        Self { tables }
    }
}

impl<T: Table> SegmentPayload for Tables<T> {
    const CODES: MarkerCodes = MarkerCodes::Single(T::CODE);

    fn read<R: Read + ?Sized>(
        _code: MarkerCode,
        reader: &mut BoundedReader<'_, R>,
    ) -> Result<Self, Error> {
        let mut tables = vec![];
        while reader.remaining() > 0 {
            tables.push(T::read(reader)?);
        }
        Ok(Self { tables })
    }

    fn payload_size(&self) -> usize {
        self.tables.iter().map(Table::size).sum()
    }

    fn write_payload(&self, to: &mut dyn Write) -> Result<(), Error> {
        for table in &self.tables {
            table.write(to)?;
        }
        Ok(())
    }

    fn validate(&self, code: MarkerCode, context: FrameContext, results: &mut Vec<Error>) {
        if self.tables.is_empty() {
            results.push(Error::format(format!("{code} defines no tables")));
        }
        for table in &self.tables {
            table.validate(context, results);
        }
    }

    fn wrap(segment: ParamSegment<Self>) -> Segment {
        T::wrap(segment)
    }
}

impl<T: Table> ParamSegment<Tables<T>> {
    /// Tables in the order they appear.
    pub fn tables(&self) -> &[T] {
        &self.payload().tables
    }

    /// Append a table.
    ///
    /// In strict mode the table is validated first.
    pub fn push_table(&mut self, table: T) -> Result<(), Error> {
        self.check_table(&table)?;
        self.payload_mut().tables.push(table);
        Ok(())
    }

    /// Remove and return the table at `index`.
    ///
    /// A strict segment keeps at least one table.
    pub fn remove_table(&mut self, index: usize) -> Result<T, Error> {
        let len = self.tables().len();
        if index >= len {
            return Err(Error::IndexOutOfRange { index, len });
        }
        if len == 1 && self.data_mode().is_strict() {
            return Err(Error::format(format!(
                "{} must define at least one table",
                self.code()
            )));
        }
        Ok(self.payload_mut().tables.remove(index))
    }

    /// Apply `edit` to a copy of the table at `index` and store it.
    ///
    /// In strict mode the whole edited table is validated, so a change to
    /// one field cannot leave another out of range.
    pub(crate) fn edit_table<F>(&mut self, index: usize, edit: F) -> Result<(), Error>
    where
        F: FnOnce(&mut T) -> Result<(), Error>,
    {
        let len = self.tables().len();
        let mut table = self
            .tables()
            .get(index)
            .cloned()
            .ok_or(Error::IndexOutOfRange { index, len })?;

        edit(&mut table)?;
        self.check_table(&table)?;

        self.payload_mut().tables[index] = table;
        Ok(())
    }

    fn check_table(&self, table: &T) -> Result<(), Error> {
        if self.data_mode().is_strict() {
            let mut results = vec![];
            table.validate(self.context(), &mut results);
            if let Some(err) = results.into_iter().next() {
                return Err(err);
            }
        }
        Ok(())
    }
}
