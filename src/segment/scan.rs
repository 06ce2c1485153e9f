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
    segment::{count_u8, pack_nibbles, ParamSegment, ScanSegment, Segment, SegmentPayload},
    Error, FrameContext, MarkerCode, MarkerCodes,
};

/// Scan header from an SOS segment (B.2.3).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScanHeader {
    /// Component specifications, one per component in the scan.
    pub components: Vec<ScanComponent>,

    /// Ss: start of spectral selection, or predictor for lossless scans.
    pub spectral_start: u8,

    /// Se: end of spectral selection.
    pub spectral_end: u8,

    /// Ah: successive approximation bit position high.
    pub approximation_high: u8,

    /// Al: successive approximation bit position low, or point transform.
    pub approximation_low: u8,
}

/// Scan component specification.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ScanComponent {
    /// Csj: scan component selector.
    pub selector: u8,

    /// Tdj: DC entropy coding table selector.
    pub dc_table: u8,

    /// Taj: AC entropy coding table selector.
    pub ac_table: u8,
}

impl SegmentPayload for ScanHeader {
    const CODES: MarkerCodes = MarkerCodes::Single(MarkerCode::SOS);

    fn read<R: Read + ?Sized>(
        _code: MarkerCode,
        reader: &mut BoundedReader<'_, R>,
    ) -> Result<Self, Error> {
        let count = reader.read_u8()?;

        let mut components = Vec::with_capacity(count.into());
        for _ in 0..count {
            let selector = reader.read_u8()?;
            let (dc_table, ac_table) = reader.read_nibbles()?;
            components.push(ScanComponent {
                selector,
                dc_table,
                ac_table,
            });
        }

        let spectral_start = reader.read_u8()?;
        let spectral_end = reader.read_u8()?;
        let (approximation_high, approximation_low) = reader.read_nibbles()?;

        Ok(Self {
            components,
            spectral_start,
            spectral_end,
            approximation_high,
            approximation_low,
        })
    }

    fn payload_size(&self) -> usize {
        4 + 2 * self.components.len()
    }

    fn write_payload(&self, to: &mut dyn Write) -> Result<(), Error> {
        to.write_all(&[count_u8("Ns", self.components.len())?])?;

        for c in &self.components {
            to.write_all(&[c.selector, pack_nibbles("Td|Ta", c.dc_table, c.ac_table)?])?;
        }

        to.write_all(&[
            self.spectral_start,
            self.spectral_end,
            pack_nibbles("Ah|Al", self.approximation_high, self.approximation_low)?,
        ])?;

        Ok(())
    }

    fn validate(&self, _code: MarkerCode, context: FrameContext, results: &mut Vec<Error>) {
        bounds::SCAN_COMPONENT_COUNT.accumulate(
            u32::try_from(self.components.len()).unwrap_or(u32::MAX),
            context,
            results,
        );

        for c in &self.components {
            bounds::DC_TABLE_SELECTOR.accumulate(c.dc_table.into(), context, results);
            bounds::AC_TABLE_SELECTOR.accumulate(c.ac_table.into(), context, results);
        }

        bounds::SPECTRAL_START.accumulate(self.spectral_start.into(), context, results);
        bounds::SPECTRAL_END.accumulate(self.spectral_end.into(), context, results);
        bounds::APPROXIMATION_HIGH.accumulate(self.approximation_high.into(), context, results);
        bounds::APPROXIMATION_LOW.accumulate(self.approximation_low.into(), context, results);
    }

    fn wrap(segment: ParamSegment<Self>) -> Segment {
        Segment::Scan(segment)
    }
}

impl ScanSegment {
    /// Set Ss and Se.
    pub fn set_spectral_selection(&mut self, start: u8, end: u8) -> Result<(), Error> {
        self.check(&bounds::SPECTRAL_START, start)?;
        self.check(&bounds::SPECTRAL_END, end)?;
        let header = self.payload_mut();
        header.spectral_start = start;
        header.spectral_end = end;
        Ok(())
    }

    /// Set Ah and Al.
    pub fn set_approximation(&mut self, high: u8, low: u8) -> Result<(), Error> {
        self.check(&bounds::APPROXIMATION_HIGH, high)?;
        self.check(&bounds::APPROXIMATION_LOW, low)?;
        let header = self.payload_mut();
        header.approximation_high = high;
        header.approximation_low = low;
        Ok(())
    }

    /// Set Tdj and Taj of the component at `index`.
    pub fn set_tables(&mut self, index: usize, dc_table: u8, ac_table: u8) -> Result<(), Error> {
        self.check(&bounds::DC_TABLE_SELECTOR, dc_table)?;
        self.check(&bounds::AC_TABLE_SELECTOR, ac_table)?;

        let len = self.payload().components.len();
        let component = self
            .payload_mut()
            .components
            .get_mut(index)
            .ok_or(Error::IndexOutOfRange { index, len })?;
        component.dc_table = dc_table;
        component.ac_table = ac_table;
        Ok(())
    }

    /// Append a component.
    pub fn push_component(&mut self, component: ScanComponent) -> Result<(), Error> {
        let count = self.payload().components.len() + 1;
        self.check(
            &bounds::SCAN_COMPONENT_COUNT,
            u32::try_from(count).unwrap_or(u32::MAX),
        )?;
        self.check(&bounds::DC_TABLE_SELECTOR, component.dc_table)?;
        self.check(&bounds::AC_TABLE_SELECTOR, component.ac_table)?;
        self.payload_mut().components.push(component);
        Ok(())
    }

    /// Remove and return the component at `index`.
    pub fn remove_component(&mut self, index: usize) -> Result<ScanComponent, Error> {
        let len = self.payload().components.len();
        if index >= len {
            return Err(Error::IndexOutOfRange { index, len });
        }
        self.check(
            &bounds::SCAN_COMPONENT_COUNT,
            u32::try_from(len - 1).unwrap_or(u32::MAX),
        )?;
        Ok(self.payload_mut().components.remove(index))
    }
}
