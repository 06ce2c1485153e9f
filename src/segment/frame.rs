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
    marker_code::FRAME_HEADER_CODES,
    segment::{count_u8, pack_nibbles, FrameSegment, ParamSegment, Segment, SegmentPayload},
    Error, FrameContext, FrameMode, MarkerCode, MarkerCodes,
};

/// Frame header shared by the SOF family and DHP (B.2.2, B.3.2).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FrameHeader {
    /// P: sample precision in bits.
    pub precision: u8,

    /// Y: number of lines; 0 defers the count to a DNL segment.
    pub lines: u16,

    /// X: number of samples per line.
    pub samples_per_line: u16,

    /// Component specifications, one per image component.
    pub components: Vec<FrameComponent>,
}

/// Frame component specification.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FrameComponent {
    /// Ci: component identifier.
    pub id: u8,

    /// Hi: horizontal sampling factor.
    pub horizontal: u8,

    /// Vi: vertical sampling factor.
    pub vertical: u8,

    /// Tqi: quantization table destination selector.
    pub table: u8,
}

impl SegmentPayload for FrameHeader {
    const CODES: MarkerCodes = MarkerCodes::Set(FRAME_HEADER_CODES);

    fn read<R: Read + ?Sized>(
        _code: MarkerCode,
        reader: &mut BoundedReader<'_, R>,
    ) -> Result<Self, Error> {
        let precision = reader.read_u8()?;
        let lines = reader.read_u16()?;
        let samples_per_line = reader.read_u16()?;

        let count = reader.read_u8()?;
        let mut components = Vec::with_capacity(count.into());
        for _ in 0..count {
            let id = reader.read_u8()?;
            let (horizontal, vertical) = reader.read_nibbles()?;
            let table = reader.read_u8()?;
            components.push(FrameComponent {
                id,
                horizontal,
                vertical,
                table,
            });
        }

        Ok(Self {
            precision,
            lines,
            samples_per_line,
            components,
        })
    }

    fn payload_size(&self) -> usize {
        6 + 3 * self.components.len()
    }

    fn write_payload(&self, to: &mut dyn Write) -> Result<(), Error> {
        let count = count_u8("Nf", self.components.len())?;

        to.write_all(&[self.precision])?;
        to.write_all(&self.lines.to_be_bytes())?;
        to.write_all(&self.samples_per_line.to_be_bytes())?;
        to.write_all(&[count])?;

        for c in &self.components {
            to.write_all(&[
                c.id,
                pack_nibbles("Hi|Vi", c.horizontal, c.vertical)?,
                c.table,
            ])?;
        }

        Ok(())
    }

    fn validate(&self, code: MarkerCode, context: FrameContext, results: &mut Vec<Error>) {
        // An SOF segment is always checked against the mode it introduces.
        let context = match FrameMode::from_code(code) {
            Some(mode) => FrameContext {
                frame_mode: Some(mode),
                ..context
            },
            None => context,
        };

        let count = self.components.len();

        bounds::SAMPLE_PRECISION.accumulate(self.precision.into(), context, results);
        bounds::LINES.accumulate(self.lines.into(), context, results);
        bounds::SAMPLES_PER_LINE.accumulate(self.samples_per_line.into(), context, results);
        bounds::FRAME_COMPONENT_COUNT.accumulate(
            u32::try_from(count).unwrap_or(u32::MAX),
            context,
            results,
        );

        if !matches!(count, 1 | 3 | 4) {
            results.push(Error::format(format!(
                "{code} has {count} components; expected 1, 3, or 4"
            )));
        }

        for c in &self.components {
            bounds::COMPONENT_ID.accumulate(c.id.into(), context, results);
            bounds::SAMPLING_FACTOR.accumulate(c.horizontal.into(), context, results);
            bounds::SAMPLING_FACTOR.accumulate(c.vertical.into(), context, results);

            if code == MarkerCode::DHP {
                if c.table != 0 {
                    results.push(Error::format(format!(
                        "DHP component {} selects quantization table {}; must be 0",
                        c.id, c.table
                    )));
                }
            } else {
                bounds::FRAME_QUANTIZATION_ID.accumulate(c.table.into(), context, results);
            }
        }
    }

    fn wrap(segment: ParamSegment<Self>) -> Segment {
        Segment::Frame(segment)
    }
}

impl FrameSegment {
    /// Frame mode introduced by this segment; `None` for DHP.
    pub fn frame_mode(&self) -> Option<FrameMode> {
        FrameMode::from_code(self.code())
    }

    fn bounds_context(&self) -> FrameContext {
        FrameContext {
            frame_mode: self.frame_mode().or(self.context().frame_mode),
            ..self.context()
        }
    }

    fn check_field(&self, field: &bounds::Bounds, value: impl Into<u32>) -> Result<(), Error> {
        field.validate(value.into(), self.bounds_context(), self.data_mode())
    }

    /// Set P.
    pub fn set_precision(&mut self, precision: u8) -> Result<(), Error> {
        self.check_field(&bounds::SAMPLE_PRECISION, precision)?;
        self.payload_mut().precision = precision;
        Ok(())
    }

    /// Set Y.
    pub fn set_lines(&mut self, lines: u16) -> Result<(), Error> {
        self.check_field(&bounds::LINES, lines)?;
        self.payload_mut().lines = lines;
        Ok(())
    }

    /// Set X.
    pub fn set_samples_per_line(&mut self, samples_per_line: u16) -> Result<(), Error> {
        self.check_field(&bounds::SAMPLES_PER_LINE, samples_per_line)?;
        self.payload_mut().samples_per_line = samples_per_line;
        Ok(())
    }

    /// Set Hi and Vi of the component at `index`.
    pub fn set_sampling(&mut self, index: usize, horizontal: u8, vertical: u8) -> Result<(), Error> {
        self.check_field(&bounds::SAMPLING_FACTOR, horizontal)?;
        self.check_field(&bounds::SAMPLING_FACTOR, vertical)?;
        let component = self.component_mut(index)?;
        component.horizontal = horizontal;
        component.vertical = vertical;
        Ok(())
    }

    /// Set Tqi of the component at `index`.
    pub fn set_component_table(&mut self, index: usize, table: u8) -> Result<(), Error> {
        if self.code() == MarkerCode::DHP && table != 0 && self.data_mode().is_strict() {
            return Err(Error::format("DHP components must select quantization table 0"));
        }
        self.check_field(&bounds::FRAME_QUANTIZATION_ID, table)?;
        self.component_mut(index)?.table = table;
        Ok(())
    }

    /// Append a component.
    pub fn push_component(&mut self, component: FrameComponent) -> Result<(), Error> {
        let mut header = self.payload().clone();
        header.components.push(component);
        self.replace_checked(header)
    }

    /// Remove and return the component at `index`.
    pub fn remove_component(&mut self, index: usize) -> Result<FrameComponent, Error> {
        let len = self.payload().components.len();
        if index >= len {
            return Err(Error::IndexOutOfRange { index, len });
        }

        let mut header = self.payload().clone();
        let removed = header.components.remove(index);
        self.replace_checked(header)?;
        Ok(removed)
    }

    fn component_mut(&mut self, index: usize) -> Result<&mut FrameComponent, Error> {
        let len = self.payload().components.len();
        self.payload_mut()
            .components
            .get_mut(index)
            .ok_or(Error::IndexOutOfRange { index, len })
    }

    fn replace_checked(&mut self, header: FrameHeader) -> Result<(), Error> {
        if self.data_mode().is_strict() {
            let mut results = vec![];
            header.validate(self.code(), self.context(), &mut results);
            if let Some(err) = results.into_iter().next() {
                return Err(err);
            }
        }
        *self.payload_mut() = header;
        Ok(())
    }
}
