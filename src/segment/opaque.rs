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
    io::{BoundedReader, InputData},
    segment::{OpaqueSegment, ParamSegment, Segment, SegmentPayload},
    Error, MarkerCode, MarkerCodes,
};

/// Uninterpreted segment payload.
///
/// Used for JPG and JPGn extensions, reserved codes, and segments captured
/// by [`Fallback::Opaque`](crate::Fallback::Opaque).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Opaque {
    /// Payload bytes.
    pub data: InputData,
}

impl Opaque {
    /// Payload holding `data`.
    pub fn new(data: impl Into<InputData>) -> Self {
        Self { data: data.into() }
    }
}

impl SegmentPayload for Opaque {
    const CODES: MarkerCodes = MarkerCodes::Range(MarkerCode(0x01), MarkerCode(0xFE));

    fn read<R: Read + ?Sized>(
        _code: MarkerCode,
        reader: &mut BoundedReader<'_, R>,
    ) -> Result<Self, Error> {
        Ok(Self {
            data: reader.read_remaining_data()?,
        })
    }

    fn payload_size(&self) -> usize {
        self.data.len()
    }

    fn write_payload(&self, to: &mut dyn Write) -> Result<(), Error> {
        self.data.write_to(to)
    }

    fn load(&mut self) -> Result<(), Error> {
        self.data.load()
    }

    fn wrap(segment: ParamSegment<Self>) -> Segment {
        Segment::Opaque(segment)
    }
}

impl OpaqueSegment {
    /// Payload bytes.
    pub fn data(&self) -> &InputData {
        &self.payload().data
    }

    /// Replace the payload bytes.
    pub fn set_data(&mut self, data: impl Into<InputData>) {
        self.payload_mut().data = data.into();
    }
}
