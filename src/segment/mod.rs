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

//! Length-prefixed marker segments.
//!
//! Every segment is a [`ParamSegment`] wrapped around a payload type that
//! implements [`SegmentPayload`]. The payload knows its own field layout;
//! `ParamSegment` owns everything the layouts have in common: the length
//! prefix, the frame context and data mode used for validation, and the
//! passthrough bytes that keep malformed segments writable.

use std::{
    fmt::Debug,
    io::{Read, Write},
};

use crate::{
    bounds::Bounds,
    io::BoundedReader,
    registry::ParseContext,
    DataMode, Error, FrameContext, FrameMode, MarkerCode, MarkerCodes,
};

mod app;
pub use app::{AppData, Jfif, Jfxx, JfxxThumbnail};

mod arithmetic;
pub use arithmetic::ArithmeticConditioning;

mod comment;
pub use comment::Comment;

mod frame;
pub use frame::{FrameComponent, FrameHeader};

mod huffman;
pub use huffman::HuffmanTable;

mod opaque;
pub use opaque::Opaque;

mod params;
pub use params::{ExpandReference, NumberOfLines, RestartInterval};

mod quantization;
pub use quantization::QuantizationTable;

mod scan;
pub use scan::{ScanComponent, ScanHeader};

mod tables;
pub use tables::{Table, Tables};

/// Generic APPn segment.
pub type AppSegment = ParamSegment<AppData>;

/// JFIF APP0 segment.
pub type JfifSegment = ParamSegment<Jfif>;

/// JFIF extension (JFXX) APP0 segment.
pub type JfxxSegment = ParamSegment<Jfxx>;

/// COM segment.
pub type CommentSegment = ParamSegment<Comment>;

/// DQT segment.
pub type QuantizationSegment = ParamSegment<Tables<QuantizationTable>>;

/// DHT segment.
pub type HuffmanSegment = ParamSegment<Tables<HuffmanTable>>;

/// DAC segment.
pub type ArithmeticSegment = ParamSegment<Tables<ArithmeticConditioning>>;

/// SOF family or DHP segment.
pub type FrameSegment = ParamSegment<FrameHeader>;

/// SOS segment.
pub type ScanSegment = ParamSegment<ScanHeader>;

/// DRI segment.
pub type RestartIntervalSegment = ParamSegment<RestartInterval>;

/// DNL segment.
pub type NumberOfLinesSegment = ParamSegment<NumberOfLines>;

/// EXP segment.
pub type ExpandSegment = ParamSegment<ExpandReference>;

/// Segment whose payload is kept as uninterpreted bytes.
pub type OpaqueSegment = ParamSegment<Opaque>;

/// The field layout of one kind of segment payload.
pub trait SegmentPayload: Sized + Clone + Debug + PartialEq {
    /// Marker codes that may carry this payload.
    const CODES: MarkerCodes;

    /// Read the payload from `reader`, whose limit is the declared payload
    /// length.
    ///
    /// An error rejects this interpretation of the segment. Rules that a
    /// lax parse should record rather than reject belong in
    /// [`validate()`](Self::validate).
    fn read<R: Read + ?Sized>(
        code: MarkerCode,
        reader: &mut BoundedReader<'_, R>,
    ) -> Result<Self, Error>;

    /// Encoded size of the payload in bytes.
    fn payload_size(&self) -> usize;

    /// Write the encoded payload.
    fn write_payload(&self, to: &mut dyn Write) -> Result<(), Error>;

    /// Append every bounds or format violation to `results`.
    fn validate(&self, code: MarkerCode, context: FrameContext, results: &mut Vec<Error>) {
        let _ = (code, context, results);
    }

    /// Read any deferred payload bytes into memory.
    fn load(&mut self) -> Result<(), Error> {
        Ok(())
    }

    /// Wrap a segment with this payload as a [`Segment`].
    fn wrap(segment: ParamSegment<Self>) -> Segment;
}

/// A length-prefixed marker segment.
///
/// On disk: `0xFF`, the marker code, a big-endian length that counts
/// itself, then the payload and any passthrough bytes.
#[derive(Clone, Debug, PartialEq)]
pub struct ParamSegment<P> {
    code: MarkerCode,
    payload: P,
    context: FrameContext,
    data_mode: DataMode,
    problems: Vec<Error>,
    passthrough: Vec<u8>,
}

impl<P: SegmentPayload> ParamSegment<P> {
    /// Create a strict segment.
    ///
    /// Fails if `code` cannot carry this payload or if any field is out of
    /// range for the frame mode `code` introduces (if any).
    pub fn new(code: MarkerCode, payload: P) -> Result<Self, Error> {
        Self::with_data_mode(code, payload, DataMode::Strict)
    }

    /// Create a segment in the given data mode.
    ///
    /// A lax segment accepts out-of-range fields; [`validate()`] reports
    /// them.
    ///
    /// [`validate()`]: Self::validate
    pub fn with_data_mode(code: MarkerCode, payload: P, data_mode: DataMode) -> Result<Self, Error> {
        if !code.has_length() || !P::CODES.accepts(code) {
            return Err(Error::format(format!(
                "marker {code} cannot carry this payload"
            )));
        }

        let segment = Self {
            code,
            payload,
            context: FrameContext::new(FrameMode::from_code(code)),
            data_mode,
            problems: vec![],
            passthrough: vec![],
        };

        if data_mode.is_strict() {
            segment.first_problem()?;
        }

        Ok(segment)
    }

    pub(crate) fn read(code: MarkerCode, ctx: &mut ParseContext<'_>) -> Result<Self, Error> {
        let data_mode = ctx.data_mode();
        let context = ctx.frame_context();

        let length = BoundedReader::new(ctx.source(), 2).read_u16()?;
        if length < 2 {
            return Err(Error::format(format!(
                "{code} declares length {length}, which does not cover the length field"
            )));
        }

        let limit = usize::from(length) - 2;
        let deferral = ctx.deferral()?;
        let mut reader = BoundedReader::new(ctx.source(), limit).with_deferral(deferral);

        let payload = P::read(code, &mut reader)?;

        let mut problems = vec![];
        let mut passthrough = vec![];

        if reader.remaining() > 0 {
            let unread = reader.remaining();
            if data_mode.is_strict() {
                return Err(Error::format(format!(
                    "{code} leaves {unread} of {limit} declared byte(s) unread"
                )));
            }
            passthrough = reader.read_remaining()?;
            problems.push(Error::format(format!(
                "{code} carries {unread} byte(s) beyond its fields"
            )));
        }

        let segment = Self {
            code,
            payload,
            context,
            data_mode,
            problems,
            passthrough,
        };

        if data_mode.is_strict() {
            segment.first_problem()?;
        } else {
            for problem in segment.validate() {
                tracing::warn!(marker = %code, %problem, "segment accepted with problem");
            }
        }

        Ok(segment)
    }

    /// Marker code.
    pub fn code(&self) -> MarkerCode {
        self.code
    }

    /// Payload fields.
    pub fn payload(&self) -> &P {
        &self.payload
    }

    /// Consume the segment and return its payload.
    pub fn into_payload(self) -> P {
        self.payload
    }

    /// Apply `edit` to the payload.
    ///
    /// In strict mode the edited payload is validated and the edit is
    /// rolled back if any field is out of range.
    pub fn modify<F: FnOnce(&mut P)>(&mut self, edit: F) -> Result<(), Error> {
        let mut payload = self.payload.clone();
        edit(&mut payload);

        if self.data_mode.is_strict() {
            let mut results = vec![];
            payload.validate(self.code, self.context, &mut results);
            if let Some(err) = results.into_iter().next() {
                return Err(err);
            }
        }

        self.payload = payload;
        Ok(())
    }

    /// Frame context this segment is validated against.
    pub fn context(&self) -> FrameContext {
        self.context
    }

    pub(crate) fn set_context(&mut self, context: FrameContext) {
        self.context = context;
    }

    /// Data mode.
    pub fn data_mode(&self) -> DataMode {
        self.data_mode
    }

    /// Switch the data mode.
    ///
    /// Switching to strict fails, leaving the segment unchanged, if it
    /// carries passthrough bytes or any recorded or current violation.
    pub fn set_data_mode(&mut self, data_mode: DataMode) -> Result<(), Error> {
        if data_mode.is_strict() {
            if !self.passthrough.is_empty() {
                return Err(Error::PassthroughPresent(self.passthrough.len()));
            }
            self.first_problem()?;
        }

        self.data_mode = data_mode;
        Ok(())
    }

    /// Bytes that followed the payload fields within the declared length.
    pub fn passthrough(&self) -> &[u8] {
        &self.passthrough
    }

    /// Problems recorded while parsing.
    pub fn problems(&self) -> &[Error] {
        &self.problems
    }

    /// Drop passthrough bytes and the problems recorded while parsing.
    ///
    /// Afterward the segment writes the canonical encoding of its fields.
    /// Returns the dropped passthrough bytes.
    pub fn clear_passthrough(&mut self) -> Vec<u8> {
        self.problems.clear();
        std::mem::take(&mut self.passthrough)
    }

    /// Value of the length field as it will be written.
    pub fn length(&self) -> usize {
        2 + self.payload.payload_size() + self.passthrough.len()
    }

    /// Total number of bytes written, including the marker.
    pub fn disk_size(&self) -> usize {
        4 + self.payload.payload_size() + self.passthrough.len()
    }

    /// Write the marker, length, payload, and passthrough bytes.
    pub fn write_to(&self, to: &mut dyn Write) -> Result<(), Error> {
        let length = u16::try_from(self.length()).map_err(|_| {
            Error::format(format!(
                "{} payload of {} bytes does not fit a segment",
                self.code,
                self.length() - 2
            ))
        })?;

        to.write_all(&[0xFF, self.code.0])?;
        to.write_all(&length.to_be_bytes())?;
        self.payload.write_payload(to)?;
        to.write_all(&self.passthrough)?;
        Ok(())
    }

    /// Return recorded problems followed by a fresh check of every field.
    pub fn validate(&self) -> Vec<Error> {
        let mut results = self.problems.clone();
        self.payload.validate(self.code, self.context, &mut results);
        results
    }

    /// Read any deferred payload bytes into memory.
    pub fn load(&mut self) -> Result<(), Error> {
        self.payload.load()
    }

    fn first_problem(&self) -> Result<(), Error> {
        match self.validate().into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Check a new field value against `bounds` for this segment's context
    /// and data mode.
    pub(crate) fn check(&self, bounds: &Bounds, value: impl Into<u32>) -> Result<(), Error> {
        bounds.validate(value.into(), self.context, self.data_mode)
    }

    pub(crate) fn payload_mut(&mut self) -> &mut P {
        &mut self.payload
    }

    pub(crate) fn record(&mut self, problem: Error) {
        self.problems.push(problem);
    }
}

impl<P: SegmentPayload> From<ParamSegment<P>> for Segment {
    fn from(segment: ParamSegment<P>) -> Self {
        P::wrap(segment)
    }
}

/// Any length-prefixed segment.
#[derive(Clone, Debug, PartialEq)]
pub enum Segment {
    /// APPn with an uninterpreted payload.
    App(AppSegment),
    /// JFIF APP0.
    Jfif(JfifSegment),
    /// JFIF extension APP0.
    Jfxx(JfxxSegment),
    /// COM.
    Comment(CommentSegment),
    /// DQT.
    Quantization(QuantizationSegment),
    /// DHT.
    Huffman(HuffmanSegment),
    /// DAC.
    Arithmetic(ArithmeticSegment),
    /// SOF family or DHP.
    Frame(FrameSegment),
    /// SOS.
    Scan(ScanSegment),
    /// DRI.
    RestartInterval(RestartIntervalSegment),
    /// DNL.
    NumberOfLines(NumberOfLinesSegment),
    /// EXP.
    Expand(ExpandSegment),
    /// JPGn, reserved codes, or anything captured by the opaque fallback.
    Opaque(OpaqueSegment),
}

macro_rules! each_segment {
    ($segment:expr, $s:ident => $body:expr) => {
        match $segment {
            Segment::App($s) => $body,
            Segment::Jfif($s) => $body,
            Segment::Jfxx($s) => $body,
            Segment::Comment($s) => $body,
            Segment::Quantization($s) => $body,
            Segment::Huffman($s) => $body,
            Segment::Arithmetic($s) => $body,
            Segment::Frame($s) => $body,
            Segment::Scan($s) => $body,
            Segment::RestartInterval($s) => $body,
            Segment::NumberOfLines($s) => $body,
            Segment::Expand($s) => $body,
            Segment::Opaque($s) => $body,
        }
    };
}

impl Segment {
    /// Short name of the segment variant.
    pub fn name(&self) -> &'static str {
        match self {
            Self::App(_) => "APPn",
            Self::Jfif(_) => "JFIF",
            Self::Jfxx(_) => "JFXX",
            Self::Comment(_) => "COM",
            Self::Quantization(_) => "DQT",
            Self::Huffman(_) => "DHT",
            Self::Arithmetic(_) => "DAC",
            Self::Frame(s) if s.code() == MarkerCode::DHP => "DHP",
            Self::Frame(_) => "SOF",
            Self::Scan(_) => "SOS",
            Self::RestartInterval(_) => "DRI",
            Self::NumberOfLines(_) => "DNL",
            Self::Expand(_) => "EXP",
            Self::Opaque(_) => "opaque",
        }
    }

    /// Marker code.
    pub fn code(&self) -> MarkerCode {
        each_segment!(self, s => s.code())
    }

    /// Frame context this segment is validated against.
    pub fn context(&self) -> FrameContext {
        each_segment!(self, s => s.context())
    }

    pub(crate) fn set_context(&mut self, context: FrameContext) {
        each_segment!(self, s => s.set_context(context))
    }

    pub(crate) fn context_mut(&mut self) -> &mut FrameContext {
        each_segment!(self, s => &mut s.context)
    }

    /// Data mode.
    pub fn data_mode(&self) -> DataMode {
        each_segment!(self, s => s.data_mode())
    }

    /// Switch the data mode; see [`ParamSegment::set_data_mode`].
    pub fn set_data_mode(&mut self, data_mode: DataMode) -> Result<(), Error> {
        each_segment!(self, s => s.set_data_mode(data_mode))
    }

    /// Passthrough bytes.
    pub fn passthrough(&self) -> &[u8] {
        each_segment!(self, s => s.passthrough())
    }

    /// Problems recorded while parsing.
    pub fn problems(&self) -> &[Error] {
        each_segment!(self, s => s.problems())
    }

    /// Drop passthrough bytes; see [`ParamSegment::clear_passthrough`].
    pub fn clear_passthrough(&mut self) -> Vec<u8> {
        each_segment!(self, s => s.clear_passthrough())
    }

    /// Recorded problems plus a fresh check of every field.
    pub fn validate(&self) -> Vec<Error> {
        each_segment!(self, s => s.validate())
    }

    /// Total number of bytes written, including the marker.
    pub fn disk_size(&self) -> usize {
        each_segment!(self, s => s.disk_size())
    }

    /// Write the complete segment.
    pub fn write_to(&self, to: &mut dyn Write) -> Result<(), Error> {
        each_segment!(self, s => s.write_to(to))
    }

    /// Read any deferred payload bytes into memory.
    pub fn load(&mut self) -> Result<(), Error> {
        each_segment!(self, s => s.load())
    }

    /// Frame mode introduced by this segment, if it is an SOF segment.
    pub fn introduced_frame_mode(&self) -> Option<FrameMode> {
        match self {
            Self::Frame(s) => FrameMode::from_code(s.code()),
            _ => None,
        }
    }

    /// Returns `true` for a DHP segment.
    pub fn is_dhp(&self) -> bool {
        matches!(self, Self::Frame(s) if s.code() == MarkerCode::DHP)
    }
}

/// Pack two 4-bit fields into one byte, high nibble first.
pub(crate) fn pack_nibbles(field: &str, high: u8, low: u8) -> Result<u8, Error> {
    if high > 0x0F || low > 0x0F {
        return Err(Error::format(format!(
            "{field} ({high}, {low}) does not fit in two 4-bit fields"
        )));
    }
    Ok((high << 4) | low)
}

/// Encode a count that the format stores in one byte.
pub(crate) fn count_u8(field: &str, count: usize) -> Result<u8, Error> {
    u8::try_from(count)
        .map_err(|_| Error::format(format!("{field} = {count} does not fit in one byte")))
}
