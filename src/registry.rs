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

//! Maps marker codes to the segment variants that may interpret them.
//!
//! A [`Registry`] is an ordered list of [`Variant`]s. When a document is
//! parsed, every variant whose [`MarkerCodes`] accept a code is tried in
//! registry order; the first one that parses successfully wins. Several
//! variants may accept the same code (JFIF, JFXX, and generic APPn all
//! accept APP0), so order is the only disambiguation.

use std::{
    cell::RefCell,
    fmt::{Debug, Formatter},
    rc::Rc,
};

use crate::{
    io::{Deferral, ReadAndSeek},
    marker_code::{EXTENSION_CODES, SOF_CODES, STANDALONE_CODES},
    segment::{
        AppData, ArithmeticConditioning, Comment, ExpandReference, FrameHeader, HuffmanTable,
        Jfif, Jfxx, NumberOfLines, Opaque, ParamSegment, QuantizationTable, RestartInterval,
        ScanHeader, SegmentPayload, Tables,
    },
    DataMode, Error, FrameContext, Item, Marker, MarkerCode, MarkerCodes,
};

/// Signature of a variant's parse function.
///
/// Called with the source positioned just after the marker code.
pub type ParseFn = fn(MarkerCode, &mut ParseContext<'_>) -> Result<Item, Error>;

/// State available to a variant while it parses one marker.
pub struct ParseContext<'a> {
    source: &'a mut dyn ReadAndSeek,
    shared: Option<&'a Rc<RefCell<dyn ReadAndSeek>>>,
    defer_threshold: Option<usize>,
    data_mode: DataMode,
    frame_context: FrameContext,
}

impl<'a> ParseContext<'a> {
    pub(crate) fn new(
        source: &'a mut dyn ReadAndSeek,
        shared: Option<&'a Rc<RefCell<dyn ReadAndSeek>>>,
        defer_threshold: Option<usize>,
        data_mode: DataMode,
        frame_context: FrameContext,
    ) -> Self {
        Self {
            source,
            shared,
            defer_threshold,
            data_mode,
            frame_context,
        }
    }

    /// Data mode of the parse.
    pub fn data_mode(&self) -> DataMode {
        self.data_mode
    }

    /// Frame context established by the items parsed so far.
    pub fn frame_context(&self) -> FrameContext {
        self.frame_context
    }

    /// The byte source.
    pub fn source(&mut self) -> &mut (dyn ReadAndSeek + 'a) {
        &mut *self.source
    }

    /// Where a reader starting at the current position should find the
    /// bytes it defers, if deferral is enabled.
    pub(crate) fn deferral(&mut self) -> Result<Option<Deferral>, Error> {
        match (self.shared, self.defer_threshold) {
            (Some(shared), Some(threshold)) => Ok(Some(Deferral {
                source: Rc::clone(shared),
                origin: self.source.stream_position()?,
                threshold,
            })),
            _ => Ok(None),
        }
    }
}

/// One interpretation of a marker code.
#[derive(Clone, Copy)]
pub struct Variant {
    name: &'static str,
    codes: MarkerCodes,
    parse: ParseFn,
}

impl Variant {
    /// A variant with a custom parse function.
    pub fn new(name: &'static str, codes: MarkerCodes, parse: ParseFn) -> Self {
        Self { name, codes, parse }
    }

    /// A segment variant accepting every code the payload type accepts.
    pub fn segment<P: SegmentPayload>(name: &'static str) -> Self {
        Self::segment_for::<P>(name, P::CODES)
    }

    /// A segment variant restricted to `codes`.
    pub fn segment_for<P: SegmentPayload>(name: &'static str, codes: MarkerCodes) -> Self {
        Self {
            name,
            codes,
            parse: parse_segment::<P>,
        }
    }

    /// A variant for markers without a length or payload.
    pub fn marker(name: &'static str, codes: MarkerCodes) -> Self {
        Self {
            name,
            codes,
            parse: parse_marker,
        }
    }

    /// Name used in log output.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Codes this variant accepts.
    pub fn codes(&self) -> MarkerCodes {
        self.codes
    }

    /// Parse one marker with this variant.
    pub fn parse(&self, code: MarkerCode, ctx: &mut ParseContext<'_>) -> Result<Item, Error> {
        (self.parse)(code, ctx)
    }
}

impl Debug for Variant {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Variant")
            .field("name", &self.name)
            .field("codes", &self.codes)
            .finish()
    }
}

fn parse_segment<P: SegmentPayload>(
    code: MarkerCode,
    ctx: &mut ParseContext<'_>,
) -> Result<Item, Error> {
    Ok(ParamSegment::<P>::read(code, ctx)?.into())
}

fn parse_marker(code: MarkerCode, ctx: &mut ParseContext<'_>) -> Result<Item, Error> {
    let mut item = Item::from(Marker::new(code)?);
    item.set_data_mode(ctx.data_mode())?;
    Ok(item)
}

/// Ordered list of segment variants.
#[derive(Clone, Debug)]
pub struct Registry {
    variants: Vec<Variant>,
}

impl Registry {
    /// A registry with no variants.
    pub fn new() -> Self {
        Self { variants: vec![] }
    }

    /// Every variant this crate defines, in priority order.
    pub fn standard() -> Self {
        Self::new()
            .with(Variant::segment::<Jfif>("JFIF"))
            .with(Variant::segment::<Jfxx>("JFXX"))
            .with(Variant::segment::<AppData>("APPn"))
            .with(Variant::segment::<Comment>("COM"))
            .with(Variant::segment::<Tables<QuantizationTable>>("DQT"))
            .with(Variant::segment::<Tables<HuffmanTable>>("DHT"))
            .with(Variant::segment::<Tables<ArithmeticConditioning>>("DAC"))
            .with(Variant::segment_for::<FrameHeader>(
                "SOF",
                MarkerCodes::Set(SOF_CODES),
            ))
            .with(Variant::segment_for::<FrameHeader>(
                "DHP",
                MarkerCodes::Single(MarkerCode::DHP),
            ))
            .with(Variant::segment::<ScanHeader>("SOS"))
            .with(Variant::segment::<RestartInterval>("DRI"))
            .with(Variant::segment::<NumberOfLines>("DNL"))
            .with(Variant::segment::<ExpandReference>("EXP"))
            .with(Variant::marker("marker", MarkerCodes::Set(STANDALONE_CODES)))
            .with(Variant::segment_for::<Opaque>(
                "JPGn",
                MarkerCodes::Set(EXTENSION_CODES),
            ))
            .with(Variant::segment_for::<Opaque>(
                "reserved",
                MarkerCodes::Range(MarkerCode(0x02), MarkerCode(0xBF)),
            ))
    }

    /// Append a variant at the lowest priority.
    pub fn push(&mut self, variant: Variant) {
        self.variants.push(variant);
    }

    /// Same registry with `variant` appended at the lowest priority.
    pub fn with(mut self, variant: Variant) -> Self {
        self.push(variant);
        self
    }

    /// Variants that accept `code`, in priority order.
    pub fn candidates(&self, code: MarkerCode) -> impl Iterator<Item = &Variant> + '_ {
        self.variants
            .iter()
            .filter(move |variant| variant.codes.accepts(code))
    }

    /// All variants in priority order.
    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard()
    }
}
