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
    cell::RefCell,
    fmt::{Display, Formatter},
    io::{Cursor, Read, Seek, SeekFrom, Write},
    rc::Rc,
};

use crate::{
    io::{fill, InputData, InputSlice, ReadAndSeek},
    modes::propagate,
    registry::{ParseContext, Registry},
    segment::{Opaque, ParamSegment, Segment},
    DataMode, EntropyData, Error, ErrorKind, FrameContext, FrameMode, Item, MarkerCode, Padding,
};

const CHUNK_SIZE: usize = 4096;

/// What to do when no registered variant accepts a marker segment.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Fallback {
    /// Stop the parse with the last candidate's error.
    #[default]
    Error,

    /// Keep the segment's declared bytes as an [`Opaque`] segment.
    ///
    /// In lax mode the rejection is recorded as a problem on the segment.
    ///
    /// [`Opaque`]: crate::segment::Opaque
    Opaque,
}

/// Settings for [`Document::from_slice_with_options`] and
/// [`Document::from_reader_with_options`].
#[derive(Clone, Debug, Default)]
pub struct ParseOptions {
    /// Data mode of the parse and of every item it produces.
    pub data_mode: DataMode,

    /// Policy when every candidate rejects a segment.
    pub fallback: Fallback,

    /// Frame mode assumed before the first SOF segment.
    pub default_frame_mode: Option<FrameMode>,

    /// When reading from a shared source, payloads and entropy-coded data
    /// longer than this are left in the source and read on demand.
    pub defer_threshold: Option<usize>,

    /// Segment variants, in priority order.
    pub registry: Registry,
}

impl ParseOptions {
    /// Strict parse with the standard registry.
    pub fn strict() -> Self {
        Self::default()
    }

    /// Lax parse with the standard registry.
    pub fn lax() -> Self {
        Self {
            data_mode: DataMode::Lax,
            ..Self::default()
        }
    }

    /// Same options with a different fallback policy.
    pub fn with_fallback(self, fallback: Fallback) -> Self {
        Self { fallback, ..self }
    }

    /// Same options with a different default frame mode.
    pub fn with_default_frame_mode(self, default_frame_mode: Option<FrameMode>) -> Self {
        Self {
            default_frame_mode,
            ..self
        }
    }

    /// Same options with deferred loading above `threshold` bytes.
    pub fn with_defer_threshold(self, threshold: usize) -> Self {
        Self {
            defer_threshold: Some(threshold),
            ..self
        }
    }

    /// Same options with a different registry.
    pub fn with_registry(self, registry: Registry) -> Self {
        Self { registry, ..self }
    }
}

/// A problem reported by [`Document::validate`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Problem {
    /// Index of the offending item, or `None` for document-level problems.
    pub index: Option<usize>,

    /// What is wrong.
    pub error: Error,
}

impl Display for Problem {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.index {
            Some(index) => write!(f, "item {index}: {}", self.error),
            None => write!(f, "document: {}", self.error),
        }
    }
}

/// A JPEG file as an ordered list of [`Item`]s.
///
/// Parsing keeps every byte: writing an unmodified document reproduces its
/// source exactly. Every edit re-derives the frame context of each item;
/// in strict mode an edit that would leave any item invalid is rolled back.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Document {
    items: Vec<Item>,
    defaults: FrameContext,
    data_mode: DataMode,
}

impl Document {
    /// Create an empty document.
    pub fn new(data_mode: DataMode) -> Self {
        Self {
            items: vec![],
            defaults: FrameContext::default(),
            data_mode,
        }
    }

    /// Parse a document from memory in strict mode.
    pub fn from_slice(data: &[u8]) -> Result<Self, Error> {
        Self::from_slice_with_options(data, &ParseOptions::default())
    }

    /// Parse a document from memory.
    pub fn from_slice_with_options(data: &[u8], options: &ParseOptions) -> Result<Self, Error> {
        let mut cursor = Cursor::new(data);
        Self::parse(&mut cursor, None, options)
    }

    /// Parse a document from a shared source in strict mode, starting at
    /// the source's current position.
    pub fn from_reader<R: Read + Seek + 'static>(source: Rc<RefCell<R>>) -> Result<Self, Error> {
        Self::from_reader_with_options(source, &ParseOptions::default())
    }

    /// Parse a document from a shared source.
    ///
    /// The source is borrowed for the duration of the parse. With
    /// [`ParseOptions::defer_threshold`] set, large payloads keep a
    /// reference to the source and read from it when needed; see
    /// [`force_content_loading()`](Self::force_content_loading).
    pub fn from_reader_with_options<R: Read + Seek + 'static>(
        source: Rc<RefCell<R>>,
        options: &ParseOptions,
    ) -> Result<Self, Error> {
        let shared: Rc<RefCell<dyn ReadAndSeek>> = source.clone();
        let mut guard = source
            .try_borrow_mut()
            .map_err(|_| Error::IoError("source is already borrowed".to_string()))?;

        Self::parse(&mut *guard, Some(&shared), options)
    }

    fn parse(
        source: &mut dyn ReadAndSeek,
        shared: Option<&Rc<RefCell<dyn ReadAndSeek>>>,
        options: &ParseOptions,
    ) -> Result<Self, Error> {
        let defaults = FrameContext::new(options.default_frame_mode);

        let mut parser = Parser {
            source,
            shared,
            options,
            context: defaults,
            in_scan: false,
            items: vec![],
        };
        parser.run()?;

        let mut items = parser.items;
        propagate(&mut items, defaults);

        if options.data_mode.is_strict() {
            first_problem(&items)?;
        }

        Ok(Self {
            items,
            defaults,
            data_mode: options.data_mode,
        })
    }

    /// All items in file order.
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns `true` if the document has no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The item at `index`.
    pub fn get(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    /// Iterate over the items.
    pub fn iter(&self) -> std::slice::Iter<'_, Item> {
        self.items.iter()
    }

    /// Iterate over the segments, skipping markers, entropy-coded data, and
    /// padding.
    pub fn segments(&self) -> impl Iterator<Item = &Segment> + '_ {
        self.items.iter().filter_map(Item::as_segment)
    }

    /// Iterate over the markers and segments with the given code, along
    /// with their indices.
    pub fn find(&self, code: MarkerCode) -> impl Iterator<Item = (usize, &Item)> + '_ {
        self.items
            .iter()
            .enumerate()
            .filter(move |(_, item)| item.code() == Some(code))
    }

    /// Append an item.
    pub fn push(&mut self, item: Item) -> Result<(), Error> {
        self.insert(self.items.len(), item)
    }

    /// Insert an item before `index`.
    ///
    /// The item adopts the document's data mode.
    pub fn insert(&mut self, index: usize, item: Item) -> Result<(), Error> {
        if index > self.items.len() {
            return Err(Error::IndexOutOfRange {
                index,
                len: self.items.len(),
            });
        }

        self.items.insert(index, item);
        if let Err(err) = self.commit().and_then(|()| self.adopt(index)) {
            self.items.remove(index);
            propagate(&mut self.items, self.defaults);
            return Err(err);
        }
        Ok(())
    }

    /// Remove and return the item at `index`.
    pub fn remove(&mut self, index: usize) -> Result<Item, Error> {
        self.check_index(index)?;

        let item = self.items.remove(index);
        if let Err(err) = self.commit() {
            self.items.insert(index, item);
            propagate(&mut self.items, self.defaults);
            return Err(err);
        }
        Ok(item)
    }

    /// Replace the item at `index`, returning the old one.
    ///
    /// The new item adopts the document's data mode.
    pub fn replace(&mut self, index: usize, item: Item) -> Result<Item, Error> {
        self.check_index(index)?;

        let old = self.swap(index, item)?;
        if let Err(err) = self.commit().and_then(|()| self.adopt(index)) {
            self.swap(index, old)?;
            propagate(&mut self.items, self.defaults);
            return Err(err);
        }
        Ok(old)
    }

    /// Apply `edit` to the item at `index`.
    ///
    /// The edit is rolled back if it fails or, in strict mode, if it leaves
    /// any item invalid.
    pub fn edit<F>(&mut self, index: usize, edit: F) -> Result<(), Error>
    where
        F: FnOnce(&mut Item) -> Result<(), Error>,
    {
        let len = self.items.len();
        let item = self
            .items
            .get_mut(index)
            .ok_or(Error::IndexOutOfRange { index, len })?;
        let backup = item.clone();

        if let Err(err) = edit(item).and_then(|()| self.commit()) {
            self.swap(index, backup)?;
            propagate(&mut self.items, self.defaults);
            return Err(err);
        }
        Ok(())
    }

    /// Frame context assumed before the first SOF or DHP segment.
    pub fn default_context(&self) -> FrameContext {
        self.defaults
    }

    /// Set the frame mode assumed before the first SOF segment.
    pub fn set_default_frame_mode(&mut self, frame_mode: Option<FrameMode>) -> Result<(), Error> {
        self.set_defaults(FrameContext {
            frame_mode,
            ..self.defaults
        })
    }

    /// Set whether the document is hierarchical before any DHP segment.
    pub fn set_default_hierarchical(&mut self, hierarchical: bool) -> Result<(), Error> {
        self.set_defaults(FrameContext {
            hierarchical,
            ..self.defaults
        })
    }

    fn set_defaults(&mut self, defaults: FrameContext) -> Result<(), Error> {
        let previous = std::mem::replace(&mut self.defaults, defaults);
        if let Err(err) = self.commit() {
            self.defaults = previous;
            propagate(&mut self.items, self.defaults);
            return Err(err);
        }
        Ok(())
    }

    /// Data mode.
    pub fn data_mode(&self) -> DataMode {
        self.data_mode
    }

    /// Switch the data mode of the document and every item.
    ///
    /// Switching to strict fails, changing nothing, if any item carries
    /// passthrough bytes or a violation.
    pub fn set_data_mode(&mut self, data_mode: DataMode) -> Result<(), Error> {
        if data_mode.is_strict() {
            if let Some(err) = self.items.iter().find_map(Item::strict_blocker) {
                return Err(err);
            }
        }

        for item in &mut self.items {
            item.set_data_mode(data_mode)?;
        }
        self.data_mode = data_mode;
        Ok(())
    }

    /// Every problem in the document.
    ///
    /// Combines the problems recorded on each item while parsing, a fresh
    /// check of every field against the item's current context, and
    /// document structure checks. Never fails.
    pub fn validate(&self) -> Vec<Problem> {
        let mut problems: Vec<Problem> = self
            .items
            .iter()
            .enumerate()
            .flat_map(|(index, item)| {
                item.validate().into_iter().map(move |error| Problem {
                    index: Some(index),
                    error,
                })
            })
            .collect();

        if self.items.first().and_then(Item::code) != Some(MarkerCode::SOI) {
            problems.push(Problem {
                index: None,
                error: Error::format("document does not start with SOI"),
            });
        }

        if self.find(MarkerCode::EOI).next().is_none() {
            problems.push(Problem {
                index: None,
                error: Error::format("document has no EOI"),
            });
        }

        let first_dhp = self.find(MarkerCode::DHP).next().map(|(index, _)| index);
        for (index, _) in self.find(MarkerCode::EXP) {
            if first_dhp.is_none_or(|dhp| dhp > index) {
                problems.push(Problem {
                    index: Some(index),
                    error: Error::format("EXP without a preceding DHP"),
                });
            }
        }

        problems
    }

    /// Drop the passthrough bytes of every segment; see
    /// [`ParamSegment::clear_passthrough`].
    ///
    /// Returns the number of bytes dropped.
    pub fn clear_passthrough(&mut self) -> usize {
        self.items
            .iter_mut()
            .filter_map(Item::as_segment_mut)
            .map(|segment| segment.clear_passthrough().len())
            .sum()
    }

    /// Number of bytes [`write_to()`](Self::write_to) produces.
    pub fn disk_size(&self) -> usize {
        self.items.iter().map(Item::disk_size).sum()
    }

    /// Write every item in order.
    pub fn write_to(&self, to: &mut dyn Write) -> Result<(), Error> {
        for item in &self.items {
            item.write_to(to)?;
        }
        Ok(())
    }

    /// Write the document into a new buffer.
    pub fn to_vec(&self) -> Result<Vec<u8>, Error> {
        let mut out = Vec::with_capacity(self.disk_size());
        self.write_to(&mut out)?;
        Ok(out)
    }

    /// Read every deferred payload into memory, releasing the references
    /// to the source.
    pub fn force_content_loading(&mut self) -> Result<(), Error> {
        for item in &mut self.items {
            item.load()?;
        }
        Ok(())
    }

    fn check_index(&self, index: usize) -> Result<(), Error> {
        if index < self.items.len() {
            Ok(())
        } else {
            Err(Error::IndexOutOfRange {
                index,
                len: self.items.len(),
            })
        }
    }

    fn swap(&mut self, index: usize, item: Item) -> Result<Item, Error> {
        let len = self.items.len();
        let slot = self
            .items
            .get_mut(index)
            .ok_or(Error::IndexOutOfRange { index, len })?;
        Ok(std::mem::replace(slot, item))
    }

    fn adopt(&mut self, index: usize) -> Result<(), Error> {
        let data_mode = self.data_mode;
        let len = self.items.len();
        self.items
            .get_mut(index)
            .ok_or(Error::IndexOutOfRange { index, len })?
            .set_data_mode(data_mode)
    }

    fn commit(&mut self) -> Result<(), Error> {
        propagate(&mut self.items, self.defaults);
        if self.data_mode.is_strict() {
            if let Some(err) = self.items.iter().find_map(Item::strict_blocker) {
                return Err(err);
            }
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = &'a Item;
    type IntoIter = std::slice::Iter<'a, Item>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

fn first_problem(items: &[Item]) -> Result<(), Error> {
    match items.iter().find_map(|item| item.validate().into_iter().next()) {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// Length of the entropy-coded data at the front of `buf`, and whether the
/// data ends within `buf`.
///
/// Data ends at a `0xFF` that is not followed by `0x00`. A `0xFF` in the
/// last position of a full buffer is left for the next read.
fn entropy_extent(buf: &[u8], at_eof: bool) -> (usize, bool) {
    let mut i = 0;
    while i < buf.len() {
        if buf[i] == 0xFF {
            match buf.get(i + 1) {
                Some(0x00) => {
                    i += 2;
                    continue;
                }
                Some(_) => return (i, true),
                None => return (i, at_eof),
            }
        }
        i += 1;
    }
    (buf.len(), at_eof)
}

struct Parser<'a> {
    source: &'a mut dyn ReadAndSeek,
    shared: Option<&'a Rc<RefCell<dyn ReadAndSeek>>>,
    options: &'a ParseOptions,
    context: FrameContext,
    in_scan: bool,
    items: Vec<Item>,
}

impl Parser<'_> {
    fn run(&mut self) -> Result<(), Error> {
        let mut byte = [0u8; 1];

        loop {
            let start = self.source.stream_position()?;
            if fill(&mut *self.source, &mut byte)? == 0 {
                return Ok(());
            }

            if byte[0] != 0xFF {
                self.source.seek(SeekFrom::Start(start))?;
                self.capture_entropy()?;
                continue;
            }

            let mut fill_count = 0usize;
            let code = loop {
                if fill(&mut *self.source, &mut byte)? == 0 {
                    break None;
                }
                if byte[0] != 0xFF {
                    break Some(byte[0]);
                }
                fill_count += 1;
            };

            let Some(code) = code else {
                return self.trailing_fill(fill_count + 1);
            };

            if fill_count > 0 {
                self.push(Padding::with_problem(fill_count, self.options.data_mode, None).into());
            }

            if code == 0x00 {
                self.source
                    .seek(SeekFrom::Start(start + fill_count as u64))?;
                self.capture_entropy()?;
                continue;
            }

            let item = self.dispatch(MarkerCode(code))?;
            self.push(item);
        }
    }

    fn push(&mut self, item: Item) {
        if let Some(mode) = item.introduced_frame_mode() {
            self.context.frame_mode = Some(mode);
        }

        match &item {
            Item::Segment(s) => self.in_scan = s.code() == MarkerCode::SOS,
            Item::Marker(m) => self.in_scan = self.in_scan && m.code().is_restart(),
            Item::EntropyData(_) | Item::Padding(_) => {}
        }

        self.items.push(item);
    }

    fn dispatch(&mut self, code: MarkerCode) -> Result<Item, Error> {
        let options = self.options;
        let after_code = self.source.stream_position()?;
        let mut rejection = Error::UnknownMarker(code);

        for variant in options.registry.candidates(code) {
            self.source.seek(SeekFrom::Start(after_code))?;
            let mut ctx = ParseContext::new(
                &mut *self.source,
                self.shared,
                options.defer_threshold,
                options.data_mode,
                self.context,
            );

            match variant.parse(code, &mut ctx) {
                Ok(item) => {
                    tracing::debug!(marker = %code, variant = variant.name(), "parsed");
                    return Ok(item);
                }
                Err(err @ Error::IoError(_)) => return Err(err),
                Err(err) => {
                    tracing::debug!(marker = %code, variant = variant.name(), %err, "candidate rejected");
                    rejection = err;
                }
            }
        }

        self.source.seek(SeekFrom::Start(after_code))?;
        self.fallback(code, rejection)
    }

    fn fallback(&mut self, code: MarkerCode, rejection: Error) -> Result<Item, Error> {
        let data_mode = self.options.data_mode;

        // In lax mode a segment whose fields run past its declared length
        // keeps that extent verbatim, whatever the fallback policy.
        let short_segment =
            !data_mode.is_strict() && rejection.kind() == ErrorKind::LimitExceeded;

        if !code.has_length() || (self.options.fallback == Fallback::Error && !short_segment) {
            return Err(rejection);
        }

        let mut ctx = ParseContext::new(
            &mut *self.source,
            self.shared,
            self.options.defer_threshold,
            data_mode,
            self.context,
        );
        let mut segment = ParamSegment::<Opaque>::read(code, &mut ctx)?;

        if data_mode.is_strict() {
            tracing::debug!(marker = %code, %rejection, "captured as opaque segment");
        } else {
            tracing::warn!(marker = %code, %rejection, "captured as opaque segment");
            segment.record(rejection);
        }

        Ok(segment.into())
    }

    fn capture_entropy(&mut self) -> Result<(), Error> {
        let data = self.read_entropy()?;
        let data_mode = self.options.data_mode;

        let problem = (!self.in_scan).then(|| {
            Error::format(format!(
                "{} byte(s) of entropy-coded data outside a scan",
                data.len()
            ))
        });

        if let Some(problem) = &problem {
            if data_mode.is_strict() {
                return Err(problem.clone());
            }
            tracing::warn!(%problem, "entropy-coded data accepted with problem");
        }

        self.push(EntropyData::with_problem(data, data_mode, problem).into());
        Ok(())
    }

    fn read_entropy(&mut self) -> Result<InputData, Error> {
        let start = self.source.stream_position()?;
        let deferral = self.shared.zip(self.options.defer_threshold);

        let mut bytes = vec![];
        let mut len = 0usize;
        let mut chunk = vec![0u8; CHUNK_SIZE];

        loop {
            let n = fill(&mut *self.source, &mut chunk)?;
            let (used, done) = entropy_extent(&chunk[..n], n < CHUNK_SIZE);

            if deferral.is_none() {
                bytes.extend_from_slice(&chunk[..used]);
            }
            len += used;
            self.source.seek(SeekFrom::Start(start + len as u64))?;

            if done {
                break;
            }
        }

        match deferral {
            Some((shared, threshold)) if len > threshold => Ok(InputData::Lazy(InputSlice::new(
                Rc::clone(shared),
                start,
                len,
            ))),
            Some(_) => {
                self.source.seek(SeekFrom::Start(start))?;
                let mut bytes = vec![0u8; len];
                self.source.read_exact(&mut bytes)?;
                Ok(bytes.into())
            }
            None => Ok(bytes.into()),
        }
    }

    fn trailing_fill(&mut self, count: usize) -> Result<(), Error> {
        let problem = Error::SourceExhausted {
            requested: 1,
            consumed: 0,
        };

        if self.options.data_mode.is_strict() {
            return Err(problem);
        }

        tracing::warn!(count, %problem, "fill bytes at end of input");
        self.push(Padding::with_problem(count, DataMode::Lax, Some(problem)).into());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::unwrap_used)]

    use std::{cell::RefCell, io::Cursor, rc::Rc};

    use hex_literal::hex;
    use pretty_assertions_sorted::assert_eq;

    use crate::{
        document::entropy_extent,
        registry::{Registry, Variant},
        segment::{ExpandReference, FrameComponent, FrameHeader, ParamSegment, Segment},
        DataMode, Document, Error, ErrorKind, Fallback, FrameMode, Item, MarkerCode,
        MarkerCodes, ParseOptions, Problem,
    };

    const BASELINE: [u8; 157] = hex!(
        "ffd8" // SOI
        "ffe0" "0010" "4a46494600" "0101" "00" "0001" "0001" "00" "00" // JFIF
        "ffdb" "0043" "00" // DQT
        "10101010101010101010101010101010"
        "10101010101010101010101010101010"
        "10101010101010101010101010101010"
        "10101010101010101010101010101010"
        "ffc0" "000b" "08" "0010" "0010" "01" "011100" // SOF0
        "ffc4" "001f" "00" // DHT
        "00010501010101010100000000000000"
        "000102030405060708090a0b"
        "ffda" "0008" "01" "0100" "00" "3f" "00" // SOS
        "1234ff0056" // entropy-coded data
        "ffd0" // RST0
        "789a" // entropy-coded data
        "ff" // fill byte
        "ffd9" // EOI
    );

    #[test]
    fn baseline_round_trip() {
        let doc = Document::from_slice(&BASELINE).unwrap();

        let names: Vec<String> = doc
            .iter()
            .map(|item| match item {
                Item::Marker(m) => format!("{}", m.code()),
                Item::Segment(s) => s.name().to_string(),
                Item::EntropyData(e) => format!("data({})", e.data().len()),
                Item::Padding(p) => format!("fill({})", p.count()),
            })
            .collect();

        assert_eq!(
            names,
            vec![
                "SOI", "JFIF", "DQT", "SOF", "DHT", "SOS", "data(5)", "RST0", "data(2)",
                "fill(1)", "EOI"
            ]
        );

        for item in &doc {
            assert_eq!(item.frame_mode(), Some(FrameMode::Baseline));
            assert!(!item.is_hierarchical());
        }

        assert!(doc.validate().is_empty());
        assert_eq!(doc.disk_size(), BASELINE.len());
        assert_eq!(doc.to_vec().unwrap(), BASELINE.to_vec());
    }

    #[test]
    fn queries() {
        let doc = Document::from_slice(&BASELINE).unwrap();

        assert_eq!(doc.segments().count(), 5);
        assert_eq!(
            doc.find(MarkerCode::SOS).map(|(i, _)| i).collect::<Vec<_>>(),
            vec![5]
        );
        assert!(doc.find(MarkerCode::DRI).next().is_none());
        assert_eq!(doc.get(11), None);
    }

    #[test]
    fn entropy_extent_edges() {
        assert_eq!(entropy_extent(&hex!("12ff0034ffd9"), true), (4, true));
        assert_eq!(entropy_extent(&hex!("12ffff"), true), (1, true));
        assert_eq!(entropy_extent(&hex!("1234ff"), false), (2, false));
        assert_eq!(entropy_extent(&hex!("1234ff"), true), (2, true));
        assert_eq!(entropy_extent(&hex!("1234"), false), (2, false));
    }

    #[test]
    fn long_entropy_data_spans_chunks() {
        let mut jpeg = hex!("ffd8 ffda 0008 01 0100 00 3f 00").to_vec();
        let data: Vec<u8> = (0..10_000u32)
            .map(|i| if i % 4095 == 0 { 0xFF } else { 0x00 })
            .collect();
        jpeg.extend_from_slice(&data);
        jpeg.extend_from_slice(&hex!("ffd9"));

        let doc = Document::from_slice(&jpeg).unwrap();
        assert_eq!(doc.len(), 4);
        assert_eq!(doc.get(2).unwrap().disk_size(), data.len());
        assert_eq!(doc.to_vec().unwrap(), jpeg);
    }

    #[test]
    fn padding_and_stuffing() {
        let jpeg = hex!("ffd8 ffffff d9");
        let doc = Document::from_slice(&jpeg).unwrap();
        assert_eq!(doc.len(), 3);
        assert!(matches!(doc.get(1), Some(Item::Padding(p)) if p.count() == 2));
        assert_eq!(doc.to_vec().unwrap(), jpeg.to_vec());

        // 0xFF 0x00 where a marker is expected.
        let jpeg = hex!("ffd8 ff0012 ffd9");
        let err = Document::from_slice(&jpeg).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FormatViolation);

        let doc = Document::from_slice_with_options(&jpeg, &ParseOptions::lax()).unwrap();
        assert_eq!(doc.len(), 3);
        assert_eq!(doc.get(1).unwrap().problems().len(), 1);
        assert_eq!(doc.to_vec().unwrap(), jpeg.to_vec());
    }

    #[test]
    fn trailing_fill_byte() {
        let jpeg = hex!("ffd8 ffd9 ff");
        assert_eq!(
            Document::from_slice(&jpeg).unwrap_err(),
            Error::SourceExhausted {
                requested: 1,
                consumed: 0
            }
        );

        let doc = Document::from_slice_with_options(&jpeg, &ParseOptions::lax()).unwrap();
        assert_eq!(doc.len(), 3);
        assert!(matches!(doc.get(2), Some(Item::Padding(p)) if p.count() == 1));
        assert_eq!(doc.validate().len(), 1);
        assert_eq!(doc.to_vec().unwrap(), jpeg.to_vec());
    }

    #[test]
    fn short_segment_does_not_swallow_next_segment() {
        // JFIF declares a 1x1 thumbnail but its length leaves no room for it.
        let jpeg = hex!(
            "ffd8"
            "ffe0 0010 4a46494600 0101 00 0001 0001 01 01"
            "ffdd 0004 0010"
            "ffd9"
        );

        for options in [ParseOptions::strict(), ParseOptions::lax()] {
            let doc = Document::from_slice_with_options(&jpeg, &options).unwrap();
            assert_eq!(doc.len(), 4);
            assert!(matches!(doc.get(1), Some(Item::Segment(Segment::App(_)))));
            assert!(matches!(
                doc.get(2),
                Some(Item::Segment(Segment::RestartInterval(dri))) if dri.payload().interval == 0x10
            ));
            assert_eq!(doc.get(3).and_then(Item::code), Some(MarkerCode::EOI));
            assert!(doc.validate().is_empty());
            assert_eq!(doc.to_vec().unwrap(), jpeg.to_vec());
        }
    }

    #[test]
    fn strict_fallback_to_opaque() {
        // DRI declares a 1-byte payload.
        let jpeg = hex!("ffd8 ffdd 0003 00 ffd9");
        assert_eq!(
            Document::from_slice(&jpeg).unwrap_err().kind(),
            ErrorKind::LimitExceeded
        );

        let options = ParseOptions::strict().with_fallback(Fallback::Opaque);
        let doc = Document::from_slice_with_options(&jpeg, &options).unwrap();
        assert!(matches!(doc.get(1), Some(Item::Segment(Segment::Opaque(_)))));
        assert!(doc.validate().is_empty());
        assert_eq!(doc.to_vec().unwrap(), jpeg.to_vec());
    }

    #[test]
    fn lax_fallback_records_rejection() {
        let registry = Registry::new().with(Variant::marker(
            "marker",
            MarkerCodes::Range(MarkerCode::SOI, MarkerCode::EOI),
        ));
        let jpeg = hex!("ffd8 ffe1 0004 abcd ffd9");

        let err = Document::from_slice_with_options(
            &jpeg,
            &ParseOptions::strict().with_registry(registry.clone()),
        )
        .unwrap_err();
        assert_eq!(err, Error::UnknownMarker(MarkerCode::app(1)));

        let options = ParseOptions::lax()
            .with_registry(registry)
            .with_fallback(Fallback::Opaque);
        let doc = Document::from_slice_with_options(&jpeg, &options).unwrap();
        assert_eq!(
            doc.validate(),
            vec![Problem {
                index: Some(1),
                error: Error::UnknownMarker(MarkerCode::app(1))
            }]
        );
        assert_eq!(doc.to_vec().unwrap(), jpeg.to_vec());
    }

    #[test]
    fn data_mode_switch_is_transactional() {
        let jpeg = hex!("ffd8 ffdd 0006 0010 abcd ffd9");
        let mut doc = Document::from_slice_with_options(&jpeg, &ParseOptions::lax()).unwrap();

        assert_eq!(
            doc.set_data_mode(DataMode::Strict),
            Err(Error::PassthroughPresent(2))
        );
        assert_eq!(doc.data_mode(), DataMode::Lax);
        assert!(doc.iter().all(|item| item.data_mode() == DataMode::Lax));

        assert_eq!(doc.clear_passthrough(), 2);
        doc.set_data_mode(DataMode::Strict).unwrap();
        assert!(doc.iter().all(|item| item.data_mode() == DataMode::Strict));
        assert_eq!(doc.to_vec().unwrap(), hex!("ffd8 ffdd 0004 0010 ffd9").to_vec());
    }

    #[test]
    fn deferred_payloads() {
        let jpeg = hex!(
            "ffd8"
            "ffe1" "000b" "457869660000" "010203" // APP1
            "ffda" "0008" "01" "0100" "00" "3f" "00" // SOS
            "0102030405"
            "ffd9"
        );
        let source = Rc::new(RefCell::new(Cursor::new(jpeg.to_vec())));

        let options = ParseOptions::strict().with_defer_threshold(4);
        let mut doc = Document::from_reader_with_options(source.clone(), &options).unwrap();
        assert_eq!(doc.len(), 5);

        let Some(Item::Segment(Segment::App(app))) = doc.get(1) else {
            panic!("expected APP1");
        };
        assert!(app.payload().data.is_lazy());
        assert_eq!(app.identifier(), None);

        let Some(Item::EntropyData(data)) = doc.get(3) else {
            panic!("expected entropy-coded data");
        };
        assert!(data.data().is_lazy());

        assert_eq!(doc.to_vec().unwrap(), jpeg.to_vec());

        doc.force_content_loading().unwrap();
        let Some(Item::Segment(Segment::App(app))) = doc.get(1) else {
            panic!("expected APP1");
        };
        assert_eq!(app.identifier(), Some(&b"Exif"[..]));
        assert_eq!(doc.to_vec().unwrap(), jpeg.to_vec());
    }

    #[test]
    fn busy_source() {
        let source = Rc::new(RefCell::new(Cursor::new(hex!("ffd8ffd9").to_vec())));
        let _guard = source.borrow_mut();
        assert_eq!(
            Document::from_reader(source.clone()).unwrap_err().kind(),
            ErrorKind::Io
        );
    }

    fn dhp() -> Item {
        ParamSegment::new(
            MarkerCode::DHP,
            FrameHeader {
                precision: 8,
                lines: 16,
                samples_per_line: 16,
                components: vec![FrameComponent {
                    id: 1,
                    horizontal: 1,
                    vertical: 1,
                    table: 0,
                }],
            },
        )
        .unwrap()
        .into()
    }

    fn exp() -> Item {
        ParamSegment::with_data_mode(
            MarkerCode::EXP,
            ExpandReference {
                horizontal: 1,
                vertical: 1,
            },
            DataMode::Lax,
        )
        .unwrap()
        .into()
    }

    #[test]
    fn edits_repropagate() {
        let mut doc = Document::from_slice(&BASELINE).unwrap();
        assert!(doc.iter().all(|item| !item.is_hierarchical()));

        // DHP reaches back to the start but not past itself.
        doc.insert(3, dhp()).unwrap();
        assert_eq!(doc.len(), 12);
        assert!(doc.items()[..=3].iter().all(Item::is_hierarchical));
        assert!(doc.items()[4..].iter().all(|item| !item.is_hierarchical()));

        doc.set_default_hierarchical(true).unwrap();
        assert!(doc.iter().all(Item::is_hierarchical));
        doc.set_default_hierarchical(false).unwrap();

        doc.insert(4, exp()).unwrap();
        assert_eq!(doc.get(4).unwrap().data_mode(), DataMode::Strict);
        assert!(doc.validate().is_empty());

        doc.remove(3).unwrap();
        assert!(doc.iter().all(|item| !item.is_hierarchical()));
        assert_eq!(
            doc.validate(),
            vec![Problem {
                index: Some(3),
                error: Error::format("EXP without a preceding DHP"),
            }]
        );

        doc.remove(3).unwrap();
        assert_eq!(doc.to_vec().unwrap(), BASELINE.to_vec());

        assert!(doc.insert(20, dhp()).is_err());
        assert!(doc.remove(20).is_err());
    }

    #[test]
    fn edit_and_replace() {
        let mut doc = Document::from_slice(&BASELINE).unwrap();

        // Precision 16 is out of range for a baseline frame.
        let err = doc
            .edit(3, |item| {
                let Some(Segment::Frame(sof)) = item.as_segment_mut() else {
                    panic!("expected SOF");
                };
                sof.set_precision(16)
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BoundsViolation);

        let old = doc.replace(3, dhp()).unwrap();
        assert_eq!(old.code(), Some(MarkerCode::SOF0));
        assert!(doc.items()[..=3].iter().all(Item::is_hierarchical));
        assert!(!doc.get(4).unwrap().is_hierarchical());
        assert_eq!(doc.get(5).unwrap().frame_mode(), None);

        doc.replace(3, old).unwrap();
        assert_eq!(doc.to_vec().unwrap(), BASELINE.to_vec());
    }

    #[test]
    fn default_modes() {
        let jpeg = hex!("ffd8 ffdd 0004 0010 ffd9");
        let options = ParseOptions::strict().with_default_frame_mode(Some(FrameMode::Lossless));
        let mut doc = Document::from_slice_with_options(&jpeg, &options).unwrap();
        assert_eq!(doc.get(1).unwrap().frame_mode(), Some(FrameMode::Lossless));

        doc.set_default_hierarchical(true).unwrap();
        assert!(doc.iter().all(Item::is_hierarchical));
        assert!(doc.default_context().hierarchical);

        doc.set_default_frame_mode(None).unwrap();
        assert_eq!(doc.get(1).unwrap().frame_mode(), None);
    }

    #[test]
    fn structure_problems() {
        let mut doc = Document::new(DataMode::Lax);
        assert_eq!(doc.validate().len(), 2);

        doc.push(dhp()).unwrap();
        assert_eq!(
            doc.validate()[0].to_string(),
            "document: format violation: document does not start with SOI"
        );
    }
}
