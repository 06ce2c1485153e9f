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

use std::io::Write;

use crate::{
    io::InputData,
    segment::{ParamSegment, Segment, SegmentPayload},
    DataMode, Error, FrameContext, FrameMode, MarkerCode,
};

/// One element of a [`Document`]: a marker, a segment, a run of
/// entropy-coded bytes, or a run of fill bytes.
///
/// Every item writes back exactly the bytes it was parsed from.
///
/// [`Document`]: crate::Document
#[derive(Clone, Debug, PartialEq)]
pub enum Item {
    /// A marker without a length or payload.
    Marker(Marker),

    /// A length-prefixed marker segment.
    Segment(Segment),

    /// Entropy-coded scan data.
    EntropyData(EntropyData),

    /// Fill bytes (`0xFF`) preceding a marker.
    Padding(Padding),
}

macro_rules! each_item {
    ($item:expr, $i:ident => $body:expr) => {
        match $item {
            Item::Marker($i) => $body,
            Item::Segment($i) => $body,
            Item::EntropyData($i) => $body,
            Item::Padding($i) => $body,
        }
    };
}

impl Item {
    /// Marker code, for markers and segments.
    pub fn code(&self) -> Option<MarkerCode> {
        match self {
            Self::Marker(m) => Some(m.code),
            Self::Segment(s) => Some(s.code()),
            Self::EntropyData(_) | Self::Padding(_) => None,
        }
    }

    /// Number of bytes [`write_to()`](Self::write_to) produces.
    pub fn disk_size(&self) -> usize {
        each_item!(self, i => i.disk_size())
    }

    /// Write the item's exact encoding.
    pub fn write_to(&self, to: &mut dyn Write) -> Result<(), Error> {
        each_item!(self, i => i.write_to(to))
    }

    /// Frame and hierarchical mode in effect for this item.
    pub fn context(&self) -> FrameContext {
        each_item!(self, i => i.context())
    }

    /// Frame mode in effect for this item, if known.
    pub fn frame_mode(&self) -> Option<FrameMode> {
        self.context().frame_mode
    }

    /// Returns `true` if this item belongs to a hierarchical image.
    pub fn is_hierarchical(&self) -> bool {
        self.context().hierarchical
    }

    pub(crate) fn set_context(&mut self, context: FrameContext) {
        match self {
            Self::Segment(s) => s.set_context(context),
            _ => *self.context_mut() = context,
        }
    }

    pub(crate) fn context_mut(&mut self) -> &mut FrameContext {
        match self {
            Self::Marker(m) => &mut m.context,
            Self::Segment(s) => s.context_mut(),
            Self::EntropyData(e) => &mut e.context,
            Self::Padding(p) => &mut p.context,
        }
    }

    /// Data mode.
    pub fn data_mode(&self) -> DataMode {
        each_item!(self, i => i.data_mode())
    }

    /// Switch the data mode.
    ///
    /// Switching to strict fails, leaving the item unchanged, if it carries
    /// passthrough bytes or any recorded or current violation.
    pub fn set_data_mode(&mut self, data_mode: DataMode) -> Result<(), Error> {
        each_item!(self, i => i.set_data_mode(data_mode))
    }

    /// Problems recorded while parsing.
    pub fn problems(&self) -> &[Error] {
        match self {
            Self::Marker(_) => &[],
            Self::Segment(s) => s.problems(),
            Self::EntropyData(e) => &e.problems,
            Self::Padding(p) => &p.problems,
        }
    }

    /// Recorded problems followed by a fresh check of every field against
    /// the item's current context.
    pub fn validate(&self) -> Vec<Error> {
        each_item!(self, i => i.validate())
    }

    /// The error [`set_data_mode(DataMode::Strict)`] would fail with.
    ///
    /// [`set_data_mode(DataMode::Strict)`]: Self::set_data_mode
    pub(crate) fn strict_blocker(&self) -> Option<Error> {
        if let Self::Segment(s) = self {
            if !s.passthrough().is_empty() {
                return Some(Error::PassthroughPresent(s.passthrough().len()));
            }
        }
        self.validate().into_iter().next()
    }

    /// Read any deferred bytes into memory.
    pub fn load(&mut self) -> Result<(), Error> {
        match self {
            Self::Segment(s) => s.load(),
            Self::EntropyData(e) => e.data.load(),
            Self::Marker(_) | Self::Padding(_) => Ok(()),
        }
    }

    /// The marker, if this item is one.
    pub fn as_marker(&self) -> Option<&Marker> {
        match self {
            Self::Marker(m) => Some(m),
            _ => None,
        }
    }

    /// The segment, if this item is one.
    pub fn as_segment(&self) -> Option<&Segment> {
        match self {
            Self::Segment(s) => Some(s),
            _ => None,
        }
    }

    /// Mutable access to the segment, if this item is one.
    pub fn as_segment_mut(&mut self) -> Option<&mut Segment> {
        match self {
            Self::Segment(s) => Some(s),
            _ => None,
        }
    }

    /// The entropy-coded data, if this item is one.
    pub fn as_entropy_data(&self) -> Option<&EntropyData> {
        match self {
            Self::EntropyData(e) => Some(e),
            _ => None,
        }
    }

    /// The padding run, if this item is one.
    pub fn as_padding(&self) -> Option<&Padding> {
        match self {
            Self::Padding(p) => Some(p),
            _ => None,
        }
    }

    /// Returns `true` for a DHP segment.
    pub fn is_dhp(&self) -> bool {
        matches!(self, Self::Segment(s) if s.is_dhp())
    }

    /// Frame mode introduced by this item, if it is an SOF segment.
    pub fn introduced_frame_mode(&self) -> Option<FrameMode> {
        match self {
            Self::Segment(s) => s.introduced_frame_mode(),
            _ => None,
        }
    }

    /// Returns `true` for entropy-coded data.
    pub fn is_entropy_data(&self) -> bool {
        matches!(self, Self::EntropyData(_))
    }
}

impl From<Segment> for Item {
    fn from(segment: Segment) -> Self {
        Self::Segment(segment)
    }
}

impl<P: SegmentPayload> From<ParamSegment<P>> for Item {
    fn from(segment: ParamSegment<P>) -> Self {
        Self::Segment(segment.into())
    }
}

impl From<Marker> for Item {
    fn from(marker: Marker) -> Self {
        Self::Marker(marker)
    }
}

impl From<EntropyData> for Item {
    fn from(data: EntropyData) -> Self {
        Self::EntropyData(data)
    }
}

impl From<Padding> for Item {
    fn from(padding: Padding) -> Self {
        Self::Padding(padding)
    }
}

/// A marker without a length or payload: SOI, EOI, TEM, or RSTn.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Marker {
    code: MarkerCode,
    context: FrameContext,
    data_mode: DataMode,
}

impl Marker {
    /// Create a marker.
    ///
    /// Fails if `code` is followed by a length on disk.
    pub fn new(code: MarkerCode) -> Result<Self, Error> {
        if code.has_length() {
            return Err(Error::format(format!("marker {code} requires a segment")));
        }

        Ok(Self {
            code,
            context: FrameContext::default(),
            data_mode: DataMode::Strict,
        })
    }

    /// Marker code.
    pub fn code(&self) -> MarkerCode {
        self.code
    }

    fn disk_size(&self) -> usize {
        2
    }

    fn write_to(&self, to: &mut dyn Write) -> Result<(), Error> {
        to.write_all(&[0xFF, self.code.0])?;
        Ok(())
    }

    fn context(&self) -> FrameContext {
        self.context
    }

    fn data_mode(&self) -> DataMode {
        self.data_mode
    }

    fn set_data_mode(&mut self, data_mode: DataMode) -> Result<(), Error> {
        self.data_mode = data_mode;
        Ok(())
    }

    fn validate(&self) -> Vec<Error> {
        vec![]
    }
}

/// Entropy-coded bytes, stored exactly as they appear in the file,
/// including stuffed `0xFF 0x00` pairs.
#[derive(Clone, Debug, PartialEq)]
pub struct EntropyData {
    data: InputData,
    context: FrameContext,
    data_mode: DataMode,
    problems: Vec<Error>,
}

impl EntropyData {
    /// Entropy-coded data holding `data` verbatim.
    pub fn new(data: impl Into<InputData>) -> Self {
        Self {
            data: data.into(),
            context: FrameContext::default(),
            data_mode: DataMode::Strict,
            problems: vec![],
        }
    }

    pub(crate) fn with_problem(
        data: InputData,
        data_mode: DataMode,
        problem: Option<Error>,
    ) -> Self {
        Self {
            data,
            context: FrameContext::default(),
            data_mode,
            problems: problem.into_iter().collect(),
        }
    }

    /// The bytes.
    pub fn data(&self) -> &InputData {
        &self.data
    }

    fn disk_size(&self) -> usize {
        self.data.len()
    }

    fn write_to(&self, to: &mut dyn Write) -> Result<(), Error> {
        self.data.write_to(to)
    }

    fn context(&self) -> FrameContext {
        self.context
    }

    fn data_mode(&self) -> DataMode {
        self.data_mode
    }

    fn set_data_mode(&mut self, data_mode: DataMode) -> Result<(), Error> {
        if data_mode.is_strict() {
            if let Some(problem) = self.validate().into_iter().next() {
                return Err(problem);
            }
        }
        self.data_mode = data_mode;
        Ok(())
    }

    fn validate(&self) -> Vec<Error> {
        let mut results = self.problems.clone();

        // Deferred data was scanned for markers while parsing.
        if let Some(bytes) = self.data.as_slice() {
            let unstuffed = bytes
                .iter()
                .enumerate()
                .find(|&(i, &b)| b == 0xFF && bytes.get(i + 1) != Some(&0x00))
                .map(|(i, _)| i);

            if let Some(offset) = unstuffed {
                results.push(Error::format(format!(
                    "entropy-coded data has an unstuffed 0xFF at offset {offset}"
                )));
            }
        }

        results
    }
}

/// A run of fill bytes (`0xFF`) preceding a marker.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Padding {
    count: usize,
    context: FrameContext,
    data_mode: DataMode,
    problems: Vec<Error>,
}

impl Padding {
    /// A run of `count` fill bytes.
    pub fn new(count: usize) -> Self {
        Self {
            count,
            context: FrameContext::default(),
            data_mode: DataMode::Strict,
            problems: vec![],
        }
    }

    pub(crate) fn with_problem(count: usize, data_mode: DataMode, problem: Option<Error>) -> Self {
        Self {
            count,
            context: FrameContext::default(),
            data_mode,
            problems: problem.into_iter().collect(),
        }
    }

    /// Number of fill bytes.
    pub fn count(&self) -> usize {
        self.count
    }

    fn disk_size(&self) -> usize {
        self.count
    }

    fn write_to(&self, to: &mut dyn Write) -> Result<(), Error> {
        to.write_all(&vec![0xFF; self.count])?;
        Ok(())
    }

    fn context(&self) -> FrameContext {
        self.context
    }

    fn data_mode(&self) -> DataMode {
        self.data_mode
    }

    fn set_data_mode(&mut self, data_mode: DataMode) -> Result<(), Error> {
        if data_mode.is_strict() {
            if let Some(problem) = self.validate().into_iter().next() {
                return Err(problem);
            }
        }
        self.data_mode = data_mode;
        Ok(())
    }

    fn validate(&self) -> Vec<Error> {
        let mut results = self.problems.clone();
        if self.count == 0 {
            results.push(Error::format("empty padding run"));
        }
        results
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
        segment::{ParamSegment, RestartInterval},
        DataMode, EntropyData, Error, FrameContext, FrameMode, Item, Marker, MarkerCode, Padding,
    };

    fn encode(item: &Item) -> Vec<u8> {
        let mut out = vec![];
        item.write_to(&mut out).unwrap();
        assert_eq!(out.len(), item.disk_size());
        out
    }

    #[test]
    fn markers() {
        let soi = Item::from(Marker::new(MarkerCode::SOI).unwrap());
        assert_eq!(soi.code(), Some(MarkerCode::SOI));
        assert_eq!(encode(&soi), hex!("ffd8").to_vec());

        let rst = Item::from(Marker::new(MarkerCode::rst(3)).unwrap());
        assert_eq!(encode(&rst), hex!("ffd3").to_vec());

        assert!(Marker::new(MarkerCode::DQT).is_err());
    }

    #[test]
    fn entropy_data() {
        let data = Item::from(EntropyData::new(hex!("12ff0034").to_vec()));
        assert_eq!(data.code(), None);
        assert!(data.is_entropy_data());
        assert_eq!(encode(&data), hex!("12ff0034").to_vec());
        assert!(data.validate().is_empty());

        let mut bad = Item::from(EntropyData::new(hex!("12ff34").to_vec()));
        assert_eq!(bad.validate().len(), 1);
        assert!(bad.set_data_mode(DataMode::Lax).is_ok());
        assert!(bad.set_data_mode(DataMode::Strict).is_err());
        assert_eq!(bad.data_mode(), DataMode::Lax);
    }

    #[test]
    fn padding() {
        let padding = Item::from(Padding::new(3));
        assert_eq!(encode(&padding), hex!("ffffff").to_vec());
        assert!(padding.validate().is_empty());

        let lone = Padding::with_problem(
            1,
            DataMode::Lax,
            Some(Error::SourceExhausted {
                requested: 1,
                consumed: 0,
            }),
        );
        assert_eq!(Item::from(lone).problems().len(), 1);
    }

    #[test]
    fn context_and_segments() {
        let mut dri = Item::from(
            ParamSegment::new(MarkerCode::DRI, RestartInterval { interval: 8 }).unwrap(),
        );
        assert_eq!(dri.code(), Some(MarkerCode::DRI));
        assert_eq!(dri.frame_mode(), None);
        assert!(dri.as_segment().is_some());
        assert!(dri.as_marker().is_none());

        dri.set_context(FrameContext::new(Some(FrameMode::Progressive)).hierarchical());
        assert_eq!(dri.frame_mode(), Some(FrameMode::Progressive));
        assert!(dri.is_hierarchical());
        assert_eq!(encode(&dri), hex!("ffdd 0004 0008").to_vec());
    }
}
