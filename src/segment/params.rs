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

//! Fixed-size parameter segments: DRI, DNL, and EXP.

use std::io::{Read, Write};

use crate::{
    bounds,
    io::BoundedReader,
    segment::{
        pack_nibbles, ExpandSegment, NumberOfLinesSegment, ParamSegment, RestartIntervalSegment,
        Segment, SegmentPayload,
    },
    Error, FrameContext, MarkerCode, MarkerCodes,
};

/// DRI payload (B.2.4.4).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RestartInterval {
    /// Ri: number of MCUs per restart interval; 0 disables restarts.
    pub interval: u16,
}

impl SegmentPayload for RestartInterval {
    const CODES: MarkerCodes = MarkerCodes::Single(MarkerCode::DRI);

    fn read<R: Read + ?Sized>(
        _code: MarkerCode,
        reader: &mut BoundedReader<'_, R>,
    ) -> Result<Self, Error> {
        Ok(Self {
            interval: reader.read_u16()?,
        })
    }

    fn payload_size(&self) -> usize {
        2
    }

    fn write_payload(&self, to: &mut dyn Write) -> Result<(), Error> {
        to.write_all(&self.interval.to_be_bytes())?;
        Ok(())
    }

    fn validate(&self, _code: MarkerCode, context: FrameContext, results: &mut Vec<Error>) {
        bounds::RESTART_INTERVAL.accumulate(self.interval.into(), context, results);
    }

    fn wrap(segment: ParamSegment<Self>) -> Segment {
        Segment::RestartInterval(segment)
    }
}

impl RestartIntervalSegment {
    /// Set Ri.
    pub fn set_interval(&mut self, interval: u16) -> Result<(), Error> {
        self.check(&bounds::RESTART_INTERVAL, interval)?;
        self.payload_mut().interval = interval;
        Ok(())
    }
}

/// DNL payload (B.2.5).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct NumberOfLines {
    /// NL: number of lines in the frame.
    pub lines: u16,
}

impl SegmentPayload for NumberOfLines {
    const CODES: MarkerCodes = MarkerCodes::Single(MarkerCode::DNL);

    fn read<R: Read + ?Sized>(
        _code: MarkerCode,
        reader: &mut BoundedReader<'_, R>,
    ) -> Result<Self, Error> {
        Ok(Self {
            lines: reader.read_u16()?,
        })
    }

    fn payload_size(&self) -> usize {
        2
    }

    fn write_payload(&self, to: &mut dyn Write) -> Result<(), Error> {
        to.write_all(&self.lines.to_be_bytes())?;
        Ok(())
    }

    fn validate(&self, _code: MarkerCode, context: FrameContext, results: &mut Vec<Error>) {
        bounds::LINE_COUNT.accumulate(self.lines.into(), context, results);
    }

    fn wrap(segment: ParamSegment<Self>) -> Segment {
        Segment::NumberOfLines(segment)
    }
}

impl NumberOfLinesSegment {
    /// Set NL.
    pub fn set_lines(&mut self, lines: u16) -> Result<(), Error> {
        self.check(&bounds::LINE_COUNT, lines)?;
        self.payload_mut().lines = lines;
        Ok(())
    }
}

/// EXP payload (B.3.3).
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ExpandReference {
    /// Eh: expand horizontally by a factor of two.
    pub horizontal: u8,

    /// Ev: expand vertically by a factor of two.
    pub vertical: u8,
}

impl SegmentPayload for ExpandReference {
    const CODES: MarkerCodes = MarkerCodes::Single(MarkerCode::EXP);

    fn read<R: Read + ?Sized>(
        _code: MarkerCode,
        reader: &mut BoundedReader<'_, R>,
    ) -> Result<Self, Error> {
        let (horizontal, vertical) = reader.read_nibbles()?;
        Ok(Self {
            horizontal,
            vertical,
        })
    }

    fn payload_size(&self) -> usize {
        1
    }

    fn write_payload(&self, to: &mut dyn Write) -> Result<(), Error> {
        to.write_all(&[pack_nibbles("Eh|Ev", self.horizontal, self.vertical)?])?;
        Ok(())
    }

    fn validate(&self, _code: MarkerCode, context: FrameContext, results: &mut Vec<Error>) {
        bounds::EXPAND_FACTOR.accumulate(self.horizontal.into(), context, results);
        bounds::EXPAND_FACTOR.accumulate(self.vertical.into(), context, results);
    }

    fn wrap(segment: ParamSegment<Self>) -> Segment {
        Segment::Expand(segment)
    }
}

impl ExpandSegment {
    /// Set Eh and Ev.
    pub fn set_expansion(&mut self, horizontal: u8, vertical: u8) -> Result<(), Error> {
        self.check(&bounds::EXPAND_FACTOR, horizontal)?;
        self.check(&bounds::EXPAND_FACTOR, vertical)?;
        let payload = self.payload_mut();
        payload.horizontal = horizontal;
        payload.vertical = vertical;
        Ok(())
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
        segment::{ExpandReference, NumberOfLines, ParamSegment, RestartInterval, Segment},
        Document, Error, Item, MarkerCode, Problem,
    };

    #[test]
    fn set_interval() {
        let mut dri = ParamSegment::new(MarkerCode::DRI, RestartInterval { interval: 0 }).unwrap();
        dri.set_interval(320).unwrap();
        assert_eq!(dri.payload().interval, 320);
    }

    #[test]
    fn dnl_rejects_zero_lines() {
        assert!(ParamSegment::new(MarkerCode::DNL, NumberOfLines { lines: 0 }).is_err());

        let mut dnl = ParamSegment::new(MarkerCode::DNL, NumberOfLines { lines: 8 }).unwrap();
        assert!(dnl.set_lines(0).is_err());
        assert_eq!(dnl.payload().lines, 8);
    }

    #[test]
    fn set_expansion() {
        let mut exp = ParamSegment::new(
            MarkerCode::EXP,
            ExpandReference {
                horizontal: 1,
                vertical: 1,
            },
        )
        .unwrap();

        assert!(exp.set_expansion(2, 0).is_err());
        assert_eq!(exp.payload().horizontal, 1);
        exp.set_expansion(0, 1).unwrap();

        let mut out = vec![];
        exp.write_to(&mut out).unwrap();
        assert_eq!(out, hex!("ffdf 0003 01").to_vec());
    }

    #[test]
    fn exp_needs_earlier_dhp() {
        let jpeg = hex!(
            "ffd8"
            "ffde" "000b" "08" "0010" "0010" "01" "011100" // DHP
            "ffdf" "0003" "11" // EXP
            "ffd9"
        );

        let doc = Document::from_slice(&jpeg).unwrap();
        let Some(Item::Segment(Segment::Expand(exp))) = doc.get(2) else {
            panic!("expected EXP");
        };
        assert!(!exp.context().hierarchical);
        assert!(doc.get(1).unwrap().is_hierarchical());
        assert_eq!(exp.payload().horizontal, 1);
        assert!(doc.validate().is_empty());
        assert_eq!(doc.to_vec().unwrap(), jpeg.to_vec());

        let jpeg = hex!("ffd8 ffdf 0003 11 ffd9");
        let doc = Document::from_slice(&jpeg).unwrap();
        assert_eq!(
            doc.validate(),
            vec![Problem {
                index: Some(1),
                error: Error::format("EXP without a preceding DHP"),
            }]
        );
    }
}
