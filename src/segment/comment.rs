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
    borrow::Cow,
    fmt::{Debug, Formatter},
    io::{Read, Write},
};

use crate::{
    debug::DebugByteSlice,
    io::BoundedReader,
    segment::{CommentSegment, ParamSegment, Segment, SegmentPayload},
    Error, MarkerCode, MarkerCodes,
};

/// COM payload.
///
/// The bytes are kept exactly as found; no character encoding is assumed.
#[derive(Clone, Default, Eq, PartialEq)]
pub struct Comment {
    /// Comment bytes.
    pub data: Vec<u8>,
}

impl Comment {
    /// Comment holding the UTF-8 bytes of `text`.
    pub fn new(text: &str) -> Self {
        Self {
            data: text.as_bytes().to_vec(),
        }
    }

    /// The comment as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }
}

impl Debug for Comment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Comment")
            .field("data", &DebugByteSlice(&self.data))
            .finish()
    }
}

impl SegmentPayload for Comment {
    const CODES: MarkerCodes = MarkerCodes::Single(MarkerCode::COM);

    fn read<R: Read + ?Sized>(
        _code: MarkerCode,
        reader: &mut BoundedReader<'_, R>,
    ) -> Result<Self, Error> {
        Ok(Self {
            data: reader.read_remaining()?,
        })
    }

    fn payload_size(&self) -> usize {
        self.data.len()
    }

    fn write_payload(&self, to: &mut dyn Write) -> Result<(), Error> {
        to.write_all(&self.data)?;
        Ok(())
    }

    fn wrap(segment: ParamSegment<Self>) -> Segment {
        Segment::Comment(segment)
    }
}

impl CommentSegment {
    /// The comment as text, with invalid UTF-8 replaced.
    pub fn text(&self) -> Cow<'_, str> {
        self.payload().text()
    }

    /// Replace the comment bytes.
    pub fn set_data(&mut self, data: Vec<u8>) {
        self.payload_mut().data = data;
    }

    /// Replace the comment with the UTF-8 bytes of `text`.
    pub fn set_text(&mut self, text: &str) {
        self.set_data(text.as_bytes().to_vec());
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
        segment::{Comment, ParamSegment, Segment},
        Document, Item, MarkerCode,
    };

    #[test]
    fn parse_and_edit() {
        let jpeg = hex!("ffd8 fffe 0007 68656c6c6f ffd9");
        let mut doc = Document::from_slice(&jpeg).unwrap();

        let Some(Item::Segment(Segment::Comment(com))) = doc.get(1) else {
            panic!("expected COM");
        };
        assert_eq!(com.text().as_ref(), "hello");

        doc.edit(1, |item| {
            if let Item::Segment(Segment::Comment(com)) = item {
                com.set_text("hi");
            }
            Ok(())
        })
        .unwrap();

        assert_eq!(
            doc.to_vec().unwrap(),
            hex!("ffd8 fffe 0004 6869 ffd9").to_vec()
        );
    }

    #[test]
    fn empty_and_binary() {
        let com = ParamSegment::new(MarkerCode::COM, Comment::default()).unwrap();
        assert_eq!(com.length(), 2);

        let mut com = com;
        com.set_data(vec![0xff, 0xfe, b'a']);
        assert_eq!(com.text().as_ref(), "\u{fffd}\u{fffd}a");
        assert_eq!(format!("{:?}", com.payload()), "Comment { data: [ff, fe, 61] }");
    }
}
