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

//! Byte sources used while parsing.
//!
//! [`BoundedReader`] enforces a segment's declared length. [`InputData`]
//! holds a payload either in memory or as a deferred [`InputSlice`] of a
//! shared seekable source.

use std::io::{ErrorKind, Read, Seek};

mod bounded_reader;
pub use bounded_reader::BoundedReader;
pub(crate) use bounded_reader::Deferral;

mod input_data;
pub use input_data::InputData;

mod input_slice;
pub use input_slice::InputSlice;

/// A source that can both read and seek.
///
/// Used as a trait object so that deferred payloads can share one source
/// regardless of its concrete type.
pub trait ReadAndSeek: Read + Seek {}

impl<T: Read + Seek> ReadAndSeek for T {}

/// Read from `source` until `buf` is full or the source is exhausted.
///
/// Returns the number of bytes placed in `buf`.
pub(crate) fn fill<R: Read + ?Sized>(source: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::unwrap_used)]

    use std::io::Cursor;

    use pretty_assertions_sorted::assert_eq;

    use crate::io::fill;

    #[test]
    fn fill_stops_at_end_of_source() {
        let mut source = Cursor::new(vec![1u8, 2, 3]);

        let mut buf = [0u8; 2];
        assert_eq!(fill(&mut source, &mut buf).unwrap(), 2);
        assert_eq!(buf, [1, 2]);

        let mut buf = [0u8; 4];
        assert_eq!(fill(&mut source, &mut buf).unwrap(), 1);
        assert_eq!(buf, [3, 0, 0, 0]);

        assert_eq!(fill(&mut source, &mut buf).unwrap(), 0);
    }
}
