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
    cell::{RefCell, RefMut},
    fmt::{Debug, Formatter},
    io::{Seek, SeekFrom},
    rc::Rc,
};

use crate::io::ReadAndSeek;

/// A deferred extent of a shared seekable source.
///
/// The slice records where its bytes live instead of holding them. The
/// source is borrowed only for the duration of [`to_vec()`](Self::to_vec)
/// or [`read_range()`](Self::read_range).
///
/// # Example
///
/// ```
/// use std::{cell::RefCell, io::Cursor, rc::Rc};
/// use jpeg_segments::io::{InputSlice, ReadAndSeek};
///
/// let source: Rc<RefCell<dyn ReadAndSeek>> =
///     Rc::new(RefCell::new(Cursor::new(vec![0u8, 1, 2, 3, 4, 5])));
///
/// let slice = InputSlice::new(source, 2, 3);
/// assert_eq!(slice.len(), 3);
/// assert_eq!(slice.to_vec().unwrap(), vec![2, 3, 4]);
/// ```
#[derive(Clone)]
pub struct InputSlice {
    pub(crate) source: Rc<RefCell<dyn ReadAndSeek>>,
    pub(crate) offset: u64,
    pub(crate) len: usize,
}

impl InputSlice {
    /// Create a slice of `len` bytes starting at `offset` within `source`.
    pub fn new(source: Rc<RefCell<dyn ReadAndSeek>>, offset: u64, len: usize) -> Self {
        Self {
            source,
            offset,
            len,
        }
    }

    /// Read the whole extent.
    pub fn to_vec(&self) -> std::io::Result<Vec<u8>> {
        self.read_range(0, self.len)
    }

    /// Read `len` bytes starting `start` bytes into this slice.
    ///
    /// # Errors
    ///
    /// Fails if the range exceeds the slice, if the source is already
    /// borrowed (for example, by a parse in progress), or if I/O fails.
    pub fn read_range(&self, start: usize, len: usize) -> std::io::Result<Vec<u8>> {
        if start.checked_add(len).is_none_or(|end| end > self.len) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "range exceeds slice bounds",
            ));
        }

        let mut source = self.borrow_source()?;
        source.seek(SeekFrom::Start(self.offset + start as u64))?;
        let mut buf = vec![0u8; len];
        source.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Length in bytes; no I/O.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the slice covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Position of the first byte within the source.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    fn borrow_source(&self) -> std::io::Result<RefMut<'_, dyn ReadAndSeek + 'static>> {
        self.source
            .try_borrow_mut()
            .map_err(|_| std::io::Error::other("source is already borrowed"))
    }
}

impl Debug for InputSlice {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputSlice")
            .field("offset", &self.offset)
            .field("len", &self.len)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::unwrap_used)]

    use std::{cell::RefCell, io::Cursor, rc::Rc};

    use pretty_assertions_sorted::assert_eq;

    use crate::io::{InputSlice, ReadAndSeek};

    fn source(data: Vec<u8>) -> Rc<RefCell<dyn ReadAndSeek>> {
        Rc::new(RefCell::new(Cursor::new(data)))
    }

    #[test]
    fn to_vec() {
        let slice = InputSlice::new(source((0u8..10).collect()), 2, 5);
        assert_eq!(slice.to_vec().unwrap(), vec![2, 3, 4, 5, 6]);
    }

    #[test]
    fn read_range() {
        let slice = InputSlice::new(source((0u8..10).collect()), 2, 5);
        assert_eq!(slice.read_range(1, 3).unwrap(), vec![3, 4, 5]);
        assert!(slice.read_range(3, 3).is_err());
        assert!(slice.read_range(usize::MAX, 2).is_err());
    }

    #[test]
    fn busy_source() {
        let shared = source(vec![0u8; 10]);
        let slice = InputSlice::new(Rc::clone(&shared), 5, 3);

        let guard = shared.borrow_mut();
        assert!(slice.to_vec().is_err());
        drop(guard);

        assert_eq!(slice.to_vec().unwrap(), vec![0, 0, 0]);
    }

    #[test]
    fn truncated_source() {
        let slice = InputSlice::new(source(vec![1, 2, 3]), 2, 4);
        assert!(slice.to_vec().is_err());
    }

    #[test]
    fn len_and_offset() {
        let slice = InputSlice::new(source(vec![0u8; 10]), 5, 0);
        assert_eq!(slice.len(), 0);
        assert_eq!(slice.offset(), 5);
        assert!(slice.is_empty());
        assert_eq!(slice.to_vec().unwrap(), Vec::<u8>::new());
    }
}
