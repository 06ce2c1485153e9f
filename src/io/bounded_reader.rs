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
    io::{self, Read},
    rc::Rc,
};

use crate::{
    io::{fill, InputData, InputSlice, ReadAndSeek},
    Error,
};

/// Where to find the bytes a [`BoundedReader`] skips over when it defers
/// a payload.
#[derive(Clone)]
pub(crate) struct Deferral {
    pub(crate) source: Rc<RefCell<dyn ReadAndSeek>>,

    /// Position of the reader's first byte within `source`.
    pub(crate) origin: u64,

    /// Payloads longer than this are deferred.
    pub(crate) threshold: usize,
}

/// A byte source with a remaining-byte budget.
///
/// Every read is charged against the budget. A read that straddles the
/// budget consumes exactly the bytes that were available and then fails,
/// so the caller can resume immediately after the failure point. The
/// limit is never crossed:
///
/// ```
/// use std::io::Cursor;
/// use jpeg_segments::{io::BoundedReader, Error};
///
/// let mut source = Cursor::new(vec![0x12, 0x34]);
/// let mut reader = BoundedReader::new(&mut source, 1);
///
/// assert_eq!(
///     reader.read_u16(),
///     Err(Error::LimitExceeded { requested: 2, consumed: 1 })
/// );
/// assert_eq!(source.position(), 1);
/// ```
pub struct BoundedReader<'s, R: ?Sized> {
    source: &'s mut R,
    limit: usize,
    consumed: usize,
    deferral: Option<Deferral>,
}

impl<'s, R: Read + ?Sized> BoundedReader<'s, R> {
    /// Wrap `source`, permitting at most `limit` bytes to be read.
    pub fn new(source: &'s mut R, limit: usize) -> Self {
        Self {
            source,
            limit,
            consumed: 0,
            deferral: None,
        }
    }

    pub(crate) fn with_deferral(self, deferral: Option<Deferral>) -> Self {
        Self { deferral, ..self }
    }

    /// Bytes still permitted by the limit.
    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.consumed)
    }

    /// Bytes consumed so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Fill `buf` completely.
    ///
    /// On failure, the bytes that could be read have been consumed and are
    /// in the front of `buf`.
    pub fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), Error> {
        let requested = buf.len();
        let allowed = requested.min(self.remaining());

        let got = fill(&mut *self.source, &mut buf[..allowed])?;
        self.consumed += got;

        if got < allowed {
            Err(Error::SourceExhausted {
                requested,
                consumed: got,
            })
        } else if allowed < requested {
            Err(Error::LimitExceeded {
                requested,
                consumed: got,
            })
        } else {
            Ok(())
        }
    }

    /// Read one byte.
    pub fn read_u8(&mut self) -> Result<u8, Error> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    /// Read a big-endian 16-bit value.
    pub fn read_u16(&mut self) -> Result<u16, Error> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    /// Read one byte holding two 4-bit fields, high nibble first.
    pub fn read_nibbles(&mut self) -> Result<(u8, u8), Error> {
        let b = self.read_u8()?;
        Ok((b >> 4, b & 0x0F))
    }

    /// Read exactly `n` bytes.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, Error> {
        let mut buf = vec![0u8; n];
        self.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Read everything up to the limit.
    pub fn read_remaining(&mut self) -> Result<Vec<u8>, Error> {
        self.read_bytes(self.remaining())
    }

    /// Read `n` bytes as payload data.
    ///
    /// If the reader was created with a shared source and `n` is larger
    /// than the deferral threshold, the bytes are skipped and a deferred
    /// slice is returned instead.
    pub fn read_data(&mut self, n: usize) -> Result<InputData, Error> {
        match &self.deferral {
            Some(deferral) if n <= self.remaining() && n > deferral.threshold => {
                let offset = deferral.origin + self.consumed as u64;
                let slice = InputSlice::new(Rc::clone(&deferral.source), offset, n);

                let skipped = io::copy(&mut (&mut *self.source).take(n as u64), &mut io::sink())?;
                let skipped = usize::try_from(skipped).unwrap_or(n);
                self.consumed += skipped;

                if skipped < n {
                    return Err(Error::SourceExhausted {
                        requested: n,
                        consumed: skipped,
                    });
                }

                Ok(InputData::Lazy(slice))
            }
            _ => Ok(InputData::Owned(self.read_bytes(n)?)),
        }
    }

    /// Read everything up to the limit as payload data.
    pub fn read_remaining_data(&mut self) -> Result<InputData, Error> {
        self.read_data(self.remaining())
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
        io::{BoundedReader, Deferral, InputData, ReadAndSeek},
        Error,
    };

    #[test]
    fn primitives() {
        let mut source = Cursor::new(hex!("01 0203 a5 ffd8ffe0").to_vec());
        let mut reader = BoundedReader::new(&mut source, 8);

        assert_eq!(reader.read_u8().unwrap(), 1);
        assert_eq!(reader.read_u16().unwrap(), 0x0203);
        assert_eq!(reader.read_nibbles().unwrap(), (0x0a, 0x05));
        assert_eq!(reader.remaining(), 4);
        assert_eq!(reader.read_remaining().unwrap(), hex!("ffd8ffe0").to_vec());
        assert_eq!(reader.remaining(), 0);
        assert_eq!(reader.consumed(), 8);
    }

    #[test]
    fn limit_exceeded_consumes_available_bytes() {
        let mut source = Cursor::new(hex!("1234 56").to_vec());

        {
            let mut reader = BoundedReader::new(&mut source, 1);
            assert_eq!(
                reader.read_u16(),
                Err(Error::LimitExceeded {
                    requested: 2,
                    consumed: 1
                })
            );
            assert_eq!(reader.consumed(), 1);
            assert_eq!(reader.remaining(), 0);
        }

        // The next readable byte is the second byte of the short.
        assert_eq!(source.position(), 1);
        let mut reader = BoundedReader::new(&mut source, 2);
        assert_eq!(reader.read_u8().unwrap(), 0x34);
    }

    #[test]
    fn source_exhausted_is_distinct() {
        let mut source = Cursor::new(vec![0x12]);
        let mut reader = BoundedReader::new(&mut source, 4);

        assert_eq!(
            reader.read_u16(),
            Err(Error::SourceExhausted {
                requested: 2,
                consumed: 1
            })
        );
        assert_eq!(reader.consumed(), 1);
    }

    #[test]
    fn limit_is_never_crossed() {
        let mut source = Cursor::new(hex!("0102 0304").to_vec());

        {
            let mut reader = BoundedReader::new(&mut source, 3);
            assert_eq!(reader.read_u16().unwrap(), 0x0102);
            assert_eq!(
                reader.read_u16(),
                Err(Error::LimitExceeded {
                    requested: 2,
                    consumed: 1
                })
            );
            assert_eq!(reader.consumed(), 3);
            assert_eq!(
                reader.read_u8(),
                Err(Error::LimitExceeded {
                    requested: 1,
                    consumed: 0
                })
            );
        }

        assert_eq!(source.position(), 3);
    }

    #[test]
    fn read_data_in_memory() {
        let mut source = Cursor::new(vec![1u8, 2, 3, 4]);
        let mut reader = BoundedReader::new(&mut source, 3);

        assert_eq!(reader.read_data(2).unwrap(), InputData::Owned(vec![1, 2]));
        assert!(reader.read_data(2).is_err());
    }

    #[test]
    fn read_data_deferred() {
        let data = hex!("ffe0 0006 aabbccdd").to_vec();
        let shared: Rc<RefCell<dyn ReadAndSeek>> = Rc::new(RefCell::new(Cursor::new(data)));

        let mut source = Cursor::new(hex!("aabbccdd").to_vec());
        let mut reader = BoundedReader::new(&mut source, 4).with_deferral(Some(Deferral {
            source: Rc::clone(&shared),
            origin: 4,
            threshold: 2,
        }));

        // Small payloads stay in memory.
        assert_eq!(reader.read_data(1).unwrap(), InputData::Owned(vec![0xaa]));

        let data = reader.read_data(3).unwrap();
        assert!(data.is_lazy());
        assert_eq!(reader.remaining(), 0);
        assert_eq!(data.to_vec().unwrap(), hex!("bbccdd").to_vec());
    }

    #[test]
    fn read_data_deferred_truncated() {
        let shared: Rc<RefCell<dyn ReadAndSeek>> =
            Rc::new(RefCell::new(Cursor::new(vec![0u8; 4])));

        let mut source = Cursor::new(vec![0u8; 2]);
        let mut reader = BoundedReader::new(&mut source, 8).with_deferral(Some(Deferral {
            source: shared,
            origin: 0,
            threshold: 0,
        }));

        assert_eq!(
            reader.read_data(4),
            Err(Error::SourceExhausted {
                requested: 4,
                consumed: 2
            })
        );
    }
}
