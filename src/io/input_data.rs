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
    fmt::{Debug, Formatter},
    io::Write,
};

use crate::{debug::DebugByteSlice, io::InputSlice, Error};

/// Payload bytes that are either held in memory or deferred to a shared
/// source.
///
/// Entropy-coded data, opaque segments, and application segments can be
/// large. When a document is read from a shared source with a deferral
/// threshold, payloads larger than the threshold are recorded as
/// [`InputData::Lazy`] and only read when requested.
///
/// # Examples
///
/// ```
/// use jpeg_segments::io::InputData;
///
/// let input = InputData::from(vec![1, 2, 3]);
///
/// assert_eq!(input.len(), 3);
/// assert_eq!(input.as_slice(), Some(&[1u8, 2, 3][..]));
/// assert_eq!(input.to_vec().unwrap(), vec![1, 2, 3]);
/// ```
#[derive(Clone)]
pub enum InputData {
    /// Bytes held in memory.
    Owned(Vec<u8>),

    /// Bytes referenced by position in a shared source.
    Lazy(InputSlice),
}

impl InputData {
    /// Length in bytes; no I/O.
    pub fn len(&self) -> usize {
        match self {
            Self::Owned(data) => data.len(),
            Self::Lazy(slice) => slice.len(),
        }
    }

    /// Returns `true` if there are no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow the bytes if they are in memory.
    ///
    /// Returns `None` for deferred data.
    pub fn as_slice(&self) -> Option<&[u8]> {
        match self {
            Self::Owned(data) => Some(data),
            Self::Lazy(_) => None,
        }
    }

    /// Returns `true` if reading the bytes requires I/O.
    pub fn is_lazy(&self) -> bool {
        matches!(self, Self::Lazy(_))
    }

    /// Copy the bytes into a new `Vec`, reading the source if needed.
    pub fn to_vec(&self) -> std::io::Result<Vec<u8>> {
        match self {
            Self::Owned(data) => Ok(data.clone()),
            Self::Lazy(slice) => slice.to_vec(),
        }
    }

    /// Replace deferred data with its bytes, releasing the source.
    pub fn load(&mut self) -> Result<(), Error> {
        if let Self::Lazy(slice) = self {
            *self = Self::Owned(slice.to_vec()?);
        }
        Ok(())
    }

    /// Write the bytes to `to`.
    pub fn write_to(&self, to: &mut dyn Write) -> Result<(), Error> {
        match self {
            Self::Owned(data) => to.write_all(data)?,
            Self::Lazy(slice) => to.write_all(&slice.to_vec()?)?,
        }
        Ok(())
    }
}

impl Default for InputData {
    fn default() -> Self {
        Self::Owned(vec![])
    }
}

impl From<Vec<u8>> for InputData {
    fn from(data: Vec<u8>) -> Self {
        Self::Owned(data)
    }
}

impl From<&[u8]> for InputData {
    fn from(data: &[u8]) -> Self {
        Self::Owned(data.to_vec())
    }
}

impl Debug for InputData {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Owned(data) => f
                .debug_tuple("Owned")
                .field(&DebugByteSlice(data))
                .finish(),
            Self::Lazy(slice) => f.debug_tuple("Lazy").field(slice).finish(),
        }
    }
}

impl PartialEq for InputData {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Owned(a), Self::Owned(b)) => a == b,
            (Self::Lazy(a), Self::Lazy(b)) => a.offset == b.offset && a.len == b.len,
            _ => false,
        }
    }
}
