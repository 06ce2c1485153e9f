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

use std::fmt::{Display, Formatter};

use thiserror::Error;

use crate::MarkerCode;

/// Errors that can occur while reading, editing, or writing a JPEG
/// document.
///
/// Errors are also retained as non-fatal *problems* on items parsed in
/// [`DataMode::Lax`], which is why this type is `Clone` and `Eq`.
///
/// [`DataMode::Lax`]: crate::DataMode::Lax
#[derive(Clone, Debug, Eq, Error, PartialEq)]
pub enum Error {
    /// The byte source ended before the requested bytes could be read.
    #[error("source exhausted: needed {requested} byte(s), found {consumed}")]
    SourceExhausted {
        /// Number of bytes the caller asked for.
        requested: usize,
        /// Number of bytes actually consumed before the source ended.
        consumed: usize,
    },

    /// The declared segment length was reached before the field model was
    /// complete.
    #[error("segment length exceeded: needed {requested} byte(s), {consumed} remained")]
    LimitExceeded {
        /// Number of bytes the caller asked for.
        requested: usize,
        /// Number of bytes consumed before the limit was reached.
        consumed: usize,
    },

    /// A structural rule of the format was broken.
    #[error("format violation: {0}")]
    FormatViolation(String),

    /// A field value is outside the range permitted by the current frame
    /// and hierarchical mode.
    #[error("{0}")]
    BoundsViolation(BoundsViolation),

    /// No segment variant accepted the marker code.
    #[error("no segment variant accepted marker {0}")]
    UnknownMarker(MarkerCode),

    /// The item still carries passthrough bytes and cannot become strict.
    #[error("item carries {0} passthrough byte(s)")]
    PassthroughPresent(usize),

    /// An index into an item or table list was out of range.
    #[error("index {index} out of range for length {len}")]
    IndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Length of the list.
        len: usize,
    },

    /// An error from the underlying I/O source or destination.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl Error {
    /// Return the coarse kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SourceExhausted { .. } => ErrorKind::SourceExhausted,
            Self::LimitExceeded { .. } => ErrorKind::LimitExceeded,
            Self::FormatViolation(_) | Self::UnknownMarker(_) | Self::PassthroughPresent(_) => {
                ErrorKind::FormatViolation
            }
            Self::BoundsViolation(_) => ErrorKind::BoundsViolation,
            Self::IndexOutOfRange { .. } => ErrorKind::InvalidArgument,
            Self::IoError(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn format(message: impl Into<String>) -> Self {
        Self::FormatViolation(message.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

impl From<BoundsViolation> for Error {
    fn from(violation: BoundsViolation) -> Self {
        Self::BoundsViolation(violation)
    }
}

/// Closed set of error categories.
///
/// Recovery code matches on this rather than on individual [`Error`]
/// variants.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorKind {
    /// No more bytes in the source. Always fatal for the current candidate.
    SourceExhausted,

    /// Declared segment length reached early. Recoverable in lax mode.
    LimitExceeded,

    /// Structural rule broken. Fatal in strict mode, recorded in lax mode.
    FormatViolation,

    /// Field value out of range. Fatal in strict mode, recorded in lax
    /// mode.
    BoundsViolation,

    /// A caller supplied an argument that does not refer to anything.
    InvalidArgument,

    /// Failure of the underlying source or destination.
    Io,
}

/// Description of a single out-of-range field value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BoundsViolation {
    /// Field name, as used by ITU T.81 (`Tq`, `Pq`, `Ss`, ...).
    pub field: &'static str,

    /// Offending value.
    pub value: u32,

    /// Smallest permitted value.
    pub min: u32,

    /// Largest permitted value.
    pub max: u32,
}

impl Display for BoundsViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
        write!(
            f,
            "{field} = {value} is outside {min}..={max}",
            field = self.field,
            value = self.value,
            min = self.min,
            max = self.max
        )
    }
}
