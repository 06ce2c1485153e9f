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

//! Application segments (APPn), including the JFIF and JFXX layouts of
//! APP0.

use std::{
    fmt::{Debug, Formatter},
    io::{Read, Write},
};

use nom::{
    bytes::complete::{tag, take_till},
    sequence::terminated,
    IResult,
};

use crate::{
    bounds,
    debug::DebugByteSlice,
    io::{BoundedReader, InputData},
    segment::{AppSegment, JfifSegment, JfxxSegment, ParamSegment, Segment, SegmentPayload},
    Error, FrameContext, MarkerCode, MarkerCodes,
};

/// Split a null-terminated identifier from the front of an APPn payload.
pub(crate) fn identifier(input: &[u8]) -> IResult<&[u8], &[u8]> {
    terminated(take_till(|b| b == 0), tag(&b"\0"[..]))(input)
}

/// Read and match the identifier that opens a dedicated APP0 layout.
fn expect_identifier<R: Read + ?Sized>(
    reader: &mut BoundedReader<'_, R>,
    expected: &[u8],
) -> Result<(), Error> {
    let header = reader.read_bytes(expected.len() + 1)?;
    match identifier(&header) {
        Ok((rest, id)) if rest.is_empty() && id == expected => Ok(()),
        _ => Err(Error::format(format!(
            "APP0 identifier is not {}",
            String::from_utf8_lossy(expected)
        ))),
    }
}

/// Generic APPn payload.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppData {
    /// Payload bytes.
    pub data: InputData,
}

impl AppData {
    /// Payload holding `data`.
    pub fn new(data: impl Into<InputData>) -> Self {
        Self { data: data.into() }
    }

    /// The null-terminated identifier at the start of the payload, such as
    /// `Exif` or `http://ns.adobe.com/xap/1.0/`.
    ///
    /// Returns `None` if the payload has no terminator or has not been
    /// loaded into memory.
    pub fn identifier(&self) -> Option<&[u8]> {
        let data = self.data.as_slice()?;
        identifier(data).ok().map(|(_, id)| id)
    }
}

impl SegmentPayload for AppData {
    const CODES: MarkerCodes = MarkerCodes::Range(MarkerCode::APP0, MarkerCode::APP15);

    fn read<R: Read + ?Sized>(
        _code: MarkerCode,
        reader: &mut BoundedReader<'_, R>,
    ) -> Result<Self, Error> {
        Ok(Self {
            data: reader.read_remaining_data()?,
        })
    }

    fn payload_size(&self) -> usize {
        self.data.len()
    }

    fn write_payload(&self, to: &mut dyn Write) -> Result<(), Error> {
        self.data.write_to(to)
    }

    fn load(&mut self) -> Result<(), Error> {
        self.data.load()
    }

    fn wrap(segment: ParamSegment<Self>) -> Segment {
        Segment::App(segment)
    }
}

impl AppSegment {
    /// The null-terminated identifier at the start of the payload.
    pub fn identifier(&self) -> Option<&[u8]> {
        self.payload().identifier()
    }

    /// Replace the payload bytes.
    pub fn set_data(&mut self, data: impl Into<InputData>) {
        self.payload_mut().data = data.into();
    }
}

/// JFIF APP0 payload.
#[derive(Clone, Eq, PartialEq)]
pub struct Jfif {
    /// Major version; always 1.
    pub major_version: u8,

    /// Minor version, 0 through 2.
    pub minor_version: u8,

    /// 0: aspect ratio only, 1: dots per inch, 2: dots per centimeter.
    pub units: u8,

    /// Horizontal pixel density.
    pub x_density: u16,

    /// Vertical pixel density.
    pub y_density: u16,

    /// Thumbnail width in pixels.
    pub thumbnail_width: u8,

    /// Thumbnail height in pixels.
    pub thumbnail_height: u8,

    /// Packed 24-bit RGB thumbnail, `3 * width * height` bytes.
    pub thumbnail: Vec<u8>,
}

impl Default for Jfif {
    fn default() -> Self {
        Self {
            major_version: 1,
            minor_version: 1,
            units: 0,
            x_density: 1,
            y_density: 1,
            thumbnail_width: 0,
            thumbnail_height: 0,
            thumbnail: vec![],
        }
    }
}

impl Debug for Jfif {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Jfif")
            .field("major_version", &self.major_version)
            .field("minor_version", &self.minor_version)
            .field("units", &self.units)
            .field("x_density", &self.x_density)
            .field("y_density", &self.y_density)
            .field("thumbnail_width", &self.thumbnail_width)
            .field("thumbnail_height", &self.thumbnail_height)
            .field("thumbnail", &DebugByteSlice(&self.thumbnail))
            .finish()
    }
}

impl SegmentPayload for Jfif {
    const CODES: MarkerCodes = MarkerCodes::Single(MarkerCode::APP0);

    fn read<R: Read + ?Sized>(
        _code: MarkerCode,
        reader: &mut BoundedReader<'_, R>,
    ) -> Result<Self, Error> {
        expect_identifier(reader, b"JFIF")?;

        let major_version = reader.read_u8()?;
        let minor_version = reader.read_u8()?;
        let units = reader.read_u8()?;
        let x_density = reader.read_u16()?;
        let y_density = reader.read_u16()?;
        let thumbnail_width = reader.read_u8()?;
        let thumbnail_height = reader.read_u8()?;
        let thumbnail =
            reader.read_bytes(3 * usize::from(thumbnail_width) * usize::from(thumbnail_height))?;

        Ok(Self {
            major_version,
            minor_version,
            units,
            x_density,
            y_density,
            thumbnail_width,
            thumbnail_height,
            thumbnail,
        })
    }

    fn payload_size(&self) -> usize {
        14 + self.thumbnail.len()
    }

    fn write_payload(&self, to: &mut dyn Write) -> Result<(), Error> {
        to.write_all(b"JFIF\0")?;
        to.write_all(&[self.major_version, self.minor_version, self.units])?;
        to.write_all(&self.x_density.to_be_bytes())?;
        to.write_all(&self.y_density.to_be_bytes())?;
        to.write_all(&[self.thumbnail_width, self.thumbnail_height])?;
        to.write_all(&self.thumbnail)?;
        Ok(())
    }

    fn validate(&self, _code: MarkerCode, context: FrameContext, results: &mut Vec<Error>) {
        bounds::JFIF_MAJOR_VERSION.accumulate(self.major_version.into(), context, results);
        bounds::JFIF_MINOR_VERSION.accumulate(self.minor_version.into(), context, results);
        bounds::JFIF_UNITS.accumulate(self.units.into(), context, results);
        bounds::JFIF_DENSITY.accumulate(self.x_density.into(), context, results);
        bounds::JFIF_DENSITY.accumulate(self.y_density.into(), context, results);

        let expected = 3 * usize::from(self.thumbnail_width) * usize::from(self.thumbnail_height);
        if self.thumbnail.len() != expected {
            results.push(Error::format(format!(
                "JFIF thumbnail holds {} bytes; {}x{} RGB needs {expected}",
                self.thumbnail.len(),
                self.thumbnail_width,
                self.thumbnail_height
            )));
        }
    }

    fn wrap(segment: ParamSegment<Self>) -> Segment {
        Segment::Jfif(segment)
    }
}

impl JfifSegment {
    /// Set the version.
    pub fn set_version(&mut self, major: u8, minor: u8) -> Result<(), Error> {
        self.check(&bounds::JFIF_MAJOR_VERSION, major)?;
        self.check(&bounds::JFIF_MINOR_VERSION, minor)?;
        let jfif = self.payload_mut();
        jfif.major_version = major;
        jfif.minor_version = minor;
        Ok(())
    }

    /// Set units and pixel density.
    pub fn set_density(&mut self, units: u8, x_density: u16, y_density: u16) -> Result<(), Error> {
        self.check(&bounds::JFIF_UNITS, units)?;
        self.check(&bounds::JFIF_DENSITY, x_density)?;
        self.check(&bounds::JFIF_DENSITY, y_density)?;
        let jfif = self.payload_mut();
        jfif.units = units;
        jfif.x_density = x_density;
        jfif.y_density = y_density;
        Ok(())
    }

    /// Replace the RGB thumbnail.
    pub fn set_thumbnail(&mut self, width: u8, height: u8, rgb: Vec<u8>) -> Result<(), Error> {
        let expected = 3 * usize::from(width) * usize::from(height);
        if rgb.len() != expected && self.data_mode().is_strict() {
            return Err(Error::format(format!(
                "{width}x{height} RGB thumbnail needs {expected} bytes, got {}",
                rgb.len()
            )));
        }

        let jfif = self.payload_mut();
        jfif.thumbnail_width = width;
        jfif.thumbnail_height = height;
        jfif.thumbnail = rgb;
        Ok(())
    }
}

/// Thumbnail carried by a JFXX APP0 segment.
#[derive(Clone, Eq, PartialEq)]
pub enum JfxxThumbnail {
    /// Extension code 0x10: thumbnail coded as a JPEG stream.
    Jpeg(Vec<u8>),

    /// Extension code 0x11: one byte per pixel indexing a 256-entry RGB
    /// palette.
    Palette {
        /// Width in pixels.
        width: u8,
        /// Height in pixels.
        height: u8,
        /// 768 bytes: 256 RGB entries.
        palette: Vec<u8>,
        /// `width * height` palette indices.
        pixels: Vec<u8>,
    },

    /// Extension code 0x13: packed 24-bit RGB.
    Rgb {
        /// Width in pixels.
        width: u8,
        /// Height in pixels.
        height: u8,
        /// `3 * width * height` bytes.
        pixels: Vec<u8>,
    },
}

impl JfxxThumbnail {
    /// Extension code.
    pub fn extension_code(&self) -> u8 {
        match self {
            Self::Jpeg(_) => 0x10,
            Self::Palette { .. } => 0x11,
            Self::Rgb { .. } => 0x13,
        }
    }
}

impl Debug for JfxxThumbnail {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Jpeg(data) => f.debug_tuple("Jpeg").field(&DebugByteSlice(data)).finish(),
            Self::Palette {
                width,
                height,
                palette,
                pixels,
            } => f
                .debug_struct("Palette")
                .field("width", width)
                .field("height", height)
                .field("palette", &DebugByteSlice(palette))
                .field("pixels", &DebugByteSlice(pixels))
                .finish(),
            Self::Rgb {
                width,
                height,
                pixels,
            } => f
                .debug_struct("Rgb")
                .field("width", width)
                .field("height", height)
                .field("pixels", &DebugByteSlice(pixels))
                .finish(),
        }
    }
}

/// JFIF extension (JFXX) APP0 payload.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Jfxx {
    /// The thumbnail.
    pub thumbnail: JfxxThumbnail,
}

impl SegmentPayload for Jfxx {
    const CODES: MarkerCodes = MarkerCodes::Single(MarkerCode::APP0);

    fn read<R: Read + ?Sized>(
        _code: MarkerCode,
        reader: &mut BoundedReader<'_, R>,
    ) -> Result<Self, Error> {
        expect_identifier(reader, b"JFXX")?;

        let thumbnail = match reader.read_u8()? {
            0x10 => JfxxThumbnail::Jpeg(reader.read_remaining()?),
            0x11 => {
                let width = reader.read_u8()?;
                let height = reader.read_u8()?;
                let palette = reader.read_bytes(768)?;
                let pixels = reader.read_bytes(usize::from(width) * usize::from(height))?;
                JfxxThumbnail::Palette {
                    width,
                    height,
                    palette,
                    pixels,
                }
            }
            0x13 => {
                let width = reader.read_u8()?;
                let height = reader.read_u8()?;
                let pixels = reader.read_bytes(3 * usize::from(width) * usize::from(height))?;
                JfxxThumbnail::Rgb {
                    width,
                    height,
                    pixels,
                }
            }
            other => {
                return Err(Error::format(format!(
                    "unknown JFXX extension code {other:#04x}"
                )));
            }
        };

        Ok(Self { thumbnail })
    }

    fn payload_size(&self) -> usize {
        6 + match &self.thumbnail {
            JfxxThumbnail::Jpeg(data) => data.len(),
            JfxxThumbnail::Palette {
                palette, pixels, ..
            } => 2 + palette.len() + pixels.len(),
            JfxxThumbnail::Rgb { pixels, .. } => 2 + pixels.len(),
        }
    }

    fn write_payload(&self, to: &mut dyn Write) -> Result<(), Error> {
        to.write_all(b"JFXX\0")?;
        to.write_all(&[self.thumbnail.extension_code()])?;

        match &self.thumbnail {
            JfxxThumbnail::Jpeg(data) => to.write_all(data)?,
            JfxxThumbnail::Palette {
                width,
                height,
                palette,
                pixels,
            } => {
                to.write_all(&[*width, *height])?;
                to.write_all(palette)?;
                to.write_all(pixels)?;
            }
            JfxxThumbnail::Rgb {
                width,
                height,
                pixels,
            } => {
                to.write_all(&[*width, *height])?;
                to.write_all(pixels)?;
            }
        }

        Ok(())
    }

    fn validate(&self, _code: MarkerCode, _context: FrameContext, results: &mut Vec<Error>) {
        match &self.thumbnail {
            JfxxThumbnail::Jpeg(data) => {
                if !data.starts_with(&[0xFF, 0xD8]) {
                    results.push(Error::format("JFXX JPEG thumbnail does not start with SOI"));
                }
            }
            JfxxThumbnail::Palette {
                width,
                height,
                palette,
                pixels,
            } => {
                if palette.len() != 768 {
                    results.push(Error::format(format!(
                        "JFXX palette holds {} bytes; needs 768",
                        palette.len()
                    )));
                }
                let expected = usize::from(*width) * usize::from(*height);
                if pixels.len() != expected {
                    results.push(Error::format(format!(
                        "JFXX palette thumbnail holds {} pixels; {width}x{height} needs {expected}",
                        pixels.len()
                    )));
                }
            }
            JfxxThumbnail::Rgb {
                width,
                height,
                pixels,
            } => {
                let expected = 3 * usize::from(*width) * usize::from(*height);
                if pixels.len() != expected {
                    results.push(Error::format(format!(
                        "JFXX RGB thumbnail holds {} bytes; {width}x{height} needs {expected}",
                        pixels.len()
                    )));
                }
            }
        }
    }

    fn wrap(segment: ParamSegment<Self>) -> Segment {
        Segment::Jfxx(segment)
    }
}

impl JfxxSegment {
    /// Replace the thumbnail.
    pub fn set_thumbnail(&mut self, thumbnail: JfxxThumbnail) -> Result<(), Error> {
        self.modify(|jfxx| jfxx.thumbnail = thumbnail)
    }
}
