//! ISO base media file format (ISO/IEC 14496-12) box primitives.

use std::fmt;

use crate::foundation::error::ImageError;

/// Four-character code naming a box, item type or brand.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCc(pub [u8; 4]);

impl FourCc {
    /// `ftyp`
    pub const FTYP: Self = Self(*b"ftyp");
    /// `meta`
    pub const META: Self = Self(*b"meta");
    /// `hdlr`
    pub const HDLR: Self = Self(*b"hdlr");
    /// `pitm`
    pub const PITM: Self = Self(*b"pitm");
    /// `iloc`
    pub const ILOC: Self = Self(*b"iloc");
    /// `iinf`
    pub const IINF: Self = Self(*b"iinf");
    /// `infe`
    pub const INFE: Self = Self(*b"infe");
    /// `iref`
    pub const IREF: Self = Self(*b"iref");
    /// `iprp`
    pub const IPRP: Self = Self(*b"iprp");
    /// `ipco`
    pub const IPCO: Self = Self(*b"ipco");
    /// `ipma`
    pub const IPMA: Self = Self(*b"ipma");
    /// `ispe`
    pub const ISPE: Self = Self(*b"ispe");
    /// `mdat`
    pub const MDAT: Self = Self(*b"mdat");
    /// `pict` handler.
    pub const PICT: Self = Self(*b"pict");
    /// Content-describes reference.
    pub const CDSC: Self = Self(*b"cdsc");
    /// JPEG coded image item.
    pub const JPEG: Self = Self(*b"jpeg");
    /// MIME typed item (used for XMP).
    pub const MIME: Self = Self(*b"mime");
    /// EXIF item.
    pub const EXIF: Self = Self(*b"Exif");
    /// URI typed item.
    pub const URI: Self = Self(*b"uri ");
    /// Image structural brand.
    pub const MIF1: Self = Self(*b"mif1");

    /// Whether items of this type carry no pixels.
    pub fn is_metadata_item(self) -> bool {
        self == Self::MIME || self == Self::EXIF || self == Self::URI
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FourCc({self})")
    }
}

/// Builds one box; the size field is patched in [`BoxWriter::finish`].
pub(crate) struct BoxWriter {
    buf: Vec<u8>,
}

impl BoxWriter {
    pub(crate) fn new(kind: FourCc) -> Self {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(&[0; 4]);
        buf.extend_from_slice(&kind.0);
        Self { buf }
    }

    pub(crate) fn full(kind: FourCc, version: u8, flags: u32) -> Self {
        let mut b = Self::new(kind);
        b.u32((u32::from(version) << 24) | (flags & 0x00FF_FFFF));
        b
    }

    pub(crate) fn u8(&mut self, v: u8) -> &mut Self {
        self.buf.push(v);
        self
    }

    pub(crate) fn u16(&mut self, v: u16) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub(crate) fn u32(&mut self, v: u32) -> &mut Self {
        self.buf.extend_from_slice(&v.to_be_bytes());
        self
    }

    pub(crate) fn fourcc(&mut self, v: FourCc) -> &mut Self {
        self.buf.extend_from_slice(&v.0);
        self
    }

    /// Null-terminated UTF-8 string.
    pub(crate) fn cstr(&mut self, s: &str) -> &mut Self {
        self.buf.extend_from_slice(s.as_bytes());
        self.buf.push(0);
        self
    }

    pub(crate) fn child(&mut self, child: Vec<u8>) -> &mut Self {
        self.buf.extend_from_slice(&child);
        self
    }

    pub(crate) fn finish(mut self) -> Result<Vec<u8>, ImageError> {
        let size = u32::try_from(self.buf.len()).map_err(|_| {
            ImageError::invalid_format(format!("box larger than 4 GiB ({} bytes)", self.buf.len()))
        })?;
        self.buf[..4].copy_from_slice(&size.to_be_bytes());
        Ok(self.buf)
    }
}

/// Big-endian cursor over a box payload.
pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub(crate) fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }

    pub(crate) fn take(&mut self, n: usize) -> Result<&'a [u8], ImageError> {
        if self.remaining() < n {
            return Err(ImageError::invalid_format(format!(
                "truncated box: wanted {n} bytes, {} left",
                self.remaining()
            )));
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub(crate) fn u8(&mut self) -> Result<u8, ImageError> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn u16(&mut self) -> Result<u16, ImageError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub(crate) fn u32(&mut self) -> Result<u32, ImageError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn u64(&mut self) -> Result<u64, ImageError> {
        let b = self.take(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(u64::from_be_bytes(arr))
    }

    /// Unsigned integer of `size` bytes (0, 4 or 8, as used by `iloc`).
    pub(crate) fn uint(&mut self, size: u8) -> Result<u64, ImageError> {
        match size {
            0 => Ok(0),
            4 => self.u32().map(u64::from),
            8 => self.u64(),
            other => Err(ImageError::invalid_format(format!(
                "unsupported field size {other}"
            ))),
        }
    }

    pub(crate) fn fourcc(&mut self) -> Result<FourCc, ImageError> {
        let b = self.take(4)?;
        Ok(FourCc([b[0], b[1], b[2], b[3]]))
    }

    /// `(version, flags)` of a full box.
    pub(crate) fn full_header(&mut self) -> Result<(u8, u32), ImageError> {
        let v = self.u32()?;
        Ok(((v >> 24) as u8, v & 0x00FF_FFFF))
    }

    /// Null-terminated string; a missing terminator consumes the rest.
    pub(crate) fn cstr(&mut self) -> Result<String, ImageError> {
        let rest = self.rest();
        let len = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
        let s = String::from_utf8_lossy(&rest[..len]).into_owned();
        self.pos += (len + 1).min(rest.len());
        Ok(s)
    }
}

/// Iterates sibling boxes, yielding `(type, payload, absolute payload offset)`.
pub(crate) struct Boxes<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

/// Walk the boxes in `data`, whose first byte sits at absolute file offset `base`.
pub(crate) fn boxes(data: &[u8], base: usize) -> Boxes<'_> {
    Boxes { data, pos: 0, base }
}

impl<'a> Iterator for Boxes<'a> {
    type Item = Result<(FourCc, &'a [u8], usize), ImageError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.data.len() {
            return None;
        }
        Some(self.next_box())
    }
}

impl<'a> Boxes<'a> {
    fn next_box(&mut self) -> Result<(FourCc, &'a [u8], usize), ImageError> {
        let mut r = ByteReader::new(&self.data[self.pos..]);
        let size32 = r.u32()?;
        let kind = r.fourcc()?;
        let (header, size) = match size32 {
            0 => (8, self.data.len() - self.pos),
            1 => {
                let large = r.u64()?;
                let large = usize::try_from(large)
                    .map_err(|_| ImageError::invalid_format("box size overflows usize"))?;
                (16, large)
            }
            n => (8, n as usize),
        };
        if size < header || size > self.data.len() - self.pos {
            self.pos = self.data.len();
            return Err(ImageError::invalid_format(format!(
                "box '{kind}' size {size} does not fit its parent"
            )));
        }
        let payload = &self.data[self.pos + header..self.pos + size];
        let offset = self.base + self.pos + header;
        self.pos += size;
        Ok((kind, payload, offset))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/container/bmff.rs"]
mod tests;
