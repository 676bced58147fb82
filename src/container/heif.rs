//! HEIF (ISO/IEC 23008-12) still-image container writer and reader.
//!
//! Layout written by [`HeifWriter`]:
//!
//! ```text
//! ftyp  mif1 / [mif1, jpeg]
//! meta
//!   hdlr  pict
//!   pitm  primary item (always item 1)
//!   iloc  one extent per item, absolute offsets into mdat
//!   iinf  one `jpeg` infe per frame (+ one `mime` infe for XMP)
//!   iref  cdsc: XMP item -> primary item
//!   iprp  ipco (ispe per distinct size) + ipma
//! mdat  frame bitstreams, then the XMP packet
//! ```

use std::collections::HashMap;

use crate::{
    container::bmff::{BoxWriter, ByteReader, FourCc, boxes},
    foundation::error::ImageError,
};

/// MIME type of XMP items.
pub const XMP_CONTENT_TYPE: &str = "application/rdf+xml";

/// One already-coded frame to store as an image item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CodedImage {
    /// Item type of the bitstream (for example [`FourCc::JPEG`]).
    pub codec: FourCc,
    /// Coded bitstream.
    pub data: Vec<u8>,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl CodedImage {
    /// A baseline JPEG frame.
    pub fn jpeg(data: Vec<u8>, width: u32, height: u32) -> Self {
        Self {
            codec: FourCc::JPEG,
            data,
            width,
            height,
        }
    }
}

/// Accumulates frames and writes a multi-image HEIF file. The first frame is the primary item.
#[derive(Debug, Default)]
pub struct HeifWriter {
    images: Vec<CodedImage>,
    primary_xmp: Option<Vec<u8>>,
}

struct MetaPlan<'a> {
    images: &'a [CodedImage],
    xmp: Option<&'a [u8]>,
}

impl HeifWriter {
    /// Empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a frame. Frames keep their insertion order.
    pub fn add_image(&mut self, image: CodedImage) {
        self.images.push(image);
    }

    /// Attach an XMP packet that describes the primary frame.
    pub fn set_primary_xmp(&mut self, xmp: Vec<u8>) {
        self.primary_xmp = Some(xmp);
    }

    /// Number of frames added so far.
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    /// Serialize the container.
    pub fn finish(self) -> Result<Vec<u8>, ImageError> {
        if self.images.is_empty() {
            return Err(ImageError::DestinationNotCreated(
                "a container needs at least one image".to_string(),
            ));
        }
        let item_count = self.images.len() + usize::from(self.primary_xmp.is_some());
        if item_count > usize::from(u16::MAX) {
            return Err(ImageError::invalid_format(format!(
                "{item_count} items exceed the 16-bit item id space"
            )));
        }

        let plan = MetaPlan {
            images: &self.images,
            xmp: self.primary_xmp.as_deref(),
        };

        let ftyp = {
            let mut b = BoxWriter::new(FourCc::FTYP);
            b.fourcc(FourCc::MIF1)
                .u32(0)
                .fourcc(FourCc::MIF1)
                .fourcc(FourCc::JPEG);
            b.finish()?
        };

        // Offsets are fixed-width, so the meta box size does not depend on them.
        let meta_len = plan.meta_box(0)?.len();
        let mdat_payload_start = ftyp.len() + meta_len + 8;
        let meta = plan.meta_box(mdat_payload_start)?;
        debug_assert_eq!(meta.len(), meta_len);

        let mut mdat = BoxWriter::new(FourCc::MDAT);
        for payload in plan.payloads() {
            mdat.child(payload.to_vec());
        }
        let mdat = mdat.finish()?;

        let mut out = Vec::with_capacity(ftyp.len() + meta.len() + mdat.len());
        out.extend_from_slice(&ftyp);
        out.extend_from_slice(&meta);
        out.extend_from_slice(&mdat);
        Ok(out)
    }
}

impl MetaPlan<'_> {
    fn xmp_item_id(&self) -> Option<u16> {
        self.xmp.map(|_| self.images.len() as u16 + 1)
    }

    fn payloads(&self) -> impl Iterator<Item = &[u8]> {
        self.images
            .iter()
            .map(|img| img.data.as_slice())
            .chain(self.xmp)
    }

    fn meta_box(&self, mdat_payload_start: usize) -> Result<Vec<u8>, ImageError> {
        let mut meta = BoxWriter::full(FourCc::META, 0, 0);
        meta.child(self.hdlr()?)
            .child(self.pitm()?)
            .child(self.iloc(mdat_payload_start)?)
            .child(self.iinf()?);
        if let Some(iref) = self.iref()? {
            meta.child(iref);
        }
        meta.child(self.iprp()?);
        meta.finish()
    }

    fn hdlr(&self) -> Result<Vec<u8>, ImageError> {
        let mut b = BoxWriter::full(FourCc::HDLR, 0, 0);
        b.u32(0).fourcc(FourCc::PICT).u32(0).u32(0).u32(0).cstr("");
        b.finish()
    }

    fn pitm(&self) -> Result<Vec<u8>, ImageError> {
        let mut b = BoxWriter::full(FourCc::PITM, 0, 0);
        b.u16(1);
        b.finish()
    }

    fn iloc(&self, mdat_payload_start: usize) -> Result<Vec<u8>, ImageError> {
        let mut b = BoxWriter::full(FourCc::ILOC, 0, 0);
        // offset_size = 4, length_size = 4, base_offset_size = 0, reserved = 0
        b.u8(0x44).u8(0x00);
        let payloads: Vec<&[u8]> = self.payloads().collect();
        b.u16(payloads.len() as u16);

        let mut offset = mdat_payload_start;
        for (i, payload) in payloads.iter().enumerate() {
            let extent_offset = u32::try_from(offset).map_err(|_| {
                ImageError::invalid_format("item offset exceeds 32-bit iloc field")
            })?;
            let extent_length = u32::try_from(payload.len()).map_err(|_| {
                ImageError::invalid_format("item length exceeds 32-bit iloc field")
            })?;
            b.u16(i as u16 + 1) // item_ID
                .u16(0) // data_reference_index: this file
                .u16(1) // extent_count
                .u32(extent_offset)
                .u32(extent_length);
            offset += payload.len();
        }
        b.finish()
    }

    fn iinf(&self) -> Result<Vec<u8>, ImageError> {
        let mut b = BoxWriter::full(FourCc::IINF, 0, 0);
        let count = self.images.len() + usize::from(self.xmp.is_some());
        b.u16(count as u16);
        for (i, img) in self.images.iter().enumerate() {
            let mut infe = BoxWriter::full(FourCc::INFE, 2, 0);
            infe.u16(i as u16 + 1).u16(0).fourcc(img.codec).cstr("");
            b.child(infe.finish()?);
        }
        if let Some(id) = self.xmp_item_id() {
            let mut infe = BoxWriter::full(FourCc::INFE, 2, 0);
            infe.u16(id)
                .u16(0)
                .fourcc(FourCc::MIME)
                .cstr("XMP")
                .cstr(XMP_CONTENT_TYPE);
            b.child(infe.finish()?);
        }
        b.finish()
    }

    fn iref(&self) -> Result<Option<Vec<u8>>, ImageError> {
        let Some(xmp_id) = self.xmp_item_id() else {
            return Ok(None);
        };
        let mut cdsc = BoxWriter::new(FourCc::CDSC);
        cdsc.u16(xmp_id).u16(1).u16(1);
        let mut b = BoxWriter::full(FourCc::IREF, 0, 0);
        b.child(cdsc.finish()?);
        b.finish().map(Some)
    }

    fn iprp(&self) -> Result<Vec<u8>, ImageError> {
        let mut sizes: Vec<(u32, u32)> = Vec::new();
        let mut assoc: Vec<usize> = Vec::with_capacity(self.images.len());
        for img in self.images {
            let key = (img.width, img.height);
            let idx = match sizes.iter().position(|s| *s == key) {
                Some(idx) => idx,
                None => {
                    sizes.push(key);
                    sizes.len() - 1
                }
            };
            assoc.push(idx + 1);
        }

        let mut ipco = BoxWriter::new(FourCc::IPCO);
        for (w, h) in &sizes {
            let mut ispe = BoxWriter::full(FourCc::ISPE, 0, 0);
            ispe.u32(*w).u32(*h);
            ipco.child(ispe.finish()?);
        }

        let wide = sizes.len() > 0x7F;
        let mut ipma = BoxWriter::full(FourCc::IPMA, 0, u32::from(wide));
        ipma.u32(self.images.len() as u32);
        for (i, property_index) in assoc.iter().enumerate() {
            ipma.u16(i as u16 + 1).u8(1);
            // essential bit stays clear: ispe is descriptive
            if wide {
                ipma.u16(*property_index as u16);
            } else {
                ipma.u8(*property_index as u8);
            }
        }

        let mut iprp = BoxWriter::new(FourCc::IPRP);
        iprp.child(ipco.finish()?).child(ipma.finish()?);
        iprp.finish()
    }
}

/// Item entry from `iinf`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemInfo {
    /// Item id.
    pub id: u32,
    /// Item type (`jpeg`, `hvc1`, `grid`, `mime`, `Exif`, ...).
    pub kind: FourCc,
    /// Item name, often empty.
    pub name: String,
    /// Content type of `mime` items.
    pub content_type: Option<String>,
    /// Hidden items (for example grid tiles) are not standalone representations.
    pub hidden: bool,
}

#[derive(Clone, Debug, Default)]
struct Location {
    construction_method: u8,
    extents: Vec<(u64, u64)>,
}

#[derive(Clone, Debug)]
struct Reference {
    kind: FourCc,
    from: u32,
    to: Vec<u32>,
}

/// Parsed view of a HEIF file borrowed from its bytes.
#[derive(Debug)]
pub struct HeifContainer<'a> {
    data: &'a [u8],
    major_brand: FourCc,
    primary: u32,
    items: Vec<ItemInfo>,
    locations: HashMap<u32, Location>,
    references: Vec<Reference>,
    sizes: HashMap<u32, (u32, u32)>,
}

impl<'a> HeifContainer<'a> {
    /// Parse the `ftyp` and `meta` boxes of `data`.
    pub fn parse(data: &'a [u8]) -> Result<Self, ImageError> {
        let mut major_brand = None;
        let mut container = None;

        for entry in boxes(data, 0) {
            let (kind, payload, offset) = entry?;
            if kind == FourCc::FTYP {
                major_brand = Some(ByteReader::new(payload).fourcc()?);
            } else if kind == FourCc::META {
                container = Some((payload, offset));
            }
        }

        let major_brand =
            major_brand.ok_or_else(|| ImageError::invalid_format("missing ftyp box"))?;
        let (meta, meta_offset) =
            container.ok_or_else(|| ImageError::invalid_format("missing meta box"))?;

        let mut out = Self {
            data,
            major_brand,
            primary: 0,
            items: Vec::new(),
            locations: HashMap::new(),
            references: Vec::new(),
            sizes: HashMap::new(),
        };
        out.parse_meta(meta, meta_offset)?;
        if out.item(out.primary).is_none() {
            return Err(ImageError::invalid_format(format!(
                "primary item {} is not declared",
                out.primary
            )));
        }
        Ok(out)
    }

    fn parse_meta(&mut self, meta: &'a [u8], meta_offset: usize) -> Result<(), ImageError> {
        let mut r = ByteReader::new(meta);
        r.full_header()?;
        let mut saw_pitm = false;

        for entry in boxes(r.rest(), meta_offset + 4) {
            let (kind, payload, _) = entry?;
            match kind {
                FourCc::PITM => {
                    let mut r = ByteReader::new(payload);
                    let (version, _) = r.full_header()?;
                    self.primary = if version == 0 {
                        u32::from(r.u16()?)
                    } else {
                        r.u32()?
                    };
                    saw_pitm = true;
                }
                FourCc::ILOC => self.parse_iloc(payload)?,
                FourCc::IINF => self.parse_iinf(payload)?,
                FourCc::IREF => self.parse_iref(payload)?,
                FourCc::IPRP => self.parse_iprp(payload)?,
                _ => {}
            }
        }

        if !saw_pitm {
            return Err(ImageError::invalid_format("missing pitm box"));
        }
        Ok(())
    }

    fn parse_iloc(&mut self, payload: &[u8]) -> Result<(), ImageError> {
        let mut r = ByteReader::new(payload);
        let (version, _) = r.full_header()?;
        if version > 2 {
            return Err(ImageError::invalid_format(format!(
                "unsupported iloc version {version}"
            )));
        }
        let sizes = r.u8()?;
        let (offset_size, length_size) = (sizes >> 4, sizes & 0x0F);
        let sizes = r.u8()?;
        let base_offset_size = sizes >> 4;
        let index_size = if version >= 1 { sizes & 0x0F } else { 0 };
        let count = if version < 2 {
            u32::from(r.u16()?)
        } else {
            r.u32()?
        };

        for _ in 0..count {
            let id = if version < 2 {
                u32::from(r.u16()?)
            } else {
                r.u32()?
            };
            let construction_method = if version >= 1 {
                (r.u16()? & 0x0F) as u8
            } else {
                0
            };
            let _data_reference_index = r.u16()?;
            let base = r.uint(base_offset_size)?;
            let extent_count = r.u16()?;
            let mut extents = Vec::with_capacity(usize::from(extent_count));
            for _ in 0..extent_count {
                if index_size > 0 {
                    r.uint(index_size)?;
                }
                let offset = r.uint(offset_size)?;
                let length = r.uint(length_size)?;
                extents.push((base.saturating_add(offset), length));
            }
            self.locations.insert(
                id,
                Location {
                    construction_method,
                    extents,
                },
            );
        }
        Ok(())
    }

    fn parse_iinf(&mut self, payload: &[u8]) -> Result<(), ImageError> {
        let mut r = ByteReader::new(payload);
        let (version, _) = r.full_header()?;
        let _count = if version == 0 {
            u32::from(r.u16()?)
        } else {
            r.u32()?
        };

        for entry in boxes(r.rest(), 0) {
            let (kind, payload, _) = entry?;
            if kind != FourCc::INFE {
                continue;
            }
            let mut r = ByteReader::new(payload);
            let (version, flags) = r.full_header()?;
            let info = if version >= 2 {
                let id = if version == 2 {
                    u32::from(r.u16()?)
                } else {
                    r.u32()?
                };
                let _protection = r.u16()?;
                let kind = r.fourcc()?;
                let name = r.cstr()?;
                let content_type = if kind == FourCc::MIME && r.remaining() > 0 {
                    Some(r.cstr()?)
                } else {
                    None
                };
                ItemInfo {
                    id,
                    kind,
                    name,
                    content_type,
                    hidden: flags & 1 == 1,
                }
            } else {
                // Legacy entries carry a content type but no item type.
                let id = u32::from(r.u16()?);
                let _protection = r.u16()?;
                let name = r.cstr()?;
                let content_type = Some(r.cstr()?);
                ItemInfo {
                    id,
                    kind: FourCc::MIME,
                    name,
                    content_type,
                    hidden: flags & 1 == 1,
                }
            };
            self.items.push(info);
        }
        Ok(())
    }

    fn parse_iref(&mut self, payload: &[u8]) -> Result<(), ImageError> {
        let mut r = ByteReader::new(payload);
        let (version, _) = r.full_header()?;
        for entry in boxes(r.rest(), 0) {
            let (kind, payload, _) = entry?;
            let mut r = ByteReader::new(payload);
            let read_id = |r: &mut ByteReader<'_>| -> Result<u32, ImageError> {
                if version == 0 {
                    r.u16().map(u32::from)
                } else {
                    r.u32()
                }
            };
            let from = read_id(&mut r)?;
            let count = r.u16()?;
            let to = (0..count)
                .map(|_| read_id(&mut r))
                .collect::<Result<Vec<_>, _>>()?;
            self.references.push(Reference { kind, from, to });
        }
        Ok(())
    }

    fn parse_iprp(&mut self, payload: &[u8]) -> Result<(), ImageError> {
        let mut properties: Vec<(FourCc, &[u8])> = Vec::new();
        let mut associations: Vec<(u32, Vec<u16>)> = Vec::new();

        for entry in boxes(payload, 0) {
            let (kind, payload, _) = entry?;
            if kind == FourCc::IPCO {
                for prop in boxes(payload, 0) {
                    let (kind, payload, _) = prop?;
                    properties.push((kind, payload));
                }
            } else if kind == FourCc::IPMA {
                let mut r = ByteReader::new(payload);
                let (version, flags) = r.full_header()?;
                let count = r.u32()?;
                for _ in 0..count {
                    let id = if version < 1 {
                        u32::from(r.u16()?)
                    } else {
                        r.u32()?
                    };
                    let n = r.u8()?;
                    let mut indices = Vec::with_capacity(usize::from(n));
                    for _ in 0..n {
                        let index = if flags & 1 == 1 {
                            r.u16()? & 0x7FFF
                        } else {
                            u16::from(r.u8()? & 0x7F)
                        };
                        indices.push(index);
                    }
                    associations.push((id, indices));
                }
            }
        }

        for (id, indices) in associations {
            for index in indices {
                let Some((kind, payload)) = usize::from(index)
                    .checked_sub(1)
                    .and_then(|i| properties.get(i))
                else {
                    continue;
                };
                if *kind == FourCc::ISPE {
                    let mut r = ByteReader::new(payload);
                    r.full_header()?;
                    let size = (r.u32()?, r.u32()?);
                    self.sizes.insert(id, size);
                }
            }
        }
        Ok(())
    }

    /// Major brand from `ftyp`.
    pub fn major_brand(&self) -> FourCc {
        self.major_brand
    }

    /// Id of the primary item.
    pub fn primary_item_id(&self) -> u32 {
        self.primary
    }

    /// Every declared item, in `iinf` order.
    pub fn items(&self) -> &[ItemInfo] {
        &self.items
    }

    /// Item by id.
    pub fn item(&self, id: u32) -> Option<&ItemInfo> {
        self.items.iter().find(|i| i.id == id)
    }

    /// Standalone image representations: non-hidden items that are not metadata.
    pub fn image_items(&self) -> impl Iterator<Item = &ItemInfo> {
        self.items
            .iter()
            .filter(|i| !i.hidden && !i.kind.is_metadata_item())
    }

    /// `ispe` dimensions of an item.
    pub fn dimensions(&self, id: u32) -> Option<(u32, u32)> {
        self.sizes.get(&id).copied()
    }

    /// Item payload, concatenating all extents.
    pub fn item_data(&self, id: u32) -> Result<Vec<u8>, ImageError> {
        let loc = self
            .locations
            .get(&id)
            .ok_or_else(|| ImageError::data_not_obtained(format!("item {id} has no location")))?;
        if loc.construction_method != 0 {
            return Err(ImageError::data_not_obtained(format!(
                "item {id} uses construction method {}",
                loc.construction_method
            )));
        }

        let mut out = Vec::new();
        for &(offset, length) in &loc.extents {
            let start = usize::try_from(offset).unwrap_or(usize::MAX);
            let end = if length == 0 {
                self.data.len()
            } else {
                usize::try_from(length)
                    .ok()
                    .and_then(|l| start.checked_add(l))
                    .unwrap_or(usize::MAX)
            };
            let chunk = self.data.get(start..end).ok_or_else(|| {
                ImageError::data_not_obtained(format!(
                    "item {id} extent {start}..{end} is outside the file ({} bytes)",
                    self.data.len()
                ))
            })?;
            out.extend_from_slice(chunk);
        }
        Ok(out)
    }

    /// Items holding a `cdsc` reference to `id`.
    pub fn describing_items(&self, id: u32) -> Vec<&ItemInfo> {
        self.references
            .iter()
            .filter(|r| r.kind == FourCc::CDSC && r.to.contains(&id))
            .filter_map(|r| self.item(r.from))
            .collect()
    }

    /// XMP packet describing item `id`, if one is attached.
    pub fn xmp_for(&self, id: u32) -> Result<Option<Vec<u8>>, ImageError> {
        let xmp = self.describing_items(id).into_iter().find(|item| {
            item.kind == FourCc::MIME && item.content_type.as_deref() == Some(XMP_CONTENT_TYPE)
        });
        match xmp {
            Some(item) => self.item_data(item.id).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/container/heif.rs"]
mod tests;
