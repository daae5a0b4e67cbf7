use crate::error::{Error, Result};
use crate::header::{
    GraphKind, RawHeader, RawSectionInfo, SectionInfo, HEADER_SIZE, MAGIC, SECTION_INFO_SIZE,
};
use crate::object::{Raster, RwObject};
use crate::reference::{Decoder, Encoder, ObjectId, Reference};
use crate::types::TypeCodeTable;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use common::patch::PatchWriter;
use log::{debug, warn};
use std::convert::TryFrom;
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use zerocopy::byteorder::U32;
use zerocopy::AsBytes;

/// Size of the runtime scratch area that follows the sub-reference table
/// for a table of `count` entries.
pub fn sub_reference_padding(count: usize) -> usize {
    (24 * count).max(48)
}

/// One section of the graph. `object` is `None` for sections whose type code
/// is not recognised; such slots keep their position so that indices of the
/// other sections stay valid.
#[derive(Debug, Clone, PartialEq)]
pub struct Slot {
    pub section: SectionInfo,
    pub object: Option<RwObject>,
}

/// Entry of the sub-reference table: a location `offset` bytes into `object`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct SubReference {
    pub object: Option<ObjectId>,
    pub offset: u32,
}

/// In-memory render graph: an arena of objects that reference each other by
/// `ObjectId`.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderGraph {
    kind: GraphKind,
    slots: Vec<Slot>,
    sub_references: Vec<SubReference>,
}

impl RenderGraph {
    pub fn new(kind: GraphKind) -> Self {
        RenderGraph {
            kind,
            slots: vec![],
            sub_references: vec![],
        }
    }

    #[inline]
    pub fn kind(&self) -> GraphKind {
        self.kind
    }

    #[inline]
    pub fn set_kind(&mut self, kind: GraphKind) {
        self.kind = kind;
    }

    #[inline]
    pub fn is_texture(&self) -> bool {
        self.kind == GraphKind::Texture
    }

    /// Appends an object to the graph and returns its id.
    pub fn add<T: Into<RwObject>>(&mut self, object: T) -> ObjectId {
        let object = object.into();
        let id = ObjectId(self.slots.len());
        self.slots.push(Slot {
            section: SectionInfo {
                type_code: object.type_code(),
                alignment: object.alignment(),
                ..SectionInfo::default()
            },
            object: Some(object),
        });
        id
    }

    pub fn get(&self, id: ObjectId) -> Option<&RwObject> {
        self.slots.get(id.0).and_then(|s| s.object.as_ref())
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut RwObject> {
        self.slots.get_mut(id.0).and_then(|s| s.object.as_mut())
    }

    /// Section info of the object as last read or written.
    pub fn section(&self, id: ObjectId) -> Option<&SectionInfo> {
        self.slots.get(id.0).map(|s| &s.section)
    }

    #[inline]
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Number of slots, placeholders included.
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Iterates over all recognised objects in section order.
    pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &RwObject)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.object.as_ref().map(|o| (ObjectId(i), o)))
    }

    pub fn rasters(&self) -> Vec<(ObjectId, &Raster)> {
        self.objects()
            .filter_map(|(id, o)| match o {
                RwObject::Raster(r) => Some((id, r)),
                _ => None,
            })
            .collect()
    }

    /// Resolves a reference to the object it points at. Sub-references
    /// resolve to the object that contains the referenced location.
    pub fn resolve(&self, reference: Reference) -> Option<ObjectId> {
        match reference {
            Reference::Object(id) => self.get(id).map(|_| id),
            Reference::SubReference(i) => self
                .sub_references
                .get(i as usize)
                .and_then(|s| s.object)
                .filter(|id| self.get(*id).is_some()),
            Reference::None => None,
        }
    }

    /// Registers a location inside an object and returns a reference to it.
    pub fn add_sub_reference(&mut self, object: ObjectId, offset: u32) -> Reference {
        self.sub_references.push(SubReference {
            object: Some(object),
            offset,
        });
        Reference::SubReference((self.sub_references.len() - 1) as u32)
    }

    #[inline]
    pub fn sub_references(&self) -> &[SubReference] {
        &self.sub_references
    }

    /// Reads only the header of a graph and returns its kind.
    pub fn peek_kind<R: Read>(stream: &mut R) -> Result<GraphKind> {
        let bytes = read_block(stream, HEADER_SIZE, "header")?;
        let header = RawHeader::parse(&bytes)?;
        Ok(GraphKind::from_u32(header.kind.get()))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<RenderGraph> {
        RenderGraph::read(&mut Cursor::new(bytes))
    }

    /// Reads a graph starting at the current position of the stream. All
    /// offsets of the file are relative to that position.
    pub fn read<R: Read + Seek>(stream: &mut R) -> Result<RenderGraph> {
        let base = stream.seek(SeekFrom::Current(0))?;
        let available = stream.seek(SeekFrom::End(0))?.saturating_sub(base);
        stream.seek(SeekFrom::Start(base))?;

        let header = RawHeader::parse(&read_block(stream, HEADER_SIZE, "header")?)?;
        let type_code_count = header.type_code_count.get() as usize;
        check_fits(available, HEADER_SIZE as u64, type_code_count, 4, "type code table")?;
        let mut type_codes = vec![];
        for _ in 0..type_code_count {
            type_codes.push(read_u32(stream, "type code table")?);
        }
        let types = TypeCodeTable::from_codes(type_codes);

        let section_count = header.section_count.get() as usize;
        let section_info_offset = header.section_info_offset.get() as u64;
        check_fits(
            available,
            section_info_offset,
            section_count,
            SECTION_INFO_SIZE as u64,
            "section table",
        )?;
        stream.seek(SeekFrom::Start(base + section_info_offset))?;
        let table = read_block(stream, section_count * SECTION_INFO_SIZE, "section table")?;
        let sections = table
            .chunks_exact(SECTION_INFO_SIZE)
            .map(|c| RawSectionInfo::parse(c).map(SectionInfo::from))
            .collect::<Result<Vec<_>>>()?;

        // every object must exist before any is read, references may point forward
        let mut slots = vec![];
        for (i, section) in sections.into_iter().enumerate() {
            let object = RwObject::instantiate(section.type_code);
            if object.is_none() {
                warn!(
                    "Unrecognised section type {:#x} at index {}, skipping.",
                    section.type_code, i
                );
            } else if types.index_of(section.type_code) != Some(section.type_code_index) {
                debug!("Section {} has inconsistent type code index.", i);
            }
            slots.push(Slot { section, object });
        }
        let present: Vec<bool> = slots.iter().map(|s| s.object.is_some()).collect();

        let sub_reference_count = header.sub_reference_count.get() as usize;
        let sub_reference_offset = header.sub_reference_offset.get() as u64;
        check_fits(
            available,
            sub_reference_offset,
            sub_reference_count,
            8,
            "sub-reference table",
        )?;
        stream.seek(SeekFrom::Start(base + sub_reference_offset))?;
        let table_decoder = Decoder {
            present: &present,
            sub_reference_count: 0,
        };
        let mut sub_references = vec![];
        for _ in 0..sub_reference_count {
            let raw = read_u32(stream, "sub-reference table")?;
            let offset = read_u32(stream, "sub-reference table")?;
            let object = match table_decoder.decode(raw)? {
                Reference::Object(id) => Some(id),
                Reference::None => None,
                Reference::SubReference(_) => return Err(Error::InvalidReference { raw }),
            };
            sub_references.push(SubReference { object, offset });
        }

        let decoder = Decoder {
            present: &present,
            sub_reference_count,
        };
        let buffer_data_offset = header.buffer_data_offset.get() as u64;
        for slot in slots.iter_mut() {
            if let Some(object) = slot.object.as_mut() {
                let mut offset = slot.section.data_offset as u64;
                if object.is_base_resource() {
                    offset += buffer_data_offset;
                }
                check_fits(available, offset, 1, slot.section.size as u64, "section data")?;
                stream.seek(SeekFrom::Start(base + offset))?;
                object.read(stream, &slot.section, &decoder)?;
            }
        }

        Ok(RenderGraph {
            kind: GraphKind::from_u32(header.kind.get()),
            slots,
            sub_references,
        })
    }

    pub fn to_bytes(&mut self) -> Result<Vec<u8>> {
        Ok(self.write(Cursor::new(vec![]))?.into_inner())
    }

    /// Writes the graph at the current position of `stream` and returns the
    /// stream positioned after the last byte. Placeholder slots are not
    /// written; the section infos of written objects are updated.
    pub fn write<W: Write + Seek>(&mut self, stream: W) -> Result<W> {
        let types = TypeCodeTable::build(self.objects().map(|(_, o)| o.type_code()));

        let mut next = 0u32;
        let remap: Vec<Option<u32>> = self
            .slots
            .iter()
            .map(|s| {
                s.object.as_ref().map(|_| {
                    next += 1;
                    next - 1
                })
            })
            .collect();
        let section_count = next as usize;
        let encoder = Encoder {
            remap,
            sub_reference_count: self.sub_references.len(),
        };

        let mut sections: Vec<Option<SectionInfo>> = vec![None; self.slots.len()];
        let mut writer = PatchWriter::new(stream)?;
        let header_space = writer.reserve(HEADER_SIZE + 4 * types.len())?;

        for (i, slot) in self.slots.iter().enumerate() {
            match &slot.object {
                Some(object) if !object.is_base_resource() => {
                    sections[i] = Some(write_section(&mut writer, object, &types, i, 0, &encoder)?);
                }
                _ => {}
            }
        }

        let section_info_offset = writer.position();
        let section_space = writer.reserve(section_count * SECTION_INFO_SIZE)?;

        let sub_reference_offset = writer.position();
        for sub in &self.sub_references {
            let reference = sub.object.map(Reference::Object).unwrap_or(Reference::None);
            writer.write_u32::<LittleEndian>(encoder.encode(reference)?)?;
            writer.write_u32::<LittleEndian>(sub.offset)?;
        }
        writer.pad(sub_reference_padding(self.sub_references.len()))?;

        let buffer_data_offset = writer.position();
        for (i, slot) in self.slots.iter().enumerate() {
            match &slot.object {
                Some(object) if object.is_base_resource() => {
                    sections[i] = Some(write_section(
                        &mut writer,
                        object,
                        &types,
                        i,
                        buffer_data_offset,
                        &encoder,
                    )?);
                }
                _ => {}
            }
        }
        let buffer_data_size = writer.position() - buffer_data_offset;

        let header = RawHeader {
            magic: MAGIC,
            kind: U32::new(self.kind.to_u32()),
            section_count: U32::new(section_count as u32),
            type_code_count: U32::new(types.len() as u32),
            section_info_offset: U32::new(fit("section_info_offset", section_info_offset)?),
            sub_reference_count: U32::new(self.sub_references.len() as u32),
            sub_reference_offset: U32::new(fit("sub_reference_offset", sub_reference_offset)?),
            buffer_data_offset: U32::new(fit("buffer_data_offset", buffer_data_offset)?),
            buffer_data_size: U32::new(fit("buffer_data_size", buffer_data_size)?),
        };
        let mut header_bytes = header.as_bytes().to_vec();
        for code in types.codes() {
            header_bytes.write_u32::<LittleEndian>(*code)?;
        }
        writer.patch(&header_space, &header_bytes)?;

        let mut section_bytes = Vec::with_capacity(section_count * SECTION_INFO_SIZE);
        for (slot, section) in self.slots.iter_mut().zip(sections.into_iter()) {
            if let Some(section) = section {
                section_bytes.extend_from_slice(RawSectionInfo::from(&section).as_bytes());
                slot.section = section;
            }
        }
        writer.patch(&section_space, &section_bytes)?;

        Ok(writer.into_inner()?)
    }
}

/// Writes one object aligned and returns its section info. `region` is the
/// offset the data offset is made relative to.
fn write_section<W: Write + Seek>(
    writer: &mut PatchWriter<W>,
    object: &RwObject,
    types: &TypeCodeTable,
    slot: usize,
    region: u64,
    encoder: &Encoder,
) -> Result<SectionInfo> {
    let type_code = object.type_code();
    let type_code_index = types
        .index_of(type_code)
        .ok_or(Error::UnknownTypeIndex {
            section: slot,
            type_code,
        })?;

    writer.align(object.alignment())?;
    let start = writer.position();
    object.write(writer, encoder)?;

    Ok(SectionInfo {
        type_code,
        type_code_index,
        alignment: object.alignment(),
        data_offset: fit("data_offset", start - region)?,
        size: fit("size", writer.position() - start)?,
    })
}

/// Fails unless `count` records of `size` bytes starting at `offset` lie
/// within the `available` bytes of the graph.
fn check_fits(
    available: u64,
    offset: u64,
    count: usize,
    size: u64,
    what: &'static str,
) -> Result<()> {
    match (count as u64)
        .checked_mul(size)
        .and_then(|len| len.checked_add(offset))
    {
        Some(last) if last <= available => Ok(()),
        _ => Err(Error::Truncated(what)),
    }
}

fn fit(field: &'static str, value: u64) -> Result<u32> {
    u32::try_from(value).map_err(|_| Error::OffsetOverflow { field, value })
}

fn read_block<R: Read>(stream: &mut R, len: usize, what: &'static str) -> Result<Vec<u8>> {
    let mut buf = vec![0; len];
    stream.read_exact(&mut buf).map_err(|e| truncated(e, what))?;
    Ok(buf)
}

fn read_u32<R: Read>(stream: &mut R, what: &'static str) -> Result<u32> {
    stream
        .read_u32::<LittleEndian>()
        .map_err(|e| truncated(e, what))
}

fn truncated(e: io::Error, what: &'static str) -> Error {
    match e.kind() {
        io::ErrorKind::UnexpectedEof => Error::Truncated(what),
        _ => Error::Io(e),
    }
}
