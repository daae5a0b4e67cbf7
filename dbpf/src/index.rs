use crate::codec::Codec;
use crate::error::{Error, Result};
use crate::header::{ArchiveHeader, Variant};
use crate::key::ResourceKey;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::convert::TryFrom;
use std::io::{Cursor, Read, Seek, SeekFrom};

const CONSTANT_TYPE: u32 = 0b01;
const CONSTANT_GROUP: u32 = 0b10;

const SIZE_FLAG: u32 = 0x8000_0000;
const COMPRESSED: u16 = 0xFFFF;
const COMMITTED: u16 = 1;

/// One record of the index: where the payload of `key` is stored and how.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ArchiveItem {
    pub key: ResourceKey,
    pub chunk_offset: u64,
    pub compressed_size: u32,
    pub mem_size: u32,
    pub is_compressed: bool,
}

impl ArchiveItem {
    /// Reads the payload bytes exactly as stored.
    pub fn read_stored<R: Read + Seek>(&self, stream: &mut R) -> Result<Vec<u8>> {
        check_bounds(stream, "record", self.chunk_offset, self.compressed_size as u64)?;
        stream.seek(SeekFrom::Start(self.chunk_offset))?;
        let mut data = vec![0; self.compressed_size as usize];
        stream.read_exact(&mut data)?;
        Ok(data)
    }

    /// Expands stored bytes of this item. Uncompressed items are returned
    /// as they are.
    pub fn expand(&self, stored: &[u8], codec: &dyn Codec) -> Result<Vec<u8>> {
        if !self.is_compressed {
            return Ok(stored.to_vec());
        }
        let data = codec.decompress(stored, self.mem_size as usize)?;
        if data.len() != self.mem_size as usize {
            return Err(Error::SizeMismatch {
                expected: self.mem_size as usize,
                actual: data.len(),
            });
        }
        Ok(data)
    }

    /// Reads and expands the payload.
    pub fn read_data<R: Read + Seek>(&self, stream: &mut R, codec: &dyn Codec) -> Result<Vec<u8>> {
        let stored = self.read_stored(stream)?;
        self.expand(&stored, codec)
    }
}

/// Fails unless `size` bytes starting at `offset` exist in the stream.
fn check_bounds<R: Seek>(stream: &mut R, what: &'static str, offset: u64, size: u64) -> Result<()> {
    let end = stream.seek(SeekFrom::End(0))?;
    match offset.checked_add(size) {
        Some(last) if last <= end => Ok(()),
        _ => Err(Error::OutOfBounds { what, offset, size }),
    }
}

/// Ordered list of items. The order is the order on disk.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct ArchiveIndex {
    pub items: Vec<ArchiveItem>,
}

impl ArchiveIndex {
    /// Number of bytes the writer needs for an index of `count` items.
    pub fn byte_size(variant: Variant, count: usize) -> usize {
        4 + count * variant.item_size()
    }

    /// Reads the index described by `header`.
    pub fn read<R: Read + Seek>(stream: &mut R, header: &ArchiveHeader) -> Result<ArchiveIndex> {
        stream.seek(SeekFrom::Start(header.index_offset))?;
        let type_flags = stream.read_u32::<LittleEndian>()?;
        let constant_type = if type_flags & CONSTANT_TYPE != 0 {
            Some(stream.read_u32::<LittleEndian>()?)
        } else {
            None
        };
        let constant_group = if type_flags & CONSTANT_GROUP != 0 {
            Some(stream.read_u32::<LittleEndian>()?)
        } else {
            None
        };

        let count = header.index_count as u64;
        let constants = constant_type.iter().chain(constant_group.iter()).count() as u64;
        let consumed = 4 + 4 * constants + count * (header.variant.item_size() as u64 - 4 * constants);
        if consumed != header.index_size {
            return Err(Error::IndexSizeMismatch {
                declared: header.index_size,
                consumed,
            });
        }
        check_bounds(stream, "index", header.index_offset, consumed)?;
        stream.seek(SeekFrom::Start(header.index_offset + 4 + 4 * constants))?;

        let mut bytes = vec![0; (consumed - 4 - 4 * constants) as usize];
        stream.read_exact(&mut bytes)?;
        let mut records = Cursor::new(bytes);

        let mut items = vec![];
        for _ in 0..header.index_count {
            let type_id = match constant_type {
                Some(t) => t,
                None => records.read_u32::<LittleEndian>()?,
            };
            let group = match constant_group {
                Some(g) => g,
                None => records.read_u32::<LittleEndian>()?,
            };
            let instance = records.read_u32::<LittleEndian>()?;
            let chunk_offset = match header.variant {
                Variant::Dbpf => records.read_u32::<LittleEndian>()? as u64,
                Variant::Dbbf => records.read_u64::<LittleEndian>()?,
            };
            let compressed_size = records.read_u32::<LittleEndian>()? & !SIZE_FLAG;
            let mem_size = records.read_u32::<LittleEndian>()?;
            let compression = records.read_u16::<LittleEndian>()?;
            let _committed = records.read_u16::<LittleEndian>()?;

            items.push(ArchiveItem {
                key: ResourceKey::new(group, instance, type_id),
                chunk_offset,
                compressed_size,
                mem_size,
                is_compressed: compression == COMPRESSED,
            });
        }

        Ok(ArchiveIndex { items })
    }

    /// Serializes the index. No constant fields are used.
    pub fn to_bytes(&self, variant: Variant) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(Self::byte_size(variant, self.items.len()));
        out.write_u32::<LittleEndian>(0)?;
        for item in &self.items {
            out.write_u32::<LittleEndian>(item.key.type_id)?;
            out.write_u32::<LittleEndian>(item.key.group)?;
            out.write_u32::<LittleEndian>(item.key.instance)?;
            match variant {
                Variant::Dbpf => {
                    let offset = u32::try_from(item.chunk_offset).map_err(|_| Error::OffsetOverflow {
                        field: "chunk_offset",
                        value: item.chunk_offset,
                    })?;
                    out.write_u32::<LittleEndian>(offset)?;
                }
                Variant::Dbbf => out.write_u64::<LittleEndian>(item.chunk_offset)?,
            }
            out.write_u32::<LittleEndian>(item.compressed_size | SIZE_FLAG)?;
            out.write_u32::<LittleEndian>(item.mem_size)?;
            out.write_u16::<LittleEndian>(if item.is_compressed { COMPRESSED } else { 0 })?;
            out.write_u16::<LittleEndian>(COMMITTED)?;
        }
        Ok(out)
    }

    pub fn find(&self, key: &ResourceKey) -> Option<&ArchiveItem> {
        self.items.iter().find(|i| i.key.is_equivalent(key))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ArchiveItem> {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use crate::header::{ArchiveHeader, Variant};
    use crate::index::{ArchiveIndex, ArchiveItem};
    use crate::key::ResourceKey;
    use crate::Error;
    use byteorder::{LittleEndian, WriteBytesExt};
    use matches::assert_matches;
    use std::io::Cursor;

    fn index() -> ArchiveIndex {
        ArchiveIndex {
            items: vec![
                ArchiveItem {
                    key: ResourceKey::new(1, 2, 3),
                    chunk_offset: 96,
                    compressed_size: 10,
                    mem_size: 10,
                    is_compressed: false,
                },
                ArchiveItem {
                    key: ResourceKey::new(1, 5, 3),
                    chunk_offset: 106,
                    compressed_size: 40,
                    mem_size: 100,
                    is_compressed: true,
                },
            ],
        }
    }

    fn header_for(variant: Variant, bytes: &[u8], count: u32) -> ArchiveHeader {
        ArchiveHeader {
            index_count: count,
            index_offset: 0,
            index_size: bytes.len() as u64,
            ..ArchiveHeader::new(variant)
        }
    }

    #[test]
    fn index_round_trip_both_variants() {
        for variant in &[Variant::Dbpf, Variant::Dbbf] {
            let bytes = index().to_bytes(*variant).unwrap();
            assert_eq!(bytes.len(), ArchiveIndex::byte_size(*variant, 2));

            let header = header_for(*variant, &bytes, 2);
            let read = ArchiveIndex::read(&mut Cursor::new(bytes), &header).unwrap();
            assert_eq!(read, index());
        }
    }

    #[test]
    fn compressed_size_carries_flag_bit() {
        let bytes = index().to_bytes(Variant::Dbpf).unwrap();
        // second item, compressed_size field
        let at = 4 + 28 + 16;
        assert_eq!(&bytes[at..at + 4], &[40, 0, 0, 0x80]);
        assert_eq!(&bytes[at + 8..at + 12], &[0xFF, 0xFF, 1, 0]);
    }

    #[test]
    fn reader_honours_constant_fields() {
        let mut bytes = vec![];
        bytes.write_u32::<LittleEndian>(0b11).unwrap();
        bytes.write_u32::<LittleEndian>(0xAA).unwrap(); // type
        bytes.write_u32::<LittleEndian>(0xBB).unwrap(); // group
        for instance in 1..=2u32 {
            bytes.write_u32::<LittleEndian>(instance).unwrap();
            bytes.write_u32::<LittleEndian>(96).unwrap();
            bytes.write_u32::<LittleEndian>(0x8000_0004).unwrap();
            bytes.write_u32::<LittleEndian>(4).unwrap();
            bytes.write_u16::<LittleEndian>(0).unwrap();
            bytes.write_u16::<LittleEndian>(1).unwrap();
        }

        let header = header_for(Variant::Dbpf, &bytes, 2);
        let read = ArchiveIndex::read(&mut Cursor::new(bytes), &header).unwrap();
        assert_eq!(read.items[1].key, ResourceKey::new(0xBB, 2, 0xAA));
        assert_eq!(read.items[1].compressed_size, 4);
        assert!(!read.items[1].is_compressed);
    }

    #[test]
    fn declared_size_must_match_items() {
        let bytes = index().to_bytes(Variant::Dbpf).unwrap();
        let header = ArchiveHeader {
            index_size: bytes.len() as u64 + 4,
            ..header_for(Variant::Dbpf, &bytes, 2)
        };
        assert_matches!(
            ArchiveIndex::read(&mut Cursor::new(bytes), &header),
            Err(Error::IndexSizeMismatch { .. })
        );
    }

    #[test]
    fn counts_past_the_end_are_rejected() {
        let bytes = index().to_bytes(Variant::Dbpf).unwrap();
        let count = 0x0100_0000;
        let header = ArchiveHeader {
            index_size: ArchiveIndex::byte_size(Variant::Dbpf, count as usize) as u64,
            ..header_for(Variant::Dbpf, &bytes, count)
        };
        assert_matches!(
            ArchiveIndex::read(&mut Cursor::new(bytes), &header),
            Err(Error::OutOfBounds { what: "index", .. })
        );
    }

    #[test]
    fn records_past_the_end_are_rejected() {
        let item = ArchiveItem {
            chunk_offset: 8,
            compressed_size: 0x7FFF_FFFF,
            ..index().items[0]
        };
        let mut stream = Cursor::new(vec![0u8; 16]);
        assert_matches!(
            item.read_stored(&mut stream),
            Err(Error::OutOfBounds { what: "record", .. })
        );

        let item = ArchiveItem {
            chunk_offset: 8,
            compressed_size: 8,
            ..item
        };
        assert_eq!(item.read_stored(&mut stream).unwrap().len(), 8);
    }
}
