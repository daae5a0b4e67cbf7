use crate::codec::Codec;
use crate::error::{Error, Result};
use crate::header::{ArchiveHeader, Variant};
use crate::index::{ArchiveIndex, ArchiveItem};
use crate::key::ResourceKey;
use common::patch::{PatchWriter, Reservation};
use log::trace;
use std::convert::TryFrom;
use std::io::{Seek, Write};

/// Something a record can be written into. Converters receive this while
/// packing.
pub trait RecordWriter {
    fn write_record(&mut self, key: ResourceKey, data: &[u8]) -> Result<()>;
}

/// Streams records into a new archive.
///
/// Payloads are appended as they come; the header is reserved up front and
/// patched, together with the index, by `finish()`.
pub struct PackageWriter<'a, W: Write + Seek> {
    writer: PatchWriter<W>,
    header: ArchiveHeader,
    header_space: Reservation,
    index: ArchiveIndex,
    codec: &'a dyn Codec,
    compress_threshold: Option<usize>,
}

impl<'a, W: Write + Seek> PackageWriter<'a, W> {
    pub fn new(stream: W, variant: Variant, codec: &'a dyn Codec) -> Result<Self> {
        let mut writer = PatchWriter::new(stream)?;
        let header_space = writer.reserve(variant.header_size())?;
        Ok(PackageWriter {
            writer,
            header: ArchiveHeader::new(variant),
            header_space,
            index: ArchiveIndex::default(),
            codec,
            compress_threshold: None,
        })
    }

    /// Payloads larger than `threshold` bytes are compressed when that makes
    /// them smaller. `None` disables compression.
    pub fn set_compress_threshold(&mut self, threshold: Option<usize>) {
        self.compress_threshold = threshold;
    }

    #[inline]
    pub fn items(&self) -> &[ArchiveItem] {
        &self.index.items
    }

    /// Appends a payload as stored bytes. `mem_size` is the size after
    /// expansion; it must equal `stored.len()` for uncompressed payloads.
    pub fn write_stored(
        &mut self,
        key: ResourceKey,
        stored: &[u8],
        mem_size: u32,
        is_compressed: bool,
    ) -> Result<()> {
        let compressed_size = u32::try_from(stored.len()).map_err(|_| Error::OffsetOverflow {
            field: "compressed_size",
            value: stored.len() as u64,
        })?;
        if compressed_size & 0x8000_0000 != 0 {
            return Err(Error::OffsetOverflow {
                field: "compressed_size",
                value: compressed_size as u64,
            });
        }

        let chunk_offset = self.writer.position();
        self.writer.write_all(stored)?;
        trace!("{} stored at {:#x} ({} bytes)", key, chunk_offset, stored.len());

        self.index.items.push(ArchiveItem {
            key,
            chunk_offset,
            compressed_size,
            mem_size,
            is_compressed,
        });
        Ok(())
    }

    /// Writes the index and the header and returns the underlying stream.
    pub fn finish(mut self) -> Result<W> {
        let variant = self.header.variant;
        let index_bytes = self.index.to_bytes(variant)?;
        let index_space = self.writer.reserve(index_bytes.len())?;

        self.header.index_count = self.index.items.len() as u32;
        self.header.index_offset = index_space.offset();
        self.header.index_size = index_space.len() as u64;

        self.writer
            .patch(&self.header_space, &self.header.to_bytes()?)?;
        self.writer.patch(&index_space, &index_bytes)?;
        Ok(self.writer.into_inner()?)
    }
}

impl<W: Write + Seek> RecordWriter for PackageWriter<'_, W> {
    fn write_record(&mut self, key: ResourceKey, data: &[u8]) -> Result<()> {
        let mem_size = u32::try_from(data.len()).map_err(|_| Error::OffsetOverflow {
            field: "mem_size",
            value: data.len() as u64,
        })?;

        if let Some(threshold) = self.compress_threshold {
            if data.len() > threshold {
                let compressed = self.codec.compress(data)?;
                if compressed.len() < data.len() {
                    return self.write_stored(key, &compressed, mem_size, true);
                }
            }
        }
        self.write_stored(key, data, mem_size, false)
    }
}

#[cfg(test)]
mod tests {
    use crate::codec::Lz4Codec;
    use crate::header::{ArchiveHeader, Variant, DBPF_HEADER_SIZE};
    use crate::index::ArchiveIndex;
    use crate::key::ResourceKey;
    use crate::writer::{PackageWriter, RecordWriter};
    use std::io::Cursor;

    #[test]
    fn empty_archive() {
        let codec = Lz4Codec::default();
        let writer = PackageWriter::new(Cursor::new(vec![]), Variant::Dbpf, &codec).unwrap();
        let bytes = writer.finish().unwrap().into_inner();

        assert_eq!(bytes.len(), DBPF_HEADER_SIZE + 4);
        let header = ArchiveHeader::read(&mut bytes.as_slice()).unwrap();
        assert_eq!(header.index_count, 0);
        assert_eq!(header.index_offset, DBPF_HEADER_SIZE as u64);
        assert_eq!(header.index_size, 4);
    }

    #[test]
    fn records_follow_header_and_precede_index() {
        let codec = Lz4Codec::default();
        let mut writer = PackageWriter::new(Cursor::new(vec![]), Variant::Dbbf, &codec).unwrap();
        writer.set_compress_threshold(Some(16));
        writer.write_record(ResourceKey::new(1, 1, 1), b"tiny").unwrap();
        writer
            .write_record(ResourceKey::new(1, 2, 1), &[b'z'; 1000])
            .unwrap();
        let mut stream = writer.finish().unwrap();

        stream.set_position(0);
        let header = ArchiveHeader::read(&mut stream).unwrap();
        let index = ArchiveIndex::read(&mut stream, &header).unwrap();

        assert_eq!(index.items[0].chunk_offset, 120);
        assert!(!index.items[0].is_compressed);
        assert!(index.items[1].is_compressed);
        assert_eq!(index.items[1].mem_size, 1000);
        assert_eq!(
            header.index_offset,
            index.items[1].chunk_offset + index.items[1].compressed_size as u64
        );
        assert_eq!(index.items[1].read_data(&mut stream, &codec).unwrap(), vec![b'z'; 1000]);
    }
}
