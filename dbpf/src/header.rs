//! Fixed header at the start of every archive.
//!
//! Two sibling layouts exist: classic `DBPF` with 32-bit offsets (96 bytes)
//! and `DBBF` with 64-bit offsets (120 bytes). Both are represented by
//! `ArchiveHeader` in memory.

use crate::error::{Error, Result};
use std::convert::TryFrom;
use std::io::Read;
use zerocopy::byteorder::{LittleEndian, U32, U64};
use zerocopy::{AsBytes, FromBytes, LayoutVerified, Unaligned};

type U32LE = U32<LittleEndian>;
type U64LE = U64<LittleEndian>;

pub const DBPF_MAGIC: [u8; 4] = *b"DBPF";
pub const DBBF_MAGIC: [u8; 4] = *b"DBBF";

pub const DBPF_HEADER_SIZE: usize = 96;
pub const DBBF_HEADER_SIZE: usize = 120;

const INDEX_MINOR_VERSION: u32 = 3;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Variant {
    /// 32-bit offsets.
    Dbpf,
    /// 64-bit offsets.
    Dbbf,
}

impl Variant {
    pub fn header_size(self) -> usize {
        match self {
            Variant::Dbpf => DBPF_HEADER_SIZE,
            Variant::Dbbf => DBBF_HEADER_SIZE,
        }
    }

    /// Size of one index record (without the constant fields).
    pub fn item_size(self) -> usize {
        match self {
            Variant::Dbpf => 28,
            Variant::Dbbf => 32,
        }
    }

    fn major_version(self) -> u32 {
        match self {
            Variant::Dbpf => 2,
            Variant::Dbbf => 3,
        }
    }
}

#[repr(C)]
#[derive(FromBytes, AsBytes, Unaligned, Copy, Clone, Debug)]
struct RawDbpfHeader {
    magic: [u8; 4],
    major_version: U32LE,
    minor_version: U32LE,
    user_major_version: U32LE,
    user_minor_version: U32LE,
    flags: U32LE,
    created: U32LE,
    modified: U32LE,
    index_major_version: U32LE,
    index_count: U32LE,
    index_offset_v1: U32LE,
    index_size: U32LE,
    hole_count: U32LE,
    hole_offset: U32LE,
    hole_size: U32LE,
    index_minor_version: U32LE,
    index_offset: U32LE,
    reserved: [u8; 28],
}

assert_eq_size!(RawDbpfHeader, [u8; DBPF_HEADER_SIZE]);

#[repr(C)]
#[derive(FromBytes, AsBytes, Unaligned, Copy, Clone, Debug)]
struct RawDbbfHeader {
    magic: [u8; 4],
    major_version: U32LE,
    minor_version: U32LE,
    user_major_version: U32LE,
    user_minor_version: U32LE,
    flags: U32LE,
    created: U32LE,
    modified: U32LE,
    index_major_version: U32LE,
    index_count: U32LE,
    index_size: U64LE,
    hole_count: U32LE,
    hole_offset: U64LE,
    hole_size: U64LE,
    index_minor_version: U32LE,
    index_offset: U64LE,
    reserved: [u8; 40],
}

assert_eq_size!(RawDbbfHeader, [u8; DBBF_HEADER_SIZE]);

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ArchiveHeader {
    pub variant: Variant,
    pub major_version: u32,
    pub minor_version: u32,
    pub user_major_version: u32,
    pub user_minor_version: u32,
    pub flags: u32,
    pub created: u32,
    pub modified: u32,
    pub index_count: u32,
    pub index_offset: u64,
    pub index_size: u64,
    pub hole_count: u32,
    pub hole_offset: u64,
    pub hole_size: u64,
}

impl ArchiveHeader {
    pub fn new(variant: Variant) -> Self {
        ArchiveHeader {
            variant,
            major_version: variant.major_version(),
            minor_version: 0,
            user_major_version: 0,
            user_minor_version: 0,
            flags: 0,
            created: 0,
            modified: 0,
            index_count: 0,
            index_offset: 0,
            index_size: 0,
            hole_count: 0,
            hole_offset: 0,
            hole_size: 0,
        }
    }

    /// Reads the header at the current position of the stream.
    pub fn read<R: Read>(stream: &mut R) -> Result<ArchiveHeader> {
        let mut bytes = [0u8; DBBF_HEADER_SIZE];
        stream
            .read_exact(&mut bytes[..4])
            .map_err(|_| Error::TruncatedHeader)?;
        let magic = [bytes[0], bytes[1], bytes[2], bytes[3]];
        let variant = match magic {
            DBPF_MAGIC => Variant::Dbpf,
            DBBF_MAGIC => Variant::Dbbf,
            _ => return Err(Error::InvalidMagic(magic)),
        };

        let size = variant.header_size();
        stream
            .read_exact(&mut bytes[4..size])
            .map_err(|_| Error::TruncatedHeader)?;
        Self::parse(variant, &bytes[..size])
    }

    fn parse(variant: Variant, bytes: &[u8]) -> Result<ArchiveHeader> {
        match variant {
            Variant::Dbpf => {
                let raw = LayoutVerified::<_, RawDbpfHeader>::new_unaligned(bytes)
                    .ok_or(Error::TruncatedHeader)?;
                Ok(ArchiveHeader {
                    variant,
                    major_version: raw.major_version.get(),
                    minor_version: raw.minor_version.get(),
                    user_major_version: raw.user_major_version.get(),
                    user_minor_version: raw.user_minor_version.get(),
                    flags: raw.flags.get(),
                    created: raw.created.get(),
                    modified: raw.modified.get(),
                    index_count: raw.index_count.get(),
                    index_offset: raw.index_offset.get() as u64,
                    index_size: raw.index_size.get() as u64,
                    hole_count: raw.hole_count.get(),
                    hole_offset: raw.hole_offset.get() as u64,
                    hole_size: raw.hole_size.get() as u64,
                })
            }
            Variant::Dbbf => {
                let raw = LayoutVerified::<_, RawDbbfHeader>::new_unaligned(bytes)
                    .ok_or(Error::TruncatedHeader)?;
                Ok(ArchiveHeader {
                    variant,
                    major_version: raw.major_version.get(),
                    minor_version: raw.minor_version.get(),
                    user_major_version: raw.user_major_version.get(),
                    user_minor_version: raw.user_minor_version.get(),
                    flags: raw.flags.get(),
                    created: raw.created.get(),
                    modified: raw.modified.get(),
                    index_count: raw.index_count.get(),
                    index_offset: raw.index_offset.get(),
                    index_size: raw.index_size.get(),
                    hole_count: raw.hole_count.get(),
                    hole_offset: raw.hole_offset.get(),
                    hole_size: raw.hole_size.get(),
                })
            }
        }
    }

    /// Serializes the header in the layout of its variant.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let bytes = match self.variant {
            Variant::Dbpf => {
                let narrow = |field: &'static str, value: u64| {
                    u32::try_from(value).map_err(|_| Error::OffsetOverflow { field, value })
                };
                RawDbpfHeader {
                    magic: DBPF_MAGIC,
                    major_version: U32::new(self.major_version),
                    minor_version: U32::new(self.minor_version),
                    user_major_version: U32::new(self.user_major_version),
                    user_minor_version: U32::new(self.user_minor_version),
                    flags: U32::new(self.flags),
                    created: U32::new(self.created),
                    modified: U32::new(self.modified),
                    index_major_version: U32::new(0),
                    index_count: U32::new(self.index_count),
                    index_offset_v1: U32::new(0),
                    index_size: U32::new(narrow("index_size", self.index_size)?),
                    hole_count: U32::new(self.hole_count),
                    hole_offset: U32::new(narrow("hole_offset", self.hole_offset)?),
                    hole_size: U32::new(narrow("hole_size", self.hole_size)?),
                    index_minor_version: U32::new(INDEX_MINOR_VERSION),
                    index_offset: U32::new(narrow("index_offset", self.index_offset)?),
                    reserved: [0; 28],
                }
                .as_bytes()
                .to_vec()
            }
            Variant::Dbbf => RawDbbfHeader {
                magic: DBBF_MAGIC,
                major_version: U32::new(self.major_version),
                minor_version: U32::new(self.minor_version),
                user_major_version: U32::new(self.user_major_version),
                user_minor_version: U32::new(self.user_minor_version),
                flags: U32::new(self.flags),
                created: U32::new(self.created),
                modified: U32::new(self.modified),
                index_major_version: U32::new(0),
                index_count: U32::new(self.index_count),
                index_size: U64::new(self.index_size),
                hole_count: U32::new(self.hole_count),
                hole_offset: U64::new(self.hole_offset),
                hole_size: U64::new(self.hole_size),
                index_minor_version: U32::new(INDEX_MINOR_VERSION),
                index_offset: U64::new(self.index_offset),
                reserved: [0; 40],
            }
            .as_bytes()
            .to_vec(),
        };
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use crate::header::{ArchiveHeader, Variant, DBBF_HEADER_SIZE, DBPF_HEADER_SIZE};
    use crate::Error;
    use matches::assert_matches;

    fn sample(variant: Variant) -> ArchiveHeader {
        ArchiveHeader {
            index_count: 3,
            index_offset: 0x1234,
            index_size: 100,
            ..ArchiveHeader::new(variant)
        }
    }

    #[test]
    fn dbpf_layout() {
        let bytes = sample(Variant::Dbpf).to_bytes().unwrap();
        assert_eq!(bytes.len(), DBPF_HEADER_SIZE);
        assert_eq!(&bytes[0..4], b"DBPF");
        assert_eq!(&bytes[4..8], &[2, 0, 0, 0]);
        assert_eq!(&bytes[36..40], &[3, 0, 0, 0]);
        assert_eq!(&bytes[44..48], &[100, 0, 0, 0]);
        assert_eq!(&bytes[60..64], &[3, 0, 0, 0]);
        assert_eq!(&bytes[64..68], &[0x34, 0x12, 0, 0]);

        let read = ArchiveHeader::read(&mut bytes.as_slice()).unwrap();
        assert_eq!(read, sample(Variant::Dbpf));
    }

    #[test]
    fn dbbf_layout() {
        let header = sample(Variant::Dbbf);
        let bytes = header.to_bytes().unwrap();
        assert_eq!(bytes.len(), DBBF_HEADER_SIZE);
        assert_eq!(&bytes[0..4], b"DBBF");
        assert_eq!(&bytes[72..80], &[0x34, 0x12, 0, 0, 0, 0, 0, 0]);
        assert_eq!(ArchiveHeader::read(&mut bytes.as_slice()).unwrap(), header);
    }

    #[test]
    fn dbpf_rejects_wide_offsets() {
        let header = ArchiveHeader {
            index_offset: 1 << 32,
            ..ArchiveHeader::new(Variant::Dbpf)
        };
        assert_matches!(header.to_bytes(), Err(Error::OffsetOverflow { .. }));
    }

    #[test]
    fn invalid_and_truncated() {
        assert_matches!(
            ArchiveHeader::read(&mut &b"RIFF...."[..]),
            Err(Error::InvalidMagic(_))
        );
        assert_matches!(
            ArchiveHeader::read(&mut &b"DBPF\x02\x00"[..]),
            Err(Error::TruncatedHeader)
        );
    }
}
