use crate::error::{Error, Result};
use zerocopy::byteorder::{LittleEndian, U32};
use zerocopy::{AsBytes, FromBytes, LayoutVerified, Unaligned};

type U32LE = U32<LittleEndian>;

/// Signature every render graph starts with.
pub const MAGIC: [u8; 28] = *b"\x89RW4w32\x00\r\n\x1a\n\x00 \x04\x00454\x00000\x00\x00\x00\x00\x00";

/// Size of the fixed part of the header. The type-code table follows it
/// directly, one `u32` per code.
pub const HEADER_SIZE: usize = 60;

/// Size of one record of the section-info table.
pub const SECTION_INFO_SIZE: usize = 24;

/// What the graph as a whole represents.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum GraphKind {
    Model,
    Texture,
    Special,
    Other(u32),
}

impl GraphKind {
    pub fn from_u32(value: u32) -> Self {
        match value {
            0x0000_0001 => GraphKind::Model,
            0x0400_0000 => GraphKind::Texture,
            0xCAFE_D00D => GraphKind::Special,
            t => GraphKind::Other(t),
        }
    }

    pub fn to_u32(self) -> u32 {
        match self {
            GraphKind::Model => 0x0000_0001,
            GraphKind::Texture => 0x0400_0000,
            GraphKind::Special => 0xCAFE_D00D,
            GraphKind::Other(t) => t,
        }
    }
}

/// Fixed part of the render-graph header as stored on disk.
#[repr(C)]
#[derive(FromBytes, AsBytes, Unaligned, Copy, Clone, Debug)]
pub(crate) struct RawHeader {
    pub magic: [u8; 28],
    pub kind: U32LE,
    pub section_count: U32LE,
    pub type_code_count: U32LE,
    pub section_info_offset: U32LE,
    pub sub_reference_count: U32LE,
    pub sub_reference_offset: U32LE,
    pub buffer_data_offset: U32LE,
    pub buffer_data_size: U32LE,
}

assert_eq_size!(RawHeader, [u8; HEADER_SIZE]);

impl RawHeader {
    pub fn parse(bytes: &[u8]) -> Result<RawHeader> {
        let header = LayoutVerified::<_, RawHeader>::new_unaligned(bytes)
            .map(|lv| *lv)
            .ok_or(Error::Truncated("header"))?;

        if header.magic != MAGIC {
            return Err(Error::InvalidMagic);
        }
        Ok(header)
    }
}

/// Location and type of one section of the graph.
///
/// For base resources `data_offset` is relative to the start of the buffer
/// region; for every other object it is relative to the start of the graph.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct SectionInfo {
    pub type_code: u32,
    pub type_code_index: u32,
    pub alignment: u32,
    pub data_offset: u32,
    pub size: u32,
}

#[repr(C)]
#[derive(FromBytes, AsBytes, Unaligned, Copy, Clone, Debug)]
pub(crate) struct RawSectionInfo {
    pub data_offset: U32LE,
    pub reserved: U32LE,
    pub size: U32LE,
    pub alignment: U32LE,
    pub type_code_index: U32LE,
    pub type_code: U32LE,
}

assert_eq_size!(RawSectionInfo, [u8; SECTION_INFO_SIZE]);

impl From<RawSectionInfo> for SectionInfo {
    fn from(raw: RawSectionInfo) -> Self {
        SectionInfo {
            type_code: raw.type_code.get(),
            type_code_index: raw.type_code_index.get(),
            alignment: raw.alignment.get(),
            data_offset: raw.data_offset.get(),
            size: raw.size.get(),
        }
    }
}

impl From<&SectionInfo> for RawSectionInfo {
    fn from(info: &SectionInfo) -> Self {
        RawSectionInfo {
            data_offset: U32LE::new(info.data_offset),
            reserved: U32LE::new(0),
            size: U32LE::new(info.size),
            alignment: U32LE::new(info.alignment),
            type_code_index: U32LE::new(info.type_code_index),
            type_code: U32LE::new(info.type_code),
        }
    }
}

impl RawSectionInfo {
    pub fn parse(bytes: &[u8]) -> Result<RawSectionInfo> {
        LayoutVerified::<_, RawSectionInfo>::new_unaligned(bytes)
            .map(|lv| *lv)
            .ok_or(Error::Truncated("section info"))
    }
}
