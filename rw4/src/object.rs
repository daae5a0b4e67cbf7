use crate::codes;
use crate::error::{Error, Result};
use crate::header::SectionInfo;
use crate::reference::{Decoder, Encoder, Reference};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

/// Raw buffer (pixel data, vertex data...) owned by the graph. Base resources
/// are stored in their own region at the end of the file.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct BaseResource {
    pub data: Vec<u8>,
}

/// Texture descriptor. The pixel data lives in the base resource referenced
/// by `texture_data`.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct Raster {
    /// D3D format code (a FourCC for block-compressed formats).
    pub format: u32,
    pub flags: u16,
    pub volume_depth: u8,
    pub width: u16,
    pub height: u16,
    pub levels: u8,
    pub texture_type: u8,
    pub texture_data: Reference,
}

/// Index data description; the indices live in the base resource referenced
/// by `buffer`.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct IndexBuffer {
    pub start_index: u32,
    pub primitive_count: u32,
    pub usage: u32,
    pub format: u32,
    pub primitive_type: u32,
    pub buffer: Reference,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundingBox {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

/// Every kind of section the crate can read and write.
#[derive(Debug, Clone, PartialEq)]
pub enum RwObject {
    BaseResource(BaseResource),
    Raster(Raster),
    IndexBuffer(IndexBuffer),
    BoundingBox(BoundingBox),
}

impl RwObject {
    /// Creates an empty object for a section with the specified type code.
    /// Returns `None` for codes this crate does not know.
    pub(crate) fn instantiate(type_code: u32) -> Option<RwObject> {
        match type_code {
            codes::BASE_RESOURCE => Some(RwObject::BaseResource(BaseResource::default())),
            codes::RASTER => Some(RwObject::Raster(Raster::default())),
            codes::INDEX_BUFFER => Some(RwObject::IndexBuffer(IndexBuffer::default())),
            codes::BOUNDING_BOX => Some(RwObject::BoundingBox(BoundingBox::default())),
            _ => None,
        }
    }

    pub fn type_code(&self) -> u32 {
        match self {
            RwObject::BaseResource(_) => codes::BASE_RESOURCE,
            RwObject::Raster(_) => codes::RASTER,
            RwObject::IndexBuffer(_) => codes::INDEX_BUFFER,
            RwObject::BoundingBox(_) => codes::BOUNDING_BOX,
        }
    }

    /// Required alignment of the section payload, in bytes.
    pub fn alignment(&self) -> u32 {
        match self {
            RwObject::BaseResource(_) => 16,
            RwObject::BoundingBox(_) => 16,
            RwObject::Raster(_) | RwObject::IndexBuffer(_) => 4,
        }
    }

    #[inline]
    pub fn is_base_resource(&self) -> bool {
        matches!(self, RwObject::BaseResource(_))
    }

    /// All reference fields of the object.
    pub fn references(&self) -> Vec<Reference> {
        match self {
            RwObject::Raster(r) => vec![r.texture_data],
            RwObject::IndexBuffer(b) => vec![b.buffer],
            RwObject::BaseResource(_) | RwObject::BoundingBox(_) => vec![],
        }
    }

    pub(crate) fn read<R: Read>(
        &mut self,
        stream: &mut R,
        info: &SectionInfo,
        refs: &Decoder,
    ) -> Result<()> {
        match self {
            RwObject::BaseResource(b) => {
                b.data.clear();
                stream
                    .by_ref()
                    .take(info.size as u64)
                    .read_to_end(&mut b.data)?;
                if b.data.len() != info.size as usize {
                    return Err(Error::Truncated("base resource"));
                }
            }
            RwObject::Raster(r) => {
                r.format = stream.read_u32::<LittleEndian>()?;
                r.flags = stream.read_u16::<LittleEndian>()?;
                r.volume_depth = stream.read_u8()?;
                let _dx_base_texture = stream.read_u8()?;
                r.width = stream.read_u16::<LittleEndian>()?;
                r.height = stream.read_u16::<LittleEndian>()?;
                r.levels = stream.read_u8()?;
                r.texture_type = stream.read_u8()?;
                let _reserved = stream.read_u16::<LittleEndian>()?;
                let _dx_texture_pointer = stream.read_u32::<LittleEndian>()?;
                r.texture_data = refs.decode(stream.read_u32::<LittleEndian>()?)?;
            }
            RwObject::IndexBuffer(b) => {
                b.start_index = stream.read_u32::<LittleEndian>()?;
                b.primitive_count = stream.read_u32::<LittleEndian>()?;
                b.usage = stream.read_u32::<LittleEndian>()?;
                b.format = stream.read_u32::<LittleEndian>()?;
                b.primitive_type = stream.read_u32::<LittleEndian>()?;
                b.buffer = refs.decode(stream.read_u32::<LittleEndian>()?)?;
            }
            RwObject::BoundingBox(b) => {
                for v in b.min.iter_mut() {
                    *v = stream.read_f32::<LittleEndian>()?;
                }
                let _ = stream.read_u32::<LittleEndian>()?;
                for v in b.max.iter_mut() {
                    *v = stream.read_f32::<LittleEndian>()?;
                }
                let _ = stream.read_u32::<LittleEndian>()?;
            }
        }
        Ok(())
    }

    pub(crate) fn write<W: Write>(&self, stream: &mut W, refs: &Encoder) -> Result<()> {
        match self {
            RwObject::BaseResource(b) => stream.write_all(&b.data)?,
            RwObject::Raster(r) => {
                stream.write_u32::<LittleEndian>(r.format)?;
                stream.write_u16::<LittleEndian>(r.flags)?;
                stream.write_u8(r.volume_depth)?;
                stream.write_u8(0)?;
                stream.write_u16::<LittleEndian>(r.width)?;
                stream.write_u16::<LittleEndian>(r.height)?;
                stream.write_u8(r.levels)?;
                stream.write_u8(r.texture_type)?;
                stream.write_u16::<LittleEndian>(0)?;
                stream.write_u32::<LittleEndian>(0)?;
                stream.write_u32::<LittleEndian>(refs.encode(r.texture_data)?)?;
            }
            RwObject::IndexBuffer(b) => {
                stream.write_u32::<LittleEndian>(b.start_index)?;
                stream.write_u32::<LittleEndian>(b.primitive_count)?;
                stream.write_u32::<LittleEndian>(b.usage)?;
                stream.write_u32::<LittleEndian>(b.format)?;
                stream.write_u32::<LittleEndian>(b.primitive_type)?;
                stream.write_u32::<LittleEndian>(refs.encode(b.buffer)?)?;
            }
            RwObject::BoundingBox(b) => {
                for v in b.min.iter() {
                    stream.write_f32::<LittleEndian>(*v)?;
                }
                stream.write_u32::<LittleEndian>(0)?;
                for v in b.max.iter() {
                    stream.write_f32::<LittleEndian>(*v)?;
                }
                stream.write_u32::<LittleEndian>(0)?;
            }
        }
        Ok(())
    }
}

impl From<BaseResource> for RwObject {
    fn from(v: BaseResource) -> Self {
        RwObject::BaseResource(v)
    }
}

impl From<Raster> for RwObject {
    fn from(v: Raster) -> Self {
        RwObject::Raster(v)
    }
}

impl From<IndexBuffer> for RwObject {
    fn from(v: IndexBuffer) -> Self {
        RwObject::IndexBuffer(v)
    }
}

impl From<BoundingBox> for RwObject {
    fn from(v: BoundingBox) -> Self {
        RwObject::BoundingBox(v)
    }
}

#[cfg(test)]
mod tests {
    use crate::codes;
    use crate::object::{Raster, RwObject};
    use crate::reference::{Decoder, Encoder, ObjectId, Reference};
    use crate::SectionInfo;

    #[test]
    fn instantiate_known_and_unknown_codes() {
        assert!(RwObject::instantiate(codes::RASTER).is_some());
        assert!(RwObject::instantiate(codes::BASE_RESOURCE)
            .unwrap()
            .is_base_resource());
        assert!(RwObject::instantiate(0xDEAD_BEEF).is_none());
    }

    #[test]
    fn raster_payload_is_24_bytes() {
        let raster = RwObject::Raster(Raster {
            format: 0x3154_5844,
            width: 64,
            height: 32,
            levels: 7,
            texture_data: Reference::Object(ObjectId(0)),
            ..Raster::default()
        });
        let encoder = Encoder {
            remap: vec![Some(0), Some(1)],
            sub_reference_count: 0,
        };

        let mut bytes = vec![];
        raster.write(&mut bytes, &encoder).unwrap();
        assert_eq!(bytes.len(), 24);

        let present = [true, true];
        let decoder = Decoder {
            present: &present,
            sub_reference_count: 0,
        };
        let mut read = RwObject::instantiate(codes::RASTER).unwrap();
        read.read(&mut bytes.as_slice(), &SectionInfo::default(), &decoder)
            .unwrap();
        assert_eq!(read, raster);
    }
}
