//! Minimal DirectDraw Surface container: one 2D texture with mip-maps.

use crate::error::{Error, Result};
use std::convert::TryFrom;
use zerocopy::byteorder::{LittleEndian, U32};
use zerocopy::{AsBytes, FromBytes, LayoutVerified, Unaligned};

type U32LE = U32<LittleEndian>;

const MAGIC: [u8; 4] = *b"DDS ";
const HEADER_SIZE: usize = 124;
const PIXEL_FORMAT_SIZE: u32 = 32;

const DDSD_CAPS: u32 = 0x1;
const DDSD_HEIGHT: u32 = 0x2;
const DDSD_WIDTH: u32 = 0x4;
const DDSD_PITCH: u32 = 0x8;
const DDSD_PIXELFORMAT: u32 = 0x1000;
const DDSD_MIPMAPCOUNT: u32 = 0x2_0000;
const DDSD_LINEARSIZE: u32 = 0x8_0000;

const DDPF_ALPHAPIXELS: u32 = 0x1;
const DDPF_FOURCC: u32 = 0x4;
const DDPF_RGB: u32 = 0x40;

const DDSCAPS_COMPLEX: u32 = 0x8;
const DDSCAPS_TEXTURE: u32 = 0x1000;
const DDSCAPS_MIPMAP: u32 = 0x40_0000;

pub const D3DFMT_A8R8G8B8: u32 = 21;
pub const D3DFMT_X8R8G8B8: u32 = 22;
pub const D3DFMT_DXT1: u32 = 0x3154_5844;
pub const D3DFMT_DXT3: u32 = 0x3354_5844;
pub const D3DFMT_DXT5: u32 = 0x3554_5844;

#[repr(C)]
#[derive(FromBytes, AsBytes, Unaligned, Copy, Clone, Debug)]
struct RawHeader {
    size: U32LE,
    flags: U32LE,
    height: U32LE,
    width: U32LE,
    pitch_or_linear_size: U32LE,
    depth: U32LE,
    mip_map_count: U32LE,
    reserved1: [U32LE; 11],
    pf_size: U32LE,
    pf_flags: U32LE,
    pf_four_cc: U32LE,
    pf_rgb_bit_count: U32LE,
    pf_r_mask: U32LE,
    pf_g_mask: U32LE,
    pf_b_mask: U32LE,
    pf_a_mask: U32LE,
    caps: U32LE,
    caps2: U32LE,
    caps3: U32LE,
    caps4: U32LE,
    reserved2: U32LE,
}

assert_eq_size!(RawHeader, [u8; HEADER_SIZE]);

fn invalid(message: &str) -> Error {
    Error::Converter {
        name: "DDS",
        message: message.to_string(),
    }
}

/// Texture stored in a `.dds` file. `format` is a D3D format code, which for
/// block compressed textures is the FourCC.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DdsTexture {
    pub format: u32,
    pub width: u32,
    pub height: u32,
    pub levels: u32,
    pub data: Vec<u8>,
}

impl DdsTexture {
    pub fn parse(bytes: &[u8]) -> Result<DdsTexture> {
        if bytes.len() < 4 + HEADER_SIZE || bytes[..4] != MAGIC {
            return Err(invalid("not a dds file"));
        }
        let header = LayoutVerified::<_, RawHeader>::new_unaligned(&bytes[4..4 + HEADER_SIZE])
            .ok_or_else(|| invalid("truncated header"))?;

        let pf_flags = header.pf_flags.get();
        let format = if pf_flags & DDPF_FOURCC != 0 {
            header.pf_four_cc.get()
        } else if pf_flags & DDPF_RGB != 0 && header.pf_rgb_bit_count.get() == 32 {
            if pf_flags & DDPF_ALPHAPIXELS != 0 {
                D3DFMT_A8R8G8B8
            } else {
                D3DFMT_X8R8G8B8
            }
        } else {
            return Err(invalid("unsupported pixel format"));
        };

        Ok(DdsTexture {
            format,
            width: header.width.get(),
            height: header.height.get(),
            levels: header.mip_map_count.get().max(1),
            data: bytes[4 + HEADER_SIZE..].to_vec(),
        })
    }

    /// Pitch or size of the top level, saturated to the 32-bit header field.
    fn pitch_or_linear_size(&self) -> (u32, u32) {
        let (width, height) = (u64::from(self.width), u64::from(self.height));
        let blocks = ((width + 3) / 4).max(1) * ((height + 3) / 4).max(1);
        let (flag, size) = match self.format {
            D3DFMT_DXT1 => (DDSD_LINEARSIZE, blocks * 8),
            D3DFMT_DXT3 | D3DFMT_DXT5 => (DDSD_LINEARSIZE, blocks * 16),
            D3DFMT_A8R8G8B8 | D3DFMT_X8R8G8B8 => (DDSD_PITCH, width * 4),
            _ => (0, 0),
        };
        (flag, u32::try_from(size).unwrap_or(u32::MAX))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let zero = U32LE::new(0);
        let (size_flag, pitch) = self.pitch_or_linear_size();

        let (pf_flags, four_cc, bits, masks) = match self.format {
            D3DFMT_A8R8G8B8 => (
                DDPF_RGB | DDPF_ALPHAPIXELS,
                0,
                32,
                [0x00FF_0000, 0x0000_FF00, 0x0000_00FF, 0xFF00_0000],
            ),
            D3DFMT_X8R8G8B8 => (DDPF_RGB, 0, 32, [0x00FF_0000, 0x0000_FF00, 0x0000_00FF, 0]),
            fourcc => (DDPF_FOURCC, fourcc, 0, [0; 4]),
        };

        let mut caps = DDSCAPS_TEXTURE;
        let mut flags = DDSD_CAPS | DDSD_HEIGHT | DDSD_WIDTH | DDSD_PIXELFORMAT | size_flag;
        if self.levels > 1 {
            caps |= DDSCAPS_COMPLEX | DDSCAPS_MIPMAP;
            flags |= DDSD_MIPMAPCOUNT;
        }

        let header = RawHeader {
            size: U32LE::new(HEADER_SIZE as u32),
            flags: U32LE::new(flags),
            height: U32LE::new(self.height),
            width: U32LE::new(self.width),
            pitch_or_linear_size: U32LE::new(pitch),
            depth: zero,
            mip_map_count: U32LE::new(self.levels),
            reserved1: [zero; 11],
            pf_size: U32LE::new(PIXEL_FORMAT_SIZE),
            pf_flags: U32LE::new(pf_flags),
            pf_four_cc: U32LE::new(four_cc),
            pf_rgb_bit_count: U32LE::new(bits),
            pf_r_mask: U32LE::new(masks[0]),
            pf_g_mask: U32LE::new(masks[1]),
            pf_b_mask: U32LE::new(masks[2]),
            pf_a_mask: U32LE::new(masks[3]),
            caps: U32LE::new(caps),
            caps2: zero,
            caps3: zero,
            caps4: zero,
            reserved2: zero,
        };

        let mut bytes = Vec::with_capacity(4 + HEADER_SIZE + self.data.len());
        bytes.extend_from_slice(&MAGIC);
        bytes.extend_from_slice(header.as_bytes());
        bytes.extend_from_slice(&self.data);
        bytes
    }
}

#[cfg(test)]
mod tests {
    use crate::converters::dds::{DdsTexture, D3DFMT_A8R8G8B8, D3DFMT_DXT5};
    use byteorder::{ByteOrder, LittleEndian};

    #[test]
    fn huge_dimensions_saturate_the_size_field() {
        for &(format, width) in &[(D3DFMT_DXT5, 65535), (D3DFMT_A8R8G8B8, u32::MAX)] {
            let texture = DdsTexture {
                format,
                width,
                height: 65535,
                levels: 1,
                data: vec![],
            };
            let bytes = texture.to_bytes();
            assert_eq!(bytes.len(), 128);
            assert_eq!(LittleEndian::read_u32(&bytes[20..]), u32::MAX);
        }
    }

    #[test]
    fn dxt5_header() {
        let texture = DdsTexture {
            format: D3DFMT_DXT5,
            width: 16,
            height: 8,
            levels: 3,
            data: vec![1; 128 + 32 + 16],
        };
        let bytes = texture.to_bytes();

        assert_eq!(&bytes[..4], b"DDS ");
        assert_eq!(&bytes[84..88], b"DXT5");
        // linear size of the top level: 4 * 2 blocks of 16 bytes
        assert_eq!(&bytes[20..24], &[128, 0, 0, 0]);
        assert_eq!(DdsTexture::parse(&bytes).unwrap(), texture);
    }

    #[test]
    fn uncompressed_argb() {
        let texture = DdsTexture {
            format: D3DFMT_A8R8G8B8,
            width: 2,
            height: 2,
            levels: 1,
            data: vec![0xAB; 16],
        };
        assert_eq!(DdsTexture::parse(&texture.to_bytes()).unwrap(), texture);
    }

    #[test]
    fn rejects_other_files() {
        assert!(DdsTexture::parse(b"PNG").is_err());
        assert!(DdsTexture::parse(&[0u8; 200]).is_err());
    }
}
