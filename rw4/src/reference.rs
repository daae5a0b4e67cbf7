//! References between objects of a render graph.
//!
//! On disk every reference is a single `u32`: the top 10 bits select the kind
//! of reference and the low 22 bits the entry. Inside the crate references are
//! always the `Reference` enum; the packed `u32` only exists while reading or
//! writing.

use crate::error::{Error, Result};
use log::warn;

const KIND_SHIFT: u32 = 22;
const INDEX_MASK: u32 = (1 << KIND_SHIFT) - 1;

const KIND_OBJECT: u32 = 0;
const KIND_NO_OBJECT: u32 = 1;
const KIND_SUB_REFERENCE: u32 = 2;

/// Identity of an object inside a `RenderGraph` (its slot in the arena).
/// Two ids are equal only if they name the same slot, regardless of the
/// contents of the objects.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ObjectId(pub(crate) usize);

impl ObjectId {
    #[inline]
    pub fn index(self) -> usize {
        self.0
    }
}

/// A reference field of an object.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Reference {
    /// Points directly at an object of the same graph.
    Object(ObjectId),
    /// Points at an entry of the graph's sub-reference table.
    SubReference(u32),
    None,
}

impl Default for Reference {
    fn default() -> Self {
        Reference::None
    }
}

impl Reference {
    #[inline]
    pub fn is_none(&self) -> bool {
        matches!(self, Reference::None)
    }
}

/// Wire form of a reference: kind plus the final table position.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Tag {
    Object(u32),
    SubReference(u32),
    None,
}

impl Tag {
    /// Packs the tag into its on-disk representation.
    pub fn pack(self) -> Result<u32> {
        let (kind, index) = match self {
            Tag::Object(i) => (KIND_OBJECT, i),
            Tag::SubReference(i) => (KIND_SUB_REFERENCE, i),
            Tag::None => (KIND_NO_OBJECT, 0),
        };
        if index > INDEX_MASK {
            return Err(Error::ReferenceOutOfRange {
                index: index as usize,
            });
        }
        Ok((kind << KIND_SHIFT) | index)
    }

    /// Unpacks an on-disk reference. Unknown kinds are malformed data.
    pub fn unpack(raw: u32) -> Result<Tag> {
        let index = raw & INDEX_MASK;
        match raw >> KIND_SHIFT {
            KIND_OBJECT => Ok(Tag::Object(index)),
            KIND_SUB_REFERENCE => Ok(Tag::SubReference(index)),
            KIND_NO_OBJECT => Ok(Tag::None),
            _ => Err(Error::InvalidReference { raw }),
        }
    }
}

/// Turns packed references of a file being read into `Reference`s.
pub(crate) struct Decoder<'a> {
    /// For every section: whether an object was instantiated for it.
    pub present: &'a [bool],
    pub sub_reference_count: usize,
}

impl Decoder<'_> {
    pub fn decode(&self, raw: u32) -> Result<Reference> {
        match Tag::unpack(raw)? {
            Tag::None => Ok(Reference::None),
            Tag::Object(i) => match self.present.get(i as usize) {
                Some(true) => Ok(Reference::Object(ObjectId(i as usize))),
                Some(false) => {
                    warn!("Reference to unrecognised section {} resolved to no object.", i);
                    Ok(Reference::None)
                }
                None => Err(Error::InvalidReference { raw }),
            },
            Tag::SubReference(i) if (i as usize) < self.sub_reference_count => {
                Ok(Reference::SubReference(i))
            }
            Tag::SubReference(_) => Err(Error::InvalidReference { raw }),
        }
    }
}

/// Turns `Reference`s of a graph being written into packed references.
pub(crate) struct Encoder {
    /// Final section index of every arena slot; `None` for slots that are not
    /// written (placeholders of unrecognised sections).
    pub remap: Vec<Option<u32>>,
    pub sub_reference_count: usize,
}

impl Encoder {
    pub fn encode(&self, reference: Reference) -> Result<u32> {
        let tag = match reference {
            Reference::None => Tag::None,
            Reference::Object(id) => match self.remap.get(id.0) {
                Some(Some(index)) => Tag::Object(*index),
                Some(None) => {
                    warn!("Reference to unwritten object {} stored as no object.", id.0);
                    Tag::None
                }
                None => return Err(Error::ReferenceOutOfRange { index: id.0 }),
            },
            Reference::SubReference(i) if (i as usize) < self.sub_reference_count => {
                Tag::SubReference(i)
            }
            Reference::SubReference(i) => {
                return Err(Error::ReferenceOutOfRange { index: i as usize })
            }
        };
        tag.pack()
    }
}

#[cfg(test)]
mod tests {
    use crate::reference::{Decoder, Encoder, ObjectId, Reference, Tag};
    use crate::Error;
    use matches::assert_matches;
    use quickcheck_macros::quickcheck;

    #[test]
    fn no_object_round_trip() {
        let raw = Tag::None.pack().unwrap();
        assert_eq!(raw, 0x0040_0000);
        assert_eq!(Tag::unpack(raw).unwrap(), Tag::None);
    }

    #[quickcheck]
    fn tag_round_trip(index: u32, sub: bool) -> bool {
        let index = index & 0x003F_FFFF;
        let tag = if sub {
            Tag::SubReference(index)
        } else {
            Tag::Object(index)
        };
        Tag::unpack(tag.pack().unwrap()).unwrap() == tag
    }

    #[test]
    fn index_must_fit_22_bits() {
        assert_matches!(
            Tag::Object(0x0040_0000).pack(),
            Err(Error::ReferenceOutOfRange { .. })
        );
    }

    #[test]
    fn unknown_kind_is_invalid() {
        assert_matches!(
            Tag::unpack(3 << 22),
            Err(Error::InvalidReference { raw: 0x00C0_0000 })
        );
    }

    #[test]
    fn decoder_resolves_placeholders_to_none() {
        let present = [true, false, true];
        let decoder = Decoder {
            present: &present,
            sub_reference_count: 1,
        };

        assert_eq!(
            decoder.decode(2).unwrap(),
            Reference::Object(ObjectId(2))
        );
        assert_eq!(decoder.decode(1).unwrap(), Reference::None);
        assert_eq!(
            decoder.decode(0x0080_0000).unwrap(),
            Reference::SubReference(0)
        );
        assert_matches!(decoder.decode(7), Err(Error::InvalidReference { .. }));
        assert_matches!(
            decoder.decode(0x0080_0001),
            Err(Error::InvalidReference { .. })
        );
    }

    #[quickcheck]
    fn encode_then_decode_keeps_identity(len: u8, pick: u8) -> bool {
        let len = len as usize + 1;
        let pick = pick as usize % len;

        let encoder = Encoder {
            remap: (0..len as u32).map(Some).collect(),
            sub_reference_count: 0,
        };
        let present = vec![true; len];
        let decoder = Decoder {
            present: &present,
            sub_reference_count: 0,
        };

        let original = Reference::Object(ObjectId(pick));
        let raw = encoder.encode(original).unwrap();
        decoder.decode(raw).unwrap() == original
            && decoder.decode(encoder.encode(Reference::None).unwrap()).unwrap() == Reference::None
    }

    #[test]
    fn encoder_drops_dangling_references() {
        let encoder = Encoder {
            remap: vec![Some(0), None, Some(1)],
            sub_reference_count: 0,
        };

        assert_eq!(encoder.encode(Reference::Object(ObjectId(2))).unwrap(), 1);
        assert_eq!(
            encoder.encode(Reference::Object(ObjectId(1))).unwrap(),
            0x0040_0000
        );
        assert_matches!(
            encoder.encode(Reference::SubReference(0)),
            Err(Error::ReferenceOutOfRange { .. })
        );
    }
}
