//! Package ("DBPF") archives: many named byte blobs, optionally compressed,
//! indexed by a `group!instance.type` key.
//!
//! The crate reads archives into folders (`Unpacker`) and packs folder trees
//! back into archives (`Packer`). Individual records can be translated to and
//! from editable files by a chain of `Converter`s.

#[macro_use]
extern crate static_assertions;

pub mod codec;
pub mod converter;
pub mod converters;
mod error;
pub mod hash;
pub mod header;
pub mod index;
pub mod key;
pub mod packer;
pub mod settings;
pub mod unpacker;
pub mod writer;

pub use error::{Error, Result};
pub use hash::{fnv, Hasher, NameRegistry};
pub use key::ResourceKey;

/// Well known keys and type ids.
pub mod keys {
    /// Group of the project names record (`sporemaster`).
    pub const NAMES_GROUP: u32 = 0x9C90_59AE;
    /// Instance of the project names record (`names`).
    pub const NAMES_INSTANCE: u32 = 0xCC2F_616F;
    /// Type of the project names record (`txt`).
    pub const NAMES_TYPE: u32 = 0x2B6C_AB5F;

    pub const SIGNATURE_GROUP: u32 = 0x4040_4000;
    pub const SIGNATURE_TYPE: u32 = 0x00B1_B104;

    /// Group of generated localization files; its `auto_*` entries are
    /// never unpacked.
    pub const AUTO_LOCALE_GROUP: u32 = 0x02FA_BF01;

    pub const RW4_TYPE: u32 = 0x2F4E_681B;
}
