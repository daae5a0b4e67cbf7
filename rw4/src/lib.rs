//! Reader and writer of the render-graph ("RW4") binary format.
//!
//! A render graph is an ordered list of typed sections. Sections reference
//! each other through 32-bit tagged indices (see `reference`), so every
//! object is instantiated before any of them is read, and the file is written
//! in two passes: payloads first, then the header and section table are
//! patched once their offsets are known.

#[macro_use]
extern crate static_assertions;

mod error;
mod graph;
mod header;
mod object;
mod reference;
mod types;

pub use error::{Error, Result};
pub use graph::{sub_reference_padding, RenderGraph, Slot, SubReference};
pub use header::{GraphKind, SectionInfo, HEADER_SIZE, MAGIC, SECTION_INFO_SIZE};
pub use object::{BaseResource, BoundingBox, IndexBuffer, Raster, RwObject};
pub use reference::{ObjectId, Reference, Tag};
pub use types::{TypeCodeTable, RESERVED_TYPE_CODES};

/// Type codes of the objects this crate understands.
pub mod codes {
    pub const BASE_RESOURCE: u32 = 0x0001_0030;
    pub const RASTER: u32 = 0x0002_0003;
    pub const INDEX_BUFFER: u32 = 0x0002_0007;
    pub const BOUNDING_BOX: u32 = 0x0008_0005;
}
