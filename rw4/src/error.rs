use common::patch::PatchError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a render graph (invalid magic)")]
    InvalidMagic,

    #[error("render graph is truncated: {0}")]
    Truncated(&'static str),

    #[error("invalid reference {raw:#010x}")]
    InvalidReference { raw: u32 },

    #[error("reference index {index} does not fit into 22 bits")]
    ReferenceOutOfRange { index: usize },

    #[error("section {section} has type code {type_code:#x} missing from the type table")]
    UnknownTypeIndex { section: usize, type_code: u32 },

    #[error("value {value:#x} of `{field}` does not fit into 32 bits")]
    OffsetOverflow { field: &'static str, value: u64 },

    #[error(transparent)]
    Patch(#[from] PatchError),
}

pub type Result<T> = std::result::Result<T, Error>;
