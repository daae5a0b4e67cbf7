use common::patch::PatchError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("not a package (invalid magic {0:?})")]
    InvalidMagic([u8; 4]),

    #[error("package header is truncated")]
    TruncatedHeader,

    #[error("index declares {declared} bytes but its items occupy {consumed}")]
    IndexSizeMismatch { declared: u64, consumed: u64 },

    #[error("{what} of {size} bytes at {offset:#x} lies past the end of the package")]
    OutOfBounds {
        what: &'static str,
        offset: u64,
        size: u64,
    },

    #[error("value {value:#x} of `{field}` does not fit the package layout")]
    OffsetOverflow { field: &'static str, value: u64 },

    #[error("record expands to {actual} bytes, index says {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("compression codec failed: {0}")]
    Codec(String),

    #[error("cannot write output {0:?}")]
    OutputNotWritable(PathBuf),

    #[error("couldn't find file {name} inside subfolder {folder:?}")]
    MissingNestedFile { folder: PathBuf, name: String },

    #[error("invalid hash literal `{0}`")]
    InvalidHash(String),

    #[error("unable to find `{0}` hash, it is not registered")]
    UnknownName(String),

    #[error("invalid name registry entry at line {line}: {text}")]
    InvalidRegistryLine { line: usize, text: String },

    #[error("converter `{name}` failed: {message}")]
    Converter { name: &'static str, message: String },

    #[error("cannot load settings: {0}")]
    Settings(String),

    #[error("render graph: {0}")]
    Rw4(#[from] rw4::Error),

    #[error(transparent)]
    Patch(#[from] PatchError),
}

pub type Result<T> = std::result::Result<T, Error>;
