//! Support for two-pass binary writing.
//!
//! Formats whose headers describe data that is written *after* them reserve a
//! zero-filled region with `reserve()` while streaming the payload and fill it
//! in afterwards with `patch()`. The write cursor itself only moves forward;
//! patching seeks back, overwrites exactly the reserved bytes and returns to
//! the end of the written data.

use std::io::{self, Seek, SeekFrom, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PatchError {
    #[error("i/o error while patching: {0}")]
    Io(#[from] io::Error),

    #[error("patch of {written} bytes does not fit reservation of {reserved} bytes at {offset:#x}")]
    SizeMismatch {
        offset: u64,
        reserved: usize,
        written: usize,
    },
}

/// Handle to a region reserved by `PatchWriter::reserve`. Offsets are relative
/// to the position the writer was created at.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Reservation {
    offset: u64,
    len: usize,
}

impl Reservation {
    #[inline]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Offset of the first byte after the reserved region.
    #[inline]
    pub fn end(&self) -> u64 {
        self.offset + self.len as u64
    }
}

/// Forward-only writer with explicit reserve / patch support.
pub struct PatchWriter<W> {
    inner: W,
    base: u64,
    pos: u64,
}

impl<W: Write + Seek> PatchWriter<W> {
    /// Wraps the stream. The current position of the stream becomes offset 0
    /// of everything this writer reports.
    pub fn new(mut inner: W) -> io::Result<Self> {
        let base = inner.seek(SeekFrom::Current(0))?;
        Ok(PatchWriter {
            inner,
            base,
            pos: 0,
        })
    }

    /// Current write position relative to the start of this writer.
    #[inline]
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Writes `count` zero bytes.
    pub fn pad(&mut self, count: usize) -> io::Result<()> {
        const ZEROS: [u8; 64] = [0; 64];

        let mut left = count;
        while left > 0 {
            let n = left.min(ZEROS.len());
            self.write_all(&ZEROS[..n])?;
            left -= n;
        }
        Ok(())
    }

    /// Pads the output so that the next byte is written at a multiple of
    /// `alignment`. Alignments of 0 and 1 are no-ops.
    pub fn align(&mut self, alignment: u32) -> io::Result<()> {
        if alignment <= 1 {
            return Ok(());
        }
        let alignment = alignment as u64;
        let aligned = (self.pos + alignment - 1) / alignment * alignment;
        self.pad((aligned - self.pos) as usize)
    }

    /// Reserves `len` zero-filled bytes at the current position.
    pub fn reserve(&mut self, len: usize) -> io::Result<Reservation> {
        let offset = self.pos;
        self.pad(len)?;
        Ok(Reservation { offset, len })
    }

    /// Overwrites a previously reserved region. `bytes` must be exactly as
    /// long as the reservation; anything else means the two passes disagree
    /// about the layout and is reported as an error.
    pub fn patch(&mut self, reservation: &Reservation, bytes: &[u8]) -> Result<(), PatchError> {
        if bytes.len() != reservation.len {
            return Err(PatchError::SizeMismatch {
                offset: reservation.offset,
                reserved: reservation.len,
                written: bytes.len(),
            });
        }

        self.inner
            .seek(SeekFrom::Start(self.base + reservation.offset))?;
        self.inner.write_all(bytes)?;
        self.inner.seek(SeekFrom::Start(self.base + self.pos))?;
        Ok(())
    }

    /// Flushes and returns the wrapped stream, positioned after the last
    /// written byte.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write + Seek> Write for PatchWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.pos += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use crate::patch::{PatchError, PatchWriter};
    use std::io::{Cursor, Write};

    #[test]
    fn reserve_then_patch() {
        let mut writer = PatchWriter::new(Cursor::new(Vec::new())).unwrap();

        let header = writer.reserve(4).unwrap();
        writer.write_all(&[9, 9]).unwrap();
        writer.patch(&header, &[1, 2, 3, 4]).unwrap();
        writer.write_all(&[7]).unwrap();

        assert_eq!(writer.position(), 7);
        let bytes = writer.into_inner().unwrap().into_inner();
        assert_eq!(bytes, vec![1, 2, 3, 4, 9, 9, 7]);
    }

    #[test]
    fn patch_size_must_match() {
        let mut writer = PatchWriter::new(Cursor::new(Vec::new())).unwrap();
        let header = writer.reserve(8).unwrap();

        match writer.patch(&header, &[0; 4]) {
            Err(PatchError::SizeMismatch {
                reserved, written, ..
            }) => {
                assert_eq!(reserved, 8);
                assert_eq!(written, 4);
            }
            _ => panic!("expected size mismatch"),
        }
    }

    #[test]
    fn offsets_are_relative_to_start() {
        let mut cursor = Cursor::new(Vec::new());
        cursor.write_all(&[0xAA; 3]).unwrap();

        let mut writer = PatchWriter::new(cursor).unwrap();
        let slot = writer.reserve(2).unwrap();
        writer.align(8).unwrap();
        assert_eq!(slot.offset(), 0);
        assert_eq!(writer.position(), 8);

        writer.patch(&slot, &[5, 6]).unwrap();
        let bytes = writer.into_inner().unwrap().into_inner();
        assert_eq!(&bytes[..5], &[0xAA, 0xAA, 0xAA, 5, 6]);
        assert_eq!(bytes.len(), 11);
    }

    #[test]
    fn align_is_noop_when_aligned() {
        let mut writer = PatchWriter::new(Cursor::new(Vec::new())).unwrap();
        writer.write_all(&[1; 16]).unwrap();
        writer.align(16).unwrap();
        writer.align(0).unwrap();
        assert_eq!(writer.position(), 16);
    }
}
