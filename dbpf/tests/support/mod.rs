#![allow(dead_code)]

use dbpf::codec::Codec;
use dbpf::{Error, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Run-length codec: `(count, byte)` pairs. Predictable sizes make it easy
/// to build archives with exact compressed sizes.
pub struct Rle;

impl Codec for Rle {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut out = vec![];
        let mut iter = data.iter().peekable();
        while let Some(&byte) = iter.next() {
            let mut count = 1u8;
            while count < u8::MAX && iter.peek() == Some(&&byte) {
                iter.next();
                count += 1;
            }
            out.push(count);
            out.push(byte);
        }
        Ok(out)
    }

    fn decompress(&self, data: &[u8], _mem_size: usize) -> Result<Vec<u8>> {
        if data.len() % 2 != 0 {
            return Err(Error::Codec("odd length of rle stream".into()));
        }
        Ok(data
            .chunks(2)
            .flat_map(|pair| std::iter::repeat(pair[1]).take(pair[0] as usize))
            .collect())
    }
}

/// 100 bytes in 20 runs of 5, which `Rle` stores in 40 bytes.
pub fn runs() -> Vec<u8> {
    (0..20u8).flat_map(|i| vec![i; 5]).collect()
}

/// All files under `root` with their contents, keyed by relative path.
pub fn snapshot(root: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
    WalkDir::new(root)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let relative = e.path().strip_prefix(root).unwrap().to_path_buf();
            (relative, std::fs::read(e.path()).unwrap())
        })
        .collect()
}

pub fn write_file(path: &Path, data: &[u8]) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, data).unwrap();
}
