use crate::error::Result;
use crate::hash::Hasher;
use crate::key::ResourceKey;
use crate::writer::RecordWriter;
use std::path::{Path, PathBuf};

/// Translates records of some type into editable files and back.
///
/// Converters form an ordered chain. When unpacking, the first converter
/// whose `decode` returns `Ok(true)` wins; `Ok(false)` means "not applicable
/// to this record" and the next converter is tried. When packing, the first
/// converter whose `encode` returns `Ok(true)` has written the record(s).
pub trait Converter {
    fn name(&self) -> &'static str;

    fn is_decoder(&self, key: &ResourceKey) -> bool;

    /// Writes the converted form of `data` into `folder`.
    fn decode(&self, data: &[u8], folder: &Path, key: &ResourceKey, hasher: &Hasher)
        -> Result<bool>;

    fn is_encoder(&self, path: &Path, hasher: &Hasher) -> bool;

    /// Converts the file (or folder) at `path` into records of `group`.
    fn encode(
        &self,
        path: &Path,
        output: &mut dyn RecordWriter,
        group: u32,
        hasher: &mut Hasher,
    ) -> Result<bool>;

    /// Called before every archive is processed.
    fn reset(&mut self) {}
}

/// Path of the converted form of `key`: `<instance>.<type>.<extension>`
/// inside `folder`.
pub fn output_file(key: &ResourceKey, folder: &Path, extension: &str, hasher: &Hasher) -> PathBuf {
    folder.join(format!(
        "{}.{}.{}",
        hasher.get_file_name(key.instance),
        hasher.get_type_name(key.type_id),
        extension
    ))
}

/// Path of the unconverted form of `key`: `<instance>.<type>`.
pub fn raw_file(key: &ResourceKey, folder: &Path, hasher: &Hasher) -> PathBuf {
    folder.join(format!(
        "{}.{}",
        hasher.get_file_name(key.instance),
        hasher.get_type_name(key.type_id)
    ))
}

#[cfg(test)]
mod tests {
    use crate::converter::{output_file, raw_file};
    use crate::hash::Hasher;
    use crate::key::ResourceKey;
    use std::path::Path;

    #[test]
    fn file_names() {
        let mut hasher = Hasher::new();
        hasher.project_registry_mut().add("rock", 0x10);
        let key = ResourceKey::new(1, 0x10, 0x2F4E_681B);

        assert_eq!(
            output_file(&key, Path::new("out"), "dds", &hasher),
            Path::new("out").join("rock.rw4.dds")
        );
        assert_eq!(
            raw_file(&ResourceKey::new(1, 0x11, 7), Path::new("out"), &hasher),
            Path::new("out").join("0x00000011.0x00000007")
        );
    }
}
