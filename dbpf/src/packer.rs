use crate::codec::{Codec, Lz4Codec};
use crate::converter::Converter;
use crate::error::{Error, Result};
use crate::hash::Hasher;
use crate::header::Variant;
use crate::key::ResourceKey;
use crate::keys::{NAMES_GROUP, NAMES_INSTANCE, NAMES_TYPE, SIGNATURE_GROUP, SIGNATURE_TYPE};
use crate::writer::{PackageWriter, RecordWriter};
use common::pause::Pause;
use common::progress::Progress;
use log::{debug, info, trace};
use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use walkdir::{DirEntry, WalkDir};

/// Packs a folder tree into an archive.
///
/// Every sub-folder of the input is a group named after the folder, every
/// entry of a group folder becomes one record (or more, when a converter
/// claims it). Any failure aborts the whole pack.
pub struct Packer {
    converters: Vec<Box<dyn Converter>>,
    codec: Box<dyn Codec>,
    hasher: Hasher,
    variant: Variant,
    compress_threshold: Option<usize>,
    signature: Option<PathBuf>,
    pause: Pause,
    progress: Progress,
    elapsed: Duration,
}

/// Immediate children of `dir`, sorted by name.
fn children(dir: &Path) -> Result<Vec<DirEntry>> {
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
        .into_iter()
        .map(|e| e.map_err(|e| Error::Io(e.into())))
        .collect()
}

impl Packer {
    pub fn new(converters: Vec<Box<dyn Converter>>) -> Self {
        Packer {
            converters,
            codec: Box::new(Lz4Codec::default()),
            hasher: Hasher::new(),
            variant: Variant::Dbpf,
            compress_threshold: None,
            signature: None,
            pause: Pause::new(),
            progress: Progress::new(),
            elapsed: Duration::default(),
        }
    }

    pub fn set_codec(&mut self, codec: Box<dyn Codec>) {
        self.codec = codec;
    }

    pub fn set_hasher(&mut self, hasher: Hasher) {
        self.hasher = hasher;
    }

    #[inline]
    pub fn hasher(&self) -> &Hasher {
        &self.hasher
    }

    pub fn set_variant(&mut self, variant: Variant) {
        self.variant = variant;
    }

    pub fn set_compress_threshold(&mut self, threshold: Option<usize>) {
        self.compress_threshold = threshold;
    }

    /// File stored as the package signature record, unless the input
    /// already contains the signature group.
    pub fn set_signature(&mut self, signature: Option<PathBuf>) {
        self.signature = signature;
    }

    /// Gate checked before every packed file.
    pub fn pause(&self) -> Pause {
        self.pause.clone()
    }

    pub fn progress(&self) -> Progress {
        self.progress.clone()
    }

    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn pack_to_file(&mut self, input: &Path, output: &Path) -> Result<()> {
        let file =
            File::create(output).map_err(|_| Error::OutputNotWritable(output.to_path_buf()))?;
        let mut stream = self.pack(input, BufWriter::new(file))?;
        stream.flush()?;
        Ok(())
    }

    /// Packs `input` into `stream` and returns the stream.
    pub fn pack<W: Write + Seek>(&mut self, input: &Path, stream: W) -> Result<W> {
        let start = Instant::now();
        info!("Packing {:?}", input);

        self.hasher.set_tracking(true);
        let result = self.pack_folders(input, stream);
        self.hasher.set_tracking(false);

        self.elapsed = start.elapsed();
        info!("Packing finished in {}ms.", self.elapsed.as_millis());
        result
    }

    fn pack_folders<W: Write + Seek>(&mut self, input: &Path, stream: W) -> Result<W> {
        let mut writer = PackageWriter::new(stream, self.variant, self.codec.as_ref())?;
        writer.set_compress_threshold(self.compress_threshold);

        let folders: Vec<DirEntry> = children(input)?
            .into_iter()
            .filter(|e| e.file_type().is_dir())
            .collect();
        let increment = 1.0 / folders.len().max(1) as f64;
        let mut has_signature = false;

        for folder in folders {
            let group = self
                .hasher
                .get_file_hash(&folder.file_name().to_string_lossy())?;
            has_signature |= group == SIGNATURE_GROUP;
            debug!("Packing group {:?} ({:#010x})", folder.file_name(), group);

            for entry in children(folder.path())? {
                self.pause.wait_while_paused();
                pack_entry(
                    entry.path(),
                    group,
                    &self.converters,
                    &mut self.hasher,
                    &mut writer,
                )?;
            }
            self.progress.add(increment);
        }

        if !self.hasher.project_registry().is_empty() {
            let mut names = vec![];
            self.hasher.project_registry().write(&mut names)?;
            writer.write_record(
                ResourceKey::new(NAMES_GROUP, NAMES_INSTANCE, NAMES_TYPE),
                &names,
            )?;
        }

        match &self.signature {
            Some(path) if !has_signature => {
                let stem = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default();
                let instance = self.hasher.get_file_hash(&stem)?;
                let data = std::fs::read(path)?;
                writer.write_stored(
                    ResourceKey::new(SIGNATURE_GROUP, instance, SIGNATURE_TYPE),
                    &data,
                    data.len() as u32,
                    false,
                )?;
            }
            _ => {}
        }

        info!("Packed {} records.", writer.items().len());
        self.progress.finish();
        writer.finish()
    }
}

/// Resolves a folder entry to the file that is packed: folders claimed by a
/// converter are packed as they are, any other folder must wrap a file of
/// the same name.
fn nested_file(
    path: &Path,
    name: &str,
    converters: &[Box<dyn Converter>],
    hasher: &Hasher,
) -> Result<PathBuf> {
    if !path.is_dir() || converters.iter().any(|c| c.is_encoder(path, hasher)) {
        return Ok(path.to_path_buf());
    }

    let nested = path.join(name);
    if !nested.exists() {
        return Err(Error::MissingNestedFile {
            folder: path.to_path_buf(),
            name: name.to_string(),
        });
    }
    Ok(nested)
}

fn pack_entry(
    path: &Path,
    group: u32,
    converters: &[Box<dyn Converter>],
    hasher: &mut Hasher,
    writer: &mut dyn RecordWriter,
) -> Result<()> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let path = nested_file(path, &name, converters, hasher)?;

    for converter in converters {
        if !converter.is_encoder(&path, hasher) {
            continue;
        }
        let encoded = converter
            .encode(&path, writer, group, hasher)
            .map_err(|e| Error::Converter {
                name: converter.name(),
                message: e.to_string(),
            })?;
        if encoded {
            trace!("{:?} encoded by {}", path, converter.name());
            return Ok(());
        }
    }

    let mut parts = name.splitn(2, '.');
    let instance_name = parts.next().unwrap_or_default();
    let extension = parts.next().unwrap_or_default();
    let key = ResourceKey::new(
        group,
        hasher.get_file_hash(instance_name)?,
        hasher.get_type_hash(extension)?,
    );
    let data = std::fs::read(&path)?;

    if key == ResourceKey::new(NAMES_GROUP, NAMES_INSTANCE, NAMES_TYPE) {
        // merged into the names record written at the end
        hasher.project_registry_mut().read(data.as_slice())?;
        return Ok(());
    }
    writer.write_record(key, &data)
}
