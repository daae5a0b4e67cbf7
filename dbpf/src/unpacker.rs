use crate::codec::{Codec, Lz4Codec};
use crate::converter::{raw_file, Converter};
use crate::error::{Error, Result};
use crate::hash::Hasher;
use crate::header::ArchiveHeader;
use crate::index::{ArchiveIndex, ArchiveItem};
use crate::key::ResourceKey;
use crate::keys::{AUTO_LOCALE_GROUP, NAMES_GROUP, NAMES_INSTANCE, SIGNATURE_GROUP, SIGNATURE_TYPE};
use common::progress::Progress;
use log::{debug, error, info, trace};
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Share of an archive's progress taken by reading its index.
const INDEX_PROGRESS: f64 = 0.15;

pub type ItemFilter = Box<dyn Fn(&ArchiveItem) -> bool>;

/// Unpacks archives into a folder: one sub-folder per group, one file per
/// record.
///
/// Archives are processed in priority order; when more than one archive is
/// unpacked, a record already written by an earlier archive is skipped.
/// Failures of individual records never stop the operation: they are
/// collected in `errors()` and the record is written unconverted.
pub struct Unpacker {
    inputs: Vec<PathBuf>,
    output: PathBuf,
    converters: Vec<Box<dyn Converter>>,
    codec: Box<dyn Codec>,
    hasher: Hasher,
    filter: Option<ItemFilter>,
    failed_archives: Vec<PathBuf>,
    errors: HashMap<ResourceKey, Error>,
    elapsed: Duration,
    progress: Progress,
}

impl Unpacker {
    pub fn new(inputs: Vec<PathBuf>, output: PathBuf, converters: Vec<Box<dyn Converter>>) -> Self {
        Unpacker {
            inputs,
            output,
            converters,
            codec: Box::new(Lz4Codec::default()),
            hasher: Hasher::new(),
            filter: None,
            failed_archives: vec![],
            errors: HashMap::new(),
            elapsed: Duration::default(),
            progress: Progress::new(),
        }
    }

    pub fn set_codec(&mut self, codec: Box<dyn Codec>) {
        self.codec = codec;
    }

    pub fn set_hasher(&mut self, hasher: Hasher) {
        self.hasher = hasher;
    }

    /// Only items for which `filter` returns `true` are unpacked.
    pub fn set_filter<F: Fn(&ArchiveItem) -> bool + 'static>(&mut self, filter: F) {
        self.filter = Some(Box::new(filter));
    }

    #[inline]
    pub fn output(&self) -> &Path {
        &self.output
    }

    #[inline]
    pub fn hasher(&self) -> &Hasher {
        &self.hasher
    }

    /// Handle that observes the progress of the operation.
    pub fn progress(&self) -> Progress {
        self.progress.clone()
    }

    /// Input archives that did not exist.
    #[inline]
    pub fn failed_archives(&self) -> &[PathBuf] {
        &self.failed_archives
    }

    /// Records that could not be converted or expanded, with the cause.
    #[inline]
    pub fn errors(&self) -> &HashMap<ResourceKey, Error> {
        &self.errors
    }

    /// Wall-clock duration of the last operation.
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Unpacks all input archives. Returns an error only for failures that
    /// make an archive unreadable as a whole: its header, its index or the
    /// archive file itself. Results of a previous operation are discarded.
    pub fn run(&mut self) -> Result<()> {
        let start = Instant::now();
        self.clear_results();
        std::fs::create_dir_all(&self.output)?;

        let share = 1.0 / self.inputs.len().max(1) as f64;
        let check_written = self.inputs.len() > 1;
        let mut seen = HashSet::new();

        for input in self.inputs.clone() {
            if !input.exists() {
                error!("Input archive {:?} does not exist.", input);
                self.failed_archives.push(input);
                self.progress.add(share);
                continue;
            }

            info!("Unpacking {:?}", input);
            for converter in self.converters.iter_mut() {
                converter.reset();
            }

            let mut stream = BufReader::new(File::open(&input)?);
            let seen = if check_written { Some(&mut seen) } else { None };
            self.unpack_archive(&mut stream, seen, share)?;
        }

        self.elapsed = start.elapsed();
        info!(
            "Unpacked {} archive(s) in {}ms, {} item error(s).",
            self.inputs.len() - self.failed_archives.len(),
            self.elapsed.as_millis(),
            self.errors.len()
        );
        Ok(())
    }

    /// Unpacks a single archive read from `stream` (the input paths are not
    /// used).
    pub fn unpack_stream<R: Read + Seek>(&mut self, stream: &mut R) -> Result<()> {
        let start = Instant::now();
        self.clear_results();
        std::fs::create_dir_all(&self.output)?;
        for converter in self.converters.iter_mut() {
            converter.reset();
        }

        let result = self.unpack_archive(stream, None, 1.0);
        self.elapsed = start.elapsed();
        result
    }

    fn clear_results(&mut self) {
        self.errors.clear();
        self.failed_archives.clear();
    }

    fn unpack_archive<R: Read + Seek>(
        &mut self,
        stream: &mut R,
        written: Option<&mut HashSet<ResourceKey>>,
        share: f64,
    ) -> Result<()> {
        let header = ArchiveHeader::read(stream)?;
        let index = ArchiveIndex::read(stream, &header)?;
        debug!("Index of {} items at {:#x}.", index.len(), header.index_offset);
        self.progress.add(INDEX_PROGRESS * share);

        self.hasher.project_registry_mut().clear();
        let result = self.load_names(stream, &index).and_then(|_| {
            let increment = (1.0 - INDEX_PROGRESS) * share / index.len().max(1) as f64;
            self.unpack_items(stream, &index, written, increment)
        });
        self.hasher.project_registry_mut().clear();
        result
    }

    /// Loads the project names record, when present, into the project
    /// registry.
    fn load_names<R: Read + Seek>(&mut self, stream: &mut R, index: &ArchiveIndex) -> Result<()> {
        let names = index
            .iter()
            .find(|i| i.key.group == NAMES_GROUP && i.key.instance == NAMES_INSTANCE);

        if let Some(item) = names {
            let data = match item.read_data(stream, self.codec.as_ref()) {
                Ok(data) => data,
                Err(Error::Io(e)) => return Err(Error::Io(e)),
                Err(e) => {
                    error!("Cannot read names record: {}", e);
                    self.errors.insert(item.key, e);
                    return Ok(());
                }
            };
            if let Err(e) = self.hasher.project_registry_mut().read(data.as_slice()) {
                error!("Cannot parse names record: {}", e);
                self.errors.insert(item.key, e);
            }
        }
        Ok(())
    }

    fn unpack_items<R: Read + Seek>(
        &mut self,
        stream: &mut R,
        index: &ArchiveIndex,
        mut written: Option<&mut HashSet<ResourceKey>>,
        increment: f64,
    ) -> Result<()> {
        for item in index.iter() {
            let key = item.key;
            let skip = self.filter.as_ref().map(|f| !f(item)).unwrap_or(false)
                || written.as_ref().map(|w| w.contains(&key)).unwrap_or(false);
            let instance_name = self.hasher.get_file_name(key.instance);

            if skip || (key.group == AUTO_LOCALE_GROUP && instance_name.starts_with("auto_")) {
                trace!("Skipping {}", key);
                self.progress.add(increment);
                continue;
            }

            match self.unpack_item(stream, item) {
                Ok(()) => {
                    if let Some(w) = written.as_mut() {
                        w.insert(key);
                    }
                }
                Err(e) => {
                    error!("Cannot unpack {}: {}", key.path(&self.hasher), e);
                    self.errors.insert(key, e);
                }
            }
            self.progress.add(increment);
        }
        Ok(())
    }

    /// Writes one item into its group folder. Failures that the item can
    /// survive (expansion, conversion) are recorded here and the stored or
    /// expanded bytes are written instead.
    fn unpack_item<R: Read + Seek>(&mut self, stream: &mut R, item: &ArchiveItem) -> Result<()> {
        let key = item.key;
        let folder = self.output.join(self.hasher.get_file_name(key.group));
        std::fs::create_dir_all(&folder)?;

        let stored = item.read_stored(stream)?;
        let (data, expanded) = match item.expand(&stored, self.codec.as_ref()) {
            Ok(data) => (data, true),
            Err(e) => {
                error!("Cannot expand {}: {}", key.path(&self.hasher), e);
                self.errors.insert(key, e);
                (stored, false)
            }
        };

        let is_signature = key.group == SIGNATURE_GROUP && key.type_id == SIGNATURE_TYPE;
        let converted = if is_signature || !expanded {
            false
        } else {
            match decode(&self.converters, &data, &folder, &key, &self.hasher) {
                Ok(converted) => converted,
                Err(e) => {
                    error!("Cannot convert {}: {}", key.path(&self.hasher), e);
                    self.errors.insert(key, e);
                    false
                }
            }
        };

        if !converted {
            std::fs::write(raw_file(&key, &folder, &self.hasher), &data)?;
        }
        Ok(())
    }
}

/// Runs the decoder chain. The first converter that returns `true` wins;
/// the first error stops the chain.
fn decode(
    converters: &[Box<dyn Converter>],
    data: &[u8],
    folder: &Path,
    key: &ResourceKey,
    hasher: &Hasher,
) -> Result<bool> {
    for converter in converters.iter().filter(|c| c.is_decoder(key)) {
        let converted = converter
            .decode(data, folder, key, hasher)
            .map_err(|e| Error::Converter {
                name: converter.name(),
                message: e.to_string(),
            })?;
        if converted {
            trace!("{} converted by {}", key, converter.name());
            return Ok(true);
        }
    }
    Ok(false)
}
