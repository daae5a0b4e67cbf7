//! Names of keys.
//!
//! Every component of a `ResourceKey` is a 32-bit hash. Plain names hash to
//! their FNV value; names ending with `~` are aliases that may stand for any
//! hash and therefore must be registered. Registries are plain text files,
//! one `name` or `name<TAB>0xHASH` per line, `#` starts a comment.

use crate::error::{Error, Result};
use crate::keys::RW4_TYPE;
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

const FNV_BASIS: u32 = 0x811C_9DC5;
const FNV_PRIME: u32 = 0x0100_0193;

/// FNV hash of the lower-cased name (multiply, then xor).
pub fn fnv(name: &str) -> u32 {
    name.to_lowercase()
        .encode_utf16()
        .fold(FNV_BASIS, |h, c| h.wrapping_mul(FNV_PRIME) ^ c as u32)
}

fn parse_hex(literal: &str) -> Option<u32> {
    let digits = if let Some(rest) = literal.strip_prefix("0x") {
        rest
    } else {
        literal.strip_prefix('#')?
    };
    u32::from_str_radix(digits, 16).ok()
}

#[inline]
fn is_hex_literal(name: &str) -> bool {
    name.starts_with("0x") || name.starts_with('#')
}

/// Bidirectional name <-> hash table.
#[derive(Debug, Clone, Default)]
pub struct NameRegistry {
    names: HashMap<u32, String>,
    /// lower-cased name -> (name as registered, hash)
    hashes: BTreeMap<String, (String, u32)>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let mut registry = NameRegistry::new();
        registry.read(BufReader::new(File::open(path)?))?;
        Ok(registry)
    }

    pub fn get_name(&self, hash: u32) -> Option<&str> {
        self.names.get(&hash).map(|n| n.as_str())
    }

    pub fn get_hash(&self, name: &str) -> Option<u32> {
        self.hashes.get(&name.to_lowercase()).map(|(_, h)| *h)
    }

    /// Registers the name. The first name registered for a hash is the one
    /// `get_name` returns.
    pub fn add(&mut self, name: &str, hash: u32) {
        self.names.entry(hash).or_insert_with(|| name.to_string());
        self.hashes
            .insert(name.to_lowercase(), (name.to_string(), hash));
    }

    pub fn clear(&mut self) {
        self.names.clear();
        self.hashes.clear();
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    /// Adds all entries of another registry.
    pub fn extend(&mut self, other: &NameRegistry) {
        for (name, hash) in other.hashes.values() {
            self.add(name, *hash);
        }
    }

    pub fn read<R: BufRead>(&mut self, reader: R) -> Result<()> {
        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let text = line.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }

            let mut parts = text.splitn(2, '\t');
            let name = parts.next().unwrap_or_default().trim();
            let hash = match parts.next().map(str::trim) {
                Some(literal) if !literal.is_empty() => {
                    parse_hex(literal).ok_or_else(|| Error::InvalidRegistryLine {
                        line: i + 1,
                        text: text.to_string(),
                    })?
                }
                _ => fnv(name),
            };
            self.add(name, hash);
        }
        Ok(())
    }

    /// Writes the registry sorted by name. Entries whose hash is the FNV of
    /// their name are written without the hash.
    pub fn write<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        for (name, hash) in self.hashes.values() {
            if fnv(name) == *hash {
                writeln!(writer, "{}", name)?;
            } else {
                writeln!(writer, "{}\t0x{:08X}", name, hash)?;
            }
        }
        Ok(())
    }
}

/// Translates between names and hashes of key components.
///
/// Group and instance names are looked up in the file registry and then in
/// the project registry, which holds names local to the package being worked
/// on. Type names come from the type registry.
#[derive(Debug, Clone)]
pub struct Hasher {
    files: NameRegistry,
    types: NameRegistry,
    project: NameRegistry,
    tracking: bool,
}

impl Default for Hasher {
    fn default() -> Self {
        Hasher::new()
    }
}

impl Hasher {
    /// Creates a hasher with empty registries except for the built-in type
    /// names.
    pub fn new() -> Self {
        let mut types = NameRegistry::new();
        types.add("rw4", RW4_TYPE);

        Hasher {
            files: NameRegistry::new(),
            types,
            project: NameRegistry::new(),
            tracking: false,
        }
    }

    pub fn with_registries(files: NameRegistry, types: NameRegistry) -> Self {
        let mut hasher = Hasher::new();
        hasher.files = files;
        hasher.types.extend(&types);
        hasher
    }

    #[inline]
    pub fn project_registry(&self) -> &NameRegistry {
        &self.project
    }

    #[inline]
    pub fn project_registry_mut(&mut self) -> &mut NameRegistry {
        &mut self.project
    }

    /// When tracking, every group or instance name hashed by
    /// `get_file_hash` is added to the project registry.
    pub fn set_tracking(&mut self, tracking: bool) {
        self.tracking = tracking;
    }

    #[inline]
    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    /// Name of a group or instance, for use as a path component. Names that
    /// could leave their folder fall back to the hex literal.
    pub fn get_file_name(&self, hash: u32) -> String {
        self.files
            .get_name(hash)
            .or_else(|| self.project.get_name(hash))
            .filter(|name| is_safe_file_name(name))
            .map(str::to_string)
            .unwrap_or_else(|| format!("0x{:08X}", hash))
    }

    pub fn get_type_name(&self, hash: u32) -> String {
        self.types
            .get_name(hash)
            .filter(|name| is_safe_file_name(name))
            .map(str::to_string)
            .unwrap_or_else(|| format!("0x{:08X}", hash))
    }

    /// Hash of a group or instance name. `0x` and `#` prefixed names are
    /// hexadecimal literals; names ending with `~` must be registered.
    pub fn get_file_hash(&mut self, name: &str) -> Result<u32> {
        if is_hex_literal(name) {
            return parse_hex(name).ok_or_else(|| Error::InvalidHash(name.to_string()));
        }

        let hash = if name.ends_with('~') {
            self.files
                .get_hash(name)
                .or_else(|| self.project.get_hash(name))
                .ok_or_else(|| Error::UnknownName(name.to_string()))?
        } else {
            fnv(name)
        };

        if self.tracking {
            self.project.add(name, hash);
        }
        Ok(hash)
    }

    pub fn get_type_hash(&self, name: &str) -> Result<u32> {
        if is_hex_literal(name) {
            return parse_hex(name).ok_or_else(|| Error::InvalidHash(name.to_string()));
        }
        Ok(self.types.get_hash(name).unwrap_or_else(|| fnv(name)))
    }
}

/// Single path component that stays inside its parent folder.
fn is_safe_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && !name.contains("..")
        && !name.contains(|c: char| c == '/' || c == '\\' || c == '\0')
}

#[cfg(test)]
mod tests {
    use crate::hash::{fnv, Hasher, NameRegistry};
    use crate::Error;
    use matches::assert_matches;

    #[test]
    fn unsafe_names_fall_back_to_hex() {
        let mut files = NameRegistry::new();
        files.add("../../escaped", 0x11);
        files.add("a/b", 0x12);
        files.add("c\\d", 0x13);
        files.add("..", 0x14);
        files.add("plain.name", 0x15);
        let mut types = NameRegistry::new();
        types.add("../txt", 0x21);
        let hasher = Hasher::with_registries(files, types);

        assert_eq!(hasher.get_file_name(0x11), "0x00000011");
        assert_eq!(hasher.get_file_name(0x12), "0x00000012");
        assert_eq!(hasher.get_file_name(0x13), "0x00000013");
        assert_eq!(hasher.get_file_name(0x14), "0x00000014");
        assert_eq!(hasher.get_file_name(0x15), "plain.name");
        assert_eq!(hasher.get_type_name(0x21), "0x00000021");
    }

    #[test]
    fn fnv_known_values() {
        assert_eq!(fnv(""), 0x811C_9DC5);
        assert_eq!(fnv("sporemaster"), 0x9C90_59AE);
        assert_eq!(fnv("names"), 0xCC2F_616F);
        assert_eq!(fnv("txt"), 0x2B6C_AB5F);
        assert_eq!(fnv("AbC"), fnv("abc"));
    }

    #[test]
    fn registry_text_format() {
        let text = "# comment\n\nfoo\nbar~\t0x00000010\n  baz\t#1F  \n";
        let mut registry = NameRegistry::new();
        registry.read(text.as_bytes()).unwrap();

        assert_eq!(registry.len(), 3);
        assert_eq!(registry.get_hash("FOO"), Some(fnv("foo")));
        assert_eq!(registry.get_name(0x10), Some("bar~"));
        assert_eq!(registry.get_hash("baz"), Some(0x1F));

        let mut out = vec![];
        registry.write(&mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "bar~\t0x00000010\nbaz\t0x0000001F\nfoo\n"
        );
    }

    #[test]
    fn registry_rejects_bad_hash() {
        let mut registry = NameRegistry::new();
        assert_matches!(
            registry.read("ok\nbad\t0xZZ\n".as_bytes()),
            Err(Error::InvalidRegistryLine { line: 2, .. })
        );
    }

    #[test]
    fn file_hash_rules() {
        let mut hasher = Hasher::new();
        assert_eq!(hasher.get_file_hash("0x0000ABCD").unwrap(), 0xABCD);
        assert_eq!(hasher.get_file_hash("#ff").unwrap(), 0xFF);
        assert_eq!(hasher.get_file_hash("names").unwrap(), 0xCC2F_616F);
        assert_matches!(hasher.get_file_hash("0xNOPE"), Err(Error::InvalidHash(_)));
        assert_matches!(hasher.get_file_hash("alias~"), Err(Error::UnknownName(_)));

        hasher.project_registry_mut().add("alias~", 0x1234);
        assert_eq!(hasher.get_file_hash("ALIAS~").unwrap(), 0x1234);
    }

    #[test]
    fn tracking_fills_project_registry() {
        let mut hasher = Hasher::new();
        hasher.get_file_hash("untracked").unwrap();
        assert!(hasher.project_registry().is_empty());

        hasher.set_tracking(true);
        hasher.get_file_hash("Tracked").unwrap();
        hasher.get_file_hash("0x00000001").unwrap();
        assert_eq!(hasher.project_registry().len(), 1);
        assert_eq!(hasher.get_file_name(fnv("tracked")), "Tracked");
        assert_eq!(hasher.get_file_name(7), "0x00000007");
    }

    #[test]
    fn type_names() {
        let hasher = Hasher::new();
        assert_eq!(hasher.get_type_name(0x2F4E_681B), "rw4");
        assert_eq!(hasher.get_type_hash("rw4").unwrap(), 0x2F4E_681B);
        assert_eq!(hasher.get_type_hash("txt").unwrap(), 0x2B6C_AB5F);
        assert_eq!(hasher.get_type_name(0x2B6C_AB5F), "0x2B6CAB5F");
    }
}
