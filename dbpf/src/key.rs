use crate::hash::Hasher;
use std::fmt::{Display, Formatter};

/// Identity of a record inside an archive.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Ord, PartialOrd)]
pub struct ResourceKey {
    pub group: u32,
    pub instance: u32,
    pub type_id: u32,
}

impl Default for ResourceKey {
    /// Unset key, all components set to `0xFFFFFFFF`.
    fn default() -> Self {
        ResourceKey {
            group: u32::MAX,
            instance: u32::MAX,
            type_id: u32::MAX,
        }
    }
}

impl ResourceKey {
    pub fn new(group: u32, instance: u32, type_id: u32) -> Self {
        ResourceKey {
            group,
            instance,
            type_id,
        }
    }

    #[inline]
    pub fn is_default(&self) -> bool {
        *self == ResourceKey::default()
    }

    /// Two keys are equivalent when all three components match.
    #[inline]
    pub fn is_equivalent(&self, other: &ResourceKey) -> bool {
        self == other
    }

    /// Human readable form `group!instance.type` using registered names
    /// where they exist.
    pub fn path(&self, hasher: &Hasher) -> String {
        format!(
            "{}!{}.{}",
            hasher.get_file_name(self.group),
            hasher.get_file_name(self.instance),
            hasher.get_type_name(self.type_id)
        )
    }
}

impl Display for ResourceKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "0x{:08X}!0x{:08X}.0x{:08X}",
            self.group, self.instance, self.type_id
        )
    }
}

#[cfg(test)]
mod tests {
    use crate::hash::Hasher;
    use crate::key::ResourceKey;

    #[test]
    fn default_is_unset() {
        let key = ResourceKey::default();
        assert!(key.is_default());
        assert!(!ResourceKey::new(1, 2, 3).is_default());
    }

    #[test]
    fn equivalence_is_exact() {
        let key = ResourceKey::new(1, 2, 3);
        assert!(key.is_equivalent(&ResourceKey::new(1, 2, 3)));
        assert!(!key.is_equivalent(&ResourceKey::new(1, 2, 4)));
        assert!(!key.is_equivalent(&ResourceKey::new(0, 2, 3)));
    }

    #[test]
    fn renders_names() {
        let hasher = Hasher::new();
        let key = ResourceKey::new(0x9C90_59AE, 0x0000_00FF, 0x2F4E_681B);
        assert_eq!(key.to_string(), "0x9C9059AE!0x000000FF.0x2F4E681B");
        assert_eq!(key.path(&hasher), "0x9C9059AE!0x000000FF.rw4");
    }
}
