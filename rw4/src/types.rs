use crate::codes::BASE_RESOURCE;
use std::collections::BTreeSet;

/// Type codes that head every type-code table, in this order, whether or
/// not the graph contains objects of those types.
pub const RESERVED_TYPE_CODES: [u32; 4] = [0x0000_0000, BASE_RESOURCE, 0x0001_0031, 0x0001_0032];

/// Maps the type codes used in a graph to the small indices stored in its
/// section table.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TypeCodeTable {
    codes: Vec<u32>,
}

impl TypeCodeTable {
    /// Builds the table for a graph whose objects have the specified type
    /// codes: the reserved codes first, then every other distinct code in
    /// ascending order.
    pub fn build<I: IntoIterator<Item = u32>>(codes: I) -> Self {
        let extra: BTreeSet<u32> = codes
            .into_iter()
            .filter(|c| !RESERVED_TYPE_CODES.contains(c))
            .collect();

        let mut table = RESERVED_TYPE_CODES.to_vec();
        table.extend(extra);
        TypeCodeTable { codes: table }
    }

    /// Wraps a table read from a file as-is.
    pub fn from_codes(codes: Vec<u32>) -> Self {
        TypeCodeTable { codes }
    }

    pub fn index_of(&self, code: u32) -> Option<u32> {
        self.codes.iter().position(|c| *c == code).map(|i| i as u32)
    }

    #[inline]
    pub fn codes(&self) -> &[u32] {
        &self.codes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.codes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}
