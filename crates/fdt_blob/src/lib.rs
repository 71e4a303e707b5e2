//! Flattened device tree reader.
//!
//! The blob layout:
//!
//! | offset             | content          | type                   |
//! |--------------------|------------------|------------------------|
//! | 0                  | header           | [`Header`]             |
//! | `off_mem_rsvmap`   | reserve map      | `(u64, u64)` pairs     |
//! | `off_dt_struct`    | structure block  | token stream           |
//! | `off_dt_strings`   | strings block    | NUL-terminated strings |
//!
//! Every integer in the blob is big-endian and is converted to host order on
//! access. Nothing is allocated; all returned values borrow the blob.

#![cfg_attr(not(test), no_std)]

#[cfg(any(test, feature = "alloc"))]
extern crate alloc;

use core::slice;

pub use self::{
    error::FdtError,
    header::Header,
    node::{Children, Node, Nodes, Properties, Property},
};

#[cfg(any(test, feature = "alloc"))]
pub mod builder;
mod error;
mod header;
mod node;
mod token;

/// A validated flattened device tree.
#[derive(Debug, Clone, Copy)]
pub struct DeviceTree<'a> {
    header: Header,
    structs: &'a [u8],
    strings: &'a [u8],
}

impl<'a> DeviceTree<'a> {
    /// Validates `blob` and returns a reader over it.
    ///
    /// The header is checked first, then the whole structure block is walked
    /// once so that later traversals never run off the blob.
    pub fn from_bytes(blob: &'a [u8]) -> Result<Self, FdtError> {
        let header = Header::parse(blob)?;
        let total_size = header.total_size();
        if blob.len() < total_size {
            return Err(FdtError::Truncated);
        }
        let blob = &blob[..total_size];

        let structs = blob
            .get(header.struct_range())
            .ok_or(FdtError::Truncated)?;
        let strings = blob
            .get(header.strings_range())
            .ok_or(FdtError::Truncated)?;

        let tree = Self {
            header,
            structs,
            strings,
        };
        token::check_structure(tree.structs, tree.strings)?;
        Ok(tree)
    }

    /// Validates the blob at `ptr` and returns a reader over it.
    ///
    /// # Safety
    ///
    /// If `ptr` is not null it must point to readable memory at least as
    /// large as the `totalsize` field of the header it points to, and that
    /// memory must not be mutated for `'a`.
    pub unsafe fn from_ptr(ptr: *const u8) -> Result<Self, FdtError> {
        if ptr.is_null() {
            return Err(FdtError::NullPointer);
        }

        let head = unsafe { slice::from_raw_parts(ptr, Header::SIZE) };
        let header = Header::parse(head)?;
        let blob = unsafe { slice::from_raw_parts(ptr, header.total_size()) };
        Self::from_bytes(blob)
    }

    #[must_use]
    pub const fn header(&self) -> &Header {
        &self.header
    }

    /// Returns every node of the tree in document order, root first.
    #[must_use]
    pub fn nodes(&self) -> Nodes<'a> {
        Nodes::new(*self, 0, 0)
    }

    #[must_use]
    pub fn root(&self) -> Option<Node<'a>> {
        self.nodes().next()
    }

    /// Looks up a node by its absolute path, e.g. `/reserved-memory/mmode_resv0`.
    ///
    /// A path component without a unit address also matches a node that has
    /// one, so `/memory` finds `/memory@80000000`.
    #[must_use]
    pub fn find_node(&self, path: &str) -> Option<Node<'a>> {
        let rest = path.strip_prefix('/')?;
        let mut current = self.root()?;
        for component in rest.split('/').filter(|c| !c.is_empty()) {
            current = current
                .children()
                .find(|child| child.matches_component(component))?;
        }
        Some(current)
    }

    pub(crate) fn structs(&self) -> &'a [u8] {
        self.structs
    }

    pub(crate) fn string_at(&self, offset: u32) -> Option<&'a str> {
        token::string_at(self.strings, offset)
    }
}
