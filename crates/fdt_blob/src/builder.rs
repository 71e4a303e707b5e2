//! Device tree blob writer.
//!
//! Used to build blobs for tests and host-side tools. The output is a
//! version 17 blob with an empty memory reservation map.

use alloc::{string::String, vec::Vec};

use crate::Header;

const FDT_BEGIN_NODE: u32 = 0x1;
const FDT_END_NODE: u32 = 0x2;
const FDT_PROP: u32 = 0x3;
const FDT_NOP: u32 = 0x4;
const FDT_END: u32 = 0x9;

/// Reserve map holding only the terminating entry.
const RSVMAP_SIZE: usize = 16;

#[derive(Debug, Default)]
pub struct FdtBuilder {
    structs: Vec<u8>,
    strings: Vec<u8>,
    names: Vec<(String, u32)>,
}

impl FdtBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn push_u32(&mut self, value: u32) {
        self.structs.extend_from_slice(&value.to_be_bytes());
    }

    fn align(&mut self) {
        while self.structs.len() % 4 != 0 {
            self.structs.push(0);
        }
    }

    fn name_offset(&mut self, name: &str) -> u32 {
        if let Some((_, off)) = self.names.iter().find(|(n, _)| n == name) {
            return *off;
        }
        let off = to_u32(self.strings.len());
        self.strings.extend_from_slice(name.as_bytes());
        self.strings.push(0);
        self.names.push((name.into(), off));
        off
    }

    pub fn begin_node(&mut self, name: &str) -> &mut Self {
        self.push_u32(FDT_BEGIN_NODE);
        self.structs.extend_from_slice(name.as_bytes());
        self.structs.push(0);
        self.align();
        self
    }

    pub fn end_node(&mut self) -> &mut Self {
        self.push_u32(FDT_END_NODE);
        self
    }

    pub fn nop(&mut self) -> &mut Self {
        self.push_u32(FDT_NOP);
        self
    }

    pub fn property(&mut self, name: &str, value: &[u8]) -> &mut Self {
        let name_offset = self.name_offset(name);
        self.push_u32(FDT_PROP);
        self.push_u32(to_u32(value.len()));
        self.push_u32(name_offset);
        self.structs.extend_from_slice(value);
        self.align();
        self
    }

    pub fn property_u32(&mut self, name: &str, value: u32) -> &mut Self {
        self.property(name, &value.to_be_bytes())
    }

    pub fn property_str(&mut self, name: &str, value: &str) -> &mut Self {
        let mut bytes = Vec::with_capacity(value.len() + 1);
        bytes.extend_from_slice(value.as_bytes());
        bytes.push(0);
        self.property(name, &bytes)
    }

    /// Writes a `reg` property with 2 address cells and 2 size cells.
    pub fn property_reg(&mut self, regions: &[(u64, u64)]) -> &mut Self {
        let mut bytes = Vec::with_capacity(regions.len() * 16);
        for (base, size) in regions {
            bytes.extend_from_slice(&base.to_be_bytes());
            bytes.extend_from_slice(&size.to_be_bytes());
        }
        self.property("reg", &bytes)
    }

    /// Terminates the structure block and serializes the blob.
    ///
    /// Node nesting is not checked here, so unbalanced input produces a blob
    /// that the reader rejects.
    ///
    /// # Panics
    ///
    /// Panics if the blob does not fit in 4 GiB.
    #[must_use]
    pub fn finish(&mut self) -> Vec<u8> {
        self.push_u32(FDT_END);

        let off_mem_rsvmap = Header::SIZE.next_multiple_of(8);
        let off_dt_struct = off_mem_rsvmap + RSVMAP_SIZE;
        let off_dt_strings = off_dt_struct + self.structs.len();
        let total_size = off_dt_strings + self.strings.len();

        let header = [
            Header::MAGIC,
            to_u32(total_size),
            to_u32(off_dt_struct),
            to_u32(off_dt_strings),
            to_u32(off_mem_rsvmap),
            Header::LAST_SUPPORTED_VERSION,
            Header::FIRST_SUPPORTED_VERSION,
            0,
            to_u32(self.strings.len()),
            to_u32(self.structs.len()),
        ];

        let mut blob = Vec::with_capacity(total_size);
        for field in header {
            blob.extend_from_slice(&field.to_be_bytes());
        }
        blob.resize(off_dt_struct, 0);
        blob.extend_from_slice(&self.structs);
        blob.extend_from_slice(&self.strings);
        blob
    }
}

fn to_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap()
}
