use core::fmt;

/// EFI GUID.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Guid {
    data1: u32,
    data2: u16,
    data3: u16,
    data4: [u8; 8],
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g, h, i] = self.data4;
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{a:02x}{b:02x}-{c:02x}{d:02x}{e:02x}{g:02x}{h:02x}{i:02x}",
            self.data1, self.data2, self.data3,
        )
    }
}

impl Guid {
    pub const ZERO: Self = Self::new(0, 0, 0, [0; 8]);

    #[must_use]
    pub const fn new(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self {
            data1,
            data2,
            data3,
            data4,
        }
    }

    /// Returns the in-memory representation.
    ///
    /// The first three fields are little-endian.
    #[must_use]
    pub fn to_bytes(self) -> [u8; 16] {
        let mut bytes = [0; 16];
        bytes[0..4].copy_from_slice(&self.data1.to_le_bytes());
        bytes[4..6].copy_from_slice(&self.data2.to_le_bytes());
        bytes[6..8].copy_from_slice(&self.data3.to_le_bytes());
        bytes[8..16].copy_from_slice(&self.data4);
        bytes
    }
}

/// Names the GUID extension entry that carries the device tree address.
pub const FDT_HOB_GUID: Guid = Guid::new(
    0x1695_8446,
    0x19b7,
    0x480b,
    [0xb0, 0x47, 0x74, 0x85, 0xad, 0x3f, 0x71, 0x6d],
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display() {
        assert_eq!(
            FDT_HOB_GUID.to_string(),
            "16958446-19b7-480b-b047-7485ad3f716d"
        );
    }

    #[test]
    fn byte_layout() {
        let bytes = FDT_HOB_GUID.to_bytes();
        assert_eq!(bytes[..4], [0x46, 0x84, 0x95, 0x16]);
        assert_eq!(bytes[4..6], [0xb7, 0x19]);
        assert_eq!(bytes[6..8], [0x0b, 0x48]);
        assert_eq!(bytes[8..], [0xb0, 0x47, 0x74, 0x85, 0xad, 0x3f, 0x71, 0x6d]);
    }
}
