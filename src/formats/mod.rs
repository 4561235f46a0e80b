//! Binary header readers.
//!
//! Bounds-checked little-endian readers used by the object-type sniffer.
//! Every read returns `None` instead of indexing past the buffer.

pub mod pe;

/// Magic byte signatures for format detection.
pub mod magic {
    /// Legacy DOS stub magic: 'M' 'Z'
    pub const MZ: [u8; 2] = [b'M', b'Z'];

    /// PE signature: 'P' 'E' '\0' '\0'
    pub const PE: [u8; 4] = [b'P', b'E', 0, 0];
}

/// Read `len` bytes at `offset`, or `None` if the range leaves the buffer.
pub fn read_bytes(data: &[u8], offset: usize, len: usize) -> Option<&[u8]> {
    let end = offset.checked_add(len)?;
    data.get(offset..end)
}

/// Read a little-endian u16.
pub fn read_u16_le(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = read_bytes(data, offset, 2)?;
    Some(u16::from_le_bytes([bytes[0], bytes[1]]))
}

/// Read a little-endian u32.
pub fn read_u32_le(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = read_bytes(data, offset, 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}
