//! PE (Portable Executable) object-type sniffer.
//!
//! Classifies the first few kilobytes of an `.exe`/`.dll` member as a
//! 32-bit or 64-bit x86 image. Malformed or truncated input is never an
//! error: it classifies as [`ObjectFileType::Unknown`].

use crate::formats::{magic, read_bytes, read_u16_le, read_u32_le};
use crate::types::ObjectFileType;

/// Offset of the `e_lfanew` pointer in the DOS header.
pub const LFANEW_OFFSET: usize = 0x3C;

/// PE machine type constants.
pub mod machine {
    /// Intel 386
    pub const I386: u16 = 0x014C;
    /// x64 (AMD64)
    pub const AMD64: u16 = 0x8664;
}

/// Map a PE machine type to an object-file type.
pub fn machine_to_object_type(machine: u16) -> ObjectFileType {
    match machine {
        machine::I386 => ObjectFileType::DllI386,
        machine::AMD64 => ObjectFileType::DllAmd64,
        _ => ObjectFileType::Unknown,
    }
}

/// Read the raw COFF machine field of a PE image.
///
/// Returns `None` when the buffer does not hold an MZ stub, a PE signature
/// at the offset it points to, and the two machine bytes after it.
pub fn read_machine(data: &[u8]) -> Option<u16> {
    if read_bytes(data, 0, 2)? != magic::MZ {
        return None;
    }

    let pe_off = usize::try_from(read_u32_le(data, LFANEW_OFFSET)?).ok()?;
    if read_bytes(data, pe_off, 4)? != magic::PE {
        return None;
    }

    read_u16_le(data, pe_off.checked_add(4)?)
}

/// Classify a byte prefix of a candidate executable or library.
pub fn sniff_object_type(data: &[u8]) -> ObjectFileType {
    read_machine(data).map_or(ObjectFileType::Unknown, machine_to_object_type)
}

#[cfg(test)]
pub(crate) fn make_pe_header(machine: u16) -> Vec<u8> {
    let mut data = vec![0u8; 256];

    // DOS stub
    data[0] = b'M';
    data[1] = b'Z';

    // PE offset at 0x3C
    data[LFANEW_OFFSET] = 0x80;

    // PE signature at 0x80
    let pe_off = 0x80;
    data[pe_off..pe_off + 4].copy_from_slice(&magic::PE);

    // COFF machine
    let coff_off = pe_off + 4;
    data[coff_off..coff_off + 2].copy_from_slice(&machine.to_le_bytes());

    data
}
