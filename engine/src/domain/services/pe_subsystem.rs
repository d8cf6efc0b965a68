//! PE subsystem patch
//! Turns a console Windows executable into a windowless one in place

use std::fs::OpenOptions;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;

/// IMAGE_SUBSYSTEM_WINDOWS_GUI
pub const IMAGE_SUBSYSTEM_WINDOWS_GUI: u16 = 2;

/// File offset holding the little-endian u32 offset of the PE header
pub const PE_HEADER_OFFSET_LOCATION: u64 = 0x3C;

/// Subsystem field offset relative to the PE header
pub const SUBSYSTEM_OFFSET: u64 = 0x5C;

/// Rewrite the subsystem field of the executable at `path` to GUI
pub fn patch_pe_subsystem(path: &Path) -> io::Result<()> {
    let mut file = OpenOptions::new().read(true).write(true).open(path)?;
    let len = file.metadata()?.len();

    let mut buf = [0u8; 4];
    file.seek(SeekFrom::Start(PE_HEADER_OFFSET_LOCATION))?;
    file.read_exact(&mut buf)?;
    let pe_header_offset = u64::from(u32::from_le_bytes(buf));

    let subsystem_offset = pe_header_offset + SUBSYSTEM_OFFSET;
    if subsystem_offset + 2 > len {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "subsystem offset {subsystem_offset:#x} is past the end of {}",
                path.display()
            ),
        ));
    }

    file.seek(SeekFrom::Start(subsystem_offset))?;
    file.write_all(&IMAGE_SUBSYSTEM_WINDOWS_GUI.to_le_bytes())?;
    file.flush()
}
