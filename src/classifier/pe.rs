//! Minimal PE/COFF reader: machine type and imported library names.
//!
//! Only the fields needed for classification are read. Everything else in
//! the image (resources, relocations, the import thunks themselves) is left
//! untouched, so packed or partially corrupt executables still classify as
//! long as their headers and import descriptors are intact.
use std::io::{self, BufRead, Read, Seek, SeekFrom};

use byteorder::{LE, ReadBytesExt};
use thiserror::Error;

/// `MZ`
const DOS_MAGIC: u16 = 0x5A4D;
/// Offset of `e_lfanew` in the DOS header.
pub const PE_OFFSET_FIELD: u64 = 0x3C;
/// `PE\0\0`
const PE_SIGNATURE: u32 = 0x0000_4550;
const OPTIONAL_MAGIC_PE32: u16 = 0x10B;
const OPTIONAL_MAGIC_PE32_PLUS: u16 = 0x20B;
/// Index of the import table in the data directory array.
const IMPORT_DIRECTORY_INDEX: u32 = 1;
const SECTION_HEADER_SIZE: u64 = 40;
const IMPORT_DESCRIPTOR_SIZE: u64 = 20;
/// Caps on attacker-controlled counts.
const MAX_SECTIONS: u16 = 96;
const MAX_IMPORT_DESCRIPTORS: u64 = 4096;
const MAX_NAME_LEN: u64 = 256;

/// `IMAGE_FILE_MACHINE_I386`
pub const MACHINE_I386: u16 = 0x014C;

/// Errors raised while walking the PE structures.
#[derive(Error, Debug)]
pub enum PeError {
    /// The file ended early or could not be read.
    #[error("I/O error reading PE image: {0}")]
    Io(#[from] io::Error),

    /// The DOS header does not start with `MZ`.
    #[error("missing MZ signature")]
    BadDosSignature,

    /// No `PE\0\0` at the offset named by the DOS header.
    #[error("missing PE signature at offset {0:#x}")]
    BadPeSignature(u32),

    /// The optional header is neither PE32 nor PE32+.
    #[error("unknown optional header magic {0:#x}")]
    UnknownOptionalHeader(u16),

    /// Too many sections for a real image.
    #[error("implausible section count {0}")]
    TooManySections(u16),

    /// An RVA does not fall inside any section.
    #[error("RVA {0:#x} is not mapped by any section")]
    UnmappedRva(u32),
}

/// The parts of a PE image relevant to classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeImage {
    /// COFF machine type.
    pub machine: u16,
    /// Imported library names, lower-cased, in descriptor order.
    pub imports: Vec<String>,
}

#[derive(Debug, Clone, Copy)]
struct Section {
    virtual_address: u32,
    virtual_size: u32,
    raw_size: u32,
    raw_pointer: u32,
}

impl Section {
    fn contains(&self, rva: u32) -> bool {
        let span = self.virtual_size.max(self.raw_size);
        rva >= self.virtual_address && u64::from(rva) < u64::from(self.virtual_address) + u64::from(span)
    }
}

/// Parse the COFF header and import directory of a PE image.
///
/// # Errors
///
/// Returns [`PeError`] if any structure is missing, truncated, or points
/// outside the image.
pub fn parse<R: BufRead + Seek>(reader: &mut R) -> Result<PeImage, PeError> {
    reader.seek(SeekFrom::Start(0))?;
    if reader.read_u16::<LE>()? != DOS_MAGIC {
        return Err(PeError::BadDosSignature);
    }

    reader.seek(SeekFrom::Start(PE_OFFSET_FIELD))?;
    let pe_offset = reader.read_u32::<LE>()?;
    reader.seek(SeekFrom::Start(u64::from(pe_offset)))?;
    if reader.read_u32::<LE>()? != PE_SIGNATURE {
        return Err(PeError::BadPeSignature(pe_offset));
    }

    // COFF file header
    let machine = reader.read_u16::<LE>()?;
    let section_count = reader.read_u16::<LE>()?;
    reader.seek(SeekFrom::Current(12))?; // timestamp, symbol table, symbol count
    let optional_size = reader.read_u16::<LE>()?;
    let _characteristics = reader.read_u16::<LE>()?;

    if section_count > MAX_SECTIONS {
        return Err(PeError::TooManySections(section_count));
    }

    let optional_start = u64::from(pe_offset) + 24;
    let optional_magic = reader.read_u16::<LE>()?;
    let (rva_count_offset, directories_offset) = match optional_magic {
        OPTIONAL_MAGIC_PE32 => (92, 96),
        OPTIONAL_MAGIC_PE32_PLUS => (108, 112),
        other => return Err(PeError::UnknownOptionalHeader(other)),
    };

    reader.seek(SeekFrom::Start(optional_start + rva_count_offset))?;
    let rva_count = reader.read_u32::<LE>()?;
    let import_entry = directories_offset + u64::from(IMPORT_DIRECTORY_INDEX) * 8;
    if rva_count <= IMPORT_DIRECTORY_INDEX || u64::from(optional_size) < import_entry + 8 {
        return Ok(PeImage {
            machine,
            imports: Vec::new(),
        });
    }

    reader.seek(SeekFrom::Start(optional_start + import_entry))?;
    let import_rva = reader.read_u32::<LE>()?;
    let _import_size = reader.read_u32::<LE>()?;
    if import_rva == 0 {
        return Ok(PeImage {
            machine,
            imports: Vec::new(),
        });
    }

    let sections = read_sections(
        reader,
        optional_start + u64::from(optional_size),
        section_count,
    )?;
    let imports = read_import_names(reader, &sections, import_rva)?;

    Ok(PeImage { machine, imports })
}

/// Read just the machine word, following `e_lfanew` without validating
/// either signature.
///
/// This is the degraded path for images whose headers are too damaged for
/// [`parse`].
///
/// # Errors
///
/// Returns an I/O error if either field lies past the end of the file.
pub fn read_raw_machine<R: Read + Seek>(reader: &mut R) -> io::Result<u16> {
    reader.seek(SeekFrom::Start(PE_OFFSET_FIELD))?;
    let pe_offset = reader.read_u32::<LE>()?;
    reader.seek(SeekFrom::Start(u64::from(pe_offset) + 4))?;
    reader.read_u16::<LE>()
}

fn read_sections<R: Read + Seek>(
    reader: &mut R,
    table_start: u64,
    count: u16,
) -> Result<Vec<Section>, PeError> {
    let mut sections = Vec::with_capacity(usize::from(count));
    for index in 0..u64::from(count) {
        // Skip the 8-byte name.
        reader.seek(SeekFrom::Start(table_start + index * SECTION_HEADER_SIZE + 8))?;
        let virtual_size = reader.read_u32::<LE>()?;
        let virtual_address = reader.read_u32::<LE>()?;
        let raw_size = reader.read_u32::<LE>()?;
        let raw_pointer = reader.read_u32::<LE>()?;
        sections.push(Section {
            virtual_address,
            virtual_size,
            raw_size,
            raw_pointer,
        });
    }
    Ok(sections)
}

fn rva_to_offset(sections: &[Section], rva: u32) -> Result<u64, PeError> {
    sections
        .iter()
        .find(|s| s.contains(rva))
        .map(|s| u64::from(rva - s.virtual_address) + u64::from(s.raw_pointer))
        .ok_or(PeError::UnmappedRva(rva))
}

fn read_import_names<R: BufRead + Seek>(
    reader: &mut R,
    sections: &[Section],
    import_rva: u32,
) -> Result<Vec<String>, PeError> {
    let table = rva_to_offset(sections, import_rva)?;
    let mut names = Vec::new();

    for index in 0..MAX_IMPORT_DESCRIPTORS {
        reader.seek(SeekFrom::Start(table + index * IMPORT_DESCRIPTOR_SIZE))?;
        let original_first_thunk = reader.read_u32::<LE>()?;
        reader.seek(SeekFrom::Current(8))?; // timestamp, forwarder chain
        let name_rva = reader.read_u32::<LE>()?;
        let first_thunk = reader.read_u32::<LE>()?;

        if name_rva == 0 && first_thunk == 0 && original_first_thunk == 0 {
            break;
        }
        if name_rva == 0 {
            continue;
        }

        let name_offset = rva_to_offset(sections, name_rva)?;
        names.push(read_c_string(reader, name_offset)?.to_ascii_lowercase());
    }

    Ok(names)
}

/// Read a NUL-terminated string of at most [`MAX_NAME_LEN`] bytes.
fn read_c_string<R: BufRead + Seek>(reader: &mut R, offset: u64) -> io::Result<String> {
    reader.seek(SeekFrom::Start(offset))?;
    let mut buf = Vec::new();
    reader.by_ref().take(MAX_NAME_LEN).read_until(0, &mut buf)?;
    if buf.last() == Some(&0) {
        buf.pop();
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}
