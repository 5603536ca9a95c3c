//! Fixed-layout binary reading.
//!
//! Both capture formats are fixed-offset binary records with mixed field
//! widths. Rather than scattering literal offsets through the decoders, each
//! format declares its header layout as [`FieldDef`] constants and reads the
//! whole record into a [`Record`], which gives typed access to the declared
//! fields. Short reads are reported as corrupt-file errors with the name of
//! the section that ran past the end.

use std::io::{self, Read, Seek};

use crate::error::{CorruptError, DecodeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    U8,
    U16Le,
    U32Le,
    I32Le,
    U64Le,
    I64Le,
    F32Le,
    Ascii,
}

impl FieldKind {
    pub const fn width(self) -> usize {
        match self {
            FieldKind::U8 => 1,
            FieldKind::U16Le => 2,
            FieldKind::U32Le | FieldKind::I32Le | FieldKind::F32Le => 4,
            FieldKind::U64Le | FieldKind::I64Le => 8,
            // Ascii fields carry their own width
            FieldKind::Ascii => 0,
        }
    }
}

/// One named field of a fixed-layout record.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    pub name: &'static str,
    pub offset: usize,
    pub width: usize,
    pub kind: FieldKind,
}

impl FieldDef {
    pub const fn new(name: &'static str, offset: usize, kind: FieldKind) -> Self {
        Self {
            name,
            offset,
            width: kind.width(),
            kind,
        }
    }

    pub const fn ascii(name: &'static str, offset: usize, width: usize) -> Self {
        Self {
            name,
            offset,
            width,
            kind: FieldKind::Ascii,
        }
    }

    pub const fn end(&self) -> usize {
        self.offset + self.width
    }
}

/// A byte window holding one fixed-layout record.
///
/// The window is sized once when the record is read from the stream, so the
/// typed getters index within bounds by construction.
pub struct Record<'a> {
    bytes: &'a [u8],
}

impl<'a> Record<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    fn slice(&self, field: &FieldDef) -> &'a [u8] {
        &self.bytes[field.offset..field.end()]
    }

    pub fn u8(&self, field: &FieldDef) -> u8 {
        debug_assert_eq!(field.kind, FieldKind::U8);
        self.slice(field)[0]
    }

    pub fn u16_le(&self, field: &FieldDef) -> u16 {
        debug_assert_eq!(field.kind, FieldKind::U16Le);
        u16::from_le_bytes(self.slice(field).try_into().unwrap())
    }

    pub fn u32_le(&self, field: &FieldDef) -> u32 {
        debug_assert_eq!(field.kind, FieldKind::U32Le);
        u32::from_le_bytes(self.slice(field).try_into().unwrap())
    }

    pub fn i32_le(&self, field: &FieldDef) -> i32 {
        debug_assert_eq!(field.kind, FieldKind::I32Le);
        i32::from_le_bytes(self.slice(field).try_into().unwrap())
    }

    pub fn u64_le(&self, field: &FieldDef) -> u64 {
        debug_assert_eq!(field.kind, FieldKind::U64Le);
        u64::from_le_bytes(self.slice(field).try_into().unwrap())
    }

    pub fn i64_le(&self, field: &FieldDef) -> i64 {
        debug_assert_eq!(field.kind, FieldKind::I64Le);
        i64::from_le_bytes(self.slice(field).try_into().unwrap())
    }

    pub fn f32_le(&self, field: &FieldDef) -> f32 {
        debug_assert_eq!(field.kind, FieldKind::F32Le);
        f32::from_le_bytes(self.slice(field).try_into().unwrap())
    }

    pub fn ascii(&self, field: &FieldDef) -> &'a [u8] {
        debug_assert_eq!(field.kind, FieldKind::Ascii);
        self.slice(field)
    }
}

/// Reads exactly `len` bytes from the current position, reporting a short
/// read as a corrupt file rather than a bare IO fault.
pub fn read_vec<R: Read + Seek>(
    reader: &mut R,
    len: usize,
    section: &'static str,
) -> Result<Vec<u8>, DecodeError> {
    let offset = reader.stream_position()?;
    let mut buf = vec![0u8; len];
    reader
        .read_exact(&mut buf)
        .map_err(|e| truncated(e, section, offset))?;
    Ok(buf)
}

pub fn read_array<const N: usize, R: Read + Seek>(
    reader: &mut R,
    section: &'static str,
) -> Result<[u8; N], DecodeError> {
    let offset = reader.stream_position()?;
    let mut buf = [0u8; N];
    reader
        .read_exact(&mut buf)
        .map_err(|e| truncated(e, section, offset))?;
    Ok(buf)
}

fn truncated(err: io::Error, section: &'static str, offset: u64) -> DecodeError {
    if err.kind() == io::ErrorKind::UnexpectedEof {
        CorruptError::Truncated { section, offset }.into()
    } else {
        DecodeError::Io(err)
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use pretty_assertions::assert_eq;

    use super::*;

    const SMALL: FieldDef = FieldDef::new("small", 0, FieldKind::U8);
    const WIDE: FieldDef = FieldDef::new("wide", 1, FieldKind::U64Le);
    const SIGNED: FieldDef = FieldDef::new("signed", 9, FieldKind::I32Le);
    const TAG: FieldDef = FieldDef::ascii("tag", 13, 3);

    #[test]
    fn field_widths_follow_kind() {
        assert_eq!(SMALL.width, 1);
        assert_eq!(WIDE.width, 8);
        assert_eq!(SIGNED.width, 4);
        assert_eq!(TAG.width, 3);
        assert_eq!(TAG.end(), 16);
    }

    #[test]
    fn record_reads_typed_fields() {
        let mut bytes = vec![0x2au8];
        bytes.extend_from_slice(&0x0102_0304_0506_0708u64.to_le_bytes());
        bytes.extend_from_slice(&(-12i32).to_le_bytes());
        bytes.extend_from_slice(b"CH1");
        let rec = Record::new(&bytes);
        assert_eq!(rec.u8(&SMALL), 0x2a);
        assert_eq!(rec.u64_le(&WIDE), 0x0102_0304_0506_0708);
        assert_eq!(rec.i32_le(&SIGNED), -12);
        assert_eq!(rec.ascii(&TAG), b"CH1");
    }

    #[test]
    fn short_read_is_reported_as_truncation() {
        let mut cursor = Cursor::new(vec![0u8; 4]);
        let err = read_vec(&mut cursor, 16, "main header").unwrap_err();
        match err {
            DecodeError::Corrupt(CorruptError::Truncated { section, offset }) => {
                assert_eq!(section, "main header");
                assert_eq!(offset, 0);
            }
            other => panic!("expected truncation, got {other:?}"),
        }
    }

    #[test]
    fn truncation_reports_the_failing_offset() {
        let mut cursor = Cursor::new(vec![0u8; 8]);
        let _ = read_array::<4, _>(&mut cursor, "first").unwrap();
        let err = read_vec(&mut cursor, 8, "second").unwrap_err();
        match err {
            DecodeError::Corrupt(CorruptError::Truncated { offset, .. }) => {
                assert_eq!(offset, 4)
            }
            other => panic!("expected truncation, got {other:?}"),
        }
    }
}
