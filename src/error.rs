use std::io;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// The leading signature bytes do not match the selected format.
    #[error("not a {expected} capture, signature mismatch")]
    UnsupportedFormat { expected: &'static str },

    #[error("corrupt capture file: {0}")]
    Corrupt(#[from] CorruptError),

    /// An IO error occurred outside of parsing, e.g. while opening the file
    #[error("capture IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CorruptError {
    /// A header or sample read ran past the end of the file
    #[error("file ends inside {section} at offset {offset}")]
    Truncated { section: &'static str, offset: u64 },

    /// A decoded enumeration code falls outside its lookup table
    #[error("{table} code {code} outside lookup table")]
    Lookup { table: &'static str, code: i64 },

    #[error("{field} value {value} out of range")]
    FieldRange { field: &'static str, value: i64 },

    /// A declared channel block size is inconsistent with the file length
    #[error("channel block of {declared} bytes overruns remaining {remaining} bytes")]
    BlockOverrun { declared: u64, remaining: u64 },
}
