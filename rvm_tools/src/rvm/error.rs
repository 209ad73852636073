//! Error management for the binary exchange format.

use std::fmt;

/// Structural error raised while reading a chunk stream.
///
/// The parser stops at the first structural error; the store should be
/// discarded, no partial commit past the last good chunk boundary is
/// guaranteed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// The stream did not start with the mandatory chunk sequence.
    UnexpectedChunk {
        expected: &'static str,
        found: String,
    },

    /// An id that is not part of the top-level grammar.
    UnknownChunk { found: String },

    /// An id that is not allowed between a group's open and close chunks.
    UnknownGroupChunk { found: String },

    /// The byte offset after a chunk did not match the offset its header
    /// declared, which catches truncation and misalignment early.
    OffsetMismatch {
        chunk: &'static str,
        expected: u32,
        actual: usize,
    },

    UnknownPrimitiveKind(u32),

    /// A primitive chunk appeared without a containing group.
    PrimitiveOutsideGroup,

    /// A color chunk appeared before the model was opened.
    ColorOutsideModel,

    /// The stream ended in the middle of a chunk.
    UnexpectedEof { chunk: String },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::UnexpectedChunk { expected, found } => {
                write!(f, "Expected chunk {expected}, got {found}")
            }
            ParseError::UnknownChunk { found } => write!(f, "Unrecognized chunk {found}"),
            ParseError::UnknownGroupChunk { found } => {
                write!(f, "In CNTB, unknown chunk id {found}")
            }
            ParseError::OffsetMismatch {
                chunk,
                expected,
                actual,
            } => write!(
                f,
                "After chunk {chunk}, expected offset {expected:#x}, current offset is {actual:#x}"
            ),
            ParseError::UnknownPrimitiveKind(kind) => {
                write!(f, "In PRIM, unknown primitive kind {kind}")
            }
            ParseError::PrimitiveOutsideGroup => write!(f, "In PRIM, parent chunk is not CNTB"),
            ParseError::ColorOutsideModel => write!(f, "Model chunk unfinished."),
            ParseError::UnexpectedEof { chunk } => {
                write!(f, "Unexpected end of file in chunk {chunk}")
            }
        }
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_offsets() {
        let e = ParseError::OffsetMismatch {
            chunk: "PRIM",
            expected: 0x80,
            actual: 0x7c,
        };
        assert_eq!(
            e.to_string(),
            "After chunk PRIM, expected offset 0x80, current offset is 0x7c"
        );

        let e = ParseError::UnknownPrimitiveKind(99);
        assert_eq!(e.to_string(), "In PRIM, unknown primitive kind 99");
    }
}
