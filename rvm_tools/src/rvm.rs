//! Binary exchange format reader.
//!
//! The format is a linear stream of chunks. Each chunk starts with a
//! four-character id stored as four big-endian words (only the low byte of
//! each word carries the character), the declared byte offset of the next
//! chunk measured from the start of the stream, and an opaque version
//! field. The top level is HEAD, MODL, a possibly empty run of CNTB, PRIM
//! and COLR chunks, then END:. Group chunks (CNTB) nest CNTB and PRIM
//! children until their matching CNTE.
//!
//! Offsets are verified after every chunk so truncated or misaligned input
//! fails close to the corruption instead of producing a scrambled scene.

use crate::store::Store;

mod error;
mod parse;

pub use error::ParseError;

/// Parses a chunk stream into the store.
///
/// On failure the error is also recorded as the store's error string and
/// the store contents past the last good chunk boundary are unspecified;
/// callers should discard the store.
pub fn parse(store: &mut Store, data: &[u8]) -> Result<(), ParseError> {
    match parse::parse_stream(store, data) {
        Ok(()) => Ok(()),
        Err(e) => {
            store.set_error_string(&e.to_string());
            Err(e)
        }
    }
}

#[cfg(test)]
pub(crate) mod testutil {
    use glam::Affine3A;

    /// Builds chunk streams for tests, patching each chunk's next-offset
    /// when it is closed.
    pub(crate) struct ChunkWriter {
        pub data: Vec<u8>,
        open: Vec<usize>,
    }

    impl ChunkWriter {
        pub fn new() -> Self {
            Self {
                data: Vec::new(),
                open: Vec::new(),
            }
        }

        /// Writes the chunk id and prologue: next-offset placeholder plus
        /// the opaque flags word.
        pub fn begin(&mut self, id: &str, flags: u32) {
            for c in id.bytes() {
                self.data.extend_from_slice(&[0, 0, 0, c]);
            }
            self.open.push(self.data.len());
            self.u32(0); // next-offset placeholder
            self.u32(flags);
        }

        /// Closes the innermost chunk: its next-offset becomes the current
        /// position. Group chunks close right after their own payload,
        /// before their children are written.
        pub fn end(&mut self) {
            let at = self.open.pop().unwrap();
            let offset = (self.data.len() as u32).to_be_bytes();
            self.data[at..at + 4].copy_from_slice(&offset);
        }

        pub fn u32(&mut self, v: u32) {
            self.data.extend_from_slice(&v.to_be_bytes());
        }

        pub fn f32(&mut self, v: f32) {
            self.u32(v.to_bits());
        }

        pub fn string(&mut self, s: &str) {
            let words = s.len().div_ceil(4);
            self.u32(words as u32);
            self.data.extend_from_slice(s.as_bytes());
            self.data.resize(self.data.len() + (4 * words - s.len()), 0);
        }

        pub fn head(&mut self) {
            self.head_versioned(1, &["", "", "", ""]);
        }

        /// Version 2 headers carry a fifth string, the encoding.
        pub fn head_versioned(&mut self, version: u32, strings: &[&str]) {
            self.begin("HEAD", 1);
            self.u32(version);
            for s in strings {
                self.string(s);
            }
            self.end();
        }

        pub fn modl(&mut self, project: &str, name: &str) {
            self.begin("MODL", 1);
            self.u32(1);
            self.string(project);
            self.string(name);
            self.end();
        }

        pub fn cntb_open(&mut self, name: &str, translation: [f32; 3], material: u32) {
            self.begin("CNTB", 1);
            self.u32(1);
            self.string(name);
            for t in translation {
                self.f32(t);
            }
            self.u32(material);
            self.end();
        }

        pub fn cntb_close(&mut self, tag: u32) {
            self.begin("CNTE", 1);
            self.u32(tag);
            self.end();
        }

        pub fn prim(&mut self, kind: u32, bbox: [f32; 6], payload: &[f32]) {
            self.prim_at(kind, Affine3A::IDENTITY, bbox, payload);
        }

        pub fn prim_at(&mut self, kind: u32, m: Affine3A, bbox: [f32; 6], payload: &[f32]) {
            self.begin("PRIM", 1);
            self.u32(1);
            self.u32(kind);
            let cols = [m.matrix3.x_axis, m.matrix3.y_axis, m.matrix3.z_axis];
            for col in cols {
                self.f32(col.x);
                self.f32(col.y);
                self.f32(col.z);
            }
            self.f32(m.translation.x);
            self.f32(m.translation.y);
            self.f32(m.translation.z);
            for v in bbox {
                self.f32(v);
            }
            for v in payload {
                self.f32(*v);
            }
            self.end();
        }

        pub fn finish(mut self) -> Vec<u8> {
            self.begin("END:", 1);
            self.end();
            self.data
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_is_recorded_on_the_store() {
        let mut store = Store::new();
        let err = parse(&mut store, b"garbage that is way too short").unwrap_err();
        assert_eq!(store.error_string(), err.to_string());
    }
}
