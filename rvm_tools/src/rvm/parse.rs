use glam::{Affine3A, Vec3, Vec3A};

use super::error::ParseError;
use crate::bounds::Aabb;
use crate::interner::Name;
use crate::store::{
    Color, Contour, FileInfo, GroupInfo, ModelInfo, NodeId, NodeKind, Polygon, Primitive, Store,
};

/// Byte cursor over a chunk stream. All multi-byte fields are big-endian.
struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

struct ChunkHeader {
    id: [u8; 4],
    /// Declared offset of the next chunk, measured from the stream start.
    next_offset: u32,
}

impl ChunkHeader {
    fn id_string(&self) -> String {
        String::from_utf8_lossy(&self.id).into_owned()
    }
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn eof(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn take(&mut self, n: usize, chunk: &str) -> Result<&'a [u8], ParseError> {
        if self.data.len() - self.pos < n {
            return Err(ParseError::UnexpectedEof {
                chunk: chunk.to_string(),
            });
        }
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn u8(&mut self, chunk: &str) -> Result<u8, ParseError> {
        Ok(self.take(1, chunk)?[0])
    }

    fn u32(&mut self, chunk: &str) -> Result<u32, ParseError> {
        let b = self.take(4, chunk)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn f32(&mut self, chunk: &str) -> Result<f32, ParseError> {
        Ok(f32::from_bits(self.u32(chunk)?))
    }

    /// Word-count-prefixed string. The full word count is always consumed;
    /// the effective length is truncated at the first NUL byte.
    fn string(&mut self, store: &mut Store, chunk: &str) -> Result<Name, ParseError> {
        let words = self.u32(chunk)? as usize;
        let bytes = self.take(4 * words, chunk)?;
        let len = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        let text = String::from_utf8_lossy(&bytes[..len]);
        Ok(store.strings.intern(&text))
    }

    /// Chunk id as four big-endian u32 whose low bytes are the ASCII
    /// characters, followed by the next-offset field and an opaque
    /// version/flags word.
    fn chunk_header(&mut self) -> Result<ChunkHeader, ParseError> {
        let b = self.take(24, "chunk header")?;
        let id = [b[3], b[7], b[11], b[15]];
        let next_offset = u32::from_be_bytes([b[16], b[17], b[18], b[19]]);
        Ok(ChunkHeader { id, next_offset })
    }

    fn verify_offset(&self, chunk: &'static str, header: &ChunkHeader) -> Result<(), ParseError> {
        if self.pos == header.next_offset as usize {
            Ok(())
        } else {
            Err(ParseError::OffsetMismatch {
                chunk,
                expected: header.next_offset,
                actual: self.pos,
            })
        }
    }
}

/// Parses a whole chunk stream into `store`.
///
/// The stream must be HEAD, MODL, any number of CNTB/PRIM/COLR chunks, then
/// END:. On failure the store's error string is left untouched here; the
/// public wrapper records it.
pub(super) fn parse_stream(store: &mut Store, data: &[u8]) -> Result<(), ParseError> {
    let mut r = Reader::new(data);

    let header = r.chunk_header()?;
    if &header.id != b"HEAD" {
        return Err(ParseError::UnexpectedChunk {
            expected: "HEAD",
            found: header.id_string(),
        });
    }
    let file = parse_head(store, &mut r, &header)?;

    let header = r.chunk_header()?;
    if &header.id != b"MODL" {
        return Err(ParseError::UnexpectedChunk {
            expected: "MODL",
            found: header.id_string(),
        });
    }
    let model = parse_modl(store, &mut r, &header, file)?;

    while !r.eof() {
        let header = r.chunk_header()?;
        match &header.id {
            b"END:" => break,
            b"CNTB" => parse_cntb(store, &mut r, &header, model)?,
            b"PRIM" => return Err(ParseError::PrimitiveOutsideGroup),
            b"COLR" => parse_colr(store, &mut r, &header, model)?,
            _ => {
                return Err(ParseError::UnknownChunk {
                    found: header.id_string(),
                })
            }
        }
    }

    store.update_counts();
    Ok(())
}

fn parse_head(
    store: &mut Store,
    r: &mut Reader<'_>,
    header: &ChunkHeader,
) -> Result<NodeId, ParseError> {
    let version = r.u32("HEAD")?;
    let info = r.string(store, "HEAD")?;
    let note = r.string(store, "HEAD")?;
    let date = r.string(store, "HEAD")?;
    let user = r.string(store, "HEAD")?;
    let encoding = if version >= 2 {
        r.string(store, "HEAD")?
    } else {
        store.strings.intern("")
    };
    let file = store.new_node(
        None,
        NodeKind::File(FileInfo {
            info,
            note,
            date,
            user,
            encoding,
        }),
    );
    r.verify_offset("HEAD", header)?;
    Ok(file)
}

fn parse_modl(
    store: &mut Store,
    r: &mut Reader<'_>,
    header: &ChunkHeader,
    file: NodeId,
) -> Result<NodeId, ParseError> {
    let _version = r.u32("MODL")?;
    let project = r.string(store, "MODL")?;
    let name = r.string(store, "MODL")?;
    let model = store.new_node(
        Some(file),
        NodeKind::Model(ModelInfo {
            project,
            name,
            colors: Vec::new(),
        }),
    );
    r.verify_offset("MODL", header)?;
    Ok(model)
}

fn parse_cntb(
    store: &mut Store,
    r: &mut Reader<'_>,
    header: &ChunkHeader,
    parent: NodeId,
) -> Result<(), ParseError> {
    let _version = r.u32("CNTB")?;
    let name = r.string(store, "CNTB")?;

    // The file stores millimetres; the translation is a reference point,
    // geometry transforms are not relative to it.
    let translation = Vec3::new(
        0.001 * r.f32("CNTB")?,
        0.001 * r.f32("CNTB")?,
        0.001 * r.f32("CNTB")?,
    );
    let material = r.u32("CNTB")?;

    let group = store.new_node(
        Some(parent),
        NodeKind::Group(GroupInfo {
            name,
            translation,
            material,
            id: 0,
            end_tag: 0,
            bbox_world: Aabb::EMPTY,
            geometries: Vec::new(),
        }),
    );
    r.verify_offset("CNTB", header)?;

    while !r.eof() {
        let child = r.chunk_header()?;
        match &child.id {
            b"CNTE" => {
                store.group_mut(group).end_tag = r.u32("CNTE")?;
                return Ok(());
            }
            b"CNTB" => parse_cntb(store, r, &child, group)?,
            b"PRIM" => parse_prim(store, r, &child, group)?,
            _ => {
                return Err(ParseError::UnknownGroupChunk {
                    found: child.id_string(),
                })
            }
        }
    }
    Ok(())
}

fn parse_prim(
    store: &mut Store,
    r: &mut Reader<'_>,
    header: &ChunkHeader,
    group: NodeId,
) -> Result<(), ParseError> {
    let _version = r.u32("PRIM")?;
    let kind = r.u32("PRIM")?;

    let mut m = [0.0f32; 12];
    for v in &mut m {
        *v = r.f32("PRIM")?;
    }
    let transform = Affine3A::from_cols(
        Vec3A::new(m[0], m[1], m[2]),
        Vec3A::new(m[3], m[4], m[5]),
        Vec3A::new(m[6], m[7], m[8]),
        Vec3A::new(m[9], m[10], m[11]),
    );

    let mut b = [0.0f32; 6];
    for v in &mut b {
        *v = r.f32("PRIM")?;
    }
    let bbox_local = Aabb::new(Vec3::new(b[0], b[1], b[2]), Vec3::new(b[3], b[4], b[5]));

    let primitive = match kind {
        1 => Primitive::Pyramid {
            bottom: [r.f32("PRIM")?, r.f32("PRIM")?],
            top: [r.f32("PRIM")?, r.f32("PRIM")?],
            offset: [r.f32("PRIM")?, r.f32("PRIM")?],
            height: r.f32("PRIM")?,
        },
        2 => Primitive::Box {
            lengths: [r.f32("PRIM")?, r.f32("PRIM")?, r.f32("PRIM")?],
        },
        3 => Primitive::RectangularTorus {
            inner_radius: r.f32("PRIM")?,
            outer_radius: r.f32("PRIM")?,
            height: r.f32("PRIM")?,
            angle: r.f32("PRIM")?,
        },
        4 => Primitive::CircularTorus {
            offset: r.f32("PRIM")?,
            radius: r.f32("PRIM")?,
            angle: r.f32("PRIM")?,
        },
        5 => Primitive::EllipticalDish {
            base_radius: r.f32("PRIM")?,
            height: r.f32("PRIM")?,
        },
        6 => Primitive::SphericalDish {
            base_radius: r.f32("PRIM")?,
            height: r.f32("PRIM")?,
        },
        7 => Primitive::Snout {
            radius_b: r.f32("PRIM")?,
            radius_t: r.f32("PRIM")?,
            height: r.f32("PRIM")?,
            offset: [r.f32("PRIM")?, r.f32("PRIM")?],
            bshear: [r.f32("PRIM")?, r.f32("PRIM")?],
            tshear: [r.f32("PRIM")?, r.f32("PRIM")?],
        },
        8 => Primitive::Cylinder {
            radius: r.f32("PRIM")?,
            height: r.f32("PRIM")?,
        },
        9 => Primitive::Sphere {
            diameter: r.f32("PRIM")?,
        },
        10 => Primitive::Line {
            a: r.f32("PRIM")?,
            b: r.f32("PRIM")?,
        },
        11 => {
            let polygons_n = r.u32("PRIM")?;
            let mut polygons = Vec::new();
            for _ in 0..polygons_n {
                let contours_n = r.u32("PRIM")?;
                let mut contours = Vec::new();
                for _ in 0..contours_n {
                    let vertices_n = r.u32("PRIM")?;
                    let mut positions = Vec::new();
                    let mut normals = Vec::new();
                    for _ in 0..vertices_n {
                        positions.push(Vec3::new(
                            r.f32("PRIM")?,
                            r.f32("PRIM")?,
                            r.f32("PRIM")?,
                        ));
                        normals.push(Vec3::new(
                            r.f32("PRIM")?,
                            r.f32("PRIM")?,
                            r.f32("PRIM")?,
                        ));
                    }
                    contours.push(Contour { positions, normals });
                }
                polygons.push(Polygon { contours });
            }
            Primitive::FacetGroup { polygons }
        }
        _ => return Err(ParseError::UnknownPrimitiveKind(kind)),
    };

    let id = store.new_geometry(group, primitive);
    let geometry = store.geometry_mut(id);
    geometry.transform = transform;
    geometry.bbox_local = bbox_local;
    geometry.bbox_world = bbox_local.transformed(&transform);

    r.verify_offset("PRIM", header)
}

fn parse_colr(
    store: &mut Store,
    r: &mut Reader<'_>,
    header: &ChunkHeader,
    model: NodeId,
) -> Result<(), ParseError> {
    let kind = r.u32("COLR")?;
    let index = r.u32("COLR")?;
    let rgb = [r.u8("COLR")?, r.u8("COLR")?, r.u8("COLR")?];
    let _pad = r.u8("COLR")?;
    store.new_color(model, Color { kind, index, rgb });
    r.verify_offset("COLR", header)
}
