use std::fs::File;
use std::io::BufWriter;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use glam::DVec3;
use glam::Vec3;
use log::info;
use log::warn;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::MeshError;
use crate::MeshResult;
use crate::StlError;
use crate::Triangle;
use crate::mesh::Mesh;

static ATTRIBUTE_COUNT: [u8; 2] = [0; 2];

const HEADER_LEN: usize = 80;
const RECORD_LEN: usize = 50;

fn create(path: &Path) -> MeshResult<BufWriter<File>> {
    let write_err = |source| MeshError::IoWrite {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_err)?;
    }
    let file = File::create(path).map_err(write_err)?;
    Ok(BufWriter::new(file))
}

/// Write triangles to file.
///
/// # Errors
///   When the file cannot be created or written to, or when the number of
///   triangles exceeds that allowed by the stl format.
pub fn save_triangles(path: &Path, triangles: &[Triangle]) -> MeshResult<()> {
    let count =
        u32::try_from(triangles.len()).map_err(|_| MeshError::TooManyTriangles(triangles.len()))?;
    let mut writer = create(path)?;

    let mut buffer = Vec::with_capacity(HEADER_LEN + 4 + RECORD_LEN * triangles.len());
    // Header
    buffer.extend_from_slice(&[b' '; HEADER_LEN]);
    buffer.extend_from_slice(&count.to_le_bytes());

    for t in triangles {
        // Normals
        let normal = t.normal().as_vec3();
        buffer.extend(normal.to_array().iter().flat_map(|f| f.to_le_bytes()));
        // Triangles
        for v in t.0 {
            buffer.extend(v.as_vec3().to_array().iter().flat_map(|f| f.to_le_bytes()));
        }
        // Attribute count
        buffer.extend_from_slice(&ATTRIBUTE_COUNT);
    }

    writer
        .write_all(&buffer)
        .and_then(|()| writer.flush())
        .map_err(|source| MeshError::IoWrite {
            path: path.to_path_buf(),
            source,
        })?;
    info!("wrote {} triangles to {}", triangles.len(), path.display());
    Ok(())
}

/// Write triangles as a STL file (in ascii format).
///
/// Use only when debugging.
///
/// # Errors
///   When the file cannot be created or written to.
pub fn save_triangles_ascii(path: &Path, triangles: &[Triangle]) -> MeshResult<()> {
    let mut writer = create(path)?;
    let name = path
        .file_stem()
        .map_or_else(|| "mesh".into(), |s| s.to_string_lossy());

    let mut write = || -> std::io::Result<()> {
        writeln!(writer, "solid {name}")?;
        for t in triangles {
            let normal = t.normal().as_vec3();
            writeln!(
                writer,
                "  facet normal {} {} {}",
                normal.x, normal.y, normal.z
            )?;
            writeln!(writer, "    outer loop")?;
            for v in t.0.map(|v| v.as_vec3()) {
                writeln!(writer, "      vertex {} {} {}", v.x, v.y, v.z)?;
            }
            writeln!(writer, "    endloop")?;
            writeln!(writer, "  endfacet")?;
        }
        writeln!(writer, "endsolid {name}")?;
        writer.flush()
    };
    write().map_err(|source| MeshError::IoWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Write an indexed mesh as binary STL.
///
/// # Errors
///   When a face refers to a missing vertex, otherwise see
///   [`save_triangles`].
pub fn save_mesh(path: &Path, mesh: &Mesh) -> MeshResult<()> {
    mesh.check_faces()?;
    save_triangles(path, &mesh.to_triangles())
}

/// Write `value` as pretty printed JSON.
///
/// # Errors
///   When encoding fails or the file cannot be written.
pub fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> MeshResult<()> {
    let text = serde_json::to_string_pretty(value)?;
    save_text(path, &text)?;
    info!("wrote {}", path.display());
    Ok(())
}

/// Write a plain text report, creating parent directories.
///
/// # Errors
///   When the file cannot be created or written to.
pub fn save_text(path: &Path, text: &str) -> MeshResult<()> {
    let mut writer = create(path)?;
    writer
        .write_all(text.as_bytes())
        .and_then(|()| writer.flush())
        .map_err(|source| MeshError::IoWrite {
            path: path.to_path_buf(),
            source,
        })
}

/// Read a TOML parameter file.
///
/// # Errors
///   When the file cannot be read or does not decode into `T`.
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> MeshResult<T> {
    let text = std::fs::read_to_string(path).map_err(|source| MeshError::IoRead {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&text).map_err(|source| MeshError::Config {
        path: path.to_path_buf(),
        source,
    })
}

/// Load an STL file, binary or ascii, into a welded mesh.
///
/// # Errors
///   If the file cannot be read, is damaged or is not an STL at all.
pub fn load_stl(path: &Path) -> MeshResult<Mesh> {
    let bytes = std::fs::read(path).map_err(|source| MeshError::IoRead {
        path: path.to_path_buf(),
        source,
    })?;
    let triangles = parse_stl(&bytes).map_err(|source| match source {
        StlError::Unrecognised { len } => MeshError::UnsupportedFormat {
            path: path.to_path_buf(),
            len,
        },
        source => MeshError::Parse {
            path: path.to_path_buf(),
            source,
        },
    })?;
    let mesh = Mesh::from_triangles(&triangles);
    info!(
        "loaded {} ({} vertices, {} faces)",
        path.display(),
        mesh.vertex_count(),
        mesh.face_count()
    );
    Ok(mesh)
}

/// Decode STL bytes into a triangle soup.
///
/// A file is treated as binary whenever its length matches the triangle
/// count in the header, even if it starts with `solid`: several exporters
/// write that word into binary headers.
///
/// # Errors
///   The first problem found. Data that is too short for a binary header
///   and does not start with `solid` is [`StlError::Unrecognised`].
pub fn parse_stl(bytes: &[u8]) -> Result<Vec<Triangle>, StlError> {
    let declared = (bytes.len() >= HEADER_LEN + 4).then(|| read_u32(bytes, HEADER_LEN) as usize);
    let expected_len = declared.and_then(|count| {
        count
            .checked_mul(RECORD_LEN)
            .and_then(|n| n.checked_add(HEADER_LEN + 4))
    });
    if expected_len.is_some_and(|n| n == bytes.len()) {
        return parse_binary(bytes);
    }
    if bytes.trim_ascii_start().starts_with(b"solid") {
        let text = std::str::from_utf8(bytes)?;
        return parse_ascii(text);
    }
    match declared {
        Some(declared) => Err(StlError::Truncated {
            declared,
            len: bytes.len(),
        }),
        None => Err(StlError::Unrecognised { len: bytes.len() }),
    }
}

fn read_u32(bytes: &[u8], offset: usize) -> u32 {
    let mut word = [0_u8; 4];
    word.copy_from_slice(&bytes[offset..offset + 4]);
    u32::from_le_bytes(word)
}

fn read_vec3(bytes: &[u8], offset: usize) -> DVec3 {
    let f = |i: usize| {
        let mut word = [0_u8; 4];
        word.copy_from_slice(&bytes[offset + 4 * i..offset + 4 * i + 4]);
        f32::from_le_bytes(word)
    };
    Vec3::new(f(0), f(1), f(2)).as_dvec3()
}

fn parse_binary(bytes: &[u8]) -> Result<Vec<Triangle>, StlError> {
    let count = read_u32(bytes, HEADER_LEN) as usize;
    let mut triangles = Vec::with_capacity(count);
    for i in 0..count {
        let record = HEADER_LEN + 4 + i * RECORD_LEN;
        // Skip the stored normal, it is recomputed from the winding.
        let corners = [0, 1, 2].map(|c| read_vec3(bytes, record + 12 + 12 * c));
        if corners.iter().any(|c| !c.is_finite()) {
            return Err(StlError::NonFinite(i));
        }
        triangles.push(Triangle(corners));
    }
    Ok(triangles)
}

fn parse_ascii(text: &str) -> Result<Vec<Triangle>, StlError> {
    let mut triangles = Vec::new();
    let mut corners = Vec::with_capacity(3);
    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if let Some(rest) = line.strip_prefix("vertex") {
            let coords = rest
                .split_whitespace()
                .map(str::parse::<f32>)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| StlError::BadVertex {
                    line: line_no + 1,
                    details: e.to_string(),
                })?;
            if coords.len() != 3 {
                return Err(StlError::BadVertex {
                    line: line_no + 1,
                    details: format!("expected 3 coordinates, found {}", coords.len()),
                });
            }
            corners.push(Vec3::new(coords[0], coords[1], coords[2]).as_dvec3());
        } else if line.starts_with("endfacet") {
            if corners.len() != 3 {
                return Err(StlError::FacetVertices {
                    line: line_no + 1,
                    found: corners.len(),
                });
            }
            if corners.iter().any(|c| !c.is_finite()) {
                return Err(StlError::NonFinite(triangles.len()));
            }
            triangles.push(Triangle([corners[0], corners[1], corners[2]]));
            corners.clear();
        }
    }
    if !corners.is_empty() {
        return Err(StlError::Unterminated);
    }
    if triangles.is_empty() {
        warn!("ascii STL contains no facets");
    }
    Ok(triangles)
}

/// Outcome of re-reading an exported file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportCheck {
    /// Path of the exported file.
    pub path: PathBuf,
    /// Size on disk in bytes.
    pub file_size: u64,
    /// Vertices after reloading.
    pub vertices: usize,
    /// Faces after reloading.
    pub faces: usize,
}

/// Save `mesh` and load it back to confirm the export is readable.
///
/// # Errors
///   When writing or re-reading fails.
pub fn verify_export(path: &Path, mesh: &Mesh) -> MeshResult<ExportCheck> {
    save_mesh(path, mesh)?;
    let file_size = std::fs::metadata(path)
        .map_err(|source| MeshError::IoRead {
            path: path.to_path_buf(),
            source,
        })?
        .len();
    let reloaded = load_stl(path)?;
    Ok(ExportCheck {
        path: path.to_path_buf(),
        file_size,
        vertices: reloaded.vertex_count(),
        faces: reloaded.face_count(),
    })
}

#[cfg(test)]
mod tests {
    use glam::dvec3;

    use super::*;
    use crate::primitives::cuboid;

    #[test]
    fn binary_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/cube.stl");
        let cube = cuboid(dvec3(10.0, 20.0, 30.0));
        let check = verify_export(&path, &cube).unwrap();
        assert_eq!(check.file_size, 84 + 50 * 12);
        assert_eq!(check.vertices, 8);
        assert_eq!(check.faces, 12);
    }

    #[test]
    fn ascii_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cube.stl");
        let cube = cuboid(dvec3(1.0, 2.0, 3.0));
        save_triangles_ascii(&path, &cube.to_triangles()).unwrap();
        let loaded = load_stl(&path).unwrap();
        assert_eq!(loaded.face_count(), 12);
        assert!((loaded.volume() - 6.0).abs() < 1e-6);
    }

    #[test]
    fn binary_header_starting_with_solid() {
        let mut bytes = b"solid exported by a CAD tool".to_vec();
        bytes.resize(80, b' ');
        bytes.extend_from_slice(&1_u32.to_le_bytes());
        bytes.extend_from_slice(&[0; 12]);
        for v in [[0.0_f32, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]] {
            bytes.extend(v.iter().flat_map(|f| f.to_le_bytes()));
        }
        bytes.extend_from_slice(&ATTRIBUTE_COUNT);
        let triangles = parse_stl(&bytes).unwrap();
        assert_eq!(triangles.len(), 1);
        assert_eq!(triangles[0].0[1], DVec3::X);
    }

    #[test]
    fn truncated_binary_is_an_error() {
        let mut bytes = vec![b' '; 80];
        bytes.extend_from_slice(&5_u32.to_le_bytes());
        bytes.extend_from_slice(&[0; 60]);
        let err = parse_stl(&bytes).unwrap_err();
        assert_eq!(err, StlError::Truncated { declared: 5, len: 144 });
    }

    #[test]
    fn ascii_rejects_non_finite_coordinates() {
        for bad in ["1e39 0 0", "inf 0 0", "0 NaN 0"] {
            let text = format!(
                "solid t\nfacet normal 0 0 1\nouter loop\nvertex {bad}\n\
                 vertex 1 0 0\nvertex 0 1 0\nendloop\nendfacet\nendsolid t\n"
            );
            assert_eq!(parse_stl(text.as_bytes()), Err(StlError::NonFinite(0)), "{bad}");
        }
    }

    #[test]
    fn unrecognised_bytes() {
        assert_eq!(
            parse_stl(b"not a mesh"),
            Err(StlError::Unrecognised { len: 10 })
        );

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.stl");
        std::fs::write(&path, b"just some notes").unwrap();
        let err = load_stl(&path).unwrap_err();
        assert!(matches!(err, MeshError::UnsupportedFormat { len: 15, .. }), "{err}");
    }

    #[test]
    fn damaged_ascii_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("damaged.stl");
        std::fs::write(&path, "solid d\nfacet normal 0 0 1\nouter loop\nvertex 0 0\n").unwrap();
        let err = load_stl(&path).unwrap_err();
        assert!(
            matches!(
                err,
                MeshError::Parse {
                    source: StlError::BadVertex { line: 4, .. },
                    ..
                }
            ),
            "{err}"
        );
    }

    #[test]
    fn dangling_face_index_is_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.stl");
        let mut cube = cuboid(dvec3(1.0, 1.0, 1.0));
        cube.faces.push([0, 1, 99]);
        let err = save_mesh(&path, &cube).unwrap_err();
        assert!(matches!(err, MeshError::InvalidTopology(_)), "{err}");
        assert!(!path.exists());
    }

    #[test]
    fn missing_file() {
        let err = load_stl(Path::new("/definitely/not/here.stl")).unwrap_err();
        assert!(matches!(err, MeshError::IoRead { .. }));
    }
}
