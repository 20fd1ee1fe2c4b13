use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type MeshResult<T> = Result<T, MeshError>;

/// Errors raised while loading, modifying or exporting housing meshes.
#[derive(Debug, Error)]
pub enum MeshError {
    /// The file could not be opened or read.
    #[error("failed to read mesh from {path}: {source}")]
    IoRead {
        /// File being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The file could not be created or written.
    #[error("failed to write {path}: {source}")]
    IoWrite {
        /// File being written.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The file looks like an STL but is damaged.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// File being parsed.
        path: PathBuf,
        /// First problem found.
        #[source]
        source: StlError,
    },

    /// The file is neither ascii nor binary STL.
    #[error("{path} is not an STL file ({len} bytes, no `solid` header)")]
    UnsupportedFormat {
        /// File being parsed.
        path: PathBuf,
        /// File size.
        len: usize,
    },

    /// Faces refer to vertices that do not exist or repeat a vertex.
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    /// The mesh has no faces.
    #[error("mesh is empty: {0}")]
    EmptyMesh(String),

    /// No vertex lies close enough to a requested position.
    #[error("no vertices within {radius} mm of ({x:.1}, {y:.1})")]
    NoVerticesNear {
        /// X of the position.
        x: f64,
        /// Y of the position.
        y: f64,
        /// Search radius.
        radius: f64,
    },

    /// STL cannot store this many triangles.
    #[error("{0} triangles exceed the STL limit of 4,294,967,295")]
    TooManyTriangles(usize),

    /// A cutout solid is not watertight or has no volume.
    #[error("invalid cutout {name}: {details}")]
    InvalidCutout {
        /// Name of the cutout.
        name: String,
        /// Why it was rejected.
        details: String,
    },

    /// A boolean operation gave an unusable result.
    #[error("boolean {op} failed: {details}")]
    Boolean {
        /// Operation name.
        op: &'static str,
        /// What was wrong with the result.
        details: String,
    },

    /// Parameter file could not be decoded.
    #[error("invalid parameters in {path}: {source}")]
    Config {
        /// Parameter file.
        path: PathBuf,
        /// Decoder failure.
        #[source]
        source: toml::de::Error,
    },

    /// JSON export failed.
    #[error("failed to encode JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Problems found while decoding STL bytes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StlError {
    /// Too short for a binary header and no `solid` keyword.
    #[error("unrecognised data ({len} bytes)")]
    Unrecognised {
        /// Byte count.
        len: usize,
    },

    /// The header declares more triangles than the data holds.
    #[error("truncated binary STL: {declared} triangles declared, {len} bytes found")]
    Truncated {
        /// Triangle count from the header.
        declared: usize,
        /// Byte count.
        len: usize,
    },

    /// A coordinate is infinite or NaN.
    #[error("triangle {0} has a non finite coordinate")]
    NonFinite(usize),

    /// Ascii text that is not valid UTF-8.
    #[error("not valid utf-8: {0}")]
    NotUtf8(#[from] std::str::Utf8Error),

    /// A `vertex` line that does not hold three numbers.
    #[error("line {line}: {details}")]
    BadVertex {
        /// One based line number.
        line: usize,
        /// What was wrong.
        details: String,
    },

    /// A facet closed with other than three vertices.
    #[error("line {line}: facet has {found} vertices")]
    FacetVertices {
        /// One based line number.
        line: usize,
        /// Vertices seen.
        found: usize,
    },

    /// The text ended inside a facet.
    #[error("unterminated facet at end of file")]
    Unterminated,
}
