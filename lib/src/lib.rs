#![deny(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::complexity)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::perf)]
#![warn(missing_debug_implementations)]
#![warn(missing_docs)]
#![allow(clippy::many_single_char_names)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![doc = include_str!("../../README.md")]

/// Edge/face topology, watertightness and winding checks.
pub mod adjacency;
/// Whole-mesh diagnostics: volume, hull ratio, thickness, Z levels.
pub mod analysis;
/// Parametric two-part handheld case generator.
pub mod case;
/// Density based clustering of points.
pub mod cluster;
/// Boolean union, difference and intersection on closed meshes.
pub mod csg;
/// Applying and validating cutout solids.
pub mod cutout;
/// Error type shared by every module.
pub mod error;
/// Gaming control detection: holes, buttons, D-pad, triggers.
pub mod features;
/// Circle fitting, histograms and small statistics helpers.
pub mod fit;
/// Uniform spatial hash over point positions.
pub mod grid;
/// Front and back cover modification pipelines.
pub mod housing;
/// Convex hull construction.
pub mod hull;
/// Load and Save STL meshes.
pub mod io;
/// Scanning a model directory into a catalog.
pub mod library;
/// Indexed triangle mesh and bounding boxes.
pub mod mesh;
/// Boxes, cylinders and rounded rectangles used as cutout solids.
pub mod primitives;
/// Ray casting against a mesh with a bounding volume hierarchy.
pub mod ray;
/// Mesh cleanup: duplicates, winding, hole filling.
pub mod repair;
/// Area weighted surface sampling.
pub mod sample;
#[cfg(test)]
mod test;

use glam::DVec3;

pub use error::MeshError;
pub use error::MeshResult;
pub use error::StlError;
pub use mesh::Aabb;
pub use mesh::Mesh;

/// A series of Points
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Triangle(pub [DVec3; 3]);

impl Triangle {
    /// Unit normal following the right hand rule, zero when degenerate.
    #[must_use]
    pub fn normal(&self) -> DVec3 {
        let cross = (self.0[1] - self.0[0]).cross(self.0[2] - self.0[0]);
        cross.normalize_or_zero()
    }

    /// Surface area.
    #[must_use]
    pub fn area(&self) -> f64 {
        (self.0[1] - self.0[0]).cross(self.0[2] - self.0[0]).length() * 0.5
    }

    /// Mean of the three corners.
    #[must_use]
    pub fn center(&self) -> DVec3 {
        (self.0[0] + self.0[1] + self.0[2]) / 3.0
    }
}
