use glam::DVec3;
use glam::IVec3;
use glam::ivec3;

// Upper bound on the number of cells, so tiny radii over a large housing
// do not allocate millions of empty buckets.
const MAX_CELLS: f64 = 2_097_152.0;

/// Uniform grid over a fixed set of points.
///
/// Each cell is at least as wide as the query radius, so a radius query
/// only has to look at the 27 cells around the query point.
#[derive(Clone, Debug)]
pub struct Grid {
    cell_size: f64,
    dims: IVec3,
    cells: Vec<Vec<usize>>,
    lower: DVec3,
    points: Vec<DVec3>,
}

impl Grid {
    /// Bucket `points` for queries of up to `radius`.
    #[must_use]
    pub fn new(points: &[DVec3], radius: f64) -> Self {
        let (lower, upper) = points.iter().fold(
            (DVec3::splat(f64::MAX), DVec3::splat(f64::MIN)),
            |(lo, hi), p| (lo.min(*p), hi.max(*p)),
        );
        let (lower, span) = if points.is_empty() {
            (DVec3::ZERO, DVec3::ZERO)
        } else {
            (lower, upper - lower)
        };

        let mut cell_size = radius.max(f64::EPSILON);
        let cells_for = |size: f64| ((span / size).floor() + DVec3::ONE).max(DVec3::ONE);
        while cells_for(cell_size).element_product() > MAX_CELLS {
            cell_size *= 2.0;
        }
        let ceil = cells_for(cell_size);
        let dims = ivec3(ceil.x as i32, ceil.y as i32, ceil.z as i32);
        let cells = vec![Vec::new(); (dims.x * dims.y * dims.z) as usize];

        let mut grid = Self {
            cell_size,
            dims,
            cells,
            lower,
            points: points.to_vec(),
        };

        for (i, p) in points.iter().enumerate() {
            let offset = grid.cell_offset(grid.cell_index(*p));
            grid.cells[offset].push(i);
        }

        grid
    }

    fn cell_index(&self, point: DVec3) -> IVec3 {
        let diff = (point - self.lower) / self.cell_size;
        let index = ivec3(diff.x as i32, diff.y as i32, diff.z as i32);
        index.clamp(ivec3(0, 0, 0), self.dims - 1)
    }

    fn cell_offset(&self, index: IVec3) -> usize {
        (index.z * self.dims.x * self.dims.y + index.y * self.dims.x + index.x) as usize
    }

    /// Indices of all points within `radius` (inclusive) of `point`.
    ///
    /// `radius` is clamped to the cell size the grid was built with.
    #[must_use]
    pub fn neighbors(&self, point: DVec3, radius: f64) -> Vec<usize> {
        let radius = radius.min(self.cell_size);
        let r2 = radius * radius;
        let center_index = self.cell_index(point);
        let mut result = Vec::new();
        for x_off in [-1, 0, 1] {
            for y_off in [-1, 0, 1] {
                for z_off in [-1, 0, 1] {
                    let index = center_index + ivec3(x_off, y_off, z_off);
                    if (index.x < 0 || index.x >= self.dims.x)
                        || (index.y < 0 || index.y >= self.dims.y)
                        || (index.z < 0 || index.z >= self.dims.z)
                    {
                        continue;
                    }
                    for &i in &self.cells[self.cell_offset(index)] {
                        if (self.points[i] - point).length_squared() <= r2 {
                            result.push(i);
                        }
                    }
                }
            }
        }
        result
    }

    /// Number of buckets allocated.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

#[cfg(test)]
mod tests {
    use glam::dvec3;

    use super::*;

    #[test]
    fn radius_query_is_inclusive() {
        let points = vec![DVec3::ZERO, dvec3(1.0, 0.0, 0.0), dvec3(2.5, 0.0, 0.0)];
        let grid = Grid::new(&points, 1.0);
        let mut found = grid.neighbors(DVec3::ZERO, 1.0);
        found.sort_unstable();
        assert_eq!(found, vec![0, 1]);
    }

    #[test]
    fn tiny_radius_over_large_span_is_bounded() {
        let points = vec![DVec3::ZERO, dvec3(300.0, 120.0, 20.0)];
        let grid = Grid::new(&points, 1e-9);
        assert!(grid.cell_count() as f64 <= MAX_CELLS);
        assert_eq!(grid.neighbors(dvec3(300.0, 120.0, 20.0), 1e-9), vec![1]);
    }

    #[test]
    fn empty_grid() {
        let grid = Grid::new(&[], 1.0);
        assert!(grid.neighbors(DVec3::ZERO, 1.0).is_empty());
    }
}
