use glam::DVec2;
use glam::DVec3;
use log::debug;

use crate::grid::Grid;

/// DBSCAN labels for `points`, `None` marks noise.
///
/// A point is a core point when at least `min_samples` points (itself
/// included) lie within `eps`. Clusters are numbered in the order their
/// first core point appears; a border point reachable from several clusters
/// keeps the first label it receives.
#[must_use]
pub fn dbscan(points: &[DVec3], eps: f64, min_samples: usize) -> Vec<Option<usize>> {
    let grid = Grid::new(points, eps);
    let mut labels = vec![None; points.len()];
    let mut visited = vec![false; points.len()];
    let mut cluster = 0;

    for i in 0..points.len() {
        if visited[i] {
            continue;
        }
        visited[i] = true;
        let seeds = grid.neighbors(points[i], eps);
        if seeds.len() < min_samples {
            continue;
        }

        labels[i] = Some(cluster);
        let mut queue = seeds;
        while let Some(j) = queue.pop() {
            if labels[j].is_none() {
                labels[j] = Some(cluster);
            }
            if visited[j] {
                continue;
            }
            visited[j] = true;
            let neighbors = grid.neighbors(points[j], eps);
            if neighbors.len() >= min_samples {
                queue.extend(neighbors);
            }
        }
        cluster += 1;
    }

    debug!(
        "dbscan: {} points, {cluster} clusters, {} noise",
        points.len(),
        labels.iter().filter(|l| l.is_none()).count()
    );
    labels
}

/// DBSCAN in the XY plane.
#[must_use]
pub fn dbscan_2d(points: &[DVec2], eps: f64, min_samples: usize) -> Vec<Option<usize>> {
    let lifted: Vec<DVec3> = points.iter().map(|p| p.extend(0.0)).collect();
    dbscan(&lifted, eps, min_samples)
}

/// Member indices of each cluster, indexed by label.
#[must_use]
pub fn clusters(labels: &[Option<usize>]) -> Vec<Vec<usize>> {
    let count = labels.iter().flatten().max().map_or(0, |m| m + 1);
    let mut out = vec![Vec::new(); count];
    for (i, label) in labels.iter().enumerate() {
        if let Some(l) = label {
            out[*l].push(i);
        }
    }
    out
}
