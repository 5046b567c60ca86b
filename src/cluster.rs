//! Density-based clustering of point clouds.

use std::collections::HashMap;

use nalgebra as na;

type Cell = (i64, i64, i64);

struct Grid<'a> {
    points: &'a [na::Point3<f32>],
    eps: f32,
    cells: HashMap<Cell, Vec<usize>>,
}

impl<'a> Grid<'a> {
    fn new(points: &'a [na::Point3<f32>], eps: f32) -> Grid<'a> {
        let mut cells: HashMap<Cell, Vec<usize>> = HashMap::new();
        for (i, p) in points.iter().enumerate() {
            cells.entry(Self::cell_of(p, eps)).or_default().push(i);
        }
        Grid { points, eps, cells }
    }

    fn cell_of(p: &na::Point3<f32>, eps: f32) -> Cell {
        (
            (p.x / eps).floor() as i64,
            (p.y / eps).floor() as i64,
            (p.z / eps).floor() as i64,
        )
    }

    /// Indices within `eps` of point `i`, `i` included.
    fn neighbors(&self, i: usize) -> Vec<usize> {
        let p = self.points[i];
        let (cx, cy, cz) = Self::cell_of(&p, self.eps);
        let eps2 = self.eps * self.eps;
        let mut out = Vec::new();
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    if let Some(idxs) = self.cells.get(&(cx + dx, cy + dy, cz + dz)) {
                        out.extend(
                            idxs.iter()
                                .copied()
                                .filter(|&j| (self.points[j] - p).norm_squared() <= eps2),
                        );
                    }
                }
            }
        }
        out
    }
}

/// DBSCAN. Returns the cluster id per point, `None` for noise.
///
/// `min_samples` counts the point itself, so `1` turns every point into a
/// core point.
pub fn dbscan(points: &[na::Point3<f32>], eps: f32, min_samples: usize) -> Vec<Option<usize>> {
    let mut labels = vec![None; points.len()];
    if points.is_empty() || eps <= 0.0 {
        return labels;
    }
    let grid = Grid::new(points, eps);
    let mut visited = vec![false; points.len()];
    let mut cluster_id = 0;

    for i in 0..points.len() {
        if visited[i] {
            continue;
        }
        visited[i] = true;
        let seeds = grid.neighbors(i);
        if seeds.len() < min_samples {
            continue;
        }
        labels[i] = Some(cluster_id);
        let mut queue = seeds;
        while let Some(j) = queue.pop() {
            if labels[j].is_none() {
                labels[j] = Some(cluster_id);
            }
            if visited[j] {
                continue;
            }
            visited[j] = true;
            let nb = grid.neighbors(j);
            if nb.len() >= min_samples {
                queue.extend(nb);
            }
        }
        cluster_id += 1;
    }
    labels
}

/// Groups point indices by cluster id, dropping noise.
pub fn clusters(labels: &[Option<usize>]) -> Vec<Vec<usize>> {
    let n = labels.iter().flatten().max().map(|m| m + 1).unwrap_or(0);
    let mut out = vec![Vec::new(); n];
    for (i, l) in labels.iter().enumerate() {
        if let Some(l) = l {
            out[*l].push(i);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn two_blobs_and_an_outlier() {
        let mut pts = Vec::new();
        for i in 0..10 {
            pts.push(na::Point3::new(i as f32 * 0.01, 0.0, 1.0));
            pts.push(na::Point3::new(5.0 + i as f32 * 0.01, 0.0, 1.0));
        }
        pts.push(na::Point3::new(-10.0, 0.0, 1.0));
        let labels = dbscan(&pts, 0.05, 3);
        let groups = clusters(&labels);
        assert_eq!(groups.len(), 2);
        assert!(labels[20].is_none());
        assert!(groups.iter().all(|g| g.len() == 10));
    }
}
