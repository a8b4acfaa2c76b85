//! Greedy single-link grouping of motion-coherent regions.

use log::debug;

use crate::color::Vec3;
use crate::features::RegionRecord;

/// Default merge threshold, in pixel + 8-bit RGB units.
pub const DEFAULT_MERGE_THRESHOLD: f64 = 120.0;

/// Weight of the horizontal centroid offset relative to the vertical one.
const HORIZONTAL_WEIGHT: f64 = 4.0;
/// Weight of the color term relative to the spatial term.
const COLOR_WEIGHT: f64 = 2.0;

#[derive(Clone, Debug, PartialEq)]
pub struct ClusterRecord {
    pub id: usize,
    pub center_x: f64,
    pub center_y: f64,
    pub color: Vec3,
    pub members: usize,
}

impl ClusterRecord {
    fn seeded_by(id: usize, region: &RegionRecord) -> Self {
        Self { id, center_x: region.center_x, center_y: region.center_y, color: region.color, members: 1 }
    }

    /// Folds a region in by averaging pairwise with the current value. Later members
    /// weigh as much as everything merged before them.
    fn absorb(&mut self, region: &RegionRecord) {
        self.center_x = (self.center_x + region.center_x) / 2.0;
        self.center_y = (self.center_y + region.center_y) / 2.0;
        self.color = self.color.add(region.color).scale(0.5);
        self.members += 1;
    }
}

/// Clusters plus the cluster id of every region (`-1` for regions never merged).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClusterTable {
    pub clusters: Vec<ClusterRecord>,
    pub assignments: Vec<i32>,
}

/// Combined spatial + color distance between a region and a cluster.
pub fn region_distance(region: &RegionRecord, cluster: &ClusterRecord) -> f64 {
    let dx = region.center_x - cluster.center_x;
    let dy = region.center_y - cluster.center_y;
    let spatial = (HORIZONTAL_WEIGHT * dx * dx + dy * dy).sqrt();
    let color = region.color.sub(cluster.color).norm();
    spatial + COLOR_WEIGHT * color
}

/// Walks coherent regions in label order, joining each to the nearest existing
/// cluster when closer than `merge_threshold` and opening a new one otherwise.
/// Every coherent region gets `cluster` set; every other region is reset to `None`.
pub fn cluster_regions(regions: &mut [RegionRecord], merge_threshold: f64) -> ClusterTable {
    let mut clusters: Vec<ClusterRecord> = Vec::new();
    let mut assignments = vec![-1i32; regions.len()];

    for (idx, region) in regions.iter_mut().enumerate() {
        region.cluster = None;
        if !region.coherent {
            continue;
        }
        let nearest = clusters
            .iter()
            .map(|c| (c.id, region_distance(region, c)))
            .fold(None, |best: Option<(usize, f64)>, (id, d)| match best {
                Some((_, bd)) if bd <= d => best,
                _ => Some((id, d)),
            });

        let id = match nearest {
            Some((id, d)) if d < merge_threshold => {
                clusters[id].absorb(region);
                id
            }
            _ => {
                let id = clusters.len();
                clusters.push(ClusterRecord::seeded_by(id, region));
                id
            }
        };
        region.cluster = Some(id);
        assignments[idx] = id as i32;
    }

    debug!("clustered {} coherent regions into {} clusters", assignments.iter().filter(|&&a| a >= 0).count(), clusters.len());
    ClusterTable { clusters, assignments }
}
