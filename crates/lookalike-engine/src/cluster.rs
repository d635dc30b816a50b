//! Greedy near-duplicate clustering of perceptual hashes.
//!
//! Each round takes the first remaining image as seed and pulls in every
//! other remaining image within the threshold of that seed. Membership is
//! not transitive: two images close to each other but both further than the
//! threshold from every seed they meet can end up apart. Seeds and members
//! keep the order of the input list.

use lookalike_core::{ImageCluster, ImageRecord};

/// Partition images into clusters by Hamming distance to a seed.
///
/// Clusters with a single member are dropped.
pub fn cluster_images(images: Vec<ImageRecord>, threshold: u32) -> Vec<ImageCluster> {
    cluster_by(images, threshold, ImageRecord::distance_to)
}

/// Greedy partition with an arbitrary distance function.
pub fn cluster_by<F>(images: Vec<ImageRecord>, threshold: u32, distance: F) -> Vec<ImageCluster>
where
    F: Fn(&ImageRecord, &ImageRecord) -> u32,
{
    let mut working = images;
    let mut clusters = Vec::new();

    while !working.is_empty() {
        let seed = working.remove(0);
        let mut cluster = ImageCluster::with_seed(seed.path.clone());
        let mut remaining = Vec::with_capacity(working.len());

        for candidate in working {
            let d = distance(&seed, &candidate);
            if d <= threshold {
                cluster.push(candidate.path, d);
            } else {
                remaining.push(candidate);
            }
        }

        working = remaining;
        if cluster.len() > 1 {
            clusters.push(cluster);
        }
    }

    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};

    fn image(name: &str, hash: u64) -> ImageRecord {
        ImageRecord::new(format!("/{name}"), 1, hash)
    }

    fn names(cluster: &ImageCluster) -> Vec<(String, u32)> {
        cluster
            .members
            .iter()
            .map(|m| (m.path.display().to_string(), m.distance))
            .collect()
    }

    /// Fixed pairwise distances between four named images.
    fn table_distance(a: &ImageRecord, b: &ImageRecord) -> u32 {
        let (a, b) = (a.path.to_str().unwrap(), b.path.to_str().unwrap());
        match (a.min(b), a.max(b)) {
            ("/A", "/B") => 2,
            ("/A", "/C") => 4,
            ("/A", "/D") => 9,
            ("/B", "/C") => 6,
            ("/B", "/D") => 10,
            ("/C", "/D") => 3,
            (x, y) => panic!("no distance for {x} and {y}"),
        }
    }

    #[test]
    fn test_seed_order_decides_membership() {
        let images = ["A", "B", "C", "D"].iter().map(|n| image(n, 0)).collect();
        let clusters = cluster_by(images, 5, table_distance);

        assert_eq!(clusters.len(), 1);
        assert_eq!(
            names(&clusters[0]),
            vec![("/A".to_string(), 0), ("/B".to_string(), 2), ("/C".to_string(), 4)]
        );
    }

    #[test]
    fn test_hamming_threshold_inclusive() {
        let images = vec![
            image("seed", 0),
            image("five", 0b11111),
            image("six", 0b111111),
        ];
        let clusters = cluster_images(images, 5);
        assert_eq!(clusters.len(), 1);
        assert_eq!(
            clusters[0].paths(),
            vec![PathBuf::from("/seed"), PathBuf::from("/five")]
        );
    }

    #[test]
    fn test_each_image_in_at_most_one_cluster() {
        let images = vec![
            image("a", 0),
            image("b", 0b1),
            image("c", u64::MAX),
            image("d", u64::MAX ^ 0b1),
            image("e", 0xF0F0_F0F0_0000_0000),
        ];
        let clusters = cluster_images(images, 5);
        assert_eq!(clusters.len(), 2);

        let mut seen: Vec<PathBuf> = clusters.iter().flat_map(ImageCluster::paths).collect();
        let total = seen.len();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), total);
        assert!(!seen.iter().any(|p| p == Path::new("/e")));
    }

    #[test]
    fn test_not_transitive() {
        // a-b = 3, b-c = 3, a-c = 6: a seeds, takes b, leaves c alone
        let images = vec![image("a", 0), image("b", 0b111), image("c", 0b111111)];
        let clusters = cluster_images(images, 5);
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters[0].len(), 2);
        assert_eq!(clusters[0].seed(), Some(Path::new("/a")));
    }

    #[test]
    fn test_members_within_threshold_of_seed() {
        let images: Vec<_> = (0..40u64).map(|i| image(&i.to_string(), i * 0x0101)).collect();
        let hashes: HashMap<PathBuf, u64> = images
            .iter()
            .map(|r| (r.path.clone(), r.perceptual_hash))
            .collect();

        for cluster in cluster_images(images, 5) {
            let seed = hashes[cluster.seed().unwrap()];
            for member in &cluster.members {
                let d = (hashes[&member.path] ^ seed).count_ones();
                assert!(d <= 5);
                assert_eq!(d, member.distance);
            }
        }
    }

    #[test]
    fn test_lone_images_discarded() {
        assert!(cluster_images(vec![image("only", 7)], 5).is_empty());
        assert!(cluster_images(Vec::new(), 5).is_empty());
    }
}
