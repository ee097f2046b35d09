// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Tree queries checked against brute-force scans

use anyhow::Result;
use approx::assert_relative_eq;
use polyframe_mesh::geometry::shapes;
use polyframe_mesh::spatial::TreeStats;
use polyframe_mesh::{BvhConfig, BvhTree, Coords, KdTree, Mesh, Primitive, SplitPolicy};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;

const POLICIES: [SplitPolicy; 2] = [SplitPolicy::Midpoint, SplitPolicy::Median];

fn random_points(rng: &mut StdRng, n: usize) -> Vec<Coords> {
    (0..n)
        .map(|_| Coords::from_fn(3, |_, _| rng.gen_range(-1.0..1.0)))
        .collect()
}

fn brute_force(points: &[Coords], x: &Coords) -> Vec<(usize, f64)> {
    let mut all: Vec<(usize, f64)> = points
        .iter()
        .enumerate()
        .map(|(i, p)| (i, (p - x).norm_squared()))
        .collect();
    all.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    all
}

#[test]
fn test_knn_matches_brute_force() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(42);
    for n in [10, 1000] {
        let points = random_points(&mut rng, n);
        let queries = random_points(&mut rng, 20);
        for split in POLICIES {
            for leaf_size in [1, 8] {
                let config = BvhConfig::new(leaf_size, split);
                let tree = KdTree::from_points(points.clone(), config)?;
                for x in &queries {
                    let expected = brute_force(&points, x);
                    for k in [1, 5, n] {
                        let found = tree.query(x, k)?;
                        assert_eq!(found.len(), k.min(n));
                        for (hit, &(id, d)) in found.iter().zip(&expected) {
                            assert_eq!(hit.id, id, "n={} k={} {} leaf={}", n, k, split, leaf_size);
                            assert_relative_eq!(hit.dist_sqrd, d, epsilon = 1e-12);
                        }
                    }
                }
            }
        }
    }
    Ok(())
}

#[test]
fn test_range_matches_brute_force() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(7);
    let points = random_points(&mut rng, 500);
    for split in POLICIES {
        let tree = KdTree::from_points(points.clone(), BvhConfig::new(4, split))?;
        for _ in 0..50 {
            let x = Coords::from_fn(3, |_, _| rng.gen_range(-1.5..1.5));
            let r: f64 = rng.gen_range(0.0..0.8);

            let mut expected: Vec<usize> = brute_force(&points, &x)
                .into_iter()
                .filter(|&(_, d)| d <= r * r)
                .map(|(i, _)| i)
                .collect();
            let found = tree.range_query(&x, r)?;
            assert!(found.windows(2).all(|w| w[0].dist_sqrd <= w[1].dist_sqrd));

            let mut ids: Vec<usize> = found.iter().map(|hit| hit.id).collect();
            ids.sort_unstable();
            expected.sort_unstable();
            assert_eq!(ids, expected);
        }
    }
    Ok(())
}

#[test]
fn test_triangle_tree_on_sphere() -> Result<()> {
    let shape = shapes::icosphere(1.0, 2);
    let mesh = Mesh::new(shape.vertices, shape.faces)?;
    let tree = BvhTree::from_triangle_mesh(&mesh, BvhConfig::default())?;
    assert_eq!(tree.len(), mesh.num_faces());

    let mut rng = StdRng::seed_from_u64(3);
    for x in random_points(&mut rng, 25) {
        let best = tree.project(&x)?.expect("tree is not empty");
        let brute = tree
            .items()
            .iter()
            .map(|t| t.dist_sqrd(&x))
            .fold(f64::INFINITY, f64::min);
        assert_relative_eq!(best.dist_sqrd, brute, epsilon = 1e-12);
        assert_relative_eq!((&best.point - &x).norm_squared(), best.dist_sqrd, epsilon = 1e-12);
    }

    let stats: TreeStats = tree.stats();
    assert_eq!(stats.item_count, 320);
    assert!(stats.max_leaf_items <= BvhConfig::default().leaf_size);
    Ok(())
}

#[test]
fn test_config_round_trip() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("bvh.toml");

    let config = BvhConfig::new(3, SplitPolicy::Midpoint);
    config.save(&path)?;
    assert_eq!(BvhConfig::from_file(&path)?, config);

    std::fs::write(&path, "split = \"mean\"\n")?;
    let partial = BvhConfig::from_file(&path)?;
    assert_eq!(partial.split, SplitPolicy::Midpoint);
    assert_eq!(partial.leaf_size, BvhConfig::default().leaf_size);

    std::fs::write(&path, "leaf_size = 0\n")?;
    assert!(BvhConfig::from_file(&path).is_err());
    Ok(())
}
