use std::collections::VecDeque;

use image::{ImageBuffer, Rgb, RgbImage};
use superpixel_saliency::{
    analyze_frame, default_config, enforce_connectivity, perform_slic, plan_seeds, segment, Config, Error, LabImage,
    MotionField, Segmentation, SuperpixelTarget,
};

fn config_with(target: SuperpixelTarget, threads: usize) -> Config {
    let mut cfg = default_config(false);
    cfg.target = target;
    cfg.num_threads = threads;
    cfg
}

fn textured_image(w: u32, h: u32) -> RgbImage {
    ImageBuffer::from_fn(w, h, |x, y| {
        Rgb([
            ((x * 37 + y * 11) % 256) as u8,
            ((x * x + y * 53) % 256) as u8,
            ((x * y * 7 + 19) % 256) as u8,
        ])
    })
}

/// Every label in range and used, never more labels than seeds, each label a single
/// 4-connected component above the fold size.
fn assert_well_formed(seg: &Segmentation) {
    let (w, h) = (seg.width, seg.height);
    assert_eq!(seg.labels.len(), w * h);
    assert!(seg.num_labels >= 1 && seg.num_labels <= seg.seeds.len(), "{} labels for {} seeds", seg.num_labels, seg.seeds.len());
    let mut sizes = vec![0usize; seg.num_labels];
    for &l in &seg.labels {
        assert!(l >= 0 && (l as usize) < seg.num_labels, "label {} out of range", l);
        sizes[l as usize] += 1;
    }
    assert!(sizes.iter().all(|&s| s > 0), "unused label in {:?}", sizes);
    assert_eq!(sizes.iter().sum::<usize>(), w * h);
    if seg.num_labels > 1 {
        let min_size = (w * h / (w * h / (seg.step * seg.step)).max(1)) >> 2;
        assert!(sizes.iter().all(|&s| s > min_size), "fragment at or below {} pixels in {:?}", min_size, sizes);
    }

    let mut seen = vec![false; w * h];
    let mut components = 0;
    for start in 0..w * h {
        if seen[start] {
            continue;
        }
        components += 1;
        seen[start] = true;
        let mut queue = VecDeque::from([start]);
        while let Some(i) = queue.pop_front() {
            let (x, y) = (i % w, i / w);
            let mut neighbors = Vec::new();
            if x > 0 { neighbors.push(i - 1); }
            if x + 1 < w { neighbors.push(i + 1); }
            if y > 0 { neighbors.push(i - w); }
            if y + 1 < h { neighbors.push(i + w); }
            for n in neighbors {
                if !seen[n] && seg.labels[n] == seg.labels[i] {
                    seen[n] = true;
                    queue.push_back(n);
                }
            }
        }
    }
    assert_eq!(components, seg.num_labels, "some label is split into several components");
}

#[test]
fn uniform_image_splits_into_grid_cells() {
    let img: RgbImage = ImageBuffer::from_fn(8, 8, |_x, _y| Rgb([120, 60, 200]));
    let seg = segment(&img, &config_with(SuperpixelTarget::Count(4), 1)).expect("segment");
    assert_eq!(seg.step, 4);
    assert_eq!(seg.seeds.len(), 4);
    assert_eq!(seg.num_labels, 4);
    assert_well_formed(&seg);

    let motion = MotionField::zeros(8, 8).expect("motion field");
    let analysis = analyze_frame(&img, &motion, &config_with(SuperpixelTarget::Count(4), 1)).expect("analysis");
    assert!(analysis.regions.iter().all(|r| !r.coherent));
    assert!(analysis.clusters.clusters.is_empty());
    assert!(analysis.clusters.assignments.iter().all(|&a| a == -1));
}

#[test]
fn red_blue_image_follows_the_color_boundary() {
    // 8 wide so that K = 2 gives step 4 and two seeds along x.
    let img: RgbImage = ImageBuffer::from_fn(8, 4, |x, _y| if x < 4 { Rgb([255, 0, 0]) } else { Rgb([0, 0, 255]) });
    let seg = segment(&img, &config_with(SuperpixelTarget::Count(2), 1)).expect("segment");
    assert_eq!(seg.seeds.len(), 2);
    assert_eq!(seg.num_labels, 2);
    assert_well_formed(&seg);
    let left = seg.label_at(0, 0);
    let right = seg.label_at(7, 3);
    assert_ne!(left, right);
    for y in 0..4 {
        for x in 0..8 {
            let expected = if x < 4 { left } else { right };
            assert_eq!(seg.label_at(x, y), expected, "pixel ({}, {})", x, y);
        }
    }
}

#[test]
fn red_blue_square_with_two_requested_gets_one_seed() {
    // 4x4 with K = 2: step round(sqrt(8)) = 3 leaves room for a single seed.
    let img: RgbImage = ImageBuffer::from_fn(4, 4, |x, _y| if x < 2 { Rgb([255, 0, 0]) } else { Rgb([0, 0, 255]) });
    let seg = segment(&img, &config_with(SuperpixelTarget::Count(2), 1)).expect("segment");
    assert_eq!(seg.step, 3);
    assert_eq!(seg.seeds.len(), 1);
    assert_eq!(seg.num_labels, 1);
    assert!(seg.labels.iter().all(|&l| l == 0));
}

/// Columns: B B B R R B R R R B B B, seeds at x = 2, 6, 10. The red seed owns two
/// strips split by a blue column.
fn striped_image() -> RgbImage {
    const PATTERN: [bool; 12] = [false, false, false, true, true, false, true, true, true, false, false, false];
    ImageBuffer::from_fn(12, 4, |x, _y| if PATTERN[x as usize] { Rgb([255, 0, 0]) } else { Rgb([0, 0, 255]) })
}

#[test]
fn split_seed_region_does_not_add_labels() {
    let img = striped_image();
    let mut cfg = config_with(SuperpixelTarget::Count(3), 1);
    cfg.compactness = 0.01;

    let lab = LabImage::from_rgb(&img).expect("lab conversion");
    let mut seeds = plan_seeds(&lab, 4);
    assert_eq!(seeds.len(), 3);
    let raw = perform_slic(&lab, &mut seeds, 4, cfg.compactness, 1).expect("slic");
    let raw_row: Vec<i32> = raw[..12].to_vec();
    assert_eq!(raw_row, vec![0, 0, 0, 1, 1, 0, 1, 1, 1, 2, 2, 2]);

    let seg = segment(&img, &cfg).expect("segment");
    assert_eq!(seg.num_labels, 3);
    for y in 0..4 {
        let row: Vec<i32> = (0..12).map(|x| seg.label_at(x, y)).collect();
        assert_eq!(row, vec![0, 0, 0, 1, 1, 1, 1, 1, 1, 2, 2, 2]);
    }
    assert_well_formed(&seg);
}

#[test]
fn slic_rejects_seed_ids_out_of_range() {
    let img = textured_image(8, 8);
    let lab = LabImage::from_rgb(&img).expect("lab conversion");
    let mut seeds = plan_seeds(&lab, 4);
    seeds[1].id = 9;
    assert!(matches!(perform_slic(&lab, &mut seeds, 4, 10.0, 1), Err(Error::InvalidArgument(_))));
}

#[test]
fn labels_do_not_depend_on_thread_count() {
    let img = textured_image(40, 30);
    let single = segment(&img, &config_with(SuperpixelTarget::Count(12), 1)).expect("segment");
    for threads in [2, 3, 8, 64] {
        let multi = segment(&img, &config_with(SuperpixelTarget::Count(12), threads)).expect("segment");
        assert_eq!(single.labels, multi.labels, "threads = {}", threads);
        assert_eq!(single.num_labels, multi.num_labels);
    }
}

#[test]
fn textured_image_yields_connected_labels() {
    let img = textured_image(37, 23);
    let mut cfg = config_with(SuperpixelTarget::Count(20), 2);
    cfg.perturb_seeds = true;
    let seg = segment(&img, &cfg).expect("segment");
    assert!(seg.num_labels >= 1);
    assert_well_formed(&seg);

    let seg = segment(&img, &config_with(SuperpixelTarget::Size(30), 1)).expect("segment");
    assert_well_formed(&seg);
}

#[test]
fn more_superpixels_than_pixels_still_segments() {
    let img = textured_image(3, 2);
    let seg = segment(&img, &config_with(SuperpixelTarget::Count(50), 1)).expect("segment");
    assert_eq!(seg.step, 1);
    assert_well_formed(&seg);
}

#[test]
fn invalid_configuration_is_rejected() {
    let img = textured_image(8, 8);
    let err = segment(&img, &config_with(SuperpixelTarget::Count(0), 1)).unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));

    let mut cfg = default_config(false);
    cfg.compactness = 0.0;
    assert!(matches!(segment(&img, &cfg), Err(Error::InvalidArgument(_))));
    cfg.compactness = f64::NAN;
    assert!(matches!(segment(&img, &cfg), Err(Error::InvalidArgument(_))));
}

#[test]
fn motion_field_must_match_the_image() {
    let img = textured_image(8, 8);
    let motion = MotionField::zeros(8, 7).expect("motion field");
    let err = analyze_frame(&img, &motion, &config_with(SuperpixelTarget::Count(4), 1)).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected_width: 8, expected_height: 8, width: 8, height: 7 }));
}

#[test]
fn full_frame_analysis_is_consistent() {
    let img = textured_image(24, 16);
    let mut motion = MotionField::zeros(24, 16).expect("motion field");
    for y in 0..16 {
        for x in 0..12 {
            motion.set(x, y, [1.0, 0.5]);
        }
    }
    let analysis = analyze_frame(&img, &motion, &config_with(SuperpixelTarget::Count(6), 1)).expect("analysis");
    let seg = &analysis.segmentation;
    assert_eq!(analysis.regions.len(), seg.num_labels);
    assert_eq!(analysis.regions.iter().map(|r| r.size).sum::<usize>(), 24 * 16);
    assert_eq!(analysis.clusters.assignments.len(), analysis.regions.len());
    for (r, &a) in analysis.regions.iter().zip(&analysis.clusters.assignments) {
        assert_eq!(r.coherent, a >= 0);
        assert_eq!(r.cluster.map_or(-1, |c| c as i32), a);
    }
    assert_eq!(analysis.saliency.saliency.len(), 24 * 16);
    assert!(analysis.saliency.saliency.iter().all(|v| (0.0..=1.0).contains(v)));
}

#[test]
fn connectivity_folds_small_fragments() {
    // A 1-pixel island of label 1 inside label 0.
    let mut labels = vec![0i32; 16];
    labels[5] = 1;
    let (relabeled, n) = enforce_connectivity(&labels, 4, 4, 1).expect("connectivity");
    assert_eq!(n, 1);
    assert!(relabeled.iter().all(|&l| l == 0));

    // A second large piece of raw label 0 joins its neighbor instead of opening a label.
    let labels = vec![0, 1, 0, 0, 1, 0, 0, 1, 0];
    let (relabeled, n) = enforce_connectivity(&labels, 3, 3, 9).expect("connectivity");
    assert_eq!(n, 2);
    assert_eq!(relabeled, vec![0, 1, 1, 0, 1, 1, 0, 1, 1]);
}

#[test]
fn connectivity_never_opens_labels_for_unassigned_pixels() {
    let labels = vec![0, 0, -1, -1, 0, 0, -1, -1];
    let (relabeled, n) = enforce_connectivity(&labels, 4, 2, 8).expect("connectivity");
    assert_eq!(n, 1);
    assert!(relabeled.iter().all(|&l| l == 0));
}

#[test]
fn connectivity_reports_one_label_when_everything_folds() {
    let labels: Vec<i32> = (0..16).collect();
    let (relabeled, n) = enforce_connectivity(&labels, 4, 4, 2).expect("connectivity");
    assert_eq!(n, 1);
    assert!(relabeled.iter().all(|&l| l == 0));
}
