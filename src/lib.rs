//! Superpixel segmentation and region aggregation for motion saliency.
//!
//! An RGB frame is partitioned into compact, connected superpixels (SLIC in
//! CIELAB followed by a connectivity pass). Each superpixel is summarized by its
//! color, opponent-color contrast and motion statistics, motion-coherent
//! superpixels are greedily grouped into clusters, and a neighborhood contrast
//! score turns the region table into saliency maps.
//!
//! ```no_run
//! use superpixel_saliency::{analyze_frame, default_config, MotionField};
//!
//! let frame = image::open("frame.png").unwrap().to_rgb8();
//! let motion = MotionField::zeros(frame.width() as usize, frame.height() as usize).unwrap();
//! let analysis = analyze_frame(&frame, &motion, &default_config(false)).unwrap();
//! println!("{} superpixels", analysis.segmentation.num_labels);
//! ```

pub mod clustering;
pub mod color;
pub mod connectivity;
pub mod error;
pub mod features;
pub mod io;
pub mod motion;
pub mod render;
pub mod saliency;
pub mod seeds;
pub mod slic;

use anyhow::Context;
use image::RgbImage;
use log::{info, warn};
use std::fs::File;
use std::io::BufWriter;
use std::time::Instant;

pub use clustering::{cluster_regions, ClusterRecord, ClusterTable, DEFAULT_MERGE_THRESHOLD};
pub use color::{rgb_to_lab, LabImage, Vec3};
pub use connectivity::enforce_connectivity;
pub use error::{Error, Result};
pub use features::{aggregate_regions, CoherenceThresholds, RegionRecord};
pub use motion::MotionField;
pub use saliency::{saliency_maps, SaliencyMaps, DEFAULT_NEIGHBORS};
pub use seeds::{perturb_seeds, plan_seeds, step_size, Seed, SuperpixelTarget};
pub use slic::{perform_slic, SLIC_ITERATIONS};

pub const DEFAULT_SUPERPIXELS: usize = 3000;
pub const DEFAULT_COMPACTNESS: f64 = 10.0;

#[derive(Debug, Clone)]
pub struct Config {
    pub target: SuperpixelTarget,
    /// Spatial weight m; larger values give more regular superpixels.
    pub compactness: f64,
    pub perturb_seeds: bool,
    /// Worker threads for the SLIC assignment pass.
    pub num_threads: usize,
    pub coherence: CoherenceThresholds,
    pub merge_threshold: f64,
    pub saliency_neighbors: usize,
}

/// Reference settings. The fast preset spreads the assignment pass over all cores;
/// results are identical either way.
pub fn default_config(fast: bool) -> Config {
    Config {
        target: SuperpixelTarget::Count(DEFAULT_SUPERPIXELS),
        compactness: DEFAULT_COMPACTNESS,
        perturb_seeds: false,
        num_threads: if fast { num_cpus::get().max(1) } else { 1 },
        coherence: CoherenceThresholds::default(),
        merge_threshold: DEFAULT_MERGE_THRESHOLD,
        saliency_neighbors: DEFAULT_NEIGHBORS,
    }
}

impl Default for Config {
    fn default() -> Self { default_config(false) }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        match self.target {
            SuperpixelTarget::Count(0) => return Err(Error::InvalidArgument("superpixel count must be positive".into())),
            SuperpixelTarget::Size(0) => return Err(Error::InvalidArgument("superpixel size must be positive".into())),
            _ => {}
        }
        if !(self.compactness.is_finite() && self.compactness > 0.0) {
            return Err(Error::InvalidArgument(format!("compactness must be positive, got {}", self.compactness)));
        }
        if !self.merge_threshold.is_finite() {
            return Err(Error::InvalidArgument(format!("merge threshold must be finite, got {}", self.merge_threshold)));
        }
        if !(self.coherence.max_dispersion.is_finite() && self.coherence.min_coverage.is_finite()) {
            return Err(Error::InvalidArgument("coherence thresholds must be finite".into()));
        }
        Ok(())
    }
}

/// Output of the segmentation stage.
#[derive(Clone, Debug)]
pub struct Segmentation {
    pub width: usize,
    pub height: usize,
    /// Final labels in `[0, num_labels)`, row-major.
    pub labels: Vec<i32>,
    pub num_labels: usize,
    /// Grid step the seeds were laid out with.
    pub step: usize,
    /// Seeds at their final centroids.
    pub seeds: Vec<Seed>,
}

impl Segmentation {
    pub fn label_at(&self, x: usize, y: usize) -> i32 { self.labels[y * self.width + x] }
}

/// Runs color conversion, seeding, SLIC and connectivity enforcement.
pub fn segment(image: &RgbImage, config: &Config) -> Result<Segmentation> {
    config.validate()?;
    let (width, height) = (image.width() as usize, image.height() as usize);
    let sz = error::check_dimensions(width, height)?;
    let step = step_size(width, height, config.target)?;

    let (raw_labels, seeds) = {
        let lab = LabImage::from_rgb(image)?;
        let mut seeds = plan_seeds(&lab, step);
        if config.perturb_seeds {
            let edges = lab.detect_edges()?;
            perturb_seeds(&mut seeds, &lab, &edges)?;
        }
        let raw = perform_slic(&lab, &mut seeds, step, config.compactness, config.num_threads)?;
        (raw, seeds)
    };

    let k = (sz as f64 / (step * step) as f64) as usize;
    let (labels, num_labels) = enforce_connectivity(&raw_labels, width, height, k)?;
    drop(raw_labels);
    info!("Segmented {}x{} into {} superpixels ({} seeds, step {})", width, height, num_labels, seeds.len(), step);

    Ok(Segmentation { width, height, labels, num_labels, step, seeds })
}

/// Everything computed for one frame.
#[derive(Clone, Debug)]
pub struct FrameAnalysis {
    pub segmentation: Segmentation,
    pub regions: Vec<RegionRecord>,
    pub clusters: ClusterTable,
    pub saliency: SaliencyMaps,
}

/// Full per-frame pipeline: segmentation, region features, clustering and saliency.
pub fn analyze_frame(image: &RgbImage, motion: &MotionField, config: &Config) -> Result<FrameAnalysis> {
    let (width, height) = (image.width() as usize, image.height() as usize);
    error::check_dimensions(width, height)?;
    motion.check_matches(width, height)?;

    let segmentation = segment(image, config)?;
    let mut regions = aggregate_regions(&segmentation.labels, segmentation.num_labels, image, motion, &config.coherence)?;
    let clusters = cluster_regions(&mut regions, config.merge_threshold);
    let saliency = saliency_maps(&segmentation.labels, width, height, &regions, config.saliency_neighbors)?;
    info!(
        "Regions: {} ({} coherent), clusters: {}",
        regions.len(),
        regions.iter().filter(|r| r.coherent).count(),
        clusters.clusters.len()
    );
    Ok(FrameAnalysis { segmentation, regions, clusters, saliency })
}

/// File-level job description for [`process`].
#[derive(Debug, Clone)]
pub struct Params {
    pub in_image_name: String,
    pub motion_name: Option<String>,
    pub labels_out: Option<String>,
    pub regions_csv: Option<String>,
    pub clusters_csv: Option<String>,
    pub contours_out: Option<String>,
    pub clusters_out: Option<String>,
    pub saliency_out: Option<String>,
    pub config: Config,
}

/// Loads the inputs named in `params`, analyzes the frame and writes every requested output.
pub fn process(params: Params) -> anyhow::Result<FrameAnalysis> {
    let start = Instant::now();
    info!("Input image: {}", params.in_image_name);
    let frame = image::open(&params.in_image_name)
        .with_context(|| format!("failed to read image {}", params.in_image_name))?
        .to_rgb8();
    let (w, h) = (frame.width() as usize, frame.height() as usize);

    let motion = match &params.motion_name {
        Some(path) => {
            info!("Motion field: {}", path);
            MotionField::load(path, w, h).with_context(|| format!("failed to read motion field {}", path))?
        }
        None => {
            warn!("No motion field given; every region will be classified non-coherent");
            MotionField::zeros(w, h)?
        }
    };

    let analysis = analyze_frame(&frame, &motion, &params.config)?;
    let labels = &analysis.segmentation.labels;

    if let Some(path) = &params.labels_out {
        io::save_labels(path, labels).with_context(|| format!("failed to write labels {}", path))?;
        info!("Labels saved: {}", path);
    }
    if let Some(path) = &params.regions_csv {
        let file = File::create(path).with_context(|| format!("failed to create {}", path))?;
        io::write_region_csv(BufWriter::new(file), &analysis.regions)?;
        info!("Region table saved: {}", path);
    }
    if let Some(path) = &params.clusters_csv {
        let file = File::create(path).with_context(|| format!("failed to create {}", path))?;
        io::write_cluster_csv(BufWriter::new(file), &analysis.clusters)?;
        info!("Cluster table saved: {}", path);
    }
    if let Some(path) = &params.contours_out {
        let mut overlay = frame.clone();
        render::draw_contours(&mut overlay, labels)?;
        overlay.save(path).with_context(|| format!("failed to write {}", path))?;
        info!("Contour overlay saved: {}", path);
    }
    if let Some(path) = &params.clusters_out {
        render::render_clusters(&frame, labels, &analysis.regions)?
            .save(path)
            .with_context(|| format!("failed to write {}", path))?;
        info!("Cluster rendering saved: {}", path);
    }
    if let Some(path) = &params.saliency_out {
        render::map_to_gray(&analysis.saliency.saliency, frame.width(), frame.height())?
            .save(path)
            .with_context(|| format!("failed to write {}", path))?;
        info!("Saliency map saved: {}", path);
    }

    info!("Done in {} ms", start.elapsed().as_millis());
    Ok(analysis)
}
