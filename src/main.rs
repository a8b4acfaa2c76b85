// CLI entry for superpixel_saliency
use anyhow::{bail, Result};
use clap::{ArgAction, Parser, ValueHint};
use superpixel_saliency::{default_config, process, Config, Params, SuperpixelTarget};

#[derive(Parser, Debug)]
#[command(name = "superpixel_saliency", version, about = "SLIC superpixels, coherent-motion clustering and saliency")]
struct Cli {
    /// Fast preset (multi-threaded assignment)
    #[arg(short = 'f', long = "fast", action = ArgAction::SetTrue)]
    fast: bool,

    /// Desired number of superpixels
    #[arg(short = 'k', long = "count", conflicts_with = "size")]
    count: Option<usize>,
    /// Desired superpixel size in pixels
    #[arg(long = "size")]
    size: Option<usize>,
    /// Compactness weight m
    #[arg(short = 'm', long = "compactness")]
    compactness: Option<f64>,
    /// Move seeds to the lowest color gradient in their 3x3 neighborhood
    #[arg(long = "perturb", action = ArgAction::SetTrue)]
    perturb: bool,
    /// Number of threads
    #[arg(long = "threads")]
    threads: Option<usize>,

    /// Motion dispersion threshold for coherence
    #[arg(long = "max-dispersion")]
    max_dispersion: Option<f64>,
    /// Minimum share of pixels with motion for coherence
    #[arg(long = "min-coverage")]
    min_coverage: Option<f64>,
    /// Cluster merge threshold
    #[arg(long = "merge-threshold")]
    merge_threshold: Option<f64>,
    /// Neighbors used by the contrast score
    #[arg(long = "neighbors")]
    neighbors: Option<usize>,

    /// Motion field (.flo, or raw little-endian f32 pairs)
    #[arg(long = "motion", value_hint = ValueHint::FilePath)]
    motion: Option<String>,
    /// Binary label map output
    #[arg(long = "labels-out", value_hint = ValueHint::FilePath)]
    labels_out: Option<String>,
    /// Region table CSV output
    #[arg(long = "regions-csv", value_hint = ValueHint::FilePath)]
    regions_csv: Option<String>,
    /// Cluster table CSV output
    #[arg(long = "clusters-csv", value_hint = ValueHint::FilePath)]
    clusters_csv: Option<String>,
    /// Superpixel contour overlay output
    #[arg(long = "contours-out", value_hint = ValueHint::FilePath)]
    contours_out: Option<String>,
    /// Cluster rendering output
    #[arg(long = "clusters-out", value_hint = ValueHint::FilePath)]
    clusters_out: Option<String>,
    /// Saliency map output
    #[arg(long = "saliency-out", value_hint = ValueHint::FilePath)]
    saliency_out: Option<String>,

    /// Input image path
    #[arg(value_hint = ValueHint::FilePath)]
    input: String,
}

fn build_config(cli: &Cli) -> Result<Config> {
    let mut cfg = default_config(cli.fast);
    if let Some(v) = cli.count { cfg.target = SuperpixelTarget::Count(v); }
    if let Some(v) = cli.size { cfg.target = SuperpixelTarget::Size(v); }
    if let Some(v) = cli.compactness { cfg.compactness = v; }
    if cli.perturb { cfg.perturb_seeds = true; }
    if let Some(v) = cli.threads { cfg.num_threads = v.max(1); }
    if let Some(v) = cli.max_dispersion { cfg.coherence.max_dispersion = v; }
    if let Some(v) = cli.min_coverage { cfg.coherence.min_coverage = v; }
    if let Some(v) = cli.merge_threshold { cfg.merge_threshold = v; }
    if let Some(v) = cli.neighbors { cfg.saliency_neighbors = v; }
    if let Err(e) = cfg.validate() {
        bail!("invalid configuration: {}", e);
    }
    Ok(cfg)
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let cfg = build_config(&cli)?;
    let params = Params {
        in_image_name: cli.input,
        motion_name: cli.motion,
        labels_out: cli.labels_out,
        regions_csv: cli.regions_csv,
        clusters_csv: cli.clusters_csv,
        contours_out: cli.contours_out,
        clusters_out: cli.clusters_out,
        saliency_out: cli.saliency_out,
        config: cfg,
    };
    process(params)?;
    Ok(())
}
