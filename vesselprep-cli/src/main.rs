use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vesselprep::annotation::convert_annotations;
use vesselprep::io::load_gray_image;
use vesselprep::store::FsStore;
use vesselprep::{
    BatchRunner, CorrelatorConfig, MaskConfig, Normalizer, PipelineConfig, Template,
};

const EXAMPLE_JSON: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/config.example.json"));

#[derive(Parser, Debug)]
#[command(author, version, about = "Vessel dataset preparation (JSON config driven)")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(short, long, value_name = "FILE", default_value = "config.json", global = true)]
    config: PathBuf,
    /// Print an example config and exit.
    #[arg(long)]
    print_example: bool,
    /// Log per-stage debug events.
    #[arg(long, global = true)]
    trace: bool,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Locate, segment and center every photograph in `normalize.input_dir`.
    Normalize,
    /// Convert every annotation record in `masks.json_dir` into a mask.
    Masks,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct CorrelatorConfigJson {
    pyramid_levels: usize,
    refine_radius: usize,
    min_var_i: f64,
    parallel: bool,
}

impl Default for CorrelatorConfigJson {
    fn default() -> Self {
        let cfg = CorrelatorConfig::default();
        Self {
            pyramid_levels: cfg.pyramid_levels,
            refine_radius: cfg.refine_radius,
            min_var_i: cfg.min_var_i,
            parallel: cfg.parallel,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct NormalizeConfigJson {
    template_path: String,
    input_dir: String,
    output_dir: String,
    bowl_threshold: u8,
    dilation_radius: u8,
    min_area: f64,
    output_prefix: String,
    parallel_images: bool,
    correlator: CorrelatorConfigJson,
}

impl Default for NormalizeConfigJson {
    fn default() -> Self {
        let cfg = PipelineConfig::default();
        Self {
            template_path: String::new(),
            input_dir: String::new(),
            output_dir: String::new(),
            bowl_threshold: cfg.bowl_threshold,
            dilation_radius: cfg.dilation_radius,
            min_area: cfg.min_area,
            output_prefix: cfg.output_prefix,
            parallel_images: cfg.parallel_images,
            correlator: CorrelatorConfigJson::default(),
        }
    }
}

impl NormalizeConfigJson {
    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            bowl_threshold: self.bowl_threshold,
            dilation_radius: self.dilation_radius,
            min_area: self.min_area,
            output_prefix: self.output_prefix.clone(),
            parallel_images: self.parallel_images,
            correlator: CorrelatorConfig {
                pyramid_levels: self.correlator.pyramid_levels,
                refine_radius: self.correlator.refine_radius,
                min_var_i: self.correlator.min_var_i,
                parallel: self.correlator.parallel,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct MasksConfigJson {
    json_dir: String,
    mask_dir: String,
    worker_count: usize,
}

impl Default for MasksConfigJson {
    fn default() -> Self {
        Self {
            json_dir: String::new(),
            mask_dir: String::new(),
            worker_count: MaskConfig::default().worker_count,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Config {
    normalize: NormalizeConfigJson,
    masks: MasksConfigJson,
}

fn run_normalize(cfg: &NormalizeConfigJson) -> Result<(), Box<dyn std::error::Error>> {
    if cfg.template_path.is_empty() || cfg.input_dir.is_empty() || cfg.output_dir.is_empty() {
        return Err("normalize.template_path, input_dir and output_dir must be set".into());
    }

    let template_img = load_gray_image(&cfg.template_path)?;
    let template = Template::from_image(&template_img);
    let normalizer = Normalizer::new(&template, cfg.pipeline_config())?;
    let store = FsStore;
    let runner = BatchRunner::new(&store, &normalizer, &cfg.output_dir);

    info!(
        template = %cfg.template_path,
        width = template.width(),
        height = template.height(),
        "starting normalization"
    );
    let report = runner.run_dir(cfg.input_dir.as_ref())?;
    for item in &report.items {
        let file = item.source.display();
        match &item.outcome {
            Ok(done) => info!(
                file = %file,
                output = %done.output.display(),
                ms = done.elapsed.as_secs_f64() * 1000.0,
                "processing complete"
            ),
            Err(err) => warn!(file = %file, reason = %err, "processing failed, skipping save"),
        }
    }
    info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        "all images processed"
    );
    Ok(())
}

fn run_masks(cfg: &MasksConfigJson) -> Result<(), Box<dyn std::error::Error>> {
    if cfg.json_dir.is_empty() || cfg.mask_dir.is_empty() {
        return Err("masks.json_dir and masks.mask_dir must be set".into());
    }
    fs::create_dir_all(&cfg.mask_dir)?;

    let summary = convert_annotations(
        &FsStore,
        cfg.json_dir.as_ref(),
        cfg.mask_dir.as_ref(),
        &MaskConfig {
            worker_count: cfg.worker_count,
        },
    )?;
    info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        "all annotation files processed"
    );
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.trace { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("vesselprep={level}").parse()?)
                .add_directive(format!("vesselprep_cli={level}").parse()?),
        )
        .with_target(false)
        .init();

    if cli.print_example {
        println!("{EXAMPLE_JSON}");
        return Ok(());
    }
    let Some(command) = cli.command else {
        return Err("a subcommand is required: normalize or masks".into());
    };

    let config_text = fs::read_to_string(&cli.config)?;
    let config: Config = serde_json::from_str(&config_text)?;

    match command {
        Command::Normalize => run_normalize(&config.normalize),
        Command::Masks => run_masks(&config.masks),
    }
}
