//! rubric-extract - scanned rubric form extractor
//!
//! Usage:
//!   rubric-extract extract <PDF>... -o <DIR>   Score rubric pages into results.csv
//!   rubric-extract text <PDF>...               Plain OCR text as JSON
//!   rubric-extract health                      Check for tesseract and pdftoppm

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rubric_cli::export::{self, RESULTS_FILE};
use rubric_cli::HealthReport;
use rubric_core::{ExtractorConfig, Rasterizer, Recognizer, ResolvedTools, ToolConfig};
use rubric_omr::{
    read_text_layers, ArtifactDir, BatchExtractor, Document, PagePipeline, TextExtractor,
};
use rubric_render::PdftoppmRasterizer;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "rubric-extract", version, about = "Extract scores from scanned rubric forms")]
struct Cli {
    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ./.rubric.toml when present)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score rubric pages and write results.csv plus images/
    Extract {
        /// PDF documents to process
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Directory for results.csv and images/
        #[arg(short, long, default_value = "rubric-output")]
        output_dir: PathBuf,
        /// Also package the results as a zip file
        #[arg(long, value_name = "FILE")]
        bundle: Option<PathBuf>,
        /// Rasterization resolution
        #[arg(long)]
        dpi: Option<u32>,
        /// Worker threads (default: all cores)
        #[arg(long)]
        workers: Option<usize>,
        /// Reject pages that take longer than this many seconds
        #[arg(long, value_name = "SECS")]
        page_timeout: Option<u64>,
        /// Save binarized and line-stripped copies of every page
        #[arg(long)]
        debug_images: bool,
    },
    /// Print the OCR text of each document as JSON
    Text {
        /// PDF documents to read
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Worker threads (default: all cores)
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Report whether the external tools are installed
    Health,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ExtractorConfig::discover(cli.config.as_deref())
        .context("Failed to load configuration")?;

    match cli.command {
        Commands::Extract {
            inputs,
            output_dir,
            bundle,
            dpi,
            workers,
            page_timeout,
            debug_images,
        } => {
            let mut config = config;
            if let Some(dpi) = dpi {
                config.tools.dpi = dpi;
            }
            if workers.is_some() {
                config.pipeline.workers = workers;
            }
            if page_timeout.is_some() {
                config.pipeline.page_timeout_secs = page_timeout;
            }
            config.pipeline.debug_images |= debug_images;
            cmd_extract(&config, &inputs, &output_dir, bundle.as_deref())
        }
        Commands::Text { inputs, workers } => {
            let mut config = config;
            if workers.is_some() {
                config.pipeline.workers = workers;
            }
            cmd_text(&config, &inputs)
        }
        Commands::Health => cmd_health(&config.tools),
    }
}

fn read_documents(inputs: &[PathBuf]) -> Result<Vec<Document>> {
    inputs
        .iter()
        .map(|path| {
            Document::from_path(path).with_context(|| format!("Failed to read {}", path.display()))
        })
        .collect()
}

#[cfg(not(feature = "embedded"))]
fn recognizer(tools: &ResolvedTools, config: &ToolConfig) -> Result<Arc<dyn Recognizer>> {
    Ok(Arc::new(rubric_ocr::TesseractCli::from_config(
        tools.tesseract.clone(),
        config,
    )))
}

#[cfg(feature = "embedded")]
fn recognizer(_tools: &ResolvedTools, config: &ToolConfig) -> Result<Arc<dyn Recognizer>> {
    let embedded = rubric_ocr::EmbeddedTesseract::new(config.language.clone())
        .context("Failed to initialize Tesseract")?;
    Ok(Arc::new(embedded))
}

fn collaborators(
    tools: ResolvedTools,
    config: &ToolConfig,
) -> Result<(Arc<dyn Rasterizer>, Arc<dyn Recognizer>)> {
    info!(
        "Using {} and {}",
        tools.tesseract.display(),
        tools.pdftoppm.display()
    );
    let rasterizer: Arc<dyn Rasterizer> =
        Arc::new(PdftoppmRasterizer::new(tools.pdftoppm.clone()));
    Ok((rasterizer, recognizer(&tools, config)?))
}

fn cmd_extract(
    config: &ExtractorConfig,
    inputs: &[PathBuf],
    output_dir: &Path,
    bundle: Option<&Path>,
) -> Result<()> {
    let (rasterizer, recognizer) = collaborators(config.tools.resolve()?, &config.tools)?;
    let documents = read_documents(inputs)?;

    let artifacts = ArtifactDir::create(output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;
    let pipeline = PagePipeline::new(
        recognizer,
        Arc::new(config.layout.clone()),
        artifacts.clone(),
    )
    .with_debug_images(config.pipeline.debug_images);
    let extractor = BatchExtractor::new(rasterizer, pipeline, config.tools.dpi, &config.pipeline)?;

    let report = extractor.run(&documents)?;
    for doc in report.documents.iter().filter(|d| d.error.is_some()) {
        warn!(
            "Skipped {}: {}",
            doc.filename,
            doc.error.as_deref().unwrap_or_default()
        );
    }

    let results = output_dir.join(RESULTS_FILE);
    let rows = export::write_results(&results, report.pages())?;
    println!("Wrote {rows} row(s) to {}", results.display());

    if let Some(bundle) = bundle {
        export::write_bundle(output_dir, &artifacts.saved(), bundle)?;
        println!("Bundled results into {}", bundle.display());
    }
    Ok(())
}

fn cmd_text(config: &ExtractorConfig, inputs: &[PathBuf]) -> Result<()> {
    let documents = read_documents(inputs)?;
    let ocr = config
        .tools
        .resolve()
        .map_err(anyhow::Error::from)
        .and_then(|tools| collaborators(tools, &config.tools));
    let results = match ocr {
        Ok((rasterizer, recognizer)) => {
            TextExtractor::new(rasterizer, recognizer, &config.tools, &config.pipeline)?
                .run(&documents)
        }
        Err(e) => {
            warn!("OCR unavailable ({e}), reading the PDF text layer only");
            read_text_layers(&documents)
        }
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&serde_json::json!({ "results": results }))?
    );
    Ok(())
}

fn cmd_health(tools: &ToolConfig) -> Result<()> {
    let report = HealthReport::from(tools.health());
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
