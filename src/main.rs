use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use rust_loop_eval::config::PipelineConfig;
use rust_loop_eval::detection::prepare;

#[derive(Parser)]
#[command(name = "loop-eval")]
#[command(about = "Prepare and validate loop-closure evaluation runs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check every precondition of a run and print what would be evaluated.
    Check(RunArgs),

    /// Compute root-SIFT features for every image and write the corpus files.
    #[cfg(feature = "opencv")]
    ExportCorpus(RunArgs),
}

#[derive(Debug, Clone, Args)]
struct RunArgs {
    /// Run configuration (YAML).
    #[arg(long)]
    config: PathBuf,

    /// Override the image list.
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Override the corpus directory.
    #[arg(long)]
    corpus: Option<PathBuf>,

    /// Override the image directory.
    #[arg(long)]
    images: Option<PathBuf>,

    /// Override the pose file.
    #[arg(long)]
    poses: Option<PathBuf>,
}

impl RunArgs {
    fn load_config(&self) -> Result<PipelineConfig> {
        info!("Loading configuration from {:?}", self.config);
        let mut config = PipelineConfig::load(&self.config)
            .with_context(|| format!("Invalid configuration {}", self.config.display()))?;
        if let Some(p) = &self.manifest {
            config.manifest_path = p.clone();
        }
        if let Some(p) = &self.corpus {
            config.corpus_directory = p.clone();
        }
        if let Some(p) = &self.images {
            config.image_directory = p.clone();
        }
        if let Some(p) = &self.poses {
            config.pose_path = Some(p.clone());
        }
        Ok(config)
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("rust_loop_eval=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Check(args) => check(&args.load_config()?),
        #[cfg(feature = "opencv")]
        Commands::ExportCorpus(args) => export_corpus(&args.load_config()?),
    }
}

fn check(config: &PipelineConfig) -> Result<()> {
    let prepared = prepare(config)?;

    println!("Run is ready");
    println!(" - Vocabulary: {}", config.vocabulary_path.display());
    println!(" - Database: {}", config.database_path.display());
    println!(
        " - Manifest: {} images ({})",
        prepared.manifest.len(),
        config.manifest_path.display()
    );
    println!(
        " - Corpus: {} images, {} descriptors ({})",
        prepared.corpus.len(),
        prepared.corpus.total_features(),
        config.corpus_directory.display()
    );
    println!(
        " - Queries: {} images ({})",
        prepared.query_images.len(),
        config.image_directory.display()
    );
    if config.pose_path.is_some() {
        println!(" - Poses: {}", prepared.poses.len());
    }
    println!(
        " - Detector: use_nss={} alpha={} k={} geom={:?} di_levels={} image={}x{}",
        config.detector.use_nss,
        config.detector.alpha,
        config.detector.k,
        config.detector.geom_check,
        config.detector.di_levels,
        config.detector.image_cols,
        config.detector.image_rows
    );

    for (manifest_idx, corpus_idx) in prepared.mapping.iter() {
        tracing::debug!(
            "mapping[{}] = {} ({})",
            manifest_idx,
            corpus_idx,
            prepared.manifest[manifest_idx]
        );
    }

    Ok(())
}

#[cfg(feature = "opencv")]
fn export_corpus(config: &PipelineConfig) -> Result<()> {
    use rust_loop_eval::corpus::{write_descriptors, write_keypoints};
    use rust_loop_eval::detection::FeatureExtractor;
    use rust_loop_eval::extract::{SiftExtractor, sift::SiftParams};
    use rust_loop_eval::io::{ImageManifest, base_name};

    let manifest = ImageManifest::load(&config.manifest_path)?;
    std::fs::create_dir_all(&config.corpus_directory).with_context(|| {
        format!("Failed to create {}", config.corpus_directory.display())
    })?;

    let mut extractor = SiftExtractor::new(SiftParams::default())?;
    for (i, entry) in manifest.iter().enumerate() {
        let image = config.image_directory.join(entry);
        let features = extractor.extract(&image)?;
        let base = base_name(entry);
        write_keypoints(
            config.corpus_directory.join(format!("{base}.feat")),
            &features.keypoints,
        )?;
        write_descriptors(
            config.corpus_directory.join(format!("{base}.desc")),
            &features.descriptors,
        )?;
        info!("{}/{}: {} -> {} features", i + 1, manifest.len(), entry, features.num_features());
    }

    println!(
        "Wrote {} corpus entries to {}",
        manifest.len(),
        config.corpus_directory.display()
    );
    Ok(())
}
