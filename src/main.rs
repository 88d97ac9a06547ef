// file: src/main.rs
// description: commandline application entry point with command handling
// reference: application bootstrap and orchestration

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use diagram_harvest::utils::logging::{
    format_error, format_info, format_step, format_success, format_warning,
};
use diagram_harvest::{
    AppsScriptClient, Config, DiagramCollector, FirestoreClient, GcsClient, HealthCheck,
    HealthReport, HealthStatus, ImageObject, IndexStore, JsonExporter, ManifestBuilder,
    ManifestKind, ObjectStore, ParseController, TextIndexer, Validator, VertexClient,
    VisionClient,
};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "diagram_harvest")]
#[command(author = "cipher")]
#[command(version = "0.1.0")]
#[command(about = "Architecture diagram harvesting and indexing over Google Cloud", long_about = None)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config/default.toml"
    )]
    config: PathBuf,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    color: bool,

    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ManifestTarget {
    /// JSONL manifest for dataset import
    Dataset,
    /// JSONL manifest for batch prediction input
    Batch,
}

impl From<ManifestTarget> for ManifestKind {
    fn from(target: ManifestTarget) -> Self {
        match target {
            ManifestTarget::Dataset => ManifestKind::Dataset,
            ManifestTarget::Batch => ManifestKind::BatchPrediction,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    Manifest {
        #[arg(long, value_enum, default_value = "dataset")]
        kind: ManifestTarget,

        #[arg(short, long, value_name = "OBJECT")]
        output: Option<String>,
    },

    CreateDataset {
        #[arg(long)]
        display_name: Option<String>,

        #[arg(long, value_name = "GS_URI")]
        manifest: Option<String>,
    },

    BatchPredict {
        #[arg(long)]
        display_name: Option<String>,

        #[arg(long)]
        model: Option<String>,

        #[arg(long, value_name = "GS_URI")]
        source: Option<String>,

        #[arg(long, value_name = "GS_URI")]
        destination: Option<String>,
    },

    /// Classify one stored image against the online endpoint
    Classify {
        /// Object name under the corpus bucket
        object: String,
    },

    Collect,

    Index,

    TopWords {
        #[arg(short = 'n', long, value_name = "NUM")]
        count: Option<usize>,
    },

    Export {
        #[arg(short, long, default_value = "./exports")]
        output: PathBuf,

        #[arg(short, long)]
        pretty: bool,
    },

    Verify,

    /// Drive the remote document parser until it reports completion
    ParseDocs {
        #[arg(long, value_name = "NUM")]
        max_attempts: Option<u32>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    diagram_harvest::utils::logging::init_logger(cli.color, cli.verbose);

    info!("Diagram Harvest Pipeline");
    info!("Loading configuration from: {}", cli.config.display());

    let config = if cli.config.exists() {
        Config::load(Some(cli.config.as_path())).context("Failed to load configuration")?
    } else {
        warn!(
            "Config file {} not found, using default configuration",
            cli.config.display()
        );
        Config::load(None).unwrap_or_else(|e| {
            warn!("Falling back to built-in defaults: {}", e);
            Config::default_config()
        })
    };

    match cli.command {
        Commands::Manifest { kind, output } => {
            cmd_manifest(&config, kind.into(), output.as_deref()).await?;
        }
        Commands::CreateDataset {
            display_name,
            manifest,
        } => {
            cmd_create_dataset(&config, display_name, manifest).await?;
        }
        Commands::BatchPredict {
            display_name,
            model,
            source,
            destination,
        } => {
            cmd_batch_predict(&config, display_name, model, source, destination).await?;
        }
        Commands::Classify { object } => {
            cmd_classify(&config, &object).await?;
        }
        Commands::Collect => {
            cmd_collect(&config).await?;
        }
        Commands::Index => {
            cmd_index(&config, cli.color).await?;
        }
        Commands::TopWords { count } => {
            cmd_top_words(&config, count).await?;
        }
        Commands::Export { output, pretty } => {
            cmd_export(&config, output, pretty).await?;
        }
        Commands::Verify => {
            cmd_verify(&config).await?;
        }
        Commands::ParseDocs { max_attempts } => {
            cmd_parse_docs(&config, max_attempts).await?;
        }
    }

    Ok(())
}

fn firestore_client(config: &Config, token: String) -> FirestoreClient {
    FirestoreClient::new(
        token,
        config.project.clone(),
        config.index.collection.clone(),
        config.index.word_document.clone(),
        config.index.image_document.clone(),
    )
}

async fn cmd_manifest(config: &Config, kind: ManifestKind, output: Option<&str>) -> Result<()> {
    info!("Building corpus manifest");

    let token = config.require_token()?;
    let store = GcsClient::new(token);

    let builder = ManifestBuilder::new(&store, &config.storage);
    let summary = builder
        .build(kind, output)
        .await
        .context("Manifest build failed")?;

    println!(
        "{}",
        format_success(&format!(
            "Wrote {} ({} entries)",
            summary.uri, summary.entries
        ))
    );

    Ok(())
}

async fn cmd_create_dataset(
    config: &Config,
    display_name: Option<String>,
    manifest: Option<String>,
) -> Result<()> {
    info!("Creating image classification dataset");

    let token = config.require_token()?;
    let store = GcsClient::new(token.clone());

    let manifest_uri = match manifest {
        Some(uri) => {
            println!("{}", format_step(1, 2, &format!("Using manifest {}", uri)));
            uri
        }
        None => {
            println!("{}", format_step(1, 2, "Uploading dataset manifest"));
            let builder = ManifestBuilder::new(&store, &config.storage);
            builder
                .build(ManifestKind::Dataset, None)
                .await
                .context("Manifest build failed")?
                .uri
        }
    };

    let display_name = display_name
        .unwrap_or_else(|| format!("diagram_dataset_{}", Uuid::new_v4().simple()));
    Validator::validate_display_name(&display_name)?;

    println!(
        "{}",
        format_step(2, 2, &format!("Creating and importing {}", display_name))
    );

    let vertex = VertexClient::new(token, config.project.clone(), config.vertex.clone());
    let dataset = vertex
        .create_image_dataset(&display_name, &manifest_uri)
        .await
        .context("Dataset creation failed")?;

    println!("{}", format_success(&format!("Dataset {} ready", dataset)));

    Ok(())
}

async fn cmd_batch_predict(
    config: &Config,
    display_name: Option<String>,
    model: Option<String>,
    source: Option<String>,
    destination: Option<String>,
) -> Result<()> {
    info!("Submitting batch classification job");

    let token = config.require_token()?;

    let mut vertex_config = config.vertex.clone();
    if model.is_some() {
        vertex_config.model = model;
    }

    let store = GcsClient::new(token.clone());
    let source_uri = match source {
        Some(uri) => uri,
        None => {
            info!("No source manifest given, building one from the corpus");
            let builder = ManifestBuilder::new(&store, &config.storage);
            builder
                .build(ManifestKind::BatchPrediction, None)
                .await
                .context("Manifest build failed")?
                .uri
        }
    };

    let destination = destination.unwrap_or_else(|| {
        format!(
            "gs://{}/{}",
            config.storage.bucket,
            config.storage.predictions_prefix.trim_end_matches('/')
        )
    });

    let display_name =
        display_name.unwrap_or_else(|| format!("diagram_batch_{}", Uuid::new_v4().simple()));
    Validator::validate_display_name(&display_name)?;

    let vertex = VertexClient::new(token, config.project.clone(), vertex_config);
    let job = vertex
        .run_batch_prediction(&display_name, &source_uri, &destination)
        .await
        .context("Batch prediction failed")?;

    println!("{}", format_success(&format!("Batch job {} finished", job)));
    println!(
        "{}",
        format_info(&format!(
            "Prediction files land under {}; run `collect` next",
            destination
        ))
    );

    Ok(())
}

async fn cmd_classify(config: &Config, object: &str) -> Result<()> {
    Validator::validate_object_name(object)?;

    let token = config.require_token()?;
    let store = GcsClient::new(token.clone());

    let image = ImageObject::new(&config.storage.bucket, object);
    info!("Classifying {}", image.gcs_uri());

    let data = store
        .download(&image)
        .await
        .context("Image download failed")?;

    let vertex = VertexClient::new(token, config.project.clone(), config.vertex.clone());
    let prediction = vertex
        .classify(&data)
        .await
        .context("Online prediction failed")?;

    if let Some(model_id) = &prediction.deployed_model_id {
        info!("Served by deployed model {}", model_id);
    }

    if prediction.classifications.is_empty() {
        println!(
            "{}",
            format_warning("No labels returned above the confidence threshold")
        );
        return Ok(());
    }

    println!("\nPredictions for {}\n", image.gcs_uri());
    for classification in &prediction.classifications {
        println!("  {:<24} {:.4}", classification.label, classification.confidence);
    }

    Ok(())
}

async fn cmd_collect(config: &Config) -> Result<()> {
    info!("Collecting classified diagrams");

    let token = config.require_token()?;
    let store = GcsClient::new(token);

    let collector = DiagramCollector::new(&store, &config.storage);
    let stats = collector.run().await.context("Diagram collection failed")?;

    println!(
        "{}",
        format_success(&format!(
            "Copied {} diagrams out of {} prediction records",
            stats.diagrams_copied, stats.records_scanned
        ))
    );

    if stats.copy_failures > 0 || stats.malformed_records > 0 || stats.error_records > 0 {
        println!(
            "{}",
            format_warning(&format!(
                "{} copy failures, {} malformed records, {} prediction errors",
                stats.copy_failures, stats.malformed_records, stats.error_records
            ))
        );
    }

    Ok(())
}

async fn cmd_index(config: &Config, colored: bool) -> Result<()> {
    info!("Indexing diagram text");
    let start_time = Instant::now();

    let token = config.require_token()?;
    let store = GcsClient::new(token.clone());
    let detector = VisionClient::new(token.clone());
    let index_store = firestore_client(config, token);

    let indexer = TextIndexer::new(
        &store,
        &detector,
        &index_store,
        &config.storage,
        &config.index,
    );
    let stats = indexer.run(colored).await.context("Indexing failed")?;

    let elapsed = start_time.elapsed();
    info!("Indexing complete in {:.2}s", elapsed.as_secs_f64());

    println!(
        "{}",
        format_success(&format!("Indexed {} diagrams", stats.images_processed))
    );
    println!(
        "{}",
        format_info(&format!(
            "{} words recorded ({:.1} images/s)",
            stats.words_indexed,
            stats.images_per_second()
        ))
    );

    if stats.images_failed > 0 || stats.persist_failures > 0 {
        println!(
            "{}",
            format_warning(&format!(
                "{} OCR failures, {} persistence failures ({:.0}% success)",
                stats.images_failed,
                stats.persist_failures,
                stats.success_rate()
            ))
        );
    }

    Ok(())
}

async fn cmd_top_words(config: &Config, count: Option<usize>) -> Result<()> {
    let token = config.require_token()?;
    let index_store = firestore_client(config, token);

    let index = index_store
        .load()
        .await
        .context("Failed to load the index")?;

    if index.is_empty() {
        println!(
            "{}",
            format_warning("The index is empty; run the index command first")
        );
        return Ok(());
    }

    let top = index.top_words(count.unwrap_or(config.index.top_words));

    if top.is_empty() {
        println!(
            "{}",
            format_info("No indexed word is longer than two characters")
        );
    } else {
        println!("\nTop {} words by image count\n", top.len());
        for entry in &top {
            println!("  {:<32} {}", entry.word, entry.images);
        }
    }

    println!("\nTotal words: {}", index.word_count());
    println!("Total images: {}", index.image_count());

    Ok(())
}

async fn cmd_export(config: &Config, output: PathBuf, pretty: bool) -> Result<()> {
    info!("Initializing JSON export");

    let token = config.require_token()?;
    let index_store = firestore_client(config, token);

    let index = index_store
        .load()
        .await
        .context("Failed to load the index")?;

    let exporter = JsonExporter::new(output)?;
    let manifest = exporter.export_index(&index, pretty)?;

    info!("Export complete: {} files generated", manifest.files.len());
    println!(
        "{}",
        format_success(&format!(
            "Exported {} words and {} images",
            manifest.total_words, manifest.total_images
        ))
    );

    Ok(())
}

async fn cmd_verify(config: &Config) -> Result<()> {
    info!("Verifying service connectivity and index consistency");

    let token = config.require_token()?;
    let store = GcsClient::new(token.clone());
    let firestore = firestore_client(config, token);

    let mut checks = Vec::new();

    let started = Instant::now();
    match store
        .list_objects(&config.storage.bucket, &config.storage.images_prefix)
        .await
    {
        Ok(objects) => {
            info!(
                "Object store reachable ({} objects under {})",
                objects.len(),
                config.storage.images_prefix
            );
            checks.push(HealthCheck::healthy("object store", started.elapsed()));
        }
        Err(e) => {
            error!("Cannot list the image corpus: {}", e);
            checks.push(HealthCheck::unhealthy(
                "object store",
                e.to_string(),
                started.elapsed(),
            ));
        }
    }

    let started = Instant::now();
    let index = match firestore.load().await {
        Ok(index) => {
            info!(
                "Document store reachable ({} words, {} images)",
                index.word_count(),
                index.image_count()
            );
            checks.push(HealthCheck::healthy("document store", started.elapsed()));
            Some(index)
        }
        Err(e) => {
            error!("Cannot load the index: {}", e);
            checks.push(HealthCheck::unhealthy(
                "document store",
                e.to_string(),
                started.elapsed(),
            ));
            None
        }
    };

    if let Some(index) = &index {
        let started = Instant::now();
        let report = index.check_consistency();
        let elapsed = started.elapsed();

        if !report.is_consistent() {
            checks.push(HealthCheck::unhealthy(
                "index consistency",
                format!(
                    "{} image words missing from the word map",
                    report.missing_in_word_map.len()
                ),
                elapsed,
            ));
        } else if !report.missing_in_image_map.is_empty() {
            checks.push(HealthCheck::degraded(
                "index consistency",
                format!(
                    "{} stale word entries point at re-indexed images",
                    report.missing_in_image_map.len()
                ),
                elapsed,
            ));
        } else {
            checks.push(HealthCheck::healthy("index consistency", elapsed));
        }
    }

    let report = HealthReport::new(checks, env!("CARGO_PKG_VERSION").to_string());
    println!("\n{}", report.format());

    if report.overall_status == HealthStatus::Unhealthy {
        println!("{}", format_error("One or more checks failed"));
        return Err(anyhow::anyhow!("Verification failed"));
    }

    Ok(())
}

async fn cmd_parse_docs(config: &Config, max_attempts: Option<u32>) -> Result<()> {
    info!("Driving the remote document parser");

    if config.script.script_id.is_empty() {
        error!("No script configured. Set script.script_id first");
        return Err(anyhow::anyhow!("script.script_id is not configured"));
    }

    let token = config.require_token()?;

    let mut script_config = config.script.clone();
    if let Some(max_attempts) = max_attempts {
        script_config.poll.max_attempts = max_attempts;
        script_config.poll.validate()?;
    }

    let runner = AppsScriptClient::new(token, script_config.clone())?;
    let controller = ParseController::new(&runner, &script_config);

    let summary = controller
        .run_to_completion()
        .await
        .context("Parser did not report completion")?;

    println!(
        "{}",
        format_success(&format!(
            "Parser reported completion after {} attempts",
            summary.attempts
        ))
    );

    if summary.script_errors > 0 || summary.transport_errors > 0 {
        println!(
            "{}",
            format_warning(&format!(
                "{} script errors, {} transport errors along the way",
                summary.script_errors, summary.transport_errors
            ))
        );
    }

    Ok(())
}
