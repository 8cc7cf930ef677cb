use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};

use fnd_core::config::{DEFAULT_MODEL_PATH, DEFAULT_TRAINING_DATA_PATH, DEFAULT_VECTORIZER_PATH};
use fnd_core::ArticleRequest;
use fnd_inference::artifacts::{save_artifacts, ArtifactPaths, ArtifactStore};
use fnd_inference::dataset;
use fnd_inference::ocr::{OcrStatus, Resolution, TesseractLocator};
use fnd_inference::training::{train, TrainingConfig};
use fnd_inference::{ImagePipeline, ImageUpload, Predictor};
use fnd_web::{create_app, AppState};

mod logging;

#[derive(Parser, Debug)]
#[command(author, version, about = "Fake news detection service", long_about = None)]
pub struct Cli {
    /// Maximum log level (error, warn, info, debug, trace)
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    log_level: Level,
    #[command(flatten)]
    artifacts: ArtifactArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Clone)]
struct ArtifactArgs {
    /// Serialized classifier
    #[arg(long, env = "MODEL_PATH", default_value = DEFAULT_MODEL_PATH, global = true)]
    model_path: PathBuf,
    /// Serialized TF-IDF vectorizer
    #[arg(long, env = "VECTORIZER_PATH", default_value = DEFAULT_VECTORIZER_PATH, global = true)]
    vectorizer_path: PathBuf,
    /// Labeled CSV, used for training and to refit a missing vectorizer
    #[arg(long, env = "TRAINING_DATA_PATH", default_value = DEFAULT_TRAINING_DATA_PATH, global = true)]
    training_data_path: PathBuf,
}

impl ArtifactArgs {
    fn paths(&self) -> ArtifactPaths {
        ArtifactPaths {
            model: self.model_path.clone(),
            vectorizer: self.vectorizer_path.clone(),
            training_data: Some(self.training_data_path.clone()),
        }
    }
}

#[derive(Args, Debug, Clone)]
struct OcrArgs {
    /// Explicit path to the tesseract executable
    #[arg(long, env = "TESSERACT_CMD")]
    tesseract_cmd: Option<PathBuf>,
    /// Tesseract language pack
    #[arg(long, default_value = "eng")]
    ocr_language: String,
}

impl OcrArgs {
    async fn resolve(&self) -> Resolution {
        TesseractLocator::new(self.tesseract_cmd.clone()).resolve().await
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the HTTP API
    Serve {
        #[arg(long, env = "HOST", default_value = "0.0.0.0")]
        host: String,
        #[arg(long, env = "PORT", default_value_t = 5000)]
        port: u16,
        /// Comma-separated allowed origins, `*` for any
        #[arg(long, env = "CORS_ORIGINS", default_value = "*")]
        cors_origins: String,
        #[command(flatten)]
        ocr: OcrArgs,
    },
    /// Classify one article
    Predict {
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        text: String,
    },
    /// Extract text from an image and classify it
    PredictImage {
        file: PathBuf,
        #[command(flatten)]
        ocr: OcrArgs,
    },
    /// Report how the tesseract executable was resolved
    CheckOcr {
        #[command(flatten)]
        ocr: OcrArgs,
    },
    /// Fit the vectorizer and classifier from a labeled CSV and save both
    Train {
        /// Defaults to the configured training data path
        #[arg(long)]
        dataset: Option<PathBuf>,
        #[arg(long, default_value_t = 0.2)]
        test_size: f64,
        #[arg(long, default_value_t = 20)]
        seed: u64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.log_level);
    let paths = cli.artifacts.paths();

    match cli.command {
        Commands::Serve {
            host,
            port,
            cors_origins,
            ocr,
        } => {
            let store = Arc::new(load_store(&paths).await?);
            let resolution = ocr.resolve().await;
            let state = AppState::new(store, paths, resolution, &ocr.ocr_language);
            info!("📷 Image analysis enabled: {}", state.image_support());

            let origins: Vec<String> = cors_origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect();
            let app = create_app(state, &origins).await;

            let addr: SocketAddr = format!("{}:{}", host, port)
                .parse()
                .with_context(|| format!("invalid bind address {}:{}", host, port))?;
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("cannot bind {}", addr))?;
            info!("🚀 Fake news detection API listening on {}", addr);
            axum_serve(listener, app).await?;
        }
        Commands::Predict { title, text } => {
            let predictor = Predictor::new(Arc::new(load_store(&paths).await?));
            let result = predictor.predict_one(ArticleRequest {
                title,
                text: Some(text),
            })?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::PredictImage { file, ocr } => {
            let predictor = Predictor::new(Arc::new(load_store(&paths).await?));
            let resolution = ocr.resolve().await;
            let pipeline =
                ImagePipeline::from_capability(predictor, &resolution.capability, &ocr.ocr_language);
            let bytes = tokio::fs::read(&file)
                .await
                .with_context(|| format!("cannot read {}", file.display()))?;
            let filename = file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let prediction = pipeline.process(ImageUpload { filename, bytes }).await?;
            println!("{}", serde_json::to_string_pretty(&prediction)?);
        }
        Commands::CheckOcr { ocr } => {
            let status = OcrStatus::from(&ocr.resolve().await);
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
        Commands::Train {
            dataset,
            test_size,
            seed,
        } => {
            let dataset = dataset.unwrap_or_else(|| cli.artifacts.training_data_path.clone());
            info!("📚 Reading labeled articles from {}", dataset.display());
            let samples = dataset::read_labeled(&dataset)?;
            let config = TrainingConfig {
                test_size,
                seed,
                ..TrainingConfig::default()
            };
            let model = tokio::task::spawn_blocking(move || train(&samples, &config))
                .await
                .context("training task failed")??;
            save_artifacts(&paths, &model.vectorizer, &model.classifier)?;

            let report = &model.report;
            println!("Accuracy: {:.2}%", report.accuracy * 100.0);
            println!(
                "Samples: {} train / {} test, vocabulary {}",
                report.training_samples, report.test_samples, report.vocabulary_size
            );
            println!("Confusion matrix (rows actual, columns predicted; FAKE, REAL):");
            for row in report.confusion {
                println!("  {:>6} {:>6}", row[0], row[1]);
            }
        }
    }

    Ok(())
}

async fn load_store(paths: &ArtifactPaths) -> anyhow::Result<ArtifactStore> {
    let paths = paths.clone();
    tokio::task::spawn_blocking(move || ArtifactStore::load(&paths))
        .await
        .context("artifact loading task failed")
}

async fn axum_serve(listener: tokio::net::TcpListener, app: axum::Router) -> anyhow::Result<()> {
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down");
        })
        .await
        .context("server failed")
}
