use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use jobmatch_engine::ingest::{ImportFilters, IngestService};
use jobmatch_engine::matching::MatchingEngine;
use jobmatch_engine::store::Database;
use jobmatch_engine::tasks::{
    BeatScheduler, TaskContext, TaskKind, TaskQueue, TaskRequest, Worker, WorkerConfig,
};
use jobmatch_engine::{parse_description, AppConfig, HhClient};
use jobmatch_http::{AppState, HttpServerConfig};

#[derive(Parser)]
#[command(name = "jobmatch")]
#[command(about = "Job-matching engine: ingestion, scoring and recommendations", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the REST API server
    ///
    /// Examples:
    ///   jobmatch serve
    ///   jobmatch serve --host 0.0.0.0 --port 8000
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value = "8000")]
        port: u16,
    },

    /// Run task workers
    ///
    /// Each worker claims one task at a time; parallelism comes from the
    /// worker count, never from concurrency inside a task.
    Worker {
        /// Number of parallel workers
        #[arg(short, long, default_value = "2")]
        workers: usize,
    },

    /// Run the beat scheduler (periodic saved-search syncs)
    Beat,

    /// Run server, workers and beat in one process (development mode)
    Run {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to listen on
        #[arg(short, long, default_value = "8000")]
        port: u16,

        /// Number of parallel workers
        #[arg(short, long, default_value = "2")]
        workers: usize,
    },

    /// One-shot vacancy import from the job board
    ///
    /// Examples:
    ///   jobmatch import --text "python backend" --pages 2
    ///   jobmatch import --text "rust" --area 1 --no-details
    Import {
        /// Search text
        #[arg(short, long)]
        text: String,

        /// Area id
        #[arg(long)]
        area: Option<String>,

        /// Pages to fetch
        #[arg(long, default_value = "3")]
        pages: u32,

        /// Items per page
        #[arg(long, default_value = "20")]
        per_page: u32,

        /// Skip the per-vacancy details request
        #[arg(long)]
        no_details: bool,
    },

    /// Sync one saved search immediately
    Sync {
        /// Saved search id
        id: i64,
    },

    /// Compute recommendations for a profile and print the top results
    Recommend {
        /// Profile id
        profile_id: i64,

        /// Maximum vacancies to score
        #[arg(short, long, default_value = "50")]
        limit: usize,
    },

    /// Backfill a legacy profile: normalized rows, embedding, recommendations
    Backfill {
        /// Profile id
        profile_id: i64,
    },

    /// Parse an HTML description file and print sections as JSON
    Parse {
        /// Path to an HTML file
        path: std::path::PathBuf,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}

fn spawn_workers(
    db: &Database,
    config: &Arc<AppConfig>,
    count: usize,
) -> Vec<tokio::task::JoinHandle<()>> {
    (0..count)
        .map(|index| {
            let ctx = TaskContext::new(
                db.clone(),
                config.clone(),
                TaskQueue::new(db.clone()),
            );
            let worker = Worker::new(
                ctx,
                WorkerConfig {
                    worker_id: format!("worker-{index}"),
                    ..Default::default()
                },
            );
            tokio::spawn(async move { worker.run().await })
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = Arc::new(AppConfig::from_env()?);
    let db = Database::connect(&config.database_url).await?;

    match cli.command {
        Commands::Serve { host, port } => {
            let state = Arc::new(AppState::new(
                db,
                config,
                HttpServerConfig {
                    host,
                    port,
                    ..Default::default()
                },
            ));
            jobmatch_http::serve(state).await?;
        }

        Commands::Worker { workers } => {
            let handles = spawn_workers(&db, &config, workers);
            info!(workers, "workers running, press Ctrl-C to stop");
            tokio::signal::ctrl_c().await?;
            for handle in handles {
                handle.abort();
            }
        }

        Commands::Beat => {
            let beat = BeatScheduler::new(TaskQueue::new(db), &config.beat_cron())?;
            info!(cron = %config.beat_cron(), "beat running, press Ctrl-C to stop");
            tokio::select! {
                _ = beat.run() => {}
                _ = tokio::signal::ctrl_c() => {}
            }
        }

        Commands::Run {
            host,
            port,
            workers,
        } => {
            let worker_handles = spawn_workers(&db, &config, workers);
            let beat = BeatScheduler::new(TaskQueue::new(db.clone()), &config.beat_cron())?;
            let beat_handle = tokio::spawn(async move { beat.run().await });

            let state = Arc::new(AppState::new(
                db,
                config,
                HttpServerConfig {
                    host,
                    port,
                    ..Default::default()
                },
            ));
            jobmatch_http::serve(state).await?;

            beat_handle.abort();
            for handle in worker_handles {
                handle.abort();
            }
        }

        Commands::Import {
            text,
            area,
            pages,
            per_page,
            no_details,
        } => {
            let client = HhClient::new(&config.hh)?;
            let queue = TaskQueue::new(db.clone());
            let service = IngestService::new(db.clone(), client).with_queue(queue.clone());

            let filters = ImportFilters {
                text,
                area,
                pages_limit: pages,
                per_page,
                include_details: !no_details,
                ..Default::default()
            };
            let report = service.import(&filters, None, 0).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);

            // Build the embeddings that the import enqueued.
            let ctx = TaskContext::new(db.clone(), config.clone(), queue);
            let worker = Worker::new(ctx, WorkerConfig::default());
            let processed = worker.drain().await;
            info!(processed, "embedding tasks drained");
        }

        Commands::Sync { id } => {
            let search = db.require_saved_search(id).await?;
            let client = HhClient::new(&config.hh)?;
            let queue = TaskQueue::new(db.clone());
            let service = IngestService::new(db.clone(), client).with_queue(queue.clone());

            let report = service.sync_saved_search(&search).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);

            let ctx = TaskContext::new(db.clone(), config.clone(), queue);
            Worker::new(ctx, WorkerConfig::default()).drain().await;
        }

        Commands::Recommend { profile_id, limit } => {
            let engine = MatchingEngine::new(db, config.embedding.dimension);
            let scores = engine.compute_recommendations(profile_id, limit).await?;

            println!("scored {} vacancies", scores.len());
            for score in scores.iter().take(10) {
                println!(
                    "vacancy {:>6}  final {:.3}  verdict {}",
                    score.vacancy_id, score.final_score, score.verdict
                );
            }
        }

        Commands::Backfill { profile_id } => {
            let queue = TaskQueue::new(db.clone());
            let task_id = queue
                .enqueue(
                    TaskRequest::new(TaskKind::BackfillProfile { profile_id })
                        .then(TaskKind::BuildProfileEmbedding { profile_id })
                        .then(TaskKind::ComputeRecommendations {
                            profile_id,
                            limit: 50,
                        }),
                )
                .await?;
            info!(%task_id, "backfill chain enqueued");

            let ctx = TaskContext::new(db.clone(), config.clone(), queue.clone());
            let processed = Worker::new(ctx, WorkerConfig::default()).drain().await;
            println!("backfill chain finished, {processed} tasks processed");
        }

        Commands::Parse { path } => {
            let html = std::fs::read_to_string(&path)?;
            let parsed = parse_description(&html);
            println!("{}", serde_json::to_string_pretty(&parsed)?);
        }
    }

    Ok(())
}
