use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use bytes::Bytes;
use clap::{Parser, Subcommand};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

use tailor::config::{Config, S3Config};
use tailor::db::{create_pool, ensure_schema};
use tailor::document::{DocumentTextIndex, LinkAnnotation, Rect};
use tailor::llm_client::{self, LlmClient};
use tailor::matching::{
    build_keyword_index, score_posting_relevance, AtsScorer, FallbackScorer, LlmAtsScorer,
    OverlapScorer, ScoreBreakdown,
};
use tailor::models::{JobPosting, Profile};
use tailor::optimizer::{
    ArtifactStore, DocumentBucket, InMemoryArtifactStore, Orchestrator, PgArtifactStore,
};
use tailor::suggestions::{
    LlmSuggestionGenerator, ReplacementCandidate, StaticSuggestionGenerator, SuggestionGenerator,
};

#[derive(Debug, Parser)]
#[command(name = "tailor", version, about = "Tailor a résumé PDF to a job posting")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, clap::Args)]
struct JobArgs {
    /// File holding the job description.
    #[arg(long)]
    job: PathBuf,
    #[arg(long, default_value = "")]
    title: String,
    #[arg(long, default_value = "")]
    company: String,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Score a résumé (PDF or plain text) against a job description.
    Score {
        #[arg(long)]
        resume: PathBuf,
        #[command(flatten)]
        job: JobArgs,
        /// Declared skills, comma separated.
        #[arg(long, value_delimiter = ',')]
        skills: Vec<String>,
    },
    /// Print the visible text runs and links of a PDF as JSON.
    Inspect {
        pdf: PathBuf,
        /// Only print plain text per page.
        #[arg(long)]
        text: bool,
    },
    /// Optimize a résumé PDF for a job and write the edited PDF.
    Optimize {
        #[arg(long)]
        resume: PathBuf,
        #[command(flatten)]
        job: JobArgs,
        #[arg(long, value_delimiter = ',')]
        skills: Vec<String>,
        /// JSON array of replacements to use instead of the LLM generator.
        #[arg(long)]
        replacements: Option<PathBuf>,
        /// Where to write the optimized PDF.
        #[arg(long)]
        out: PathBuf,
        #[arg(long)]
        user_id: Option<Uuid>,
        #[arg(long)]
        job_id: Option<Uuid>,
        /// Seed for the score boost policy.
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;

    // Initialize structured logging; stdout is reserved for command output.
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting tailor v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Score { resume, job, skills } => score(&config, &resume, &job, skills).await,
        Command::Inspect { pdf, text } => inspect(&pdf, text).await,
        Command::Optimize {
            resume,
            job,
            skills,
            replacements,
            out,
            user_id,
            job_id,
            seed,
        } => {
            let profile = load_profile(&resume, skills).await?;
            let posting = load_job(&job).await?;
            let orchestrator = build_orchestrator(&config, replacements.as_deref()).await?;

            let mut rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            };
            let outcome = orchestrator
                .optimize(
                    user_id.unwrap_or_else(Uuid::new_v4),
                    job_id.unwrap_or_else(Uuid::new_v4),
                    &profile,
                    &posting,
                    &mut rng,
                )
                .await?;

            match &outcome.artifact.optimized_document {
                Some(document) => {
                    write_atomically(&out, document)?;
                    info!("Wrote optimized PDF to {}", out.display());
                }
                None => {
                    let text_out = out.with_extension("txt");
                    write_atomically(&text_out, outcome.artifact.optimized_text.as_bytes())?;
                    info!("No editable PDF, wrote optimized text to {}", text_out.display());
                }
            }

            print_json(&outcome.artifact)
        }
    }
}

async fn score(config: &Config, resume: &Path, job: &JobArgs, skills: Vec<String>) -> Result<()> {
    #[derive(Serialize)]
    struct ScoreOutput {
        relevance: u32,
        keywords: Vec<String>,
        breakdown: ScoreBreakdown,
    }

    let profile = load_profile(resume, skills).await?;
    let posting = load_job(job).await?;
    let keywords = build_keyword_index(&profile);
    let relevance = score_posting_relevance(&posting.title, &posting.description, &keywords);

    let breakdown = build_scorer(config)
        .score(&profile.raw_text, &posting, &profile.skills)
        .await?;

    print_json(&ScoreOutput {
        relevance,
        keywords,
        breakdown,
    })
}

async fn inspect(pdf: &Path, text_only: bool) -> Result<()> {
    #[derive(Serialize)]
    struct RunOutput<'a> {
        text: &'a str,
        bbox: Rect,
        font: &'a str,
        size: f32,
    }

    #[derive(Serialize)]
    struct PageOutput<'a> {
        page: usize,
        runs: Vec<RunOutput<'a>>,
    }

    #[derive(Serialize)]
    struct InspectOutput<'a> {
        page_count: usize,
        pages: Vec<PageOutput<'a>>,
        links: &'a [LinkAnnotation],
    }

    let bytes = tokio::fs::read(pdf)
        .await
        .with_context(|| format!("Failed to read {}", pdf.display()))?;
    let index = tokio::task::spawn_blocking(move || DocumentTextIndex::parse(&bytes)).await??;

    if text_only {
        for page in 0..index.page_count() {
            println!("--- page {} ---\n{}", page + 1, index.page_text(page));
        }
        return Ok(());
    }

    let pages = (0..index.page_count())
        .map(|page| PageOutput {
            page,
            runs: index
                .runs(page)
                .iter()
                .map(|run| RunOutput {
                    text: &run.text,
                    bbox: run.bbox,
                    font: &run.font_name,
                    size: run.font_size,
                })
                .collect(),
        })
        .collect();

    print_json(&InspectOutput {
        page_count: index.page_count(),
        pages,
        links: index.links(),
    })
}

async fn load_profile(path: &Path, skills: Vec<String>) -> Result<Profile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read résumé {}", path.display()))?;

    if bytes.starts_with(b"%PDF") {
        let document = Bytes::from(bytes);
        let profile =
            tokio::task::spawn_blocking(move || Profile::from_document(document, skills, vec![]))
                .await??;
        Ok(profile)
    } else {
        let text = String::from_utf8(bytes).context("Résumé is neither a PDF nor UTF-8 text")?;
        Ok(Profile::new(text, skills, vec![], None))
    }
}

async fn load_job(args: &JobArgs) -> Result<JobPosting> {
    let description = tokio::fs::read_to_string(&args.job)
        .await
        .with_context(|| format!("Failed to read job description {}", args.job.display()))?;
    Ok(JobPosting::new(&args.title, &args.company, description))
}

fn build_scorer(config: &Config) -> Arc<dyn AtsScorer> {
    match LlmClient::from_config(config) {
        Some(llm) => Arc::new(FallbackScorer::new(Arc::new(LlmAtsScorer(llm)))),
        None => Arc::new(OverlapScorer),
    }
}

async fn build_orchestrator(config: &Config, replacements: Option<&Path>) -> Result<Orchestrator> {
    let generator: Arc<dyn SuggestionGenerator> = match (replacements, LlmClient::from_config(config)) {
        (Some(path), _) => {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read replacements {}", path.display()))?;
            let candidates: Vec<ReplacementCandidate> =
                serde_json::from_str(&raw).context("Replacements must be a JSON array")?;
            Arc::new(StaticSuggestionGenerator::new(candidates))
        }
        (None, Some(llm)) => {
            info!("LLM suggestions enabled (model: {})", llm_client::MODEL);
            Arc::new(LlmSuggestionGenerator::new(llm))
        }
        (None, None) => {
            info!("No ANTHROPIC_API_KEY and no replacements file; résumé will only be scored");
            Arc::new(StaticSuggestionGenerator::default())
        }
    };

    let artifacts: Arc<dyn ArtifactStore> = match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            ensure_schema(&pool).await?;
            let bucket = match &config.s3 {
                Some(s3) => Some(DocumentBucket {
                    client: build_s3_client(s3).await,
                    bucket: s3.bucket.clone(),
                }),
                None => None,
            };
            Arc::new(PgArtifactStore::new(pool, bucket))
        }
        None => Arc::new(InMemoryArtifactStore::new()),
    };

    Ok(Orchestrator::new(generator, build_scorer(config), artifacts)
        .with_replacement_cap(config.replacement_cap)
        .with_policy(config.score_boost))
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &S3Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.access_key_id,
        &config.secret_access_key,
        None,
        None,
        "tailor-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}

/// Writes through a temp file in the target directory so readers never see
/// a partial file.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temp file in {}", dir.display()))?;
    tmp.write_all(bytes)?;
    tmp.persist(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
