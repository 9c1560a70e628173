use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use quality_stats::config::{Config, ConfigOverrides};
use quality_stats::db::{self, PgStore};
use quality_stats::models::SurveyFilter;
use quality_stats::report;
use quality_stats::{compare_programs, program_stats, ComparisonRequest, SurveyLoader};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Markdown,
    Json,
    Csv,
}

#[derive(Parser)]
#[command(name = "quality-stats")]
#[command(about = "Survey and complaint statistics for academic programs", long_about = None)]
struct Cli {
    #[arg(long, global = true)]
    database_url: Option<String>,
    /// Per-call store timeout in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,
    /// JSON file with ordered survey classification rules
    #[arg(long, global = true)]
    rules: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import respondent answers from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// List programs and their ids
    Programs,
    /// Roll up survey, course and complaint statistics for one program
    Stats {
        #[arg(long)]
        program: Uuid,
        #[arg(long)]
        year: Option<String>,
        #[arg(long)]
        semester: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
        format: OutputFormat,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Compare two or more programs for an academic year
    Compare {
        #[arg(long, value_delimiter = ',', num_args = 1..)]
        programs: Vec<Uuid>,
        #[arg(long)]
        year: Option<String>,
        #[arg(long)]
        semester: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Markdown)]
        format: OutputFormat,
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

async fn connect(config: &Config) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(config.database_url()?)
        .await
        .context("failed to connect to Postgres")
}

fn emit(rendered: String, out: Option<PathBuf>) -> anyhow::Result<()> {
    match out {
        Some(path) => {
            std::fs::write(&path, rendered)
                .with_context(|| format!("failed writing {}", path.display()))?;
            println!("Report written to {}.", path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    config.apply_overrides(ConfigOverrides {
        database_url: cli.database_url.clone(),
        store_timeout_secs: cli.timeout_secs,
        rules_path: cli.rules.clone(),
    });

    match cli.command {
        Commands::InitDb => {
            let pool = connect(&config).await?;
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let pool = connect(&config).await?;
            db::seed(&pool).await?;
            println!("Seed data inserted.");
        }
        Commands::Import { csv } => {
            let pool = connect(&config).await?;
            let inserted = db::import_csv(&pool, &csv).await?;
            println!("Inserted {inserted} responses from {}.", csv.display());
        }
        Commands::Programs => {
            let pool = connect(&config).await?;
            let programs = db::list_programs(&pool).await?;
            if programs.is_empty() {
                println!("No programs found. Run `seed` to load demo data.");
            }
            for program in programs {
                println!("{}  {}", program.id, program.name);
            }
        }
        Commands::Stats {
            program,
            year,
            semester,
            format,
            out,
        } => {
            let classifier = config.classifier()?;
            let pool = connect(&config).await?;
            let store = PgStore::new(pool);
            let loader = SurveyLoader::new(&store, config.store_timeout);
            let filter = SurveyFilter::new(year.as_deref(), semester.as_deref());

            info!(%program, "computing program stats");
            let stats = program_stats(&loader, &classifier, program, &filter).await?;
            let rendered = match format {
                OutputFormat::Markdown => report::build_program_report(&stats),
                OutputFormat::Json => serde_json::to_string_pretty(&stats)? + "\n",
                OutputFormat::Csv => anyhow::bail!("csv output is only available for `compare`"),
            };
            emit(rendered, out)?;
        }
        Commands::Compare {
            programs,
            year,
            semester,
            format,
            out,
        } => {
            let request = ComparisonRequest {
                program_ids: programs,
                academic_year: year,
                semester,
            };
            request.validate()?;

            let classifier = config.classifier()?;
            let pool = connect(&config).await?;
            let store = PgStore::new(pool);
            let loader = SurveyLoader::new(&store, config.store_timeout);

            info!(programs = request.program_ids.len(), "comparing programs");
            let result = compare_programs(&loader, &classifier, &request).await?;
            let rendered = match format {
                OutputFormat::Markdown => report::build_comparison_report(&result),
                OutputFormat::Json => serde_json::to_string_pretty(&result)? + "\n",
                OutputFormat::Csv => report::comparison_to_csv(&result)?,
            };
            emit(rendered, out)?;
        }
    }

    Ok(())
}
