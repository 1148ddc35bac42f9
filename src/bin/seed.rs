//! Catalog maintenance commands that run against the same store stack as the
//! server.
//!
//! ```bash
//! skills-hub-seed import --file data/skills.json --status published
//! skills-hub-seed clean --status draft,archived --title-prefix "Test " --dry-run
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use clap::{Parser, Subcommand};
use serde_json::Value;
use tracing::{error, info, warn};

use skills_hub_api::{
    config::Config,
    mapper,
    middleware::init_tracing,
    models::{self, Skill, SkillStatus},
    store::{open_store, CatalogStore, SkillQuery},
};

#[derive(Parser, Debug)]
#[command(name = "skills-hub-seed", about = "Import and clean Skills Hub catalog data")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create skills from a JSON array of skill-like objects
    Import(ImportArgs),
    /// Delete test or stale skills
    Clean(CleanArgs),
}

#[derive(Parser, Debug)]
struct ImportArgs {
    /// JSON file holding an array of skills
    #[arg(long, short)]
    file: PathBuf,

    /// Status for every imported skill, overriding the file
    #[arg(long)]
    status: Option<String>,
}

#[derive(Parser, Debug)]
struct CleanArgs {
    /// Comma-separated statuses to delete
    #[arg(long, default_value = "draft,archived")]
    status: String,

    /// Only delete skills whose title starts with this prefix
    #[arg(long)]
    title_prefix: Option<String>,

    /// Only delete skills created before this date (YYYY-MM-DD)
    #[arg(long)]
    created_before: Option<String>,

    /// List what would be deleted without deleting
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = init_tracing() {
        eprintln!("Failed to initialize tracing: {}", e);
        return ExitCode::FAILURE;
    }

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::from_env().context("Failed to load configuration")?;
    let store = open_store(&config).await?;
    info!("Using {} store", store.backend_name());

    match cli.command {
        Command::Import(args) => import(store.as_ref(), args).await,
        Command::Clean(args) => clean(store.as_ref(), args).await,
    }
}

async fn import(store: &dyn CatalogStore, args: ImportArgs) -> Result<()> {
    let status = args
        .status
        .as_deref()
        .map(|raw| SkillStatus::parse(raw).with_context(|| format!("Unknown status: {}", raw)))
        .transpose()?;

    let raw = tokio::fs::read_to_string(&args.file)
        .await
        .with_context(|| format!("Failed to read {}", args.file.display()))?;
    let records = parse_records(&raw)?;
    info!("Importing {} skills from {}", records.len(), args.file.display());

    let (mut created, mut failed) = (0usize, 0usize);
    for (index, record) in records.iter().enumerate() {
        match build_skill(record, status) {
            Ok(skill) => match store.create_skill(&skill).await {
                Ok(saved) => {
                    created += 1;
                    info!("Created skill {} ({})", saved.title, saved.id);
                }
                Err(e) => {
                    failed += 1;
                    warn!("Failed to store record {}: {}", index, e);
                }
            },
            Err(message) => {
                failed += 1;
                warn!("Skipping record {}: {}", index, message);
            }
        }
    }

    info!("Import finished: {} created, {} failed", created, failed);
    Ok(())
}

fn parse_records(raw: &str) -> Result<Vec<Value>> {
    match serde_json::from_str::<Value>(raw).context("Import file is not valid JSON")? {
        Value::Array(records) => Ok(records),
        _ => anyhow::bail!("Import file must contain a JSON array"),
    }
}

fn build_skill(record: &Value, status: Option<SkillStatus>) -> Result<Skill, String> {
    let mut request = mapper::skill_request_from_value(record).map_err(|e| e.to_string())?;
    if let Some(status) = status {
        request.status = Some(status.as_str().to_string());
    }
    request.validate()?;
    Ok(request.into_skill(models::now()))
}

/// Selection rules for `clean`.
#[derive(Debug)]
struct CleanFilter {
    statuses: Vec<SkillStatus>,
    title_prefix: Option<String>,
    created_before: Option<DateTime<Utc>>,
}

impl CleanFilter {
    fn from_args(args: &CleanArgs) -> Result<Self> {
        let mut statuses = Vec::new();
        for raw in args.status.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let status =
                SkillStatus::parse(raw).with_context(|| format!("Unknown status: {}", raw))?;
            if !statuses.contains(&status) {
                statuses.push(status);
            }
        }
        if statuses.is_empty() {
            anyhow::bail!("--status needs at least one status");
        }

        let created_before = args
            .created_before
            .as_deref()
            .map(|raw| {
                NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                    .with_context(|| format!("--created-before must be YYYY-MM-DD, got {}", raw))
                    .map(|date| Utc.from_utc_datetime(&NaiveDateTime::new(date, NaiveTime::default())))
            })
            .transpose()?;

        Ok(CleanFilter {
            statuses,
            title_prefix: args.title_prefix.clone().filter(|p| !p.is_empty()),
            created_before,
        })
    }

    fn matches(&self, skill: &Skill) -> bool {
        if !self.statuses.contains(&skill.status) {
            return false;
        }
        if let Some(ref prefix) = self.title_prefix {
            if !skill.title.starts_with(prefix.as_str()) {
                return false;
            }
        }
        if let Some(cutoff) = self.created_before {
            if skill.created_at >= cutoff {
                return false;
            }
        }
        true
    }
}

async fn clean(store: &dyn CatalogStore, args: CleanArgs) -> Result<()> {
    let filter = CleanFilter::from_args(&args)?;

    let mut targets = Vec::new();
    for status in &filter.statuses {
        let query = SkillQuery {
            status: Some(*status),
            ..Default::default()
        };
        let page = store.list_skills(&query).await?;
        targets.extend(page.items.into_iter().filter(|s| filter.matches(s)));
    }

    info!("{} skills match {:?}", targets.len(), filter);
    if args.dry_run {
        for skill in &targets {
            info!("Would delete {} ({}, {})", skill.title, skill.id, skill.status.as_str());
        }
        return Ok(());
    }

    let mut deleted = 0usize;
    for skill in &targets {
        match store.delete_skill(&skill.id).await {
            Ok(()) => deleted += 1,
            Err(e) => warn!("Failed to delete {}: {}", skill.id, e),
        }
    }

    info!("Clean finished: {} of {} deleted", deleted, targets.len());
    Ok(())
}
