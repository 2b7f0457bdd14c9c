//! Coffee roast CLI
//!
//! Command-line access to the coffee roast record store. Records are
//! written to stdout as JSON; logs go to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use coffee_roast_store::{
    config::{create_dynamodb_client, Environment, EnvironmentResolver, Settings},
    db::{
        CoffeeRoastRecord, CoffeeRoastRepository, CreatePolicy, DynamoDbClient, RoastBackend,
        RoastField, RoastUpdate,
    },
    logging::{init_tracing, LogFormat},
    schemas::RoastPayload,
    utils::RetryConfig,
};
use futures::TryStreamExt;
use serde::Serialize;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Coffee roast record store
///
/// Create, read, update, delete and search coffee roast records.
#[derive(Parser, Debug)]
#[command(name = "coffee-roast")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Environment: dev, staging, prod (overrides ENVIRONMENT env var)
    #[arg(short, long, global = true)]
    env: Option<Environment>,

    /// AWS region (overrides AWS_REGION env var)
    #[arg(long, global = true)]
    region: Option<String>,

    /// Use this table instead of the environment's table
    #[arg(long, global = true)]
    table_name: Option<String>,

    /// DynamoDB endpoint, e.g. http://localhost:8000 for DynamoDB Local
    #[arg(long, global = true)]
    endpoint_url: Option<String>,

    /// Log level: trace, debug, info, warn, error (overrides LOG_LEVEL env var)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[arg(long, value_enum, default_value_t = LogFormat::Json, global = true)]
    log_format: LogFormat,

    /// Per-request timeout in seconds (overrides DYNAMODB_TIMEOUT_SECS)
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Let `create` replace an existing roast
    #[arg(long, global = true)]
    allow_overwrite: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a record from flags or from an extraction payload
    Create(CreateArgs),

    /// Print one record
    Get { roast_name: String },

    /// Change or clear individual fields of a record
    Update {
        roast_name: String,

        /// field=value; repeatable
        #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_assignment)]
        set: Vec<(String, String)>,

        /// Field to clear; repeatable
        #[arg(long = "unset", value_name = "FIELD")]
        unset: Vec<String>,
    },

    /// Delete a record
    Delete { roast_name: String },

    /// Print every record, one JSON object per line
    List,

    /// Print records whose field equals value exactly
    Find { field: String, value: String },

    /// Show the resolved table parameters for an environment
    Env { name: Option<String> },

    /// Check connectivity and that the table exists
    Health,
}

#[derive(clap::Args, Debug)]
struct CreateArgs {
    #[arg(required_unless_present = "from_json")]
    roast_name: Option<String>,

    #[arg(long)]
    country_of_origin: Option<String>,

    /// YYYY-MM-DD or RFC 3339
    #[arg(long)]
    roast_date: Option<String>,

    /// Comma-separated
    #[arg(long, value_delimiter = ',')]
    flavour_notes: Option<Vec<String>>,

    #[arg(long)]
    vendor_name: Option<String>,

    #[arg(long)]
    variety: Option<String>,

    #[arg(long)]
    process: Option<String>,

    #[arg(long)]
    producer: Option<String>,

    #[arg(long)]
    image_s3_path: Option<String>,

    /// Read an extraction payload from FILE ("-" for stdin)
    #[arg(
        long,
        value_name = "FILE",
        conflicts_with_all = [
            "roast_name", "country_of_origin", "roast_date", "flavour_notes",
            "vendor_name", "variety", "process", "producer", "image_s3_path",
        ]
    )]
    from_json: Option<PathBuf>,
}

impl CreateArgs {
    fn into_payload(self) -> Result<RoastPayload> {
        if let Some(path) = self.from_json {
            let json = read_input(&path)?;
            return Ok(RoastPayload::from_json(&json)?);
        }

        Ok(RoastPayload {
            roast_name: self.roast_name.unwrap_or_default(),
            country_of_origin: self.country_of_origin,
            roast_date: self.roast_date,
            flavour_notes: self
                .flavour_notes
                .map(|notes| notes.into_iter().map(|n| n.trim().to_string()).collect()),
            vendor_name: self.vendor_name,
            variety: self.variety,
            process: self.process,
            producer: self.producer,
            image_s3_path: self.image_s3_path,
        })
    }
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read payload from stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read payload from {}", path.display()))
}

fn parse_assignment(raw: &str) -> std::result::Result<(String, String), String> {
    raw.split_once('=')
        .map(|(field, value)| (field.trim().to_string(), value.to_string()))
        .ok_or_else(|| format!("expected FIELD=VALUE, got `{}`", raw))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Load configuration first (before logging, so we can use log_level)
    let mut settings = Settings::load()?;
    apply_overrides(&args, &mut settings);
    settings.validate()?;

    init_tracing(&settings.log_level, args.log_format)?;

    for warning in settings.warnings() {
        tracing::warn!(environment = %settings.environment, "{}", warning);
    }

    tracing::debug!(
        app_name = %settings.app_name,
        version = %settings.app_version,
        environment = %settings.environment,
        region = %settings.aws_region,
        "Starting"
    );

    let resolver = EnvironmentResolver::from_settings(&settings)?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();

    if let Command::Env { name } = &args.command {
        let profile = match name {
            Some(name) => resolver.resolve(name)?,
            None => resolver.profile(settings.environment),
        };
        return write_json(&mut out, &profile);
    }

    let profile = resolver.profile(settings.environment);
    let sdk_client = create_dynamodb_client(&settings).await;
    let client = DynamoDbClient::for_profile(sdk_client, &profile)
        .with_retry_config(RetryConfig::from_settings(&settings));

    if let Command::Health = args.command {
        return health(&client, &mut out).await;
    }

    let policy = if settings.allow_overwrite {
        CreatePolicy::Overwrite
    } else {
        CreatePolicy::Reject
    };
    let repository = CoffeeRoastRepository::new(Arc::new(client)).with_create_policy(policy);

    execute(&repository, args.command, &mut out).await
}

/// Fold command line flags into the loaded settings
fn apply_overrides(args: &Args, settings: &mut Settings) {
    if let Some(env) = args.env {
        settings.environment = env;
    }
    if let Some(region) = &args.region {
        settings.aws_region = region.clone();
    }
    if let Some(table_name) = &args.table_name {
        settings.table_name = Some(table_name.clone());
    }
    if let Some(endpoint_url) = &args.endpoint_url {
        settings.dynamodb_endpoint_url = Some(endpoint_url.clone());
    }
    if let Some(log_level) = &args.log_level {
        settings.log_level = log_level.clone();
    }
    if let Some(timeout) = args.timeout_secs {
        settings.request_timeout_seconds = timeout;
    }
    if args.allow_overwrite {
        settings.allow_overwrite = true;
    }
}

/// Run a record command against the repository
async fn execute<B: RoastBackend>(
    repository: &CoffeeRoastRepository<B>,
    command: Command,
    out: &mut impl Write,
) -> Result<()> {
    match command {
        Command::Create(create) => {
            let record = CoffeeRoastRecord::try_from(create.into_payload()?)?;
            let stored = repository.create(record).await?;
            write_json(out, &stored)
        }
        Command::Get { roast_name } => {
            let record = repository.get(&roast_name).await?;
            write_json(out, &record)
        }
        Command::Update {
            roast_name,
            set,
            unset,
        } => {
            let update = unset.iter().try_fold(RoastUpdate::from_pairs(set)?, |update, name| {
                name.parse::<RoastField>().map(|field| update.unset(field))
            })?;
            let record = repository.update(&roast_name, &update).await?;
            write_json(out, &record)
        }
        Command::Delete { roast_name } => {
            repository.delete(&roast_name).await?;
            write_json(out, &serde_json::json!({ "deleted": roast_name }))
        }
        Command::List => write_lines(out, repository.list_all()).await,
        Command::Find { field, value } => write_lines(out, repository.find_by(&field, &value)?).await,
        Command::Env { .. } | Command::Health => {
            anyhow::bail!("command does not operate on records")
        }
    }
}

async fn health(client: &DynamoDbClient, out: &mut impl Write) -> Result<()> {
    if !client.health_check().await {
        anyhow::bail!("DynamoDB is not reachable");
    }
    let status = client.ensure_table().await?;

    write_json(
        out,
        &serde_json::json!({
            "table": client.table_name(),
            "status": status,
        }),
    )
}

fn write_json(out: &mut impl Write, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

async fn write_lines(
    out: &mut impl Write,
    mut records: coffee_roast_store::db::RecordStream<'_>,
) -> Result<()> {
    let mut count = 0usize;
    while let Some(record) = records.try_next().await? {
        serde_json::to_writer(&mut *out, &record)?;
        writeln!(out)?;
        count += 1;
    }
    tracing::debug!(count, "Listed records");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use coffee_roast_store::db::InMemoryBackend;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    fn repository() -> CoffeeRoastRepository<InMemoryBackend> {
        CoffeeRoastRepository::new(Arc::new(InMemoryBackend::new()))
    }

    async fn run(repo: &CoffeeRoastRepository<InMemoryBackend>, argv: &[&str]) -> Result<String> {
        let mut out = Vec::new();
        execute(repo, parse(argv).command, &mut out).await?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_global_flags_override_settings() {
        let args = parse(&[
            "coffee-roast",
            "--env",
            "prod",
            "--region",
            "eu-west-1",
            "--timeout-secs",
            "9",
            "--allow-overwrite",
            "list",
        ]);
        let mut settings = Settings::default();
        apply_overrides(&args, &mut settings);

        assert_eq!(settings.environment, Environment::Production);
        assert_eq!(settings.aws_region, "eu-west-1");
        assert_eq!(settings.request_timeout_seconds, 9);
        assert!(settings.allow_overwrite);
        assert!(matches!(args.command, Command::List));
    }

    #[test]
    fn test_argument_validation() {
        assert!(Args::try_parse_from(["coffee-roast", "--env", "qa", "list"]).is_err());
        assert!(Args::try_parse_from(["coffee-roast", "create"]).is_err());
        assert!(Args::try_parse_from([
            "coffee-roast", "create", "Kenya AA", "--from-json", "payload.json"
        ])
        .is_err());
        assert!(Args::try_parse_from(["coffee-roast", "update", "Kenya AA", "--set", "variety"]).is_err());
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("flavour_notes=floral, citrus").unwrap(),
            ("flavour_notes".to_string(), "floral, citrus".to_string())
        );
        assert_eq!(
            parse_assignment("producer=").unwrap(),
            ("producer".to_string(), String::new())
        );
        assert!(parse_assignment("producer").is_err());
    }

    #[tokio::test]
    async fn test_create_update_get_delete() {
        let repo = repository();

        run(&repo, &[
            "coffee-roast", "create", "Ethiopian Yirgacheffe",
            "--country-of-origin", "Ethiopia",
            "--flavour-notes", "floral,citrus,berry",
            "--vendor-name", "Blue Bottle Coffee",
        ])
        .await
        .unwrap();

        let updated = run(&repo, &[
            "coffee-roast", "update", "Ethiopian Yirgacheffe",
            "--set", "flavour_notes=floral,citrus,berry,tea-like",
            "--unset", "country_of_origin",
        ])
        .await
        .unwrap();
        let record: CoffeeRoastRecord = serde_json::from_str(&updated).unwrap();
        assert_eq!(record.flavour_notes.unwrap().len(), 4);
        assert_eq!(record.country_of_origin, None);
        assert_eq!(record.vendor_name.as_deref(), Some("Blue Bottle Coffee"));

        let fetched = run(&repo, &["coffee-roast", "get", "Ethiopian Yirgacheffe"]).await.unwrap();
        assert_eq!(fetched, updated);

        run(&repo, &["coffee-roast", "delete", "Ethiopian Yirgacheffe"]).await.unwrap();
        let err = run(&repo, &["coffee-roast", "get", "Ethiopian Yirgacheffe"]).await.unwrap_err();
        assert!(err
            .downcast_ref::<coffee_roast_store::StoreError>()
            .is_some_and(|e| e.is_not_found()));
    }

    #[tokio::test]
    async fn test_create_from_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"coffee_roast_name": "Huila Pink Bourbon", "country_of_origin": "Colombia",
                "roast_date": "2024-02-10", "image_s3_path": "s3://bags/huila.jpg"}}"#
        )
        .unwrap();

        let repo = repository();
        let path = file.path().to_str().unwrap();
        run(&repo, &["coffee-roast", "create", "--from-json", path]).await.unwrap();

        let record = repo.get("Huila Pink Bourbon").await.unwrap();
        assert_eq!(record.country_of_origin.as_deref(), Some("Colombia"));
        assert!(record.roast_date.is_some());
    }

    #[tokio::test]
    async fn test_list_and_find_print_one_record_per_line() {
        let repo = repository();
        for (name, process) in [("Guji", "natural"), ("Nyeri", "washed"), ("Huila", "washed")] {
            run(&repo, &["coffee-roast", "create", name, "--process", process])
                .await
                .unwrap();
        }

        let listed = run(&repo, &["coffee-roast", "list"]).await.unwrap();
        assert_eq!(listed.lines().count(), 3);

        let found = run(&repo, &["coffee-roast", "find", "process", "washed"]).await.unwrap();
        let mut names: Vec<String> = found
            .lines()
            .map(|line| serde_json::from_str::<CoffeeRoastRecord>(line).unwrap().roast_name)
            .collect();
        names.sort();
        assert_eq!(names, vec!["Huila", "Nyeri"]);

        assert!(run(&repo, &["coffee-roast", "find", "altitude", "high"]).await.is_err());
    }

    #[tokio::test]
    async fn test_update_rejects_unknown_field() {
        let repo = repository();
        run(&repo, &["coffee-roast", "create", "Guji"]).await.unwrap();

        assert!(run(&repo, &["coffee-roast", "update", "Guji", "--set", "altitude=2000"])
            .await
            .is_err());
        assert!(run(&repo, &["coffee-roast", "update", "Guji", "--unset", "roast_name"])
            .await
            .is_err());
    }
}
