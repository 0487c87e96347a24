//! datagrid - command line front end
//!
//! Applies a grid configuration to local row data, or shows the request a
//! remote load would make.

use anyhow::Context;
use clap::{Parser, Subcommand};
use datagrid_rs::{
    config::GridConfig,
    filter::{FilterSpec, OperatorRegistry},
    loader::{
        LoadPipeline, Paginator, RequestConfig, Transport, TransportError, TransportResponse,
    },
    model::TableModel,
    scripting::ScriptEngine,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "datagrid", version, about = "Filter rows and inspect load requests for a grid config")]
struct Cli {
    /// Grid configuration file (.toml or .json)
    #[arg(short, long, env = "DATAGRID_CONFIG", default_value = "grid.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply the configured filters to a JSON array of rows
    Filter {
        /// JSON file holding an array of row objects
        rows: PathBuf,

        /// Header filter value, as FIELD=VALUE (repeatable)
        #[arg(long = "header", value_name = "FIELD=VALUE")]
        headers: Vec<String>,

        /// Extra condition, as FIELD:TYPE:VALUE (repeatable)
        #[arg(long = "where", value_name = "FIELD:TYPE:VALUE")]
        conditions: Vec<String>,

        /// Extra Rhai filter expression with `row` and `params` in scope
        #[arg(long)]
        script: Option<String>,
    },
    /// Print the url and request options a load would use
    Query {
        /// Include the current filters in the params, as a remote filtering
        /// table would
        #[arg(long)]
        with_filters: bool,
    },
    /// Write a sample configuration
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Transport for commands that never dispatch.
struct OfflineTransport;

#[async_trait::async_trait]
impl Transport for OfflineTransport {
    async fn fetch(
        &self,
        url: &str,
        _config: &RequestConfig,
    ) -> Result<TransportResponse, TransportError> {
        Err(TransportError::Connection(format!("offline, not fetching {}", url)))
    }
}

/// Paginator for commands that only inspect the first page.
struct FirstPage;

impl Paginator for FirstPage {
    fn set_page(&self, page: u32) {
        tracing::debug!(page, "Page requested");
    }

    fn next_page(&self) {
        tracing::debug!("Next page requested");
    }
}

fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn parse_condition(raw: &str) -> anyhow::Result<FilterSpec> {
    let mut parts = raw.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(field), Some(operator), Some(value)) if !field.is_empty() => {
            Ok(FilterSpec::new(field, operator, parse_value(value)))
        }
        _ => anyhow::bail!("Invalid condition '{}', expected FIELD:TYPE:VALUE", raw),
    }
}

/// Rows of the file at `rows` that pass the configured filters plus the
/// command line extras.
fn filter_rows(
    config: &GridConfig,
    rows: &Path,
    headers: &[String],
    conditions: &[String],
    script: Option<&str>,
) -> anyhow::Result<Vec<Value>> {
    let scripts = ScriptEngine::new();
    let mut store = config.build_store(Arc::new(OperatorRegistry::builtin()), &scripts)?;

    let mut extra = conditions
        .iter()
        .map(|raw| parse_condition(raw.as_str()))
        .collect::<anyhow::Result<Vec<_>>>()?;
    if let Some(source) = script {
        let func = scripts
            .compile_filter("cli", source)
            .context("Failed to compile --script")?;
        extra.push(FilterSpec::custom(func, Value::Null));
    }
    store.add_filter(extra);

    for raw in headers {
        let (field, value) = raw
            .split_once('=')
            .with_context(|| format!("Invalid header filter '{}', expected FIELD=VALUE", raw))?;
        store.set_header_filter_value(field, parse_value(value))?;
    }

    let content = std::fs::read_to_string(rows)
        .with_context(|| format!("Failed to read rows from {:?}", rows))?;
    let table = TableModel::with_rows(serde_json::from_str(&content)?);
    let visible = store.filter(&table.rows());

    tracing::info!(
        total = table.len(),
        visible = visible.len(),
        filters = store.len(),
        "Filtered rows"
    );

    Ok(visible.iter().map(|row| row.data().clone()).collect())
}

fn run_filter(
    config: &GridConfig,
    rows: PathBuf,
    headers: Vec<String>,
    conditions: Vec<String>,
    script: Option<String>,
) -> anyhow::Result<()> {
    let output = filter_rows(config, &rows, &headers, &conditions, script.as_deref())?;
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

/// The url and request options the first load would use.
fn build_query(config: &GridConfig, with_filters: bool) -> anyhow::Result<(String, RequestConfig)> {
    let mut pipeline = LoadPipeline::new(Arc::new(OfflineTransport));
    config.apply_loading(&mut pipeline, Arc::new(FirstPage));

    if with_filters {
        let store = config.build_store(Arc::new(OperatorRegistry::builtin()), &ScriptEngine::new())?;
        let filters = serde_json::to_value(store.get_filters(true, true))?;
        pipeline.set_params(serde_json::json!({ "filter": filters }), true);
    }

    pipeline.build_request().context("No ajax url configured")
}

fn run_query(config: &GridConfig, with_filters: bool) -> anyhow::Result<()> {
    let (url, request) = build_query(config, with_filters)?;

    println!("{} {}", request.method, url);
    for (name, value) in &request.headers {
        println!("{}: {}", name, value);
    }
    if let Some(body) = &request.body {
        println!();
        println!("{}", body);
    }
    Ok(())
}

fn run_init(path: &Path, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("{:?} already exists, use --force to overwrite", path);
    }
    GridConfig::sample().save(path)?;
    tracing::info!("Wrote sample config to {:?}", path);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,datagrid_rs=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Init { force } => run_init(&cli.config, force),
        Command::Filter {
            rows,
            headers,
            conditions,
            script,
        } => {
            let config = GridConfig::load(&cli.config)
                .with_context(|| format!("Failed to load {:?}", cli.config))?;
            run_filter(&config, rows, headers, conditions, script)
        }
        Command::Query { with_filters } => {
            let config = GridConfig::load(&cli.config)
                .with_context(|| format!("Failed to load {:?}", cli.config))?;
            run_query(&config, with_filters)
        }
    }
}
