use anyhow::{Context, Result};
use odata_client::{load_config, ClientConfig, EntityClient};
use odata_query::{cancellation, BooleanFormat, Expr, FilterCompiler, RecordEvaluator};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

fn booleans(sentinel: bool) -> BooleanFormat {
    if sentinel {
        BooleanFormat::no_yes()
    } else {
        BooleanFormat::Native
    }
}

fn read_json(path: &Path) -> Result<Value> {
    let raw = fs::read_to_string(path).context(format!("Failed to read {:?}", path))?;
    serde_json::from_str(&raw).context(format!("Failed to parse JSON in {:?}", path))
}

pub fn read_predicate(path: &Path) -> Result<Expr> {
    let value = read_json(path)?;
    serde_json::from_value(value).context(format!("Invalid predicate in {:?}", path))
}

pub fn compile(predicate: &Path, sentinel: bool) -> Result<String> {
    let expr = read_predicate(predicate)?;
    let clause = FilterCompiler::new(booleans(sentinel)).compile(&expr)?;
    Ok(clause)
}

pub fn eval(predicate: &Path, records: &Path, sentinel: bool) -> Result<Vec<Value>> {
    let expr = read_predicate(predicate)?;
    let records = match read_json(records)? {
        Value::Array(items) => items,
        Value::Object(mut page) => match page.remove("value") {
            Some(Value::Array(items)) => items,
            _ => anyhow::bail!("{:?} has no `value` array", records),
        },
        _ => anyhow::bail!("{:?} is neither an array nor a page", records),
    };

    let evaluator = RecordEvaluator::new(booleans(sentinel));
    let mut matched = Vec::new();
    for record in records {
        if evaluator.evaluate(&expr, &record)? {
            matched.push(record);
        }
    }
    info!(matched = matched.len(), "Evaluated records");
    Ok(matched)
}

#[derive(Debug)]
pub struct FetchOptions {
    pub entity: String,
    pub filter: Option<PathBuf>,
    pub local_filter: Option<PathBuf>,
    pub select: Vec<String>,
    pub limit: Option<usize>,
    pub count: bool,
    pub cross_company: bool,
    pub config: Option<PathBuf>,
}

pub async fn fetch(options: FetchOptions) -> Result<Vec<Value>> {
    let mut config = match &options.config {
        Some(path) => load_config(path)?,
        None => ClientConfig::from_env()?,
    };
    config.cross_company |= options.cross_company;
    let client = EntityClient::from_config(&config)?;

    let mut query = client.query(&options.entity).select(&options.select);
    if let Some(path) = &options.filter {
        query = query.filter(read_predicate(path)?)?;
    }
    if let Some(path) = &options.local_filter {
        query = query.filter_local(read_predicate(path)?);
    }
    if let Some(limit) = options.limit {
        query = query.limit(limit);
    }
    if options.count {
        query = query.count();
    }
    info!(path = %query.build_path()?, "Running query");

    let (handle, signal) = cancellation();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted - cancelling after the current page");
            handle.cancel();
        }
    });

    let result = client.fetch(&query, &signal).await?;
    info!(
        records = result.records.len(),
        pages = result.pages_fetched,
        total_count = ?result.total_count,
        "Fetch finished"
    );
    Ok(result.records)
}
