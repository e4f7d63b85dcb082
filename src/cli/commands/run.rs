//! `pipeflow run`

use crate::cli::validation::validate_entry_file;
use crate::config::{OrchestratorConfig, PipeflowSettings};
use crate::dispatch::CancellationFlag;
use crate::model::{Row, RunOutcome, VariableScope};
use crate::orchestrator::{Orchestrator, ParentContext};
use crate::remote::{HttpWorkerClient, TrustStore};
use crate::resolver::FileDefinitionStore;
use crate::runtime::ProcessRuntime;
use anyhow::{anyhow, Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Name the CLI uses as the parent workflow
const PARENT_NAME: &str = "pipeflow";

pub struct RunOptions {
    pub entry: PathBuf,
    pub rows: Option<PathBuf>,
    pub vars: Vec<(String, String)>,
    pub args: Vec<String>,
    pub definitions: Option<PathBuf>,
}

/// Run one entry with the production adapters
pub async fn run_entry(options: RunOptions, settings: &PipeflowSettings) -> Result<RunOutcome> {
    validate_entry_file(&options.entry)?;
    let config = OrchestratorConfig::load(&options.entry)
        .await
        .with_context(|| format!("Failed to load entry {}", options.entry.display()))?;

    let rows = match &options.rows {
        Some(path) => load_rows(path).await?,
        None => Vec::new(),
    };

    let root = options
        .definitions
        .clone()
        .unwrap_or_else(|| settings.definitions_root());
    let client = HttpWorkerClient::new(settings.http_timeout, Arc::new(TrustStore::new()))
        .context("Failed to create worker client")?;
    let orchestrator = Orchestrator::builder(
        Arc::new(FileDefinitionStore::new(root)),
        Arc::new(ProcessRuntime::default()),
        Arc::new(client),
    )
    .with_settings(settings.clone())
    .build();

    let mut scope = VariableScope::from_env();
    for (name, value) in &options.vars {
        scope.set(name.clone(), value.clone());
    }

    let cancel = CancellationFlag::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling");
            on_interrupt.cancel();
        }
    });

    let parent = ParentContext::new(PARENT_NAME)
        .with_scope(scope)
        .with_arguments(options.args.clone())
        .with_workers(settings.workers.clone())
        .with_cancel(Arc::new(cancel));

    info!(entry = %config.name, rows = rows.len(), "Running entry");
    let prior = RunOutcome::new().with_rows(rows);
    Ok(orchestrator.run(&config, prior, 0, &parent).await)
}

pub async fn load_rows(path: &Path) -> Result<Vec<Row>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read rows from {}", path.display()))?;
    parse_rows(&content).with_context(|| format!("Invalid rows in {}", path.display()))
}

/// Parse a JSON array of objects, or one JSON object per non-empty line
pub fn parse_rows(content: &str) -> Result<Vec<Row>> {
    let values: Vec<serde_json::Value> = if content.trim_start().starts_with('[') {
        serde_json::from_str(content)?
    } else {
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str)
            .collect::<std::result::Result<_, _>>()?
    };

    values
        .into_iter()
        .enumerate()
        .map(|(index, value)| {
            Row::from_json_object(value).ok_or_else(|| anyhow!("row {} is not a JSON object", index + 1))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rows_array() {
        let rows = parse_rows(r#"[{"id": 1, "name": "a"}, {"id": 2, "name": "b"}]"#).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].get_string("name").as_deref(), Some("b"));
    }

    #[test]
    fn test_parse_rows_lines() {
        let rows = parse_rows("{\"id\": 1}\n\n{\"id\": 2}\n").unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_parse_rows_rejects_scalars() {
        assert!(parse_rows("[1, 2]").is_err());
    }
}
