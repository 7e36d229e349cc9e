use std::fs::{OpenOptions, create_dir_all};
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Utc};
use serde::Serialize;

use dragonfill_core::BusinessConfig;
use dragonfill_generate::run_dir_name;

use super::{RegistryError, RegistryResult};

/// Metadata captured at run start.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub out_dir: PathBuf,
    pub seed: u64,
    pub verify: bool,
    pub config_path: Option<PathBuf>,
    pub catalogs_dir: Option<PathBuf>,
    pub config: BusinessConfig,
}

/// JSON config written to each run directory.
#[derive(Debug, Serialize)]
pub struct RunConfig<'a> {
    pub run_id: &'a str,
    pub started_at: String,
    pub dataset_version: &'static str,
    pub seed: u64,
    pub verify: bool,
    pub config_path: Option<String>,
    pub catalogs_dir: Option<String>,
    pub business: &'a BusinessConfig,
    pub git: GitInfo,
}

/// Git metadata for reproducibility.
#[derive(Debug, Serialize)]
pub struct GitInfo {
    pub commit: Option<String>,
    pub dirty: Option<bool>,
}

/// Paths for run artifacts.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub run_root: PathBuf,
    pub config_path: PathBuf,
    pub logs_path: PathBuf,
}

pub fn start_run(ctx: &RunContext) -> RegistryResult<RunPaths> {
    let run_root = ctx
        .out_dir
        .join(run_dir_name(ctx.started_at, &ctx.run_id));
    create_dir_all(&run_root)?;

    let config_path = run_root.join("config.json");
    let logs_path = run_root.join("logs.ndjson");

    let config = RunConfig {
        run_id: &ctx.run_id,
        started_at: ctx.started_at.to_rfc3339(),
        dataset_version: dragonfill_core::DATASET_VERSION,
        seed: ctx.seed,
        verify: ctx.verify,
        config_path: ctx.config_path.as_deref().map(display_path),
        catalogs_dir: ctx.catalogs_dir.as_deref().map(display_path),
        business: &ctx.config,
        git: collect_git_info(),
    };
    write_json(&config_path, &config)?;

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&logs_path)?;

    Ok(RunPaths {
        run_root,
        config_path,
        logs_path,
    })
}

pub fn collect_git_info() -> GitInfo {
    let commit = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
            } else {
                None
            }
        })
        .filter(|value| !value.is_empty());

    let dirty = Command::new("git")
        .args(["status", "--porcelain"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| !output.stdout.is_empty());

    GitInfo { commit, dirty }
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}

pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> RegistryResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent)?;
        }
    }
    let file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)?;
    serde_json::to_writer_pretty(file, value).map_err(RegistryError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_run_writes_config_and_log_file() {
        let out_dir = std::env::temp_dir().join(format!(
            "dragonfill_cli_registry_{}",
            uuid::Uuid::new_v4()
        ));
        let ctx = RunContext {
            run_id: "test-run".to_string(),
            started_at: Utc::now(),
            out_dir: out_dir.clone(),
            seed: 42,
            verify: true,
            config_path: None,
            catalogs_dir: None,
            config: BusinessConfig::default(),
        };

        let paths = start_run(&ctx).expect("start run");
        assert!(paths.run_root.starts_with(&out_dir));
        assert!(paths.logs_path.exists());

        let written: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(&paths.config_path).expect("read config.json"),
        )
        .expect("parse config.json");
        assert_eq!(written["seed"], 42);
        assert_eq!(written["run_id"], "test-run");
        assert!(written["business"].get("shop").is_some());
    }
}
