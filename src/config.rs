use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

pub const CONFIG_FILE_NAME: &str = "fgo-mapping.toml";

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub paths: PathsSection,
    #[serde(default)]
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub fetch: FetchSection,
}

/// Relative paths are resolved against the config file's directory.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct PathsSection {
    /// Per-region subdirectories (`JP/`, `CN/`, ...) of cached exports.
    #[serde(default)]
    pub snapshot_dir: Option<PathBuf>,
    /// Holds `wiki_CN.json` / `wiki_NA.json`.
    #[serde(default)]
    pub wiki_dir: Option<PathBuf>,
    /// Local mirror of the community NA mapping repository.
    #[serde(default)]
    pub atlas_dir: Option<PathBuf>,
    #[serde(default)]
    pub repo_mapping_file: Option<PathBuf>,
    #[serde(default)]
    pub override_file: Option<PathBuf>,
    /// Previous run's output, used for the patch.
    #[serde(default)]
    pub published_dir: Option<PathBuf>,
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub trace_dir: Option<PathBuf>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct PipelineSection {
    /// Worker threads; 0 picks one per core.
    #[serde(default)]
    pub threads: Option<usize>,
    #[serde(default)]
    pub na_excluded_wars: Option<Vec<i32>>,
    /// Fixed unix time for reproducible runs.
    #[serde(default)]
    pub now: Option<i64>,
    #[serde(default)]
    pub shard_max_bytes: Option<usize>,
    #[serde(default)]
    pub trace_stages: Option<bool>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct FetchSection {
    #[serde(default)]
    pub max_calls: Option<usize>,
    #[serde(default)]
    pub window_secs: Option<u64>,
    #[serde(default)]
    pub max_retries: Option<u32>,
    #[serde(default)]
    pub backoff_ms: Option<u64>,
}

pub fn find_file_upwards(start_dir: &Path, filename: &str, max_levels: usize) -> Option<PathBuf> {
    let mut dir = start_dir;
    for _ in 0..=max_levels {
        let candidate = dir.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
    None
}

pub fn find_default_config(workdir: &Path, filename: &str) -> Option<PathBuf> {
    if let Ok(cwd) = std::env::current_dir() {
        if let Some(p) = find_file_upwards(&cwd, filename, 8) {
            return Some(p);
        }
    }
    if let Some(p) = find_file_upwards(workdir, filename, 8) {
        return Some(p);
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            if let Some(p) = find_file_upwards(dir, filename, 10) {
                return Some(p);
            }
        }
    }
    None
}

pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let cfg: AppConfig = toml::from_str(&text).context("parse config toml")?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_are_optional() {
        let cfg: AppConfig = toml::from_str("[pipeline]\nthreads = 4\n").expect("parse");
        assert_eq!(cfg.pipeline.threads, Some(4));
        assert!(cfg.paths.snapshot_dir.is_none());
        assert!(cfg.fetch.max_calls.is_none());
    }

    #[test]
    fn finds_config_in_parent_directories() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let nested = tmp.path().join("a").join("b");
        std::fs::create_dir_all(&nested).expect("mkdir");
        std::fs::write(tmp.path().join(CONFIG_FILE_NAME), "").expect("write");

        let found = find_file_upwards(&nested, CONFIG_FILE_NAME, 4).expect("found");
        assert_eq!(found, tmp.path().join(CONFIG_FILE_NAME));
        assert!(find_file_upwards(&nested, CONFIG_FILE_NAME, 1).is_none());
    }

    #[test]
    fn loads_every_section() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join(CONFIG_FILE_NAME);
        std::fs::write(
            &path,
            r#"
[paths]
snapshot_dir = "export"
[pipeline]
na_excluded_wars = [1002, 1003]
now = 1700000000
[fetch]
max_calls = 10
window_secs = 1
"#,
        )
        .expect("write");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.paths.snapshot_dir, Some(PathBuf::from("export")));
        assert_eq!(cfg.pipeline.na_excluded_wars, Some(vec![1002, 1003]));
        assert_eq!(cfg.pipeline.now, Some(1_700_000_000));
        assert_eq!(cfg.fetch.window_secs, Some(1));
    }
}
