use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;

use crate::config::{find_default_config, load_config, AppConfig, CONFIG_FILE_NAME};
use crate::fetch::RetryPolicy;

pub const DEFAULT_SHARD_MAX_BYTES: usize = 4 * 1024 * 1024;

/// Values given on the command line; each one beats the config file.
#[derive(Clone, Debug, Default)]
pub struct RunOverrides {
    pub config_path: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub now: Option<i64>,
    pub threads: Option<usize>,
    pub skip_wiki: bool,
    pub skip_atlas: bool,
    pub no_autofill: bool,
}

#[derive(Clone, Debug)]
pub struct FetchSettings {
    pub max_calls: usize,
    pub window: Duration,
    pub retry: RetryPolicy,
}

#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub workdir: PathBuf,
    pub config_path: PathBuf,

    pub snapshot_dir: PathBuf,
    pub wiki_dir: Option<PathBuf>,
    pub atlas_dir: Option<PathBuf>,
    pub repo_mapping_file: Option<PathBuf>,
    pub override_file: Option<PathBuf>,
    pub published_dir: PathBuf,
    pub output_dir: PathBuf,
    pub trace_dir: PathBuf,

    pub threads: usize,
    pub na_excluded_wars: Vec<i32>,
    pub now: i64,
    pub shard_max_bytes: usize,
    pub trace_stages: bool,
    pub autofill: bool,

    pub fetch: FetchSettings,
}

impl PipelineConfig {
    /// Locates and reads the config file (`--config`, `FGO_MAPPING_CONFIG`,
    /// then an upward search), then applies CLI overrides.
    pub fn from_args(overrides: &RunOverrides) -> anyhow::Result<Self> {
        let cwd = std::env::current_dir().context("current dir")?;
        let cfg_file = overrides
            .config_path
            .clone()
            .or_else(|| std::env::var("FGO_MAPPING_CONFIG").ok().map(PathBuf::from))
            .or_else(|| find_default_config(&cwd, CONFIG_FILE_NAME));

        let mut file_cfg = AppConfig::default();
        if let Some(p) = cfg_file.as_ref() {
            if p.exists() {
                file_cfg = load_config(p)?;
            }
        }
        let cfg_path = cfg_file.unwrap_or_else(|| cwd.join(CONFIG_FILE_NAME));
        let workdir = cfg_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| cwd.clone());
        Ok(Self::resolve(workdir, cfg_path, &file_cfg, overrides))
    }

    /// Applies defaults. Relative paths are taken from `workdir`.
    pub fn resolve(
        workdir: PathBuf,
        config_path: PathBuf,
        file_cfg: &AppConfig,
        overrides: &RunOverrides,
    ) -> Self {
        let paths = &file_cfg.paths;
        let at = |p: &Path| -> PathBuf {
            if p.is_absolute() {
                p.to_path_buf()
            } else {
                workdir.join(p)
            }
        };

        let snapshot_dir = at(paths.snapshot_dir.as_deref().unwrap_or(Path::new("export")));
        let wiki_dir = if overrides.skip_wiki {
            None
        } else {
            Some(at(paths.wiki_dir.as_deref().unwrap_or(Path::new("wiki"))))
        };
        let atlas_dir = if overrides.skip_atlas {
            None
        } else {
            paths.atlas_dir.as_deref().map(|p| at(p))
        };
        let repo_mapping_file = paths.repo_mapping_file.as_deref().map(|p| at(p));
        let override_file = paths.override_file.as_deref().map(|p| at(p));
        let output_dir = match overrides.output.as_deref() {
            Some(p) => p.to_path_buf(),
            None => at(paths.output_dir.as_deref().unwrap_or(Path::new("publish"))),
        };
        let published_dir = paths
            .published_dir
            .as_deref()
            .map(|p| at(p))
            .unwrap_or_else(|| output_dir.clone());
        let trace_dir = match paths.trace_dir.as_deref() {
            Some(p) if p.is_absolute() => p.to_path_buf(),
            Some(p) => output_dir.join(p),
            None => output_dir.join("_trace"),
        };

        let pipeline = &file_cfg.pipeline;
        let fetch = &file_cfg.fetch;
        let defaults = RetryPolicy::default();
        Self {
            snapshot_dir,
            wiki_dir,
            atlas_dir,
            repo_mapping_file,
            override_file,
            published_dir,
            trace_dir,
            threads: overrides.threads.or(pipeline.threads).unwrap_or(0),
            na_excluded_wars: pipeline
                .na_excluded_wars
                .clone()
                .unwrap_or_else(|| vec![1002]),
            now: overrides
                .now
                .or(pipeline.now)
                .unwrap_or_else(|| chrono::Utc::now().timestamp()),
            shard_max_bytes: pipeline
                .shard_max_bytes
                .unwrap_or(DEFAULT_SHARD_MAX_BYTES)
                .max(1024),
            trace_stages: pipeline.trace_stages.unwrap_or(false),
            autofill: !overrides.no_autofill,
            fetch: FetchSettings {
                max_calls: fetch.max_calls.unwrap_or(20).max(1),
                window: Duration::from_secs(fetch.window_secs.unwrap_or(1)),
                retry: RetryPolicy {
                    max_retries: fetch.max_retries.unwrap_or(defaults.max_retries),
                    backoff: fetch
                        .backoff_ms
                        .map(Duration::from_millis)
                        .unwrap_or(defaults.backoff),
                },
            },
            output_dir,
            workdir,
            config_path,
        }
    }
}

pub fn init_default_config(dir: &Path, force: bool) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create config dir: {}", dir.display()))?;
    let cfg_path = dir.join(CONFIG_FILE_NAME);
    if cfg_path.exists() && !force {
        return Ok(cfg_path);
    }

    let cfg_text = r#"[paths]
# Cached exports, one directory per region: export/JP, export/CN, ...
snapshot_dir = "export"
# wiki_CN.json / wiki_NA.json
wiki_dir = "wiki"
# Local mirror of the community NA mapping repository (optional).
# atlas_dir = "atlas"
# repo_mapping_file = "data/mappings.json"
# override_file = "data/override_mappings.json"
output_dir = "publish"
# published_dir = "publish"
trace_dir = "_trace"

[pipeline]
threads = 0
na_excluded_wars = [1002]
# now = 1700000000
shard_max_bytes = 4194304
trace_stages = false

[fetch]
max_calls = 20
window_secs = 1
max_retries = 5
backoff_ms = 500
"#;

    std::fs::write(&cfg_path, cfg_text)
        .with_context(|| format!("write config: {}", cfg_path.display()))?;
    Ok(cfg_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_resolve_against_workdir() {
        let cfg = PipelineConfig::resolve(
            PathBuf::from("/work"),
            PathBuf::from("/work/fgo-mapping.toml"),
            &AppConfig::default(),
            &RunOverrides::default(),
        );
        assert_eq!(cfg.snapshot_dir, PathBuf::from("/work/export"));
        assert_eq!(cfg.wiki_dir, Some(PathBuf::from("/work/wiki")));
        assert_eq!(cfg.atlas_dir, None);
        assert_eq!(cfg.published_dir, PathBuf::from("/work/publish"));
        assert_eq!(cfg.trace_dir, PathBuf::from("/work/publish/_trace"));
        assert_eq!(cfg.na_excluded_wars, vec![1002]);
        assert_eq!(cfg.shard_max_bytes, DEFAULT_SHARD_MAX_BYTES);
        assert!(cfg.autofill);
    }

    #[test]
    fn command_line_beats_config_file() {
        let mut file_cfg = AppConfig::default();
        file_cfg.pipeline.now = Some(1);
        file_cfg.pipeline.threads = Some(8);
        let overrides = RunOverrides {
            now: Some(2),
            output: Some(PathBuf::from("/tmp/out")),
            skip_wiki: true,
            no_autofill: true,
            ..RunOverrides::default()
        };
        let cfg = PipelineConfig::resolve(
            PathBuf::from("/work"),
            PathBuf::from("/work/fgo-mapping.toml"),
            &file_cfg,
            &overrides,
        );
        assert_eq!(cfg.now, 2);
        assert_eq!(cfg.threads, 8);
        assert_eq!(cfg.output_dir, PathBuf::from("/tmp/out"));
        assert!(cfg.wiki_dir.is_none());
        assert!(!cfg.autofill);
    }

    #[test]
    fn default_config_file_parses() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = init_default_config(tmp.path(), false).expect("init");
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.pipeline.na_excluded_wars, Some(vec![1002]));
        assert_eq!(cfg.fetch.max_calls, Some(20));

        std::fs::write(&path, "# edited").expect("edit");
        init_default_config(tmp.path(), false).expect("init again");
        assert_eq!(std::fs::read_to_string(&path).expect("read"), "# edited");
    }
}
