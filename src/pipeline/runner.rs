use std::path::Path;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use tracing::info;

use crate::autofill::{autofill, AutofillStats, DEFAULT_RULES};
use crate::fetch::{LocalMirror, RateLimiter, ThrottledFetcher};
use crate::mapping::MappingData;
use crate::merge::{
    load_wiki_bundle, merge_atlas_na_mapping, merge_official, merge_wiki, seed_mapping,
    ApplyStats, OfficialOptions,
};
use crate::progress::ConsoleProgress;
use crate::publish::overrides::{load_hard_overrides, load_repo_mapping};
use crate::publish::{apply_overrides_and_diff, read_published, write_published, HardOverrides, VersionInfo};
use crate::reconcile::{reconcile, ReconcileStats};
use crate::region::Region;
use crate::snapshot::{load_snapshot, MasterSnapshot};
use crate::workers::WorkerPool;

use super::trace::TraceWriter;
use super::PipelineConfig;

const STAGE_COUNT: usize = 7;

#[derive(Clone, Debug)]
pub struct RunSummary {
    pub keys: usize,
    pub official: ApplyStats,
    pub wiki: ApplyStats,
    pub atlas: ApplyStats,
    pub reconcile: ReconcileStats,
    pub autofill: AutofillStats,
    pub version: VersionInfo,
}

/// One batch run: everything a stage needs is owned here and passed down.
pub struct MappingPipeline {
    cfg: PipelineConfig,
    progress: ConsoleProgress,
    pool: WorkerPool,
    trace: TraceWriter,
}

impl MappingPipeline {
    pub fn new(cfg: PipelineConfig, progress: ConsoleProgress) -> anyhow::Result<Self> {
        let pool = WorkerPool::new(cfg.threads)?;
        let trace = TraceWriter::new(cfg.trace_dir.clone(), cfg.trace_stages)?;
        Ok(Self {
            cfg,
            progress,
            pool,
            trace,
        })
    }

    pub fn run(&self) -> anyhow::Result<RunSummary> {
        let cfg = &self.cfg;
        self.progress.info(format!(
            "Snapshots: {} ({} workers)",
            cfg.snapshot_dir.display(),
            self.pool.threads()
        ));

        let jp = load_snapshot(&cfg.snapshot_dir, Region::JP)?.ok_or_else(|| {
            anyhow!("JP snapshot missing: {}", cfg.snapshot_dir.join("JP").display())
        })?;
        let mut mapping = seed_mapping(&jp, &self.pool).context("seed mapping")?;
        self.progress
            .stage(1, STAGE_COUNT, "seed", format!("{} keys", mapping.key_count()));
        self.trace.write_stage(1, "seed", &mapping)?;

        let official = self.official_stage(&jp, &mut mapping)?;
        let wiki = self.wiki_stage(&jp, &mut mapping)?;
        let atlas = self.atlas_stage(&mut mapping)?;

        let reconcile_stats = reconcile(&mut mapping);
        self.progress.stage(
            5,
            STAGE_COUNT,
            "reconcile",
            format!("{} entries moved", reconcile_stats.total()),
        );
        self.trace.write_stage(5, "reconcile", &mapping)?;

        let autofill_stats = if cfg.autofill {
            autofill(&mut mapping, &DEFAULT_RULES)
        } else {
            AutofillStats::default()
        };
        self.progress.stage(
            6,
            STAGE_COUNT,
            "autofill",
            format!(
                "{} filled, {} unresolved, {} discarded",
                autofill_stats.filled, autofill_stats.unresolved, autofill_stats.discarded
            ),
        );
        self.trace.write_stage(6, "autofill", &mapping)?;

        let version = self.publish_stage(mapping.clone())?;
        info!(keys = mapping.key_count(), "run complete");
        Ok(RunSummary {
            keys: mapping.key_count(),
            official,
            wiki,
            atlas,
            reconcile: reconcile_stats,
            autofill: autofill_stats,
            version,
        })
    }

    fn official_stage(
        &self,
        jp: &MasterSnapshot,
        mapping: &mut MappingData,
    ) -> anyhow::Result<ApplyStats> {
        let opts = OfficialOptions {
            now: self.cfg.now,
            na_excluded_wars: self.cfg.na_excluded_wars.clone(),
        };
        let mut total = ApplyStats::default();
        for region in Region::OFFICIAL_MERGE_ORDER {
            let Some(snapshot) = load_snapshot(&self.cfg.snapshot_dir, region)? else {
                info!(%region, "no snapshot, skipping official merge");
                continue;
            };
            let stats = merge_official(jp, &snapshot, mapping, &opts, &self.pool)
                .with_context(|| format!("official merge {region}"))?;
            total.absorb(stats);
            self.trace
                .write_stage(2, &format!("official_{region}"), mapping)?;
        }
        self.progress.stage(
            2,
            STAGE_COUNT,
            "official",
            format!("{} written, {} rejected", total.written, total.rejected),
        );
        Ok(total)
    }

    fn wiki_stage(
        &self,
        jp: &MasterSnapshot,
        mapping: &mut MappingData,
    ) -> anyhow::Result<ApplyStats> {
        let mut total = ApplyStats::default();
        let Some(dir) = self.cfg.wiki_dir.as_ref() else {
            self.progress.stage(3, STAGE_COUNT, "wiki", "skipped");
            return Ok(total);
        };
        let fetcher = self.fetcher(dir);
        for region in Region::WIKI_REGIONS {
            let Some(bundle) = load_wiki_bundle(&fetcher, region)? else {
                info!(%region, "no wiki bundle");
                continue;
            };
            total.absorb(
                merge_wiki(jp, region, &bundle, mapping)
                    .with_context(|| format!("wiki merge {region}"))?,
            );
            self.trace.write_stage(3, &format!("wiki_{region}"), mapping)?;
        }
        self.progress.stage(
            3,
            STAGE_COUNT,
            "wiki",
            format!("{} written, {} rejected", total.written, total.rejected),
        );
        Ok(total)
    }

    fn atlas_stage(&self, mapping: &mut MappingData) -> anyhow::Result<ApplyStats> {
        let Some(dir) = self.cfg.atlas_dir.as_ref() else {
            self.progress.stage(4, STAGE_COUNT, "atlas", "skipped");
            return Ok(ApplyStats::default());
        };
        let stats = merge_atlas_na_mapping(&self.fetcher(dir), mapping).context("atlas merge")?;
        self.progress
            .stage(4, STAGE_COUNT, "atlas", format!("{} written", stats.written));
        self.trace.write_stage(4, "atlas", mapping)?;
        Ok(stats)
    }

    fn publish_stage(&self, mapping: MappingData) -> anyhow::Result<VersionInfo> {
        let cfg = &self.cfg;
        let repo = match cfg.repo_mapping_file.as_deref() {
            Some(path) => load_repo_mapping(path)?,
            None => MappingData::default(),
        };
        let hard = match cfg.override_file.as_deref() {
            Some(path) => load_hard_overrides(path)?,
            None => HardOverrides::new(),
        };
        let previous = read_published(&cfg.published_dir)?;
        let (full, patch) = apply_overrides_and_diff(mapping, &repo, &hard, previous.as_ref())?;

        let full = serde_json::to_value(&full).context("serialize mapping")?;
        let version = write_published(&cfg.output_dir, &full, &patch, cfg.shard_max_bytes, cfg.now)?;
        self.progress.stage(
            7,
            STAGE_COUNT,
            "publish",
            format!("{} files -> {}", version.files.len(), cfg.output_dir.display()),
        );
        Ok(version)
    }

    /// Every source directory is its own endpoint with its own limiter.
    /// Local mirrors never throttle; the retry wrapper is there so a remote
    /// `Fetcher` can replace `LocalMirror` without touching the stages.
    fn fetcher(&self, dir: &Path) -> ThrottledFetcher<LocalMirror> {
        let settings = &self.cfg.fetch;
        ThrottledFetcher::new(
            LocalMirror::new(dir),
            Arc::new(RateLimiter::new(settings.max_calls, settings.window)),
            settings.retry,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};

    use serde_json::{json, Value};

    use crate::config::AppConfig;
    use crate::pipeline::RunOverrides;

    fn write(path: &Path, value: Value) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("mkdir");
        }
        std::fs::write(path, serde_json::to_string(&value).expect("json")).expect("write");
    }

    fn fixture(root: &Path) {
        let export = root.join("export");
        write(
            &export.join("JP/servants.json"),
            json!([
                {"id": 100100, "collectionNo": 2, "name": "アルトリア・ペンドラゴン",
                 "profile": {"cv": "川澄綾子", "illustrator": "武内崇"}},
                {"id": 700100, "collectionNo": 48, "name": "ランスロット"}
            ]),
        );
        write(
            &export.join("JP/wars.json"),
            json!([
                {"id": 100, "name": "冬木", "spots": [
                    {"id": 1, "name": "大橋", "quests": [
                        {"id": 94000101, "name": "強化クエスト ランスロット", "phases": [1]}
                    ]}
                ]}
            ]),
        );
        write(
            &export.join("JP/entities.json"),
            json!([{"id": 1, "name": "ランスロット"}, {"id": 2, "name": "ゴースト"}]),
        );
        write(
            &export.join("NA/servants.json"),
            json!([
                {"id": 100100, "collectionNo": 2, "name": "Altria Pendragon",
                 "profile": {"cv": "Ayako Kawasumi", "illustrator": "Takashi Takeuchi"}}
            ]),
        );
        write(
            &export.join("NA/wars.json"),
            json!([{"id": 100, "name": "Fuyuki"}]),
        );
        write(
            &root.join("wiki/wiki_CN.json"),
            json!({"svt_names": {"ランスロット": "兰斯洛特"}}),
        );
        write(
            &root.join("data/override_mappings.json"),
            json!({"svt_names": {"アルトリア・ペンドラゴン": {"CN": "阿尔托莉雅·潘德拉贡"}}}),
        );
    }

    fn config(root: &Path) -> PipelineConfig {
        let mut file_cfg = AppConfig::default();
        file_cfg.paths.override_file = Some(PathBuf::from("data/override_mappings.json"));
        let overrides = RunOverrides {
            now: Some(1_700_000_000),
            threads: Some(2),
            ..RunOverrides::default()
        };
        PipelineConfig::resolve(
            root.to_path_buf(),
            root.join("fgo-mapping.toml"),
            &file_cfg,
            &overrides,
        )
    }

    #[test]
    fn end_to_end_run_publishes_merged_mapping() {
        let tmp = tempfile::tempdir().expect("tempdir");
        fixture(tmp.path());
        let cfg = config(tmp.path());
        let out = cfg.output_dir.clone();

        let pipeline = MappingPipeline::new(cfg, ConsoleProgress::new(false)).expect("pipeline");
        let summary = pipeline.run().expect("run");
        assert!(summary.official.written > 0);
        assert_eq!(summary.autofill.filled, 1);
        assert!(summary.version.files.contains_key("mappings.json"));

        let doc = read_published(&out).expect("read").expect("published");
        let artoria = &doc["svt_names"]["アルトリア・ペンドラゴン"];
        assert_eq!(artoria["NA"], "Altria Pendragon");
        assert_eq!(artoria["CN"], "阿尔托莉雅·潘德拉贡");
        assert_eq!(doc["svt_names"]["ランスロット"]["CN"], "兰斯洛特");
        assert_eq!(doc["quest_names"]["強化クエスト ランスロット"]["CN"], "强化关卡 兰斯洛特");
        assert_eq!(doc["war_names"]["冬木"]["NA"], "Fuyuki");
        assert_eq!(doc["svt_release"]["NA"], json!([2]));
        assert!(doc["entity_names"].get("ランスロット").is_none());
        assert!(doc["entity_names"].get("ゴースト").is_some());
        assert!(out.join("version.json").exists());
    }

    #[test]
    fn rerun_without_changes_publishes_an_empty_patch() {
        let tmp = tempfile::tempdir().expect("tempdir");
        fixture(tmp.path());

        let first = MappingPipeline::new(config(tmp.path()), ConsoleProgress::new(false))
            .expect("pipeline");
        first.run().expect("first run");
        let second = MappingPipeline::new(config(tmp.path()), ConsoleProgress::new(false))
            .expect("pipeline");
        second.run().expect("second run");

        let out = tmp.path().join("publish");
        let patch: Value = serde_json::from_str(
            &std::fs::read_to_string(out.join("mappings_patch.json")).expect("patch"),
        )
        .expect("json");
        assert_eq!(patch, json!({}));
    }

    #[test]
    fn repo_tables_go_through_reconciliation() {
        let tmp = tempfile::tempdir().expect("tempdir");
        fixture(tmp.path());
        write(
            &tmp.path().join("data/mappings.json"),
            json!({
                "trait": {"94000046": {"NA": "Generic"}, "2": {"NA": "Female"}},
                "event_trait": {"94000046": {"NA": "Event Trait"}},
                "event_names": {"冬木": {"NA": "Fuyuki event"}}
            }),
        );
        let mut cfg = config(tmp.path());
        cfg.repo_mapping_file = Some(tmp.path().join("data/mappings.json"));
        let out = cfg.output_dir.clone();

        MappingPipeline::new(cfg, ConsoleProgress::new(false))
            .expect("pipeline")
            .run()
            .expect("run");

        let doc = read_published(&out).expect("read").expect("published");
        assert!(doc["trait"].get("94000046").is_none());
        assert_eq!(doc["trait"]["2"]["NA"], "Female");
        assert_eq!(doc["event_trait"]["94000046"]["NA"], "Event Trait");
        assert!(doc["event_names"].get("冬木").is_none());
        assert_eq!(doc["war_names"]["冬木"]["NA"], "Fuyuki");
    }

    #[test]
    fn missing_jp_snapshot_is_fatal() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let pipeline = MappingPipeline::new(config(tmp.path()), ConsoleProgress::new(false))
            .expect("pipeline");
        let err = pipeline.run().expect_err("must fail");
        assert!(format!("{err:#}").contains("JP snapshot missing"));
        assert!(!tmp.path().join("publish").exists());
    }
}
