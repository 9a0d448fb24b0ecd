use std::path::PathBuf;

use anyhow::Context;

use crate::mapping::MappingData;

/// Optional per-stage dumps of the mapping store, for diffing stages.
pub struct TraceWriter {
    /// `None` when tracing is off.
    dir: Option<PathBuf>,
}

impl TraceWriter {
    pub fn new(dir: PathBuf, enabled: bool) -> anyhow::Result<Self> {
        if !enabled {
            return Ok(Self { dir: None });
        }
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create trace dir: {}", dir.display()))?;
        Ok(Self { dir: Some(dir) })
    }

    pub fn write_stage(&self, index: usize, stage: &str, mapping: &MappingData) -> anyhow::Result<()> {
        let Some(dir) = self.dir.as_ref() else {
            return Ok(());
        };
        let path = dir.join(stage_file_name(index, stage));
        let text = serde_json::to_string_pretty(mapping).context("serialize trace")?;
        std::fs::write(&path, text).with_context(|| format!("write trace: {}", path.display()))
    }
}

/// `stage_02.official_CN.json`; anything but `[A-Za-z0-9_-]` in the stage
/// label becomes `_`.
fn stage_file_name(index: usize, stage: &str) -> String {
    let label: String = stage
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!("stage_{index:02}.{label}.json")
}
