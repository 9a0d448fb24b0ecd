use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::info;

use super::patch::apply_patch;

pub const MAPPING_FILE: &str = "mappings.json";
pub const PATCH_FILE: &str = "mappings_patch.json";
pub const VERSION_FILE: &str = "version.json";
const STAGING_DIR: &str = ".staging";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FileInfo {
    pub size: u64,
    pub sha256: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VersionInfo {
    pub timestamp: i64,
    pub utc: String,
    pub files: BTreeMap<String, FileInfo>,
}

/// Splits a document into parts no larger than `max_bytes` where possible.
/// Whole tables are packed in key order; a table too large on its own is cut
/// into contiguous key ranges. Merging the parts key-wise restores `doc`.
pub fn shard_document(doc: &Map<String, Value>, max_bytes: usize) -> anyhow::Result<Vec<Value>> {
    let total = serde_json::to_vec(doc).context("serialize mapping")?.len();
    if total <= max_bytes {
        return Ok(vec![Value::Object(doc.clone())]);
    }

    let mut shards = Vec::new();
    let mut current = Map::new();
    let mut current_size = 0usize;
    for (table, value) in doc {
        let size = json_len(value)? + table.len() + 4;
        if current_size + size > max_bytes && !current.is_empty() {
            shards.push(Value::Object(std::mem::take(&mut current)));
            current_size = 0;
        }
        match value {
            Value::Object(entries) if size > max_bytes => {
                for part in split_table(entries, max_bytes.saturating_sub(table.len() + 4))? {
                    let mut shard = Map::new();
                    shard.insert(table.clone(), Value::Object(part));
                    shards.push(Value::Object(shard));
                }
            }
            _ => {
                current.insert(table.clone(), value.clone());
                current_size += size;
            }
        }
    }
    if !current.is_empty() {
        shards.push(Value::Object(current));
    }
    Ok(shards)
}

fn split_table(entries: &Map<String, Value>, max_bytes: usize) -> anyhow::Result<Vec<Map<String, Value>>> {
    let mut parts = Vec::new();
    let mut part = Map::new();
    let mut part_size = 2usize;
    for (key, value) in entries {
        let size = json_len(value)? + key.len() + 4;
        if part_size + size > max_bytes && !part.is_empty() {
            parts.push(std::mem::take(&mut part));
            part_size = 2;
        }
        part.insert(key.clone(), value.clone());
        part_size += size;
    }
    if !part.is_empty() {
        parts.push(part);
    }
    Ok(parts)
}

fn json_len(value: &Value) -> anyhow::Result<usize> {
    Ok(serde_json::to_vec(value).context("serialize mapping")?.len())
}

fn shard_name(index: usize, count: usize) -> String {
    if count == 1 {
        MAPPING_FILE.to_string()
    } else {
        format!("mappings.{}.json", index + 1)
    }
}

fn is_mapping_file(name: &str) -> bool {
    name == MAPPING_FILE
        || name
            .strip_prefix("mappings.")
            .and_then(|rest| rest.strip_suffix(".json"))
            .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

/// Writes the full document (sharded), the patch and `version.json`.
/// Everything is staged first; the output directory only changes once every
/// file has been written.
pub fn write_published(
    out_dir: &Path,
    full: &Value,
    patch: &Value,
    shard_max_bytes: usize,
    timestamp: i64,
) -> anyhow::Result<VersionInfo> {
    let doc = full
        .as_object()
        .ok_or_else(|| anyhow!("mapping document is not an object"))?;
    let staging = out_dir.join(STAGING_DIR);
    if staging.exists() {
        std::fs::remove_dir_all(&staging)
            .with_context(|| format!("clear staging dir: {}", staging.display()))?;
    }
    std::fs::create_dir_all(&staging)
        .with_context(|| format!("create staging dir: {}", staging.display()))?;

    let shards = shard_document(doc, shard_max_bytes)?;
    let mut files = BTreeMap::new();
    let mut staged: Vec<String> = Vec::new();
    for (idx, shard) in shards.iter().enumerate() {
        let name = shard_name(idx, shards.len());
        let bytes = serde_json::to_vec(shard).context("serialize mapping shard")?;
        files.insert(name.clone(), stage(&staging, &name, &bytes)?);
        staged.push(name);
    }
    let bytes = serde_json::to_vec(patch).context("serialize patch")?;
    files.insert(PATCH_FILE.to_string(), stage(&staging, PATCH_FILE, &bytes)?);
    staged.push(PATCH_FILE.to_string());

    let utc = DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .ok_or_else(|| anyhow!("timestamp out of range: {timestamp}"))?;
    let version = VersionInfo {
        timestamp,
        utc,
        files,
    };
    let bytes = serde_json::to_vec_pretty(&version).context("serialize version")?;
    stage(&staging, VERSION_FILE, &bytes)?;
    staged.push(VERSION_FILE.to_string());

    let previous = list_mapping_files(out_dir)?;
    for name in &staged {
        let from = staging.join(name);
        let to = out_dir.join(name);
        std::fs::rename(&from, &to)
            .with_context(|| format!("publish {} -> {}", from.display(), to.display()))?;
    }
    // Old shards go only once the new set is in place.
    for stale in previous.iter().filter(|name| !staged.contains(name)) {
        let path = out_dir.join(stale);
        std::fs::remove_file(&path).with_context(|| format!("remove stale: {}", path.display()))?;
    }
    std::fs::remove_dir_all(&staging)
        .with_context(|| format!("remove staging dir: {}", staging.display()))?;

    info!(
        dir = %out_dir.display(),
        shards = shards.len(),
        files = version.files.len(),
        "published mapping"
    );
    Ok(version)
}

fn stage(dir: &Path, name: &str, bytes: &[u8]) -> anyhow::Result<FileInfo> {
    let path = dir.join(name);
    std::fs::write(&path, bytes).with_context(|| format!("write: {}", path.display()))?;
    Ok(FileInfo {
        size: bytes.len() as u64,
        sha256: hex::encode(Sha256::digest(bytes)),
    })
}

fn list_mapping_files(dir: &Path) -> anyhow::Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("read dir: {}", dir.display()))? {
        let entry = entry.with_context(|| format!("read dir: {}", dir.display()))?;
        if let Some(name) = entry.file_name().to_str() {
            if is_mapping_file(name) {
                names.push(name.to_string());
            }
        }
    }
    names.sort_by_key(|n| shard_index(n));
    Ok(names)
}

fn shard_index(name: &str) -> usize {
    name.strip_prefix("mappings.")
        .and_then(|rest| rest.strip_suffix(".json"))
        .and_then(|n| n.parse().ok())
        .unwrap_or(0)
}

/// Reads a published document, merging shards in order. `None` when the
/// directory holds no mapping files.
pub fn read_published(dir: &Path) -> anyhow::Result<Option<Value>> {
    let names = list_mapping_files(dir)?;
    if names.is_empty() {
        return Ok(None);
    }
    let mut doc = Value::Object(Map::new());
    for name in names {
        let path: PathBuf = dir.join(&name);
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("read published: {}", path.display()))?;
        let part: Value = serde_json::from_str(text.trim_start_matches('\u{FEFF}'))
            .with_context(|| format!("parse published: {}", path.display()))?;
        apply_patch(&mut doc, &part);
    }
    Ok(Some(doc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn big_doc() -> Value {
        let mut svt = Map::new();
        for i in 0..50 {
            svt.insert(format!("サーヴァント{i:03}"), json!({"NA": format!("Servant number {i}")}));
        }
        json!({
            "svt_names": Value::Object(svt),
            "trait": {"1": {"NA": "Male"}},
            "item_names": {"剣の輝石": {"NA": "Gem of Saber"}},
        })
    }

    #[test]
    fn small_documents_are_not_sharded() {
        let doc = json!({"a": {"b": {"NA": "c"}}});
        let shards = shard_document(doc.as_object().expect("object"), 1 << 20).expect("shard");
        assert_eq!(shards, vec![doc]);
    }

    #[test]
    fn oversized_tables_split_into_key_ranges_that_merge_back() {
        let doc = big_doc();
        let shards = shard_document(doc.as_object().expect("object"), 400).expect("shard");
        assert!(shards.len() > 2);
        for shard in &shards {
            let svt = shard.get("svt_names").and_then(Value::as_object);
            if let Some(svt) = svt {
                assert!(svt.len() < 50);
            }
        }
        let mut merged = Value::Object(Map::new());
        for shard in &shards {
            apply_patch(&mut merged, shard);
        }
        assert_eq!(merged, doc);
    }

    #[test]
    fn publishes_versioned_files_and_reads_them_back() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let out = tmp.path().join("out");
        std::fs::create_dir_all(&out).expect("mkdir");
        std::fs::write(out.join("mappings.99.json"), "{}").expect("stale");

        let doc = big_doc();
        let patch = json!({"trait": {"1": {"NA": "Male"}}});
        let version = write_published(&out, &doc, &patch, 400, 1_700_000_000).expect("write");

        assert!(!out.join("mappings.99.json").exists());
        assert!(!out.join(STAGING_DIR).exists());
        assert!(version.files.contains_key(PATCH_FILE));
        assert_eq!(version.utc, "2023-11-14 22:13:20");
        let patch_info = &version.files[PATCH_FILE];
        let patch_bytes = std::fs::read(out.join(PATCH_FILE)).expect("patch");
        assert_eq!(patch_info.size, patch_bytes.len() as u64);
        assert_eq!(patch_info.sha256, hex::encode(Sha256::digest(&patch_bytes)));

        let back = read_published(&out).expect("read").expect("present");
        assert_eq!(back, doc);
    }

    #[test]
    fn single_file_output_replaces_old_shards() {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::write(tmp.path().join("mappings.1.json"), r#"{"old": {}}"#).expect("stale");
        std::fs::write(tmp.path().join("mappings.2.json"), r#"{"older": {}}"#).expect("stale");
        let doc = json!({"svt_names": {"マシュ": {"NA": "Mash"}}});
        write_published(tmp.path(), &doc, &json!({}), 1 << 20, 0).expect("write");

        assert!(tmp.path().join(MAPPING_FILE).exists());
        assert!(!tmp.path().join("mappings.2.json").exists());
        assert_eq!(read_published(tmp.path()).expect("read"), Some(doc));
    }

    #[test]
    fn failed_publish_keeps_previous_shards() {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::write(tmp.path().join("mappings.1.json"), r#"{"old": {}}"#).expect("shard");
        std::fs::write(tmp.path().join("mappings.2.json"), r#"{"older": {}}"#).expect("shard");
        // a non-empty directory cannot be replaced by the staged patch file
        let blocker = tmp.path().join(PATCH_FILE);
        std::fs::create_dir_all(&blocker).expect("mkdir");
        std::fs::write(blocker.join("keep"), "x").expect("write");

        let doc = json!({"svt_names": {"マシュ": {"NA": "Mash"}}});
        assert!(write_published(tmp.path(), &doc, &json!({}), 1 << 20, 0).is_err());
        assert!(tmp.path().join("mappings.1.json").exists());
        assert!(tmp.path().join("mappings.2.json").exists());
    }

    #[test]
    fn republishing_the_same_layout_keeps_the_file() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let first = json!({"svt_names": {"マシュ": {"NA": "Mash"}}});
        write_published(tmp.path(), &first, &json!({}), 1 << 20, 0).expect("first");
        let second = json!({"svt_names": {"マシュ": {"NA": "Mash Kyrielight"}}});
        write_published(tmp.path(), &second, &json!({}), 1 << 20, 0).expect("second");

        assert_eq!(read_published(tmp.path()).expect("read"), Some(second));
    }

    #[test]
    fn recognises_mapping_file_names() {
        assert!(is_mapping_file("mappings.json"));
        assert!(is_mapping_file("mappings.12.json"));
        assert!(!is_mapping_file("mappings_patch.json"));
        assert!(!is_mapping_file("mappings..json"));
    }
}
