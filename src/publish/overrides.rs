//! Repository-curated overrides on top of the computed mapping, and the
//! additive patch against the previously published document.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::info;

use super::patch::diff;
use crate::mapping::{MappingData, TextTable, TraitTable};
use crate::reconcile::reconcile;
use crate::region::RegionValue;

/// Tables where the repository copy wins over computed values.
pub const AUTHORITATIVE_TABLES: &[&str] = &["trait", "event_trait", "field_trait", "enums"];

/// `{table: {key: {region: value}}}`; every listed slot wins unconditionally.
/// Open-extension groups are addressed as `enums.<group>` / `misc.<group>`.
pub type HardOverrides = BTreeMap<String, BTreeMap<String, RegionValue<String>>>;

pub fn load_repo_mapping(path: &Path) -> anyhow::Result<MappingData> {
    read_json(path)
}

pub fn load_hard_overrides(path: &Path) -> anyhow::Result<HardOverrides> {
    read_json(path)
}

fn read_json<T: DeserializeOwned + Default>(path: &Path) -> anyhow::Result<T> {
    if !path.exists() {
        info!(path = %path.display(), "override file not present");
        return Ok(T::default());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read overrides: {}", path.display()))?;
    serde_json::from_str(text.trim_start_matches('\u{FEFF}'))
        .with_context(|| format!("parse overrides: {}", path.display()))
}

pub fn apply_hard_overrides(mapping: &mut MappingData, hard: &HardOverrides) -> anyhow::Result<usize> {
    let mut applied = 0usize;
    for (table, entries) in hard {
        for (key, value) in entries {
            slot_for(mapping, table, key)?.overwrite_from(value);
            applied += 1;
        }
    }
    Ok(applied)
}

fn slot_for<'a>(
    mapping: &'a mut MappingData,
    table: &str,
    key: &str,
) -> anyhow::Result<&'a mut RegionValue<String>> {
    if let Ok(text) = table.parse::<TextTable>() {
        return Ok(mapping.text_mut(text).entry_mut(key.to_string()));
    }
    if let Ok(traits) = table.parse::<TraitTable>() {
        let id: i32 = key
            .parse()
            .with_context(|| format!("override {table}: trait id {key:?}"))?;
        return Ok(mapping.traits_table_mut(traits).entry_mut(id));
    }
    let groups = match table.split_once('.') {
        Some(("enums", group)) => Some((&mut mapping.enums, group)),
        Some(("misc", group)) => Some((&mut mapping.misc, group)),
        _ => None,
    };
    match groups {
        Some((groups, group)) => Ok(groups
            .entry(group.to_string())
            .or_default()
            .entry_mut(key.to_string())),
        None => bail!("override targets unknown table {table:?}"),
    }
}

/// Merges `repo` over `computed`, reconciles the merged tables, applies
/// `hard`, and diffs the result against `previous` (an empty document when
/// there is none). Repo keys go through the same cross-table rules as
/// computed ones; hard overrides land last and are never moved.
pub fn apply_overrides_and_diff(
    mut computed: MappingData,
    repo: &MappingData,
    hard: &HardOverrides,
    previous: Option<&Value>,
) -> anyhow::Result<(MappingData, Value)> {
    computed.merge_with(repo, |table| !AUTHORITATIVE_TABLES.contains(&table));
    let moved = reconcile(&mut computed).total();
    let applied = apply_hard_overrides(&mut computed, hard)?;

    let full = serde_json::to_value(&computed).context("serialize mapping")?;
    let empty = Value::Object(serde_json::Map::new());
    let patch = diff(&full, previous.unwrap_or(&empty)).unwrap_or(empty);
    info!(
        repo_entries_moved = moved,
        hard_overrides = applied,
        patched_tables = patch.as_object().map_or(0, serde_json::Map::len),
        "overrides applied"
    );
    Ok((computed, patch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::Region;
    use serde_json::json;

    fn region_value(region: Region, value: &str) -> RegionValue<String> {
        let mut v = RegionValue::new();
        v.set(region, value.to_string());
        v
    }

    #[test]
    fn computed_wins_except_for_authoritative_tables() {
        let mut computed = MappingData::default();
        computed.svt_names.update_text("マシュ", Region::NA, "Mash", true);
        computed.traits.update(2, Region::NA, "female".to_string(), true);

        let mut repo = MappingData::default();
        repo.svt_names.update_text("マシュ", Region::NA, "Mashu", true);
        repo.svt_names.update_text("マシュ", Region::CN, "玛修", true);
        repo.traits.update(2, Region::NA, "Female".to_string(), true);

        let (full, _) =
            apply_overrides_and_diff(computed, &repo, &HardOverrides::new(), None).expect("apply");
        assert_eq!(full.svt_names.resolve("マシュ", Region::NA), Some("Mash"));
        assert_eq!(full.svt_names.resolve("マシュ", Region::CN), Some("玛修"));
        assert_eq!(
            full.traits.get(&2).and_then(|v| v.get(Region::NA)).map(String::as_str),
            Some("Female")
        );
    }

    #[test]
    fn hard_overrides_win_over_everything() {
        let mut computed = MappingData::default();
        computed.svt_names.update_text("マシュ", Region::NA, "Mash", true);
        let mut hard = HardOverrides::new();
        hard.entry("svt_names".into())
            .or_default()
            .insert("マシュ".into(), region_value(Region::NA, "Mash Kyrielight"));
        hard.entry("trait".into())
            .or_default()
            .insert("301".into(), region_value(Region::NA, "Dragon"));
        hard.entry("enums.svt_class".into())
            .or_default()
            .insert("1".into(), region_value(Region::NA, "Saber"));

        let (full, _) =
            apply_overrides_and_diff(computed, &MappingData::default(), &hard, None).expect("apply");
        assert_eq!(full.svt_names.resolve("マシュ", Region::NA), Some("Mash Kyrielight"));
        assert!(full.traits.contains_key(&301));
        assert_eq!(full.enums["svt_class"].resolve("1", Region::NA), Some("Saber"));
    }

    #[test]
    fn repo_entries_are_reconciled_before_publishing() {
        let mut computed = MappingData::default();
        computed.war_names.register("冬木");

        let mut repo = MappingData::default();
        repo.traits.update(94000046, Region::NA, "Generic".to_string(), true);
        repo.event_trait.update(94000046, Region::NA, "Event Trait".to_string(), true);
        repo.event_names.update_text("冬木", Region::NA, "Fuyuki event", true);

        let (full, patch) =
            apply_overrides_and_diff(computed, &repo, &HardOverrides::new(), None).expect("apply");
        assert!(!full.traits.contains_key(&94000046));
        assert!(full.event_trait.contains_key(&94000046));
        assert!(!full.event_names.contains_key("冬木"));
        assert_eq!(full.war_names.resolve("冬木", Region::NA), Some("Fuyuki event"));
        assert!(patch["trait"].get("94000046").is_none());
    }

    #[test]
    fn hard_overrides_are_not_reconciled_away() {
        let mut repo = MappingData::default();
        repo.event_trait.update(301, Region::NA, "Event Dragon".to_string(), true);
        let mut hard = HardOverrides::new();
        hard.entry("trait".into())
            .or_default()
            .insert("301".into(), region_value(Region::NA, "Dragon"));

        let (full, _) =
            apply_overrides_and_diff(MappingData::default(), &repo, &hard, None).expect("apply");
        assert!(full.traits.contains_key(&301));
    }

    #[test]
    fn unknown_override_tables_are_fatal() {
        let mut hard = HardOverrides::new();
        hard.entry("svt_name".into())
            .or_default()
            .insert("x".into(), region_value(Region::NA, "y"));
        assert!(apply_hard_overrides(&mut MappingData::default(), &hard).is_err());
    }

    #[test]
    fn patch_lists_only_changes_against_previous() {
        let mut computed = MappingData::default();
        computed.svt_names.update_text("マシュ", Region::NA, "Mash", true);
        computed.svt_names.update_text("ジャンヌ", Region::NA, "Jeanne", true);
        let previous = json!({"svt_names": {"マシュ": {"NA": "Mash"}}});

        let (_, patch) = apply_overrides_and_diff(
            computed,
            &MappingData::default(),
            &HardOverrides::new(),
            Some(&previous),
        )
        .expect("apply");
        assert_eq!(patch["svt_names"], json!({"ジャンヌ": {"NA": "Jeanne"}}));
    }
}
