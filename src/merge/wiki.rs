//! Community wiki translations. Wiki text never replaces a value already
//! present and is additionally screened for leaked datestamps.

use std::collections::BTreeMap;

use anyhow::bail;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::proposal::{apply_edits, ApplyMode, ApplyStats, EditBuffer};
use crate::fetch::{fetch_json, Fetcher};
use crate::mapping::{MappingData, TextTable};
use crate::region::Region;
use crate::snapshot::{MasterSnapshot, Skill};

/// Limit-break count of a craft essence's base ability rank.
const BASE_RANK_LIMIT: i32 = 0;
/// Limit-break count of a craft essence's max-limit-broken ability rank.
const MAX_RANK_LIMIT: i32 = 4;

/// One region's wiki bundle: `{jp_text: translated_text}` per concept, plus
/// ability descriptions keyed by collection number.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WikiTranslation {
    pub svt_names: BTreeMap<String, String>,
    pub skill_names: BTreeMap<String, String>,
    pub td_names: BTreeMap<String, String>,
    pub td_ruby: BTreeMap<String, String>,
    pub ce_names: BTreeMap<String, String>,
    pub cc_names: BTreeMap<String, String>,
    pub item_names: BTreeMap<String, String>,
    pub event_names: BTreeMap<String, String>,
    pub quest_names: BTreeMap<String, String>,
    pub spot_names: BTreeMap<String, String>,
    pub costume_names: BTreeMap<String, String>,
    pub costume_details: BTreeMap<String, String>,
    pub ce_skill_des: BTreeMap<i32, String>,
    pub ce_skill_des_max: BTreeMap<i32, String>,
    pub cc_skill_des: BTreeMap<i32, String>,
}

impl WikiTranslation {
    fn text_maps(&self) -> [(TextTable, &BTreeMap<String, String>); 12] {
        [
            (TextTable::SvtNames, &self.svt_names),
            (TextTable::SkillNames, &self.skill_names),
            (TextTable::TdNames, &self.td_names),
            (TextTable::TdRuby, &self.td_ruby),
            (TextTable::CeNames, &self.ce_names),
            (TextTable::CcNames, &self.cc_names),
            (TextTable::ItemNames, &self.item_names),
            (TextTable::EventNames, &self.event_names),
            (TextTable::QuestNames, &self.quest_names),
            (TextTable::SpotNames, &self.spot_names),
            (TextTable::CostumeNames, &self.costume_names),
            (TextTable::CostumeDetail, &self.costume_details),
        ]
    }
}

pub fn bundle_key(region: Region) -> String {
    format!("wiki_{region}.json")
}

/// Reads `wiki_<REGION>.json`; a region without a bundle yields `None`.
pub fn load_wiki_bundle(
    fetcher: &dyn Fetcher,
    region: Region,
) -> anyhow::Result<Option<WikiTranslation>> {
    fetch_json(fetcher, &bundle_key(region))
}

pub fn merge_wiki(
    jp: &MasterSnapshot,
    region: Region,
    bundle: &WikiTranslation,
    mapping: &mut MappingData,
) -> anyhow::Result<ApplyStats> {
    let mut buf = EditBuffer::new();
    for (table, entries) in bundle.text_maps() {
        for (key, value) in entries {
            buf.text(table, key, value, true);
        }
    }

    for (no, text) in &bundle.ce_skill_des {
        if let Some(skill) = ce_first_skill(jp, *no, BASE_RANK_LIMIT)? {
            buf.text(TextTable::SkillDetail, &skill.unmodified_detail, text, true);
        }
    }
    for (no, text) in &bundle.ce_skill_des_max {
        if let Some(skill) = ce_first_skill(jp, *no, MAX_RANK_LIMIT)? {
            buf.text(TextTable::SkillDetail, &skill.unmodified_detail, text, true);
        }
    }
    for (no, text) in &bundle.cc_skill_des {
        let Some(cc) = jp.command_code_by_no(*no) else {
            continue;
        };
        if let Some(skill) = single_skill(&cc.skills, BASE_RANK_LIMIT, || format!("command code {no}"))? {
            buf.text(TextTable::SkillDetail, &skill.unmodified_detail, text, true);
        }
    }

    let edits = buf.into_edits();
    let stats = apply_edits(mapping, region, ApplyMode::Wiki, &edits);
    info!(
        %region,
        proposals = edits.len(),
        written = stats.written,
        rejected = stats.rejected,
        "wiki merge"
    );
    Ok(stats)
}

fn ce_first_skill(jp: &MasterSnapshot, no: i32, limit: i32) -> anyhow::Result<Option<&Skill>> {
    match jp.craft_essence_by_no(no) {
        Some(ce) => single_skill(&ce.skills, limit, || format!("craft essence {no}")),
        None => Ok(None),
    }
}

/// The first ability at the given rank. Several candidates mean the
/// snapshot no longer matches the rank layout this merge relies on.
fn single_skill(
    skills: &[Skill],
    limit: i32,
    owner: impl Fn() -> String,
) -> anyhow::Result<Option<&Skill>> {
    let mut found = skills
        .iter()
        .filter(|s| s.num == 1 && s.cond_limit_count == limit);
    let first = found.next();
    if found.next().is_some() {
        bail!("{}: more than one first ability with limit count {limit}", owner());
    }
    Ok(first)
}
