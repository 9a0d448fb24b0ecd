//! NA translations from the third-party community mapping repository.

use std::collections::BTreeMap;

use tracing::{debug, info};

use super::proposal::{apply_edits, ApplyMode, ApplyStats, EditBuffer};
use crate::fetch::{fetch_json, Fetcher};
use crate::mapping::{MappingData, TextTable};
use crate::region::Region;

/// Source files read from the repository and the table each one feeds.
pub const ATLAS_SOURCES: &[(&str, TextTable)] = &[
    ("servant_names.json", TextTable::SvtNames),
    ("np_names.json", TextTable::TdNames),
    ("skill_names.json", TextTable::SkillNames),
    ("skill_detail.json", TextTable::SkillDetail),
    ("ce_names.json", TextTable::CeNames),
    ("cc_names.json", TextTable::CcNames),
    ("mc_names.json", TextTable::McNames),
    ("item_names.json", TextTable::ItemNames),
    ("event_names.json", TextTable::EventNames),
    ("war_names.json", TextTable::WarNames),
    ("quest_names.json", TextTable::QuestNames),
    ("spot_names.json", TextTable::SpotNames),
    ("entity_names.json", TextTable::EntityNames),
    ("bgm_names.json", TextTable::BgmNames),
    ("buff_names.json", TextTable::BuffNames),
    ("buff_detail.json", TextTable::BuffDetail),
    ("func_popuptext.json", TextTable::FuncPopuptext),
    ("cv_names.json", TextTable::CvNames),
    ("illustrator_names.json", TextTable::IllustratorNames),
    ("voice_names.json", TextTable::VoiceLineNames),
];

/// Event banners wrap long titles across lines.
const NEWLINE_STRIPPED: TextTable = TextTable::EventNames;

pub fn merge_atlas_na_mapping(
    fetcher: &dyn Fetcher,
    mapping: &mut MappingData,
) -> anyhow::Result<ApplyStats> {
    let mut buf = EditBuffer::new();
    let mut files = 0usize;
    for (file, table) in ATLAS_SOURCES {
        let Some(entries) = fetch_json::<BTreeMap<String, Option<String>>>(fetcher, file)? else {
            debug!(%file, "atlas source missing");
            continue;
        };
        files += 1;
        for (key, value) in entries {
            let Some(value) = value else {
                continue;
            };
            let value = if *table == NEWLINE_STRIPPED {
                value.replace('\n', "")
            } else {
                value
            };
            buf.text(*table, &key, &value, true);
        }
    }

    let edits = buf.into_edits();
    let stats = apply_edits(mapping, Region::NA, ApplyMode::Official, &edits);
    info!(files, proposals = edits.len(), written = stats.written, "atlas NA merge");
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::LocalMirror;

    #[test]
    fn merges_listed_files_only_and_strips_event_newlines() {
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            tmp.path().join("event_names.json"),
            r#"{"ぐだぐだ明治維新": "GUDAGUDA Meiji\nRestoration", "空": null}"#,
        )
        .expect("write");
        std::fs::write(
            tmp.path().join("servant_names.json"),
            r#"{"マシュ": "Mash\nKyrielight"}"#,
        )
        .expect("write");
        std::fs::write(tmp.path().join("unlisted.json"), r#"{"x": "y"}"#).expect("write");

        let mut mapping = MappingData::default();
        mapping.svt_names.update_text("ジャンヌ", Region::NA, "Jeanne", true);
        merge_atlas_na_mapping(&LocalMirror::new(tmp.path()), &mut mapping).expect("merge");

        assert_eq!(
            mapping.event_names.resolve("ぐだぐだ明治維新", Region::NA),
            Some("GUDAGUDA MeijiRestoration")
        );
        assert!(!mapping.event_names.contains_key("空"));
        assert_eq!(mapping.svt_names.resolve("マシュ", Region::NA), Some("Mash\nKyrielight"));
        assert_eq!(mapping.svt_names.resolve("ジャンヌ", Region::NA), Some("Jeanne"));
    }
}
