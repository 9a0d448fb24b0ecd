use tracing::debug;

use crate::mapping::{MappingData, PriorityMap, PriorityTable, TextTable};
use crate::region::Region;
use crate::textutil::{contains_kana, is_year_like};

/// A single change proposed by a merger. Proposals are computed on worker
/// threads and applied to the store afterwards, in the order produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Edit {
    Text {
        table: TextTable,
        key: String,
        value: String,
        skip_exists: bool,
    },
    /// Key without a translation, so later stages can resolve it.
    Register { table: TextTable, key: String },
    Priority {
        table: PriorityTable,
        svt_id: i32,
        priorities: PriorityMap,
    },
}

/// How a batch of edits is written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApplyMode {
    /// JP baseline: every key is registered, text values are not stored.
    Seed,
    Official,
    /// Official rules plus the year-like guard.
    Wiki,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ApplyStats {
    pub written: usize,
    pub rejected: usize,
    pub unchanged: usize,
}

impl ApplyStats {
    pub fn absorb(&mut self, other: ApplyStats) {
        self.written += other.written;
        self.rejected += other.rejected;
        self.unchanged += other.unchanged;
    }
}

/// Collects edits for one entity; call sites pick `skip_exists` per field.
#[derive(Debug, Default)]
pub struct EditBuffer {
    edits: Vec<Edit>,
}

impl EditBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&mut self, table: TextTable, key: &str, value: &str, skip_exists: bool) {
        if key.is_empty() {
            return;
        }
        self.edits.push(Edit::Text {
            table,
            key: key.to_string(),
            value: value.to_string(),
            skip_exists,
        });
    }

    pub fn register(&mut self, table: TextTable, key: &str) {
        if key.is_empty() {
            return;
        }
        self.edits.push(Edit::Register {
            table,
            key: key.to_string(),
        });
    }

    pub fn priority(&mut self, table: PriorityTable, svt_id: i32, priorities: PriorityMap) {
        if priorities.is_empty() {
            return;
        }
        self.edits.push(Edit::Priority {
            table,
            svt_id,
            priorities,
        });
    }

    pub fn into_edits(self) -> Vec<Edit> {
        self.edits
    }
}

/// Why a text proposal was refused.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    Empty,
    SameAsKey,
    Kana,
    YearLike,
}

/// The write guard shared by every merger.
pub fn check_text(
    mapping: &MappingData,
    mode: ApplyMode,
    table: TextTable,
    region: Region,
    key: &str,
    value: &str,
) -> Result<(), Rejection> {
    if key.is_empty() || value.is_empty() {
        return Err(Rejection::Empty);
    }
    if value == key {
        return Err(Rejection::SameAsKey);
    }
    if region.rejects_kana() && contains_kana(value) {
        return Err(Rejection::Kana);
    }
    if mode == ApplyMode::Wiki && is_year_like(value) {
        let has_cn = mapping
            .text(table)
            .get(key)
            .and_then(|v| v.get(Region::CN))
            .is_some_and(|v| !v.is_empty());
        if has_cn {
            return Err(Rejection::YearLike);
        }
    }
    Ok(())
}

pub fn apply_edits(
    mapping: &mut MappingData,
    region: Region,
    mode: ApplyMode,
    edits: &[Edit],
) -> ApplyStats {
    let mut stats = ApplyStats::default();
    for edit in edits {
        match edit {
            Edit::Text { table, key, .. } | Edit::Register { table, key }
                if mode == ApplyMode::Seed =>
            {
                mapping.text_mut(*table).register(key);
            }
            Edit::Register { table, key } => {
                mapping.text_mut(*table).register(key);
            }
            Edit::Text {
                table,
                key,
                value,
                skip_exists,
            } => match check_text(mapping, mode, *table, region, key, value) {
                Ok(()) => {
                    if mapping
                        .text_mut(*table)
                        .update_text(key, region, value, *skip_exists)
                    {
                        stats.written += 1;
                    } else {
                        stats.unchanged += 1;
                    }
                }
                Err(Rejection::Empty | Rejection::SameAsKey) => stats.unchanged += 1,
                Err(reason) => {
                    debug!(table = table.name(), %key, %value, %region, ?reason, "rejected proposal");
                    stats.rejected += 1;
                }
            },
            Edit::Priority {
                table,
                svt_id,
                priorities,
            } => {
                let target = if mode == ApplyMode::Seed { Region::JP } else { region };
                if mapping
                    .priority_mut(*table)
                    .update(*svt_id, target, priorities.clone(), false)
                {
                    stats.written += 1;
                } else {
                    stats.unchanged += 1;
                }
            }
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(table: TextTable, key: &str, value: &str, skip_exists: bool) -> Edit {
        Edit::Text {
            table,
            key: key.to_string(),
            value: value.to_string(),
            skip_exists,
        }
    }

    #[test]
    fn kana_in_chinese_values_is_rejected_even_for_empty_slots() {
        let mut mapping = MappingData::default();
        let stats = apply_edits(
            &mut mapping,
            Region::CN,
            ApplyMode::Official,
            &[text(TextTable::QuestNames, "クエスト", "クエスト", true)],
        );
        assert_eq!(stats.written, 0);
        let stats = apply_edits(
            &mut mapping,
            Region::CN,
            ApplyMode::Official,
            &[text(TextTable::QuestNames, "ボス戦", "ボス戦クエスト", true)],
        );
        assert_eq!(stats.rejected, 1);
        assert_eq!(mapping.quest_names.resolve("ボス戦", Region::CN), None);

        let stats = apply_edits(
            &mut mapping,
            Region::NA,
            ApplyMode::Official,
            &[text(TextTable::QuestNames, "ボス戦", "Boss クエスト", true)],
        );
        assert_eq!(stats.written, 1);
    }

    #[test]
    fn first_region_wins_under_skip_exists() {
        let mut mapping = MappingData::default();
        mapping.event_names.register("ぐだぐだ本能寺");
        apply_edits(
            &mut mapping,
            Region::CN,
            ApplyMode::Official,
            &[text(TextTable::EventNames, "ぐだぐだ本能寺", "咕哒咕哒本能寺", true)],
        );
        apply_edits(
            &mut mapping,
            Region::CN,
            ApplyMode::Official,
            &[text(TextTable::EventNames, "ぐだぐだ本能寺", "GUDAGUDA本能寺", true)],
        );
        assert_eq!(
            mapping.event_names.resolve("ぐだぐだ本能寺", Region::CN),
            Some("咕哒咕哒本能寺")
        );
    }

    #[test]
    fn year_like_wiki_values_do_not_replace_clean_chinese_text() {
        let mut mapping = MappingData::default();
        mapping.event_names.update_text("水着イベント", Region::CN, "泳装活动", true);

        let stats = apply_edits(
            &mut mapping,
            Region::NA,
            ApplyMode::Wiki,
            &[text(TextTable::EventNames, "水着イベント", "Summer 2019", true)],
        );
        assert_eq!(stats.rejected, 1);
        assert_eq!(mapping.event_names.resolve("水着イベント", Region::NA), None);

        let stats = apply_edits(
            &mut mapping,
            Region::NA,
            ApplyMode::Wiki,
            &[text(TextTable::EventNames, "新イベント", "Summer 2019", true)],
        );
        assert_eq!(stats.written, 1);
    }

    #[test]
    fn seed_registers_keys_and_jp_priorities() {
        let mut mapping = MappingData::default();
        let edits = vec![
            text(TextTable::SvtNames, "マシュ・キリエライト", "マシュ・キリエライト", false),
            Edit::Priority {
                table: PriorityTable::Skill,
                svt_id: 800100,
                priorities: PriorityMap::from([(1000, 1)]),
            },
        ];
        apply_edits(&mut mapping, Region::JP, ApplyMode::Seed, &edits);
        let entry = mapping.svt_names.get("マシュ・キリエライト").expect("seeded");
        assert!(entry.is_empty());
        assert_eq!(
            mapping.skill_priority.get(&800100).and_then(|v| v.get(Region::JP)),
            Some(&PriorityMap::from([(1000, 1)]))
        );
    }

    #[test]
    fn empty_keys_are_never_buffered() {
        let mut buf = EditBuffer::new();
        buf.text(TextTable::SkillNames, "", "Skill", true);
        buf.register(TextTable::CvNames, "");
        buf.priority(PriorityTable::Skill, 1, PriorityMap::new());
        assert!(buf.into_edits().is_empty());
    }
}
