//! Official-translation merge: walks entities present in both the JP and a
//! regional snapshot, matched by id, and proposes the regional display text
//! for every JP key.

use std::collections::{BTreeMap, HashMap};

use anyhow::bail;
use tracing::info;

use super::proposal::{apply_edits, ApplyMode, ApplyStats, Edit, EditBuffer};
use crate::mapping::{MappingData, PriorityMap, PriorityTable, ReleaseList, TextTable};
use crate::region::Region;
use crate::snapshot::{
    Collection, CommandCode, CraftEssence, Event, HasId, MasterSnapshot, Profile, Servant, Skill,
    TreasureDevice, VoiceGroup, War,
};
use crate::textutil::{normalize_voice_name, split_performers};
use crate::workers::WorkerPool;

#[derive(Clone, Debug)]
pub struct OfficialOptions {
    /// Unix time used to hide future-dated events and their wars.
    pub now: i64,
    /// War ids never merged from NA.
    pub na_excluded_wars: Vec<i32>,
}

impl Default for OfficialOptions {
    fn default() -> Self {
        Self {
            now: i64::MAX,
            na_excluded_wars: vec![1002],
        }
    }
}

/// Fills `mapping` with `other`'s translations of `jp` keys.
pub fn merge_official(
    jp: &MasterSnapshot,
    other: &MasterSnapshot,
    mapping: &mut MappingData,
    opts: &OfficialOptions,
    pool: &WorkerPool,
) -> anyhow::Result<ApplyStats> {
    let edits = collect_edits(jp, other, opts, pool)?;
    let stats = apply_edits(mapping, other.region, ApplyMode::Official, &edits);
    set_release_lists(mapping, other);
    info!(
        region = %other.region,
        proposals = edits.len(),
        written = stats.written,
        rejected = stats.rejected,
        "official merge"
    );
    Ok(stats)
}

/// A fresh store holding every JP display string as a key.
pub fn seed_mapping(jp: &MasterSnapshot, pool: &WorkerPool) -> anyhow::Result<MappingData> {
    let opts = OfficialOptions {
        now: i64::MAX,
        na_excluded_wars: Vec::new(),
    };
    let edits = collect_edits(jp, jp, &opts, pool)?;
    let mut mapping = MappingData::default();
    apply_edits(&mut mapping, Region::JP, ApplyMode::Seed, &edits);
    set_release_lists(&mut mapping, jp);
    info!(keys = mapping.key_count(), "seeded mapping from JP");
    Ok(mapping)
}

fn collect_edits(
    jp: &MasterSnapshot,
    other: &MasterSnapshot,
    opts: &OfficialOptions,
    pool: &WorkerPool,
) -> anyhow::Result<Vec<Edit>> {
    let mut edits = Vec::new();
    edits.extend(each_pair(pool, &jp.servants, &other.servants, servant_edits)?);
    edits.extend(each_pair(pool, &jp.craft_essences, &other.craft_essences, ce_edits)?);
    edits.extend(each_pair(pool, &jp.command_codes, &other.command_codes, cc_edits)?);
    edits.extend(each_pair(pool, &jp.items, &other.items, |a, b, buf| {
        buf.text(TextTable::ItemNames, &a.name, &b.name, false);
        buf.text(TextTable::ItemDetail, &a.detail, &b.detail, true);
        Ok(())
    })?);
    edits.extend(each_pair(pool, &jp.bgms, &other.bgms, |a, b, buf| {
        buf.text(TextTable::BgmNames, &a.name, &b.name, false);
        Ok(())
    })?);
    edits.extend(each_pair(pool, &jp.mystic_codes, &other.mystic_codes, |a, b, buf| {
        buf.text(TextTable::McNames, &a.name, &b.name, true);
        buf.text(TextTable::McDetail, &a.detail, &b.detail, true);
        Ok(())
    })?);
    edits.extend(each_pair(pool, &jp.events, &other.events, |a, b, buf| {
        if is_future(b, opts.now) {
            return Ok(());
        }
        buf.text(TextTable::EventNames, &a.name, &b.name, true);
        buf.text(TextTable::EventNames, &a.short_name, &b.short_name, true);
        Ok(())
    })?);
    edits.extend(each_pair(pool, &jp.wars, &other.wars, |a, b, buf| {
        war_edits(a, b, other, opts, buf);
        Ok(())
    })?);
    edits.extend(each_pair(pool, &jp.skills, &other.skills, |a, b, buf| {
        skill_texts(a, b, buf);
        Ok(())
    })?);
    edits.extend(each_pair(pool, &jp.treasure_devices, &other.treasure_devices, |a, b, buf| {
        td_texts(a, b, buf);
        Ok(())
    })?);
    edits.extend(each_pair(pool, &jp.functions, &other.functions, |a, b, buf| {
        buf.text(TextTable::FuncPopuptext, &a.func_popup_text, &b.func_popup_text, true);
        Ok(())
    })?);
    edits.extend(each_pair(pool, &jp.buffs, &other.buffs, |a, b, buf| {
        buf.text(TextTable::BuffNames, &a.name, &b.name, true);
        buf.text(TextTable::BuffDetail, &a.detail, &b.detail, true);
        Ok(())
    })?);
    edits.extend(each_pair(pool, &jp.entities, &other.entities, |a, b, buf| {
        buf.text(TextTable::EntityNames, &a.name, &b.name, true);
        Ok(())
    })?);
    Ok(edits)
}

/// Pairs JP records with their regional counterpart by id and runs `f` on
/// every pair in parallel. Records missing from the region are skipped.
fn each_pair<T, F>(
    pool: &WorkerPool,
    jp: &Collection<T>,
    other: &Collection<T>,
    f: F,
) -> anyhow::Result<Vec<Edit>>
where
    T: HasId + Sync,
    F: Fn(&T, &T, &mut EditBuffer) -> anyhow::Result<()> + Sync + Send,
{
    let pairs: Vec<(&T, &T)> = jp
        .iter()
        .filter_map(|a| other.get(a.id()).map(|b| (a, b)))
        .collect();
    let batches = pool.scatter_gather(&pairs, |(a, b)| {
        let mut buf = EditBuffer::new();
        f(a, b, &mut buf)?;
        Ok(buf.into_edits())
    })?;
    Ok(batches.into_iter().flatten().collect())
}

fn servant_edits(jp: &Servant, other: &Servant, buf: &mut EditBuffer) -> anyhow::Result<()> {
    buf.text(TextTable::SvtNames, &jp.name, &other.name, false);
    profile_credits(&jp.profile, &other.profile, buf);

    let jp_names = &jp.ascension_add.over_write_servant_name;
    let names = &other.ascension_add.over_write_servant_name;
    for (idx, jp_name) in &jp_names.ascension {
        if let Some(name) = names.ascension.get(idx) {
            buf.text(TextTable::SvtNames, jp_name, name, true);
        }
    }
    for (idx, jp_name) in &jp_names.costume {
        if let Some(name) = names.costume.get(idx) {
            buf.text(TextTable::SvtNames, jp_name, name, true);
        }
    }
    for (costume_id, jp_costume) in &jp.profile.costume {
        if let Some(costume) = other.profile.costume.get(costume_id) {
            buf.text(TextTable::CostumeNames, &jp_costume.name, &costume.name, true);
            buf.text(TextTable::CostumeDetail, &jp_costume.detail, &costume.detail, true);
        }
    }

    nested_skills(&jp.skills, &other.skills, buf);
    for td in &jp.noble_phantasms {
        if let Some(theirs) = other.noble_phantasms.iter().find(|t| t.id == td.id) {
            td_texts(td, theirs, buf);
        }
    }
    voice_edits(&jp.voices, &other.voices, buf);

    buf.priority(
        PriorityTable::Skill,
        jp.id,
        priorities(jp.id, other.skills.iter().map(|s| (s.id, s.priority)))?,
    );
    buf.priority(
        PriorityTable::TreasureDevice,
        jp.id,
        priorities(jp.id, other.noble_phantasms.iter().map(|t| (t.id, t.priority)))?,
    );
    Ok(())
}

fn ce_edits(jp: &CraftEssence, other: &CraftEssence, buf: &mut EditBuffer) -> anyhow::Result<()> {
    buf.text(TextTable::CeNames, &jp.name, &other.name, false);
    credit(
        TextTable::IllustratorNames,
        &jp.profile.illustrator,
        &other.profile.illustrator,
        false,
        buf,
    );
    nested_skills(&jp.skills, &other.skills, buf);
    Ok(())
}

fn cc_edits(jp: &CommandCode, other: &CommandCode, buf: &mut EditBuffer) -> anyhow::Result<()> {
    buf.text(TextTable::CcNames, &jp.name, &other.name, false);
    credit(TextTable::IllustratorNames, &jp.illustrator, &other.illustrator, false, buf);
    nested_skills(&jp.skills, &other.skills, buf);
    Ok(())
}

fn profile_credits(jp: &Profile, other: &Profile, buf: &mut EditBuffer) {
    credit(TextTable::CvNames, &jp.cv, &other.cv, true, buf);
    credit(TextTable::IllustratorNames, &jp.illustrator, &other.illustrator, false, buf);
}

/// Shared credits also register each performer on their own. When both
/// sides list the same number of names they are paired positionally.
fn credit(table: TextTable, jp: &str, other: &str, skip_exists: bool, buf: &mut EditBuffer) {
    buf.text(table, jp, other, skip_exists);
    let jp_parts = split_performers(jp);
    if jp_parts.is_empty() {
        return;
    }
    let parts = split_performers(other);
    for (idx, part) in jp_parts.iter().enumerate() {
        buf.register(table, part);
        if parts.len() == jp_parts.len() {
            buf.text(table, part, &parts[idx], true);
        }
    }
}

fn nested_skills(jp: &[Skill], other: &[Skill], buf: &mut EditBuffer) {
    for skill in jp {
        if let Some(theirs) = other.iter().find(|s| s.id == skill.id) {
            skill_texts(skill, theirs, buf);
        }
    }
}

fn skill_texts(jp: &Skill, other: &Skill, buf: &mut EditBuffer) {
    buf.text(TextTable::SkillNames, &jp.name, &other.name, true);
    buf.text(TextTable::SkillDetail, &jp.unmodified_detail, &other.unmodified_detail, true);
}

fn td_texts(jp: &TreasureDevice, other: &TreasureDevice, buf: &mut EditBuffer) {
    buf.text(TextTable::TdNames, &jp.name, &other.name, true);
    buf.text(TextTable::TdRuby, &jp.ruby, &other.ruby, true);
    buf.text(TextTable::TdDetail, &jp.unmodified_detail, &other.unmodified_detail, true);
    buf.text(TextTable::TdTypes, &jp.type_text, &other.type_text, true);
}

fn voice_edits(jp: &[VoiceGroup], other: &[VoiceGroup], buf: &mut EditBuffer) {
    let theirs: HashMap<&str, &str> = other
        .iter()
        .flat_map(|g| g.voice_lines.iter())
        .filter_map(|line| line.id.first().map(|id| (id.as_str(), line.name.as_str())))
        .collect();
    for line in jp.iter().flat_map(|g| g.voice_lines.iter()) {
        let Some(first) = line.id.first() else {
            continue;
        };
        let key = normalize_voice_name(&line.name);
        match theirs.get(first.as_str()) {
            Some(name) => buf.text(TextTable::VoiceLineNames, &key, &normalize_voice_name(name), true),
            None => buf.register(TextTable::VoiceLineNames, &key),
        }
    }
}

/// One servant lists every rank of a skill; all ranks must agree.
fn priorities(
    svt_id: i32,
    entries: impl Iterator<Item = (i32, i32)>,
) -> anyhow::Result<PriorityMap> {
    let mut out = BTreeMap::new();
    for (id, priority) in entries {
        if let Some(prev) = out.insert(id, priority) {
            if prev != priority {
                bail!("servant {svt_id}: conflicting priorities {prev} and {priority} for {id}");
            }
        }
    }
    Ok(out)
}

fn is_future(event: &Event, now: i64) -> bool {
    event.started_at > now
}

fn war_edits(jp: &War, other: &War, snapshot: &MasterSnapshot, opts: &OfficialOptions, buf: &mut EditBuffer) {
    if snapshot.region == Region::NA && opts.na_excluded_wars.contains(&other.id) {
        return;
    }
    if other.event_id != 0 {
        if let Some(event) = snapshot.events.get(other.event_id) {
            if is_future(event, opts.now) {
                return;
            }
        }
    }
    buf.text(TextTable::WarNames, &jp.name, &other.name, true);
    buf.text(TextTable::WarNames, &jp.long_name, &other.long_name, true);
    for spot in &jp.spots {
        let Some(their_spot) = other.spots.iter().find(|s| s.id == spot.id) else {
            continue;
        };
        buf.text(TextTable::SpotNames, &spot.name, &their_spot.name, true);
        for quest in &spot.quests {
            if let Some(their_quest) = their_spot.quests.iter().find(|q| q.id == quest.id) {
                buf.text(TextTable::QuestNames, &quest.name, &their_quest.name, true);
            }
        }
    }
}

/// Collection numbers visible in `snapshot`, replacing its region's slot.
fn set_release_lists(mapping: &mut MappingData, snapshot: &MasterSnapshot) {
    let lists = [
        (
            ReleaseList::Servant,
            release_ids(snapshot.servants.iter().map(|s| s.collection_no)),
        ),
        (
            ReleaseList::CraftEssence,
            release_ids(snapshot.craft_essences.iter().map(|c| c.collection_no)),
        ),
        (
            ReleaseList::CommandCode,
            release_ids(snapshot.command_codes.iter().map(|c| c.collection_no)),
        ),
    ];
    for (list, ids) in lists {
        if !ids.is_empty() {
            mapping.release_mut(list).set(snapshot.region, ids);
        }
    }
}

fn release_ids(numbers: impl Iterator<Item = i32>) -> Vec<i32> {
    let mut ids: Vec<i32> = numbers.filter(|n| *n > 0).collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}
