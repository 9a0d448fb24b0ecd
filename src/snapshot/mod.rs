mod model;

use std::collections::HashMap;
use std::path::Path;

use anyhow::{bail, Context};
use serde::de::DeserializeOwned;

pub use model::*;

use crate::region::Region;

/// Records of one kind, indexed by their stable id.
#[derive(Clone, Debug)]
pub struct Collection<T> {
    items: Vec<T>,
    index: HashMap<i32, usize>,
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: HasId> Collection<T> {
    /// Builds the id index. Duplicate ids mean the export changed shape.
    pub fn new(name: &str, items: Vec<T>) -> anyhow::Result<Self> {
        let mut index = HashMap::with_capacity(items.len());
        for (pos, item) in items.iter().enumerate() {
            if index.insert(item.id(), pos).is_some() {
                bail!("duplicate id {} in {name}", item.id());
            }
        }
        Ok(Self { items, index })
    }

    #[must_use]
    pub fn get(&self, id: i32) -> Option<&T> {
        self.index.get(&id).map(|pos| &self.items[*pos])
    }

    #[must_use]
    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Every entity collection of one region.
#[derive(Clone, Debug)]
pub struct MasterSnapshot {
    pub region: Region,
    pub servants: Collection<Servant>,
    pub craft_essences: Collection<CraftEssence>,
    pub command_codes: Collection<CommandCode>,
    pub items: Collection<Item>,
    pub events: Collection<Event>,
    pub wars: Collection<War>,
    pub skills: Collection<Skill>,
    pub treasure_devices: Collection<TreasureDevice>,
    pub functions: Collection<Function>,
    pub buffs: Collection<Buff>,
    pub bgms: Collection<Bgm>,
    pub mystic_codes: Collection<MysticCode>,
    pub entities: Collection<Entity>,
}

impl MasterSnapshot {
    #[must_use]
    pub fn empty(region: Region) -> Self {
        Self {
            region,
            servants: Collection::default(),
            craft_essences: Collection::default(),
            command_codes: Collection::default(),
            items: Collection::default(),
            events: Collection::default(),
            wars: Collection::default(),
            skills: Collection::default(),
            treasure_devices: Collection::default(),
            functions: Collection::default(),
            buffs: Collection::default(),
            bgms: Collection::default(),
            mystic_codes: Collection::default(),
            entities: Collection::default(),
        }
    }

    /// Looks up a craft essence by its collection number.
    #[must_use]
    pub fn craft_essence_by_no(&self, collection_no: i32) -> Option<&CraftEssence> {
        self.craft_essences
            .iter()
            .find(|ce| ce.collection_no == collection_no)
    }

    #[must_use]
    pub fn command_code_by_no(&self, collection_no: i32) -> Option<&CommandCode> {
        self.command_codes
            .iter()
            .find(|cc| cc.collection_no == collection_no)
    }
}

/// Loads `<root>/<REGION>/`. Returns `None` when the region has no export.
pub fn load_snapshot(root: &Path, region: Region) -> anyhow::Result<Option<MasterSnapshot>> {
    let dir = root.join(region.as_str());
    if !dir.is_dir() {
        return Ok(None);
    }
    Ok(Some(MasterSnapshot {
        region,
        servants: read_collection(&dir, "servants")?,
        craft_essences: read_collection(&dir, "craft_essences")?,
        command_codes: read_collection(&dir, "command_codes")?,
        items: read_collection(&dir, "items")?,
        events: read_collection(&dir, "events")?,
        wars: read_collection(&dir, "wars")?,
        skills: read_collection(&dir, "skills")?,
        treasure_devices: read_collection(&dir, "treasure_devices")?,
        functions: read_collection(&dir, "functions")?,
        buffs: read_collection(&dir, "buffs")?,
        bgms: read_collection(&dir, "bgms")?,
        mystic_codes: read_collection(&dir, "mystic_codes")?,
        entities: read_collection(&dir, "entities")?,
    }))
}

fn read_collection<T>(dir: &Path, name: &str) -> anyhow::Result<Collection<T>>
where
    T: DeserializeOwned + HasId,
{
    let path = dir.join(format!("{name}.json"));
    if !path.exists() {
        return Ok(Collection::default());
    }
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("read snapshot: {}", path.display()))?;
    let items: Vec<T> = serde_json::from_str(text.trim_start_matches('\u{FEFF}'))
        .with_context(|| format!("parse snapshot: {}", path.display()))?;
    Collection::new(name, items).with_context(|| format!("index snapshot: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_present_collections_and_defaults_missing_ones() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let dir = tmp.path().join("NA");
        std::fs::create_dir_all(&dir).expect("mkdir");
        std::fs::write(
            dir.join("items.json"),
            r#"[{"id": 6001, "name": "Gem of Saber", "detail": "Used for skills"}]"#,
        )
        .expect("write");

        let snap = load_snapshot(tmp.path(), Region::NA)
            .expect("load")
            .expect("present");
        assert_eq!(snap.items.get(6001).map(|i| i.name.as_str()), Some("Gem of Saber"));
        assert!(snap.servants.is_empty());
        assert!(load_snapshot(tmp.path(), Region::KR).expect("load").is_none());
    }

    #[test]
    fn missing_id_is_fatal() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let dir = tmp.path().join("JP");
        std::fs::create_dir_all(&dir).expect("mkdir");
        std::fs::write(dir.join("buffs.json"), r#"[{"name": "攻撃力アップ"}]"#).expect("write");

        let err = load_snapshot(tmp.path(), Region::JP).expect_err("must fail");
        assert!(format!("{err:#}").contains("buffs.json"));
    }

    #[test]
    fn duplicate_ids_are_fatal() {
        let items = vec![
            Bgm { id: 1, name: "a".into() },
            Bgm { id: 1, name: "b".into() },
        ];
        assert!(Collection::new("bgms", items).is_err());
    }
}
