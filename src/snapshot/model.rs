//! Normalized master-data records as exported per region.
//!
//! Only the fields the mapping pipeline reads are modelled. `id` and `name`
//! are required everywhere; a record without them fails to load.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub trait HasId {
    fn id(&self) -> i32;
}

macro_rules! impl_has_id {
    ($($ty:ty),+ $(,)?) => {
        $(impl HasId for $ty {
            fn id(&self) -> i32 {
                self.id
            }
        })+
    };
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Servant {
    pub id: i32,
    #[serde(default)]
    pub collection_no: i32,
    pub name: String,
    #[serde(default)]
    pub profile: Profile,
    #[serde(default)]
    pub ascension_add: AscensionAdd,
    #[serde(default)]
    pub skills: Vec<Skill>,
    #[serde(default)]
    pub noble_phantasms: Vec<TreasureDevice>,
    #[serde(default)]
    pub voices: Vec<VoiceGroup>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub cv: String,
    #[serde(default)]
    pub illustrator: String,
    /// Costume id to its display texts.
    #[serde(default)]
    pub costume: BTreeMap<i32, Costume>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Costume {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub detail: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AscensionAdd {
    #[serde(default)]
    pub over_write_servant_name: AscensionNames,
}

/// Name overrides keyed by ascension index or costume index.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AscensionNames {
    #[serde(default)]
    pub ascension: BTreeMap<i32, String>,
    #[serde(default)]
    pub costume: BTreeMap<i32, String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub unmodified_detail: String,
    /// Skill slot (1..=3 for servants, 1 for equipment).
    #[serde(default)]
    pub num: i32,
    #[serde(default)]
    pub priority: i32,
    /// Limit-break count required before this rank applies.
    #[serde(default)]
    pub cond_limit_count: i32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreasureDevice {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub ruby: String,
    #[serde(default, rename = "type")]
    pub type_text: String,
    #[serde(default)]
    pub unmodified_detail: String,
    #[serde(default)]
    pub priority: i32,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceGroup {
    #[serde(default, rename = "type")]
    pub voice_type: String,
    #[serde(default)]
    pub voice_lines: Vec<VoiceLine>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceLine {
    /// Asset ids of the line; the first one identifies it across regions.
    #[serde(default)]
    pub id: Vec<String>,
    #[serde(default)]
    pub name: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CraftEssence {
    pub id: i32,
    #[serde(default)]
    pub collection_no: i32,
    pub name: String,
    #[serde(default)]
    pub profile: Profile,
    #[serde(default)]
    pub skills: Vec<Skill>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandCode {
    pub id: i32,
    #[serde(default)]
    pub collection_no: i32,
    pub name: String,
    #[serde(default)]
    pub illustrator: String,
    #[serde(default)]
    pub skills: Vec<Skill>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub detail: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub short_name: String,
    /// Unix timestamp.
    #[serde(default)]
    pub started_at: i64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct War {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub long_name: String,
    #[serde(default)]
    pub event_id: i32,
    #[serde(default)]
    pub spots: Vec<Spot>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spot {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub quests: Vec<Quest>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quest {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub phases: Vec<i32>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Function {
    #[serde(alias = "funcId")]
    pub id: i32,
    #[serde(default)]
    pub func_popup_text: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Buff {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub detail: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bgm {
    pub id: i32,
    pub name: String,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MysticCode {
    pub id: i32,
    pub name: String,
    #[serde(default)]
    pub detail: String,
}

/// Non-playable units (enemies, NPC variants of servants).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub id: i32,
    pub name: String,
}

impl_has_id!(
    Servant,
    Skill,
    TreasureDevice,
    CraftEssence,
    CommandCode,
    Item,
    Event,
    War,
    Spot,
    Quest,
    Function,
    Buff,
    Bgm,
    MysticCode,
    Entity,
);
