use std::collections::BTreeMap;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use super::table::MappingTable;
use crate::region::{MergeFrom, RegionValue};

pub type PriorityMap = BTreeMap<i32, i32>;

macro_rules! text_tables {
    ($($variant:ident => $field:ident,)+) => {
        /// Tables keyed by Japanese display text.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum TextTable {
            $($variant,)+
        }

        impl TextTable {
            pub const ALL: &'static [TextTable] = &[$(TextTable::$variant,)+];

            pub fn name(self) -> &'static str {
                match self {
                    $(TextTable::$variant => stringify!($field),)+
                }
            }
        }

        /// The whole published mapping document.
        #[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(default)]
        pub struct MappingData {
            /// Open extension: enum display names grouped by enum type.
            pub enums: BTreeMap<String, MappingTable<String>>,
            /// Open extension: small side tables without a fixed schema.
            pub misc: BTreeMap<String, MappingTable<String>>,
            $(pub $field: MappingTable<String>,)+
            #[serde(rename = "trait")]
            pub traits: MappingTable<i32>,
            pub event_trait: MappingTable<i32>,
            pub field_trait: MappingTable<i32>,
            pub svt_release: RegionValue<Vec<i32>>,
            pub ce_release: RegionValue<Vec<i32>>,
            pub cc_release: RegionValue<Vec<i32>>,
            /// Servant id to {skill id: priority}.
            pub skill_priority: MappingTable<i32, PriorityMap>,
            /// Servant id to {treasure device id: priority}.
            pub td_priority: MappingTable<i32, PriorityMap>,
        }

        impl MappingData {
            pub fn text(&self, table: TextTable) -> &MappingTable<String> {
                match table {
                    $(TextTable::$variant => &self.$field,)+
                }
            }

            pub fn text_mut(&mut self, table: TextTable) -> &mut MappingTable<String> {
                match table {
                    $(TextTable::$variant => &mut self.$field,)+
                }
            }
        }
    };
}

text_tables! {
    SvtNames => svt_names,
    CeNames => ce_names,
    CcNames => cc_names,
    ItemNames => item_names,
    ItemDetail => item_detail,
    McNames => mc_names,
    McDetail => mc_detail,
    CostumeNames => costume_names,
    CostumeDetail => costume_detail,
    CvNames => cv_names,
    IllustratorNames => illustrator_names,
    EventNames => event_names,
    WarNames => war_names,
    QuestNames => quest_names,
    SpotNames => spot_names,
    EntityNames => entity_names,
    BgmNames => bgm_names,
    BuffNames => buff_names,
    BuffDetail => buff_detail,
    FuncPopuptext => func_popuptext,
    SkillNames => skill_names,
    SkillDetail => skill_detail,
    TdNames => td_names,
    TdRuby => td_ruby,
    TdDetail => td_detail,
    TdTypes => td_types,
    VoiceLineNames => voice_line_names,
}

impl FromStr for TextTable {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TextTable::ALL
            .iter()
            .copied()
            .find(|t| t.name() == s)
            .ok_or_else(|| anyhow!("unknown text table: {s}"))
    }
}

/// Trait tables keyed by numeric trait id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TraitTable {
    Trait,
    EventTrait,
    FieldTrait,
}

impl TraitTable {
    pub const ALL: [TraitTable; 3] = [TraitTable::Trait, TraitTable::EventTrait, TraitTable::FieldTrait];

    pub fn name(self) -> &'static str {
        match self {
            TraitTable::Trait => "trait",
            TraitTable::EventTrait => "event_trait",
            TraitTable::FieldTrait => "field_trait",
        }
    }
}

impl FromStr for TraitTable {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TraitTable::ALL
            .into_iter()
            .find(|t| t.name() == s)
            .ok_or_else(|| anyhow!("unknown trait table: {s}"))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReleaseList {
    Servant,
    CraftEssence,
    CommandCode,
}

impl ReleaseList {
    pub const ALL: [ReleaseList; 3] = [
        ReleaseList::Servant,
        ReleaseList::CraftEssence,
        ReleaseList::CommandCode,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ReleaseList::Servant => "svt_release",
            ReleaseList::CraftEssence => "ce_release",
            ReleaseList::CommandCode => "cc_release",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PriorityTable {
    Skill,
    TreasureDevice,
}

impl PriorityTable {
    pub const ALL: [PriorityTable; 2] = [PriorityTable::Skill, PriorityTable::TreasureDevice];

    pub fn name(self) -> &'static str {
        match self {
            PriorityTable::Skill => "skill_priority",
            PriorityTable::TreasureDevice => "td_priority",
        }
    }
}

impl MappingData {
    pub fn traits_table(&self, table: TraitTable) -> &MappingTable<i32> {
        match table {
            TraitTable::Trait => &self.traits,
            TraitTable::EventTrait => &self.event_trait,
            TraitTable::FieldTrait => &self.field_trait,
        }
    }

    pub fn traits_table_mut(&mut self, table: TraitTable) -> &mut MappingTable<i32> {
        match table {
            TraitTable::Trait => &mut self.traits,
            TraitTable::EventTrait => &mut self.event_trait,
            TraitTable::FieldTrait => &mut self.field_trait,
        }
    }

    pub fn release(&self, list: ReleaseList) -> &RegionValue<Vec<i32>> {
        match list {
            ReleaseList::Servant => &self.svt_release,
            ReleaseList::CraftEssence => &self.ce_release,
            ReleaseList::CommandCode => &self.cc_release,
        }
    }

    pub fn release_mut(&mut self, list: ReleaseList) -> &mut RegionValue<Vec<i32>> {
        match list {
            ReleaseList::Servant => &mut self.svt_release,
            ReleaseList::CraftEssence => &mut self.ce_release,
            ReleaseList::CommandCode => &mut self.cc_release,
        }
    }

    pub fn priority(&self, table: PriorityTable) -> &MappingTable<i32, PriorityMap> {
        match table {
            PriorityTable::Skill => &self.skill_priority,
            PriorityTable::TreasureDevice => &self.td_priority,
        }
    }

    pub fn priority_mut(&mut self, table: PriorityTable) -> &mut MappingTable<i32, PriorityMap> {
        match table {
            PriorityTable::Skill => &mut self.skill_priority,
            PriorityTable::TreasureDevice => &mut self.td_priority,
        }
    }

    /// Merges `other` table by table. `prefer_self` receives the published
    /// table name and decides which side wins conflicting slots.
    pub fn merge_with(&mut self, other: &MappingData, prefer_self: impl Fn(&str) -> bool) {
        for table in TextTable::ALL {
            self.text_mut(*table)
                .merge_table(other.text(*table), prefer_self(table.name()));
        }
        for table in TraitTable::ALL {
            self.traits_table_mut(table)
                .merge_table(other.traits_table(table), prefer_self(table.name()));
        }
        for (group, table) in &other.enums {
            self.enums
                .entry(group.clone())
                .or_default()
                .merge_table(table, prefer_self("enums"));
        }
        for (group, table) in &other.misc {
            self.misc
                .entry(group.clone())
                .or_default()
                .merge_table(table, prefer_self("misc"));
        }
        for list in ReleaseList::ALL {
            self.release_mut(list)
                .merge_from(other.release(list), prefer_self(list.name()));
        }
        for table in PriorityTable::ALL {
            self.priority_mut(table)
                .merge_table(other.priority(table), prefer_self(table.name()));
        }
    }

    /// Total number of keys across every keyed table.
    #[must_use]
    pub fn key_count(&self) -> usize {
        let text: usize = TextTable::ALL.iter().map(|t| self.text(*t).len()).sum();
        let traits: usize = TraitTable::ALL.iter().map(|t| self.traits_table(*t).len()).sum();
        let open: usize = self
            .enums
            .values()
            .chain(self.misc.values())
            .map(MappingTable::len)
            .sum();
        text + traits + open + self.skill_priority.len() + self.td_priority.len()
    }
}
