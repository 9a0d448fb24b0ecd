//! Cross-table reconciliation. Runs after every merge: keys that belong to a
//! more specific table are moved out of the generic ones, in a fixed order.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::mapping::{MappingData, MappingTable, TextTable};
use crate::region::MergeFrom;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub wars_absorbed: usize,
    pub entities_promoted: usize,
    pub equipment_collisions: usize,
    pub traits_specialised: usize,
}

impl ReconcileStats {
    pub fn total(&self) -> usize {
        self.wars_absorbed + self.entities_promoted + self.equipment_collisions + self.traits_specialised
    }
}

pub fn reconcile(mapping: &mut MappingData) -> ReconcileStats {
    let mut stats = ReconcileStats::default();

    // 1. war names absorb events and spots sharing their text
    let wars: Vec<String> = mapping.war_names.keys().cloned().collect();
    for source in [TextTable::EventNames, TextTable::SpotNames] {
        for key in &wars {
            if let Some(value) = mapping.text_mut(source).remove(key.as_str()) {
                mapping.war_names.entry_mut(key.clone()).merge_from(&value, true);
                debug!(%key, from = source.name(), "merged into war_names");
                stats.wars_absorbed += 1;
            }
        }
    }

    // 2. generic entities that are playable servants
    let servants: Vec<String> = mapping
        .svt_names
        .keys()
        .filter(|k| mapping.entity_names.contains_key(k.as_str()))
        .cloned()
        .collect();
    for key in servants {
        if let Some(value) = mapping.entity_names.remove(key.as_str()) {
            mapping.svt_names.entry_mut(key.clone()).merge_from(&value, true);
            debug!(%key, "entity promoted to servant");
            stats.entities_promoted += 1;
        }
    }

    // 3. skills and entities named after craft essences or command codes
    let equipment: BTreeSet<String> = mapping
        .ce_names
        .keys()
        .chain(mapping.cc_names.keys())
        .cloned()
        .collect();
    for table in [TextTable::SkillNames, TextTable::EntityNames] {
        stats.equipment_collisions += remove_keys(mapping.text_mut(table), &equipment);
    }

    // 4. event and field traits leave the generic trait table
    let specific: BTreeSet<i32> = mapping
        .event_trait
        .keys()
        .chain(mapping.field_trait.keys())
        .copied()
        .collect();
    for id in &specific {
        if mapping.traits.remove(id).is_some() {
            stats.traits_specialised += 1;
        }
    }

    info!(moved = stats.total(), "reconciled mapping tables");
    stats
}

fn remove_keys(table: &mut MappingTable<String>, keys: &BTreeSet<String>) -> usize {
    keys.iter()
        .filter(|key| table.remove(key.as_str()).is_some())
        .count()
}
