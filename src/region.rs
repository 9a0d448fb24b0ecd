use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Region {
    JP,
    CN,
    TW,
    NA,
    KR,
}

impl Region {
    pub const ALL: [Region; 5] = [Region::JP, Region::CN, Region::TW, Region::NA, Region::KR];

    /// Official merges must run in this order: later regions only fill slots the
    /// earlier ones left empty.
    pub const OFFICIAL_MERGE_ORDER: [Region; 4] = [Region::CN, Region::NA, Region::TW, Region::KR];

    /// Regions that publish community wiki bundles, in merge order.
    pub const WIKI_REGIONS: [Region; 2] = [Region::CN, Region::NA];

    pub fn as_str(self) -> &'static str {
        match self {
            Region::JP => "JP",
            Region::CN => "CN",
            Region::TW => "TW",
            Region::NA => "NA",
            Region::KR => "KR",
        }
    }

    /// Chinese clients sometimes ship untranslated Japanese strings.
    pub fn rejects_kana(self) -> bool {
        matches!(self, Region::CN | Region::TW)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Region {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "JP" => Ok(Region::JP),
            "CN" => Ok(Region::CN),
            "TW" => Ok(Region::TW),
            "NA" => Ok(Region::NA),
            "KR" => Ok(Region::KR),
            other => Err(anyhow!("unknown region: {other}")),
        }
    }
}

/// Values that can be "empty" without being absent. Empty values never
/// overwrite a stored one.
pub trait Blank {
    fn is_blank(&self) -> bool;
}

impl Blank for String {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl Blank for i32 {
    fn is_blank(&self) -> bool {
        false
    }
}

impl<T> Blank for Vec<T> {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V> Blank for BTreeMap<K, V> {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

/// Recursive merge used by region records, tables and repository overrides.
///
/// With `prefer_self` the receiver keeps every value it already has and only
/// gains what it lacks; without it, non-blank values from `other` win.
pub trait MergeFrom {
    fn merge_from(&mut self, other: &Self, prefer_self: bool);
}

impl MergeFrom for String {
    fn merge_from(&mut self, other: &Self, prefer_self: bool) {
        if self.is_empty() || (!prefer_self && !other.is_empty()) {
            self.clone_from(other);
        }
    }
}

impl MergeFrom for i32 {
    fn merge_from(&mut self, other: &Self, prefer_self: bool) {
        if !prefer_self {
            *self = *other;
        }
    }
}

impl<T: Clone> MergeFrom for Vec<T> {
    fn merge_from(&mut self, other: &Self, prefer_self: bool) {
        if self.is_empty() || (!prefer_self && !other.is_empty()) {
            self.clone_from(other);
        }
    }
}

impl<K: Ord + Clone, V: MergeFrom + Clone> MergeFrom for BTreeMap<K, V> {
    fn merge_from(&mut self, other: &Self, prefer_self: bool) {
        for (key, theirs) in other {
            match self.get_mut(key) {
                Some(mine) => mine.merge_from(theirs, prefer_self),
                None => {
                    self.insert(key.clone(), theirs.clone());
                }
            }
        }
    }
}

/// One optional value per region. A missing slot means "not known yet".
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound(serialize = "T: Serialize", deserialize = "T: Deserialize<'de>"))]
pub struct RegionValue<T> {
    #[serde(rename = "JP", default, skip_serializing_if = "Option::is_none")]
    pub jp: Option<T>,
    #[serde(rename = "CN", default, skip_serializing_if = "Option::is_none")]
    pub cn: Option<T>,
    #[serde(rename = "TW", default, skip_serializing_if = "Option::is_none")]
    pub tw: Option<T>,
    #[serde(rename = "NA", default, skip_serializing_if = "Option::is_none")]
    pub na: Option<T>,
    #[serde(rename = "KR", default, skip_serializing_if = "Option::is_none")]
    pub kr: Option<T>,
}

impl<T> Default for RegionValue<T> {
    fn default() -> Self {
        Self {
            jp: None,
            cn: None,
            tw: None,
            na: None,
            kr: None,
        }
    }
}

impl<T> RegionValue<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, region: Region) -> Option<&T> {
        self.slot(region).as_ref()
    }

    pub fn slot(&self, region: Region) -> &Option<T> {
        match region {
            Region::JP => &self.jp,
            Region::CN => &self.cn,
            Region::TW => &self.tw,
            Region::NA => &self.na,
            Region::KR => &self.kr,
        }
    }

    pub fn slot_mut(&mut self, region: Region) -> &mut Option<T> {
        match region {
            Region::JP => &mut self.jp,
            Region::CN => &mut self.cn,
            Region::TW => &mut self.tw,
            Region::NA => &mut self.na,
            Region::KR => &mut self.kr,
        }
    }

    /// Stores `value` unconditionally, replacing whatever the slot held.
    pub fn set(&mut self, region: Region, value: T) {
        *self.slot_mut(region) = Some(value);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        Region::ALL.iter().all(|r| self.slot(*r).is_none())
    }

    pub fn iter(&self) -> impl Iterator<Item = (Region, &T)> {
        Region::ALL
            .into_iter()
            .filter_map(move |r| self.get(r).map(|v| (r, v)))
    }
}

impl<T: Blank + PartialEq> RegionValue<T> {
    /// Writes one region slot. Returns whether the stored value changed.
    ///
    /// Blank values are ignored. With `skip_exists` an occupied slot is left
    /// untouched; otherwise the incoming value replaces it.
    pub fn update(&mut self, region: Region, value: T, skip_exists: bool) -> bool {
        if value.is_blank() {
            return false;
        }
        let slot = self.slot_mut(region);
        match slot {
            Some(_) if skip_exists => false,
            Some(existing) if *existing == value => false,
            _ => {
                *slot = Some(value);
                true
            }
        }
    }
}

impl<T: Clone> RegionValue<T> {
    /// Copies every present slot of `other` over this record.
    pub fn overwrite_from(&mut self, other: &RegionValue<T>) {
        for (region, value) in other.iter() {
            self.set(region, value.clone());
        }
    }
}

impl<T: MergeFrom + Clone> MergeFrom for RegionValue<T> {
    fn merge_from(&mut self, other: &Self, prefer_self: bool) {
        for region in Region::ALL {
            let Some(theirs) = other.get(region) else {
                continue;
            };
            let slot = self.slot_mut(region);
            match slot {
                Some(mine) => mine.merge_from(theirs, prefer_self),
                None => *slot = Some(theirs.clone()),
            }
        }
    }
}
