//! Template-based synthesis of missing translations.
//!
//! A rule matches JP keys of one table, resolves each capture group to its
//! regional translation and renders a per-region template. Only empty slots
//! are filled, and a region is skipped as soon as one group fails to resolve.

mod rules;

use std::collections::{BTreeMap, HashMap};

use anyhow::{bail, Context};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::{debug, info};

use crate::mapping::{MappingData, TextTable};
use crate::region::Region;

pub use rules::DEFAULT_RULES;

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([A-Za-z0-9_]+)\}").expect("placeholder"));

/// One entry of a fixed vocabulary, such as a difficulty rank.
#[derive(Clone, Copy, Debug)]
pub struct Term {
    pub jp: &'static str,
    pub values: &'static [(Region, &'static str)],
}

/// How a captured substring becomes regional text.
#[derive(Clone, Debug)]
pub enum Resolver {
    Table(TextTable),
    /// First table holding a translation wins.
    Tables(&'static [TextTable]),
    Enumeration(&'static [Term]),
    /// The capture is used unchanged (numbers, ranks).
    Verbatim,
}

impl Resolver {
    fn resolve(&self, mapping: &MappingData, text: &str, region: Region) -> Option<String> {
        let found = match self {
            Resolver::Table(table) => mapping.text(*table).resolve(text, region),
            Resolver::Tables(tables) => tables
                .iter()
                .find_map(|t| mapping.text(*t).resolve(text, region)),
            Resolver::Enumeration(terms) => terms
                .iter()
                .find(|t| t.jp == text)
                .and_then(|t| t.values.iter().find(|(r, _)| *r == region))
                .map(|(_, v)| *v),
            Resolver::Verbatim => Some(text),
        };
        found.filter(|s| !s.is_empty()).map(str::to_string)
    }
}

#[derive(Clone, Debug)]
pub enum Groups {
    /// Group `i + 1` renders as `{i}`.
    Positional(Vec<Resolver>),
    /// Named group `name` renders as `{name}`.
    Named(Vec<(&'static str, Resolver)>),
}

#[derive(Clone, Debug)]
pub struct AutofillRule {
    pub table: TextTable,
    pub pattern: Regex,
    pub groups: Groups,
    pub templates: Vec<(Region, &'static str)>,
}

impl AutofillRule {
    /// Compiles `pattern` and checks that every group has a resolver.
    pub fn new(
        table: TextTable,
        pattern: &str,
        groups: Groups,
        templates: Vec<(Region, &'static str)>,
    ) -> anyhow::Result<Self> {
        let pattern = Regex::new(pattern).with_context(|| format!("autofill pattern: {pattern}"))?;
        match &groups {
            Groups::Positional(resolvers) => {
                if resolvers.len() != pattern.captures_len() - 1 {
                    bail!(
                        "autofill pattern {pattern} has {} groups but {} resolvers",
                        pattern.captures_len() - 1,
                        resolvers.len()
                    );
                }
            }
            Groups::Named(resolvers) => {
                for (name, _) in resolvers {
                    if !pattern.capture_names().flatten().any(|n| n == *name) {
                        bail!("autofill pattern {pattern} has no group named {name}");
                    }
                }
            }
        }
        Ok(Self {
            table,
            pattern,
            groups,
            templates,
        })
    }

    /// Placeholder values for `region`, or `None` if any group is missing
    /// or has no translation.
    fn resolve_groups(
        &self,
        mapping: &MappingData,
        caps: &Captures<'_>,
        region: Region,
    ) -> Option<HashMap<String, String>> {
        let mut values = HashMap::new();
        match &self.groups {
            Groups::Positional(resolvers) => {
                for (idx, resolver) in resolvers.iter().enumerate() {
                    let text = caps.get(idx + 1)?.as_str();
                    values.insert(idx.to_string(), resolver.resolve(mapping, text, region)?);
                }
            }
            Groups::Named(resolvers) => {
                for (name, resolver) in resolvers {
                    let text = caps.name(name)?.as_str();
                    values.insert((*name).to_string(), resolver.resolve(mapping, text, region)?);
                }
            }
        }
        Some(values)
    }
}

/// Single-pass substitution; unknown placeholders are left in place.
fn render(template: &str, values: &HashMap<String, String>) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures<'_>| match values.get(&caps[1]) {
            Some(v) => v.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct AutofillStats {
    pub filled: usize,
    pub unresolved: usize,
    pub discarded: usize,
}

/// Fills empty slots using `rules`. Rules are tried in order and the first
/// one matching a key governs it.
pub fn autofill(mapping: &mut MappingData, rules: &[AutofillRule]) -> AutofillStats {
    let mut by_table: BTreeMap<TextTable, Vec<&AutofillRule>> = BTreeMap::new();
    for rule in rules {
        by_table.entry(rule.table).or_default().push(rule);
    }

    let mut stats = AutofillStats::default();
    for (table, table_rules) in by_table {
        let mut pending: Vec<(String, Region, String)> = Vec::new();
        for (key, value) in mapping.text(table) {
            let Some((rule, caps)) = table_rules
                .iter()
                .find_map(|r| r.pattern.captures(key).map(|c| (*r, c)))
            else {
                continue;
            };
            for (region, template) in &rule.templates {
                if value.get(*region).is_some() {
                    continue;
                }
                let Some(values) = rule.resolve_groups(mapping, &caps, *region) else {
                    debug!(table = table.name(), %key, %region, "autofill lookup failed");
                    stats.unresolved += 1;
                    continue;
                };
                let text = render(template, &values);
                if PLACEHOLDER_RE.is_match(&text) {
                    debug!(table = table.name(), %key, %region, %text, "autofill left a placeholder");
                    stats.discarded += 1;
                    continue;
                }
                pending.push((key.clone(), *region, text));
            }
        }
        let target = mapping.text_mut(table);
        for (key, region, text) in pending {
            if target.update_text(&key, region, &text, true) {
                stats.filled += 1;
            }
        }
    }
    info!(
        filled = stats.filled,
        unresolved = stats.unresolved,
        discarded = stats.discarded,
        "autofill"
    );
    stats
}
