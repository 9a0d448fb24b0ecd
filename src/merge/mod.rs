pub mod atlas;
pub mod official;
pub mod proposal;
pub mod wiki;

pub use atlas::merge_atlas_na_mapping;
pub use official::{merge_official, seed_mapping, OfficialOptions};
pub use proposal::{apply_edits, ApplyMode, ApplyStats, Edit};
pub use wiki::{load_wiki_bundle, merge_wiki, WikiTranslation};
