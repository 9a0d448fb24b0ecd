mod data;
mod table;

pub use data::{MappingData, PriorityMap, PriorityTable, ReleaseList, TextTable, TraitTable};
pub use table::MappingTable;
