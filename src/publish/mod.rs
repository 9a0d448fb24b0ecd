pub mod overrides;
pub mod patch;
pub mod writer;

pub use overrides::{apply_overrides_and_diff, HardOverrides};
pub use patch::{apply_patch, diff};
pub use writer::{read_published, write_published, VersionInfo};
