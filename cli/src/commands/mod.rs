mod foods;
mod helpers;
mod import;
mod maintenance;
mod probe;
mod stats;

pub(crate) use foods::{cmd_categories, cmd_show};
pub(crate) use import::{ImportOptions, cmd_import};
pub(crate) use maintenance::{cmd_check, cmd_clear};
pub(crate) use probe::{cmd_lookup, cmd_probe};
pub(crate) use stats::cmd_stats;
