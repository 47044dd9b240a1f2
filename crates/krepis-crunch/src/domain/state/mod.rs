//! State tables and the records they hold

pub mod dead_table;
pub mod live_table;
pub mod types;

pub use dead_table::DeadStateTable;
pub use live_table::LiveStateTable;
pub use types::{Bounds, DeadState, Fingerprint, LiveState, StateKey, UNSET_DEPTH};
