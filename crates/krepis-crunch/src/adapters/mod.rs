//! Adapters
//!
//! Drivers that connect the search core to external resources.

pub(crate) mod disk_pipeline;
