//! Allocation model, drift engine and the holdings they operate on

pub mod allocation;
pub mod cache;
pub mod classify;
pub mod config;
pub mod drift;
pub mod error;
pub mod holdings;
pub mod log;
pub mod price;
pub mod taxonomy;

// Re-export main types for cleaner imports
pub use allocation::{AllocationLevel, AllocationRow, is_close};
pub use classify::{Classifier, UNKNOWN_ASSET_CLASS};
pub use drift::{Action, DriftRow, HoldingRow, analyze, analyze_against_tree};
pub use error::AllocationError;
pub use price::{PriceProvider, PriceResult};
pub use taxonomy::{AllocationTree, Classification, Node, NodeId, Taxonomy, TaxonomyBuilder};
