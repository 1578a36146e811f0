//! Data model for Leaf-Ledger
//!
//! # Components
//!
//! - `LocationRecord` / `ProductRecord`: immutable values produced by discovery and extraction
//! - `DedupKey`: the identity used to collapse duplicate observations
//! - `CategoryResult` / `ScrapingSession`: per-task results merged by the orchestrator
//! - `CategoryPhase`: the state machine each category task walks through

mod phase;
mod record;
mod session;

// Re-export main types
pub use phase::{CategoryPhase, PhaseTracker};
pub use record::{product_slug, DedupKey, LocationRecord, ProductFields, ProductRecord, StrainType};
pub use session::{
    CategoryResult, LocationOutcome, LocationSummary, PersistStatus, ScrapingSession,
};
