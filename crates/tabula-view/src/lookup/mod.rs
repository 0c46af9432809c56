//! Foreign-key lookups
//!
//! - [`LookupResolver`] fetches referenced records through a
//!   [`LookupSource`](tabula_core::LookupSource) and walks lookup chains
//! - [`LookupCache`] de-duplicates fetches for a view session
//! - [`LookupConfig`] holds the derived lookup columns configured per FK column
//! - [`LookupChainEditor`] and [`LookupPreview`] drive the UI side, gating
//!   late results on a request generation

mod cache;
mod chain;
mod editor;
mod preview;
mod resolver;

pub use cache::{LookupCache, LookupKey, LookupOutcome};
pub use chain::{KEY_SEPARATOR, LookupColumn, LookupConfig};
pub use editor::{ChainLevel, Expansion, ExpansionRequest, LookupChainEditor};
pub use preview::{LookupPreview, PreviewState, RequestGate, RequestToken};
pub use resolver::{LookupResolver, LookupValue};

#[cfg(test)]
mod tests;
