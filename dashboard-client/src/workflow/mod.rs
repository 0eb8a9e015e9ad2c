//! Page-flow sessions for the requisition lifecycle.
//!
//! Each session owns the transient draft state of one page: it is built from
//! a freshly fetched snapshot, validates edits client-side, builds the narrow
//! payload its endpoint expects, and guards against double submission with an
//! in-flight flag. The server remains the authority on all persisted state.

pub mod approval;
pub mod delivery;
pub mod form;
pub mod pricing;
pub mod receipt;
pub mod reports;
