//! Flutter-facing bindings for the TallyPad core.
//!
//! The generated bridge code targets [`api`]; everything else lives in
//! `tallypad_core`.

pub mod api;
