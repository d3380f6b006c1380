//! Data model types for the baddb emulator.
//!
//! This crate holds the typed item model (`AttributeValue`, `Entry`,
//! `PathOperand`), the table/index schema types, and the wire-level input
//! structs the request builders translate into storage-engine requests.
//! The service's JSON protocol makes serde derives trivial, so everything
//! here is hand-written.
#![allow(clippy::module_name_repetitions)]

pub mod attribute_value;
pub mod entry;
pub mod input;
pub mod types;

pub use attribute_value::{AttributeValue, CompareError, NUMBER_EPSILON};
pub use entry::{Entry, PathError, PathOperand};
