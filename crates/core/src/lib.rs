//! Core types for tabula
//!
//! This crate defines the pieces every other layer builds on:
//! - TabulaError: the complete error taxonomy, with key identity attached
//! - Item / Value / ItemType: the single-table item model
//! - clock: epoch timestamps with strictly increasing micro/nano readings
//! - constants: default TTLs, backoff schedule, validation bounds
//!
//! No I/O happens here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod clock;
pub mod constants;
pub mod error;
pub mod item;

pub use error::{TabulaError, TabulaResult};
pub use item::{Item, ItemType, Metadata, Value};
