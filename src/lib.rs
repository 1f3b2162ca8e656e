//! `hidb5`: a read-optimized, zero-copy binary database of influenza HI and
//! neutralization assay records (antigens, sera, titration tables).
//!
//! The container format, the builder that assembles one from chart data, and
//! the query engine that serves lookups against an opened database are the
//! library's three layers; [`registry`] and [`vaccine`] sit on top as
//! process-wide conveniences for the command-line tools in `src/bin/`.
//! See `SPEC_FULL.md` for the full format and operation catalogue.

pub mod binary;
pub mod build;
pub mod chart;
pub mod database;
pub mod date;
pub mod error;
pub mod json;
pub mod locationdb;
pub mod names;
pub mod query;
pub mod registry;
pub mod vaccine;
pub mod whocc;

pub use build::Builder;
pub use database::Database;
pub use error::{HidbError, Result};
