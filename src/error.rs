//! Structured error kinds shared by the binary container, the builder, the
//! query engine and the registry.
//!
//! Query-time "not found" is deliberately not a variant here: callers get an
//! empty `Vec`/`None` back (see the query engine), matching the rule that a
//! missing record is never fatal (§7: "Never fatal; represented by an empty
//! result or an 'absent' sentinel").

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HidbError {
    #[error("bad file {path:?}: no HIDB0500 signature and no hidb-v5 JSON marker")]
    BadFile { path: PathBuf },

    #[error("invalid date {raw:?}: expected YYYYMMDD or YYYY-MM-DD")]
    InvalidDate { raw: String },

    #[error("offset overflow while encoding field {field:?}: {offset} does not fit in a byte")]
    OffsetOverflow { field: &'static str, offset: usize },

    #[error("unrecognized name: {name:?}")]
    UnrecognizedName { name: String },

    #[error("duplicate table: {title:?}")]
    DuplicateTable { title: String },

    #[error("{kind:?} {identity:?} has no tables")]
    EmptyTableIndexList { kind: &'static str, identity: String },

    #[error("no hidb for virus type {virus_type:?}")]
    NoHiDbForVirusType { virus_type: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HidbError>;
