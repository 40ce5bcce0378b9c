use std::io;
use std::path::PathBuf;

use thiserror::Error;
use toml::de;

use crate::types::{NodeId, NodeType};

/// Hard failures detected before any generation work starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("column count {columns} must be odd so the boss column sits at the exact center")]
    EvenColumns { columns: usize },

    #[error("act needs at least 3 columns, got {columns}")]
    TooFewColumns { columns: usize },

    #[error(
        "act with {rows} rows cannot keep row 0, treasure row {treasure_row}, pre-boss row and boss row distinct"
    )]
    TooFewRows { rows: usize, treasure_row: usize },

    #[error("branchiness {0} must be within [0, 1]")]
    Branchiness(f64),

    #[error("invalid rule set: {0}")]
    InvalidRules(String),

    #[error("failed to parse rule set: {0}")]
    Parse(#[from] de::Error),

    #[error("failed to read rule set {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("node {node} is already resolved as {node_type}")]
    AlreadyResolved { node: NodeId, node_type: NodeType },

    #[error("node {node} sits on row {row}, outside an act of {rows} rows")]
    OutsideAct { node: NodeId, row: usize, rows: usize },
}
