//! Rule-matrix autotile engine
//!
//! This crate picks a tile's atlas display from its same-group neighborhood.
//!
//! # Features
//! - 3x3 rule matrices with "empty", "ignore" and "required" codes
//! - Rotational rule groups generated from one hand-authored form
//! - JSON forms/rule-table documents and a built-in 47-tile blob table
//! - First-match resolution with a warning fallback
//! - Border / shallow / deep classification for variation post-processing
//!
//! # Example
//!
//! ```rust,ignore
//! use tilegrid_autotile::{mask::window_from_mask, RuleTable};
//!
//! let table = RuleTable::default_table()?;
//!
//! // Tile with no same-group neighbors picks the "lone" display
//! let display = table.resolve("wall", &window_from_mask(0));
//! ```

pub mod config;
pub mod mask;
pub mod matching;
pub mod rule;

use thiserror::Error;

// Re-export main types at crate root
pub use config::{AutotileForms, LoneRuleDef, RuleGroupDef, RuleTable, RuleTableConfig};
pub use matching::{find_display, resolve_display, Depth};
pub use rule::{
    get_rule_group, matrix_from_codes, rotate_matrix, AtlasCoord, AutotileRule, Rotation,
    RuleCode, RuleMatrix, RuleWindow,
};

/// Errors raised while building rules or rule tables
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("rule group amount must be between 1 and 4, got {0}")]
    InvalidGroupAmount(usize),
    #[error("invalid rule code {0}, expected 0-3")]
    InvalidCode(u8),
    #[error("unknown autotile form '{0}'")]
    UnknownForm(String),
    #[error("failed to parse rule document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to read rule document: {0}")]
    Io(#[from] std::io::Error),
}
