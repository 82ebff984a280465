//! Rule-table configuration
//!
//! Rule tables are assembled from two documents: a dictionary of named base
//! forms (3x3 code matrices) and a table that places rotated groups of those
//! forms, plus a few ungrouped "lone" rules, on the tileset atlas.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Deref;
use std::path::Path;
use std::sync::Arc;

use crate::matching::resolve_display;
use crate::rule::{get_rule_group, matrix_from_codes, AtlasCoord, AutotileRule, RuleWindow};
use crate::RuleError;

const DEFAULT_FORMS: &str = include_str!("../data/default_forms.json");
const DEFAULT_RULES: &str = include_str!("../data/default_rules.json");

/// Named base forms, keyed by shape type (e.g. `"outer_corner"`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AutotileForms {
    forms: HashMap<String, [[u8; 3]; 3]>,
}

impl AutotileForms {
    pub fn new() -> Self {
        Self {
            forms: HashMap::new(),
        }
    }

    /// Parse a forms dictionary from JSON
    pub fn from_json(json: &str) -> Result<Self, RuleError> {
        Ok(serde_json::from_str(json)?)
    }

    /// The forms shipped with the crate
    pub fn builtin() -> Result<Self, RuleError> {
        Self::from_json(DEFAULT_FORMS)
    }

    /// Add or replace a form
    pub fn insert(&mut self, shape: impl Into<String>, codes: [[u8; 3]; 3]) {
        self.forms.insert(shape.into(), codes);
    }

    /// Get a form by shape type
    pub fn get(&self, shape: &str) -> Result<[[u8; 3]; 3], RuleError> {
        self.forms
            .get(shape)
            .copied()
            .ok_or_else(|| RuleError::UnknownForm(shape.to_string()))
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }
}

fn default_amount() -> usize {
    4
}

/// A rotational group placed at an atlas position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleGroupDef {
    /// Shape type resolved against [`AutotileForms`]
    #[serde(rename = "type")]
    pub shape: String,
    pub position: AtlasCoord,
    #[serde(default = "default_amount")]
    pub amount: usize,
}

/// A single unrotated rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoneRuleDef {
    #[serde(rename = "type")]
    pub shape: String,
    pub position: AtlasCoord,
}

/// Rule-table document: rotated groups first, then lone rules
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuleTableConfig {
    #[serde(default)]
    pub rule_groups: Vec<RuleGroupDef>,
    #[serde(default)]
    pub lone_rules: Vec<LoneRuleDef>,
}

impl RuleTableConfig {
    /// Parse a rule-table document from JSON
    pub fn from_json(json: &str) -> Result<Self, RuleError> {
        Ok(serde_json::from_str(json)?)
    }

    /// The rule table shipped with the crate
    pub fn builtin() -> Result<Self, RuleError> {
        Self::from_json(DEFAULT_RULES)
    }

    /// Expand every group and lone rule into an ordered [`RuleTable`]
    pub fn build(&self, forms: &AutotileForms) -> Result<RuleTable, RuleError> {
        let mut rules = Vec::new();

        for group in &self.rule_groups {
            let base = matrix_from_codes(forms.get(&group.shape)?)?;
            rules.extend(get_rule_group(base, group.position, group.amount)?);
        }

        for lone in &self.lone_rules {
            rules.push(AutotileRule::from_codes(
                forms.get(&lone.shape)?,
                lone.position,
            )?);
        }

        Ok(RuleTable::new(rules))
    }
}

/// An ordered, shared, immutable list of autotile rules.
///
/// Cloning is cheap; layers hand the same table to every tile of a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleTable {
    rules: Arc<[AutotileRule]>,
}

impl RuleTable {
    pub fn new(rules: Vec<AutotileRule>) -> Self {
        Self {
            rules: rules.into(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Build a table from a forms document and a rule-table document
    pub fn from_json(forms_json: &str, rules_json: &str) -> Result<Self, RuleError> {
        let forms = AutotileForms::from_json(forms_json)?;
        RuleTableConfig::from_json(rules_json)?.build(&forms)
    }

    /// Load a table from a forms file and a rule-table file
    pub fn load(forms_path: &Path, rules_path: &Path) -> Result<Self, RuleError> {
        let forms = std::fs::read_to_string(forms_path)?;
        let rules = std::fs::read_to_string(rules_path)?;
        Self::from_json(&forms, &rules)
    }

    /// The 47-tile blob table shipped with the crate
    pub fn default_table() -> Result<Self, RuleError> {
        Self::from_json(DEFAULT_FORMS, DEFAULT_RULES)
    }

    pub fn rules(&self) -> &[AutotileRule] {
        &self.rules
    }

    /// A new table with `more` appended after the existing rules
    pub fn extended(&self, more: impl IntoIterator<Item = AutotileRule>) -> Self {
        let mut rules = self.rules.to_vec();
        rules.extend(more);
        Self::new(rules)
    }

    /// Resolve the display for a neighborhood, warning when nothing matches
    pub fn resolve(&self, group: &str, window: &RuleWindow) -> AtlasCoord {
        resolve_display(group, &self.rules, window)
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::empty()
    }
}

impl Deref for RuleTable {
    type Target = [AutotileRule];

    fn deref(&self) -> &Self::Target {
        &self.rules
    }
}

impl From<Vec<AutotileRule>> for RuleTable {
    fn from(rules: Vec<AutotileRule>) -> Self {
        Self::new(rules)
    }
}
