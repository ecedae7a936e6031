use std::collections::HashSet;

use serde::Deserialize;

use crate::error::NormalizeError;

/// Profile shipped with the crate; matches the fee-split export layout.
pub const BUILTIN_CONFIG: &str = include_str!("default.normalize.toml");

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NormalizeConfig {
    pub name: String,
    pub source: SourceConfig,
    #[serde(default)]
    pub derived: DerivedConfig,
    #[serde(default)]
    pub text: TextConfig,
    #[serde(default)]
    pub schema: SchemaConfig,
    pub columns: ColumnMap,
    #[serde(default)]
    pub discrepancy: DiscrepancyConfig,
}

// ---------------------------------------------------------------------------
// Source
// ---------------------------------------------------------------------------

/// Required identity columns (accepted aliases, first present wins) and the
/// fields rounded as currency.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SourceConfig {
    pub agent_name: Vec<String>,
    pub deal_id: Vec<String>,
    #[serde(default)]
    pub currency_fields: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DerivedConfig {
    #[serde(default = "default_legacy_deal_value")]
    pub legacy_deal_value: String,
}

impl Default for DerivedConfig {
    fn default() -> Self {
        Self {
            legacy_deal_value: default_legacy_deal_value(),
        }
    }
}

fn default_legacy_deal_value() -> String {
    "Yes".into()
}

// ---------------------------------------------------------------------------
// Text normalization
// ---------------------------------------------------------------------------

/// Substring replacements applied to text cells.
///
/// With `fields` unset every text field is rewritten; otherwise only the
/// named fields are.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TextConfig {
    #[serde(default)]
    pub fields: Option<Vec<String>>,
    #[serde(default)]
    pub replace: Vec<Replacement>,
}

impl TextConfig {
    pub fn applies_to(&self, field: &str) -> bool {
        match &self.fields {
            None => true,
            Some(allowed) => allowed.iter().any(|f| f == field),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Replacement {
    pub find: String,
    pub with: String,
}

// ---------------------------------------------------------------------------
// Target schema rules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaConfig {
    #[serde(default)]
    pub rules: Vec<HeaderRule>,
}

/// One header edit. Rules run in declaration order; a rule whose anchor is
/// not in the header is skipped.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HeaderRule {
    Rename { from: String, to: String },
    InsertAfter { anchor: String, field: String },
}

// ---------------------------------------------------------------------------
// Column mapping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnPair {
    pub source: String,
    pub target: String,
}

/// Ordered (source, target) pairs. Immutable once loaded; targets are unique
/// after `validate`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct ColumnMap {
    pairs: Vec<ColumnPair>,
}

impl ColumnMap {
    pub fn new(pairs: Vec<ColumnPair>) -> Result<Self, NormalizeError> {
        let map = Self { pairs };
        map.validate()?;
        Ok(map)
    }

    pub fn pairs(&self) -> &[ColumnPair] {
        &self.pairs
    }

    /// Source field feeding `target`: first declared pair wins.
    pub fn source_for(&self, target: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|p| p.target == target)
            .map(|p| p.source.as_str())
    }

    pub fn validate(&self) -> Result<(), NormalizeError> {
        let mut seen = HashSet::new();
        for pair in &self.pairs {
            if pair.source.is_empty() || pair.target.is_empty() {
                return Err(NormalizeError::ConfigValidation(
                    "column mapping entries need a non-empty source and target".into(),
                ));
            }
            if !seen.insert(pair.target.as_str()) {
                return Err(NormalizeError::ConfigValidation(format!(
                    "column target '{}' is mapped more than once",
                    pair.target
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Discrepancy
// ---------------------------------------------------------------------------

/// Output column names used by the discrepancy pass.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiscrepancyConfig {
    #[serde(default = "default_group_by")]
    pub group_by: String,
    #[serde(default = "default_agent_total")]
    pub agent_total: String,
    #[serde(default = "default_deal_total")]
    pub deal_total: String,
    #[serde(default = "default_discrepancy_field")]
    pub field: String,
}

impl Default for DiscrepancyConfig {
    fn default() -> Self {
        Self {
            group_by: default_group_by(),
            agent_total: default_agent_total(),
            deal_total: default_deal_total(),
            field: default_discrepancy_field(),
        }
    }
}

fn default_group_by() -> String {
    "Numeric Deal ID - Legacy".into()
}

fn default_agent_total() -> String {
    "Total to House from Agent".into()
}

fn default_deal_total() -> String {
    "Total to House".into()
}

fn default_discrepancy_field() -> String {
    "Discrepancy".into()
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl NormalizeConfig {
    pub fn from_toml(input: &str) -> Result<Self, NormalizeError> {
        let config: NormalizeConfig =
            toml::from_str(input).map_err(|e| NormalizeError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// The profile compiled into the crate.
    pub fn builtin() -> Result<Self, NormalizeError> {
        Self::from_toml(BUILTIN_CONFIG)
    }

    pub fn validate(&self) -> Result<(), NormalizeError> {
        if self.source.agent_name.is_empty() {
            return Err(NormalizeError::ConfigValidation(
                "source.agent_name needs at least one alias".into(),
            ));
        }
        if self.source.deal_id.is_empty() {
            return Err(NormalizeError::ConfigValidation(
                "source.deal_id needs at least one alias".into(),
            ));
        }

        if let Some(r) = self.text.replace.iter().find(|r| r.find.is_empty()) {
            return Err(NormalizeError::ConfigValidation(format!(
                "text replacement with empty pattern (replacement '{}')",
                r.with
            )));
        }

        for rule in &self.schema.rules {
            let blank = match rule {
                HeaderRule::Rename { from, to } => from.is_empty() || to.is_empty(),
                HeaderRule::InsertAfter { anchor, field } => anchor.is_empty() || field.is_empty(),
            };
            if blank {
                return Err(NormalizeError::ConfigValidation(format!(
                    "schema rule has an empty field name: {rule:?}"
                )));
            }
        }

        self.columns.validate()?;

        let d = &self.discrepancy;
        if d.group_by.is_empty() || d.agent_total.is_empty() || d.deal_total.is_empty() || d.field.is_empty() {
            return Err(NormalizeError::ConfigValidation(
                "discrepancy column names must not be empty".into(),
            ));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
