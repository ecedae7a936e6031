//! Target schema: the ordered output field list, read from an example file's
//! header and edited by the configured header rules.

use crate::config::HeaderRule;
use crate::error::NormalizeError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSchema {
    fields: Vec<String>,
}

impl TargetSchema {
    /// Build the schema from a raw header and apply `rules` in order.
    ///
    /// A header with no non-blank field name is rejected. Rules whose anchor
    /// is missing are skipped.
    pub fn from_header(header: Vec<String>, rules: &[HeaderRule]) -> Result<Self, NormalizeError> {
        if header.iter().all(|f| f.trim().is_empty()) {
            return Err(NormalizeError::EmptySchema);
        }

        let mut fields = header;
        for rule in rules {
            if !apply_rule(&mut fields, rule) {
                log::debug!("schema rule skipped, anchor not present: {rule:?}");
            }
        }
        Ok(Self { fields })
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Apply one rule to the first occurrence of its anchor. Returns whether the
/// header changed.
pub fn apply_rule(fields: &mut Vec<String>, rule: &HeaderRule) -> bool {
    match rule {
        HeaderRule::Rename { from, to } => match fields.iter().position(|f| f == from) {
            Some(i) => {
                fields[i] = to.clone();
                true
            }
            None => false,
        },
        HeaderRule::InsertAfter { anchor, field } => match fields.iter().position(|f| f == anchor) {
            Some(i) => {
                fields.insert(i + 1, field.clone());
                true
            }
            None => false,
        },
    }
}
