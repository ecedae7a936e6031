use std::collections::HashMap;

use crate::error::NormalizeError;
use crate::model::{Cell, DealSplitRecord, Table};

/// Field the resolved agent email is written to.
pub const AGENT_CARD: &str = "Agent Card";

/// Agent name -> agent email, both trimmed.
#[derive(Debug, Clone, Default)]
pub struct ReferenceDirectory {
    entries: HashMap<String, String>,
}

impl ReferenceDirectory {
    /// Load from a reference table. The name and email columns are the first
    /// headers containing "name" / "email" (case-insensitive).
    pub fn from_table(table: &Table) -> Result<Self, NormalizeError> {
        let name_idx = find_header(&table.headers, "name")?;
        let email_idx = find_header(&table.headers, "email")?;

        let mut entries = HashMap::with_capacity(table.len());
        for row in 0..table.len() {
            let name = table.value(row, name_idx).trim();
            if name.is_empty() {
                continue;
            }
            let email = table.value(row, email_idx).trim();
            if let Some(previous) = entries.insert(name.to_string(), email.to_string()) {
                if previous != email {
                    log::warn!("reference: duplicate agent '{name}', using '{email}' over '{previous}'");
                }
            }
        }

        log::debug!("reference: loaded {} agent emails", entries.len());
        Ok(Self { entries })
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let entries = pairs
            .into_iter()
            .map(|(k, v)| (k.as_ref().trim().to_string(), v.as_ref().trim().to_string()))
            .collect();
        Self { entries }
    }

    /// Exact lookup of the trimmed name.
    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.entries.get(name.trim()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn find_header(headers: &[String], needle: &str) -> Result<usize, NormalizeError> {
    headers
        .iter()
        .position(|h| h.to_lowercase().contains(needle))
        .ok_or_else(|| NormalizeError::MissingColumn {
            dataset: "reference".into(),
            column: needle.into(),
            tried: vec![format!("*{needle}*")],
            available: headers.to_vec(),
        })
}

#[derive(Debug, Default)]
pub struct DirectoryStats {
    pub mapped: usize,
    /// Distinct unmatched agent names, in first-seen order.
    pub unmapped: Vec<String>,
}

/// Overwrite each record's Agent Card with the directory email for its agent
/// name; unmatched names get an empty card.
pub fn resolve_agent_cards(
    records: &mut [DealSplitRecord],
    agent_name_field: &str,
    directory: &ReferenceDirectory,
) -> DirectoryStats {
    let mut stats = DirectoryStats::default();

    for record in records.iter_mut() {
        let name = record.rendered(agent_name_field);
        match directory.lookup(&name).filter(|email| !email.is_empty()) {
            Some(email) => {
                record.set(AGENT_CARD, Cell::Text(email.to_string()));
                stats.mapped += 1;
            }
            None => {
                record.set(AGENT_CARD, Cell::Text(String::new()));
                let name = name.trim().to_string();
                if !stats.unmapped.contains(&name) {
                    stats.unmapped.push(name);
                }
            }
        }
    }

    log::info!("Mapped {} agent emails", stats.mapped);
    if !stats.unmapped.is_empty() {
        log::warn!(
            "{} agent name(s) not found in reference: {}",
            stats.unmapped.len(),
            stats.unmapped.join(", ")
        );
    }

    stats
}
