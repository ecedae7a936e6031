use std::collections::BTreeMap;

use crate::config::SourceConfig;
use crate::error::NormalizeError;
use crate::model::{Cell, DealSplitRecord, Table};

/// Resolved names of the two required identity columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityColumns {
    pub agent_name: String,
    pub deal_id: String,
}

/// Pick the first alias present in the header for each identity column.
pub fn resolve_identity_columns(
    headers: &[String],
    source: &SourceConfig,
) -> Result<IdentityColumns, NormalizeError> {
    let agent_name = resolve_alias(headers, &source.agent_name, "Agent Name")?;
    let deal_id = resolve_alias(headers, &source.deal_id, "Deal Identifier")?;
    Ok(IdentityColumns { agent_name, deal_id })
}

fn resolve_alias(headers: &[String], aliases: &[String], column: &str) -> Result<String, NormalizeError> {
    aliases
        .iter()
        .find(|alias| headers.iter().any(|h| h == *alias))
        .cloned()
        .ok_or_else(|| NormalizeError::MissingColumn {
            dataset: "source".into(),
            column: column.into(),
            tried: aliases.to_vec(),
            available: headers.to_vec(),
        })
}

pub struct Validated {
    pub records: Vec<DealSplitRecord>,
    pub removed: usize,
}

/// Keep rows where both identity fields are non-missing, in source order.
pub fn validate_records(table: &Table, columns: &IdentityColumns) -> Validated {
    let mut records = Vec::with_capacity(table.len());
    let mut removed = 0;

    for (row_idx, row) in table.rows.iter().enumerate() {
        let mut fields = BTreeMap::new();
        for (col_idx, header) in table.headers.iter().enumerate() {
            let raw = row.get(col_idx).map(String::as_str).unwrap_or("");
            // Duplicate header names: the first column keeps the name.
            fields.entry(header.clone()).or_insert_with(|| Cell::from_raw(raw));
        }

        let complete = [&columns.agent_name, &columns.deal_id]
            .iter()
            .all(|name| fields.get(*name).map_or(false, |c: &Cell| !c.is_missing()));

        if complete {
            records.push(DealSplitRecord::new(row_idx, fields));
        } else {
            log::debug!("row {}: missing agent name or deal identifier", row_idx + 1);
            removed += 1;
        }
    }

    log::info!(
        "Removed {removed} incomplete records (missing {} or {}). Remaining: {}",
        columns.agent_name,
        columns.deal_id,
        records.len()
    );

    Validated { records, removed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NormalizeConfig;

    fn source_config() -> SourceConfig {
        NormalizeConfig::builtin().unwrap().source
    }

    fn table(headers: &[&str], rows: &[&[&str]]) -> Table {
        Table::new(
            headers.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn resolves_primary_aliases() {
        let headers: Vec<String> = vec!["Agent name".into(), "Deal ID".into()];
        let cols = resolve_identity_columns(&headers, &source_config()).unwrap();
        assert_eq!(cols.agent_name, "Agent name");
        assert_eq!(cols.deal_id, "Deal ID");
    }

    #[test]
    fn resolves_fallback_aliases() {
        let headers: Vec<String> = vec!["Agent_Name".into(), "Unique Commission ID".into()];
        let cols = resolve_identity_columns(&headers, &source_config()).unwrap();
        assert_eq!(cols.agent_name, "Agent_Name");
        assert_eq!(cols.deal_id, "Unique Commission ID");
    }

    #[test]
    fn first_alias_wins_when_both_present() {
        let headers: Vec<String> = vec!["Agent_Name".into(), "Agent name".into(), "Deal ID".into()];
        let cols = resolve_identity_columns(&headers, &source_config()).unwrap();
        assert_eq!(cols.agent_name, "Agent name");
    }

    #[test]
    fn missing_deal_column_is_fatal() {
        let headers: Vec<String> = vec!["Agent name".into(), "Fee Amount".into()];
        let err = resolve_identity_columns(&headers, &source_config()).unwrap_err();
        match err {
            NormalizeError::MissingColumn { dataset, tried, available, .. } => {
                assert_eq!(dataset, "source");
                assert_eq!(tried, vec!["Deal ID", "Unique Commission ID"]);
                assert_eq!(available, headers);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn drops_rows_missing_identity_fields() {
        let t = table(
            &["Agent name", "Deal ID", "Fee Amount"],
            &[
                &["Alice", "101", "1000"],
                &["", "102", "500"],
                &["Bob", "", "500"],
                &["  ", "103", "500"],
                &["Carol", "104"],
            ],
        );
        let cols = IdentityColumns { agent_name: "Agent name".into(), deal_id: "Deal ID".into() };
        let v = validate_records(&t, &cols);

        assert_eq!(v.removed, 3);
        assert_eq!(v.records.len(), 2);
        assert_eq!(v.records[0].text("Agent name"), Some("Alice"));
        assert_eq!(v.records[1].text("Agent name"), Some("Carol"));
        assert_eq!(v.records[1].source_row, 4);
        assert_eq!(v.records[1].get("Fee Amount"), Some(&Cell::Empty));
    }
}
