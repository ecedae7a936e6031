//! Deal-level reconciliation of house contributions.
//!
//! `Discrepancy = sum(agent house contribution over the deal) - deal house total`,
//! with the deal total taken from the group's first row. Written to every row
//! of the group.

use std::collections::HashMap;

use crate::config::DiscrepancyConfig;
use crate::model::{round2, Cell, OutputTable};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiscrepancySummary {
    /// Groups with a non-empty deal identifier.
    pub groups: usize,
    /// Groups whose discrepancy is non-zero (or undefined).
    pub nonzero: usize,
    /// Why the pass was skipped, if it was.
    pub skipped: Option<String>,
}

pub fn reconcile(table: &mut OutputTable, config: &DiscrepancyConfig) -> DiscrepancySummary {
    let Some(field_idx) = table.column(&config.field) else {
        return skipped(format!("'{}' is not in the target schema", config.field));
    };

    for row in table.rows.iter_mut() {
        row[field_idx] = Cell::Number(0.0);
    }

    let Some(group_idx) = table.column(&config.group_by) else {
        return skipped(format!("group column '{}' is not in the target schema", config.group_by));
    };
    let agent_idx = table.column(&config.agent_total);
    let deal_idx = table.column(&config.deal_total);

    // Group row indices by deal identifier, keeping first-seen order.
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
    for (i, row) in table.rows.iter().enumerate() {
        let key = row[group_idx].render();
        if key.trim().is_empty() {
            continue;
        }
        groups
            .entry(key.clone())
            .or_insert_with(|| {
                order.push(key);
                Vec::new()
            })
            .push(i);
    }

    let mut summary = DiscrepancySummary::default();
    for key in &order {
        let members = &groups[key];
        let value = group_discrepancy(table, members, agent_idx, deal_idx);

        match value {
            Cell::Number(v) if v == 0.0 => {}
            _ => {
                log::debug!("deal {key}: discrepancy {}", value.render());
                summary.nonzero += 1;
            }
        }
        for &i in members {
            table.rows[i][field_idx] = value.clone();
        }
        summary.groups += 1;
    }

    log::info!(
        "Added {} column ({} deal groups, {} with a non-zero variance)",
        config.field,
        summary.groups,
        summary.nonzero
    );
    summary
}

fn group_discrepancy(
    table: &OutputTable,
    members: &[usize],
    agent_idx: Option<usize>,
    deal_idx: Option<usize>,
) -> Cell {
    let sum_from_agents: f64 = match agent_idx {
        Some(a) => members
            .iter()
            .filter_map(|&i| table.rows[i][a].to_number())
            .sum(),
        None => 0.0,
    };

    let deal_total = deal_idx.and_then(|d| table.rows[members[0]][d].to_number());
    match deal_total {
        Some(total) => Cell::Number(round2(sum_from_agents - total)),
        None => Cell::Empty,
    }
}

fn skipped(reason: String) -> DiscrepancySummary {
    log::warn!("Discrepancy not computed: {reason}");
    DiscrepancySummary {
        skipped: Some(reason),
        ..Default::default()
    }
}
