use std::collections::HashSet;
use std::fmt;

use crate::directory::AGENT_CARD;
use crate::model::{Cell, DealSplitRecord};
use crate::validate::IdentityColumns;

/// Field the identity is stored under on each record.
pub const IDENTITY_FIELD: &str = "Unique Commission ID - Legacy";

/// `{agent_email}-{deal_id}`: one agent's participation in one deal.
///
/// An unresolved agent email yields `-{deal_id}`; such identities still
/// dedup against each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommissionIdentity(String);

impl CommissionIdentity {
    pub fn new(agent_card: &str, deal_id: &str) -> Self {
        Self(format!("{agent_card}-{deal_id}"))
    }

    pub fn for_record(record: &DealSplitRecord, columns: &IdentityColumns) -> Self {
        Self::new(&record.rendered(AGENT_CARD), &record.rendered(&columns.deal_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CommissionIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub struct Deduplicated {
    pub records: Vec<DealSplitRecord>,
    pub removed: usize,
}

/// Stamp each record with its identity, then keep the first record per
/// identity in input order.
pub fn resolve_identities(records: Vec<DealSplitRecord>, columns: &IdentityColumns) -> Deduplicated {
    let before = records.len();
    let mut seen: HashSet<CommissionIdentity> = HashSet::with_capacity(before);
    let mut kept = Vec::with_capacity(before);

    for mut record in records {
        let identity = CommissionIdentity::for_record(&record, columns);
        record.set(IDENTITY_FIELD, Cell::Text(identity.to_string()));
        if seen.insert(identity) {
            kept.push(record);
        } else {
            log::debug!(
                "row {}: duplicate commission identity '{}' dropped",
                record.source_row + 1,
                record.rendered(IDENTITY_FIELD)
            );
        }
    }

    let removed = before - kept.len();
    log::info!(
        "Removed {removed} duplicate {IDENTITY_FIELD} values. Remaining: {}",
        kept.len()
    );

    Deduplicated { records: kept, removed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn columns() -> IdentityColumns {
        IdentityColumns { agent_name: "Agent name".into(), deal_id: "Deal ID".into() }
    }

    fn rec(row: usize, card: &str, deal: &str, split: &str) -> DealSplitRecord {
        let mut fields = BTreeMap::new();
        fields.insert(AGENT_CARD.to_string(), Cell::from_raw(card));
        fields.insert("Deal ID".to_string(), Cell::from_raw(deal));
        fields.insert("Split ID".to_string(), Cell::from_raw(split));
        DealSplitRecord::new(row, fields)
    }

    #[test]
    fn identity_format() {
        assert_eq!(CommissionIdentity::new("a@x.com", "101").as_str(), "a@x.com-101");
        assert_eq!(CommissionIdentity::new("", "101").to_string(), "-101");
    }

    #[test]
    fn first_record_wins() {
        let out = resolve_identities(
            vec![
                rec(0, "a@x.com", "101", "s1"),
                rec(1, "b@x.com", "101", "s2"),
                rec(2, "a@x.com", "101", "s3"),
                rec(3, "a@x.com", "102", "s4"),
            ],
            &columns(),
        );
        assert_eq!(out.removed, 1);
        let splits: Vec<_> = out.records.iter().map(|r| r.rendered("Split ID")).collect();
        assert_eq!(splits, vec!["s1", "s2", "s4"]);
        assert_eq!(out.records[0].text(IDENTITY_FIELD), Some("a@x.com-101"));
    }

    #[test]
    fn same_deal_different_agents_are_kept() {
        let out = resolve_identities(
            vec![rec(0, "a@x.com", "7", "s1"), rec(1, "b@x.com", "7", "s2")],
            &columns(),
        );
        assert_eq!(out.removed, 0);
        assert_eq!(out.records.len(), 2);
    }

    #[test]
    fn unresolved_agents_collide_on_same_deal() {
        let out = resolve_identities(
            vec![rec(0, "", "7", "s1"), rec(1, "", "7", "s2")],
            &columns(),
        );
        assert_eq!(out.removed, 1);
        assert_eq!(out.records[0].text(IDENTITY_FIELD), Some("-7"));
    }
}
