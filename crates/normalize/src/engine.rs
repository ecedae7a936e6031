use crate::config::NormalizeConfig;
use crate::derive::FieldDeriver;
use crate::directory::{resolve_agent_cards, ReferenceDirectory};
use crate::discrepancy::reconcile;
use crate::error::NormalizeError;
use crate::identity::resolve_identities;
use crate::model::{NormalizeInput, NormalizeOutput, NormalizeReport};
use crate::remap::remap;
use crate::schema::TargetSchema;
use crate::validate::{resolve_identity_columns, validate_records};

/// Run the full pipeline. Every fatal check (schema header, identity columns,
/// reference columns) happens before any record is touched.
pub fn run(config: &NormalizeConfig, input: &NormalizeInput) -> Result<NormalizeOutput, NormalizeError> {
    let schema = TargetSchema::from_header(input.target_header.clone(), &config.schema.rules)?;
    let columns = resolve_identity_columns(&input.source.headers, &config.source)?;
    let directory = ReferenceDirectory::from_table(&input.reference)?;

    log::info!("Loaded {} records from source file.", input.source.len());

    let validated = validate_records(&input.source, &columns);
    let mut records = validated.records;

    let deriver = FieldDeriver::new(config, &input.source.headers);
    let mut coercion_failures = 0;
    for record in records.iter_mut() {
        coercion_failures += deriver.derive(record).coercion_failures;
    }
    if coercion_failures > 0 {
        log::warn!("{coercion_failures} currency value(s) were not numeric and were left empty");
    }

    let directory_stats = resolve_agent_cards(&mut records, &columns.agent_name, &directory);
    let deduped = resolve_identities(records, &columns);

    let mut table = remap(&deduped.records, &schema, &config.columns);
    let discrepancy = reconcile(&mut table, &config.discrepancy);

    let report = NormalizeReport {
        config_name: config.name.clone(),
        engine_version: env!("CARGO_PKG_VERSION").to_string(),
        agent_name_column: columns.agent_name.clone(),
        deal_id_column: columns.deal_id.clone(),
        loaded: input.source.len(),
        incomplete_removed: validated.removed,
        duplicates_removed: deduped.removed,
        agent_emails_mapped: directory_stats.mapped,
        agent_names_unmapped: directory_stats.unmapped,
        currency_coercion_failures: coercion_failures,
        gci: deriver.gci_strategy(),
        house_profit: deriver.house_profit_strategy(),
        schema_fields: schema.len(),
        discrepancy_groups: discrepancy.groups,
        nonzero_discrepancies: discrepancy.nonzero,
        discrepancy_skipped: discrepancy.skipped,
        output_rows: table.rows.len(),
    };

    Ok(NormalizeOutput { table, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Table;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn input(source_headers: &[&str], rows: &[&[&str]]) -> NormalizeInput {
        NormalizeInput {
            source: Table::new(
                strings(source_headers),
                rows.iter().map(|r| strings(r)).collect(),
            ),
            reference: Table::new(
                strings(&["Agent Name", "Agent Email"]),
                vec![
                    strings(&["Alice", "alice@realty.com"]),
                    strings(&["Bob", "bob@realty.com"]),
                ],
            ),
            target_header: strings(&[
                "ID",
                "Agent Card",
                "Agent Name - Legacy",
                "GCI",
                "Total to House",
                "Deal Type - Legacy",
                "Unique Commission ID - Legacy",
            ]),
        }
    }

    #[test]
    fn end_to_end_small() {
        let config = NormalizeConfig::builtin().unwrap();
        let input = input(
            &[
                "Agent name", "Deal ID", "Fee Amount", "Split with House",
                "Split between Agents", "Total To House", "Deal Type",
            ],
            &[
                &["Alice", "101", "1000", "50", "50", "100", "Sales"],
                &["Bob", "101", "1000", "50", "50", "100", "Sales"],
                &["Alice", "101", "1000", "50", "50", "100", "Sales"],
                &["", "102", "1000", "50", "50", "100", "Sales"],
            ],
        );

        let out = run(&config, &input).unwrap();
        let t = &out.table;

        assert_eq!(
            t.headers,
            strings(&[
                "Numeric Deal ID - Legacy",
                "Split_ID_Legacy",
                "Agent Card",
                "Agent Name - Legacy",
                "GCI",
                "Total to House",
                "Total to House from Agent",
                "Discrepancy",
                "Deal Type - Legacy",
                "Unique Commission ID - Legacy",
            ])
        );
        assert_eq!(t.rows.len(), 2);
        assert_eq!(t.value(0, "Agent Card"), "alice@realty.com");
        assert_eq!(t.value(1, "Unique Commission ID - Legacy"), "bob@realty.com-101");
        assert_eq!(t.value(0, "GCI"), "250.00");
        assert_eq!(t.value(0, "Deal Type - Legacy"), "Sale");
        // 1000 * 0.5 * 0.5 = 250 per agent; 500 - 100
        assert_eq!(t.value(0, "Total to House from Agent"), "250.00");
        assert_eq!(t.value(0, "Discrepancy"), "400.00");

        let r = &out.report;
        assert_eq!(r.loaded, 4);
        assert_eq!(r.incomplete_removed, 1);
        assert_eq!(r.duplicates_removed, 1);
        assert_eq!(r.agent_emails_mapped, 3);
        assert_eq!(r.output_rows, 2);
        assert_eq!(r.discrepancy_groups, 1);
        assert_eq!(r.discrepancy_skipped, None);
    }

    #[test]
    fn half_cent_fee_rounds_to_even() {
        let config = NormalizeConfig::builtin().unwrap();
        let mut input = input(
            &["Agent name", "Deal ID", "Fee Amount"],
            &[&["Alice", "1", "12.125"], &["Bob", "2", "12.375"]],
        );
        input.target_header = strings(&["ID", "Fee Amount - Legacy"]);

        let out = run(&config, &input).unwrap();
        assert_eq!(out.table.value(0, "Fee Amount - Legacy"), "12.12");
        assert_eq!(out.table.value(1, "Fee Amount - Legacy"), "12.38");
    }

    #[test]
    fn schema_without_discrepancy_is_reported() {
        let config = NormalizeConfig::builtin().unwrap();
        let mut input = input(&["Agent name", "Deal ID"], &[&["Alice", "1"]]);
        input.target_header = strings(&["ID", "Agent Card"]);

        let out = run(&config, &input).unwrap();
        assert!(out.table.column("Discrepancy").is_none());
        let reason = out.report.discrepancy_skipped.unwrap();
        assert!(reason.contains("Discrepancy"), "{reason}");
        assert_eq!(out.report.discrepancy_groups, 0);
    }

    #[test]
    fn missing_identity_column_is_fatal() {
        let config = NormalizeConfig::builtin().unwrap();
        let input = input(&["Agent name", "Fee Amount"], &[&["Alice", "10"]]);
        let err = run(&config, &input).err().unwrap();
        assert!(matches!(err, NormalizeError::MissingColumn { .. }));
    }

    #[test]
    fn missing_reference_columns_is_fatal() {
        let config = NormalizeConfig::builtin().unwrap();
        let mut input = input(&["Agent name", "Deal ID"], &[&["Alice", "1"]]);
        input.reference = Table::new(strings(&["Agent", "Mail"]), vec![]);
        let err = run(&config, &input).err().unwrap();
        assert!(err.to_string().starts_with("reference:"));
    }
}
