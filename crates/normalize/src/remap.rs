use crate::config::ColumnMap;
use crate::model::{Cell, DealSplitRecord, OutputTable};
use crate::schema::TargetSchema;

/// Project records onto the target schema. Each target field takes the value
/// of the first mapped source field; unmapped or absent fields are empty.
pub fn remap(records: &[DealSplitRecord], schema: &TargetSchema, columns: &ColumnMap) -> OutputTable {
    let sources: Vec<Option<&str>> = schema
        .fields()
        .iter()
        .map(|target| columns.source_for(target))
        .collect();

    let unmapped: Vec<&str> = schema
        .fields()
        .iter()
        .zip(&sources)
        .filter(|(_, s)| s.is_none())
        .map(|(t, _)| t.as_str())
        .collect();
    if !unmapped.is_empty() {
        log::debug!("target fields with no source mapping: {}", unmapped.join(", "));
    }

    let rows = records
        .iter()
        .map(|record| {
            sources
                .iter()
                .map(|source| {
                    source
                        .and_then(|s| record.get(s))
                        .cloned()
                        .unwrap_or(Cell::Empty)
                })
                .collect()
        })
        .collect();

    OutputTable {
        headers: schema.fields().to_vec(),
        rows,
    }
}
