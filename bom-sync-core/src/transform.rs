//! Row-wise union of the kept tabs and the derived `Formatted PON` column.

use std::collections::HashMap;

use crate::table::{Table, ASSEMBLY_COLUMN, DESCRIPTION_COLUMN};

pub const FORMATTED_PON_COLUMN: &str = "Formatted PON";

/// Concatenates tables by column label.
///
/// Columns appear in order of first appearance across the inputs; records
/// keep input order. A record lacking one of the union's columns gets a
/// missing value there.
pub fn concat_tables(tables: Vec<Table>) -> Table {
    let mut columns: Vec<String> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for table in &tables {
        for column in &table.columns {
            if !positions.contains_key(column) {
                positions.insert(column.clone(), columns.len());
                columns.push(column.clone());
            }
        }
    }

    let mut combined = Table::new(columns);
    for table in tables {
        let mapping: Vec<usize> = table.columns.iter().map(|column| positions[column]).collect();
        for record in table.records {
            let mut aligned = vec![None; combined.columns.len()];
            for (value, &target) in record.into_iter().zip(&mapping) {
                aligned[target] = value;
            }
            combined.records.push(aligned);
        }
    }
    combined
}

/// Sets `Formatted PON` to `"{assembly}-{description}"` on every record.
///
/// Missing values interpolate as empty strings. An existing `Formatted PON`
/// column is overwritten in place; otherwise the column is appended.
pub fn derive_formatted_pon(table: &mut Table) {
    let assembly = table.column_index(ASSEMBLY_COLUMN);
    let description = table.column_index(DESCRIPTION_COLUMN);
    let target = match table.column_index(FORMATTED_PON_COLUMN) {
        Some(index) => index,
        None => {
            table.columns.push(FORMATTED_PON_COLUMN.to_string());
            for record in &mut table.records {
                record.push(None);
            }
            table.columns.len() - 1
        }
    };

    for record in &mut table.records {
        let part = |index: Option<usize>| {
            index
                .and_then(|i| record[i].as_deref())
                .unwrap_or_default()
                .to_string()
        };
        let formatted = format!("{}-{}", part(assembly), part(description));
        record[target] = Some(formatted);
    }
}
