//! In-memory tabular data: one worksheet tab, or the combined result.

/// Column names a tab must carry to be kept.
pub const ASSEMBLY_COLUMN: &str = "assembly";
pub const DESCRIPTION_COLUMN: &str = "description";

/// Ordered columns plus ordered records. Each record holds exactly one
/// value per column; `None` is a missing value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    pub columns: Vec<String>,
    pub records: Vec<Vec<Option<String>>>,
}

impl Table {
    pub fn new(columns: Vec<String>) -> Self {
        Table {
            columns,
            records: Vec::new(),
        }
    }

    /// Appends a record, padding or truncating it to the column count.
    pub fn push_record(&mut self, mut record: Vec<Option<String>>) {
        record.resize(self.columns.len(), None);
        self.records.push(record);
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// True when both `assembly` and `description` are present (exact match).
    pub fn has_bom_columns(&self) -> bool {
        self.has_column(ASSEMBLY_COLUMN) && self.has_column(DESCRIPTION_COLUMN)
    }

    pub fn value(&self, record: usize, column: &str) -> Option<&str> {
        let index = self.column_index(column)?;
        self.records.get(record)?.get(index)?.as_deref()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bom_columns_are_case_sensitive() {
        let table = Table::new(vec!["Assembly".into(), "description".into()]);
        assert!(!table.has_bom_columns());

        let table = Table::new(vec!["qty".into(), "description".into(), "assembly".into()]);
        assert!(table.has_bom_columns());
    }

    #[test]
    fn push_record_pads_short_records() {
        let mut table = Table::new(vec!["a".into(), "b".into(), "c".into()]);
        table.push_record(vec![Some("1".into())]);
        assert_eq!(table.records[0], vec![Some("1".into()), None, None]);
        assert_eq!(table.value(0, "a"), Some("1"));
        assert_eq!(table.value(0, "b"), None);
    }
}
