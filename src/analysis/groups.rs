//! Partitioning records by a categorical column.

use std::collections::BTreeMap;

use crate::domain::{AGGREGATE_KEY, CleanedTable, SalesRecord};

/// Records split by group key, plus the number of records with no value for
/// the grouping column.
#[derive(Debug, Default)]
pub struct Partition<'a> {
    pub groups: BTreeMap<String, Vec<&'a SalesRecord>>,
    pub ungrouped: usize,
}

/// Split `table` by `group_col`, or put everything under `__aggregate__`
/// when no column is given.
pub fn partition<'a>(table: &'a CleanedTable, group_col: Option<&str>) -> Partition<'a> {
    let mut out = Partition::default();
    for record in table.records() {
        let key = match group_col {
            Some(col) => match record.category(col) {
                Some(value) => value.into_owned(),
                None => {
                    out.ungrouped += 1;
                    continue;
                }
            },
            None => AGGREGATE_KEY.to_string(),
        };
        out.groups.entry(key).or_default().push(record);
    }
    out
}
