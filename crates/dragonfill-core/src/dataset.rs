use std::collections::BTreeMap;

use crate::schema::{TableName, TableSchema};
use crate::types::Value;

/// One positional row, laid out as the table's schema columns.
pub type Row = Vec<Value>;

/// A finished table: rows in id order, columns in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: TableName,
    pub rows: Vec<Row>,
}

impl Table {
    pub fn new(name: TableName) -> Self {
        Self {
            name,
            rows: Vec::new(),
        }
    }

    pub fn schema(&self) -> &'static TableSchema {
        self.name.schema()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn push(&mut self, row: Row) {
        self.rows.push(row);
    }

    /// Iterate over a single column by name. Unknown columns yield nothing.
    pub fn column<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Value> + 'a {
        let index = self.schema().column_index(name);
        self.rows
            .iter()
            .filter_map(move |row| index.and_then(|index| row.get(index)))
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.schema().column_index(column)?;
        self.rows.get(row)?.get(index)
    }
}

/// The complete set of generated tables keyed by name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    tables: BTreeMap<TableName, Table>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: Table) {
        self.tables.insert(table.name, table);
    }

    pub fn get(&self, name: TableName) -> Option<&Table> {
        self.tables.get(&name)
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.values()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn row_counts(&self) -> BTreeMap<TableName, usize> {
        self.tables
            .iter()
            .map(|(name, table)| (*name, table.len()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_lookup_follows_schema_order() {
        let mut table = Table::new(TableName::City);
        table.push(vec![Value::id(1), Value::text("Wroclaw"), Value::Null]);
        table.push(vec![Value::id(2), Value::text("Opole"), Value::Null]);

        let names: Vec<_> = table.column("city").map(Value::to_csv).collect();
        assert_eq!(names, vec!["Wroclaw", "Opole"]);
        assert_eq!(table.value(1, "city_id"), Some(&Value::Int(2)));
        assert_eq!(table.column("missing").count(), 0);
    }
}
