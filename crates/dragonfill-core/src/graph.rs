use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::schema::{TableName, TableSchema};

/// Summary of FK graph structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FkGraphSummary {
    pub nodes: usize,
    pub edges: usize,
}

/// Report for FK dependency ordering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FkGraphReport {
    pub summary: FkGraphSummary,
    pub topo_order: Option<Vec<TableName>>,
    pub cycle: Option<Vec<TableName>>,
}

/// Build a deterministic FK dependency report: referenced tables come first.
pub fn build_fk_graph_report<'a, I>(schemas: I) -> FkGraphReport
where
    I: IntoIterator<Item = &'a TableSchema>,
{
    let graph = build_adjacency(schemas);
    let nodes = graph.len();
    let edges = graph.values().map(|targets| targets.len()).sum();
    let summary = FkGraphSummary { nodes, edges };

    match toposort(&graph) {
        Ok(order) => FkGraphReport {
            summary,
            topo_order: Some(order),
            cycle: None,
        },
        Err(cycle) => FkGraphReport {
            summary,
            topo_order: None,
            cycle: Some(cycle),
        },
    }
}

/// Dependency order of the full output table set.
pub fn dataset_table_order() -> Vec<TableName> {
    build_fk_graph_report(TableName::ALL.iter().map(|table| table.schema()))
        .topo_order
        .unwrap_or_else(|| TableName::ALL.to_vec())
}

fn build_adjacency<'a, I>(schemas: I) -> BTreeMap<TableName, BTreeSet<TableName>>
where
    I: IntoIterator<Item = &'a TableSchema>,
{
    let mut graph: BTreeMap<TableName, BTreeSet<TableName>> = BTreeMap::new();

    for schema in schemas {
        graph.entry(schema.table).or_default();

        for fk in schema.foreign_keys {
            graph.entry(fk.references).or_default().insert(schema.table);
        }
    }

    graph
}

fn toposort(
    graph: &BTreeMap<TableName, BTreeSet<TableName>>,
) -> Result<Vec<TableName>, Vec<TableName>> {
    let mut indegree: BTreeMap<TableName, usize> =
        graph.keys().map(|node| (*node, 0)).collect();

    for targets in graph.values() {
        for target in targets {
            *indegree.entry(*target).or_insert(0) += 1;
        }
    }

    let mut ready: BTreeSet<TableName> = indegree
        .iter()
        .filter_map(|(node, count)| if *count == 0 { Some(*node) } else { None })
        .collect();

    let mut order = Vec::with_capacity(graph.len());

    while let Some(node) = ready.pop_first() {
        order.push(node);

        if let Some(targets) = graph.get(&node) {
            for target in targets {
                if let Some(count) = indegree.get_mut(target) {
                    *count = count.saturating_sub(1);
                    if *count == 0 {
                        ready.insert(*target);
                    }
                }
            }
        }
    }

    if order.len() == graph.len() {
        Ok(order)
    } else {
        let cycle_nodes: Vec<TableName> = indegree
            .into_iter()
            .filter_map(|(node, count)| if count > 0 { Some(node) } else { None })
            .collect();
        Err(cycle_nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnDef, ColumnKind, ForeignKeyDef};

    static ID: [ColumnDef; 1] = [ColumnDef {
        name: "id",
        kind: ColumnKind::Id,
        nullable: false,
    }];

    #[test]
    fn toposort_reports_cycle() {
        static SELF_REF: [ForeignKeyDef; 1] = [ForeignKeyDef {
            column: "id",
            references: TableName::Staff,
        }];
        let staff = TableSchema {
            table: TableName::Staff,
            columns: &ID,
            foreign_keys: &SELF_REF,
        };

        let report = build_fk_graph_report([&staff]);
        assert!(report.topo_order.is_none());
        assert!(
            report
                .cycle
                .as_ref()
                .expect("cycle")
                .contains(&TableName::Staff)
        );
    }

    #[test]
    fn dataset_order_puts_parents_first() {
        let order = dataset_table_order();
        assert_eq!(order.len(), TableName::ALL.len());

        let position = |table: TableName| {
            order
                .iter()
                .position(|item| *item == table)
                .expect("table in order")
        };

        for table in TableName::ALL {
            for fk in table.schema().foreign_keys {
                assert!(
                    position(fk.references) < position(table),
                    "{} must precede {}",
                    fk.references,
                    table
                );
            }
        }
    }
}
