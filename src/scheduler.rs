//! Topological scheduler (C7): orders formulas by declared reads/writes,
//! preserving original order on ties, and rejects cyclic configurations.
//!
//! Grounded on the teacher's `core::array_calculator` table-ordering pass
//! (`get_table_calculation_order`), which builds a `petgraph::DiGraph` and
//! calls `toposort`. That pass doesn't need tie-break stability; this one
//! does (spec §4.6), so scheduling here runs a Kahn's-algorithm walk over
//! the same graph structure, always picking the lowest-original-index
//! ready node instead of relying on `toposort`'s DFS order.

use crate::config::{Config, Formula, FormulaKind, Rule};
use crate::error::EngineError;
use crate::predicate::Predicate;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::{HashMap, HashSet};

/// Names a formula reads and writes (spec §4.6).
#[derive(Debug, Clone, Default)]
pub struct FormulaDeps {
    pub reads: HashSet<String>,
    pub writes: HashSet<String>,
}

pub fn formula_deps(formula: &Formula) -> FormulaDeps {
    let mut deps = FormulaDeps::default();
    deps.writes.insert(crate::scope::normalize(&formula.id).to_string());
    if let Some(alias) = &formula.alias {
        deps.writes.insert(crate::scope::normalize(alias).to_string());
    }

    match &formula.kind {
        FormulaKind::Expression { inputs, .. } => {
            for name in inputs {
                deps.reads.insert(crate::scope::normalize(name).to_string());
            }
        }
        FormulaKind::Switch { switch, when, default_vars, .. } => {
            deps.reads.insert(crate::scope::normalize(switch).to_string());
            for arm in when {
                collect_predicate_vars(&arm.condition, &mut deps.reads);
                if let Some(set_vars) = &arm.set_vars {
                    insert_normalized_keys(set_vars, &mut deps.writes);
                }
            }
            if let Some(set_vars) = default_vars {
                insert_normalized_keys(set_vars, &mut deps.writes);
            }
        }
        FormulaKind::Rules { rules } => {
            for rule in rules {
                match rule {
                    Rule::Ranges { var, ranges } => {
                        deps.reads.insert(crate::scope::normalize(var).to_string());
                        for range in ranges {
                            collect_predicate_vars(&range.condition, &mut deps.reads);
                            if let Some(set_vars) = &range.set_vars {
                                insert_normalized_keys(set_vars, &mut deps.writes);
                            }
                        }
                    }
                    Rule::Single { var, condition, set_vars, .. } => {
                        deps.reads.insert(crate::scope::normalize(var).to_string());
                        collect_predicate_vars(condition, &mut deps.reads);
                        if let Some(set_vars) = set_vars {
                            insert_normalized_keys(set_vars, &mut deps.writes);
                        }
                    }
                }
            }
        }
        FormulaKind::Scoring { scoring } => {
            for var in &scoring.ifs.vars {
                deps.reads.insert(crate::scope::normalize(var).to_string());
            }
            for branch in &scoring.ifs.tree {
                collect_predicate_vars(&branch.condition, &mut deps.reads);
                for range in &branch.ranges {
                    collect_predicate_vars(&range.condition, &mut deps.reads);
                    if let Some(set_vars) = &range.set_vars {
                        insert_normalized_keys(set_vars, &mut deps.writes);
                    }
                }
            }
        }
    }

    deps
}

fn insert_normalized_keys(map: &HashMap<String, serde_json::Value>, out: &mut HashSet<String>) {
    for key in map.keys() {
        out.insert(crate::scope::normalize(key).to_string());
    }
}

fn collect_predicate_vars(predicate: &Predicate, out: &mut HashSet<String>) {
    match predicate {
        Predicate::And { and } => and.iter().for_each(|p| collect_predicate_vars(p, out)),
        Predicate::Or { or } => or.iter().for_each(|p| collect_predicate_vars(p, out)),
        Predicate::Leaf(leaf) => {
            if let Some(var) = &leaf.var {
                out.insert(crate::scope::normalize(var).to_string());
            }
        }
    }
}

/// Order `config.formulas` so every formula appears after whatever it
/// reads. Ties break by original position.
pub fn schedule(config: &Config) -> Result<Vec<usize>, EngineError> {
    let deps: Vec<FormulaDeps> = config.formulas.iter().map(formula_deps).collect();

    let writer_of: HashMap<&str, usize> = deps
        .iter()
        .enumerate()
        .flat_map(|(i, d)| d.writes.iter().map(move |w| (w.as_str(), i)))
        .collect();

    let mut graph: DiGraph<usize, ()> = DiGraph::new();
    let nodes: Vec<NodeIndex> = (0..config.formulas.len()).map(|i| graph.add_node(i)).collect();

    for (i, dep) in deps.iter().enumerate() {
        for read in &dep.reads {
            if let Some(&producer) = writer_of.get(read.as_str()) {
                if producer != i {
                    graph.add_edge(nodes[producer], nodes[i], ());
                }
            }
        }
    }

    let n = config.formulas.len();
    let mut indegree = vec![0usize; n];
    for i in 0..n {
        indegree[i] = graph.neighbors_directed(nodes[i], petgraph::Direction::Incoming).count();
    }

    let mut ready: Vec<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    let mut remaining = n;

    while !ready.is_empty() {
        ready.sort_unstable();
        let i = ready.remove(0);
        order.push(i);
        remaining -= 1;
        for succ in graph.neighbors_directed(nodes[i], petgraph::Direction::Outgoing) {
            let j = graph[succ];
            indegree[j] -= 1;
            if indegree[j] == 0 {
                ready.push(j);
            }
        }
    }

    if remaining > 0 {
        let participants: Vec<String> = (0..n)
            .filter(|&i| indegree[i] > 0)
            .map(|i| config.formulas[i].id.clone())
            .collect();
        return Err(EngineError::DependencyError {
            message: "dependency cycle among formulas".to_string(),
            participants,
        });
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_from(json: &str) -> Config {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn orders_expression_before_dependent_switch() {
        let config = config_from(
            r#"{"formulas": [
                { "id": "category", "switch": "$bmi_value",
                  "when": [{ "if": {"op":"<","value":18.5}, "result":"Underweight" }] },
                { "id": "bmi", "formula": "round((weight/((height/100)**2)),2)",
                  "inputs": ["weight","height"], "as": "$bmi_value" }
            ]}"#,
        );
        let order = schedule(&config).unwrap();
        assert_eq!(order, vec![1, 0]);
    }

    #[test]
    fn preserves_original_order_among_independents() {
        let config = config_from(
            r#"{"formulas": [
                { "id": "a", "formula": "1", "inputs": [] },
                { "id": "b", "formula": "2", "inputs": [] },
                { "id": "c", "formula": "3", "inputs": [] }
            ]}"#,
        );
        let order = schedule(&config).unwrap();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn detects_cycle() {
        let config = config_from(
            r#"{"formulas": [
                { "id": "A", "formula": "B+1", "inputs": ["B"] },
                { "id": "B", "formula": "A+1", "inputs": ["A"] }
            ]}"#,
        );
        let err = schedule(&config).unwrap_err();
        match err {
            EngineError::DependencyError { participants, .. } => {
                assert_eq!(participants.len(), 2);
            }
            other => panic!("expected DependencyError, got {:?}", other),
        }
    }
}
