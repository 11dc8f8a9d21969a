//! Dependency cycle detection.
//!
//! The dependency graph may be cyclic in pathological input; the engine
//! detects this once up-front and refuses to run. Detection is a DFS with
//! a recursion-stack marker so each reported cycle names its full path.

use reflow_core::WorkOrder;
use std::collections::{HashMap, HashSet};

/// Find dependency cycles among the given orders.
///
/// Returns one `Circular dependency detected: a → b → a` string per
/// cycle. Dependency ids that resolve to no order are skipped here; they
/// cannot form a cycle and the driver reports them separately.
pub fn detect_cycles(orders: &[WorkOrder]) -> Vec<String> {
    let index: HashMap<&str, &WorkOrder> =
        orders.iter().map(|o| (o.id.as_str(), o)).collect();

    let mut visited: HashSet<&str> = HashSet::new();
    let mut errors = Vec::new();

    for order in orders {
        if !visited.contains(order.id.as_str()) {
            let mut on_stack = HashSet::new();
            let mut path = Vec::new();
            visit(
                order.id.as_str(),
                &index,
                &mut visited,
                &mut on_stack,
                &mut path,
                &mut errors,
            );
        }
    }

    errors
}

fn visit<'a>(
    id: &'a str,
    index: &HashMap<&'a str, &'a WorkOrder>,
    visited: &mut HashSet<&'a str>,
    on_stack: &mut HashSet<&'a str>,
    path: &mut Vec<&'a str>,
    errors: &mut Vec<String>,
) {
    if on_stack.contains(id) {
        let first = path.iter().position(|&p| p == id).unwrap_or(0);
        let mut cycle: Vec<&str> = path[first..].to_vec();
        cycle.push(id);
        errors.push(format!(
            "Circular dependency detected: {}",
            cycle.join(" → ")
        ));
        return;
    }
    if !visited.insert(id) {
        return;
    }

    on_stack.insert(id);
    path.push(id);

    if let Some(order) = index.get(id) {
        for dep in &order.depends_on {
            visit(dep.as_str(), index, visited, on_stack, path, errors);
        }
    }

    path.pop();
    on_stack.remove(id);
}
