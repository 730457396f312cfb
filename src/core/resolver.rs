//! Calculated-parameter resolution for one test
//!
//! Two orders are available (see [`ResolutionOrder`]):
//!
//! - **List order** (default): a single pass over the parameters as
//!   listed. Each formula sees the context as updated by every calculated
//!   parameter before it. A formula that references a calculated
//!   parameter listed *after* it reads that parameter's previous value
//!   (or 0). Stored templates are authored against this behavior.
//! - **Dependency order**: a graph over `[Name]` references between
//!   calculated parameters, evaluated in topological order with list
//!   order breaking ties. Cycles are reported, not evaluated.
//!
//! A failing formula never stops the pass: the parameter keeps its
//! previous value and the failure is recorded.

use std::collections::{BTreeMap, HashMap};

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use tracing::{trace, warn};

use crate::config::{EngineConfig, ResolutionOrder};
use crate::core::context::EvalContext;
use crate::core::diagnostic::DiagnosticKind;
use crate::core::expression::{self, evaluate_str};
use crate::types::Parameter;

/// Outcome of resolving one test's calculated parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    /// Unrounded result per parameter index; `None` when not computed this pass
    pub computed: Vec<Option<f64>>,
    /// Problems keyed by parameter index, in list order
    pub issues: Vec<(usize, DiagnosticKind)>,
}

impl Resolution {
    fn new(len: usize) -> Self {
        Self {
            computed: vec![None; len],
            issues: Vec::new(),
        }
    }
}

/// Compute every calculated parameter, writing display values into
/// `parameters` and unrounded values into `ctx` as they resolve
pub fn resolve(
    parameters: &mut [Parameter],
    ctx: &mut EvalContext,
    config: &EngineConfig,
) -> Resolution {
    let mut resolution = match config.resolution {
        ResolutionOrder::ListOrder => resolve_in_list_order(parameters, ctx, config),
        ResolutionOrder::Dependency => resolve_in_dependency_order(parameters, ctx, config),
    };
    resolution.issues.sort_by_key(|(index, _)| *index);
    resolution
}

fn resolve_in_list_order(
    parameters: &mut [Parameter],
    ctx: &mut EvalContext,
    config: &EngineConfig,
) -> Resolution {
    let mut resolution = Resolution::new(parameters.len());
    for (index, param) in parameters.iter_mut().enumerate() {
        evaluate_parameter(index, param, ctx, config, &mut resolution);
    }
    resolution
}

/// Evaluate one calculated parameter against the current context
fn evaluate_parameter(
    index: usize,
    param: &mut Parameter,
    ctx: &mut EvalContext,
    config: &EngineConfig,
    resolution: &mut Resolution,
) {
    let Some(formula) = param.active_formula() else {
        return;
    };

    match evaluate_str(formula, ctx, config.missing_reference) {
        Ok(value) => {
            trace!(parameter = %param.name, value, "calculated");
            param.value = Some(config.format_value(value));
            if !param.name.trim().is_empty() {
                ctx.set(param.name.clone(), value);
            }
            resolution.computed[index] = Some(value);
        }
        Err(e) => {
            trace!(parameter = %param.name, error = %e, "formula failed, keeping previous value");
            resolution.issues.push((index, DiagnosticKind::Formula(e)));
        }
    }
}

/// Reference graph between calculated parameters.
/// Node weights are parameter indices; an edge `a -> b` means b's formula reads a.
fn build_graph(parameters: &[Parameter]) -> DiGraph<usize, ()> {
    let mut graph = DiGraph::new();
    let mut by_name: HashMap<&str, NodeIndex> = HashMap::new();
    let mut nodes = Vec::new();

    for (index, param) in parameters.iter().enumerate() {
        if let Some(formula) = param.active_formula() {
            let node = graph.add_node(index);
            by_name.insert(param.name.as_str(), node);
            nodes.push((node, formula));
        }
    }

    for (node, formula) in nodes {
        // An unparseable formula has no edges; it fails when evaluated
        let refs = expression::references(formula).unwrap_or_default();
        for name in refs {
            if let Some(&dep) = by_name.get(name.as_str()) {
                graph.update_edge(dep, node, ());
            }
        }
    }

    graph
}

fn resolve_in_dependency_order(
    parameters: &mut [Parameter],
    ctx: &mut EvalContext,
    config: &EngineConfig,
) -> Resolution {
    let mut resolution = Resolution::new(parameters.len());
    let graph = build_graph(parameters);

    // Report cycles: multi-node components and self references
    for component in tarjan_scc(&graph) {
        let is_cycle = component.len() > 1 || graph.contains_edge(component[0], component[0]);
        if !is_cycle {
            continue;
        }
        let mut indices: Vec<usize> = component.iter().map(|n| graph[*n]).collect();
        indices.sort_unstable();
        let members: Vec<String> = indices
            .iter()
            .map(|i| parameters[*i].name.clone())
            .collect();
        warn!(members = ?members, "circular reference between calculated parameters");
        for index in indices {
            resolution.issues.push((
                index,
                DiagnosticKind::Cycle {
                    members: members.clone(),
                },
            ));
        }
    }

    // Kahn's algorithm; the ready set is keyed by list index for stable ties
    let mut pending: HashMap<NodeIndex, usize> = graph
        .node_indices()
        .map(|n| (n, graph.neighbors_directed(n, Direction::Incoming).count()))
        .collect();
    let mut ready: BTreeMap<usize, NodeIndex> = pending
        .iter()
        .filter(|(_, count)| **count == 0)
        .map(|(n, _)| (graph[*n], *n))
        .collect();
    let mut done: Vec<NodeIndex> = Vec::new();

    while let Some((index, node)) = ready.pop_first() {
        pending.remove(&node);
        evaluate_parameter(index, &mut parameters[index], ctx, config, &mut resolution);
        done.push(node);

        for next in graph.neighbors(node) {
            if let Some(count) = pending.get_mut(&next) {
                *count -= 1;
                if *count == 0 {
                    ready.insert(graph[next], next);
                }
            }
        }
    }

    // Whatever is still pending sits on or behind a cycle
    let cyclic: Vec<usize> = resolution.issues.iter().map(|(i, _)| *i).collect();
    let mut blocked: Vec<NodeIndex> = pending.into_keys().collect();
    blocked.sort_by_key(|n| graph[*n]);
    for node in blocked {
        let index = graph[node];
        if cyclic.contains(&index) {
            continue;
        }
        let upstream = graph
            .neighbors_directed(node, Direction::Incoming)
            .filter(|n| !done.contains(n))
            .map(|n| graph[n])
            .min();
        if let Some(upstream) = upstream {
            resolution.issues.push((
                index,
                DiagnosticKind::DependsOnCycle {
                    name: parameters[upstream].name.clone(),
                },
            ));
        }
    }

    resolution
}

/// Calculated parameters that read a calculated parameter listed after
/// them. In list-order mode these see that parameter's previous value.
/// Returns `(index, referenced name)` pairs in list order.
pub fn forward_references(parameters: &[Parameter]) -> Vec<(usize, String)> {
    let calculated_at: HashMap<&str, usize> = parameters
        .iter()
        .enumerate()
        .filter(|(_, p)| p.active_formula().is_some())
        .map(|(i, p)| (p.name.as_str(), i))
        .collect();

    let mut found = Vec::new();
    for (index, param) in parameters.iter().enumerate() {
        let Some(formula) = param.active_formula() else {
            continue;
        };
        for name in expression::references(formula).unwrap_or_default() {
            if calculated_at.get(name.as_str()).is_some_and(|&at| at > index) {
                found.push((index, name));
            }
        }
    }
    found
}
