//! Definition compiler and validator.
//!
//! Validation layers, in order: structural (ids, endpoints, routing shape),
//! reachability from the entry point, cycle analysis, and agent binding.
//! All diagnostics are accumulated so registration surfaces every problem
//! at once instead of failing on the first.

use std::collections::{HashMap, HashSet};

use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::visit::Bfs;

use crate::agents::AgentRegistry;
use crate::definition::schema::{NodeSpec, WorkflowDefinition};
use crate::definition::validation::{Diagnostic, ValidationReport};
use crate::error::WorkflowError;

use super::compiled::{CompiledWorkflow, Routing};

/// Compile-time policy knobs.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// When set, agent names that do not resolve in the registry at compile
    /// time are allowed through; resolution failure then surfaces at
    /// dispatch time as a non-retryable `UnknownAgent` run failure.
    pub allow_deferred_binding: bool,
}

/// Compile a definition into a reusable artifact, or reject it with every
/// validation error found.
pub fn compile(
    definition: &WorkflowDefinition,
    registry: &AgentRegistry,
    options: &CompileOptions,
) -> Result<CompiledWorkflow, WorkflowError> {
    let mut diagnostics = Vec::new();

    check_structure(definition, &mut diagnostics);

    // Graph construction only makes sense once every referenced node exists.
    let fatal = diagnostics
        .iter()
        .any(|d| matches!(d.code.as_str(), "E001" | "E002" | "E003"));
    if fatal {
        return Err(WorkflowError::ValidationFailed(Box::new(
            ValidationReport::from_diagnostics(diagnostics),
        )));
    }

    let (graph, node_index_map) = build_graph(definition);

    check_reachability(definition, &graph, &node_index_map, &mut diagnostics);
    check_cycles(definition, &graph, &mut diagnostics);
    check_agent_binding(definition, registry, options, &mut diagnostics);

    let report = ValidationReport::from_diagnostics(diagnostics);
    if !report.is_valid {
        return Err(WorkflowError::ValidationFailed(Box::new(report)));
    }

    let routing = build_routing(definition);
    Ok(CompiledWorkflow::new(
        definition,
        graph,
        node_index_map,
        routing,
    ))
}

fn check_structure(definition: &WorkflowDefinition, diagnostics: &mut Vec<Diagnostic>) {
    if definition.nodes.is_empty() {
        diagnostics.push(Diagnostic::error("E001", "workflow has no nodes"));
    }

    let mut seen = HashSet::new();
    for node in &definition.nodes {
        if !seen.insert(node.id.as_str()) {
            diagnostics.push(Diagnostic::error_at(
                "E001",
                format!("duplicate node id: {}", node.id),
                node.id.clone(),
            ));
        }
    }

    if !seen.contains(definition.entry_point.as_str()) {
        diagnostics.push(Diagnostic::error(
            "E002",
            format!(
                "entry_point references unknown node: {}",
                definition.entry_point
            ),
        ));
    }

    for edge in &definition.edges {
        for endpoint in [&edge.from, &edge.to] {
            if !seen.contains(endpoint.as_str()) {
                diagnostics.push(Diagnostic::error(
                    "E003",
                    format!("edge references unknown node: {}", endpoint),
                ));
            }
        }
    }

    for cedge in &definition.conditional_edges {
        if !seen.contains(cedge.from.as_str()) {
            diagnostics.push(Diagnostic::error(
                "E003",
                format!("conditional edge references unknown node: {}", cedge.from),
            ));
        }
        for branch in &cedge.branches {
            if !seen.contains(branch.target.as_str()) {
                diagnostics.push(Diagnostic::error(
                    "E003",
                    format!(
                        "conditional edge references unknown target: {}",
                        branch.target
                    ),
                ));
            }
        }
        if cedge.else_target.is_empty() {
            diagnostics.push(Diagnostic::error_at(
                "E004",
                format!("conditional edge from {} has no else_target", cedge.from),
                cedge.from.clone(),
            ));
        } else if !seen.contains(cedge.else_target.as_str()) {
            diagnostics.push(Diagnostic::error(
                "E003",
                format!(
                    "conditional edge references unknown else_target: {}",
                    cedge.else_target
                ),
            ));
        }
    }

    // Routing shape: a node routes either through one unconditional edge or
    // through one conditional edge block, never both.
    let mut unconditional_out: HashMap<&str, u32> = HashMap::new();
    for edge in &definition.edges {
        *unconditional_out.entry(edge.from.as_str()).or_default() += 1;
    }
    let mut conditional_from = HashSet::new();
    for cedge in &definition.conditional_edges {
        if !conditional_from.insert(cedge.from.as_str()) {
            diagnostics.push(Diagnostic::error_at(
                "E005",
                format!("multiple conditional edge blocks from node: {}", cedge.from),
                cedge.from.clone(),
            ));
        }
    }
    for (from, count) in &unconditional_out {
        if *count > 1 {
            diagnostics.push(Diagnostic::error_at(
                "E005",
                format!("node {} has {} unconditional outgoing edges", from, count),
                from.to_string(),
            ));
        }
        if conditional_from.contains(from) {
            diagnostics.push(Diagnostic::error_at(
                "E005",
                format!(
                    "node {} mixes conditional and unconditional outgoing edges",
                    from
                ),
                from.to_string(),
            ));
        }
    }
}

fn build_graph(
    definition: &WorkflowDefinition,
) -> (StableDiGraph<NodeSpec, ()>, HashMap<String, NodeIndex>) {
    let mut graph = StableDiGraph::new();
    let mut node_index_map = HashMap::new();

    for node in &definition.nodes {
        let idx = graph.add_node(node.clone());
        node_index_map.insert(node.id.clone(), idx);
    }

    for edge in &definition.edges {
        let from = node_index_map[edge.from.as_str()];
        let to = node_index_map[edge.to.as_str()];
        graph.add_edge(from, to, ());
    }
    for cedge in &definition.conditional_edges {
        let from = node_index_map[cedge.from.as_str()];
        for branch in &cedge.branches {
            graph.add_edge(from, node_index_map[branch.target.as_str()], ());
        }
        graph.add_edge(from, node_index_map[cedge.else_target.as_str()], ());
    }

    (graph, node_index_map)
}

fn check_reachability(
    definition: &WorkflowDefinition,
    graph: &StableDiGraph<NodeSpec, ()>,
    node_index_map: &HashMap<String, NodeIndex>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let entry = node_index_map[definition.entry_point.as_str()];
    let mut reachable = HashSet::new();
    let mut bfs = Bfs::new(graph, entry);
    while let Some(idx) = bfs.next(graph) {
        reachable.insert(idx);
    }

    for node in &definition.nodes {
        let idx = node_index_map[node.id.as_str()];
        if !reachable.contains(&idx) {
            diagnostics.push(Diagnostic::error_at(
                "E101",
                format!("node unreachable from entry_point: {}", node.id),
                node.id.clone(),
            ));
        }
    }
}

/// DFS coloring. Every detected cycle must contain a node whose conditional
/// else_target exits the cycle; otherwise the run could never leave it and
/// the definition is rejected as an unbounded cycle.
fn check_cycles(
    definition: &WorkflowDefinition,
    graph: &StableDiGraph<NodeSpec, ()>,
    diagnostics: &mut Vec<Diagnostic>,
) {
    #[derive(Clone, Copy, PartialEq)]
    enum Color {
        White,
        Gray,
        Black,
    }

    let mut color: HashMap<NodeIndex, Color> =
        graph.node_indices().map(|i| (i, Color::White)).collect();
    let mut stack: Vec<NodeIndex> = Vec::new();
    let mut cycles: Vec<Vec<String>> = Vec::new();

    // Iterative DFS with an explicit stack of (node, child iterator state).
    for start in graph.node_indices() {
        if color[&start] != Color::White {
            continue;
        }
        let mut dfs: Vec<(NodeIndex, Vec<NodeIndex>)> = vec![(
            start,
            graph
                .neighbors_directed(start, petgraph::Direction::Outgoing)
                .collect(),
        )];
        color.insert(start, Color::Gray);
        stack.push(start);

        while let Some((node, children)) = dfs.last_mut() {
            match children.pop() {
                Some(child) => match color[&child] {
                    Color::White => {
                        color.insert(child, Color::Gray);
                        stack.push(child);
                        let grandchildren = graph
                            .neighbors_directed(child, petgraph::Direction::Outgoing)
                            .collect();
                        dfs.push((child, grandchildren));
                    }
                    Color::Gray => {
                        // Back edge: the cycle is the stack segment from
                        // `child` to the current node.
                        let pos = stack.iter().position(|&n| n == child).unwrap_or(0);
                        let cycle: Vec<String> = stack[pos..]
                            .iter()
                            .filter_map(|idx| graph.node_weight(*idx).map(|n| n.id.clone()))
                            .collect();
                        cycles.push(cycle);
                    }
                    Color::Black => {}
                },
                None => {
                    color.insert(*node, Color::Black);
                    stack.pop();
                    dfs.pop();
                }
            }
        }
    }

    for cycle in cycles {
        let members: HashSet<&str> = cycle.iter().map(|s| s.as_str()).collect();
        let has_exit = definition.conditional_edges.iter().any(|cedge| {
            members.contains(cedge.from.as_str()) && !members.contains(cedge.else_target.as_str())
        });
        if !has_exit {
            let mut sorted: Vec<&str> = cycle.iter().map(|s| s.as_str()).collect();
            sorted.sort_unstable();
            diagnostics.push(Diagnostic::error(
                "E102",
                format!("unbounded cycle [{}]", sorted.join(", ")),
            ));
        }
    }
}

fn check_agent_binding(
    definition: &WorkflowDefinition,
    registry: &AgentRegistry,
    options: &CompileOptions,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if options.allow_deferred_binding {
        return;
    }
    for node in &definition.nodes {
        if registry.get(&node.agent).is_none() {
            diagnostics.push(Diagnostic::error_at(
                "E201",
                format!("unknown agent '{}' on node {}", node.agent, node.id),
                node.id.clone(),
            ));
        }
    }
}

fn build_routing(definition: &WorkflowDefinition) -> HashMap<String, Routing> {
    let mut routing: HashMap<String, Routing> = definition
        .nodes
        .iter()
        .map(|n| (n.id.clone(), Routing::Terminal))
        .collect();

    for edge in &definition.edges {
        routing.insert(edge.from.clone(), Routing::Next(edge.to.clone()));
    }
    for cedge in &definition.conditional_edges {
        routing.insert(
            cedge.from.clone(),
            Routing::Conditional {
                branches: cedge.branches.clone(),
                else_target: cedge.else_target.clone(),
            },
        );
    }

    routing
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::builtin::EchoAgent;
    use crate::definition::schema::{
        ComparisonOperator, ConditionBranch, ConditionSpec, ConditionalEdgeSpec, EdgeSpec,
    };
    use serde_json::json;
    use std::sync::Arc;

    fn node(id: &str, agent: &str) -> NodeSpec {
        NodeSpec {
            id: id.to_string(),
            agent: agent.to_string(),
            config: json!({}),
            timeout_secs: 30,
            retry: None,
            optional: false,
        }
    }

    fn edge(from: &str, to: &str) -> EdgeSpec {
        EdgeSpec {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    fn registry() -> AgentRegistry {
        let mut registry = AgentRegistry::new();
        registry.register("echo", Arc::new(EchoAgent));
        registry
    }

    fn definition(
        nodes: Vec<NodeSpec>,
        edges: Vec<EdgeSpec>,
        conditional_edges: Vec<ConditionalEdgeSpec>,
        entry: &str,
    ) -> WorkflowDefinition {
        WorkflowDefinition {
            name: "test".to_string(),
            nodes,
            edges,
            conditional_edges,
            entry_point: entry.to_string(),
            max_steps: 1000,
        }
    }

    #[test]
    fn test_compile_linear() {
        let def = definition(
            vec![node("a", "echo"), node("b", "echo")],
            vec![edge("a", "b")],
            vec![],
            "a",
        );
        let compiled = compile(&def, &registry(), &CompileOptions::default()).unwrap();
        assert_eq!(compiled.node_count(), 2);
        assert!(matches!(compiled.routing("a").unwrap(), Routing::Next(t) if t == "b"));
        assert!(matches!(compiled.routing("b").unwrap(), Routing::Terminal));
    }

    #[test]
    fn test_reject_unknown_entry_point() {
        let def = definition(vec![node("a", "echo")], vec![], vec![], "missing");
        let err = compile(&def, &registry(), &CompileOptions::default()).unwrap_err();
        match err {
            WorkflowError::ValidationFailed(report) => {
                assert!(report.diagnostics.iter().any(|d| d.code == "E002"));
            }
            other => panic!("expected ValidationFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_reject_duplicate_node_ids() {
        let def = definition(
            vec![node("a", "echo"), node("a", "echo")],
            vec![],
            vec![],
            "a",
        );
        let err = compile(&def, &registry(), &CompileOptions::default()).unwrap_err();
        match err {
            WorkflowError::ValidationFailed(report) => {
                assert!(report.diagnostics.iter().any(|d| d.code == "E001"));
            }
            other => panic!("expected ValidationFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_reject_unreachable_node() {
        let def = definition(
            vec![node("a", "echo"), node("b", "echo"), node("orphan", "echo")],
            vec![edge("a", "b")],
            vec![],
            "a",
        );
        let err = compile(&def, &registry(), &CompileOptions::default()).unwrap_err();
        match err {
            WorkflowError::ValidationFailed(report) => {
                let diag = report
                    .diagnostics
                    .iter()
                    .find(|d| d.code == "E101")
                    .expect("unreachable diagnostic");
                assert_eq!(diag.node_id.as_deref(), Some("orphan"));
            }
            other => panic!("expected ValidationFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_reject_unbounded_cycle() {
        let def = definition(
            vec![node("a", "echo"), node("b", "echo")],
            vec![edge("a", "b"), edge("b", "a")],
            vec![],
            "a",
        );
        let err = compile(&def, &registry(), &CompileOptions::default()).unwrap_err();
        match err {
            WorkflowError::ValidationFailed(report) => {
                let diag = report
                    .diagnostics
                    .iter()
                    .find(|d| d.code == "E102")
                    .expect("cycle diagnostic");
                assert!(diag.message.contains("unbounded cycle [a, b]"));
            }
            other => panic!("expected ValidationFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_accept_cycle_with_conditional_exit() {
        // a -> b, b conditionally loops back to a or exits to c.
        let def = definition(
            vec![node("a", "echo"), node("b", "echo"), node("c", "echo")],
            vec![edge("a", "b")],
            vec![ConditionalEdgeSpec {
                from: "b".to_string(),
                branches: vec![ConditionBranch {
                    condition: ConditionSpec {
                        variable: "retry".to_string(),
                        operator: ComparisonOperator::Eq,
                        value: json!(true),
                    },
                    target: "a".to_string(),
                }],
                else_target: "c".to_string(),
            }],
            "a",
        );
        let compiled = compile(&def, &registry(), &CompileOptions::default()).unwrap();
        assert!(matches!(
            compiled.routing("b").unwrap(),
            Routing::Conditional { .. }
        ));
    }

    #[test]
    fn test_reject_cycle_whose_else_stays_inside() {
        // a <-> b with a conditional whose else also targets the cycle.
        let def = definition(
            vec![node("a", "echo"), node("b", "echo")],
            vec![edge("a", "b")],
            vec![ConditionalEdgeSpec {
                from: "b".to_string(),
                branches: vec![ConditionBranch {
                    condition: ConditionSpec {
                        variable: "x".to_string(),
                        operator: ComparisonOperator::Eq,
                        value: json!(1),
                    },
                    target: "a".to_string(),
                }],
                else_target: "a".to_string(),
            }],
            "a",
        );
        let err = compile(&def, &registry(), &CompileOptions::default()).unwrap_err();
        match err {
            WorkflowError::ValidationFailed(report) => {
                assert!(report.diagnostics.iter().any(|d| d.code == "E102"));
            }
            other => panic!("expected ValidationFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_reject_unknown_agent_eager_binding() {
        let def = definition(vec![node("a", "nonexistent")], vec![], vec![], "a");
        let err = compile(&def, &registry(), &CompileOptions::default()).unwrap_err();
        match err {
            WorkflowError::ValidationFailed(report) => {
                assert!(report.diagnostics.iter().any(|d| d.code == "E201"));
            }
            other => panic!("expected ValidationFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_deferred_binding_allows_unknown_agent() {
        let def = definition(vec![node("a", "nonexistent")], vec![], vec![], "a");
        let options = CompileOptions {
            allow_deferred_binding: true,
        };
        assert!(compile(&def, &registry(), &options).is_ok());
    }

    #[test]
    fn test_all_errors_reported_together() {
        // Unknown agent on one node and an unreachable node: both must
        // appear in a single report.
        let def = definition(
            vec![node("a", "nonexistent"), node("orphan", "echo")],
            vec![],
            vec![],
            "a",
        );
        let err = compile(&def, &registry(), &CompileOptions::default()).unwrap_err();
        match err {
            WorkflowError::ValidationFailed(report) => {
                assert!(report.diagnostics.iter().any(|d| d.code == "E101"));
                assert!(report.diagnostics.iter().any(|d| d.code == "E201"));
            }
            other => panic!("expected ValidationFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_reject_mixed_routing() {
        let def = definition(
            vec![node("a", "echo"), node("b", "echo"), node("c", "echo")],
            vec![edge("a", "b")],
            vec![ConditionalEdgeSpec {
                from: "a".to_string(),
                branches: vec![],
                else_target: "c".to_string(),
            }],
            "a",
        );
        let err = compile(&def, &registry(), &CompileOptions::default()).unwrap_err();
        match err {
            WorkflowError::ValidationFailed(report) => {
                assert!(report.diagnostics.iter().any(|d| d.code == "E005"));
            }
            other => panic!("expected ValidationFailed, got {:?}", other),
        }
    }
}
