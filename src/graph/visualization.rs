//! Graph topology export for visualization and debugging.
//!
//! `generate_dot` renders the compiled topology as Graphviz DOT (fixed edges
//! solid, conditional edges dashed); `generate_text` gives a terse listing.

use std::fmt::Write;

use crate::graph::compiled::CompiledGraph;
use crate::graph::state_graph::{END, START};

/// Graphviz DOT rendering of the compiled topology.
pub fn generate_dot(graph: &CompiledGraph) -> String {
    let mut dot = String::from("digraph {\n");
    dot.push_str("  rankdir=LR;\n");
    dot.push_str("  node [shape=box];\n\n");
    let _ = writeln!(dot, "  \"{}\" [label=\"START\", style=bold];", START);
    let _ = writeln!(dot, "  \"{}\" [label=\"END\", style=bold];", END);

    let mut names: Vec<&String> = graph.nodes.keys().collect();
    names.sort();
    for name in &names {
        let _ = writeln!(dot, "  \"{}\";", name);
    }
    dot.push('\n');

    let mut sources: Vec<&String> = graph.edges.keys().collect();
    sources.sort();
    for from in sources {
        for to in &graph.edges[from.as_str()] {
            let _ = writeln!(dot, "  \"{}\" -> \"{}\";", from, to);
        }
    }
    let mut conditional_sources: Vec<&String> = graph.conditional_edges.keys().collect();
    conditional_sources.sort();
    for from in conditional_sources {
        let _ = writeln!(dot, "  \"{}\" -> \"?\" [style=dashed];", from);
    }

    dot.push_str("}\n");
    dot
}

/// Terse text listing of the compiled topology.
pub fn generate_text(graph: &CompiledGraph) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "nodes: {}", graph.nodes.len());
    let mut sources: Vec<&String> = graph.edges.keys().collect();
    sources.sort();
    for from in sources {
        for to in &graph.edges[from.as_str()] {
            let _ = writeln!(text, "  {} -> {}", from, to);
        }
    }
    let mut conditional_sources: Vec<&String> = graph.conditional_edges.keys().collect();
    conditional_sources.sort();
    for from in conditional_sources {
        let _ = writeln!(text, "  {} -> ? (conditional)", from);
    }
    text
}
