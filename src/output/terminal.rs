//! Terminal output utilities.
//!
//! Provides formatting helpers for printing results on the command line.

use crate::models::ContainmentNode;
use colored::Colorize;
use serde_json::Value;

/// Render a containment tree, two spaces of indent per level.
///
/// Nodes that are not registered themselves are marked and dimmed.
pub fn render_tree(node: &ContainmentNode) -> String {
    let mut out = String::new();
    render_node(node, 0, &mut out);
    out
}

fn render_node(node: &ContainmentNode, indent: usize, out: &mut String) {
    let cidr = node.cidr.to_string();
    if node.registered {
        out.push_str(&format!("{:indent$}{}\n", "", cidr));
    } else {
        out.push_str(&format!(
            "{:indent$}{} {}\n",
            "",
            cidr.dimmed(),
            "(unregistered)".yellow()
        ));
    }
    for child in &node.children {
        render_node(child, indent + 2, out);
    }
}

/// Pretty JSON for any other result; `null` renders as nothing.
pub fn render_json(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}
