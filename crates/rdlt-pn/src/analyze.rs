//! Structural analysis of a mapped Petri net: connectivity, counts, role
//! classification, and an issue list.

use crate::net::{ArcKind, PetriNet, PlaceRole, TransitionRole};
use rdlt_graph::{strongly_connected_components, DiGraph};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize)]
pub struct Connectivity {
    pub strongly_connected: bool,
    pub source: Option<String>,
    pub sink: Option<String>,
    pub unreached: Vec<String>,
    pub isolated_nodes: Vec<String>,
    pub auxiliary: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StructuralReport {
    pub issues: Vec<String>,
    pub connectivity_details: Connectivity,
    pub transitions_count: usize,
    pub places_count: usize,
    pub split_places: Vec<String>,
    pub checked_places: Vec<String>,
    pub traversed_places: Vec<String>,
    pub auxiliary_places: Vec<String>,
    pub consensus_places: Vec<String>,
    pub unconstrained_places: Vec<String>,
    pub mix_join_places: Vec<String>,
    pub check_transitions: Vec<String>,
    pub traverse_transitions: Vec<String>,
    pub reset_transitions: Vec<String>,
}

/// Classify the net's nodes and report connectivity defects.
pub fn analyze_structure(net: &PetriNet) -> StructuralReport {
    let mut issues = Vec::new();

    let source = net
        .places()
        .iter()
        .find(|p| p.role == PlaceRole::GlobalSource)
        .map(|p| p.id.clone());
    let sink = net
        .places()
        .iter()
        .find(|p| p.role == PlaceRole::GlobalSink)
        .map(|p| p.id.clone());

    // Node graph over place/transition ids, arcs of every kind.
    let mut graph: DiGraph<String, ArcKind> = DiGraph::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for p in net.places() {
        index.insert(p.id.clone(), graph.add_node(p.id.clone()));
    }
    for t in net.transitions() {
        index.insert(t.id.clone(), graph.add_node(t.id.clone()));
    }
    for a in net.arcs() {
        if let (Some(&f), Some(&t)) = (index.get(&a.from), index.get(&a.to)) {
            graph.add_edge(f, t, a.kind);
        }
    }

    let strongly_connected =
        graph.node_count() > 0 && strongly_connected_components(&graph).len() == 1;

    let auxiliary: Vec<String> = net
        .places()
        .iter()
        .filter(|p| p.role.is_auxiliary())
        .map(|p| p.id.clone())
        .collect();

    let isolated_nodes: Vec<String> = graph
        .nodes()
        .filter(|&(n, _)| graph.outgoing(n).is_empty() && graph.incoming(n).is_empty())
        .map(|(_, id)| id.clone())
        .collect();

    // Reachability from the global source; auxiliary places hold root tokens
    // and are listed separately rather than as unreached.
    let mut unreached = Vec::new();
    if let Some(source_id) = &source {
        if let Some(&start) = index.get(source_id) {
            let reached: Vec<usize> = graph.bfs(start, |_, _| true);
            let reached: std::collections::HashSet<usize> = reached.into_iter().collect();
            for (n, id) in graph.nodes() {
                if !reached.contains(&n) && !auxiliary.contains(id) {
                    unreached.push(id.clone());
                }
            }
        }
    } else if net.places().is_empty() && net.transitions().is_empty() {
        // empty net: nothing to report
    } else {
        issues.push("no global source place".to_string());
    }

    if sink.is_none() && !(net.places().is_empty() && net.transitions().is_empty()) {
        issues.push("no global sink place".to_string());
    }
    if !unreached.is_empty() {
        issues.push(format!(
            "{} node(s) unreachable from the global source",
            unreached.len()
        ));
    }
    if !isolated_nodes.is_empty() {
        issues.push(format!("{} isolated node(s)", isolated_nodes.len()));
    }
    for t in net.transitions() {
        let has_in = net.arcs().iter().any(|a| a.to == t.id);
        let has_out = net.arcs().iter().any(|a| a.from == t.id);
        if !has_in {
            issues.push(format!("transition {} has no input arcs", t.id));
        }
        if !has_out {
            issues.push(format!("transition {} has no output arcs", t.id));
        }
    }

    let places_of = |role_match: fn(&PlaceRole) -> bool| -> Vec<String> {
        net.places()
            .iter()
            .filter(|p| role_match(&p.role))
            .map(|p| p.id.clone())
            .collect()
    };
    let transitions_of = |role: TransitionRole| -> Vec<String> {
        net.transitions()
            .iter()
            .filter(|t| t.role == role)
            .map(|t| t.id.clone())
            .collect()
    };

    StructuralReport {
        issues,
        connectivity_details: Connectivity {
            strongly_connected,
            source,
            sink,
            unreached,
            isolated_nodes,
            auxiliary: auxiliary.clone(),
        },
        transitions_count: net.transitions().len(),
        places_count: net.places().len(),
        split_places: places_of(|r| *r == PlaceRole::Split),
        checked_places: places_of(|r| *r == PlaceRole::Checked),
        traversed_places: places_of(|r| *r == PlaceRole::Traversed),
        auxiliary_places: auxiliary,
        consensus_places: places_of(|r| *r == PlaceRole::Consensus),
        unconstrained_places: places_of(|r| *r == PlaceRole::Unconstrained),
        mix_join_places: places_of(|r| *r == PlaceRole::MixJoin),
        check_transitions: transitions_of(TransitionRole::Check),
        traverse_transitions: transitions_of(TransitionRole::Traverse),
        reset_transitions: transitions_of(TransitionRole::Reset),
    }
}
