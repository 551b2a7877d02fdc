//! The two EVSA passes.
//!
//! Pass R1 builds the Level-1 view: vertices outside every RBS plus the
//! bridges of each RBS, all retyped to controllers. Pass R2 extracts one
//! Level-2 subgraph per RBS and synthesises abstract arcs on Level-1, one per
//! concrete bridge-to-bridge path, with `L = eRU + 1`.

use crate::eru::expanded_reusability;
use rdlt_graph::{simple_cycles, EdgeId};
use rdlt_model::{EdgeAttr, EdgeKind, Rdlt, RdltError, RdltResult, Vertex, VertexKind, EPSILON};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// One Level-2 subgraph: the internals of a single RBS.
#[derive(Debug, Clone)]
pub struct Level2 {
    pub center: String,
    pub graph: Rdlt,
}

/// Output of the preprocessor.
#[derive(Debug, Clone)]
pub struct Preprocessed {
    pub level1: Rdlt,
    pub level2: Vec<Level2>,
    /// Dummy source id, when extension was requested.
    pub source: Option<String>,
    /// Dummy sink id, when extension was requested.
    pub sink: Option<String>,
    pub warnings: Vec<String>,
}

/// Run EVSA over `input`. The input is never mutated; Level-1 and Level-2
/// are fresh values. With `extend`, dummy source/sink terminators are added
/// and their generated ids recorded.
pub fn preprocess(input: &Rdlt, extend: bool) -> RdltResult<Preprocessed> {
    let mut full = input.clone();
    full.annotate_rbs();

    let rbs_map = full.rbs_map();
    let mut member_of: HashMap<String, String> = HashMap::new();
    for (center, members) in &rbs_map {
        for id in members {
            member_of.insert(id.clone(), center.clone());
        }
    }

    let mut warnings = Vec::new();
    let mut level1 = build_level1(&full, &member_of)?;
    let level2 = build_level2(&full, &rbs_map, &member_of)?;

    // Abstract arcs need the cycle structure of the whole diagram.
    let full_cycles = simple_cycles(full.graph());
    for l2 in &level2 {
        synthesise_abstract_arcs(
            &full,
            l2,
            &member_of,
            &full_cycles,
            &mut level1,
            &mut warnings,
        )?;
    }

    let (source, sink) = if extend {
        let (s, o) = extend_level1(&mut level1)?;
        (Some(s), Some(o))
    } else {
        (None, None)
    };

    info!(
        level1_vertices = level1.vertex_count(),
        level1_edges = level1.edge_count(),
        rbs_count = level2.len(),
        "preprocessing complete"
    );

    Ok(Preprocessed {
        level1,
        level2,
        source,
        sink,
        warnings,
    })
}

/// Pass R1: survivors are non-members and bridges; everything becomes a
/// controller and loses its reset-center mark. Edges strictly internal to a
/// single RBS move to Level-2.
fn build_level1(full: &Rdlt, member_of: &HashMap<String, String>) -> RdltResult<Rdlt> {
    let mut level1 = Rdlt::new();
    for v in full.vertices() {
        let member = member_of.contains_key(&v.id);
        if member && !v.is_in_bridge && !v.is_out_bridge {
            continue;
        }
        let mut copy = Vertex::new(v.id.clone(), VertexKind::Controller).with_label(v.label.clone());
        copy.is_in_bridge = v.is_in_bridge;
        copy.is_out_bridge = v.is_out_bridge;
        copy.rbs_group = if member {
            Some(member_of[&v.id].clone())
        } else {
            None
        };
        level1.add_vertex(copy)?;
    }
    for (_, from, to, attr) in full.edge_views() {
        let internal = matches!(
            (member_of.get(from), member_of.get(to)),
            (Some(a), Some(b)) if a == b
        );
        if internal || !level1.contains(from) || !level1.contains(to) {
            continue;
        }
        let mut copy = attr.clone();
        copy.rbs_group = None;
        level1.add_edge(from, to, copy)?;
    }
    Ok(level1)
}

/// Pass R2(i): the Level-2 subgraph of each RBS.
fn build_level2(
    full: &Rdlt,
    rbs_map: &std::collections::BTreeMap<String, Vec<String>>,
    member_of: &HashMap<String, String>,
) -> RdltResult<Vec<Level2>> {
    let mut out = Vec::new();
    for (center, members) in rbs_map {
        let mut graph = Rdlt::new();
        for id in members {
            let v = full
                .vertex(id)
                .ok_or_else(|| RdltError::InternalInvariant(format!("missing RBS member '{id}'")))?;
            let mut copy = Vertex::new(v.id.clone(), VertexKind::Controller).with_label(v.label.clone());
            copy.is_reset_center = v.id == *center;
            copy.is_in_bridge = v.is_in_bridge;
            copy.is_out_bridge = v.is_out_bridge;
            copy.rbs_group = if v.id == *center {
                None
            } else {
                Some(center.clone())
            };
            graph.add_vertex(copy)?;
        }
        for (_, from, to, attr) in full.edge_views() {
            let internal = member_of.get(from) == Some(center) && member_of.get(to) == Some(center);
            if !internal {
                continue;
            }
            let mut copy = attr.clone();
            copy.rbs_group = Some(center.clone());
            graph.add_edge(from, to, copy)?;
        }
        out.push(Level2 {
            center: center.clone(),
            graph,
        });
    }
    Ok(out)
}

/// Pass R2(ii)+(iii): enumerate bridge-to-bridge paths and bridge self-loop
/// cycles inside the RBS, and emit one abstract arc on Level-1 per path.
fn synthesise_abstract_arcs(
    full: &Rdlt,
    l2: &Level2,
    member_of: &HashMap<String, String>,
    full_cycles: &[Vec<EdgeId>],
    level1: &mut Rdlt,
    warnings: &mut Vec<String>,
) -> RdltResult<()> {
    let b = &l2.graph;
    let center = &l2.center;

    let bridges: Vec<String> = b
        .vertices()
        .filter(|v| v.is_in_bridge || v.is_out_bridge)
        .map(|v| v.id.clone())
        .collect();
    let in_bridges: Vec<String> = b
        .vertices()
        .filter(|v| v.is_in_bridge)
        .map(|v| v.id.clone())
        .collect();
    let out_bridges: Vec<String> = b
        .vertices()
        .filter(|v| v.is_out_bridge)
        .map(|v| v.id.clone())
        .collect();

    let bridge_set: HashSet<&str> = bridges.iter().map(String::as_str).collect();
    let is_interior = |node: usize| !bridge_set.contains(b.graph().node(node).id.as_str());

    let mut paths: Vec<Vec<EdgeId>> = Vec::new();

    // in-bridge -> out-bridge and out-bridge -> in-bridge, other bridges
    // excluded from path interiors.
    for ib in &in_bridges {
        for ob in &out_bridges {
            if ib == ob {
                continue;
            }
            let (f, t) = (b.node_id(ib), b.node_id(ob));
            if let (Some(f), Some(t)) = (f, t) {
                paths.extend(b.graph().simple_paths_where(f, t, is_interior));
                paths.extend(b.graph().simple_paths_where(t, f, is_interior));
            }
        }
    }

    // Bridge self-loops: cycles at a bridge that pass through no other bridge.
    let b_cycles = simple_cycles(b.graph());
    for bridge in &bridges {
        for cycle in &b_cycles {
            let verts: HashSet<&str> = cycle
                .iter()
                .flat_map(|&e| {
                    let (f, t, _) = b.edge_view(e);
                    [f, t]
                })
                .collect();
            if !verts.contains(bridge.as_str()) {
                continue;
            }
            if verts.iter().any(|v| *v != bridge.as_str() && bridge_set.contains(v)) {
                continue;
            }
            paths.push(rotate_to(b, cycle, bridge));
        }
    }

    // One abstract arc per enumerated path.
    let mut seen: HashSet<Vec<EdgeId>> = HashSet::new();
    for path in paths {
        if path.is_empty() || !seen.insert(path.clone()) {
            continue;
        }
        let outcome = expanded_reusability(
            full,
            b,
            center,
            &in_bridges,
            member_of,
            full_cycles,
            &path,
        );
        warnings.extend(outcome.warnings);

        let first = b.edge_view(path[0]).0.to_string();
        let last = b.edge_view(*path.last().unwrap_or(&path[0])).1.to_string();
        let concrete: Vec<String> = std::iter::once(first.clone())
            .chain(path.iter().map(|&e| b.edge_view(e).1.to_string()))
            .collect();

        debug!(center = %center, from = %first, to = %last, eru = outcome.value, "emitting abstract arc");
        level1.add_edge(
            &first,
            &last,
            EdgeAttr {
                c: EPSILON.to_string(),
                l: outcome.value.saturating_add(1),
                kind: EdgeKind::Abstract,
                concrete_path: Some(concrete),
                rbs_group: Some(center.clone()),
            },
        )?;
    }
    Ok(())
}

/// Rotate a cycle's edge sequence so it starts and ends at `start`.
fn rotate_to(b: &Rdlt, cycle: &[EdgeId], start: &str) -> Vec<EdgeId> {
    let pos = cycle
        .iter()
        .position(|&e| b.edge_view(e).0 == start)
        .unwrap_or(0);
    let mut rotated = Vec::with_capacity(cycle.len());
    rotated.extend_from_slice(&cycle[pos..]);
    rotated.extend_from_slice(&cycle[..pos]);
    rotated
}

/// The extension step: dummy source `i` wired to every current source with
/// ε-arcs, and every current sink wired to dummy sink `o` with a uniquely
/// labelled constraint.
fn extend_level1(level1: &mut Rdlt) -> RdltResult<(String, String)> {
    let sources = level1.sources();
    let sinks = level1.sinks();
    if sources.is_empty() {
        return Err(RdltError::topology(
            "cannot extend: the simplified diagram has no source",
        ));
    }
    if sinks.is_empty() {
        return Err(RdltError::topology(
            "cannot extend: the simplified diagram has no sink",
        ));
    }

    let source_id = fresh_id(level1, "i");
    let sink_id = fresh_id(level1, "o");
    level1.add_vertex(Vertex::new(source_id.clone(), VertexKind::Controller))?;
    level1.add_vertex(Vertex::new(sink_id.clone(), VertexKind::Controller))?;

    for s in sources {
        level1.add_edge(&source_id, &s, EdgeAttr::epsilon(1))?;
    }
    for t in sinks {
        let c = format!("{t}_o");
        level1.add_edge(&t, &sink_id, EdgeAttr::constrained(c, 1))?;
    }
    Ok((source_id, sink_id))
}

fn fresh_id(r: &Rdlt, base: &str) -> String {
    let mut id = base.to_string();
    while r.contains(&id) {
        id.push('_');
    }
    id
}
