//! The combined model consumed by the structural mapper.
//!
//! Level-1 keeps its ids; Level-2 vertices and edges are cloned with a
//! trailing `'` so the two layers stay distinguishable in one graph. The
//! split/combine pair is an inverse up to iteration order.

use crate::preprocess::{Level2, Preprocessed};
use rdlt_model::{Rdlt, RdltError, RdltResult, Vertex, VertexKind};
use std::collections::BTreeMap;

/// The primed mirror id of a Level-2 clone.
pub fn prime(id: &str) -> String {
    format!("{id}'")
}

/// A combined two-level RDLT plus the terminator ids recorded by the
/// preprocessor.
#[derive(Debug, Clone)]
pub struct Combined {
    pub rdlt: Rdlt,
    pub source: Option<String>,
    pub sink: Option<String>,
}

/// Combine a preprocessing result into the single graph the mapper consumes.
pub fn combine(pre: &Preprocessed) -> RdltResult<Combined> {
    Ok(Combined {
        rdlt: combine_levels(&pre.level1, &pre.level2)?,
        source: pre.source.clone(),
        sink: pre.sink.clone(),
    })
}

/// Merge Level-1 with primed clones of every Level-2 subgraph.
pub fn combine_levels(level1: &Rdlt, level2: &[Level2]) -> RdltResult<Rdlt> {
    let mut combined = level1.clone();
    for l2 in level2 {
        for v in l2.graph.vertices() {
            let mut clone =
                Vertex::new(prime(&v.id), VertexKind::Controller).with_label(v.label.clone());
            clone.is_in_bridge = v.is_in_bridge;
            clone.is_out_bridge = v.is_out_bridge;
            clone.rbs_group = Some(l2.center.clone());
            clone.center = v.center || v.is_reset_center || v.id == l2.center;
            combined.add_vertex(clone)?;
        }
        for (_, from, to, attr) in l2.graph.edge_views() {
            let mut copy = attr.clone();
            copy.rbs_group = Some(l2.center.clone());
            combined.add_edge(&prime(from), &prime(to), copy)?;
        }
    }
    Ok(combined)
}

/// Split a combined graph back into Level-1 and per-RBS Level-2 views.
pub fn split_levels(combined: &Rdlt) -> RdltResult<(Rdlt, Vec<Level2>)> {
    let mut level1 = Rdlt::new();
    let mut groups: BTreeMap<String, Rdlt> = BTreeMap::new();

    for v in combined.vertices() {
        if let Some(base) = v.id.strip_suffix('\'') {
            let center = v.rbs_group.clone().ok_or_else(|| {
                RdltError::InternalInvariant(format!(
                    "Level-2 clone '{}' is missing its rbs_group",
                    v.id
                ))
            })?;
            let graph = groups.entry(center.clone()).or_default();
            let mut copy = Vertex::new(base, VertexKind::Controller).with_label(v.label.clone());
            copy.is_in_bridge = v.is_in_bridge;
            copy.is_out_bridge = v.is_out_bridge;
            copy.center = v.center;
            copy.rbs_group = if v.center { None } else { Some(center) };
            graph.add_vertex(copy)?;
        } else {
            level1.add_vertex(v.clone())?;
        }
    }

    for (_, from, to, attr) in combined.edge_views() {
        match (from.strip_suffix('\''), to.strip_suffix('\'')) {
            (Some(f), Some(t)) => {
                let center = attr.rbs_group.clone().ok_or_else(|| {
                    RdltError::InternalInvariant(format!(
                        "Level-2 edge {f}'->{t}' is missing its rbs_group"
                    ))
                })?;
                let graph = groups.entry(center).or_default();
                graph.add_edge(f, t, attr.clone())?;
            }
            (None, None) => {
                level1.add_edge(from, to, attr.clone())?;
            }
            _ => {
                return Err(RdltError::InternalInvariant(format!(
                    "edge {from}->{to} crosses the level boundary"
                )))
            }
        }
    }

    let level2 = groups
        .into_iter()
        .map(|(center, graph)| Level2 { center, graph })
        .collect();
    Ok((level1, level2))
}
