//! Validating parser for the RDLT JSON input shape.
//!
//! `{ vertices: [{id, type, label?, M?}], edges: [{from, to, C?, L?}] }`
//! with defaults `label=""`, `M=0`, `C="ε"`, `L=1`.

use crate::ConvertError;
use rdlt_model::{EdgeAttr, Rdlt, RdltError, Vertex, VertexKind, EPSILON};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct RawRdlt {
    #[serde(default)]
    vertices: Vec<RawVertex>,
    #[serde(default)]
    edges: Vec<RawEdge>,
}

#[derive(Debug, Deserialize)]
struct RawVertex {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    label: String,
    #[serde(default, rename = "M")]
    m: u8,
}

#[derive(Debug, Deserialize)]
struct RawEdge {
    from: String,
    to: String,
    #[serde(default = "default_c", rename = "C")]
    c: String,
    #[serde(default = "default_l", rename = "L")]
    l: i64,
}

fn default_c() -> String {
    EPSILON.to_string()
}

fn default_l() -> i64 {
    1
}

/// Parse and validate an RDLT from its JSON representation.
pub fn parse_rdlt(input: &str) -> Result<Rdlt, ConvertError> {
    let raw: RawRdlt = serde_json::from_str(input)?;
    let mut rdlt = Rdlt::new();

    for v in &raw.vertices {
        if v.id.is_empty() {
            return Err(RdltError::topology("vertex id must be non-empty").into());
        }
        let kind = match v.kind.as_str() {
            "b" => VertexKind::Boundary,
            "e" => VertexKind::Entity,
            "c" => VertexKind::Controller,
            other => {
                return Err(RdltError::topology(format!(
                    "vertex '{}' has unknown type '{other}' (expected b, e, or c)",
                    v.id
                ))
                .into())
            }
        };
        match v.m {
            0 => {}
            1 => {
                if kind == VertexKind::Controller {
                    return Err(RdltError::topology(format!(
                        "vertex '{}' is a controller and cannot carry M=1",
                        v.id
                    ))
                    .into());
                }
            }
            other => {
                return Err(RdltError::InvalidConstraint {
                    edge: v.id.clone(),
                    reason: format!("M must be 0 or 1, found {other}"),
                }
                .into())
            }
        }
        let mut vertex = Vertex::new(v.id.clone(), kind).with_label(v.label.clone());
        vertex.is_reset_center = v.m == 1;
        rdlt.add_vertex(vertex)?;
    }

    for e in &raw.edges {
        if e.l <= 0 {
            return Err(RdltError::InvalidConstraint {
                edge: format!("{}->{}", e.from, e.to),
                reason: format!("L must be a positive integer, found {}", e.l),
            }
            .into());
        }
        let from_kind = rdlt
            .vertex(&e.from)
            .map(|v| v.kind)
            .ok_or_else(|| RdltError::topology(format!("edge references unknown vertex '{}'", e.from)))?;
        let to_kind = rdlt
            .vertex(&e.to)
            .map(|v| v.kind)
            .ok_or_else(|| RdltError::topology(format!("edge references unknown vertex '{}'", e.to)))?;
        if from_kind.is_object() && to_kind.is_object() {
            return Err(RdltError::topology(format!(
                "edge {}->{} connects two objects",
                e.from, e.to
            ))
            .into());
        }
        let attr = if e.c == EPSILON {
            EdgeAttr::epsilon(e.l as u64)
        } else {
            EdgeAttr::constrained(e.c.clone(), e.l as u64)
        };
        rdlt.add_edge(&e.from, &e.to, attr)?;
    }

    Ok(rdlt)
}
