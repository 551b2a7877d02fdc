//! Conversion facade: RDLT JSON in, serialisable payload out.
//!
//! `convert` chains the validating parser, the EVSA preprocessor, the
//! structural mapper, and (when extension is requested) the structural and
//! behavioural analysers. Errors fold into the output rather than crossing
//! the API boundary; preprocessor warnings ride along either way.

pub mod parse;

pub use parse::parse_rdlt;

use rdlt_evsa::{combine, preprocess, Preprocessed};
use rdlt_mc::{analyze_behaviour, BehaviouralReport, SimConfig};
use rdlt_model::{Rdlt, RdltDump, RdltError, SplitCase};
use rdlt_pn::{analyze_structure, map_to_petri_net, MapError, PetriNet, StepLog, StructuralReport};
use serde::Serialize;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("invalid input: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Rdlt(#[from] RdltError),

    #[error(transparent)]
    Map(#[from] MapError),
}

/// Serialisable view of the preprocessing output.
#[derive(Debug, Serialize)]
pub struct PreprocessDump {
    pub level1: RdltDump,
    pub level2: Vec<Level2Dump>,
}

#[derive(Debug, Serialize)]
pub struct Level2Dump {
    pub center: String,
    pub graph: RdltDump,
}

#[derive(Debug, Serialize)]
pub struct SplitCaseEntry {
    pub vertex: String,
    #[serde(flatten)]
    pub case: SplitCase,
}

/// Everything a caller (or the visualiser collaborator) needs from one
/// conversion.
#[derive(Debug, Serialize)]
pub struct Payload {
    pub rdlt: RdltDump,
    pub preprocess: PreprocessDump,
    pub combined_model: RdltDump,
    pub petri_net: PetriNet,
    pub map_logs: Vec<StepLog>,
    pub split_cases: Vec<SplitCaseEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub struct_analysis: Option<StructuralReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub behavior_analysis: Option<BehaviouralReport>,
}

/// Result envelope: either a payload or an error string, warnings always.
#[derive(Debug, Serialize)]
pub struct ConvertOutput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Payload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub warnings: Vec<String>,
}

impl ConvertOutput {
    pub fn is_ok(&self) -> bool {
        self.data.is_some()
    }
}

/// Convert with the default simulation bounds.
pub fn convert(input: &str, extend: bool) -> ConvertOutput {
    convert_with(input, extend, &SimConfig::default())
}

/// Convert with explicit simulation bounds.
pub fn convert_with(input: &str, extend: bool, sim: &SimConfig) -> ConvertOutput {
    let mut warnings = Vec::new();
    match convert_inner(input, extend, sim, &mut warnings) {
        Ok(payload) => ConvertOutput {
            data: Some(payload),
            error: None,
            warnings,
        },
        Err(e) => ConvertOutput {
            data: None,
            error: Some(e.to_string()),
            warnings,
        },
    }
}

fn convert_inner(
    input: &str,
    extend: bool,
    sim: &SimConfig,
    warnings: &mut Vec<String>,
) -> Result<Payload, ConvertError> {
    let rdlt = parse_rdlt(input)?;
    info!(
        vertices = rdlt.vertex_count(),
        edges = rdlt.edge_count(),
        extend,
        "converting RDLT"
    );

    let pre = preprocess(&rdlt, extend)?;
    warnings.extend(pre.warnings.iter().cloned());

    let combined = combine(&pre)?;
    let mut out = map_to_petri_net(&combined)?;

    let (struct_analysis, behavior_analysis) = if extend {
        let structural = analyze_structure(&out.net);
        let behavioural = analyze_behaviour(&mut out.net, sim);
        (Some(structural), Some(behavioural))
    } else {
        (None, None)
    };

    Ok(Payload {
        rdlt: rdlt.dump(),
        preprocess: dump_preprocess(&pre),
        combined_model: combined.rdlt.dump(),
        petri_net: out.net,
        map_logs: out.logs,
        split_cases: out
            .split_cases
            .into_iter()
            .map(|(vertex, case)| SplitCaseEntry { vertex, case })
            .collect(),
        struct_analysis,
        behavior_analysis,
    })
}

fn dump_preprocess(pre: &Preprocessed) -> PreprocessDump {
    PreprocessDump {
        level1: pre.level1.dump(),
        level2: pre
            .level2
            .iter()
            .map(|l2| Level2Dump {
                center: l2.center.clone(),
                graph: l2.graph.dump(),
            })
            .collect(),
    }
}

/// Parse, preprocess and map without analysis; the building block for
/// callers that drive the simulator themselves.
pub fn build_net(input: &str, extend: bool) -> Result<(Rdlt, PetriNet), ConvertError> {
    let rdlt = parse_rdlt(input)?;
    let pre = preprocess(&rdlt, extend)?;
    let combined = combine(&pre)?;
    let out = map_to_petri_net(&combined)?;
    Ok((rdlt, out.net))
}
