//! RDLT model: typed vertex/edge store, reset-bound subsystems, and the
//! split-case classifier.

pub mod error;
pub mod model;
pub mod split;

pub use error::{RdltError, RdltResult};
pub use model::{
    edge_key, EdgeAttr, EdgeDump, EdgeKind, Rdlt, RdltDump, Vertex, VertexKind, EPSILON,
};
pub use split::{classify_split, SplitCase};
