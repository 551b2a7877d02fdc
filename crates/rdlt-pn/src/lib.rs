//! Petri-net model, the nine-step structural mapper, and the structural
//! analyser.

pub mod alias;
pub mod analyze;
pub mod mapper;
pub mod net;

pub use alias::AliasRegistry;
pub use analyze::{analyze_structure, Connectivity, StructuralReport};
pub use mapper::{map_to_petri_net, MapError, MapOutput, StepLog};
pub use net::{Arc, ArcKind, PetriNet, Place, PlaceRole, Transition, TransitionRole};
