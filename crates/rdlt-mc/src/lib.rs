//! Behavioural analysis: exhaustive enumeration of concurrent firing
//! sequences and the termination/soundness classification built on top.

pub mod report;
pub mod sim;

pub use report::{
    analyze_behaviour, AggregateTermination, BehaviouralReport, SequenceResult, Soundness,
    TerminationChecks, TerminationType,
};
pub use sim::{enumerate_runs, SequenceRun, SimConfig, Step};
