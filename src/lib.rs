//! Aggressive dead code elimination for structured SPIR-V-style SSA modules.
#![deny(missing_docs)]

pub use cranelift_entity as entity;
pub use crate::entity::packed_option;

pub mod adce;
pub mod call_graph;
pub mod flowgraph;
pub mod ir;
pub mod structure;
pub mod timing;
pub mod verifier;
pub mod write;

pub use crate::adce::{do_adce, AdceFlags, PassStatus};
pub use crate::verifier::{verify_module, VerifierError};
pub use crate::write::write_module;

/// Even when trace logging is disabled, the trace macro has a significant performance cost so we
/// disable it by default.
#[macro_export]
macro_rules! trace {
    ($($tt:tt)*) => {
        if cfg!(any(feature = "trace-log", debug_assertions)) {
            ::log::trace!($($tt)*);
        }
    };
}
