//! Process-group supervisor for the development stack.
//!
//! Owns the set of child processes for one run:
//! - spawn in descriptor order, sharing one prepared base environment
//! - relay each child's output as labeled, line-buffered streams
//! - race on the first exit; the first terminator is the primary cause
//! - tear down everything else (graceful stop, then force kill after a
//!   bounded grace period) and report an aggregate exit code
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │                  Supervisor                   │
//! ├───────────────────────────────────────────────┤
//! │  spawn_all   │  relay tasks   │  exit race    │
//! │  (children)  │  (per stream)  │  (select_all) │
//! ├───────────────────────────────────────────────┤
//! │  watcher │ worker │ scheduler │ server │ ...  │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! There are deliberately no restart policies, health checks, or dependency
//! ordering here: a development stack fails as a unit.

pub mod descriptor;
pub mod group;
mod relay;

pub use descriptor::DaemonDescriptor;
pub use group::{ExitRecord, GroupState, Supervisor};
