pub mod completions;
pub mod environ;
pub mod error;
pub mod launch;
pub mod runner;
pub mod stack;
pub mod supervisor;

pub use error::{LaunchError, Result};
pub use launch::{BindAddress, LaunchOptions, LaunchPlan};
pub use stack::StackConfig;
pub use supervisor::{DaemonDescriptor, ExitRecord, GroupState, Supervisor};
