// file: src/controller/mod.rs
// description: remote parser controller module exports
// reference: internal module structure

pub mod policy;
pub mod runner;

pub use policy::PollPolicy;
pub use runner::{ParseController, ParseSummary};
