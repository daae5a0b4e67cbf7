//! Plumbing shared between the archive and render-graph crates and the tools
//! built on top of them.

pub mod patch;
pub mod pause;
pub mod perf;
pub mod progress;
