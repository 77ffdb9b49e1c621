//! Project trees as seen by extractors, appliers and virtual project finders.
//!
//! - `project`: the `Project` trait plus filesystem and in-memory implementations.
//! - `finder`: virtual project detection (glob rules, first-of composition, caching).

pub mod finder;
pub mod project;

pub use finder::{VirtualProject, VirtualProjectFinder, VirtualProjectInfo};
pub use project::{LocalProject, MemoryProject, Project};
