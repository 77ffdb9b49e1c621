//! Aspects: pluggable strategies that extract fingerprints from a project,
//! apply target fingerprints back onto it, and summarize differences.
//!
//! - `aspect`: the `Aspect` trait, its optional capabilities, and a
//!   closure-backed `SimpleAspect`.
//! - `registry`: explicit, ordered aspect registry built once at startup.
//! - `virtual_project`: wraps an aspect so it runs once per virtual project.
//! - `composite`: consolidates fingerprints of several aspects into one.
//! - `file`: generic file-content aspect.
//! - `computer`: runs every aspect over a project for one push.
//! - `apply`: target propagation through owning aspects.

pub mod apply;
pub mod aspect;
pub mod composite;
pub mod computer;
pub mod file;
pub mod registry;
pub mod virtual_project;

pub use aspect::{
    has_apply, has_consolidate, has_veto, Apply, Aspect, Consolidate, SimpleAspect, Summarize,
    Veto, Workflow,
};
pub use composite::CompositeAspect;
pub use computer::{DynamicAspects, FingerprintComputer};
pub use file::FileAspect;
pub use registry::AspectRegistry;
pub use virtual_project::VirtualProjectAspect;
