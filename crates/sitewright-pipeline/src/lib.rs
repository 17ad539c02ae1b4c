//! Asset pipeline for sitewright.
//!
//! Assembles HTML from partials, compiles styles, bundles scripts, optimizes
//! images and stages vendor files into a development or production output
//! tree. Every step is a [`Task`] run by a [`Pipeline`] against an immutable
//! [`BuildContext`].

pub mod context;
pub mod header;
pub mod include;
pub mod pipeline;
pub mod registry;
pub mod source;
pub mod task;
pub mod tasks;

pub use context::{BuildContext, Mode};
pub use include::{IncludeError, IncludeResolver};
pub use pipeline::{run_task, Outcome, Pipeline, PipelineError, PipelineReport, Sequence, TaskOutcome};
pub use registry::{Destination, FailurePolicy, PathRegistry, VendorCopy};
pub use source::{SourceFile, SourceSet, SourceSetError};
pub use task::{Category, Task, TaskError, TaskReport};
