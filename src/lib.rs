//! Step pipelines with before, after, error and loading hooks.
//!
//! A [`Pipeline`] threads a value through named steps synchronously; an
//! [`AsyncPipeline`] does the same while awaiting every step and hook. Error
//! hooks may substitute a value for a failed step, the first recovery wins.
//! [`to_async`] and [`to_sync`] bridge the two execution modes.

pub mod config;
pub mod context;
pub mod error;
pub mod hooks;
pub mod loading;
pub mod logging;
pub mod pipeline;
pub mod registry;
pub mod step;

pub use context::{ErrorContext, HookContext, Recovery};
pub use error::{BoxError, PipelineError, SharedError, Stage};
pub use hooks::HookKind;
pub use loading::{delayed, load_from, Loader, Locator};
pub use pipeline::{
    to_async, to_sync, AsyncPipeline, Execute, ExecuteAsync, Pipeline, ToAsync, ToSync,
};
pub use registry::Registry;
pub use step::{AsyncStep, Step};

pub use pipekit_fetch::{FetchError, Fetcher, RequestOptions};
