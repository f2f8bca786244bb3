//! Ready-made hooks for async pipelines.
//!
//! Each helper returns a closure that can be passed straight to
//! `AsyncPipeline::before`, `after`, `on_loading` or `on_error`.

use crate::context::{ErrorContext, HookContext, Recovery};
use crate::error::{BoxError, SharedError};
use futures_util::future::{ready, Ready};
use std::sync::Arc;

/// Something able to signal a long-running operation, e.g. a spinner.
pub trait LoadingIndicator: Send + Sync {
    fn show(&self);
    fn hide(&self);
}

/// Run `handler` only while loading hooks fire for a loading step.
pub fn when_loading<T, F>(
    handler: F,
) -> impl Fn(T, HookContext) -> Ready<Result<T, BoxError>> + Send + Sync + 'static
where
    T: 'static,
    F: Fn(T, &HookContext) -> Result<T, BoxError> + Send + Sync + 'static,
{
    move |value, ctx| {
        if ctx.is_loading {
            tracing::debug!(step = %ctx.step, index = ctx.index, "Loading started");
            ready(handler(value, &ctx))
        } else {
            ready(Ok(value))
        }
    }
}

/// Post-processing hook for data produced by a step, typically registered as
/// an after hook.
pub fn when_loaded<T, F>(
    handler: F,
) -> impl Fn(T, HookContext) -> Ready<Result<T, BoxError>> + Send + Sync + 'static
where
    T: 'static,
    F: Fn(T, &HookContext) -> Result<T, BoxError> + Send + Sync + 'static,
{
    move |value, ctx| {
        tracing::debug!(step = %ctx.step, index = ctx.index, "Data loaded");
        ready(handler(value, &ctx))
    }
}

/// Pass-through after hook that only records completion.
pub fn mark_loaded<T>() -> impl Fn(T, HookContext) -> Ready<Result<T, BoxError>> + Send + Sync + 'static
where
    T: 'static,
{
    when_loaded(|value, _| Ok(value))
}

/// Wrap a synchronous recovery function as an async error hook.
pub fn when_error<T, F>(
    handler: F,
) -> impl Fn(SharedError, ErrorContext<T>) -> Ready<Recovery<T>> + Send + Sync + 'static
where
    T: 'static,
    F: Fn(&SharedError, &ErrorContext<T>) -> Recovery<T> + Send + Sync + 'static,
{
    move |error, ctx| {
        tracing::debug!(
            step = %ctx.step,
            index = ctx.index,
            stage = %ctx.stage,
            "Handling failure: {}",
            error
        );
        ready(handler(&error, &ctx))
    }
}

/// Loading hook that shows `indicator` before a loading step runs.
pub fn show_indicator<T>(
    indicator: Arc<dyn LoadingIndicator>,
) -> impl Fn(T, HookContext) -> Ready<Result<T, BoxError>> + Send + Sync + 'static
where
    T: 'static,
{
    move |value, ctx| {
        if ctx.is_loading {
            indicator.show();
            tracing::trace!(step = %ctx.step, "Indicator shown");
        }
        ready(Ok(value))
    }
}

/// After hook that hides `indicator`.
pub fn hide_indicator<T>(
    indicator: Arc<dyn LoadingIndicator>,
) -> impl Fn(T, HookContext) -> Ready<Result<T, BoxError>> + Send + Sync + 'static
where
    T: 'static,
{
    move |value, ctx| {
        indicator.hide();
        tracing::trace!(step = %ctx.step, "Indicator hidden");
        ready(Ok(value))
    }
}
