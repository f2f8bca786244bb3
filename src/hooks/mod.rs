pub mod helpers;

use crate::context::{ErrorContext, HookContext, Recovery};
use crate::error::{BoxError, SharedError};
use futures_util::future::{BoxFuture, FutureExt};
use std::fmt;
use std::sync::Arc;

pub type HookFn<T> = dyn Fn(T, &HookContext) -> Result<T, BoxError> + Send + Sync;
pub type ErrorHookFn<T> = dyn Fn(&SharedError, &ErrorContext<T>) -> Recovery<T> + Send + Sync;

pub type AsyncHookFn<T> =
    dyn Fn(T, HookContext) -> BoxFuture<'static, Result<T, BoxError>> + Send + Sync;
pub type AsyncErrorHookFn<T> =
    dyn Fn(SharedError, ErrorContext<T>) -> BoxFuture<'static, Recovery<T>> + Send + Sync;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    Before,
    After,
    Error,
    Loading,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HookKind::Before => "before",
            HookKind::After => "after",
            HookKind::Error => "error",
            HookKind::Loading => "loading",
        };
        f.write_str(s)
    }
}

/// Append-only hook sequences owned by one executor.
///
/// `H` is the value-hook type shared by before, after and loading hooks; `R`
/// is the error-hook type. Iteration order is registration order.
pub struct Hooks<H: ?Sized, R: ?Sized> {
    before: Vec<Arc<H>>,
    after: Vec<Arc<H>>,
    loading: Vec<Arc<H>>,
    error: Vec<Arc<R>>,
}

impl<H: ?Sized, R: ?Sized> Default for Hooks<H, R> {
    fn default() -> Self {
        Self {
            before: Vec::new(),
            after: Vec::new(),
            loading: Vec::new(),
            error: Vec::new(),
        }
    }
}

impl<H: ?Sized, R: ?Sized> Clone for Hooks<H, R> {
    fn clone(&self) -> Self {
        Self {
            before: self.before.clone(),
            after: self.after.clone(),
            loading: self.loading.clone(),
            error: self.error.clone(),
        }
    }
}

impl<H: ?Sized, R: ?Sized> Hooks<H, R> {
    pub fn push_before(&mut self, hook: Arc<H>) {
        self.before.push(hook);
    }

    pub fn push_after(&mut self, hook: Arc<H>) {
        self.after.push(hook);
    }

    pub fn push_loading(&mut self, hook: Arc<H>) {
        self.loading.push(hook);
    }

    pub fn push_error(&mut self, hook: Arc<R>) {
        self.error.push(hook);
    }

    pub fn before(&self) -> &[Arc<H>] {
        &self.before
    }

    pub fn after(&self) -> &[Arc<H>] {
        &self.after
    }

    pub fn loading(&self) -> &[Arc<H>] {
        &self.loading
    }

    pub fn error(&self) -> &[Arc<R>] {
        &self.error
    }

    pub fn len(&self, kind: HookKind) -> usize {
        match kind {
            HookKind::Before => self.before.len(),
            HookKind::After => self.after.len(),
            HookKind::Loading => self.loading.len(),
            HookKind::Error => self.error.len(),
        }
    }
}

/// Lift a synchronous value hook into an async one.
pub fn lift<T>(hook: Arc<HookFn<T>>) -> Arc<AsyncHookFn<T>>
where
    T: Send + 'static,
{
    Arc::new(move |value: T, ctx: HookContext| {
        futures_util::future::ready(hook(value, &ctx)).boxed()
    })
}

/// Lift a synchronous error hook into an async one.
pub fn lift_error<T>(hook: Arc<ErrorHookFn<T>>) -> Arc<AsyncErrorHookFn<T>>
where
    T: Send + 'static,
{
    Arc::new(move |error: SharedError, ctx: ErrorContext<T>| {
        futures_util::future::ready(hook(&error, &ctx)).boxed()
    })
}
