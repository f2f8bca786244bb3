use crate::error::{BoxError, PipelineError};
use futures_util::future::{BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

pub type StepFn<T, A> = dyn Fn(T, &A) -> Result<T, BoxError> + Send + Sync;
pub type AsyncStepFn<T, A> = dyn Fn(T, A) -> BoxFuture<'static, Result<T, BoxError>> + Send + Sync;

/// A function paired with the display name used in hook contexts, logs and errors.
pub struct Callable<F: ?Sized> {
    name: Arc<str>,
    func: Arc<F>,
}

impl<F: ?Sized> Callable<F> {
    fn new(name: impl Into<Arc<str>>, func: Arc<F>) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn shared_name(&self) -> Arc<str> {
        self.name.clone()
    }

    pub(crate) fn func(&self) -> &F {
        &self.func
    }
}

impl<F: ?Sized> Clone for Callable<F> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            func: self.func.clone(),
        }
    }
}

impl<F: ?Sized> fmt::Debug for Callable<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Callable").field(&self.name).finish()
    }
}

/// One stage of a synchronous pipeline.
///
/// `Unresolved` holds the name of a step that could not be looked up; the
/// pipeline accepts it and fails with [`PipelineError::InvalidStep`] when it
/// reaches it.
pub enum Step<T, A = ()> {
    Plain(Callable<StepFn<T, A>>),
    Unresolved(Arc<str>),
}

impl<T, A> Step<T, A> {
    pub fn new<F>(name: impl Into<Arc<str>>, func: F) -> Self
    where
        F: Fn(T, &A) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Step::Plain(Callable::new(name, Arc::new(func)))
    }

    /// Infallible step that ignores the extra arguments
    pub fn map<F>(name: impl Into<Arc<str>>, func: F) -> Self
    where
        F: Fn(T) -> T + Send + Sync + 'static,
    {
        Self::new(name, move |input, _| Ok(func(input)))
    }

    pub fn unresolved(name: impl Into<Arc<str>>) -> Self {
        Step::Unresolved(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            Step::Plain(callable) => callable.name(),
            Step::Unresolved(name) => name,
        }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self, Step::Plain(_))
    }
}

impl<T, A> Step<T, A>
where
    T: Send + 'static,
    A: Clone + Send + 'static,
{
    /// Drive an async step from a synchronous pipeline.
    ///
    /// The step's future is polled once; if it does not complete on that poll
    /// the step fails with [`PipelineError::UnexpectedAsyncResult`]. Only steps
    /// that never actually suspend are usable this way.
    pub fn blocking_from_async(step: AsyncStep<T, A>) -> Self {
        match step {
            AsyncStep::Plain(callable) | AsyncStep::Loading(callable) => {
                let name = callable.shared_name();
                let func = callable.func.clone();
                let step_name = name.clone();
                Step::Plain(Callable::new(
                    name,
                    Arc::new(move |input: T, args: &A| {
                        func(input, args.clone()).now_or_never().unwrap_or_else(|| {
                            Err(Box::new(PipelineError::UnexpectedAsyncResult {
                                step: step_name.to_string(),
                            }) as BoxError)
                        })
                    }),
                ))
            }
            AsyncStep::Unresolved(name) => Step::Unresolved(name),
        }
    }
}

impl<T, A> Clone for Step<T, A> {
    fn clone(&self) -> Self {
        match self {
            Step::Plain(callable) => Step::Plain(callable.clone()),
            Step::Unresolved(name) => Step::Unresolved(name.clone()),
        }
    }
}

impl<T, A> fmt::Debug for Step<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Plain(callable) => f.debug_tuple("Plain").field(&callable.name).finish(),
            Step::Unresolved(name) => f.debug_tuple("Unresolved").field(name).finish(),
        }
    }
}

/// One stage of an asynchronous pipeline.
///
/// `Loading` marks a long-running operation: loading hooks run right before it.
pub enum AsyncStep<T, A = ()> {
    Plain(Callable<AsyncStepFn<T, A>>),
    Loading(Callable<AsyncStepFn<T, A>>),
    Unresolved(Arc<str>),
}

impl<T, A> AsyncStep<T, A>
where
    T: Send + 'static,
    A: Send + 'static,
{
    pub fn new<F, Fut>(name: impl Into<Arc<str>>, func: F) -> Self
    where
        F: Fn(T, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
    {
        AsyncStep::Plain(Callable::new(name, boxed_step(func)))
    }

    pub fn loading<F, Fut>(name: impl Into<Arc<str>>, func: F) -> Self
    where
        F: Fn(T, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
    {
        AsyncStep::Loading(Callable::new(name, boxed_step(func)))
    }

    /// Infallible step that completes immediately
    pub fn map<F>(name: impl Into<Arc<str>>, func: F) -> Self
    where
        F: Fn(T) -> T + Send + Sync + 'static,
    {
        Self::new(name, move |input, _| {
            futures_util::future::ready(Ok::<T, BoxError>(func(input)))
        })
    }

    /// Lift a synchronous step; the resulting future is always ready.
    pub fn from_sync(step: Step<T, A>) -> Self {
        match step {
            Step::Plain(callable) => {
                let func = callable.func.clone();
                AsyncStep::new(callable.shared_name(), move |input, args: A| {
                    futures_util::future::ready(func(input, &args))
                })
            }
            Step::Unresolved(name) => AsyncStep::Unresolved(name),
        }
    }

    /// Re-tag a plain step as a loading step.
    pub fn into_loading(self) -> Self {
        match self {
            AsyncStep::Plain(callable) => AsyncStep::Loading(callable),
            other => other,
        }
    }
}

impl<T, A> AsyncStep<T, A> {
    pub fn unresolved(name: impl Into<Arc<str>>) -> Self {
        AsyncStep::Unresolved(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            AsyncStep::Plain(callable) | AsyncStep::Loading(callable) => callable.name(),
            AsyncStep::Unresolved(name) => name,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, AsyncStep::Loading(_))
    }

    pub(crate) fn callable(&self) -> Option<&Callable<AsyncStepFn<T, A>>> {
        match self {
            AsyncStep::Plain(callable) | AsyncStep::Loading(callable) => Some(callable),
            AsyncStep::Unresolved(_) => None,
        }
    }
}

impl<T, A> Clone for AsyncStep<T, A> {
    fn clone(&self) -> Self {
        match self {
            AsyncStep::Plain(callable) => AsyncStep::Plain(callable.clone()),
            AsyncStep::Loading(callable) => AsyncStep::Loading(callable.clone()),
            AsyncStep::Unresolved(name) => AsyncStep::Unresolved(name.clone()),
        }
    }
}

impl<T, A> fmt::Debug for AsyncStep<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsyncStep::Plain(callable) => f.debug_tuple("Plain").field(&callable.name).finish(),
            AsyncStep::Loading(callable) => {
                f.debug_tuple("Loading").field(&callable.name).finish()
            }
            AsyncStep::Unresolved(name) => f.debug_tuple("Unresolved").field(name).finish(),
        }
    }
}

fn boxed_step<T, A, F, Fut>(func: F) -> Arc<AsyncStepFn<T, A>>
where
    T: Send + 'static,
    A: Send + 'static,
    F: Fn(T, A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
{
    Arc::new(move |input: T, args: A| func(input, args).boxed())
}
