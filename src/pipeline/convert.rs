//! Bridges between the synchronous and asynchronous executors.
//!
//! [`to_async`] always works. [`to_sync`] only works for executors whose
//! invocation completes without ever suspending; anything else fails with
//! [`PipelineError::PendingResult`]. That is a contract the caller has to
//! uphold, it cannot be checked ahead of time.

use super::{AsyncPipeline, Pipeline};
use crate::error::PipelineError;
use async_trait::async_trait;
use futures_util::FutureExt;

/// A synchronous executor.
pub trait Execute<T, A>: Send + Sync {
    fn invoke(&self, input: T, args: &A) -> Result<T, PipelineError>;
}

/// An asynchronous executor.
#[async_trait]
pub trait ExecuteAsync<T, A>: Send + Sync
where
    T: Send + 'static,
    A: Send + 'static,
{
    async fn invoke(&self, input: T, args: A) -> Result<T, PipelineError>;
}

impl<T, A> Execute<T, A> for Pipeline<T, A>
where
    T: Clone,
{
    fn invoke(&self, input: T, args: &A) -> Result<T, PipelineError> {
        Pipeline::invoke(self, input, args)
    }
}

#[async_trait]
impl<T, A> ExecuteAsync<T, A> for AsyncPipeline<T, A>
where
    T: Clone + Send + 'static,
    A: Clone + Send + Sync + 'static,
{
    async fn invoke(&self, input: T, args: A) -> Result<T, PipelineError> {
        AsyncPipeline::invoke(self, input, args).await
    }
}

/// A synchronous executor whose result is awaitable.
#[derive(Clone)]
pub struct ToAsync<P> {
    inner: P,
}

impl<P> ToAsync<P> {
    pub fn into_inner(self) -> P {
        self.inner
    }
}

#[async_trait]
impl<P, T, A> ExecuteAsync<T, A> for ToAsync<P>
where
    P: Execute<T, A>,
    T: Send + 'static,
    A: Send + Sync + 'static,
{
    async fn invoke(&self, input: T, args: A) -> Result<T, PipelineError> {
        self.inner.invoke(input, &args)
    }
}

/// An asynchronous executor driven to completion on a single poll.
#[derive(Clone)]
pub struct ToSync<P> {
    inner: P,
}

impl<P> ToSync<P> {
    pub fn into_inner(self) -> P {
        self.inner
    }
}

impl<P, T, A> Execute<T, A> for ToSync<P>
where
    P: ExecuteAsync<T, A>,
    T: Send + 'static,
    A: Clone + Send + Sync + 'static,
{
    fn invoke(&self, input: T, args: &A) -> Result<T, PipelineError> {
        self.inner
            .invoke(input, args.clone())
            .now_or_never()
            .unwrap_or_else(|| {
                tracing::warn!("Asynchronous executor suspended under a synchronous call");
                Err(PipelineError::PendingResult)
            })
    }
}

pub fn to_async<P>(executor: P) -> ToAsync<P> {
    ToAsync { inner: executor }
}

pub fn to_sync<P>(executor: P) -> ToSync<P> {
    ToSync { inner: executor }
}
