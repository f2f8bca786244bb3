use crate::context::{ErrorContext, HookContext, Recovery};
use crate::error::{BoxError, PipelineError, SharedError};
use crate::hooks::{ErrorHookFn, HookFn, HookKind};
use crate::step::{AsyncStep, Step};
use std::collections::HashMap;
use std::sync::Arc;

/// Named steps and hooks that configuration-driven pipelines are resolved against.
///
/// Value hooks are registered once and may be used as before, after or
/// loading hooks. Error hooks live in their own table.
pub struct Registry<T, A = ()> {
    steps: HashMap<String, Step<T, A>>,
    async_steps: HashMap<String, AsyncStep<T, A>>,
    hooks: HashMap<String, Arc<HookFn<T>>>,
    error_hooks: HashMap<String, Arc<ErrorHookFn<T>>>,
}

impl<T, A> Default for Registry<T, A> {
    fn default() -> Self {
        Self {
            steps: HashMap::new(),
            async_steps: HashMap::new(),
            hooks: HashMap::new(),
            error_hooks: HashMap::new(),
        }
    }
}

impl<T, A> Registry<T, A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a step under `name`; the step keeps its own display name.
    pub fn with_step(mut self, name: impl Into<String>, step: Step<T, A>) -> Self {
        self.steps.insert(name.into(), step);
        self
    }

    /// Register a step only usable by async pipelines, e.g. a loading step.
    pub fn with_async_step(mut self, name: impl Into<String>, step: AsyncStep<T, A>) -> Self {
        self.async_steps.insert(name.into(), step);
        self
    }

    pub fn with_hook<F>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: Fn(T, &HookContext) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.hooks.insert(name.into(), Arc::new(hook));
        self
    }

    pub fn with_error_hook<F>(mut self, name: impl Into<String>, hook: F) -> Self
    where
        F: Fn(&SharedError, &ErrorContext<T>) -> Recovery<T> + Send + Sync + 'static,
    {
        self.error_hooks.insert(name.into(), Arc::new(hook));
        self
    }

    pub fn contains_step(&self, name: &str) -> bool {
        self.steps.contains_key(name) || self.async_steps.contains_key(name)
    }

    /// Resolve a step for a synchronous pipeline; unknown names resolve to
    /// [`Step::Unresolved`] and fail when the pipeline reaches them.
    pub fn step(&self, name: &str) -> Step<T, A> {
        match self.steps.get(name) {
            Some(step) => step.clone(),
            None => {
                tracing::debug!("Step '{}' not found in registry", name);
                Step::unresolved(name)
            }
        }
    }

    pub fn hook(&self, kind: HookKind, name: &str) -> Result<Arc<HookFn<T>>, PipelineError> {
        self.hooks
            .get(name)
            .cloned()
            .ok_or_else(|| PipelineError::InvalidHook {
                kind,
                name: name.to_string(),
            })
    }

    pub fn error_hook(&self, name: &str) -> Result<Arc<ErrorHookFn<T>>, PipelineError> {
        self.error_hooks
            .get(name)
            .cloned()
            .ok_or_else(|| PipelineError::InvalidHook {
                kind: HookKind::Error,
                name: name.to_string(),
            })
    }
}

impl<T, A> Registry<T, A>
where
    T: Send + 'static,
    A: Send + 'static,
{
    /// Resolve a step for an async pipeline: async entries first, then
    /// synchronous ones lifted, otherwise [`AsyncStep::Unresolved`].
    pub fn async_step(&self, name: &str) -> AsyncStep<T, A> {
        if let Some(step) = self.async_steps.get(name) {
            return step.clone();
        }
        match self.steps.get(name) {
            Some(step) => AsyncStep::from_sync(step.clone()),
            None => {
                tracing::debug!("Step '{}' not found in registry", name);
                AsyncStep::unresolved(name)
            }
        }
    }
}
