use super::executor::{unrecovered, StageFailure};
use crate::context::{ErrorContext, HookContext, Recovery};
use crate::error::{BoxError, PipelineError, SharedError, Stage};
use crate::hooks::{self, AsyncErrorHookFn, AsyncHookFn, HookKind, Hooks};
use crate::registry::Registry;
use crate::step::{AsyncStep, AsyncStepFn, Callable};
use futures_util::future::FutureExt;
use std::future::Future;
use std::sync::Arc;

/// Asynchronous pipeline executor.
///
/// Every hook and step is awaited before the next one starts, so one
/// invocation never runs two steps at once. Separate invocations share nothing
/// but the (read-only) steps and hooks and may run concurrently, e.g. through
/// an `Arc<AsyncPipeline>` handed to several tasks.
pub struct AsyncPipeline<T, A = ()> {
    steps: Vec<AsyncStep<T, A>>,
    hooks: Hooks<AsyncHookFn<T>, AsyncErrorHookFn<T>>,
}

impl<T, A> Clone for AsyncPipeline<T, A> {
    fn clone(&self) -> Self {
        Self {
            steps: self.steps.clone(),
            hooks: self.hooks.clone(),
        }
    }
}

impl<T, A> Default for AsyncPipeline<T, A> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T, A> AsyncPipeline<T, A> {
    pub fn new(steps: impl IntoIterator<Item = AsyncStep<T, A>>) -> Self {
        Self {
            steps: steps.into_iter().collect(),
            hooks: Hooks::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_names(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().map(AsyncStep::name)
    }

    pub fn hook_count(&self, kind: HookKind) -> usize {
        self.hooks.len(kind)
    }
}

impl<T, A> AsyncPipeline<T, A>
where
    T: Clone + Send + 'static,
    A: Clone + Send + Sync + 'static,
{
    pub fn before<F, Fut>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(T, HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
    {
        self.hooks.push_before(boxed_hook(hook));
        self
    }

    pub fn after<F, Fut>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(T, HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
    {
        self.hooks.push_after(boxed_hook(hook));
        self
    }

    /// Hook run right before each loading step, with `is_loading` set.
    pub fn on_loading<F, Fut>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(T, HookContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
    {
        self.hooks.push_loading(boxed_hook(hook));
        self
    }

    pub fn on_error<F, Fut>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(SharedError, ErrorContext<T>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Recovery<T>> + Send + 'static,
    {
        self.hooks
            .push_error(Arc::new(move |error: SharedError, ctx: ErrorContext<T>| {
                hook(error, ctx).boxed()
            }));
        self
    }

    /// Register a synchronous hook from `registry` by name.
    pub fn register(
        &mut self,
        kind: HookKind,
        name: &str,
        registry: &Registry<T, A>,
    ) -> Result<&mut Self, PipelineError> {
        match kind {
            HookKind::Before => self.hooks.push_before(hooks::lift(registry.hook(kind, name)?)),
            HookKind::After => self.hooks.push_after(hooks::lift(registry.hook(kind, name)?)),
            HookKind::Loading => self
                .hooks
                .push_loading(hooks::lift(registry.hook(kind, name)?)),
            HookKind::Error => self
                .hooks
                .push_error(hooks::lift_error(registry.error_hook(name)?)),
        }
        Ok(self)
    }

    /// Thread `input` through every step in order, awaiting each stage.
    ///
    /// # Flow
    /// For each step:
    /// 1. Before hooks, in registration order
    /// 2. Loading hooks with `is_loading` set, only for loading steps
    /// 3. The step itself, with a clone of `args`
    /// 4. After hooks, in registration order
    /// 5. On a failure in 1-4, error hooks in registration order; the first
    ///    [`Recovery::Recover`] becomes the step's result
    ///
    /// # Arguments
    /// * `input` - Value handed to the first step
    /// * `args` - Extra arguments, cloned for every step
    ///
    /// # Returns
    /// The last step's result (or `input` for an empty pipeline).
    /// [`PipelineError::StepExecution`] when no error hook recovers;
    /// [`PipelineError::InvalidStep`] when an unresolved step is reached.
    #[tracing::instrument(skip_all, fields(steps = self.steps.len()))]
    pub async fn invoke(&self, input: T, args: A) -> Result<T, PipelineError> {
        let total = self.steps.len();
        let mut result = input;

        for (index, step) in self.steps.iter().enumerate() {
            let Some(callable) = step.callable() else {
                return Err(PipelineError::InvalidStep {
                    index,
                    name: step.name().to_string(),
                });
            };

            let ctx = HookContext::new(callable.shared_name(), index, total);
            tracing::debug!(
                step = %ctx.step,
                index,
                total,
                loading = step.is_loading(),
                "Running step"
            );

            result = match self
                .run_step(callable, step.is_loading(), result, &args, &ctx)
                .await
            {
                Ok(value) => value,
                Err(failure) => self.recover(failure, ctx).await?,
            };
        }

        Ok(result)
    }

    async fn run_step(
        &self,
        callable: &Callable<AsyncStepFn<T, A>>,
        loading: bool,
        mut value: T,
        args: &A,
        ctx: &HookContext,
    ) -> Result<T, StageFailure<T>> {
        for hook in self.hooks.before() {
            let input = self.snapshot(&value);
            value = hook(value, ctx.clone())
                .await
                .map_err(|e| StageFailure::new(Stage::Before, e, input))?;
        }

        if loading {
            let loading_ctx = ctx.loading();
            for hook in self.hooks.loading() {
                let input = self.snapshot(&value);
                value = hook(value, loading_ctx.clone())
                    .await
                    .map_err(|e| StageFailure::new(Stage::Loading, e, input))?;
            }
        }

        let input = self.snapshot(&value);
        value = (callable.func())(value, args.clone())
            .await
            .map_err(|e| StageFailure::new(Stage::Step, e, input))?;

        for hook in self.hooks.after() {
            let input = self.snapshot(&value);
            value = hook(value, ctx.clone())
                .await
                .map_err(|e| StageFailure::new(Stage::After, e, input))?;
        }

        Ok(value)
    }

    fn snapshot(&self, value: &T) -> Option<T> {
        if self.hooks.error().is_empty() {
            None
        } else {
            Some(value.clone())
        }
    }

    async fn recover(
        &self,
        failure: StageFailure<T>,
        ctx: HookContext,
    ) -> Result<T, PipelineError> {
        let StageFailure {
            stage,
            error,
            input,
        } = failure;
        let source: SharedError = Arc::from(error);

        if let Some(input) = input {
            for (position, hook) in self.hooks.error().iter().enumerate() {
                let error_ctx = ErrorContext {
                    context: ctx.clone(),
                    stage,
                    input: input.clone(),
                };
                if let Recovery::Recover(value) = hook(source.clone(), error_ctx).await {
                    tracing::debug!(
                        step = %ctx.step,
                        index = ctx.index,
                        hook = position,
                        "Recovered from failure: {}",
                        source
                    );
                    return Ok(value);
                }
            }
        }

        Err(unrecovered(stage, &ctx, source))
    }
}

fn boxed_hook<T, F, Fut>(hook: F) -> Arc<AsyncHookFn<T>>
where
    T: Send + 'static,
    F: Fn(T, HookContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, BoxError>> + Send + 'static,
{
    Arc::new(move |value: T, ctx: HookContext| hook(value, ctx).boxed())
}
