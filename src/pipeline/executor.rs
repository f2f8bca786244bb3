use crate::context::{ErrorContext, HookContext, Recovery};
use crate::error::{BoxError, PipelineError, SharedError, Stage};
use crate::hooks::{ErrorHookFn, HookFn, HookKind, Hooks};
use crate::registry::Registry;
use crate::step::{Callable, Step, StepFn};
use std::sync::Arc;

/// A failure raised inside one step, before error hooks have seen it
pub(crate) struct StageFailure<T> {
    pub stage: Stage,
    pub error: BoxError,
    /// Value that entered the failing stage; only kept when error hooks exist
    pub input: Option<T>,
}

impl<T> StageFailure<T> {
    pub fn new(stage: Stage, error: BoxError, input: Option<T>) -> Self {
        Self {
            stage,
            error,
            input,
        }
    }
}

/// Build the error surfaced to the caller once no error hook recovered.
pub(crate) fn unrecovered(stage: Stage, ctx: &HookContext, source: SharedError) -> PipelineError {
    tracing::warn!(
        step = %ctx.step,
        index = ctx.index,
        stage = %stage,
        "Step failed without recovery: {}",
        source
    );
    PipelineError::StepExecution {
        index: ctx.index,
        total: ctx.total,
        step: ctx.step.to_string(),
        stage,
        source,
    }
}

/// Synchronous pipeline executor.
///
/// Steps are fixed at construction. Hooks are appended through `&mut self`,
/// so they cannot change while an invocation borrows the pipeline.
pub struct Pipeline<T, A = ()> {
    steps: Vec<Step<T, A>>,
    hooks: Hooks<HookFn<T>, ErrorHookFn<T>>,
}

impl<T, A> Clone for Pipeline<T, A> {
    fn clone(&self) -> Self {
        Self {
            steps: self.steps.clone(),
            hooks: self.hooks.clone(),
        }
    }
}

impl<T, A> Default for Pipeline<T, A> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<T, A> Pipeline<T, A> {
    pub fn new(steps: impl IntoIterator<Item = Step<T, A>>) -> Self {
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
        self.steps.iter().map(Step::name)
    }

    pub fn hook_count(&self, kind: HookKind) -> usize {
        self.hooks.len(kind)
    }

    /// Hook run before every step; receives the current value.
    pub fn before<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(T, &HookContext) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.hooks.push_before(Arc::new(hook));
        self
    }

    /// Hook run after every step; receives the step's output.
    pub fn after<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(T, &HookContext) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.hooks.push_after(Arc::new(hook));
        self
    }

    /// Error hook; the first one returning [`Recovery::Recover`] wins.
    pub fn on_error<F>(&mut self, hook: F) -> &mut Self
    where
        F: Fn(&SharedError, &ErrorContext<T>) -> Recovery<T> + Send + Sync + 'static,
    {
        self.hooks.push_error(Arc::new(hook));
        self
    }

    /// Register a hook by name.
    ///
    /// Fails with [`PipelineError::InvalidHook`] if the registry has no hook
    /// of that name, or for loading hooks, which synchronous pipelines do not run.
    pub fn register(
        &mut self,
        kind: HookKind,
        name: &str,
        registry: &Registry<T, A>,
    ) -> Result<&mut Self, PipelineError> {
        match kind {
            HookKind::Before => self.hooks.push_before(registry.hook(kind, name)?),
            HookKind::After => self.hooks.push_after(registry.hook(kind, name)?),
            HookKind::Error => self.hooks.push_error(registry.error_hook(name)?),
            HookKind::Loading => {
                return Err(PipelineError::InvalidHook {
                    kind,
                    name: name.to_string(),
                })
            }
        }
        Ok(self)
    }
}

impl<T: Clone, A> Pipeline<T, A> {
    /// Thread `input` through every step in order.
    ///
    /// # Flow
    /// For each step:
    /// 1. Before hooks, in registration order
    /// 2. The step itself, with `args`
    /// 3. After hooks, in registration order
    /// 4. On a failure in 1-3, error hooks in registration order; the first
    ///    [`Recovery::Recover`] becomes the step's result and the remaining
    ///    after hooks of that step are skipped
    ///
    /// # Arguments
    /// * `input` - Value handed to the first step
    /// * `args` - Extra arguments passed unchanged to every step
    ///
    /// # Returns
    /// The last step's result (or `input` for an empty pipeline).
    /// [`PipelineError::StepExecution`] when no error hook recovers, carrying
    /// the original failure as its source; later steps do not run.
    /// [`PipelineError::InvalidStep`] when an unresolved step is reached,
    /// without consulting error hooks.
    #[tracing::instrument(skip_all, fields(steps = self.steps.len()))]
    pub fn invoke(&self, input: T, args: &A) -> Result<T, PipelineError> {
        let total = self.steps.len();
        let mut result = input;

        for (index, step) in self.steps.iter().enumerate() {
            let callable = match step {
                Step::Plain(callable) => callable,
                Step::Unresolved(name) => {
                    return Err(PipelineError::InvalidStep {
                        index,
                        name: name.to_string(),
                    })
                }
            };

            let ctx = HookContext::new(callable.shared_name(), index, total);
            tracing::debug!(step = %ctx.step, index, total, "Running step");

            result = match self.run_step(callable, result, args, &ctx) {
                Ok(value) => value,
                Err(failure) => self.recover(failure, ctx)?,
            };
        }

        Ok(result)
    }

    fn run_step(
        &self,
        callable: &Callable<StepFn<T, A>>,
        mut value: T,
        args: &A,
        ctx: &HookContext,
    ) -> Result<T, StageFailure<T>> {
        for hook in self.hooks.before() {
            let input = self.snapshot(&value);
            value = hook(value, ctx).map_err(|e| StageFailure::new(Stage::Before, e, input))?;
        }

        let input = self.snapshot(&value);
        value = (callable.func())(value, args)
            .map_err(|e| StageFailure::new(Stage::Step, e, input))?;

        for hook in self.hooks.after() {
            let input = self.snapshot(&value);
            value = hook(value, ctx).map_err(|e| StageFailure::new(Stage::After, e, input))?;
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

    fn recover(&self, failure: StageFailure<T>, ctx: HookContext) -> Result<T, PipelineError> {
        let StageFailure {
            stage,
            error,
            input,
        } = failure;
        let source: SharedError = Arc::from(error);

        if let Some(input) = input {
            let error_ctx = ErrorContext {
                context: ctx.clone(),
                stage,
                input,
            };
            for (position, hook) in self.hooks.error().iter().enumerate() {
                if let Recovery::Recover(value) = hook(&source, &error_ctx) {
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
