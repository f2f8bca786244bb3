use crate::error::{BoxError, PipelineError};
use crate::step::AsyncStep;
use once_cell::sync::Lazy;
use pipekit_fetch::{FetchConfig, FetchError, Fetcher, RequestOptions};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

// Idle connections are not pooled, so `load_from` steps stay usable when
// invoked from more than one runtime.
static DEFAULT_LOADER: Lazy<Loader> = Lazy::new(|| {
    let config = FetchConfig {
        pool_max_idle_per_host: Some(0),
        ..FetchConfig::default()
    };
    Loader::from_config(&config).unwrap_or_else(|err| {
        tracing::warn!("Falling back to an unconfigured default loader: {}", err);
        Loader::default()
    })
});

/// Fail the step instead of panicking when no Tokio runtime drives it,
/// e.g. under `to_sync` from plain synchronous code.
fn require_runtime(step: &str) -> Result<(), BoxError> {
    match tokio::runtime::Handle::try_current() {
        Ok(_) => Ok(()),
        Err(_) => {
            tracing::warn!("Step '{}' needs a Tokio runtime", step);
            Err(Box::new(PipelineError::UnexpectedAsyncResult {
                step: step.to_string(),
            }))
        }
    }
}

/// Where a loading step fetches from.
#[derive(Clone)]
pub enum Locator {
    Fixed(String),
    /// Computed from the pipeline's current value
    Derived(Arc<dyn Fn(&Value) -> String + Send + Sync>),
}

impl Locator {
    pub fn derived<F>(func: F) -> Self
    where
        F: Fn(&Value) -> String + Send + Sync + 'static,
    {
        Locator::Derived(Arc::new(func))
    }

    pub fn resolve(&self, input: &Value) -> String {
        match self {
            Locator::Fixed(url) => url.clone(),
            Locator::Derived(func) => func(input),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Fixed(url) => f.write_str(url),
            Locator::Derived(_) => f.write_str("<derived>"),
        }
    }
}

impl fmt::Debug for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Locator({self})")
    }
}

impl From<&str> for Locator {
    fn from(url: &str) -> Self {
        Locator::Fixed(url.to_string())
    }
}

impl From<String> for Locator {
    fn from(url: String) -> Self {
        Locator::Fixed(url)
    }
}

/// Builds loading steps that share one HTTP client.
///
/// The client pools connections by default. Pooled connections belong to the
/// runtime that opened them, so when steps are invoked from several runtimes
/// build one `Loader` per runtime, or set `pool_max_idle_per_host = 0`.
#[derive(Debug, Clone, Default)]
pub struct Loader {
    fetcher: Fetcher,
}

impl Loader {
    pub fn new(fetcher: Fetcher) -> Self {
        Self { fetcher }
    }

    pub fn from_config(config: &FetchConfig) -> Result<Self, FetchError> {
        Ok(Self::new(Fetcher::from_config(config)?))
    }

    /// A step tagged as loading that fetches `locator` and yields the decoded body.
    pub fn step<A>(&self, locator: impl Into<Locator>, options: RequestOptions) -> AsyncStep<Value, A>
    where
        A: Send + 'static,
    {
        let locator = locator.into();
        let name: Arc<str> = Arc::from(format!("load_from({locator})"));
        let fetcher = self.fetcher.clone();
        let options = Arc::new(options);
        let step_name = name.clone();

        AsyncStep::loading(name, move |input: Value, _args: A| {
            let url = locator.resolve(&input);
            let fetcher = fetcher.clone();
            let options = options.clone();
            let step_name = step_name.clone();
            async move {
                require_runtime(&step_name)?;
                tracing::debug!("Loading data from {}", url);
                let body = fetcher.fetch(&url, &options).await?;
                Ok::<_, BoxError>(body)
            }
        })
    }
}

/// Loading step using a process-wide default client.
pub fn load_from<A>(locator: impl Into<Locator>, options: RequestOptions) -> AsyncStep<Value, A>
where
    A: Send + 'static,
{
    DEFAULT_LOADER.step(locator, options)
}

/// Wrap `step` so it waits `delay` before running. The result is a loading step.
pub fn delayed<T, A>(step: AsyncStep<T, A>, delay: Duration) -> AsyncStep<T, A>
where
    T: Send + 'static,
    A: Send + 'static,
{
    let Some(callable) = step.callable().cloned() else {
        return step;
    };
    let name: Arc<str> = Arc::from(format!("delayed({})", callable.name()));
    let step_name = name.clone();

    AsyncStep::loading(name, move |input: T, args: A| {
        let inner = callable.clone();
        let step_name = step_name.clone();
        async move {
            require_runtime(&step_name)?;
            tracing::debug!("Delaying {} by {:?}", inner.name(), delay);
            tokio::time::sleep(delay).await;
            (inner.func())(input, args).await
        }
    })
}
