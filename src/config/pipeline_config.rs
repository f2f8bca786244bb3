use crate::config::ConfigError;
use crate::error::PipelineError;
use crate::hooks::HookKind;
use crate::pipeline::{AsyncPipeline, Pipeline};
use crate::registry::Registry;
use serde::Deserialize;

/// A pipeline described by step and hook names, resolved against a [`Registry`].
#[derive(Debug, Deserialize, Clone, Default)]
pub struct PipelineConfig {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub before: Vec<String>,
    #[serde(default)]
    pub after: Vec<String>,
    #[serde(default)]
    pub error: Vec<String>,
    /// Only honoured by async pipelines
    #[serde(default)]
    pub loading: Vec<String>,
}

impl PipelineConfig {
    pub fn validate(&self, name: &str) -> Result<(), ConfigError> {
        let blank = self
            .steps
            .iter()
            .map(String::as_str)
            .chain(self.hook_names().map(|(_, hook)| hook))
            .any(|entry| entry.trim().is_empty());
        if blank {
            return Err(ConfigError::InvalidPipeline {
                name: name.to_string(),
                reason: "step and hook names must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Hook names in registration order: before, after, error, loading.
    fn hook_names(&self) -> impl Iterator<Item = (HookKind, &str)> + '_ {
        [
            (HookKind::Before, &self.before),
            (HookKind::After, &self.after),
            (HookKind::Error, &self.error),
            (HookKind::Loading, &self.loading),
        ]
        .into_iter()
        .flat_map(|(kind, names)| names.iter().map(move |name| (kind, name.as_str())))
    }

    /// Build a synchronous pipeline.
    ///
    /// Unknown step names are accepted and fail at invocation; unknown hook
    /// names, and any loading hook, fail here.
    pub fn build<T, A>(&self, registry: &Registry<T, A>) -> Result<Pipeline<T, A>, PipelineError> {
        let mut pipeline = Pipeline::new(self.steps.iter().map(|name| registry.step(name)));
        for (kind, name) in self.hook_names() {
            pipeline.register(kind, name, registry)?;
        }
        Ok(pipeline)
    }

    pub fn build_async<T, A>(
        &self,
        registry: &Registry<T, A>,
    ) -> Result<AsyncPipeline<T, A>, PipelineError>
    where
        T: Clone + Send + 'static,
        A: Clone + Send + Sync + 'static,
    {
        let mut pipeline =
            AsyncPipeline::new(self.steps.iter().map(|name| registry.async_step(name)));
        for (kind, name) in self.hook_names() {
            pipeline.register(kind, name, registry)?;
        }
        Ok(pipeline)
    }
}
