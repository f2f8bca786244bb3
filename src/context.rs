use crate::error::Stage;
use std::sync::Arc;

/// Per-call description of the step a hook is running around.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookContext {
    /// Display name of the step
    pub step: Arc<str>,
    pub index: usize,
    pub total: usize,
    /// Set only while loading hooks run for a loading step
    pub is_loading: bool,
}

impl HookContext {
    pub(crate) fn new(step: Arc<str>, index: usize, total: usize) -> Self {
        Self {
            step,
            index,
            total,
            is_loading: false,
        }
    }

    pub(crate) fn loading(&self) -> Self {
        Self {
            is_loading: true,
            ..self.clone()
        }
    }

    pub fn is_last(&self) -> bool {
        self.index + 1 == self.total
    }
}

/// Context handed to error hooks: the failing step, the stage that failed and
/// the value that entered that stage.
#[derive(Debug, Clone)]
pub struct ErrorContext<T> {
    pub context: HookContext,
    pub stage: Stage,
    pub input: T,
}

impl<T> std::ops::Deref for ErrorContext<T> {
    type Target = HookContext;

    fn deref(&self) -> &Self::Target {
        &self.context
    }
}

/// Verdict of an error hook.
///
/// `Recover` ends error handling for the step and substitutes the value as its
/// result. `Decline` hands the failure to the next error hook.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub enum Recovery<T> {
    Recover(T),
    Decline,
}

impl<T> Recovery<T> {
    pub fn is_recovered(&self) -> bool {
        matches!(self, Recovery::Recover(_))
    }

    pub fn into_option(self) -> Option<T> {
        match self {
            Recovery::Recover(value) => Some(value),
            Recovery::Decline => None,
        }
    }
}

impl<T> From<Option<T>> for Recovery<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Recovery::Recover(value),
            None => Recovery::Decline,
        }
    }
}
