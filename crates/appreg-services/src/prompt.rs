//! User interaction boundary for the guided flows.
//!
//! Services collect their parameters through a [`Prompter`] before entering
//! the mutation protocol, so by the time anything is marked busy every
//! answer has already been gathered and validated. Every prompt can be
//! backed out of, which callers receive as `Ok(None)` and services translate
//! into [`Outcome::Aborted`](crate::Outcome::Aborted) without touching the
//! repository.

use appreg_core::DirectoryResult;
use async_trait::async_trait;

/// Returns `None` when the input is acceptable, or a message describing
/// what is wrong with it. Interactive prompters re-ask on `Some`.
pub type InputValidator = dyn Fn(&str) -> Option<String> + Send + Sync;

/// A single free-text question.
pub struct InputRequest<'a> {
    /// Short label shown to the user, e.g. `"Role display name"`.
    pub title: &'a str,
    /// Pre-filled answer for edit flows.
    pub default: Option<&'a str>,
    /// Hint shown while the field is empty.
    pub placeholder: Option<&'a str>,
    /// Checked before the answer is accepted.
    pub validator: Option<&'a InputValidator>,
}

impl<'a> InputRequest<'a> {
    #[must_use]
    pub fn new(title: &'a str) -> Self {
        Self {
            title,
            default: None,
            placeholder: None,
            validator: None,
        }
    }

    #[must_use]
    pub fn with_default(mut self, default: &'a str) -> Self {
        self.default = Some(default);
        self
    }

    #[must_use]
    pub fn with_placeholder(mut self, placeholder: &'a str) -> Self {
        self.placeholder = Some(placeholder);
        self
    }

    #[must_use]
    pub fn with_validator(mut self, validator: &'a InputValidator) -> Self {
        self.validator = Some(validator);
        self
    }
}

impl std::fmt::Debug for InputRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputRequest")
            .field("title", &self.title)
            .field("default", &self.default)
            .field("placeholder", &self.placeholder)
            .field("validator", &self.validator.map(|_| "…"))
            .finish()
    }
}

/// Asks the user questions. `Ok(None)` from any method means the user backed
/// out; services abort the flow without side effects.
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Asks for free text. Implementations must not return an answer the
    /// request's validator rejects.
    async fn input(&self, request: InputRequest<'_>) -> DirectoryResult<Option<String>>;

    /// Asks the user to pick one of `options`. `default` is the initially
    /// highlighted index.
    async fn select(
        &self,
        title: &str,
        options: &[String],
        default: usize,
    ) -> DirectoryResult<Option<usize>>;

    /// Asks a yes/no question.
    async fn confirm(&self, message: &str, default: bool) -> DirectoryResult<Option<bool>>;
}
