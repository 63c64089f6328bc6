//! Dialoguer-backed implementation of the services' prompt boundary.
//!
//! Backing out is part of the prompt contract: `Ok(None)` aborts the flow
//! without an error. Here that means Esc on a select or confirm, Ctrl-C on
//! any prompt, or submitting an empty line on a text prompt that has no
//! default.

use std::io;

use async_trait::async_trait;

use appreg_core::DirectoryResult;
use appreg_services::{InputRequest, Prompter};
use dialoguer::{Confirm, Input, Select};
use tracing::debug;

use crate::error::{CliError, CliResult};

/// Guard for commands that gather their parameters interactively.
pub fn require_tty() -> CliResult<()> {
    if atty::is(atty::Stream::Stdin) {
        Ok(())
    } else {
        Err(CliError::Validation(
            "this command asks questions and needs an interactive terminal".to_string(),
        ))
    }
}

pub struct DialoguerPrompter;

#[async_trait]
impl Prompter for DialoguerPrompter {
    async fn input(&self, request: InputRequest<'_>) -> DirectoryResult<Option<String>> {
        let prompt = match request.placeholder {
            Some(hint) => format!("{} ({hint})", request.title),
            None => request.title.to_string(),
        };

        let mut input = Input::<String>::new().with_prompt(prompt).allow_empty(true);
        if let Some(default) = request.default {
            input = input.default(default.to_string());
        }
        if let Some(validator) = request.validator {
            // An empty answer bypasses validation; it means "back out", not
            // "submit an empty value".
            input = input.validate_with(|text: &String| -> Result<(), String> {
                let text = text.trim();
                if text.is_empty() {
                    return Ok(());
                }
                match validator(text) {
                    Some(message) => Err(message),
                    None => Ok(()),
                }
            });
        }

        match input.interact_text() {
            Ok(answer) => {
                let answer = answer.trim().to_string();
                if answer.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(answer))
                }
            }
            Err(e) => Ok(backed_out(e)),
        }
    }

    async fn select(
        &self,
        title: &str,
        options: &[String],
        default: usize,
    ) -> DirectoryResult<Option<usize>> {
        let result = Select::new()
            .with_prompt(title)
            .items(options)
            .default(default)
            .interact_opt();
        match result {
            Ok(choice) => Ok(choice),
            Err(e) => Ok(backed_out(e)),
        }
    }

    async fn confirm(&self, message: &str, default: bool) -> DirectoryResult<Option<bool>> {
        let result = Confirm::new()
            .with_prompt(message)
            .default(default)
            .interact_opt();
        match result {
            Ok(choice) => Ok(choice),
            Err(e) => Ok(backed_out(e)),
        }
    }
}

/// A prompt that cannot be answered aborts the flow instead of failing it.
fn backed_out<T>(error: dialoguer::Error) -> Option<T> {
    match &error {
        dialoguer::Error::IO(io_err) if io_err.kind() == io::ErrorKind::Interrupted => {}
        _ => debug!(error = %error, "prompt failed, treating as backed out"),
    }
    None
}
