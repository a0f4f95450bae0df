//! Phrases: text assembled from several output values.
//!
//! A template phrase substitutes `$<alias>` placeholders with the values of
//! its sub-expressions. A message phrase hands the values, in declaration
//! order, to a [`MessageFormatter`] under a message key.

use crate::error::Result;
use once_cell::sync::Lazy;
use printql_proto::Value;
use regex::{Captures, Regex};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$<([^>]+)>").expect("placeholder regex"));

static POSITIONAL: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{(\d+)\}").expect("positional regex"));

/// Builds localized text from a message key and positional arguments.
pub trait MessageFormatter: Send + Sync {
    /// Format the message.
    fn format(&self, key: &str, args: &[Value]) -> Result<String>;
}

/// Treats the key as the message itself and fills `{0}`, `{1}`, ...
///
/// Placeholders past the last argument are left as they are.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionalFormatter;

impl MessageFormatter for PositionalFormatter {
    fn format(&self, key: &str, args: &[Value]) -> Result<String> {
        Ok(POSITIONAL
            .replace_all(key, |caps: &Captures<'_>| {
                caps[1]
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| args.get(index))
                    .map(|value| value.to_string())
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned())
    }
}

/// Renders phrases for an evaluator.
#[derive(Clone)]
pub struct PhraseHelper {
    formatter: Arc<dyn MessageFormatter>,
}

impl Default for PhraseHelper {
    fn default() -> Self {
        Self::new(Arc::new(PositionalFormatter))
    }
}

impl PhraseHelper {
    /// Create a helper using `formatter` for message phrases.
    pub fn new(formatter: Arc<dyn MessageFormatter>) -> Self {
        Self { formatter }
    }

    /// Substitute `$<alias>` placeholders.
    pub fn render_template(&self, template: &str, values: &[(String, Value)]) -> String {
        PLACEHOLDER
            .replace_all(template, |caps: &Captures<'_>| {
                match values.iter().find(|(alias, _)| alias == &caps[1]) {
                    Some((_, value)) => value.to_string(),
                    None => {
                        warn!(placeholder = &caps[1], "unknown phrase placeholder");
                        caps[0].to_string()
                    }
                }
            })
            .into_owned()
    }

    /// Format a message phrase.
    pub fn render_message(&self, key: &str, values: &[(String, Value)]) -> Result<String> {
        let args: Vec<Value> = values.iter().map(|(_, value)| value.clone()).collect();
        self.formatter.format(key, &args)
    }
}

impl fmt::Debug for PhraseHelper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhraseHelper").finish_non_exhaustive()
    }
}
