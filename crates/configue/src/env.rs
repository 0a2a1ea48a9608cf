//! Environment variable interpolation in scalar values.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::collections::HashMap;
use tracing::warn;

// "${NAME-default}" -> ("NAME", "-", "default"); "${NAME}" -> ("NAME", "", "").
// A default may not itself contain "${": the inner variable is replaced
// first and the result interpolated again.
static ENV_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\$\{(\w+)(-?)((?:[^}$]|\$[^{}])*)\}").expect("valid regex"));

/// Source of environment variables for `${NAME}` substitution.
///
/// By default variables come from the process environment. Explicit
/// overrides take precedence, and an [`Environment::empty`] environment
/// sees only its overrides, which keeps tests independent of the host.
#[derive(Debug, Clone)]
pub struct Environment {
    overrides: HashMap<String, String>,
    inherit: bool,
}

impl Default for Environment {
    fn default() -> Self {
        Self::process()
    }
}

impl Environment {
    /// The process environment.
    pub fn process() -> Self {
        Self {
            overrides: HashMap::new(),
            inherit: true,
        }
    }

    /// No variables at all, apart from explicit overrides.
    pub fn empty() -> Self {
        Self {
            overrides: HashMap::new(),
            inherit: false,
        }
    }

    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<String> {
        if let Some(value) = self.overrides.get(name) {
            return Some(value.clone());
        }
        if self.inherit {
            std::env::var(name).ok()
        } else {
            None
        }
    }

    /// Replace every `${NAME}` / `${NAME-default}` in `text`.
    ///
    /// Returns `None` when nothing changed. A variable that is missing and
    /// has no default is replaced by the empty string, with a warning.
    pub fn interpolate(&self, text: &str) -> Option<String> {
        if !text.contains("${") {
            return None;
        }

        let replaced = ENV_PATTERN.replace_all(text, |caps: &Captures<'_>| {
            let name = &caps[1];
            let has_default = !caps[2].is_empty();
            match self.get(name) {
                Some(value) => value,
                None => {
                    if !has_default {
                        warn!(variable = name, "Missing environment variable, no default is set");
                    }
                    caps[3].to_string()
                }
            }
        });

        (replaced != text).then(|| replaced.into_owned())
    }
}
