use crate::constants::{DEFAULT_ALIAS_PREFIX, DEFAULT_PLACEHOLDER_PREFIX};
use crate::error::{CriteriaError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Positional marker style used when a statement is rendered in "complete" mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderStyle {
    /// `?` markers (JDBC, MySQL, SQLite)
    #[default]
    Question,
    /// `$1`, `$2`, ... markers (PostgreSQL)
    Dollar,
}

impl FromStr for PlaceholderStyle {
    type Err = CriteriaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "question" | "?" => Ok(Self::Question),
            "dollar" | "$" => Ok(Self::Dollar),
            other => Err(CriteriaError::configuration(format!(
                "Invalid placeholder_style: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CriteriaConfig {
    /// Turn failed property lookups into errors instead of silently dropping the condition
    pub strict: bool,
    pub placeholder_prefix: String,
    pub alias_prefix: String,
    /// Prefix every ORDER BY with the keep-order hint comment
    pub keep_order_hint: bool,
    pub placeholder_style: PlaceholderStyle,
}

impl Default for CriteriaConfig {
    fn default() -> Self {
        Self {
            strict: false,
            placeholder_prefix: DEFAULT_PLACEHOLDER_PREFIX.to_string(),
            alias_prefix: DEFAULT_ALIAS_PREFIX.to_string(),
            keep_order_hint: false,
            placeholder_style: PlaceholderStyle::Question,
        }
    }
}

impl CriteriaConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(strict) = std::env::var("CRITERIA_STRICT") {
            config.strict = strict
                .parse()
                .map_err(|e| CriteriaError::configuration(format!("Invalid strict: {e}")))?;
        }

        if let Ok(prefix) = std::env::var("CRITERIA_PLACEHOLDER_PREFIX") {
            config.placeholder_prefix = prefix;
        }

        if let Ok(prefix) = std::env::var("CRITERIA_ALIAS_PREFIX") {
            config.alias_prefix = prefix;
        }

        if let Ok(hint) = std::env::var("CRITERIA_KEEP_ORDER_HINT") {
            config.keep_order_hint = hint.parse().map_err(|e| {
                CriteriaError::configuration(format!("Invalid keep_order_hint: {e}"))
            })?;
        }

        if let Ok(style) = std::env::var("CRITERIA_PLACEHOLDER_STYLE") {
            config.placeholder_style = style.parse()?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Prefixes end up inside SQL identifiers and placeholder names, so only
    /// ASCII alphanumerics and underscores are accepted.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("placeholder_prefix", &self.placeholder_prefix),
            ("alias_prefix", &self.alias_prefix),
        ] {
            if value.is_empty() {
                return Err(CriteriaError::configuration(format!("{name} must not be empty")));
            }
            if !value.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(CriteriaError::configuration(format!(
                    "{name} must be alphanumeric: {value}"
                )));
            }
            if value.starts_with(|c: char| c.is_ascii_digit()) {
                return Err(CriteriaError::configuration(format!(
                    "{name} must not start with a digit: {value}"
                )));
            }
        }
        Ok(())
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_placeholder_style(mut self, style: PlaceholderStyle) -> Self {
        self.placeholder_style = style;
        self
    }
}
