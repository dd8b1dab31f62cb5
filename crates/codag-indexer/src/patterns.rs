//! LLM recognition predicates injected into the extractors

use crate::config::LlmConfig;
use crate::error::{IndexError, Result};
use regex::{Regex, RegexSet};

/// Decides what counts as LLM usage. Injected so hosts can swap the pattern
/// source without touching extraction.
pub trait LlmMatcher: Send + Sync {
    /// Identifiers and constructor names: `OpenAI`, `ChatAnthropic`, `llm`.
    fn is_llm_identifier(&self, text: &str) -> bool;

    /// Full callee texts: `client.chat.completions.create`.
    fn is_llm_call(&self, callee: &str) -> bool;

    /// Cheap prefilter over a whole file.
    fn might_contain_llm(&self, source: &str) -> bool;
}

/// Regex-backed [`LlmMatcher`] compiled from [`LlmConfig`].
#[derive(Debug, Clone)]
pub struct PatternSet {
    calls: RegexSet,
    identifiers: RegexSet,
    hints: RegexSet,
}

impl PatternSet {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        Ok(PatternSet {
            calls: compile(&config.call_patterns)?,
            identifiers: compile(&config.identifier_patterns)?,
            hints: compile(&config.hint_patterns)?,
        })
    }
}

impl Default for PatternSet {
    fn default() -> Self {
        Self::from_config(&LlmConfig::default()).expect("default LLM patterns compile")
    }
}

impl LlmMatcher for PatternSet {
    fn is_llm_identifier(&self, text: &str) -> bool {
        self.identifiers.is_match(text)
    }

    fn is_llm_call(&self, callee: &str) -> bool {
        self.calls.is_match(callee)
    }

    fn might_contain_llm(&self, source: &str) -> bool {
        self.hints.is_match(source)
    }
}

/// Compile patterns one by one first so an error names the offending pattern.
fn compile(patterns: &[String]) -> Result<RegexSet> {
    for pattern in patterns {
        Regex::new(pattern).map_err(|source| IndexError::Pattern {
            pattern: pattern.clone(),
            source,
        })?;
    }
    RegexSet::new(patterns).map_err(|source| IndexError::Pattern {
        pattern: patterns.join(" | "),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_call_patterns() {
        let patterns = PatternSet::default();
        assert!(patterns.is_llm_call("client.chat.completions.create"));
        assert!(patterns.is_llm_call("self.anthropic.messages.create"));
        assert!(patterns.is_llm_call("model.generate_content"));
        assert!(patterns.is_llm_call("openai.ChatCompletion.create"));
        assert!(patterns.is_llm_call("generateText"));
        assert!(patterns.is_llm_call("ollama.chat"));
        assert!(!patterns.is_llm_call("db.messages.find"));
        assert!(!patterns.is_llm_call("generateTextReport"));
        assert!(!patterns.is_llm_call("print"));
    }

    #[test]
    fn test_identifiers_and_hints() {
        let patterns = PatternSet::default();
        assert!(patterns.is_llm_identifier("OpenAI"));
        assert!(patterns.is_llm_identifier("ChatAnthropic"));
        assert!(patterns.is_llm_identifier("llm_client"));
        assert!(!patterns.is_llm_identifier("Database"));
        assert!(patterns.might_contain_llm("from openai import OpenAI"));
        assert!(!patterns.might_contain_llm("def add(a, b):\n    return a + b\n"));
    }

    #[test]
    fn test_bad_pattern_is_reported() {
        let config = LlmConfig {
            call_patterns: vec!["ok".to_string(), "(unclosed".to_string()],
            ..LlmConfig::default()
        };
        match PatternSet::from_config(&config) {
            Err(IndexError::Pattern { pattern, .. }) => assert_eq!(pattern, "(unclosed"),
            other => panic!("expected pattern error, got {:?}", other.map(|_| ())),
        }
    }
}
