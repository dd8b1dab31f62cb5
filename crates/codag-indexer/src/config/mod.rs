//! Analysis configuration
//!
//! Loaded from `codag.toml` or `codag.yaml` at the repository root. Every
//! field has a default, so an empty file (or no file) is a valid config.

use crate::error::{IndexError, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// File names tried by [`AnalysisConfig::discover`], in order.
pub const CONFIG_FILE_NAMES: [&str; 3] = ["codag.toml", "codag.yaml", "codag.yml"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct AnalysisConfig {
    pub llm: LlmConfig,
    pub http: HttpConfig,
    pub scan: ScanConfig,
}

/// Regex sources for recognising LLM usage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Matched against full callee texts: `client.chat.completions.create`.
    pub call_patterns: Vec<String>,
    /// Matched against identifiers and constructor names: `OpenAI`, `llm`.
    pub identifier_patterns: Vec<String>,
    /// Cheap whole-file prefilter.
    pub hint_patterns: Vec<String>,
    /// Track variables bound to LLM clients and classify calls through them.
    pub track_bindings: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        LlmConfig {
            call_patterns: [
                r"chat\.completions\.create",
                r"\bcompletions\.create",
                r"\bmessages\.(create|stream)\b",
                r"\bresponses\.create",
                r"\bembeddings\.create",
                r"generate_content",
                r"generateContent(Stream)?\b",
                r"(^|\.)(generateText|streamText|generateObject|streamObject)$",
                r"ChatCompletion\.a?create",
                r"\bollama\.(chat|generate|embeddings)\b",
                r"invoke_model",
                r"(^|\.)converse(_stream)?$",
                r"CreateChatCompletion",
                r"\bMessages\.New$",
                r"^(openai|anthropic|genai|gemini|cohere|mistral|groq|ollama|litellm|bedrock|vertexai)\.",
            ]
            .map(String::from)
            .to_vec(),
            identifier_patterns: vec![
                r"(?i)(openai|anthropic|genai|gemini|claude|gpt|llm|cohere|mistral|groq|ollama|bedrock|vertexai|langchain|litellm|chatmodel)".to_string(),
            ],
            hint_patterns: vec![
                r"(?i)(openai|anthropic|gemini|genai|claude|gpt-|langchain|litellm|ollama|cohere|mistral|groq|bedrock|vertexai|llm|completions?\.create|generate_?content)".to_string(),
            ],
            track_bindings: true,
        }
    }
}

/// Object names that mark route registrations and outgoing requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// `app.get("/x", handler)`, `@router.post("/x")`.
    pub router_objects: Vec<String>,
    /// `axios.post("/x")`, `requests.get(url)`.
    pub client_objects: Vec<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            router_objects: [
                "app", "router", "api", "server", "r", "e", "g", "mux", "route", "routes", "blueprint",
                "bp", "fastify", "express", "v1", "group",
            ]
            .map(String::from)
            .to_vec(),
            client_objects: [
                "axios", "requests", "httpx", "http", "session", "client", "api", "ky", "got",
                "superagent", "$http", "httpClient", "HttpClient", "restTemplate", "aiohttp",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

/// Repository walk settings, applied by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Globs relative to the repository root.
    pub exclude: Vec<String>,
    /// Files larger than this many bytes are skipped.
    pub max_file_size: u64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            exclude: [
                "**/node_modules/**",
                "**/dist/**",
                "**/build/**",
                "**/target/**",
                "**/.venv/**",
                "**/venv/**",
                "**/__pycache__/**",
                "**/*.min.js",
                "**/*.d.ts",
            ]
            .map(String::from)
            .to_vec(),
            max_file_size: 1024 * 1024,
        }
    }
}

impl ScanConfig {
    pub fn exclude_set(&self) -> Result<GlobSet> {
        let mut builder = GlobSetBuilder::new();
        for pattern in &self.exclude {
            let glob = Glob::new(pattern).map_err(|e| IndexError::Config {
                path: PathBuf::from("scan.exclude"),
                message: format!("`{}`: {}", pattern, e),
            })?;
            builder.add(glob);
        }
        builder.build().map_err(|e| IndexError::Config {
            path: PathBuf::from("scan.exclude"),
            message: e.to_string(),
        })
    }
}

impl AnalysisConfig {
    /// Load from a `.toml`, `.yaml` or `.yml` file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config_error = |message: String| IndexError::Config {
            path: path.to_path_buf(),
            message,
        };

        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&content).map_err(|e| config_error(e.to_string()))?,
            Some("yaml") | Some("yml") => {
                Self::from_yaml_str(&content).map_err(|e| config_error(e.to_string()))?
            }
            other => return Err(config_error(format!("unsupported config format {:?}", other))),
        };
        debug!("Loaded analysis config from {}", path.display());
        Ok(config)
    }

    /// Find and load the first config file in `root`, if any.
    pub fn discover(root: &Path) -> Result<Option<Self>> {
        for name in CONFIG_FILE_NAMES {
            let candidate = root.join(name);
            if candidate.is_file() {
                return Self::load(&candidate).map(Some);
            }
        }
        Ok(None)
    }

    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn from_yaml_str(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }
}
