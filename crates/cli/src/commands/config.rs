use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use aerodesk_core::config::{AppConfig, LoadOptions};
use secrecy::{ExposeSecret, SecretString};
use toml::Value;

pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let llm_api_key = redact_secret(config.llm.api_key.as_ref());
    let search_api_key = redact_secret(config.search.api_key.as_ref());

    let fields: [(&str, &str, &str); 18] = [
        ("database.url", &config.database.url, "AERODESK_DATABASE_URL"),
        (
            "database.max_connections",
            &config.database.max_connections.to_string(),
            "AERODESK_DATABASE_MAX_CONNECTIONS",
        ),
        (
            "database.timeout_secs",
            &config.database.timeout_secs.to_string(),
            "AERODESK_DATABASE_TIMEOUT_SECS",
        ),
        ("llm.provider", config.llm.provider.as_str(), "AERODESK_LLM_PROVIDER"),
        ("llm.model", &config.llm.model, "AERODESK_LLM_MODEL"),
        ("llm.embedding_model", &config.llm.embedding_model, "AERODESK_LLM_EMBEDDING_MODEL"),
        (
            "llm.base_url",
            config.llm.base_url.as_deref().unwrap_or("<unset>"),
            "AERODESK_LLM_BASE_URL",
        ),
        ("llm.api_key", &llm_api_key, "AERODESK_LLM_API_KEY"),
        ("llm.timeout_secs", &config.llm.timeout_secs.to_string(), "AERODESK_LLM_TIMEOUT_SECS"),
        ("search.base_url", &config.search.base_url, "AERODESK_SEARCH_BASE_URL"),
        ("search.api_key", &search_api_key, "AERODESK_SEARCH_API_KEY"),
        (
            "search.max_results",
            &config.search.max_results.to_string(),
            "AERODESK_SEARCH_MAX_RESULTS",
        ),
        ("agent.layout", config.agent.layout.as_str(), "AERODESK_AGENT_LAYOUT"),
        (
            "agent.max_parse_attempts",
            &config.agent.max_parse_attempts.to_string(),
            "AERODESK_AGENT_MAX_PARSE_ATTEMPTS",
        ),
        (
            "agent.max_steps_per_turn",
            &config.agent.max_steps_per_turn.to_string(),
            "AERODESK_AGENT_MAX_STEPS_PER_TURN",
        ),
        (
            "agent.require_approval",
            &config.agent.require_approval.to_string(),
            "AERODESK_AGENT_REQUIRE_APPROVAL",
        ),
        ("logging.level", &config.logging.level, "AERODESK_LOGGING_LEVEL"),
        ("logging.format", &format!("{:?}", config.logging.format), "AERODESK_LOGGING_FORMAT"),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key_path, value, env_key) in fields {
        lines.push(render_line(
            key_path,
            value,
            field_source(
                key_path,
                Some(env_key),
                config_file_doc.as_ref(),
                config_file_path.as_deref(),
            ),
        ));
    }

    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    let root = PathBuf::from("aerodesk.toml");
    if root.exists() {
        return Some(root);
    }

    let nested = PathBuf::from("config/aerodesk.toml");
    if nested.exists() {
        return Some(nested);
    }

    None
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_key: Option<&str>,
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_key {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_secret(secret: Option<&SecretString>) -> String {
    let Some(secret) = secret else {
        return "<unset>".to_string();
    };
    let trimmed = secret.expose_secret().trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;

    use super::{contains_path, redact_secret};

    #[test]
    fn secrets_keep_only_their_prefix() {
        let key = SecretString::from("sk-live-abcdef".to_string());
        assert_eq!(redact_secret(Some(&key)), "sk-***");
        assert_eq!(redact_secret(None), "<unset>");
        assert_eq!(redact_secret(Some(&SecretString::from("tvly0123".to_string()))), "<redacted>");
    }

    #[test]
    fn nested_keys_are_found_in_the_file() {
        let doc: toml::Value = "[agent]\nlayout = \"flat\"\n".parse().expect("toml");
        assert!(contains_path(&doc, "agent.layout"));
        assert!(!contains_path(&doc, "agent.require_approval"));
    }
}
