use std::{
    env, fs,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{errors::Error, model::types::GenerationConfig, Result};

/// Typed configuration for the relay.
///
/// Built once at startup and shared as `Arc<Config>`; handlers never read the
/// process environment themselves.
#[derive(Clone, Debug)]
pub struct Config {
    // Credentials
    pub discord_bot_token: String,
    pub gemini_api_key: String,

    // Discord
    pub command_prefix: String,
    pub dev_guild_id: Option<u64>,

    // Model
    pub pre_prompt: String,
    pub gemini_model: String,
    pub generation: GenerationConfig,
    pub request_timeout: Duration,

    // Storage
    pub database_path: PathBuf,
}

impl Config {
    /// Load from the process environment (after merging `.env`, if present).
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).and_then(non_empty);

        // Required env vars
        let discord_bot_token = get("DISCORD_BOT_TOKEN").ok_or_else(|| {
            Error::Config("DISCORD_BOT_TOKEN environment variable is required".to_string())
        })?;
        let gemini_api_key = get("GEMINI_API_KEY").ok_or_else(|| {
            Error::Config("GEMINI_API_KEY environment variable is required".to_string())
        })?;

        let command_prefix = get("PREFIX")
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|| "!".to_string());
        let dev_guild_id = parse_opt::<u64>(&get, "DISCORD_GUILD_ID")?;

        // `PRE-PROMPT` is the historical key; accept the shell-friendly spelling too.
        let pre_prompt = lookup("PRE-PROMPT")
            .or_else(|| lookup("PRE_PROMPT"))
            .unwrap_or_default();
        let gemini_model = get("GEMINI_MODEL").unwrap_or_else(|| "gemini-1.5-flash".to_string());

        let defaults = GenerationConfig::default();
        let generation = GenerationConfig {
            temperature: parse_opt(&get, "GEMINI_TEMPERATURE")?.unwrap_or(defaults.temperature),
            top_p: parse_opt(&get, "GEMINI_TOP_P")?.unwrap_or(defaults.top_p),
            top_k: parse_opt(&get, "GEMINI_TOP_K")?.unwrap_or(defaults.top_k),
            max_output_tokens: parse_opt(&get, "GEMINI_MAX_OUTPUT_TOKENS")?
                .unwrap_or(defaults.max_output_tokens),
            response_mime_type: get("GEMINI_RESPONSE_MIME_TYPE")
                .unwrap_or(defaults.response_mime_type),
        };
        let request_timeout =
            Duration::from_secs(parse_opt(&get, "GEMINI_TIMEOUT_SECS")?.unwrap_or(120));

        let database_path =
            PathBuf::from(get("DATABASE_PATH").unwrap_or_else(|| "database.db".to_string()));

        Ok(Self {
            discord_bot_token,
            gemini_api_key,
            command_prefix,
            dev_guild_id,
            pre_prompt,
            gemini_model,
            generation,
            request_timeout,
            database_path,
        })
    }
}

fn parse_opt<T: std::str::FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    let Some(raw) = get(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|_| Error::Config(format!("{key} has an invalid value: {raw}")))
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for (key, val) in parse_dotenv(&contents) {
        if env::var_os(&key).is_some() {
            continue; // do not override existing env
        }
        env::set_var(key, val);
    }
}

fn parse_dotenv(contents: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        out.push((key.to_string(), val));
    }
    out
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn requires_both_credentials() {
        let err = Config::from_lookup(lookup(&[("GEMINI_API_KEY", "g")])).unwrap_err();
        assert!(err.to_string().contains("DISCORD_BOT_TOKEN"));

        let err = Config::from_lookup(lookup(&[
            ("DISCORD_BOT_TOKEN", "d"),
            ("GEMINI_API_KEY", " "),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
    }

    #[test]
    fn applies_defaults() {
        let cfg =
            Config::from_lookup(lookup(&[("DISCORD_BOT_TOKEN", "d"), ("GEMINI_API_KEY", "g")]))
                .unwrap();
        assert_eq!(cfg.command_prefix, "!");
        assert_eq!(cfg.pre_prompt, "");
        assert_eq!(cfg.gemini_model, "gemini-1.5-flash");
        assert_eq!(cfg.generation, GenerationConfig::default());
        assert_eq!(cfg.database_path, PathBuf::from("database.db"));
        assert_eq!(cfg.request_timeout, Duration::from_secs(120));
        assert_eq!(cfg.dev_guild_id, None);
    }

    #[test]
    fn reads_hyphenated_pre_prompt_and_overrides() {
        let cfg = Config::from_lookup(lookup(&[
            ("DISCORD_BOT_TOKEN", "d"),
            ("GEMINI_API_KEY", "g"),
            ("PRE-PROMPT", "Be brief"),
            ("PREFIX", "$"),
            ("GEMINI_TOP_K", "32"),
            ("DISCORD_GUILD_ID", "42"),
        ]))
        .unwrap();
        assert_eq!(cfg.pre_prompt, "Be brief");
        assert_eq!(cfg.command_prefix, "$");
        assert_eq!(cfg.generation.top_k, 32);
        assert_eq!(cfg.dev_guild_id, Some(42));
    }

    #[test]
    fn rejects_malformed_numbers() {
        let err = Config::from_lookup(lookup(&[
            ("DISCORD_BOT_TOKEN", "d"),
            ("GEMINI_API_KEY", "g"),
            ("GEMINI_TEMPERATURE", "hot"),
        ]))
        .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn dotenv_parsing_strips_quotes_and_comments() {
        let parsed =
            parse_dotenv("# comment\nPREFIX='!'\nPRE-PROMPT=\"You are helpful\"\n\nBROKEN\n");
        assert_eq!(
            parsed,
            vec![
                ("PREFIX".to_string(), "!".to_string()),
                ("PRE-PROMPT".to_string(), "You are helpful".to_string()),
            ]
        );
    }
}
