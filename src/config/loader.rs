//! Load settings from the process environment, overlaid on an optional `.env` file.
//! The process environment wins. Unknown keys are ignored. Reading never mutates the environment.

use crate::config::settings::{CorsOrigins, Settings};
use crate::db::Dialect;
use crate::error::{ConfigError, ValidationErrors};
use axum::http::Uri;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::Path;

const ENV_FILE: &str = ".env";

impl Settings {
    /// Settings from the process environment plus `.env` in the working directory, if present.
    pub fn load() -> Result<Settings, ConfigError> {
        let file = read_env_file(dotenvy::from_filename_iter(ENV_FILE))?;
        Settings::from_layers(|key| std::env::var(key).ok(), &file)
    }

    /// Like [`Settings::load`] with an explicit override file. A missing file is an error here.
    pub fn from_env_file(path: impl AsRef<Path>) -> Result<Settings, ConfigError> {
        let path = path.as_ref();
        let iter = dotenvy::from_path_iter(path)
            .map_err(|e| ConfigError::EnvFile(format!("{}: {}", path.display(), e)))?;
        let file = read_env_file(Ok(iter))?;
        Settings::from_layers(|key| std::env::var(key).ok(), &file)
    }

    /// `process` is consulted first; `file` only fills keys the process leaves unset.
    fn from_layers<P>(process: P, file: &HashMap<String, String>) -> Result<Settings, ConfigError>
    where
        P: Fn(&str) -> Option<String>,
    {
        Settings::from_lookup(|key| process(key).or_else(|| file.get(key).cloned()))
    }

    /// Parse settings from any key lookup. Unset keys keep their [`Settings::default`] value.
    /// Collects every malformed field before failing.
    pub fn from_lookup<F>(lookup: F) -> Result<Settings, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut settings = Settings::default();
        let mut errors = ValidationErrors::new();
        let text = |key: &str, slot: &mut String| {
            if let Some(v) = lookup(key) {
                *slot = v;
            }
        };

        text("PROJECT_NAME", &mut settings.project_name);
        text("PROJECT_VERSION", &mut settings.project_version);
        text("API_V1_STR", &mut settings.api_v1_str);
        text("ENVIRONMENT", &mut settings.environment);
        text("SECRET_KEY", &mut settings.secret_key);
        text("ALGORITHM", &mut settings.algorithm);
        text("DATABASE_URL", &mut settings.database_url);

        if let Some(v) = lookup("DEBUG") {
            settings.debug = parse_bool(&v);
        }

        if let Some(raw) = lookup("BACKEND_CORS_ORIGINS") {
            match parse_cors_origins(&raw) {
                Ok(origins) => settings.backend_cors_origins = origins,
                Err(msg) => errors.push("BACKEND_CORS_ORIGINS", msg),
            }
        }

        if Dialect::from_url(&settings.database_url).is_none() {
            errors.push(
                "DATABASE_URL",
                "unsupported connection string scheme (expected postgresql:// or sqlite:)",
            );
        }

        if let Some(raw) = lookup("ACCESS_TOKEN_EXPIRE_MINUTES") {
            match raw.trim().parse::<u32>() {
                Ok(minutes) => settings.access_token_expire_minutes = minutes,
                Err(_) => errors.push(
                    "ACCESS_TOKEN_EXPIRE_MINUTES",
                    format!("must be a non-negative integer, got '{}'", raw),
                ),
            }
        }

        // Not used by this service; carried through as given.
        settings.supabase_url = non_empty(lookup("SUPABASE_URL"));
        settings.supabase_key = non_empty(lookup("SUPABASE_KEY"));

        if let Some(raw) = lookup("BIND_ADDR") {
            match raw.trim().parse::<SocketAddr>() {
                Ok(addr) => settings.bind_addr = addr,
                Err(_) => errors.push("BIND_ADDR", format!("must be host:port, got '{}'", raw)),
            }
        }

        errors.into_result().map_err(ConfigError::Validation)?;
        Ok(settings)
    }
}

fn read_env_file<R: std::io::Read>(
    iter: Result<dotenvy::Iter<R>, dotenvy::Error>,
) -> Result<HashMap<String, String>, ConfigError> {
    let iter = match iter {
        Ok(iter) => iter,
        Err(e) if e.not_found() => return Ok(HashMap::new()),
        Err(e) => return Err(ConfigError::EnvFile(e.to_string())),
    };
    let mut vars = HashMap::new();
    for item in iter {
        let (key, value) = item.map_err(|e| ConfigError::EnvFile(e.to_string()))?;
        vars.insert(key, value);
    }
    Ok(vars)
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "true" | "1" | "t")
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Accepts a JSON array (`["http://a", "http://b"]`) or a comma-separated list.
fn parse_cors_origins(raw: &str) -> Result<CorsOrigins, String> {
    let trimmed = raw.trim();
    let items: Vec<String> = if trimmed.starts_with('[') {
        serde_json::from_str(trimmed).map_err(|e| format!("invalid JSON list: {}", e))?
    } else {
        trimmed
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    };
    if items.iter().any(|o| o.trim() == "*") {
        return Ok(CorsOrigins::Any);
    }
    let mut origins = Vec::with_capacity(items.len());
    for item in items {
        let origin = item.trim().trim_end_matches('/');
        let valid = match origin.parse::<Uri>() {
            Ok(uri) => {
                uri.scheme().is_some()
                    && uri.authority().is_some()
                    && matches!(uri.path(), "" | "/")
                    && uri.query().is_none()
            }
            Err(_) => false,
        };
        if !valid {
            return Err(format!("'{}' is not a valid origin (scheme://host[:port])", item));
        }
        origins.push(origin.to_string());
    }
    Ok(CorsOrigins::List(origins))
}
