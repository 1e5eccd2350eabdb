use anyhow::{Result, anyhow};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub seed_demo: bool,
    pub cors_allowed_origins: Vec<String>,
    pub secure_cookies: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            seed_demo: true,
            cors_allowed_origins: vec!["http://localhost:5173".into()],
            secure_cookies: false,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let seed_demo = match lookup("DEALROOM_SEED") {
            Some(raw) => parse_flag("DEALROOM_SEED", &raw)?,
            None => defaults.seed_demo,
        };
        let secure_cookies = match lookup("SESSION_COOKIE_SECURE") {
            Some(raw) => parse_flag("SESSION_COOKIE_SECURE", &raw)?,
            None => defaults.secure_cookies,
        };

        let cors_allowed_origins = match lookup("CORS_ALLOWED_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    if trimmed.is_empty() {
                        None
                    } else {
                        Some(trimmed.to_string())
                    }
                })
                .collect::<Vec<_>>(),
            None => defaults.cors_allowed_origins,
        };
        if cors_allowed_origins.is_empty() {
            return Err(anyhow!("CORS_ALLOWED_ORIGINS must name at least one origin"));
        }

        Ok(Self {
            seed_demo,
            cors_allowed_origins,
            secure_cookies,
        })
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(anyhow!("{key} must be a boolean, got `{other}`")),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_without_env() {
        let config = load(&[]).unwrap();
        assert!(config.seed_demo);
        assert!(!config.secure_cookies);
        assert_eq!(config.cors_allowed_origins, vec!["http://localhost:5173"]);
    }

    #[test]
    fn origins_are_split_and_trimmed() {
        let config = load(&[
            ("CORS_ALLOWED_ORIGINS", " https://a.example , ,https://b.example"),
            ("DEALROOM_SEED", "no"),
        ])
        .unwrap();
        assert!(!config.seed_demo);
        assert_eq!(
            config.cors_allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn blank_origin_list_is_an_error() {
        let err = load(&[("CORS_ALLOWED_ORIGINS", " , ")]).unwrap_err();
        assert!(err.to_string().contains("CORS_ALLOWED_ORIGINS"));
    }

    #[test]
    fn garbage_flag_is_an_error() {
        let err = load(&[("SESSION_COOKIE_SECURE", "maybe")]).unwrap_err();
        assert!(err.to_string().contains("SESSION_COOKIE_SECURE"));
    }
}
