use anyhow::Context;
use serde::Deserialize;
use std::{
    env, fs,
    path::{Path, PathBuf},
};

use crate::auth::DevAccount;

pub const CONFIG_ENV_VAR: &str = "COMMUNITY_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "community.json";
pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_UPLOADS_DIR: &str = "uploads";

/// Contents of `community.json`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileConfig {
    #[serde(default)]
    pub jwt_secret: Option<String>,
    #[serde(default)]
    pub bind: Option<String>,
    #[serde(default)]
    pub uploads_dir: Option<String>,
    #[serde(default)]
    pub dev_accounts: Vec<DevAccount>,
}

/// Values given on the command line or through env-backed CLI flags.
/// These win over the config file.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub jwt_secret: Option<String>,
    pub bind: Option<String>,
    pub uploads_dir: Option<PathBuf>,
}

/// Fully resolved server settings.
#[derive(Clone)]
pub struct ServerConfig {
    /// Base64 signing key material
    pub jwt_secret: String,
    pub bind: String,
    pub uploads_dir: PathBuf,
    pub dev_accounts: Vec<DevAccount>,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("jwt_secret", &"<redacted>")
            .field("bind", &self.bind)
            .field("uploads_dir", &self.uploads_dir)
            .field("dev_accounts", &self.dev_accounts.len())
            .finish()
    }
}

/// Find the config file: explicit path, then `COMMUNITY_CONFIG`, then
/// `./community.json` if it exists. A missing file is not an error.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p.to_path_buf());
    }

    if let Ok(p) = env::var(CONFIG_ENV_VAR) {
        return Some(PathBuf::from(p));
    }

    let candidate = PathBuf::from(DEFAULT_CONFIG_FILE);
    if candidate.exists() {
        return Some(candidate);
    }

    None
}

fn env_lookup(name: &str) -> Option<String> {
    env::var(name).ok()
}

fn expand_vars(input: &str, lookup: &impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next(); // consume '{'
            let mut name = String::new();
            for c in chars.by_ref() {
                if c == '}' {
                    break;
                }
                name.push(c);
            }
            match lookup(&name) {
                Some(val) => out.push_str(&val),
                None => {
                    out.push_str("${");
                    out.push_str(&name);
                    out.push('}');
                }
            }
        } else {
            out.push(ch);
        }
    }

    out
}

fn expand_file_config(cfg: FileConfig, lookup: &impl Fn(&str) -> Option<String>) -> FileConfig {
    let mut cfg = cfg;

    if let Some(secret) = cfg.jwt_secret.as_mut() {
        *secret = expand_vars(secret, lookup);
    }
    if let Some(bind) = cfg.bind.as_mut() {
        *bind = expand_vars(bind, lookup);
    }
    if let Some(dir) = cfg.uploads_dir.as_mut() {
        *dir = expand_vars(dir, lookup);
    }

    cfg
}

pub fn parse_file_config(
    raw: &str,
    lookup: &impl Fn(&str) -> Option<String>,
) -> anyhow::Result<FileConfig> {
    let cfg: FileConfig = serde_json::from_str(raw)?;
    Ok(expand_file_config(cfg, lookup))
}

pub fn load_file_config(path: &Path) -> anyhow::Result<FileConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Could not read config file {}", path.display()))?;
    parse_file_config(&raw, &env_lookup)
        .with_context(|| format!("Invalid config file {}", path.display()))
}

/// Merge overrides over the file config and apply defaults.
///
/// The signing secret has no default; without one the server must not start.
pub fn resolve(file: FileConfig, overrides: Overrides) -> anyhow::Result<ServerConfig> {
    let jwt_secret = overrides
        .jwt_secret
        .or(file.jwt_secret)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| {
            anyhow::anyhow!("No JWT secret configured (set JWT_SECRET, --jwt-secret or jwtSecret)")
        })?;

    Ok(ServerConfig {
        jwt_secret,
        bind: overrides
            .bind
            .or(file.bind)
            .unwrap_or_else(|| DEFAULT_BIND.to_string()),
        uploads_dir: overrides
            .uploads_dir
            .or(file.uploads_dir.map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOADS_DIR)),
        dev_accounts: file.dev_accounts,
    })
}

pub fn load_server_config(
    config_path: Option<&Path>,
    overrides: Overrides,
) -> anyhow::Result<ServerConfig> {
    let file = match resolve_config_path(config_path) {
        Some(path) => {
            tracing::info!("Loading config from {}", path.display());
            load_file_config(&path)?
        }
        None => FileConfig::default(),
    };

    resolve(file, overrides)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn lookup(name: &str) -> Option<String> {
        match name {
            "SECRET" => Some("c2VjcmV0".to_string()),
            "PORT" => Some("9090".to_string()),
            _ => None,
        }
    }

    #[test]
    fn test_expand_vars() {
        assert_eq!(expand_vars("${SECRET}", &lookup), "c2VjcmV0");
        assert_eq!(expand_vars("0.0.0.0:${PORT}", &lookup), "0.0.0.0:9090");
        assert_eq!(expand_vars("${MISSING}", &lookup), "${MISSING}");
        assert_eq!(expand_vars("$PORT", &lookup), "$PORT");
        assert_eq!(expand_vars("plain", &lookup), "plain");
    }

    #[test]
    fn test_parse_file_config() {
        let raw = r#"{
            "jwtSecret": "${SECRET}",
            "bind": "127.0.0.1:${PORT}",
            "uploadsDir": "/srv/uploads",
            "devAccounts": [
                { "email": "a@example.com", "passwordSha256": "ff", "userId": 1 }
            ]
        }"#;

        let cfg = parse_file_config(raw, &lookup).unwrap();
        assert_eq!(cfg.jwt_secret.as_deref(), Some("c2VjcmV0"));
        assert_eq!(cfg.bind.as_deref(), Some("127.0.0.1:9090"));
        assert_eq!(cfg.uploads_dir.as_deref(), Some("/srv/uploads"));
        assert_eq!(cfg.dev_accounts.len(), 1);
    }

    #[test]
    fn test_empty_file_config() {
        let cfg = parse_file_config("{}", &lookup).unwrap();
        assert!(cfg.jwt_secret.is_none());
        assert!(cfg.dev_accounts.is_empty());
    }

    #[test]
    fn test_resolve_defaults() {
        let file = FileConfig {
            jwt_secret: Some("abc".to_string()),
            ..Default::default()
        };
        let cfg = resolve(file, Overrides::default()).unwrap();
        assert_eq!(cfg.jwt_secret, "abc");
        assert_eq!(cfg.bind, DEFAULT_BIND);
        assert_eq!(cfg.uploads_dir, PathBuf::from(DEFAULT_UPLOADS_DIR));
    }

    #[test]
    fn test_overrides_win() {
        let file = FileConfig {
            jwt_secret: Some("from-file".to_string()),
            bind: Some("127.0.0.1:1".to_string()),
            ..Default::default()
        };
        let overrides = Overrides {
            jwt_secret: Some("from-cli".to_string()),
            bind: None,
            uploads_dir: Some(PathBuf::from("/tmp/up")),
        };
        let cfg = resolve(file, overrides).unwrap();
        assert_eq!(cfg.jwt_secret, "from-cli");
        assert_eq!(cfg.bind, "127.0.0.1:1");
        assert_eq!(cfg.uploads_dir, PathBuf::from("/tmp/up"));
    }

    #[test]
    fn test_missing_secret_is_fatal() {
        let err = resolve(FileConfig::default(), Overrides::default()).unwrap_err();
        assert!(err.to_string().contains("No JWT secret"));

        let blank = Overrides {
            jwt_secret: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(resolve(FileConfig::default(), blank).is_err());
    }

    #[test]
    fn test_load_file_config_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "jwtSecret": "abc", "bind": "127.0.0.1:3000" }}"#).unwrap();

        let cfg = load_server_config(Some(file.path()), Overrides::default()).unwrap();
        assert_eq!(cfg.jwt_secret, "abc");
        assert_eq!(cfg.bind, "127.0.0.1:3000");
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert!(load_server_config(Some(&path), Overrides::default()).is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let cfg = resolve(
            FileConfig {
                jwt_secret: Some("super-secret".to_string()),
                ..Default::default()
            },
            Overrides::default(),
        )
        .unwrap();
        assert!(!format!("{:?}", cfg).contains("super-secret"));
    }
}
