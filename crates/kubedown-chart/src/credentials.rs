//! Registry credentials from docker or podman auth files
//!
//! kubedown never stores credentials of its own. Whatever the local container
//! engine is logged into is reused for pulling charts.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{ChartError, Result};

/// Container engine whose login state is reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContainerEngine {
    #[default]
    Docker,
    Podman,
}

impl ContainerEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Docker => "docker",
            Self::Podman => "podman",
        }
    }

    /// Auth files to try, most specific first
    pub fn auth_file_candidates(&self) -> Result<Vec<PathBuf>> {
        let home = dirs::home_dir().ok_or(ChartError::NoHomeDir)?;
        let candidates = match self {
            Self::Docker => vec![home.join(".docker").join("config.json")],
            Self::Podman => {
                let mut paths = Vec::new();
                if let Some(runtime) = dirs::runtime_dir() {
                    paths.push(runtime.join("containers").join("auth.json"));
                }
                // dirs::config_dir honours XDG_CONFIG_HOME
                if let Some(config) = dirs::config_dir() {
                    paths.push(config.join("containers").join("auth.json"));
                }
                let fallback = home.join(".config").join("containers").join("auth.json");
                if !paths.contains(&fallback) {
                    paths.push(fallback);
                }
                paths
            }
        };
        Ok(candidates)
    }
}

impl fmt::Display for ContainerEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContainerEngine {
    type Err = ChartError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "docker" => Ok(Self::Docker),
            "podman" => Ok(Self::Podman),
            _ => Err(ChartError::UnsupportedEngine(s.to_string())),
        }
    }
}

/// `config.json` / `auth.json` format shared by docker and podman
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthFile {
    #[serde(default)]
    pub auths: BTreeMap<String, AuthEntry>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuthEntry {
    #[serde(default)]
    pub auth: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Username and password for one registry
#[derive(Clone, PartialEq, Eq)]
pub struct RegistryCredentials {
    pub registry: String,
    pub username: String,
    pub password: String,
}

impl fmt::Debug for RegistryCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryCredentials")
            .field("registry", &self.registry)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl AuthEntry {
    /// Decode into credentials. `auth` (base64 `user:pass`) wins over the
    /// explicit `username`/`password` pair.
    pub fn decode(&self, registry: &str) -> Result<RegistryCredentials> {
        let invalid = |message: &str| ChartError::InvalidAuth {
            registry: registry.to_string(),
            message: message.to_string(),
        };

        let (username, password) = match (&self.auth, &self.username, &self.password) {
            (Some(auth), _, _) if !auth.is_empty() => {
                let decoded = STANDARD
                    .decode(auth.trim())
                    .map_err(|e| invalid(&format!("failed to decode auth string: {}", e)))?;
                let decoded = String::from_utf8(decoded)
                    .map_err(|_| invalid("auth string is not UTF-8"))?;
                let (user, pass) = decoded
                    .split_once(':')
                    .ok_or_else(|| invalid("invalid auth format"))?;
                (user.to_string(), pass.to_string())
            }
            (_, Some(user), Some(pass)) if !user.is_empty() && !pass.is_empty() => {
                (user.clone(), pass.clone())
            }
            _ => return Err(invalid("no usable authentication found")),
        };

        Ok(RegistryCredentials {
            registry: registry_host(registry),
            username,
            password,
        })
    }
}

impl AuthFile {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|source| ChartError::AuthFile {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load the first auth file that exists for `engine`.
    ///
    /// Returns `None` when the engine has never logged in anywhere.
    pub fn load(engine: ContainerEngine) -> Result<Option<(PathBuf, Self)>> {
        for path in engine.auth_file_candidates()? {
            if path.exists() {
                tracing::debug!(path = %path.display(), engine = %engine, "reading auth file");
                let file = Self::load_from(&path)?;
                return Ok(Some((path, file)));
            }
        }
        Ok(None)
    }

    /// Credentials for `registry`, matched on host regardless of scheme or
    /// path in either the request or the stored key.
    pub fn credentials_for(&self, registry: &str) -> Option<Result<RegistryCredentials>> {
        let wanted = registry_host(registry);
        self.auths
            .iter()
            .find(|(key, _)| registry_host(key) == wanted)
            .map(|(key, entry)| entry.decode(key))
    }

    /// Every entry, decoded or with the reason it is unusable
    pub fn all(&self) -> Vec<(String, Result<RegistryCredentials>)> {
        self.auths
            .iter()
            .map(|(key, entry)| (registry_host(key), entry.decode(key)))
            .collect()
    }
}

/// Reduce a registry URL, auth-file key or chart reference to its host.
///
/// `https://index.docker.io/v1/` → `index.docker.io`,
/// `oci://ghcr.io/org/chart:1.0` → `ghcr.io`.
pub fn registry_host(reference: &str) -> String {
    let without_scheme = reference
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(reference);
    without_scheme
        .split('/')
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn auth_file(json: &str) -> AuthFile {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_registry_host() {
        assert_eq!(registry_host("ghcr.io"), "ghcr.io");
        assert_eq!(registry_host("https://index.docker.io/v1/"), "index.docker.io");
        assert_eq!(registry_host("oci://ghcr.io/org/chart:1.0"), "ghcr.io");
        assert_eq!(registry_host("registry.local:5000/team"), "registry.local:5000");
    }

    #[test]
    fn test_decode_auth_string() {
        // "user:pa:ss"
        let file = auth_file(r#"{"auths": {"ghcr.io": {"auth": "dXNlcjpwYTpzcw=="}}}"#);
        let creds = file.credentials_for("oci://ghcr.io/org/chart").unwrap().unwrap();
        assert_eq!(creds.username, "user");
        assert_eq!(creds.password, "pa:ss");
        assert_eq!(creds.registry, "ghcr.io");
    }

    #[test]
    fn test_decode_username_password() {
        let file = auth_file(
            r#"{"auths": {"https://registry.example.com/v2/": {
                "username": "bot", "password": "s3cret"}}}"#,
        );
        let creds = file.credentials_for("registry.example.com").unwrap().unwrap();
        assert_eq!(creds.username, "bot");
        assert_eq!(creds.password, "s3cret");
    }

    #[test]
    fn test_unusable_entries() {
        let file = auth_file(
            r#"{"auths": {
                "empty.io": {},
                "nocolon.io": {"auth": "dXNlcg=="},
                "garbage.io": {"auth": "%%%"}
            }}"#,
        );
        for (_, result) in file.all() {
            assert!(matches!(result, Err(ChartError::InvalidAuth { .. })));
        }
        assert!(file.credentials_for("unknown.io").is_none());
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = RegistryCredentials {
            registry: "ghcr.io".to_string(),
            username: "user".to_string(),
            password: "hunter2".to_string(),
        };
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("auth.json");
        std::fs::write(
            &path,
            r#"{"auths": {"quay.io": {"auth": "YTpi"}}, "credsStore": "desktop"}"#,
        )
        .unwrap();

        let file = AuthFile::load_from(&path).unwrap();
        let creds = file.credentials_for("quay.io").unwrap().unwrap();
        assert_eq!((creds.username.as_str(), creds.password.as_str()), ("a", "b"));

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(AuthFile::load_from(&path), Err(ChartError::AuthFile { .. })));
    }

    #[test]
    fn test_engine_from_str() {
        assert_eq!("docker".parse::<ContainerEngine>().unwrap(), ContainerEngine::Docker);
        assert_eq!("Podman".parse::<ContainerEngine>().unwrap(), ContainerEngine::Podman);
        assert!(matches!(
            "containerd".parse::<ContainerEngine>(),
            Err(ChartError::UnsupportedEngine(_))
        ));
    }

    #[test]
    fn test_auth_file_candidates() {
        let docker = ContainerEngine::Docker.auth_file_candidates().unwrap();
        assert_eq!(docker.len(), 1);
        assert!(docker[0].ends_with(".docker/config.json"));

        let podman = ContainerEngine::Podman.auth_file_candidates().unwrap();
        assert!(!podman.is_empty());
        assert!(podman.iter().all(|p| p.ends_with("containers/auth.json")));
    }
}
