//! API key lookup: environment, then the app-dir credentials file, then a prompt.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::cli::ServiceName;

pub const CREDENTIALS_FILE_NAME: &str = "credentials.json";

/// `DOTCHAT_<SERVICE>_API_KEY`, then the service's conventional variable.
pub fn env_api_key(
    service: ServiceName,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    let scoped = format!("DOTCHAT_{}_API_KEY", service.as_str().to_ascii_uppercase());
    let conventional: &[&str] = match service {
        ServiceName::OpenAi => &["OPENAI_API_KEY"],
        ServiceName::Anthropic => &["ANTHROPIC_API_KEY"],
        ServiceName::Google => &["GOOGLE_API_KEY", "GEMINI_API_KEY"],
        ServiceName::Mock => &[],
    };

    std::iter::once(scoped.as_str())
        .chain(conventional.iter().copied())
        .filter_map(|key| lookup(key))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

/// JSON object of service id to API key, readable only by the owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn in_app_dir(app_dir: &Path) -> Self {
        Self::new(app_dir.join(CREDENTIALS_FILE_NAME))
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self, service: ServiceName) -> Result<Option<String>> {
        Ok(self
            .read_all()?
            .remove(service.as_str())
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty()))
    }

    pub fn save(&self, service: ServiceName, api_key: &str) -> Result<()> {
        let mut keys = self.read_all()?;
        keys.insert(service.as_str().to_string(), api_key.trim().to_string());

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating credentials directory {}", parent.display()))?;
        }
        let body = serde_json::to_string_pretty(&keys).context("serializing credentials")?;
        fs::write(&self.path, body)
            .with_context(|| format!("writing credentials file {}", self.path.display()))?;
        restrict_permissions(&self.path)
    }

    fn read_all(&self) -> Result<BTreeMap<String, String>> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(error) if error.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(error) => {
                return Err(error)
                    .with_context(|| format!("reading credentials file {}", self.path.display()))
            }
        };
        serde_json::from_str(&text)
            .with_context(|| format!("invalid credentials file {}", self.path.display()))
    }
}

#[cfg(unix)]
fn restrict_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .with_context(|| format!("restricting permissions of {}", path.display()))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path) -> Result<()> {
    Ok(())
}

/// Resolves the key for `service`; `prompt` is only offered when stdin is a terminal.
///
/// A prompted key is saved to `store` for later runs.
pub fn resolve_api_key(
    service: ServiceName,
    lookup: impl Fn(&str) -> Option<String>,
    store: &CredentialStore,
    prompt: Option<&mut dyn FnMut(&str) -> Result<String>>,
) -> Result<String> {
    if let Some(key) = env_api_key(service, lookup) {
        tracing::debug!(service = service.as_str(), "using API key from environment");
        return Ok(key);
    }
    if let Some(key) = store.load(service)? {
        tracing::debug!(service = service.as_str(), "using stored API key");
        return Ok(key);
    }

    let Some(prompt) = prompt else {
        bail!(
            "no {} API key: set DOTCHAT_{}_API_KEY or run interactively to store one",
            service.display_name(),
            service.as_str().to_ascii_uppercase()
        );
    };
    let key = prompt(&format!("Enter your {} API key: ", service.display_name()))?;
    let key = key.trim().to_string();
    if key.is_empty() {
        bail!("no {} API key entered", service.display_name());
    }
    store.save(service, &key)?;
    Ok(key)
}
