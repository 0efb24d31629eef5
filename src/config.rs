use std::fmt;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use tracing::{debug, info};
use url::Url;

/// Environment variable holding Perkeep credentials as `userpass:<user>:<password>`.
pub const AUTH_ENV: &str = "CAMLI_AUTH";

/// Everything one publishing run needs.
#[derive(Debug, Clone)]
pub struct PublishConfig {
    pub archive_root: PathBuf,
    /// Actor whose outbox is published; auto-detected when `None`.
    pub actor: Option<String>,
    pub store: StoreConfig,
}

impl PublishConfig {
    pub fn trace_loaded(&self) {
        info!(
            archive_root = %self.archive_root.display(),
            actor = self.actor.as_deref().unwrap_or("<auto>"),
            server = %self.store.server,
            authenticated = self.store.credentials.is_some(),
            "Loaded PublishConfig"
        );
        debug!(?self, "PublishConfig loaded (full debug)");
    }
}

/// Where the Perkeep server lives and how to authenticate to it.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub server: Url,
    pub credentials: Option<Credentials>,
}

impl StoreConfig {
    /// Parses the server address (`http://` is assumed when no scheme is
    /// given) and reads credentials from [`AUTH_ENV`].
    pub fn from_env(address: &str) -> Result<Self> {
        let auth = std::env::var(AUTH_ENV).ok();
        Self::new(address, auth.as_deref())
    }

    pub fn new(address: &str, auth: Option<&str>) -> Result<Self> {
        let address = address.trim();
        if address.is_empty() {
            bail!("Perkeep server address is empty");
        }
        let with_scheme = if address.contains("://") {
            address.to_string()
        } else {
            format!("http://{address}")
        };
        let server = Url::parse(&with_scheme)
            .with_context(|| format!("Invalid Perkeep server address {address:?}"))?;

        let credentials = match auth.map(str::trim) {
            None | Some("") | Some("localhost") => None,
            Some(raw) => Some(Credentials::parse(raw)?),
        };

        Ok(Self {
            server,
            credentials,
        })
    }
}

/// HTTP basic-auth credentials for the server.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    /// Parses Perkeep's `userpass:<user>:<password>` form.
    pub fn parse(raw: &str) -> Result<Self> {
        let Some(rest) = raw.strip_prefix("userpass:") else {
            bail!("Unsupported {AUTH_ENV} mode, expected userpass:<user>:<password>");
        };
        let Some((user, password)) = rest.split_once(':') else {
            bail!("{AUTH_ENV} is missing the password part");
        };
        if user.is_empty() {
            bail!("{AUTH_ENV} has an empty user name");
        }
        Ok(Self {
            user: user.to_string(),
            password: password.to_string(),
        })
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}
