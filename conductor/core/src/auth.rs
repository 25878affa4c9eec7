//! Sign-in Tokens and Deep-Link Callbacks
//!
//! The chat service accepts an optional bearer token. Where it comes from
//! is abstracted behind [`TokenProvider`]; the default desktop store keeps
//! it in a file under the user config directory.
//!
//! # Security Model
//!
//! - Token file has 0o600 permissions (owner read/write only)
//! - Its directory is created with 0o700 permissions
//! - Tokens never appear in `Debug` output
//!
//! # Sign-in callback
//!
//! The identity provider redirects to `<scheme>://auth/callback` with the
//! session tokens either in the query string or in the URL fragment.
//! [`AuthCallback::parse`] turns that URL into [`SessionTokens`].

use std::collections::HashMap;
use std::fmt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Token file name within the config directory
pub const TOKEN_FILENAME: &str = "token.json";

/// Config directory name
pub const CONFIG_DIR_NAME: &str = "cecy";

/// Email domain of institutional accounts
pub const INSTITUTIONAL_DOMAIN: &str = "@cecytem.edu.mx";

/// Errors related to tokens and sign-in callbacks
#[derive(Debug, Error)]
pub enum AuthError {
    /// Token file could not be read or written
    #[error("token storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// Token file is not valid JSON
    #[error("invalid token file: {0}")]
    InvalidFormat(#[from] serde_json::Error),

    /// No config directory on this platform
    #[error("config directory not available")]
    NoConfigDir,

    /// Callback URL could not be parsed
    #[error("invalid callback url: {0}")]
    InvalidUrl(String),

    /// URL is not an auth callback
    #[error("not an auth callback: {0}")]
    NotACallback(String),

    /// The identity provider reported an error
    #[error("sign-in failed: {0}")]
    Provider(String),
}

/// Source of the bearer token
pub trait TokenProvider: Send + Sync {
    /// Current token, if signed in
    fn token(&self) -> Option<String>;
}

/// Anonymous use
#[derive(Clone, Copy, Debug, Default)]
pub struct NoToken;

impl TokenProvider for NoToken {
    fn token(&self) -> Option<String> {
        None
    }
}

/// A fixed token
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    /// Wrap `token`
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticToken([REDACTED])")
    }
}

impl TokenProvider for StaticToken {
    fn token(&self) -> Option<String> {
        Some(self.0.clone())
    }
}

/// Tokens of a signed-in session
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTokens {
    /// Bearer token sent to the services
    pub access_token: String,
    /// Token used to renew the session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokens")
            .field("access_token", &"[REDACTED]")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .finish()
    }
}

/// File-backed token store
///
/// The access token is cached after the first read and kept current by
/// [`save`](Self::save) and [`clear`](Self::clear); clones share the cache.
#[derive(Clone)]
pub struct TokenStore {
    path: PathBuf,
    // Outer `None`: file not read yet
    cached: Arc<Mutex<Option<Option<String>>>>,
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStore")
            .field("path", &self.path)
            .field("loaded", &self.cached.lock().is_some())
            .finish()
    }
}

impl TokenStore {
    /// Store at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: Arc::new(Mutex::new(None)),
        }
    }

    fn remember(&self, token: Option<String>) {
        *self.cached.lock() = Some(token);
    }

    /// `<config dir>/cecy/token.json`
    pub fn default_path() -> Result<PathBuf, AuthError> {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME).join(TOKEN_FILENAME))
            .ok_or(AuthError::NoConfigDir)
    }

    /// Store at the default location
    pub fn open_default() -> Result<Self, AuthError> {
        Ok(Self::new(Self::default_path()?))
    }

    /// File path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist `tokens` with owner-only permissions
    pub fn save(&self, tokens: &SessionTokens) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent)?;
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    fs::set_permissions(parent, fs::Permissions::from_mode(0o700))?;
                }
            }
        }

        let mut file = File::create(&self.path)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(fs::Permissions::from_mode(0o600))?;
        }

        file.write_all(&serde_json::to_vec(tokens)?)?;
        file.sync_all()?;
        self.remember(Some(tokens.access_token.clone()));

        tracing::debug!(path = %self.path.display(), "Session tokens saved");
        Ok(())
    }

    /// Load saved tokens; `None` when signed out
    pub fn load(&self) -> Result<Option<SessionTokens>, AuthError> {
        let tokens: Option<SessionTokens> = match fs::read(&self.path) {
            Ok(bytes) => Some(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        self.remember(tokens.as_ref().map(|t| t.access_token.clone()));
        Ok(tokens)
    }

    /// Sign out
    pub fn clear(&self) -> Result<(), AuthError> {
        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        self.remember(None);
        Ok(())
    }
}

impl TokenProvider for TokenStore {
    fn token(&self) -> Option<String> {
        if let Some(ref token) = *self.cached.lock() {
            return token.clone();
        }
        match self.load() {
            Ok(tokens) => tokens.map(|t| t.access_token),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Ignoring unreadable token file");
                None
            }
        }
    }
}

/// Sign-in deep-link callback
#[derive(Debug)]
pub struct AuthCallback;

impl AuthCallback {
    /// Parse a callback URL.
    ///
    /// Returns `Ok(None)` for a callback that carries no access token.
    pub fn parse(raw: &str) -> Result<Option<SessionTokens>, AuthError> {
        let url = Url::parse(raw).map_err(|e| AuthError::InvalidUrl(e.to_string()))?;

        let is_callback = url.host_str() == Some("auth")
            && url.path().trim_matches('/') == "callback";
        if !is_callback {
            return Err(AuthError::NotACallback(raw.to_string()));
        }

        let mut params: HashMap<String, String> = url.query_pairs().into_owned().collect();
        if let Some(fragment) = url.fragment() {
            params.extend(url::form_urlencoded::parse(fragment.as_bytes()).into_owned());
        }

        if let Some(code) = params.get("error_code") {
            let detail = params
                .get("error_description")
                .map_or_else(|| code.clone(), |d| format!("{code}: {d}"));
            return Err(AuthError::Provider(detail));
        }

        let Some(access_token) = params.remove("access_token").filter(|t| !t.is_empty()) else {
            return Ok(None);
        };

        Ok(Some(SessionTokens {
            access_token,
            refresh_token: params.remove("refresh_token").filter(|t| !t.is_empty()),
        }))
    }
}

/// Whether `email` belongs to the institution
#[must_use]
pub fn is_institutional_email(email: &str) -> bool {
    email.trim().to_lowercase().ends_with(INSTITUTIONAL_DOMAIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens() -> SessionTokens {
        SessionTokens {
            access_token: "jwt-abc".to_string(),
            refresh_token: Some("refresh-xyz".to_string()),
        }
    }

    #[test]
    fn test_store_round_trip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("nested").join(TOKEN_FILENAME));

        assert_eq!(store.load().unwrap(), None);
        assert_eq!(store.token(), None);

        store.save(&tokens()).unwrap();
        assert_eq!(store.load().unwrap(), Some(tokens()));
        assert_eq!(store.token().as_deref(), Some("jwt-abc"));

        store.clear().unwrap();
        store.clear().unwrap();
        assert_eq!(store.token(), None);
    }

    #[test]
    fn test_token_is_read_from_disk_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(TOKEN_FILENAME);
        fs::write(&path, serde_json::to_vec(&tokens()).unwrap()).unwrap();

        let store = TokenStore::new(&path);
        let provider = store.clone();
        assert_eq!(provider.token().as_deref(), Some("jwt-abc"));

        // Served from the cache once loaded
        fs::remove_file(&path).unwrap();
        assert_eq!(provider.token().as_deref(), Some("jwt-abc"));

        // Writes through any clone update the shared cache
        store.clear().unwrap();
        assert_eq!(provider.token(), None);
        let fresh = SessionTokens {
            access_token: "jwt-new".to_string(),
            refresh_token: None,
        };
        store.save(&fresh).unwrap();
        assert_eq!(provider.token().as_deref(), Some("jwt-new"));
    }

    #[cfg(unix)]
    #[test]
    fn test_store_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join(TOKEN_FILENAME));
        store.save(&tokens()).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_corrupt_token_file_reads_as_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(TOKEN_FILENAME);
        fs::write(&path, "not json").unwrap();

        let store = TokenStore::new(path);
        assert!(matches!(store.load(), Err(AuthError::InvalidFormat(_))));
        assert_eq!(store.token(), None);
    }

    #[test]
    fn test_callback_with_fragment_tokens() {
        let parsed =
            AuthCallback::parse("cecy://auth/callback#access_token=jwt-abc&refresh_token=refresh-xyz")
                .unwrap();
        assert_eq!(parsed, Some(tokens()));
    }

    #[test]
    fn test_callback_with_query_tokens() {
        let parsed = AuthCallback::parse("cecy://auth/callback?access_token=jwt-abc").unwrap();
        assert_eq!(parsed.unwrap().refresh_token, None);
    }

    #[test]
    fn test_callback_without_token() {
        assert_eq!(AuthCallback::parse("cecy://auth/callback").unwrap(), None);
    }

    #[test]
    fn test_callback_error_code() {
        let err = AuthCallback::parse("cecy://auth/callback?error_code=access_denied").unwrap_err();
        assert!(matches!(err, AuthError::Provider(code) if code == "access_denied"));
    }

    #[test]
    fn test_non_callback_urls() {
        assert!(matches!(
            AuthCallback::parse("cecy://resources"),
            Err(AuthError::NotACallback(_))
        ));
        assert!(matches!(AuthCallback::parse("not a url"), Err(AuthError::InvalidUrl(_))));
    }

    #[test]
    fn test_debug_redacts() {
        let rendered = format!("{:?} {:?}", tokens(), StaticToken::new("jwt-abc"));
        assert!(!rendered.contains("jwt-abc"));
    }

    #[test]
    fn test_institutional_email() {
        assert!(is_institutional_email("alumno@cecytem.edu.mx"));
        assert!(is_institutional_email("Alumno@CECYTEM.edu.mx"));
        assert!(!is_institutional_email("alumno@gmail.com"));
        assert!(!is_institutional_email("cecytem.edu.mx@gmail.com"));
    }
}
