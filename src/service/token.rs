//! Token service for authentication.
//!
//! Two kinds of credential are accepted on resource routes:
//! - The static API token from configuration, if one is set.
//! - Access tokens issued by the token endpoint to a configured user.
//!
//! A user exchanges username and password for an access/refresh pair; the
//! refresh token can later be exchanged for a new access token. Tokens are
//! 64 characters of URL-safe base64 and live in memory only.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use rand::Rng;

use crate::config::AuthConfig;
use crate::error::{AppError, Result};

/// Token length in bytes (48 bytes = 64 base64 chars).
const TOKEN_BYTES: usize = 48;

/// What a stored token may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Authenticates API calls.
    Access,
    /// Only mints new access tokens.
    Refresh,
}

/// The authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Principal {
    /// Caller presented the static API token.
    ApiToken,
    /// Caller presented an access token issued to this user.
    User(String),
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ApiToken => write!(f, "api-token"),
            Self::User(username) => write!(f, "{username}"),
        }
    }
}

/// Token metadata.
#[derive(Debug, Clone)]
pub struct TokenInfo {
    /// The token string (64 characters).
    pub token: String,
    /// User the token was issued to.
    pub username: String,
    pub kind: TokenKind,
    pub expires_at: DateTime<Utc>,
}

impl TokenInfo {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// Issued tokens, indexed by token string.
struct TokenStore {
    tokens: RwLock<HashMap<String, TokenInfo>>,
}

impl TokenStore {
    fn new() -> Self {
        Self {
            tokens: RwLock::new(HashMap::new()),
        }
    }

    fn insert(&self, info: TokenInfo) {
        self.tokens.write().insert(info.token.clone(), info);
    }

    /// Look up a live token of the given kind.
    fn get(&self, token: &str, kind: TokenKind) -> Option<TokenInfo> {
        let tokens = self.tokens.read();
        tokens
            .get(token)
            .filter(|info| info.kind == kind && !info.is_expired())
            .cloned()
    }

    fn cleanup_expired(&self) {
        self.tokens.write().retain(|_, info| !info.is_expired());
    }

    fn len(&self) -> usize {
        self.tokens.read().len()
    }
}

/// Token service for authentication.
pub struct TokenService {
    /// Static token; empty means disabled.
    api_token: String,
    /// Username to bcrypt hash.
    users: HashMap<String, String>,
    access_ttl: Duration,
    refresh_ttl: Duration,
    store: TokenStore,
}

impl TokenService {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            api_token: config.api_token.clone(),
            users: config
                .users
                .iter()
                .map(|user| (user.username.clone(), user.password_hash.clone()))
                .collect(),
            access_ttl: Duration::from_secs(config.access_token_ttl),
            refresh_ttl: Duration::from_secs(config.refresh_token_ttl),
            store: TokenStore::new(),
        }
    }

    /// Resolve a bearer token to the caller it identifies.
    ///
    /// Returns `None` for unknown, expired, or refresh tokens.
    pub fn authenticate(&self, token: &str) -> Option<Principal> {
        if !self.api_token.is_empty() && token == self.api_token {
            return Some(Principal::ApiToken);
        }

        self.store
            .get(token, TokenKind::Access)
            .map(|info| Principal::User(info.username))
    }

    /// Exchange username and password for an access/refresh pair.
    ///
    /// Runs a bcrypt verification, so call it off the async executor.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentials` if the user is unknown or the password is wrong.
    pub fn obtain_pair(&self, username: &str, password: &str) -> Result<(TokenInfo, TokenInfo)> {
        let verified = self
            .users
            .get(username)
            .is_some_and(|hash| bcrypt::verify(password, hash).unwrap_or(false));

        if !verified {
            return Err(AppError::InvalidCredentials(
                "No active account found with the given credentials".to_string(),
            ));
        }

        self.store.cleanup_expired();
        let access = self.issue(username, TokenKind::Access);
        let refresh = self.issue(username, TokenKind::Refresh);
        tracing::info!(username, "Token pair issued");
        Ok((access, refresh))
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentials` if the refresh token is unknown or expired.
    pub fn refresh(&self, refresh_token: &str) -> Result<TokenInfo> {
        let info = self
            .store
            .get(refresh_token, TokenKind::Refresh)
            .ok_or_else(|| {
                AppError::InvalidCredentials("Token is invalid or expired".to_string())
            })?;

        self.store.cleanup_expired();
        Ok(self.issue(&info.username, TokenKind::Access))
    }

    /// Number of tokens currently held, expired ones included until cleanup.
    #[must_use]
    pub fn issued_count(&self) -> usize {
        self.store.len()
    }

    fn issue(&self, username: &str, kind: TokenKind) -> TokenInfo {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let info = TokenInfo {
            token: generate_token(),
            username: username.to_string(),
            kind,
            expires_at: Utc::now() + chrono::Duration::from_std(ttl).unwrap_or_default(),
        };

        self.store.insert(info.clone());
        info
    }
}

/// Generate a random 64-character URL-safe base64 token string.
fn generate_token() -> String {
    let mut rng = rand::rng();
    let mut bytes = [0u8; TOKEN_BYTES];
    rng.fill(&mut bytes);

    URL_SAFE_NO_PAD.encode(bytes)
}
