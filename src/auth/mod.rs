//! Device credentials
//!
//! The broker authenticates the device with a short-lived signed token in
//! place of a static password. A fresh token is minted for every connection
//! attempt; nothing here caches a previous signature.

use crate::protocol::Identity;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod jwt;

pub use jwt::Es256Signer;

/// Token lifetime: 24 hours
pub const TOKEN_LIFETIME_SECS: u64 = 24 * 60 * 60;

/// Credential layer errors
#[derive(Debug, Error, PartialEq)]
pub enum SigningError {
    #[error("Signing key unavailable: {0}")]
    SigningUnavailable(String),
    #[error("Invalid token claims: {0}")]
    ClaimsInvalid(String),
}

/// Claim set carried by every device token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Audience: the cloud project id
    pub aud: String,
    /// Issued-at, epoch seconds
    pub iat: u64,
    /// Expiry, epoch seconds
    pub exp: u64,
}

impl Claims {
    /// Build the claim set for `identity` issued at `issued_at`
    pub fn for_identity(identity: &Identity, issued_at: u64) -> Result<Self, SigningError> {
        identity
            .validate()
            .map_err(|e| SigningError::ClaimsInvalid(e.to_string()))?;

        let exp = issued_at.checked_add(TOKEN_LIFETIME_SECS).ok_or_else(|| {
            SigningError::ClaimsInvalid(format!("issued-at {issued_at} overflows expiry"))
        })?;

        Ok(Self {
            aud: identity.project_id.clone(),
            iat: issued_at,
            exp,
        })
    }
}

/// Signed credential presented as the connection password
#[derive(Clone, PartialEq, Eq)]
pub struct Token {
    value: String,
    issued_at: u64,
    expires_at: u64,
}

impl Token {
    pub fn new(value: String, issued_at: u64, expires_at: u64) -> Self {
        Self {
            value,
            issued_at,
            expires_at,
        }
    }

    /// The encoded token
    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn issued_at(&self) -> u64 {
        self.issued_at
    }

    pub fn expires_at(&self) -> u64 {
        self.expires_at
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("value", &"***")
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Produces signed device tokens
pub trait CredentialSigner: Send + Sync {
    /// Mint a new token for `identity` issued at `issued_at` (epoch seconds)
    fn sign(&self, issued_at: u64, identity: &Identity) -> Result<Token, SigningError>;
}

impl<S: CredentialSigner + ?Sized> CredentialSigner for Box<S> {
    fn sign(&self, issued_at: u64, identity: &Identity) -> Result<Token, SigningError> {
        (**self).sign(issued_at, identity)
    }
}
