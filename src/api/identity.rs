//! Inbound caller identity.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::ConfigError;

#[derive(Debug, Error)]
#[error("unauthorized")]
pub struct Unauthorized;

/// The caller's user id, attached to the request by
/// [`verify_identity`](super::middleware::verify_identity).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedUser {
    pub uid: String,
}

/// Maps an inbound bearer credential to a user id.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, bearer: &str) -> Result<String, Unauthorized>;
}

/// Verifier backed by a fixed token → uid table.
#[derive(Debug, Clone, Default)]
pub struct StaticIdentityVerifier {
    tokens: HashMap<String, String>,
}

impl StaticIdentityVerifier {
    pub fn new<I, T, U>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (T, U)>,
        T: Into<String>,
        U: Into<String>,
    {
        Self {
            tokens: pairs
                .into_iter()
                .map(|(token, uid)| (token.into(), uid.into()))
                .collect(),
        }
    }

    /// Parse `token=uid,token=uid`.
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let mut tokens = HashMap::new();
        for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            match pair.split_once('=') {
                Some((token, uid)) if !token.trim().is_empty() && !uid.trim().is_empty() => {
                    tokens.insert(token.trim().to_string(), uid.trim().to_string());
                }
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: "MOMENTUM_IDENTITY_TOKENS",
                        value: pair.to_string(),
                    })
                }
            }
        }
        Ok(Self { tokens })
    }
}

#[async_trait]
impl IdentityVerifier for StaticIdentityVerifier {
    async fn verify(&self, bearer: &str) -> Result<String, Unauthorized> {
        self.tokens.get(bearer).cloned().ok_or(Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_known_tokens() {
        let verifier = StaticIdentityVerifier::parse("tok-a=u1, tok-b=u2").unwrap();
        assert_eq!(verifier.verify("tok-a").await.unwrap(), "u1");
        assert_eq!(verifier.verify("tok-b").await.unwrap(), "u2");
    }

    #[tokio::test]
    async fn rejects_unknown_tokens() {
        let verifier = StaticIdentityVerifier::new([("tok", "u1")]);
        assert!(verifier.verify("other").await.is_err());
    }

    #[test]
    fn parse_rejects_pairs_without_uid() {
        assert!(StaticIdentityVerifier::parse("tok=").is_err());
        assert!(StaticIdentityVerifier::parse("justatoken").is_err());
    }
}
