// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access token issuance and verification.
//!
//! Tokens are compact JWTs (`header.claims.signature`) signed with HS512.
//! The signing key is derived from the configured secret once, when the
//! service is built, and never changes afterwards. Every instance that is
//! configured with the same secret derives the same key, so a token issued
//! anywhere in the deployment verifies everywhere and survives restarts.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};

use super::claims::TokenClaims;
use super::error::{AuthError, TokenError};
use super::principal::Principal;
use crate::config::TOKEN_LIFETIME_HOURS;

const ALGORITHM: Algorithm = Algorithm::HS512;

/// A freshly signed token and its expiry.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and verifies access tokens.
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl TokenService {
    /// Derive the signing keys from `secret`.
    pub fn new(secret: &[u8]) -> Self {
        let mut validation = Validation::new(ALGORITHM);
        // Expiry is exact: a token is valid strictly before `exp`.
        validation.leeway = 0;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            lifetime: Duration::hours(TOKEN_LIFETIME_HOURS),
        }
    }

    /// Issue a token for `principal`, valid from now for the token lifetime.
    pub fn issue(&self, principal: &Principal) -> Result<IssuedToken, AuthError> {
        self.issue_at(principal, Utc::now())
    }

    pub(crate) fn issue_at(
        &self,
        principal: &Principal,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        let expires_at = issued_at + self.lifetime;
        let claims = TokenClaims {
            sub: principal.username.clone(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| AuthError::InternalError(format!("Failed to sign token: {e}")))?;

        tracing::debug!(subject = %claims.sub, expires_at = %expires_at, "Issued access token");
        Ok(IssuedToken { token, expires_at })
    }

    /// Check the signature and expiry of `token` and return its claims.
    ///
    /// The returned claims' `sub` is the token subject.
    pub fn verify_and_extract_subject(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation).map_err(
            |e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                _ => TokenError::Malformed,
            },
        )?;

        let claims = data.claims;
        if claims.exp <= Utc::now().timestamp() {
            return Err(TokenError::Expired);
        }
        if claims.sub.is_empty() {
            return Err(TokenError::Malformed);
        }

        Ok(claims)
    }

    /// True iff `token` verifies, names `principal` as its subject and has
    /// not expired.
    pub fn is_valid(&self, token: &str, principal: &Principal) -> bool {
        match self.verify_and_extract_subject(token) {
            Ok(claims) => {
                let subject_matches = claims.sub == principal.username;
                let unexpired = claims.exp > Utc::now().timestamp();
                if !subject_matches {
                    tracing::warn!(
                        subject = %claims.sub,
                        principal = %principal.username,
                        "Token subject does not match principal"
                    );
                }
                subject_matches && unexpired
            }
            Err(e) => {
                tracing::debug!(kind = e.kind(), "Token failed validation");
                false
            }
        }
    }
}
