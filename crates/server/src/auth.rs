//! Campus sign-in.
//!
//! The identity provider hands clients an HS256 ID token. Every request
//! presents it; [`IdTokenVerifier`] checks the signature and expiry, and
//! [`AccountRegistry::admit`] applies the email-domain rule, creating the
//! account on first sight.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use lostfound::{EmailDomainPolicy, Principal};
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};
use crate::telemetry;

/// Minimum signing secret length accepted at startup.
pub const MIN_SECRET_BYTES: usize = 16;

/// Claims carried by an ID token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdClaims {
    /// Stable user id.
    pub sub: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct IdTokenVerifier {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_secs: u64,
}

impl IdTokenVerifier {
    pub fn new(secret: &str, ttl_secs: u64) -> ServerResult<Self> {
        if secret.len() < MIN_SECRET_BYTES {
            return Err(ServerError::Config(format!(
                "token secret must be at least {MIN_SECRET_BYTES} bytes"
            )));
        }
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        Ok(Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            ttl_secs,
        })
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Sign a token for `uid`. Used by the development sign-in and tests.
    pub fn issue(&self, uid: &str, email: &str, name: Option<&str>) -> ServerResult<String> {
        let now = Utc::now().timestamp();
        let claims = IdClaims {
            sub: uid.to_string(),
            email: email.to_string(),
            name: name.map(str::to_string),
            iat: now,
            exp: now + self.ttl_secs as i64,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ServerError::Internal(format!("failed to sign token: {e}")))
    }

    pub fn verify(&self, token: &str) -> ServerResult<IdClaims> {
        decode::<IdClaims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                let reason = match e.kind() {
                    ErrorKind::ExpiredSignature => "session expired",
                    ErrorKind::InvalidSignature => "invalid token signature",
                    _ => "invalid token",
                };
                ServerError::Authentication(reason.to_string())
            })
    }
}

impl std::fmt::Debug for IdTokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdTokenVerifier")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Account {
    pub uid: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Known accounts and the one place the email-domain rule is enforced.
#[derive(Debug)]
pub struct AccountRegistry {
    policy: EmailDomainPolicy,
    accounts: DashMap<String, Account>,
}

impl AccountRegistry {
    pub fn new(policy: EmailDomainPolicy) -> Self {
        Self {
            policy,
            accounts: DashMap::new(),
        }
    }

    pub fn policy(&self) -> &EmailDomainPolicy {
        &self.policy
    }

    /// Admit the bearer of `claims`, creating the account on first sign-in.
    /// Off-domain emails never get an account.
    pub fn admit(&self, claims: &IdClaims) -> ServerResult<Principal> {
        if let Err(err) = self.policy.check(&claims.email) {
            telemetry::record_auth_rejection("domain");
            tracing::warn!(
                target: "lostfound::auth",
                uid = %claims.sub,
                "sign-in rejected: email outside the campus domain"
            );
            return Err(ServerError::DomainRejected(err.to_string()));
        }

        let mut created = false;
        let account = self
            .accounts
            .entry(claims.sub.clone())
            .and_modify(|account| {
                account.email = claims.email.clone();
                if claims.name.is_some() {
                    account.display_name = claims.name.clone();
                }
            })
            .or_insert_with(|| {
                created = true;
                Account {
                    uid: claims.sub.clone(),
                    email: claims.email.clone(),
                    display_name: claims.name.clone(),
                    created_at: Utc::now(),
                }
            })
            .clone();
        if created {
            tracing::info!(target: "lostfound::auth", uid = %account.uid, "account created");
        }

        let principal = Principal::new(account.uid, account.email);
        Ok(match account.display_name {
            Some(name) => principal.with_display_name(name),
            None => principal,
        })
    }

    pub fn get(&self, uid: &str) -> Option<Account> {
        self.accounts.get(uid).map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}
