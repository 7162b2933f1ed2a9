//! # Admin Bearer Tokens
//!
//! Admin sessions are stateless HS256 tokens carrying the admin's id, email
//! and display name. Verification needs no repository lookup, so a token
//! stays usable until it expires even if the admin record changes.

use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::admin::Admin;
use super::errors::{AuthError, AuthResult};

/// Admin session lifetime
pub const SESSION_DAYS: i64 = 30;

const ISSUER: &str = "marketgate";
const AUDIENCE: &str = "marketgate-admin";

/// Signing key and session policy
#[derive(Debug, Clone)]
pub struct TokenSettings {
    pub secret: String,
    pub lifetime: Duration,
    pub issuer: String,
    pub audience: String,
}

impl TokenSettings {
    pub fn for_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            lifetime: Duration::days(SESSION_DAYS),
            issuer: ISSUER.to_string(),
            audience: AUDIENCE.to_string(),
        }
    }
}

/// Claims inside an admin token. Nothing secret goes in here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminClaims {
    /// Admin id
    pub sub: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub iat: i64,
    pub exp: i64,
    pub aud: String,
    pub iss: String,
}

impl AdminClaims {
    pub fn for_admin(admin: &Admin, issued_at: DateTime<Utc>, settings: &TokenSettings) -> Self {
        Self {
            sub: admin.id.to_string(),
            email: admin.email.clone(),
            name: admin.name.clone(),
            iat: issued_at.timestamp(),
            exp: (issued_at + settings.lifetime).timestamp(),
            aud: settings.audience.clone(),
            iss: settings.issuer.clone(),
        }
    }

    pub fn admin_id(&self) -> AuthResult<Uuid> {
        Uuid::parse_str(&self.sub).map_err(|_| AuthError::MalformedToken)
    }

    pub fn expires_at(&self) -> AuthResult<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .ok_or(AuthError::MalformedToken)
    }
}

/// A freshly signed token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies admin tokens with one shared secret
#[derive(Clone)]
pub struct TokenSigner {
    settings: TokenSettings,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenSigner {
    pub fn new(settings: TokenSettings) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&settings.audience]);
        validation.set_issuer(&[&settings.issuer]);
        validation.set_required_spec_claims(&["exp", "sub", "aud", "iss"]);

        Self {
            encoding_key: EncodingKey::from_secret(settings.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(settings.secret.as_bytes()),
            validation,
            settings,
        }
    }

    pub fn sign(&self, admin: &Admin) -> AuthResult<IssuedToken> {
        self.sign_at(admin, Utc::now())
    }

    fn sign_at(&self, admin: &Admin, now: DateTime<Utc>) -> AuthResult<IssuedToken> {
        let claims = AdminClaims::for_admin(admin, now, &self.settings);
        let expires_at = claims.expires_at()?;
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|_| AuthError::TokenGenerationFailed)?;
        Ok(IssuedToken { token, expires_at })
    }

    pub fn verify(&self, token: &str) -> AuthResult<AdminClaims> {
        decode::<AdminClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(classify)
    }
}

/// Expiry and bad signatures keep their own kinds; anything else about the
/// token is malformed.
fn classify(err: JwtError) -> AuthError {
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        _ => AuthError::MalformedToken,
    }
}

/// Token section of a successful login reply
#[derive(Debug, Clone, Serialize)]
pub struct BearerGrant {
    pub access_token: String,
    pub token_type: &'static str,
    /// Seconds until expiry
    pub expires_in: i64,
    /// Expiry as a Unix timestamp
    pub expires_at: i64,
}

impl BearerGrant {
    pub fn at(issued: IssuedToken, now: DateTime<Utc>) -> Self {
        Self {
            access_token: issued.token,
            token_type: "bearer",
            expires_in: (issued.expires_at - now).num_seconds().max(0),
            expires_at: issued.expires_at.timestamp(),
        }
    }
}
