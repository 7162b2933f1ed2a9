//! # Admission Gate
//!
//! Every endpoint describes what it needs in an `EndpointPolicy`. The gate
//! checks a request against it in a fixed order:
//!
//! 1. caller verification, when the endpoint requires an admin
//! 2. rate limiting, when the endpoint has a limit
//! 3. JSON decoding and schema validation, when the endpoint takes input
//!
//! The first failing step answers the request. Unauthenticated calls never
//! consume rate limit budget, and rejected calls never reach validation.

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::HeaderMap;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::errors::{AdmissionError, AdmissionResult};
use crate::auth::{AdminSession, CallerVerifier};
use crate::ratelimit::{
    client_identifier, ForwardedHeaderPolicy, RateLimitConfig, RateLimitDecision, RateLimiter,
};
use crate::schema::Schema;
use crate::store::DataResult;

// ==================
// Policy
// ==================

/// Where an endpoint reads its input from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputSource {
    /// JSON request body
    Body,
    /// Query string
    Query,
    /// No input beyond the path
    #[default]
    None,
}

/// What an endpoint requires before its handler runs
#[derive(Debug, Clone)]
pub struct EndpointPolicy {
    name: String,
    requires_auth: bool,
    rate_limit: Option<RateLimitConfig>,
    schema: Option<Arc<Schema>>,
    source: InputSource,
}

impl EndpointPolicy {
    /// Public endpoint without input
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            requires_auth: false,
            rate_limit: None,
            schema: None,
            source: InputSource::None,
        }
    }

    /// Require a signed-in admin
    pub fn authenticated(mut self) -> Self {
        self.requires_auth = true;
        self
    }

    pub fn rate_limited(mut self, config: RateLimitConfig) -> Self {
        self.rate_limit = Some(config);
        self
    }

    /// Validate the JSON body against `schema`
    pub fn body(mut self, schema: Arc<Schema>) -> Self {
        self.schema = Some(schema);
        self.source = InputSource::Body;
        self
    }

    /// Validate the query string against `schema`
    pub fn query(mut self, schema: Arc<Schema>) -> Self {
        self.schema = Some(schema);
        self.source = InputSource::Query;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn requires_auth(&self) -> bool {
        self.requires_auth
    }

    pub fn rate_limit(&self) -> Option<&RateLimitConfig> {
        self.rate_limit.as_ref()
    }

    pub fn schema(&self) -> Option<&Arc<Schema>> {
        self.schema.as_ref()
    }

    pub fn source(&self) -> InputSource {
        self.source
    }
}

// ==================
// Request
// ==================

/// Transport facts about a request
#[derive(Debug, Clone, Copy)]
pub struct RequestMeta<'a> {
    pub headers: &'a HeaderMap,
    /// Address of the connecting peer, when known
    pub peer: Option<IpAddr>,
}

impl<'a> RequestMeta<'a> {
    pub fn new(headers: &'a HeaderMap, peer: Option<IpAddr>) -> Self {
        Self { headers, peer }
    }
}

/// Undecoded request input
#[derive(Debug, Clone)]
pub enum RawInput {
    None,
    Body(Bytes),
    Query(HashMap<String, String>),
}

/// A request that passed every check
#[derive(Debug, Clone)]
pub struct Admitted<T> {
    /// Normalized input, `Value::Null` for endpoints without input
    pub input: T,
    /// Verified admin on authenticated endpoints
    pub session: Option<AdminSession>,
    /// Rate limit identifier of the caller
    pub client: String,
    /// Counter state after this request, on rate limited endpoints
    pub rate_limit: Option<RateLimitDecision>,
}

impl<T> Admitted<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Admitted<U> {
        Admitted {
            input: f(self.input),
            session: self.session,
            client: self.client,
            rate_limit: self.rate_limit,
        }
    }
}

// ==================
// Gate
// ==================

/// Stateless request admission. Holds only the verifier and the limiter.
#[derive(Clone)]
pub struct AdmissionGate {
    verifier: Arc<dyn CallerVerifier>,
    limiter: Arc<dyn RateLimiter>,
    forwarded: ForwardedHeaderPolicy,
}

impl AdmissionGate {
    pub fn new(verifier: Arc<dyn CallerVerifier>, limiter: Arc<dyn RateLimiter>) -> Self {
        Self {
            verifier,
            limiter,
            forwarded: ForwardedHeaderPolicy::default(),
        }
    }

    pub fn with_forwarded_policy(mut self, policy: ForwardedHeaderPolicy) -> Self {
        self.forwarded = policy;
        self
    }

    pub fn limiter(&self) -> &Arc<dyn RateLimiter> {
        &self.limiter
    }

    /// Runs every check of `policy` against the request.
    pub fn admit(
        &self,
        policy: &EndpointPolicy,
        meta: &RequestMeta<'_>,
        raw: RawInput,
    ) -> AdmissionResult<Admitted<Value>> {
        let client = client_identifier(meta.headers, meta.peer, &self.forwarded);

        let session = if policy.requires_auth {
            match self.verifier.verify_caller(meta.headers) {
                Ok(session) => Some(session),
                Err(err) => {
                    tracing::info!(endpoint = %policy.name, client = %client, reason = %err, "caller rejected");
                    return Err(AdmissionError::from(err));
                }
            }
        } else {
            None
        };

        let rate_limit = match &policy.rate_limit {
            Some(config) => {
                let now = Utc::now();
                let decision = self.limiter.check_at(&client, config, now);
                if !decision.admitted {
                    let retry_after = decision.retry_after_secs(now);
                    tracing::warn!(
                        endpoint = %policy.name,
                        client = %client,
                        limit = decision.limit,
                        retry_after,
                        "rate limit exceeded"
                    );
                    return Err(AdmissionError::RateLimited {
                        limit: decision.limit,
                        remaining: decision.remaining,
                        reset_at: decision.reset_at,
                        retry_after,
                    });
                }
                Some(decision)
            }
            None => None,
        };

        let input = self.decode(policy, raw)?;

        tracing::debug!(endpoint = %policy.name, client = %client, "request admitted");
        Ok(Admitted {
            input,
            session,
            client,
            rate_limit,
        })
    }

    /// Admits the request, decodes its input into `T` and hands it to
    /// `handoff`. The hand-off outcome is returned unchanged.
    pub fn process<T, R>(
        &self,
        policy: &EndpointPolicy,
        meta: &RequestMeta<'_>,
        raw: RawInput,
        handoff: impl FnOnce(Admitted<T>) -> DataResult<R>,
    ) -> AdmissionResult<R>
    where
        T: DeserializeOwned,
    {
        let mut admitted = self.admit(policy, meta, raw)?;
        let value = std::mem::take(&mut admitted.input);
        let input = serde_json::from_value::<T>(value).map_err(|e| {
            AdmissionError::Internal(format!(
                "{} input does not match its schema: {}",
                policy.name, e
            ))
        })?;
        let admitted = admitted.map(|_| input);

        handoff(admitted).map_err(|err| {
            tracing::info!(endpoint = %policy.name, code = err.code(), "downstream rejected request");
            AdmissionError::Downstream(err)
        })
    }

    fn decode(&self, policy: &EndpointPolicy, raw: RawInput) -> AdmissionResult<Value> {
        let Some(schema) = &policy.schema else {
            return Ok(Value::Null);
        };

        let validated = match (policy.source, raw) {
            (InputSource::Body, RawInput::Body(bytes)) => {
                let body: Value =
                    serde_json::from_slice(&bytes).map_err(|_| AdmissionError::InvalidBody)?;
                schema.validate(&body)
            }
            (InputSource::Query, RawInput::Query(params)) => schema.validate_query(&params),
            (source, _) => {
                return Err(AdmissionError::Internal(format!(
                    "{} expects {:?} input",
                    policy.name, source
                )))
            }
        };

        validated.into_result().map_err(|errors| {
            tracing::debug!(endpoint = %policy.name, failures = errors.len(), "validation failed");
            AdmissionError::Validation(errors)
        })
    }
}

impl std::fmt::Debug for AdmissionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdmissionGate")
            .field("forwarded", &self.forwarded)
            .finish_non_exhaustive()
    }
}
