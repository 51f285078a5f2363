// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Firebase ID token verification for API requests.

use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use reqwest::header::CACHE_CONTROL;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, RwLock};

const JWKS_URL: &str =
    "https://www.googleapis.com/service_accounts/v1/jwk/securetoken@system.gserviceaccount.com";
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(5);
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(300);
const CLOCK_SKEW_SECS: u64 = 60;

/// Verified user identity extracted from a valid ID token.
#[derive(Debug, Clone)]
pub struct VerifiedUser {
    pub uid: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Identity verification error categories.
#[derive(Debug, Clone)]
pub enum IdentityError {
    /// The token is missing/invalid or claims do not match expectations.
    Unauthorized(String),
    /// A transient infrastructure failure occurred (JWKS fetch).
    Transient(String),
}

#[derive(Clone)]
enum VerifierMode {
    Jwks,
    /// HS256 with a shared key, for deterministic tests.
    StaticHmac { decoding_key: Arc<DecodingKey> },
}

#[derive(Clone)]
struct JwksCacheEntry {
    keys_by_kid: HashMap<String, Arc<DecodingKey>>,
    expires_at: Instant,
}

/// Verifier for Firebase-issued ID tokens.
pub struct IdentityVerifier {
    http_client: reqwest::Client,
    expected_issuer: String,
    expected_audience: String,
    mode: VerifierMode,
    jwks_cache: RwLock<Option<JwksCacheEntry>>,
    refresh_lock: Mutex<()>,
}

impl IdentityVerifier {
    /// Create a production verifier that fetches and caches the identity
    /// provider's JWKS keys.
    pub fn new(project_id: &str) -> anyhow::Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()?;

        let expected_issuer = format!("https://securetoken.google.com/{}", project_id);

        tracing::info!(
            expected_issuer = %expected_issuer,
            "Initialized Firebase identity verifier"
        );

        Ok(Self {
            http_client,
            expected_issuer,
            expected_audience: project_id.to_string(),
            mode: VerifierMode::Jwks,
            jwks_cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Create a verifier with a static HMAC key accepting HS256 tokens.
    ///
    /// This is intended for deterministic local/integration tests; claim
    /// validation is identical to the production verifier.
    pub fn new_with_static_hmac(project_id: &str, key: &[u8]) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            expected_issuer: format!("https://securetoken.google.com/{}", project_id),
            expected_audience: project_id.to_string(),
            mode: VerifierMode::StaticHmac {
                decoding_key: Arc::new(DecodingKey::from_secret(key)),
            },
            jwks_cache: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    /// Verify an ID token and extract the caller's identity.
    pub async fn verify(&self, token: &str) -> Result<VerifiedUser, IdentityError> {
        let header = decode_header(token)
            .map_err(|e| IdentityError::Unauthorized(format!("invalid JWT header: {e}")))?;

        let (algorithm, decoding_key) = match &self.mode {
            VerifierMode::StaticHmac { decoding_key } => {
                if header.alg != Algorithm::HS256 {
                    return Err(IdentityError::Unauthorized(format!(
                        "unexpected JWT alg: {:?}",
                        header.alg
                    )));
                }
                (Algorithm::HS256, decoding_key.clone())
            }
            VerifierMode::Jwks => {
                if header.alg != Algorithm::RS256 {
                    return Err(IdentityError::Unauthorized(format!(
                        "unexpected JWT alg: {:?}",
                        header.alg
                    )));
                }
                let kid = header
                    .kid
                    .ok_or_else(|| IdentityError::Unauthorized("missing JWT kid".to_string()))?;
                (Algorithm::RS256, self.decoding_key_for_kid(&kid).await?)
            }
        };

        let mut validation = Validation::new(algorithm);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.set_issuer(&[self.expected_issuer.as_str()]);
        validation.set_audience(&[self.expected_audience.as_str()]);
        validation.leeway = CLOCK_SKEW_SECS;

        let token_data = decode::<IdTokenClaims>(token, decoding_key.as_ref(), &validation)
            .map_err(|e| IdentityError::Unauthorized(format!("JWT validation failed: {e}")))?;

        let claims = token_data.claims;

        validate_iat(claims.iat)?;

        if claims.sub.trim().is_empty() {
            return Err(IdentityError::Unauthorized("empty sub claim".to_string()));
        }

        Ok(VerifiedUser {
            uid: claims.sub,
            email: claims.email,
            name: claims.name,
        })
    }

    async fn decoding_key_for_kid(&self, kid: &str) -> Result<Arc<DecodingKey>, IdentityError> {
        if let Some(key) = self.lookup_cached_key(kid).await {
            return Ok(key);
        }

        for force_refresh in [false, true] {
            self.refresh_jwks(force_refresh).await?;
            if let Some(key) = self.lookup_cached_key(kid).await {
                return Ok(key);
            }
        }

        Err(IdentityError::Unauthorized(format!(
            "JWT kid not found in JWKS after refresh: {kid}"
        )))
    }

    async fn lookup_cached_key(&self, kid: &str) -> Option<Arc<DecodingKey>> {
        let cache = self.jwks_cache.read().await;
        let now = Instant::now();
        cache
            .as_ref()
            .filter(|entry| entry.expires_at > now)
            .and_then(|entry| entry.keys_by_kid.get(kid))
            .cloned()
    }

    async fn refresh_jwks(&self, force_refresh: bool) -> Result<(), IdentityError> {
        let _guard = self.refresh_lock.lock().await;

        if !force_refresh {
            let cache = self.jwks_cache.read().await;
            if cache
                .as_ref()
                .is_some_and(|entry| entry.expires_at > Instant::now())
            {
                return Ok(());
            }
        }

        tracing::debug!(jwks_uri = JWKS_URL, "Refreshing identity JWKS cache");

        let response = self
            .http_client
            .get(JWKS_URL)
            .send()
            .await
            .map_err(|e| IdentityError::Transient(format!("JWKS request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(IdentityError::Transient(format!(
                "JWKS request returned status {}",
                response.status()
            )));
        }

        let ttl = cache_ttl_from_headers(response.headers(), DEFAULT_CACHE_TTL);

        let jwks: Jwks = response
            .json()
            .await
            .map_err(|e| IdentityError::Transient(format!("invalid JWKS JSON: {e}")))?;

        let mut keys_by_kid: HashMap<String, Arc<DecodingKey>> = HashMap::new();

        for jwk in jwks.keys {
            if jwk.kty != "RSA" {
                continue;
            }

            if jwk.kid.trim().is_empty() {
                continue;
            }

            if let Some(alg) = &jwk.alg {
                if alg != "RS256" {
                    continue;
                }
            }

            if let Some(use_) = &jwk.use_ {
                if use_ != "sig" {
                    continue;
                }
            }

            match DecodingKey::from_rsa_components(&jwk.n, &jwk.e) {
                Ok(key) => {
                    keys_by_kid.insert(jwk.kid, Arc::new(key));
                }
                Err(e) => {
                    tracing::warn!(error = %e, kid = %jwk.kid, "Skipping invalid RSA JWKS key");
                }
            }
        }

        if keys_by_kid.is_empty() {
            return Err(IdentityError::Transient(
                "JWKS response did not include any usable RSA keys".to_string(),
            ));
        }

        let entry = JwksCacheEntry {
            keys_by_kid,
            expires_at: Instant::now() + ttl,
        };

        *self.jwks_cache.write().await = Some(entry);

        tracing::debug!(ttl_secs = ttl.as_secs(), "Identity JWKS cache refreshed");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct Jwks {
    keys: Vec<Jwk>,
}

#[derive(Debug, Deserialize)]
struct Jwk {
    kid: String,
    kty: String,
    alg: Option<String>,
    n: String,
    e: String,
    #[serde(rename = "use")]
    use_: Option<String>,
}

#[derive(Debug, Deserialize)]
struct IdTokenClaims {
    sub: String,
    #[allow(dead_code)]
    exp: usize,
    iat: Option<usize>,
    email: Option<String>,
    name: Option<String>,
}

fn validate_iat(iat: Option<usize>) -> Result<(), IdentityError> {
    let now = now_unix_secs();

    let Some(iat) = iat else {
        return Err(IdentityError::Unauthorized("missing iat claim".to_string()));
    };

    if iat as u64 > now + CLOCK_SKEW_SECS {
        return Err(IdentityError::Unauthorized(
            "iat claim is in the future".to_string(),
        ));
    }

    Ok(())
}

fn cache_ttl_from_headers(headers: &reqwest::header::HeaderMap, fallback: Duration) -> Duration {
    let Some(max_age) = headers
        .get(CACHE_CONTROL)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_cache_control_max_age)
    else {
        return fallback;
    };

    Duration::from_secs(max_age)
}

fn parse_cache_control_max_age(value: &str) -> Option<u64> {
    for directive in value.split(',') {
        let directive = directive.trim();

        if let Some(raw) = directive.strip_prefix("max-age=") {
            let raw = raw.trim_matches('"');
            if let Ok(seconds) = raw.parse::<u64>() {
                return Some(seconds);
            }
        }
    }

    None
}

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
