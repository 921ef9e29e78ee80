//! Token signing contract and the default compact JWS signer.
//!
//! [`KeyDataSigner`] signs with the first configured key and publishes every
//! configured key, so keys can be rotated by prepending a new one.

use async_trait::async_trait;
use atproto_identity::key::{KeyData, KeyType, sign, to_public, validate};
use atproto_oauth::jwk::generate as generate_jwk;
use base64::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use crate::errors::SignerError;

/// JSON Web Key Set document
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct JsonWebKeySet {
    pub keys: Vec<Value>,
}

/// Signs and verifies tokens. The authorization engine never touches key material.
#[async_trait]
pub trait Signer: Send + Sync {
    /// Public keys for the JWKS endpoint.
    async fn public_keys(&self) -> Result<JsonWebKeySet, SignerError>;

    /// JWS algorithm used for new signatures.
    async fn signer_alg(&self) -> Result<String, SignerError>;

    /// Sign `payload`, returning a compact JWS.
    async fn sign(&self, payload: &[u8]) -> Result<String, SignerError>;

    /// Verify a compact JWS and return its payload.
    async fn verify_signature(&self, jws: &str) -> Result<Vec<u8>, SignerError>;
}

struct SigningKey {
    kid: String,
    alg: &'static str,
    private: KeyData,
    public: KeyData,
    jwk: Value,
}

pub struct KeyDataSigner {
    keys: Vec<SigningKey>,
}

impl KeyDataSigner {
    pub fn new(private_keys: &[KeyData]) -> Result<Self, SignerError> {
        if private_keys.is_empty() {
            return Err(SignerError::NoSigningKeys);
        }

        let mut keys = Vec::with_capacity(private_keys.len());
        for private in private_keys {
            let alg = match private.key_type() {
                KeyType::P256Private => "ES256",
                KeyType::P384Private => "ES384",
                KeyType::K256Private => "ES256K",
                other => return Err(SignerError::UnsupportedKeyType(other.to_string())),
            };
            let public = to_public(private).map_err(|e| SignerError::KeyFailed(e.to_string()))?;
            let kid = key_id(&public);

            let jwk = generate_jwk(&public).map_err(|e| SignerError::KeyFailed(e.to_string()))?;
            let mut jwk =
                serde_json::to_value(&jwk).map_err(|e| SignerError::KeyFailed(e.to_string()))?;
            if let Some(object) = jwk.as_object_mut() {
                object.insert("kid".to_string(), json!(kid));
                object.insert("use".to_string(), json!("sig"));
                object.insert("alg".to_string(), json!(alg));
            }

            keys.push(SigningKey {
                kid,
                alg,
                private: private.clone(),
                public,
                jwk,
            });
        }

        Ok(Self { keys })
    }

    fn active_key(&self) -> Result<&SigningKey, SignerError> {
        self.keys.first().ok_or(SignerError::NoSigningKeys)
    }
}

#[derive(Deserialize)]
struct JwsHeader {
    alg: String,
    #[serde(default)]
    kid: Option<String>,
}

#[async_trait]
impl Signer for KeyDataSigner {
    async fn public_keys(&self) -> Result<JsonWebKeySet, SignerError> {
        Ok(JsonWebKeySet {
            keys: self.keys.iter().map(|k| k.jwk.clone()).collect(),
        })
    }

    async fn signer_alg(&self) -> Result<String, SignerError> {
        Ok(self.active_key()?.alg.to_string())
    }

    async fn sign(&self, payload: &[u8]) -> Result<String, SignerError> {
        let key = self.active_key()?;
        let header = json!({
            "alg": key.alg,
            "kid": key.kid,
            "typ": "JWT",
        });
        let header = serde_json::to_vec(&header)
            .map_err(|e| SignerError::SigningFailed(e.to_string()))?;

        let signing_input = format!(
            "{}.{}",
            BASE64_URL_SAFE_NO_PAD.encode(header),
            BASE64_URL_SAFE_NO_PAD.encode(payload)
        );
        let signature = sign(&key.private, signing_input.as_bytes())
            .map_err(|e| SignerError::SigningFailed(e.to_string()))?;

        Ok(format!(
            "{}.{}",
            signing_input,
            BASE64_URL_SAFE_NO_PAD.encode(signature)
        ))
    }

    async fn verify_signature(&self, jws: &str) -> Result<Vec<u8>, SignerError> {
        let mut parts = jws.split('.');
        let (Some(header_b64), Some(payload_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(SignerError::MalformedToken(
                "expected three segments".to_string(),
            ));
        };

        let header = BASE64_URL_SAFE_NO_PAD
            .decode(header_b64)
            .map_err(|e| SignerError::MalformedToken(e.to_string()))?;
        let header: JwsHeader = serde_json::from_slice(&header)
            .map_err(|e| SignerError::MalformedToken(e.to_string()))?;
        let payload = BASE64_URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|e| SignerError::MalformedToken(e.to_string()))?;
        let signature = BASE64_URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|e| SignerError::MalformedToken(e.to_string()))?;

        let signing_input = &jws[..header_b64.len() + 1 + payload_b64.len()];

        let candidates = self.keys.iter().filter(|key| {
            key.alg == header.alg
                && header.kid.as_deref().is_none_or(|kid| kid == key.kid)
        });
        for key in candidates {
            if validate(&key.public, &signature, signing_input.as_bytes()).is_ok() {
                return Ok(payload);
            }
        }

        Err(SignerError::VerificationFailed)
    }
}

/// Deterministic key id derived from the public key.
fn key_id(public: &KeyData) -> String {
    let digest = Sha256::digest(public.to_string().as_bytes());
    BASE64_URL_SAFE_NO_PAD.encode(&digest[..12])
}
