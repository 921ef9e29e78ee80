//! OpenID Connect claim sets for ID tokens, access tokens and user-info responses.

use base64::prelude::*;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256, Sha384};
use std::collections::HashMap;

use crate::oauth::scopes::Scope;
use crate::oauth::types::Identity;

/// The `aud` claim: a string for one audience, an array otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Audience(pub Vec<String>);

impl Audience {
    pub fn contains(&self, client_id: &str) -> bool {
        self.0.iter().any(|aud| aud == client_id)
    }
}

impl Serialize for Audience {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.as_slice() {
            [single] => serializer.serialize_str(single),
            many => many.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Audience {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            One(String),
            Many(Vec<String>),
        }
        Ok(match Repr::deserialize(deserializer)? {
            Repr::One(aud) => Audience(vec![aud]),
            Repr::Many(aud) => Audience(aud),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FederatedClaims {
    pub connector_id: String,
    pub user_id: String,
}

/// `token_use` value marking access tokens.
pub const ACCESS_TOKEN_USE: &str = "access";

/// Claims carried by signed tokens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct OpenIDClaims {
    pub iss: String,

    pub sub: String,

    pub aud: Audience,

    pub exp: i64,

    pub iat: i64,

    /// Authorized party, set when the audience names more than one client
    #[serde(skip_serializing_if = "Option::is_none")]
    pub azp: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// Set on access tokens only, so an ID token cannot stand in for one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_use: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub at_hash: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub c_hash: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_verified: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub groups: Option<Vec<String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub federated_claims: Option<FederatedClaims>,

    /// Connector specific claims
    #[serde(flatten)]
    pub additional_claims: HashMap<String, serde_json::Value>,
}

const REGISTERED_CLAIMS: &[&str] = &[
    "iss",
    "sub",
    "aud",
    "exp",
    "iat",
    "azp",
    "nonce",
    "token_use",
    "at_hash",
    "c_hash",
    "email",
    "email_verified",
    "name",
    "groups",
    "federated_claims",
];

impl OpenIDClaims {
    /// Claims for `identity`, filtered by the granted scopes.
    pub fn new(
        issuer: &str,
        identity: &Identity,
        connector_id: &str,
        audience: &[String],
        scopes: &[Scope],
        issued_at: i64,
        expires_at: i64,
    ) -> Self {
        let mut claims = Self {
            iss: issuer.to_string(),
            sub: identity.user_id.clone(),
            aud: Audience(audience.to_vec()),
            exp: expires_at,
            iat: issued_at,
            ..Default::default()
        };

        if audience.len() > 1 {
            claims.azp = audience.first().cloned();
        }

        for scope in scopes {
            match scope {
                Scope::Email => {
                    claims.email = identity.email.clone();
                    claims.email_verified = Some(identity.email_verified);
                }
                Scope::Profile => {
                    claims.name = Some(identity.username.clone());
                    for (key, value) in &identity.claims {
                        if !REGISTERED_CLAIMS.contains(&key.as_str()) {
                            claims.additional_claims.insert(key.clone(), value.clone());
                        }
                    }
                }
                Scope::Groups => {
                    claims.groups = Some(identity.groups.clone());
                }
                Scope::FederatedId => {
                    claims.federated_claims = Some(FederatedClaims {
                        connector_id: connector_id.to_string(),
                        user_id: identity.user_id.clone(),
                    });
                }
                Scope::OpenId | Scope::CrossClient(_) => {}
            }
        }

        claims
    }

    pub fn with_nonce(mut self, nonce: Option<String>) -> Self {
        self.nonce = nonce;
        self
    }

    pub fn for_access_token(mut self) -> Self {
        self.token_use = Some(ACCESS_TOKEN_USE.to_string());
        self
    }

    pub fn is_access_token(&self) -> bool {
        self.token_use.as_deref() == Some(ACCESS_TOKEN_USE)
    }

    pub fn with_at_hash(mut self, alg: &str, access_token: &str) -> Self {
        self.at_hash = Some(token_hash(alg, access_token));
        self
    }

    pub fn with_c_hash(mut self, alg: &str, code: &str) -> Self {
        self.c_hash = Some(token_hash(alg, code));
        self
    }

    /// User-info view: identity claims without token bookkeeping.
    pub fn into_userinfo(mut self) -> serde_json::Value {
        self.nonce = None;
        self.token_use = None;
        self.at_hash = None;
        self.c_hash = None;
        let mut value = serde_json::to_value(&self).unwrap_or_default();
        if let Some(object) = value.as_object_mut() {
            for key in ["iss", "aud", "exp", "iat", "azp"] {
                object.remove(key);
            }
        }
        value
    }
}

/// `at_hash` / `c_hash`: left half of the digest matching the signing algorithm.
pub fn token_hash(alg: &str, value: &str) -> String {
    let digest: Vec<u8> = match alg {
        "ES384" => Sha384::digest(value.as_bytes()).to_vec(),
        _ => Sha256::digest(value.as_bytes()).to_vec(),
    };
    BASE64_URL_SAFE_NO_PAD.encode(&digest[..digest.len() / 2])
}
