//! OpenID Provider metadata and the published key set.

use serde::{Deserialize, Serialize};

use crate::errors::SignerError;
use crate::oauth::server::OidcServer;
use crate::oauth::signer::JsonWebKeySet;
use crate::oauth::types::ResponseType;

/// OpenID Provider Metadata (OpenID Connect Discovery 1.0 Section 3)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiscoveryDocument {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub jwks_uri: String,
    pub userinfo_endpoint: String,
    pub response_types_supported: Vec<String>,
    pub subject_types_supported: Vec<String>,
    pub id_token_signing_alg_values_supported: Vec<String>,
    pub scopes_supported: Vec<String>,
    pub token_endpoint_auth_methods_supported: Vec<String>,
    pub claims_supported: Vec<String>,
    pub grant_types_supported: Vec<String>,
}

impl OidcServer {
    pub async fn discovery(&self) -> Result<DiscoveryDocument, SignerError> {
        let config = self.config();
        let alg = self.signer.signer_alg().await?;

        let mut grant_types = vec!["authorization_code".to_string()];
        if config
            .supported_response_types
            .iter()
            .any(|rt| matches!(rt, ResponseType::Token | ResponseType::IdToken))
        {
            grant_types.push("implicit".to_string());
        }

        Ok(DiscoveryDocument {
            issuer: config.issuer_str(),
            authorization_endpoint: config.abs_url("/auth"),
            token_endpoint: config.abs_url("/token"),
            jwks_uri: config.abs_url("/keys"),
            userinfo_endpoint: config.abs_url("/userinfo"),
            response_types_supported: config
                .supported_response_types
                .iter()
                .map(|rt| rt.to_string())
                .collect(),
            subject_types_supported: vec!["public".to_string()],
            id_token_signing_alg_values_supported: vec![alg],
            scopes_supported: ["openid", "email", "profile", "groups", "federated:id"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            token_endpoint_auth_methods_supported: vec![
                "client_secret_basic".to_string(),
                "client_secret_post".to_string(),
            ],
            claims_supported: [
                "aud",
                "email",
                "email_verified",
                "exp",
                "groups",
                "iat",
                "iss",
                "name",
                "sub",
                "federated_claims",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            grant_types_supported: grant_types,
        })
    }

    pub async fn keys(&self) -> Result<JsonWebKeySet, SignerError> {
        self.signer.public_keys().await
    }
}
