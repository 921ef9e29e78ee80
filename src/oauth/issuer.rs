//! Token issuance: finalizing approved requests, redeeming authorization
//! codes, and serving user info from access tokens.

use chrono::{DateTime, Utc};

use crate::errors::{AuthorizeError, OAuthError, SignerError};
use crate::oauth::clients::OOB_REDIRECT_URI;
use crate::oauth::openid::OpenIDClaims;
use crate::oauth::scopes::{Scope, parse_stored_scopes};
use crate::oauth::server::OidcServer;
use crate::oauth::types::{
    AuthorizationCode, Identity, ResponseType, TokenResponse, TokenType, append_params,
    generate_token,
};

/// Client credentials presented at the token endpoint.
#[derive(Debug, Clone, Default)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: Option<String>,
}

/// Identity snapshot the tokens are minted from.
struct Grant<'a> {
    identity: &'a Identity,
    connector_id: &'a str,
    audience: &'a [String],
    scopes: &'a [Scope],
    nonce: Option<String>,
}

struct SignedTokens {
    access_token: Option<String>,
    id_token: Option<String>,
    expires_in: i64,
}

impl OidcServer {
    /// Consume an approved request and build the client redirect carrying
    /// the code and/or tokens.
    pub async fn finalize(&self, request_id: &str) -> Result<String, AuthorizeError> {
        let now = self.now();
        let not_found = || {
            AuthorizeError::Direct(OAuthError::InvalidRequest(
                "authorization request not found or expired".to_string(),
            ))
        };

        let pending = self
            .storage
            .get_authorization_request(request_id, now)
            .await
            .map_err(|e| AuthorizeError::Direct(e.into()))?
            .ok_or_else(not_found)?;
        if pending.identity.is_none() || !pending.approved {
            return Err(AuthorizeError::Direct(OAuthError::InvalidRequest(
                "authorization request is not approved".to_string(),
            )));
        }

        let request = self
            .storage
            .consume_authorization_request(request_id, now)
            .await
            .map_err(|e| pending.redirect_error(e.into()))?
            .ok_or_else(not_found)?;
        let identity = request.identity.as_ref().ok_or_else(not_found)?;

        let client = self
            .clients
            .resolve(&request.client_id)
            .await
            .map_err(|e| request.redirect_error(e.into()))?
            .ok_or_else(|| {
                AuthorizeError::Direct(OAuthError::UnknownClient(request.client_id.clone()))
            })?;

        let scopes = parse_stored_scopes(&request.scopes);
        let audience = self
            .clients
            .expand_audience(&client, &scopes)
            .await
            .map_err(|e| request.redirect_error(e.into()))?;

        let mut params: Vec<(&str, String)> = Vec::new();

        let code = if request.wants(ResponseType::Code) {
            let expires_at = self
                .expiry(now, self.config().auth_codes_valid_for)
                .map_err(|e| request.redirect_error(e))?;
            let code = AuthorizationCode {
                code: generate_token(),
                client_id: request.client_id.clone(),
                redirect_uri: request.redirect_uri.clone(),
                nonce: request.nonce.clone(),
                scopes: request.scopes.clone(),
                audience: audience.clone(),
                identity: identity.clone(),
                connector_id: request.connector_id.clone(),
                created_at: now,
                expires_at,
            };
            self.storage
                .store_code(&code)
                .await
                .map_err(|e| request.redirect_error(e.into()))?;
            params.push(("code", code.code.clone()));
            Some(code.code)
        } else {
            None
        };

        if request.redirect_uri == OOB_REDIRECT_URI {
            let code = code.ok_or_else(|| {
                AuthorizeError::Direct(OAuthError::InvalidRequest(
                    "the out-of-band redirect URI requires a code".to_string(),
                ))
            })?;
            let mut query = url::form_urlencoded::Serializer::new(String::new());
            query.append_pair("code", &code);
            return Ok(self.config().abs_url(&format!("/oob?{}", query.finish())));
        }

        let grant = Grant {
            identity,
            connector_id: &request.connector_id,
            audience: &audience,
            scopes: &scopes,
            nonce: request.nonce.clone(),
        };
        let tokens = self
            .sign_tokens(
                &grant,
                request.wants(ResponseType::Token),
                request.wants(ResponseType::IdToken),
                code.as_deref(),
                now,
            )
            .await
            .map_err(|e| request.redirect_error(e.into()))?;

        if let Some(access_token) = tokens.access_token {
            params.push(("access_token", access_token));
            params.push(("token_type", "bearer".to_string()));
            params.push(("expires_in", tokens.expires_in.to_string()));
        }
        if let Some(id_token) = tokens.id_token {
            params.push(("id_token", id_token));
        }
        if let Some(state) = &request.state {
            params.push(("state", state.clone()));
        }

        tracing::info!(
            request_id = %request.id,
            client_id = %request.client_id,
            response_types = ?request.response_types,
            "authorization request finalized"
        );

        append_params(&request.redirect_uri, &params, request.uses_fragment())
            .map_err(AuthorizeError::Direct)
    }

    /// Redeem an authorization code (RFC 6749 Section 4.1.3).
    ///
    /// The client is authenticated before the code is touched, so bad
    /// credentials never burn a code.
    pub async fn exchange(
        &self,
        code: &str,
        redirect_uri: Option<&str>,
        credentials: &ClientCredentials,
    ) -> Result<TokenResponse, OAuthError> {
        let client = self
            .clients
            .resolve(&credentials.client_id)
            .await?
            .ok_or_else(|| OAuthError::InvalidClient("client authentication failed".to_string()))?;
        if !self
            .clients
            .authenticate(&client, credentials.client_secret.as_deref())
        {
            tracing::warn!(client_id = %client.id, "client authentication failed");
            return Err(OAuthError::InvalidClient(
                "client authentication failed".to_string(),
            ));
        }

        if code.is_empty() {
            return Err(OAuthError::InvalidRequest("missing code".to_string()));
        }
        let redirect_uri = redirect_uri
            .filter(|uri| !uri.is_empty())
            .ok_or_else(|| OAuthError::InvalidRequest("missing redirect_uri".to_string()))?;

        let now = self.now();
        let code = self
            .storage
            .consume_code(code, now)
            .await?
            .ok_or_else(|| OAuthError::InvalidGrant("invalid or expired code".to_string()))?;

        if code.client_id != client.id {
            tracing::warn!(
                client_id = %client.id,
                code_client_id = %code.client_id,
                "code presented by another client"
            );
            return Err(OAuthError::InvalidGrant("invalid or expired code".to_string()));
        }
        if code.redirect_uri != redirect_uri {
            return Err(OAuthError::InvalidGrant(
                "redirect_uri did not match the authorization request".to_string(),
            ));
        }

        let scopes = parse_stored_scopes(&code.scopes);
        let grant = Grant {
            identity: &code.identity,
            connector_id: &code.connector_id,
            audience: &code.audience,
            scopes: &scopes,
            nonce: code.nonce.clone(),
        };
        let tokens = self.sign_tokens(&grant, true, true, None, now).await?;
        let access_token = tokens
            .access_token
            .ok_or_else(|| OAuthError::ServerError("access token not issued".to_string()))?;

        tracing::info!(client_id = %client.id, "authorization code redeemed");

        Ok(TokenResponse {
            access_token,
            token_type: TokenType::Bearer,
            expires_in: tokens.expires_in,
            id_token: tokens.id_token,
        })
    }

    /// Claims for the bearer of a valid access token (OIDC Core Section 5.3).
    pub async fn userinfo(&self, access_token: &str) -> Result<serde_json::Value, OAuthError> {
        let payload = self
            .signer
            .verify_signature(access_token)
            .await
            .map_err(|e| OAuthError::InvalidToken(e.to_string()))?;
        let claims: OpenIDClaims = serde_json::from_slice(&payload)
            .map_err(|e| OAuthError::InvalidToken(format!("malformed claims: {}", e)))?;

        if !claims.is_access_token() {
            return Err(OAuthError::InvalidToken("not an access token".to_string()));
        }
        if claims.iss != self.config().issuer_str() {
            return Err(OAuthError::InvalidToken("token issued elsewhere".to_string()));
        }
        let now = self.now().timestamp();
        if now < claims.iat || now >= claims.exp {
            return Err(OAuthError::InvalidToken("token is expired".to_string()));
        }

        Ok(claims.into_userinfo())
    }

    async fn sign_tokens(
        &self,
        grant: &Grant<'_>,
        access_token: bool,
        id_token: bool,
        code: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<SignedTokens, OAuthError> {
        let alg = self.signer.signer_alg().await?;
        let expires_at = self.expiry(now, self.config().id_tokens_valid_for)?;
        let claims = OpenIDClaims::new(
            &self.config().issuer_str(),
            grant.identity,
            grant.connector_id,
            grant.audience,
            grant.scopes,
            now.timestamp(),
            expires_at.timestamp(),
        );

        let access_token = if access_token {
            Some(self.sign_claims(&claims.clone().for_access_token()).await?)
        } else {
            None
        };

        let id_token = if id_token {
            let mut id_claims = claims.with_nonce(grant.nonce.clone());
            if let Some(token) = &access_token {
                id_claims = id_claims.with_at_hash(&alg, token);
            }
            if let Some(code) = code {
                id_claims = id_claims.with_c_hash(&alg, code);
            }
            Some(self.sign_claims(&id_claims).await?)
        } else {
            None
        };

        Ok(SignedTokens {
            access_token,
            id_token,
            expires_in: self.config().id_tokens_valid_for.num_seconds(),
        })
    }

    async fn sign_claims(&self, claims: &OpenIDClaims) -> Result<String, SignerError> {
        let payload =
            serde_json::to_vec(claims).map_err(|e| SignerError::SigningFailed(e.to_string()))?;
        self.signer.sign(&payload).await
    }
}
