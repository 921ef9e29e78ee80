//! End-to-end authorization flow tests against the in-memory backend with a
//! controllable clock.

use atproto_identity::key::{KeyType, generate_key};
use base64::prelude::*;
use chrono::{DateTime, Duration, Utc};
use serde_json::{Value, json};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use url::Url;

use crate::config::ServerConfig;
use crate::errors::{AuthorizeError, ConfigError, OAuthError};
use crate::oauth::authorize::AuthorizeQuery;
use crate::oauth::clients::{Client, OOB_REDIRECT_URI, StaticClientSource};
use crate::oauth::connectors::{Connector, LoginAction, MockConnector};
use crate::oauth::issuer::ClientCredentials;
use crate::oauth::server::OidcServer;
use crate::oauth::signer::KeyDataSigner;
use crate::oauth::types::{Identity, ResponseType};
use crate::storage::MemoryOAuthStorage;

const LOOPBACK: &str = "http://127.0.0.1:9000/cb";

struct Harness {
    server: Arc<OidcServer>,
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl Harness {
    async fn new(config: ServerConfig) -> Self {
        Self::with_connector(config, MockConnector::new("mock", identity())).await
    }

    async fn with_connector(config: ServerConfig, connector: MockConnector) -> Self {
        let now = Arc::new(Mutex::new(Utc::now()));
        let clock_now = now.clone();
        let signer = KeyDataSigner::new(&[generate_key(KeyType::P256Private).unwrap()]).unwrap();
        let server = OidcServer::with_clock(
            config,
            Arc::new(MemoryOAuthStorage::new()),
            Arc::new(signer),
            Arc::new(StaticClientSource::new(clients()).unwrap()),
            vec![Arc::new(connector) as Arc<dyn Connector>],
            Arc::new(move || *clock_now.lock().unwrap()),
        )
        .await
        .unwrap();
        Self { server, now }
    }

    fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }

    /// Begin and authenticate a request, returning where the browser goes next.
    async fn login(&self, query: &AuthorizeQuery) -> Result<String, AuthorizeError> {
        let request = self.server.begin("mock", query).await?;
        self.server.complete("mock", &request.id, identity()).await
    }
}

fn identity() -> Identity {
    Identity {
        user_id: "u1".to_string(),
        username: "Jane Doe".to_string(),
        email: Some("jane@example.com".to_string()),
        email_verified: true,
        groups: vec!["admins".to_string()],
        ..Default::default()
    }
}

fn clients() -> Vec<Client> {
    vec![
        Client {
            id: "cli".to_string(),
            public: true,
            name: "Command Line".to_string(),
            ..Default::default()
        },
        Client {
            id: "app".to_string(),
            secret: Some("app-secret".to_string()),
            redirect_uris: vec!["https://app.example/cb".to_string()],
            name: "Example App".to_string(),
            ..Default::default()
        },
        Client {
            id: "A".to_string(),
            secret: Some("a-secret".to_string()),
            redirect_uris: vec!["https://a.example/cb".to_string()],
            trusted_peers: vec!["cli".to_string()],
            ..Default::default()
        },
        Client {
            id: "C".to_string(),
            secret: Some("c-secret".to_string()),
            redirect_uris: vec!["https://c.example/cb".to_string()],
            ..Default::default()
        },
    ]
}

fn config(skip_approval: bool, response_types: &[ResponseType]) -> ServerConfig {
    let mut config = ServerConfig::new("https://auth.example/oidc").unwrap();
    config.skip_approval = skip_approval;
    config.supported_response_types = response_types.iter().copied().collect::<BTreeSet<_>>();
    config
}

fn query(client_id: &str, response_type: &str, scope: &str, redirect_uri: &str) -> AuthorizeQuery {
    AuthorizeQuery {
        client_id: Some(client_id.to_string()),
        response_type: Some(response_type.to_string()),
        scope: Some(scope.to_string()),
        redirect_uri: Some(redirect_uri.to_string()),
        state: Some("xyz".to_string()),
        nonce: None,
    }
}

fn public_credentials() -> ClientCredentials {
    ClientCredentials {
        client_id: "cli".to_string(),
        client_secret: None,
    }
}

/// Parameter from either the query or the fragment of `url`.
fn param(url: &str, name: &str) -> Option<String> {
    let url = Url::parse(url).unwrap();
    let fragment = url.fragment().unwrap_or_default().to_string();
    url.query_pairs()
        .chain(url::form_urlencoded::parse(fragment.as_bytes()))
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

fn jwt_claims(token: &str) -> Value {
    let payload = token.split('.').nth(1).unwrap();
    serde_json::from_slice(&BASE64_URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap()
}

fn direct_error(result: Result<impl std::fmt::Debug, AuthorizeError>) -> OAuthError {
    match result {
        Err(AuthorizeError::Direct(error)) => error,
        other => panic!("expected a direct error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_public_client_loopback_code_flow() {
    let harness = Harness::new(config(true, &[ResponseType::Code])).await;

    let next = harness
        .login(&query("cli", "code", "openid", LOOPBACK))
        .await
        .unwrap();
    assert!(next.starts_with(LOOPBACK));
    assert_eq!(param(&next, "state").as_deref(), Some("xyz"));
    let code = param(&next, "code").unwrap();

    let tokens = harness
        .server
        .exchange(&code, Some(LOOPBACK), &public_credentials())
        .await
        .unwrap();
    let claims = jwt_claims(tokens.id_token.as_deref().unwrap());
    assert_eq!(claims["sub"], "u1");
    assert_eq!(claims["aud"], json!("cli"));
    assert_eq!(claims["iss"], "https://auth.example/oidc");
    assert!(claims.get("azp").is_none());
    assert!(claims.get("email").is_none());
    assert_eq!(tokens.expires_in, 24 * 60 * 60);
}

#[tokio::test]
async fn test_code_is_single_use() {
    let harness = Harness::new(config(true, &[ResponseType::Code])).await;
    let next = harness
        .login(&query("cli", "code", "openid", LOOPBACK))
        .await
        .unwrap();
    let code = param(&next, "code").unwrap();

    assert!(
        harness
            .server
            .exchange(&code, Some(LOOPBACK), &public_credentials())
            .await
            .is_ok()
    );
    assert!(matches!(
        harness
            .server
            .exchange(&code, Some(LOOPBACK), &public_credentials())
            .await,
        Err(OAuthError::InvalidGrant(_))
    ));
}

#[tokio::test]
async fn test_concurrent_exchange_has_one_winner() {
    let harness = Harness::new(config(true, &[ResponseType::Code])).await;
    let next = harness
        .login(&query("cli", "code", "openid", LOOPBACK))
        .await
        .unwrap();
    let code = param(&next, "code").unwrap();

    let credentials = public_credentials();
    let attempts = (0..8).map(|_| {
        harness
            .server
            .exchange(&code, Some(LOOPBACK), &credentials)
    });
    let results = futures::future::join_all(attempts).await;

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| matches!(e, OAuthError::InvalidGrant(_)))
    );
}

#[tokio::test]
async fn test_expiry_out_of_range_fails_without_panicking() {
    let harness = Harness::new(config(true, &[ResponseType::Code])).await;
    *harness.now.lock().unwrap() = DateTime::<Utc>::MAX_UTC - Duration::hours(1);

    let err = harness
        .server
        .begin("mock", &query("cli", "code", "openid", LOOPBACK))
        .await
        .unwrap_err();
    assert!(matches!(err.oauth_error(), OAuthError::ServerError(_)));
    let url = err.redirect_url().unwrap();
    assert_eq!(param(&url, "error").as_deref(), Some("server_error"));
    assert_eq!(param(&url, "state").as_deref(), Some("xyz"));
}

#[tokio::test]
async fn test_server_rejects_overlong_validity() {
    let mut config = config(true, &[ResponseType::Code]);
    config.auth_requests_valid_for = Duration::milliseconds(i64::MAX / 2);
    let signer = KeyDataSigner::new(&[generate_key(KeyType::P256Private).unwrap()]).unwrap();
    let result = OidcServer::new(
        config,
        Arc::new(MemoryOAuthStorage::new()),
        Arc::new(signer),
        Arc::new(StaticClientSource::new(clients()).unwrap()),
        Vec::new(),
    )
    .await;
    assert!(matches!(result, Err(ConfigError::ValidityTooLong(_, _))));
}

#[tokio::test]
async fn test_unsupported_response_type_is_redirected_with_state() {
    let harness = Harness::new(config(true, &[ResponseType::Code])).await;
    let mut q = query("cli", "token id_token", "openid", LOOPBACK);
    q.nonce = Some("n1".to_string());

    let err = harness.server.begin("mock", &q).await.unwrap_err();
    assert_eq!(err.oauth_error().error_code(), "unsupported_response_type");
    let url = err.redirect_url().unwrap();
    assert!(url.starts_with("http://127.0.0.1:9000/cb#"));
    assert_eq!(param(&url, "state").as_deref(), Some("xyz"));

    let q = query("cli", "", "openid", LOOPBACK);
    let err = harness.server.begin("mock", &q).await.unwrap_err();
    assert_eq!(err.oauth_error().error_code(), "unsupported_response_type");
}

#[tokio::test]
async fn test_pre_trust_errors_are_direct() {
    let harness = Harness::new(config(true, &[ResponseType::Code])).await;

    let error = direct_error(
        harness
            .server
            .begin("github", &query("cli", "code", "openid", LOOPBACK))
            .await,
    );
    assert!(matches!(error, OAuthError::UnknownConnector(_)));

    let error = direct_error(
        harness
            .server
            .begin("mock", &query("nobody", "code", "openid", LOOPBACK))
            .await,
    );
    assert!(matches!(error, OAuthError::UnknownClient(_)));

    let error = direct_error(
        harness
            .server
            .begin("mock", &query("cli", "code", "openid", "http://evil.example/cb"))
            .await,
    );
    assert!(matches!(error, OAuthError::InvalidRedirectUri(_)));

    let error = direct_error(
        harness
            .server
            .begin("mock", &query("app", "code", "openid", "https://app.example/other"))
            .await,
    );
    assert!(matches!(error, OAuthError::InvalidRedirectUri(_)));
}

#[tokio::test]
async fn test_invalid_scope_is_redirected() {
    let harness = Harness::new(config(true, &[ResponseType::Code])).await;
    let err = harness
        .server
        .begin("mock", &query("app", "code", "openid admin", "https://app.example/cb"))
        .await
        .unwrap_err();

    let url = err.redirect_url().unwrap();
    assert_eq!(param(&url, "error").as_deref(), Some("invalid_scope"));
    assert_eq!(param(&url, "state").as_deref(), Some("xyz"));
}

#[tokio::test]
async fn test_expired_request_is_not_found_everywhere() {
    let harness = Harness::new(config(false, &[ResponseType::Code])).await;
    let request = harness
        .server
        .begin("mock", &query("cli", "code", "openid", LOOPBACK))
        .await
        .unwrap();
    let approval = harness
        .server
        .begin("mock", &query("cli", "code", "openid", LOOPBACK))
        .await
        .unwrap();
    harness
        .server
        .complete("mock", &approval.id, identity())
        .await
        .unwrap();

    harness.advance(Duration::hours(24));

    let error = direct_error(harness.server.complete("mock", &request.id, identity()).await);
    assert!(matches!(error, OAuthError::InvalidRequest(_)));
    let error = direct_error(harness.server.request_approval(&approval.id).await);
    assert!(matches!(error, OAuthError::InvalidRequest(_)));
    let error = direct_error(harness.server.decide(&approval.id, true).await);
    assert!(matches!(error, OAuthError::InvalidRequest(_)));
    let error = direct_error(harness.server.finalize(&approval.id).await);
    assert!(matches!(error, OAuthError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_expired_code_is_rejected() {
    let harness = Harness::new(config(true, &[ResponseType::Code])).await;
    let next = harness
        .login(&query("cli", "code", "openid", LOOPBACK))
        .await
        .unwrap();
    let code = param(&next, "code").unwrap();

    harness.advance(Duration::minutes(30));
    assert!(matches!(
        harness
            .server
            .exchange(&code, Some(LOOPBACK), &public_credentials())
            .await,
        Err(OAuthError::InvalidGrant(_))
    ));
}

#[tokio::test]
async fn test_completion_cannot_be_replayed() {
    let harness = Harness::new(config(false, &[ResponseType::Code])).await;
    let request = harness
        .server
        .begin("mock", &query("cli", "code", "openid", LOOPBACK))
        .await
        .unwrap();

    let next = harness
        .server
        .complete("mock", &request.id, identity())
        .await
        .unwrap();
    assert!(next.starts_with("https://auth.example/oidc/approval?req="));

    let error = direct_error(harness.server.complete("mock", &request.id, identity()).await);
    assert!(matches!(error, OAuthError::InvalidRequest(_)));

    let error = direct_error(harness.server.complete("other", &request.id, identity()).await);
    assert!(matches!(error, OAuthError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_approval_then_code() {
    let harness = Harness::new(config(false, &[ResponseType::Code])).await;
    let request = harness
        .server
        .begin(
            "mock",
            &query("app", "code", "openid email groups", "https://app.example/cb"),
        )
        .await
        .unwrap();

    // Not approvable before authentication.
    let error = direct_error(harness.server.decide(&request.id, true).await);
    assert!(matches!(error, OAuthError::InvalidRequest(_)));

    harness
        .server
        .complete("mock", &request.id, identity())
        .await
        .unwrap();

    let prompt = harness.server.request_approval(&request.id).await.unwrap();
    assert_eq!(prompt.client_name, "Example App");
    assert_eq!(prompt.username, "Jane Doe");
    assert_eq!(prompt.scopes.len(), 2);

    let next = harness.server.decide(&request.id, true).await.unwrap();
    assert!(next.starts_with("https://app.example/cb?"));
    let code = param(&next, "code").unwrap();

    let tokens = harness
        .server
        .exchange(
            &code,
            Some("https://app.example/cb"),
            &ClientCredentials {
                client_id: "app".to_string(),
                client_secret: Some("app-secret".to_string()),
            },
        )
        .await
        .unwrap();
    let claims = jwt_claims(tokens.id_token.as_deref().unwrap());
    assert_eq!(claims["email"], "jane@example.com");
    assert_eq!(claims["email_verified"], true);
    assert_eq!(claims["groups"], json!(["admins"]));
    assert!(claims.get("name").is_none());

    // The request is gone once finalized.
    let error = direct_error(harness.server.decide(&request.id, true).await);
    assert!(matches!(error, OAuthError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_denial_redirects_access_denied() {
    let harness = Harness::new(config(false, &[ResponseType::Code])).await;
    let request = harness
        .server
        .begin("mock", &query("app", "code", "openid", "https://app.example/cb"))
        .await
        .unwrap();
    harness
        .server
        .complete("mock", &request.id, identity())
        .await
        .unwrap();

    let err = harness.server.decide(&request.id, false).await.unwrap_err();
    let url = err.redirect_url().unwrap();
    assert!(url.starts_with("https://app.example/cb?"));
    assert_eq!(param(&url, "error").as_deref(), Some("access_denied"));
    assert_eq!(param(&url, "state").as_deref(), Some("xyz"));

    let error = direct_error(harness.server.decide(&request.id, true).await);
    assert!(matches!(error, OAuthError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_trusted_peer_joins_audience() {
    let harness = Harness::new(config(true, &[ResponseType::Code])).await;

    let next = harness
        .login(&query(
            "cli",
            "code",
            "openid oauth2:server:client_id:A",
            LOOPBACK,
        ))
        .await
        .unwrap();
    let tokens = harness
        .server
        .exchange(
            &param(&next, "code").unwrap(),
            Some(LOOPBACK),
            &public_credentials(),
        )
        .await
        .unwrap();
    let claims = jwt_claims(tokens.id_token.as_deref().unwrap());
    assert_eq!(claims["aud"], json!(["cli", "A"]));
    assert_eq!(claims["azp"], "cli");

    // C does not list cli as a trusted peer.
    let next = harness
        .login(&query(
            "cli",
            "code",
            "openid oauth2:server:client_id:C",
            LOOPBACK,
        ))
        .await
        .unwrap();
    let tokens = harness
        .server
        .exchange(
            &param(&next, "code").unwrap(),
            Some(LOOPBACK),
            &public_credentials(),
        )
        .await
        .unwrap();
    let claims = jwt_claims(tokens.id_token.as_deref().unwrap());
    assert_eq!(claims["aud"], json!("cli"));
}

#[tokio::test]
async fn test_implicit_flow_uses_fragment() {
    let harness = Harness::new(config(
        true,
        &[ResponseType::Code, ResponseType::Token, ResponseType::IdToken],
    ))
    .await;
    let mut q = query("cli", "id_token token", "openid profile", LOOPBACK);

    let err = harness.server.begin("mock", &q).await.unwrap_err();
    let url = err.redirect_url().unwrap();
    assert!(url.contains('#'));
    assert_eq!(param(&url, "error").as_deref(), Some("invalid_request"));

    q.nonce = Some("n-0S6_WzA2Mj".to_string());
    let next = harness.login(&q).await.unwrap();
    let url = Url::parse(&next).unwrap();
    assert!(url.query().is_none());
    assert_eq!(param(&next, "state").as_deref(), Some("xyz"));
    assert_eq!(param(&next, "token_type").as_deref(), Some("bearer"));
    assert!(param(&next, "code").is_none());

    let id_token = param(&next, "id_token").unwrap();
    let claims = jwt_claims(&id_token);
    assert_eq!(claims["nonce"], "n-0S6_WzA2Mj");
    assert_eq!(claims["name"], "Jane Doe");
    assert!(claims["at_hash"].is_string());
    assert!(claims.get("c_hash").is_none());

    let access_token = param(&next, "access_token").unwrap();
    let userinfo = harness.server.userinfo(&access_token).await.unwrap();
    assert_eq!(userinfo["sub"], "u1");
    assert_eq!(userinfo["name"], "Jane Doe");
    assert!(userinfo.get("aud").is_none());
    assert!(userinfo.get("nonce").is_none());
}

#[tokio::test]
async fn test_hybrid_flow_carries_c_hash() {
    let harness = Harness::new(config(
        true,
        &[ResponseType::Code, ResponseType::IdToken],
    ))
    .await;
    let mut q = query("cli", "code id_token", "openid", LOOPBACK);
    q.nonce = Some("n1".to_string());

    let next = harness.login(&q).await.unwrap();
    assert!(param(&next, "code").is_some());
    let claims = jwt_claims(&param(&next, "id_token").unwrap());
    assert!(claims["c_hash"].is_string());
    assert!(claims.get("at_hash").is_none());
}

#[tokio::test]
async fn test_client_authentication_precedes_redemption() {
    let harness = Harness::new(config(true, &[ResponseType::Code])).await;
    let next = harness
        .login(&query("app", "code", "openid", "https://app.example/cb"))
        .await
        .unwrap();
    let code = param(&next, "code").unwrap();

    let wrong = ClientCredentials {
        client_id: "app".to_string(),
        client_secret: Some("guess".to_string()),
    };
    assert!(matches!(
        harness
            .server
            .exchange(&code, Some("https://app.example/cb"), &wrong)
            .await,
        Err(OAuthError::InvalidClient(_))
    ));

    // Another authenticated client cannot redeem it either, and that burns it.
    let other = ClientCredentials {
        client_id: "A".to_string(),
        client_secret: Some("a-secret".to_string()),
    };
    assert!(matches!(
        harness
            .server
            .exchange(&code, Some("https://app.example/cb"), &other)
            .await,
        Err(OAuthError::InvalidGrant(_))
    ));
}

#[tokio::test]
async fn test_redirect_uri_must_match_code() {
    let harness = Harness::new(config(true, &[ResponseType::Code])).await;
    let next = harness
        .login(&query("cli", "code", "openid", LOOPBACK))
        .await
        .unwrap();
    let code = param(&next, "code").unwrap();

    assert!(matches!(
        harness
            .server
            .exchange(&code, None, &public_credentials())
            .await,
        Err(OAuthError::InvalidRequest(_))
    ));
    assert!(matches!(
        harness
            .server
            .exchange(&code, Some("http://127.0.0.1:9001/cb"), &public_credentials())
            .await,
        Err(OAuthError::InvalidGrant(_))
    ));
}

#[tokio::test]
async fn test_out_of_band_flow() {
    let harness = Harness::new(config(
        true,
        &[ResponseType::Code, ResponseType::IdToken],
    ))
    .await;

    let next = harness
        .login(&query("cli", "code", "openid", OOB_REDIRECT_URI))
        .await
        .unwrap();
    assert!(next.starts_with("https://auth.example/oidc/oob?code="));
    let code = param(&next, "code").unwrap();
    assert!(
        harness
            .server
            .exchange(&code, Some(OOB_REDIRECT_URI), &public_credentials())
            .await
            .is_ok()
    );

    let mut q = query("cli", "code id_token", "openid", OOB_REDIRECT_URI);
    q.nonce = Some("n1".to_string());
    let error = direct_error(harness.server.begin("mock", &q).await);
    assert!(matches!(error, OAuthError::InvalidRequest(_)));
}

#[tokio::test]
async fn test_userinfo_rejects_expired_and_foreign_tokens() {
    let harness = Harness::new(config(true, &[ResponseType::Code])).await;
    let next = harness
        .login(&query("cli", "code", "openid", LOOPBACK))
        .await
        .unwrap();
    let tokens = harness
        .server
        .exchange(
            &param(&next, "code").unwrap(),
            Some(LOOPBACK),
            &public_credentials(),
        )
        .await
        .unwrap();

    assert!(harness.server.userinfo(&tokens.access_token).await.is_ok());
    assert!(matches!(
        harness.server.userinfo("a.b.c").await,
        Err(OAuthError::InvalidToken(_))
    ));

    // A validly signed ID token is not an access token.
    let id_token = tokens.id_token.as_deref().unwrap();
    assert!(matches!(
        harness.server.userinfo(id_token).await,
        Err(OAuthError::InvalidToken(_))
    ));
    assert!(jwt_claims(id_token).get("token_use").is_none());
    assert_eq!(jwt_claims(&tokens.access_token)["token_use"], "access");

    harness.advance(Duration::hours(24));
    assert!(matches!(
        harness.server.userinfo(&tokens.access_token).await,
        Err(OAuthError::InvalidToken(_))
    ));
}

#[tokio::test]
async fn test_trusted_connector_skips_approval() {
    let harness = Harness::with_connector(
        config(false, &[ResponseType::Code]),
        MockConnector::new("mock", identity()).trusted(true),
    )
    .await;

    let next = harness
        .login(&query("cli", "code", "openid", LOOPBACK))
        .await
        .unwrap();
    assert!(param(&next, "code").is_some());
}

#[tokio::test]
async fn test_authorize_dispatches_to_connector() {
    let harness = Harness::new(config(true, &[ResponseType::Code])).await;

    let action = harness
        .server
        .authorize("mock", &query("cli", "code", "openid", LOOPBACK))
        .await
        .unwrap();
    match action {
        LoginAction::Redirect(next) => assert!(param(&next, "code").is_some()),
        other => panic!("unexpected login action {:?}", other),
    }
}

#[tokio::test]
async fn test_discovery_document() {
    let harness = Harness::new(config(
        true,
        &[ResponseType::Code, ResponseType::IdToken],
    ))
    .await;

    let document = harness.server.discovery().await.unwrap();
    assert_eq!(document.issuer, "https://auth.example/oidc");
    assert_eq!(document.token_endpoint, "https://auth.example/oidc/token");
    assert_eq!(document.jwks_uri, "https://auth.example/oidc/keys");
    assert_eq!(document.response_types_supported, vec!["code", "id_token"]);
    assert_eq!(document.id_token_signing_alg_values_supported, vec!["ES256"]);
    assert_eq!(document.grant_types_supported, vec!["authorization_code", "implicit"]);

    let keys = harness.server.keys().await.unwrap();
    assert_eq!(keys.keys.len(), 1);
}

#[tokio::test]
async fn test_cleanup_expired() {
    let harness = Harness::new(config(true, &[ResponseType::Code])).await;
    harness
        .server
        .begin("mock", &query("cli", "code", "openid", LOOPBACK))
        .await
        .unwrap();
    harness
        .login(&query("cli", "code", "openid", LOOPBACK))
        .await
        .unwrap();

    assert_eq!(harness.server.cleanup_expired().await.unwrap(), (0, 0));
    harness.advance(Duration::hours(24));
    assert_eq!(harness.server.cleanup_expired().await.unwrap(), (1, 1));
}

#[tokio::test]
async fn test_duplicate_connectors_rejected() {
    let signer = KeyDataSigner::new(&[generate_key(KeyType::P256Private).unwrap()]).unwrap();
    let result = OidcServer::new(
        config(true, &[ResponseType::Code]),
        Arc::new(MemoryOAuthStorage::new()),
        Arc::new(signer),
        Arc::new(StaticClientSource::new(clients()).unwrap()),
        vec![
            Arc::new(MockConnector::new("mock", identity())) as Arc<dyn Connector>,
            Arc::new(MockConnector::new("mock", identity())),
        ],
    )
    .await;
    assert!(matches!(result, Err(ConfigError::DuplicateConnector(_))));
}
