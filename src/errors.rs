//! Standardized error types following the `error-oidc-<domain>-<number>` format.

use axum::response::{IntoResponse, Response};
use http::StatusCode;
use thiserror::Error;

/// Configuration errors that occur during application startup
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Error when a required environment variable is not set
    #[error("error-oidc-config-1 {0} must be set")]
    EnvVarRequired(String),

    /// Error when PORT cannot be parsed
    #[error("error-oidc-config-2 Parsing PORT into u16 failed: {0:?}")]
    PortParsingFailed(std::num::ParseIntError),

    /// Error when version information is not available
    #[error("error-oidc-config-3 One of GIT_HASH or CARGO_PKG_VERSION must be set")]
    VersionNotSet,

    /// Error when duration string cannot be parsed
    #[error("error-oidc-config-4 Failed to parse duration '{0}': {1}")]
    DurationParsingFailed(String, String),

    /// Error when boolean string cannot be parsed
    #[error(
        "error-oidc-config-5 Failed to parse boolean '{0}': expected true/false/1/0/yes/no/on/off"
    )]
    BoolParsingFailed(String),

    /// Error when the issuer is not an absolute http(s) URL
    #[error("error-oidc-config-6 Invalid issuer URL: {0}")]
    InvalidIssuer(String),

    /// Error when a configured response type is not one of code, token or id_token
    #[error("error-oidc-config-7 Unsupported response type: {0}")]
    UnsupportedResponseType(String),

    /// Error when no response types are configured
    #[error("error-oidc-config-8 At least one response type must be supported")]
    NoResponseTypes,

    /// Error when a validity period is zero or negative
    #[error("error-oidc-config-9 Validity for {0} must be positive")]
    InvalidValidity(String),

    /// Error when a connector name is not known
    #[error("error-oidc-config-10 Unknown connector: {0}")]
    UnknownConnector(String),

    /// Error when two connectors share an id
    #[error("error-oidc-config-11 Duplicate connector id: {0}")]
    DuplicateConnector(String),

    /// Error when a connector rejects its initialization
    #[error("error-oidc-config-12 Connector '{0}' failed to initialize: {1}")]
    ConnectorInitFailed(String, String),

    /// Error when the client directory cannot be loaded
    #[error("error-oidc-config-13 Failed to load clients: {0}")]
    ClientsLoadFailed(String),

    /// Error when the storage backend name is not recognized
    #[error("error-oidc-config-14 Unsupported storage backend: {0}")]
    UnsupportedStorageBackend(String),

    /// Error when a validity period exceeds the allowed maximum
    #[error("error-oidc-config-15 Validity for {0} must not exceed {1} days")]
    ValidityTooLong(String, i64),

    /// Error when authorization codes would outlive their requests
    #[error("error-oidc-config-16 Authorization codes must not be valid longer than authorization requests")]
    CodeOutlivesRequest,
}

/// HTTP server errors
#[derive(Debug, Error)]
pub enum HttpError {
    /// Error when template rendering fails
    #[error("error-oidc-http-1 Template rendering failed: {0}")]
    TemplateRenderingFailed(String),

    /// Error when the listening socket cannot be bound
    #[error("error-oidc-http-2 Failed to bind {0}: {1}")]
    BindFailed(String, String),
}

/// OAuth 2.0 and OpenID Connect protocol errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OAuthError {
    /// Malformed or missing parameters
    #[error("error-oidc-oauth-1 Invalid request: {0}")]
    InvalidRequest(String),

    /// Client id does not resolve to a registered client
    #[error("error-oidc-oauth-2 Unknown client: {0}")]
    UnknownClient(String),

    /// Client is not allowed to use the requested grant
    #[error("error-oidc-oauth-3 Unauthorized client: {0}")]
    UnauthorizedClient(String),

    /// Redirect URI is not registered for the client
    #[error("error-oidc-oauth-4 Invalid redirect URI: {0}")]
    InvalidRedirectUri(String),

    /// Response type is not supported by this server
    #[error("error-oidc-oauth-5 Unsupported response type: {0}")]
    UnsupportedResponseType(String),

    /// Scope is malformed or unknown
    #[error("error-oidc-oauth-6 Invalid scope: {0}")]
    InvalidScope(String),

    /// End user declined the request
    #[error("error-oidc-oauth-7 Access denied: {0}")]
    AccessDenied(String),

    /// Code is expired, consumed or bound to another client
    #[error("error-oidc-oauth-8 Invalid grant: {0}")]
    InvalidGrant(String),

    /// Client authentication failed at the token endpoint
    #[error("error-oidc-oauth-9 Invalid client credentials: {0}")]
    InvalidClient(String),

    /// Grant type other than authorization_code
    #[error("error-oidc-oauth-10 Unsupported grant type: {0}")]
    UnsupportedGrantType(String),

    /// Bearer token failed verification
    #[error("error-oidc-oauth-11 Invalid token: {0}")]
    InvalidToken(String),

    /// Connector id does not name a configured connector
    #[error("error-oidc-oauth-12 Unknown connector: {0}")]
    UnknownConnector(String),

    /// Storage or signer failure
    #[error("error-oidc-oauth-13 Server error: {0}")]
    ServerError(String),
}

impl OAuthError {
    /// The RFC 6749 `error` code for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            OAuthError::InvalidRequest(_) | OAuthError::UnknownConnector(_) => "invalid_request",
            OAuthError::UnknownClient(_) | OAuthError::UnauthorizedClient(_) => {
                "unauthorized_client"
            }
            OAuthError::InvalidRedirectUri(_) => "invalid_request",
            OAuthError::UnsupportedResponseType(_) => "unsupported_response_type",
            OAuthError::InvalidScope(_) => "invalid_scope",
            OAuthError::AccessDenied(_) => "access_denied",
            OAuthError::InvalidGrant(_) => "invalid_grant",
            OAuthError::InvalidClient(_) => "invalid_client",
            OAuthError::UnsupportedGrantType(_) => "unsupported_grant_type",
            OAuthError::InvalidToken(_) => "invalid_token",
            OAuthError::ServerError(_) => "server_error",
        }
    }

    /// Human readable text for `error_description`.
    pub fn description(&self) -> &str {
        match self {
            OAuthError::InvalidRequest(d)
            | OAuthError::UnknownClient(d)
            | OAuthError::UnauthorizedClient(d)
            | OAuthError::InvalidRedirectUri(d)
            | OAuthError::UnsupportedResponseType(d)
            | OAuthError::InvalidScope(d)
            | OAuthError::AccessDenied(d)
            | OAuthError::InvalidGrant(d)
            | OAuthError::InvalidClient(d)
            | OAuthError::UnsupportedGrantType(d)
            | OAuthError::InvalidToken(d)
            | OAuthError::UnknownConnector(d)
            | OAuthError::ServerError(d) => d,
        }
    }

    /// HTTP status used when the error is returned directly.
    pub fn status_code(&self) -> StatusCode {
        match self {
            OAuthError::InvalidClient(_) | OAuthError::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            OAuthError::AccessDenied(_) => StatusCode::FORBIDDEN,
            OAuthError::UnknownConnector(_) => StatusCode::NOT_FOUND,
            OAuthError::ServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<StorageError> for OAuthError {
    fn from(err: StorageError) -> Self {
        tracing::error!(error = ?err, "storage failure");
        OAuthError::ServerError("storage failure".to_string())
    }
}

impl From<SignerError> for OAuthError {
    fn from(err: SignerError) -> Self {
        tracing::error!(error = ?err, "signer failure");
        OAuthError::ServerError("signing failure".to_string())
    }
}

impl From<ClientError> for OAuthError {
    fn from(err: ClientError) -> Self {
        tracing::error!(error = ?err, "client source failure");
        OAuthError::ServerError("client lookup failure".to_string())
    }
}

/// An error raised while driving a browser through the authorization flow.
///
/// Errors raised before the redirect URI is trusted are `Direct` and are shown
/// to the user agent. Everything after that point is `Redirect` and travels
/// back to the client together with the request's `state`.
#[derive(Debug, Clone, Error)]
pub enum AuthorizeError {
    #[error("{0}")]
    Direct(OAuthError),

    #[error("{error}")]
    Redirect {
        redirect_uri: String,
        state: Option<String>,
        fragment: bool,
        error: OAuthError,
    },
}

impl AuthorizeError {
    /// Build a redirect error, falling back to a direct error for the
    /// out-of-band URN which has nowhere to redirect to.
    pub fn redirect(
        redirect_uri: &str,
        state: Option<&str>,
        fragment: bool,
        error: OAuthError,
    ) -> Self {
        if redirect_uri == crate::oauth::clients::OOB_REDIRECT_URI {
            return AuthorizeError::Direct(error);
        }
        AuthorizeError::Redirect {
            redirect_uri: redirect_uri.to_string(),
            state: state.map(str::to_string),
            fragment,
            error,
        }
    }

    /// The protocol error carried by either variant.
    pub fn oauth_error(&self) -> &OAuthError {
        match self {
            AuthorizeError::Direct(error) => error,
            AuthorizeError::Redirect { error, .. } => error,
        }
    }

    /// Location for a redirect error with `error`, `error_description` and `state` appended.
    pub fn redirect_url(&self) -> Option<String> {
        match self {
            AuthorizeError::Direct(_) => None,
            AuthorizeError::Redirect {
                redirect_uri,
                state,
                fragment,
                error,
            } => {
                let mut params = vec![
                    ("error", error.error_code().to_string()),
                    ("error_description", error.description().to_string()),
                ];
                if let Some(state) = state {
                    params.push(("state", state.clone()));
                }
                crate::oauth::types::append_params(redirect_uri, &params, *fragment).ok()
            }
        }
    }
}

/// Signing and verification errors
#[derive(Debug, Error)]
pub enum SignerError {
    /// No signing keys were configured
    #[error("error-oidc-signer-1 No signing keys configured")]
    NoSigningKeys,

    /// Key type cannot sign JWS
    #[error("error-oidc-signer-2 Unsupported key type: {0}")]
    UnsupportedKeyType(String),

    /// Key material could not be processed
    #[error("error-oidc-signer-3 Key processing failed: {0}")]
    KeyFailed(String),

    /// Signing operation failed
    #[error("error-oidc-signer-4 Signing failed: {0}")]
    SigningFailed(String),

    /// Token is not a well formed compact JWS
    #[error("error-oidc-signer-5 Malformed token: {0}")]
    MalformedToken(String),

    /// Signature did not verify against any published key
    #[error("error-oidc-signer-6 Signature verification failed")]
    VerificationFailed,
}

/// Connector errors
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// Connector was used before `initialize`
    #[error("error-oidc-connector-1 Connector '{0}' is not initialized")]
    NotInitialized(String),

    /// Connector was initialized twice
    #[error("error-oidc-connector-2 Connector '{0}' is already initialized")]
    AlreadyInitialized(String),

    /// Backend login failed
    #[error("error-oidc-connector-3 Login failed: {0}")]
    LoginFailed(String),

    /// Connector does not complete logins through the callback route
    #[error("error-oidc-connector-4 Connector '{0}' does not handle callbacks")]
    CallbackUnsupported(String),

    /// Reporting the identity back to the server failed
    #[error(transparent)]
    Flow(#[from] AuthorizeError),
}

/// Client directory errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// Client metadata is invalid
    #[error("error-oidc-client-1 Invalid client metadata: {0}")]
    InvalidClientMetadata(String),

    /// Client directory could not be read
    #[error("error-oidc-client-2 Client source failed: {0}")]
    SourceFailed(String),
}

/// Database/storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Error when database connection fails
    #[error("error-oidc-storage-1 Database connection failed: {0}")]
    ConnectionFailed(String),

    /// Error when query execution fails
    #[error("error-oidc-storage-2 Query execution failed: {0}")]
    QueryFailed(String),

    /// Error when data serialization fails
    #[error("error-oidc-storage-3 Data serialization failed: {0}")]
    SerializationFailed(String),

    /// Error when database operation fails
    #[error("error-oidc-storage-4 Database error: {0}")]
    DatabaseError(String),

    /// Error when data validation fails
    #[error("error-oidc-storage-5 Invalid data: {0}")]
    InvalidData(String),

    /// Error when a record with the same key already exists
    #[error("error-oidc-storage-6 Already exists: {0}")]
    AlreadyExists(String),
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        tracing::error!(error = ?self, "internal server error");
        (StatusCode::INTERNAL_SERVER_ERROR).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_error_carries_state_in_query() {
        let err = AuthorizeError::redirect(
            "https://app.example/cb",
            Some("xyz"),
            false,
            OAuthError::AccessDenied("user declined".to_string()),
        );
        let url = err.redirect_url().unwrap();
        assert!(url.starts_with("https://app.example/cb?"));
        assert!(url.contains("error=access_denied"));
        assert!(url.contains("state=xyz"));
    }

    #[test]
    fn test_redirect_error_uses_fragment() {
        let err = AuthorizeError::redirect(
            "http://127.0.0.1:5000/cb",
            Some("s 1"),
            true,
            OAuthError::InvalidRequest("nonce required".to_string()),
        );
        let url = err.redirect_url().unwrap();
        assert!(url.starts_with("http://127.0.0.1:5000/cb#"));
        assert!(url.contains("error=invalid_request"));
        assert!(url.contains("state=s+1"));
    }

    #[test]
    fn test_oob_redirect_error_becomes_direct() {
        let err = AuthorizeError::redirect(
            crate::oauth::clients::OOB_REDIRECT_URI,
            Some("xyz"),
            false,
            OAuthError::AccessDenied("no".to_string()),
        );
        assert!(matches!(err, AuthorizeError::Direct(_)));
        assert!(err.redirect_url().is_none());
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            OAuthError::InvalidGrant("x".to_string()).error_code(),
            "invalid_grant"
        );
        assert_eq!(
            OAuthError::UnsupportedResponseType("x".to_string()).error_code(),
            "unsupported_response_type"
        );
        assert_eq!(
            OAuthError::ServerError("x".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
