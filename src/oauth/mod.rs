//! OpenID Connect authorization server: request validation, connector
//! handoff, approval, and token issuance.

pub mod approval;
pub mod authorize;
pub mod clients;
pub mod connectors;
pub mod discovery;
pub mod issuer;
pub mod login;
pub mod openid;
pub mod scopes;
pub mod server;
pub mod signer;
pub mod types;

#[cfg(test)]
mod flow_tests;

pub use approval::ApprovalPrompt;
pub use authorize::AuthorizeQuery;
pub use clients::{Client, ClientSource, ClientTrustResolver, StaticClientSource};
pub use connectors::{Authenticator, Connector, LoginAction, MockConnector};
pub use discovery::DiscoveryDocument;
pub use issuer::ClientCredentials;
pub use openid::OpenIDClaims;
pub use server::{Clock, OidcServer};
pub use signer::{JsonWebKeySet, KeyDataSigner, Signer};
pub use types::{
    AuthorizationCode, AuthorizationRequest, Identity, OAuthErrorResponse, ResponseType,
    TokenResponse, TokenType,
};
