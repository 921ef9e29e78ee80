//! OAuth client registrations and client trust decisions.
//!
//! Clients are provisioned out of band through a [`ClientSource`]; the
//! [`ClientTrustResolver`] decides redirect URI legality and cross-client
//! audience expansion.

pub mod source;
pub mod trust;

use serde::{Deserialize, Serialize};

pub use source::{ClientSource, StaticClientSource};
pub use trust::ClientTrustResolver;

/// Out-of-band redirect URI for clients that cannot receive a redirect.
pub const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

/// A registered OAuth client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Client {
    pub id: String,

    /// Only set for confidential clients
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    #[serde(rename = "redirectURIs", default)]
    pub redirect_uris: Vec<String>,

    /// Clients allowed to request tokens whose audience is this client
    #[serde(rename = "trustedPeers", default)]
    pub trusted_peers: Vec<String>,

    #[serde(default)]
    pub public: bool,

    #[serde(default)]
    pub name: String,

    #[serde(rename = "logoURL", default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
}

impl Client {
    /// Name shown to end users, falling back to the client id.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    pub fn trusts(&self, peer_id: &str) -> bool {
        self.id == peer_id || self.trusted_peers.iter().any(|p| p == peer_id)
    }
}
