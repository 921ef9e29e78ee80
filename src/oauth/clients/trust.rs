//! Client trust decisions: client resolution, redirect URI binding, secret
//! verification and cross-client audience expansion.

use sha2::{Digest, Sha256};
use std::sync::Arc;
use url::{Host, Url};

use super::{Client, ClientSource, OOB_REDIRECT_URI};
use crate::errors::ClientError;
use crate::oauth::scopes::Scope;

#[derive(Clone)]
pub struct ClientTrustResolver {
    source: Arc<dyn ClientSource>,
}

impl ClientTrustResolver {
    pub fn new(source: Arc<dyn ClientSource>) -> Self {
        Self { source }
    }

    pub async fn resolve(&self, client_id: &str) -> Result<Option<Client>, ClientError> {
        if client_id.is_empty() {
            return Ok(None);
        }
        self.source.get_client(client_id).await
    }

    /// Exact match against registered URIs. Public clients may also use any
    /// loopback `http` URI on any port, or the out-of-band URN.
    pub fn validate_redirect_uri(&self, client: &Client, redirect_uri: &str) -> bool {
        if client.redirect_uris.iter().any(|uri| uri == redirect_uri) {
            return true;
        }
        if !client.public {
            return false;
        }
        if redirect_uri == OOB_REDIRECT_URI {
            return true;
        }
        is_loopback_uri(redirect_uri)
    }

    /// Check a confidential client's secret. Public clients always pass.
    pub fn authenticate(&self, client: &Client, presented_secret: Option<&str>) -> bool {
        if client.public {
            return true;
        }
        match (client.secret.as_deref(), presented_secret) {
            (Some(expected), Some(presented)) => constant_time_eq(expected, presented),
            _ => false,
        }
    }

    /// Audience for tokens issued to `client`. Always starts with the client
    /// itself; each cross-client scope adds its peer only when the peer lists
    /// `client` as trusted. Unknown or untrusting peers are skipped.
    pub async fn expand_audience(
        &self,
        client: &Client,
        scopes: &[Scope],
    ) -> Result<Vec<String>, ClientError> {
        let mut audience = vec![client.id.clone()];
        for peer_id in scopes.iter().filter_map(Scope::peer) {
            if audience.iter().any(|aud| aud == peer_id) {
                continue;
            }
            match self.source.get_client(peer_id).await? {
                Some(peer) if peer.trusts(&client.id) => {
                    audience.push(peer.id);
                }
                Some(_) => {
                    tracing::warn!(
                        client_id = %client.id,
                        peer_id = %peer_id,
                        "peer does not trust client, dropping from audience"
                    );
                }
                None => {
                    tracing::warn!(
                        client_id = %client.id,
                        peer_id = %peer_id,
                        "unknown peer in cross-client scope"
                    );
                }
            }
        }
        Ok(audience)
    }
}

fn is_loopback_uri(redirect_uri: &str) -> bool {
    let Ok(url) = Url::parse(redirect_uri) else {
        return false;
    };
    if url.scheme() != "http" {
        return false;
    }
    match url.host() {
        Some(Host::Ipv4(ip)) => ip.is_loopback(),
        Some(Host::Ipv6(ip)) => ip.is_loopback(),
        Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
        None => false,
    }
}

/// Compares fixed size digests so timing depends on neither input's content nor length.
fn constant_time_eq(expected: &str, presented: &str) -> bool {
    let a = Sha256::digest(expected.as_bytes());
    let b = Sha256::digest(presented.as_bytes());
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oauth::clients::StaticClientSource;

    fn resolver() -> ClientTrustResolver {
        let source = StaticClientSource::new(vec![
            Client {
                id: "A".to_string(),
                secret: Some("secret-a".to_string()),
                redirect_uris: vec!["https://app.example/cb".to_string()],
                trusted_peers: vec!["B".to_string()],
                name: "App A".to_string(),
                ..Default::default()
            },
            Client {
                id: "B".to_string(),
                public: true,
                ..Default::default()
            },
            Client {
                id: "C".to_string(),
                secret: Some("secret-c".to_string()),
                redirect_uris: vec!["https://c.example/cb".to_string()],
                ..Default::default()
            },
        ])
        .unwrap();
        ClientTrustResolver::new(Arc::new(source))
    }

    #[tokio::test]
    async fn test_redirect_uri_exact_match_only_for_confidential() {
        let resolver = resolver();
        let a = resolver.resolve("A").await.unwrap().unwrap();
        assert!(resolver.validate_redirect_uri(&a, "https://app.example/cb"));
        assert!(!resolver.validate_redirect_uri(&a, "https://app.example/cb/"));
        assert!(!resolver.validate_redirect_uri(&a, "http://127.0.0.1:9000/cb"));
        assert!(!resolver.validate_redirect_uri(&a, OOB_REDIRECT_URI));
    }

    #[tokio::test]
    async fn test_public_client_loopback_and_oob() {
        let resolver = resolver();
        let b = resolver.resolve("B").await.unwrap().unwrap();
        assert!(resolver.validate_redirect_uri(&b, "http://127.0.0.1:9000/cb"));
        assert!(resolver.validate_redirect_uri(&b, "http://127.0.0.1:5000/cb"));
        assert!(resolver.validate_redirect_uri(&b, "http://[::1]:8080/"));
        assert!(resolver.validate_redirect_uri(&b, "http://localhost:1234/done"));
        assert!(resolver.validate_redirect_uri(&b, OOB_REDIRECT_URI));
        assert!(!resolver.validate_redirect_uri(&b, "http://evil.example/cb"));
        assert!(!resolver.validate_redirect_uri(&b, "https://app.example/cb"));
        assert!(!resolver.validate_redirect_uri(&b, "http://127.0.0.1.evil.example/cb"));
    }

    #[tokio::test]
    async fn test_audience_includes_trusting_peer() {
        let resolver = resolver();
        let b = resolver.resolve("B").await.unwrap().unwrap();
        let audience = resolver
            .expand_audience(&b, &[Scope::OpenId, Scope::CrossClient("A".to_string())])
            .await
            .unwrap();
        assert_eq!(audience, vec!["B".to_string(), "A".to_string()]);
    }

    #[tokio::test]
    async fn test_audience_drops_untrusting_and_unknown_peers() {
        let resolver = resolver();
        let b = resolver.resolve("B").await.unwrap().unwrap();
        let audience = resolver
            .expand_audience(
                &b,
                &[
                    Scope::CrossClient("C".to_string()),
                    Scope::CrossClient("missing".to_string()),
                ],
            )
            .await
            .unwrap();
        assert_eq!(audience, vec!["B".to_string()]);
    }

    #[tokio::test]
    async fn test_client_is_its_own_peer() {
        let resolver = resolver();
        let c = resolver.resolve("C").await.unwrap().unwrap();
        let audience = resolver
            .expand_audience(&c, &[Scope::CrossClient("C".to_string())])
            .await
            .unwrap();
        assert_eq!(audience, vec!["C".to_string()]);
    }

    #[tokio::test]
    async fn test_authenticate() {
        let resolver = resolver();
        let a = resolver.resolve("A").await.unwrap().unwrap();
        let b = resolver.resolve("B").await.unwrap().unwrap();
        assert!(resolver.authenticate(&a, Some("secret-a")));
        assert!(!resolver.authenticate(&a, Some("secret-c")));
        assert!(!resolver.authenticate(&a, None));
        assert!(resolver.authenticate(&b, None));
        assert!(resolver.resolve("").await.unwrap().is_none());
    }
}
