//! Scope grammar for authorization requests.
//!
//! Standard OpenID Connect scopes plus the cross-client scope
//! `oauth2:server:client_id:<peer>` which asks for a token whose audience
//! includes another client.

use std::fmt;
use std::str::FromStr;

use crate::errors::OAuthError;

/// Prefix of the cross-client scope.
pub const CROSS_CLIENT_PREFIX: &str = "oauth2:server:client_id:";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    OpenId,
    Email,
    Profile,
    Groups,
    FederatedId,
    /// Request a token that the named peer client will also accept
    CrossClient(String),
}

impl Scope {
    /// Text shown to the end user on the approval page.
    pub fn description(&self) -> Option<String> {
        match self {
            Scope::OpenId => None,
            Scope::Email => Some("View your email address".to_string()),
            Scope::Profile => Some("View basic profile information".to_string()),
            Scope::Groups => Some("View your group memberships".to_string()),
            Scope::FederatedId => Some("View your identity provider account".to_string()),
            Scope::CrossClient(peer) => Some(format!("Issue tokens on behalf of {}", peer)),
        }
    }

    pub fn peer(&self) -> Option<&str> {
        match self {
            Scope::CrossClient(peer) => Some(peer),
            _ => None,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::OpenId => f.write_str("openid"),
            Scope::Email => f.write_str("email"),
            Scope::Profile => f.write_str("profile"),
            Scope::Groups => f.write_str("groups"),
            Scope::FederatedId => f.write_str("federated:id"),
            Scope::CrossClient(peer) => write!(f, "{}{}", CROSS_CLIENT_PREFIX, peer),
        }
    }
}

impl FromStr for Scope {
    type Err = OAuthError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "openid" => Ok(Scope::OpenId),
            "email" => Ok(Scope::Email),
            "profile" => Ok(Scope::Profile),
            "groups" => Ok(Scope::Groups),
            "federated:id" => Ok(Scope::FederatedId),
            other => match other.strip_prefix(CROSS_CLIENT_PREFIX) {
                Some("") => Err(OAuthError::InvalidScope(
                    "cross-client scope is missing a client id".to_string(),
                )),
                Some(peer) => Ok(Scope::CrossClient(peer.to_string())),
                None => Err(OAuthError::InvalidScope(format!(
                    "unrecognized scope \"{}\"",
                    other
                ))),
            },
        }
    }
}

/// Parse a space separated scope parameter, dropping duplicates and keeping order.
pub fn parse_scopes(value: &str) -> Result<Vec<Scope>, OAuthError> {
    let mut scopes: Vec<Scope> = Vec::new();
    for token in value.split_whitespace() {
        let scope = token.parse::<Scope>()?;
        if !scopes.contains(&scope) {
            scopes.push(scope);
        }
    }
    Ok(scopes)
}

/// Parse scopes that were validated when the request was created.
pub fn parse_stored_scopes(values: &[String]) -> Vec<Scope> {
    values.iter().filter_map(|s| s.parse().ok()).collect()
}

pub fn scope_strings(scopes: &[Scope]) -> Vec<String> {
    scopes.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_standard_scopes() {
        let scopes = parse_scopes("openid email profile groups federated:id").unwrap();
        assert_eq!(
            scopes,
            vec![
                Scope::OpenId,
                Scope::Email,
                Scope::Profile,
                Scope::Groups,
                Scope::FederatedId
            ]
        );
    }

    #[test]
    fn test_parse_cross_client_scope() {
        let scopes = parse_scopes("openid oauth2:server:client_id:A").unwrap();
        assert_eq!(scopes[1], Scope::CrossClient("A".to_string()));
        assert_eq!(scopes[1].peer(), Some("A"));
        assert_eq!(scopes[1].to_string(), "oauth2:server:client_id:A");
    }

    #[test]
    fn test_unknown_scope_is_invalid() {
        assert!(matches!(
            parse_scopes("openid offline_everything"),
            Err(OAuthError::InvalidScope(_))
        ));
        assert!(matches!(
            parse_scopes("oauth2:server:client_id:"),
            Err(OAuthError::InvalidScope(_))
        ));
    }

    #[test]
    fn test_duplicates_and_empty() {
        assert_eq!(parse_scopes("openid  openid").unwrap(), vec![Scope::OpenId]);
        assert!(parse_scopes("").unwrap().is_empty());
    }
}
