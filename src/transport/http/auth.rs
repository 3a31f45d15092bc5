//! Shared-secret check for the privileged endpoints.

use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

/// Header carrying the shared secret.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// The key privileged callers must present. An unset key matches nothing.
#[derive(Debug, Default)]
pub struct SharedSecret(Option<SecretString>);

impl SharedSecret {
    pub fn new(key: Option<SecretString>) -> Self {
        // An empty value would otherwise match a request carrying an empty header.
        Self(key.filter(|k| !k.expose_secret().is_empty()))
    }

    pub fn is_configured(&self) -> bool {
        self.0.is_some()
    }

    pub fn matches(&self, presented: Option<&str>) -> bool {
        match (&self.0, presented) {
            (Some(expected), Some(presented)) => expected
                .expose_secret()
                .as_bytes()
                .ct_eq(presented.as_bytes())
                .into(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret(key: &str) -> SharedSecret {
        SharedSecret::new(Some(SecretString::from(key.to_string())))
    }

    #[test]
    fn matches_only_the_exact_key() {
        let key = secret("12345");
        assert!(key.matches(Some("12345")));
        assert!(!key.matches(Some("1234")));
        assert!(!key.matches(Some("123456")));
        assert!(!key.matches(Some("wrong")));
        assert!(!key.matches(None));
    }

    #[test]
    fn unset_key_rejects_everything() {
        let key = SharedSecret::new(None);
        assert!(!key.is_configured());
        assert!(!key.matches(Some("")));
        assert!(!key.matches(Some("anything")));
        assert!(!key.matches(None));
    }

    #[test]
    fn empty_key_counts_as_unset() {
        let key = secret("");
        assert!(!key.is_configured());
        assert!(!key.matches(Some("")));
    }
}
