//! The signed-in account reported by the sign-in SDK.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A signed-in account.
///
/// The bridge never interprets these fields; they are copied from the SDK's
/// account object and handed to the calling layer untouched. Tokens are
/// redacted from `Debug` output so results can be logged safely.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignInAccount {
    /// Stable user id.
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    /// Only present when an id token was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Only present when a server auth code was requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_auth_code: Option<String>,
}

impl SignInAccount {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            ..Default::default()
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_id_token(mut self, token: impl Into<String>) -> Self {
        self.id_token = Some(token.into());
        self
    }

    pub fn with_server_auth_code(mut self, code: impl Into<String>) -> Self {
        self.server_auth_code = Some(code.into());
        self
    }
}

impl fmt::Debug for SignInAccount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignInAccount")
            .field("user_id", &self.user_id)
            .field("display_name", &self.display_name)
            .field("email", &self.email)
            .field("has_id_token", &self.id_token.is_some())
            .field("has_server_auth_code", &self.server_auth_code.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_redacts_tokens() {
        let account = SignInAccount::new("1234")
            .with_email("player@example.com")
            .with_id_token("secret-id-token")
            .with_server_auth_code("secret-auth-code");
        let out = format!("{account:?}");
        assert!(out.contains("player@example.com"));
        assert!(!out.contains("secret-id-token"));
        assert!(!out.contains("secret-auth-code"));
        assert!(out.contains("has_id_token: true"));
    }

    #[test]
    fn test_serialization_skips_absent_fields() {
        let account = SignInAccount::new("1234").with_display_name("Player One");
        let json = serde_json::to_value(&account).unwrap();
        assert_eq!(json["user_id"], "1234");
        assert_eq!(json["display_name"], "Player One");
        assert!(json.get("email").is_none());

        let back: SignInAccount = serde_json::from_value(json).unwrap();
        assert_eq!(back, account);
    }
}
