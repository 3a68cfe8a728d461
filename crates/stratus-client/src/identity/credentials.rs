//! Credential shapes accepted by the identity endpoint

use serde_json::{json, Map, Value};
use tracing::warn;

/// What to authenticate with
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Username and password (`passwordCredentials`)
    Password { username: String, password: String },
    /// API access key pair (`apiAccessKeyCredentials`)
    AccessKey {
        access_key: String,
        secret_key: String,
    },
    /// An existing token, used for rescoping
    Token { id: String },
}

impl Credentials {
    /// Username/password credentials
    pub fn password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::Password {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Access key credentials
    pub fn access_key(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self::AccessKey {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    /// Token credentials
    pub fn token(id: impl Into<String>) -> Self {
        Self::Token { id: id.into() }
    }

    /// Build the `auth` object of a token request
    pub fn to_auth(&self, scope: &Scope) -> Value {
        let mut auth = Map::new();
        match self {
            Self::Password { username, password } => {
                auth.insert(
                    "passwordCredentials".into(),
                    json!({ "username": username, "password": password }),
                );
            }
            Self::AccessKey {
                access_key,
                secret_key,
            } => {
                auth.insert(
                    "apiAccessKeyCredentials".into(),
                    json!({ "accessKey": access_key, "secretKey": secret_key }),
                );
            }
            Self::Token { id } => {
                auth.insert("token".into(), json!({ "id": id }));
            }
        }

        match scope {
            Scope::Unscoped => {}
            Scope::TenantId(id) => {
                auth.insert("tenantId".into(), Value::String(id.clone()));
            }
            Scope::TenantName(name) => {
                auth.insert("tenantName".into(), Value::String(name.clone()));
            }
        }

        Value::Object(auth)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Password { username, .. } => f
                .debug_struct("Password")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::AccessKey { access_key, .. } => f
                .debug_struct("AccessKey")
                .field("access_key", access_key)
                .field("secret_key", &"<redacted>")
                .finish(),
            Self::Token { .. } => f.debug_struct("Token").field("id", &"<redacted>").finish(),
        }
    }
}

/// Tenant a token is requested for
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Scope {
    /// No tenant; the token is only good for identity calls
    #[default]
    Unscoped,
    TenantId(String),
    TenantName(String),
}

impl Scope {
    /// Resolve optional id and name into a single scope
    ///
    /// Empty strings count as absent. If both are given the id wins and the
    /// name is dropped.
    pub fn from_parts(tenant_id: Option<&str>, tenant_name: Option<&str>) -> Self {
        let tenant_id = tenant_id.filter(|s| !s.is_empty());
        let tenant_name = tenant_name.filter(|s| !s.is_empty());

        match (tenant_id, tenant_name) {
            (Some(id), Some(name)) => {
                warn!(
                    tenant_id = id,
                    tenant_name = name,
                    "both tenant id and name given; using the id"
                );
                Self::TenantId(id.to_string())
            }
            (Some(id), None) => Self::TenantId(id.to_string()),
            (None, Some(name)) => Self::TenantName(name.to_string()),
            (None, None) => Self::Unscoped,
        }
    }

    /// Check for a tenant-less scope
    pub fn is_unscoped(&self) -> bool {
        matches!(self, Self::Unscoped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_password_payload() {
        let auth = Credentials::password("alice", "s3cret")
            .to_auth(&Scope::TenantName("demo".into()));
        assert_eq!(
            auth,
            json!({
                "passwordCredentials": {"username": "alice", "password": "s3cret"},
                "tenantName": "demo"
            })
        );
    }

    #[test]
    fn test_access_key_payload() {
        let auth = Credentials::access_key("AK", "SK").to_auth(&Scope::Unscoped);
        assert_eq!(
            auth,
            json!({"apiAccessKeyCredentials": {"accessKey": "AK", "secretKey": "SK"}})
        );
    }

    #[test]
    fn test_token_payload() {
        let auth = Credentials::token("tok").to_auth(&Scope::TenantId("42".into()));
        assert_eq!(auth, json!({"token": {"id": "tok"}, "tenantId": "42"}));
    }

    #[rstest]
    #[case(None, None, Scope::Unscoped)]
    #[case(Some(""), Some(""), Scope::Unscoped)]
    #[case(Some("1"), None, Scope::TenantId("1".into()))]
    #[case(None, Some("demo"), Scope::TenantName("demo".into()))]
    #[case(Some("1"), Some("demo"), Scope::TenantId("1".into()))]
    #[case(Some(""), Some("demo"), Scope::TenantName("demo".into()))]
    fn test_scope_from_parts(
        #[case] id: Option<&str>,
        #[case] name: Option<&str>,
        #[case] expected: Scope,
    ) {
        assert_eq!(Scope::from_parts(id, name), expected);
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!(
            "{:?} {:?} {:?}",
            Credentials::password("alice", "s3cret"),
            Credentials::access_key("AK", "SK-secret"),
            Credentials::token("tok-secret"),
        );
        assert!(rendered.contains("alice"));
        assert!(!rendered.contains("s3cret"));
        assert!(!rendered.contains("SK-secret"));
        assert!(!rendered.contains("tok-secret"));
    }
}
