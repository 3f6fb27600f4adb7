use http::HeaderValue;

use crate::error::Result;

/// Credentials attached to outgoing requests
#[derive(Clone, Default, PartialEq, Eq)]
pub enum Authorization {
    /// Anonymous access
    #[default]
    None,
    /// OAuth access token sent as `Authorization: Bearer <token>`
    Bearer(String),
}

impl Authorization {
    /// Create a bearer token authorization
    pub fn bearer(token: impl Into<String>) -> Self {
        Authorization::Bearer(token.into())
    }

    /// Get the access token, if any
    pub fn token(&self) -> Option<&str> {
        match self {
            Authorization::None => None,
            Authorization::Bearer(token) => Some(token),
        }
    }

    /// Check if requests will carry credentials
    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    /// Value for the `Authorization` header, marked sensitive
    pub fn header_value(&self) -> Result<Option<HeaderValue>> {
        match self {
            Authorization::None => Ok(None),
            Authorization::Bearer(token) => {
                let mut value = HeaderValue::from_str(&format!("Bearer {}", token))?;
                value.set_sensitive(true);
                Ok(Some(value))
            }
        }
    }
}

impl std::fmt::Debug for Authorization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Authorization::None => write!(f, "None"),
            Authorization::Bearer(_) => write!(f, "Bearer(<redacted>)"),
        }
    }
}
