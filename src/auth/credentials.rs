use std::sync::Arc;

use arc_swap::ArcSwapOption;

/// Supplies the bearer token for outgoing requests.
///
/// Must be synchronous and side-effect free; it is called on the request
/// path.
pub trait CredentialProvider: Send + Sync {
    fn current_token(&self) -> Option<String>;
}

/// A token fixed at construction.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    token: Option<String>,
}

impl StaticCredentials {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: Some(token.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl CredentialProvider for StaticCredentials {
    fn current_token(&self) -> Option<String> {
        self.token.clone().filter(|token| !token.is_empty())
    }
}

/// A token that can be replaced at runtime (login, refresh, logout) while
/// requests keep reading it lock-free.
#[derive(Debug, Default)]
pub struct SharedCredentials {
    token: ArcSwapOption<String>,
}

impl SharedCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, token: impl Into<String>) {
        self.token.store(Some(Arc::new(token.into())));
    }

    pub fn clear(&self) {
        self.token.store(None);
    }
}

impl CredentialProvider for SharedCredentials {
    fn current_token(&self) -> Option<String> {
        self.token
            .load()
            .as_deref()
            .filter(|token| !token.is_empty())
            .cloned()
    }
}
