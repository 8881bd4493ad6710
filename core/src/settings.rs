//! Serializable client settings.
//!
//! `ClientSettings` is the declarative half of `ClientConfig`: everything
//! except the auth-failure listener. It can be loaded from JSON or from the
//! process environment.

use serde::{Deserialize, Serialize};

use crate::endpoint::ApiVersion;

pub const ENV_VERSION: &str = "REST_API_VERSION";
pub const ENV_ENDPOINT: &str = "REST_API_ENDPOINT";
pub const ENV_ACCESS_TOKEN: &str = "REST_ACCESS_TOKEN";
pub const ENV_USER_AGENT: &str = "REST_USER_AGENT";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    pub version: ApiVersion,
    /// Overrides the version's base URL when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl ClientSettings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        Self {
            version: get(ENV_VERSION)
                .map(|tag| ApiVersion::from_tag(&tag))
                .unwrap_or_default(),
            endpoint_url: get(ENV_ENDPOINT),
            access_token: get(ENV_ACCESS_TOKEN),
            user_agent: get(ENV_USER_AGENT),
        }
    }

    /// The base URL these settings select.
    pub fn endpoint(&self) -> &str {
        self.endpoint_url
            .as_deref()
            .unwrap_or_else(|| self.version.base_url())
    }
}
