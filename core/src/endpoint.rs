//! Fixed endpoint table for the supported API versions.
//!
//! # Design
//! Each `ApiVersion` maps to exactly one literal base URL. Every base URL
//! ends with `/` so relative paths can be appended after stripping a single
//! leading separator. Parsing a version from text or a numeric code never
//! fails: anything unrecognized falls back to `V1`.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

const ENDPOINT_V0: &str = "http://39.99.148.207/";
const ENDPOINT_V1: &str = "http://39.99.148.207/rest/v1/";
const ENDPOINT_V1_1: &str = "http://39.99.148.207/rest/v1.1/";
const ENDPOINT_V1_2: &str = "http://39.99.148.207/rest/v1.2/";
const ENDPOINT_V1_3: &str = "http://39.99.148.207/rest/v1.3/";

/// API version selecting which base URL a client targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ApiVersion {
    V0,
    #[default]
    V1,
    V1_1,
    V1_2,
    V1_3,
}

impl ApiVersion {
    pub const ALL: [ApiVersion; 5] = [
        ApiVersion::V0,
        ApiVersion::V1,
        ApiVersion::V1_1,
        ApiVersion::V1_2,
        ApiVersion::V1_3,
    ];

    pub fn base_url(self) -> &'static str {
        match self {
            ApiVersion::V0 => ENDPOINT_V0,
            ApiVersion::V1 => ENDPOINT_V1,
            ApiVersion::V1_1 => ENDPOINT_V1_1,
            ApiVersion::V1_2 => ENDPOINT_V1_2,
            ApiVersion::V1_3 => ENDPOINT_V1_3,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            ApiVersion::V0 => "v0",
            ApiVersion::V1 => "v1",
            ApiVersion::V1_1 => "v1.1",
            ApiVersion::V1_2 => "v1.2",
            ApiVersion::V1_3 => "v1.3",
        }
    }

    /// Parse a version tag such as `"v1.2"` or `"V1_2"`.
    ///
    /// Unknown tags fall back to `V1` rather than failing.
    pub fn from_tag(tag: &str) -> Self {
        let normalized = tag.trim().to_ascii_lowercase().replace('_', ".");
        Self::ALL
            .into_iter()
            .find(|v| v.tag() == normalized)
            .unwrap_or_else(|| {
                warn!(tag, "unrecognized API version tag, falling back to v1");
                ApiVersion::V1
            })
    }

    /// Map a numeric code (declaration order, starting at 0) to a version.
    ///
    /// Out-of-range codes fall back to `V1`.
    pub fn from_code(code: u32) -> Self {
        match Self::ALL.get(code as usize) {
            Some(version) => *version,
            None => {
                warn!(code, "unrecognized API version code, falling back to v1");
                ApiVersion::V1
            }
        }
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl From<String> for ApiVersion {
    fn from(tag: String) -> Self {
        ApiVersion::from_tag(&tag)
    }
}

impl From<ApiVersion> for String {
    fn from(version: ApiVersion) -> Self {
        version.tag().to_string()
    }
}
