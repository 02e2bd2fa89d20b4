//! Domain properties entity
//!
//! `properties.toml` at the root of every domain directory holds the
//! caller-visible metadata (description, externalId) and the policy
//! repository quotas.

use serde::{Deserialize, Serialize};

/// Persisted content of `properties.toml`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_policy_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_version_count_per_policy: Option<u32>,
    #[serde(default)]
    pub version_rolling_enabled: bool,
}

impl DomainProperties {
    pub fn writable(&self) -> WritableDomainProperties {
        WritableDomainProperties {
            description: self.description.clone(),
            external_id: self.external_id.clone(),
        }
    }

    pub fn prp(&self) -> PrpProperties {
        PrpProperties {
            max_policy_count: non_zero(self.max_policy_count),
            max_version_count_per_policy: non_zero(self.max_version_count_per_policy),
            version_rolling_enabled: self.version_rolling_enabled,
        }
    }

    /// Replace description and externalId, keeping quotas
    pub fn apply_writable(&mut self, props: &WritableDomainProperties) {
        self.description = props.description.clone();
        self.external_id = props.external_id.clone();
    }

    pub fn apply_prp(&mut self, prp: &PrpProperties) {
        self.max_policy_count = non_zero(prp.max_policy_count);
        self.max_version_count_per_policy = non_zero(prp.max_version_count_per_policy);
        self.version_rolling_enabled = prp.version_rolling_enabled;
    }
}

/// `0` and absent both mean unlimited
fn non_zero(value: Option<u32>) -> Option<u32> {
    value.filter(|&v| v > 0)
}

/// Caller-settable domain metadata
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WritableDomainProperties {
    pub description: Option<String>,
    pub external_id: Option<String>,
}

impl WritableDomainProperties {
    pub fn new(description: Option<&str>, external_id: Option<&str>) -> Self {
        Self {
            description: description.map(str::to_string),
            external_id: external_id.map(str::to_string),
        }
        .normalized()
    }

    /// Empty strings are treated as unset
    pub fn normalized(mut self) -> Self {
        self.description = self.description.filter(|s| !s.is_empty());
        self.external_id = self.external_id.filter(|s| !s.is_empty());
        self
    }
}

/// Domain metadata as returned to callers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadableDomainProperties {
    pub domain_id: String,
    pub description: Option<String>,
    pub external_id: Option<String>,
}

/// Policy repository quotas
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrpProperties {
    pub max_policy_count: Option<u32>,
    pub max_version_count_per_policy: Option<u32>,
    pub version_rolling_enabled: bool,
}
