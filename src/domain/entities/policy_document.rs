//! Policy document entity
//!
//! Policies are stored as JSON documents, one file per version. Only the
//! identity and the references to other policies matter to the repository;
//! the rules are carried opaquely for the decision engine.

use serde::{Deserialize, Serialize};

use super::PolicyRef;
use crate::domain::value_objects::PolicyVersion;

/// One version of a policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDocument {
    pub id: String,
    pub version: PolicyVersion,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policy_refs: Vec<PolicyRef>,
    #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
    pub rules: serde_json::Value,
}

impl PolicyDocument {
    pub fn new(id: impl Into<String>, version: PolicyVersion) -> Self {
        Self {
            id: id.into(),
            version,
            description: None,
            policy_refs: Vec::new(),
            rules: serde_json::Value::Null,
        }
    }

    pub fn with_ref(mut self, policy_ref: PolicyRef) -> Self {
        self.policy_refs.push(policy_ref);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn metadata(&self) -> PolicyMetadata {
        PolicyMetadata {
            id: self.id.clone(),
            version: self.version.clone(),
        }
    }
}

/// Identity of a concrete policy version
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PolicyMetadata {
    pub id: String,
    pub version: PolicyVersion,
}

impl PolicyMetadata {
    pub fn to_ref(&self) -> PolicyRef {
        PolicyRef::exact(self.id.clone(), self.version.clone())
    }
}
