//! Policy Version Store
//!
//! Policies live under `<domain>/<policy dir>/<base64url(policy id)>/` with
//! one `<version><suffix>` JSON file per version. Counts are always computed
//! from the directory entries, never cached.
//!
//! The store is only reachable through the owning domain's lock, which is
//! what serializes its operations.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::domain::entities::{PolicyDocument, PolicyStoreConfig};
use crate::domain::ports::{FileSystem, PolicySource};
use crate::domain::value_objects::{decode_policy_id, encode_policy_id, PolicyVersion};
use crate::error::{PapError, PapResult};
use crate::infrastructure::fs::LocalFs;

/// A policy directory only holds version files
const POLICY_DIR_MAX_DEPTH: usize = 1;

/// Versions of one policy, sorted oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PolicyVersions {
    versions: Vec<PolicyVersion>,
}

impl PolicyVersions {
    pub fn new(mut versions: Vec<PolicyVersion>) -> Self {
        versions.sort();
        versions.dedup();
        Self { versions }
    }

    pub fn oldest_to_latest(&self) -> impl DoubleEndedIterator<Item = &PolicyVersion> {
        self.versions.iter()
    }

    pub fn latest_to_oldest(&self) -> impl Iterator<Item = &PolicyVersion> {
        self.versions.iter().rev()
    }

    pub fn latest(&self) -> Option<&PolicyVersion> {
        self.versions.last()
    }

    pub fn contains(&self, version: &PolicyVersion) -> bool {
        self.versions.binary_search(version).is_ok()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn into_vec(self) -> Vec<PolicyVersion> {
        self.versions
    }
}

/// Result of [`PolicyVersionStore::add_version`]
#[derive(Debug, Clone)]
pub struct AddedVersion {
    pub path: PathBuf,
    /// Document already stored under that version, nothing written
    pub existing: Option<PolicyDocument>,
    /// The policy had no directory before this call
    pub created_policy_dir: bool,
}

#[derive(Debug, Clone)]
pub struct PolicyVersionStore {
    fs: LocalFs,
    root: PathBuf,
    suffix: String,
}

impl PolicyVersionStore {
    pub fn new(domain_dir: &Path, config: &PolicyStoreConfig) -> Self {
        Self {
            fs: LocalFs::new(),
            root: domain_dir.join(&config.directory),
            suffix: config.suffix.clone(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn policy_dir(&self, policy_id: &str) -> PathBuf {
        self.root.join(encode_policy_id(policy_id))
    }

    pub fn version_path(&self, policy_id: &str, version: &PolicyVersion) -> PathBuf {
        self.policy_dir(policy_id)
            .join(format!("{}{}", version.as_str(), self.suffix))
    }

    /// Modification time of the policy directory, `None` if missing
    pub fn policy_dir_modified(&self, policy_id: &str) -> PapResult<Option<SystemTime>> {
        match self.fs.modified(&self.policy_dir(policy_id)) {
            Ok(time) => Ok(Some(time)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_versions(&self, policy_id: &str) -> PapResult<PolicyVersions> {
        let dir = self.policy_dir(policy_id);
        if !self.fs.exists(&dir) {
            return Ok(PolicyVersions::default());
        }

        let mut versions = Vec::new();
        for name in self.fs.list_files_with_suffix(&dir, &self.suffix)? {
            let stem = &name[..name.len() - self.suffix.len()];
            match PolicyVersion::parse(stem) {
                Ok(version) => versions.push(version),
                Err(e) => {
                    tracing::warn!(dir = %dir.display(), file = %name, error = %e, "ignoring policy file with invalid version");
                }
            }
        }
        Ok(PolicyVersions::new(versions))
    }

    pub fn latest_version(&self, policy_id: &str) -> PapResult<Option<PolicyVersion>> {
        Ok(self.list_versions(policy_id)?.latest().cloned())
    }

    pub fn read_version(
        &self,
        policy_id: &str,
        version: &PolicyVersion,
    ) -> PapResult<Option<PolicyDocument>> {
        let path = self.version_path(policy_id, version);
        if !self.fs.exists(&path) {
            return Ok(None);
        }
        let content = self.fs.read(&path)?;
        let doc = serde_json::from_str(&content).map_err(|e| PapError::Corrupted {
            path: path.clone(),
            message: e.to_string(),
        })?;
        Ok(Some(doc))
    }

    /// Store a new version; an existing version is returned untouched
    pub fn add_version(&self, doc: &PolicyDocument) -> PapResult<AddedVersion> {
        let path = self.version_path(&doc.id, &doc.version);
        if let Some(existing) = self.read_version(&doc.id, &doc.version)? {
            return Ok(AddedVersion {
                path,
                existing: Some(existing),
                created_policy_dir: false,
            });
        }

        let dir = self.policy_dir(&doc.id);
        let created_policy_dir = !self.fs.exists(&dir);
        let content = serde_json::to_string_pretty(doc).map_err(|e| PapError::Serialization {
            what: "policy document",
            message: e.to_string(),
        })?;

        if let Err(e) = self.fs.write(&path, &content) {
            if created_policy_dir {
                let _ = self.fs.delete_dir(&dir, POLICY_DIR_MAX_DEPTH);
            }
            return Err(e.into());
        }

        Ok(AddedVersion {
            path,
            existing: None,
            created_policy_dir,
        })
    }

    /// Delete one version, and the policy directory once empty
    ///
    /// Returns whether the version existed.
    pub fn remove_version(&self, policy_id: &str, version: &PolicyVersion) -> PapResult<bool> {
        let path = self.version_path(policy_id, version);
        let existed = self.fs.exists(&path);
        self.fs.remove_file(&path)?;

        let dir = self.policy_dir(policy_id);
        if self.fs.exists(&dir) && self.list_versions(policy_id)?.is_empty() {
            self.fs.delete_dir(&dir, POLICY_DIR_MAX_DEPTH)?;
        }
        Ok(existed)
    }

    /// Delete every version of a policy, returning the deleted versions
    pub fn remove_policy(&self, policy_id: &str) -> PapResult<Vec<PolicyVersion>> {
        let versions = self.list_versions(policy_id)?;
        self.fs
            .delete_dir(&self.policy_dir(policy_id), POLICY_DIR_MAX_DEPTH)?;
        Ok(versions.into_vec())
    }

    pub fn policy_ids(&self) -> PapResult<BTreeSet<String>> {
        let mut ids = BTreeSet::new();
        for name in self.policy_dir_names()? {
            match decode_policy_id(&name) {
                Ok(id) => {
                    ids.insert(id);
                }
                Err(e) => {
                    tracing::warn!(root = %self.root.display(), error = %e, "ignoring policy directory");
                }
            }
        }
        Ok(ids)
    }

    pub fn count_policies(&self) -> PapResult<usize> {
        Ok(self.policy_dir_names()?.len())
    }

    pub fn count_versions(&self, policy_id: &str) -> PapResult<usize> {
        Ok(self.list_versions(policy_id)?.len())
    }

    /// First policy (by id) holding more than `max` versions
    pub fn first_policy_exceeding(&self, max: usize) -> PapResult<Option<(String, usize)>> {
        for policy_id in self.policy_ids()? {
            let count = self.count_versions(&policy_id)?;
            if count > max {
                return Ok(Some((policy_id, count)));
            }
        }
        Ok(None)
    }

    fn policy_dir_names(&self) -> PapResult<Vec<String>> {
        if !self.fs.exists(&self.root) {
            return Ok(Vec::new());
        }
        Ok(self.fs.list_subdirs(&self.root)?)
    }
}

impl PolicySource for PolicyVersionStore {
    fn latest_version(&self, policy_id: &str) -> PapResult<Option<PolicyVersion>> {
        PolicyVersionStore::latest_version(self, policy_id)
    }

    fn read_version(
        &self,
        policy_id: &str,
        version: &PolicyVersion,
    ) -> PapResult<Option<PolicyDocument>> {
        PolicyVersionStore::read_version(self, policy_id, version)
    }
}
