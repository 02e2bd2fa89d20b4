//! Shared fixtures for unit tests

use std::fs::File;
use std::path::Path;
use std::time::{Duration, SystemTime};

use tempfile::TempDir;

use crate::domain::entities::{PdpConfig, PolicyDocument, PolicyRef, PolicyStoreConfig};
use crate::domain::value_objects::PolicyVersion;
use crate::infrastructure::repositories::{PolicyVersionStore, TomlPdpConfigRepository};

pub fn v(s: &str) -> PolicyVersion {
    PolicyVersion::parse(s).unwrap()
}

/// Domain directory whose engine uses the latest `root` policy
pub fn domain_dir_with(docs: &[PolicyDocument]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    TomlPdpConfigRepository::new()
        .save(dir.path(), &PdpConfig::with_root(PolicyRef::latest("root")))
        .unwrap();
    let store = PolicyVersionStore::new(dir.path(), &PolicyStoreConfig::default());
    for doc in docs {
        store.add_version(doc).unwrap();
    }
    dir
}

/// Domain template holding a single `root` policy, version 1
pub fn template_dir() -> TempDir {
    domain_dir_with(&[PolicyDocument::new("root", v("1"))])
}

/// Move a file or directory mtime into the future
///
/// Out-of-band edits made within the filesystem timestamp resolution would
/// otherwise go unnoticed.
pub fn push_mtime(path: &Path) {
    let file = File::open(path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(2))
        .unwrap();
}
