//! Test fixtures: policy documents and out-of-band edits.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use pap_flatfile::domain::entities::{PdpConfig, PolicyDocument, PolicyRef, PolicyStoreConfig};
use pap_flatfile::infrastructure::{PolicyVersionStore, TomlPdpConfigRepository};
use pap_flatfile::PolicyVersion;

/// Root policy ID used by the test template
pub const ROOT: &str = "root";

pub fn v(s: &str) -> PolicyVersion {
    PolicyVersion::parse(s).unwrap()
}

pub fn policy(id: &str, version: &str) -> PolicyDocument {
    PolicyDocument::new(id, v(version))
}

/// Root policy version referencing the latest version of `child`
pub fn root_referencing(version: &str, child: &str) -> PolicyDocument {
    policy(ROOT, version).with_ref(PolicyRef::latest(child))
}

/// Policy store of a domain directory, bypassing the registry
pub fn store(domain_dir: &Path) -> PolicyVersionStore {
    PolicyVersionStore::new(domain_dir, &PolicyStoreConfig::default())
}

/// Write a policy version directly on disk, as another process would
pub fn write_policy_out_of_band(domain_dir: &Path, doc: &PolicyDocument) {
    let store = store(domain_dir);
    store.add_version(doc).unwrap();
    push_mtime(&store.policy_dir(&doc.id));
}

/// Overwrite `pdp.toml` directly on disk
pub fn write_pdp_config_out_of_band(domain_dir: &Path, config: &PdpConfig) {
    TomlPdpConfigRepository::new()
        .save(domain_dir, config)
        .unwrap();
    push_mtime(&TomlPdpConfigRepository::path(domain_dir));
}

pub fn pdp_config_path(domain_dir: &Path) -> PathBuf {
    TomlPdpConfigRepository::path(domain_dir)
}

/// Move a file or directory mtime into the future
///
/// Edits made within the filesystem timestamp resolution of the last sync
/// would otherwise go unnoticed.
pub fn push_mtime(path: &Path) {
    let file = File::open(path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(2))
        .unwrap();
}

/// Populate a domain template: `pdp.toml` using the latest `root`, and `root` v1
pub fn write_template(dir: &Path) {
    TomlPdpConfigRepository::new()
        .save(dir, &PdpConfig::with_root(PolicyRef::latest(ROOT)))
        .unwrap();
    store(dir).add_version(&policy(ROOT, "1")).unwrap();
}
