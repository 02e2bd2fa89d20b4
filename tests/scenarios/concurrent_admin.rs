//! Scenario: Concurrent Administration
//!
//! Journey: several clients administer the same repository at once while
//! background reconciliation is running.
//!
//! Success Criteria:
//! - An externalId ends up bound to exactly one domain
//! - Version quotas hold under concurrent additions
//! - The engine keeps serving throughout

use std::sync::{Arc, Barrier};
use std::thread;
use std::time::Duration;

use crate::common::*;
use pap_flatfile::domain::entities::{PrpProperties, WritableDomainProperties};
use pap_flatfile::{ErrorKind, PapError};

#[test]
fn scenario_racing_creations_with_same_external_id() {
    let repo = Arc::new(TestRepo::new());
    let barrier = Arc::new(Barrier::new(4));

    let results: Vec<_> = (0..4)
        .map(|_| {
            let repo = Arc::clone(&repo);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                repo.registry
                    .create_domain(WritableDomainProperties::new(None, Some("contested")))
            })
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|h| h.join().unwrap())
        .collect();

    let created: Vec<&String> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(created.len(), 1);
    for err in results.iter().filter_map(|r| r.as_ref().err()) {
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }
    assert_eq!(
        repo.registry.domain_id_by_external_id("contested").unwrap(),
        Some(created[0].clone())
    );
    assert_eq!(repo.registry.reconcile_all().unwrap().len(), 1);
}

#[test]
fn scenario_parallel_additions_respect_quota() {
    let repo = TestRepo::with_settings(|s| s.with_sync_interval(Some(Duration::from_millis(20))));
    let domain = repo.create_domain();
    domain
        .set_prp_properties(PrpProperties {
            max_policy_count: None,
            max_version_count_per_policy: Some(4),
            version_rolling_enabled: true,
        })
        .unwrap();

    let writers: Vec<_> = (0..4)
        .map(|writer| {
            let domain = Arc::clone(&domain);
            thread::spawn(move || {
                for i in 0..10 {
                    // a slow writer's version may be the oldest one left
                    match domain.add_policy(policy(ROOT, &format!("{}.{writer}", i + 2))) {
                        Ok(_) | Err(PapError::TooManyVersions { .. }) => {}
                        Err(e) => panic!("unexpected error: {e}"),
                    }
                }
            })
        })
        .collect();

    let reader = {
        let domain = Arc::clone(&domain);
        thread::spawn(move || {
            for _ in 0..200 {
                // never observes a missing or closed engine
                let engine = domain.engine().expect("engine available");
                assert_eq!(engine.root_policy().id, ROOT);
                thread::yield_now();
            }
        })
    };

    for writer in writers {
        writer.join().unwrap();
    }
    reader.join().unwrap();

    let versions = domain.list_versions(ROOT).unwrap();
    assert_eq!(versions.len(), 4);
    let active = domain.engine().unwrap().root_policy().version.clone();
    assert_eq!(versions.latest(), Some(&active));
    assert_eq!(active, v("11.3"));
}
