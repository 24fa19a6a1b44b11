//! End-to-end tests for the preference analysis pipeline.
//!
//! Each test builds a real store environment on disk, runs the jobs the way
//! the scheduler would, and inspects the derived tables.

mod common;

use common::TestEnv;
use readnest_server::background_jobs::jobs::{
    FacetAffinityJob, FacetRecommendationJob, ShelfTrendsJob,
};
use readnest_server::background_jobs::{create_scheduler, BackgroundJob, HookEvent};
use readnest_server::catalog_store::FacetKind;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[test]
fn test_affinity_snapshot_from_ratings() {
    let env = TestEnv::new();
    env.add_book("b1", &["mystery"], &["fiction"], &["A. Chase"]);
    env.add_book("b2", &["mystery"], &["fiction"], &["A. Chase"]);
    env.add_book("b3", &["romance"], &["fiction"], &["B. Heart"]);

    let reader = env.create_user("alice");
    env.rate(reader, "b1", 5.0);
    env.rate(reader, "b2", 4.0);
    env.rate(reader, "b3", 1.0);

    let job = FacetAffinityJob::new(FacetKind::Tag, &env.settings);
    job.execute(&env.job_context()).unwrap();

    let rows = env
        .derived_store
        .get_user_affinity(reader, FacetKind::Tag)
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].facet_value, "mystery");
    assert_eq!(rows[0].rank, 1);
    assert_eq!(rows[0].mean_score, 4.5);
    assert_eq!(rows[1].facet_value, "romance");
    assert_eq!(rows[1].rank, 2);
}

#[test]
fn test_affinity_respects_top_k_with_non_increasing_means() {
    let mut env = TestEnv::new();
    env.settings.affinity_top_k = 3;

    for i in 0..6 {
        env.add_book(&format!("b{i}"), &[&format!("tag{i}")], &[], &[]);
    }
    let reader = env.create_user("alice");
    for i in 0..6 {
        env.rate(reader, &format!("b{i}"), 1.0 + i as f64 * 0.5);
    }

    let job = FacetAffinityJob::new(FacetKind::Tag, &env.settings);
    job.execute(&env.job_context()).unwrap();

    let rows = env
        .derived_store
        .get_user_affinity(reader, FacetKind::Tag)
        .unwrap();
    assert_eq!(rows.len(), 3);
    assert!(rows.windows(2).all(|w| w[0].mean_score >= w[1].mean_score));
    assert_eq!(rows[0].facet_value, "tag5");
}

#[test]
fn test_affinity_rerun_replaces_snapshot() {
    let env = TestEnv::new();
    env.add_book("b1", &["mystery"], &[], &[]);
    env.add_book("b2", &["romance"], &[], &[]);

    let reader = env.create_user("alice");
    env.rate(reader, "b1", 5.0);

    let job = FacetAffinityJob::new(FacetKind::Tag, &env.settings);
    let ctx = env.job_context();
    job.execute(&ctx).unwrap();

    // A new rating shifts the profile on the next run
    env.rate(reader, "b1", 1.0);
    env.rate(reader, "b2", 5.0);
    job.execute(&ctx).unwrap();

    let rows = env
        .derived_store
        .get_user_affinity(reader, FacetKind::Tag)
        .unwrap();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].facet_value, "romance");
}

#[test]
fn test_affinity_rerun_is_idempotent() {
    let env = TestEnv::new();
    env.add_book("b1", &["mystery", "noir"], &[], &[]);
    env.add_book("b2", &["noir"], &[], &[]);
    let reader = env.create_user("alice");
    env.rate(reader, "b1", 4.0);
    env.rate(reader, "b2", 3.0);

    let job = FacetAffinityJob::new(FacetKind::Tag, &env.settings);
    let ctx = env.job_context();

    job.execute(&ctx).unwrap();
    let first: Vec<_> = env
        .derived_store
        .get_affinity(FacetKind::Tag)
        .unwrap()
        .into_iter()
        .map(|r| (r.user_id, r.facet_value, r.rank, r.mean_score))
        .collect();

    job.execute(&ctx).unwrap();
    let second: Vec<_> = env
        .derived_store
        .get_affinity(FacetKind::Tag)
        .unwrap()
        .into_iter()
        .map(|r| (r.user_id, r.facet_value, r.rank, r.mean_score))
        .collect();

    assert_eq!(first, second);
}

#[test]
fn test_recommendations_carry_favored_value_within_quota() {
    let mut env = TestEnv::new();
    env.settings.candidate_quota = 4;

    // Six mystery books, three rated by a second reader to establish
    // global means, plus an unrelated romance book.
    for i in 0..6 {
        env.add_book(&format!("m{i}"), &["mystery"], &[], &[]);
    }
    env.add_book("r0", &["romance"], &[], &[]);

    let alice = env.create_user("alice");
    let bob = env.create_user("bob");
    env.rate(alice, "m0", 5.0);
    env.rate(bob, "m1", 4.0);
    env.rate(bob, "m2", 2.0);

    let ctx = env.job_context();
    FacetAffinityJob::new(FacetKind::Tag, &env.settings)
        .execute(&ctx)
        .unwrap();
    FacetRecommendationJob::new(FacetKind::Tag, &env.settings)
        .execute(&ctx)
        .unwrap();

    let recs = env
        .derived_store
        .get_user_recommendations(alice, FacetKind::Tag)
        .unwrap();
    let mystery_recs: Vec<_> = recs.iter().filter(|r| r.facet_value == "mystery").collect();

    assert!(!mystery_recs.is_empty());
    assert!(mystery_recs.len() <= 4);
    let unique: HashSet<&str> = mystery_recs.iter().map(|r| r.book_id.as_str()).collect();
    assert_eq!(unique.len(), mystery_recs.len());
    assert!(mystery_recs.iter().all(|r| r.book_id.starts_with('m')));
    // All rated mystery books fit within the quota, so they are all selected
    for rated in ["m0", "m1", "m2"] {
        assert!(unique.contains(rated), "missing rated candidate {rated}");
    }
}

#[test]
fn test_recommendations_backfill_stops_at_pool_exhaustion() {
    let env = TestEnv::new();
    env.add_book("m0", &["mystery"], &[], &[]);
    env.add_book("m1", &["mystery"], &[], &[]);

    let alice = env.create_user("alice");
    env.rate(alice, "m0", 5.0);

    let ctx = env.job_context();
    FacetAffinityJob::new(FacetKind::Tag, &env.settings)
        .execute(&ctx)
        .unwrap();
    FacetRecommendationJob::new(FacetKind::Tag, &env.settings)
        .execute(&ctx)
        .unwrap();

    // Quota is 15 but only two mystery books exist
    let recs = env
        .derived_store
        .get_user_recommendations(alice, FacetKind::Tag)
        .unwrap();
    assert_eq!(recs.len(), 2);
    let books: HashSet<&str> = recs.iter().map(|r| r.book_id.as_str()).collect();
    assert_eq!(books, HashSet::from(["m0", "m1"]));
}

#[test]
fn test_candidate_sets_shared_across_users() {
    let env = TestEnv::new();
    env.add_book("m0", &["mystery"], &[], &[]);
    env.add_book("m1", &["mystery"], &[], &[]);

    let alice = env.create_user("alice");
    let bob = env.create_user("bob");
    env.rate(alice, "m0", 5.0);
    env.rate(bob, "m1", 4.0);

    let ctx = env.job_context();
    FacetAffinityJob::new(FacetKind::Tag, &env.settings)
        .execute(&ctx)
        .unwrap();
    FacetRecommendationJob::new(FacetKind::Tag, &env.settings)
        .execute(&ctx)
        .unwrap();

    let alice_books: Vec<_> = env
        .derived_store
        .get_user_recommendations(alice, FacetKind::Tag)
        .unwrap()
        .into_iter()
        .map(|r| r.book_id)
        .collect();
    let bob_books: Vec<_> = env
        .derived_store
        .get_user_recommendations(bob, FacetKind::Tag)
        .unwrap()
        .into_iter()
        .map(|r| r.book_id)
        .collect();

    assert_eq!(alice_books, bob_books);
}

#[test]
fn test_trends_rank_by_shelf_count() {
    let env = TestEnv::new();
    env.add_book("b1", &["mystery"], &[], &[]);
    env.add_book("b2", &["mystery"], &[], &[]);
    env.add_book("b3", &["forgotten"], &[], &[]);

    let alice = env.create_user("alice");
    let bob = env.create_user("bob");
    let carol = env.create_user("carol");
    env.shelve(alice, "b2");
    env.shelve(bob, "b2");
    env.shelve(carol, "b2");
    env.shelve(alice, "b1");

    ShelfTrendsJob::new(&env.settings)
        .execute(&env.job_context())
        .unwrap();

    let trending = env.derived_store.get_trending_books("mystery").unwrap();
    assert_eq!(trending[0].book_id, "b2");
    assert_eq!(trending[0].shelf_count, 3);
    assert_eq!(trending[1].book_id, "b1");
    assert_eq!(trending[1].shelf_count, 1);

    // Nobody shelved a "forgotten" book, so the tag has no rows
    assert!(env
        .derived_store
        .get_trending_books("forgotten")
        .unwrap()
        .is_empty());
}

#[test]
fn test_jobs_record_history_and_audit_entries() {
    let env = TestEnv::new();
    env.add_book("b1", &["mystery"], &[], &[]);
    let reader = env.create_user("alice");
    env.rate(reader, "b1", 5.0);

    let job = FacetAffinityJob::new(FacetKind::Tag, &env.settings);
    let run_id = env
        .server_store
        .record_job_start(job.id(), "test")
        .unwrap();
    job.execute(&env.job_context()).unwrap();
    env.server_store
        .record_job_finish(
            run_id,
            readnest_server::server_store::JobRunStatus::Completed,
            None,
        )
        .unwrap();

    let history = env.server_store.get_job_history(job.id(), 10).unwrap();
    assert_eq!(history.len(), 1);

    let audit = env
        .server_store
        .get_job_audit_log_by_job(job.id(), 10, 0)
        .unwrap();
    let event_types: Vec<_> = audit.iter().map(|e| e.event_type.as_str()).collect();
    assert!(event_types.contains(&"started"));
    assert!(event_types.contains(&"completed"));
}

#[tokio::test]
async fn test_scheduler_runs_pipeline_on_startup() {
    let env = TestEnv::new();
    env.add_book("b1", &["mystery"], &["fiction"], &["A. Chase"]);
    let reader = env.create_user("alice");
    env.rate(reader, "b1", 5.0);

    let shutdown_token = CancellationToken::new();
    let (_hook_sender, hook_receiver) = tokio::sync::mpsc::channel::<HookEvent>(10);
    let (mut scheduler, handle) = create_scheduler(
        Arc::clone(&env.server_store),
        hook_receiver,
        shutdown_token.clone(),
        env.job_context(),
    );

    scheduler
        .register_job(Arc::new(FacetAffinityJob::new(FacetKind::Tag, &env.settings)))
        .await;

    let sched_task = tokio::spawn(async move {
        scheduler.run().await;
    });

    // Wait for the startup-triggered run to land in the derived store
    let mut attempts = 0;
    loop {
        let rows = env.derived_store.get_affinity(FacetKind::Tag).unwrap();
        if !rows.is_empty() || attempts >= 40 {
            assert!(!rows.is_empty(), "Startup run should populate the snapshot");
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
        attempts += 1;
    }

    let history = handle.get_job_history("tag_affinity", 10).unwrap();
    assert!(!history.is_empty());
    assert_eq!(history[0].triggered_by, "hook:OnStartup");

    shutdown_token.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(3), sched_task).await;
}
