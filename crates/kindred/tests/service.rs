mod common;

use chrono::Duration as ChronoDuration;
use common::*;
use kindred::{KindredConfig, KindredError, MatchService};
use kindred_common::{usage_day, Clock, ErrorKind, InteractionKind, SubscriptionPeriod};
use kindred_store::{MemoryStore, Store};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

#[tokio::test]
async fn test_sign_up_login_authenticate() {
    let (service, _, clock) = memory_service(&KindredConfig::default());

    let profile = service
        .sign_up(new_profile("  Robin@Example.com "), "hunter22")
        .await
        .unwrap();
    assert_eq!(profile.email, "robin@example.com");
    assert_eq!(service.profile(profile.id).await.unwrap(), profile);

    let err = service
        .sign_up(new_profile("robin@example.com"), "other")
        .await
        .unwrap_err();
    assert_eq!(err, KindredError::EmailTaken("robin@example.com".into()));
    assert_eq!(err.kind(), ErrorKind::Conflict);

    assert_eq!(
        service.login("robin@example.com", "wrong").await,
        Err(KindredError::InvalidCredentials)
    );
    assert_eq!(
        service.login("nobody@example.com", "hunter22").await,
        Err(KindredError::InvalidCredentials)
    );

    let session = service.login("ROBIN@example.com", "hunter22").await.unwrap();
    assert_eq!(service.authenticate(&session.token).unwrap(), profile.id);

    clock.advance(ChronoDuration::hours(25));
    assert_eq!(
        service.authenticate(&session.token),
        Err(KindredError::InvalidCredentials)
    );
}

#[tokio::test]
async fn test_hashing_failure_is_internal_and_writes_nothing() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(kindred_common::ManualClock::new(noon()));
    let service = MatchService::new(store.clone(), clock, Arc::new(BrokenVerifier), &KindredConfig::default());

    let err = service.sign_up(new_profile("sam@example.com"), "pw").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(!err.is_business_outcome());
    assert!(!err.kind().is_retryable());
    assert!(store.actor_by_email("sam@example.com").await.unwrap().is_none());
}

#[tokio::test]
async fn test_sign_up_validation() {
    let (service, store, _) = memory_service(&KindredConfig::default());

    let err = service.sign_up(new_profile("not-an-email"), "pw").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    let err = service.sign_up(new_profile("a@b.c"), "").await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);

    assert!(store.actor_by_email("a@b.c").await.unwrap().is_none());
}

#[tokio::test]
async fn test_quota_then_subscription_bypass() {
    let (service, store, clock) = memory_service(&KindredConfig::default());
    let unlimited = service
        .register_capability("daily_responses", "Unlimited daily responses")
        .await
        .unwrap();
    let actor = service.sign_up(new_profile("me@example.com"), "pw").await.unwrap().id;

    for _ in 0..10 {
        service
            .record_interaction(actor, Uuid::new_v4(), InteractionKind::Accept)
            .await
            .unwrap();
    }
    let err = service
        .record_interaction(actor, Uuid::new_v4(), InteractionKind::Accept)
        .await
        .unwrap_err();
    assert_eq!(err, KindredError::QuotaExceeded { limit: 10 });
    assert_eq!(
        service.get_profiles(actor).await,
        Err(KindredError::QuotaExceeded { limit: 10 })
    );

    let grant = service
        .activate_subscription(actor, unlimited.id, SubscriptionPeriod::OneMonth, 1)
        .await
        .unwrap();
    assert!(service.resolve(actor).await.unwrap().has("daily_responses"));
    assert_eq!(
        service
            .activate_subscription(actor, unlimited.id, SubscriptionPeriod::OneMonth, 1)
            .await,
        Err(KindredError::AlreadySubscribed {
            actor,
            capability: unlimited.id
        })
    );

    service
        .record_interaction(actor, Uuid::new_v4(), InteractionKind::Reject)
        .await
        .unwrap();
    let usage = service.usage(actor).await.unwrap();
    assert_eq!(usage.count, 11);
    assert_eq!(usage.limit, None);

    service.revoke_grant(grant.id).await.unwrap();
    assert!(!service.resolve(actor).await.unwrap().has("daily_responses"));
    assert!(matches!(
        service
            .record_interaction(actor, Uuid::new_v4(), InteractionKind::Accept)
            .await,
        Err(KindredError::QuotaExceeded { .. })
    ));

    let day = usage_day(clock.now());
    assert_eq!(store.daily_usage(actor, day).await.unwrap(), 11);
    assert_eq!(store.count_interactions_on(actor, day).await.unwrap(), 11);
}

#[tokio::test]
async fn test_profiles_exclude_self_and_responded() {
    let (service, _, _) = memory_service(&KindredConfig {
        candidate_batch: 5,
        ..KindredConfig::default()
    });
    let me = service.sign_up(new_profile("me@example.com"), "pw").await.unwrap();
    let liked = service.sign_up(new_profile("liked@example.com"), "pw").await.unwrap();
    let fresh = service.sign_up(new_profile("fresh@example.com"), "pw").await.unwrap();

    service
        .record_interaction(me.id, liked.id, InteractionKind::Accept)
        .await
        .unwrap();
    assert_eq!(
        service
            .record_interaction(me.id, liked.id, InteractionKind::Reject)
            .await,
        Err(KindredError::DuplicateInteraction {
            from: me.id,
            to: liked.id
        })
    );
    assert!(matches!(
        service.record_interaction(me.id, me.id, InteractionKind::Accept).await,
        Err(KindredError::InvalidInput(_))
    ));

    let profiles = service.get_profiles(me.id).await.unwrap();
    assert_eq!(profiles, vec![fresh]);

    // The other direction is independent.
    service
        .record_interaction(liked.id, me.id, InteractionKind::Accept)
        .await
        .unwrap();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn test_concurrent_records_through_facade() {
    let (service, store, _) = memory_service(&KindredConfig::default());
    let service = Arc::new(service);
    let actor = Uuid::new_v4();

    let handles: Vec<_> = (0..20)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .record_interaction(actor, Uuid::new_v4(), InteractionKind::Accept)
                    .await
            })
        })
        .collect();

    let mut ok = 0;
    let mut quota = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => ok += 1,
            Err(KindredError::QuotaExceeded { .. }) => quota += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!((ok, quota), (10, 10));
    assert_eq!(store.daily_usage(actor, usage_day(noon())).await.unwrap(), 10);
}

#[tokio::test]
async fn test_deadline_drops_transaction() {
    let inner = MemoryStore::new();
    let store = Arc::new(SlowCommitStore {
        inner: inner.clone(),
        delay: Duration::from_millis(500),
    });
    let clock = Arc::new(kindred_common::ManualClock::new(noon()));
    let config = KindredConfig {
        request_timeout_ms: 50,
        ..KindredConfig::default()
    };
    let service = service_over(store, clock, &config);
    let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

    let err = service
        .record_interaction(a, b, InteractionKind::Accept)
        .await
        .unwrap_err();
    assert!(matches!(err, KindredError::StoreUnavailable(_)));
    assert!(err.kind().is_retryable());

    let day = usage_day(noon());
    assert_eq!(inner.daily_usage(a, day).await.unwrap(), 0);
    assert!(inner.interaction(a, b).await.unwrap().is_none());

    // The key lock went with the dropped transaction.
    let fast = service_over(
        Arc::new(inner.clone()),
        Arc::new(kindred_common::ManualClock::new(noon())),
        &KindredConfig::default(),
    );
    fast.record_interaction(a, b, InteractionKind::Accept).await.unwrap();
    assert_eq!(inner.daily_usage(a, day).await.unwrap(), 1);
}

#[tokio::test]
async fn test_unknown_capability_and_grant() {
    let (service, _, _) = memory_service(&KindredConfig::default());
    let missing = Uuid::new_v4();

    assert_eq!(
        service
            .activate_subscription(Uuid::new_v4(), missing, SubscriptionPeriod::SixMonths, 1)
            .await,
        Err(KindredError::CapabilityNotFound(missing))
    );
    assert_eq!(
        service.revoke_grant(missing).await,
        Err(KindredError::GrantNotFound(missing))
    );
    assert!(service.capabilities().await.unwrap().is_empty());
}
