use super::*;
use crate::proxy::common::circuit_breaker::{CircuitState, ManualClock};
use bastion_types::{BreakerCacheConfig, ConnectorKind, LoadBalancerKind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use url::Url;

fn endpoint(name: &str) -> Arc<Endpoint> {
    Arc::new(Endpoint {
        name: name.to_string(),
        group: "default-group".to_string(),
        target: Url::parse(&format!("http://localhost:8080/{name}")).expect("valid url"),
        weight: 1,
        connector: ConnectorKind::HttpProxy,
        mock: None,
    })
}

fn group(size: usize) -> Arc<EndpointGroup> {
    let endpoints = (1..=size).map(|i| endpoint(&format!("endpoint-{i}"))).collect();
    Arc::new(EndpointGroup::new("default-group", LoadBalancerKind::RoundRobin, endpoints))
}

fn failover(max_retries: u32, slow_ms: u64, max_failures: u32) -> FailoverConfig {
    FailoverConfig {
        enabled: true,
        max_retries,
        slow_call_duration_ms: slow_ms,
        max_failures,
        ..FailoverConfig::default()
    }
}

fn context(failover: FailoverConfig) -> RetryContext {
    RetryContext {
        api_id: "api-1".to_string(),
        subscription: None,
        failover,
        trace_id: "trace-1".to_string(),
    }
}

fn coordinator() -> RetryCoordinator {
    RetryCoordinator::new(Arc::new(CircuitBreakerManager::default()))
}

fn coordinator_with_clock() -> (RetryCoordinator, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let breaker = CircuitBreakerManager::with_clock(BreakerCacheConfig::default(), clock.clone());
    (RetryCoordinator::new(Arc::new(breaker)), clock)
}

/// Trip the breaker of `ctx` with a single refused request, then let the cool-down elapse.
async fn trip_and_cool_down(coordinator: &RetryCoordinator, clock: &ManualClock, ctx: &RetryContext) {
    let _ = coordinator
        .execute(ctx, &AttemptTarget::Group(group(1)), |_| async {
            Err::<&str, _>(ConnectorError::Connect("refused".to_string()))
        })
        .await;
    assert_eq!(
        coordinator.breaker().get_state(&ctx.breaker_key("default-group")),
        CircuitState::Open
    );
    clock.advance(Duration::from_secs(11));
}

#[tokio::test]
async fn test_fast_success_makes_single_call() {
    let coordinator = coordinator();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let delivered = coordinator
        .execute(&context(failover(2, 500, 5)), &AttemptTarget::Group(group(1)), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, ConnectorError>("ok") }
        })
        .await
        .expect("delivered");

    assert_eq!(delivered.value, "ok");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(delivered.attempts[0].outcome, AttemptOutcome::Success);
}

#[tokio::test]
async fn test_failing_backend_receives_retries_plus_one_calls() {
    let coordinator = coordinator();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let result = coordinator
        .execute(&context(failover(2, 500, 5)), &AttemptTarget::Group(group(1)), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(ConnectorError::Connect("refused".to_string())) }
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(matches!(result, Err(ProxyError::BudgetExhausted { attempts: 3, .. })));
}

#[tokio::test]
async fn test_race_mode_abandons_slow_calls() {
    let coordinator = coordinator();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let started = Instant::now();

    let result = coordinator
        .execute(&context(failover(2, 50, 5)), &AttemptTarget::Group(group(1)), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async {
                tokio::time::sleep(Duration::from_millis(400)).await;
                Ok::<_, ConnectorError>("late")
            }
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert!(matches!(result, Err(ProxyError::BudgetExhausted { attempts: 3, .. })));
    assert!(started.elapsed() < Duration::from_millis(1000), "slow calls must not be awaited");
}

#[tokio::test]
async fn test_measure_mode_forwards_slow_success_on_last_attempt() {
    let coordinator = coordinator();
    let mut config = failover(1, 10, 5);
    config.slow_call_mode = SlowCallMode::Measure;

    let delivered = coordinator
        .execute(&context(config), &AttemptTarget::Group(group(1)), |_| async {
            tokio::time::sleep(Duration::from_millis(40)).await;
            Ok::<_, ConnectorError>("slow but fine")
        })
        .await
        .expect("slow success forwarded");

    assert_eq!(delivered.value, "slow but fine");
    let outcomes: Vec<_> = delivered.attempts.iter().map(|a| a.outcome).collect();
    assert_eq!(outcomes, vec![AttemptOutcome::SlowSuccess, AttemptOutcome::SlowSuccess]);
}

#[tokio::test]
async fn test_success_on_final_retry_visits_each_endpoint_once() {
    let coordinator = coordinator();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);

    let delivered = coordinator
        .execute(&context(failover(2, 500, 5)), &AttemptTarget::Group(group(3)), move |ep| {
            let mut log = log.lock().expect("lock");
            log.push(ep.name.clone());
            let fail = log.len() < 3;
            async move {
                if fail {
                    Err(ConnectorError::Call("reset".to_string()))
                } else {
                    Ok(ep.name.clone())
                }
            }
        })
        .await
        .expect("third attempt wins");

    let mut visited = seen.lock().expect("lock").clone();
    assert_eq!(delivered.value, visited[2]);
    visited.sort();
    assert_eq!(visited, vec!["endpoint-1", "endpoint-2", "endpoint-3"]);
    assert_eq!(delivered.attempts.len(), 3);
}

#[tokio::test]
async fn test_pinned_endpoint_receives_every_attempt() {
    let coordinator = coordinator();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);
    let pinned = group(3).find("endpoint-2").expect("member");

    let _ = coordinator
        .execute(&context(failover(2, 500, 5)), &AttemptTarget::Endpoint(pinned), move |ep| {
            log.lock().expect("lock").push(ep.name.clone());
            async { Err::<(), _>(ConnectorError::Call("boom".to_string())) }
        })
        .await;

    assert_eq!(*seen.lock().expect("lock"), vec!["endpoint-2"; 3]);
}

#[tokio::test]
async fn test_open_circuit_rejects_without_calling() {
    let coordinator = coordinator();
    let calls = Arc::new(AtomicUsize::new(0));
    let ctx = context(failover(1, 500, 2));
    let target = AttemptTarget::Group(group(1));

    for _ in 0..2 {
        let counter = Arc::clone(&calls);
        let _ = coordinator
            .execute(&ctx, &target, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Err::<(), _>(ConnectorError::Connect("refused".to_string())) }
            })
            .await;
    }

    assert_eq!(calls.load(Ordering::SeqCst), 2, "second request must be rejected up front");
    assert_eq!(
        coordinator.breaker().get_state(&ctx.breaker_key("default-group")),
        CircuitState::Open
    );
}

#[tokio::test]
async fn test_subscription_scope_is_isolated() {
    let coordinator = coordinator();
    let keyless = context(failover(0, 500, 1));
    let mut subscribed = keyless.clone();
    subscribed.subscription = Some("sub-1".to_string());
    let target = AttemptTarget::Group(group(1));

    let _ = coordinator
        .execute(&keyless, &target, |_| async {
            Err::<(), _>(ConnectorError::Connect("refused".to_string()))
        })
        .await;

    assert!(matches!(
        coordinator.execute(&keyless, &target, |_| async { Ok::<_, ConnectorError>(()) }).await,
        Err(ProxyError::CircuitOpen { .. })
    ));
    assert!(coordinator
        .execute(&subscribed, &target, |_| async { Ok::<_, ConnectorError>(()) })
        .await
        .is_ok());
}

#[tokio::test]
async fn test_disabled_failover_single_attempt_no_breaker() {
    let coordinator = coordinator();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let result = coordinator
        .execute(&context(FailoverConfig::default()), &AttemptTarget::Group(group(2)), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(ConnectorError::Connect("refused".to_string())) }
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(matches!(result, Err(ProxyError::ConnectFailure { .. })));
    assert!(coordinator.breaker().is_empty());
}

#[tokio::test]
async fn test_tripping_attempt_abandons_remaining_retries() {
    let (coordinator, _clock) = coordinator_with_clock();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let result = coordinator
        .execute(&context(failover(2, 500, 1)), &AttemptTarget::Group(group(2)), move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err::<(), _>(ConnectorError::Call("reset".to_string())) }
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1, "open breaker must not be dialed again");
    assert!(matches!(result, Err(ProxyError::CircuitOpen { .. })));
}

#[tokio::test]
async fn test_failed_half_open_probe_is_not_retried() {
    let (coordinator, clock) = coordinator_with_clock();
    let ctx = context(failover(2, 500, 1));
    trip_and_cool_down(&coordinator, &clock, &ctx).await;

    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let result = coordinator
        .execute(&ctx, &AttemptTarget::Group(group(1)), move |_| {
            let call = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if call == 0 {
                    Err(ConnectorError::Call("reset".to_string()))
                } else {
                    Ok("recovered")
                }
            }
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(matches!(result, Err(ProxyError::CircuitOpen { .. })));
    assert_eq!(
        coordinator.breaker().get_state(&ctx.breaker_key("default-group")),
        CircuitState::Open
    );
}

#[tokio::test]
async fn test_successful_half_open_probe_closes_circuit() {
    let (coordinator, clock) = coordinator_with_clock();
    let ctx = context(failover(2, 500, 1));
    trip_and_cool_down(&coordinator, &clock, &ctx).await;
    let target = AttemptTarget::Group(group(1));

    let probe = coordinator
        .execute(&ctx, &target, |_| async { Ok::<_, ConnectorError>("recovered") })
        .await
        .expect("probe delivered");
    assert_eq!(probe.value, "recovered");
    assert_eq!(
        coordinator.breaker().get_state(&ctx.breaker_key("default-group")),
        CircuitState::Closed
    );

    assert!(coordinator
        .execute(&ctx, &target, |_| async { Ok::<_, ConnectorError>("next") })
        .await
        .is_ok());
}

#[tokio::test]
async fn test_slow_calls_on_three_endpoints_deliver_fast_third() {
    let coordinator = coordinator();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&seen);

    let delivered = coordinator
        .execute(&context(failover(2, 50, 5)), &AttemptTarget::Group(group(3)), move |ep| {
            let mut log = log.lock().expect("lock");
            log.push(ep.name.clone());
            let slow = log.len() < 3;
            async move {
                if slow {
                    tokio::time::sleep(Duration::from_millis(300)).await;
                }
                Ok::<_, ConnectorError>(ep.name.clone())
            }
        })
        .await
        .expect("third attempt wins");

    let visited = seen.lock().expect("lock").clone();
    assert_eq!(delivered.value, visited[2]);
    let outcomes: Vec<_> = delivered.attempts.iter().map(|a| a.outcome).collect();
    assert_eq!(
        outcomes,
        vec![AttemptOutcome::SlowCall, AttemptOutcome::SlowCall, AttemptOutcome::Success]
    );
}
