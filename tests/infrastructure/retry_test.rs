use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use examsmith::infrastructure::retry::{BackoffPolicy, RetryError, retry_with_backoff};
use tokio_util::sync::CancellationToken;

fn policy(max_attempts: u32) -> BackoffPolicy {
    BackoffPolicy {
        max_attempts,
        base_delay: Duration::from_millis(100),
        max_delay: Duration::from_secs(1),
        deadline: Duration::from_secs(60),
        jitter: 0.0,
    }
}

async fn flaky(calls: Arc<AtomicU32>, succeed_on: u32) -> Result<&'static str, String> {
    let call = calls.fetch_add(1, Ordering::SeqCst) + 1;
    if call >= succeed_on {
        Ok("connected")
    } else {
        Err(format!("refused on call {call}"))
    }
}

#[test]
fn given_policy_without_jitter_when_computing_delays_then_doubles_up_to_cap() {
    let policy = policy(10);

    let delays: Vec<_> = (1..=6).map(|a| policy.delay_for(a)).collect();

    assert_eq!(
        delays,
        vec![
            Duration::from_millis(100),
            Duration::from_millis(200),
            Duration::from_millis(400),
            Duration::from_millis(800),
            Duration::from_secs(1),
            Duration::from_secs(1),
        ]
    );
}

#[test]
fn given_jitter_when_computing_delay_then_stays_within_band() {
    let policy = BackoffPolicy {
        jitter: 0.2,
        ..policy(10)
    };

    for _ in 0..100 {
        let delay = policy.delay_for(2);
        assert!(delay >= Duration::from_millis(159), "{delay:?}");
        assert!(delay <= Duration::from_millis(241), "{delay:?}");
    }
}

#[tokio::test(start_paused = true)]
async fn given_dependency_recovers_when_retrying_then_returns_success() {
    let calls = Arc::new(AtomicU32::new(0));

    let result = retry_with_backoff("db connect", &policy(5), &CancellationToken::new(), || {
        flaky(Arc::clone(&calls), 3)
    })
    .await;

    assert_eq!(result.unwrap(), "connected");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn given_dependency_never_recovers_when_retrying_then_exhausts_attempts() {
    let calls = Arc::new(AtomicU32::new(0));

    let result = retry_with_backoff("db connect", &policy(4), &CancellationToken::new(), || {
        flaky(Arc::clone(&calls), u32::MAX)
    })
    .await;

    match result {
        Err(RetryError::Exhausted {
            attempts,
            last_error,
            ..
        }) => {
            assert_eq!(attempts, 4);
            assert_eq!(last_error, "refused on call 4");
        }
        other => panic!("expected exhaustion, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn given_short_deadline_when_retrying_then_stops_before_exceeding_it() {
    let calls = Arc::new(AtomicU32::new(0));
    let policy = BackoffPolicy {
        deadline: Duration::from_millis(250),
        ..policy(10)
    };

    let result = retry_with_backoff("broker connect", &policy, &CancellationToken::new(), || {
        flaky(Arc::clone(&calls), u32::MAX)
    })
    .await;

    assert!(matches!(result, Err(RetryError::DeadlineExceeded { .. })));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn given_cancelled_token_when_retrying_then_returns_cancelled() {
    let cancel = CancellationToken::new();
    cancel.cancel();

    let result: Result<(), RetryError<String>> =
        retry_with_backoff("db connect", &policy(5), &cancel, || async {
            Err::<(), _>("unreachable".to_string())
        })
        .await;

    assert!(matches!(result, Err(RetryError::Cancelled { .. })));
}
