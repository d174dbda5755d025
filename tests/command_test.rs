use cordon::{Command, CommandError, ExecutorPool, PoolRegistry, ResultSender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::{sleep, Duration};

#[tokio::test]
async fn test_execute_returns_work_value() {
    let result = Command::new(|tx: ResultSender<i32>| async move {
        let _ = tx.send(Ok(1)).await;
    })
    .with_fallback(|_err| async move { Ok(0) })
    .execute()
    .await;

    assert_eq!(result, Ok(1), "Success should pass through untouched by the fallback");
}

#[tokio::test]
async fn test_queue_resolves_to_same_result() {
    let command = Command::new(|tx: ResultSender<i32>| async move {
        let _ = tx.send(Ok(1)).await;
    });

    let mut future = command.queue();
    assert_eq!(future.value().await, Ok(1));
    // Memoized; a second call must not block or re-run
    assert_eq!(future.value().await, Ok(1));
}

#[tokio::test]
async fn test_error_without_fallback_is_verbatim() {
    let result = Command::new(|tx: ResultSender<i32>| async move {
        let _ = tx.send(Err(CommandError::run("failure"))).await;
    })
    .execute()
    .await;

    let err = result.expect_err("Work error with no fallback should surface");
    assert_eq!(err.to_string(), "failure", "Error text should match what the work emitted");
}

#[tokio::test]
async fn test_fallback_absorbs_run_error() {
    let result = Command::new(|tx: ResultSender<i32>| async move {
        let _ = tx.send(Err(CommandError::run("sup"))).await;
    })
    .with_fallback(|_err| async move { Ok(1) })
    .execute()
    .await;

    assert_eq!(result, Ok(1), "Fallback value should be the final result");
}

#[tokio::test]
async fn test_fallback_absorbs_timeout() {
    let result = Command::new(|tx: ResultSender<i32>| async move {
        sleep(Duration::from_millis(500)).await;
        let _ = tx.send(Ok(2)).await;
    })
    .with_timeout(Duration::from_millis(30))
    .with_fallback(|err| async move {
        assert!(matches!(err, CommandError::Timeout(_)), "Trigger should be the timeout");
        Ok(1)
    })
    .execute()
    .await;

    assert_eq!(result, Ok(1), "Timeout should route to the fallback like a run error");
}

#[tokio::test]
async fn test_full_pool_rejects_third_command() {
    let pool = Arc::new(ExecutorPool::new("full_pool_test", 2));

    let occupy = |pool: Arc<ExecutorPool>| {
        Command::new(|tx: ResultSender<i32>| async move {
            sleep(Duration::from_millis(100)).await;
            let _ = tx.send(Ok(0)).await;
        })
        .with_pool(pool)
        .with_fallback(|_err| async move { Ok(1) })
        .queue()
    };

    let mut future1 = occupy(pool.clone());
    let mut future2 = occupy(pool.clone());

    // Give both queued commands time to take their tickets
    sleep(Duration::from_millis(20)).await;
    assert_eq!(pool.stats().active, 2, "Both tickets should be held");

    let ran = Arc::new(AtomicBool::new(false));
    let ran_clone = ran.clone();
    let result = Command::new(move |tx: ResultSender<i32>| async move {
        ran_clone.store(true, Ordering::SeqCst);
        let _ = tx.send(Ok(2)).await;
    })
    .with_pool(pool.clone())
    .with_fallback(|err| async move {
        assert!(matches!(err, CommandError::PoolExhausted(_)));
        Ok(1)
    })
    .execute()
    .await;

    assert_eq!(result, Ok(1), "Third command should resolve via its fallback");
    assert!(!ran.load(Ordering::SeqCst), "Rejected work function must never run");

    assert_eq!(future1.value().await, Ok(0));
    assert_eq!(future2.value().await, Ok(0));
    assert_eq!(pool.stats().active, 0, "All tickets released after completion");
}

#[tokio::test]
async fn test_open_circuit_blocks_until_closed() {
    let pool = Arc::new(ExecutorPool::new("gated_pool", 5));
    pool.circuit().set_open(true);

    let ran = Arc::new(AtomicBool::new(false));
    for _ in 0..3 {
        let ran_clone = ran.clone();
        let result = Command::new(move |tx: ResultSender<i32>| async move {
            ran_clone.store(true, Ordering::SeqCst);
            let _ = tx.send(Ok(1)).await;
        })
        .with_pool(pool.clone())
        .execute()
        .await;

        let err = result.expect_err("Open circuit should reject every invocation");
        assert!(matches!(err, CommandError::CircuitOpen(_)));
    }
    assert!(!ran.load(Ordering::SeqCst), "Work must never run while the circuit is open");
    assert_eq!(pool.stats().active, 0, "No ticket should be taken while open");

    pool.circuit().set_open(false);
    let result = Command::new(|tx: ResultSender<i32>| async move {
        let _ = tx.send(Ok(1)).await;
    })
    .with_pool(pool.clone())
    .execute()
    .await;

    assert_eq!(result, Ok(1), "Closing the circuit should restore admission");
}

#[tokio::test]
async fn test_observe_forwards_items_in_order() {
    // The observer callback is synchronous, so a std mutex is the right guard
    let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
    let seen_clone = seen.clone();

    let handle = Command::new(|tx: ResultSender<i32>| async move {
        let _ = tx.send(Ok(1)).await;
        let _ = tx.send(Ok(2)).await;
        let _ = tx.send(Ok(3)).await;
    })
    .with_observer(move |item| {
        if let Ok(value) = item {
            seen_clone.lock().unwrap().push(value);
        }
    })
    .observe();

    handle.await.unwrap();

    let items = seen.lock().unwrap();
    assert_eq!(*items, vec![1, 2, 3], "Items should arrive in emission order");
    assert_eq!(items.iter().sum::<i32>(), 6);
}

#[tokio::test]
async fn test_registry_shares_capacity_across_handles() {
    let registry = PoolRegistry::new();

    let pool_a = registry.get_or_create("shared_dep", 1).await;
    let pool_b = registry.get_or_create("shared_dep", 1).await;
    assert!(Arc::ptr_eq(&pool_a, &pool_b), "Same name should yield the same pool");

    let mut slow = Command::new(|tx: ResultSender<i32>| async move {
        sleep(Duration::from_millis(100)).await;
        let _ = tx.send(Ok(0)).await;
    })
    .with_pool(pool_a)
    .queue();

    sleep(Duration::from_millis(20)).await;

    // The ticket taken through the first handle is visible through the second
    let result = Command::new(|tx: ResultSender<i32>| async move {
        let _ = tx.send(Ok(2)).await;
    })
    .with_pool(pool_b)
    .execute()
    .await;

    assert!(
        matches!(result, Err(CommandError::PoolExhausted(_))),
        "Second handle should see the pool as full"
    );

    assert_eq!(slow.value().await, Ok(0));
    registry.reset().await;
    assert!(registry.get("shared_dep").await.is_none(), "Reset should clear entries");
}
