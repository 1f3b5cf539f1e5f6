//! Per-owner work queue behavior.

use givetrack_service::{
    Action, ActionHandlers, Dispatcher, Entities, Request, ServiceConfig, ServiceError,
};
use givetrack_store::{Allocation, Collection, HistoryEntry, MemoryStore, OwnerId};
use givetrack_sync_engine::SyncEngine;
use givetrack_testkit::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn dispatcher() -> (Dispatcher, Arc<MemoryStore>) {
    dispatcher_with(ServiceConfig::default().with_queue_capacity(4))
}

fn dispatcher_with(config: ServiceConfig) -> (Dispatcher, Arc<MemoryStore>) {
    let local = Arc::new(MemoryStore::new());
    let remote = Arc::new(MemoryStore::new());
    let engine = SyncEngine::new(config.sync.clone(), local.clone(), remote);
    let handlers = ActionHandlers::new(config, Arc::new(engine)).unwrap();
    (Dispatcher::new(Arc::new(handlers)), local)
}

fn add(owner: &OwnerId, id: &str) -> Request {
    Request::new(
        owner.clone(),
        Action::Add(Entities::Allocation(vec![Allocation::new(owner.clone(), id, id)])),
    )
}

#[tokio::test]
async fn requests_run_in_order() {
    let (dispatcher, local) = dispatcher();
    let owner = owner("u1");
    seed(local.as_ref(), &[profile(&owner)]);

    for i in 0..10 {
        dispatcher.dispatch(add(&owner, &format!("b{i}"))).await.unwrap();
    }
    dispatcher
        .dispatch(Request::new(owner.clone(), Action::Commit(Entities::Allocation(Vec::new()))))
        .await
        .unwrap();
    dispatcher.flush(&owner).await.unwrap();

    let allocations: Vec<Allocation> = read_all(local.as_ref(), &owner);
    assert_eq!(allocations.len(), 10);
    assert_proportionate(&allocations);

    // The commit saw every add: only the first beneficiary holds a share.
    let history: Vec<HistoryEntry> = read_all(local.as_ref(), &owner);
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].beneficiary_id, "b0");

    let stats = dispatcher.stats();
    assert_eq!(stats.completed, 11);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.workers, 1);
}

#[tokio::test]
async fn failures_are_counted_not_returned() {
    let (dispatcher, _local) = dispatcher();
    let owner = owner("u1");

    // No profile: the commit fails inside the worker.
    let queued = dispatcher
        .dispatch(Request::new(owner.clone(), Action::Commit(Entities::Allocation(Vec::new()))))
        .await;
    assert!(queued.is_ok());
    dispatcher.flush(&owner).await.unwrap();

    let stats = dispatcher.stats();
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.completed, 0);
}

#[tokio::test]
async fn owners_get_separate_workers() {
    let (dispatcher, local) = dispatcher();
    let alice = owner("alice");
    let bob = owner("bob");

    dispatcher.dispatch(add(&alice, "a1")).await.unwrap();
    dispatcher.dispatch(add(&bob, "b1")).await.unwrap();
    dispatcher.dispatch(add(&bob, "b2")).await.unwrap();
    dispatcher.flush(&alice).await.unwrap();
    dispatcher.flush(&bob).await.unwrap();

    assert_eq!(dispatcher.stats().workers, 2);
    assert_eq!(read_all::<Allocation>(local.as_ref(), &alice).len(), 1);
    assert_eq!(read_all::<Allocation>(local.as_ref(), &bob).len(), 2);
}

#[tokio::test]
async fn shutdown_drains_queues() {
    let (dispatcher, local) = dispatcher();
    let owner = owner("u1");

    for i in 0..5 {
        dispatcher.dispatch(add(&owner, &format!("b{i}"))).await.unwrap();
    }
    dispatcher.shutdown().await;

    assert_eq!(read_all::<Allocation>(local.as_ref(), &owner).len(), 5);
    assert_eq!(dispatcher.stats().workers, 0);

    // A later request starts a fresh worker.
    dispatcher
        .dispatch(Request::new(owner.clone(), Action::Reset(Collection::Allocation)))
        .await
        .unwrap();
    dispatcher.flush(&owner).await.unwrap();
    assert!(read_all::<Allocation>(local.as_ref(), &owner).is_empty());
}

#[tokio::test]
async fn idle_workers_are_reaped() {
    let (dispatcher, local) = dispatcher_with(
        ServiceConfig::default()
            .with_queue_capacity(4)
            .with_worker_idle_timeout(Duration::from_millis(50)),
    );
    let alice = owner("alice");
    let bob = owner("bob");

    dispatcher.dispatch(add(&alice, "a1")).await.unwrap();
    dispatcher.dispatch(add(&bob, "b1")).await.unwrap();
    dispatcher.flush(&alice).await.unwrap();
    dispatcher.flush(&bob).await.unwrap();
    assert_eq!(dispatcher.stats().workers, 2);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(dispatcher.stats().workers, 0);

    // The owner's next request starts a new worker.
    dispatcher.dispatch(add(&alice, "a2")).await.unwrap();
    dispatcher.flush(&alice).await.unwrap();
    assert_eq!(dispatcher.stats().workers, 1);
    assert_eq!(read_all::<Allocation>(local.as_ref(), &alice).len(), 2);
    assert_eq!(dispatcher.stats().completed, 3);

    dispatcher.shutdown().await;
}

#[test]
fn worker_closed_is_not_retryable() {
    assert!(!ServiceError::WorkerClosed.is_retryable());
}
