mod common;

use common::spawn_on;
use concordis::executor::ManualExecutor;
use concordis::sync::Mutex;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[test]
fn lock_uncontended() {
    let exec = ManualExecutor::new();

    let mutex = Arc::new(Mutex::new(5usize));
    let locked = Arc::new(AtomicBool::new(false));
    let value_stored = Arc::new(AtomicUsize::new(0));

    let m = mutex.clone();
    let ex = exec.clone();
    let task_locked = locked.clone();
    let task_value = value_stored.clone();
    let task = spawn_on(&exec, async move {
        let guard = m.lock(ex).await;
        task_locked.store(true, Ordering::SeqCst);
        task_value.store(*guard, Ordering::SeqCst);
    });

    for _ in 0..10 {
        exec.run();
    }

    assert!(task.is_done());
    assert!(locked.load(Ordering::SeqCst));
    assert_eq!(value_stored.load(Ordering::SeqCst), 5);
}

#[test]
fn lock_serializes_tasks() {
    let exec = ManualExecutor::new();

    let mutex = Arc::new(Mutex::new(0usize));
    let value_stored = Arc::new(AtomicUsize::new(0));

    let m1 = mutex.clone();
    let ex1 = exec.clone();
    let v1 = value_stored.clone();
    let task1 = spawn_on(&exec, async move {
        let mut guard = m1.lock(ex1).await;
        v1.store(1, Ordering::SeqCst);
        *guard = 1;
    });

    let m2 = mutex.clone();
    let ex2 = exec.clone();
    let v2 = value_stored.clone();
    let task2 = spawn_on(&exec, async move {
        let mut guard = m2.lock(ex2).await;
        v2.store(2, Ordering::SeqCst);
        *guard = 2;
    });

    for _ in 0..10 {
        exec.run();
    }

    assert!(task1.is_done());
    assert!(task2.is_done());
    assert_eq!(value_stored.load(Ordering::SeqCst), 2);

    // The second task to lock observed the first one's write.
    let guard = mutex.try_lock().expect("no guard outstanding");
    assert_eq!(*guard, 2);
}

#[test]
fn guard_derefs_to_the_value() {
    let exec = ManualExecutor::new();

    let mutex = Arc::new(Mutex::new(String::new()));
    let len_seen = Arc::new(AtomicUsize::new(0));

    let m1 = mutex.clone();
    let ex1 = exec.clone();
    let task1 = spawn_on(&exec, async move {
        let mut guard = m1.lock(ex1).await;
        guard.push_str("Hello world");
    });

    let m2 = mutex.clone();
    let ex2 = exec.clone();
    let task_len = len_seen.clone();
    let task2 = spawn_on(&exec, async move {
        let guard = m2.lock(ex2).await;
        task_len.store(guard.len(), Ordering::SeqCst);
    });

    for _ in 0..10 {
        exec.run();
    }

    assert!(task1.is_done());
    assert!(task2.is_done());
    assert_eq!(len_seen.load(Ordering::SeqCst), 11);

    let guard = mutex.try_lock().expect("no guard outstanding");
    assert_eq!(*guard, "Hello world");
}

#[test]
fn parked_waiter_acquires_after_release() {
    let exec = ManualExecutor::new();

    let mutex = Arc::new(Mutex::new(0usize));
    let guard = mutex.try_lock().expect("fresh mutex");

    let m = mutex.clone();
    let ex = exec.clone();
    let task = spawn_on(&exec, async move {
        let mut guard = m.lock(ex).await;
        *guard += 1;
    });

    for _ in 0..10 {
        exec.run();
    }
    assert!(!task.is_done());

    // Releasing wakes the parked waiter through its executor.
    drop(guard);
    for _ in 0..10 {
        exec.run();
    }

    assert!(task.is_done());
    assert_eq!(*mutex.try_lock().expect("no guard outstanding"), 1);
}

#[test]
fn try_lock_fails_while_guard_outstanding() {
    let mutex = Mutex::new(7u32);

    let guard = mutex.try_lock().expect("fresh mutex");
    assert!(mutex.try_lock().is_none());

    drop(guard);
    assert!(mutex.try_lock().is_some());
}

#[test]
fn explicit_unlock_releases_early() {
    let mutex = Mutex::new(7u32);

    let guard = mutex.try_lock().expect("fresh mutex");
    guard.unlock();
    assert!(mutex.try_lock().is_some());
}

#[test]
fn destroy_task_while_awaiting_lock() {
    let exec = ManualExecutor::new();

    let mutex = Arc::new(Mutex::new(String::new()));
    let guard = mutex.try_lock().expect("fresh mutex");

    let m = mutex.clone();
    let ex = exec.clone();
    let task = spawn_on(&exec, async move {
        let _guard = m.lock(ex).await;
    });

    for _ in 0..10 {
        exec.run();
    }
    assert!(!task.is_done());

    // The task dies while parked; its waiter record turns stale and the
    // release must skip it without waking anything.
    drop(task);
    drop(guard);
    while exec.run() > 0 {}

    assert!(mutex.try_lock().is_some());
}

#[test]
fn exclusive_access_needs_no_guard() {
    let mut mutex = Mutex::new(3u32);
    *mutex.get_mut() += 1;
    assert_eq!(mutex.into_inner(), 4);
}
