//! Behavioural properties of deferred values, driven through the public API
//! on a deterministic `TaskQueue`.

use pledge::prelude::*;
use pledge_test::{
    ScriptedThenable, TestFault, assert_fulfilled, assert_pending, assert_rejected, delayed,
    delayed_reject, observe,
};
use std::cell::RefCell;
use std::rc::Rc;

type D<T> = Deferred<T, TestFault>;

fn settle(queue: &TaskQueue) {
    queue.run_until_idle().expect("queue should drain");
}

#[test]
fn test_settles_only_once() {
    let queue = TaskQueue::new();
    let (deferred, resolve, reject) = D::<u32>::channel(&queue.handle());

    resolve.fulfill(1);
    reject.reject(TestFault::msg("ignored"));
    resolve.fulfill(2);
    settle(&queue);
    assert_fulfilled!(deferred, 1);

    resolve.fulfill(3);
    reject.reject(TestFault::msg("still ignored"));
    settle(&queue);
    assert_fulfilled!(deferred, 1);
}

#[test]
fn test_adopted_thenable_cannot_resettle() {
    let queue = TaskQueue::new();
    let script = ScriptedThenable::new()
        .fulfill(1)
        .reject(TestFault::msg("late"))
        .fulfill(2)
        .fail_with(TestFault::msg("thrown after settling"));

    let adopted = D::<u32>::resolve(&queue.handle(), script);
    settle(&queue);
    assert_fulfilled!(adopted, 1);
}

#[test]
fn test_reactions_fire_once_in_registration_order() {
    let queue = TaskQueue::new();
    let (deferred, resolve, _) = D::<u32>::channel(&queue.handle());
    let seen = Rc::new(RefCell::new(Vec::new()));

    let probes: Vec<_> = (0..4)
        .map(|i| {
            let seen = Rc::clone(&seen);
            let tail = deferred.map(move |value| seen.borrow_mut().push((i, value)));
            observe(&tail)
        })
        .collect();

    resolve.fulfill(7);
    settle(&queue);

    assert_eq!(*seen.borrow(), vec![(0, 7), (1, 7), (2, 7), (3, 7)]);
    assert!(probes.iter().all(|probe| probe.calls() == 1));
}

#[test]
fn test_rejection_reactions_fire_in_order() {
    let queue = TaskQueue::new();
    let (deferred, _, reject) = D::<u32>::channel(&queue.handle());
    let seen = Rc::new(RefCell::new(Vec::new()));

    for i in 0..3 {
        let seen = Rc::clone(&seen);
        deferred.catch(move |reason| {
            seen.borrow_mut().push((i, reason.to_string()));
            Ok(Resolution::Value(0))
        });
    }

    reject.reject(TestFault::msg("no"));
    settle(&queue);
    let expected: Vec<_> = (0..3).map(|i| (i, "no".to_string())).collect();
    assert_eq!(*seen.borrow(), expected);
}

#[test]
fn test_returning_own_dependent_rejects() {
    let queue = TaskQueue::new();
    let slot: Rc<RefCell<Option<D<u32>>>> = Rc::default();
    let me = Rc::clone(&slot);

    let dependent = D::fulfilled(&queue.handle(), 1).and_then(move |_| {
        let me = me
            .borrow()
            .clone()
            .expect("dependent stored before the reaction runs");
        Ok(Resolution::Deferred(me))
    });
    *slot.borrow_mut() = Some(dependent.clone());

    settle(&queue);
    assert_rejected!(
        dependent,
        TestFault::Deferred(DeferredError::SelfResolution { id: dependent.id() })
    );
}

#[test]
fn test_thenable_returned_from_reaction_is_unwrapped() {
    let queue = TaskQueue::new();
    let handle = queue.handle();
    let later = handle.clone();

    let dependent = D::fulfilled(&handle, 1u32).and_then(move |_| {
        let inner = ScriptedThenable::<u32, TestFault>::new()
            .fulfill(9)
            .on_later_turn(&later);
        Ok(ScriptedThenable::new().resolve(inner).into_resolution())
    });

    settle(&queue);
    assert_fulfilled!(dependent, 9);
}

#[test]
fn test_thenable_first_capability_decides() {
    let queue = TaskQueue::new();
    let handle = queue.handle();

    let fulfil_then_reject = ScriptedThenable::new()
        .fulfill(1)
        .reject(TestFault::msg("x"));
    let reject_then_fulfil = ScriptedThenable::new()
        .reject(TestFault::msg("x"))
        .fulfill(1);

    let fulfil_first = D::<u32>::resolve(&handle, fulfil_then_reject);
    let reject_first = D::<u32>::resolve(&handle, reject_then_fulfil);

    settle(&queue);
    assert_fulfilled!(fulfil_first, 1);
    assert_rejected!(reject_first, TestFault::msg("x"));
}

#[test]
fn test_thenable_errors() {
    let queue = TaskQueue::new();
    let handle = queue.handle();

    let failing_then = ScriptedThenable::<u32, TestFault>::new()
        .fail_with(TestFault::msg("thrown"));
    let failing_probe = ScriptedThenable::<u32, TestFault>::new()
        .fulfill(1)
        .fail_probe(TestFault::msg("no then"));
    let probe_calls = failing_probe.then_calls();

    let thrown = D::resolve(&handle, failing_then);
    let unreadable = D::resolve(&handle, failing_probe);

    settle(&queue);
    assert_rejected!(thrown, TestFault::msg("thrown"));
    assert_rejected!(unreadable, TestFault::msg("no then"));
    assert_eq!(probe_calls.get(), 0);
}

#[test]
fn test_all_fails_fast() {
    let queue = TaskQueue::new();
    let handle = queue.handle();
    let inputs = vec![
        D::fulfilled(&handle, 1),
        D::reject(&handle, TestFault::msg("x")),
        delayed(&queue, 1_000, 3),
    ];

    let joined = D::all(&handle, inputs).unwrap();
    queue.run_ready();

    assert_rejected!(joined, TestFault::msg("x"));
    assert_eq!(queue.now(), 0);
}

#[test]
fn test_all_keeps_input_order() {
    let queue = TaskQueue::new();
    let handle = queue.handle();
    let inputs = vec![
        delayed(&queue, 5, 1),
        delayed(&queue, 1, 2),
        D::fulfilled(&handle, 3),
    ];

    let joined = D::all(&handle, inputs).unwrap();
    settle(&queue);
    assert_fulfilled!(joined, vec![1, 2, 3]);
}

#[test]
fn test_race_first_settlement_wins() {
    let queue = TaskQueue::new();
    let handle = queue.handle();
    let inputs = vec![delayed(&queue, 10, "slow"), delayed(&queue, 1, "fast")];

    let raced = D::race(&handle, inputs).unwrap();
    settle(&queue);
    assert_fulfilled!(raced, "fast");
}

#[test]
fn test_race_can_reject() {
    let queue = TaskQueue::new();
    let handle = queue.handle();
    let inputs = vec![
        delayed(&queue, 10, "slow"),
        delayed_reject(&queue, 2, TestFault::msg("timeout")),
    ];

    let raced = D::race(&handle, inputs).unwrap();
    settle(&queue);
    assert_rejected!(raced, TestFault::msg("timeout"));
}

#[test]
fn test_all_settled_and_any() {
    let queue = TaskQueue::new();
    let handle = queue.handle();

    let mixed = vec![
        delayed_reject(&queue, 3, TestFault::msg("a")),
        delayed(&queue, 1, 2u32),
    ];
    let late_success = vec![
        delayed_reject(&queue, 1, TestFault::msg("a")),
        delayed(&queue, 4, 5u32),
    ];
    let all_fail = vec![
        D::<u32>::reject(&handle, TestFault::msg("a")),
        D::<u32>::reject(&handle, TestFault::msg("b")),
    ];

    let settled = D::all_settled(&handle, mixed).unwrap();
    let first_ok = D::any(&handle, late_success).unwrap();
    let none_ok = D::any(&handle, all_fail).unwrap();

    settle(&queue);
    assert_fulfilled!(
        settled,
        vec![
            SettledOutcome::Rejected(TestFault::msg("a")),
            SettledOutcome::Fulfilled(2),
        ]
    );
    assert_fulfilled!(first_ok, 5);
    assert_rejected!(
        none_ok,
        TestFault::Deferred(DeferredError::AllRejected { count: 2 })
    );
}

#[test]
fn test_combinators_refuse_empty_input() {
    let queue = TaskQueue::new();
    let empty: Vec<D<u32>> = Vec::new();
    let err = D::all(&queue.handle(), empty).unwrap_err();
    assert_eq!(err, DeferredError::EmptySequence { combinator: "all" });
    assert!(queue.is_idle());
}

#[test]
fn test_missing_handlers_pass_through() {
    let queue = TaskQueue::new();
    let rejected = D::<String>::reject(&queue.handle(), TestFault::msg("err"));

    let passed = rejected.then_with(None, None);
    let recovered = passed.catch(|reason| match reason {
        TestFault::Message(text) => Ok(Resolution::Value(text)),
        other => Err(other),
    });

    settle(&queue);
    assert_rejected!(passed, TestFault::msg("err"));
    assert_fulfilled!(recovered, "err".to_string());
}

#[test]
fn test_finally_preserves_outcome() {
    let queue = TaskQueue::new();
    let handle = queue.handle();

    let kept = D::fulfilled(&handle, 5).finally(|| Ok(()));
    let ignored = D::fulfilled(&handle, 5).finally_await(|| Ok(Resolution::Value("ignored")));
    let still_rejected = D::<u32>::reject(&handle, TestFault::msg("original")).finally(|| Ok(()));

    settle(&queue);
    assert_fulfilled!(kept, 5);
    assert_fulfilled!(ignored, 5);
    assert_rejected!(still_rejected, TestFault::msg("original"));
}

#[test]
fn test_finally_can_introduce_rejection() {
    let queue = TaskQueue::new();
    let handle = queue.handle();
    let timers = queue.clone();

    let thrown = D::fulfilled(&handle, 5).finally(|| Err(TestFault::msg("boom")));
    let awaited = D::fulfilled(&handle, 5).finally_await(move || {
        let later = delayed_reject::<(), _>(&timers, 2, TestFault::msg("later"));
        Ok(Resolution::Deferred(later))
    });

    settle(&queue);
    assert_rejected!(thrown, TestFault::msg("boom"));
    assert_rejected!(awaited, TestFault::msg("later"));
}

#[test]
fn test_construction_time_settlement_is_deferred() {
    let queue = TaskQueue::new();
    let deferred = D::new(&queue.handle(), |resolve, _| resolve.fulfill(1));
    assert_pending!(deferred);

    let probe = observe(&deferred);
    assert!(!probe.is_settled());

    settle(&queue);
    assert_eq!(probe.value(), Some(1));
}

#[test]
fn test_reactions_on_settled_values_still_wait_a_turn() {
    let queue = TaskQueue::new();
    let deferred = D::fulfilled(&queue.handle(), 1);
    settle(&queue);

    let probe = observe(&deferred);
    assert!(!probe.is_settled());
    assert_eq!(queue.len(), 1);

    settle(&queue);
    assert_eq!(probe.value(), Some(1));
}

/// A thenable that always resolves with another of itself on the next turn.
struct Endless(SchedulerHandle);

impl Thenable<u8, TestFault> for Endless {
    fn then(
        self: Box<Self>,
        resolve: Resolver<u8, TestFault>,
        _: Rejecter<u8, TestFault>,
    ) -> Result<(), TestFault> {
        let Endless(handle) = *self;
        let next = handle.clone();
        handle.defer(move || resolve.resolve(Resolution::thenable(Endless(next))));
        Ok(())
    }
}

#[test]
fn test_turn_limit_stops_cyclic_thenables() {
    let config = RuntimeConfig::from_toml_str("max_turns = 100").unwrap();
    let queue = TaskQueue::with_config(&config);
    let handle = queue.handle();

    let never = D::<u8>::resolve(&handle, Resolution::thenable(Endless(handle.clone())));
    assert_eq!(
        queue.run_until_idle(),
        Err(QueueError::TurnLimitExceeded { limit: 100 })
    );
    assert_pending!(never);
}

#[tokio::test]
async fn test_await_on_local_scheduler() {
    let local = tokio::task::LocalSet::new();
    let result = local
        .run_until(async {
            let scheduler = LocalScheduler::handle();
            let values = vec![
                D::fulfilled(&scheduler, 1u32),
                D::resolve(&scheduler, ScriptedThenable::new().fulfill(2)),
            ];
            D::all(&scheduler, values).unwrap().await
        })
        .await;
    assert_eq!(result, Ok(vec![1, 2]));
}
