// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

mod common;

//======================================================================================================================
// Imports
//======================================================================================================================

use ::anyhow::Result;
use ::std::{
    cell::Cell,
    rc::Rc,
    time::{
        Duration,
        Instant,
    },
};
use ::syncdrive::{
    ensure_eq,
    ensure_neq,
    interpret_synchronous,
    interpret_synchronous_default,
    Config,
    Context,
    EventList,
    Fail,
    InterpreterId,
    MasterState,
    Rcode,
    Request,
    RequestId,
    RequestKind,
    RequestTable,
    SharedEventList,
};
use common::{
    step,
    CountingReactor,
    ScriptedInterpreter,
};

//======================================================================================================================
// Helpers
//======================================================================================================================

/// Yields `id` and wakes it after `delay` through `el`.
fn sleep(ctx: &mut Context<'_>, el: &SharedEventList, id: RequestId, delay: Duration) -> Result<Rcode, Fail> {
    el.insert_timer_in(delay, move |ctx: &mut Context<'_>| {
        if let Err(e) = ctx.mark_runnable(id) {
            panic!("mark_runnable() failed: {:?}", e);
        }
    });
    ctx.yield_request(id)?;
    Ok(Rcode::Yield)
}

//======================================================================================================================
// Tests
//======================================================================================================================

/// A request that completes on its first run is never waited for.
#[test]
fn completes_without_polling() -> Result<()> {
    let mut requests: RequestTable = RequestTable::default();
    let top: RequestId = requests.insert_external("top");
    let mut reactor: CountingReactor<EventList> = CountingReactor::new(EventList::default());
    let mut interpreter: ScriptedInterpreter = ScriptedInterpreter::default();

    let rcode: Rcode = interpret_synchronous(&mut reactor, &mut interpreter, &mut requests, top)?;
    ensure_eq!(rcode, Rcode::Ok);
    ensure_eq!(interpreter.calls.len(), 1);
    ensure_eq!(reactor.corrals, 0);
    Ok(())
}

/// The top level request waits for a child that is itself woken by a timer.
#[test]
fn child_woken_by_timer_wakes_parent() -> Result<()> {
    let mut requests: RequestTable = RequestTable::default();
    let top: RequestId = requests.insert_external("top");
    let el: SharedEventList = SharedEventList::default();
    let mut reactor: CountingReactor<SharedEventList> = CountingReactor::new(el.clone());
    let mut interpreter: ScriptedInterpreter = ScriptedInterpreter::default();

    interpreter.script(
        "top",
        vec![step(|ctx: &mut Context<'_>, id: RequestId| {
            ctx.spawn(Some(id), "child")?;
            ctx.yield_request(id)?;
            Ok(Rcode::Yield)
        })],
    );
    let el2: SharedEventList = el.clone();
    interpreter.script(
        "child",
        vec![
            step(move |ctx: &mut Context<'_>, id: RequestId| sleep(ctx, &el2, id, Duration::from_millis(1))),
            step(|ctx: &mut Context<'_>, id: RequestId| {
                let parent: Option<RequestId> = ctx.request(id)?.parent();
                if let Some(parent) = parent {
                    ctx.mark_runnable(parent)?;
                }
                Ok(Rcode::Updated)
            }),
        ],
    );

    let rcode: Rcode = interpret_synchronous(&mut reactor, &mut interpreter, &mut requests, top)?;
    ensure_eq!(rcode, Rcode::Ok);
    ensure_eq!(reactor.blocking, 1);
    ensure_eq!(reactor.services, 1);
    ensure_eq!(interpreter.runs_of("top"), 2);
    ensure_eq!(interpreter.runs_of("child"), 2);

    // The child still has a parent, which owns its cleanup.
    let children: Vec<RequestId> = requests.children(top).collect();
    ensure_eq!(children.len(), 1);
    for child in children {
        ensure_eq!(requests.remove(child).is_some(), true);
    }
    ensure_eq!(requests.len(), 1);
    Ok(())
}

/// A failing reactor ends the drive with the code held at that point.
#[test]
fn reactor_failure_returns_held_rcode() -> Result<()> {
    let mut requests: RequestTable = RequestTable::default();
    let top: RequestId = requests.insert_external("top");
    let mut reactor: CountingReactor<EventList> = CountingReactor::new(EventList::default());
    let mut interpreter: ScriptedInterpreter = ScriptedInterpreter::default();

    // Suspends and registers nothing that could ever wake it.
    interpreter.script(
        "top",
        vec![step(|ctx: &mut Context<'_>, id: RequestId| {
            ctx.yield_request(id)?;
            Ok(Rcode::Yield)
        })],
    );

    let rcode: Rcode = interpret_synchronous(&mut reactor, &mut interpreter, &mut requests, top)?;
    ensure_eq!(rcode, Rcode::Yield);
    ensure_eq!(reactor.corrals, 1);
    ensure_eq!(reactor.services, 0);
    ensure_eq!(interpreter.calls.len(), 1);
    Ok(())
}

/// An exiting reactor ends the drive the same way as a failing one.
#[test]
fn reactor_exit_stops_the_drive() -> Result<()> {
    let mut requests: RequestTable = RequestTable::default();
    let top: RequestId = requests.insert_external("top");
    let el: SharedEventList = SharedEventList::default();
    let mut reactor: SharedEventList = el.clone();
    let mut interpreter: ScriptedInterpreter = ScriptedInterpreter::default();

    interpreter.script(
        "top",
        vec![step(move |ctx: &mut Context<'_>, id: RequestId| {
            let rcode: Rcode = sleep(ctx, &el, id, Duration::from_millis(1))?;
            el.exit();
            Ok(rcode)
        })],
    );

    let rcode: Rcode = interpret_synchronous(&mut reactor, &mut interpreter, &mut requests, top)?;
    ensure_eq!(rcode, Rcode::Yield);
    ensure_eq!(interpreter.calls.len(), 1);
    Ok(())
}

/// A detached child is freed as soon as it finishes, while its former parent is still suspended.
#[test]
fn detached_request_is_freed_on_completion() -> Result<()> {
    let mut requests: RequestTable = RequestTable::default();
    let top: RequestId = requests.insert_external("top");
    let el: SharedEventList = SharedEventList::default();
    let mut reactor: SharedEventList = el.clone();
    let mut interpreter: ScriptedInterpreter = ScriptedInterpreter::default();
    let freed_before_parent_woke: Rc<Cell<bool>> = Rc::new(Cell::new(false));

    let freed: Rc<Cell<bool>> = freed_before_parent_woke.clone();
    interpreter.script(
        "top",
        vec![step(move |ctx: &mut Context<'_>, id: RequestId| {
            let child: RequestId = ctx.spawn(Some(id), "detached")?;
            ctx.detach(child)?;
            ensure_kind(ctx, child, RequestKind::Detached)?;
            el.insert_timer_in(Duration::from_millis(2), move |ctx: &mut Context<'_>| {
                freed.set(!ctx.requests().contains(child));
                if let Err(e) = ctx.mark_runnable(id) {
                    panic!("mark_runnable() failed: {:?}", e);
                }
            });
            ctx.yield_request(id)?;
            Ok(Rcode::Yield)
        })],
    );

    let rcode: Rcode = interpret_synchronous(&mut reactor, &mut interpreter, &mut requests, top)?;
    ensure_eq!(rcode, Rcode::Ok);
    ensure_eq!(freed_before_parent_woke.get(), true);
    ensure_eq!(interpreter.runs_of("detached"), 1);
    ensure_eq!(requests.len(), 1);
    Ok(())
}

/// A detached child that suspends is kept until it has finished.
#[test]
fn suspended_detached_request_is_kept() -> Result<()> {
    let mut requests: RequestTable = RequestTable::default();
    let top: RequestId = requests.insert_external("top");
    let el: SharedEventList = SharedEventList::default();
    let mut reactor: SharedEventList = el.clone();
    let mut interpreter: ScriptedInterpreter = ScriptedInterpreter::default();

    interpreter.script(
        "top",
        vec![step(|ctx: &mut Context<'_>, id: RequestId| {
            let child: RequestId = ctx.spawn(Some(id), "detached")?;
            ctx.detach(child)?;
            Ok(Rcode::Ok)
        })],
    );
    let el2: SharedEventList = el.clone();
    interpreter.script(
        "detached",
        vec![step(move |ctx: &mut Context<'_>, id: RequestId| {
            sleep(ctx, &el2, id, Duration::from_millis(1))
        })],
    );

    let rcode: Rcode = interpret_synchronous(&mut reactor, &mut interpreter, &mut requests, top)?;
    ensure_eq!(rcode, Rcode::Ok);
    ensure_eq!(interpreter.runs_of("detached"), 2);
    // Freed after its second run only.
    ensure_eq!(requests.len(), 1);
    Ok(())
}

/// A request stopped while queued is never run.
#[test]
fn stopped_queued_request_is_never_run() -> Result<()> {
    let mut requests: RequestTable = RequestTable::default();
    let top: RequestId = requests.insert_external("top");
    let el: SharedEventList = SharedEventList::default();
    let mut reactor: CountingReactor<SharedEventList> = CountingReactor::new(el.clone());
    let mut interpreter: ScriptedInterpreter = ScriptedInterpreter::default();

    interpreter.script(
        "top",
        vec![step(move |ctx: &mut Context<'_>, id: RequestId| {
            let victim: RequestId = ctx.spawn(Some(id), "victim")?;
            el.post(move |ctx: &mut Context<'_>| {
                if let Err(e) = ctx.stop(victim).and_then(|_| ctx.mark_runnable(id)) {
                    panic!("stop() failed: {:?}", e);
                }
            });
            ctx.yield_request(id)?;
            Ok(Rcode::Yield)
        })],
    );

    let rcode: Rcode = interpret_synchronous(&mut reactor, &mut interpreter, &mut requests, top)?;
    ensure_eq!(rcode, Rcode::Ok);
    ensure_eq!(interpreter.runs_of("victim"), 0);
    ensure_eq!(reactor.services, 1);

    let victims: Vec<RequestId> = requests.children(top).collect();
    ensure_eq!(victims.len(), 1);
    for victim in victims {
        ensure_eq!(
            requests.get(victim).map(|r| r.master_state()),
            Some(MasterState::StopProcessing)
        );
    }
    Ok(())
}

/// Stopping a request on the first run means there is nothing to wait for.
#[test]
fn stop_before_first_poll() -> Result<()> {
    let mut requests: RequestTable = RequestTable::default();
    let top: RequestId = requests.insert_external("top");
    let mut reactor: CountingReactor<EventList> = CountingReactor::new(EventList::default());
    let mut interpreter: ScriptedInterpreter = ScriptedInterpreter::default();

    interpreter.script(
        "top",
        vec![step(|ctx: &mut Context<'_>, id: RequestId| {
            let victim: RequestId = ctx.spawn(Some(id), "victim")?;
            ctx.stop(victim)?;
            ensure_scheduled(ctx, victim, false)?;
            Ok(Rcode::Noop)
        })],
    );

    let rcode: Rcode = interpret_synchronous(&mut reactor, &mut interpreter, &mut requests, top)?;
    ensure_eq!(rcode, Rcode::Noop);
    ensure_eq!(reactor.corrals, 0);
    ensure_eq!(interpreter.runs_of("victim"), 0);
    Ok(())
}

/// The binding and module of the request are restored after the drive, whatever happened during it.
#[test]
fn binding_is_restored() -> Result<()> {
    let mut requests: RequestTable = RequestTable::default();
    let top: RequestId = requests.insert_external("top");
    if let Some(request) = requests.get_mut(top) {
        request.bind(Some(InterpreterId(u64::MAX)));
        request.set_module(Some("caller".to_string()));
    }
    let mut reactor: EventList = EventList::default();
    let mut interpreter: ScriptedInterpreter = ScriptedInterpreter::default();

    interpreter.script(
        "top",
        vec![step(|ctx: &mut Context<'_>, id: RequestId| {
            let interpreter: InterpreterId = ctx.interpreter();
            let request: &mut Request = ctx.request_mut(id)?;
            if request.interpreter() != Some(interpreter) {
                return Ok(Rcode::Fail);
            }
            request.set_module(Some("callee".to_string()));
            Ok(Rcode::Handled)
        })],
    );

    let rcode: Rcode = interpret_synchronous(&mut reactor, &mut interpreter, &mut requests, top)?;
    ensure_eq!(rcode, Rcode::Handled);
    ensure_eq!(requests.get(top).and_then(|r| r.interpreter()), Some(InterpreterId(u64::MAX)));
    ensure_eq!(requests.get(top).and_then(|r| r.module().map(str::to_string)), Some("caller".to_string()));
    Ok(())
}

/// A drive started from inside another drive, over the same request, hands the request back when done.
#[test]
fn drives_nest() -> Result<()> {
    let mut requests: RequestTable = RequestTable::default();
    let top: RequestId = requests.insert_external("top");
    let mut reactor: EventList = EventList::default();
    let mut outer: ScriptedInterpreter = ScriptedInterpreter::default();

    outer.script(
        "top",
        vec![step(|ctx: &mut Context<'_>, id: RequestId| {
            let before: Option<InterpreterId> = ctx.request(id)?.interpreter();

            let el: SharedEventList = SharedEventList::default();
            let mut inner_reactor: SharedEventList = el.clone();
            let mut inner: ScriptedInterpreter = ScriptedInterpreter::default();
            inner.script(
                "top",
                vec![
                    step(move |ctx: &mut Context<'_>, id: RequestId| sleep(ctx, &el, id, Duration::from_millis(1))),
                    step(|_: &mut Context<'_>, _: RequestId| Ok(Rcode::Updated)),
                ],
            );
            let rcode: Rcode = interpret_synchronous(&mut inner_reactor, &mut inner, ctx.requests_mut(), id)?;

            let after: Option<InterpreterId> = ctx.request(id)?.interpreter();
            if before != after || after != Some(ctx.interpreter()) || inner.calls.len() != 2 {
                return Ok(Rcode::Fail);
            }
            Ok(rcode)
        })],
    );

    let rcode: Rcode = interpret_synchronous(&mut reactor, &mut outer, &mut requests, top)?;
    ensure_eq!(rcode, Rcode::Updated);
    Ok(())
}

/// Every drive gets its own interpreter instance.
#[test]
fn drives_use_distinct_interpreters() -> Result<()> {
    let mut requests: RequestTable = RequestTable::default();
    let top: RequestId = requests.insert_external("top");
    let mut reactor: EventList = EventList::default();
    let seen: Rc<Cell<Option<InterpreterId>>> = Rc::new(Cell::new(None));

    let mut interpreter: ScriptedInterpreter = ScriptedInterpreter::default();
    for _ in 0..2 {
        let seen: Rc<Cell<Option<InterpreterId>>> = seen.clone();
        interpreter.script(
            "top",
            vec![step(move |ctx: &mut Context<'_>, _: RequestId| {
                let rcode: Rcode = if seen.get() == Some(ctx.interpreter()) {
                    Rcode::Fail
                } else {
                    Rcode::Ok
                };
                seen.set(Some(ctx.interpreter()));
                Ok(rcode)
            })],
        );
    }

    ensure_eq!(interpret_synchronous(&mut reactor, &mut interpreter, &mut requests, top)?, Rcode::Ok);
    ensure_eq!(interpret_synchronous(&mut reactor, &mut interpreter, &mut requests, top)?, Rcode::Ok);
    ensure_neq!(seen.get(), None);
    Ok(())
}

/// Without a caller supplied reactor, a temporary event list is created and handed to the interpreter.
#[test]
fn default_event_list() -> Result<()> {
    let mut requests: RequestTable = RequestTable::default();
    let top: RequestId = requests.insert_external("top");
    let config: Config = Config::from_yaml("syncdrive:\n  max_wait_ms: 1\n")?;

    let rcode: Rcode = interpret_synchronous_default(&config, &mut requests, top, |el: &SharedEventList| {
        let el: SharedEventList = el.clone();
        let mut interpreter: ScriptedInterpreter = ScriptedInterpreter::default();
        interpreter.script(
            "top",
            vec![
                step(move |ctx: &mut Context<'_>, id: RequestId| sleep(ctx, &el, id, Duration::from_millis(3))),
                step(|_: &mut Context<'_>, _: RequestId| Ok(Rcode::Updated)),
            ],
        );
        interpreter
    })?;
    ensure_eq!(rcode, Rcode::Updated);
    Ok(())
}

/// Many children suspending and resuming in arbitrary order all complete.
#[test]
fn many_children_complete() -> Result<()> {
    const NUM_CHILDREN: u64 = 16;
    let mut requests: RequestTable = RequestTable::default();
    let top: RequestId = requests.insert_external("top");
    let el: SharedEventList = SharedEventList::default();
    let mut reactor: SharedEventList = el.clone();
    let mut interpreter: ScriptedInterpreter = ScriptedInterpreter::default();
    let remaining: Rc<Cell<u64>> = Rc::new(Cell::new(NUM_CHILDREN));

    let el2: SharedEventList = el.clone();
    interpreter.script(
        "top",
        vec![step(move |ctx: &mut Context<'_>, id: RequestId| {
            for i in 0..NUM_CHILDREN {
                let child: RequestId = ctx.spawn(Some(id), &format!("child-{}", i))?;
                ctx.detach(child)?;
            }
            // Wait for every child to report back.
            sleep(ctx, &el2, id, Duration::from_millis(NUM_CHILDREN + 5))
        })],
    );
    for i in 0..NUM_CHILDREN {
        let el: SharedEventList = el.clone();
        let remaining: Rc<Cell<u64>> = remaining.clone();
        interpreter.script(
            &format!("child-{}", i),
            vec![
                // Reverse order of spawning.
                step(move |ctx: &mut Context<'_>, id: RequestId| {
                    sleep(ctx, &el, id, Duration::from_millis(NUM_CHILDREN - i))
                }),
                step(move |_: &mut Context<'_>, _: RequestId| {
                    remaining.set(remaining.get() - 1);
                    Ok(Rcode::Ok)
                }),
            ],
        );
    }

    let rcode: Rcode = interpret_synchronous(&mut reactor, &mut interpreter, &mut requests, top)?;
    ensure_eq!(rcode, Rcode::Ok);
    ensure_eq!(remaining.get(), 0);
    // All detached children were freed.
    ensure_eq!(requests.len(), 1);
    ensure_eq!(el.num_timers(), 0);
    Ok(())
}

/// A request stopped while queued and then woken a second time is not counted as woken twice.
#[test]
fn wake_after_stop_keeps_suspended_count() -> Result<()> {
    let mut requests: RequestTable = RequestTable::default();
    let top: RequestId = requests.insert_external("top");
    let el: SharedEventList = SharedEventList::default();
    let mut reactor: SharedEventList = el.clone();
    let mut interpreter: ScriptedInterpreter = ScriptedInterpreter::default();

    interpreter.script(
        "top",
        vec![step(|ctx: &mut Context<'_>, id: RequestId| {
            ctx.spawn(None, "orphan")?;
            ctx.spawn(Some(id), "sibling")?;
            ctx.yield_request(id)?;
            Ok(Rcode::Yield)
        })],
    );
    let el2: SharedEventList = el.clone();
    interpreter.script(
        "orphan",
        vec![step(move |ctx: &mut Context<'_>, id: RequestId| {
            el2.insert_timer_in(Duration::from_millis(1), move |ctx: &mut Context<'_>| {
                if let Err(e) = ctx.mark_runnable(id).and_then(|_| ctx.stop(id)) {
                    panic!("stop() failed: {:?}", e);
                }
            });
            el2.insert_timer_in(Duration::from_millis(2), move |ctx: &mut Context<'_>| {
                if let Err(e) = ctx.mark_runnable(id) {
                    panic!("mark_runnable() failed: {:?}", e);
                }
            });
            ctx.yield_request(id)?;
            Ok(Rcode::Yield)
        })],
    );
    let el3: SharedEventList = el.clone();
    interpreter.script(
        "sibling",
        vec![
            step(move |ctx: &mut Context<'_>, id: RequestId| sleep(ctx, &el3, id, Duration::from_millis(20))),
            step(|ctx: &mut Context<'_>, id: RequestId| {
                let parent: Option<RequestId> = ctx.request(id)?.parent();
                if let Some(parent) = parent {
                    ctx.mark_runnable(parent)?;
                }
                Ok(Rcode::Ok)
            }),
        ],
    );

    let rcode: Rcode = interpret_synchronous(&mut reactor, &mut interpreter, &mut requests, top)?;
    ensure_eq!(rcode, Rcode::Ok);
    ensure_eq!(interpreter.runs_of("orphan"), 1);
    ensure_eq!(interpreter.runs_of("sibling"), 2);
    ensure_eq!(interpreter.runs_of("top"), 2);
    ensure_eq!(el.num_timers(), 0);
    Ok(())
}

/// A timer left behind by a freed request does not wake the request that reuses its slot.
#[test]
fn stale_wake_does_not_reach_new_request() -> Result<()> {
    const WAIT: Duration = Duration::from_millis(50);
    let mut requests: RequestTable = RequestTable::default();
    let top: RequestId = requests.insert_external("top");
    let el: SharedEventList = SharedEventList::default();
    let mut reactor: SharedEventList = el.clone();
    let mut interpreter: ScriptedInterpreter = ScriptedInterpreter::default();
    let freed: Rc<Cell<Option<RequestId>>> = Rc::new(Cell::new(None));
    let spawned: Rc<Cell<Option<RequestId>>> = Rc::new(Cell::new(None));
    let stale_wake: Rc<Cell<Option<Result<(), i32>>>> = Rc::new(Cell::new(None));
    let waited: Rc<Cell<Option<Duration>>> = Rc::new(Cell::new(None));

    let (el2, freed2, spawned2): (SharedEventList, Rc<Cell<Option<RequestId>>>, Rc<Cell<Option<RequestId>>>) =
        (el.clone(), freed.clone(), spawned.clone());
    interpreter.script(
        "top",
        vec![
            step(move |ctx: &mut Context<'_>, id: RequestId| {
                let child: RequestId = ctx.spawn(Some(id), "short-lived")?;
                ctx.detach(child)?;
                freed2.set(Some(child));
                sleep(ctx, &el2, id, Duration::from_millis(5))
            }),
            step(move |ctx: &mut Context<'_>, id: RequestId| {
                spawned2.set(Some(ctx.spawn(Some(id), "newcomer")?));
                ctx.yield_request(id)?;
                Ok(Rcode::Yield)
            }),
        ],
    );
    let (el2, stale_wake2): (SharedEventList, Rc<Cell<Option<Result<(), i32>>>>) = (el.clone(), stale_wake.clone());
    interpreter.script(
        "short-lived",
        vec![step(move |ctx: &mut Context<'_>, id: RequestId| {
            // Never cancelled.
            el2.insert_timer_in(Duration::from_millis(10), move |ctx: &mut Context<'_>| {
                stale_wake2.set(Some(ctx.mark_runnable(id).map_err(|e| e.errno)));
            });
            sleep(ctx, &el2, id, Duration::from_millis(1))
        })],
    );
    let (el2, waited2): (SharedEventList, Rc<Cell<Option<Duration>>>) = (el.clone(), waited.clone());
    let started: Rc<Cell<Option<Instant>>> = Rc::new(Cell::new(None));
    let started2: Rc<Cell<Option<Instant>>> = started.clone();
    interpreter.script(
        "newcomer",
        vec![
            step(move |ctx: &mut Context<'_>, id: RequestId| {
                started.set(Some(Instant::now()));
                sleep(ctx, &el2, id, WAIT)
            }),
            step(move |ctx: &mut Context<'_>, id: RequestId| {
                waited2.set(started2.get().map(|start| start.elapsed()));
                let parent: Option<RequestId> = ctx.request(id)?.parent();
                if let Some(parent) = parent {
                    ctx.mark_runnable(parent)?;
                }
                Ok(Rcode::Ok)
            }),
        ],
    );

    let rcode: Rcode = interpret_synchronous(&mut reactor, &mut interpreter, &mut requests, top)?;
    ensure_eq!(rcode, Rcode::Ok);
    ensure_eq!(interpreter.runs_of("short-lived"), 2);
    ensure_neq!(freed.get(), None);
    ensure_neq!(freed.get(), spawned.get());
    ensure_eq!(stale_wake.get(), Some(Err(libc::ENOENT)));
    ensure_eq!(waited.get().map(|waited| waited >= WAIT), Some(true));
    Ok(())
}

/// Finishing a top level request with a non-zero depth is a programming error.
#[test]
#[should_panic(expected = "bad log indentation")]
fn unbalanced_indentation_panics() {
    let mut requests: RequestTable = RequestTable::default();
    let top: RequestId = requests.insert_external("top");
    let mut reactor: EventList = EventList::default();
    let mut interpreter: ScriptedInterpreter = ScriptedInterpreter::default();
    interpreter.script(
        "top",
        vec![step(|ctx: &mut Context<'_>, id: RequestId| {
            ctx.request_mut(id)?.indent_push();
            Ok(Rcode::Ok)
        })],
    );
    let _ = interpret_synchronous(&mut reactor, &mut interpreter, &mut requests, top);
}

/// A stopped request is not held to the end-of-processing checks.
#[test]
fn stopped_request_skips_final_checks() -> Result<()> {
    let mut requests: RequestTable = RequestTable::default();
    let top: RequestId = requests.insert_external("top");
    let mut reactor: EventList = EventList::default();
    let mut interpreter: ScriptedInterpreter = ScriptedInterpreter::default();
    interpreter.script(
        "top",
        vec![step(|ctx: &mut Context<'_>, id: RequestId| {
            ctx.request_mut(id)?.indent_push();
            ctx.stop(id)?;
            Ok(Rcode::Reject)
        })],
    );

    let rcode: Rcode = interpret_synchronous(&mut reactor, &mut interpreter, &mut requests, top)?;
    ensure_eq!(rcode, Rcode::Reject);
    Ok(())
}

//======================================================================================================================
// Assertions
//======================================================================================================================

fn ensure_kind(ctx: &Context<'_>, id: RequestId, kind: RequestKind) -> Result<(), Fail> {
    if ctx.request(id)?.kind() != kind {
        return Err(Fail::new(libc::EINVAL, "unexpected request kind"));
    }
    Ok(())
}

fn ensure_scheduled(ctx: &Context<'_>, id: RequestId, scheduled: bool) -> Result<(), Fail> {
    if ctx.is_scheduled(id)? != scheduled {
        return Err(Fail::new(libc::EINVAL, "unexpected scheduling state"));
    }
    Ok(())
}
