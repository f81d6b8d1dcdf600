// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Synchronous interpreter driver.
//!
//! Runs a request to completion from a context that cannot suspend. The request (and anything it spawns) may yield
//! any number of times; the driver alternates between gathering events from a [Reactor] and resuming runnable requests
//! until nothing is runnable and nothing is suspended, then returns the final result code of the request.
//!
//! The use cases for this are limited. Work that can run on a long lived event loop should do so.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::runtime::{
    config::Config,
    context::{
        Context,
        Interpret,
    },
    event::SharedEventList,
    fail::Fail,
    hooks::RequestHooks,
    rcode::Rcode,
    reactor::{
        Corral,
        Reactor,
    },
    request::{
        InterpreterId,
        MasterState,
        Request,
        RequestId,
        RequestTable,
    },
    runnable::RunnableSet,
};
use ::std::{
    sync::atomic::{
        AtomicU64,
        Ordering,
    },
    time::Instant,
};

//======================================================================================================================
// Static Variables
//======================================================================================================================

/// Source of interpreter identities.
static NEXT_INTERPRETER_ID: AtomicU64 = AtomicU64::new(1);

//======================================================================================================================
// Structures
//======================================================================================================================

/// Scheduler state of one synchronous drive.
pub struct SynchronousScheduler {
    /// Requests ready to run.
    runnable: RunnableSet,
    /// Number of requests suspended and not yet marked runnable.
    yielded: usize,
    /// Interpreter instance created for this drive.
    interpreter: InterpreterId,
}

//======================================================================================================================
// Associate Functions
//======================================================================================================================

impl SynchronousScheduler {
    /// Allocates scheduler state bound to a fresh interpreter instance.
    pub fn new() -> Self {
        Self {
            runnable: RunnableSet::default(),
            yielded: 0,
            interpreter: InterpreterId(NEXT_INTERPRETER_ID.fetch_add(1, Ordering::Relaxed)),
        }
    }

    pub fn interpreter(&self) -> InterpreterId {
        self.interpreter
    }

    pub fn num_runnable(&self) -> usize {
        self.runnable.len()
    }

    pub fn num_yielded(&self) -> usize {
        self.yielded
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl Default for SynchronousScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestHooks for SynchronousScheduler {
    fn init_internal(&mut self, request: &mut Request) {
        trace!("Initialising internal synchronous request {}", request);
        request.bind(Some(self.interpreter));
        self.runnable.insert(request.id());
    }

    fn done_external(&mut self, request: &mut Request, _rcode: Rcode) {
        if request.master_state() != MasterState::StopProcessing {
            // A top level request that finishes with a non-zero depth skipped an exit somewhere.
            assert!(
                request.parent().is_some() || request.indent() == 0,
                "Request {} bad log indentation - expected 0 got {}",
                request,
                request.indent()
            );
            assert!(
                !request.is_resumable(),
                "Request {} is marked as yielded at end of processing",
                request
            );
        }
        trace!("Synchronous done external request {}", request);
    }

    fn done_internal(&mut self, request: &mut Request, _rcode: Rcode) {
        // Cleaned up by whatever spawned it.
        trace!("Done synchronous internal request {}", request);
    }

    fn done_detached(&mut self, request: &mut Request, _rcode: Rcode) {
        trace!("Done synchronous detached request {}", request);
    }

    fn detach(&mut self, request: &mut Request) {
        trace!("Synchronous request {} detached", request);
    }

    fn stop(&mut self, request: &mut Request) {
        trace!("Stopped synchronous request {}", request);
        self.runnable.remove(request.id());
    }

    fn yield_request(&mut self, request: &mut Request) {
        self.yielded += 1;
        trace!("Synchronous request {} yielded", request);
    }

    fn mark_runnable(&mut self, request: &mut Request) {
        assert!(
            self.yielded > 0,
            "Request {} marked runnable with no yielded requests",
            request
        );
        self.yielded -= 1;
        self.runnable.insert(request.id());
    }

    fn resume(&mut self, request: &mut Request) {
        trace!("Synchronous request {} resumed", request);
    }

    fn scheduled(&self, request: &Request) -> bool {
        self.runnable.contains(request.id())
    }
}

//======================================================================================================================
// Standalone Functions
//======================================================================================================================

/// Runs `request` to completion with `interpreter`, waiting on `reactor` whenever nothing is runnable.
///
/// The request is bound to a fresh interpreter instance for the duration of the call. Its previous binding and the
/// module working on it are restored before returning, so drives nest. Returns the last result code the interpreter
/// produced for `request`. If the reactor fails or exits before everything has completed, the code held at that point
/// is returned.
pub fn interpret_synchronous<R, I>(
    reactor: &mut R,
    interpreter: &mut I,
    requests: &mut RequestTable,
    request: RequestId,
) -> Result<Rcode, Fail>
where
    R: Reactor + ?Sized,
    I: Interpret + ?Sized,
{
    drive(reactor, interpreter, requests, request).map(|(rcode, _)| rcode)
}

/// Same as [interpret_synchronous] but with a temporary event list built from `config`. The interpreter is created by
/// `make_interpreter` against that event list.
pub fn interpret_synchronous_default<I, F>(
    config: &Config,
    requests: &mut RequestTable,
    request: RequestId,
    make_interpreter: F,
) -> Result<Rcode, Fail>
where
    I: Interpret,
    F: FnOnce(&SharedEventList) -> I,
{
    let mut el: SharedEventList = SharedEventList::from_config(config)?;
    let mut interpreter: I = make_interpreter(&el);
    interpret_synchronous(&mut el, &mut interpreter, requests, request)
}

/// Drive loop. Also returns the scheduler state as it was when the loop exited.
fn drive<R, I>(
    reactor: &mut R,
    interpreter: &mut I,
    requests: &mut RequestTable,
    request: RequestId,
) -> Result<(Rcode, SynchronousScheduler), Fail>
where
    R: Reactor + ?Sized,
    I: Interpret + ?Sized,
{
    let mut intps: SynchronousScheduler = SynchronousScheduler::new();
    let interpreter_id: InterpreterId = intps.interpreter();

    let (old_interpreter, caller): (Option<InterpreterId>, Option<String>) = match requests.get_mut(request) {
        Some(top) => {
            debug!("interpret_synchronous(): request {} (interpreter={:?})", top, interpreter_id);
            (top.bind(Some(interpreter_id)), top.module().map(str::to_string))
        },
        None => {
            let cause: String = format!("no such request (id={:?})", request);
            error!("interpret_synchronous(): {}", cause);
            return Err(Fail::new(libc::EINVAL, &cause));
        },
    };

    let mut rcode: Rcode = interpreter.interpret(&mut Context::new(requests, &mut intps, interpreter_id), request);

    let mut iterations: usize = 0;
    loop {
        let dont_wait_for_event: bool = !intps.runnable.is_empty();
        if !dont_wait_for_event && intps.yielded == 0 {
            break;
        }

        // Wait for a timer or I/O event.
        debug!(
            "Gathering events - {}",
            if dont_wait_for_event { "Will not wait" } else { "will wait" }
        );
        let num_events: usize = match reactor.corral(Instant::now(), !dont_wait_for_event) {
            Ok(Corral::Events(num_events)) => num_events,
            Ok(Corral::Exiting) => {
                debug!("0 event(s) pending - event loop exiting");
                break;
            },
            Err(e) => {
                error!("interpret_synchronous(): failed to gather events: {:?}", e);
                break;
            },
        };
        debug!("{} event(s) pending", num_events);

        // Servicing either pushes runnable requests into the set or sets new timers.
        if num_events > 0 {
            trace!("Servicing event(s)");
            reactor.service(&mut Context::new(requests, &mut intps, interpreter_id));
        }

        // If servicing a timer did not produce a runnable request, there is still a timer left to wait for.
        let sub_request: RequestId = match intps.runnable.pop() {
            Some(sub_request) => sub_request,
            None => {
                debug!("No pending requests ({} yielded)", intps.yielded);
                continue;
            },
        };

        iterations += 1;
        trace!(">>> interpreter (iteration {})", iterations);
        let sub_rcode: Rcode =
            interpreter.interpret(&mut Context::new(requests, &mut intps, interpreter_id), sub_request);
        trace!("<<< interpreter (iteration {}) - {}", iterations, sub_rcode);

        if sub_request == request {
            rcode = sub_rcode;
        } else if requests
            .get(sub_request)
            .map(|sub| sub.parent().is_none() && !sub.is_resumable())
            .unwrap_or(false)
        {
            // Nothing else refers to a finished detached request.
            if let Some(sub) = requests.remove(sub_request) {
                trace!("Freeing detached request {}", sub);
            }
        }

        debug!("{} runnable, {} yielded", intps.runnable.len(), intps.yielded);
    }

    if let Some(top) = requests.get_mut(request) {
        top.bind(old_interpreter);
        top.set_module(caller);
    }

    Ok((rcode, intps))
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
