// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Default reactor: a list of timers and deferred events.
//!
//! Gathering ([EventList::corral]) and servicing ([EventList::service]) are separate steps. Gathering moves every
//! event that is due into a ready list; servicing takes that list out of the event list before running any callback,
//! so callbacks are free to register new events on the same list.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::runtime::{
    config::Config,
    context::Context,
    fail::Fail,
    reactor::{
        Corral,
        Reactor,
    },
};
use ::std::{
    cell::RefCell,
    cmp::Reverse,
    collections::{
        BinaryHeap,
        VecDeque,
    },
    mem,
    rc::Rc,
    thread,
    time::{
        Duration,
        Instant,
    },
};

//======================================================================================================================
// Structures
//======================================================================================================================

/// Work run when an event fires.
pub type Callback = Box<dyn FnOnce(&mut Context<'_>)>;

struct TimerQueueEntry {
    expiry: Instant,
    /// Insertion order, breaks ties between timers with the same expiry.
    seq: u64,
    callback: Callback,
}

/// Timers and deferred events waiting to fire.
pub struct EventList {
    // Use a reverse to get a min heap.
    heap: BinaryHeap<Reverse<TimerQueueEntry>>,
    /// Events that are ready as soon as they are posted.
    deferred: VecDeque<Callback>,
    /// Events gathered by the last corral and not yet serviced.
    ready: Vec<Callback>,
    exiting: bool,
    /// Upper bound on how long a single blocking corral sleeps.
    max_wait: Option<Duration>,
    next_seq: u64,
}

/// Event list shared between the scheduler that polls it and the interpreter that registers events on it.
#[derive(Clone, Default)]
pub struct SharedEventList(Rc<RefCell<EventList>>);

//======================================================================================================================
// Associate Functions
//======================================================================================================================

impl EventList {
    /// Creates an event list whose blocking corrals sleep for at most `max_wait`.
    pub fn with_max_wait(max_wait: Option<Duration>) -> Self {
        Self {
            heap: BinaryHeap::new(),
            deferred: VecDeque::new(),
            ready: Vec::new(),
            exiting: false,
            max_wait,
            next_seq: 0,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, Fail> {
        Ok(Self::with_max_wait(config.max_wait()?))
    }

    /// Registers `callback` to run once `expiry` has passed.
    pub fn insert_timer_at<F>(&mut self, expiry: Instant, callback: F)
    where
        F: FnOnce(&mut Context<'_>) + 'static,
    {
        let seq: u64 = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Reverse(TimerQueueEntry {
            expiry,
            seq,
            callback: Box::new(callback),
        }));
    }

    /// Registers `callback` to run `timeout` from now.
    pub fn insert_timer_in<F>(&mut self, timeout: Duration, callback: F)
    where
        F: FnOnce(&mut Context<'_>) + 'static,
    {
        self.insert_timer_at(Instant::now() + timeout, callback)
    }

    /// Registers `callback` to run on the next service.
    pub fn post<F>(&mut self, callback: F)
    where
        F: FnOnce(&mut Context<'_>) + 'static,
    {
        self.deferred.push_back(Box::new(callback));
    }

    /// Makes every later corral report that the list is exiting.
    pub fn exit(&mut self) {
        self.exiting = true;
    }

    pub fn is_exiting(&self) -> bool {
        self.exiting
    }

    /// Number of timers not yet due.
    pub fn num_timers(&self) -> usize {
        self.heap.len()
    }

    /// Number of events that will run on the next service without any time passing.
    pub fn num_pending(&self) -> usize {
        self.deferred.len() + self.ready.len()
    }

    /// Returns the expiry of the earliest timer.
    pub fn next_expiry(&self) -> Option<Instant> {
        self.heap.peek().map(|Reverse(entry)| entry.expiry)
    }

    /// Moves every event that is due at `now` to the ready list. Returns the size of the ready list.
    fn gather(&mut self, now: Instant) -> usize {
        self.ready.extend(self.deferred.drain(..));
        while let Some(Reverse(entry)) = self.heap.peek() {
            if now < entry.expiry {
                break;
            }
            if let Some(Reverse(entry)) = self.heap.pop() {
                self.ready.push(entry.callback);
            }
        }
        self.ready.len()
    }

    /// Gathers ready events, sleeping for them if `wait` is set.
    pub fn corral(&mut self, now: Instant, wait: bool) -> Result<Corral, Fail> {
        if self.exiting {
            return Ok(Corral::Exiting);
        }

        let mut now: Instant = now;
        loop {
            let num_events: usize = self.gather(now);
            if num_events > 0 || !wait {
                return Ok(Corral::Events(num_events));
            }

            let expiry: Instant = match self.next_expiry() {
                Some(expiry) => expiry,
                None => {
                    let cause: &str = "nothing registered that could wake a blocking corral";
                    warn!("corral(): {}", cause);
                    return Err(Fail::new(libc::EDEADLK, cause));
                },
            };

            let current: Instant = Instant::now();
            let timeout: Duration = expiry.saturating_duration_since(current);
            match self.max_wait {
                Some(max_wait) if max_wait < timeout => {
                    thread::sleep(max_wait);
                    let num_events: usize = self.gather(Instant::now());
                    return Ok(Corral::Events(num_events));
                },
                _ => thread::sleep(timeout),
            }
            now = Instant::now().max(expiry);
        }
    }

    /// Takes the events gathered by the last corral.
    fn take_ready(&mut self) -> Vec<Callback> {
        mem::take(&mut self.ready)
    }

    /// Runs the events gathered by the last corral.
    pub fn service(&mut self, ctx: &mut Context<'_>) {
        for callback in self.take_ready() {
            callback(ctx);
        }
    }
}

impl SharedEventList {
    pub fn new(event_list: EventList) -> Self {
        Self(Rc::new(RefCell::new(event_list)))
    }

    pub fn from_config(config: &Config) -> Result<Self, Fail> {
        Ok(Self::new(EventList::from_config(config)?))
    }

    pub fn insert_timer_at<F>(&self, expiry: Instant, callback: F)
    where
        F: FnOnce(&mut Context<'_>) + 'static,
    {
        self.0.borrow_mut().insert_timer_at(expiry, callback)
    }

    pub fn insert_timer_in<F>(&self, timeout: Duration, callback: F)
    where
        F: FnOnce(&mut Context<'_>) + 'static,
    {
        self.0.borrow_mut().insert_timer_in(timeout, callback)
    }

    pub fn post<F>(&self, callback: F)
    where
        F: FnOnce(&mut Context<'_>) + 'static,
    {
        self.0.borrow_mut().post(callback)
    }

    pub fn exit(&self) {
        self.0.borrow_mut().exit()
    }

    pub fn is_exiting(&self) -> bool {
        self.0.borrow().is_exiting()
    }

    pub fn num_timers(&self) -> usize {
        self.0.borrow().num_timers()
    }

    pub fn num_pending(&self) -> usize {
        self.0.borrow().num_pending()
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl Default for EventList {
    fn default() -> Self {
        Self::with_max_wait(None)
    }
}

impl Reactor for EventList {
    fn corral(&mut self, now: Instant, wait: bool) -> Result<Corral, Fail> {
        EventList::corral(self, now, wait)
    }

    fn service(&mut self, ctx: &mut Context<'_>) {
        EventList::service(self, ctx)
    }
}

impl Reactor for SharedEventList {
    fn corral(&mut self, now: Instant, wait: bool) -> Result<Corral, Fail> {
        self.0.borrow_mut().corral(now, wait)
    }

    fn service(&mut self, ctx: &mut Context<'_>) {
        // Release the borrow before running callbacks, they may register events on this list.
        let ready: Vec<Callback> = self.0.borrow_mut().take_ready();
        for callback in ready {
            callback(ctx);
        }
    }
}

impl PartialEq for TimerQueueEntry {
    fn eq(&self, other: &TimerQueueEntry) -> bool {
        self.expiry == other.expiry && self.seq == other.seq
    }
}

impl Eq for TimerQueueEntry {}

impl PartialOrd for TimerQueueEntry {
    fn partial_cmp(&self, other: &TimerQueueEntry) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerQueueEntry {
    fn cmp(&self, other: &TimerQueueEntry) -> core::cmp::Ordering {
        self.expiry.cmp(&other.expiry).then(self.seq.cmp(&other.seq))
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
