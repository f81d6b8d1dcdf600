// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::runtime::{
    context::Context,
    fail::Fail,
};
use ::std::time::Instant;

//======================================================================================================================
// Structures
//======================================================================================================================

/// Outcome of gathering events from a reactor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Corral {
    /// Number of events ready to be serviced. May be zero.
    Events(usize),
    /// The reactor has been told to exit. Nothing more will be delivered.
    Exiting,
}

//======================================================================================================================
// Traits
//======================================================================================================================

/// Timer and I/O readiness multiplexer polled by a scheduler.
pub trait Reactor {
    /// Gathers ready events as of `now`. If `wait` is set, blocks until at least one event is ready (or the reactor's
    /// own wait bound expires). An error means the reactor is unusable.
    fn corral(&mut self, now: Instant, wait: bool) -> Result<Corral, Fail>;

    /// Runs the callbacks of every event gathered by the last [Reactor::corral]. Callbacks may mark requests runnable
    /// or register further events through `ctx`.
    fn service(&mut self, ctx: &mut Context<'_>);
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl<R: Reactor + ?Sized> Reactor for &mut R {
    fn corral(&mut self, now: Instant, wait: bool) -> Result<Corral, Fail> {
        (**self).corral(now, wait)
    }

    fn service(&mut self, ctx: &mut Context<'_>) {
        (**self).service(ctx)
    }
}

impl<R: Reactor + ?Sized> Reactor for Box<R> {
    fn corral(&mut self, now: Instant, wait: bool) -> Result<Corral, Fail> {
        (**self).corral(now, wait)
    }

    fn service(&mut self, ctx: &mut Context<'_>) {
        (**self).service(ctx)
    }
}
