// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::runtime::{
    rcode::Rcode,
    request::Request,
};

//======================================================================================================================
// Traits
//======================================================================================================================

/// Callbacks the interpreter fires on every state transition of a request.
///
/// A scheduler implements this trait to keep its own bookkeeping in sync with the interpreter. The interpreter only
/// ever talks to the scheduler through these callbacks, and the scheduler never inspects interpreter state beyond the
/// [Request] it is handed.
pub trait RequestHooks {
    /// An internally spawned request is starting.
    fn init_internal(&mut self, request: &mut Request);

    /// A request owned by the caller of the interpreter finished.
    fn done_external(&mut self, request: &mut Request, rcode: Rcode);

    /// An internally spawned request finished. Whoever spawned it cleans it up.
    fn done_internal(&mut self, request: &mut Request, rcode: Rcode);

    /// A detached request finished.
    fn done_detached(&mut self, request: &mut Request, rcode: Rcode);

    /// An internal request was detached from its parent.
    fn detach(&mut self, request: &mut Request);

    /// The request was forcibly halted.
    fn stop(&mut self, request: &mut Request);

    /// The request suspended itself.
    fn yield_request(&mut self, request: &mut Request);

    /// A suspended request is ready to run again.
    fn mark_runnable(&mut self, request: &mut Request);

    /// The interpreter is about to resume the request.
    fn resume(&mut self, request: &mut Request);

    /// Returns true if the request is queued to run.
    fn scheduled(&self, request: &Request) -> bool;
}
