// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Explicit interpreter context.
//!
//! A [Context] is handed to the interpreter on every run and to every reactor callback. It carries the request
//! arena, the hooks of the scheduler that is driving the interpreter and the identity of that interpreter instance.
//! The transition methods update the request and then fire the matching hook, which is the only way the scheduler
//! learns about state changes.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::runtime::{
    fail::Fail,
    hooks::RequestHooks,
    rcode::Rcode,
    request::{
        InterpreterId,
        MasterState,
        Request,
        RequestId,
        RequestKind,
        RequestTable,
    },
};

//======================================================================================================================
// Structures
//======================================================================================================================

/// State an interpreter run has access to.
pub struct Context<'a> {
    requests: &'a mut RequestTable,
    hooks: &'a mut dyn RequestHooks,
    interpreter: InterpreterId,
}

//======================================================================================================================
// Traits
//======================================================================================================================

/// Interpreter entry point.
pub trait Interpret {
    /// Runs `request` until it either yields or finishes and returns the resulting code. Every transition performed on
    /// the way must go through `ctx`.
    fn interpret(&mut self, ctx: &mut Context<'_>, request: RequestId) -> Rcode;
}

//======================================================================================================================
// Associate Functions
//======================================================================================================================

impl<'a> Context<'a> {
    pub fn new(requests: &'a mut RequestTable, hooks: &'a mut dyn RequestHooks, interpreter: InterpreterId) -> Self {
        Self {
            requests,
            hooks,
            interpreter,
        }
    }

    /// Returns the interpreter instance this context belongs to.
    pub fn interpreter(&self) -> InterpreterId {
        self.interpreter
    }

    pub fn requests(&self) -> &RequestTable {
        &*self.requests
    }

    pub fn requests_mut(&mut self) -> &mut RequestTable {
        &mut *self.requests
    }

    pub fn request(&self, id: RequestId) -> Result<&Request, Fail> {
        self.requests.get(id).ok_or_else(|| no_such_request(id))
    }

    pub fn request_mut(&mut self, id: RequestId) -> Result<&mut Request, Fail> {
        self.requests.get_mut(id).ok_or_else(|| no_such_request(id))
    }

    /// Spawns a request on behalf of `parent` and hands it to the scheduler.
    pub fn spawn(&mut self, parent: Option<RequestId>, name: &str) -> Result<RequestId, Fail> {
        if let Some(parent) = parent {
            self.request(parent)?;
        }
        let id: RequestId = self.requests.insert_internal(name, parent);
        let request: &mut Request = self.requests.get_mut(id).ok_or_else(|| no_such_request(id))?;
        self.hooks.init_internal(request);
        Ok(id)
    }

    /// Cuts an internal request loose from its parent.
    pub fn detach(&mut self, id: RequestId) -> Result<(), Fail> {
        let request: &mut Request = self.requests.get_mut(id).ok_or_else(|| no_such_request(id))?;
        if request.kind() != RequestKind::Internal {
            let cause: String = format!("only internal requests can be detached (request={})", request);
            return Err(Fail::new(libc::EINVAL, &cause));
        }
        request.detach();
        self.hooks.detach(request);
        Ok(())
    }

    /// Suspends a request until something marks it runnable again.
    pub fn yield_request(&mut self, id: RequestId) -> Result<(), Fail> {
        let request: &mut Request = self.requests.get_mut(id).ok_or_else(|| no_such_request(id))?;
        if request.is_resumable() {
            let cause: String = format!("request is already suspended (request={})", request);
            return Err(Fail::new(libc::EALREADY, &cause));
        }
        request.set_resumable(true);
        request.set_yielded(true);
        self.hooks.yield_request(request);
        Ok(())
    }

    /// Makes a suspended request ready to run. Does nothing if it is already queued or was already woken since it
    /// last yielded.
    pub fn mark_runnable(&mut self, id: RequestId) -> Result<(), Fail> {
        let request: &mut Request = self.requests.get_mut(id).ok_or_else(|| no_such_request(id))?;
        if self.hooks.scheduled(request) || !request.is_yielded() {
            return Ok(());
        }
        request.set_yielded(false);
        self.hooks.mark_runnable(request);
        Ok(())
    }

    /// Marks the start of another run over a suspended request.
    pub fn resume(&mut self, id: RequestId) -> Result<(), Fail> {
        let request: &mut Request = self.requests.get_mut(id).ok_or_else(|| no_such_request(id))?;
        request.set_resumable(false);
        self.hooks.resume(request);
        Ok(())
    }

    /// Tells a request to stop processing.
    pub fn stop(&mut self, id: RequestId) -> Result<(), Fail> {
        let request: &mut Request = self.requests.get_mut(id).ok_or_else(|| no_such_request(id))?;
        request.set_master_state(MasterState::StopProcessing);
        self.hooks.stop(request);
        Ok(())
    }

    /// Reports that a request has finished with `rcode`.
    pub fn finish(&mut self, id: RequestId, rcode: Rcode) -> Result<(), Fail> {
        let request: &mut Request = self.requests.get_mut(id).ok_or_else(|| no_such_request(id))?;
        match request.kind() {
            RequestKind::External => self.hooks.done_external(request, rcode),
            RequestKind::Internal => self.hooks.done_internal(request, rcode),
            RequestKind::Detached => self.hooks.done_detached(request, rcode),
        }
        Ok(())
    }

    /// Returns true if the request is queued to run.
    pub fn is_scheduled(&self, id: RequestId) -> Result<bool, Fail> {
        let request: &Request = self.request(id)?;
        Ok(self.hooks.scheduled(request))
    }
}

//======================================================================================================================
// Standalone Functions
//======================================================================================================================

fn no_such_request(id: RequestId) -> Fail {
    let cause: String = format!("no such request (id={:?})", id);
    Fail::new(libc::ENOENT, &cause)
}
