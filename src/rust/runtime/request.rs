// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//! Requests (units of work) and the arena that owns them.
//!
//! Every request lives in a [RequestTable] slot for its whole lifetime. Parents refer to children (and children to
//! parents) by [RequestId] only, so dropping a request is a single removal from the table. Slots are recycled, so a
//! [RequestId] also carries the sequence number of its request: a handle that outlives its request never resolves to
//! whatever request took the slot next.

//======================================================================================================================
// Imports
//======================================================================================================================

use ::slab::Slab;
use ::std::fmt;

//======================================================================================================================
// Structures
//======================================================================================================================

/// Handle of a request. Stable while the request is in its table and never reused afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestId {
    /// Slot in the table.
    slot: usize,
    /// Sequence number of the request that owns the slot.
    number: u64,
}

/// Identifies an interpreter instance a request is bound to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct InterpreterId(pub u64);

/// How the request came to exist, which decides the `done` transition it takes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestKind {
    /// Owned by the caller of the interpreter.
    External,
    /// Spawned by the interpreter on behalf of a parent.
    Internal,
    /// Spawned internally and then cut loose from its parent.
    Detached,
}

/// Whether the request should keep being processed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MasterState {
    Normal,
    /// The request was told to stop from the outside.
    StopProcessing,
}

/// Unit of work driven by the interpreter.
pub struct Request {
    id: RequestId,
    /// Process-wide sequence number, used in log messages.
    number: u64,
    name: String,
    parent: Option<RequestId>,
    kind: RequestKind,
    /// Nesting depth of the interpreter within this request.
    indent: usize,
    /// Set while the request is suspended waiting for an external event.
    resumable: bool,
    /// Set from the time the request yields until it is marked runnable. A request is counted as suspended exactly
    /// while this is set.
    yielded: bool,
    master_state: MasterState,
    /// Interpreter this request is currently bound to.
    interpreter: Option<InterpreterId>,
    /// Name of the module currently working on this request.
    module: Option<String>,
}

/// Arena owning every request.
pub struct RequestTable {
    requests: Slab<Request>,
    next_number: u64,
}

//======================================================================================================================
// Associate Functions
//======================================================================================================================

impl Request {
    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn number(&self) -> u64 {
        self.number
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<RequestId> {
        self.parent
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    /// Returns the current nesting depth.
    pub fn indent(&self) -> usize {
        self.indent
    }

    /// Enters a nested construct.
    pub fn indent_push(&mut self) {
        self.indent += 1;
    }

    /// Leaves a nested construct.
    pub fn indent_pop(&mut self) {
        assert!(self.indent > 0, "Request {} indentation underflow", self);
        self.indent -= 1;
    }

    /// Returns true if the request is suspended and waiting to be marked runnable.
    pub fn is_resumable(&self) -> bool {
        self.resumable
    }

    pub fn set_resumable(&mut self, resumable: bool) {
        self.resumable = resumable;
    }

    /// Returns true if the request yielded and nothing has woken it since.
    pub fn is_yielded(&self) -> bool {
        self.yielded
    }

    pub(crate) fn set_yielded(&mut self, yielded: bool) {
        self.yielded = yielded;
    }

    pub fn master_state(&self) -> MasterState {
        self.master_state
    }

    pub fn set_master_state(&mut self, master_state: MasterState) {
        self.master_state = master_state;
    }

    pub fn interpreter(&self) -> Option<InterpreterId> {
        self.interpreter
    }

    /// Binds this request to `interpreter`, returning the previous binding.
    pub fn bind(&mut self, interpreter: Option<InterpreterId>) -> Option<InterpreterId> {
        ::std::mem::replace(&mut self.interpreter, interpreter)
    }

    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    /// Sets the module working on this request, returning the previous one.
    pub fn set_module(&mut self, module: Option<String>) -> Option<String> {
        ::std::mem::replace(&mut self.module, module)
    }

    /// Cuts the request loose from its parent.
    pub(crate) fn detach(&mut self) {
        self.parent = None;
        self.kind = RequestKind::Detached;
    }
}

impl RequestId {
    pub(crate) fn new(slot: usize, number: u64) -> Self {
        Self { slot, number }
    }
}

impl RequestTable {
    /// Inserts a request owned by the caller. It has no parent and is not bound to any interpreter.
    pub fn insert_external(&mut self, name: &str) -> RequestId {
        self.insert(name, None, RequestKind::External)
    }

    /// Inserts a request spawned on behalf of `parent`.
    pub(crate) fn insert_internal(&mut self, name: &str, parent: Option<RequestId>) -> RequestId {
        self.insert(name, parent, RequestKind::Internal)
    }

    fn insert(&mut self, name: &str, parent: Option<RequestId>, kind: RequestKind) -> RequestId {
        let number: u64 = self.next_number;
        self.next_number += 1;
        let entry = self.requests.vacant_entry();
        let id: RequestId = RequestId::new(entry.key(), number);
        entry.insert(Request {
            id,
            number,
            name: name.to_string(),
            parent,
            kind,
            indent: 0,
            resumable: false,
            yielded: false,
            master_state: MasterState::Normal,
            interpreter: None,
            module: None,
        });
        id
    }

    pub fn get(&self, id: RequestId) -> Option<&Request> {
        self.requests.get(id.slot).filter(|request| request.id == id)
    }

    pub fn get_mut(&mut self, id: RequestId) -> Option<&mut Request> {
        self.requests.get_mut(id.slot).filter(|request| request.id == id)
    }

    pub fn contains(&self, id: RequestId) -> bool {
        self.get(id).is_some()
    }

    /// Removes and returns a request. Removing an absent request, or through a stale handle, returns `None`.
    pub fn remove(&mut self, id: RequestId) -> Option<Request> {
        if !self.contains(id) {
            return None;
        }
        self.requests.try_remove(id.slot)
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Iterates over every request in the table.
    pub fn iter(&self) -> impl Iterator<Item = &Request> + '_ {
        self.requests.iter().map(|(_, request)| request)
    }

    /// Iterates over the requests whose parent is `parent`.
    pub fn children(&self, parent: RequestId) -> impl Iterator<Item = RequestId> + '_ {
        self.requests
            .iter()
            .filter(move |(_, request)| request.parent == Some(parent))
            .map(|(_, request)| request.id)
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl Default for RequestTable {
    fn default() -> Self {
        Self {
            requests: Slab::new(),
            next_number: 0,
        }
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}) {}", self.number, self.name)
    }
}


//======================================================================================================================
// Unit Tests
//======================================================================================================================
