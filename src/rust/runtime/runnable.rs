// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::runtime::request::RequestId;
use ::std::collections::BTreeSet;

//======================================================================================================================
// Structures
//======================================================================================================================

/// Set of requests that are ready to run.
///
/// Requests are ordered by identity only; nothing depends on the order in which they are popped. A request is a member
/// at most once.
#[derive(Default, Debug)]
pub struct RunnableSet {
    requests: BTreeSet<RequestId>,
}

//======================================================================================================================
// Associate Functions
//======================================================================================================================

impl RunnableSet {
    /// Inserts `id`. Returns false if it was already present.
    pub fn insert(&mut self, id: RequestId) -> bool {
        self.requests.insert(id)
    }

    /// Removes and returns one ready request.
    pub fn pop(&mut self) -> Option<RequestId> {
        self.requests.pop_first()
    }

    /// Removes `id` wherever it is. Returns false if it was not present.
    pub fn remove(&mut self, id: RequestId) -> bool {
        self.requests.remove(&id)
    }

    pub fn contains(&self, id: RequestId) -> bool {
        self.requests.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
