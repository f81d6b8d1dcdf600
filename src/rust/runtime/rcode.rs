// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::runtime::fail::Fail;
use ::std::{
    fmt,
    str::FromStr,
};

//======================================================================================================================
// Constants
//======================================================================================================================

/// Name of every result code, indexed by discriminant.
const RCODE_TABLE: [(Rcode, &str); 11] = [
    (Rcode::Reject, "reject"),
    (Rcode::Fail, "fail"),
    (Rcode::Ok, "ok"),
    (Rcode::Handled, "handled"),
    (Rcode::Invalid, "invalid"),
    (Rcode::Disallow, "disallow"),
    (Rcode::NotFound, "notfound"),
    (Rcode::Noop, "noop"),
    (Rcode::Updated, "updated"),
    (Rcode::Timeout, "timeout"),
    (Rcode::Yield, "yield"),
];

//======================================================================================================================
// Structures
//======================================================================================================================

/// Result code returned by one run of the interpreter over a request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Rcode {
    /// Immediately reject the request.
    Reject = 0,
    /// Module failed, don't reply.
    Fail,
    /// The module is OK, continue.
    Ok,
    /// The module handled the request, so stop.
    Handled,
    /// The module considers the request invalid.
    Invalid,
    /// Reject the request (user is locked out).
    Disallow,
    /// User not found.
    NotFound,
    /// Module succeeded without doing anything.
    Noop,
    /// OK (pairs modified).
    Updated,
    /// Module (or section) timed out.
    Timeout,
    /// The request is suspended waiting for an event.
    Yield,
}

//======================================================================================================================
// Associate Functions
//======================================================================================================================

impl Rcode {
    /// Returns the printable name of this result code.
    pub fn as_str(&self) -> &'static str {
        RCODE_TABLE[*self as usize].1
    }
}

//======================================================================================================================
// Trait Implementations
//======================================================================================================================

impl fmt::Display for Rcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rcode {
    type Err = Fail;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match RCODE_TABLE.iter().find(|(_, name)| name.eq_ignore_ascii_case(s)) {
            Some((rcode, _)) => Ok(*rcode),
            None => {
                let cause: String = format!("unknown result code (name={:?})", s);
                Err(Fail::new(libc::EINVAL, &cause))
            },
        }
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
