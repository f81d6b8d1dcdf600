// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

#![cfg_attr(feature = "strict", deny(warnings))]
#![deny(clippy::all)]

#[macro_use]
extern crate log;

//======================================================================================================================
// Exports
//======================================================================================================================

pub mod runtime;
pub mod synchronous;

pub use self::{
    runtime::{
        config::Config,
        context::{
            Context,
            Interpret,
        },
        event::{
            EventList,
            SharedEventList,
        },
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
            RequestKind,
            RequestTable,
        },
        runnable::RunnableSet,
    },
    synchronous::{
        interpret_synchronous,
        interpret_synchronous_default,
        SynchronousScheduler,
    },
};

//======================================================================================================================
// Macros
//======================================================================================================================

/// Ensures that two expressions are equal, otherwise returns an [anyhow::Error] from the enclosing function.
#[macro_export]
macro_rules! ensure_eq {
    ($left:expr, $right:expr) => ({
        match (&$left, &$right) {
            (left_val, right_val) => {
                if !(*left_val == *right_val) {
                    anyhow::bail!(
                        "ensure failed: `(left == right)` left: `{:?}`, right: `{:?}` at {}:{}",
                        left_val, right_val, file!(), line!()
                    );
                }
            }
        }
    });
}

/// Ensures that two expressions are not equal, otherwise returns an [anyhow::Error] from the enclosing function.
#[macro_export]
macro_rules! ensure_neq {
    ($left:expr, $right:expr) => ({
        match (&$left, &$right) {
            (left_val, right_val) => {
                if *left_val == *right_val {
                    anyhow::bail!(
                        "ensure failed: `(left != right)` left: `{:?}`, right: `{:?}` at {}:{}",
                        left_val, right_val, file!(), line!()
                    );
                }
            }
        }
    });
}
