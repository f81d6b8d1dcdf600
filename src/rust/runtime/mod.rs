// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Exports
//======================================================================================================================

pub mod config;
pub mod context;
pub mod event;
pub mod fail;
pub mod hooks;
pub mod logging;
pub mod rcode;
pub mod reactor;
pub mod request;
pub mod runnable;
