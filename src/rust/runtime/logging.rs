// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

//======================================================================================================================
// Imports
//======================================================================================================================

use crate::runtime::{
    config::Config,
    fail::Fail,
};
use ::flexi_logger::{
    Logger,
    LoggerHandle,
};
use ::std::sync::OnceLock;

//======================================================================================================================
// Static Variables
//======================================================================================================================

/// Guardian to the logging initialize function. Holds the handle for as long as the process runs.
static INIT_LOG: OnceLock<Result<LoggerHandle, Fail>> = OnceLock::new();

//======================================================================================================================
// Standalone Functions
//======================================================================================================================

/// Initializes logging features with the default log specification. `RUST_LOG` takes precedence.
pub fn initialize() -> Result<(), Fail> {
    initialize_with_spec(crate::runtime::config::DEFAULT_LOG_SPEC)
}

/// Initializes logging features using the log specification found in `config`.
pub fn initialize_from_config(config: &Config) -> Result<(), Fail> {
    let spec: String = config.log_spec()?;
    initialize_with_spec(&spec)
}

/// Installs the global logger. Only the first call has any effect; later calls report its outcome.
fn initialize_with_spec(spec: &str) -> Result<(), Fail> {
    let result: &Result<LoggerHandle, Fail> = INIT_LOG.get_or_init(|| match Logger::try_with_env_or_str(spec) {
        Ok(logger) => logger.start().map_err(|e| {
            let cause: String = format!("failed to start logger (spec={:?}): {}", spec, e);
            Fail::new(libc::EIO, &cause)
        }),
        Err(e) => {
            let cause: String = format!("invalid log specification (spec={:?}): {}", spec, e);
            Err(Fail::new(libc::EINVAL, &cause))
        },
    });
    match result {
        Ok(_) => Ok(()),
        Err(e) => Err(e.clone()),
    }
}

//======================================================================================================================
// Unit Tests
//======================================================================================================================
