// Copyright (c) Microsoft Corporation.
// Licensed under the MIT license.

#![deny(clippy::all)]

#[macro_use]
extern crate log;

//======================================================================================================================
// Imports
//======================================================================================================================

use ::anyhow::Result;
use ::clap::{
    Arg,
    ArgMatches,
    Command,
};
use ::std::{
    collections::HashMap,
    time::{
        Duration,
        Instant,
    },
};
use ::syncdrive::{
    interpret_synchronous_default,
    runtime::logging,
    Config,
    Context,
    Fail,
    Interpret,
    Rcode,
    RequestId,
    RequestTable,
    SharedEventList,
};

//======================================================================================================================
// Program Arguments
//======================================================================================================================

#[derive(Debug)]
pub struct ProgramArguments {
    /// Number of sub-requests spawned by the top level request.
    num_requests: usize,
    /// Base delay of each sub-request.
    delay: Duration,
    /// Optional configuration file.
    config_path: Option<String>,
}

impl ProgramArguments {
    const DEFAULT_NUM_REQUESTS: usize = 4;
    const DEFAULT_DELAY_MS: u64 = 10;

    pub fn new() -> Result<Self> {
        let matches: ArgMatches = Command::new("timer-chain")
            .arg(
                Arg::new("requests")
                    .long("requests")
                    .value_parser(clap::value_parser!(usize))
                    .required(false)
                    .value_name("COUNT")
                    .help("Sets number of sub-requests"),
            )
            .arg(
                Arg::new("delay")
                    .long("delay")
                    .value_parser(clap::value_parser!(u64))
                    .required(false)
                    .value_name("MILLISECONDS")
                    .help("Sets base delay of sub-requests"),
            )
            .arg(
                Arg::new("config")
                    .long("config")
                    .value_parser(clap::value_parser!(String))
                    .required(false)
                    .value_name("PATH")
                    .help("Sets configuration file"),
            )
            .get_matches();

        let num_requests: usize = matches
            .get_one::<usize>("requests")
            .copied()
            .unwrap_or(Self::DEFAULT_NUM_REQUESTS);
        if num_requests == 0 {
            anyhow::bail!("number of sub-requests must be positive");
        }
        let delay: Duration = Duration::from_millis(
            matches
                .get_one::<u64>("delay")
                .copied()
                .unwrap_or(Self::DEFAULT_DELAY_MS),
        );

        Ok(Self {
            num_requests,
            delay,
            config_path: matches.get_one::<String>("config").cloned(),
        })
    }
}

//======================================================================================================================
// Chain Interpreter
//======================================================================================================================

/// Progress of a request through its (two step) program.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    Start,
    Waiting,
}

/// Interpreter whose top level request fans out into sub-requests that each sleep on a timer, and waits for the last
/// of them.
struct ChainInterpreter {
    el: SharedEventList,
    num_requests: usize,
    delay: Duration,
    stages: HashMap<RequestId, Stage>,
    delays: HashMap<RequestId, Duration>,
    outstanding: usize,
}

impl ChainInterpreter {
    fn new(el: &SharedEventList, num_requests: usize, delay: Duration) -> Self {
        Self {
            el: el.clone(),
            num_requests,
            delay,
            stages: HashMap::default(),
            delays: HashMap::default(),
            outstanding: 0,
        }
    }

    fn step(&mut self, ctx: &mut Context<'_>, id: RequestId) -> Result<Rcode, Fail> {
        let parent: Option<RequestId> = ctx.request(id)?.parent();
        let stage: Stage = self.stages.get(&id).copied().unwrap_or(Stage::Start);

        match (parent, stage) {
            (None, Stage::Start) => {
                // Later sub-requests sleep longer, so they complete in spawn order.
                let mut delay: Duration = Duration::ZERO;
                for i in 0..self.num_requests {
                    delay += self.delay;
                    let child: RequestId = ctx.spawn(Some(id), &format!("sub-{}", i))?;
                    self.stages.insert(child, Stage::Start);
                    self.delays.insert(child, delay);
                }
                self.outstanding = self.num_requests;
                self.stages.insert(id, Stage::Waiting);
                ctx.yield_request(id)?;
                Ok(Rcode::Yield)
            },
            (None, Stage::Waiting) => Ok(Rcode::Ok),
            (Some(_), Stage::Start) => {
                let delay: Duration = self.delays.remove(&id).unwrap_or(self.delay);
                self.el.insert_timer_in(delay, move |ctx: &mut Context<'_>| {
                    if let Err(e) = ctx.mark_runnable(id) {
                        error!("mark_runnable(): {:?}", e);
                    }
                });
                self.stages.insert(id, Stage::Waiting);
                ctx.yield_request(id)?;
                Ok(Rcode::Yield)
            },
            (Some(parent), Stage::Waiting) => {
                self.outstanding -= 1;
                info!("{} done ({} outstanding)", ctx.request(id)?, self.outstanding);
                if self.outstanding == 0 {
                    ctx.mark_runnable(parent)?;
                }
                Ok(Rcode::Updated)
            },
        }
    }
}

impl Interpret for ChainInterpreter {
    fn interpret(&mut self, ctx: &mut Context<'_>, request: RequestId) -> Rcode {
        match ctx.request(request).map(|r| r.is_resumable()) {
            Ok(true) => {
                if let Err(e) = ctx.resume(request) {
                    error!("resume(): {:?}", e);
                    return Rcode::Fail;
                }
            },
            Ok(false) => (),
            Err(e) => {
                error!("interpret(): {:?}", e);
                return Rcode::Fail;
            },
        }

        let rcode: Rcode = match self.step(ctx, request) {
            Ok(rcode) => rcode,
            Err(e) => {
                error!("step(): {:?}", e);
                Rcode::Fail
            },
        };
        if rcode != Rcode::Yield {
            if let Err(e) = ctx.finish(request, rcode) {
                error!("finish(): {:?}", e);
            }
        }
        rcode
    }
}

//======================================================================================================================
// main()
//======================================================================================================================

fn main() -> Result<()> {
    let args: ProgramArguments = ProgramArguments::new()?;
    let config: Config = match args.config_path {
        Some(ref path) => Config::new(path)?,
        None => Config::default(),
    };
    logging::initialize_from_config(&config)?;

    let mut requests: RequestTable = RequestTable::default();
    let top: RequestId = requests.insert_external("timer-chain");

    let start: Instant = Instant::now();
    let rcode: Rcode = interpret_synchronous_default(&config, &mut requests, top, |el: &SharedEventList| {
        ChainInterpreter::new(el, args.num_requests, args.delay)
    })?;
    println!(
        "{} finished with {} after {:?} ({} requests left)",
        requests.get(top).map(|r| r.to_string()).unwrap_or_default(),
        rcode,
        start.elapsed(),
        requests.len()
    );

    Ok(())
}
