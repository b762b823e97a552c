// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Simple Network Time Protocol (SNTP) client per RFC 4330.
//!
//! [`Client`] works through the configured hosts in order, one at a time.
//! For each host it:
//!
//! - skips the host outright if the Kiss-o'-Death store already holds an
//!   entry for it;
//! - sends up to `max_attempts` requests, each waiting up to `timeout` for a
//!   reply, retrying on timeouts, authentication failures and unusable
//!   replies;
//! - records `DENY`/`RSTR` in the KoD store and abandons the host;
//! - abandons the host on `RATE` without recording it.
//!
//! The run stops at the first accepted reply. The offset may then be applied
//! to the clock according to [`ClockAction`](crate::clock::ClockAction).
//!
//! # Examples
//!
//! ```no_run
//! use sntp_client::clock::SystemClock;
//! use sntp_client::config::ClientConfig;
//! use sntp_client::kod::KodStore;
//! use sntp_client::net::UdpNetwork;
//! use sntp_client::sntp::Client;
//! use sntp_proto::key::KeyStore;
//!
//! let keys = KeyStore::new();
//! let config = ClientConfig::builder().host("pool.ntp.org").build(&keys)?;
//! let kod = KodStore::load(&config.kod_path);
//! let mut client = Client::new(config, keys, kod, UdpNetwork, SystemClock)?;
//! let summary = client.run()?;
//! if let Some(result) = summary.synchronized() {
//!     println!("offset {:+.6}s", result.reply.sample.offset);
//! }
//! # Ok::<(), sntp_client::error::SntpError>(())
//! ```

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use sntp_proto::key::KeyStore;
use sntp_proto::protocol::KissCode;
use sntp_proto::validate::Validator;
use tracing::{debug, info, warn};

use crate::clock::{ClockAdjuster, ClockError, CorrectionMethod};
use crate::config::ClientConfig;
use crate::error::{AttemptFailure, ConfigError, SntpError};
use crate::kod::KodStore;
use crate::net::{Network, Transport};
use crate::request::{self, AttemptOutcome, Reply};

/// What was done with the clock after an accepted reply.
#[derive(Clone, Debug, PartialEq)]
pub enum Adjustment {
    /// The configuration only asks for a report.
    NotRequested,
    /// A correction was due but clock writes are forbidden.
    Suppressed,
    /// A step was due but the offset exceeds the step limit.
    RefusedStepLimit {
        /// The configured limit, in seconds.
        limit: f64,
    },
    /// The correction was applied.
    Applied(CorrectionMethod),
    /// The clock refused the correction.
    Failed(ClockError),
}

/// A successful synchronization.
#[derive(Clone, Debug, PartialEq)]
pub struct SyncResult {
    /// The address that answered.
    pub peer: SocketAddr,
    /// The attempt that succeeded, starting at 1.
    pub attempt: u32,
    /// The accepted reply.
    pub reply: Reply,
    /// What was done with the clock.
    pub adjustment: Adjustment,
}

/// How the client finished with one host.
#[derive(Clone, Debug, PartialEq)]
pub enum Disposition {
    /// A reply was accepted.
    Synchronized(SyncResult),
    /// The KoD store already held an entry; nothing was sent.
    PriorKod(KissCode),
    /// The server sent `DENY` or `RSTR`; it has been recorded.
    KodRecorded(KissCode),
    /// The server sent `RATE`.
    RateLimited,
    /// Every attempt failed.
    Exhausted {
        /// Attempts made.
        attempts: u32,
        /// Why the final attempt failed.
        last: AttemptFailure,
    },
    /// The host could not be resolved or no socket could be opened.
    Unreachable(String),
    /// Cancellation was requested before the host finished.
    Cancelled,
}

impl Disposition {
    /// Whether the host yielded an accepted reply.
    pub fn is_synchronized(&self) -> bool {
        matches!(self, Disposition::Synchronized(_))
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disposition::Synchronized(result) => {
                write!(f, "offset {:+.6}", result.reply.sample.offset)
            }
            Disposition::PriorKod(code) => write!(f, "prior KoD {code}, skipping"),
            Disposition::KodRecorded(code) => write!(f, "kiss-o'-death {code}, host demobilized"),
            Disposition::RateLimited => f.write_str("kiss-o'-death RATE, backing off"),
            Disposition::Exhausted { attempts, last } => {
                write!(f, "no usable reply after {attempts} attempts ({last})")
            }
            Disposition::Unreachable(e) => write!(f, "unreachable: {e}"),
            Disposition::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// The disposition of one host.
#[derive(Clone, Debug, PartialEq)]
pub struct HostReport {
    /// The host as configured.
    pub host: String,
    /// How it ended.
    pub disposition: Disposition,
}

/// Every host tried during a run, in order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RunSummary {
    /// One report per host tried.
    pub reports: Vec<HostReport>,
}

impl RunSummary {
    /// Whether some host was synchronized.
    pub fn succeeded(&self) -> bool {
        self.synchronized().is_some()
    }

    /// The successful synchronization, if any.
    pub fn synchronized(&self) -> Option<&SyncResult> {
        self.reports.iter().find_map(|r| match &r.disposition {
            Disposition::Synchronized(result) => Some(result),
            _ => None,
        })
    }
}

/// An SNTP client run over a network `N` and a clock `C`.
pub struct Client<N, C> {
    config: ClientConfig,
    keys: KeyStore,
    kod: KodStore,
    network: N,
    clock: C,
    cancel: Option<Arc<AtomicBool>>,
}

impl<N: Network, C: ClockAdjuster> Client<N, C> {
    /// Assemble a client.
    ///
    /// Fails if the configured key id is not in `keys`.
    pub fn new(
        config: ClientConfig,
        keys: KeyStore,
        kod: KodStore,
        network: N,
        clock: C,
    ) -> Result<Self, SntpError> {
        if let Some(key_id) = config.key_id {
            if keys.get(key_id).is_none() {
                return Err(ConfigError::UnknownKey { key_id }.into());
            }
        }
        Ok(Client {
            config,
            keys,
            kod,
            network,
            clock,
            cancel: None,
        })
    }

    /// Stop between attempts once `flag` becomes true.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// The configuration in use.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The KoD store.
    pub fn kod_store(&self) -> &KodStore {
        &self.kod
    }

    /// The clock collaborator.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Consume the client, returning the KoD store.
    pub fn into_kod_store(self) -> KodStore {
        self.kod
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    /// Try each configured host in turn until one is synchronized.
    ///
    /// The KoD store is written back before returning. Fails only with
    /// [`SntpError::Cancelled`]; per-host failures are in the summary.
    pub fn run(&mut self) -> Result<RunSummary, SntpError> {
        let mut summary = RunSummary::default();
        let hosts = self.config.hosts.clone();
        let mut cancelled = false;

        for host in hosts {
            let disposition = self.sync_host(&host);
            match &disposition {
                Disposition::Synchronized(result) => info!(
                    host = %host,
                    peer = %result.peer,
                    offset = result.reply.sample.offset,
                    delay = result.reply.sample.delay,
                    "synchronized"
                ),
                Disposition::Cancelled => cancelled = true,
                other => info!(host = %host, outcome = %other, "host abandoned"),
            }
            let done = disposition.is_synchronized() || cancelled;
            summary.reports.push(HostReport { host, disposition });
            if done {
                break;
            }
        }

        if self.kod.is_dirty() {
            if let Err(e) = self.kod.persist() {
                warn!(error = %e, "cannot write KoD file");
            }
        }

        if cancelled {
            return Err(SntpError::Cancelled);
        }
        Ok(summary)
    }

    /// Run the attempt loop against a single host.
    pub fn sync_host(&mut self, host: &str) -> Disposition {
        if let Some(entry) = self.kod.search(host).first() {
            info!(host, kind = %entry.kind, "prior KoD, skipping");
            return Disposition::PriorKod(entry.kind);
        }
        if self.cancelled() {
            return Disposition::Cancelled;
        }

        let mut transport =
            match self
                .network
                .connect(host, self.config.port, self.config.address_family)
            {
                Ok(transport) => transport,
                Err(e) => {
                    warn!(host, error = %e, "cannot reach host");
                    return Disposition::Unreachable(e.to_string());
                }
            };

        let validator = Validator::new(&self.keys).require_auth(self.config.require_auth);
        let key = self.config.key_id.and_then(|id| self.keys.get(id));
        let mut last = AttemptFailure::Timeout;
        let mut accepted = None;

        for attempt in 1..=self.config.max_attempts {
            if attempt > 1 && self.cancelled() {
                return Disposition::Cancelled;
            }

            let outcome = request::exchange(
                &mut transport,
                &validator,
                self.config.version,
                key,
                self.config.timeout,
            );
            match outcome {
                AttemptOutcome::Accepted(reply) => {
                    accepted = Some((attempt, reply));
                    break;
                }
                AttemptOutcome::Demobilize(code) => {
                    warn!(host, kind = %code, "kiss-o'-death received, recording");
                    self.kod.add(host, code);
                    return Disposition::KodRecorded(code);
                }
                AttemptOutcome::RateLimited => {
                    warn!(host, "kiss-o'-death RATE received");
                    return Disposition::RateLimited;
                }
                AttemptOutcome::Failed(failure) => {
                    debug!(host, attempt, outcome = %failure, "attempt failed");
                    last = failure;
                }
            }
        }

        match accepted {
            Some((attempt, reply)) => {
                let adjustment = self.adjust(reply.sample.offset);
                Disposition::Synchronized(SyncResult {
                    peer: transport.peer(),
                    attempt,
                    reply,
                    adjustment,
                })
            }
            None => Disposition::Exhausted {
                attempts: self.config.max_attempts,
                last,
            },
        }
    }

    fn adjust(&mut self, offset: f64) -> Adjustment {
        let Some(method) = self.config.clock_action.method_for(offset) else {
            return Adjustment::NotRequested;
        };
        if self.config.no_clock_write {
            debug!(offset, "clock writes disabled");
            return Adjustment::Suppressed;
        }
        if let (CorrectionMethod::Step, Some(limit)) = (method, self.config.step_limit) {
            if offset.abs() > limit {
                warn!(offset, limit, "offset exceeds step limit, not stepping");
                return Adjustment::RefusedStepLimit { limit };
            }
        }
        match self.clock.apply(method, offset) {
            Ok(()) => {
                info!(offset, method = %method, "clock corrected");
                Adjustment::Applied(method)
            }
            Err(e) => {
                warn!(offset, method = %method, error = %e, "cannot correct clock");
                Adjustment::Failed(e)
            }
        }
    }
}
