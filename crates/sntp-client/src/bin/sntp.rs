// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! `sntp`: query SNTP servers, print the offset, optionally correct the clock.
//!
//! Run with:
//!   sntp pool.ntp.org
//!   RUST_LOG=sntp_client=debug sntp -S time.example.com

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use chrono::Local;
use clap::Parser;
use sntp_client::clock::{ClockAction, SystemClock};
use sntp_client::config::{AddressFamily, ClientConfig};
use sntp_client::error::SntpError;
use sntp_client::kod::{DEFAULT_KOD_PATH, KodStore};
use sntp_client::net::UdpNetwork;
use sntp_client::sntp::{Client, Disposition, HostReport, SyncResult};
use sntp_proto::key::KeyStore;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(name = "sntp", version, about = "Simple Network Time Protocol client")]
struct Cli {
    /// Resolve hosts to IPv4 addresses only.
    #[arg(short = '4', long = "ipv4", conflicts_with = "ipv6")]
    ipv4: bool,

    /// Resolve hosts to IPv6 addresses only.
    #[arg(short = '6', long = "ipv6")]
    ipv6: bool,

    /// Sign requests with this key id and require signed replies.
    #[arg(short = 'a', long = "authentication", value_name = "KEYID")]
    key_id: Option<u32>,

    /// Key file.
    #[arg(short = 'k', long = "keyfile", value_name = "FILE", env = "SNTP_KEYFILE")]
    keyfile: Option<PathBuf>,

    /// Kiss-o'-Death file.
    #[arg(
        short = 'K',
        long = "kod",
        value_name = "FILE",
        default_value = DEFAULT_KOD_PATH,
        env = "SNTP_KOD_FILE"
    )]
    kod_file: PathBuf,

    /// Seconds to wait for each reply.
    #[arg(short = 't', long = "timeout", value_name = "SECONDS", default_value_t = 5.0)]
    timeout: f64,

    /// Step the clock (with -s: step only above 128 ms).
    #[arg(short = 'S', long = "step")]
    step: bool,

    /// Slew the clock (with -S: slew only at or below 128 ms).
    #[arg(short = 's', long = "slew")]
    slew: bool,

    /// Never step by more than this many milliseconds.
    #[arg(short = 'M', long = "steplimit", value_name = "MILLIS")]
    step_limit_ms: Option<u64>,

    /// Never write the clock, even with -S or -s.
    #[arg(long = "no-clock-write")]
    no_clock_write: bool,

    /// Log debugging output to stderr.
    #[arg(short = 'd', long = "debug")]
    debug: bool,

    /// Servers to query, in order.
    #[arg(required = true, value_name = "HOST")]
    hosts: Vec<String>,
}

impl Cli {
    fn clock_action(&self) -> ClockAction {
        match (self.step, self.slew) {
            (true, true) => ClockAction::Auto,
            (true, false) => ClockAction::Step,
            (false, true) => ClockAction::Slew,
            (false, false) => ClockAction::Report,
        }
    }

    fn address_family(&self) -> AddressFamily {
        if self.ipv4 {
            AddressFamily::V4
        } else if self.ipv6 {
            AddressFamily::V6
        } else {
            AddressFamily::Any
        }
    }
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_keys(path: Option<&PathBuf>) -> Result<KeyStore, SntpError> {
    let Some(path) = path else {
        return Ok(KeyStore::new());
    };
    let (keys, skipped) = KeyStore::load(path)?;
    for line in &skipped {
        warn!(file = %path.display(), line = line.line, reason = %line.reason, "skipping key");
    }
    Ok(keys)
}

fn format_success(host: &str, result: &SyncResult) -> String {
    let sample = &result.reply.sample;
    let header = &result.reply.header;
    let corrected = Local::now() + chrono::Duration::nanoseconds((sample.offset * 1e9) as i64);
    format!(
        "{} {:+.6} +/- {:.6} {} s{} {}",
        corrected.format("%Y-%m-%d %H:%M:%S%.6f (%z)"),
        sample.offset,
        sample.synch_distance,
        host,
        header.stratum.0,
        header.leap_indicator.as_text(),
    )
}

fn print_report(report: &HostReport) {
    match &report.disposition {
        Disposition::Synchronized(result) => println!("{}", format_success(&report.host, result)),
        other => println!("{}: {}", report.host, other),
    }
}

static INTERRUPTED: OnceLock<Arc<AtomicBool>> = OnceLock::new();

#[cfg(unix)]
#[allow(unsafe_code)]
extern "C" fn on_interrupt(sig: libc::c_int) {
    if let Some(flag) = INTERRUPTED.get() {
        flag.store(true, Ordering::Relaxed);
    }
    // A second signal terminates as usual.
    unsafe {
        libc::signal(sig, libc::SIG_DFL);
    }
}

/// The flag set by the first SIGINT or SIGTERM. The run stops before its
/// next attempt once it is set.
#[allow(unsafe_code)]
fn interrupt_flag() -> Arc<AtomicBool> {
    let flag = INTERRUPTED
        .get_or_init(|| Arc::new(AtomicBool::new(false)))
        .clone();
    #[cfg(unix)]
    unsafe {
        let handler = on_interrupt as extern "C" fn(libc::c_int) as libc::sighandler_t;
        libc::signal(libc::SIGINT, handler);
        libc::signal(libc::SIGTERM, handler);
    }
    flag
}

fn run(cli: &Cli) -> Result<bool, SntpError> {
    let keys = load_keys(cli.keyfile.as_ref())?;

    let timeout = Duration::try_from_secs_f64(cli.timeout).unwrap_or(Duration::ZERO);
    let mut builder = ClientConfig::builder()
        .hosts(cli.hosts.iter().cloned())
        .timeout(timeout)
        .kod_path(&cli.kod_file)
        .clock_action(cli.clock_action())
        .no_clock_write(cli.no_clock_write)
        .address_family(cli.address_family());
    if let Some(key_id) = cli.key_id {
        builder = builder.key_id(key_id);
    }
    if let Some(ms) = cli.step_limit_ms {
        builder = builder.step_limit(ms as f64 / 1000.0);
    }
    let config = builder.build(&keys)?;

    let kod = KodStore::load(&config.kod_path);
    let mut client =
        Client::new(config, keys, kod, UdpNetwork, SystemClock)?.with_cancel(interrupt_flag());
    let summary = client.run()?;
    for report in &summary.reports {
        print_report(report);
    }
    Ok(summary.succeeded())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("sntp: {e}");
            ExitCode::FAILURE
        }
    }
}
