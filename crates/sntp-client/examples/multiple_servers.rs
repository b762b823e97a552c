// Copyright 2016 Jeff Belgum
// SPDX-License-Identifier: Apache-2.0

//! Example demonstrating how to query multiple SNTP servers.
//!
//! Unlike `Client::run`, which stops at the first server that answers, this
//! queries every server with `Client::sync_host` and compares the results.
//!
//! Run with:
//!   RUST_LOG=sntp_client=debug cargo run -p sntp_usg-client --example multiple_servers

use std::time::Duration;

use chrono::TimeZone;
use sntp_client::clock::SystemClock;
use sntp_client::config::ClientConfig;
use sntp_client::kod::KodStore;
use sntp_client::net::UdpNetwork;
use sntp_client::sntp::{Client, Disposition};
use sntp_proto::key::KeyStore;
use sntp_proto::unix_time::{Instant, timestamp_to_instant};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    let servers = [
        "time.nist.gov",
        "time-a-g.nist.gov",
        "time-b-g.nist.gov",
        "time.cloudflare.com",
        "time.google.com",
    ];

    let keys = KeyStore::new();
    let config = ClientConfig::builder()
        .hosts(servers)
        .timeout(Duration::from_secs(3))
        .max_attempts(2)
        .build(&keys)?;
    let mut client = Client::new(config, keys, KodStore::in_memory(), UdpNetwork, SystemClock)?;

    println!("Querying multiple SNTP servers...\n");
    let mut successful = Vec::new();

    for server in servers {
        match client.sync_host(server) {
            Disposition::Synchronized(result) => {
                let reply = &result.reply;
                let now = Instant::now();
                let server_time = timestamp_to_instant(reply.header.transmit_timestamp, &now);
                let local_time = chrono::Local
                    .timestamp_opt(server_time.secs(), server_time.subsec_nanos() as _)
                    .single();

                println!("{server} ({})", result.peer);
                println!("  Stratum: {}", reply.header.stratum.0);
                if let Some(t) = local_time {
                    println!("  Time: {t}");
                }
                println!("  Offset: {:+.6} s", reply.sample.offset);
                println!("  Synch distance: {:.6} s", reply.sample.synch_distance);
                successful.push((server, result));
            }
            other => println!("{server}: {other}"),
        }
        println!();
    }

    println!(
        "Summary: {}/{} servers answered",
        successful.len(),
        servers.len()
    );

    // The smallest synchronization distance is the most trustworthy sample.
    if let Some((server, result)) = successful.iter().min_by(|(_, a), (_, b)| {
        a.reply
            .sample
            .synch_distance
            .total_cmp(&b.reply.sample.synch_distance)
    }) {
        println!(
            "  Best: {} (offset {:+.6} s, stratum {})",
            server, result.reply.sample.offset, result.reply.header.stratum.0
        );
    }
    Ok(())
}
