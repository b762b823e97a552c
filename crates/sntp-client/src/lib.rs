// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

/*!
SNTP client: request/retry orchestration, Kiss-o'-Death bookkeeping and
clock adjustment on top of the `sntp_proto` packet layer.

# Example
Queries a server, reports the offset and leaves the clock alone.

```rust,no_run
use sntp_client::clock::SystemClock;
use sntp_client::config::ClientConfig;
use sntp_client::kod::KodStore;
use sntp_client::net::UdpNetwork;
use sntp_client::sntp::Client;
use sntp_proto::key::KeyStore;

fn main() -> Result<(), sntp_client::error::SntpError> {
    let keys = KeyStore::new();
    let config = ClientConfig::builder()
        .host("time.nist.gov")
        .build(&keys)?;
    let mut client = Client::new(config, keys, KodStore::in_memory(), UdpNetwork, SystemClock)?;
    for report in client.run()?.reports {
        println!("{}: {}", report.host, report.disposition);
    }
    Ok(())
}
```
*/

#![warn(missing_docs)]

// Re-export protocol types from sntp_proto for convenience.
pub use sntp_proto::{codec, key, mac, protocol, unix_time, validate};

/// System clock step and slew.
pub mod clock;

/// Client configuration builder.
pub mod config;

/// Error types.
pub mod error;

/// Persistent Kiss-o'-Death records.
pub mod kod;

/// Datagram transport abstraction and its UDP implementation.
pub mod net;

/// A single request/response exchange.
pub mod request;

/// The host-by-host client.
pub mod sntp;

pub use config::{AddressFamily, ClientConfig};
pub use error::SntpError;
pub use sntp::{Client, Disposition, RunSummary};
