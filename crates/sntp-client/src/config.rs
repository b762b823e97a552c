// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Client configuration and its builder.
//!
//! ```
//! use std::time::Duration;
//! use sntp_client::config::ClientConfig;
//! use sntp_proto::key::KeyStore;
//!
//! let config = ClientConfig::builder()
//!     .host("time.example.com")
//!     .timeout(Duration::from_secs(2))
//!     .build(&KeyStore::new())
//!     .unwrap();
//! assert_eq!(config.max_attempts, 5);
//! assert!(!config.require_auth);
//! ```

use std::path::PathBuf;
use std::time::Duration;

use sntp_proto::key::KeyStore;
use sntp_proto::protocol::{self, Version};

use crate::clock::ClockAction;
use crate::error::ConfigError;
use crate::kod::DEFAULT_KOD_PATH;

/// Default per-attempt receive timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default number of attempts per host.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Which resolved addresses to use.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum AddressFamily {
    /// Use any address, preferring the order the resolver returned.
    #[default]
    Any,
    /// Use IPv4 addresses only.
    V4,
    /// Use IPv6 addresses only.
    V6,
}

/// Validated client configuration. Build one with [`ClientConfig::builder`].
#[derive(Clone, Debug, PartialEq)]
pub struct ClientConfig {
    /// Hosts to try, in order.
    pub hosts: Vec<String>,
    /// Destination UDP port.
    pub port: u16,
    /// How long to wait for each reply.
    pub timeout: Duration,
    /// Attempts per host before moving on.
    pub max_attempts: u32,
    /// Version written into requests.
    pub version: Version,
    /// Key used to sign requests.
    pub key_id: Option<u32>,
    /// Whether replies must carry a valid MAC.
    pub require_auth: bool,
    /// Location of the KoD file.
    pub kod_path: PathBuf,
    /// What to do with an accepted offset.
    pub clock_action: ClockAction,
    /// Never write the clock, whatever `clock_action` says.
    pub no_clock_write: bool,
    /// Largest offset, in seconds, that may be stepped.
    pub step_limit: Option<f64>,
    /// Which address family to resolve hosts to.
    pub address_family: AddressFamily,
}

impl ClientConfig {
    /// Start building a configuration.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }
}

/// Builder for [`ClientConfig`].
#[derive(Clone, Debug)]
pub struct ClientConfigBuilder {
    hosts: Vec<String>,
    port: u16,
    timeout: Duration,
    max_attempts: u32,
    version: u8,
    key_id: Option<u32>,
    require_auth: Option<bool>,
    kod_path: PathBuf,
    clock_action: ClockAction,
    no_clock_write: bool,
    step_limit: Option<f64>,
    address_family: AddressFamily,
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientConfigBuilder {
    fn new() -> Self {
        ClientConfigBuilder {
            hosts: Vec::new(),
            port: protocol::PORT,
            timeout: DEFAULT_TIMEOUT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            version: Version::V4.value(),
            key_id: None,
            require_auth: None,
            kod_path: PathBuf::from(DEFAULT_KOD_PATH),
            clock_action: ClockAction::Report,
            no_clock_write: false,
            step_limit: None,
            address_family: AddressFamily::Any,
        }
    }

    /// Add a host to try.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.hosts.push(host.into());
        self
    }

    /// Add several hosts to try, in order.
    pub fn hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hosts.extend(hosts.into_iter().map(Into::into));
        self
    }

    /// Set the destination port (default: 123).
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the per-attempt receive timeout (default: 5 s).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the number of attempts per host (default: 5).
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Set the version written into requests (default: 4).
    pub fn version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }

    /// Sign requests with this key.
    ///
    /// Unless [`require_auth`](Self::require_auth) is set explicitly, a key
    /// also makes a valid MAC mandatory on replies.
    pub fn key_id(mut self, key_id: u32) -> Self {
        self.key_id = Some(key_id);
        self
    }

    /// Require (or waive) a valid MAC on replies.
    pub fn require_auth(mut self, required: bool) -> Self {
        self.require_auth = Some(required);
        self
    }

    /// Set the KoD file location (default: `/var/db/ntp-kod`).
    pub fn kod_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.kod_path = path.into();
        self
    }

    /// Set what to do with an accepted offset (default: report only).
    pub fn clock_action(mut self, action: ClockAction) -> Self {
        self.clock_action = action;
        self
    }

    /// Forbid any clock write.
    pub fn no_clock_write(mut self, forbid: bool) -> Self {
        self.no_clock_write = forbid;
        self
    }

    /// Refuse to step the clock by more than `seconds`.
    pub fn step_limit(mut self, seconds: f64) -> Self {
        self.step_limit = Some(seconds.abs());
        self
    }

    /// Restrict resolution to one address family.
    pub fn address_family(mut self, family: AddressFamily) -> Self {
        self.address_family = family;
        self
    }

    /// Validate the settings against `keys` and produce a [`ClientConfig`].
    pub fn build(self, keys: &KeyStore) -> Result<ClientConfig, ConfigError> {
        if self.hosts.is_empty() {
            return Err(ConfigError::NoServers);
        }
        if self.timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout);
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::NoAttempts);
        }
        let version = Version::new(self.version)
            .filter(Version::is_supported)
            .ok_or(ConfigError::UnsupportedVersion {
                version: self.version,
            })?;
        if let Some(key_id) = self.key_id {
            if keys.get(key_id).is_none() {
                return Err(ConfigError::UnknownKey { key_id });
            }
        }
        let require_auth = self.require_auth.unwrap_or(self.key_id.is_some());
        if require_auth && self.key_id.is_none() {
            return Err(ConfigError::AuthWithoutKey);
        }

        Ok(ClientConfig {
            hosts: self.hosts,
            port: self.port,
            timeout: self.timeout,
            max_attempts: self.max_attempts,
            version,
            key_id: self.key_id,
            require_auth,
            kod_path: self.kod_path,
            clock_action: self.clock_action,
            no_clock_write: self.no_clock_write,
            step_limit: self.step_limit,
            address_family: self.address_family,
        })
    }
}
