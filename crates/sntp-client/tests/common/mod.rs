// Copyright 2026 U.S. Federal Government (in countries where recognized)
// SPDX-License-Identifier: Apache-2.0

//! Shared helpers for integration tests: an in-memory network of scripted
//! servers and a clock that records corrections instead of applying them.

// Integration test helpers are `pub` so each `tests/*.rs` file can import them
// via `mod common`, but not every file uses every helper.
#![allow(unreachable_pub, dead_code)]

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::io;
use std::net::SocketAddr;
use std::rc::Rc;
use std::time::Duration;

use sntp_client::clock::{ClockAdjuster, ClockError, CorrectionMethod};
use sntp_client::config::AddressFamily;
use sntp_client::net::{Network, Transport};
use sntp_proto::codec::decode_header;
use sntp_proto::key::Key;
use sntp_proto::protocol::{
    Header, KissCode, LeapIndicator, Mode, Stratum, TimestampFormat, ToBytes, Version,
};

/// How a scripted server answers one request.
#[derive(Clone, Debug)]
pub enum Answer {
    /// A valid reply whose clock is `offset` seconds ahead of ours.
    Time { offset: f64 },
    /// A valid reply signed with `key`.
    Signed { key: Key, offset: f64 },
    /// A Kiss-o'-Death reply.
    Kiss(KissCode),
    /// A reply with the leap indicator set to "unsynchronized".
    Unsynced,
    /// A reply that does not echo our transmit timestamp.
    WrongOrigin,
    /// No reply at all.
    Silence,
}

/// One send observed by the fake network.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Sent {
    pub host: String,
    pub length: usize,
}

/// A network of named, scripted servers.
///
/// Each server answers requests from its queue in order; once the queue is
/// empty it stays silent. Hosts without a script fail to resolve.
#[derive(Clone, Default)]
pub struct FakeNetwork {
    scripts: HashMap<String, Rc<RefCell<VecDeque<Answer>>>>,
    sent: Rc<RefCell<Vec<Sent>>>,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script `host` to answer with `answers`, in order.
    pub fn server(mut self, host: &str, answers: impl IntoIterator<Item = Answer>) -> Self {
        self.scripts.insert(
            host.to_string(),
            Rc::new(RefCell::new(answers.into_iter().collect())),
        );
        self
    }

    /// Shared view of every datagram sent, across clones.
    pub fn sent_log(&self) -> Rc<RefCell<Vec<Sent>>> {
        Rc::clone(&self.sent)
    }
}

/// Count sends to `host` in a log.
pub fn sends_to(log: &Rc<RefCell<Vec<Sent>>>, host: &str) -> usize {
    log.borrow().iter().filter(|s| s.host == host).count()
}

impl Network for FakeNetwork {
    type Transport = FakeTransport;

    fn connect(
        &mut self,
        host: &str,
        _port: u16,
        _family: AddressFamily,
    ) -> io::Result<FakeTransport> {
        let script = self.scripts.get(host).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "failed to lookup address information")
        })?;
        Ok(FakeTransport {
            host: host.to_string(),
            script,
            pending: None,
            sent: Rc::clone(&self.sent),
        })
    }
}

/// A transport to one scripted server.
pub struct FakeTransport {
    host: String,
    script: Rc<RefCell<VecDeque<Answer>>>,
    pending: Option<Vec<u8>>,
    sent: Rc<RefCell<Vec<Sent>>>,
}

impl Transport for FakeTransport {
    fn peer(&self) -> SocketAddr {
        SocketAddr::from(([192, 0, 2, 1], 123))
    }

    fn send(&mut self, datagram: &[u8]) -> io::Result<()> {
        self.sent.borrow_mut().push(Sent {
            host: self.host.clone(),
            length: datagram.len(),
        });
        let answer = self.script.borrow_mut().pop_front().unwrap_or(Answer::Silence);
        self.pending = respond(datagram, &answer);
        Ok(())
    }

    fn recv(&mut self, buf: &mut [u8], _timeout: Duration) -> io::Result<usize> {
        let reply = self
            .pending
            .take()
            .ok_or_else(|| io::Error::from(io::ErrorKind::TimedOut))?;
        buf[..reply.len()].copy_from_slice(&reply);
        Ok(reply.len())
    }
}

/// Shift a timestamp by `seconds`, in 32.32 fixed point.
pub fn shift(ts: TimestampFormat, seconds: f64) -> TimestampFormat {
    let delta = (seconds * 4_294_967_296.0) as i64;
    TimestampFormat::from_bits(ts.to_bits().wrapping_add(delta as u64))
}

/// A synchronized stratum 2 server reply to `request`.
pub fn server_reply(request: &Header, offset: f64) -> Header {
    let server_time = shift(request.transmit_timestamp, offset);
    Header {
        leap_indicator: LeapIndicator::NoWarning,
        version: Version::V4,
        mode: Mode::Server,
        stratum: Stratum(2),
        poll: request.poll,
        precision: -20,
        reference_id: [192, 0, 2, 10],
        reference_timestamp: shift(server_time, -16.0),
        origin_timestamp: request.transmit_timestamp,
        receive_timestamp: server_time,
        transmit_timestamp: server_time,
        ..Header::default()
    }
}

fn encode(header: &Header) -> Vec<u8> {
    let mut buf = vec![0u8; 48];
    // The buffer fits a header.
    header.to_bytes(&mut buf).unwrap();
    buf
}

fn respond(request: &[u8], answer: &Answer) -> Option<Vec<u8>> {
    let sent = decode_header(&request[..48]).ok()?;
    match answer {
        Answer::Time { offset } => Some(encode(&server_reply(&sent, *offset))),
        Answer::Signed { key, offset } => {
            let mut pkt = encode(&server_reply(&sent, *offset));
            let digest = key.digest(&pkt).ok()?;
            pkt.extend_from_slice(&key.id().to_be_bytes());
            pkt.extend_from_slice(&digest);
            Some(pkt)
        }
        Answer::Kiss(code) => {
            let mut header = server_reply(&sent, 0.0);
            header.leap_indicator = LeapIndicator::Unknown;
            header.stratum = Stratum::UNSPECIFIED;
            header.reference_id = code.as_bytes();
            Some(encode(&header))
        }
        Answer::Unsynced => {
            let mut header = server_reply(&sent, 0.0);
            header.leap_indicator = LeapIndicator::Unknown;
            Some(encode(&header))
        }
        Answer::WrongOrigin => {
            let mut header = server_reply(&sent, 0.0);
            header.origin_timestamp = shift(sent.transmit_timestamp, 1.0);
            Some(encode(&header))
        }
        Answer::Silence => None,
    }
}

/// A clock that records corrections, optionally refusing them all.
#[derive(Debug, Default)]
pub struct RecordingClock {
    pub corrections: Vec<(CorrectionMethod, f64)>,
    pub refuse_with: Option<ClockError>,
}

impl RecordingClock {
    pub fn refusing(error: ClockError) -> Self {
        RecordingClock {
            corrections: Vec::new(),
            refuse_with: Some(error),
        }
    }

    fn record(&mut self, method: CorrectionMethod, offset: f64) -> Result<(), ClockError> {
        if let Some(e) = &self.refuse_with {
            return Err(e.clone());
        }
        self.corrections.push((method, offset));
        Ok(())
    }
}

impl ClockAdjuster for RecordingClock {
    fn step(&mut self, offset_seconds: f64) -> Result<(), ClockError> {
        self.record(CorrectionMethod::Step, offset_seconds)
    }

    fn slew(&mut self, offset_seconds: f64) -> Result<(), ClockError> {
        self.record(CorrectionMethod::Slew, offset_seconds)
    }
}

/// Assert two offsets agree to within a millisecond.
pub fn assert_offset(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-3,
        "offset {actual} not within 1 ms of {expected}"
    );
}
