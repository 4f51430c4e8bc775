// Copyright (C) 2022-2025 Michael Herstine <sp1ff@pobox.com>
//
// This file is part of tracing-gelf.
//
// tracing-gelf is free software: you can redistribute it and/or modify it under the terms of the
// GNU General Public License as published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// mpdpopm is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even
// the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General
// Public License for more details.
//
// You should have received a copy of the GNU General Public License along with mpdpopm.  If not,
// see <http://www.gnu.org/licenses/>.

//! GELF v1.1 message representation & encoding.
//!
//! [`Message`] models one GELF message; [`Gelf`] is the encoder that turns a [`Message`] into
//! the exact byte sequence to be written to a collector: a single JSON object followed by a
//! frame [`Terminator`].
//!
//! # Examples
//!
//! ```rust
//! use tracing_gelf::gelf::{Gelf, Host, Message};
//!
//! let message = Message::new(Host::new("web01".to_string()).unwrap(), "boot complete")
//!     .extra("env", "prod");
//! let frame = Gelf::default().encode(&message).unwrap();
//! assert!(frame.ends_with(b"\n\0"));
//! ```

use crate::error::{Error, Result};
use crate::level::Level;

use backtrace::Backtrace;
use bytes::BufMut;
use chrono::prelude::*;
use serde_json::{Map, Value};

use std::collections::BTreeMap;

type StdResult<T, E> = std::result::Result<T, E>;

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                          struct Host                                           //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// A [`String`] instance with the additional constraint that it must be non-empty (GELF
/// requires the `host` field of every message).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Host(String);

impl Host {
    pub fn new(name: String) -> Result<Host> {
        if name.is_empty() {
            Err(Error::Validation {
                source: "the GELF host field may not be empty".into(),
                back: Backtrace::new(),
            })
        } else {
            Ok(Host(name))
        }
    }
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::default::Default for Host {
    /// Attempt to figure-out a name for the host originating our messages.
    ///
    /// The order of preference is:
    ///
    /// 1.  the machine hostname, per [gethostname()]
    /// 2.  a local IP address
    /// 3.  the literal `"localhost"`
    ///
    /// [gethostname()]: https://man7.org/linux/man-pages/man2/gethostname.2.html
    fn default() -> Self {
        hostname::get()
            .ok()
            // `hostname::get()` hands us an `OsString`; GELF's host field is JSON text,
            // so a name that isn't valid Unicode is no use to us.
            .and_then(|name| name.into_string().ok())
            .and_then(|name| Host::new(name).ok())
            .or_else(|| {
                local_ip_address::local_ip()
                    .ok()
                    .and_then(|ip| Host::new(ip.to_string()).ok())
            })
            .unwrap_or_else(|| Host(String::from("localhost")))
    }
}

impl std::convert::TryFrom<String> for Host {
    type Error = Error;
    fn try_from(x: String) -> StdResult<Self, Self::Error> {
        Host::new(x)
    }
}

impl std::fmt::Display for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> StdResult<(), std::fmt::Error> {
        write!(f, "{}", self.0)
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                         struct Message                                         //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// One GELF message.
///
/// The canonical fields are those of GELF v1.1: `host`, `short_message`, and the optional
/// `full_message`, `timestamp` (epoch seconds) & `level`. The `version` field is a constant
/// ("1.1") injected at encode time. `extra` is an open-ended mapping of additional fields,
/// each of which will appear at the top level of the emitted JSON object under an
/// underscore-prefixed key.
///
/// Extra keys must not collide with the canonical GELF field names _after_ prefixing
/// (e.g. don't name an extra field `"id"`, which Graylog reserves as `_id`); this is a caller
/// responsibility & is not validated here.
#[derive(Clone, Debug)]
pub struct Message {
    host: Host,
    short_message: String,
    full_message: Option<String>,
    timestamp: Option<i64>,
    level: Option<Level>,
    extra: BTreeMap<String, String>,
}

impl Message {
    pub fn new<S: Into<String>>(host: Host, short_message: S) -> Message {
        Message {
            host,
            short_message: short_message.into(),
            full_message: None,
            timestamp: None,
            level: None,
            extra: BTreeMap::new(),
        }
    }
    pub fn full_message<S: Into<String>>(mut self, full_message: S) -> Self {
        self.full_message = Some(full_message.into());
        self
    }
    /// Set the timestamp from raw epoch seconds.
    pub fn timestamp(mut self, seconds: i64) -> Self {
        self.timestamp = Some(seconds);
        self
    }
    /// Set the timestamp from a [`chrono`] UTC datetime.
    pub fn timestamp_from(mut self, when: DateTime<Utc>) -> Self {
        self.timestamp = Some(when.timestamp());
        self
    }
    pub fn level(mut self, level: Level) -> Self {
        self.level = Some(level);
        self
    }
    /// Add one extra field. `key` is the un-prefixed name; the leading underscore is applied
    /// at encode time.
    pub fn extra<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
    pub fn short_message(&self) -> &str {
        &self.short_message
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                         the Gelf encoder                                       //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// The frame terminator appended after the JSON object.
///
/// Graylog's GELF TCP input delimits messages with a NUL byte; this crate writes `\n\0`,
/// which both NUL-delimited and newline-delimited collectors accept. Datagram inputs frame
/// per packet & need no terminator at all, which [`Terminator::None`] provides.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Terminator {
    /// The two bytes `0x0A 0x00`
    NewlineNul,
    /// Bare JSON, no terminator
    None,
}

/// An encoder producing GELF v1.1-conformant message frames.
///
/// Deployments observed in the wild differ on two points, so both are options here rather
/// than hard-coded:
///
/// - whether unset optional fields are omitted from the JSON object (the default) or emitted
///   with their zero values (`full_message: ""`, `timestamp: 0`, `level: 0`);
/// - whether the frame ends with `\n\0` (the default) or with nothing.
pub struct Gelf {
    emit_zero_values: bool,
    terminator: Terminator,
}

impl std::default::Default for Gelf {
    fn default() -> Self {
        Gelf {
            emit_zero_values: false,
            terminator: Terminator::NewlineNul,
        }
    }
}

pub struct GelfBuilder {
    imp: Gelf,
}

impl GelfBuilder {
    pub fn emit_zero_values(mut self, emit_zero_values: bool) -> Self {
        self.imp.emit_zero_values = emit_zero_values;
        self
    }
    pub fn terminator(mut self, terminator: Terminator) -> Self {
        self.imp.terminator = terminator;
        self
    }
    pub fn build(self) -> Gelf {
        self.imp
    }
}

impl Gelf {
    pub fn builder() -> GelfBuilder {
        GelfBuilder {
            imp: Gelf::default(),
        }
    }

    /// Encode `message` to the exact byte sequence to transmit. Pure computation; never
    /// touches the network.
    ///
    /// Extra fields are merged into the top-level object under `"_" + key`; a key that
    /// already starts with an underscore is taken as-is (never double-prefixed). Extras are
    /// inserted in sorted key order & insertion is last-write-wins, so when the caller
    /// supplies both `"a"` and `"_a"` (a caller error), the un-prefixed key's value wins
    /// deterministically.
    pub fn encode(&self, message: &Message) -> Result<Vec<u8>> {
        let mut object = Map::new();
        object.insert("version".to_string(), Value::from("1.1"));
        object.insert(
            "host".to_string(),
            Value::from(message.host.as_str().to_string()),
        );
        object.insert(
            "short_message".to_string(),
            Value::from(message.short_message.clone()),
        );
        match (&message.full_message, self.emit_zero_values) {
            (Some(full), _) => {
                object.insert("full_message".to_string(), Value::from(full.clone()));
            }
            (None, true) => {
                object.insert("full_message".to_string(), Value::from(""));
            }
            (None, false) => {}
        }
        match (message.timestamp, self.emit_zero_values) {
            (Some(seconds), _) => {
                object.insert("timestamp".to_string(), Value::from(seconds));
            }
            (None, true) => {
                object.insert("timestamp".to_string(), Value::from(0));
            }
            (None, false) => {}
        }
        match (message.level, self.emit_zero_values) {
            (Some(level), _) => {
                object.insert("level".to_string(), Value::from(level as u8));
            }
            (None, true) => {
                object.insert("level".to_string(), Value::from(0));
            }
            (None, false) => {}
        }

        for (key, value) in &message.extra {
            let key = if key.starts_with('_') {
                key.clone()
            } else {
                format!("_{}", key)
            };
            object.insert(key, Value::from(value.clone()));
        }

        let mut buf = serde_json::to_vec(&Value::Object(object)).map_err(|err| {
            Error::Validation {
                source: Box::new(err),
                back: Backtrace::new(),
            }
        })?;

        match self.terminator {
            Terminator::NewlineNul => {
                buf.put_u8(b'\n');
                buf.put_u8(0);
            }
            Terminator::None => {}
        }

        Ok(buf)
    }
}

#[cfg(test)]
mod tests {

    use super::*;

    fn parse(frame: &[u8]) -> serde_json::Map<String, Value> {
        let json = frame.strip_suffix(b"\n\0").unwrap_or(frame);
        match serde_json::from_slice(json).unwrap() {
            Value::Object(object) => object,
            other => panic!("expected a JSON object, got {:?}", other),
        }
    }

    #[test]
    fn test_hosts() {
        // Just exercise `default()`; be sure it compiles & returns something non-empty.
        assert!(!Host::default().as_str().is_empty());

        assert!(Host::new("".to_string()).is_err());
        assert!(Host::try_from("web01".to_string()).is_ok());
    }

    /// The worked example: {host:"web01", shortMessage:"boot complete", extra:{env:prod}}
    #[test]
    fn test_boot_complete() {
        let message = Message::new(Host::new("web01".to_string()).unwrap(), "boot complete")
            .extra("env", "prod");
        let frame = Gelf::default().encode(&message).unwrap();

        assert_eq!(&frame[frame.len() - 2..], &[0x0a_u8, 0x00_u8]);

        let object = parse(&frame);
        assert_eq!(object.get("version").unwrap(), "1.1");
        assert_eq!(object.get("host").unwrap(), "web01");
        assert_eq!(object.get("short_message").unwrap(), "boot complete");
        assert_eq!(object.get("_env").unwrap(), "prod");
        // omit-empty is the default
        assert!(!object.contains_key("full_message"));
        assert!(!object.contains_key("timestamp"));
        assert!(!object.contains_key("level"));
        assert_eq!(object.len(), 4);
    }

    /// Encoding then parsing back yields exactly the canonical fields present plus one
    /// `_<key>` entry per extra, values verbatim.
    #[test]
    fn test_round_trip() {
        let message = Message::new(Host::new("web01".to_string()).unwrap(), "short")
            .full_message("something longer")
            .timestamp(1661561522)
            .level(Level::Notice)
            .extra("env", "prod")
            .extra("request_id", "deadbeef");
        let frame = Gelf::default().encode(&message).unwrap();
        let object = parse(&frame);

        assert_eq!(object.get("version").unwrap(), "1.1");
        assert_eq!(object.get("host").unwrap(), "web01");
        assert_eq!(object.get("short_message").unwrap(), "short");
        assert_eq!(object.get("full_message").unwrap(), "something longer");
        assert_eq!(object.get("timestamp").unwrap(), 1661561522);
        assert_eq!(object.get("level").unwrap(), 5);
        assert_eq!(object.get("_env").unwrap(), "prod");
        assert_eq!(object.get("_request_id").unwrap(), "deadbeef");
        assert_eq!(object.len(), 8);
    }

    /// The terminator is always exactly `0x0A 0x00`, including for a message with no extras.
    #[test]
    fn test_terminator() {
        let message = Message::new(Host::new("web01".to_string()).unwrap(), "no extras");
        let frame = Gelf::default().encode(&message).unwrap();
        assert_eq!(&frame[frame.len() - 2..], b"\n\0");

        let frame = Gelf::builder()
            .terminator(Terminator::None)
            .build()
            .encode(&message)
            .unwrap();
        // Bare JSON: last byte is the closing brace.
        assert_eq!(frame.last().unwrap(), &b'}');
    }

    /// Extra keys get exactly one leading underscore; a key already starting with `_` is
    /// taken as-is.
    #[test]
    fn test_no_double_prefix() {
        let message = Message::new(Host::new("web01".to_string()).unwrap(), "prefixes")
            .extra("_already", "1")
            .extra("fresh", "2");
        let object = parse(&Gelf::default().encode(&message).unwrap());
        assert_eq!(object.get("_already").unwrap(), "1");
        assert_eq!(object.get("_fresh").unwrap(), "2");
        assert!(!object.contains_key("__already"));
    }

    /// Extras `"a"` and `"_a"` both land on `"_a"`; since extras are inserted in sorted key
    /// order & insertion is last-write-wins, the un-prefixed key's value wins.
    #[test]
    fn test_collision_rule() {
        let message = Message::new(Host::new("web01".to_string()).unwrap(), "collision")
            .extra("_a", "prefixed")
            .extra("a", "plain");
        let object = parse(&Gelf::default().encode(&message).unwrap());
        assert_eq!(object.get("_a").unwrap(), "plain");
    }

    /// With `emit_zero_values`, unset optional fields appear with their zero values.
    #[test]
    fn test_emit_zero_values() {
        let message = Message::new(Host::new("web01".to_string()).unwrap(), "zeroes");
        let object = parse(
            &Gelf::builder()
                .emit_zero_values(true)
                .build()
                .encode(&message)
                .unwrap(),
        );
        assert_eq!(object.get("full_message").unwrap(), "");
        assert_eq!(object.get("timestamp").unwrap(), 0);
        assert_eq!(object.get("level").unwrap(), 0);

        // A set value is emitted as-is under either policy.
        let message = message.level(Level::Error).timestamp(1);
        let object = parse(
            &Gelf::builder()
                .emit_zero_values(true)
                .build()
                .encode(&message)
                .unwrap(),
        );
        assert_eq!(object.get("timestamp").unwrap(), 1);
        assert_eq!(object.get("level").unwrap(), 3);
    }

    #[test]
    fn test_timestamp_from_datetime() {
        let when = Utc.timestamp_opt(1661561522, 0).unwrap();
        let message =
            Message::new(Host::new("web01".to_string()).unwrap(), "dated").timestamp_from(when);
        let object = parse(&Gelf::default().encode(&message).unwrap());
        assert_eq!(object.get("timestamp").unwrap(), 1661561522);
    }
}
