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
//! A [GELF] client and a [`tracing-subscriber`] [`Layer`] implementation for sending
//! [`tracing`] [`Event`]s to a [Graylog] collector
//!
//! [GELF]: https://go2docs.graylog.org/current/getting_in_log_data/gelf.html
//! [`tracing-subscriber`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/index.html
//! [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
//! [`tracing`]: https://docs.rs/tracing/0.1.35/tracing/index.html
//! [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html
//! [Graylog]: https://graylog.org
//!
//! # Introduction
//!
//! GELF (the Graylog Extended Log Format) is a JSON-based log message schema: a handful of
//! reserved top-level fields (`version`, `host`, `short_message` & friends) plus an
//! `_`-prefixed convention for arbitrary user-defined fields. Collectors accept it over a
//! stream socket (each message a JSON object followed by a frame terminator) or over UDP
//! (one message per datagram).
//!
//! This crate does exactly two things, in layers:
//!
//! 1. a small synchronous client: open a plain or TLS-wrapped connection to a collector
//!    ([`transport::Connection`]), encode a structured record to a GELF frame
//!    ([`gelf::Gelf`]), write it, close the connection. One call, one message; no retries,
//!    no batching, no queues.
//!
//! 2. a [`tracing-subscriber`] [`Layer`] ([`layer::Layer`]) that drives (1) from [`tracing`]
//!    events: each event becomes one GELF message, with the event's fields carried as
//!    `_`-prefixed extras.
//!
//! [`tracing-subscriber`]: https://docs.rs/tracing-subscriber/0.3.11/tracing_subscriber/index.html
//! [`Layer`]: https://docs.rs/tracing-subscriber/0.3.11/tracing_subscriber/layer/trait.Layer.html
//!
//! Retry & backoff on failure, buffering, connection pooling & GELF's UDP chunking
//! extension are all out of scope; callers that need delivery guarantees should close &
//! reconnect on any write failure.
//!
//! # Usage
//!
//! The client can be used on its own:
//!
//! ```no_run
//! use tracing_gelf::gelf::{Gelf, Host, Message};
//! use tracing_gelf::transport::{Connection, Endpoint};
//!
//! // The conventional Graylog GELF TCP input: localhost:12201.
//! let mut conn = Connection::connect(&Endpoint::local()).unwrap();
//! let message = Message::new(Host::default(), "boot complete").extra("env", "prod");
//! conn.send(&message).unwrap();
//! conn.close().unwrap();
//! ```
//!
//! [`layer::Layer`] comes with sane defaults:
//!
//! ```no_run
//! use tracing::info;
//! use tracing_gelf::layer::Layer;
//! use tracing_subscriber::layer::SubscriberExt; // Needed to get `with()`
//! use tracing_subscriber::registry::Registry;
//!
//! // The default configuration is to send GELF messages over TCP to port 12201
//! // on the localhost.
//! let subscriber = Registry::default().with(Layer::try_default().unwrap());
//! let _guard = tracing::subscriber::set_default(subscriber);
//!
//! info!(env = "prod", "Hello, world!");
//! ```
//!
//! Will deliver a GELF object to the collector that looks something like this:
//!
//! ```text
//! {"version":"1.1","host":"web01","short_message":"Hello, world!","timestamp":1661561522,"level":6,"_env":"prod"}
//! ```
//!
//! That said, the transport (TCP, TLS or UDP), the encoding policies & the means of mapping
//! [`tracing`] [`Event`]s to GELF messages are configurable:
//!
//! [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html
//! [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html
//!
//! ```no_run
//! use tracing::info;
//! use tracing_gelf::layer::Layer;
//! use tracing_gelf::transport::{Connection, Endpoint, TlsConfig, Transport};
//! use tracing_subscriber::layer::SubscriberExt; // Needed to get `with()`
//! use tracing_subscriber::registry::Registry;
//!
//! use std::time::Duration;
//!
//! let conn = Connection::connect_tls(
//!     &Endpoint::new(Transport::Stream, "graylog.domain.io", 12202),
//!     Some(Duration::from_secs(5)),
//!     &TlsConfig::default(),
//! )
//! .unwrap();
//! let subscriber = Registry::default().with(Layer::with_connection(conn));
//! let _guard = tracing::subscriber::set_default(subscriber);
//!
//! info!("Hello, world!");
//! ```
//!
//! Will send the GELF message over TLS to a collector on port 12202 on graylog.domain.io.

pub mod error;
pub mod gelf;
pub mod layer;
pub mod level;
pub mod tracing;
pub mod transport;
