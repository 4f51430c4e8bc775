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

//! [tracing-gelf](crate) [`Layer`] implementation.
//!
//! [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
//!
//! One [`tracing`] event maps to one GELF message & one synchronous write: no batching, no
//! queue, no background task. The [`Layer`] serializes access to its [`Connection`] with a
//! mutex, since `on_event` takes `&self` & the connection's writes must not interleave at
//! the byte level. Consumers are of course free to implement the
//! [`TracingFormatter`] trait for themselves & provide their own implementations.

use crate::gelf::{Gelf, Message};
use crate::tracing::{DefaultTracingFormatter, TracingFormatter};
use crate::transport::{Connection, Endpoint};

use tracing::Event;
use tracing_subscriber::layer::Context;

use std::sync::Mutex;

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                          struct Layer                                          //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// A [`tracing-subscriber`]-compliant [`Layer`] implementation that will send [`Event`]s to
/// a GELF collector such as Graylog.
///
/// [`tracing-subscriber`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/index.html
/// [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
/// [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html
///
/// A logging pipeline must not panic & must not log recursively; any failure to format or
/// send is reported through `tracing::error!` & the event is dropped.
pub struct Layer<S, F = DefaultTracingFormatter>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    F: TracingFormatter<S>,
{
    formatter: F,
    encoder: Gelf,
    connection: Mutex<Connection>,
    // I need the Subscriber implementation type as a type parameter to transmit it to the
    // TracingFormatter trait. 👇 gets the compiler to shut-up about unused type parameters.
    subscriber_type: std::marker::PhantomData<S>,
}

impl<S> Layer<S, DefaultTracingFormatter>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    /// Attempt to construct a [`Layer`] that will send GELF messages over TCP to the
    /// conventional Graylog input at localhost:12201.
    pub fn try_default() -> crate::error::Result<Self> {
        Ok(Layer::with_connection(Connection::connect(
            &Endpoint::local(),
        )?))
    }
    /// Construct a [`Layer`] that will send GELF messages over `connection`, formatted with
    /// the defaults.
    pub fn with_connection(connection: Connection) -> Self {
        Layer::new(DefaultTracingFormatter::default(), connection)
    }
}

impl<S, F> Layer<S, F>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    F: TracingFormatter<S>,
{
    /// Construct a [`Layer`] with a custom formatter.
    pub fn new(formatter: F, connection: Connection) -> Self {
        Layer {
            formatter,
            encoder: Gelf::default(),
            connection: Mutex::new(connection),
            subscriber_type: std::marker::PhantomData,
        }
    }
    /// Replace the default encoder (say, to change the zero-value or terminator policy).
    pub fn encoder(mut self, encoder: Gelf) -> Self {
        self.encoder = encoder;
        self
    }

    fn transmit(&self, message: &Message) {
        let mut guard = match self.connection.lock() {
            Ok(guard) => guard,
            // A poisoned lock just means another thread panicked mid-send; the connection
            // itself is still ours to use.
            Err(poisoned) => poisoned.into_inner(),
        };
        guard
            .send_with(&self.encoder, message)
            .unwrap_or_else(|err| {
                ::tracing::error!("failed to send GELF message: {}", err);
            })
    }
}

/// This is the Big Tuna-- the [`Layer`] implementation.
///
/// [`Layer`]: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/layer/trait.Layer.html
impl<S, F> tracing_subscriber::layer::Layer<S> for Layer<S, F>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    F: TracingFormatter<S> + 'static,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        match self.formatter.on_event(event, ctx) {
            Ok(Some(message)) => self.transmit(&message),
            Ok(None) => {}
            Err(err) => {
                ::tracing::error!("failed to format event: {}", err);
            }
        }
    }
    fn on_enter(&self, id: &tracing_core::span::Id, ctx: Context<'_, S>) {
        match self.formatter.on_enter(id, ctx) {
            Ok(Some(message)) => self.transmit(&message),
            Ok(None) => {}
            Err(err) => {
                ::tracing::error!("failed to format span entry: {}", err);
            }
        }
    }
    fn on_exit(&self, id: &tracing_core::span::Id, ctx: Context<'_, S>) {
        match self.formatter.on_exit(id, ctx) {
            Ok(Some(message)) => self.transmit(&message),
            Ok(None) => {}
            Err(err) => {
                ::tracing::error!("failed to format span exit: {}", err);
            }
        }
    }
}

#[cfg(test)]
mod smoke {

    use super::*;

    use crate::gelf::Host;
    use crate::transport::{Endpoint, Transport};

    use tracing::info;
    use tracing_subscriber::{layer::SubscriberExt, registry::Registry};

    use std::io::Read;
    use std::net::TcpListener;

    fn frames(buf: &[u8]) -> Vec<serde_json::Value> {
        buf.split(|&b| b == 0)
            .filter(|frame| !frame.is_empty())
            .map(|frame| {
                let json = frame.strip_suffix(b"\n").unwrap();
                serde_json::from_slice(json).unwrap()
            })
            .collect()
    }

    /// Run a full Registry-with-Layer pipeline against a loopback listener & check the GELF
    /// object that comes out the other end.
    #[test]
    fn test_end_to_end() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = std::thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut buf = Vec::new();
            socket.read_to_end(&mut buf).unwrap();
            buf
        });

        let endpoint = Endpoint::new(Transport::Stream, "127.0.0.1", port);
        let connection = Connection::connect(&endpoint).unwrap();
        let formatter = DefaultTracingFormatter::default()
            .host(Host::new("web01".to_string()).unwrap())
            .extra("service", "billing")
            .with_target(true);
        let layer: Layer<Registry, _> = Layer::new(formatter, connection);
        let subscriber = Registry::default().with(layer);
        {
            let _guard = tracing::subscriber::set_default(subscriber);
            info!(env = "prod", "boot complete");
        }
        // Dropping the guard drops the subscriber, the layer & its connection, which closes
        // the socket & unblocks the reader.
        let buf = handle.join().unwrap();
        let objects = frames(&buf);
        assert_eq!(objects.len(), 1);
        let object = &objects[0];
        assert_eq!(object.get("version").unwrap(), "1.1");
        assert_eq!(object.get("host").unwrap(), "web01");
        assert_eq!(object.get("short_message").unwrap(), "boot complete");
        assert_eq!(object.get("level").unwrap(), 6);
        assert_eq!(object.get("_env").unwrap(), "prod");
        assert_eq!(object.get("_service").unwrap(), "billing");
        assert_eq!(
            object.get("_target").unwrap(),
            &serde_json::Value::from(module_path!())
        );
        assert!(object.get("timestamp").unwrap().as_i64().unwrap() > 0);
    }

    /// An event with no message field must not panic the pipeline; it is dropped.
    #[test]
    fn test_event_without_message() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = std::thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut buf = Vec::new();
            socket.read_to_end(&mut buf).unwrap();
            buf
        });

        let endpoint = Endpoint::new(Transport::Stream, "127.0.0.1", port);
        let connection = Connection::connect(&endpoint).unwrap();
        let layer: Layer<Registry> = Layer::with_connection(connection);
        let subscriber = Registry::default().with(layer);
        {
            let _guard = tracing::subscriber::set_default(subscriber);
            info!(env = "prod");
            info!("still here");
        }
        let buf = handle.join().unwrap();
        let objects = frames(&buf);
        assert_eq!(objects.len(), 1);
        assert_eq!(objects[0].get("short_message").unwrap(), "still here");
    }
}
