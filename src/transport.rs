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

//! The GELF transport layer.
//!
//! This module defines [`Endpoint`], the immutable descriptor of where to connect, and
//! [`Connection`], the handle over the one socket a dial produces. A [`Connection`] is a
//! tagged variant over plain TCP, TLS-wrapped TCP & UDP, chosen at construction time, so
//! the write & close paths involve no runtime type assertions.
//!
//! A [`Connection`] has exactly two states, open & closed, with one irreversible
//! transition: after [`close`](Connection::close), writes fail with [`Error::Closed`] and a
//! second close fails with [`Error::Close`]. No internal locking is provided; concurrent use
//! of one [`Connection`] requires external serialization (as
//! [`Layer`](crate::layer::Layer) does with a mutex).
//!
//! # Examples
//!
//! To send GELF messages over TCP to a collector listening on the conventional port 12201
//! on localhost:
//!
//! ```no_run
//! use tracing_gelf::transport::{Connection, Endpoint};
//! let conn = Connection::connect(&Endpoint::local()).unwrap();
//! ```
//!
//! On a non-standard port on another host, over UDP:
//!
//! ```no_run
//! use tracing_gelf::transport::{Connection, Endpoint, Transport};
//! let conn = Connection::connect(&Endpoint::new(
//!     Transport::Datagram,
//!     "some-host.domain.io",
//!     12202,
//! ));
//! ```

use crate::error::{Error, Result};
use crate::gelf::{Gelf, Message};

use backtrace::Backtrace;
use native_tls::{TlsConnector, TlsStream};

use std::{
    io::{self, Write},
    net::{Shutdown, TcpStream, ToSocketAddrs, UdpSocket},
    time::Duration,
};

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                    endpoint description                                        //
////////////////////////////////////////////////////////////////////////////////////////////////////

/// The underlying socket discipline.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Transport {
    /// Stream-oriented (TCP); ordered & connection-based
    Stream,
    /// Datagram-oriented (UDP); connectionless & size-limited
    Datagram,
}

/// Where to connect: a transport, a hostname or IP, and a port.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    pub transport: Transport,
    pub address: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new<S: Into<String>>(transport: Transport, address: S, port: u16) -> Endpoint {
        Endpoint {
            transport,
            address: address.into(),
            port,
        }
    }
    /// The conventional Graylog GELF TCP input: localhost:12201.
    pub fn local() -> Endpoint {
        Endpoint::new(Transport::Stream, "localhost", 12201)
    }
}

/// TLS connection options.
///
/// The default verifies the peer certificate & derives the SNI domain from the endpoint
/// address. Disabling verification is intended for collectors presenting self-signed
/// certificates (and for tests); all other TLS knobs are deferred to the platform TLS
/// implementation's defaults.
#[derive(Clone, Debug, Default)]
pub struct TlsConfig {
    /// Domain name presented during the TLS handshake; the endpoint address when `None`
    pub domain: Option<String>,
    /// Skip certificate validation when true
    pub insecure_skip_verify: bool,
}

impl TlsConfig {
    fn connector(&self) -> std::result::Result<TlsConnector, native_tls::Error> {
        let mut builder = TlsConnector::builder();
        if self.insecure_skip_verify {
            builder.danger_accept_invalid_certs(true);
            builder.danger_accept_invalid_hostnames(true);
        }
        builder.build()
    }
}

////////////////////////////////////////////////////////////////////////////////////////////////////
//                                       struct Connection                                        //
////////////////////////////////////////////////////////////////////////////////////////////////////

enum Socket {
    Tcp(TcpStream),
    Tls(Box<TlsStream<TcpStream>>),
    Udp(UdpSocket),
    Closed,
}

/// An open transport handle owning exactly one socket.
///
/// One [`Connection`] serves zero or more sequential [`Message`] writes. There is no retry,
/// no buffering & no keepalive configuration beyond the transport defaults; on any
/// [`Error::Write`] the connection's health is not guaranteed & the caller should close &
/// reconnect.
pub struct Connection {
    socket: Socket,
}

fn connection_error<E: std::error::Error + Send + Sync + 'static>(err: E) -> Error {
    Error::Connection {
        source: Box::new(err),
        back: Backtrace::new(),
    }
}

fn tls_error<E: std::error::Error + Send + Sync + 'static>(err: E) -> Error {
    Error::Tls {
        source: Box::new(err),
        back: Backtrace::new(),
    }
}

fn write_error<E: std::error::Error + Send + Sync + 'static>(err: E) -> Error {
    Error::Write {
        source: Box::new(err),
        back: Backtrace::new(),
    }
}

/// Dial every address `endpoint` resolves to, returning the first stream to connect.
fn dial(endpoint: &Endpoint, timeout: Option<Duration>) -> Result<TcpStream> {
    let addrs = (endpoint.address.as_str(), endpoint.port)
        .to_socket_addrs()
        .map_err(connection_error)?;
    let mut last_err = None;
    for addr in addrs {
        let attempt = match timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
            None => TcpStream::connect(addr),
        };
        match attempt {
            Ok(stream) => return Ok(stream),
            Err(err) => last_err = Some(err),
        }
    }
    Err(connection_error(last_err.unwrap_or_else(|| {
        io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!(
                "{}:{} resolved to no addresses",
                endpoint.address, endpoint.port
            ),
        )
    })))
}

impl Connection {
    /// Open a plain connection to `endpoint`.
    ///
    /// A [`Transport::Stream`] endpoint is dialed over TCP. A [`Transport::Datagram`]
    /// endpoint binds an ephemeral UDP socket of the matching address family & connects it
    /// to the peer; connectionless at the OS level, but the returned handle is bound to the
    /// remote peer all the same.
    pub fn connect(endpoint: &Endpoint) -> Result<Connection> {
        match endpoint.transport {
            Transport::Stream => Ok(Connection {
                socket: Socket::Tcp(dial(endpoint, None)?),
            }),
            Transport::Datagram => {
                let mut addrs = (endpoint.address.as_str(), endpoint.port)
                    .to_socket_addrs()
                    .map_err(connection_error)?;
                let addr = addrs.next().ok_or_else(|| {
                    connection_error(io::Error::new(
                        io::ErrorKind::AddrNotAvailable,
                        format!(
                            "{}:{} resolved to no addresses",
                            endpoint.address, endpoint.port
                        ),
                    ))
                })?;
                let socket = if addr.is_ipv4() {
                    UdpSocket::bind(("0.0.0.0", 0))
                } else {
                    UdpSocket::bind(("::", 0))
                }
                .map_err(connection_error)?;
                socket.connect(addr).map_err(connection_error)?;
                Ok(Connection {
                    socket: Socket::Udp(socket),
                })
            }
        }
    }

    /// Open a TLS-wrapped stream connection to `endpoint`.
    ///
    /// `timeout` bounds both the dial (per resolved address) & the handshake; the socket
    /// read/write timeouts are pinned to it for the handshake's duration so a stalled peer
    /// cannot hang us, then cleared. A [`Transport::Datagram`] endpoint is rejected: there
    /// is no DTLS here.
    pub fn connect_tls(
        endpoint: &Endpoint,
        timeout: Option<Duration>,
        tls: &TlsConfig,
    ) -> Result<Connection> {
        if endpoint.transport == Transport::Datagram {
            return Err(Error::Tls {
                source: "TLS is not supported over datagram transports".into(),
                back: Backtrace::new(),
            });
        }
        let stream = dial(endpoint, timeout)?;
        // Once the dial has succeeded, everything that can go wrong belongs to the
        // handshake, so it reports as `Error::Tls`.
        let connector = tls.connector().map_err(tls_error)?;
        stream.set_read_timeout(timeout).map_err(tls_error)?;
        stream.set_write_timeout(timeout).map_err(tls_error)?;
        let domain = tls.domain.as_deref().unwrap_or(&endpoint.address);
        let stream = connector
            .connect(domain, stream)
            .map_err(|err| tls_error(io::Error::other(err.to_string())))?;
        let tcp = stream.get_ref();
        tcp.set_read_timeout(None).map_err(tls_error)?;
        tcp.set_write_timeout(None).map_err(tls_error)?;
        Ok(Connection {
            socket: Socket::Tls(Box::new(stream)),
        })
    }

    /// Encode `message` with the default encoder & write the frame to the socket.
    pub fn send(&mut self, message: &Message) -> Result<()> {
        self.send_with(&Gelf::default(), message)
    }

    /// Encode `message` with `encoder` & write the frame to the socket.
    ///
    /// Exactly one write, no retry. A short write that the transport primitive reports
    /// without error is treated as success.
    pub fn send_with(&mut self, encoder: &Gelf, message: &Message) -> Result<()> {
        let frame = encoder.encode(message)?;
        match &mut self.socket {
            Socket::Tcp(stream) => {
                stream.write(&frame).map_err(write_error)?;
                stream.flush().map_err(write_error)
            }
            Socket::Tls(stream) => {
                stream.write(&frame).map_err(write_error)?;
                stream.flush().map_err(write_error)
            }
            Socket::Udp(socket) => {
                socket.send(&frame).map_err(write_error)?;
                Ok(())
            }
            Socket::Closed => Err(Error::Closed {
                back: Backtrace::new(),
            }),
        }
    }

    /// Update the write timeout for the underlying socket. This is the only bound on an
    /// in-flight write; there is no cancellation.
    pub fn set_write_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        match &self.socket {
            Socket::Tcp(stream) => stream.set_write_timeout(timeout).map_err(write_error),
            Socket::Tls(stream) => stream
                .get_ref()
                .set_write_timeout(timeout)
                .map_err(write_error),
            Socket::Udp(socket) => socket.set_write_timeout(timeout).map_err(write_error),
            Socket::Closed => Err(Error::Closed {
                back: Backtrace::new(),
            }),
        }
    }

    /// Release the underlying socket.
    ///
    /// The first call shuts the socket down (sending the TLS close_notify for the TLS
    /// variant) & transitions to the closed state; any further call fails with
    /// [`Error::Close`], as does any further write (with [`Error::Closed`]). A peer that is
    /// already gone (`NotConnected` from the OS) still counts as a successful close.
    pub fn close(&mut self) -> Result<()> {
        fn ignore_not_connected(err: io::Error) -> std::result::Result<(), io::Error> {
            if err.kind() == io::ErrorKind::NotConnected {
                Ok(())
            } else {
                Err(err)
            }
        }
        fn close_error(err: io::Error) -> Error {
            Error::Close {
                source: Some(Box::new(err)),
                back: Backtrace::new(),
            }
        }
        match std::mem::replace(&mut self.socket, Socket::Closed) {
            Socket::Tcp(stream) => stream
                .shutdown(Shutdown::Both)
                .or_else(ignore_not_connected)
                .map_err(close_error),
            Socket::Tls(mut stream) => stream
                .shutdown()
                .or_else(ignore_not_connected)
                .map_err(close_error),
            // UDP holds no peer state; dropping the socket releases it.
            Socket::Udp(_) => Ok(()),
            Socket::Closed => Err(Error::Close {
                source: None,
                back: Backtrace::new(),
            }),
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.socket, Socket::Closed)
    }
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::gelf::Host;

    use std::io::Read;
    use std::net::TcpListener;

    fn message() -> Message {
        Message::new(Host::new("web01".to_string()).unwrap(), "boot complete").extra("env", "prod")
    }

    fn parse(frame: &[u8]) -> serde_json::Value {
        let json = frame.strip_suffix(b"\n\0").unwrap();
        serde_json::from_slice(json).unwrap()
    }

    /// Dial a loopback TCP listener, send one message, & check the frame on the wire.
    #[test]
    fn test_tcp_send() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = std::thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            let mut buf = Vec::new();
            socket.read_to_end(&mut buf).unwrap();
            buf
        });

        let endpoint = Endpoint::new(Transport::Stream, "127.0.0.1", port);
        let mut conn = Connection::connect(&endpoint).unwrap();
        assert!(!conn.is_closed());
        conn.send(&message()).unwrap();
        conn.close().unwrap();

        let buf = handle.join().unwrap();
        let object = parse(&buf);
        assert_eq!(object.get("host").unwrap(), "web01");
        assert_eq!(object.get("short_message").unwrap(), "boot complete");
        assert_eq!(object.get("_env").unwrap(), "prod");
    }

    /// A datagram "connection" is connectionless at the OS level, but the handle is bound
    /// to the peer & one send is one datagram.
    #[test]
    fn test_udp_send() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(Duration::from_secs(5)))
            .unwrap();
        let port = receiver.local_addr().unwrap().port();

        let endpoint = Endpoint::new(Transport::Datagram, "127.0.0.1", port);
        let mut conn = Connection::connect(&endpoint).unwrap();
        conn.send(&message()).unwrap();

        let mut buf = [0_u8; 8192];
        let n = receiver.recv(&mut buf).unwrap();
        let object = parse(&buf[..n]);
        assert_eq!(object.get("_env").unwrap(), "prod");

        conn.close().unwrap();
    }

    /// Sending on a closed connection fails with `Error::Closed`; closing twice fails with
    /// `Error::Close { source: None, .. }`.
    #[test]
    fn test_closed_state_machine() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let endpoint = Endpoint::new(Transport::Stream, "127.0.0.1", port);
        let mut conn = Connection::connect(&endpoint).unwrap();
        conn.close().unwrap();
        assert!(conn.is_closed());

        assert!(matches!(conn.send(&message()), Err(Error::Closed { .. })));
        assert!(matches!(
            conn.set_write_timeout(Some(Duration::from_secs(1))),
            Err(Error::Closed { .. })
        ));
        assert!(matches!(
            conn.close(),
            Err(Error::Close { source: None, .. })
        ));
    }

    /// A dial failure is `Error::Connection`, not `Error::Tls`.
    #[test]
    fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener); // now nobody is listening there

        let endpoint = Endpoint::new(Transport::Stream, "127.0.0.1", port);
        assert!(matches!(
            Connection::connect(&endpoint),
            Err(Error::Connection { .. })
        ));
    }

    /// A peer that accepts the dial but does not speak TLS produces `Error::Tls`, distinct
    /// from the dial failure above.
    #[test]
    fn test_tls_handshake_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = std::thread::spawn(move || {
            // Accept & hang up without so much as a ServerHello.
            let (socket, _) = listener.accept().unwrap();
            drop(socket);
        });

        let endpoint = Endpoint::new(Transport::Stream, "127.0.0.1", port);
        let result = Connection::connect_tls(
            &endpoint,
            Some(Duration::from_secs(5)),
            &TlsConfig {
                domain: None,
                insecure_skip_verify: true,
            },
        );
        assert!(matches!(result, Err(Error::Tls { .. })));
        handle.join().unwrap();
    }

    /// The verification toggle, both ways, against a loopback acceptor presenting the
    /// self-signed certificate checked in under tests/data: with verification enabled the
    /// handshake fails with `Error::Tls`; with it disabled the handshake completes & a
    /// message goes through.
    #[test]
    fn test_tls_verification_policy() {
        use native_tls::{Identity, TlsAcceptor};

        use std::sync::Arc;

        let identity =
            Identity::from_pkcs12(include_bytes!("../tests/data/localhost.p12"), "gelf-test")
                .unwrap();
        let acceptor = Arc::new(TlsAcceptor::new(identity).unwrap());

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = acceptor.clone();
        let handle = std::thread::spawn(move || {
            let (socket, _) = listener.accept().unwrap();
            // The client is about to refuse our certificate; the server-side handshake
            // failing right along with it is expected.
            let _ = server.accept(socket);
        });
        let endpoint = Endpoint::new(Transport::Stream, "127.0.0.1", port);
        let result = Connection::connect_tls(
            &endpoint,
            Some(Duration::from_secs(5)),
            &TlsConfig::default(),
        );
        assert!(matches!(result, Err(Error::Tls { .. })));
        handle.join().unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = std::thread::spawn(move || {
            let (socket, _) = listener.accept().unwrap();
            let mut stream = acceptor.accept(socket).unwrap();
            let mut buf = Vec::new();
            stream.read_to_end(&mut buf).unwrap();
            buf
        });
        let endpoint = Endpoint::new(Transport::Stream, "127.0.0.1", port);
        let mut conn = Connection::connect_tls(
            &endpoint,
            Some(Duration::from_secs(5)),
            &TlsConfig {
                domain: None,
                insecure_skip_verify: true,
            },
        )
        .unwrap();
        conn.send(&message()).unwrap();
        conn.close().unwrap();

        let buf = handle.join().unwrap();
        let object = parse(&buf);
        assert_eq!(object.get("host").unwrap(), "web01");
        assert_eq!(object.get("_env").unwrap(), "prod");
    }

    /// No DTLS: a datagram endpoint on the TLS path is rejected up front.
    #[test]
    fn test_tls_rejects_datagram() {
        let endpoint = Endpoint::new(Transport::Datagram, "127.0.0.1", 12201);
        assert!(matches!(
            Connection::connect_tls(&endpoint, None, &TlsConfig::default()),
            Err(Error::Tls { .. })
        ));
    }

    #[test]
    fn test_local_endpoint() {
        let endpoint = Endpoint::local();
        assert_eq!(endpoint.transport, Transport::Stream);
        assert_eq!(endpoint.port, 12201);
    }

    /// Requires a Graylog GELF TCP input on localhost:12201.
    #[cfg(feature = "graylog")]
    #[test]
    fn test_against_local_graylog() {
        let mut conn = Connection::connect(&Endpoint::local()).unwrap();
        conn.send(&message()).unwrap();
        conn.close().unwrap();
    }
}
