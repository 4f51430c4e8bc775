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
//! [tracing-gelf](crate) errors

use backtrace::Backtrace;

/// [tracing-gelf](crate) error type
///
/// [tracing-gelf](crate) eschews libraries like [thiserror], [anyhow] & [Snafu] in favor of
/// a straightforward enumeration with a few match arms chosen on the basis of what the caller
/// will need to respond. In particular, a TLS handshake failure ([`Error::Tls`]) is kept
/// distinct from a dial failure ([`Error::Connection`]) so callers can tell network
/// reachability problems from trust problems.
///
/// [thiserror]: https://docs.rs/thiserror
/// [anyhow]: https://docs.rs/anyhow
/// [Snafu]: https://docs.rs/snafu/latest/snafu
#[non_exhaustive]
pub enum Error {
    /// Failed to resolve or dial the remote endpoint
    Connection {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// Failed to build the TLS connector or complete the handshake
    Tls {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// A message could not be serialized, or a field failed validation; a caller defect,
    /// not a runtime condition to recover from
    Validation {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// I/O failure while writing a message to the connection
    Write {
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
        back: Backtrace,
    },
    /// Operation attempted on a connection that has already been closed
    Closed { back: Backtrace },
    /// Failed to release the underlying socket; `source` is `None` when the connection
    /// was already closed
    Close {
        source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
        back: Backtrace,
    },
    /// An Event had no message field
    NoMessageField {
        name: &'static str,
        back: Backtrace,
    },
}

impl std::fmt::Display for Error {
    // `Error` is non-exhaustive so that adding variants won't be a breaking change to our
    // callers. That means the compiler won't catch us if we miss a variant here, so we
    // always include a `_` arm.
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Connection { source, .. } => {
                write!(f, "While dialing the collector, got {}", source)
            }
            Error::Tls { source, .. } => write!(f, "TLS error: {}", source),
            Error::Validation { source, .. } => {
                write!(f, "While preparing a GELF message, got {}", source)
            }
            Error::Write { source, .. } => {
                write!(f, "While sending a GELF message, got {}", source)
            }
            Error::Closed { .. } => write!(f, "The connection has been closed"),
            Error::Close {
                source: Some(source),
                ..
            } => write!(f, "While closing the connection, got {}", source),
            Error::Close { source: None, .. } => {
                write!(f, "The connection was already closed")
            }
            Error::NoMessageField { name, .. } => write!(
                f,
                "Event '{}' had no message field, and so was not forwarded to the collector",
                name
            ),
            _ => write!(f, "Other tracing-gelf error"),
        }
    }
}

impl std::fmt::Debug for Error {
    // `Error` is non-exhaustive so that adding variants won't be a breaking change to our
    // callers. That means the compiler won't catch us if we miss a variant here, so we
    // always include a `_` arm.
    #[allow(unreachable_patterns)]
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Connection { source: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::Tls { source: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::Validation { source: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::Write { source: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::Closed { back } => write!(f, "{}\n{:?}", self, back),
            Error::Close { source: _, back } => write!(f, "{}\n{:?}", self, back),
            Error::NoMessageField { name: _, back } => write!(f, "{}\n{:?}", self, back),
            err => write!(f, "tracing-gelf error: {}", err),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Connection { source, .. }
            | Error::Tls { source, .. }
            | Error::Validation { source, .. }
            | Error::Write { source, .. } => Some(source.as_ref()),
            Error::Close {
                source: Some(source),
                ..
            } => Some(source.as_ref()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
