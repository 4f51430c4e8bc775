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

//! Test writing to a TLS-wrapped Graylog GELF TCP input on port 12202 on the local host.
//!
//! Certificate verification is disabled, the usual state of affairs for a collector
//! presenting a self-signed certificate on localhost.

use tracing::{debug, error, info, trace, warn};
use tracing_gelf::{
    layer::Layer,
    transport::{Connection, Endpoint, TlsConfig, Transport},
};
use tracing_subscriber::{
    layer::SubscriberExt, // Needed to get `with()`
    registry::Registry,
};

use std::time::Duration;

pub fn main() {
    let conn = Connection::connect_tls(
        &Endpoint::new(Transport::Stream, "localhost", 12202),
        Some(Duration::from_secs(5)),
        &TlsConfig {
            domain: None,
            insecure_skip_verify: true,
        },
    )
    .unwrap();
    // Setup the real subscriber...
    let subscriber = Registry::default().with(Layer::with_connection(conn));
    // and install it.
    let _guard = tracing::subscriber::set_default(subscriber);

    trace!("你好, TLS input.");
    debug!("你好, TLS input.");
    info!("你好, TLS input.");
    warn!("你好, TLS input.");
    error!("你好, TLS input.");
}
