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

//! Test writing to a Graylog GELF UDP input on port 12201 on the local host.
//!
//! NB: GELF-over-UDP frames per datagram, so the layer is configured with no terminator.

use tracing::{debug, error, info, trace, warn};
use tracing_gelf::{
    gelf::{Gelf, Terminator},
    layer::Layer,
    transport::{Connection, Endpoint, Transport},
};
use tracing_subscriber::{
    layer::SubscriberExt, // Needed to get `with()`
    registry::Registry,
};

pub fn main() {
    let conn =
        Connection::connect(&Endpoint::new(Transport::Datagram, "localhost", 12201)).unwrap();
    let layer = Layer::with_connection(conn)
        .encoder(Gelf::builder().terminator(Terminator::None).build());
    // Setup the real subscriber...
    let subscriber = Registry::default().with(layer);
    // and install it.
    let _guard = tracing::subscriber::set_default(subscriber);

    trace!("你好, UDP input.");
    debug!("你好, UDP input.");
    info!("你好, UDP input.");
    warn!("你好, UDP input.");
    error!("你好, UDP input.");
}
