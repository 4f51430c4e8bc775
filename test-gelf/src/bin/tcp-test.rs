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

//! Test writing to a Graylog GELF TCP input on port 12201 on the local host.

use tracing::{debug, error, info, trace, warn};
use tracing_gelf::layer::Layer;
use tracing_subscriber::{
    layer::SubscriberExt, // Needed to get `with()`
    registry::Registry,
};

pub fn main() {
    // Setup the real subscriber...
    let subscriber = Registry::default().with(Layer::try_default().unwrap());
    // and install it.
    let _guard = tracing::subscriber::set_default(subscriber);

    trace!("你好, TCP input.");
    debug!("你好, TCP input.");
    info!("你好, TCP input.");
    warn!("你好, TCP input.");
    error!("你好, TCP input.");
}
