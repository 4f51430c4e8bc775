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

//! Primitives for mapping [`tracing`] entities to GELF messages.
//!
//! [`TracingFormatter`] implementations decide whether a [`tracing`] [`Event`] or [`Span`]
//! transition yields a GELF [`Message`], and if so build it. This module provides a single
//! implementation: [`DefaultTracingFormatter`], which takes an [`Event`]'s `message` field as
//! the GELF `short_message` & carries every other event field as an underscore-prefixed
//! extra.
//!
//! [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html
//! [`Span`]: https://docs.rs/tracing/0.1.35/tracing/struct.Span.html

use crate::error::Error;
use crate::gelf::{Host, Message};
use crate::level::Level;

use backtrace::Backtrace;
use chrono::prelude::*;

#[cfg(feature = "tracing-log")]
use tracing_log::NormalizeEvent;

use std::collections::BTreeMap;

type StdResult<T, E> = std::result::Result<T, E>;

/// Map [`tracing`] [`Span`]s & [`Event`]s to GELF [`Message`]s.
///
/// [`tracing`]: https://docs.rs/tracing/latest/tracing/index.html
/// [`Span`]: https://docs.rs/tracing/0.1.35/tracing/struct.Span.html
/// [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html
///
/// The translation from [`tracing`] events to bytes on the wire occurs in three parts:
///
/// 1. deciding whether an event yields a GELF message & building it (this trait)
///
/// 2. encoding that message to a GELF frame ([`Gelf`](crate::gelf::Gelf))
///
/// 3. writing that frame to the collector ([`Connection`](crate::transport::Connection))
///
/// Implementations shall provide methods that will be invoked upon [`tracing`] events
/// ("span entered", "span exited", "event"); each method indicates, by returning `Some`,
/// that the occurrence shall produce a GELF message, and what that message shall be.
pub trait TracingFormatter<S>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    type Error: std::error::Error + 'static;
    /// An event has occurred
    fn on_event(
        &self,
        event: &tracing::Event,
        ctx: tracing_subscriber::layer::Context<'_, S>,
    ) -> StdResult<Option<Message>, Self::Error>;
    /// A span with the given ID was entered
    fn on_enter(
        &self,
        _id: &tracing_core::span::Id,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) -> StdResult<Option<Message>, Self::Error> {
        Ok(Option::None)
    }
    /// A span with the given ID was exited
    fn on_exit(
        &self,
        _id: &tracing_core::span::Id,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) -> StdResult<Option<Message>, Self::Error> {
        Ok(Option::None)
    }
}

fn default_level_mapping(level: &tracing::Level) -> Level {
    match level {
        &tracing::Level::TRACE | &tracing::Level::DEBUG => Level::Debug,
        &tracing::Level::INFO => Level::Informational,
        &tracing::Level::WARN => Level::Warning,
        &tracing::Level::ERROR => Level::Error,
    }
}

/// A [`TracingFormatter`] that builds one GELF [`Message`] per [`Event`]: the event's
/// `message` field becomes the `short_message` (its absence is an error), every other event
/// field becomes an extra. It doesn't respond to span transitions.
///
/// [`Event`]: https://docs.rs/tracing/0.1.35/tracing/struct.Event.html
///
/// Optionally, event metadata can be carried as extras, too: the target (`_target`), the
/// source location (`_file`/`_line`), the module path (`_module`), and the `::`-joined span
/// scope (`_span`). All are off by default.
pub struct DefaultTracingFormatter {
    host: Host,
    map_level: Box<dyn Fn(&tracing::Level) -> Level + Send + Sync>,
    extra: BTreeMap<String, String>,
    include_target: bool,
    include_source_location: bool,
    include_module: bool,
    include_span_scope: bool,
}

impl std::default::Default for DefaultTracingFormatter {
    fn default() -> Self {
        DefaultTracingFormatter {
            host: Host::default(),
            map_level: Box::new(default_level_mapping),
            extra: BTreeMap::new(),
            include_target: false,
            include_source_location: false,
            include_module: false,
            include_span_scope: false,
        }
    }
}

impl DefaultTracingFormatter {
    pub fn host(mut self, host: Host) -> Self {
        self.host = host;
        self
    }
    pub fn map_level<F: Fn(&tracing::Level) -> Level + Send + Sync + 'static>(
        mut self,
        map_level: F,
    ) -> Self {
        self.map_level = Box::new(map_level);
        self
    }
    /// Add one extra field that will be attached to every message.
    pub fn extra<K: Into<String>, V: Into<String>>(mut self, key: K, value: V) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
    pub fn with_target(mut self, include_target: bool) -> Self {
        self.include_target = include_target;
        self
    }
    pub fn with_source_location(mut self, include_source_location: bool) -> Self {
        self.include_source_location = include_source_location;
        self
    }
    pub fn with_module(mut self, include_module: bool) -> Self {
        self.include_module = include_module;
        self
    }
    pub fn with_span_scope(mut self, include_span_scope: bool) -> Self {
        self.include_span_scope = include_span_scope;
        self
    }
}

#[derive(Default)]
struct GelfEventVisitor {
    message: Option<String>,
    extra: BTreeMap<String, String>,
}

impl tracing::field::Visit for GelfEventVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.extra.insert(field.name().to_string(), value.to_string());
        }
    }
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            // Regrettably, we have only a `Debug` implementation available to us; but the tracing
            // macros `info!()`, `event!()` & the like all take care to "pre-format" the `message`
            // field so that `value` actually refers to a `std::fmt::Arguments` instance, which will
            // print to a debug format without enclosing double-quotes.
            self.message = Some(format!("{:?}", value));
        } else {
            self.extra
                .insert(field.name().to_string(), format!("{:?}", value));
        }
    }
}

impl<S> TracingFormatter<S> for DefaultTracingFormatter
where
    S: tracing_core::subscriber::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
{
    type Error = Error;
    fn on_event(
        &self,
        event: &tracing::Event,
        ctx: tracing_subscriber::layer::Context<'_, S>,
    ) -> StdResult<Option<Message>, Error> {
        // When the tracing-log feature is enabled, use normalized_metadata() to get
        // file/line info for events that originated from the `log` crate.
        // For native tracing events, normalized_metadata() returns None and we use
        // the event's own metadata.
        // See: https://github.com/tokio-rs/tracing/blob/9978c3663bcd58de14b3cf089ad24cb63d00a922/tracing-subscriber/src/fmt/format/pretty.rs#L182
        #[cfg(feature = "tracing-log")]
        let normalized_meta = event.normalized_metadata();
        #[cfg(feature = "tracing-log")]
        let meta = normalized_meta.as_ref().unwrap_or_else(|| event.metadata());
        #[cfg(not(feature = "tracing-log"))]
        let meta = event.metadata();

        let mut visitor = GelfEventVisitor::default();
        event.record(&mut visitor);
        let short_message = visitor.message.ok_or(Error::NoMessageField {
            name: event.metadata().name(),
            back: Backtrace::new(),
        })?;

        let mut message = Message::new(self.host.clone(), short_message)
            .timestamp_from(Utc::now())
            .level((*self.map_level)(meta.level()));
        for (key, value) in &self.extra {
            message = message.extra(key.clone(), value.clone());
        }
        for (key, value) in visitor.extra {
            message = message.extra(key, value);
        }
        if self.include_target {
            message = message.extra("target", meta.target());
        }
        if self.include_source_location {
            if let Some(file) = meta.file() {
                message = message.extra("file", file);
            }
            if let Some(line) = meta.line() {
                message = message.extra("line", line.to_string());
            }
        }
        if self.include_module {
            if let Some(module) = meta.module_path() {
                message = message.extra("module", module);
            }
        }
        if self.include_span_scope {
            if let Some(scope) = ctx.event_scope(event) {
                let path = scope
                    .from_root()
                    .map(|span| span.name())
                    .collect::<Vec<_>>()
                    .join("::");
                if !path.is_empty() {
                    message = message.extra("span", path);
                }
            }
        }
        Ok(Some(message))
    }
}
