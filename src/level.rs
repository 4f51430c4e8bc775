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

//! GELF severity level definitions.
//!
//! GELF inherits its `level` field from the syslog severity numbering (RFC [5424], table 2):
//! eight levels, 0 (most severe) through 7 (least). Unlike syslog, GELF carries no facility,
//! so this module models the level alone.
//!
//! [5424]: https://datatracker.ietf.org/doc/html/rfc5424

type StdResult<T, E> = std::result::Result<T, E>;

/// The eight GELF severity levels, numbered as per the `syslog()` manual [page] & defined in
/// `<syslog.h>`. The enumeration values are the wire values: a GELF message's `level` field
/// is the variant cast to an unsigned integer.
///
/// [page]: https://man7.org/linux/man-pages/man3/syslog.3.html
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Level {
    /// system is unusable
    Emergency = 0,
    /// action must be taken immediately
    Alert = 1,
    /// critical conditions
    Critical = 2,
    /// error conditions
    Error = 3,
    /// warning conditions
    Warning = 4,
    /// normal, but significant condition
    Notice = 5,
    /// informational message
    Informational = 6,
    /// debug-level message
    Debug = 7,
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> StdResult<(), std::fmt::Error> {
        write!(
            f,
            "{}",
            match self {
                Level::Emergency => "Emergency",
                Level::Alert => "Alert",
                Level::Critical => "Critical",
                Level::Error => "Error",
                Level::Warning => "Warning",
                Level::Notice => "Notice",
                Level::Informational => "Informational",
                Level::Debug => "Debug",
            }
        )
    }
}

#[cfg(test)]
mod level_tests {
    use super::*;
    /// Test the wire values & formatting
    #[test]
    fn test_wire_values() {
        assert_eq!(0, Level::Emergency as u8);
        assert_eq!(6, Level::Informational as u8);
        assert_eq!(7, Level::Debug as u8);
        assert_eq!(format!("{}", Level::Warning), "Warning".to_string());
        assert_eq!(format!("{:?}", Level::Warning), "Warning".to_string());
    }
}
