//! Macro for implementing Display and FromStr for wire-level enums
//!
//! Stored and transmitted enums (action kinds, action sources, sync states)
//! share one string representation for SQLite columns, log fields and
//! listener payloads. Parsing is case-insensitive so rows written by older
//! clients in a different case still load.
//!
//! # Example
//!
//! ```rust
//! use liefclock_domain::impl_domain_status_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Direction {
//!     Inbound,
//!     Outbound,
//! }
//!
//! impl_domain_status_conversions!(Direction {
//!     Inbound => "INBOUND",
//!     Outbound => "OUTBOUND",
//! });
//!
//! assert_eq!(Direction::Inbound.to_string(), "INBOUND");
//! assert_eq!("outbound".parse::<Direction>().unwrap(), Direction::Outbound);
//! ```

/// Implements Display and FromStr traits for status enums
///
/// - Display writes the canonical string exactly as given
/// - FromStr accepts any casing of the canonical string
#[macro_export]
macro_rules! impl_domain_status_conversions {
    ($enum_name:ident { $($variant:ident => $str:expr),+ $(,)? }) => {
        impl $enum_name {
            /// Canonical string form.
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $str,)+
                }
            }
        }

        impl ::std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $enum_name {
            type Err = String;

            fn from_str(s: &str) -> ::std::result::Result<Self, Self::Err> {
                let trimmed = s.trim();
                $(
                    if trimmed.eq_ignore_ascii_case($str) {
                        return Ok(Self::$variant);
                    }
                )+
                Err(format!("Invalid {}: {}", stringify!($enum_name), s))
            }
        }
    };
}
