//! Line commands read by the headless binary
//!
//! `52.37,4.89` publishes a position sample; the words below drive the
//! context by hand.

use liefclock_domain::{Position, Visibility};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// `lat,lng`
    Position(Position),
    /// `in [note]`
    ClockIn(Option<String>),
    /// `out [note]`
    ClockOut(Option<String>),
    /// `sync`
    Sync,
    /// `status`
    Status,
    /// `shifts`
    Shifts,
    /// `hidden` / `visible`
    Visibility(Visibility),
}

impl Command {
    /// Parse one input line. Blank lines, comments and unknown input give `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };
        let note = (!rest.is_empty()).then(|| rest.to_string());

        match word.to_ascii_lowercase().as_str() {
            "in" => Some(Self::ClockIn(note)),
            "out" => Some(Self::ClockOut(note)),
            "sync" => Some(Self::Sync),
            "status" => Some(Self::Status),
            "shifts" => Some(Self::Shifts),
            "hidden" => Some(Self::Visibility(Visibility::Hidden)),
            "visible" => Some(Self::Visibility(Visibility::Visible)),
            _ => parse_position(line).map(Self::Position),
        }
    }
}

fn parse_position(line: &str) -> Option<Position> {
    let (lat, lng) = line.split_once(',')?;
    let lat: f64 = lat.trim().parse().ok()?;
    let lng: f64 = lng.trim().parse().ok()?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return None;
    }
    Some(Position::new(lat, lng))
}
