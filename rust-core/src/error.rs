use std::fmt;

/// Errors surfaced by the navigation core.
#[derive(Debug)]
pub enum NavError {
    /// The routing provider returned no route.
    RouteUnavailable,
    /// A step lacks its maneuver coordinate or instruction.
    MalformedStep { index: usize },
    /// The location source could not be started.
    GeolocationUnavailable(String),
    /// A route was requested before any location sample arrived.
    NoLocationFix,
    /// A preview was requested while a session is running.
    SessionActive,
    /// A preview was requested while a start request is still in flight.
    StartPending,
    /// A route response arrived for a cancelled or superseded request.
    UnknownRequest,
    Provider(String),
    Gpx(String),
    Config(String),
    Json(serde_json::Error),
}

impl fmt::Display for NavError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NavError::RouteUnavailable => write!(f, "could not calculate route"),
            NavError::MalformedStep { index } => write!(f, "route step {index} is malformed"),
            NavError::GeolocationUnavailable(reason) => write!(f, "geolocation unavailable: {reason}"),
            NavError::NoLocationFix => write!(f, "no location fix yet"),
            NavError::SessionActive => write!(f, "a navigation session is active"),
            NavError::StartPending => write!(f, "a navigation start is already pending"),
            NavError::UnknownRequest => write!(f, "route request was cancelled or superseded"),
            NavError::Provider(msg) => write!(f, "routing provider error: {msg}"),
            NavError::Gpx(msg) => write!(f, "GPX error: {msg}"),
            NavError::Config(msg) => write!(f, "config error: {msg}"),
            NavError::Json(e) => write!(f, "JSON error: {e}"),
        }
    }
}

impl std::error::Error for NavError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NavError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for NavError {
    fn from(err: serde_json::Error) -> Self {
        NavError::Json(err)
    }
}
