pub mod android_jni;
pub mod config;
pub mod error;
pub mod events;
pub mod format;
pub mod geo;
pub mod narration;
pub mod provider;
pub mod route;
pub mod session;
pub mod tracker;

pub use config::NavigationConfig;
pub use error::NavError;
pub use events::{EndReason, EventBus, NavEvent};
pub use geo::{haversine, Coordinate};
pub use route::{NavigationRoute, RouteStep};
pub use session::NavigationController;
pub use tracker::{LocationSample, ProgressTracker, TrackerState};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
