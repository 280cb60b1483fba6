//! JNI bindings for the Android app.
//!
//! Each public function here corresponds to an `external fun` declaration
//! in RustBridge.kt. The function names follow JNI naming conventions:
//! Java_<package>_<class>_<method> with dots replaced by underscores.
//!
//! A navigation session lives behind an opaque `jlong` handle returned by
//! `create` and released by `destroy`. The app performs HTTP itself and
//! passes Directions JSON to `completeRoute`. Calls that change state
//! return the events they produced as a JSON array.

use std::sync::Mutex;

use crossbeam_channel::Receiver;

use jni::JNIEnv;
use jni::objects::{JClass, JString};
use jni::sys::{jboolean, jdouble, jint, jlong, jstring};
use log::LevelFilter;

use crate::config::NavigationConfig;
use crate::events::NavEvent;
use crate::geo::Coordinate;
use crate::provider::mapbox::parse_directions;
use crate::session::{NavigationController, RequestKind, RequestTicket};
use crate::tracker::LocationSample;

struct BridgeSession {
    controller: NavigationController,
    events: Receiver<NavEvent>,
}

impl BridgeSession {
    fn new(config: NavigationConfig) -> Self {
        let mut controller = NavigationController::new(config);
        let events = controller.subscribe();
        Self { controller, events }
    }

    fn drain_json(&self) -> String {
        let events: Vec<NavEvent> = self.events.try_iter().collect();
        serde_json::to_string(&events).unwrap_or_else(|e| {
            log::error!("failed to serialize events: {e}");
            "[]".to_string()
        })
    }
}

type Handle = Mutex<BridgeSession>;

fn with_session<R>(handle: jlong, fallback: R, f: impl FnOnce(&mut BridgeSession) -> R) -> R {
    if handle == 0 {
        log::error!("navigation handle is null");
        return fallback;
    }
    // SAFETY: non-zero handles come from `create` and stay valid until `destroy`.
    let session = unsafe { &*(handle as *const Handle) };
    let mut guard = session.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    f(&mut guard)
}

fn to_jstring(env: &JNIEnv, value: &str) -> jstring {
    match env.new_string(value) {
        Ok(s) => s.into_raw(),
        Err(e) => {
            log::error!("failed to create Java string: {e}");
            std::ptr::null_mut()
        }
    }
}

fn read_string(env: &mut JNIEnv, value: &JString) -> Option<String> {
    match env.get_string(value) {
        Ok(s) => Some(s.into()),
        Err(e) => {
            log::error!("failed to read Java string: {e}");
            None
        }
    }
}

fn level_filter(level: jint) -> LevelFilter {
    match level {
        i32::MIN..=0 => LevelFilter::Off,
        1 => LevelFilter::Error,
        2 => LevelFilter::Warn,
        3 => LevelFilter::Info,
        4 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Returns the rust-core library version.
/// Maps to: RustBridge.version() -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_drivepal_app_RustBridge_version(
    env: JNIEnv,
    _class: JClass,
) -> jstring {
    to_jstring(&env, crate::VERSION)
}

/// Installs the Android logger. Level: 0 off, 1 error .. 5 trace.
/// Maps to: RustBridge.init(logLevel: Int)
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_drivepal_app_RustBridge_init(
    _env: JNIEnv,
    _class: JClass,
    log_level: jint,
) {
    android_logger::init_once(
        android_logger::Config::default()
            .with_tag("drivepal")
            .with_max_level(level_filter(log_level)),
    );
}

/// Maps to: RustBridge.create(configJson: String) -> Long
/// Returns 0 when the config cannot be parsed.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_drivepal_app_RustBridge_create(
    mut env: JNIEnv,
    _class: JClass,
    config_json: JString,
) -> jlong {
    let Some(json) = read_string(&mut env, &config_json) else {
        return 0;
    };
    let config = if json.trim().is_empty() {
        NavigationConfig::default()
    } else {
        match NavigationConfig::from_json(&json) {
            Ok(config) => config,
            Err(e) => {
                log::error!("invalid navigation config: {e}");
                return 0;
            }
        }
    };
    Box::into_raw(Box::new(Mutex::new(BridgeSession::new(config)))) as jlong
}

/// Maps to: RustBridge.destroy(handle: Long)
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_drivepal_app_RustBridge_destroy(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    if handle != 0 {
        // SAFETY: the handle came from `create` and is not used again.
        drop(unsafe { Box::from_raw(handle as *mut Handle) });
    }
}

/// Speed is in m/s; pass a negative value when unknown.
/// Maps to: RustBridge.onLocation(handle, lat, lng, speed) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_drivepal_app_RustBridge_onLocation(
    env: JNIEnv,
    _class: JClass,
    handle: jlong,
    lat: jdouble,
    lng: jdouble,
    speed: jdouble,
) -> jstring {
    let json = with_session(handle, "[]".to_string(), |session| {
        let speed = (speed >= 0.0).then_some(speed);
        session
            .controller
            .on_location(LocationSample::new(Coordinate::new(lat, lng), speed));
        session.drain_json()
    });
    to_jstring(&env, &json)
}

/// Maps to: RustBridge.onLocationUnavailable(handle, reason) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_drivepal_app_RustBridge_onLocationUnavailable(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    reason: JString,
) -> jstring {
    let reason = read_string(&mut env, &reason).unwrap_or_default();
    let json = with_session(handle, "[]".to_string(), |session| {
        session.controller.on_location_unavailable(&reason);
        session.drain_json()
    });
    to_jstring(&env, &json)
}

/// Registers a route request toward (lat, lng) and returns its ticket,
/// or -1 when no request can be made (no fix yet, or a preview while
/// navigating or while a start is pending).
/// Maps to: RustBridge.requestRoute(handle, lat, lng, preview) -> Long
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_drivepal_app_RustBridge_requestRoute(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
    lat: jdouble,
    lng: jdouble,
    preview: jboolean,
) -> jlong {
    let kind = if preview != 0 { RequestKind::Preview } else { RequestKind::Start };
    with_session(handle, -1, |session| {
        match session.controller.begin_request(kind, Coordinate::new(lat, lng)) {
            Ok(request) => request.ticket.as_raw() as jlong,
            Err(e) => {
                log::warn!("route request rejected: {e}");
                -1
            }
        }
    })
}

/// Applies a Directions response (or an empty string on fetch failure).
/// Maps to: RustBridge.completeRoute(handle, ticket, directionsJson) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_drivepal_app_RustBridge_completeRoute(
    mut env: JNIEnv,
    _class: JClass,
    handle: jlong,
    ticket: jlong,
    directions_json: JString,
) -> jstring {
    let body = read_string(&mut env, &directions_json).unwrap_or_default();
    let route = if body.trim().is_empty() {
        None
    } else {
        parse_directions(&body)
            .map_err(|e| log::warn!("unusable directions response: {e}"))
            .ok()
    };

    let json = with_session(handle, "[]".to_string(), |session| {
        let ticket = RequestTicket::from_raw(ticket as u64);
        if let Err(e) = session.controller.complete_request(ticket, route) {
            log::warn!("route request {} not applied: {e}", ticket.as_raw());
        }
        session.drain_json()
    });
    to_jstring(&env, &json)
}

/// Maps to: RustBridge.endNavigation(handle) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_drivepal_app_RustBridge_endNavigation(
    env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jstring {
    let json = with_session(handle, "[]".to_string(), |session| {
        session.controller.end_navigation();
        session.drain_json()
    });
    to_jstring(&env, &json)
}

/// Maps to: RustBridge.snapshot(handle) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_drivepal_app_RustBridge_snapshot(
    env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jstring {
    let json = with_session(handle, "null".to_string(), |session| {
        serde_json::to_string(&session.controller.snapshot()).unwrap_or_else(|e| {
            log::error!("failed to serialize snapshot: {e}");
            "null".to_string()
        })
    });
    to_jstring(&env, &json)
}

/// Current preview route as JSON, or "null".
/// Maps to: RustBridge.previewRoute(handle) -> String
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_drivepal_app_RustBridge_previewRoute(
    env: JNIEnv,
    _class: JClass,
    handle: jlong,
) -> jstring {
    let json = with_session(handle, "null".to_string(), |session| {
        serde_json::to_string(&session.controller.preview()).unwrap_or_else(|e| {
            log::error!("failed to serialize preview: {e}");
            "null".to_string()
        })
    });
    to_jstring(&env, &json)
}

/// Maps to: RustBridge.clearPreview(handle)
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_drivepal_app_RustBridge_clearPreview(
    _env: JNIEnv,
    _class: JClass,
    handle: jlong,
) {
    with_session(handle, (), |session| session.controller.clear_preview());
}
