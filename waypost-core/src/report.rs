//! Position Report Payload and Delivery Seam
//!
//! The only wire artifact the core produces: a two-field JSON object
//! `{"lat": <deg>, "lng": <deg>}` handed to a [`Sink`]. Transport —
//! HTTP, MQTT, a serial console — lives behind the trait and is out of
//! scope here.

use serde::Serialize;

use crate::errors::DeliveryError;
use crate::gnss::PositionFix;

/// Two-field position payload, serialized as `{"lat": .., "lng": ..}`.
#[derive(Serialize, Debug, Clone, Copy, PartialEq)]
pub struct PositionReport {
    /// Latitude, degrees.
    pub lat: f64,
    /// Longitude, degrees.
    pub lng: f64,
}

impl PositionReport {
    /// Build a report from a fix. `None` for an invalid fix: coordinates
    /// without a resolved fix mode are stale receiver state, never
    /// reported.
    pub fn from_fix(fix: &PositionFix) -> Option<Self> {
        fix.valid.then(|| Self {
            lat: fix.latitude,
            lng: fix.longitude,
        })
    }

    /// Serialize to the wire JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Delivery endpoint for position reports.
pub trait Sink {
    /// Hand one report to the transport.
    fn deliver(&mut self, report: &PositionReport) -> Result<(), DeliveryError>;
}
