// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Device location resolution and proximity ordering.
//!
//! Proximity ordering degrades through a three-tier fallback chain, each tier
//! attempted only when the prior one is unavailable:
//!
//! 1. A live positioning sensor, given a short grace period to answer.
//! 2. IP-based geolocation, yielding an approximate coordinate and country.
//! 3. The OS-configured locale's country code — a coarse, country-match-only
//!    ordering rather than a true distance sort. This is an intentionally
//!    degraded mode, not an error.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use crate::transport::{content_types, Transport};
use crate::types::{GeoPoint, Institution};

/// A live positioning sensor (GPS or platform location service).
///
/// Returning `None` means the sensor has no fix; the resolver then falls
/// through to the next tier.
#[async_trait]
pub trait LocationSensor: Send + Sync {
    /// Current position, if the sensor has one.
    async fn current_position(&self) -> Option<GeoPoint>;
}

/// Where the resolver believes the device is.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceLocation {
    /// A usable coordinate, from the sensor or IP geolocation.
    Coordinates {
        /// The coordinate.
        point: GeoPoint,
        /// Country code, when IP geolocation supplied one.
        country: Option<String>,
    },
    /// Only a country code is known. Ordering degrades to a boolean
    /// country match.
    CountryOnly(String),
    /// Nothing is known; ordering degrades to alphabetical.
    Unknown,
}

/// Shape of the IP-geolocation response body.
#[derive(Debug, Deserialize)]
struct GeoIpResponse {
    lat: Option<f64>,
    lon: Option<f64>,
    country: Option<String>,
}

/// Resolves the device location through the fallback chain and orders
/// institutions by proximity to it.
pub struct ProximityResolver {
    sensor: Option<Arc<dyn LocationSensor>>,
    transport: Arc<dyn Transport>,
    geolocation_url: Option<Url>,
    locale_country: Option<String>,
    sensor_grace: Duration,
}

impl ProximityResolver {
    /// Create a resolver. Any tier may be absent; the chain skips it.
    pub fn new(
        sensor: Option<Arc<dyn LocationSensor>>,
        transport: Arc<dyn Transport>,
        geolocation_url: Option<Url>,
        locale_country: Option<String>,
    ) -> Self {
        Self {
            sensor,
            transport,
            geolocation_url,
            locale_country,
            sensor_grace: Duration::from_secs(3),
        }
    }

    /// Override the sensor grace period.
    pub fn with_sensor_grace(mut self, grace: Duration) -> Self {
        self.sensor_grace = grace;
        self
    }

    /// Resolve the device location, degrading through the tiers.
    ///
    /// Never fails: an unreachable geolocation service falls through to the
    /// locale tier, and an absent locale yields [`DeviceLocation::Unknown`].
    pub async fn locate(&self) -> DeviceLocation {
        if let Some(sensor) = &self.sensor {
            match tokio::time::timeout(self.sensor_grace, sensor.current_position()).await {
                Ok(Some(point)) => {
                    tracing::debug!(lat = point.lat, lon = point.lon, "Using sensor position");
                    return DeviceLocation::Coordinates {
                        point,
                        country: None,
                    };
                }
                Ok(None) => tracing::debug!("Sensor has no fix"),
                Err(_) => tracing::debug!("Sensor did not answer within grace period"),
            }
        }

        if let Some(url) = &self.geolocation_url {
            match self
                .transport
                .fetch(url, &[content_types::JSON], None)
                .await
                .and_then(|body| {
                    serde_json::from_slice::<GeoIpResponse>(&body).map_err(|e| {
                        crate::error::OnboardError::malformed(format!("Geolocation body: {}", e))
                    })
                }) {
                Ok(geo) => {
                    if let (Some(lat), Some(lon)) = (geo.lat, geo.lon) {
                        tracing::debug!(lat, lon, "Using IP geolocation position");
                        return DeviceLocation::Coordinates {
                            point: GeoPoint { lat, lon },
                            country: geo.country,
                        };
                    }
                    if let Some(country) = geo.country {
                        tracing::debug!(%country, "IP geolocation gave country only");
                        return DeviceLocation::CountryOnly(country);
                    }
                }
                Err(e) => tracing::debug!("IP geolocation unavailable: {}", e),
            }
        }

        match &self.locale_country {
            Some(country) => {
                tracing::debug!(%country, "Falling back to locale country");
                DeviceLocation::CountryOnly(country.clone())
            }
            None => DeviceLocation::Unknown,
        }
    }

    /// Order institutions by proximity to the given location.
    ///
    /// With coordinates: ascending great-circle distance to the nearest
    /// campus point (institutions without coordinates sort last), name as
    /// tie-break. With a country only: matching country first, then name.
    /// Unknown: alphabetical.
    pub fn order_institutions(
        institutions: &[Institution],
        location: &DeviceLocation,
    ) -> Vec<Institution> {
        let mut ordered: Vec<Institution> = institutions.to_vec();
        match location {
            DeviceLocation::Coordinates { point, .. } => {
                ordered.sort_by(|a, b| {
                    let da = nearest_distance_km(a, point);
                    let db = nearest_distance_km(b, point);
                    da.partial_cmp(&db)
                        .unwrap_or(std::cmp::Ordering::Equal)
                        .then_with(|| a.name.cmp(&b.name))
                });
            }
            DeviceLocation::CountryOnly(country) => {
                ordered.sort_by(|a, b| {
                    let ma = a.country.as_deref() == Some(country.as_str());
                    let mb = b.country.as_deref() == Some(country.as_str());
                    mb.cmp(&ma).then_with(|| a.name.cmp(&b.name))
                });
            }
            DeviceLocation::Unknown => {
                ordered.sort_by(|a, b| a.name.cmp(&b.name));
            }
        }
        ordered
    }
}

/// Distance from `point` to the institution's nearest campus coordinate.
fn nearest_distance_km(institution: &Institution, point: &GeoPoint) -> f64 {
    institution
        .geo
        .iter()
        .map(|g| haversine_km(g, point))
        .fold(f64::INFINITY, f64::min)
}

/// Great-circle distance between two coordinates, in kilometers.
pub fn haversine_km(a: &GeoPoint, b: &GeoPoint) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;

    let lat_a = a.lat.to_radians();
    let lat_b = b.lat.to_radians();
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}
