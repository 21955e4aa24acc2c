// OSRM-compatible HTTP routing service client

use crate::error::{DispatchError, Result};
use crate::models::{Coordinate, Seconds};
use crate::routing::{RoutingProvider, TripPlan, TripRequest};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct OsrmLeg {
    duration: f64,
}

#[derive(Debug, Deserialize)]
struct OsrmGeometry {
    coordinates: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct OsrmTrip {
    distance: f64,
    duration: f64,
    #[serde(default)]
    legs: Vec<OsrmLeg>,
    geometry: Option<OsrmGeometry>,
}

#[derive(Debug, Deserialize)]
struct OsrmTripWaypoint {
    waypoint_index: usize,
    trips_index: usize,
}

#[derive(Debug, Deserialize)]
struct OsrmTripResponse {
    code: String,
    message: Option<String>,
    #[serde(default)]
    trips: Vec<OsrmTrip>,
    #[serde(default)]
    waypoints: Vec<OsrmTripWaypoint>,
}

#[derive(Debug, Deserialize)]
struct OsrmRoute {
    duration: f64,
}

#[derive(Debug, Deserialize)]
struct OsrmRouteResponse {
    code: String,
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

/// Body shape shared by every OSRM error response
#[derive(Debug, Deserialize)]
struct OsrmError {
    code: String,
    message: Option<String>,
}

fn code_error(code: &str, message: Option<&str>) -> DispatchError {
    let detail = match message {
        Some(m) => format!("{}: {}", code, m),
        None => code.to_string(),
    };
    // InvalidUrl, InvalidQuery, InvalidValue, InvalidOptions
    if code.starts_with("Invalid") {
        DispatchError::InvalidInput(detail)
    } else {
        DispatchError::RoutingUnavailable(detail)
    }
}

/// Maps a non-success HTTP response to the error taxonomy
pub fn classify_failure(status: u16, body: &str) -> DispatchError {
    if status == 429 || status >= 500 {
        return DispatchError::RoutingUnavailable(format!("routing service returned {}", status));
    }
    match serde_json::from_str::<OsrmError>(body) {
        Ok(err) => code_error(&err.code, err.message.as_deref()),
        Err(_) if (400..500).contains(&status) => {
            DispatchError::InvalidInput(format!("routing service rejected request ({})", status))
        }
        Err(_) => DispatchError::RoutingUnavailable(format!("unexpected status {}", status)),
    }
}

fn coordinate_path(coordinates: &[Coordinate]) -> String {
    coordinates
        .iter()
        .map(|c| format!("{},{}", c.lon, c.lat))
        .collect::<Vec<_>>()
        .join(";")
}

/// `/route/v1/{profile}/{from};{to}?overview=false`
pub fn route_url(base_url: &str, profile: &str, from: Coordinate, to: Coordinate) -> String {
    format!(
        "{}/route/v1/{}/{}?overview=false",
        base_url,
        profile,
        coordinate_path(&[from, to])
    )
}

/// Trip URL with the depot first and its penalty fixed at zero.
///
/// Open trips ask for a path that may end at any stop instead of a loop.
pub fn trip_url(base_url: &str, profile: &str, request: &TripRequest) -> String {
    let shape = if request.round_trip {
        "roundtrip=true&source=first"
    } else {
        "roundtrip=false&source=first&destination=any"
    };
    let mut url = format!(
        "{}/trip/v1/{}/{}?{}&geometries=geojson&overview=full",
        base_url,
        profile,
        coordinate_path(&request.coordinates()),
        shape
    );
    if request.stops.iter().any(|s| s.penalty_secs > 0.0) {
        let durations: Vec<String> = std::iter::once("0".to_string())
            .chain(request.stops.iter().map(|s| format!("{:.0}", s.penalty_secs)))
            .collect();
        url.push_str("&durations=");
        url.push_str(&durations.join(";"));
    }
    url
}

pub fn parse_route_response(body: &str) -> Result<Seconds> {
    let response: OsrmRouteResponse = serde_json::from_str(body)
        .map_err(|e| DispatchError::RoutingUnavailable(format!("malformed route response: {}", e)))?;
    if response.code != "Ok" {
        return Err(code_error(&response.code, response.message.as_deref()));
    }
    response
        .routes
        .first()
        .map(|r| r.duration)
        .ok_or_else(|| DispatchError::RoutingUnavailable("route response has no routes".to_string()))
}

/// Turns a trip response into a plan over `request.stops`.
///
/// OSRM lists waypoints in input order, each tagged with its position in
/// the trip. A round trip is rotated so it starts at the depot; an open
/// trip must already start there and has one leg fewer.
pub fn parse_trip_response(body: &str, request: &TripRequest) -> Result<TripPlan> {
    let response: OsrmTripResponse = serde_json::from_str(body)
        .map_err(|e| DispatchError::RoutingUnavailable(format!("malformed trip response: {}", e)))?;
    if response.code != "Ok" {
        return Err(code_error(&response.code, response.message.as_deref()));
    }

    let expected = request.stops.len() + 1;
    if response.waypoints.len() != expected || response.trips.len() != 1 {
        return Err(DispatchError::RoutingUnavailable(format!(
            "partial trip: {} of {} waypoints in {} trip(s)",
            response.waypoints.len(),
            expected,
            response.trips.len()
        )));
    }
    if response.waypoints.iter().any(|w| w.trips_index != 0) {
        return Err(DispatchError::RoutingUnavailable(
            "trip split across disconnected components".to_string(),
        ));
    }

    let mut sequence: Vec<Option<usize>> = vec![None; expected];
    for (input_index, waypoint) in response.waypoints.iter().enumerate() {
        match sequence.get_mut(waypoint.waypoint_index) {
            Some(slot) if slot.is_none() => *slot = Some(input_index),
            _ => {
                return Err(DispatchError::RoutingUnavailable(format!(
                    "invalid waypoint_index {}",
                    waypoint.waypoint_index
                )))
            }
        }
    }
    let mut sequence: Vec<usize> = sequence.into_iter().flatten().collect();

    let trip = &response.trips[0];
    let mut legs: Vec<Seconds> = trip.legs.iter().map(|l| l.duration).collect();
    let expected_legs = if request.round_trip { expected } else { expected - 1 };
    if legs.len() != expected_legs {
        return Err(DispatchError::RoutingUnavailable(format!(
            "trip has {} legs, expected {}",
            legs.len(),
            expected_legs
        )));
    }

    let depot_at = sequence.iter().position(|&i| i == 0).unwrap_or(0);
    if request.round_trip {
        sequence.rotate_left(depot_at);
        legs.rotate_left(depot_at);
    } else if depot_at != 0 {
        return Err(DispatchError::RoutingUnavailable(format!(
            "open trip starts at waypoint {} instead of the depot",
            sequence[0]
        )));
    }

    Ok(TripPlan {
        order: sequence.iter().skip(1).map(|&i| i - 1).collect(),
        distance_m: trip.distance,
        duration_secs: trip.duration,
        legs,
        geometry: trip.geometry.as_ref().map(|g| g.coordinates.clone()),
    })
}

/// Client for an OSRM-compatible routing service
#[derive(Debug, Clone)]
pub struct OsrmProvider {
    client: Client,
    base_url: String,
    profile: String,
}

impl OsrmProvider {
    pub fn new(base_url: &str, profile: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/');
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(DispatchError::Config(format!("invalid osrm_url '{}'", base_url)));
        }
        if profile.is_empty() {
            return Err(DispatchError::Config("routing profile is empty".to_string()));
        }
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DispatchError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            profile: profile.to_string(),
        })
    }

    fn get(&self, url: &str) -> Result<String> {
        debug!(url, "routing_request");
        let response = self.client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                DispatchError::RoutingUnavailable(format!("routing service timed out: {}", e))
            } else {
                DispatchError::RoutingUnavailable(format!("routing service unreachable: {}", e))
            }
        })?;

        let status = response.status();
        let body = response
            .text()
            .map_err(|e| DispatchError::RoutingUnavailable(format!("failed to read response: {}", e)))?;
        if !status.is_success() {
            return Err(classify_failure(status.as_u16(), &body));
        }
        Ok(body)
    }
}

impl RoutingProvider for OsrmProvider {
    fn name(&self) -> &str {
        "osrm"
    }

    fn eta(&self, from: Coordinate, to: Coordinate) -> Result<Seconds> {
        from.validate()?;
        to.validate()?;
        let body = self.get(&route_url(&self.base_url, &self.profile, from, to))?;
        parse_route_response(&body)
    }

    fn trip(&self, request: &TripRequest) -> Result<TripPlan> {
        request.validate()?;
        let body = self.get(&trip_url(&self.base_url, &self.profile, request))?;
        parse_trip_response(&body, request)
    }
}
