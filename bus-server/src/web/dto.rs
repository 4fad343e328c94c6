//! Data transfer objects for web requests and responses.

use serde::{Deserialize, Serialize};

use crate::booking::{BookingDraft, Field, SeatAvailability, Stage, TripSummary};
use crate::store::NotificationRecord;
use crate::timetable::{DisplaySegment, Preview, RouteCard};

/// Origin, destination and travel date as typed by the traveler.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub from: String,
    pub to: String,

    /// Travel date, YYYY-MM-DD
    pub date: String,
}

/// Query for one route's display segment.
#[derive(Debug, Deserialize)]
pub struct SegmentParams {
    #[serde(flatten)]
    pub search: SearchParams,

    /// "full" (default), "three_stop" or "direct"
    pub preview: Option<String>,
}

impl SegmentParams {
    /// The requested preview, if it names one.
    pub fn preview(&self) -> Option<Preview> {
        match self.preview.as_deref().map(str::trim) {
            None | Some("") | Some("full") => Some(Preview::Full),
            Some("three_stop") => Some(Preview::ThreeStop),
            Some("direct") => Some(Preview::Direct),
            Some(_) => None,
        }
    }
}

/// Query for a route's occupied seats.
#[derive(Debug, Deserialize)]
pub struct SeatsParams {
    pub date: String,
}

/// Routes offered for a search.
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub from: String,
    pub to: String,
    pub date: String,
    pub routes: Vec<RouteCard>,
}

/// One route's stops for a search.
#[derive(Debug, Serialize)]
pub struct SegmentResponse {
    pub fare: String,
    pub segment: DisplaySegment,
}

/// Occupied seats on a route-date.
#[derive(Debug, Serialize)]
pub struct SeatsResponse {
    pub date: String,
    #[serde(flatten)]
    pub availability: SeatAvailability,
}

/// Request to start a booking.
#[derive(Debug, Deserialize)]
pub struct TripRequest {
    pub route: String,
    pub from: String,
    pub to: String,
    pub date: String,
}

/// Request to choose seats.
#[derive(Debug, Deserialize)]
pub struct SeatsRequest {
    pub seats: Vec<String>,
}

/// A session's booking in progress.
#[derive(Debug, Serialize)]
pub struct DraftResponse {
    /// The stage the session is at
    pub stage: Stage,

    /// The draft, absent before a trip is chosen
    pub draft: Option<BookingDraft>,
}

impl DraftResponse {
    pub fn new(draft: Option<BookingDraft>) -> Self {
        let stage = draft.as_ref().map_or(Stage::Searching, BookingDraft::stage);
        Self { stage, draft }
    }
}

/// A confirmed trip.
#[derive(Debug, Serialize)]
pub struct ConfirmationResponse {
    #[serde(flatten)]
    pub summary: TripSummary,

    /// "From – To"
    pub journey: String,
}

impl From<TripSummary> for ConfirmationResponse {
    fn from(summary: TripSummary) -> Self {
        Self {
            journey: summary.journey(),
            summary,
        }
    }
}

/// Query for booking history.
#[derive(Debug, Deserialize)]
pub struct RecentParams {
    pub limit: Option<usize>,
}

/// Most recent bookings.
#[derive(Debug, Serialize)]
pub struct RecentResponse {
    pub bookings: Vec<ConfirmationResponse>,
}

/// A user's notifications.
#[derive(Debug, Serialize)]
pub struct NotificationsResponse {
    pub notifications: Vec<NotificationRecord>,
}

/// Error response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,

    /// The form field to highlight
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<Field>,

    /// The stage the client should return to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restart_at: Option<Stage>,
}
