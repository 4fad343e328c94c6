//! Notifications derived from a confirmed booking.

use chrono::{Duration, NaiveDateTime};

use crate::store::{ConfirmedBooking, NotificationKind, NotificationRecord};

/// Minutes before departure the reminder is due.
pub const REMINDER_LEAD_MINUTES: i64 = 10;

/// The greeting, reminder and departure notifications for a booking.
///
/// The greeting is due at `now`. The other two are due relative to
/// `departure`, the projected departure date-time at the origin.
pub fn derive_notifications(
    code: &str,
    booking: &ConfirmedBooking,
    departure: NaiveDateTime,
    now: NaiveDateTime,
) -> Vec<NotificationRecord> {
    let (from, to) = (&booking.from, &booking.to);
    let reminder_at = departure
        .checked_sub_signed(Duration::minutes(REMINDER_LEAD_MINUTES))
        .unwrap_or(departure);

    [
        (
            NotificationKind::Greeting,
            now,
            format!(
                "Your trip from \"{from}\" to \"{to}\" is all set! \
                 We'll notify you when bus is near your stops."
            ),
        ),
        (
            NotificationKind::Reminder,
            reminder_at,
            format!("Reminder: Your bus from {from} to {to} departs in 10 minutes."),
        ),
        (
            NotificationKind::Departure,
            departure,
            format!("Your bus from {from} to {to} has now departed. Safe travels!"),
        ),
    ]
    .into_iter()
    .map(|(kind, timestamp, message)| NotificationRecord {
        booking_id: code.to_string(),
        user_id: booking.user_id.clone(),
        kind,
        message,
        timestamp,
        delivered: false,
    })
    .collect()
}
