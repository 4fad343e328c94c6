//! Route timelines: direction resolution and timetable projection.
//!
//! The resolver turns an unordered origin/destination pair into a
//! direction-corrected stop list; the projector pins each stop's time of
//! day onto a calendar date; segments combine both into what a page draws.

mod projector;
mod resolver;
mod segment;

pub use projector::{UNKNOWN_TIME, align, project_times};
pub use resolver::{Direction, Preview, ResolveError, ResolvedRoute};
pub use segment::{
    DisplaySegment, Marker, RouteCard, StopView, availability_text, seats_available,
};
