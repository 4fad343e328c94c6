//! End-to-end tests for the booking pipeline.

use super::*;
use crate::domain::{ClockTime, RouteId, SearchQuery, SeatId, Topology};
use crate::store::{
    BOOKINGS, CONFIRMED_BOOKINGS, Clock, Document, DocumentStore, FixedClock, FixedIdentity,
    MemoryStore, NOTIFICATIONS, NotificationKind, Query, SessionDraftStore, StoreError, UserId,
    inventory_key,
};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

fn travel_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, 1).unwrap()
}

fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, mo, d)
        .unwrap()
        .and_hms_opt(h, mi, 0)
        .unwrap()
}

fn booked_at() -> NaiveDateTime {
    at(2025, 6, 20, 10, 0)
}

fn route(id: &str) -> RouteId {
    RouteId::parse(id).unwrap()
}

fn seat(s: &str) -> SeatId {
    SeatId::parse(s).unwrap()
}

fn seats(labels: &[&str]) -> Vec<String> {
    labels.iter().map(|s| s.to_string()).collect()
}

fn query(from: &str, to: &str) -> SearchQuery {
    SearchQuery::parse(&Topology::builtin(), from, to, "2025-07-01").unwrap()
}

fn user() -> FixedIdentity {
    FixedIdentity(UserId::new("user-1"))
}

fn personal() -> PersonalForm {
    PersonalForm {
        name: "Nimal Perera".into(),
        mobile: "077 123 4567".into(),
        nic: "199012345678".into(),
        email: "nimal@example.com".into(),
        agreed: true,
    }
}

fn card() -> PaymentForm {
    PaymentForm {
        brand: Some("visa".into()),
        number: "4111 1111 1111 4242".into(),
        exp_month: "12".into(),
        exp_year: "27".into(),
        cvv: "123".into(),
    }
}

/// A clock that moves forward one minute each time it is read.
struct TickingClock {
    start: NaiveDateTime,
    ticks: AtomicI64,
}

impl Clock for TickingClock {
    fn now(&self) -> NaiveDateTime {
        let n = self.ticks.fetch_add(1, Ordering::SeqCst);
        self.start + Duration::minutes(n)
    }
}

/// Memory store with switchable failures.
#[derive(Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail_merge: AtomicBool,
    fail_create_in: Mutex<HashSet<String>>,
}

impl FlakyStore {
    fn fail_creates_in(&self, collection: &str) {
        self.fail_create_in.lock().unwrap().insert(collection.to_string());
    }

    fn recover_creates(&self) {
        self.fail_create_in.lock().unwrap().clear();
    }
}

impl DocumentStore for FlakyStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, StoreError> {
        self.inner.get(collection, key).await
    }

    async fn create(&self, collection: &str, data: Document) -> Result<String, StoreError> {
        if self.fail_create_in.lock().unwrap().contains(collection) {
            return Err(StoreError::Unavailable(format!("{collection} is down")));
        }
        self.inner.create(collection, data).await
    }

    async fn set(&self, collection: &str, key: &str, data: Document) -> Result<(), StoreError> {
        self.inner.set(collection, key, data).await
    }

    async fn update(&self, collection: &str, key: &str, fields: Document) -> Result<bool, StoreError> {
        self.inner.update(collection, key, fields).await
    }

    async fn merge_array_field(
        &self,
        collection: &str,
        key: &str,
        field: &str,
        values: Vec<Value>,
    ) -> Result<(), StoreError> {
        if self.fail_merge.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("merge refused".into()));
        }
        self.inner.merge_array_field(collection, key, field, values).await
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<(String, Document)>, StoreError> {
        self.inner.query(collection, query).await
    }
}

fn flow_on<S: DocumentStore>(store: Arc<S>, clock: Arc<dyn Clock>) -> BookingFlow<S, SessionDraftStore> {
    let closing = ClockTime::parse_hhmm("18:00").unwrap();
    BookingFlow::new(
        store,
        Arc::new(SessionDraftStore::default()),
        Arc::new(Topology::builtin()),
        clock,
        FlowSettings::new(closing),
    )
}

fn flow() -> (Arc<MemoryStore>, BookingFlow<MemoryStore, SessionDraftStore>) {
    let store = Arc::new(MemoryStore::new());
    let flow = flow_on(store.clone(), Arc::new(FixedClock(booked_at())));
    (store, flow)
}

/// Drive a session up to (but not including) commit.
async fn ready_to_commit<S: DocumentStore>(
    flow: &BookingFlow<S, SessionDraftStore>,
    session: &str,
    from: &str,
    to: &str,
    picked: &[&str],
) {
    flow.begin(session, &route("02"), &query(from, to)).await.unwrap();
    flow.submit_seats(session, &seats(picked)).await.unwrap();
    flow.submit_details(session, &personal()).await.unwrap();
    flow.submit_payment(session, &card()).await.unwrap();
}

async fn occupied<S: DocumentStore>(store: &S) -> HashSet<String> {
    let key = inventory_key(&route("02"), travel_date());
    store
        .get(BOOKINGS, &key)
        .await
        .unwrap()
        .map(|d| {
            d["seats"]
                .as_array()
                .unwrap()
                .iter()
                .map(|v| v.as_str().unwrap().to_string())
                .collect()
        })
        .unwrap_or_default()
}

#[tokio::test]
async fn end_to_end_booking() {
    let (store, flow) = flow();

    let cards = flow.search(&query("Jaffna", "Colombo")).await.unwrap();
    assert!(cards.iter().any(|c| c.route == route("02")));

    ready_to_commit(&flow, "s1", "Jaffna", "Colombo", &["A1"]).await;
    let draft = flow.draft("s1").await.unwrap().unwrap();
    assert_eq!(draft.stage(), Stage::Commit);
    assert_eq!(draft.payment.as_ref().unwrap().card_last4, "4242");

    let summary = flow.commit("s1", &user()).await.unwrap();
    assert_eq!(summary.departure_time.to_string(), "20:00");
    assert_eq!(summary.seats, [seat("A1")]);
    assert_eq!(summary.payment, "Visa card");
    assert_eq!(summary.journey(), "Jaffna – Colombo");
    assert_eq!(summary.travel_date, "2025-07-01");

    // Draft gone, confirmation still addressable.
    assert_eq!(flow.draft("s1").await.unwrap(), None);
    assert_eq!(flow.confirmation("s1").await.unwrap(), summary);

    let booking = flow.booking(&summary.code).await.unwrap();
    assert_eq!(booking.departure_time.to_string(), "20:00");
    assert_eq!(booking.user_id.as_deref(), Some("user-1"));
    assert_eq!(booking.timestamp, booked_at());

    assert_eq!(occupied(store.as_ref()).await, HashSet::from(["A1".to_string()]));

    let notes = flow
        .notifications_for(&UserId::new("user-1").unwrap())
        .await
        .unwrap();
    assert_eq!(notes.len(), 3);
    assert!(notes.iter().all(|n| !n.delivered && n.booking_id == summary.code));

    let mut due: Vec<_> = notes.iter().map(|n| (n.kind, n.timestamp)).collect();
    due.sort_by_key(|(_, t)| *t);
    assert_eq!(
        due,
        [
            (NotificationKind::Greeting, booked_at()),
            (NotificationKind::Reminder, at(2025, 7, 1, 19, 50)),
            (NotificationKind::Departure, at(2025, 7, 1, 20, 0)),
        ]
    );
}

#[tokio::test]
async fn concurrent_commits_converge_to_union() {
    let (store, flow) = flow();
    ready_to_commit(&flow, "s1", "Jaffna", "Colombo", &["A1", "A2"]).await;
    ready_to_commit(&flow, "s2", "Killinochchi", "Negombo", &["B1"]).await;

    let u = user();
    let (a, b) = tokio::join!(flow.commit("s1", &u), flow.commit("s2", &u));
    a.unwrap();
    b.unwrap();

    let expected: HashSet<String> = ["A1", "A2", "B1"].iter().map(|s| s.to_string()).collect();
    assert_eq!(occupied(store.as_ref()).await, expected);
}

#[tokio::test]
async fn payment_requires_seats_and_leaves_draft_alone() {
    let (_, flow) = flow();
    flow.begin("s1", &route("02"), &query("Jaffna", "Colombo")).await.unwrap();
    let before = flow.draft("s1").await.unwrap();

    let err = flow.submit_details("s1", &personal()).await.unwrap_err();
    assert_eq!(err.restart_at(), Some(Stage::SeatSelecting));

    let err = flow.submit_payment("s1", &card()).await.unwrap_err();
    assert_eq!(err.restart_at(), Some(Stage::SeatSelecting));

    assert_eq!(flow.draft("s1").await.unwrap(), before);
}

#[tokio::test]
async fn empty_seat_selection_rejected() {
    let (_, flow) = flow();
    flow.begin("s1", &route("02"), &query("Jaffna", "Colombo")).await.unwrap();

    let err = flow.submit_seats("s1", &[]).await.unwrap_err();
    match err {
        BookingError::Validation(v) => assert_eq!(v.field, Field::Seats),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(flow.draft("s1").await.unwrap().unwrap().stage(), Stage::SeatSelecting);
}

#[tokio::test]
async fn duplicate_seats_collapse() {
    let (_, flow) = flow();
    flow.begin("s1", &route("02"), &query("Jaffna", "Colombo")).await.unwrap();
    let draft = flow.submit_seats("s1", &seats(&["a1", "A1", "A2"])).await.unwrap();
    assert_eq!(draft.seats, [seat("A1"), seat("A2")]);
}

#[tokio::test]
async fn occupied_seat_rejected_at_selection() {
    let (_, flow) = flow();
    ready_to_commit(&flow, "s1", "Jaffna", "Colombo", &["A1"]).await;
    flow.commit("s1", &user()).await.unwrap();

    flow.begin("s2", &route("02"), &query("Jaffna", "Colombo")).await.unwrap();
    let err = flow.submit_seats("s2", &seats(&["A1", "A2"])).await.unwrap_err();
    match err {
        BookingError::SeatConflict { seats } => assert_eq!(seats, [seat("A1")]),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn selection_cannot_exceed_capacity() {
    let (_, flow) = flow();
    // Route 20 has 9 seats.
    flow.begin("s1", &route("20"), &query("Jaffna", "Negombo")).await.unwrap();
    let many: Vec<String> = (1..=10).map(|i| format!("A{i}")).collect();
    let err = flow.submit_seats("s1", &many).await.unwrap_err();
    assert!(matches!(err, BookingError::Validation(ValidationError { field: Field::Seats, .. })));
}

#[tokio::test]
async fn conflicting_commit_rejected_and_draft_kept() {
    let (store, flow) = flow();
    ready_to_commit(&flow, "s1", "Jaffna", "Colombo", &["A1"]).await;
    ready_to_commit(&flow, "s2", "Jaffna", "Negombo", &["A1"]).await;

    flow.commit("s1", &user()).await.unwrap();
    let err = flow.commit("s2", &user()).await.unwrap_err();
    assert!(matches!(err, BookingError::SeatConflict { .. }));
    assert_eq!(err.restart_at(), Some(Stage::SeatSelecting));

    assert_eq!(flow.draft("s2").await.unwrap().unwrap().stage(), Stage::Commit);
    assert_eq!(store.count(CONFIRMED_BOOKINGS).await, 1);
}

#[tokio::test]
async fn conflict_check_can_be_disabled() {
    let store = Arc::new(MemoryStore::new());
    let closing = ClockTime::parse_hhmm("18:00").unwrap();
    let flow = BookingFlow::new(
        store.clone(),
        Arc::new(SessionDraftStore::default()),
        Arc::new(Topology::builtin()),
        Arc::new(FixedClock(booked_at())),
        FlowSettings {
            reject_seat_conflicts: false,
            closing_time: closing,
        },
    );
    ready_to_commit(&flow, "s1", "Jaffna", "Colombo", &["A1"]).await;
    ready_to_commit(&flow, "s2", "Jaffna", "Colombo", &["A1"]).await;

    flow.commit("s1", &user()).await.unwrap();
    flow.commit("s2", &user()).await.unwrap();
    assert_eq!(store.count(CONFIRMED_BOOKINGS).await, 2);
    assert_eq!(occupied(store.as_ref()).await.len(), 1);
}

#[tokio::test]
async fn seat_merge_failure_aborts_commit() {
    let store = Arc::new(FlakyStore::default());
    let flow = flow_on(store.clone(), Arc::new(FixedClock(booked_at())));
    ready_to_commit(&flow, "s1", "Jaffna", "Colombo", &["A1"]).await;

    store.fail_merge.store(true, Ordering::SeqCst);
    let err = flow.commit("s1", &user()).await.unwrap_err();
    assert!(matches!(err, BookingError::Persistence(_)));
    assert_eq!(err.restart_at(), Some(Stage::SeatSelecting));
    assert_eq!(store.inner.count(CONFIRMED_BOOKINGS).await, 0);
    assert_eq!(flow.draft("s1").await.unwrap().unwrap().stage(), Stage::Commit);

    // User-initiated retry succeeds once the store recovers.
    store.fail_merge.store(false, Ordering::SeqCst);
    flow.commit("s1", &user()).await.unwrap();
    assert_eq!(store.inner.count(CONFIRMED_BOOKINGS).await, 1);
}

#[tokio::test]
async fn booking_write_failure_keeps_draft() {
    let store = Arc::new(FlakyStore::default());
    let flow = flow_on(store.clone(), Arc::new(FixedClock(booked_at())));
    ready_to_commit(&flow, "s1", "Jaffna", "Colombo", &["A1"]).await;

    store.fail_creates_in(CONFIRMED_BOOKINGS);
    let err = flow.commit("s1", &user()).await.unwrap_err();
    assert!(matches!(err, BookingError::Persistence(_)));
    assert!(flow.draft("s1").await.unwrap().is_some());
    assert!(flow.confirmation("s1").await.is_err());
}

#[tokio::test]
async fn retry_after_booking_write_failure_completes() {
    let store = Arc::new(FlakyStore::default());
    let flow = flow_on(store.clone(), Arc::new(FixedClock(booked_at())));
    ready_to_commit(&flow, "s1", "Jaffna", "Colombo", &["A1"]).await;

    store.fail_creates_in(CONFIRMED_BOOKINGS);
    flow.commit("s1", &user()).await.unwrap_err();
    assert_eq!(occupied(&store.inner).await.len(), 1);
    let kept = flow.draft("s1").await.unwrap().unwrap();
    assert_eq!(kept.merged_seats, [seat("A1")]);
    assert_eq!(kept.stage(), Stage::Commit);

    store.recover_creates();
    let summary = flow.commit("s1", &user()).await.unwrap();
    assert_eq!(summary.seats, [seat("A1")]);
    assert_eq!(store.inner.count(CONFIRMED_BOOKINGS).await, 1);
    assert_eq!(occupied(&store.inner).await.len(), 1);
}

#[tokio::test]
async fn reselection_after_partial_commit_keeps_own_seats() {
    let store = Arc::new(FlakyStore::default());
    let flow = flow_on(store.clone(), Arc::new(FixedClock(booked_at())));
    ready_to_commit(&flow, "s1", "Jaffna", "Colombo", &["A1"]).await;

    store.fail_creates_in(CONFIRMED_BOOKINGS);
    flow.commit("s1", &user()).await.unwrap_err();

    // Another session still sees A1 as taken.
    flow.begin("s2", &route("02"), &query("Jaffna", "Colombo")).await.unwrap();
    assert!(matches!(
        flow.submit_seats("s2", &seats(&["A1"])).await,
        Err(BookingError::SeatConflict { .. })
    ));

    // The owning session may pick it again alongside a new seat.
    let draft = flow.submit_seats("s1", &seats(&["A1", "A3"])).await.unwrap();
    assert_eq!(draft.seats, [seat("A1"), seat("A3")]);

    store.recover_creates();
    flow.submit_details("s1", &personal()).await.unwrap();
    flow.submit_payment("s1", &card()).await.unwrap();
    flow.commit("s1", &user()).await.unwrap();
    assert_eq!(occupied(&store.inner).await.len(), 2);
}

#[tokio::test]
async fn notification_failures_do_not_fail_commit() {
    let store = Arc::new(FlakyStore::default());
    let flow = flow_on(store.clone(), Arc::new(FixedClock(booked_at())));
    ready_to_commit(&flow, "s1", "Jaffna", "Colombo", &["A1"]).await;

    store.fail_creates_in(NOTIFICATIONS);
    let summary = flow.commit("s1", &user()).await.unwrap();
    assert_eq!(store.inner.count(NOTIFICATIONS).await, 0);
    assert_eq!(flow.draft("s1").await.unwrap(), None);
    assert!(flow.booking(&summary.code).await.is_ok());
}

#[tokio::test]
async fn second_commit_is_stale() {
    let (store, flow) = flow();
    ready_to_commit(&flow, "s1", "Jaffna", "Colombo", &["A1"]).await;
    flow.commit("s1", &user()).await.unwrap();

    let err = flow.commit("s1", &user()).await.unwrap_err();
    assert_eq!(err.restart_at(), Some(Stage::Searching));
    assert_eq!(store.count(CONFIRMED_BOOKINGS).await, 1);
}

#[tokio::test]
async fn reverse_trip_reminder_uses_rolled_over_date() {
    let (_, flow) = flow();
    ready_to_commit(&flow, "s1", "Colombo", "Killinochchi", &["C1"]).await;
    let summary = flow.commit("s1", &user()).await.unwrap();
    assert_eq!(summary.departure_time.to_string(), "04:00");

    let notes = flow
        .notifications_for(&UserId::new("user-1").unwrap())
        .await
        .unwrap();
    let reminder = notes
        .iter()
        .find(|n| n.kind == NotificationKind::Reminder)
        .unwrap();
    assert_eq!(reminder.timestamp, at(2025, 7, 2, 3, 50));
}

#[tokio::test]
async fn card_expiry_boundary_through_flow() {
    let store = Arc::new(MemoryStore::new());
    let flow = flow_on(store, Arc::new(FixedClock(at(2025, 7, 15, 9, 0))));
    flow.begin("s1", &route("02"), &query("Jaffna", "Colombo")).await.unwrap();
    flow.submit_seats("s1", &seats(&["A1"])).await.unwrap();
    flow.submit_details("s1", &personal()).await.unwrap();

    let expired = PaymentForm {
        exp_month: "06".into(),
        exp_year: "25".into(),
        ..card()
    };
    let err = flow.submit_payment("s1", &expired).await.unwrap_err();
    assert!(matches!(err, BookingError::Validation(ValidationError { field: Field::ExpiryMonth, .. })));
    assert_eq!(flow.draft("s1").await.unwrap().unwrap().stage(), Stage::Payment);

    let this_month = PaymentForm {
        exp_month: "07".into(),
        exp_year: "25".into(),
        ..card()
    };
    flow.submit_payment("s1", &this_month).await.unwrap();
}

#[tokio::test]
async fn search_reflects_occupied_seats() {
    let (_, flow) = flow();
    ready_to_commit(&flow, "s1", "Jaffna", "Colombo", &["A1", "A2"]).await;
    flow.commit("s1", &user()).await.unwrap();

    let cards = flow.search(&query("Jaffna", "Colombo")).await.unwrap();
    let card = cards.iter().find(|c| c.route == route("02")).unwrap();
    assert_eq!(card.seats_available, 38);
    assert_eq!(card.availability, "38 Seats available – Closing : 01 Jul, 18:00");

    let availability = flow.availability(&route("02"), travel_date()).await.unwrap();
    assert_eq!(availability.occupied, [seat("A1"), seat("A2")]);
    assert_eq!(availability.available, 38);
}

#[tokio::test]
async fn begin_rejects_route_not_serving_stops() {
    let (_, flow) = flow();
    let err = flow
        .begin("s1", &route("222"), &query("Jaffna", "Negombo"))
        .await
        .unwrap_err();
    assert!(matches!(err, BookingError::Lookup(_)));
    assert_eq!(flow.draft("s1").await.unwrap(), None);

    let err = flow
        .begin("s1", &route("99"), &query("Jaffna", "Negombo"))
        .await
        .unwrap_err();
    assert_eq!(err.restart_at(), Some(Stage::Searching));
}

#[tokio::test]
async fn recent_bookings_newest_first() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(TickingClock {
        start: booked_at(),
        ticks: AtomicI64::new(0),
    });
    let flow = flow_on(store, clock);

    let mut codes = Vec::new();
    for (i, session) in ["s1", "s2", "s3", "s4", "s5"].iter().enumerate() {
        let label = format!("D{}", i + 1);
        ready_to_commit(&flow, session, "Jaffna", "Colombo", &[label.as_str()]).await;
        codes.push(flow.commit(session, &user()).await.unwrap().code);
    }

    let recent = flow.recent_bookings(DEFAULT_RECENT_LIMIT).await.unwrap();
    let got: Vec<_> = recent.iter().map(|s| s.code.clone()).collect();
    let expected: Vec<_> = codes.iter().rev().take(4).cloned().collect();
    assert_eq!(got, expected);
}

#[tokio::test]
async fn unknown_confirmation_code() {
    let (_, flow) = flow();
    let err = flow.booking("nope").await.unwrap_err();
    assert!(matches!(err, BookingError::Lookup(LookupError::UnknownBooking(_))));
}
