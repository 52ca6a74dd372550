//! End-to-end slicing scenarios: assign, assemble, merge, expire.

use std::convert::Infallible;

use chrono::{NaiveDateTime, TimeZone};
use chrono_tz::Tz;
use laminar_slicing::expiration::ExpirationCalculator;
use laminar_slicing::merge::{MergeCallback, MergeGroup};
use laminar_slicing::slicing::{
    CumulativeSliceAssigner, HoppingSliceAssigner, SessionSliceAssigner, SliceAssigner,
    TumblingSliceAssigner,
};
use laminar_slicing::state::{CountAccumulator, SliceAccumulator, SliceStore, SumAccumulator};
use laminar_slicing::time::{ManualClock, ShiftTimeZone, TimeAttribute};
use laminar_slicing::WindowConfig;

const MINUTE: i64 = 60_000;
const HOUR: i64 = 60 * MINUTE;
const DAY: i64 = 24 * HOUR;

fn naive(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").unwrap()
}

/// Millis of `s` read as a UTC wall clock; this is how local millis look.
fn utc_millis(s: &str) -> i64 {
    naive(s).and_utc().timestamp_millis()
}

/// The instant at which the wall clock in `zone` shows `s`.
fn local_millis(s: &str, zone: Tz) -> i64 {
    zone.from_local_datetime(&naive(s))
        .earliest()
        .unwrap()
        .timestamp_millis()
}

fn clock() -> ManualClock {
    ManualClock::new(0)
}

#[test]
fn test_tumbling_ten_minutes_utc() {
    let assigner = TumblingSliceAssigner::from_millis(10 * MINUTE).unwrap();
    let slice_end = assigner.assign_slice_end(utc_millis("2024-05-01T12:07:00"), &clock());
    assert_eq!(slice_end, utc_millis("2024-05-01T12:10:00"));
    assert_eq!(assigner.window_start(slice_end), utc_millis("2024-05-01T12:00:00"));
}

#[test]
fn test_hopping_record_in_two_windows() {
    let assigner = HoppingSliceAssigner::from_millis(10 * MINUTE, 5 * MINUTE).unwrap();
    let slice_end = assigner.assign_slice_end(utc_millis("2024-05-01T12:07:00"), &clock());

    // nearest window [12:00, 12:10), last window [12:05, 12:15)
    assert_eq!(slice_end, utc_millis("2024-05-01T12:10:00"));
    assert_eq!(assigner.window_start(slice_end), utc_millis("2024-05-01T12:00:00"));
    let last = assigner.last_window_end(slice_end);
    assert_eq!(last, utc_millis("2024-05-01T12:15:00"));
    assert!(assigner.window_slices(last).any(|end| end == slice_end));

    let expired: Vec<_> = assigner.expired_slices(slice_end).collect();
    assert!(expired.contains(&utc_millis("2024-05-01T12:00:00")));
    assert!(!expired.contains(&utc_millis("2024-05-01T12:05:00")));
}

#[test]
fn test_session_two_open_sessions() {
    let assigner = SessionSliceAssigner::from_millis(5 * MINUTE).unwrap();
    let mut store: SliceStore<&str, CountAccumulator> = SliceStore::new();

    for arrival in ["12:00", "12:03", "12:12"] {
        let end = utc_millis(&format!("2024-05-01T{arrival}:00"));
        ingest_session(&assigner, &mut store, "user-1", end);
    }

    assert_eq!(
        store.tracked_slices(&"user-1").as_slice(),
        &[utc_millis("2024-05-01T12:03:00"), utc_millis("2024-05-01T12:12:00")]
    );
    let first = store.get(&"user-1", utc_millis("2024-05-01T12:03:00")).unwrap();
    assert_eq!(first.accumulator().result(), 2);
    assert_eq!(first.window().start, utc_millis("2024-05-01T11:55:00"));
}

/// Runs one session slice through merge and then adds a record to the result.
fn ingest_session(
    assigner: &SessionSliceAssigner,
    store: &mut SliceStore<&'static str, CountAccumulator>,
    key: &'static str,
    slice_end: i64,
) -> MergeGroup {
    let open: Vec<_> = store.open_windows(&key).collect();
    let mut seen = None;
    let mut merger = store.merger(key);
    assigner
        .merge_slices(slice_end, open, &mut |group: &MergeGroup| {
            seen = Some(group.clone());
            merger.merge(group)
        })
        .unwrap_or_else(|never: Infallible| match never {});
    let group = seen.unwrap();
    store
        .get_or_create(&key, group.result_slice_end(), group.window())
        .add(());
    group
}

#[test]
fn test_session_merge_protection_and_expiry() {
    let assigner = SessionSliceAssigner::from_millis(5 * MINUTE).unwrap();
    let calc = ExpirationCalculator::new(&assigner);
    let mut store: SliceStore<&str, CountAccumulator> = SliceStore::new();

    ingest_session(&assigner, &mut store, "k", 720 * MINUTE);
    let latest = ingest_session(&assigner, &mut store, "k", 723 * MINUTE);
    ingest_session(&assigner, &mut store, "k", 732 * MINUTE);

    // session 12:03 fires; its own id stays until a later window passes it
    let expired = calc.expired(723 * MINUTE, store.tracked_slices(&"k"), Some(&latest));
    assert!(expired.is_empty());

    let expired = calc.expired(732 * MINUTE, store.tracked_slices(&"k"), None);
    assert_eq!(expired.as_slice(), &[723 * MINUTE]);
    assert_eq!(store.remove_slices(&"k", expired), 1);
    assert_eq!(store.tracked_slices(&"k").as_slice(), &[732 * MINUTE]);
}

#[test]
fn test_hopping_pipeline_assemble_and_expire() {
    let assigner = HoppingSliceAssigner::from_millis(10 * MINUTE, 5 * MINUTE).unwrap();
    let calc = ExpirationCalculator::new(&assigner);
    let clock = clock();
    let mut store: SliceStore<u8, SumAccumulator> = SliceStore::new();

    for (minute, value) in [(721, 1), (724, 2), (727, 10), (733, 100)] {
        let end = assigner.assign_slice_end(minute * MINUTE, &clock);
        store.get_or_create(&0, end, assigner.window(end)).add(value);
    }

    // window [12:00, 12:10) = slices 12:05 and 12:10
    let window_end = 730 * MINUTE;
    let total = store.combine(&0, assigner.window_slices(window_end)).unwrap();
    assert_eq!(total.result(), 13);

    // window [12:05, 12:15) = slices 12:10 and 12:15
    let next = assigner.next_trigger_window(window_end).unwrap();
    assert_eq!(store.combine(&0, assigner.window_slices(next)).unwrap().result(), 110);

    let expired = calc.expired(next, store.tracked_slices(&0), None);
    assert_eq!(expired.as_slice(), &[725 * MINUTE]);
    store.remove_slices(&0, expired);
    assert_eq!(store.slice_count(&0), 2);
}

#[test]
fn test_cumulative_pipeline_over_one_cycle() {
    let assigner = CumulativeSliceAssigner::from_millis(DAY, HOUR).unwrap();
    let clock = clock();
    let mut store: SliceStore<u8, CountAccumulator> = SliceStore::new();

    for ts in [10 * MINUTE, 70 * MINUTE, 80 * MINUTE, 23 * HOUR, DAY + 1] {
        let end = assigner.assign_slice_end(ts, &clock);
        store.get_or_create(&0, end, assigner.window(end)).add(());
    }

    let mut window_end = HOUR;
    let mut counts = Vec::new();
    while let Some(next) = assigner.next_trigger_window(window_end) {
        counts.push(store.combine(&0, assigner.window_slices(window_end)).map_or(0, |a| a.result()));
        window_end = next;
    }
    counts.push(store.combine(&0, assigner.window_slices(window_end)).map_or(0, |a| a.result()));

    assert_eq!(window_end, DAY);
    assert_eq!(counts.len(), 24);
    assert_eq!(counts[0], 1);
    assert_eq!(counts[1], 3);
    assert_eq!(counts[23], 4);

    // day one is released when day two closes
    let expired: Vec<_> = assigner.expired_slices(2 * DAY).collect();
    assert_eq!(store.remove_slices(&0, expired), 3);
    assert_eq!(store.tracked_slices(&0).as_slice(), &[DAY + HOUR]);
}

#[test]
fn test_tumbling_daily_shanghai() {
    let zone: ShiftTimeZone = "Asia/Shanghai".parse().unwrap();
    let assigner = TumblingSliceAssigner::from_millis(DAY)
        .unwrap()
        .with_time_zone(zone);

    // midnight in Shanghai is 16:00 UTC the day before
    let ts = local_millis("1970-01-02T00:00:00", Tz::Asia__Shanghai);
    let slice_end = assigner.assign_slice_end(ts, &clock());
    assert_eq!(slice_end, utc_millis("1970-01-03T00:00:00"));
    assert_eq!(assigner.window_start(slice_end), utc_millis("1970-01-02T00:00:00"));
    assert_eq!(
        assigner.window_end_to_epoch_millis(slice_end),
        utc_millis("1970-01-02T16:00:00")
    );

    let before_midnight = local_millis("1970-01-01T23:59:59", Tz::Asia__Shanghai);
    assert_eq!(
        assigner.assign_slice_end(before_midnight, &clock()),
        utc_millis("1970-01-02T00:00:00")
    );
}

#[test]
fn test_cumulative_los_angeles_spring_forward() {
    let zone = ShiftTimeZone::from(Tz::America__Los_Angeles);
    let assigner = CumulativeSliceAssigner::from_millis(DAY, HOUR)
        .unwrap()
        .with_time_zone(zone);
    let clock = clock();

    let ts = local_millis("2021-03-14T05:30:00", Tz::America__Los_Angeles);
    let slice_end = assigner.assign_slice_end(ts, &clock);
    assert_eq!(slice_end, utc_millis("2021-03-14T06:00:00"));
    assert_eq!(assigner.window_start(slice_end), utc_millis("2021-03-14T00:00:00"));
    assert_eq!(
        assigner.window_end_to_epoch_millis(slice_end),
        local_millis("2021-03-14T06:00:00", Tz::America__Los_Angeles)
    );
    assert_eq!(
        assigner.window_end_to_epoch_millis(assigner.last_window_end(slice_end)),
        utc_millis("2021-03-15T07:00:00")
    );

    // 01:59 PST lands in the slice ending at the skipped 02:00, which closes at 03:00 PDT
    let ts = local_millis("2021-03-14T01:59:00", Tz::America__Los_Angeles);
    let slice_end = assigner.assign_slice_end(ts, &clock);
    assert_eq!(slice_end, utc_millis("2021-03-14T02:00:00"));
    assert_eq!(
        assigner.window_end_to_epoch_millis(slice_end),
        utc_millis("2021-03-14T10:00:00")
    );
}

#[test]
fn test_tumbling_los_angeles_fall_back() {
    let assigner = TumblingSliceAssigner::from_millis(HOUR)
        .unwrap()
        .with_time_zone(Tz::America__Los_Angeles.into());
    let clock = clock();

    // 01:30 happens twice; both instants fold into the same local slice
    let first = assigner.assign_slice_end(utc_millis("2021-11-07T08:30:00"), &clock);
    let second = assigner.assign_slice_end(utc_millis("2021-11-07T09:30:00"), &clock);
    assert_eq!(first, utc_millis("2021-11-07T02:00:00"));
    assert_eq!(second, first);
    assert_eq!(
        assigner.window_end_to_epoch_millis(first),
        utc_millis("2021-11-07T10:00:00")
    );

    // an ambiguous window end fires at the later instant
    assert_eq!(
        assigner.window_end_to_epoch_millis(utc_millis("2021-11-07T01:00:00")),
        utc_millis("2021-11-07T09:00:00")
    );
}

#[test]
fn test_tumbling_los_angeles_fall_back_fires_after_second_pass() {
    let assigner = TumblingSliceAssigner::from_millis(30 * MINUTE)
        .unwrap()
        .with_time_zone(Tz::America__Los_Angeles.into());
    let clock = clock();

    // 01:15 PDT and 01:15 PST share the slice ending at local 01:30
    let first_pass = utc_millis("2021-11-07T08:15:00");
    let second_pass = utc_millis("2021-11-07T09:15:00");
    let slice_end = assigner.assign_slice_end(second_pass, &clock);
    assert_eq!(slice_end, utc_millis("2021-11-07T01:30:00"));
    assert_eq!(assigner.assign_slice_end(first_pass, &clock), slice_end);

    let fire = assigner.window_end_to_epoch_millis(slice_end);
    assert_eq!(fire, utc_millis("2021-11-07T09:30:00"));
    assert!(fire > second_pass);
    assert!(fire > first_pass);

    // the plain inverse still maps the same local time to its first occurrence
    assert_eq!(
        assigner.shift_time_zone().to_epoch_millis(slice_end),
        utc_millis("2021-11-07T08:30:00")
    );
}

#[test]
fn test_processing_time_shifted_by_zone() {
    let assigner = WindowConfig::tumbling(HOUR)
        .with_time_zone("+08:00")
        .with_time_attribute(TimeAttribute::ProcessingTime)
        .build()
        .unwrap();
    let clock = ManualClock::new(utc_millis("2024-05-01T03:20:00"));

    let slice_end = assigner.assign_slice_end(0, &clock);
    assert_eq!(slice_end, utc_millis("2024-05-01T12:00:00"));
    assert_eq!(
        assigner.window_end_to_epoch_millis(slice_end),
        utc_millis("2024-05-01T04:00:00")
    );
}

#[test]
fn test_negative_timestamps_are_floored() {
    let assigner = HoppingSliceAssigner::from_millis(10, 5).unwrap();
    let clock = clock();
    assert_eq!(assigner.assign_slice_end(-1, &clock), 0);
    assert_eq!(assigner.assign_slice_end(-5, &clock), 0);
    assert_eq!(assigner.assign_slice_end(-6, &clock), -5);
}
