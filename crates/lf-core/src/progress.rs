//! # Raffle State Machine
//!
//! Pure functions computing a raffle's `progress` and `announce_date_time`
//! from its schedule and live application count. Callers pass `now`
//! explicitly; nothing here reads an ambient clock.
//!
//! All date arithmetic happens in Korean local time. Raffles announce their
//! winner on a Saturday evening, synchronized with the weekly public lottery
//! draw.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, TimeZone, Utc, Weekday};
use once_cell::sync::Lazy;

use crate::models::Progress;

/// Asia/Seoul offset. KST has observed no DST since 1988, so a fixed +09:00
/// offset is exact and no tz database is needed.
pub static KST: Lazy<FixedOffset> =
    Lazy::new(|| FixedOffset::east_opt(9 * 3600).expect("+09:00 is a valid offset"));

/// Date of the first weekly lottery draw, sequence number 1.
pub fn first_draw_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2002, 12, 7).expect("2002-12-07 is a valid date")
}

/// Computes the lifecycle state of a raffle at `now`.
///
/// - before `start`: waiting
/// - between `start` and `end`: ongoing until the target is met, then done
/// - after `end`: failed
///
/// The admission path transitions a raffle to `done` eagerly the moment the
/// N-th application is accepted; this recompute is the consistency fallback
/// and must never be applied to a raffle already in a terminal state.
pub fn compute_progress(
    now: DateTime<Utc>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    target_quantity: u32,
    applied_count: u32,
) -> Progress {
    if now < start {
        Progress::Waiting
    } else if now <= end {
        if applied_count < target_quantity {
            Progress::Ongoing
        } else {
            Progress::Done
        }
    } else {
        Progress::Failed
    }
}

/// Computes the announce instant from the triggering instant — either the
/// raffle's `end_date_time` or the moment it transitioned to `done`.
///
/// Rule: find the Saturday of the trigger's KST week. Triggers strictly
/// before that Saturday 00:01 KST announce the same Saturday at 21:00 KST;
/// anything later announces the following Saturday at 21:00 KST.
pub fn compute_announce_date_time(trigger: DateTime<Utc>) -> DateTime<Utc> {
    let trigger_kst = trigger.with_timezone(&*KST);

    // num_days_from_monday: 0 = Mon .. 6 = Sun; Saturday is 5. On a Sunday
    // the offset is -1, landing on the Saturday just passed — the cutoff
    // comparison below then pushes the announce a week out, as intended.
    let to_saturday = 5 - trigger_kst.weekday().num_days_from_monday() as i64;
    let saturday = (trigger_kst + Duration::days(to_saturday)).date_naive();

    let cutoff = kst_at(saturday, 0, 1);
    let announce = kst_at(saturday, 21, 0);

    if trigger_kst < cutoff {
        announce.with_timezone(&Utc)
    } else {
        (announce + Duration::days(7)).with_timezone(&Utc)
    }
}

/// The KST calendar date on which a raffle's winner becomes determinable.
pub fn announce_date(announce_date_time: DateTime<Utc>) -> NaiveDate {
    announce_date_time.with_timezone(&*KST).date_naive()
}

/// Weekly draw sequence number for a draw date: draw 1 was 2002-12-07, one
/// draw every 7 days since.
pub fn draw_sequence_number(draw_date: NaiveDate) -> i64 {
    (draw_date - first_draw_date()).num_days() / 7 + 1
}

pub fn is_saturday(date: NaiveDate) -> bool {
    date.weekday() == Weekday::Sat
}

fn kst_at(date: NaiveDate, hour: u32, minute: u32) -> DateTime<FixedOffset> {
    KST.from_local_datetime(&date.and_hms_opt(hour, minute, 0).expect("valid wall-clock time"))
        .single()
        .expect("fixed offsets map local times uniquely")
}
