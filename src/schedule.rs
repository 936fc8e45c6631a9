//! Off-peak start window and cancellable waiting
//!
//! DeepSeek bills less between 00:30 and 08:30 local time. With cost-saving
//! on, a batch started outside that window waits for the next 00:30.

use chrono::{Duration as ChronoDuration, Local, NaiveDateTime, NaiveTime, TimeZone};
use std::time::Duration;
use tokio::sync::watch;

pub fn window_start() -> NaiveTime {
    NaiveTime::from_hms_opt(0, 30, 0).unwrap_or_default()
}

pub fn window_end() -> NaiveTime {
    NaiveTime::from_hms_opt(8, 30, 0).unwrap_or_default()
}

/// Both bounds inclusive.
pub fn in_window(time: NaiveTime) -> bool {
    time >= window_start() && time <= window_end()
}

/// `None` when `now` is inside the window, otherwise the next 00:30.
pub fn next_window_start(now: NaiveDateTime) -> Option<NaiveDateTime> {
    if in_window(now.time()) {
        return None;
    }
    let today = now.date().and_time(window_start());
    if now < today {
        Some(today)
    } else {
        Some(today + ChronoDuration::days(1))
    }
}

/// Target and remaining wait, or `None` if the batch may start now.
pub fn time_until_window(now: NaiveDateTime) -> Option<(NaiveDateTime, Duration)> {
    time_until_window_in(&Local, now)
}

/// [`time_until_window`] for an arbitrary zone.
///
/// The wait is measured between the zoned instants, so a DST change before
/// 00:30 does not shift the start by an hour. A wall time that falls in a DST
/// gap falls back to the naive difference.
pub fn time_until_window_in<Tz: TimeZone>(tz: &Tz, now: NaiveDateTime) -> Option<(NaiveDateTime, Duration)> {
    let target = next_window_start(now)?;
    let delta = match (
        tz.from_local_datetime(&now).earliest(),
        tz.from_local_datetime(&target).earliest(),
    ) {
        (Some(from), Some(to)) => to.signed_duration_since(from),
        _ => target - now,
    };
    Some((target, delta.to_std().unwrap_or_default()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waited {
    Reached,
    Cancelled,
}

/// Cancelling side, held by whoever may abort the run.
#[derive(Debug)]
pub struct Canceller {
    tx: watch::Sender<bool>,
}

/// Observing side, handed to the worker.
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

pub fn cancel_pair() -> (Canceller, CancelToken) {
    let (tx, rx) = watch::channel(false);
    (Canceller { tx }, CancelToken { rx })
}

impl Canceller {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

impl CancelToken {
    /// A token nobody can cancel.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancelled; pends forever if the canceller is gone.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|cancelled| *cancelled).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

pub async fn wait_or_cancel(delay: Duration, token: &CancelToken) -> Waited {
    tokio::select! {
        biased;
        _ = token.cancelled() => Waited::Cancelled,
        _ = tokio::time::sleep(delay) => Waited::Reached,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, LocalResult, NaiveDate, Utc};

    /// UTC+1 that springs forward to UTC+2 at 2026-03-28 22:00 UTC, so local
    /// 23:00..00:00 that night does not exist.
    #[derive(Debug, Clone, Copy)]
    struct SpringForward;

    impl SpringForward {
        fn switch() -> NaiveDateTime {
            NaiveDate::from_ymd_opt(2026, 3, 28)
                .unwrap()
                .and_hms_opt(22, 0, 0)
                .unwrap()
        }

        fn offset_at_utc(utc: &NaiveDateTime) -> FixedOffset {
            let hours = if *utc < Self::switch() { 1 } else { 2 };
            FixedOffset::east_opt(hours * 3600).unwrap()
        }
    }

    impl TimeZone for SpringForward {
        type Offset = FixedOffset;

        fn from_offset(_: &FixedOffset) -> Self {
            SpringForward
        }

        fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<FixedOffset> {
            self.offset_from_local_datetime(&local.and_time(NaiveTime::default()))
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
            let fits = |hours: i32| {
                let offset = FixedOffset::east_opt(hours * 3600).unwrap();
                let utc = *local - ChronoDuration::seconds(offset.local_minus_utc() as i64);
                (Self::offset_at_utc(&utc) == offset).then_some(offset)
            };
            match (fits(1), fits(2)) {
                (Some(a), Some(b)) => LocalResult::Ambiguous(a, b),
                (Some(o), None) | (None, Some(o)) => LocalResult::Single(o),
                (None, None) => LocalResult::None,
            }
        }

        fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
            Self::offset_at_utc(&utc.and_time(NaiveTime::default()))
        }

        fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
            Self::offset_at_utc(utc)
        }
    }

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 5, 20)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    #[test]
    fn test_inside_window_starts_now() {
        assert_eq!(next_window_start(at(0, 30, 0)), None);
        assert_eq!(next_window_start(at(3, 0, 0)), None);
        assert_eq!(next_window_start(at(8, 30, 0)), None);
    }

    #[test]
    fn test_before_window_waits_for_today() {
        assert_eq!(next_window_start(at(0, 10, 0)), Some(at(0, 30, 0)));
        let (_, wait) = time_until_window_in(&Utc, at(0, 29, 30)).unwrap();
        assert_eq!(wait, Duration::from_secs(30));
    }

    #[test]
    fn test_after_window_waits_for_tomorrow() {
        let expected = NaiveDate::from_ymd_opt(2026, 5, 21)
            .unwrap()
            .and_hms_opt(0, 30, 0)
            .unwrap();
        assert_eq!(next_window_start(at(8, 30, 1)), Some(expected));
        assert_eq!(next_window_start(at(23, 59, 59)), Some(expected));
        let (_, wait) = time_until_window_in(&Utc, at(22, 30, 0)).unwrap();
        assert_eq!(wait, Duration::from_secs(2 * 3600));
    }

    #[test]
    fn test_wait_spans_dst_change() {
        let now = NaiveDate::from_ymd_opt(2026, 3, 28)
            .unwrap()
            .and_hms_opt(22, 30, 0)
            .unwrap();
        let (target, wait) = time_until_window_in(&SpringForward, now).unwrap();
        assert_eq!(target.time(), window_start());
        // Wall clock says two hours, but one of them is skipped.
        assert_eq!(wait, Duration::from_secs(3600));
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_reaches_deadline() {
        let (_canceller, token) = cancel_pair();
        let start = tokio::time::Instant::now();
        let waited = wait_or_cancel(Duration::from_secs(90), &token).await;
        assert_eq!(waited, Waited::Reached);
        assert!(start.elapsed() >= Duration::from_secs(90));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_wait() {
        let (canceller, token) = cancel_pair();
        let handle = tokio::spawn(async move { wait_or_cancel(Duration::from_secs(3600), &token).await });
        tokio::time::advance(Duration::from_secs(10)).await;
        canceller.cancel();
        assert_eq!(handle.await.unwrap(), Waited::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_never_token_is_not_cancelled() {
        let token = CancelToken::never();
        assert!(!token.is_cancelled());
        assert_eq!(wait_or_cancel(Duration::from_secs(5), &token).await, Waited::Reached);
    }
}
