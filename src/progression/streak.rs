use chrono::NaiveDate;

/// Current and longest daily streak
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Streak {
  pub current: i64,
  pub longest: i64,
}

/// Advance a daily streak for activity on `today`.
///
/// Same day leaves it unchanged, the following day extends it, any gap (or a
/// first activity) restarts it at 1.
pub fn advance_streak(last_active: Option<NaiveDate>, today: NaiveDate, streak: Streak) -> Streak {
  let current = match last_active {
    Some(last) if last == today => streak.current.max(1),
    Some(last) if last.succ_opt() == Some(today) => streak.current + 1,
    Some(last) if last > today => streak.current.max(1),
    _ => 1,
  };
  Streak {
    current,
    longest: streak.longest.max(current),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
  }

  #[test]
  fn test_first_activity_starts_streak() {
    let s = advance_streak(None, day(1), Streak { current: 0, longest: 0 });
    assert_eq!(s, Streak { current: 1, longest: 1 });
  }

  #[test]
  fn test_same_day_unchanged() {
    let s = advance_streak(Some(day(5)), day(5), Streak { current: 3, longest: 4 });
    assert_eq!(s, Streak { current: 3, longest: 4 });
  }

  #[test]
  fn test_consecutive_day_extends() {
    let s = advance_streak(Some(day(5)), day(6), Streak { current: 4, longest: 4 });
    assert_eq!(s, Streak { current: 5, longest: 5 });
  }

  #[test]
  fn test_gap_resets_but_keeps_longest() {
    let s = advance_streak(Some(day(5)), day(8), Streak { current: 6, longest: 9 });
    assert_eq!(s, Streak { current: 1, longest: 9 });
  }

  #[test]
  fn test_month_boundary() {
    let last = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
    let s = advance_streak(Some(last), day(1), Streak { current: 2, longest: 2 });
    assert_eq!(s.current, 3);
  }
}
