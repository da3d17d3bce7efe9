//! Level curves.
//!
//! Two curves exist. The incremental curve charges `100 * level` XP to leave
//! `level` and is the default used at award time. The threshold curve maps
//! lifetime XP straight to a level through a fixed table.

use crate::config::LevelCurve;

/// Lifetime XP needed to reach each level; index 0 is level 1.
pub const LEVEL_THRESHOLDS: [i64; 21] = [
  0, 100, 250, 500, 1000, 1750, 2750, 4000, 5500, 7250, 9250, 11500, 14000, 16750, 19750, 23000,
  26500, 30250, 34250, 38500, 43000,
];

/// Highest level reachable on the threshold curve
pub const MAX_LEVEL: i64 = LEVEL_THRESHOLDS.len() as i64;

/// XP cost of leaving `level` on the incremental curve
pub fn incremental_step(level: i64) -> i64 {
  level.saturating_mul(100)
}

/// Greatest level whose threshold `total_xp` has reached. Level 1 is the floor.
pub fn level_from_total_xp(total_xp: i64) -> i64 {
  LEVEL_THRESHOLDS
    .iter()
    .rposition(|&threshold| total_xp >= threshold)
    .map(|idx| idx as i64 + 1)
    .unwrap_or(1)
}

/// XP still needed on the threshold curve; 0 once the table is exhausted
pub fn xp_to_next_threshold(total_xp: i64) -> i64 {
  let level = level_from_total_xp(total_xp);
  if level >= MAX_LEVEL {
    return 0;
  }
  LEVEL_THRESHOLDS[level as usize] - total_xp
}

/// Level fields of an account before or after an award
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelState {
  pub level: i64,
  /// XP inside the current level
  pub current_xp: i64,
  pub xp_to_next_level: i64,
  pub total_xp: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XpAward {
  pub state: LevelState,
  pub leveled_up: bool,
  pub levels_gained: i64,
}

/// Add `xp_delta` to `state` using the configured curve
pub fn apply_xp_award(state: LevelState, xp_delta: i64, curve: LevelCurve) -> XpAward {
  let next = match curve {
    LevelCurve::Incremental => apply_incremental(state, xp_delta),
    LevelCurve::Threshold => apply_threshold(state, xp_delta),
  };
  let levels_gained = (next.level - state.level).max(0);
  XpAward {
    state: next,
    leveled_up: levels_gained > 0,
    levels_gained,
  }
}

fn apply_incremental(state: LevelState, xp_delta: i64) -> LevelState {
  let mut level = state.level.max(1);
  let mut remaining = state.current_xp.saturating_add(xp_delta);
  while remaining >= incremental_step(level) {
    remaining -= incremental_step(level);
    level += 1;
  }
  LevelState {
    level,
    current_xp: remaining,
    xp_to_next_level: incremental_step(level) - remaining,
    total_xp: state.total_xp.saturating_add(xp_delta),
  }
}

fn apply_threshold(state: LevelState, xp_delta: i64) -> LevelState {
  let total_xp = state.total_xp.saturating_add(xp_delta);
  let level = level_from_total_xp(total_xp);
  LevelState {
    level,
    current_xp: total_xp - LEVEL_THRESHOLDS[(level - 1) as usize],
    xp_to_next_level: xp_to_next_threshold(total_xp),
    total_xp,
  }
}
