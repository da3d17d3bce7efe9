//! Pure progression rules: level curves, completion rewards, skill tiers,
//! streaks and achievement evaluation. Nothing here touches the database.

pub mod achievements;
pub mod calendar;
pub mod levels;
pub mod rewards;
pub mod skills;
pub mod streak;

pub use achievements::{AchievementEvaluation, LearnerStats, evaluate_achievement, prerequisites_met};
pub use calendar::{start_of_month, start_of_week};
pub use levels::{LevelState, XpAward, apply_xp_award, level_from_total_xp};
pub use rewards::{RewardBreakdown, compute_lesson_completion_reward, compute_module_completion_reward};
pub use skills::{compute_skill_level_update, skill_tier_for_score};
pub use streak::{Streak, advance_streak};
