pub mod badge;
pub mod leaderboard;
pub mod progress;
pub mod rewards;
pub mod store;

pub use badge::*;
pub use leaderboard::*;
pub use progress::*;
pub use rewards::*;
pub use store::*;
