pub mod balancing;
pub mod elo;
pub mod types;

pub use balancing::{BalanceStrategy, ExhaustiveBalancer, GreedyBalancer, balance_teams};
pub use elo::EloEngine;
pub use types::{MatchOutcome, MatchScore, PlayerId, Team};
