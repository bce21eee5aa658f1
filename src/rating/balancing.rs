use log::debug;

use crate::config::settings::RatingSettings;
use crate::database::models::Player;

/// A two-way split of a player pool into Elo-balanced sides.
pub trait BalanceStrategy {
    fn split(&self, players: &[Player]) -> (Vec<Player>, Vec<Player>);
}

/// Picks a strategy by roster size: exhaustive search up to the configured
/// cap, greedy above it (the recursion is exponential in the roster size).
pub fn balance_teams(
    players: &[Player],
    settings: &RatingSettings,
) -> (Vec<Player>, Vec<Player>) {
    if players.len() <= settings.exhaustive_roster_cap {
        ExhaustiveBalancer.split(players)
    } else {
        debug!(
            "Roster of {} exceeds exhaustive cap of {}, using greedy split",
            players.len(),
            settings.exhaustive_roster_cap
        );
        GreedyBalancer.split(players)
    }
}

/// Enumerates every subset of size floor(N/2) for team A and keeps the split
/// with the smallest total-Elo gap. The first optimum in enumeration order
/// wins ties, so the result is deterministic for a fixed input order.
pub struct ExhaustiveBalancer;

impl BalanceStrategy for ExhaustiveBalancer {
    fn split(&self, players: &[Player]) -> (Vec<Player>, Vec<Player>) {
        if players.is_empty() {
            return (Vec::new(), Vec::new());
        }

        let target_size = players.len() / 2;
        let total: i64 = players.iter().map(|p| p.elo).sum();

        let mut search = SubsetSearch {
            players,
            target_size,
            total,
            best_gap: i64::MAX,
            best_subset: Vec::new(),
            current: Vec::new(),
        };
        search.recurse(0, 0);

        partition_by_indices(players, &search.best_subset)
    }
}

struct SubsetSearch<'a> {
    players: &'a [Player],
    target_size: usize,
    total: i64,
    best_gap: i64,
    best_subset: Vec<usize>,
    current: Vec<usize>,
}

impl SubsetSearch<'_> {
    fn recurse(&mut self, next: usize, sum_a: i64) {
        if self.current.len() == self.target_size {
            // Team B is the complement, so its sum is fixed by the subset.
            let gap = (self.total - 2 * sum_a).abs();
            if gap < self.best_gap {
                self.best_gap = gap;
                self.best_subset = self.current.clone();
            }
            return;
        }

        // Not enough players left to fill team A.
        let remaining = self.players.len() - next;
        if remaining < self.target_size - self.current.len() {
            return;
        }

        self.current.push(next);
        self.recurse(next + 1, sum_a + self.players[next].elo);
        self.current.pop();

        self.recurse(next + 1, sum_a);
    }
}

fn partition_by_indices(players: &[Player], subset: &[usize]) -> (Vec<Player>, Vec<Player>) {
    let mut team_a = Vec::with_capacity(subset.len());
    let mut team_b = Vec::with_capacity(players.len() - subset.len());

    for (idx, player) in players.iter().enumerate() {
        if subset.contains(&idx) {
            team_a.push(player.clone());
        } else {
            team_b.push(player.clone());
        }
    }

    (team_a, team_b)
}

/// Linear-time heuristic: sort descending by Elo and hand each player to the
/// side with the lower running total. No optimality guarantee.
pub struct GreedyBalancer;

impl BalanceStrategy for GreedyBalancer {
    fn split(&self, players: &[Player]) -> (Vec<Player>, Vec<Player>) {
        let mut sorted: Vec<Player> = players.to_vec();
        sorted.sort_by(|a, b| b.elo.cmp(&a.elo));

        let mut team_a = Vec::new();
        let mut team_b = Vec::new();
        let mut sum_a = 0i64;
        let mut sum_b = 0i64;

        for player in sorted {
            if sum_a <= sum_b {
                sum_a += player.elo;
                team_a.push(player);
            } else {
                sum_b += player.elo;
                team_b.push(player);
            }
        }

        (team_a, team_b)
    }
}
