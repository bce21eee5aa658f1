#[derive(Debug, Clone)]
pub struct RatingSettings {
    /// How far a single result can move a rating.
    pub k_factor: f64,
    pub starter_rating: i64,
    /// Largest roster the exhaustive balancer will take on; bigger pools
    /// fall back to the greedy strategy.
    pub exhaustive_roster_cap: usize,
}

impl Default for RatingSettings {
    fn default() -> Self {
        Self {
            k_factor: 50.0,
            starter_rating: 1500,
            exhaustive_roster_cap: 20,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub rating: RatingSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self {
            rating: RatingSettings::default(),
        }
    }
}

// Prefer passing the config explicitly (Dependency Injection) rather than
// globals - settlement and balancing both take it as an argument.
