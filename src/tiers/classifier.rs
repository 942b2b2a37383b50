use crate::tiers::table::{PrizeTable, TierRule};
use crate::types::MatchOutcome;

/// Resolve a match outcome to a prize tier: first rule in table order whose
/// minimum match count and complementary requirement are both satisfied.
/// Returns None when no tier applies (the "no prize" outcome).
pub fn classify<'a>(table: &'a PrizeTable, outcome: &MatchOutcome) -> Option<&'a TierRule> {
    table.rules.iter().find(|rule| {
        outcome.main_matches >= rule.min_main_matches
            && (!rule.requires_complementary || outcome.complementary_match)
    })
}

// ---------------------------------------------------------------------------
// WinPolicy
// ---------------------------------------------------------------------------

/// Which outcomes count as a "win" in the aggregated stats.
///
/// The default threshold is `main_matches >= 2 OR (main_matches >= 1 AND
/// complementary_match)`. It is a standalone design parameter, deliberately
/// not derived from the payout table: it decides which tiers feed
/// `wins`/`win_rate` even when their payout is zero, and it differs from the
/// minimum payout tier on purpose (1+complementary is a win). Changing it
/// changes `wins`, `win_rate` and `roi` materially, so the exact values are
/// pinned by the boundary tests below.
#[derive(Debug, Clone, Copy)]
pub struct WinPolicy {
    /// Wins regardless of the complementary number.
    pub min_main_matches: u32,
    /// Wins when the complementary number also matches.
    pub min_main_with_complementary: u32,
}

impl WinPolicy {
    pub fn is_win(&self, outcome: &MatchOutcome) -> bool {
        outcome.main_matches >= self.min_main_matches
            || (outcome.main_matches >= self.min_main_with_complementary
                && outcome.complementary_match)
    }
}

impl Default for WinPolicy {
    fn default() -> Self {
        Self { min_main_matches: 2, min_main_with_complementary: 1 }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
