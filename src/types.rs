use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

use crate::config::{COMPLEMENTARY_MAX, MAIN_MAX, MAIN_PICKS};
use crate::error::{AppError, Result};

// ---------------------------------------------------------------------------
// RawDraw — external draw record, as supplied by the DrawStore
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawDraw {
    /// ISO 8601 calendar date, "YYYY-MM-DD".
    pub date: String,
    pub main_numbers: Vec<u8>,
    pub complementary_number: u8,
}

// ---------------------------------------------------------------------------
// Combination — validated candidate, fails fast on construction
// ---------------------------------------------------------------------------

/// Bit for number `n` in a u64 number mask. Valid numbers are 1..=49 so the
/// mask always fits; bit 0 is never set.
#[inline]
pub fn number_bit(n: u8) -> u64 {
    1u64 << n
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Combination {
    /// Sorted ascending.
    pub numbers: [u8; MAIN_PICKS],
    pub complementary: u8,
    /// Union of `number_bit` over `numbers` — intersection with a draw is a
    /// single AND + popcount.
    pub mask: u64,
}

impl Combination {
    pub fn new(numbers: &[u8], complementary: u8) -> Result<Self> {
        if numbers.len() != MAIN_PICKS {
            return Err(AppError::InvalidCombination(format!(
                "expected {MAIN_PICKS} main numbers, got {}",
                numbers.len()
            )));
        }
        let mut mask = 0u64;
        for &n in numbers {
            if n < 1 || n > MAIN_MAX {
                return Err(AppError::InvalidCombination(format!(
                    "main number {n} out of range [1,{MAIN_MAX}]"
                )));
            }
            let bit = number_bit(n);
            if mask & bit != 0 {
                return Err(AppError::InvalidCombination(format!("duplicate main number {n}")));
            }
            mask |= bit;
        }
        if complementary < 1 || complementary > COMPLEMENTARY_MAX {
            return Err(AppError::InvalidCombination(format!(
                "complementary number {complementary} out of range [1,{COMPLEMENTARY_MAX}]"
            )));
        }
        let mut sorted = [0u8; MAIN_PICKS];
        sorted.copy_from_slice(numbers);
        sorted.sort_unstable();
        Ok(Self { numbers: sorted, complementary, mask })
    }
}

/// Wire shape of a candidate combination.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinationInput {
    pub numbers: Vec<u8>,
    pub complementary: u8,
}

impl CombinationInput {
    pub fn validate(&self) -> Result<Combination> {
        Combination::new(&self.numbers, self.complementary)
    }
}

// ---------------------------------------------------------------------------
// MatchOutcome — one combination against one draw
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchOutcome {
    /// Size of the intersection between the combination's main numbers and
    /// the draw's main-number set; always in 0..=5.
    pub main_matches: u32,
    pub complementary_match: bool,
}

// ---------------------------------------------------------------------------
// TestResult — one full backtest outcome, owned by the caller
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub combination: Vec<u8>,
    pub complementary: u8,
    /// Draws scanned in the selected window.
    pub total_tests: u64,
    pub wins: u64,
    /// Percentage, 0 when no draws were scanned.
    pub win_rate: f64,
    pub total_gains: f64,
    /// Average gain per winning draw, 0 when there were no wins.
    pub average_gain: f64,
    /// (gains - investment) / investment * 100, 0 when investment is 0.
    pub roi: f64,
    /// Tier label → hit count. BTreeMap so serialized order is stable.
    pub categories: BTreeMap<String, u64>,
    /// Wall-clock diagnostics only — never feeds a business field.
    pub execution_time_ms: f64,
}

// ---------------------------------------------------------------------------
// Batch output — one slot per input combination, order-preserving
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchEntry {
    Ok { result: TestResult },
    Error { combination: Vec<u8>, complementary: u8, error: String },
}

// ---------------------------------------------------------------------------
// Backtest window options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct TestOptions {
    /// Deterministic prefix of the (filtered, sorted) draw list.
    pub max_draws: Option<usize>,
    /// Inclusive ISO date bounds, compared lexicographically.
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    /// Combinations not started before this instant get an error slot.
    pub deadline: Option<Instant>,
}

// ---------------------------------------------------------------------------
// Cache stats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    /// Oldest draw date in the snapshot.
    pub start: String,
    /// Most recent draw date in the snapshot.
    pub end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub total_draws: u64,
    pub date_range: Option<DateRange>,
    /// Millisecond UTC epoch of when the snapshot was published.
    pub built_at: u64,
    /// Monotonic snapshot version, bumped on every build/refresh.
    pub version: u64,
    /// Records dropped during normalization (partial-success policy).
    pub dropped_records: u64,
}
