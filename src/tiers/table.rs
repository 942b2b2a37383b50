use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

// ---------------------------------------------------------------------------
// PrizeTable — ordered, externally configurable payout rules
// ---------------------------------------------------------------------------

/// One payout rule. Rules are scanned in table order (most specific first);
/// the first rule whose minimum match count and complementary requirement
/// are both satisfied wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierRule {
    pub min_main_matches: u32,
    pub requires_complementary: bool,
    pub label: String,
    pub payout: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrizeTable {
    pub rules: Vec<TierRule>,
}

impl PrizeTable {
    /// Built-in French Loto payout table (5/49 + complementary 1-10).
    /// Jackpot and mid tiers use representative fixed amounts — the real
    /// pari-mutuel amounts vary per draw, which is exactly why the table is
    /// swappable configuration rather than hard-coded logic.
    pub fn french_loto() -> Self {
        let rule = |min: u32, comp: bool, label: &str, payout: f64| TierRule {
            min_main_matches: min,
            requires_complementary: comp,
            label: label.to_string(),
            payout,
        };
        Self {
            rules: vec![
                rule(5, true, "5+complementary", 2_000_000.0),
                rule(5, false, "5", 100_000.0),
                rule(4, true, "4+complementary", 1_000.0),
                rule(4, false, "4", 400.0),
                rule(3, true, "3+complementary", 50.0),
                rule(3, false, "3", 20.0),
                rule(2, true, "2+complementary", 10.0),
                rule(2, false, "2", 4.40),
                rule(1, true, "1+complementary", 2.20),
            ],
        }
    }

    /// Load a synthetic or updated rule set from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }
}

impl Default for PrizeTable {
    fn default() -> Self {
        Self::french_loto()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complementary_tier_pays_at_least_as_much() {
        // For a fixed match count, the +complementary tier payout must
        // dominate the plain tier.
        let table = PrizeTable::french_loto();
        for matches in 2..=5u32 {
            let with = table
                .rules
                .iter()
                .find(|r| r.min_main_matches == matches && r.requires_complementary)
                .map(|r| r.payout)
                .unwrap();
            let without = table
                .rules
                .iter()
                .find(|r| r.min_main_matches == matches && !r.requires_complementary)
                .map(|r| r.payout)
                .unwrap();
            assert!(with >= without, "tier {matches}: {with} < {without}");
        }
    }

    #[test]
    fn rules_ordered_most_specific_first() {
        let table = PrizeTable::french_loto();
        for pair in table.rules.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            let more_specific = a.min_main_matches > b.min_main_matches
                || (a.min_main_matches == b.min_main_matches
                    && a.requires_complementary
                    && !b.requires_complementary);
            assert!(more_specific, "rule '{}' before '{}'", a.label, b.label);
        }
    }

    #[test]
    fn table_round_trips_through_json() {
        let table = PrizeTable::french_loto();
        let json = serde_json::to_string(&table).unwrap();
        let parsed: PrizeTable = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.rules.len(), table.rules.len());
        assert_eq!(parsed.rules[0].label, "5+complementary");
    }
}
