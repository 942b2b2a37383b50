use crate::cache::Draw;
use crate::types::{Combination, MatchOutcome};

/// Match one candidate combination against one draw.
///
/// `main_matches` is the popcount of the two number masks ANDed together,
/// `complementary_match` is direct equality. Pure computation over immutable
/// data — safe to call from any number of tasks against the same draw.
#[inline]
pub fn evaluate(combination: &Combination, draw: &Draw) -> MatchOutcome {
    MatchOutcome {
        main_matches: (combination.mask & draw.main_mask).count_ones(),
        complementary_match: combination.complementary == draw.complementary,
    }
}

/// Per-draw observation hook for the hot evaluation loop.
///
/// No-op by default so the comparison path carries no I/O side effects;
/// inject an implementation to trace or count evaluations.
pub trait EvalHook: Send + Sync {
    fn on_draw(&self, _draw: &Draw, _outcome: &MatchOutcome) {}
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheIndex;
    use crate::types::RawDraw;

    fn draw(numbers: [u8; 5], complementary: u8) -> Draw {
        let index = CacheIndex::build(
            &[RawDraw {
                date: "2024-01-01".to_string(),
                main_numbers: numbers.to_vec(),
                complementary_number: complementary,
            }],
            1,
        );
        index.draws()[0].clone()
    }

    #[test]
    fn full_match() {
        let c = Combination::new(&[1, 2, 3, 4, 5], 6).unwrap();
        let outcome = evaluate(&c, &draw([1, 2, 3, 4, 5], 6));
        assert_eq!(outcome.main_matches, 5);
        assert!(outcome.complementary_match);
    }

    #[test]
    fn no_match() {
        let c = Combination::new(&[1, 2, 3, 4, 5], 6).unwrap();
        let outcome = evaluate(&c, &draw([10, 20, 30, 40, 49], 1));
        assert_eq!(outcome.main_matches, 0);
        assert!(!outcome.complementary_match);
    }

    #[test]
    fn partial_match_counts_intersection() {
        let c = Combination::new(&[1, 2, 3, 40, 49], 6).unwrap();
        let outcome = evaluate(&c, &draw([1, 2, 30, 40, 48], 7));
        assert_eq!(outcome.main_matches, 3);
        assert!(!outcome.complementary_match);
    }

    #[test]
    fn match_count_is_order_independent() {
        let d = draw([9, 17, 25, 33, 41], 3);
        let a = Combination::new(&[41, 9, 25, 17, 33], 3).unwrap();
        let b = Combination::new(&[9, 17, 25, 33, 41], 3).unwrap();
        assert_eq!(evaluate(&a, &d), evaluate(&b, &d));
        assert_eq!(evaluate(&a, &d).main_matches, 5);
    }

    #[test]
    fn match_count_bounded() {
        let d = draw([1, 2, 3, 4, 5], 6);
        for n in 1..=45u8 {
            let c = Combination::new(&[n, n + 1, n + 2, n + 3, n + 4], 1).unwrap();
            let matches = evaluate(&c, &d).main_matches;
            assert!(matches <= 5, "matches={matches} for base {n}");
        }
    }
}
