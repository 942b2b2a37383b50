use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use futures_util::future::join_all;
use tracing::{debug, warn};

use crate::api::latency::LatencyStats;
use crate::cache::DrawCache;
use crate::config::BATCH_SIZE;
use crate::error::{AppError, Result};
use crate::eval::evaluator::{evaluate, EvalHook};
use crate::tiers::{classify, PrizeTable, WinPolicy};
use crate::types::{BatchEntry, Combination, CombinationInput, TestOptions, TestResult};

// ---------------------------------------------------------------------------
// BatchRunner
// ---------------------------------------------------------------------------

/// Runs one or many candidate combinations against the published draw
/// snapshot and aggregates wins, tier counts and ROI.
///
/// Determinism: for a fixed snapshot, combination and window the result is
/// identical across calls — each combination scans its (ordered) draw slice
/// sequentially, so neither batch size nor task scheduling can reorder the
/// aggregation.
pub struct BatchRunner {
    cache: Arc<DrawCache>,
    table: Arc<PrizeTable>,
    policy: WinPolicy,
    ticket_price: f64,
    latency: Arc<LatencyStats>,
    hook: Option<Arc<dyn EvalHook>>,
}

impl BatchRunner {
    pub fn new(
        cache: Arc<DrawCache>,
        table: Arc<PrizeTable>,
        policy: WinPolicy,
        ticket_price: f64,
        latency: Arc<LatencyStats>,
    ) -> Arc<Self> {
        Arc::new(Self { cache, table, policy, ticket_price, latency, hook: None })
    }

    /// Inject a per-draw observation hook (tests, tracing). The default
    /// runner carries none, so the hot loop has no side effects.
    pub fn with_hook(
        cache: Arc<DrawCache>,
        table: Arc<PrizeTable>,
        policy: WinPolicy,
        ticket_price: f64,
        latency: Arc<LatencyStats>,
        hook: Arc<dyn EvalHook>,
    ) -> Arc<Self> {
        Arc::new(Self { cache, table, policy, ticket_price, latency, hook: Some(hook) })
    }

    /// Backtest a single validated combination over the selected window.
    ///
    /// The window is a deterministic prefix: inclusive `[start,end]` date
    /// filter (ISO strings compare lexicographically) over the
    /// already-sorted draws, then the first `max_draws` of the remainder.
    pub fn test_combination(
        &self,
        combination: &Combination,
        opts: &TestOptions,
    ) -> Result<TestResult> {
        let started = Instant::now();
        let index = self.cache.snapshot()?;

        let mut total_tests = 0u64;
        let mut wins = 0u64;
        let mut total_gains = 0.0f64;
        let mut categories: BTreeMap<String, u64> = BTreeMap::new();

        let window = index
            .draws()
            .iter()
            .filter(|d| opts.start_date.as_deref().map_or(true, |s| d.date.as_str() >= s))
            .filter(|d| opts.end_date.as_deref().map_or(true, |e| d.date.as_str() <= e))
            .take(opts.max_draws.unwrap_or(usize::MAX));

        for draw in window {
            total_tests += 1;
            let outcome = evaluate(combination, draw);
            if let Some(hook) = &self.hook {
                hook.on_draw(draw, &outcome);
            }
            if self.policy.is_win(&outcome) {
                wins += 1;
                if let Some(tier) = classify(&self.table, &outcome) {
                    total_gains += tier.payout;
                    *categories.entry(tier.label.clone()).or_insert(0) += 1;
                }
            }
        }

        let investment = total_tests as f64 * self.ticket_price;
        let roi = if investment > 0.0 {
            (total_gains - investment) / investment * 100.0
        } else {
            0.0
        };
        let win_rate = if total_tests > 0 {
            wins as f64 / total_tests as f64 * 100.0
        } else {
            0.0
        };
        let average_gain = if wins > 0 { total_gains / wins as f64 } else { 0.0 };

        let elapsed = started.elapsed();
        self.latency.record(elapsed);
        debug!(
            total_tests,
            wins,
            roi,
            elapsed_us = elapsed.as_micros() as u64,
            "Backtest done: {wins}/{total_tests} wins, roi {roi:.2}%",
        );

        Ok(TestResult {
            combination: combination.numbers.to_vec(),
            complementary: combination.complementary,
            total_tests,
            wins,
            win_rate,
            total_gains,
            average_gain,
            roi,
            categories,
            execution_time_ms: elapsed.as_secs_f64() * 1000.0,
        })
    }

    /// Backtest many combinations: fixed-size batches, one task per batch,
    /// output in input order. A failing slot becomes an error entry without
    /// touching its siblings; an optional deadline turns not-yet-started
    /// slots into error entries too.
    pub async fn test_multiple(
        self: &Arc<Self>,
        combinations: &[CombinationInput],
        opts: &TestOptions,
    ) -> Vec<BatchEntry> {
        let mut handles = Vec::with_capacity(combinations.len().div_ceil(BATCH_SIZE));
        for batch in combinations.chunks(BATCH_SIZE) {
            let runner = Arc::clone(self);
            let batch: Vec<CombinationInput> = batch.to_vec();
            let opts = opts.clone();
            handles.push((batch.clone(), tokio::spawn(async move {
                batch.iter().map(|input| runner.run_slot(input, &opts)).collect::<Vec<_>>()
            })));
        }

        // Joining in spawn order keeps output order equal to input order
        // regardless of task completion order.
        let mut entries = Vec::with_capacity(combinations.len());
        let (batches, joins): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
        for (batch, joined) in batches.into_iter().zip(join_all(joins).await) {
            match joined {
                Ok(batch_entries) => entries.extend(batch_entries),
                Err(e) => {
                    // Task panic or cancellation: keep one error slot per
                    // input so length and order still hold.
                    warn!("Batch task failed: {e}");
                    let error = AppError::TaskJoin(e.to_string()).to_string();
                    entries.extend(batch.into_iter().map(|input| BatchEntry::Error {
                        combination: input.numbers,
                        complementary: input.complementary,
                        error: error.clone(),
                    }));
                }
            }
        }
        entries
    }

    fn run_slot(&self, input: &CombinationInput, opts: &TestOptions) -> BatchEntry {
        if let Some(deadline) = opts.deadline {
            if Instant::now() >= deadline {
                return BatchEntry::Error {
                    combination: input.numbers.clone(),
                    complementary: input.complementary,
                    error: AppError::DeadlineExceeded.to_string(),
                };
            }
        }
        let result = input
            .validate()
            .and_then(|combination| self.test_combination(&combination, opts));
        match result {
            Ok(result) => BatchEntry::Ok { result },
            Err(e) => BatchEntry::Error {
                combination: input.numbers.clone(),
                complementary: input.complementary,
                error: e.to_string(),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Draw;
    use crate::config::DEFAULT_TICKET_PRICE;
    use crate::types::{MatchOutcome, RawDraw};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::time::Duration;

    fn raw(date: &str, numbers: [u8; 5], complementary: u8) -> RawDraw {
        RawDraw {
            date: date.to_string(),
            main_numbers: numbers.to_vec(),
            complementary_number: complementary,
        }
    }

    /// D1/D2 full matches, D3 a miss — the reference scenario used across
    /// the window and batch tests.
    fn scenario_cache() -> Arc<DrawCache> {
        let cache = DrawCache::new();
        cache.build(&[
            raw("2024-01-01", [1, 2, 3, 4, 5], 6),
            raw("2024-01-08", [1, 2, 3, 4, 5], 6),
            raw("2024-01-15", [10, 20, 30, 40, 49], 1),
        ]);
        cache
    }

    fn runner(cache: Arc<DrawCache>) -> Arc<BatchRunner> {
        BatchRunner::new(
            cache,
            Arc::new(PrizeTable::french_loto()),
            WinPolicy::default(),
            DEFAULT_TICKET_PRICE,
            Arc::new(LatencyStats::new()),
        )
    }

    fn input(numbers: [u8; 5], complementary: u8) -> CombinationInput {
        CombinationInput { numbers: numbers.to_vec(), complementary }
    }

    #[test]
    fn end_to_end_scenario() {
        let runner = runner(scenario_cache());
        let combination = Combination::new(&[1, 2, 3, 4, 5], 6).unwrap();
        let result = runner.test_combination(&combination, &TestOptions::default()).unwrap();

        assert_eq!(result.total_tests, 3);
        assert_eq!(result.wins, 2);
        assert_eq!(result.categories.get("5+complementary"), Some(&2));
        assert!((result.total_gains - 4_000_000.0).abs() < 1e-9);
        assert!((result.win_rate - 2.0 / 3.0 * 100.0).abs() < 1e-9);
        assert!((result.average_gain - 2_000_000.0).abs() < 1e-9);

        let investment = 3.0 * DEFAULT_TICKET_PRICE;
        let expected_roi = (result.total_gains - investment) / investment * 100.0;
        assert!((result.roi - expected_roi).abs() < 1e-9, "roi={}", result.roi);
    }

    #[test]
    fn idempotent_for_fixed_snapshot() {
        let runner = runner(scenario_cache());
        let combination = Combination::new(&[1, 2, 3, 4, 5], 6).unwrap();
        let a = runner.test_combination(&combination, &TestOptions::default()).unwrap();
        let b = runner.test_combination(&combination, &TestOptions::default()).unwrap();

        assert_eq!(a.total_tests, b.total_tests);
        assert_eq!(a.wins, b.wins);
        assert_eq!(a.categories, b.categories);
        assert_eq!(a.total_gains.to_bits(), b.total_gains.to_bits());
        assert!((a.roi - b.roi).abs() < 1e-12);
        assert!((a.win_rate - b.win_rate).abs() < 1e-12);
    }

    #[test]
    fn date_window_restricts_to_single_draw() {
        let runner = runner(scenario_cache());
        let combination = Combination::new(&[1, 2, 3, 4, 5], 6).unwrap();
        let opts = TestOptions {
            start_date: Some("2024-01-15".to_string()),
            end_date: Some("2024-01-15".to_string()),
            ..Default::default()
        };
        let result = runner.test_combination(&combination, &opts).unwrap();
        assert_eq!(result.total_tests, 1);
        assert_eq!(result.wins, 0);
        assert!(result.categories.is_empty());
        // All investment lost.
        assert!((result.roi - -100.0).abs() < 1e-9, "roi={}", result.roi);
    }

    #[test]
    fn max_draws_takes_most_recent_prefix() {
        let runner = runner(scenario_cache());
        let combination = Combination::new(&[1, 2, 3, 4, 5], 6).unwrap();
        let opts = TestOptions { max_draws: Some(1), ..Default::default() };
        // Draws are sorted most recent first, so the prefix is D3 (the miss).
        let result = runner.test_combination(&combination, &opts).unwrap();
        assert_eq!(result.total_tests, 1);
        assert_eq!(result.wins, 0);
    }

    #[test]
    fn empty_window_yields_zeroed_rates() {
        let runner = runner(scenario_cache());
        let combination = Combination::new(&[1, 2, 3, 4, 5], 6).unwrap();
        let opts = TestOptions {
            start_date: Some("2030-01-01".to_string()),
            ..Default::default()
        };
        let result = runner.test_combination(&combination, &opts).unwrap();
        assert_eq!(result.total_tests, 0);
        assert_eq!(result.roi, 0.0);
        assert_eq!(result.win_rate, 0.0);
        assert_eq!(result.average_gain, 0.0);
    }

    #[test]
    fn cache_not_ready_is_an_error() {
        let runner = runner(DrawCache::new());
        let combination = Combination::new(&[1, 2, 3, 4, 5], 6).unwrap();
        let err = runner.test_combination(&combination, &TestOptions::default());
        assert!(matches!(err, Err(AppError::CacheNotReady)));
    }

    #[tokio::test]
    async fn batch_preserves_length_and_order() {
        let runner = runner(scenario_cache());
        // More than two batches worth of inputs, each recognizable by its
        // complementary number.
        let inputs: Vec<CombinationInput> = (1..=25u8)
            .map(|i| input([1, 2, 3, 4, 5], (i % 10) + 1))
            .collect();
        let entries = runner.test_multiple(&inputs, &TestOptions::default()).await;

        assert_eq!(entries.len(), inputs.len());
        for (entry, input) in entries.iter().zip(&inputs) {
            match entry {
                BatchEntry::Ok { result } => {
                    assert_eq!(result.complementary, input.complementary);
                }
                BatchEntry::Error { .. } => panic!("unexpected error slot"),
            }
        }
    }

    #[tokio::test]
    async fn invalid_slot_is_isolated() {
        let runner = runner(scenario_cache());
        let inputs = vec![
            input([1, 2, 3, 4, 5], 6),
            CombinationInput { numbers: vec![1, 1, 3, 4, 5], complementary: 6 },
            input([10, 20, 30, 40, 49], 1),
        ];
        let entries = runner.test_multiple(&inputs, &TestOptions::default()).await;

        assert_eq!(entries.len(), 3);
        assert!(matches!(entries[0], BatchEntry::Ok { .. }));
        match &entries[1] {
            BatchEntry::Error { error, .. } => assert!(error.contains("duplicate")),
            BatchEntry::Ok { .. } => panic!("invalid combination accepted"),
        }
        match &entries[2] {
            BatchEntry::Ok { result } => assert_eq!(result.wins, 1),
            BatchEntry::Error { error, .. } => panic!("sibling aborted: {error}"),
        }
    }

    #[tokio::test]
    async fn expired_deadline_marks_all_slots() {
        let runner = runner(scenario_cache());
        let inputs = vec![input([1, 2, 3, 4, 5], 6), input([6, 7, 8, 9, 10], 2)];
        let opts = TestOptions {
            deadline: Some(Instant::now() - Duration::from_millis(1)),
            ..Default::default()
        };
        let entries = runner.test_multiple(&inputs, &opts).await;
        assert_eq!(entries.len(), 2);
        for entry in &entries {
            match entry {
                BatchEntry::Error { error, .. } => assert!(error.contains("Deadline")),
                BatchEntry::Ok { .. } => panic!("deadline not enforced"),
            }
        }
    }

    struct CountingHook(AtomicU64);

    impl EvalHook for CountingHook {
        fn on_draw(&self, _draw: &Draw, _outcome: &MatchOutcome) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[test]
    fn hook_sees_every_scanned_draw() {
        let hook = Arc::new(CountingHook(AtomicU64::new(0)));
        let runner = BatchRunner::with_hook(
            scenario_cache(),
            Arc::new(PrizeTable::french_loto()),
            WinPolicy::default(),
            DEFAULT_TICKET_PRICE,
            Arc::new(LatencyStats::new()),
            Arc::clone(&hook) as Arc<dyn EvalHook>,
        );
        let combination = Combination::new(&[1, 2, 3, 4, 5], 6).unwrap();
        runner.test_combination(&combination, &TestOptions::default()).unwrap();
        assert_eq!(hook.0.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn latency_histogram_records_runs() {
        let latency = Arc::new(LatencyStats::new());
        let runner = BatchRunner::new(
            scenario_cache(),
            Arc::new(PrizeTable::french_loto()),
            WinPolicy::default(),
            DEFAULT_TICKET_PRICE,
            Arc::clone(&latency),
        );
        let combination = Combination::new(&[1, 2, 3, 4, 5], 6).unwrap();
        runner.test_combination(&combination, &TestOptions::default()).unwrap();
        runner.test_combination(&combination, &TestOptions::default()).unwrap();
        assert_eq!(latency.len(), 2);
    }
}
