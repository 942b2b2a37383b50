use std::collections::{BTreeMap, HashMap};
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{Datelike, NaiveDate};
use tracing::{debug, warn};

use crate::config::{COMPLEMENTARY_MAX, MAIN_MAX, MAIN_PICKS};
use crate::types::{number_bit, CacheStats, DateRange, RawDraw};

// ---------------------------------------------------------------------------
// Draw — normalized historical record, immutable once built
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Draw {
    /// ISO 8601 date; lexicographic order equals chronological order.
    pub date: String,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    /// Unix seconds at midnight UTC, used as the sort key.
    pub timestamp: i64,
    /// Sorted ascending.
    pub main_numbers: [u8; MAIN_PICKS],
    /// Bit `n` set for each main number `n` — membership is one AND.
    pub main_mask: u64,
    pub complementary: u8,
}

impl Draw {
    /// Normalizes a raw record. Returns the rejection reason on failure so
    /// the build loop can log it.
    fn from_raw(raw: &RawDraw) -> Result<Self, String> {
        let date = NaiveDate::parse_from_str(&raw.date, "%Y-%m-%d")
            .map_err(|_| format!("unparseable date '{}'", raw.date))?;

        if raw.main_numbers.len() != MAIN_PICKS {
            return Err(format!(
                "expected {MAIN_PICKS} main numbers, got {}",
                raw.main_numbers.len()
            ));
        }
        let mut main_mask = 0u64;
        for &n in &raw.main_numbers {
            if n < 1 || n > MAIN_MAX {
                return Err(format!("main number {n} out of range [1,{MAIN_MAX}]"));
            }
            let bit = number_bit(n);
            if main_mask & bit != 0 {
                return Err(format!("duplicate main number {n}"));
            }
            main_mask |= bit;
        }
        let complementary = raw.complementary_number;
        if complementary < 1 || complementary > COMPLEMENTARY_MAX {
            return Err(format!(
                "complementary number {complementary} out of range [1,{COMPLEMENTARY_MAX}]"
            ));
        }

        let mut main_numbers = [0u8; MAIN_PICKS];
        main_numbers.copy_from_slice(&raw.main_numbers);
        main_numbers.sort_unstable();

        let timestamp = date
            .and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .ok_or_else(|| format!("invalid midnight for date '{}'", raw.date))?;

        Ok(Self {
            date: raw.date.clone(),
            year: date.year(),
            month: date.month(),
            day: date.day(),
            timestamp,
            main_numbers,
            main_mask,
            complementary,
        })
    }
}

// ---------------------------------------------------------------------------
// CacheIndex — immutable, fully-built snapshot of all valid draws
// ---------------------------------------------------------------------------

pub struct CacheIndex {
    /// All valid draws, sorted by timestamp descending (most recent first).
    draws: Vec<Draw>,
    /// year → indices into `draws`, in `draws` order.
    by_year: BTreeMap<i32, Vec<usize>>,
    /// (year, month) → indices into `draws`.
    by_year_month: BTreeMap<(i32, u32), Vec<usize>>,
    /// date → index of the first draw seen for that date.
    by_date: HashMap<String, usize>,
    date_range: Option<DateRange>,
    built_at: u64,
    version: u64,
    dropped_records: u64,
}

impl CacheIndex {
    /// Full scan over the raw records. Invalid rows are dropped and counted,
    /// never fatal — the snapshot is built from the valid subset.
    pub fn build(raws: &[RawDraw], version: u64) -> Self {
        let mut draws = Vec::with_capacity(raws.len());
        let mut dropped_records = 0u64;

        for raw in raws {
            match Draw::from_raw(raw) {
                Ok(draw) => draws.push(draw),
                Err(reason) => {
                    dropped_records += 1;
                    debug!(date = %raw.date, %reason, "Dropping invalid draw record: {reason}");
                }
            }
        }
        if dropped_records > 0 {
            warn!(
                dropped = dropped_records,
                kept = draws.len(),
                "Draw normalization dropped {dropped_records} invalid records, kept {}",
                draws.len(),
            );
        }

        // Most recent first; date string tie-break keeps the order stable.
        draws.sort_unstable_by(|a, b| {
            b.timestamp.cmp(&a.timestamp).then_with(|| b.date.cmp(&a.date))
        });

        let mut by_year: BTreeMap<i32, Vec<usize>> = BTreeMap::new();
        let mut by_year_month: BTreeMap<(i32, u32), Vec<usize>> = BTreeMap::new();
        let mut by_date: HashMap<String, usize> = HashMap::with_capacity(draws.len());
        for (i, draw) in draws.iter().enumerate() {
            by_year.entry(draw.year).or_default().push(i);
            by_year_month.entry((draw.year, draw.month)).or_default().push(i);
            by_date.entry(draw.date.clone()).or_insert(i);
        }

        let date_range = match (draws.last(), draws.first()) {
            (Some(oldest), Some(newest)) => Some(DateRange {
                start: oldest.date.clone(),
                end: newest.date.clone(),
            }),
            _ => None,
        };

        Self {
            draws,
            by_year,
            by_year_month,
            by_date,
            date_range,
            built_at: now_ms(),
            version,
            dropped_records,
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            total_draws: self.draws.len() as u64,
            date_range: self.date_range.clone(),
            built_at: self.built_at,
            version: self.version,
            dropped_records: self.dropped_records,
        }
    }

    /// All draws, most recent first.
    pub fn draws(&self) -> &[Draw] {
        &self.draws
    }

    pub fn total_draws(&self) -> usize {
        self.draws.len()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn draw_on(&self, date: &str) -> Option<&Draw> {
        self.by_date.get(date).map(|&i| &self.draws[i])
    }

    pub fn draws_in_year(&self, year: i32) -> Vec<&Draw> {
        self.by_year
            .get(&year)
            .map(|ids| ids.iter().map(|&i| &self.draws[i]).collect())
            .unwrap_or_default()
    }

    pub fn draws_in_month(&self, year: i32, month: u32) -> Vec<&Draw> {
        self.by_year_month
            .get(&(year, month))
            .map(|ids| ids.iter().map(|&i| &self.draws[i]).collect())
            .unwrap_or_default()
    }

    /// year → draw count, ascending by year.
    pub fn year_counts(&self) -> BTreeMap<i32, u64> {
        self.by_year
            .iter()
            .map(|(&year, ids)| (year, ids.len() as u64))
            .collect()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
