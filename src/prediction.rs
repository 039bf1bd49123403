use chrono::NaiveDate;

use crate::models::{Averages, CycleRecord, DerivedCycle, Predictions, Statistics};

/// Phase length substituted when a record has no ovulation date, so that
/// histories without any logged ovulations still average out to something.
pub const DEFAULT_OVULATION_LENGTH: i64 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StatsError {
    /// Fewer than two recorded cycles; one start date gives no cycle length.
    #[error("at least two recorded cycles are needed")]
    InsufficientHistory,
}

/// Annotate each record with the length of the cycle that preceded it and
/// the length of its own ovulation phase.
///
/// Records are ordered ascending by start date; the sort is stable, so
/// records sharing a start date keep their input order. The earliest record
/// has no preceding start to diff against and gets no `length`.
pub fn derive_cycles(records: &[CycleRecord]) -> Vec<DerivedCycle> {
    let mut ordered: Vec<&CycleRecord> = records.iter().collect();
    ordered.sort_by_key(|r| r.start_date);

    ordered
        .iter()
        .enumerate()
        .map(|(i, record)| DerivedCycle {
            id: record.id,
            start_date: record.start_date,
            ovulation_date: record.ovulation_date,
            length: if i == 0 {
                None
            } else {
                Some((record.start_date - ordered[i - 1].start_date).num_days())
            },
            // Counting the start date itself as day 1.
            ovulation_length: record
                .ovulation_date
                .map(|ovulation| (ovulation - record.start_date).num_days() + 1),
        })
        .collect()
}

/// Average cycle length and ovulation-phase length across a history.
/// Requires at least 2 records; zero or one record is the same failure.
pub fn averages(records: &[CycleRecord]) -> Result<Averages, StatsError> {
    if records.len() < 2 {
        return Err(StatsError::InsufficientHistory);
    }

    let derived = derive_cycles(records);

    let lengths: Vec<i64> = derived.iter().filter_map(|c| c.length).collect();
    let ovulation_lengths: Vec<i64> = derived
        .iter()
        .map(|c| c.ovulation_length.unwrap_or(DEFAULT_OVULATION_LENGTH))
        .collect();

    Ok(Averages {
        avg_length: rounded_mean(&lengths),
        avg_ovulation: rounded_mean(&ovulation_lengths),
    })
}

/// Project the next period and ovulation from the most recent record.
///
/// `today` is supplied by the caller so results are reproducible with fixed
/// dates. `days_to_next` goes negative once the predicted period is overdue;
/// `days_to_ovul` instead drops to `None` when the predicted date has
/// passed, and both ovulation fields are `None` when the latest record
/// already carries a real ovulation date.
pub fn predict(latest: &CycleRecord, averages: &Averages, today: NaiveDate) -> Predictions {
    let day = (today - latest.start_date).num_days() + 1;
    let next_period = latest.start_date + chrono::Duration::days(averages.avg_length);
    let days_to_next = (next_period - today).num_days();

    let (next_ovulation, days_to_ovul) = if latest.ovulation_date.is_some() {
        // The real date is already known, nothing to predict.
        (None, None)
    } else {
        let next = latest.start_date + chrono::Duration::days(averages.avg_ovulation);
        let days = (next - today).num_days();
        (Some(next), (days >= 0).then_some(days))
    };

    Predictions {
        day,
        next_period,
        days_to_next,
        next_ovulation,
        days_to_ovul,
    }
}

/// Full statistics for one owner's history: averages plus a projection from
/// the most recent record. Fails as a whole on insufficient history; there
/// are no partial results.
pub fn statistics(records: &[CycleRecord], today: NaiveDate) -> Result<Statistics, StatsError> {
    let averages = averages(records)?;
    let latest = records
        .iter()
        .max_by_key(|r| r.start_date)
        .ok_or(StatsError::InsufficientHistory)?;

    Ok(Statistics {
        averages,
        predictions: predict(latest, &averages, today),
    })
}

/// Mean rounded to the nearest whole day; halves round away from zero.
fn rounded_mean(values: &[i64]) -> i64 {
    if values.is_empty() {
        return 0;
    }
    (values.iter().sum::<i64>() as f64 / values.len() as f64).round() as i64
}
