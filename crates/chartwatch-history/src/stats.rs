use std::collections::{BTreeMap, HashMap};

use chartwatch_types::{HistoryEntry, HistoryStatus};
use chrono::{DateTime, Duration, Local, TimeZone, Timelike, Utc};
use serde::Serialize;

/// Confidence above which a detection counts as successful
const SUCCESS_CONFIDENCE: f64 = 0.8;
const TOP_PATIENTS: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStats {
    pub total: usize,
    pub recent_activity: RecentActivity,
    pub performance: Performance,
    pub by_source: BTreeMap<String, SourceStats>,
    pub time_analysis: TimeAnalysis,
    pub patient_analysis: PatientAnalysis,
    pub errors: ErrorStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentActivity {
    pub last_24_hours: usize,
    pub last_7_days: usize,
    pub average_per_day: u64,
}

/// All values are percentages
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Performance {
    pub success_rate: f64,
    pub interaction_rate: f64,
    pub average_confidence: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceStats {
    pub total: usize,
    pub success_rate: f64,
    pub average_confidence: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeAnalysis {
    pub hourly_distribution: [usize; 24],
    pub peak_hour: usize,
    pub quiet_hour: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientAnalysis {
    pub unique_patients: usize,
    pub average_detections_per_patient: f64,
    pub top_patients: Vec<PatientFrequency>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientFrequency {
    pub patient_id: String,
    pub display_name: String,
    pub count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorStats {
    pub count: usize,
    pub rate: f64,
}

/// Aggregate `entries` (newest first) as of `now`, bucketing hours in local time
pub fn compute_stats(entries: &[HistoryEntry], now: DateTime<Utc>) -> HistoryStats {
    compute_stats_in(entries, now, &Local)
}

/// Same as [`compute_stats`] with an explicit timezone for the hourly buckets
pub fn compute_stats_in<Tz: TimeZone>(
    entries: &[HistoryEntry],
    now: DateTime<Utc>,
    tz: &Tz,
) -> HistoryStats {
    let total = entries.len();

    HistoryStats {
        total,
        recent_activity: recent_activity(entries, now),
        performance: Performance {
            success_rate: success_rate(entries),
            interaction_rate: percent(
                entries.iter().filter(|e| e.status.is_interaction()).count(),
                total,
            ),
            average_confidence: average_confidence(entries),
        },
        by_source: by_source(entries),
        time_analysis: time_analysis(entries, tz),
        patient_analysis: patient_analysis(entries),
        errors: {
            let count = entries
                .iter()
                .filter(|e| e.status == HistoryStatus::Error)
                .count();
            ErrorStats {
                count,
                rate: percent(count, total),
            }
        },
    }
}

fn percent(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

fn success_rate<'a>(entries: impl IntoIterator<Item = &'a HistoryEntry>) -> f64 {
    let (hits, total) = entries.into_iter().fold((0, 0), |(hits, total), e| {
        (hits + usize::from(e.match_confidence > SUCCESS_CONFIDENCE), total + 1)
    });
    percent(hits, total)
}

fn average_confidence<'a>(entries: impl IntoIterator<Item = &'a HistoryEntry>) -> f64 {
    let (sum, total) = entries
        .into_iter()
        .fold((0.0, 0usize), |(sum, total), e| (sum + e.match_confidence, total + 1));
    if total == 0 {
        0.0
    } else {
        sum / total as f64 * 100.0
    }
}

fn recent_activity(entries: &[HistoryEntry], now: DateTime<Utc>) -> RecentActivity {
    let day_ago = now - Duration::hours(24);
    let week_ago = now - Duration::days(7);

    let last_24_hours = entries
        .iter()
        .filter(|e| e.record.created_at > day_ago)
        .count();
    let last_7_days = entries
        .iter()
        .filter(|e| e.record.created_at > week_ago)
        .count();

    RecentActivity {
        last_24_hours,
        last_7_days,
        average_per_day: (last_7_days as f64 / 7.0).round() as u64,
    }
}

fn by_source(entries: &[HistoryEntry]) -> BTreeMap<String, SourceStats> {
    let mut groups: BTreeMap<&str, Vec<&HistoryEntry>> = BTreeMap::new();
    for entry in entries {
        groups.entry(&entry.record.source).or_default().push(entry);
    }

    groups
        .into_iter()
        .map(|(source, group)| {
            let stats = SourceStats {
                total: group.len(),
                success_rate: success_rate(group.iter().copied()),
                average_confidence: average_confidence(group.iter().copied()),
            };
            (source.to_string(), stats)
        })
        .collect()
}

fn time_analysis<Tz: TimeZone>(entries: &[HistoryEntry], tz: &Tz) -> TimeAnalysis {
    let mut hourly_distribution = [0usize; 24];
    for entry in entries {
        let hour = entry.record.created_at.with_timezone(tz).hour() as usize;
        hourly_distribution[hour] += 1;
    }

    // Ties resolve to the earliest hour
    let mut peak_hour = 0;
    let mut quiet_hour = 0;
    for (hour, &count) in hourly_distribution.iter().enumerate() {
        if count > hourly_distribution[peak_hour] {
            peak_hour = hour;
        }
        if count < hourly_distribution[quiet_hour] {
            quiet_hour = hour;
        }
    }

    TimeAnalysis {
        hourly_distribution,
        peak_hour,
        quiet_hour,
    }
}

fn patient_analysis(entries: &[HistoryEntry]) -> PatientAnalysis {
    // Entries are newest first, so the first name seen per patient is the latest one
    let mut counts: HashMap<&str, (usize, &str)> = HashMap::new();
    for entry in entries {
        counts
            .entry(&entry.record.patient_id)
            .or_insert((0, entry.record.patient_display_name.as_str()))
            .0 += 1;
    }

    let unique_patients = counts.len();
    let average_detections_per_patient = if unique_patients == 0 {
        0.0
    } else {
        entries.len() as f64 / unique_patients as f64
    };

    let mut top_patients: Vec<PatientFrequency> = counts
        .into_iter()
        .map(|(patient_id, (count, display_name))| PatientFrequency {
            patient_id: patient_id.to_string(),
            display_name: display_name.to_string(),
            count,
        })
        .collect();
    top_patients.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.patient_id.cmp(&b.patient_id))
    });
    top_patients.truncate(TOP_PATIENTS);

    PatientAnalysis {
        unique_patients,
        average_detections_per_patient,
        top_patients,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::store::tests::entry;

    fn reference() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 12, 0, 0).unwrap()
    }

    fn with(
        mut entry: HistoryEntry,
        source: &str,
        confidence: f64,
        status: HistoryStatus,
    ) -> HistoryEntry {
        entry.record.source = source.to_string();
        entry.match_confidence = confidence;
        entry.status = status;
        entry
    }

    #[test]
    fn test_empty_history_has_zero_rates() {
        let stats = compute_stats_in(&[], reference(), &Utc);

        assert_eq!(stats.total, 0);
        assert_eq!(stats.performance.success_rate, 0.0);
        assert_eq!(stats.performance.interaction_rate, 0.0);
        assert_eq!(stats.performance.average_confidence, 0.0);
        assert_eq!(stats.errors.rate, 0.0);
        assert_eq!(stats.patient_analysis.average_detections_per_patient, 0.0);
        assert_eq!(stats.recent_activity.average_per_day, 0);
        assert!(stats.by_source.is_empty());
        assert_eq!(stats.time_analysis.peak_hour, 0);
        assert_eq!(stats.time_analysis.quiet_hour, 0);
        assert!(!stats.performance.success_rate.is_nan());
    }

    #[test]
    fn test_rates_and_sources() {
        let entries = vec![
            with(entry("n-4", "pat-1", 0), "screen", 1.0, HistoryStatus::ClickedAlerts),
            with(entry("n-3", "pat-2", 10), "screen", 0.5, HistoryStatus::Delivered),
            with(entry("n-2", "pat-1", 20), "window", 0.9, HistoryStatus::ClickedHistory),
            with(entry("n-1", "pat-3", 30), "window", 0.6, HistoryStatus::Error),
        ];

        let stats = compute_stats_in(&entries, reference(), &Utc);

        assert_eq!(stats.total, 4);
        assert_eq!(stats.performance.success_rate, 50.0);
        assert_eq!(stats.performance.interaction_rate, 50.0);
        assert!((stats.performance.average_confidence - 75.0).abs() < 1e-9);
        assert_eq!(stats.errors.count, 1);
        assert_eq!(stats.errors.rate, 25.0);

        let screen = &stats.by_source["screen"];
        assert_eq!(screen.total, 2);
        assert_eq!(screen.success_rate, 50.0);
        assert!((screen.average_confidence - 75.0).abs() < 1e-9);

        let window = &stats.by_source["window"];
        assert_eq!(window.total, 2);
        assert_eq!(window.success_rate, 50.0);

        let source_total: usize = stats.by_source.values().map(|s| s.total).sum();
        assert_eq!(source_total, stats.total);
    }

    #[test]
    fn test_recent_activity_windows() {
        let entries = vec![
            entry("n-4", "pat-1", 60),
            entry("n-3", "pat-1", 23 * 60),
            entry("n-2", "pat-1", 24 * 60),
            entry("n-1", "pat-1", 3 * 24 * 60),
            entry("n-0", "pat-1", 8 * 24 * 60),
        ];

        let stats = compute_stats_in(&entries, reference(), &Utc);

        // Exactly 24h old is not "within" the last 24 hours
        assert_eq!(stats.recent_activity.last_24_hours, 2);
        assert_eq!(stats.recent_activity.last_7_days, 4);
        assert_eq!(stats.recent_activity.average_per_day, 1);
    }

    #[test]
    fn test_hourly_distribution() {
        // reference is 12:00 UTC
        let entries = vec![
            entry("n-3", "pat-1", 0),
            entry("n-2", "pat-1", 30),
            entry("n-1", "pat-1", 5),
            entry("n-0", "pat-1", 3 * 60),
        ];

        let stats = compute_stats_in(&entries, reference(), &Utc);
        let hours = &stats.time_analysis.hourly_distribution;

        assert_eq!(hours.iter().sum::<usize>(), stats.total);
        assert_eq!(hours[12], 1);
        assert_eq!(hours[11], 2);
        assert_eq!(hours[9], 1);
        assert_eq!(stats.time_analysis.peak_hour, 11);
        assert_eq!(stats.time_analysis.quiet_hour, 0);
    }

    #[test]
    fn test_patient_frequency() {
        let mut entries = Vec::new();
        let counts = [
            ("pat-a", 4),
            ("pat-b", 1),
            ("pat-c", 3),
            ("pat-d", 2),
            ("pat-e", 2),
            ("pat-f", 1),
        ];
        let mut n = 0;
        for (patient, count) in counts {
            for _ in 0..count {
                entries.push(entry(&format!("n-{n}"), patient, n));
                n += 1;
            }
        }

        let stats = compute_stats_in(&entries, reference(), &Utc);
        let analysis = &stats.patient_analysis;

        assert_eq!(analysis.unique_patients, 6);
        assert!((analysis.average_detections_per_patient - 13.0 / 6.0).abs() < 1e-9);
        let top: Vec<_> = analysis
            .top_patients
            .iter()
            .map(|p| (p.patient_id.as_str(), p.count))
            .collect();
        assert_eq!(
            top,
            vec![("pat-a", 4), ("pat-c", 3), ("pat-d", 2), ("pat-e", 2), ("pat-b", 1)]
        );
        assert_eq!(analysis.top_patients[0].display_name, "Patient pat-a");
    }
}
