//! Aggregate statistics types
//!
//! Percentages are never carried independently of the weights: every
//! [`AggregateStats`] derives them through [`percent_split`] at construction.

use chrono::Weekday;
use serde::Serialize;

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

/// Short English label used for display
pub fn day_label(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}

/// Recognize an English or Indonesian day name, full or abbreviated
pub fn parse_day_label(raw: &str) -> Option<Weekday> {
    let prefix: String = raw.trim().chars().take(3).collect::<String>().to_lowercase();
    match prefix.as_str() {
        "mon" | "sen" => Some(Weekday::Mon),
        "tue" | "sel" => Some(Weekday::Tue),
        "wed" | "rab" => Some(Weekday::Wed),
        "thu" | "kam" => Some(Weekday::Thu),
        "fri" | "jum" => Some(Weekday::Fri),
        "sat" | "sab" => Some(Weekday::Sat),
        "sun" | "min" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Seven day buckets in fixed Monday..Sunday order
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct WeeklyActivity {
    amounts: [f64; 7],
}

impl WeeklyActivity {
    /// Add to a day's bucket
    pub fn add(&mut self, day: Weekday, amount: f64) {
        self.amounts[day.num_days_from_monday() as usize] += amount;
    }

    /// Amount recorded for a day
    pub fn amount(&self, day: Weekday) -> f64 {
        self.amounts[day.num_days_from_monday() as usize]
    }

    /// `(label, amount)` pairs, Monday first
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        WEEK.iter().map(move |day| (day_label(*day), self.amount(*day)))
    }

    /// Sum over the week
    pub fn total(&self) -> f64 {
        self.amounts.iter().sum()
    }
}

/// Round half up to a whole number (inputs are non-negative)
fn round_half_up(value: f64) -> u32 {
    (value + 0.5).floor().max(0.0) as u32
}

/// Split 100% between the organic and inorganic weights
///
/// Each side is rounded half-up. When the rounded pair does not sum to 100,
/// the larger bucket takes `100 - smaller` (organic on a tie). A zero total
/// yields `(0, 0)`.
pub fn percent_split(organic: f64, inorganic: f64) -> (u8, u8) {
    let organic = organic.max(0.0);
    let inorganic = inorganic.max(0.0);
    let total = organic + inorganic;
    if total <= 0.0 {
        return (0, 0);
    }

    let mut organic_pct = round_half_up(organic * 100.0 / total).min(100);
    let mut inorganic_pct = round_half_up(inorganic * 100.0 / total).min(100);

    if organic_pct + inorganic_pct != 100 {
        if organic >= inorganic {
            organic_pct = 100 - inorganic_pct;
        } else {
            inorganic_pct = 100 - organic_pct;
        }
    }

    (organic_pct as u8, inorganic_pct as u8)
}

/// Dashboard totals, category split, and weekly activity
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AggregateStats {
    total: f64,
    organic_weight: f64,
    inorganic_weight: f64,
    organic_percent: u8,
    inorganic_percent: u8,
    weekly_activity: WeeklyActivity,
    last_updated: Option<String>,
}

impl AggregateStats {
    /// Build stats, deriving the percentages from the weights
    pub fn new(
        total: f64,
        organic_weight: f64,
        inorganic_weight: f64,
        weekly_activity: WeeklyActivity,
    ) -> Self {
        let (organic_percent, inorganic_percent) =
            percent_split(organic_weight, inorganic_weight);
        Self {
            total,
            organic_weight,
            inorganic_weight,
            organic_percent,
            inorganic_percent,
            weekly_activity,
            last_updated: None,
        }
    }

    /// Attach the backend's last-updated marker
    pub fn with_last_updated(mut self, last_updated: Option<String>) -> Self {
        self.last_updated = last_updated;
        self
    }

    pub fn total(&self) -> f64 {
        self.total
    }

    pub fn organic_weight(&self) -> f64 {
        self.organic_weight
    }

    pub fn inorganic_weight(&self) -> f64 {
        self.inorganic_weight
    }

    pub fn organic_percent(&self) -> u8 {
        self.organic_percent
    }

    pub fn inorganic_percent(&self) -> u8 {
        self.inorganic_percent
    }

    pub fn weekly_activity(&self) -> &WeeklyActivity {
        &self.weekly_activity
    }

    pub fn last_updated(&self) -> Option<&str> {
        self.last_updated.as_deref()
    }

    /// Sum of the weekly buckets
    pub fn weekly_total(&self) -> f64 {
        self.weekly_activity.total()
    }

    /// Daily average over the week, rounded half-up
    pub fn weekly_average(&self) -> u32 {
        round_half_up(self.weekly_activity.total() / 7.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percent_split_exact() {
        assert_eq!(percent_split(6.0, 4.0), (60, 40));
        assert_eq!(percent_split(1.0, 1.0), (50, 50));
        assert_eq!(percent_split(5.0, 0.0), (100, 0));
    }

    #[test]
    fn test_percent_split_zero_total() {
        assert_eq!(percent_split(0.0, 0.0), (0, 0));
    }

    #[test]
    fn test_percent_split_larger_bucket_absorbs_overflow() {
        // 50.5 / 49.5 rounds to 51 + 50; organic is larger and gives back one point
        assert_eq!(percent_split(101.0, 99.0), (50, 50));
        // 49.5 / 50.5, inorganic larger
        assert_eq!(percent_split(99.0, 101.0), (50, 50));
    }

    #[test]
    fn test_percent_split_always_sums_to_100() {
        for organic in 0..=40 {
            for inorganic in 0..=40 {
                if organic + inorganic == 0 {
                    continue;
                }
                let (o, i) = percent_split(organic as f64 * 0.7, inorganic as f64 * 1.3);
                assert_eq!(o as u32 + i as u32, 100, "organic={organic} inorganic={inorganic}");
            }
        }
    }

    #[test]
    fn test_parse_day_label_languages() {
        assert_eq!(parse_day_label("Mon"), Some(Weekday::Mon));
        assert_eq!(parse_day_label("senin"), Some(Weekday::Mon));
        assert_eq!(parse_day_label("Jum'at"), Some(Weekday::Fri));
        assert_eq!(parse_day_label("Minggu"), Some(Weekday::Sun));
        assert_eq!(parse_day_label("-"), None);
    }

    #[test]
    fn test_weekly_activity_fixed_order() {
        let mut week = WeeklyActivity::default();
        week.add(Weekday::Sun, 3.0);
        week.add(Weekday::Mon, 1.0);
        let labels: Vec<_> = week.iter().map(|(label, _)| label).collect();
        assert_eq!(labels, vec!["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]);
        assert_eq!(week.iter().last(), Some(("Sun", 3.0)));
        assert_eq!(week.total(), 4.0);
    }

    #[test]
    fn test_weekly_average_rounds_half_up() {
        let mut week = WeeklyActivity::default();
        week.add(Weekday::Tue, 24.5);
        let stats = AggregateStats::new(24.5, 10.0, 14.5, week);
        assert_eq!(stats.weekly_total(), 24.5);
        // 24.5 / 7 = 3.5
        assert_eq!(stats.weekly_average(), 4);
    }
}
