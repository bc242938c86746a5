use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::Deserialize;

use crate::error::StatsError;

/// One recorded instance of a user authenticating against the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginEvent {
    pub user_id: String,
    pub login_timestamp: DateTime<FixedOffset>,
}

/// The usage statistics payload returned by the `eicstats` endpoint.
/// Only the login activity branch is modeled; everything else in the
/// document is ignored.
#[derive(Debug, Deserialize)]
pub struct UsageStatsDocument {
    #[serde(rename = "UsageStats")]
    usage_stats: UsageStats,
}

#[derive(Debug, Deserialize)]
struct UsageStats {
    #[serde(rename = "UserActivity")]
    user_activity: UserActivity,
}

#[derive(Debug, Deserialize)]
struct UserActivity {
    #[serde(rename = "loginActivity")]
    login_activity: LoginActivity,
}

#[derive(Debug, Deserialize)]
struct LoginActivity {
    #[serde(rename = "edcLoginStats")]
    edc_login_stats: EdcLoginStats,
}

#[derive(Debug, Deserialize)]
struct EdcLoginStats {
    #[serde(rename = "day", default)]
    days: Vec<DayStats>,
}

#[derive(Debug, Deserialize)]
struct DayStats {
    #[serde(rename = "userLoginTimestamps", default)]
    user_login_timestamps: Vec<UserLoginTimestamps>,
}

#[derive(Debug, Deserialize)]
struct UserLoginTimestamps {
    #[serde(rename = "userId")]
    user_id: String,
    #[serde(rename = "loginTimestamp", default)]
    login_timestamps: Vec<String>,
}

impl UsageStatsDocument {
    pub fn from_xml(text: &str) -> Result<UsageStatsDocument, StatsError> {
        Ok(quick_xml::de::from_str(text)?)
    }

    /// Flatten the nested day/user/timestamp structure into a single pass
    /// of login events, in source order.  A bad timestamp string surfaces
    /// as an `Err` item and fails the run at the consuming sink.
    pub fn login_events(
        &self,
    ) -> impl Iterator<Item = Result<LoginEvent, StatsError>> + '_ {
        self.usage_stats
            .user_activity
            .login_activity
            .edc_login_stats
            .days
            .iter()
            .flat_map(|day| day.user_login_timestamps.iter())
            .flat_map(|group| {
                group.login_timestamps.iter().map(move |raw| {
                    parse_login_timestamp(raw).map(|login_timestamp| LoginEvent {
                        user_id: group.user_id.clone(),
                        login_timestamp,
                    })
                })
            })
    }
}

/// Parse a login timestamp like `Tue Jan 02 15:04:05 EST 2024`.
///
/// The timezone abbreviation is resolved with a fixed table instead of the
/// local timezone database, so the same input parses the same everywhere.
pub fn parse_login_timestamp(raw: &str) -> Result<DateTime<FixedOffset>, StatsError> {
    let fields: Vec<&str> = raw.split_whitespace().collect();
    if fields.len() != 6 {
        return Err(timestamp_error(raw, "expected 6 whitespace-separated fields"));
    }
    let offset = zone_offset(fields[4]).ok_or_else(|| {
        timestamp_error(
            raw,
            &format!("unknown timezone abbreviation '{}'", fields[4]),
        )
    })?;
    // Day-of-week, date and time with the zone token removed.
    let local = format!(
        "{} {} {} {} {}",
        fields[0], fields[1], fields[2], fields[3], fields[5]
    );
    let naive = NaiveDateTime::parse_from_str(&local, "%a %b %d %H:%M:%S %Y")
        .map_err(|e| timestamp_error(raw, &e.to_string()))?;
    naive
        .and_local_timezone(offset)
        .single()
        .ok_or_else(|| timestamp_error(raw, "ambiguous local time"))
}

fn timestamp_error(raw: &str, reason: &str) -> StatsError {
    StatsError::Timestamp {
        value: raw.to_string(),
        reason: reason.to_string(),
    }
}

fn zone_offset(abbreviation: &str) -> Option<FixedOffset> {
    let offset = |seconds: i32| FixedOffset::east_opt(seconds);
    let hours = |h: i32| offset(h * 3600);
    match abbreviation {
        "UTC" | "GMT" | "UT" | "Z" => hours(0),
        "EST" => hours(-5),
        "EDT" => hours(-4),
        "CST" => hours(-6),
        "CDT" => hours(-5),
        "MST" => hours(-7),
        "MDT" => hours(-6),
        "PST" => hours(-8),
        "PDT" => hours(-7),
        "AKST" => hours(-9),
        "AKDT" => hours(-8),
        "HST" => hours(-10),
        "BST" => hours(1),
        "WET" => hours(0),
        "WEST" => hours(1),
        "CET" => hours(1),
        "CEST" => hours(2),
        "EET" => hours(2),
        "EEST" => hours(3),
        "IST" => offset(5 * 3600 + 1800),
        _ => None,
    }
}
