use std::fs;
use std::path::{Path, PathBuf};

use crate::eicstats::LoginEvent;
use crate::error::StatsError;

const LOGIN_TIMESTAMPS_FILE: &str = "catalog-login-timestamps.csv";

/// Timestamp format used in the CSV output.
pub const CSV_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%:z";

/// Write the full event stream to `{prefix}catalog-login-timestamps.csv`
/// in `folder`, overwriting any previous snapshot.  Returns the file path
/// and the number of rows written.
pub fn write_login_timestamps<I>(
    folder: &Path,
    prefix: &str,
    events: I,
) -> Result<(PathBuf, usize), StatsError>
where
    I: IntoIterator<Item = Result<LoginEvent, StatsError>>,
{
    fs::create_dir_all(folder)?;
    let path = folder.join(format!("{}{}", prefix, LOGIN_TIMESTAMPS_FILE));
    let mut wtr = csv::Writer::from_path(&path)?;
    wtr.write_record(["user_id", "login_timestamp"])?;
    let mut count = 0;
    for event in events {
        let event = event?;
        let timestamp = event.login_timestamp.format(CSV_TIMESTAMP_FORMAT).to_string();
        wtr.write_record([event.user_id.as_str(), timestamp.as_str()])?;
        count += 1;
    }
    wtr.flush()?;
    Ok((path, count))
}

#[cfg(test)]
mod tests {
    use std::env;

    use super::*;
    use crate::eicstats::parse_login_timestamp;

    fn event(user_id: &str, raw: &str) -> Result<LoginEvent, StatsError> {
        Ok(LoginEvent {
            user_id: user_id.to_string(),
            login_timestamp: parse_login_timestamp(raw)?,
        })
    }

    fn scratch_folder(name: &str) -> PathBuf {
        env::temp_dir().join(format!("catstats-{}-{}", name, std::process::id()))
    }

    #[test]
    fn round_trips_through_the_file() -> Result<(), StatsError> {
        let folder = scratch_folder("round-trip");
        let events = vec![
            event("alice", "Tue Jan 02 15:04:05 EST 2024"),
            event("bob", "Tue Jan 02 08:15:30 UTC 2024"),
            event("alice", "Wed Jan 03 09:00:00 EST 2024"),
        ];
        let (path, count) = write_login_timestamps(&folder, "", events)?;
        assert_eq!(count, 3);
        assert_eq!(path, folder.join("catalog-login-timestamps.csv"));

        let mut rdr = csv::Reader::from_path(&path)?;
        assert_eq!(
            rdr.headers()?,
            &csv::StringRecord::from(vec!["user_id", "login_timestamp"])
        );
        let rows: Vec<(String, String)> = rdr
            .records()
            .map(|r| {
                let r = r.unwrap();
                (r[0].to_string(), r[1].to_string())
            })
            .collect();
        assert_eq!(
            rows,
            vec![
                ("alice".to_string(), "2024-01-02T15:04:05-05:00".to_string()),
                ("bob".to_string(), "2024-01-02T08:15:30+00:00".to_string()),
                ("alice".to_string(), "2024-01-03T09:00:00-05:00".to_string()),
            ]
        );
        Ok(())
    }

    #[test]
    fn overwrites_the_previous_snapshot() -> Result<(), StatsError> {
        let folder = scratch_folder("overwrite");
        write_login_timestamps(
            &folder,
            "dev-",
            vec![
                event("alice", "Tue Jan 02 15:04:05 EST 2024"),
                event("bob", "Tue Jan 02 16:00:00 EST 2024"),
            ],
        )?;
        let (path, count) =
            write_login_timestamps(&folder, "dev-", vec![event("carol", "Wed Jan 03 07:45:00 EST 2024")])?;
        assert_eq!(count, 1);
        assert_eq!(path, folder.join("dev-catalog-login-timestamps.csv"));

        let mut rdr = csv::Reader::from_path(&path)?;
        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], "carol");
        Ok(())
    }

    #[test]
    fn bad_event_fails_the_write() {
        let folder = scratch_folder("bad-event");
        let events = vec![
            event("alice", "Tue Jan 02 15:04:05 EST 2024"),
            event("bob", "Tue Jan 02 16:00:00 QQQ 2024"),
        ];
        let res = write_login_timestamps(&folder, "", events);
        assert!(matches!(res, Err(StatsError::Timestamp { .. })));
    }
}
