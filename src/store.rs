use duckdb::{params, Connection};
use log::info;

use crate::eicstats::LoginEvent;
use crate::error::StatsError;

/// Event name recorded for login timestamps.
pub const LOGIN_EVENT: &str = "login";

const EVENT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%:z";

/// The two operations the loader needs from a backing store.
pub trait UsageEventStore {
    fn has_event(
        &self,
        environment: &str,
        event_name: &str,
        event: &LoginEvent,
    ) -> Result<bool, StatsError>;

    fn insert_event(
        &mut self,
        environment: &str,
        event_name: &str,
        event: &LoginEvent,
    ) -> Result<(), StatsError>;
}

/// Usage events in a DuckDB database.  The table is created on open.
/// The primary key covers the full identity tuple, so a concurrent
/// double-insert surfaces as a store error instead of a duplicate row.
pub struct DuckDbUsageStore {
    conn: Connection,
}

impl DuckDbUsageStore {
    pub fn open(path: &str) -> Result<DuckDbUsageStore, StatsError> {
        DuckDbUsageStore::with_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<DuckDbUsageStore, StatsError> {
        DuckDbUsageStore::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<DuckDbUsageStore, StatsError> {
        conn.execute_batch(
            r"
CREATE TABLE IF NOT EXISTS usage_events (
    environment_name VARCHAR NOT NULL,
    event_name VARCHAR NOT NULL,
    user_id VARCHAR NOT NULL,
    event_time TIMESTAMPTZ NOT NULL,
    PRIMARY KEY (environment_name, event_name, user_id, event_time)
);
",
        )?;
        Ok(DuckDbUsageStore { conn })
    }
}

impl UsageEventStore for DuckDbUsageStore {
    fn has_event(
        &self,
        environment: &str,
        event_name: &str,
        event: &LoginEvent,
    ) -> Result<bool, StatsError> {
        let count: i64 = self.conn.query_row(
            r"
SELECT count(*)
FROM usage_events
WHERE environment_name = ?
AND event_name = ?
AND user_id = ?
AND event_time = CAST(? AS TIMESTAMPTZ);
",
            params![
                environment,
                event_name,
                event.user_id,
                event.login_timestamp.format(EVENT_TIME_FORMAT).to_string()
            ],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    fn insert_event(
        &mut self,
        environment: &str,
        event_name: &str,
        event: &LoginEvent,
    ) -> Result<(), StatsError> {
        self.conn.execute(
            r"
INSERT INTO usage_events (environment_name, event_name, user_id, event_time)
VALUES (?, ?, ?, CAST(? AS TIMESTAMPTZ));
",
            params![
                environment,
                event_name,
                event.user_id,
                event.login_timestamp.format(EVENT_TIME_FORMAT).to_string()
            ],
        )?;
        Ok(())
    }
}

#[derive(Debug, Default, PartialEq)]
pub struct LoadOutcome {
    pub inserted: usize,
    pub skipped: usize,
}

/// Insert every event not already present in the store.  Re-running over
/// the same remote data leaves the stored row set unchanged.
pub fn load_events<I>(
    store: &mut dyn UsageEventStore,
    environment: &str,
    events: I,
) -> Result<LoadOutcome, StatsError>
where
    I: IntoIterator<Item = Result<LoginEvent, StatsError>>,
{
    let mut outcome = LoadOutcome::default();
    for event in events {
        let event = event?;
        if store.has_event(environment, LOGIN_EVENT, &event)? {
            info!(
                "login for {} at {} already recorded, skipping",
                event.user_id, event.login_timestamp
            );
            outcome.skipped += 1;
        } else {
            store.insert_event(environment, LOGIN_EVENT, &event)?;
            outcome.inserted += 1;
        }
    }
    Ok(outcome)
}
