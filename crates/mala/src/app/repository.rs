//! Single logical view over the local and remote per-day session stores.

use time::{Date, Month};

use crate::app::AppServices;
use crate::domain::session::{self, SessionRecord};
use crate::infra::remote::RemoteSessionRow;

/// Outcome tag for the best-effort remote half of a [`SessionRepository::save`].
///
/// The local write and in-memory update succeed independently of this tag;
/// callers use it only to surface diagnostics.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RemoteWriteStatus {
    Synced,
    Failed,
}

impl RemoteWriteStatus {
    /// Returns whether the remote store accepted the write.
    pub fn is_synced(self) -> bool {
        matches!(self, Self::Synced)
    }
}

/// Reconciles the local durable store and the remote session store into one
/// in-memory collection with at most one record per date.
#[derive(Default)]
pub struct SessionRepository {
    sessions: Vec<SessionRecord>,
}

impl SessionRepository {
    /// Creates an empty repository; call [`Self::load`] to fill it.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the in-memory collection with the user's remote records.
    ///
    /// When no user is signed in the collection is left untouched. A remote
    /// failure also leaves the collection as last-known; the error is
    /// reported so callers can surface diagnostics, but it is never fatal.
    ///
    /// # Errors
    /// Returns an error when the remote load fails.
    pub async fn load(&mut self, services: &AppServices) -> Result<(), String> {
        let Some(user_id) = services.identity().current_user() else {
            return Ok(());
        };

        match services.remote_store().load_sessions(user_id).await {
            Ok(rows) => {
                self.sessions = rows
                    .iter()
                    .filter_map(|row| {
                        let date = session::parse_date_key(&row.date).ok()?;

                        Some(SessionRecord {
                            date,
                            taps: clamp_count(row.taps),
                            japs: clamp_count(row.japs),
                        })
                    })
                    .collect();

                Ok(())
            }
            Err(error) => {
                tracing::warn!(%error, "remote session load failed; keeping last-known collection");

                Err(error)
            }
        }
    }

    /// Writes one day's counts through every store layer.
    ///
    /// The remote upsert on `(user_id, date)` is attempted first and is
    /// strictly best-effort; regardless of its outcome the day row is
    /// written to the local durable store and the in-memory record for that
    /// date is replaced. After a successful return, memory and the local
    /// store agree on the day's value even when the remote is unreachable.
    ///
    /// # Errors
    /// Returns an error only when the local write fails; remote failure is
    /// reported through the returned [`RemoteWriteStatus`].
    pub async fn save(
        &mut self,
        services: &AppServices,
        date: Date,
        taps: u32,
        japs: u32,
    ) -> Result<RemoteWriteStatus, String> {
        let date_key = session::date_key(date);

        let remote_status = match services.identity().current_user() {
            Some(user_id) => {
                let row = RemoteSessionRow {
                    date: date_key.clone(),
                    taps: i64::from(taps),
                    japs: i64::from(japs),
                };

                match services.remote_store().upsert_session(user_id, row).await {
                    Ok(()) => RemoteWriteStatus::Synced,
                    Err(error) => {
                        tracing::warn!(
                            date = %date_key,
                            %error,
                            "remote session upsert failed; keeping local copy"
                        );

                        RemoteWriteStatus::Failed
                    }
                }
            }
            None => {
                tracing::debug!(date = %date_key, "signed out; skipping remote session upsert");

                RemoteWriteStatus::Failed
            }
        };

        services
            .db()
            .upsert_day_count(&date_key, i64::from(taps), i64::from(japs))
            .await?;

        self.sessions.retain(|record| record.date != date);
        self.sessions.push(SessionRecord { date, taps, japs });

        Ok(remote_status)
    }

    /// Returns the in-memory record for one date. Pure read, no I/O.
    pub fn get_session_data(&self, date: Date) -> Option<&SessionRecord> {
        self.sessions.iter().find(|record| record.date == date)
    }

    /// Returns every record in the collection, unordered.
    pub fn sessions(&self) -> &[SessionRecord] {
        &self.sessions
    }

    /// Returns the completed cycles recorded on one date.
    pub fn cycles_on(&self, date: Date) -> u32 {
        self.get_session_data(date).map_or(0, |record| record.japs)
    }

    /// Returns the completed cycles recorded in one calendar month.
    pub fn cycles_in_month(&self, year: i32, month: Month) -> u32 {
        self.sessions
            .iter()
            .filter(|record| record.date.year() == year && record.date.month() == month)
            .map(|record| record.japs)
            .sum()
    }

    /// Returns the completed cycles recorded in one calendar year.
    pub fn cycles_in_year(&self, year: i32) -> u32 {
        self.sessions
            .iter()
            .filter(|record| record.date.year() == year)
            .map(|record| record.japs)
            .sum()
    }
}

/// Clamps a remote count into the non-negative range the engine works in.
fn clamp_count(count: i64) -> u32 {
    u32::try_from(count.max(0)).unwrap_or(u32::MAX)
}
