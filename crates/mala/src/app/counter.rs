//! In-memory authority for today's running tap total.

use time::Date;

use crate::app::{AppEvent, AppServices, SessionRepository};
use crate::domain::session;

/// Owns the current day's tap count and translates transitions into
/// repository writes, cycle-complete events, and goal-reached events.
pub struct CounterController {
    date: Date,
    goal: u32,
    taps: u32,
}

impl CounterController {
    /// Builds the controller for today's date.
    ///
    /// The initial count comes from the in-memory collection when present,
    /// then from the legacy same-day local key, and otherwise starts at 0.
    pub async fn new(repository: &SessionRepository, services: &AppServices, goal: u32) -> Self {
        let date = session::today();
        let taps = match repository.get_session_data(date) {
            Some(record) => record.taps,
            None => legacy_day_taps(services, date).await,
        };

        Self {
            date,
            goal: goal.max(1),
            taps,
        }
    }

    /// Returns the date this controller is counting for.
    pub fn date(&self) -> Date {
        self.date
    }

    /// Returns the current tap total.
    pub fn taps(&self) -> u32 {
        self.taps
    }

    /// Returns the configured daily goal in cycles.
    pub fn goal(&self) -> u32 {
        self.goal
    }

    /// Returns the completed cycles for the current count.
    pub fn completed_cycles(&self) -> u32 {
        session::completed_cycles(self.taps)
    }

    /// Returns the tap progress within the current cycle.
    pub fn cycle_progress(&self) -> u32 {
        session::cycle_progress(self.taps)
    }

    /// Updates the daily goal; a goal below one cycle is raised to one.
    pub fn set_goal(&mut self, goal: u32) {
        self.goal = goal.max(1);
    }

    /// Records one tap and persists the new count.
    ///
    /// Crossing a cycle boundary emits one cycle-complete event; crossing
    /// the daily goal for the first time additionally emits one goal-reached
    /// event. Events are fire-and-forget and never fail the transition.
    ///
    /// # Errors
    /// Returns an error when the local write fails; remote failure is
    /// swallowed by the repository.
    pub async fn increment(
        &mut self,
        repository: &mut SessionRepository,
        services: &AppServices,
    ) -> Result<(), String> {
        self.roll_to_today(repository);

        let previous_cycles = session::completed_cycles(self.taps);
        self.taps += 1;
        let new_cycles = session::completed_cycles(self.taps);

        self.persist(repository, services).await?;

        services.emit_app_event(AppEvent::CountChanged {
            japs: new_cycles,
            taps: self.taps,
        });
        if new_cycles > previous_cycles {
            services.emit_app_event(AppEvent::CycleCompleted { japs: new_cycles });

            if new_cycles >= self.goal && previous_cycles < self.goal {
                services.emit_app_event(AppEvent::GoalReached { goal: self.goal });
            }
        }

        Ok(())
    }

    /// Removes one tap and persists the new count.
    ///
    /// At zero this is a no-op that issues no repository write.
    ///
    /// # Errors
    /// Returns an error when the local write fails.
    pub async fn decrement(
        &mut self,
        repository: &mut SessionRepository,
        services: &AppServices,
    ) -> Result<(), String> {
        self.roll_to_today(repository);

        if self.taps == 0 {
            return Ok(());
        }

        self.taps -= 1;
        self.persist(repository, services).await?;

        services.emit_app_event(AppEvent::CountChanged {
            japs: session::completed_cycles(self.taps),
            taps: self.taps,
        });

        Ok(())
    }

    /// Resets today's count to zero.
    ///
    /// A reset still writes through (taps 0, japs 0) so every store layer
    /// is cleared, and removes the legacy same-day key.
    ///
    /// # Errors
    /// Returns an error when the local write fails.
    pub async fn reset(
        &mut self,
        repository: &mut SessionRepository,
        services: &AppServices,
    ) -> Result<(), String> {
        self.roll_to_today(repository);
        self.taps = 0;

        repository.save(services, self.date, 0, 0).await?;
        services
            .db()
            .delete_setting(&session::legacy_day_key(self.date))
            .await?;
        services.notify_store_changed();

        services.emit_app_event(AppEvent::CountChanged { japs: 0, taps: 0 });

        Ok(())
    }

    /// Re-addresses the controller to today's key when the date rolled over.
    fn roll_to_today(&mut self, repository: &SessionRepository) {
        let today = session::today();
        if today == self.date {
            return;
        }

        self.date = today;
        self.taps = repository
            .get_session_data(today)
            .map_or(0, |record| record.taps);
    }

    async fn persist(
        &self,
        repository: &mut SessionRepository,
        services: &AppServices,
    ) -> Result<(), String> {
        let japs = session::completed_cycles(self.taps);
        repository.save(services, self.date, self.taps, japs).await?;

        // Legacy same-day backup key, written on every effective transition.
        services
            .db()
            .upsert_setting(&session::legacy_day_key(self.date), &self.taps.to_string())
            .await?;
        services.notify_store_changed();

        Ok(())
    }
}

/// Reads the legacy same-day fallback key, defaulting to zero.
async fn legacy_day_taps(services: &AppServices, date: Date) -> u32 {
    services
        .db()
        .get_setting(&session::legacy_day_key(date))
        .await
        .unwrap_or(None)
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(0)
}
