use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::app::Result;
use crate::store::EventLog;
use crate::tips::definition::{TipCatalog, TipDefinition};
use crate::tips::rule::{ParamValue, RuleContext, Window};
use crate::tips::status::{DisplayFrequency, InvalidationReason, TipStatus};
use crate::tips::TipError;

const CHANGE_CAPACITY: usize = 64;

/// Notification sent to subscribers whenever engine state moves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TipChange {
    ParameterChanged { tip_id: String, name: String },
    Donated { event_id: String },
    Displayed { tip_id: String },
    Invalidated {
        tip_id: String,
        reason: InvalidationReason,
    },
    /// `None` after a full datastore reset.
    Reset { tip_id: Option<String> },
}

#[derive(Default)]
struct EngineState {
    parameters: HashMap<String, HashMap<String, ParamValue>>,
    donations: HashMap<String, Vec<DateTime<Utc>>>,
    statuses: HashMap<String, TipStatus>,
}

struct TipContext<'a> {
    parameters: Option<&'a HashMap<String, ParamValue>>,
    donations: &'a HashMap<String, Vec<DateTime<Utc>>>,
    now: DateTime<Utc>,
}

impl RuleContext for TipContext<'_> {
    fn parameter(&self, name: &str) -> Option<&ParamValue> {
        self.parameters.and_then(|p| p.get(name))
    }

    fn donations(&self, event_id: &str) -> &[DateTime<Utc>] {
        self.donations
            .get(event_id)
            .map(|d| d.as_slice())
            .unwrap_or(&[])
    }

    fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

pub struct TipEngine {
    catalog: TipCatalog,
    log: Arc<dyn EventLog>,
    frequency: DisplayFrequency,
    state: Mutex<EngineState>,
    changes: broadcast::Sender<TipChange>,
}

impl TipEngine {
    /// Build the engine, restoring donations and tip status from `log`.
    ///
    /// Parameters always start at their declared defaults.
    pub fn new(
        catalog: TipCatalog,
        log: Arc<dyn EventLog>,
        frequency: DisplayFrequency,
    ) -> Result<Self> {
        let mut state = EngineState::default();

        for tip in catalog.iter() {
            state
                .parameters
                .insert(tip.id.clone(), Self::default_parameters(tip));
        }
        for (event_id, at) in log.all_donations()? {
            state.donations.entry(event_id).or_default().push(at);
        }
        for history in state.donations.values_mut() {
            history.sort();
        }
        state.statuses = log.all_tip_statuses()?.into_iter().collect();

        debug!(
            tips = catalog.len(),
            events = state.donations.len(),
            "Tip engine loaded"
        );

        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Ok(Self {
            catalog,
            log,
            frequency,
            state: Mutex::new(state),
            changes,
        })
    }

    fn default_parameters(tip: &TipDefinition) -> HashMap<String, ParamValue> {
        tip.parameters
            .iter()
            .map(|p| (p.name.clone(), p.default.clone()))
            .collect()
    }

    // Every write leaves the state consistent, so a poisoned lock is still usable.
    fn state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, change: TipChange) {
        // No receivers is fine
        let _ = self.changes.send(change);
    }

    fn definition(&self, tip_id: &str) -> std::result::Result<&TipDefinition, TipError> {
        self.catalog
            .get(tip_id)
            .ok_or_else(|| TipError::UnknownTip(tip_id.to_string()))
    }

    pub fn catalog(&self) -> &TipCatalog {
        &self.catalog
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TipChange> {
        self.changes.subscribe()
    }

    // Parameters

    pub fn set_parameter(
        &self,
        tip_id: &str,
        name: &str,
        value: impl Into<ParamValue>,
    ) -> std::result::Result<(), TipError> {
        let value = value.into();
        let tip = self.definition(tip_id)?;
        let decl = tip
            .parameter_decl(name)
            .ok_or_else(|| TipError::UnknownParameter {
                tip: tip_id.to_string(),
                name: name.to_string(),
            })?;
        if decl.default.kind() != value.kind() {
            return Err(TipError::ParameterType {
                tip: tip_id.to_string(),
                name: name.to_string(),
                expected: decl.default.kind(),
            });
        }

        debug!(tip = tip_id, parameter = name, value = %value, "Parameter set");
        self.state()
            .parameters
            .entry(tip_id.to_string())
            .or_default()
            .insert(name.to_string(), value);

        self.notify(TipChange::ParameterChanged {
            tip_id: tip_id.to_string(),
            name: name.to_string(),
        });
        Ok(())
    }

    pub fn parameter(&self, tip_id: &str, name: &str) -> Option<ParamValue> {
        self.state()
            .parameters
            .get(tip_id)
            .and_then(|p| p.get(name))
            .cloned()
    }

    // Eligibility

    pub fn is_eligible(&self, tip_id: &str) -> bool {
        self.is_eligible_at(tip_id, Utc::now())
    }

    /// Evaluate every rule of the tip against current state. Nothing is cached.
    ///
    /// Unknown tips are never eligible; a tip without rules always is.
    pub fn is_eligible_at(&self, tip_id: &str, now: DateTime<Utc>) -> bool {
        let Some(tip) = self.catalog.get(tip_id) else {
            debug!(tip = tip_id, "Eligibility asked for unknown tip");
            return false;
        };

        Self::eligible_in(&self.state(), tip, now)
    }

    fn eligible_in(state: &EngineState, tip: &TipDefinition, now: DateTime<Utc>) -> bool {
        let ctx = TipContext {
            parameters: state.parameters.get(&tip.id),
            donations: &state.donations,
            now,
        };
        tip.rules.iter().all(|rule| rule.evaluate(&ctx))
    }

    // Events

    /// Record one occurrence of `event_id` now.
    pub fn donate(&self, event_id: &str) {
        self.donate_at(event_id, Utc::now());
    }

    /// Record one occurrence at `at`.
    ///
    /// The in-memory history is updated first; a failing durable write is
    /// logged and dropped so the current process still sees the donation.
    pub fn donate_at(&self, event_id: &str, at: DateTime<Utc>) {
        {
            let mut state = self.state();
            let history = state.donations.entry(event_id.to_string()).or_default();
            let pos = history.partition_point(|d| *d <= at);
            history.insert(pos, at);
        }

        if let Err(e) = self.log.append_donation(event_id, at) {
            warn!(event = event_id, error = %e, "Failed to persist donation, keeping it in memory");
        }

        debug!(event = event_id, "Event donated");
        self.notify(TipChange::Donated {
            event_id: event_id.to_string(),
        });
    }

    pub fn donation_count(&self, event_id: &str) -> usize {
        self.state()
            .donations
            .get(event_id)
            .map(|d| d.len())
            .unwrap_or(0)
    }

    pub fn donation_count_within(&self, event_id: &str, within: Window, now: DateTime<Utc>) -> usize {
        self.state()
            .donations
            .get(event_id)
            .map(|d| d.iter().filter(|at| within.contains(**at, now)).count())
            .unwrap_or(0)
    }

    /// Windowed count read back from the durable log instead of memory.
    ///
    /// Differs from [`donation_count_within`](Self::donation_count_within)
    /// only when donations failed to persist.
    pub fn logged_donation_count_within(
        &self,
        event_id: &str,
        within: Window,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let logged = self.log.donations(event_id, Some(within.start(now)))?;
        Ok(logged.iter().filter(|at| within.contains(**at, now)).count())
    }

    // Display status

    pub fn status(&self, tip_id: &str) -> TipStatus {
        self.state()
            .statuses
            .get(tip_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn should_display(&self, tip_id: &str) -> bool {
        self.should_display_at(tip_id, Utc::now())
    }

    /// Eligible, not invalidated, and allowed by the display frequency.
    ///
    /// A tip that has already been displayed stays visible until it is
    /// invalidated. With a frequency other than `Immediate`, at most one new
    /// tip appears per interval: the first pending tip in catalog order, and
    /// only once the interval since the last display of any tip has passed.
    pub fn should_display_at(&self, tip_id: &str, now: DateTime<Utc>) -> bool {
        let Some(tip) = self.catalog.get(tip_id) else {
            return false;
        };

        let state = self.state();
        if !Self::eligible_in(&state, tip, now) {
            return false;
        }
        let own = state.statuses.get(tip_id);
        if own.is_some_and(TipStatus::is_invalidated) {
            return false;
        }
        if own.is_some_and(|status| status.last_displayed.is_some()) {
            return true;
        }

        let Some(interval) = self.frequency.interval() else {
            return true;
        };
        let recently_shown = state.statuses.values().any(|status| {
            status
                .last_displayed
                .is_some_and(|shown| now - shown < interval)
        });
        if recently_shown {
            return false;
        }

        self.catalog
            .iter()
            .find(|candidate| Self::is_pending(&state, candidate, now))
            .is_some_and(|first| first.id == tip_id)
    }

    // Eligible, never displayed and not invalidated
    fn is_pending(state: &EngineState, tip: &TipDefinition, now: DateTime<Utc>) -> bool {
        let status = state.statuses.get(&tip.id);
        status.is_none_or(|s| !s.is_invalidated() && s.last_displayed.is_none())
            && Self::eligible_in(state, tip, now)
    }

    pub fn mark_displayed(&self, tip_id: &str) -> std::result::Result<(), TipError> {
        self.mark_displayed_at(tip_id, Utc::now())
    }

    /// Record the first time a tip appeared. Later calls keep the first time.
    pub fn mark_displayed_at(
        &self,
        tip_id: &str,
        now: DateTime<Utc>,
    ) -> std::result::Result<(), TipError> {
        self.definition(tip_id)?;

        let status = {
            let mut state = self.state();
            let status = state.statuses.entry(tip_id.to_string()).or_default();
            if status.last_displayed.is_some() {
                return Ok(());
            }
            status.last_displayed = Some(now);
            status.clone()
        };

        self.persist_status(tip_id, &status);
        self.notify(TipChange::Displayed {
            tip_id: tip_id.to_string(),
        });
        Ok(())
    }

    pub fn invalidate(
        &self,
        tip_id: &str,
        reason: InvalidationReason,
    ) -> std::result::Result<(), TipError> {
        self.definition(tip_id)?;

        let status = {
            let mut state = self.state();
            let status = state.statuses.entry(tip_id.to_string()).or_default();
            status.invalidation = Some(reason);
            status.clone()
        };

        debug!(tip = tip_id, %reason, "Tip invalidated");
        self.persist_status(tip_id, &status);
        self.notify(TipChange::Invalidated {
            tip_id: tip_id.to_string(),
            reason,
        });
        Ok(())
    }

    fn persist_status(&self, tip_id: &str, status: &TipStatus) {
        if let Err(e) = self.log.put_tip_status(tip_id, status) {
            warn!(tip = tip_id, error = %e, "Failed to persist tip status");
        }
    }

    /// Clear the status of one tip so it can appear again.
    ///
    /// Memory is cleared even when the durable clear fails; the error is
    /// still returned.
    pub fn reset(&self, tip_id: &str) -> Result<()> {
        self.definition(tip_id)?;
        self.state().statuses.remove(tip_id);

        self.notify(TipChange::Reset {
            tip_id: Some(tip_id.to_string()),
        });
        self.log.clear_tip_status(tip_id)
    }

    /// Clear every tip status and all event donations.
    ///
    /// Memory is always cleared and both durable clears are attempted. The
    /// first durable failure is returned.
    pub fn reset_all(&self) -> Result<()> {
        {
            let mut state = self.state();
            state.statuses.clear();
            state.donations.clear();
        }

        debug!("Tip datastore reset");
        self.notify(TipChange::Reset { tip_id: None });

        let statuses = self.log.clear_all_tip_statuses();
        if let Err(e) = &statuses {
            warn!(error = %e, "Failed to clear persisted tip status");
        }
        let donations = self.log.clear_donations();
        if let Err(e) = &donations {
            warn!(error = %e, "Failed to clear persisted donations");
        }
        statuses.and(donations)
    }
}
