//! The loop controller
//!
//! Holds every piece of cross-wake state (current `LoopState`, last known
//! position, cancellation record) and is the only thing that re-arms the
//! scheduler. A wake holds the core lock from fix acquisition to re-arm, so
//! two wakes can never interleave even if the wake primitive double-fires.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use serde::Serialize;
use tokio::sync::watch;

use crate::api::RestaurantLookup;
use crate::cheat::CheatTracker;
use crate::clock::Clock;
use crate::config::{LoopConfig, LoopIntervals};
use crate::controller::publisher::ReportSender;
use crate::domain::{Position, SnitchTrigger};
use crate::geo::LastKnownPosition;
use crate::location::PositionSource;
use crate::notify::{Notification, NotificationSender};
use crate::scheduler::Scheduler;
use crate::state::{Effect, LoopState, Transition, WakeContext};

/// Outbound ports the controller dispatches effects to
#[derive(Debug, Clone)]
pub struct Outbound {
    pub notifications: NotificationSender,
    pub reports: ReportSender,
}

/// Collaborators of the controller
pub struct LoopDeps {
    pub source: Arc<dyn PositionSource>,
    pub lookup: Arc<dyn RestaurantLookup>,
    pub scheduler: Arc<dyn Scheduler>,
    pub clock: Arc<dyn Clock>,
    pub outbound: Outbound,
}

/// What one wake did
#[derive(Debug, Clone, PartialEq)]
pub struct WakeReport {
    /// State after the wake
    pub state: &'static str,
    /// Delay passed to the single `request_wake` call
    pub delay: Duration,
    pub effects: Vec<Effect>,
    /// Whether the wake got a position fix
    pub had_fix: bool,
}

/// Snapshot published after every wake for outside readers
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoopStatus {
    pub state: &'static str,
    pub active_trigger: Option<SnitchTrigger>,
    pub last_position: Option<Position>,
    pub wakes: u64,
}

struct Core {
    state: LoopState,
    last_position: LastKnownPosition,
    wakes: u64,
}

pub struct LoopController {
    config: LoopConfig,
    intervals: LoopIntervals,
    user_id: String,
    deps: LoopDeps,
    core: tokio::sync::Mutex<Core>,
    cheat: Mutex<CheatTracker>,
    status: watch::Sender<LoopStatus>,
}

impl LoopController {
    pub fn new(config: LoopConfig, user_id: impl Into<String>, deps: LoopDeps) -> Self {
        let intervals = config.intervals();
        if config.dwell_confirmation {
            log::warn!("Dwell confirmation enabled; WillLeave/WillStay rules are provisional");
        }
        let core = Core {
            state: LoopState::Base,
            last_position: LastKnownPosition::new(config.significant_radius),
            wakes: 0,
        };
        let (status, _) = watch::channel(LoopStatus {
            state: LoopState::Base.name(),
            ..LoopStatus::default()
        });
        Self {
            config,
            intervals,
            user_id: user_id.into(),
            deps,
            core: tokio::sync::Mutex::new(core),
            cheat: Mutex::new(CheatTracker::new()),
            status,
        }
    }

    /// Arm the first wake to run immediately
    pub async fn start(&self) {
        let core = self.core.lock().await;
        log::info!("Starting location loop in state {}", core.state.name());
        self.deps.scheduler.request_wake(Duration::ZERO);
    }

    /// Replace the current state and arm its initial interval. Replacing an
    /// active warning withdraws it like any other exit from the warning.
    pub async fn enter_state(&self, state: LoopState) {
        let mut core = self.core.lock().await;
        let mut transition = match state {
            LoopState::ActiveWarning(trigger) => LoopState::begin_warning(trigger),
            other => Transition::enter(other),
        };
        if core.state.active_trigger().is_some() {
            let exits_warning = !matches!(transition.next, Some(LoopState::ActiveWarning(_)));
            if exits_warning {
                transition = transition.notify(Notification::CancelWarning);
            }
            transition = transition.with_effect(Effect::ClearCancellation);
        }
        let report = self.apply(&mut core, transition);
        self.deps.scheduler.request_wake(report.delay);
    }

    /// Handle one wake. Always ends in exactly one `request_wake`, whatever
    /// happens while handling the fix.
    pub async fn on_wake(&self) -> WakeReport {
        let mut core = self.core.lock().await;
        core.wakes += 1;

        let outcome = AssertUnwindSafe(self.process(&mut core)).catch_unwind().await;
        let (transition, had_fix) = match outcome {
            Ok(result) => result,
            Err(panic) => {
                let reason = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                log::error!("Wake handling panicked in state {}: {}", core.state.name(), reason);
                (Transition::stay(self.intervals.short), false)
            }
        };

        let mut report = self.apply(&mut core, transition);
        report.had_fix = had_fix;
        self.deps.scheduler.request_wake(report.delay);
        log::info!(
            "Wake {} done: state={} next wake in {}ms",
            core.wakes,
            report.state,
            report.delay.as_millis()
        );
        report
    }

    async fn process(&self, core: &mut Core) -> (Transition, bool) {
        let fix = match tokio::time::timeout(self.config.fix_timeout(), self.deps.source.request_one_fix()).await {
            Ok(Some(fix)) => fix,
            Ok(None) => {
                log::info!("No position fix, trying again later");
                return (Transition::stay(self.intervals.short), false);
            }
            Err(_) => {
                log::warn!(
                    "Position fix timed out after {}ms",
                    self.config.fix_timeout().as_millis()
                );
                return (Transition::stay(self.intervals.short), false);
            }
        };

        core.last_position.observe(fix);

        let cancellation_valid = match core.state.active_trigger() {
            Some(trigger) => self.lock_cheat().is_cancellation_valid(trigger),
            None => false,
        };

        let ctx = WakeContext {
            clock: self.deps.clock.as_ref(),
            fix,
            intervals: &self.intervals,
            radius: self.config.significant_radius,
            dwell_confirmation: self.config.dwell_confirmation,
            cancellation_valid,
            user_id: &self.user_id,
            lookup: self.deps.lookup.as_ref(),
        };
        (core.state.handle_position(&ctx).await, true)
    }

    /// Switch state and dispatch effects. Returns the delay to arm.
    fn apply(&self, core: &mut Core, transition: Transition) -> WakeReport {
        let delay = transition.resolve_delay(&self.intervals);
        if let Some(next) = transition.next {
            if next.name() != core.state.name() {
                log::info!("Entering loop state: {}", next.name());
            }
            core.state = next;
        }

        for effect in &transition.effects {
            self.dispatch(effect);
        }

        self.status.send_replace(LoopStatus {
            state: core.state.name(),
            active_trigger: core.state.active_trigger().cloned(),
            last_position: core.last_position.get().copied(),
            wakes: core.wakes,
        });

        WakeReport {
            state: core.state.name(),
            delay,
            effects: transition.effects,
            had_fix: false,
        }
    }

    fn dispatch(&self, effect: &Effect) {
        match effect {
            Effect::Notify(notification) => {
                if self.deps.outbound.notifications.send(*notification).is_err() {
                    log::debug!("Notification {:?} dropped, no listener", notification);
                }
            }
            Effect::Publish(report) => {
                if self.deps.outbound.reports.send(report.clone()).is_err() {
                    log::error!("Publisher is gone, snitch for {} lost", report.restaurant_data.name);
                }
            }
            Effect::ClearCancellation => self.lock_cheat().clear(),
        }
    }

    fn lock_cheat(&self) -> std::sync::MutexGuard<'_, CheatTracker> {
        self.cheat.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// User entry point: "I left / I'm allowed to be here"
    pub fn on_cancellation_requested(&self) {
        self.lock_cheat().record_cancellation(self.deps.clock.now_ms());
    }

    /// The trigger currently under escalation, for display
    pub fn active_trigger(&self) -> Option<SnitchTrigger> {
        self.status.borrow().active_trigger.clone()
    }

    pub fn state_name(&self) -> &'static str {
        self.status.borrow().state
    }

    pub fn status(&self) -> LoopStatus {
        self.status.borrow().clone()
    }

    /// Receiver that sees a new status after every wake
    pub fn subscribe(&self) -> watch::Receiver<LoopStatus> {
        self.status.subscribe()
    }

    pub fn next_wake_deadline(&self) -> Option<u64> {
        self.deps.scheduler.next_wake_deadline()
    }

    pub fn last_cancellation_ms(&self) -> Option<u64> {
        self.lock_cheat().last_cancellation_ms()
    }
}
