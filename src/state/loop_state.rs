//! The loop states and how each one reacts to a fix

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::RestaurantLookup;
use crate::clock::Clock;
use crate::config::LoopIntervals;
use crate::domain::{Position, Restaurant, SnitchTrigger};
use crate::geo::has_moved_significantly;
use crate::notify::Notification;
use crate::state::{Effect, Transition};

/// A restaurant match waiting for the user to either leave or settle in.
///
/// Part of the provisional dwell-confirmation path, see [`LoopState::WillLeave`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DwellCandidate {
    /// When the current dwell phase began (Unix ms)
    pub since_ms: u64,
    /// Fix at which the match was made
    pub origin: Position,
    pub restaurant: Restaurant,
}

/// The single current state of the loop
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LoopState {
    /// Polling for a restaurant match
    #[default]
    Base,
    /// Matched; checking whether the user leaves shortly after arriving.
    /// Only reachable with dwell confirmation enabled. Provisional: the exit
    /// conditions and interval choice are placeholders.
    WillLeave(DwellCandidate),
    /// The user stayed past the first check; waiting out the long interval.
    /// Provisional like `WillLeave`.
    WillStay(DwellCandidate),
    /// Warning shown, grace window running for this trigger
    ActiveWarning(SnitchTrigger),
}

/// Everything a state needs to handle one fix
pub struct WakeContext<'a> {
    /// Read at each decision, never cached across an await
    pub clock: &'a dyn Clock,
    pub fix: Position,
    pub intervals: &'a LoopIntervals,
    pub radius: f64,
    pub dwell_confirmation: bool,
    /// A cancellation was recorded after the active trigger's creation
    pub cancellation_valid: bool,
    pub user_id: &'a str,
    pub lookup: &'a dyn RestaurantLookup,
}

impl WakeContext<'_> {
    fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    fn moved_from(&self, origin: &Position) -> bool {
        has_moved_significantly(Some(origin), &self.fix, self.radius)
    }

    /// Time left until `due_ms`, or `None` once it has passed
    fn remaining_until(&self, due_ms: u64) -> Option<Duration> {
        let now = self.now_ms();
        (now < due_ms).then(|| Duration::from_millis(due_ms - now))
    }

    fn remaining(&self, since_ms: u64, interval: Duration) -> Option<Duration> {
        self.remaining_until(since_ms.saturating_add(interval.as_millis() as u64))
    }
}

impl LoopState {
    pub fn name(&self) -> &'static str {
        match self {
            LoopState::Base => "base",
            LoopState::WillLeave(_) => "will_leave",
            LoopState::WillStay(_) => "will_stay",
            LoopState::ActiveWarning(_) => "active_warning",
        }
    }

    /// Interval before the first wake after entering this state. Zero means
    /// "use the short default interval".
    pub fn initial_interval(&self, intervals: &LoopIntervals) -> Duration {
        match self {
            LoopState::Base => Duration::ZERO,
            LoopState::WillLeave(_) => intervals.will_leave,
            LoopState::WillStay(_) => intervals.will_stay,
            LoopState::ActiveWarning(_) => intervals.warning,
        }
    }

    pub fn active_trigger(&self) -> Option<&SnitchTrigger> {
        match self {
            LoopState::ActiveWarning(trigger) => Some(trigger),
            _ => None,
        }
    }

    /// Consume one fix and decide what happens next
    pub async fn handle_position(&self, ctx: &WakeContext<'_>) -> Transition {
        match self {
            LoopState::Base => Self::handle_base(ctx).await,
            LoopState::WillLeave(candidate) => Self::handle_will_leave(candidate, ctx),
            LoopState::WillStay(candidate) => Self::handle_will_stay(candidate, ctx),
            LoopState::ActiveWarning(trigger) => Self::handle_active_warning(trigger, ctx),
        }
    }

    /// Enter the warning state for `trigger`
    pub fn begin_warning(trigger: SnitchTrigger) -> Transition {
        log::info!(
            "Beginning warning for {} (created {})",
            trigger.restaurant.name,
            trigger.created_at_ms
        );
        Transition::enter(LoopState::ActiveWarning(trigger)).notify(Notification::ShowWarning)
    }

    async fn handle_base(ctx: &WakeContext<'_>) -> Transition {
        let restaurant = match ctx.lookup.check_location(ctx.fix.coords()).await {
            Ok(Some(restaurant)) => restaurant,
            Ok(None) => return Transition::stay(ctx.intervals.short),
            Err(e) => {
                log::warn!(
                    "Restaurant lookup failed, treating as no match (retryable: {}): {}",
                    e.is_retryable(),
                    e
                );
                return Transition::stay(ctx.intervals.short);
            }
        };

        // Read after the lookup: cancellations made while it was in flight
        // must predate the trigger
        let now = ctx.now_ms();
        log::info!("Location matches {} ({})", restaurant.name, restaurant.id);
        if ctx.dwell_confirmation {
            return Transition::enter(LoopState::WillLeave(DwellCandidate {
                since_ms: now,
                origin: ctx.fix,
                restaurant,
            }));
        }
        Self::begin_warning(SnitchTrigger::new(now, ctx.fix, restaurant))
    }

    // TODO: confirm when WillLeave should give up and which interval WillStay
    // waits before dwell_confirmation can default to on. Both handlers below
    // are placeholders behind that flag.
    fn handle_will_leave(candidate: &DwellCandidate, ctx: &WakeContext<'_>) -> Transition {
        if ctx.moved_from(&candidate.origin) {
            log::info!("Left {} before settling in", candidate.restaurant.name);
            return Transition::enter(LoopState::Base);
        }
        if let Some(remaining) = ctx.remaining(candidate.since_ms, ctx.intervals.will_leave) {
            return Transition::stay(remaining);
        }
        Transition::enter(LoopState::WillStay(DwellCandidate {
            since_ms: ctx.now_ms(),
            ..candidate.clone()
        }))
    }

    fn handle_will_stay(candidate: &DwellCandidate, ctx: &WakeContext<'_>) -> Transition {
        if ctx.moved_from(&candidate.origin) {
            log::info!("Left {} during dwell confirmation", candidate.restaurant.name);
            return Transition::enter(LoopState::Base);
        }
        if let Some(remaining) = ctx.remaining(candidate.since_ms, ctx.intervals.will_stay) {
            return Transition::stay(remaining);
        }
        Self::begin_warning(SnitchTrigger::new(
            ctx.now_ms(),
            ctx.fix,
            candidate.restaurant.clone(),
        ))
    }

    fn handle_active_warning(trigger: &SnitchTrigger, ctx: &WakeContext<'_>) -> Transition {
        let grace_ms = ctx.intervals.warning.as_millis() as u64;
        if let Some(remaining) = ctx.remaining_until(trigger.expires_at_ms(grace_ms)) {
            if ctx.moved_from(&trigger.origin) {
                log::info!("Moved away from {}, dropping warning", trigger.restaurant.name);
                return Transition::enter(LoopState::Base)
                    .notify(Notification::CancelWarning)
                    .with_effect(Effect::ClearCancellation);
            }
            return Transition::stay(remaining);
        }

        if ctx.cancellation_valid {
            log::info!("Cancellation honoured for {}", trigger.restaurant.name);
            return Transition::enter(LoopState::Base)
                .notify(Notification::CancelWarning)
                .with_effect(Effect::ClearCancellation);
        }

        log::info!("Grace window over, snitching on {}", trigger.restaurant.name);
        Transition::enter(LoopState::Base)
            .with_effect(Effect::Publish(trigger.to_report(ctx.user_id)))
            .notify(Notification::CancelWarning)
            .notify(Notification::ShowSnitched)
            .with_effect(Effect::ClearCancellation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiError, MockApi};
    use crate::clock::ManualClock;

    const T: u64 = 1_000_000;

    fn diner() -> Restaurant {
        Restaurant::new("Diner", "d-1")
    }

    fn fix(lat: f64, lon: f64) -> Position {
        Position::new(lat, lon, T)
    }

    struct Harness {
        intervals: LoopIntervals,
        api: MockApi,
        dwell_confirmation: bool,
        cancellation_valid: bool,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                intervals: LoopIntervals::default(),
                api: MockApi::new(),
                dwell_confirmation: false,
                cancellation_valid: false,
            }
        }

        async fn handle(&self, state: &LoopState, now_ms: u64, fix: Position) -> Transition {
            let clock = ManualClock::new(now_ms);
            let ctx = WakeContext {
                clock: &clock,
                fix,
                intervals: &self.intervals,
                radius: 0.00001,
                dwell_confirmation: self.dwell_confirmation,
                cancellation_valid: self.cancellation_valid,
                user_id: "user-1",
                lookup: &self.api,
            };
            state.handle_position(&ctx).await
        }
    }

    fn publishes(t: &Transition) -> bool {
        t.effects.iter().any(|e| matches!(e, Effect::Publish(_)))
    }

    fn warning_at(created_at_ms: u64) -> LoopState {
        LoopState::ActiveWarning(SnitchTrigger::new(created_at_ms, fix(40.0, -70.0), diner()))
    }

    #[test]
    fn test_initial_intervals() {
        let intervals = LoopIntervals::default();
        assert_eq!(LoopState::Base.initial_interval(&intervals), Duration::ZERO);
        assert_eq!(warning_at(T).initial_interval(&intervals), Duration::from_secs(30));
    }

    #[test]
    fn test_names_and_trigger_access() {
        assert_eq!(LoopState::default().name(), "base");
        assert!(LoopState::Base.active_trigger().is_none());
        let warning = warning_at(T);
        assert_eq!(warning.name(), "active_warning");
        assert_eq!(warning.active_trigger().map(|t| t.created_at_ms), Some(T));
    }

    #[tokio::test]
    async fn test_base_no_match_stays() {
        let h = Harness::new();
        let t = h.handle(&LoopState::Base, T, fix(40.0, -70.0)).await;
        assert_eq!(t, Transition::stay(Duration::from_secs(10)));
        assert_eq!(h.api.lookup_calls().len(), 1);
    }

    #[tokio::test]
    async fn test_base_lookup_failure_is_no_match() {
        let h = Harness::new();
        h.api.push_lookup(Err(ApiError::Status {
            status: 502,
            message: "bad gateway".to_string(),
        }));
        let t = h.handle(&LoopState::Base, T, fix(40.0, -70.0)).await;
        assert_eq!(t, Transition::stay(Duration::from_secs(10)));
    }

    #[tokio::test]
    async fn test_base_match_begins_warning() {
        let h = Harness::new();
        h.api.push_match(diner());
        let t = h.handle(&LoopState::Base, T, fix(40.0, -70.0)).await;

        assert_eq!(t.next, Some(warning_at(T)));
        assert_eq!(t.effects, vec![Effect::Notify(Notification::ShowWarning)]);
        assert_eq!(t.resolve_delay(&h.intervals), Duration::from_millis(30_000));
    }

    #[tokio::test]
    async fn test_base_match_with_dwell_confirmation_enters_will_leave() {
        let mut h = Harness::new();
        h.dwell_confirmation = true;
        h.api.push_match(diner());
        let t = h.handle(&LoopState::Base, T, fix(40.0, -70.0)).await;

        assert_eq!(t.next.as_ref().map(LoopState::name), Some("will_leave"));
        assert!(t.effects.is_empty());
        assert_eq!(t.resolve_delay(&h.intervals), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_will_leave_moved_away_returns_to_base() {
        let h = Harness::new();
        let state = LoopState::WillLeave(DwellCandidate {
            since_ms: T,
            origin: fix(40.0, -70.0),
            restaurant: diner(),
        });
        let t = h.handle(&state, T + 30_000, fix(40.001, -70.0)).await;
        assert_eq!(t.next, Some(LoopState::Base));
    }

    #[tokio::test]
    async fn test_will_leave_still_there_enters_will_stay() {
        let h = Harness::new();
        let state = LoopState::WillLeave(DwellCandidate {
            since_ms: T,
            origin: fix(40.0, -70.0),
            restaurant: diner(),
        });
        let t = h.handle(&state, T + 30_000, fix(40.0, -70.0)).await;
        match &t.next {
            Some(LoopState::WillStay(candidate)) => assert_eq!(candidate.since_ms, T + 30_000),
            other => panic!("expected will_stay, got {:?}", other),
        }
        assert_eq!(t.resolve_delay(&h.intervals), Duration::from_secs(600));
    }

    #[tokio::test]
    async fn test_will_stay_early_wake_waits_remaining() {
        let h = Harness::new();
        let state = LoopState::WillStay(DwellCandidate {
            since_ms: T,
            origin: fix(40.0, -70.0),
            restaurant: diner(),
        });
        let t = h.handle(&state, T + 100_000, fix(40.0, -70.0)).await;
        assert_eq!(t, Transition::stay(Duration::from_millis(500_000)));
    }

    #[tokio::test]
    async fn test_will_stay_elapsed_begins_warning() {
        let h = Harness::new();
        let state = LoopState::WillStay(DwellCandidate {
            since_ms: T,
            origin: fix(40.0, -70.0),
            restaurant: diner(),
        });
        let now = T + 600_000;
        let t = h.handle(&state, now, fix(40.0, -70.0)).await;
        let trigger = t.next.as_ref().and_then(LoopState::active_trigger).unwrap();
        assert_eq!(trigger.created_at_ms, now);
        assert_eq!(t.effects, vec![Effect::Notify(Notification::ShowWarning)]);
    }

    #[tokio::test]
    async fn test_warning_within_grace_waits_remaining() {
        let h = Harness::new();
        let t = h.handle(&warning_at(T), T + 10_000, fix(40.0, -70.0)).await;
        assert_eq!(t, Transition::stay(Duration::from_secs(20)));
    }

    #[tokio::test]
    async fn test_warning_moved_away_cancels() {
        let h = Harness::new();
        let t = h.handle(&warning_at(T), T + 10_000, fix(40.0, -70.00002)).await;
        assert_eq!(t.next, Some(LoopState::Base));
        assert_eq!(
            t.effects,
            vec![
                Effect::Notify(Notification::CancelWarning),
                Effect::ClearCancellation
            ]
        );
        assert!(!publishes(&t));
        assert_eq!(t.resolve_delay(&h.intervals), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_warning_elapsed_with_cancellation_skips_publish() {
        let mut h = Harness::new();
        h.cancellation_valid = true;
        let t = h.handle(&warning_at(T), T + 30_000, fix(40.0, -70.0)).await;
        assert_eq!(t.next, Some(LoopState::Base));
        assert!(!publishes(&t));
        assert!(t.effects.contains(&Effect::Notify(Notification::CancelWarning)));
        assert!(t.effects.contains(&Effect::ClearCancellation));
    }

    #[tokio::test]
    async fn test_warning_elapsed_publishes_once() {
        let h = Harness::new();
        let t = h.handle(&warning_at(T), T + 30_000, fix(40.0, -70.0)).await;
        assert_eq!(t.next, Some(LoopState::Base));

        let publishes: Vec<_> = t
            .effects
            .iter()
            .filter_map(|e| match e {
                Effect::Publish(report) => Some(report),
                _ => None,
            })
            .collect();
        assert_eq!(publishes.len(), 1);
        assert_eq!(publishes[0].user_id, "user-1");
        assert_eq!(publishes[0].restaurant_data, diner());

        assert!(t.effects.contains(&Effect::Notify(Notification::CancelWarning)));
        assert!(t.effects.contains(&Effect::Notify(Notification::ShowSnitched)));
        assert!(t.effects.contains(&Effect::ClearCancellation));
    }

    #[tokio::test]
    async fn test_warning_elapsed_publishes_even_if_moved() {
        // Leaving after the grace window is too late
        let h = Harness::new();
        let t = h.handle(&warning_at(T), T + 45_000, fix(41.0, -70.0)).await;
        assert!(publishes(&t));
    }
}
