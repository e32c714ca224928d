//! Results of handling one wake

use std::time::Duration;

use crate::config::LoopIntervals;
use crate::domain::SnitchReport;
use crate::notify::Notification;
use crate::state::LoopState;

/// Side effect requested by a state, carried out by the controller
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Notify(Notification),
    Publish(SnitchReport),
    /// Forget the recorded cancellation
    ClearCancellation,
}

/// What the controller must do at the end of a wake
#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    /// State to switch to; `None` keeps the current one
    pub next: Option<LoopState>,
    /// Explicit delay before the next wake; `None` uses the next state's
    /// initial interval
    pub delay: Option<Duration>,
    pub effects: Vec<Effect>,
}

impl Transition {
    /// Keep the current state and wake again after `delay`
    pub fn stay(delay: Duration) -> Self {
        Self {
            next: None,
            delay: Some(delay),
            effects: Vec::new(),
        }
    }

    /// Switch to `state`, waking after its initial interval
    pub fn enter(state: LoopState) -> Self {
        Self {
            next: Some(state),
            delay: None,
            effects: Vec::new(),
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn notify(self, notification: Notification) -> Self {
        self.with_effect(Effect::Notify(notification))
    }

    /// Delay the controller arms after applying this transition. A zero
    /// initial interval falls back to the short interval.
    pub fn resolve_delay(&self, intervals: &LoopIntervals) -> Duration {
        if let Some(delay) = self.delay {
            return delay;
        }
        match &self.next {
            Some(state) => {
                let initial = state.initial_interval(intervals);
                if initial.is_zero() { intervals.short } else { initial }
            }
            None => intervals.short,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Position, Restaurant, SnitchTrigger};

    #[test]
    fn test_stay_uses_explicit_delay() {
        let t = Transition::stay(Duration::from_secs(7));
        assert_eq!(t.resolve_delay(&LoopIntervals::default()), Duration::from_secs(7));
        assert!(t.next.is_none());
    }

    #[test]
    fn test_enter_base_falls_back_to_short() {
        let intervals = LoopIntervals::default();
        let t = Transition::enter(LoopState::Base);
        assert_eq!(t.resolve_delay(&intervals), intervals.short);
    }

    #[test]
    fn test_enter_warning_uses_warning_interval() {
        let trigger = SnitchTrigger::new(0, Position::new(0.0, 0.0, 0), Restaurant::new("Diner", "d-1"));
        let t = Transition::enter(LoopState::ActiveWarning(trigger)).notify(Notification::ShowWarning);
        assert_eq!(t.resolve_delay(&LoopIntervals::default()), Duration::from_millis(30_000));
        assert_eq!(t.effects, vec![Effect::Notify(Notification::ShowWarning)]);
    }
}
