//! Driver task for the loop
//!
//! Receives wake tokens from the scheduler and runs each accepted wake to
//! completion before looking at the next token.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::controller::LoopController;
use crate::scheduler::{TokioScheduler, WakeToken};

pub struct LoopRunner {
    controller: Arc<LoopController>,
    scheduler: Arc<TokioScheduler>,
    wakes: mpsc::UnboundedReceiver<WakeToken>,
}

impl LoopRunner {
    /// `scheduler` must be the same instance the controller re-arms
    pub fn new(
        controller: Arc<LoopController>,
        scheduler: Arc<TokioScheduler>,
        wakes: mpsc::UnboundedReceiver<WakeToken>,
    ) -> Self {
        Self {
            controller,
            scheduler,
            wakes,
        }
    }

    /// Run until `shutdown` flips to true (or its sender is dropped).
    /// Returns the number of wakes handled.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> u64 {
        self.controller.start().await;
        let mut handled = 0;

        loop {
            tokio::select! {
                token = self.wakes.recv() => {
                    let Some(token) = token else {
                        log::warn!("Wake channel closed, stopping loop");
                        break;
                    };
                    if !self.scheduler.accept(token) {
                        continue;
                    }
                    self.controller.on_wake().await;
                    handled += 1;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        log::info!("Shutdown requested, stopping loop");
                        break;
                    }
                }
            }
        }

        self.scheduler.cancel();
        handled
    }
}
