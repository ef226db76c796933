//! State swapping
//!
//! [`Fsm`] owns the active [`State`]. A transition calls `leave` on the old
//! state and `enter` on the new one. When the old state handed the pending
//! request over without consuming it, the request is fed to the new state
//! once more.

use tracing::debug;

use super::context::Context;
use super::state::{Event, State, StateId, StateResult};

#[derive(Debug)]
pub struct Fsm {
    state: State,
}

impl Fsm {
    /// Enter `initial` and make it the active state
    pub fn new(mut initial: State, ctx: &mut Context) -> Self {
        initial.enter(ctx);
        Self { state: initial }
    }

    pub fn state_id(&self) -> StateId {
        self.state.id()
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// Feed one event. Returns true when the event was handled.
    pub fn feed(&mut self, ctx: &mut Context, ev: Event) -> bool {
        let result = self.state.feed(ctx, ev);
        let unhandled = result.unhandled;
        if !self.apply(ctx, result) {
            return !unhandled;
        }

        // Hand-over: the request is still waiting for the new state
        if ev == Event::V2gtpMessage && ctx.message_exchange().has_request() {
            let result = self.state.feed(ctx, ev);
            let unhandled = result.unhandled;
            self.apply(ctx, result);
            return !unhandled;
        }

        true
    }

    /// Swap in the new state, if any. Returns true on a transition.
    fn apply(&mut self, ctx: &mut Context, result: StateResult) -> bool {
        let Some(mut next) = result.new_state else {
            return false;
        };

        let from = self.state.id();
        self.state.leave(ctx);
        next.enter(ctx);
        debug!(
            parent: ctx.log.span(),
            from = %from,
            to = %next.id(),
            "State transition"
        );
        self.state = next;
        true
    }
}
