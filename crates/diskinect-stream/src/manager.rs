//! Stream state machine
//!
//! Owns exactly one [`StreamState`] after initialization. A transition exits
//! the old state, drops it and enters the new one inside a single call, so no
//! tick ever observes a mix of both.

use tracing::{info, warn};

use diskinect_core::{DiskinectError, DiskinectResult, Skeleton};

use crate::state::{StreamContext, StreamKind, StreamRenderer, StreamState, UserStream};

#[derive(Debug, Default)]
pub struct StreamStateManager {
    current: Option<StreamState>,
    transitions: u64,
}

impl StreamStateManager {
    pub fn new() -> Self {
        StreamStateManager::default()
    }

    /// Enter `state` and make it current; only valid before any state is set
    pub fn set_initial_state(&mut self, state: impl Into<StreamState>) -> DiskinectResult<()> {
        if self.current.is_some() {
            warn!("initial state already set");
            return Err(DiskinectError::StateMachineAlreadyInitialized);
        }
        let mut state = state.into();
        state.enter();
        info!(state = %state.kind(), "initial stream state");
        self.current = Some(state);
        Ok(())
    }

    /// Exit and drop the current state, then enter `state`
    pub fn change_state(&mut self, state: impl Into<StreamState>) -> DiskinectResult<()> {
        let mut next = state.into();
        let Some(mut previous) = self.current.take() else {
            warn!(state = %next.kind(), "change_state before set_initial_state");
            return Err(DiskinectError::StateMachineUninitialized);
        };

        previous.exit();
        next.enter();
        info!(from = %previous.kind(), to = %next.kind(), "stream state changed");
        self.current = Some(next);
        self.transitions += 1;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&self) -> Option<&StreamState> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut StreamState> {
        self.current.as_mut()
    }

    pub fn current_kind(&self) -> Option<StreamKind> {
        self.current.as_ref().map(StreamState::kind)
    }

    /// Completed `change_state` calls
    pub fn transitions(&self) -> u64 {
        self.transitions
    }

    pub fn update(&mut self, ctx: &StreamContext<'_>) {
        match self.current.as_mut() {
            Some(state) => state.update(ctx),
            None => warn!("update on uninitialized state machine"),
        }
    }

    pub fn draw(&self, ctx: &StreamContext<'_>, renderer: &mut dyn StreamRenderer) {
        match self.current.as_ref() {
            Some(state) => state.draw(ctx, renderer),
            None => warn!("draw on uninitialized state machine"),
        }
    }

    /// Skeleton of the current state; empty before initialization
    pub fn skeleton(&self, ctx: &StreamContext<'_>) -> Skeleton {
        match self.current.as_ref() {
            Some(state) => state.skeleton(ctx),
            None => {
                warn!("skeleton requested from uninitialized state machine");
                Skeleton::empty()
            }
        }
    }

    pub fn wants_to_exit(&self) -> bool {
        self.current
            .as_ref()
            .map(UserStream::wants_to_exit)
            .unwrap_or(false)
    }
}
