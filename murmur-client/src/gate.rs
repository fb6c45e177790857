use std::sync::{Arc, Mutex};

use murmur_types::AuthSession;

use crate::api::{Backend, IdentityProvider, Navigator, Screen};
use crate::error::{ClientError, ClientResult};
use crate::lock_unpoisoned;
use crate::session::{ProfilePatch, SessionStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GateState {
    #[default]
    Unauthenticated,
    /// Session received, profile fetch still running
    Authenticating,
    Authenticated,
}

/// Routes the app between the welcome and home screens as the identity
/// provider reports sign-in and sign-out.
pub struct NavigationGate {
    state: Mutex<GateState>,
    session: Arc<SessionStore>,
    backend: Arc<dyn Backend>,
    navigator: Arc<dyn Navigator>,
}

impl NavigationGate {
    pub fn new(
        session: Arc<SessionStore>,
        backend: Arc<dyn Backend>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            state: Mutex::new(GateState::Unauthenticated),
            session,
            backend,
            navigator,
        }
    }

    pub fn state(&self) -> GateState {
        *lock_unpoisoned(&self.state)
    }

    /// Feed one identity-provider event through the gate and return the
    /// resulting state.
    pub async fn handle_session_change(&self, event: Option<AuthSession>) -> GateState {
        let Some(auth) = event else {
            self.session.clear();
            *lock_unpoisoned(&self.state) = GateState::Unauthenticated;
            log::info!(target: "session", "No session, redirecting to welcome");
            self.navigator.redirect(Screen::Welcome);
            return GateState::Unauthenticated;
        };

        let settled = {
            let mut state = lock_unpoisoned(&self.state);
            match *state {
                GateState::Unauthenticated => {
                    *state = GateState::Authenticating;
                    None
                }
                current => Some(current),
            }
        };
        if let Some(current) = settled {
            // Token refresh, or a repeat event while the profile loads
            self.session.set_authenticated_user(auth);
            return current;
        }

        let mut user_id = auth.user.id;
        self.session.set_authenticated_user(auth);
        let epoch = self.session.epoch();

        let fetched = loop {
            let fetched = self.backend.get_user(user_id).await;
            if !self.session.is_current(epoch) {
                log::info!(target: "session", "Signed out while loading profile {}, result discarded", user_id);
                return self.state();
            }
            match self.session.current_user_id() {
                Some(current) if current != user_id => {
                    log::info!(target: "session", "Account switched to {} while loading profile", current);
                    user_id = current;
                }
                _ => break fetched,
            }
        };

        match fetched {
            Ok(user) => self.session.set_profile(ProfilePatch::from_user(&user)),
            Err(e) => {
                log::warn!(target: "session", "Profile fetch for {} failed, continuing with sign-in data: {}", user_id, e);
            }
        }

        *lock_unpoisoned(&self.state) = GateState::Authenticated;
        self.navigator.redirect(Screen::Home);
        GateState::Authenticated
    }

    /// Ask the identity provider to end the session. The gate moves to
    /// `Unauthenticated` when the provider's null event arrives.
    pub async fn sign_out(&self, provider: &dyn IdentityProvider) -> ClientResult<()> {
        provider.sign_out().await.map_err(|e| {
            log::warn!(target: "session", "Sign-out failed: {}", e);
            ClientError::from_api(&e, "Error signing out")
        })
    }
}
