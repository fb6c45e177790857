use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use murmur_types::{AuthSession, RemotePath, User, UserId};

use crate::lock_unpoisoned;

/// The signed-in user as the client knows it
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Identity {
    pub id: UserId,
    pub email: Option<String>,
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub bio: Option<String>,
    pub image: Option<RemotePath>,
}

impl Identity {
    fn from_session(session: &AuthSession) -> Self {
        Self {
            id: session.user.id,
            email: session.user.email.clone(),
            name: session.user.name.clone(),
            ..Default::default()
        }
    }
}

/// Partial profile update. `None` leaves a field untouched; for `image`,
/// `Some(None)` clears it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProfilePatch {
    pub email: Option<String>,
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub bio: Option<String>,
    pub image: Option<Option<RemotePath>>,
}

impl ProfilePatch {
    /// Patch carrying every field the backend returned for a user
    pub fn from_user(user: &User) -> Self {
        Self {
            email: user.email.clone(),
            name: user.name.clone(),
            phone_number: user.phone_number.clone(),
            address: user.address.clone(),
            bio: user.bio.clone(),
            image: user.image.clone().map(Some),
        }
    }

    fn apply(self, identity: &mut Identity) {
        if let Some(email) = self.email {
            identity.email = Some(email);
        }
        if let Some(name) = self.name {
            identity.name = Some(name);
        }
        if let Some(phone_number) = self.phone_number {
            identity.phone_number = Some(phone_number);
        }
        if let Some(address) = self.address {
            identity.address = Some(address);
        }
        if let Some(bio) = self.bio {
            identity.bio = Some(bio);
        }
        if let Some(image) = self.image {
            identity.image = image;
        }
    }
}

/// Notification delivered to session observers
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SignedIn(Identity),
    ProfileUpdated(Identity),
    SignedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Observer = Arc<dyn Fn(&SessionEvent) + Send + Sync>;

enum Mutation {
    Authenticate(AuthSession),
    Merge(ProfilePatch),
    Clear,
}

struct State {
    identity: Option<Identity>,
    epoch: u64,
}

struct Observers {
    next_id: u64,
    list: Vec<(SubscriptionId, Observer)>,
}

#[derive(Default)]
struct Dispatch {
    running: bool,
    queue: VecDeque<Mutation>,
}

/// In-memory holder of the current identity.
///
/// All identity mutation goes through the setters here. Observers are called
/// synchronously, in registration order, after each mutation. A setter called
/// from inside an observer is queued and applied once the current round of
/// notifications has finished.
pub struct SessionStore {
    state: Mutex<State>,
    observers: Mutex<Observers>,
    dispatch: Mutex<Dispatch>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                identity: None,
                epoch: 0,
            }),
            observers: Mutex::new(Observers {
                next_id: 0,
                list: Vec::new(),
            }),
            dispatch: Mutex::new(Dispatch::default()),
        }
    }

    /// Snapshot of the current identity
    pub fn current(&self) -> Option<Identity> {
        lock_unpoisoned(&self.state).identity.clone()
    }

    pub fn current_user_id(&self) -> Option<UserId> {
        lock_unpoisoned(&self.state).identity.as_ref().map(|i| i.id)
    }

    pub fn is_authenticated(&self) -> bool {
        lock_unpoisoned(&self.state).identity.is_some()
    }

    /// Sign-out counter. Work that suspends compares it before and after to
    /// detect that the session ended underneath it.
    pub fn epoch(&self) -> u64 {
        lock_unpoisoned(&self.state).epoch
    }

    /// True while the session that produced `epoch` is still signed in
    pub fn is_current(&self, epoch: u64) -> bool {
        let state = lock_unpoisoned(&self.state);
        state.epoch == epoch && state.identity.is_some()
    }

    pub fn set_authenticated_user(&self, session: AuthSession) {
        self.submit(Mutation::Authenticate(session));
    }

    /// Shallow-merge `patch` into the current identity
    pub fn set_profile(&self, patch: ProfilePatch) {
        self.submit(Mutation::Merge(patch));
    }

    pub fn clear(&self) {
        self.submit(Mutation::Clear);
    }

    pub fn subscribe<F>(&self, observer: F) -> SubscriptionId
    where
        F: Fn(&SessionEvent) + Send + Sync + 'static,
    {
        let mut observers = lock_unpoisoned(&self.observers);
        let id = SubscriptionId(observers.next_id);
        observers.next_id += 1;
        observers.list.push((id, Arc::new(observer)));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = lock_unpoisoned(&self.observers);
        let before = observers.list.len();
        observers.list.retain(|(existing, _)| *existing != id);
        observers.list.len() != before
    }

    fn submit(&self, mutation: Mutation) {
        {
            let mut dispatch = lock_unpoisoned(&self.dispatch);
            dispatch.queue.push_back(mutation);
            if dispatch.running {
                log::trace!(target: "session", "Mutation queued behind running dispatch");
                return;
            }
            dispatch.running = true;
        }

        loop {
            let next = {
                let mut dispatch = lock_unpoisoned(&self.dispatch);
                match dispatch.queue.pop_front() {
                    Some(mutation) => mutation,
                    None => {
                        dispatch.running = false;
                        break;
                    }
                }
            };

            if let Some(event) = self.apply(next) {
                self.notify(&event);
            }
        }
    }

    fn apply(&self, mutation: Mutation) -> Option<SessionEvent> {
        let mut state = lock_unpoisoned(&self.state);
        match mutation {
            Mutation::Authenticate(session) => {
                let refresh = state
                    .identity
                    .as_ref()
                    .is_some_and(|identity| identity.id == session.user.id);

                if refresh {
                    let identity = state.identity.as_mut()?;
                    log::debug!(target: "session", "Session refreshed for {}", identity.id);
                    ProfilePatch {
                        email: session.user.email,
                        name: session.user.name,
                        ..Default::default()
                    }
                    .apply(identity);
                    Some(SessionEvent::ProfileUpdated(identity.clone()))
                } else {
                    let identity = Identity::from_session(&session);
                    log::info!(target: "session", "Signed in as {}", identity.id);
                    state.identity = Some(identity.clone());
                    Some(SessionEvent::SignedIn(identity))
                }
            }
            Mutation::Merge(patch) => match state.identity.as_mut() {
                Some(identity) => {
                    patch.apply(identity);
                    Some(SessionEvent::ProfileUpdated(identity.clone()))
                }
                None => {
                    log::warn!(target: "session", "Profile update ignored: nobody is signed in");
                    None
                }
            },
            Mutation::Clear => {
                state.identity = None;
                state.epoch += 1;
                log::info!(target: "session", "Signed out (epoch {})", state.epoch);
                Some(SessionEvent::SignedOut)
            }
        }
    }

    fn notify(&self, event: &SessionEvent) {
        let observers: Vec<Observer> = lock_unpoisoned(&self.observers)
            .list
            .iter()
            .map(|(_, observer)| Arc::clone(observer))
            .collect();
        for observer in observers {
            observer(event);
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
