use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use murmur_types::{ProfileUpdate, RemotePath, UploadFolder, UserId};

use crate::api::{Backend, Navigator};
use crate::error::{ClientError, ClientResult};
use crate::lock_unpoisoned;
use crate::media::{MediaReference, MediaResolver};
use crate::session::{Identity, ProfilePatch, SessionStore};

/// Editable text fields of a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileField {
    Name,
    PhoneNumber,
    Address,
    Bio,
}

/// Local, uncommitted copy of the user's profile
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProfileDraft {
    pub name: String,
    pub phone_number: String,
    pub address: String,
    pub bio: String,
    pub image: Option<MediaReference>,
}

impl ProfileDraft {
    fn from_identity(identity: &Identity) -> Self {
        Self {
            name: identity.name.clone().unwrap_or_default(),
            phone_number: identity.phone_number.clone().unwrap_or_default(),
            address: identity.address.clone().unwrap_or_default(),
            bio: identity.bio.clone().unwrap_or_default(),
            image: identity.image.clone().map(MediaReference::Remote),
        }
    }

    /// Names of required fields that are blank
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.name.trim().is_empty() {
            missing.push("name");
        }
        if self.phone_number.trim().is_empty() {
            missing.push("phone number");
        }
        if self.address.trim().is_empty() {
            missing.push("address");
        }
        if self.bio.trim().is_empty() {
            missing.push("bio");
        }
        if self.image.is_none() {
            missing.push("image");
        }
        missing
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// Profile committed and merged into the session
    Saved(Identity),
    /// The session ended during the submit; nothing was applied locally
    Discarded,
}

/// Stages profile edits and commits them as one update.
pub struct ProfileEditor {
    user_id: UserId,
    epoch: u64,
    draft: Mutex<ProfileDraft>,
    submitting: AtomicBool,
    session: Arc<SessionStore>,
    backend: Arc<dyn Backend>,
    media: Arc<MediaResolver>,
    navigator: Arc<dyn Navigator>,
}

/// Clears the in-flight flag however `submit` returns
struct SubmitGuard<'a>(&'a AtomicBool);

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl ProfileEditor {
    /// Snapshot the signed-in identity into a draft. `None` if nobody is signed in.
    pub fn open(
        session: Arc<SessionStore>,
        backend: Arc<dyn Backend>,
        media: Arc<MediaResolver>,
        navigator: Arc<dyn Navigator>,
    ) -> Option<Self> {
        let epoch = session.epoch();
        let identity = session.current()?;
        Some(Self {
            user_id: identity.id,
            epoch,
            draft: Mutex::new(ProfileDraft::from_identity(&identity)),
            submitting: AtomicBool::new(false),
            session,
            backend,
            media,
            navigator,
        })
    }

    pub fn draft(&self) -> ProfileDraft {
        lock_unpoisoned(&self.draft).clone()
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting.load(Ordering::SeqCst)
    }

    pub fn set_field(&self, field: ProfileField, value: impl Into<String>) {
        let value = value.into();
        let mut draft = lock_unpoisoned(&self.draft);
        match field {
            ProfileField::Name => draft.name = value,
            ProfileField::PhoneNumber => draft.phone_number = value,
            ProfileField::Address => draft.address = value,
            ProfileField::Bio => draft.bio = value,
        }
    }

    pub fn set_image(&self, image: MediaReference) {
        lock_unpoisoned(&self.draft).image = Some(image);
    }

    /// Validate, upload a pending image if needed, and commit the draft.
    ///
    /// A failed image upload does not block the rest of the update: the
    /// profile is committed without an image. Only one submit may run at a
    /// time; a second call while one is pending gets [`ClientError::Busy`].
    /// A saved profile sends the navigator back to the previous screen.
    pub async fn submit(&self) -> ClientResult<SubmitOutcome> {
        if self
            .submitting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            log::debug!(target: "profile", "Submit rejected: another one is in flight");
            return Err(ClientError::Busy);
        }
        let _guard = SubmitGuard(&self.submitting);

        let draft = self.draft();
        let missing = draft.missing_fields();
        if !missing.is_empty() {
            return Err(ClientError::Validation { missing });
        }

        let image = match &draft.image {
            Some(reference) => self.resolve_image(reference).await,
            None => None,
        };

        let update = ProfileUpdate {
            name: draft.name.trim().to_string(),
            phone_number: draft.phone_number.trim().to_string(),
            address: draft.address.trim().to_string(),
            bio: draft.bio.trim().to_string(),
            image,
        };

        log::info!(target: "profile", "Updating profile for {}", self.user_id);
        let result = self.backend.update_user(self.user_id, &update).await;

        if !self.session.is_current(self.epoch) {
            log::info!(target: "profile", "Session ended during profile update, result discarded");
            return Ok(SubmitOutcome::Discarded);
        }

        if let Err(e) = result {
            log::warn!(target: "profile", "Profile update failed: {}", e);
            return Err(ClientError::from_api(&e, "Could not update profile"));
        }

        self.session.set_profile(ProfilePatch {
            email: None,
            name: Some(update.name),
            phone_number: Some(update.phone_number),
            address: Some(update.address),
            bio: Some(update.bio),
            image: Some(update.image),
        });

        match self.session.current() {
            Some(identity) => {
                self.navigator.go_back();
                Ok(SubmitOutcome::Saved(identity))
            }
            None => Ok(SubmitOutcome::Discarded),
        }
    }

    async fn resolve_image(&self, reference: &MediaReference) -> Option<RemotePath> {
        match self.media.ensure_remote(reference, UploadFolder::Profiles).await {
            Ok(path) => Some(path),
            Err(e) => {
                log::warn!(target: "profile", "Profile image dropped from update: {}", e);
                None
            }
        }
    }
}
