use secrecy::SecretString;

use crate::auth::Session;
use crate::camp::{Camp, CampId};
use crate::chat::ChatSession;
use crate::config::AppConfig;
use crate::error::AppError;
use crate::form::FormErrors;
use crate::geo::GeolocationSample;
use crate::route::RouteSlot;

#[derive(Debug, Default)]
pub struct Model {
    pub config: AppConfig,
    pub config_error: Option<AppError>,
    pub session: Session,
    pub location: GeolocationSample,
    pub locating: bool,
    pub camps: CampDirectory,
    pub map: MapState,
    pub chat: ChatState,
    pub speech: SpeechState,
    pub auth: AuthState,
}

#[derive(Debug, Default)]
pub struct CampDirectory {
    pub all: Vec<Camp>,
    pub recent: Vec<Camp>,
    pub loading: bool,
    pub recent_loading: bool,
    pub error: Option<AppError>,
    pub search: String,
    pub submitting: bool,
    pub form_errors: FormErrors,
    pub add_error: Option<AppError>,
    pub notice: Option<String>,
}

impl CampDirectory {
    #[must_use]
    pub fn find(&self, id: CampId) -> Option<&Camp> {
        self.all
            .iter()
            .chain(self.recent.iter())
            .find(|camp| camp.id == id)
    }
}

#[derive(Debug, Default)]
pub struct MapState {
    pub selected: Option<CampId>,
    pub route: RouteSlot,
}

#[derive(Debug, Default)]
pub struct ChatState {
    pub session: ChatSession,
    pub draft: String,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SpeechState {
    pub recognition_supported: bool,
    pub synthesis_supported: bool,
    pub listening: bool,
    pub speak_replies: bool,
}

/// Registration handed back a token; the OTP screen needs it with the email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingVerification {
    pub email: String,
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailVerification {
    Verifying,
    Verified(String),
    Failed(String),
}

#[derive(Debug, Default)]
pub struct AuthState {
    pub busy: bool,
    pub form_errors: FormErrors,
    pub error: Option<String>,
    pub notice: Option<String>,
    pub pending_verification: Option<PendingVerification>,
    pub reset_token: Option<SecretString>,
    pub email_verification: Option<EmailVerification>,
}

impl AuthState {
    /// Clears the outcome of the previous submit before starting a new one.
    pub fn begin(&mut self) {
        self.busy = true;
        self.form_errors = FormErrors::new();
        self.error = None;
        self.notice = None;
    }

    pub fn reject(&mut self, errors: FormErrors) {
        self.busy = false;
        self.form_errors = errors;
    }
}
