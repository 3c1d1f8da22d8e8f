use serde::Deserialize;

use crate::auth::{
    LoginForm, LoginResponse, OtpResponse, RegisterForm, RegisterResponse, VerifyEmailResponse,
};
use crate::camp::{Camp, CampForm, CampId};
use crate::chat::{ChatRequestId, ChatResponse};
use crate::config::ConfigInput;
use crate::error::ApiError;
use crate::geo::GeolocationSample;
use crate::route::{RouteId, RouteSummary};

/// How long the shell waits after the last transcript before reporting silence.
pub const VOICE_SILENCE_MS: u64 = 2_000;

/// Events sent by the shell, plus internal events produced by capability
/// callbacks (`#[serde(skip)]`, the shell never sends those).
#[derive(Debug, Deserialize)]
pub enum Event {
    // lifecycle
    Configure(ConfigInput),
    AppStarted,
    SpeechSupportDetected { recognition: bool, synthesis: bool },

    // map
    LocateUser,
    CampSelected { camp_id: CampId },
    SelectionCleared,
    MapClosed,

    // camps
    FetchCamps,
    FetchRecentCamps,
    CampSearchChanged { term: String },
    CampSubmitted(CampForm),

    // chat
    DraftChanged { text: String },
    SuggestionChosen { index: usize },
    SendDraft,
    ResetChat,
    ToggleListening,
    ToggleSpeech,
    VoiceTranscript { text: String },
    VoiceSilence,

    // auth
    RegisterSubmitted(RegisterForm),
    LoginSubmitted(LoginForm),
    OtpSubmitted { otp: String },
    VerifyEmailLinkOpened { token: Option<String>, email: Option<String> },
    LogoutRequested,

    #[serde(skip)]
    LocationResolved(GeolocationSample),
    #[serde(skip)]
    RouteResolved {
        route_id: RouteId,
        outcome: Result<RouteSummary, String>,
    },
    #[serde(skip)]
    CampsLoaded(Result<Vec<Camp>, ApiError>),
    #[serde(skip)]
    RecentCampsLoaded(Result<Vec<Camp>, ApiError>),
    #[serde(skip)]
    CampAdded(Result<(), ApiError>),
    #[serde(skip)]
    ChatReplied {
        request_id: ChatRequestId,
        outcome: Result<ChatResponse, ApiError>,
    },
    #[serde(skip)]
    Registered {
        email: String,
        outcome: Result<RegisterResponse, ApiError>,
    },
    #[serde(skip)]
    LoggedIn(Result<LoginResponse, ApiError>),
    #[serde(skip)]
    OtpVerified(Result<OtpResponse, ApiError>),
    #[serde(skip)]
    EmailVerified(Result<VerifyEmailResponse, ApiError>),
    #[serde(skip)]
    LoggedOut(Result<(), ApiError>),
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Configure(_) => "configure",
            Self::AppStarted => "app_started",
            Self::SpeechSupportDetected { .. } => "speech_support_detected",
            Self::LocateUser => "locate_user",
            Self::CampSelected { .. } => "camp_selected",
            Self::SelectionCleared => "selection_cleared",
            Self::MapClosed => "map_closed",
            Self::FetchCamps => "fetch_camps",
            Self::FetchRecentCamps => "fetch_recent_camps",
            Self::CampSearchChanged { .. } => "camp_search_changed",
            Self::CampSubmitted(_) => "camp_submitted",
            Self::DraftChanged { .. } => "draft_changed",
            Self::SuggestionChosen { .. } => "suggestion_chosen",
            Self::SendDraft => "send_draft",
            Self::ResetChat => "reset_chat",
            Self::ToggleListening => "toggle_listening",
            Self::ToggleSpeech => "toggle_speech",
            Self::VoiceTranscript { .. } => "voice_transcript",
            Self::VoiceSilence => "voice_silence",
            Self::RegisterSubmitted(_) => "register_submitted",
            Self::LoginSubmitted(_) => "login_submitted",
            Self::OtpSubmitted { .. } => "otp_submitted",
            Self::VerifyEmailLinkOpened { .. } => "verify_email_link_opened",
            Self::LogoutRequested => "logout_requested",
            Self::LocationResolved(_) => "location_resolved",
            Self::RouteResolved { .. } => "route_resolved",
            Self::CampsLoaded(_) => "camps_loaded",
            Self::RecentCampsLoaded(_) => "recent_camps_loaded",
            Self::CampAdded(_) => "camp_added",
            Self::ChatReplied { .. } => "chat_replied",
            Self::Registered { .. } => "registered",
            Self::LoggedIn(_) => "logged_in",
            Self::OtpVerified(_) => "otp_verified",
            Self::EmailVerified(_) => "email_verified",
            Self::LoggedOut(_) => "logged_out",
        }
    }

    /// Whether the event came from a user action rather than a callback.
    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        matches!(
            self,
            Self::CampSelected { .. }
                | Self::SelectionCleared
                | Self::CampSearchChanged { .. }
                | Self::CampSubmitted(_)
                | Self::DraftChanged { .. }
                | Self::SuggestionChosen { .. }
                | Self::SendDraft
                | Self::ResetChat
                | Self::ToggleListening
                | Self::ToggleSpeech
                | Self::RegisterSubmitted(_)
                | Self::LoginSubmitted(_)
                | Self::OtpSubmitted { .. }
                | Self::LogoutRequested
        )
    }
}
