use chrono::Local;
use crux_http::{RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::auth::{
    LoginResponse, LogoutRequest, OtpForm, OtpResponse, RegisterResponse, SessionError,
    VerifyEmailRequest, VerifyEmailResponse,
};
use crate::camp::{Camp, CampForm, CampId};
use crate::capabilities::{with_bearer, Capabilities, Endpoint};
use crate::chat::{ChatResponse, Transition, SUGGESTED_QUESTIONS};
use crate::config::CampWritePolicy;
use crate::error::{ApiError, AppError, ErrorKind};
use crate::event::Event;
use crate::form::FormErrors;
use crate::model::{EmailVerification, Model, PendingVerification};
use crate::view::{view_model, ViewModel};
use crate::UnixTimeMs;

const CAMP_ADDED: &str = "Camp added successfully";
const SIGN_IN_TO_ADD_CAMP: &str = "Please sign in to add a camp";
const INVALID_VERIFICATION_LINK: &str = "Invalid verification link";
const VERIFICATION_FAILED: &str = "Verification failed";
const EMAIL_VERIFIED: &str = "Email verified successfully!";
const VERIFICATION_EXPIRED: &str = "Verification session expired. Please register again";

/// The camp list endpoint answers with either a bare array or `{ data: [...] }`.
/// Entries are kept raw so one malformed record cannot sink the whole list.
#[derive(Deserialize)]
#[serde(untagged)]
enum CampList {
    Bare(Vec<serde_json::Value>),
    Wrapped {
        #[serde(alias = "camps")]
        data: Vec<serde_json::Value>,
    },
}

impl From<CampList> for Vec<Camp> {
    fn from(list: CampList) -> Self {
        let (CampList::Bare(entries) | CampList::Wrapped { data: entries }) = list;
        entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<Camp>(entry) {
                Ok(camp) => Some(camp),
                Err(err) => {
                    warn!(reason = %err, "skipping malformed camp record");
                    None
                }
            })
            .collect()
    }
}

fn into_body<T>(result: crux_http::Result<Response<T>>) -> Result<T, ApiError> {
    let mut response = result?;
    response.take_body().ok_or_else(|| {
        ApiError::new("Empty response body").with_code(ErrorKind::Deserialization.code())
    })
}

fn into_unit(result: crux_http::Result<Response<Vec<u8>>>) -> Result<(), ApiError> {
    result.map(|_| ()).map_err(ApiError::from)
}

#[derive(Default)]
pub struct App;

impl App {
    fn get(model: &Model, caps: &Capabilities, endpoint: Endpoint) -> RequestBuilder<Event> {
        let builder = caps.http.get(model.config.api_base_url.endpoint(endpoint));
        with_bearer(builder, &model.session)
    }

    fn post<B: Serialize>(
        model: &Model,
        caps: &Capabilities,
        endpoint: Endpoint,
        body: &B,
    ) -> Result<RequestBuilder<Event>, ApiError> {
        let builder = caps.http.post(model.config.api_base_url.endpoint(endpoint));
        with_bearer(builder, &model.session)
            .body_json(body)
            .map_err(ApiError::from)
    }

    fn locate(model: &mut Model, caps: &Capabilities) {
        if model.locating {
            return;
        }
        model.locating = true;
        caps.geolocation.current_position(Event::LocationResolved);
    }

    fn fetch_camps(model: &mut Model, caps: &Capabilities) {
        model.camps.loading = true;
        Self::get(model, caps, Endpoint::Camps)
            .expect_json::<CampList>()
            .send(|result| Event::CampsLoaded(into_body(result).map(Vec::from)));
    }

    fn fetch_recent_camps(model: &mut Model, caps: &Capabilities) {
        model.camps.recent_loading = true;
        Self::get(model, caps, Endpoint::RecentCamps)
            .expect_json::<CampList>()
            .send(|result| Event::RecentCampsLoaded(into_body(result).map(Vec::from)));
    }

    /// Replaces whatever route is on the map with one from the user to `camp_id`.
    fn show_route(model: &mut Model, caps: &Capabilities, camp_id: CampId) {
        let Some(user) = model.location.coordinate() else {
            debug!(camp_id, "no user location, route skipped");
            return;
        };
        let Some(target) = model.camps.find(camp_id).and_then(Camp::coordinate) else {
            debug!(camp_id, "camp has no position, route skipped");
            return;
        };

        let (route_id, previous) = model.map.route.acquire(camp_id);
        if let Some(previous) = previous {
            caps.map.remove_route(previous.release());
        }
        caps.map
            .draw_route(route_id, user.into(), target.into(), move |outcome| {
                Event::RouteResolved { route_id, outcome }
            });
    }

    fn clear_route(model: &mut Model, caps: &Capabilities) {
        if let Some(handle) = model.map.route.release() {
            caps.map.remove_route(handle.release());
        }
    }

    fn send_chat_message(model: &mut Model, caps: &Capabilities, text: &str) {
        let now = UnixTimeMs::now();
        match model.chat.session.submit(text, now) {
            Transition::Started {
                request_id,
                request,
            } => {
                model.chat.draft.clear();
                if model.speech.listening {
                    model.speech.listening = false;
                    caps.speech.stop_listening();
                }

                match Self::post(model, caps, Endpoint::Chat, &request) {
                    Ok(builder) => builder.expect_json::<ChatResponse>().send(move |result| {
                        Event::ChatReplied {
                            request_id,
                            outcome: into_body(result),
                        }
                    }),
                    Err(e) => {
                        model.chat.session.complete(request_id, Err(e), now);
                    }
                }
            }
            Transition::Rejected(reason) => debug!(?reason, "chat submit rejected"),
            _ => {}
        }
    }

    fn submit_camp(model: &mut Model, caps: &Capabilities, form: &CampForm) {
        if model.camps.submitting {
            debug!("camp submit ignored while one is in flight");
            return;
        }
        model.camps.notice = None;
        model.camps.add_error = None;

        let payload = match form.validate() {
            Ok(payload) => payload,
            Err(errors) => {
                debug!(fields = errors.len(), "camp form rejected");
                model.camps.form_errors = errors;
                return;
            }
        };
        model.camps.form_errors = FormErrors::new();

        if model.config.camp_write_policy == CampWritePolicy::RequireBearer
            && !model.session.is_signed_in()
        {
            model.camps.add_error =
                Some(AppError::new(ErrorKind::Authentication, SIGN_IN_TO_ADD_CAMP));
            return;
        }

        match Self::post(model, caps, Endpoint::AddCamp, &payload) {
            Ok(builder) => {
                model.camps.submitting = true;
                builder.send(|result| Event::CampAdded(into_unit(result)));
            }
            Err(e) => model.camps.add_error = Some(e.into()),
        }
    }

    fn verify_email(
        model: &mut Model,
        caps: &Capabilities,
        token: Option<String>,
        email: Option<String>,
    ) {
        let present = |v: Option<String>| v.filter(|s| !s.trim().is_empty());
        let (Some(token), Some(email)) = (present(token), present(email)) else {
            model.auth.email_verification =
                Some(EmailVerification::Failed(INVALID_VERIFICATION_LINK.to_string()));
            return;
        };

        let request = VerifyEmailRequest { token, email };
        match Self::post(model, caps, Endpoint::VerifyEmail, &request) {
            Ok(builder) => {
                model.auth.email_verification = Some(EmailVerification::Verifying);
                builder
                    .expect_json::<VerifyEmailResponse>()
                    .send(|result| Event::EmailVerified(into_body(result)));
            }
            Err(e) => {
                warn!(error = %e, "could not build verification request");
                model.auth.email_verification =
                    Some(EmailVerification::Failed(VERIFICATION_FAILED.to_string()));
            }
        }
    }
}

impl crux_core::App for App {
    type Event = Event;
    type Model = Model;
    type ViewModel = ViewModel;
    type Capabilities = Capabilities;

    fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
        let event_name = event.name();
        if event.is_user_initiated() {
            info!(event = event_name, "user action");
        } else {
            debug!(event = event_name, "update");
        }

        match event {
            Event::Configure(input) => match model.config.merged(input) {
                Ok(config) => {
                    info!(
                        api = %config.api_base_url,
                        radius_km = config.nearby_radius_km,
                        "configured"
                    );
                    model.config = config;
                    model.config_error = None;
                }
                Err(e) => {
                    warn!(error = %e, "configuration rejected, keeping previous settings");
                    model.config_error = Some(e.into());
                }
            },

            Event::AppStarted => {
                Self::locate(model, caps);
                Self::fetch_camps(model, caps);
                Self::fetch_recent_camps(model, caps);
            }

            Event::SpeechSupportDetected {
                recognition,
                synthesis,
            } => {
                model.speech.recognition_supported = recognition;
                model.speech.synthesis_supported = synthesis;
                if !recognition {
                    model.speech.listening = false;
                }
                if !synthesis {
                    model.speech.speak_replies = false;
                }
            }

            Event::LocateUser => Self::locate(model, caps),

            Event::LocationResolved(sample) => {
                model.locating = false;
                model.location = sample;

                if let Some(position) = model.location.coordinate() {
                    info!("user located");
                    caps.map.fly_to(position.into(), model.config.map_zoom);
                    if let Some(camp_id) = model.map.selected {
                        if model.map.route.camp_id() != Some(camp_id) {
                            Self::show_route(model, caps, camp_id);
                        }
                    }
                } else {
                    if let Some(error) = &model.location.error {
                        warn!(code = error.code, reason = %error.message, "geolocation failed");
                    }
                    // A route drawn from the previous position no longer has an origin.
                    Self::clear_route(model, caps);
                }
            }

            Event::CampSelected { camp_id } => {
                if model.camps.find(camp_id).is_none() {
                    warn!(camp_id, "selected camp is not in the directory");
                    return;
                }
                let already_routed = model.map.selected == Some(camp_id)
                    && model.map.route.camp_id() == Some(camp_id);
                model.map.selected = Some(camp_id);
                if !already_routed {
                    Self::show_route(model, caps, camp_id);
                }
            }

            Event::SelectionCleared | Event::MapClosed => {
                model.map.selected = None;
                Self::clear_route(model, caps);
            }

            Event::RouteResolved { route_id, outcome } => match outcome {
                Ok(summary) => {
                    if !model.map.route.mark_shown(route_id, summary) {
                        // The shell may finish drawing after the removal was sent.
                        debug!(%route_id, "stale route drawn, removing");
                        caps.map.remove_route(route_id);
                        return;
                    }
                }
                Err(message) => match model.map.route.fail(route_id) {
                    Some(handle) => {
                        warn!(%route_id, reason = %message, "route failed");
                        caps.map.remove_route(handle.release());
                    }
                    None => {
                        debug!(%route_id, "stale route failure ignored");
                        return;
                    }
                },
            },

            Event::FetchCamps => Self::fetch_camps(model, caps),
            Event::FetchRecentCamps => Self::fetch_recent_camps(model, caps),

            Event::CampsLoaded(result) => {
                model.camps.loading = false;
                match result {
                    Ok(camps) => {
                        info!(count = camps.len(), "camps loaded");
                        model.camps.all = camps;
                        model.camps.error = None;
                        if let Some(selected) = model.map.selected {
                            if model.camps.find(selected).is_none() {
                                model.map.selected = None;
                                Self::clear_route(model, caps);
                            }
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, status = ?e.status, "loading camps failed");
                        model.camps.error = Some(e.into());
                    }
                }
            }

            Event::RecentCampsLoaded(result) => {
                model.camps.recent_loading = false;
                match result {
                    Ok(camps) => {
                        debug!(count = camps.len(), "recent camps loaded");
                        model.camps.recent = camps;
                    }
                    Err(e) => {
                        warn!(error = %e, status = ?e.status, "loading recent camps failed");
                        model.camps.error = Some(e.into());
                    }
                }
            }

            Event::CampSearchChanged { term } => model.camps.search = term,

            Event::CampSubmitted(form) => Self::submit_camp(model, caps, &form),

            Event::CampAdded(result) => {
                model.camps.submitting = false;
                match result {
                    Ok(()) => {
                        info!("camp added");
                        model.camps.notice = Some(CAMP_ADDED.to_string());
                        Self::fetch_camps(model, caps);
                        Self::fetch_recent_camps(model, caps);
                    }
                    Err(e) => {
                        warn!(error = %e, status = ?e.status, "adding camp failed");
                        model.camps.add_error = Some(e.into());
                    }
                }
            }

            Event::DraftChanged { text } => model.chat.draft = text,

            Event::SuggestionChosen { index } => {
                if model.chat.session.is_pending() || !model.chat.session.is_fresh() {
                    return;
                }
                if let Some(question) = SUGGESTED_QUESTIONS.get(index) {
                    model.chat.draft = (*question).to_string();
                }
            }

            Event::SendDraft => {
                let draft = model.chat.draft.clone();
                Self::send_chat_message(model, caps, &draft);
            }

            Event::ChatReplied {
                request_id,
                outcome,
            } => match model.chat.session.complete(request_id, outcome, UnixTimeMs::now()) {
                Transition::Succeeded(message) => {
                    if model.speech.speak_replies && model.speech.synthesis_supported {
                        caps.speech.speak(message.body.spoken_text());
                    }
                }
                Transition::Rejected(reason) => {
                    debug!(?reason, %request_id, "chat reply ignored");
                    return;
                }
                _ => {}
            },

            Event::ResetChat => {
                if let Transition::Rejected(reason) = model.chat.session.reset(UnixTimeMs::now()) {
                    debug!(?reason, "chat reset rejected");
                }
            }

            Event::ToggleListening => {
                if !model.speech.recognition_supported || model.chat.session.is_pending() {
                    debug!("voice input toggle ignored");
                    return;
                }
                model.speech.listening = !model.speech.listening;
                if model.speech.listening {
                    caps.speech.start_listening();
                } else {
                    caps.speech.stop_listening();
                }
            }

            Event::ToggleSpeech => {
                if !model.speech.synthesis_supported || model.chat.session.is_pending() {
                    debug!("speech toggle ignored");
                    return;
                }
                model.speech.speak_replies = !model.speech.speak_replies;
                if !model.speech.speak_replies {
                    caps.speech.stop_speaking();
                }
            }

            Event::VoiceTranscript { text } => {
                if !model.speech.listening {
                    return;
                }
                model.chat.draft = text;
            }

            Event::VoiceSilence => {
                if !model.speech.listening || model.chat.draft.trim().is_empty() {
                    return;
                }
                let draft = model.chat.draft.clone();
                Self::send_chat_message(model, caps, &draft);
            }

            Event::RegisterSubmitted(form) => {
                if model.auth.busy {
                    return;
                }
                model.auth.begin();
                let request = match form.validate() {
                    Ok(request) => request,
                    Err(errors) => {
                        model.auth.reject(errors);
                        caps.render.render();
                        return;
                    }
                };
                let email = request.email.clone();
                match Self::post(model, caps, Endpoint::Register, &request) {
                    Ok(builder) => builder.expect_json::<RegisterResponse>().send(move |result| {
                        Event::Registered {
                            email,
                            outcome: into_body(result),
                        }
                    }),
                    Err(e) => {
                        model.auth.busy = false;
                        model.auth.error = Some(e.message);
                    }
                }
            }

            Event::Registered { email, outcome } => {
                model.auth.busy = false;
                match outcome {
                    Ok(response) => {
                        info!("registered");
                        if let Some(token) = response.token {
                            model.auth.pending_verification =
                                Some(PendingVerification { email, token });
                        }
                        model.auth.notice = Some(
                            response
                                .message
                                .unwrap_or_else(|| "Registration successful".to_string()),
                        );
                    }
                    Err(e) => {
                        warn!(error = %e, status = ?e.status, "registration failed");
                        model.auth.error = Some(e.message);
                    }
                }
            }

            Event::LoginSubmitted(form) => {
                if model.auth.busy {
                    return;
                }
                if let Some(user_id) = model.session.user_id() {
                    model.auth.error = Some(SessionError::AlreadySignedIn(user_id).to_string());
                    caps.render.render();
                    return;
                }
                model.auth.begin();
                let request = match form.validate() {
                    Ok(request) => request,
                    Err(errors) => {
                        model.auth.reject(errors);
                        caps.render.render();
                        return;
                    }
                };
                match Self::post(model, caps, Endpoint::Login, &request) {
                    Ok(builder) => builder
                        .expect_json::<LoginResponse>()
                        .send(|result| Event::LoggedIn(into_body(result))),
                    Err(e) => {
                        model.auth.busy = false;
                        model.auth.error = Some(e.message);
                    }
                }
            }

            Event::LoggedIn(outcome) => {
                model.auth.busy = false;
                match outcome {
                    Ok(response) => {
                        match model.session.sign_in(response.id, response.access_token) {
                            Ok(()) => {
                                model.auth.notice = Some(if response.message.is_empty() {
                                    "Login successful".to_string()
                                } else {
                                    response.message
                                });
                            }
                            Err(e) => {
                                warn!(error = %e, "login response not applied");
                                model.auth.error = Some(e.to_string());
                            }
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, status = ?e.status, "login failed");
                        model.auth.error = Some(e.message);
                    }
                }
            }

            Event::OtpSubmitted { otp } => {
                if model.auth.busy {
                    return;
                }
                let Some(pending) = model.auth.pending_verification.clone() else {
                    model.auth.error = Some(VERIFICATION_EXPIRED.to_string());
                    caps.render.render();
                    return;
                };
                model.auth.begin();
                let form = OtpForm {
                    token: pending.token,
                    email: pending.email,
                    otp,
                };
                let request = match form.validate() {
                    Ok(request) => request,
                    Err(errors) => {
                        model.auth.reject(errors);
                        caps.render.render();
                        return;
                    }
                };
                match Self::post(model, caps, Endpoint::VerifyOtp, &request) {
                    Ok(builder) => builder
                        .expect_json::<OtpResponse>()
                        .send(|result| Event::OtpVerified(into_body(result))),
                    Err(e) => {
                        model.auth.busy = false;
                        model.auth.error = Some(e.message);
                    }
                }
            }

            Event::OtpVerified(outcome) => {
                model.auth.busy = false;
                match outcome {
                    Ok(response) => {
                        info!("otp verified");
                        model.auth.pending_verification = None;
                        model.auth.reset_token = Some(response.reset_token);
                        model.auth.notice = Some("OTP verified successfully".to_string());
                    }
                    Err(e) => {
                        warn!(error = %e, status = ?e.status, "otp verification failed");
                        model.auth.error = Some(e.message);
                    }
                }
            }

            Event::VerifyEmailLinkOpened { token, email } => {
                Self::verify_email(model, caps, token, email);
            }

            Event::EmailVerified(outcome) => {
                model.auth.email_verification = Some(match outcome {
                    Ok(response) => EmailVerification::Verified(
                        response.message.unwrap_or_else(|| EMAIL_VERIFIED.to_string()),
                    ),
                    Err(e) => {
                        warn!(error = %e, status = ?e.status, "email verification failed");
                        EmailVerification::Failed(if e.status.is_some() {
                            e.message
                        } else {
                            VERIFICATION_FAILED.to_string()
                        })
                    }
                });
            }

            Event::LogoutRequested => {
                let Some(user_id) = model.session.user_id() else {
                    debug!("logout without a session");
                    return;
                };
                // Built before the session is cleared so it still carries the bearer.
                let request = Self::post(model, caps, Endpoint::Logout, &LogoutRequest { user_id });
                model.session.sign_out();
                model.auth.reset_token = None;
                model.auth.notice = None;
                model.auth.error = None;
                match request {
                    Ok(builder) => builder.send(|result| Event::LoggedOut(into_unit(result))),
                    Err(e) => warn!(error = %e, "logout request not sent"),
                }
            }

            Event::LoggedOut(result) => {
                if let Err(e) = result {
                    warn!(error = %e, "logout request failed, session already cleared");
                }
                return;
            }
        }

        caps.render.render();
    }

    fn view(&self, model: &Model) -> ViewModel {
        view_model(model, Local::now().date_naive())
    }
}
