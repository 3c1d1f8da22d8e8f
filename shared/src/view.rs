use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::camp::{Camp, CampId, CampStatus};
use crate::chat::{
    format_medical_response, ChatMessage, MedicalResponse, MessageBody, Sender,
    SUGGESTED_QUESTIONS,
};
use crate::config::{CampWritePolicy, DEFAULT_MAP_CENTER};
use crate::error::AppError;
use crate::form::FormErrors;
use crate::geo::{format_distance, LatLng};
use crate::model::{EmailVerification, Model, SpeechState};
use crate::proximity::nearby_with_distance;
use crate::route::RouteState;

pub const VOICE_UNSUPPORTED: &str = "Voice input is not supported in this browser";
pub const SPEECH_UNSUPPORTED: &str = "Text-to-speech is not supported in this browser";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ViewModel {
    pub map: MapView,
    pub camps: CampsView,
    pub chat: ChatView,
    pub auth: AuthView,
    pub config_error: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MapView {
    pub center: LatLng,
    pub zoom: f64,
    pub user: Option<LatLng>,
    pub locating: bool,
    pub location_message: Option<String>,
    pub nearby: Vec<CampMarker>,
    pub radius_km: f64,
    pub selected: Option<CampCard>,
    pub route: Option<RouteView>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CampMarker {
    pub id: CampId,
    pub name: String,
    pub location: String,
    pub position: LatLng,
    pub distance: String,
    pub selected: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RouteView {
    Loading { camp_id: CampId },
    Shown { camp_id: CampId, distance: String, duration_min: u32 },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CampCard {
    pub id: CampId,
    pub name: String,
    pub location: String,
    pub organizer: String,
    pub contact: String,
    pub description: String,
    pub date: String,
    pub days: u32,
    pub time_window: String,
    pub services: Vec<String>,
    pub status: CampStatus,
    pub status_label: String,
}

impl CampCard {
    fn new(camp: &Camp, today: NaiveDate) -> Self {
        let status = camp.status_on(today);
        Self {
            id: camp.id,
            name: camp.name.clone(),
            location: camp.location.clone(),
            organizer: camp.organizer.clone(),
            contact: camp.contact.clone(),
            description: camp.description.clone(),
            date: camp.date.format("%b %-d, %Y").to_string(),
            days: camp.days,
            time_window: camp.time_window(),
            services: camp.services.clone().unwrap_or_default(),
            status,
            status_label: status.label().to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CampsView {
    pub loading: bool,
    pub error: Option<String>,
    pub search: String,
    pub cards: Vec<CampCard>,
    pub recent_loading: bool,
    pub recent: Vec<CampCard>,
    pub submitting: bool,
    pub form_errors: FormErrors,
    pub add_error: Option<String>,
    pub notice: Option<String>,
    pub can_add: bool,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: String },
    Medical { response: MedicalResponse, plain: String },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct MessageView {
    pub id: String,
    pub sender: Sender,
    pub content: MessageContent,
    pub timestamp: u64,
}

impl From<&ChatMessage> for MessageView {
    fn from(message: &ChatMessage) -> Self {
        let content = match &message.body {
            MessageBody::Text(text) => MessageContent::Text { text: text.clone() },
            MessageBody::Medical(response) => MessageContent::Medical {
                plain: format_medical_response(response),
                response: response.clone(),
            },
        };
        Self {
            id: message.id.to_string(),
            sender: message.sender,
            content,
            timestamp: message.timestamp.0,
        }
    }
}

/// A toggle button: whether it can be pressed, whether it is on, and its label.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ControlView {
    pub enabled: bool,
    pub active: bool,
    pub label: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChatView {
    pub messages: Vec<MessageView>,
    pub draft: String,
    pub is_pending: bool,
    pub input_enabled: bool,
    pub send_enabled: bool,
    pub can_reset: bool,
    pub show_welcome: bool,
    pub suggestions: Vec<String>,
    pub voice: ControlView,
    pub speech: ControlView,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EmailVerificationView {
    Verifying,
    Success { message: String },
    Error { message: String },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct AuthView {
    pub signed_in: bool,
    pub user_id: Option<u64>,
    pub busy: bool,
    pub form_errors: FormErrors,
    pub error: Option<String>,
    pub notice: Option<String>,
    pub awaiting_otp: bool,
    pub otp_email: Option<String>,
    pub otp_verified: bool,
    pub email_verification: Option<EmailVerificationView>,
}

#[must_use]
pub fn view_model(model: &Model, today: NaiveDate) -> ViewModel {
    ViewModel {
        map: map_view(model, today),
        camps: camps_view(model, today),
        chat: chat_view(model),
        auth: auth_view(model),
        config_error: model.config_error.as_ref().map(AppError::user_facing_message),
    }
}

fn map_view(model: &Model, today: NaiveDate) -> MapView {
    let user = model.location.coordinate().map(LatLng::from);
    let radius_km = model.config.nearby_radius_km;

    let nearby = user
        .map(|origin| {
            nearby_with_distance(origin, &model.camps.all, radius_km)
                .into_iter()
                .filter_map(|n| {
                    let position = n.camp.coordinate()?.into();
                    Some(CampMarker {
                        id: n.camp.id,
                        name: n.camp.name.clone(),
                        location: n.camp.location.clone(),
                        position,
                        distance: format_distance(n.distance_km),
                        selected: model.map.selected == Some(n.camp.id),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let route = match (model.map.route.camp_id(), model.map.route.state()) {
        (Some(camp_id), Some(RouteState::Requested)) => Some(RouteView::Loading { camp_id }),
        (Some(camp_id), Some(RouteState::Shown(summary))) => Some(RouteView::Shown {
            camp_id,
            distance: format_distance(summary.distance_km),
            duration_min: whole_minutes(summary.duration_min),
        }),
        _ => None,
    };

    let location_message = model
        .location
        .error
        .as_ref()
        .map(|e| AppError::from(e).user_facing_message());

    MapView {
        center: user.unwrap_or(DEFAULT_MAP_CENTER),
        zoom: model.config.map_zoom,
        user,
        locating: model.locating,
        location_message,
        nearby,
        radius_km,
        selected: model
            .map
            .selected
            .and_then(|id| model.camps.find(id))
            .map(|camp| CampCard::new(camp, today)),
        route,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_minutes(minutes: f64) -> u32 {
    if minutes.is_finite() {
        minutes.max(0.0).round() as u32
    } else {
        0
    }
}

fn camps_view(model: &Model, today: NaiveDate) -> CampsView {
    let camps = &model.camps;
    let cards = camps
        .all
        .iter()
        .filter(|camp| camp.matches_search(&camps.search))
        .map(|camp| CampCard::new(camp, today))
        .collect();

    CampsView {
        loading: camps.loading,
        error: camps.error.as_ref().map(AppError::user_facing_message),
        search: camps.search.clone(),
        cards,
        recent_loading: camps.recent_loading,
        recent: camps.recent.iter().map(|c| CampCard::new(c, today)).collect(),
        submitting: camps.submitting,
        form_errors: camps.form_errors.clone(),
        add_error: camps.add_error.as_ref().map(AppError::user_facing_message),
        notice: camps.notice.clone(),
        can_add: match model.config.camp_write_policy {
            CampWritePolicy::RequireBearer => model.session.is_signed_in(),
            CampWritePolicy::Optional => true,
        },
    }
}

fn voice_control(speech: SpeechState, pending: bool) -> ControlView {
    if !speech.recognition_supported {
        return ControlView {
            enabled: false,
            active: false,
            label: VOICE_UNSUPPORTED.to_string(),
        };
    }
    ControlView {
        enabled: !pending,
        active: speech.listening,
        label: if speech.listening {
            "Stop voice input"
        } else {
            "Start voice input"
        }
        .to_string(),
    }
}

fn speech_control(speech: SpeechState, pending: bool) -> ControlView {
    if !speech.synthesis_supported {
        return ControlView {
            enabled: false,
            active: false,
            label: SPEECH_UNSUPPORTED.to_string(),
        };
    }
    ControlView {
        enabled: !pending,
        active: speech.speak_replies,
        label: if speech.speak_replies {
            "Turn off voice responses"
        } else {
            "Turn on voice responses"
        }
        .to_string(),
    }
}

fn chat_view(model: &Model) -> ChatView {
    let session = &model.chat.session;
    let pending = session.is_pending();
    let fresh = session.is_fresh();

    ChatView {
        messages: session.transcript().iter().map(MessageView::from).collect(),
        draft: model.chat.draft.clone(),
        is_pending: pending,
        input_enabled: !pending,
        send_enabled: !pending && !model.chat.draft.trim().is_empty(),
        can_reset: !pending && !fresh,
        show_welcome: fresh,
        suggestions: if fresh {
            SUGGESTED_QUESTIONS.iter().map(ToString::to_string).collect()
        } else {
            Vec::new()
        },
        voice: voice_control(model.speech, pending),
        speech: speech_control(model.speech, pending),
    }
}

fn auth_view(model: &Model) -> AuthView {
    let auth = &model.auth;
    AuthView {
        signed_in: model.session.is_signed_in(),
        user_id: model.session.user_id().map(|id| id.0),
        busy: auth.busy,
        form_errors: auth.form_errors.clone(),
        error: auth.error.clone(),
        notice: auth.notice.clone(),
        awaiting_otp: auth.pending_verification.is_some(),
        otp_email: auth.pending_verification.as_ref().map(|p| p.email.clone()),
        otp_verified: auth.reset_token.is_some(),
        email_verification: auth.email_verification.as_ref().map(|v| match v {
            EmailVerification::Verifying => EmailVerificationView::Verifying,
            EmailVerification::Verified(message) => EmailVerificationView::Success {
                message: message.clone(),
            },
            EmailVerification::Failed(message) => EmailVerificationView::Error {
                message: message.clone(),
            },
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeolocationSample;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()
    }

    fn camp(id: CampId, name: &str, lat: f64, lng: f64, date: &str) -> Camp {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "name": name,
            "location": "Lalitpur",
            "date": date,
            "days": 2,
            "starting_time": "09:00",
            "ending_time": "17:00",
            "lat": lat,
            "lng": lng,
        }))
        .unwrap()
    }

    #[test]
    fn fresh_chat_shows_welcome_and_suggestions() {
        let model = Model::default();
        let view = view_model(&model, today());

        assert_eq!(view.chat.messages.len(), 1);
        assert!(view.chat.show_welcome);
        assert_eq!(view.chat.suggestions.len(), 3);
        assert!(!view.chat.send_enabled);
        assert!(!view.chat.can_reset);
    }

    #[test]
    fn unsupported_speech_controls_are_disabled_with_labels() {
        let model = Model::default();
        let view = view_model(&model, today());

        assert!(!view.chat.voice.enabled);
        assert_eq!(view.chat.voice.label, VOICE_UNSUPPORTED);
        assert!(!view.chat.speech.enabled);
        assert_eq!(view.chat.speech.label, SPEECH_UNSUPPORTED);
    }

    #[test]
    fn map_without_location_uses_default_center_and_no_markers() {
        let mut model = Model::default();
        model.camps.all = vec![camp(1, "Free checkup", 27.67, 85.32, "2024-06-10")];

        let view = view_model(&model, today());
        assert_eq!(view.map.center, DEFAULT_MAP_CENTER);
        assert!(view.map.user.is_none());
        assert!(view.map.nearby.is_empty());
    }

    #[test]
    fn nearby_markers_carry_distance_and_selection() {
        let mut model = Model::default();
        model.location = GeolocationSample::located(27.7172, 85.3240);
        model.camps.all = vec![
            camp(1, "Kathmandu camp", 27.7172, 85.3340, "2024-06-10"),
            camp(2, "Pokhara camp", 28.2096, 83.9856, "2024-06-10"),
        ];
        model.map.selected = Some(1);

        let view = view_model(&model, today());
        assert_eq!(view.map.nearby.len(), 1);
        assert_eq!(view.map.nearby[0].id, 1);
        assert!(view.map.nearby[0].selected);
        assert_eq!(view.map.nearby[0].distance, "984 m");
        assert_eq!(view.map.selected.as_ref().map(|c| c.id), Some(1));
    }

    #[test]
    fn camp_cards_follow_search_and_status() {
        let mut model = Model::default();
        model.camps.all = vec![
            camp(1, "Eye camp", 27.7, 85.3, "2024-06-09"),
            camp(2, "Dental camp", 27.7, 85.3, "2024-07-01"),
        ];
        model.camps.search = "EYE".into();

        let view = view_model(&model, today());
        assert_eq!(view.camps.cards.len(), 1);
        assert_eq!(view.camps.cards[0].status, CampStatus::Active);
        assert_eq!(view.camps.cards[0].date, "Jun 9, 2024");
        assert_eq!(view.camps.cards[0].time_window, "09:00 - 17:00");
        assert!(!view.camps.can_add);
    }
}
