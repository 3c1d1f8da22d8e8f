use aidlink_shared::auth::{LoginForm, RegisterForm};
use aidlink_shared::camp::CampForm;
use aidlink_shared::config::ConfigInput;
use aidlink_shared::view::EmailVerificationView;
use aidlink_shared::{App, Effect, Event, Model};
use crux_core::testing::{AppTester, Update};
use crux_core::Request;
use crux_http::protocol::{HttpRequest, HttpResponse, HttpResult};
use serde_json::json;

fn http_requests(update: Update<Effect, Event>) -> Vec<Request<HttpRequest>> {
    update
        .effects
        .into_iter()
        .filter_map(|effect| match effect {
            Effect::Http(request) => Some(request),
            _ => None,
        })
        .collect()
}

fn only_request(update: Update<Effect, Event>) -> Request<HttpRequest> {
    let mut requests = http_requests(update);
    assert_eq!(requests.len(), 1, "expected exactly one http request");
    requests.remove(0)
}

fn header<'a>(request: &'a HttpRequest, name: &str) -> Option<&'a str> {
    request
        .headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

fn body(request: &HttpRequest) -> serde_json::Value {
    serde_json::from_slice(&request.body).unwrap()
}

fn feed(
    app: &AppTester<App, Effect>,
    update: Update<Effect, Event>,
    model: &mut Model,
) -> Vec<Effect> {
    update
        .events
        .into_iter()
        .flat_map(|event| app.update(event, model).effects)
        .collect()
}

fn login_form() -> LoginForm {
    serde_json::from_value(json!({ "email": "sita@example.com", "password": "Str0ng!pass" }))
        .unwrap()
}

fn camp_form() -> CampForm {
    serde_json::from_value(json!({
        "name": "Free eye checkup",
        "location": "Patan Durbar Square",
        "organizer": "Lalitpur Municipality",
        "contact": "9841234567",
        "description": "Vision screening and free glasses",
        "date": "2030-02-01",
        "days": 2,
        "starting_time": "09:00",
        "ending_time": "16:00",
        "lat": 27.6766,
        "lng": 85.3180,
        "services": ["Eye test", " "]
    }))
    .unwrap()
}

fn sign_in(app: &AppTester<App, Effect>, model: &mut Model) {
    let mut request = only_request(app.update(Event::LoginSubmitted(login_form()), model));
    let response = HttpResponse::ok()
        .json(json!({ "accessToken": "tok-123", "message": "Welcome back", "id": 42 }))
        .build();
    let update = app.resolve(&mut request, HttpResult::Ok(response)).unwrap();
    feed(app, update, model);
}

#[test]
fn login_attaches_bearer_and_logout_clears_it() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    let mut request = only_request(app.update(Event::LoginSubmitted(login_form()), &mut model));
    assert_eq!(request.operation.url, "http://localhost:5000/auth/login");
    assert_eq!(
        body(&request.operation),
        json!({ "email": "sita@example.com", "password": "Str0ng!pass" })
    );
    assert!(header(&request.operation, "authorization").is_none());
    assert!(app.view(&model).auth.busy);

    let response = HttpResponse::ok()
        .json(json!({ "accessToken": "tok-123", "message": "Welcome back", "id": 42 }))
        .build();
    let update = app.resolve(&mut request, HttpResult::Ok(response)).unwrap();
    feed(&app, update, &mut model);

    let view = app.view(&model);
    assert!(view.auth.signed_in);
    assert_eq!(view.auth.user_id, Some(42));
    assert_eq!(view.auth.notice.as_deref(), Some("Welcome back"));
    assert!(!view.auth.busy);
    assert!(view.camps.can_add);

    let request = only_request(app.update(Event::FetchCamps, &mut model));
    assert_eq!(header(&request.operation, "authorization"), Some("Bearer tok-123"));

    let request = only_request(app.update(Event::LogoutRequested, &mut model));
    assert_eq!(request.operation.url, "http://localhost:5000/auth/logout");
    assert_eq!(header(&request.operation, "authorization"), Some("Bearer tok-123"));
    assert_eq!(body(&request.operation), json!({ "userId": 42 }));
    assert!(!model.session.is_signed_in());

    let request = only_request(app.update(Event::FetchCamps, &mut model));
    assert!(header(&request.operation, "authorization").is_none());
}

#[test]
fn second_login_is_refused_while_signed_in() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    sign_in(&app, &mut model);

    let update = app.update(Event::LoginSubmitted(login_form()), &mut model);
    assert!(http_requests(update).is_empty());
    assert_eq!(model.session.user_id().map(|id| id.0), Some(42));
    assert!(app.view(&model).auth.error.is_some());
}

#[test]
fn rejected_login_shows_server_message() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    let mut request = only_request(app.update(Event::LoginSubmitted(login_form()), &mut model));
    let response = HttpResponse::status(401)
        .json(json!({ "message": "Invalid credentials" }))
        .build();
    let update = app.resolve(&mut request, HttpResult::Ok(response)).unwrap();
    feed(&app, update, &mut model);

    let view = app.view(&model);
    assert!(!view.auth.signed_in);
    assert_eq!(view.auth.error.as_deref(), Some("Invalid credentials"));
}

#[test]
fn adding_a_camp_needs_a_session_by_default() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    let update = app.update(Event::CampSubmitted(camp_form()), &mut model);
    assert!(http_requests(update).is_empty());
    let view = app.view(&model);
    assert_eq!(view.camps.add_error.as_deref(), Some("Please sign in to continue."));
    assert!(!view.camps.submitting);
    assert!(!view.camps.can_add);
}

#[test]
fn optional_policy_sends_camp_without_token() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    let input: ConfigInput =
        serde_json::from_value(json!({ "camp_write_policy": "optional" })).unwrap();
    app.update(Event::Configure(input), &mut model);

    let request = only_request(app.update(Event::CampSubmitted(camp_form()), &mut model));
    assert_eq!(request.operation.url, "http://localhost:5000/camp/add");
    assert!(header(&request.operation, "authorization").is_none());
    assert!(app.view(&model).camps.submitting);
}

#[test]
fn signed_in_camp_add_refreshes_the_directory() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    sign_in(&app, &mut model);

    let mut request = only_request(app.update(Event::CampSubmitted(camp_form()), &mut model));
    assert_eq!(header(&request.operation, "authorization"), Some("Bearer tok-123"));
    let sent = body(&request.operation);
    assert_eq!(sent["date"], "2030-02-01");
    assert_eq!(sent["services"], json!(["Eye test"]));
    assert!(sent.get("id").is_none());

    let response = HttpResponse::ok().json(json!({ "message": "created" })).build();
    let update = app.resolve(&mut request, HttpResult::Ok(response)).unwrap();
    let effects = feed(&app, update, &mut model);

    let urls: Vec<String> = effects
        .into_iter()
        .filter_map(|e| match e {
            Effect::Http(request) => Some(request.operation.url),
            _ => None,
        })
        .collect();
    assert_eq!(
        urls,
        vec![
            "http://localhost:5000/camp".to_string(),
            "http://localhost:5000/camp/recent".to_string()
        ]
    );
    let view = app.view(&model);
    assert_eq!(view.camps.notice.as_deref(), Some("Camp added successfully"));
    assert!(!view.camps.submitting);
}

#[test]
fn invalid_camp_form_reports_every_field() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    sign_in(&app, &mut model);

    let mut form = camp_form();
    form.name = "  ".into();
    form.days = 0;
    form.ending_time = "08:00".into();

    let update = app.update(Event::CampSubmitted(form), &mut model);
    assert!(http_requests(update).is_empty());

    let errors = app.view(&model).camps.form_errors;
    assert_eq!(errors.get("name"), Some("Camp name is required"));
    assert_eq!(errors.get("days"), Some("Duration must be at least 1 day"));
    assert_eq!(errors.get("ending_time"), Some("End time must be after start time"));
}

#[test]
fn registration_then_otp_verification() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    let form: RegisterForm = serde_json::from_value(json!({
        "fullName": "Sita Sharma",
        "email": "sita@example.com",
        "password": "Str0ng!pass",
        "confirmPassword": "Str0ng!pass",
        "role": "local_body",
        "checkbox": true
    }))
    .unwrap();
    let mut request = only_request(app.update(Event::RegisterSubmitted(form), &mut model));
    assert_eq!(request.operation.url, "http://localhost:5000/auth/register");
    assert_eq!(body(&request.operation)["role"], "local_body");

    let response = HttpResponse::ok()
        .json(json!({ "token": "reg-token", "message": "OTP sent to your email" }))
        .build();
    let update = app.resolve(&mut request, HttpResult::Ok(response)).unwrap();
    feed(&app, update, &mut model);

    let view = app.view(&model);
    assert!(view.auth.awaiting_otp);
    assert_eq!(view.auth.otp_email.as_deref(), Some("sita@example.com"));
    assert_eq!(view.auth.notice.as_deref(), Some("OTP sent to your email"));

    let update = app.update(Event::OtpSubmitted { otp: "12ab".into() }, &mut model);
    assert!(http_requests(update).is_empty());
    assert_eq!(
        app.view(&model).auth.form_errors.get("otp"),
        Some("OTP must contain only digits")
    );

    let mut request =
        only_request(app.update(Event::OtpSubmitted { otp: " 482913 ".into() }, &mut model));
    assert_eq!(
        body(&request.operation),
        json!({ "token": "reg-token", "email": "sita@example.com", "otp": "482913" })
    );

    let response = HttpResponse::ok().json(json!({ "resetToken": "reset-1" })).build();
    let update = app.resolve(&mut request, HttpResult::Ok(response)).unwrap();
    feed(&app, update, &mut model);

    let view = app.view(&model);
    assert!(view.auth.otp_verified);
    assert!(!view.auth.awaiting_otp);
}

#[test]
fn mismatched_registration_is_not_sent() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    let form: RegisterForm = serde_json::from_value(json!({
        "fullName": "",
        "email": "not-an-email",
        "password": "weak",
        "confirmPassword": "weaker",
        "role": null,
        "checkbox": false
    }))
    .unwrap();
    let update = app.update(Event::RegisterSubmitted(form), &mut model);
    assert!(http_requests(update).is_empty());

    let view = app.view(&model);
    assert_eq!(view.auth.form_errors.len(), 6);
    assert_eq!(view.auth.form_errors.get("confirmPassword"), Some("Passwords do not match."));
    assert!(!view.auth.busy);
}

#[test]
fn email_verification_link() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    let update = app.update(
        Event::VerifyEmailLinkOpened {
            token: Some("t".into()),
            email: None,
        },
        &mut model,
    );
    assert!(http_requests(update).is_empty());
    assert_eq!(
        app.view(&model).auth.email_verification,
        Some(EmailVerificationView::Error {
            message: "Invalid verification link".into()
        })
    );

    let mut request = only_request(app.update(
        Event::VerifyEmailLinkOpened {
            token: Some("t".into()),
            email: Some("sita@example.com".into()),
        },
        &mut model,
    ));
    assert_eq!(request.operation.url, "http://localhost:5000/auth/verify-email");
    assert_eq!(
        app.view(&model).auth.email_verification,
        Some(EmailVerificationView::Verifying)
    );

    let response = HttpResponse::status(400)
        .json(json!({ "message": "Verification link expired" }))
        .build();
    let update = app.resolve(&mut request, HttpResult::Ok(response)).unwrap();
    feed(&app, update, &mut model);
    assert_eq!(
        app.view(&model).auth.email_verification,
        Some(EmailVerificationView::Error {
            message: "Verification link expired".into()
        })
    );
}
