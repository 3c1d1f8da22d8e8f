use aidlink_shared::capabilities::{
    GeolocationOperation, GeolocationOutput, MapOperation, MapOutput,
};
use aidlink_shared::config::DEFAULT_MAP_CENTER;
use aidlink_shared::geo::GeolocationError;
use aidlink_shared::route::{RouteId, RouteSummary};
use aidlink_shared::view::RouteView;
use aidlink_shared::{App, Effect, Event, Model};
use crux_core::testing::{AppTester, Update};
use crux_core::Request;
use crux_http::protocol::{HttpRequest, HttpResponse, HttpResult};
use serde_json::json;

const KATHMANDU: (f64, f64) = (27.7172, 85.3240);

fn camps_body() -> serde_json::Value {
    json!([
        { "id": 1, "name": "Patan eye camp", "location": "Lalitpur", "date": "2030-01-05",
          "days": 2, "lat": 27.6766, "lng": 85.3180 },
        { "id": 2, "name": "Bhaktapur dental camp", "location": "Bhaktapur", "date": "2030-01-05",
          "days": 1, "lat": "27.6710", "lng": "85.4298" },
        { "id": 3, "name": "Pokhara health camp", "location": "Pokhara", "date": "2030-01-05",
          "days": 3, "lat": 28.2096, "lng": 83.9856 },
        { "id": 4, "name": "Unmapped camp", "location": "Somewhere", "date": "2030-01-05",
          "days": 1, "lat": null, "lng": "n/a" }
    ])
}

struct Started {
    geolocation: Request<GeolocationOperation>,
    camps: Request<HttpRequest>,
}

fn start(app: &AppTester<App, Effect>, model: &mut Model) -> Started {
    let update = app.update(Event::AppStarted, model);
    let mut geolocation = None;
    let mut camps = None;
    for effect in update.effects {
        match effect {
            Effect::Geolocation(request) => geolocation = Some(request),
            Effect::Http(request) if request.operation.url.ends_with("/camp") => {
                camps = Some(request);
            }
            _ => {}
        }
    }
    Started {
        geolocation: geolocation.expect("a geolocation request"),
        camps: camps.expect("a camp list request"),
    }
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

fn map_requests(effects: Vec<Effect>) -> Vec<Request<MapOperation>> {
    effects
        .into_iter()
        .filter_map(|effect| match effect {
            Effect::MapControl(request) => Some(request),
            _ => None,
        })
        .collect()
}

fn drawn_route(request: &Request<MapOperation>) -> RouteId {
    match request.operation {
        MapOperation::DrawRoute { route_id, .. } => route_id,
        ref other => panic!("expected a draw, got {other:?}"),
    }
}

fn located_with_camps(app: &AppTester<App, Effect>, model: &mut Model) -> Vec<Effect> {
    let Started {
        mut geolocation,
        mut camps,
    } = start(app, model);

    let update = app
        .resolve(
            &mut geolocation,
            GeolocationOutput::Position {
                lat: KATHMANDU.0,
                lng: KATHMANDU.1,
            },
        )
        .unwrap();
    let mut effects = feed(app, update, model);

    let response = HttpResponse::ok().json(camps_body()).build();
    let update = app.resolve(&mut camps, HttpResult::Ok(response)).unwrap();
    effects.extend(feed(app, update, model));
    effects
}

#[test]
fn located_user_sees_only_camps_within_radius() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();

    let effects = located_with_camps(&app, &mut model);
    let flights = map_requests(effects);
    assert!(flights.iter().any(|r| matches!(
        r.operation,
        MapOperation::FlyTo { zoom, .. } if (zoom - 13.0).abs() < f64::EPSILON
    )));

    let view = app.view(&model);
    let ids: Vec<u64> = view.map.nearby.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![1, 2]);
    assert!(view.map.user.is_some());
    assert_eq!(view.map.center.lat, KATHMANDU.0);
    assert_eq!(view.camps.cards.len(), 4);
}

#[test]
fn denied_location_keeps_default_center_and_no_markers() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    let Started {
        mut geolocation,
        mut camps,
    } = start(&app, &mut model);

    let update = app
        .resolve(
            &mut geolocation,
            GeolocationOutput::Error(GeolocationError {
                code: 1,
                message: "User denied Geolocation".into(),
            }),
        )
        .unwrap();
    let effects = feed(&app, update, &mut model);
    assert!(map_requests(effects).is_empty());

    let response = HttpResponse::ok().json(camps_body()).build();
    let update = app.resolve(&mut camps, HttpResult::Ok(response)).unwrap();
    feed(&app, update, &mut model);

    let view = app.view(&model);
    assert_eq!(view.map.center, DEFAULT_MAP_CENTER);
    assert!(view.map.nearby.is_empty());
    assert_eq!(
        view.map.location_message.as_deref(),
        Some("Location access was denied. Showing the default area.")
    );

    let update = app.update(Event::CampSelected { camp_id: 1 }, &mut model);
    assert!(map_requests(update.effects).is_empty());
    assert_eq!(app.view(&model).map.selected.map(|c| c.id), Some(1));
}

#[test]
fn selecting_another_camp_replaces_the_route() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    located_with_camps(&app, &mut model);

    let update = app.update(Event::CampSelected { camp_id: 1 }, &mut model);
    let mut first = map_requests(update.effects);
    assert_eq!(first.len(), 1);
    let first_id = drawn_route(&first[0]);

    let update = app.update(Event::CampSelected { camp_id: 2 }, &mut model);
    let mut second = map_requests(update.effects);
    assert_eq!(second.len(), 2);
    assert_eq!(
        second[0].operation,
        MapOperation::RemoveRoute { route_id: first_id }
    );
    let second_id = drawn_route(&second[1]);
    assert_ne!(first_id, second_id);

    // The first route finishes drawing after it was replaced.
    let summary = RouteSummary {
        distance_km: 4.6,
        duration_min: 12.0,
    };
    let update = app
        .resolve(&mut first[0], MapOutput::RouteDrawn(summary))
        .unwrap();
    let effects = feed(&app, update, &mut model);
    let removals = map_requests(effects);
    assert_eq!(removals.len(), 1);
    assert_eq!(
        removals[0].operation,
        MapOperation::RemoveRoute { route_id: first_id }
    );
    assert_eq!(
        app.view(&model).map.route,
        Some(RouteView::Loading { camp_id: 2 })
    );

    let update = app
        .resolve(
            &mut second[1],
            MapOutput::RouteDrawn(RouteSummary {
                distance_km: 11.2,
                duration_min: 24.6,
            }),
        )
        .unwrap();
    feed(&app, update, &mut model);
    assert_eq!(
        app.view(&model).map.route,
        Some(RouteView::Shown {
            camp_id: 2,
            distance: "11 km".into(),
            duration_min: 25,
        })
    );

    let update = app.update(Event::MapClosed, &mut model);
    let closing = map_requests(update.effects);
    assert_eq!(closing.len(), 1);
    assert_eq!(
        closing[0].operation,
        MapOperation::RemoveRoute { route_id: second_id }
    );
    let view = app.view(&model);
    assert!(view.map.route.is_none());
    assert!(view.map.selected.is_none());
}

#[test]
fn route_failure_keeps_selection_and_map_usable() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    located_with_camps(&app, &mut model);

    let update = app.update(Event::CampSelected { camp_id: 1 }, &mut model);
    let mut draws = map_requests(update.effects);
    let route_id = drawn_route(&draws[0]);

    let update = app
        .resolve(
            &mut draws[0],
            MapOutput::RouteFailed {
                message: "no route found".into(),
            },
        )
        .unwrap();
    let effects = feed(&app, update, &mut model);
    let removals = map_requests(effects);
    assert_eq!(removals.len(), 1);
    assert_eq!(removals[0].operation, MapOperation::RemoveRoute { route_id });

    let view = app.view(&model);
    assert!(view.map.route.is_none());
    assert_eq!(view.map.selected.map(|c| c.id), Some(1));
    assert_eq!(view.map.nearby.len(), 2);
}

#[test]
fn failed_camp_load_keeps_previous_list() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    located_with_camps(&app, &mut model);

    let update = app.update(Event::FetchCamps, &mut model);
    let mut request = update
        .effects
        .into_iter()
        .find_map(|e| match e {
            Effect::Http(request) => Some(request),
            _ => None,
        })
        .unwrap();
    let response = HttpResponse::status(503).build();
    let update = app.resolve(&mut request, HttpResult::Ok(response)).unwrap();
    feed(&app, update, &mut model);

    let view = app.view(&model);
    assert_eq!(view.camps.cards.len(), 4);
    assert_eq!(
        view.camps.error.as_deref(),
        Some("The server had a problem. Please try again later.")
    );
    assert!(!view.camps.loading);
}

#[test]
fn malformed_camp_records_are_skipped() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    let Started {
        mut geolocation,
        mut camps,
    } = start(&app, &mut model);

    let update = app
        .resolve(
            &mut geolocation,
            GeolocationOutput::Position {
                lat: KATHMANDU.0,
                lng: KATHMANDU.1,
            },
        )
        .unwrap();
    feed(&app, update, &mut model);

    let body = json!([
        { "id": 1, "name": "Patan eye camp", "location": "Lalitpur", "date": "2030-01-05",
          "days": 2, "lat": 27.6766, "lng": 85.3180 },
        { "id": 5, "name": "Undated camp", "location": "Kirtipur", "date": null,
          "days": 1, "lat": 27.6783, "lng": 85.2775 },
        { "id": 6, "name": "Negative camp", "location": "Thimi", "date": "2030-01-05",
          "days": -1, "lat": 27.6813, "lng": 85.3880 }
    ]);
    let response = HttpResponse::ok().json(body).build();
    let update = app.resolve(&mut camps, HttpResult::Ok(response)).unwrap();
    feed(&app, update, &mut model);

    let view = app.view(&model);
    let ids: Vec<u64> = view.map.nearby.iter().map(|m| m.id).collect();
    assert_eq!(ids, vec![1]);
    assert_eq!(view.camps.cards.len(), 1);
    assert!(view.camps.error.is_none());
}

#[test]
fn failed_relocation_removes_the_route() {
    let app = AppTester::<App, Effect>::default();
    let mut model = Model::default();
    located_with_camps(&app, &mut model);

    let update = app.update(Event::CampSelected { camp_id: 1 }, &mut model);
    let mut draws = map_requests(update.effects);
    let route_id = drawn_route(&draws[0]);
    let update = app
        .resolve(
            &mut draws[0],
            MapOutput::RouteDrawn(RouteSummary {
                distance_km: 4.6,
                duration_min: 12.0,
            }),
        )
        .unwrap();
    feed(&app, update, &mut model);
    assert!(app.view(&model).map.route.is_some());

    let update = app.update(Event::LocateUser, &mut model);
    let mut geolocation = update
        .effects
        .into_iter()
        .find_map(|e| match e {
            Effect::Geolocation(request) => Some(request),
            _ => None,
        })
        .unwrap();
    let update = app
        .resolve(
            &mut geolocation,
            GeolocationOutput::Error(GeolocationError {
                code: 3,
                message: "Timeout expired".into(),
            }),
        )
        .unwrap();
    let removals = map_requests(feed(&app, update, &mut model));
    assert_eq!(removals.len(), 1);
    assert_eq!(removals[0].operation, MapOperation::RemoveRoute { route_id });

    let view = app.view(&model);
    assert!(view.map.route.is_none());
    assert!(view.map.nearby.is_empty());
    assert_eq!(view.map.selected.map(|c| c.id), Some(1));
}
