mod geolocation;
mod http;
mod map;
mod speech;

pub use self::geolocation::{Geolocation, GeolocationOperation, GeolocationOutput};
pub use self::http::{with_bearer, ApiBaseUrl, Endpoint, UrlError, MAX_URL_LENGTH};
pub use self::map::{MapControl, MapOperation, MapOutput};
pub use self::speech::{Speech, SpeechOperation};

pub use crux_core::render::Render;
pub use crux_http::Http;

use crate::event::Event;

/// Everything the core can ask a shell to do.
#[derive(crux_core::macros::Effect)]
pub struct Capabilities {
    pub http: Http<Event>,
    pub render: Render<Event>,
    pub geolocation: Geolocation<Event>,
    pub map: MapControl<Event>,
    pub speech: Speech<Event>,
}
