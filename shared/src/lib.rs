#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::too_many_lines)]

pub mod app;
pub mod auth;
pub mod camp;
pub mod capabilities;
pub mod chat;
pub mod config;
pub mod error;
pub mod event;
pub mod form;
pub mod geo;
pub mod model;
pub mod proximity;
pub mod route;
pub mod view;

use serde::{Deserialize, Serialize};

pub use app::App;
pub use capabilities::{Capabilities, Effect};
pub use crux_core::{render::Render, App as CruxApp, Core, Request};
pub use error::{ApiError, AppError, AppResult, ErrorKind, ErrorSeverity};
pub use event::Event;
pub use model::Model;
pub use view::ViewModel;

/// Explicit timestamp unit.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UnixTimeMs(pub u64);

impl UnixTimeMs {
    #[must_use]
    pub fn now() -> Self {
        let millis = chrono::Utc::now().timestamp_millis();
        Self(u64::try_from(millis).unwrap_or(0))
    }
}
