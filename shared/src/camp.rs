use chrono::{Days, NaiveDate, NaiveTime};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::OnceLock;

use crate::form::FormErrors;
use crate::geo::ValidatedCoordinate;

pub type CampId = u64;

/// A health camp as published by the camp directory. Read-only on the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camp {
    pub id: CampId,
    pub name: String,
    pub location: String,
    #[serde(default)]
    pub organizer: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub description: String,
    #[serde(deserialize_with = "deserialize_camp_date")]
    pub date: NaiveDate,
    #[serde(default)]
    pub days: u32,
    #[serde(default)]
    pub starting_time: String,
    #[serde(default)]
    pub ending_time: String,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_lenient_f64")]
    pub lng: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<Vec<String>>,
}

impl Camp {
    /// `None` when the camp has no usable position; such camps never take part
    /// in distance computations.
    #[must_use]
    pub fn coordinate(&self) -> Option<ValidatedCoordinate> {
        ValidatedCoordinate::new(self.lat?, self.lng?).ok()
    }

    /// Day after the camp's last day. Status still counts it as active.
    /// A zero duration counts as one day.
    #[must_use]
    pub fn end_date(&self) -> NaiveDate {
        let days = u64::from(self.days.max(1));
        self.date
            .checked_add_days(Days::new(days))
            .unwrap_or(NaiveDate::MAX)
    }

    #[must_use]
    pub fn status_on(&self, today: NaiveDate) -> CampStatus {
        if today >= self.date && today <= self.end_date() {
            CampStatus::Active
        } else if today > self.end_date() {
            CampStatus::Expired
        } else {
            CampStatus::Upcoming
        }
    }

    /// Case-insensitive substring match on name or location label.
    #[must_use]
    pub fn matches_search(&self, term: &str) -> bool {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&needle) || self.location.to_lowercase().contains(&needle)
    }

    #[must_use]
    pub fn time_window(&self) -> String {
        match (self.starting_time.trim(), self.ending_time.trim()) {
            ("", "") => String::new(),
            (start, "") => start.to_string(),
            ("", end) => format!("until {end}"),
            (start, end) => format!("{start} - {end}"),
        }
    }
}

#[must_use]
pub fn search_camps<'a>(camps: &'a [Camp], term: &str) -> Vec<&'a Camp> {
    camps.iter().filter(|c| c.matches_search(term)).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CampStatus {
    Active,
    Upcoming,
    Expired,
}

impl CampStatus {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Upcoming => "Upcoming",
            Self::Expired => "Expired",
        }
    }
}

fn deserialize_camp_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_camp_date(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid camp date: {raw}")))
}

/// Accepts `YYYY-MM-DD` or a timestamp that starts with one.
#[must_use]
pub fn parse_camp_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| raw.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()))
}

fn deserialize_lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|v| v.is_finite()))
}

/// Parses a wall-clock time as typed into the camp form: `14:30`, `14:30:00` or `2:30 PM`.
#[must_use]
pub fn parse_wall_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    ["%H:%M", "%H:%M:%S", "%I:%M %p", "%I:%M%p"]
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())
}

/// Camp form as filled in by an organizer. Every camp field except `id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampForm {
    pub name: String,
    pub location: String,
    pub organizer: String,
    pub contact: String,
    pub description: String,
    pub date: Option<NaiveDate>,
    pub days: i32,
    pub starting_time: String,
    pub ending_time: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub services: Vec<String>,
}

/// Body of `POST /camp/add`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCamp {
    pub name: String,
    pub location: String,
    pub organizer: String,
    pub contact: String,
    pub description: String,
    pub date: NaiveDate,
    pub days: u32,
    pub starting_time: String,
    pub ending_time: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<String>,
}

fn phone_pattern() -> &'static Regex {
    static PHONE: OnceLock<Regex> = OnceLock::new();
    PHONE.get_or_init(|| Regex::new(r"^\+?[1-9]\d{0,15}$").expect("phone pattern is a valid regex"))
}

fn contact_separators() -> &'static Regex {
    static SEPARATORS: OnceLock<Regex> = OnceLock::new();
    SEPARATORS.get_or_init(|| Regex::new(r"[\s\-()]").expect("separator pattern is a valid regex"))
}

impl CampForm {
    /// Checks every field and returns all failures at once.
    #[must_use]
    pub fn errors(&self) -> FormErrors {
        let mut errors = FormErrors::new();

        let required = [
            ("name", &self.name, "Camp name is required"),
            ("location", &self.location, "Location is required"),
            ("organizer", &self.organizer, "Organizer is required"),
            ("contact", &self.contact, "Contact information is required"),
            ("description", &self.description, "Description is required"),
        ];
        for (field, value, message) in required {
            if value.trim().is_empty() {
                errors.set(field, message);
            }
        }

        if self.date.is_none() {
            errors.set("date", "Valid start date is required");
        }

        if self.days < 1 {
            errors.set("days", "Duration must be at least 1 day");
        }

        if let (Some(start), Some(end)) = (
            parse_wall_time(&self.starting_time),
            parse_wall_time(&self.ending_time),
        ) {
            if start >= end {
                errors.set("ending_time", "End time must be after start time");
            }
        }

        if !(-90.0..=90.0).contains(&self.lat) {
            errors.set("lat", "Latitude must be between -90 and 90");
        }
        if !(-180.0..=180.0).contains(&self.lng) {
            errors.set("lng", "Longitude must be between -180 and 180");
        }

        if !self.contact.trim().is_empty() {
            let digits = contact_separators().replace_all(&self.contact, "");
            if !phone_pattern().is_match(&digits) || self.contact.chars().count() != 10 {
                errors.set("contact", "Please enter a valid email or phone number");
            }
        }

        errors
    }

    /// Validates the form and turns it into the request body.
    pub fn validate(&self) -> Result<NewCamp, FormErrors> {
        let errors = self.errors();
        let (Some(date), Ok(days)) = (self.date, u32::try_from(self.days)) else {
            return Err(errors);
        };

        errors.into_result(NewCamp {
            name: self.name.trim().to_string(),
            location: self.location.trim().to_string(),
            organizer: self.organizer.trim().to_string(),
            contact: self.contact.trim().to_string(),
            description: self.description.trim().to_string(),
            date,
            days,
            starting_time: self.starting_time.trim().to_string(),
            ending_time: self.ending_time.trim().to_string(),
            lat: self.lat,
            lng: self.lng,
            services: self
                .services
                .iter()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        })
    }
}
