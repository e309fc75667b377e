use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

use crate::error::Error;

/// Maximum length of the free-form remarks field.
pub const REMARKS_MAX_LEN: usize = 300;

/// Workflow state of a registrant.
///
/// Always exactly one of these three values; lowercase on the wire,
/// capitalized for display.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Accepted,
    Rejected,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Accepted => "accepted",
            Status::Rejected => "rejected",
        }
    }

    pub fn display(&self) -> &'static str {
        match self {
            Status::Pending => "Pending",
            Status::Accepted => "Accepted",
            Status::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Status::Pending),
            "accepted" => Ok(Status::Accepted),
            "rejected" => Ok(Status::Rejected),
            other => Err(Error::Validation(format!("unknown status '{}'", other))),
        }
    }
}

macro_rules! region_enum {
    ($(($variant:ident, $label:literal)),+ $(,)?) => {
        /// Administrative region of a registrant.
        ///
        /// The long-name encoding is canonical; short codes from earlier
        /// schema revisions are not accepted.
        #[derive(PartialEq, Eq, Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type)]
        pub enum Region {
            $(
                #[serde(rename = $label)]
                #[sqlx(rename = $label)]
                $variant,
            )+
        }

        impl Region {
            pub const ALL: &'static [Region] = &[$(Region::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Region::$variant => $label,)+
                }
            }
        }

        impl FromStr for Region {
            type Err = Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($label => Ok(Region::$variant),)+
                    other => Err(Error::Validation(format!("unknown region '{}'", other))),
                }
            }
        }
    };
}

region_enum! {
    (Ilocos, "Region I - Ilocos Region"),
    (CagayanValley, "Region II - Cagayan Valley"),
    (CentralLuzon, "Region III - Central Luzon"),
    (Calabarzon, "Region IV-A - CALABARZON"),
    (Mimaropa, "MIMAROPA Region"),
    (Bicol, "Region V - Bicol Region"),
    (WesternVisayas, "Region VI - Western Visayas"),
    (CentralVisayas, "Region VII - Central Visayas"),
    (EasternVisayas, "Region VIII - Eastern Visayas"),
    (ZamboangaPeninsula, "Region IX - Zamboanga Peninsula"),
    (NorthernMindanao, "Region X - Northern Mindanao"),
    (Davao, "Region XI - Davao Region"),
    (Soccsksargen, "Region XII - SOCCSKSARGEN"),
    (Caraga, "Region XIII - Caraga"),
    (NationalCapitalRegion, "NCR - National Capital Region"),
    (Cordillera, "CAR - Cordillera Administrative Region"),
    (Bangsamoro, "BARMM - Bangsamoro Autonomous Region in Muslim Mindanao"),
    (NegrosIsland, "NIR - Negros Island Region"),
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single event applicant as stored in the registrant collection.
#[derive(PartialEq, Debug, FromRow, Clone, Serialize, Deserialize)]
pub struct Registrant {
    /// Unique registrant ID, server-assigned, immutable
    pub id: i64,

    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub suffix: Option<String>,

    /// Unique among non-null values, checked before insert
    pub email: Option<String>,

    /// Local mobile format (09XXXXXXXXX)
    pub contact_number: String,
    pub facebook_profile: Option<String>,

    pub region: Region,
    pub university: String,
    pub course: String,
    pub year_level: Option<String>,
    pub year_awarded: Option<String>,
    pub scholarship_type: Option<String>,
    pub is_dost_scholar: bool,
    pub is_start_member: bool,

    pub status: Status,
    pub is_checked_in: bool,

    /// Free-form admin notes, at most 300 characters
    pub remarks: Option<String>,

    /// Server-assigned at insert, immutable; default sort key, newest first
    pub created_at: DateTime<Utc>,
}

impl Registrant {
    /// Space-joined full name with empty parts omitted. This is the match
    /// target for the composite "name" search column.
    pub fn full_name(&self) -> String {
        [
            Some(self.first_name.as_str()),
            self.middle_name.as_deref(),
            Some(self.last_name.as_str()),
            self.suffix.as_deref(),
        ]
        .iter()
        .flatten()
        .filter(|part| !part.is_empty())
        .cloned()
        .collect::<Vec<_>>()
        .join(" ")
    }
}

/// A registrant as submitted through the registration form or the admin
/// add dialog, before the server assigns `id` and `created_at`.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct NewRegistrant {
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub last_name: String,
    #[serde(default)]
    pub suffix: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub contact_number: String,
    #[serde(default)]
    pub facebook_profile: Option<String>,
    pub region: Region,
    pub university: String,
    pub course: String,
    #[serde(default)]
    pub year_level: Option<String>,
    #[serde(default)]
    pub year_awarded: Option<String>,
    #[serde(default)]
    pub scholarship_type: Option<String>,
    #[serde(default)]
    pub is_dost_scholar: bool,
    #[serde(default)]
    pub is_start_member: bool,
    #[serde(default)]
    pub remarks: Option<String>,
}

fn contact_number_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^09\d{9}$").unwrap())
}

impl NewRegistrant {
    /// Boundary check on required fields and the contact-number pattern.
    /// Optional empty strings are normalized to None before storage.
    pub fn validate(&self) -> Result<(), Error> {
        if self.first_name.trim().is_empty() {
            return Err(Error::Validation("first name is required".to_string()));
        }
        if self.last_name.trim().is_empty() {
            return Err(Error::Validation("last name is required".to_string()));
        }
        if self.university.trim().is_empty() {
            return Err(Error::Validation("university is required".to_string()));
        }
        if self.course.trim().is_empty() {
            return Err(Error::Validation("course is required".to_string()));
        }
        if !contact_number_pattern().is_match(&self.contact_number) {
            return Err(Error::Validation(format!(
                "contact number '{}' is not a valid local mobile number",
                self.contact_number
            )));
        }
        if let Some(remarks) = &self.remarks {
            if remarks.chars().count() > REMARKS_MAX_LEN {
                return Err(Error::Validation(format!(
                    "remarks exceed {} characters",
                    REMARKS_MAX_LEN
                )));
            }
        }
        Ok(())
    }

    /// Collapses empty or whitespace-only optional fields to None.
    pub fn normalized(mut self) -> Self {
        self.middle_name = normalize_optional(self.middle_name.take());
        self.suffix = normalize_optional(self.suffix.take());
        self.email = normalize_optional(self.email.take());
        self.facebook_profile = normalize_optional(self.facebook_profile.take());
        self.year_level = normalize_optional(self.year_level.take());
        self.year_awarded = normalize_optional(self.year_awarded.take());
        self.scholarship_type = normalize_optional(self.scholarship_type.take());
        self.remarks = normalize_optional(self.remarks.take());
        self
    }
}

/// Empty and whitespace-only input becomes None, never an empty string.
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// A partial update to a single registrant. Only the fields an admin action
/// may change; `id` and `created_at` are never client-set on update.
#[derive(PartialEq, Debug, Clone, Default)]
pub struct RegistrantPatch {
    pub status: Option<Status>,
    pub is_checked_in: Option<bool>,
    /// Outer None leaves remarks untouched, inner None clears them
    pub remarks: Option<Option<String>>,
}

impl RegistrantPatch {
    pub fn status(status: Status) -> Self {
        RegistrantPatch {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn checked_in(checked_in: bool) -> Self {
        RegistrantPatch {
            is_checked_in: Some(checked_in),
            ..Default::default()
        }
    }

    pub fn remarks(remarks: Option<String>) -> Self {
        RegistrantPatch {
            remarks: Some(normalize_optional(remarks)),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.is_checked_in.is_none() && self.remarks.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry() -> NewRegistrant {
        NewRegistrant {
            first_name: "Ana".to_string(),
            middle_name: None,
            last_name: "Cruz".to_string(),
            suffix: None,
            email: Some("ana@example.com".to_string()),
            contact_number: "09171234567".to_string(),
            facebook_profile: None,
            region: Region::CentralVisayas,
            university: "USC".to_string(),
            course: "BS Biology".to_string(),
            year_level: None,
            year_awarded: None,
            scholarship_type: None,
            is_dost_scholar: true,
            is_start_member: false,
            remarks: None,
        }
    }

    #[test]
    fn contact_number_must_be_local_mobile() {
        assert!(entry().validate().is_ok());

        let mut bad = entry();
        bad.contact_number = "9171234567".to_string();
        assert!(bad.validate().is_err());

        bad.contact_number = "0917123456".to_string();
        assert!(bad.validate().is_err());

        bad.contact_number = "+639171234567".to_string();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn required_fields_rejected_when_blank() {
        let mut bad = entry();
        bad.first_name = "  ".to_string();
        assert!(bad.validate().is_err());

        let mut bad = entry();
        bad.university = String::new();
        assert!(bad.validate().is_err());
    }

    #[test]
    fn remarks_length_capped() {
        let mut long = entry();
        long.remarks = Some("x".repeat(REMARKS_MAX_LEN + 1));
        assert!(long.validate().is_err());

        long.remarks = Some("x".repeat(REMARKS_MAX_LEN));
        assert!(long.validate().is_ok());
    }

    #[test]
    fn normalization_collapses_blank_optionals() {
        let mut raw = entry();
        raw.middle_name = Some("   ".to_string());
        raw.suffix = Some(String::new());
        raw.email = Some(" ana@example.com ".to_string());
        let normalized = raw.normalized();
        assert_eq!(normalized.middle_name, None);
        assert_eq!(normalized.suffix, None);
        assert_eq!(normalized.email, Some("ana@example.com".to_string()));
    }

    #[test]
    fn full_name_skips_missing_parts() {
        let reg = Registrant {
            id: 1,
            first_name: "Juan".to_string(),
            middle_name: None,
            last_name: "Dela Cruz".to_string(),
            suffix: Some("Jr.".to_string()),
            email: None,
            contact_number: "09171234567".to_string(),
            facebook_profile: None,
            region: Region::NationalCapitalRegion,
            university: "UP".to_string(),
            course: "BS Physics".to_string(),
            year_level: None,
            year_awarded: None,
            scholarship_type: None,
            is_dost_scholar: false,
            is_start_member: false,
            status: Status::Pending,
            is_checked_in: false,
            remarks: None,
            created_at: Utc::now(),
        };
        assert_eq!(reg.full_name(), "Juan Dela Cruz Jr.");
    }

    #[test]
    fn region_round_trips_through_labels() {
        for region in Region::ALL {
            assert_eq!(region.as_str().parse::<Region>().unwrap(), *region);
        }
        assert!("Region VII".parse::<Region>().is_err());
    }

    #[test]
    fn status_wire_format_is_lowercase() {
        assert_eq!(serde_json::to_string(&Status::Accepted).unwrap(), "\"accepted\"");
        assert_eq!(Status::Accepted.display(), "Accepted");
        assert!("approved".parse::<Status>().is_err());
    }
}
