use chrono::{NaiveDate, SecondsFormat};

use super::registrant::Registrant;

/// Fixed CSV column order for registrant exports.
pub const CSV_HEADERS: [&str; 19] = [
    "ID",
    "First Name",
    "Middle Name",
    "Last Name",
    "Suffix",
    "Email",
    "Contact Number",
    "Facebook Profile",
    "Region",
    "University",
    "Course",
    "Year Level",
    "Year Awarded",
    "Scholarship Type",
    "START Member",
    "Status",
    "Checked In",
    "Created At",
    "Remarks",
];

fn yes_no(value: bool) -> &'static str {
    if value {
        "Yes"
    } else {
        "No"
    }
}

/// One registrant as an ordered list of CSV field values.
pub fn registrant_to_row(registrant: &Registrant) -> Vec<String> {
    vec![
        registrant.id.to_string(),
        registrant.first_name.clone(),
        registrant.middle_name.clone().unwrap_or_default(),
        registrant.last_name.clone(),
        registrant.suffix.clone().unwrap_or_default(),
        registrant.email.clone().unwrap_or_default(),
        registrant.contact_number.clone(),
        registrant.facebook_profile.clone().unwrap_or_default(),
        registrant.region.as_str().to_string(),
        registrant.university.clone(),
        registrant.course.clone(),
        registrant.year_level.clone().unwrap_or_default(),
        registrant.year_awarded.clone().unwrap_or_default(),
        registrant.scholarship_type.clone().unwrap_or_default(),
        yes_no(registrant.is_start_member).to_string(),
        registrant.status.as_str().to_string(),
        yes_no(registrant.is_checked_in).to_string(),
        registrant
            .created_at
            .to_rfc3339_opts(SecondsFormat::Millis, true),
        registrant.remarks.clone().unwrap_or_default(),
    ]
}

/// Serializes registrants into CSV text: header row plus one row per
/// registrant, every field double-quote-wrapped.
///
/// Embedded double quotes are not escaped; a known limitation carried
/// over from the original export format.
pub fn to_csv(registrants: &[Registrant]) -> String {
    let mut lines = Vec::with_capacity(registrants.len() + 1);
    lines.push(quote_row(CSV_HEADERS.iter().map(|h| h.to_string()).collect()));
    for registrant in registrants {
        lines.push(quote_row(registrant_to_row(registrant)));
    }
    lines.join("\n")
}

fn quote_row(fields: Vec<String>) -> String {
    fields
        .into_iter()
        .map(|field| format!("\"{}\"", field))
        .collect::<Vec<_>>()
        .join(",")
}

/// Download filename embedding the export date.
pub fn export_filename(date: NaiveDate) -> String {
    format!("registrants_{}.csv", date.format("%Y-%m-%d"))
}
