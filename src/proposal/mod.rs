//! # Proposal Form Model
//!
//! Maps the survey form onto template tokens:
//!
//! | Form field | Token |
//! |------------|-------|
//! | `building_name` | `{{BUILDINGNAME}}` |
//! | `address` | `{{ADDRESS}}` |
//! | `survey_date` | `{{SURVEYDATE}}` (formatted) |
//! | `prepared_date` | `{{PREPAREDDATE}}` (formatted) |
//! | ... | see [`FIELDS`] |
//! | (fixed) | `{{NOOFCHARGERS}}` = `2` |
//!
//! Image slots live in [`slots`].

pub mod slots;

pub use slots::{ImageSlot, SLOTS, SlotInfo, slot_table};

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};

use crate::compose::TokenMap;
use crate::error::{DeckError, Result};

/// How a field's value is turned into token text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Date,
}

/// One form field and the token it fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub token: &'static str,
    pub kind: FieldKind,
}

const fn text(name: &'static str, token: &'static str) -> Field {
    Field { name, token, kind: FieldKind::Text }
}

const fn date(name: &'static str, token: &'static str) -> Field {
    Field { name, token, kind: FieldKind::Date }
}

pub const FIELDS: &[Field] = &[
    text("building_name", "BUILDINGNAME"),
    text("address", "ADDRESS"),
    date("survey_date", "SURVEYDATE"),
    text("prepared_by", "PREPAREDBY"),
    date("prepared_date", "PREPAREDDATE"),
    text("type_building", "TYPEBUILDING"),
    text("building_manager_name", "BUILDINGMANAGERNAME"),
    text("building_manager_email", "BUILDINGMANAGEREMAIL"),
    text("building_manager_phone", "BUILDINGMANAGERPHONE"),
    text("building_manager_company", "BUILDINGMANAGERCOMPANY"),
    text("otic", "OTIC"),
    text("tap_new_or_spare", "TAPNEWORSPARE"),
    text("tapping_location", "TAPPINGLOCATION"),
    text("tapping_location_level", "TAPPINGLOCATIONLEVEL"),
    text("site_assessment_mccb", "SITEASSESTMENTMCCB"),
    text("tnb_meter", "TNBMETER"),
    text("tnb_na", "TNBNA"),
    text("parking_location", "PARKINGLOCATION"),
    text("ev_charger_model", "EVCHARGERMODEL"),
    text("network_strength", "NETWORKSTRENGTH"),
];

/// Tokens with a value that does not come from the form.
pub const FIXED_TOKENS: &[(&str, &str)] = &[("NOOFCHARGERS", "2")];

const DATE_INPUT_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y", "%d/%m/%Y"];
const DATE_OUTPUT_FORMAT: &str = "%B %d, %Y";
const CLIENT_NAME_MAX_CHARS: usize = 20;

/// Submitted form values, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProposalForm {
    values: BTreeMap<String, String>,
}

impl ProposalForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value. Names that are not form fields are ignored.
    pub fn set(&mut self, name: &str, value: &str) {
        if FIELDS.iter().any(|f| f.name == name) {
            self.values.insert(name.to_string(), value.trim().to_string());
        }
    }

    /// The trimmed value of `name`, empty if it was not submitted.
    pub fn get(&self, name: &str) -> &str {
        self.values.get(name).map_or("", String::as_str)
    }

    /// Read a JSON object of field name -> value. Numbers and booleans are
    /// taken as their JSON text; nulls count as missing.
    pub fn from_json(json: &str) -> Result<Self> {
        let object: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)
            .map_err(|e| DeckError::InvalidFormData(e.to_string()))?;
        let mut form = Self::new();
        for (name, value) in &object {
            match value {
                serde_json::Value::String(s) => form.set(name, s),
                serde_json::Value::Null => {},
                other => form.set(name, &other.to_string()),
            }
        }
        Ok(form)
    }

    /// Every field token, formatted, plus the fixed tokens.
    pub fn tokens(&self) -> TokenMap {
        let mut tokens = TokenMap::new();
        for field in FIELDS {
            let value = self.get(field.name);
            let value = match field.kind {
                FieldKind::Text => value.to_string(),
                FieldKind::Date => format_date(value),
            };
            tokens.insert(field.token, value);
        }
        for (token, value) in FIXED_TOKENS {
            tokens.insert(token, *value);
        }
        tokens
    }

    /// `proposal_{client}_{timestamp}.pptx`, client taken from the address.
    pub fn output_filename(&self, now: NaiveDateTime) -> String {
        output_filename(self.get("address"), now)
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for ProposalForm {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut form = ProposalForm::new();
        for (name, value) in iter {
            form.set(name.as_ref(), value.as_ref());
        }
        form
    }
}

/// Render a date as `January 15, 2024`. Unrecognized input is returned as
/// given.
pub fn format_date(input: &str) -> String {
    let input = input.trim();
    DATE_INPUT_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(input, format).ok())
        .map_or_else(
            || input.to_string(),
            |date| date.format(DATE_OUTPUT_FORMAT).to_string(),
        )
}

/// Output file name for a proposal about `address`, generated at `now`.
pub fn output_filename(address: &str, now: NaiveDateTime) -> String {
    let client: String = address
        .split(',')
        .next()
        .unwrap_or_default()
        .trim()
        .chars()
        .take(CLIENT_NAME_MAX_CHARS)
        .filter(|c| c.is_alphanumeric() || *c == ' ' || *c == '_')
        .collect();
    format!(
        "proposal_{}_{}.pptx",
        client.trim().replace(' ', "_"),
        now.format("%Y%m%d_%H%M%S")
    )
}
