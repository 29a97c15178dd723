//! Wire and domain types for the OMS reason API.
//!
//! Request bodies serialize to the field names the OMS web client sends.
//! Responses are decoded leniently: the server omits fields and sends `null`
//! for strings, so most fields fall back to their defaults.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Identifier of a pole (`loc_id`) on a feeder's geometry.
pub type LocationId = i64;

/// Treats an explicit `null` the same as a missing field.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ─── Login ───────────────────────────────────────────────────────────────────

/// Account used to log in to the OMS.
#[derive(Clone, Deserialize)]
pub struct Credentials {
    #[serde(default = "default_company_name")]
    pub company_name: String,
    #[serde(default)]
    pub emp_no: String,
    #[serde(default)]
    pub password: String,
    #[serde(default = "default_app_name")]
    pub app_name: String,
}

fn default_company_name() -> String {
    "DGVCL".to_string()
}

fn default_app_name() -> String {
    "SFMS-Web".to_string()
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            company_name: default_company_name(),
            emp_no: String::new(),
            password: String::new(),
            app_name: default_app_name(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("company_name", &self.company_name)
            .field("emp_no", &self.emp_no)
            .field("password", &"<redacted>")
            .field("app_name", &self.app_name)
            .finish()
    }
}

/// Body of `POST /auth/login`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest<'a> {
    pub company_name: &'a str,
    pub emp_no: &'a str,
    pub password: &'a str,
    pub app_name: &'a str,
}

impl<'a> From<&'a Credentials> for LoginRequest<'a> {
    fn from(creds: &'a Credentials) -> Self {
        Self {
            company_name: &creds.company_name,
            emp_no: &creds.emp_no,
            password: &creds.password,
            app_name: &creds.app_name,
        }
    }
}

/// Login response. The OMS has served two shapes over time:
/// `{"user": {"auth_token": ...}}` and
/// `{"status": true, "message": ..., "data": {"token": ...}}`.
#[derive(Debug, Default, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub status: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub user: Option<LoginUser>,
    #[serde(default)]
    pub data: Option<LoginData>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginUser {
    #[serde(default)]
    pub auth_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginData {
    #[serde(default)]
    pub token: Option<String>,
}

impl LoginResponse {
    /// Returns the bearer token from whichever shape carried one.
    pub fn token(&self) -> Option<&str> {
        let from_user = self.user.as_ref().and_then(|u| u.auth_token.as_deref());
        let from_data = self.data.as_ref().and_then(|d| d.token.as_deref());
        from_user
            .into_iter()
            .chain(from_data)
            .find(|t| !t.trim().is_empty())
    }
}

/// Authenticated context for one run. Every gateway call takes it explicitly.
#[derive(Clone)]
pub struct Session {
    token: String,
    emp_no: String,
}

impl Session {
    pub fn new(token: impl Into<String>, emp_no: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            emp_no: emp_no.into(),
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn emp_no(&self) -> &str {
        &self.emp_no
    }

    /// Token with only its first 10 and last 8 characters visible.
    pub fn masked_token(&self) -> String {
        let chars: Vec<char> = self.token.chars().collect();
        if chars.len() <= 18 {
            return "***".to_string();
        }
        let head: String = chars[..10].iter().collect();
        let tail: String = chars[chars.len() - 8..].iter().collect();
        format!("{head}...{tail}")
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("token", &self.masked_token())
            .field("emp_no", &self.emp_no)
            .finish()
    }
}

// ─── Pending outages ─────────────────────────────────────────────────────────

/// One entry of the `filteredData` array understood by `/reason/pending`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FilteredData {
    pub id: u32,
    pub field: String,
    #[serde(rename = "type")]
    pub filter_type: String,
    pub operator: String,
    pub value: String,
    pub from_value: String,
    pub to_value: String,
}

/// Server-side filter applied to the pending list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingFilter {
    /// Inclusive occurrence-date range.
    pub occurred_between: Option<(NaiveDate, NaiveDate)>,
}

impl PendingFilter {
    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            occurred_between: Some((from, to)),
        }
    }

    /// Encodes the filter the way the OMS web UI does (filter id 14).
    pub fn to_filtered_data(&self) -> Vec<FilteredData> {
        let Some((from, to)) = self.occurred_between else {
            return Vec::new();
        };
        let from = from.format("%Y-%m-%d").to_string();
        let to = to.format("%Y-%m-%d").to_string();
        vec![FilteredData {
            id: 14,
            field: "outage_occur_at".to_string(),
            filter_type: "date".to_string(),
            operator: "between".to_string(),
            value: format!("{from} to {to}"),
            from_value: from,
            to_value: to,
        }]
    }
}

/// Cursor for one page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: usize,
    pub limit: usize,
}

/// Body of `POST /reason/pending`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRequest {
    pub order_by: Option<String>,
    pub order: Option<String>,
    pub filtered_data: Vec<FilteredData>,
    pub offset: usize,
    pub limit: usize,
}

impl PendingRequest {
    pub fn new(filter: &PendingFilter, window: PageWindow) -> Self {
        Self {
            order_by: None,
            order: None,
            filtered_data: filter.to_filtered_data(),
            offset: window.offset,
            limit: window.limit,
        }
    }
}

/// A pending outage awaiting a fault reason.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OutageRecord {
    #[serde(default, deserialize_with = "nullable")]
    pub id: String,
    #[serde(default)]
    pub feeder_id: Option<i64>,
    #[serde(default, deserialize_with = "nullable")]
    pub feeder_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub feeder_category: String,
    #[serde(default, deserialize_with = "nullable")]
    pub interruption_type: String,
    #[serde(default, deserialize_with = "nullable")]
    pub outage_type_name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub ss_name: String,
    /// RFC 3339 occurrence time.
    #[serde(default, deserialize_with = "nullable")]
    pub outage_occur_at: String,
    /// RFC 3339 restoration time; absent while the outage is ongoing.
    #[serde(default)]
    pub outage_restore_at: Option<String>,
    /// Pre-computed `HH:MM:SS[.fff]`.
    #[serde(default, deserialize_with = "nullable")]
    pub duration: String,
}

impl OutageRecord {
    /// Feeder id, if the server sent a real one.
    pub fn feeder(&self) -> Option<i64> {
        self.feeder_id.filter(|id| *id != 0)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PendingResponse {
    #[serde(default, deserialize_with = "nullable")]
    pub total_records: usize,
    #[serde(default, deserialize_with = "nullable")]
    pub data: Vec<OutageRecord>,
}

/// One page of pending outages plus the size of the full result set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PendingPage {
    pub records: Vec<OutageRecord>,
    pub total_records: usize,
}

impl From<PendingResponse> for PendingPage {
    fn from(resp: PendingResponse) -> Self {
        Self {
            records: resp.data,
            total_records: resp.total_records,
        }
    }
}

// ─── Reason detail (feeder geometry) ─────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ReasonDetailResponse {
    #[serde(default)]
    pub status: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub data: ReasonDetailData,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReasonDetailData {
    /// Mixed array: arrays of `row_to_json` wrappers next to metadata objects.
    #[serde(rename = "feederPointGeoJson", default, deserialize_with = "nullable")]
    pub feeder_point_geo_json: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct RowToJson {
    #[serde(default)]
    row_to_json: FeatureCollection,
}

#[derive(Debug, Default, Deserialize)]
struct FeatureCollection {
    #[serde(default, deserialize_with = "nullable")]
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
struct Feature {
    #[serde(default)]
    properties: FeatureProperties,
}

#[derive(Debug, Default, Deserialize)]
struct FeatureProperties {
    /// Pole type, e.g. "HT Pole".
    #[serde(default)]
    hlt: Option<String>,
    #[serde(default)]
    id: Option<LocationId>,
}

impl ReasonDetailResponse {
    /// Walks `feederPointGeoJson[*][*].row_to_json.features[*].properties`
    /// and collects non-zero pole ids. `pole_type` restricts the result only
    /// when the payload tags at least one feature with an `hlt` value;
    /// untyped geometry keeps every pole.
    /// Elements that are not arrays of wrappers are ignored.
    pub fn pole_ids(&self, pole_type: Option<&str>) -> Vec<LocationId> {
        let poles: Vec<FeatureProperties> = self
            .data
            .feeder_point_geo_json
            .iter()
            .filter_map(|element| Vec::<RowToJson>::deserialize(element).ok())
            .flatten()
            .flat_map(|wrapper| wrapper.row_to_json.features)
            .map(|feature| feature.properties)
            .collect();

        let typed = poles
            .iter()
            .any(|p| p.hlt.as_deref().is_some_and(|t| !t.trim().is_empty()));
        let wanted = pole_type.filter(|_| typed);

        poles
            .into_iter()
            .filter(|p| wanted.is_none_or(|w| p.hlt.as_deref() == Some(w)))
            .filter_map(|p| p.id)
            .filter(|id| *id != 0)
            .collect()
    }
}

// ─── Submit ──────────────────────────────────────────────────────────────────

/// One element of the `POST /reason/outage/{id}` body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReasonPayloadItem {
    pub loc_id: LocationId,
    pub reason_id: u32,
}

/// A classification ready to be sent back to the OMS.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub outage_id: String,
    pub location_id: LocationId,
    pub reason_code: u32,
}

impl Submission {
    pub fn payload(&self) -> Vec<ReasonPayloadItem> {
        vec![ReasonPayloadItem {
            loc_id: self.location_id,
            reason_id: self.reason_code,
        }]
    }
}
