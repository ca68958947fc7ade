// src/config/mod.rs
//
// Every fixed URL, source field name, worksheet title, header set, and
// query-definition path lives here; nothing is mutated after process start.

use once_cell::sync::Lazy;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE, ORIGIN, REFERER};

// ── Tracking-site JSON API ───────────────────────────────────────────
pub const COVIDTRACKING_CURRENT_URL: &str = "https://covidtracking.com/api/v1/states/current.json";
pub const COVIDTRACKING_DAILY_URL: &str = "https://covidtracking.com/api/v1/states/daily.json";

// Field names as the tracking site spells them.
pub const DATE_SOURCE_FIELD: &str = "date";
pub const STATE_SOURCE_FIELD: &str = "state";
pub const TOTAL_CASES_SOURCE_FIELD: &str = "positive";
pub const NEW_CASES_NEGATIVE_SOURCE_FIELD: &str = "negativeIncrease";
pub const NEW_CASES_POSITIVE_SOURCE_FIELD: &str = "positiveIncrease";
pub const LAST_UPDATED_SOURCE_FIELD: &str = "dateModified";

// ── CDC dashboard query API ──────────────────────────────────────────
// Internal query endpoint behind the patient-impact reporting dashboard.
pub const DASHBOARD_QUERY_URL: &str =
    "https://wabi-us-gov-virginia-api.analysis.usgovcloudapi.net/public/reports/querydata?synchronous=true";

pub const DATA_DATE_QUERY: &str = "extract_config/data_date.json";
pub const INPATIENT_BED_QUERY: &str = "extract_config/inpatient_bed_query.json";
pub const ICU_BED_QUERY: &str = "extract_config/icu_bed_query.json";
pub const FACILITIES_REPORTING_QUERY: &str = "extract_config/facilities_reporting_query.json";

/// Headers every dashboard query carries; each query merges its own set on top.
pub static BASE_HEADERS: Lazy<HeaderMap> = Lazy::new(|| {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json, text/plain, */*"));
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/json;charset=UTF-8"),
    );
    headers.insert(ORIGIN, HeaderValue::from_static("https://app.powerbigov.us"));
    headers.insert(REFERER, HeaderValue::from_static("https://app.powerbigov.us/"));
    headers.insert(
        HeaderName::from_static("x-powerbi-resourcekey"),
        HeaderValue::from_static("9e126cbd-7c11-4b70-9ec1-bc2f5e2b6eba"),
    );
    headers
});

fn request_id_headers(request_id: &'static str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static("requestid"),
        HeaderValue::from_static(request_id),
    );
    headers
}

pub static DATA_DATE_HEADERS: Lazy<HeaderMap> =
    Lazy::new(|| request_id_headers("0d5d4da2-63b8-4b84-a0ae-0a0c2b3c2f4d"));

pub static INPATIENT_BED_HEADERS: Lazy<HeaderMap> =
    Lazy::new(|| request_id_headers("5e1ba7e3-6a3b-4f9d-a8f1-7c9f1d2d3a41"));

pub static ICU_BED_HEADERS: Lazy<HeaderMap> =
    Lazy::new(|| request_id_headers("8b52a9a7-0f41-4a7c-9c55-2e8f6b1c4d72"));

pub static FACILITIES_REPORTING_HEADERS: Lazy<HeaderMap> =
    Lazy::new(|| request_id_headers("c3d714b9-4f86-4c2e-b0c8-9a5d7e2f1b63"));

// ── CDC FluView download ─────────────────────────────────────────────
pub const FLUVIEW_DOWNLOAD_URL: &str = "https://gis.cdc.gov/grasp/flu2/PostPhase02DataDownload";

// ── Bed-occupancy spreadsheet ────────────────────────────────────────
pub const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
pub const BED_OCCUPANCY_SHEET_ID: &str = "1qEPuziEpxj7VGQRcB4ft-DRkIMKMWdqyhVtD0eyUcKk";

pub const INPATIENT_WORKSHEET: &str = "% inpatient beds";
pub const ICU_WORKSHEET: &str = "% icu beds";

pub const SHEET_STATE_FIELD: &str = "State";
pub const INPATIENT_PERCENT_FIELD: &str = "Percentage of Inpatient Beds Occupied";
pub const ICU_PERCENT_FIELD: &str = "Percentage of ICU Beds Occupied";

// ── Local reference files ────────────────────────────────────────────
pub const POPULATION_CSV: &str = "data/population.csv";
pub const STATE_ABBREVIATIONS_JSON: &str = "data/us_state_abbreviations.json";
