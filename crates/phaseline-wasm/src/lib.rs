//! WebAssembly bindings for phaseline
//!
//! This crate provides JavaScript-callable functions so the browser
//! presentation layer can normalize exports, build tag indexes, filter
//! records and compute chart series without a server round trip.
//!
//! Every function takes and returns JSON text; `chartView` returns a plain
//! JavaScript object instead.

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use wasm_bindgen::prelude::*;

use phaseline_core::{Bundle, TagField};
use phaseline_parser::bundle::parse_bundle;
use phaseline_parser::csv::{records_from_str, Normalizer, NormalizerConfig};
use phaseline_parser::{tag_index, TagFilter};
use phaseline_render::{Aggregator, ChartView, Viewport};

/// Initialize panic hook for better error messages in console
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

// ============================================================================
// Bindings
// ============================================================================

/// Normalize a CSV-derived JSON export into a bundle
#[wasm_bindgen]
pub fn normalize(csv_json: &str) -> Result<String, JsValue> {
    normalize_json(csv_json, None).map_err(|e| JsValue::from_str(&e))
}

/// Normalize with a project name and description for the summary
#[wasm_bindgen(js_name = normalizeWithProject)]
pub fn normalize_with_project(
    csv_json: &str,
    name: &str,
    description: &str,
) -> Result<String, JsValue> {
    let config = NormalizerConfig {
        project_name: Some(name.to_string()).filter(|s| !s.is_empty()),
        project_description: Some(description.to_string()).filter(|s| !s.is_empty()),
        ..NormalizerConfig::default()
    };
    normalize_json(csv_json, Some(config)).map_err(|e| JsValue::from_str(&e))
}

/// Sorted distinct values of a tag field ("org-unit" or "program")
#[wasm_bindgen(js_name = tagIndex)]
pub fn tag_index_json(csv_json: &str, field: &str) -> Result<String, JsValue> {
    tag_values(csv_json, field).map_err(|e| JsValue::from_str(&e))
}

/// Raw records matching both filters; empty strings mean "no constraint"
#[wasm_bindgen(js_name = filterRecords)]
pub fn filter_records(csv_json: &str, org_unit: &str, program: &str) -> Result<String, JsValue> {
    filtered_records(csv_json, org_unit, program).map_err(|e| JsValue::from_str(&e))
}

/// Chart series, layout and stats for a bundle.
///
/// `today` is `YYYY-MM-DD`; empty means the current UTC date.
#[wasm_bindgen]
pub fn chart(bundle_json: &str, mobile: bool, today: &str) -> Result<String, JsValue> {
    let view = chart_for(bundle_json, mobile, today).map_err(|e| JsValue::from_str(&e))?;
    to_json(&view).map_err(|e| JsValue::from_str(&e))
}

/// Same as [`chart`] but returns a JavaScript object
#[wasm_bindgen(js_name = chartView)]
pub fn chart_view(bundle_json: &str, mobile: bool, today: &str) -> Result<JsValue, JsValue> {
    let view = chart_for(bundle_json, mobile, today).map_err(|e| JsValue::from_str(&e))?;
    serde_wasm_bindgen::to_value(&view).map_err(|e| JsValue::from_str(&e.to_string()))
}

// ============================================================================
// Implementation
// ============================================================================

fn normalize_json(csv_json: &str, config: Option<NormalizerConfig>) -> Result<String, String> {
    let normalizer = Normalizer::new(config.unwrap_or_default());
    let bundle = normalizer
        .normalize_str(csv_json)
        .map_err(|e| format!("Parse error: {}", e))?;
    to_json(&bundle)
}

fn tag_values(csv_json: &str, field: &str) -> Result<String, String> {
    let field: TagField = field.parse()?;
    let records = records_from_str(csv_json).map_err(|e| format!("Parse error: {}", e))?;
    to_json(&tag_index(&records, field))
}

fn filtered_records(csv_json: &str, org_unit: &str, program: &str) -> Result<String, String> {
    let records = records_from_str(csv_json).map_err(|e| format!("Parse error: {}", e))?;
    let filter = TagFilter::new().org_unit(org_unit).program(program);
    to_json(&filter.apply(&records))
}

fn chart_for(bundle_json: &str, mobile: bool, today: &str) -> Result<ChartView, String> {
    let bundle = read_bundle(bundle_json)?;
    let today = if today.trim().is_empty() {
        Utc::now().date_naive()
    } else {
        NaiveDate::parse_from_str(today.trim(), "%Y-%m-%d")
            .map_err(|e| format!("Invalid date '{}': {}", today, e))?
    };
    let viewport = if mobile {
        Viewport::Mobile
    } else {
        Viewport::Desktop
    };
    Ok(Aggregator::for_viewport(viewport).aggregate(&bundle, today))
}

/// Accept either a bundle document or a raw export
fn read_bundle(json: &str) -> Result<Bundle, String> {
    if json.trim_start().starts_with('[') {
        return Normalizer::default()
            .normalize_str(json)
            .map_err(|e| format!("Parse error: {}", e));
    }
    parse_bundle(json).map_err(|e| format!("Parse error: {}", e))
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("JSON serialization error: {}", e))
}
