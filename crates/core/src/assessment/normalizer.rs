//! Validation of raw analysis payloads into canonical assessments.
//!
//! The analysis provider gives no compile-time guarantees about its output,
//! so every field is checked explicitly. Normalization is all-or-nothing: the
//! first violation aborts and nothing partial is returned.

use std::collections::HashSet;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use rust_decimal::Decimal;
use serde_json::{Map, Number, Value};
use uuid::Uuid;

use super::assessment_errors::AssessmentError;
use super::assessment_model::{
    AssessmentResult, DamageFinding, DamageType, Location, PartKind, PartOption, RepairCosts,
    Severity,
};
use crate::constants::MONEY_EPSILON;

type NormalizeResult<T> = std::result::Result<T, AssessmentError>;

/// Normalizes a raw payload under a freshly generated report id and the
/// current time. Any `id` or `timestamp` in the payload is ignored: every
/// analysis yields a new report.
pub fn normalize(raw: &Value) -> NormalizeResult<AssessmentResult> {
    normalize_with(raw, Uuid::new_v4().to_string(), Utc::now())
}

/// Normalizes a raw payload with an explicit report id and creation time.
pub fn normalize_with(
    raw: &Value,
    id: impl Into<String>,
    created_at: DateTime<Utc>,
) -> NormalizeResult<AssessmentResult> {
    let result = build_assessment(raw, id.into(), created_at);
    match &result {
        Ok(assessment) => debug!(
            "Normalized assessment {} with {} finding(s)",
            assessment.id,
            assessment.damages.len()
        ),
        Err(err @ AssessmentError::InvariantViolation(_)) => {
            warn!("Analysis provider broke the result contract: {}", err)
        }
        Err(err) => warn!("Analysis payload rejected: {}", err),
    }
    result
}

fn build_assessment(
    raw: &Value,
    id: String,
    created_at: DateTime<Utc>,
) -> NormalizeResult<AssessmentResult> {
    let root = ObjectReader::root(raw)?;
    let vehicle_type = root.string("vehicleType")?.to_string();
    let summary = root.string("summary")?.to_string();
    let reported_total = root.amount("totalEstimatedCost")?;
    let confidence_score = root.float("confidenceScore")?;
    let raw_damages = root.array("damages")?;

    let mut seen_ids = HashSet::new();
    let mut damages = Vec::with_capacity(raw_damages.len());
    let mut reported_sum = Decimal::ZERO;
    for (index, value) in raw_damages.iter().enumerate() {
        let path = format!("damages[{}]", index);
        let (finding, reported_cost) = parse_finding(value, &path, &mut seen_ids)?;
        reported_sum = checked_add(reported_sum, reported_cost, "damages")?;
        damages.push(finding);
    }

    if !approx_eq(reported_sum, reported_total) {
        return Err(AssessmentError::invariant(format!(
            "totalEstimatedCost {} does not equal the sum of finding costs {}",
            reported_total, reported_sum
        )));
    }

    if !confidence_score.is_finite() || !(0.0..=1.0).contains(&confidence_score) {
        return Err(AssessmentError::invariant(format!(
            "confidenceScore {} is outside [0, 1]",
            confidence_score
        )));
    }

    // Re-derived from the canonical finding costs so the stored total is the
    // exact sum.
    let total_estimated_cost = damages
        .iter()
        .try_fold(Decimal::ZERO, |sum, d| checked_add(sum, d.estimated_cost, "damages"))?;

    Ok(AssessmentResult {
        id,
        vehicle_type,
        damages,
        total_estimated_cost,
        summary,
        confidence_score,
        created_at,
    })
}

/// Parses one finding. Returns the canonical finding together with the cost
/// the provider reported for it.
fn parse_finding(
    value: &Value,
    path: &str,
    seen_ids: &mut HashSet<String>,
) -> NormalizeResult<(DamageFinding, Decimal)> {
    let finding = ObjectReader::new(value, path)?;

    let id = finding.string("id")?;
    if id.trim().is_empty() {
        return Err(AssessmentError::schema(
            finding.path("id"),
            "must not be empty",
        ));
    }
    if !seen_ids.insert(id.to_string()) {
        return Err(AssessmentError::schema(
            finding.path("id"),
            format!("duplicate finding id '{}'", id),
        ));
    }

    let damage_type = finding.label("type", DamageType::from_label)?;
    let severity = finding.label("severity", Severity::from_label)?;
    let description = finding.string("description")?.to_string();
    let reported_cost = finding.amount("estimatedCost")?;

    let costs_path = finding.path("repairCosts");
    let costs = ObjectReader::new(finding.field("repairCosts")?, &costs_path)?;
    let labor = costs.amount("labor")?;
    let best_total = costs.amount("bestOptionTotal")?;
    let raw_parts = costs.array("parts")?;
    if raw_parts.is_empty() {
        return Err(AssessmentError::schema(
            costs.path("parts"),
            "must list at least one part option",
        ));
    }
    let parts = raw_parts
        .iter()
        .enumerate()
        .map(|(i, v)| parse_part_option(v, &format!("{}[{}]", costs.path("parts"), i)))
        .collect::<NormalizeResult<Vec<_>>>()?;

    let box_path = finding.path("box_2d");
    let location = parse_location(finding.field("box_2d")?, &box_path)?;
    location
        .check()
        .map_err(|reason| AssessmentError::invariant(format!("{}: {}", box_path, reason)))?;

    let mut option_totals = Vec::with_capacity(parts.len());
    for option in &parts {
        option_totals.push(checked_add(labor, option.price, &costs_path)?);
    }
    let matching: Vec<usize> = option_totals
        .iter()
        .enumerate()
        .filter(|(_, total)| approx_eq(**total, best_total))
        .map(|(i, _)| i)
        .collect();
    let best_option_index = match matching.as_slice() {
        [index] => *index,
        [] => {
            return Err(AssessmentError::invariant(format!(
                "{}: bestOptionTotal {} does not equal labor {} plus the price of any listed part option",
                path, best_total, labor
            )))
        }
        _ => {
            return Err(AssessmentError::invariant(format!(
                "{}: bestOptionTotal {} matches {} part options, expected exactly one",
                path,
                best_total,
                matching.len()
            )))
        }
    };

    if !approx_eq(reported_cost, best_total) {
        return Err(AssessmentError::invariant(format!(
            "{}: estimatedCost {} does not equal bestOptionTotal {}",
            path, reported_cost, best_total
        )));
    }

    let best_option_total = option_totals[best_option_index];

    Ok((
        DamageFinding {
            id: id.to_string(),
            damage_type,
            severity,
            description,
            estimated_cost: best_option_total,
            repair_costs: RepairCosts {
                labor,
                parts,
                best_option_total,
                best_option_index,
            },
            location,
        },
        reported_cost,
    ))
}

fn parse_part_option(value: &Value, path: &str) -> NormalizeResult<PartOption> {
    let option = ObjectReader::new(value, path)?;
    Ok(PartOption {
        kind: option.label("type", PartKind::from_label)?,
        price: option.amount("price")?,
        availability: option.optional_str("availability")?.map(str::to_string),
    })
}

fn parse_location(value: &Value, path: &str) -> NormalizeResult<Location> {
    let coords = match value {
        Value::Array(items) => items,
        other => {
            return Err(AssessmentError::schema(
                path,
                format!("expected an array of 4 numbers, found {}", type_name(other)),
            ))
        }
    };
    if coords.len() != 4 {
        return Err(AssessmentError::schema(
            path,
            format!("expected 4 coordinates, found {}", coords.len()),
        ));
    }
    let mut parsed = [0.0_f64; 4];
    for (slot, item) in parsed.iter_mut().zip(coords) {
        *slot = item.as_f64().ok_or_else(|| {
            AssessmentError::schema(
                path,
                format!("expected a number, found {}", type_name(item)),
            )
        })?;
    }
    Ok(Location::from(parsed))
}

/// Amounts too far apart to subtract are never equal.
fn approx_eq(a: Decimal, b: Decimal) -> bool {
    a.checked_sub(b)
        .map(|diff| diff.abs() <= MONEY_EPSILON)
        .unwrap_or(false)
}

fn checked_add(a: Decimal, b: Decimal, path: &str) -> NormalizeResult<Decimal> {
    a.checked_add(b).ok_or_else(|| {
        AssessmentError::schema(
            path,
            format!("sum of {} and {} exceeds the supported money range", a, b),
        )
    })
}

/// Converts a JSON number into a decimal without going through binary
/// floating point: floats are parsed from their shortest round-trip text.
fn number_to_decimal(number: &Number) -> Option<Decimal> {
    if let Some(i) = number.as_i64() {
        return Some(Decimal::from(i));
    }
    if let Some(u) = number.as_u64() {
        return Some(Decimal::from(u));
    }
    let text = number.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .ok()
        .map(|d| d.normalize())
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Path-aware accessor over one JSON object of the payload.
struct ObjectReader<'a> {
    path: String,
    fields: &'a Map<String, Value>,
}

impl<'a> ObjectReader<'a> {
    fn root(value: &'a Value) -> NormalizeResult<Self> {
        Self::new(value, "")
    }

    fn new(value: &'a Value, path: &str) -> NormalizeResult<Self> {
        match value {
            Value::Object(fields) => Ok(Self {
                path: path.to_string(),
                fields,
            }),
            other => Err(AssessmentError::schema(
                if path.is_empty() { "$" } else { path },
                format!("expected an object, found {}", type_name(other)),
            )),
        }
    }

    fn path(&self, key: &str) -> String {
        if self.path.is_empty() {
            key.to_string()
        } else {
            format!("{}.{}", self.path, key)
        }
    }

    fn field(&self, key: &str) -> NormalizeResult<&'a Value> {
        match self.fields.get(key) {
            None | Some(Value::Null) => Err(AssessmentError::schema(
                self.path(key),
                "required field is missing",
            )),
            Some(value) => Ok(value),
        }
    }

    fn mismatch(&self, key: &str, expected: &str, found: &Value) -> AssessmentError {
        AssessmentError::schema(
            self.path(key),
            format!("expected {}, found {}", expected, type_name(found)),
        )
    }

    fn optional_str(&self, key: &str) -> NormalizeResult<Option<&'a str>> {
        match self.fields.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(self.mismatch(key, "a string", other)),
        }
    }

    fn string(&self, key: &str) -> NormalizeResult<&'a str> {
        match self.field(key)? {
            Value::String(s) => Ok(s.as_str()),
            other => Err(self.mismatch(key, "a string", other)),
        }
    }

    fn number(&self, key: &str) -> NormalizeResult<&'a Number> {
        match self.field(key)? {
            Value::Number(n) => Ok(n),
            other => Err(self.mismatch(key, "a number", other)),
        }
    }

    fn float(&self, key: &str) -> NormalizeResult<f64> {
        let number = self.number(key)?;
        number.as_f64().ok_or_else(|| {
            AssessmentError::schema(self.path(key), format!("{} is not a finite number", number))
        })
    }

    /// A non-negative money amount in the base currency.
    fn amount(&self, key: &str) -> NormalizeResult<Decimal> {
        let number = self.number(key)?;
        let value = number_to_decimal(number).ok_or_else(|| {
            AssessmentError::schema(
                self.path(key),
                format!("{} is not representable as a money amount", number),
            )
        })?;
        if value.is_sign_negative() && !value.is_zero() {
            return Err(AssessmentError::schema(
                self.path(key),
                format!("must not be negative, found {}", value),
            ));
        }
        Ok(value)
    }

    fn array(&self, key: &str) -> NormalizeResult<&'a [Value]> {
        match self.field(key)? {
            Value::Array(items) => Ok(items.as_slice()),
            other => Err(self.mismatch(key, "an array", other)),
        }
    }

    fn label<T>(&self, key: &str, parse: fn(&str) -> Option<T>) -> NormalizeResult<T> {
        let label = self.string(key)?;
        parse(label).ok_or_else(|| {
            AssessmentError::schema(self.path(key), format!("unknown value '{}'", label))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 14, 9, 30, 0).unwrap()
    }

    fn finding(id: &str, labor: f64, prices: &[f64], best: f64) -> Value {
        json!({
            "id": id,
            "type": "Dent",
            "severity": "Medium",
            "description": "Dent on the rear left door",
            "estimatedCost": best,
            "repairCosts": {
                "labor": labor,
                "parts": prices.iter().enumerate().map(|(i, p)| json!({
                    "type": (["Genuine", "Aftermarket", "Used"][i % 3]),
                    "price": p,
                })).collect::<Vec<_>>(),
                "bestOptionTotal": best,
            },
            "box_2d": [120, 200, 380, 540],
        })
    }

    fn payload(damages: Vec<Value>, total: f64) -> Value {
        json!({
            "vehicleType": "2018 Toyota Corolla",
            "damages": damages,
            "totalEstimatedCost": total,
            "summary": "Moderate rear damage.",
            "confidenceScore": 0.87,
        })
    }

    fn two_findings() -> Value {
        payload(
            vec![
                finding("d1", 1500.0, &[16000.0, 3500.0], 5000.0),
                finding("d2", 2500.0, &[5000.0], 7500.0),
            ],
            12500.0,
        )
    }

    fn expect_schema(raw: &Value) -> String {
        match normalize_with(raw, "r", fixed_time()) {
            Err(AssessmentError::SchemaViolation { field, .. }) => field,
            other => panic!("expected schema violation, got {:?}", other),
        }
    }

    fn expect_invariant(raw: &Value) {
        match normalize_with(raw, "r", fixed_time()) {
            Err(AssessmentError::InvariantViolation(_)) => {}
            other => panic!("expected invariant violation, got {:?}", other),
        }
    }

    #[test]
    fn test_normalizes_valid_payload() {
        let result = normalize_with(&two_findings(), "report-1", fixed_time()).unwrap();

        assert_eq!(result.id, "report-1");
        assert_eq!(result.vehicle_type, "2018 Toyota Corolla");
        assert_eq!(result.damages.len(), 2);
        assert_eq!(result.total_estimated_cost, dec!(12500));
        assert_eq!(result.created_at, fixed_time());

        let first = &result.damages[0];
        assert_eq!(first.estimated_cost, dec!(5000));
        assert_eq!(first.repair_costs.best_option_index, 1);
        assert_eq!(
            first.repair_costs.best_option().map(|p| p.kind),
            Some(PartKind::Aftermarket)
        );
        assert_eq!(first.location, Location::new(120.0, 200.0, 380.0, 540.0));
    }

    #[test]
    fn test_preserves_detection_order() {
        let raw = payload(
            vec![
                finding("z", 100.0, &[900.0], 1000.0),
                finding("a", 100.0, &[400.0], 500.0),
                finding("m", 100.0, &[100.0], 200.0),
            ],
            1700.0,
        );
        let result = normalize_with(&raw, "r", fixed_time()).unwrap();
        let ids: Vec<&str> = result.damages.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_accepts_integer_and_float_costs() {
        let mut raw = two_findings();
        raw["totalEstimatedCost"] = json!(12500);
        raw["damages"][1]["estimatedCost"] = json!(7500);
        let result = normalize_with(&raw, "r", fixed_time()).unwrap();
        assert_eq!(result.total_estimated_cost, dec!(12500));
    }

    #[test]
    fn test_tolerates_float_round_trip_noise() {
        let raw = payload(vec![finding("d1", 0.2, &[0.1], 0.1 + 0.2)], 0.1 + 0.2);
        let result = normalize_with(&raw, "r", fixed_time()).unwrap();
        assert_eq!(result.damages[0].estimated_cost, dec!(0.3));
        assert_eq!(result.total_estimated_cost, dec!(0.3));
    }

    #[test]
    fn test_total_mismatch_is_invariant_violation() {
        let raw = payload(
            vec![
                finding("d1", 1000.0, &[4000.0], 5000.0),
                finding("d2", 1000.0, &[5000.0], 6000.0),
            ],
            12000.0,
        );
        expect_invariant(&raw);
    }

    #[test]
    fn test_mismatch_larger_than_epsilon_is_rejected() {
        let raw = payload(vec![finding("d1", 1000.0, &[4000.0], 5000.0)], 5000.01);
        expect_invariant(&raw);
    }

    #[test]
    fn test_best_option_must_match_a_part() {
        let raw = payload(vec![finding("d1", 1000.0, &[4000.0, 3000.0], 4500.0)], 4500.0);
        expect_invariant(&raw);
    }

    #[test]
    fn test_estimated_cost_must_equal_best_option() {
        let mut raw = payload(vec![finding("d1", 1000.0, &[4000.0], 5000.0)], 5200.0);
        raw["damages"][0]["estimatedCost"] = json!(5200.0);
        expect_invariant(&raw);
    }

    #[test]
    fn test_box_out_of_range_is_invariant_violation() {
        let mut raw = two_findings();
        raw["damages"][0]["box_2d"] = json!([10, 20, 1001, 400]);
        expect_invariant(&raw);
    }

    #[test]
    fn test_inverted_box_is_invariant_violation() {
        let mut raw = two_findings();
        raw["damages"][0]["box_2d"] = json!([500, 20, 500, 400]);
        expect_invariant(&raw);

        let mut raw = two_findings();
        raw["damages"][1]["box_2d"] = json!([10, 600, 300, 100]);
        expect_invariant(&raw);
    }

    #[test]
    fn test_box_with_wrong_arity_is_schema_violation() {
        let mut raw = two_findings();
        raw["damages"][0]["box_2d"] = json!([10, 20, 300]);
        assert_eq!(expect_schema(&raw), "damages[0].box_2d");
    }

    #[test]
    fn test_confidence_out_of_range() {
        let mut raw = two_findings();
        raw["confidenceScore"] = json!(1.2);
        expect_invariant(&raw);

        raw["confidenceScore"] = json!(-0.1);
        expect_invariant(&raw);
    }

    #[test]
    fn test_confidence_bounds_are_valid() {
        for score in [0.0, 1.0] {
            let mut raw = two_findings();
            raw["confidenceScore"] = json!(score);
            assert!(normalize_with(&raw, "r", fixed_time()).is_ok());
        }
    }

    #[test]
    fn test_zero_findings_is_valid() {
        let raw = payload(vec![], 0.0);
        let result = normalize_with(&raw, "r", fixed_time()).unwrap();
        assert!(result.damages.is_empty());
        assert_eq!(result.total_estimated_cost, Decimal::ZERO);
    }

    #[test]
    fn test_missing_field_is_schema_violation() {
        let mut raw = two_findings();
        raw.as_object_mut().unwrap().remove("summary");
        assert_eq!(expect_schema(&raw), "summary");

        let mut raw = two_findings();
        raw["damages"][1]
            .as_object_mut()
            .unwrap()
            .remove("repairCosts");
        assert_eq!(expect_schema(&raw), "damages[1].repairCosts");
    }

    #[test]
    fn test_wrong_type_is_schema_violation() {
        let mut raw = two_findings();
        raw["totalEstimatedCost"] = json!("12500");
        assert_eq!(expect_schema(&raw), "totalEstimatedCost");
    }

    #[test]
    fn test_unknown_enum_label_is_schema_violation() {
        let mut raw = two_findings();
        raw["damages"][0]["severity"] = json!("Severe");
        assert_eq!(expect_schema(&raw), "damages[0].severity");

        let mut raw = two_findings();
        raw["damages"][0]["repairCosts"]["parts"][0]["type"] = json!("Refurbished");
        assert_eq!(expect_schema(&raw), "damages[0].repairCosts.parts[0].type");
    }

    #[test]
    fn test_spaced_and_compact_labels_are_accepted() {
        let mut raw = two_findings();
        raw["damages"][0]["type"] = json!("Broken Glass");
        raw["damages"][1]["type"] = json!("PaintDamage");
        let result = normalize_with(&raw, "r", fixed_time()).unwrap();
        assert_eq!(result.damages[0].damage_type, DamageType::BrokenGlass);
        assert_eq!(result.damages[1].damage_type, DamageType::PaintDamage);
    }

    #[test]
    fn test_duplicate_id_is_schema_violation() {
        let raw = payload(
            vec![
                finding("d1", 1000.0, &[4000.0], 5000.0),
                finding("d1", 1000.0, &[6500.0], 7500.0),
            ],
            12500.0,
        );
        assert_eq!(expect_schema(&raw), "damages[1].id");
    }

    #[test]
    fn test_empty_parts_is_schema_violation() {
        let mut raw = two_findings();
        raw["damages"][0]["repairCosts"]["parts"] = json!([]);
        assert_eq!(expect_schema(&raw), "damages[0].repairCosts.parts");
    }

    #[test]
    fn test_negative_price_is_schema_violation() {
        let mut raw = two_findings();
        raw["damages"][1]["repairCosts"]["parts"][0]["price"] = json!(-5);
        assert_eq!(expect_schema(&raw), "damages[1].repairCosts.parts[0].price");
    }

    #[test]
    fn test_non_object_root_is_schema_violation() {
        assert_eq!(expect_schema(&json!([1, 2, 3])), "$");
    }

    #[test]
    fn test_payload_id_and_timestamp_are_ignored() {
        let mut raw = two_findings();
        raw["id"] = json!("provider-42");
        raw["timestamp"] = json!("2020-01-01T00:00:00Z");
        let first = normalize(&raw).unwrap();
        let second = normalize(&raw).unwrap();

        assert_ne!(first.id, "provider-42");
        assert_ne!(first.id, second.id);
        assert!(first.created_at > fixed_time());
    }

    #[test]
    fn test_best_option_matching_several_parts_is_invariant_violation() {
        let raw = payload(vec![finding("d1", 1000.0, &[4000.0, 4000.0], 5000.0)], 5000.0);
        expect_invariant(&raw);
    }

    #[test]
    fn test_huge_amounts_are_rejected_without_panicking() {
        let raw = payload(
            vec![
                finding("d1", 0.0, &[5.0e28], 5.0e28),
                finding("d2", 0.0, &[5.0e28], 5.0e28),
            ],
            1.0e28,
        );
        let outcome = std::panic::catch_unwind(|| normalize_with(&raw, "r", fixed_time()));
        assert!(matches!(outcome, Ok(Err(_))));
    }

    #[test]
    fn test_labor_plus_price_overflow_is_schema_violation() {
        let raw = payload(vec![finding("d1", 7.0e28, &[7.0e28], 7.0e28)], 7.0e28);
        assert_eq!(expect_schema(&raw), "damages[0].repairCosts");
    }

    #[test]
    fn test_generated_id_when_absent() {
        let result = normalize(&two_findings()).unwrap();
        assert!(Uuid::parse_str(&result.id).is_ok());
    }
}
