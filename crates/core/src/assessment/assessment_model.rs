//! Assessment domain models.

use std::collections::BTreeMap;
use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::constants::LOCATION_SCALE;
use crate::{errors::ValidationError, Error, Result};

/// Category of a detected damage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DamageType {
    Dent,
    Scratch,
    Crack,
    #[serde(rename = "Broken Glass", alias = "BrokenGlass")]
    BrokenGlass,
    #[serde(rename = "Paint Damage", alias = "PaintDamage")]
    PaintDamage,
    #[serde(rename = "Missing Part", alias = "MissingPart")]
    MissingPart,
    Other,
}

impl DamageType {
    pub const ALL: [DamageType; 7] = [
        DamageType::Dent,
        DamageType::Scratch,
        DamageType::Crack,
        DamageType::BrokenGlass,
        DamageType::PaintDamage,
        DamageType::MissingPart,
        DamageType::Other,
    ];

    /// Human readable label, as the analysis provider spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            DamageType::Dent => "Dent",
            DamageType::Scratch => "Scratch",
            DamageType::Crack => "Crack",
            DamageType::BrokenGlass => "Broken Glass",
            DamageType::PaintDamage => "Paint Damage",
            DamageType::MissingPart => "Missing Part",
            DamageType::Other => "Other",
        }
    }

    /// Parses either the spaced label ("Broken Glass") or the compact
    /// identifier ("BrokenGlass").
    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == label || t.as_str().replace(' ', "") == label)
    }
}

impl fmt::Display for DamageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Severity of a finding.
///
/// Ordered from lowest to highest: Low < Medium < High < Critical. The order
/// comes from `ordinal()`, never from the label text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::Critical,
    ];

    pub fn ordinal(&self) -> u8 {
        match self {
            Severity::Low => 0,
            Severity::Medium => 1,
            Severity::High => 2,
            Severity::Critical => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::Critical => "Critical",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.as_str() == label)
    }
}

impl PartialOrd for Severity {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Severity {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.ordinal().cmp(&other.ordinal())
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Sourcing option for a replacement part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PartKind {
    Genuine,
    Aftermarket,
    Used,
}

impl PartKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartKind::Genuine => "Genuine",
            PartKind::Aftermarket => "Aftermarket",
            PartKind::Used => "Used",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        [PartKind::Genuine, PartKind::Aftermarket, PartKind::Used]
            .into_iter()
            .find(|k| k.as_str() == label)
    }

    /// Label printed on exported reports. Used parts are sold as "Kabli"
    /// in the local market.
    pub fn report_label(&self) -> &'static str {
        match self {
            PartKind::Used => "Used/Kabli",
            other => other.as_str(),
        }
    }
}

/// Damage location on the 0-1000 normalized image space.
///
/// Serialized as the provider's `[top, left, bottom, right]` array.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct Location {
    pub top: f64,
    pub left: f64,
    pub bottom: f64,
    pub right: f64,
}

impl Location {
    pub fn new(top: f64, left: f64, bottom: f64, right: f64) -> Self {
        Self {
            top,
            left,
            bottom,
            right,
        }
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }

    /// Checks the range and ordering invariant, returning a description of
    /// the first violation.
    pub fn check(&self) -> std::result::Result<(), String> {
        let coords = [
            ("top", self.top),
            ("left", self.left),
            ("bottom", self.bottom),
            ("right", self.right),
        ];
        for (name, value) in coords {
            if !value.is_finite() {
                return Err(format!("{} is not a finite number", name));
            }
            if !(0.0..=LOCATION_SCALE).contains(&value) {
                return Err(format!(
                    "{} = {} is outside [0, {}]",
                    name, value, LOCATION_SCALE
                ));
            }
        }
        if self.top >= self.bottom {
            return Err(format!(
                "top ({}) must be less than bottom ({})",
                self.top, self.bottom
            ));
        }
        if self.left >= self.right {
            return Err(format!(
                "left ({}) must be less than right ({})",
                self.left, self.right
            ));
        }
        Ok(())
    }
}

impl From<[f64; 4]> for Location {
    fn from(b: [f64; 4]) -> Self {
        Location::new(b[0], b[1], b[2], b[3])
    }
}

impl From<Location> for [f64; 4] {
    fn from(l: Location) -> Self {
        [l.top, l.left, l.bottom, l.right]
    }
}

/// A priced sourcing option for the part(s) a repair needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartOption {
    #[serde(rename = "type")]
    pub kind: PartKind,
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<String>,
}

/// Labor plus part options, with the designated best option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepairCosts {
    pub labor: Decimal,
    pub parts: Vec<PartOption>,
    pub best_option_total: Decimal,
    /// Index into `parts` of the option `best_option_total` was priced from.
    pub best_option_index: usize,
}

impl RepairCosts {
    pub fn best_option(&self) -> Option<&PartOption> {
        self.parts.get(self.best_option_index)
    }
}

/// One detected damage instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DamageFinding {
    pub id: String,
    #[serde(rename = "type")]
    pub damage_type: DamageType,
    pub severity: Severity,
    pub description: String,
    pub estimated_cost: Decimal,
    pub repair_costs: RepairCosts,
    #[serde(rename = "box_2d")]
    pub location: Location,
}

/// Canonical, validated result of one damage analysis.
///
/// All money is denominated in the base currency. Instances come out of the
/// normalizer and are never edited afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentResult {
    pub id: String,
    pub vehicle_type: String,
    pub damages: Vec<DamageFinding>,
    pub total_estimated_cost: Decimal,
    pub summary: String,
    pub confidence_score: f64,
    #[serde(rename = "timestamp")]
    pub created_at: DateTime<Utc>,
}

impl AssessmentResult {
    pub fn finding(&self, finding_id: &str) -> Option<&DamageFinding> {
        self.damages.iter().find(|d| d.id == finding_id)
    }

    /// Number of findings per severity. Every severity is present, in
    /// ordinal order, so the map can feed a chart legend directly.
    pub fn severity_breakdown(&self) -> BTreeMap<Severity, usize> {
        let mut counts: BTreeMap<Severity, usize> =
            Severity::ALL.into_iter().map(|s| (s, 0)).collect();
        for damage in &self.damages {
            *counts.entry(damage.severity).or_insert(0) += 1;
        }
        counts
    }

    pub fn highest_severity(&self) -> Option<Severity> {
        self.damages.iter().map(|d| d.severity).max()
    }
}

/// An image handed to the analysis provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    pub mime_type: String,
}

impl ImagePayload {
    pub fn new(bytes: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            bytes,
            mime_type: mime_type.into(),
        }
    }

    /// Encodes the image as a `data:` URL, the form reports embed it in.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }

    /// Decodes an embedded `data:` URL back into raw bytes.
    pub fn from_data_url(data_url: &str) -> Result<Self> {
        let rest = data_url.strip_prefix("data:").ok_or_else(|| {
            Error::Validation(ValidationError::InvalidInput(
                "Image reference is not a data URL".to_string(),
            ))
        })?;
        let (mime_type, encoded) = rest.split_once(";base64,").ok_or_else(|| {
            Error::Validation(ValidationError::InvalidInput(
                "Image reference is not base64 encoded".to_string(),
            ))
        })?;
        let bytes = STANDARD.decode(encoded).map_err(|e| {
            Error::Validation(ValidationError::InvalidInput(format!(
                "Image reference could not be decoded: {}",
                e
            )))
        })?;
        Ok(Self::new(bytes, mime_type))
    }
}

/// Persisted record of a successful analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedReport {
    pub account_id: String,
    pub image_ref: String,
    #[serde(flatten)]
    pub assessment: AssessmentResult,
}

impl SavedReport {
    pub fn id(&self) -> &str {
        &self.assessment.id
    }
}

/// Input model for persisting a report.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSavedReport {
    pub account_id: String,
    pub image_ref: String,
    pub assessment: AssessmentResult,
}

impl NewSavedReport {
    pub fn validate(&self) -> Result<()> {
        if self.account_id.trim().is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                "account_id".to_string(),
            )));
        }
        if self.image_ref.trim().is_empty() {
            return Err(Error::Validation(ValidationError::MissingField(
                "image_ref".to_string(),
            )));
        }
        Ok(())
    }
}

impl From<NewSavedReport> for SavedReport {
    fn from(new_report: NewSavedReport) -> Self {
        Self {
            account_id: new_report.account_id,
            image_ref: new_report.image_ref,
            assessment: new_report.assessment,
        }
    }
}
