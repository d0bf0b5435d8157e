use std::str::FromStr;

use bigdecimal::{BigDecimal, Zero};
use indexmap::IndexSet;
use serde_json::Value;

use crate::error::{AnalysisError, AnalysisResult};
use crate::models::{DataQualityIssue, DataQualityKind, LineItem, RawLineItem, Side};
use crate::money::{self, QUANTITY_SCALE};
use crate::service::context::AnalysisContext;
use crate::service::similarity::normalize_description;

/// Both sides after validation, in deterministic order.
#[derive(Debug, Clone)]
pub struct NormalizedInput {
    pub original: Vec<LineItem>,
    pub revised: Vec<LineItem>,
    pub issues: Vec<DataQualityIssue>,
    pub rejected_original: usize,
    pub rejected_revised: usize,
}

impl NormalizedInput {
    pub fn rejected_count(&self) -> usize {
        self.rejected_original + self.rejected_revised
    }
}

/// Validate, coerce and sort both collections.
///
/// Invalid records are dropped and reported; only when nothing survives on
/// either side does this fail.
pub fn normalize(
    original: &[RawLineItem],
    revised: &[RawLineItem],
    ctx: &AnalysisContext,
) -> AnalysisResult<NormalizedInput> {
    let mut issues = Vec::new();
    let scale = ctx.scale();

    let (original_items, rejected_original) =
        normalize_side(original, Side::Original, scale, &mut issues);
    let (revised_items, rejected_revised) =
        normalize_side(revised, Side::Revised, scale, &mut issues);

    tracing::debug!(
        "normalized: original {} kept / {} rejected, revised {} kept / {} rejected",
        original_items.len(),
        rejected_original,
        revised_items.len(),
        rejected_revised
    );

    if original_items.is_empty() && revised_items.is_empty() {
        return Err(AnalysisError::InsufficientData {
            original_rejected: rejected_original,
            revised_rejected: rejected_revised,
        });
    }

    Ok(NormalizedInput {
        original: original_items,
        revised: revised_items,
        issues,
        rejected_original,
        rejected_revised,
    })
}

fn normalize_side(
    raw: &[RawLineItem],
    side: Side,
    scale: i64,
    issues: &mut Vec<DataQualityIssue>,
) -> (Vec<LineItem>, usize) {
    let mut items = Vec::with_capacity(raw.len());
    let mut seen_ids: IndexSet<String> = IndexSet::new();
    let mut rejected = 0usize;

    for (idx, record) in raw.iter().enumerate() {
        match coerce_record(record, side, scale, issues) {
            Ok(item) => {
                if !seen_ids.insert(item.id.clone()) {
                    rejected += 1;
                    issues.push(DataQualityIssue {
                        kind: DataQualityKind::InvalidInput,
                        side,
                        item_id: Some(item.id.clone()),
                        detail: format!("record #{idx}: duplicate id '{}' dropped", item.id),
                    });
                    continue;
                }
                check_extension(&item, side, scale, issues);
                items.push(item);
            }
            Err(reason) => {
                rejected += 1;
                tracing::warn!("{:?} record #{} rejected: {}", side, idx, reason);
                issues.push(DataQualityIssue {
                    kind: DataQualityKind::InvalidInput,
                    side,
                    item_id: non_blank(record.id.as_deref()),
                    detail: format!("record #{idx}: {reason}"),
                });
            }
        }
    }

    items.sort_by(|a, b| {
        a.normalized_description
            .cmp(&b.normalized_description)
            .then_with(|| a.unit_price.cmp(&b.unit_price))
            .then_with(|| a.quantity.cmp(&b.quantity))
            .then_with(|| a.id.cmp(&b.id))
    });

    (items, rejected)
}

fn coerce_record(
    record: &RawLineItem,
    side: Side,
    scale: i64,
    issues: &mut Vec<DataQualityIssue>,
) -> Result<LineItem, String> {
    let id = non_blank(record.id.as_deref()).ok_or("missing id")?;
    let description = non_blank(record.description.as_deref()).ok_or("missing description")?;

    let quantity = required_decimal(record.quantity.as_ref(), "quantity")?;
    if quantity < BigDecimal::zero() {
        return Err(format!("negative quantity {quantity}"));
    }
    let unit_price = required_decimal(record.unit_price.as_ref(), "unit_price")?;
    let total = required_decimal(record.total.as_ref(), "total")?;

    let labor_hours = optional_decimal(record.labor_hours.as_ref(), "labor_hours", &id, side, issues);
    let labor_rate = optional_decimal(record.labor_rate.as_ref(), "labor_rate", &id, side, issues);

    Ok(LineItem {
        normalized_description: normalize_description(&description),
        description,
        quantity: money::round_half_up(&quantity, QUANTITY_SCALE),
        unit_price: money::round_half_up(&unit_price, scale),
        total: money::round_half_up(&total, scale),
        operation_code: non_blank(record.operation_code.as_deref()),
        part_number: non_blank(record.part_number.as_deref()),
        labor_hours: labor_hours.map(|h| money::round_half_up(&h, QUANTITY_SCALE)),
        labor_rate: labor_rate.map(|r| money::round_half_up(&r, scale)),
        category: non_blank(record.category.as_deref()),
        id,
    })
}

fn required_decimal(value: Option<&Value>, field: &str) -> Result<BigDecimal, String> {
    let value = value.ok_or_else(|| format!("missing {field}"))?;
    parse_decimal(value).map_err(|e| format!("{field}: {e}"))
}

/// Present-but-bad optional numerics are dropped, not fatal to the record.
fn optional_decimal(
    value: Option<&Value>,
    field: &str,
    id: &str,
    side: Side,
    issues: &mut Vec<DataQualityIssue>,
) -> Option<BigDecimal> {
    let value = value.filter(|v| !v.is_null())?;
    match parse_decimal(value) {
        Ok(parsed) if parsed >= BigDecimal::zero() => Some(parsed),
        Ok(parsed) => {
            issues.push(DataQualityIssue {
                kind: DataQualityKind::InvalidInput,
                side,
                item_id: Some(id.to_string()),
                detail: format!("{field}: negative value {parsed} ignored"),
            });
            None
        }
        Err(e) => {
            issues.push(DataQualityIssue {
                kind: DataQualityKind::InvalidInput,
                side,
                item_id: Some(id.to_string()),
                detail: format!("{field}: {e}; ignored"),
            });
            None
        }
    }
}

/// Longest numeric text accepted, after `$` and `,` are stripped.
const MAX_NUMERIC_LEN: usize = 64;
/// Largest decimal exponent, either way, a value may carry.
const MAX_DECIMAL_EXPONENT: i64 = 64;

/// Accepts JSON numbers and numeric strings (`"$1,250.00"`). Rejects NaN,
/// infinities, blanks, out-of-range magnitudes and anything else.
pub fn parse_decimal(value: &Value) -> Result<BigDecimal, String> {
    match value {
        Value::Number(n) => {
            let text = n.to_string();
            let parsed =
                BigDecimal::from_str(&text).map_err(|_| format!("unreadable number {n}"))?;
            bounded(parsed, &text)
        }
        Value::String(s) => {
            let cleaned: String = s
                .trim()
                .chars()
                .filter(|c| *c != '$' && *c != ',')
                .collect();
            if cleaned.is_empty() {
                return Err("blank value".to_string());
            }
            if cleaned.len() > MAX_NUMERIC_LEN {
                return Err(format!("numeric text longer than {MAX_NUMERIC_LEN} characters"));
            }
            let lowered = cleaned.to_lowercase();
            if lowered.contains("nan") || lowered.contains("inf") {
                return Err(format!("non-finite value '{s}'"));
            }
            let parsed =
                BigDecimal::from_str(&cleaned).map_err(|_| format!("not a number: '{s}'"))?;
            bounded(parsed, s)
        }
        Value::Null => Err("null value".to_string()),
        other => Err(format!("expected a number, got {other}")),
    }
}

/// Rejects exponents beyond `MAX_DECIMAL_EXPONENT` before anything rescales them.
fn bounded(value: BigDecimal, text: &str) -> Result<BigDecimal, String> {
    let (_, exponent) = value.as_bigint_and_exponent();
    if exponent.abs() > MAX_DECIMAL_EXPONENT {
        return Err(format!("magnitude out of range: '{text}'"));
    }
    Ok(value)
}

fn check_extension(item: &LineItem, side: Side, scale: i64, issues: &mut Vec<DataQualityIssue>) {
    let extended = money::round_half_up(&(&item.quantity * &item.unit_price), scale);
    if !money::within_tolerance(&extended, &item.total, &money::cent()) {
        issues.push(DataQualityIssue {
            kind: DataQualityKind::PriceExtensionMismatch,
            side,
            item_id: Some(item.id.clone()),
            detail: format!(
                "quantity x unit price = {extended} but total is {}; total kept",
                item.total
            ),
        });
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
