//! Named post-mapping transforms.
//!
//! Mapping tables refer to transforms by name (`function_post_mapping`).
//! Names are resolved to a `TransformId` when the table is compiled, so a typo
//! fails when the table is loaded rather than when a partner submission runs.

use crate::{context::Context, error::TransformError};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

/// Signature shared by every transform: raw resolved value plus the full
/// context for transforms that need more than one field.
pub type TransformFn = fn(&Value, &Context) -> Result<Value, TransformError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransformId {
    GetGender,
    GetMaritalStatus,
    GetContractCode,
    GetPhoneNumber,
    GetBankInstallmentAmount,
    GetTotalBankInterestAmount,
    GetTotalPrincipalAmount,
    GetTenorInMonths,
}

impl TransformId {
    pub const ALL: [TransformId; 8] = [
        Self::GetGender,
        Self::GetMaritalStatus,
        Self::GetContractCode,
        Self::GetPhoneNumber,
        Self::GetBankInstallmentAmount,
        Self::GetTotalBankInterestAmount,
        Self::GetTotalPrincipalAmount,
        Self::GetTenorInMonths,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::GetGender                  => "get_gender",
            Self::GetMaritalStatus           => "get_marital_status",
            Self::GetContractCode            => "get_contract_code",
            Self::GetPhoneNumber             => "get_phone_number",
            Self::GetBankInstallmentAmount   => "get_bank_installment_amount",
            Self::GetTotalBankInterestAmount => "get_total_bank_interest_amount",
            Self::GetTotalPrincipalAmount    => "get_total_principal_amount",
            Self::GetTenorInMonths           => "get_tenor_in_months",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.name() == name)
    }

    pub fn function(&self) -> TransformFn {
        match self {
            Self::GetGender                  => get_gender,
            Self::GetMaritalStatus           => get_marital_status,
            Self::GetContractCode            => get_contract_code,
            Self::GetPhoneNumber             => get_phone_number,
            Self::GetBankInstallmentAmount   => get_bank_installment_amount,
            Self::GetTotalBankInterestAmount => get_total_bank_interest_amount,
            Self::GetTotalPrincipalAmount    => get_total_principal_amount,
            Self::GetTenorInMonths           => get_tenor_in_months,
        }
    }

    pub fn apply(&self, raw: &Value, ctx: &Context) -> Result<Value, TransformError> {
        (self.function())(raw, ctx)
    }
}

impl fmt::Display for TransformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for TransformId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s).ok_or_else(|| format!("unknown transform '{s}'"))
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn unsupported(raw: &Value) -> TransformError {
    TransformError::Unsupported {
        value: raw.to_string(),
    }
}

fn numeric_field(ctx: &Context, field: &str) -> Result<f64, TransformError> {
    let value = ctx
        .lookup_dotted(field)
        .filter(|v| !v.is_null())
        .ok_or_else(|| TransformError::MissingField {
            field: field.to_string(),
        })?;
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .ok_or_else(|| TransformError::NotNumeric {
        field: field.to_string(),
    })
}

/// Amounts are whole rupiah; keep integers integral in the output.
fn amount(total: f64) -> Value {
    if total.fract() == 0.0 && total.abs() < i64::MAX as f64 {
        json!(total as i64)
    } else {
        json!(total)
    }
}

fn sum_over_payments(ctx: &Context, field: &str) -> Result<Value, TransformError> {
    let payments = ctx.list("payments").ok_or_else(|| TransformError::MissingField {
        field: "payments".into(),
    })?;
    let mut total = 0.0;
    for payment in payments {
        total += numeric_field(payment, field)?;
    }
    Ok(amount(total))
}

// ── Transforms ──────────────────────────────────────────────────────

fn get_gender(raw: &Value, _ctx: &Context) -> Result<Value, TransformError> {
    let Some(text) = raw.as_str() else {
        return if raw.is_null() { Ok(Value::Null) } else { Err(unsupported(raw)) };
    };
    match text.trim().to_ascii_lowercase().as_str() {
        "pria" | "m" | "male" => Ok(json!("M")),
        "wanita" | "f" | "female" => Ok(json!("F")),
        "" => Ok(Value::Null),
        _ => Err(unsupported(raw)),
    }
}

fn get_marital_status(raw: &Value, _ctx: &Context) -> Result<Value, TransformError> {
    let Some(text) = raw.as_str() else {
        return if raw.is_null() { Ok(Value::Null) } else { Err(unsupported(raw)) };
    };
    match text.trim().to_ascii_lowercase().as_str() {
        "menikah" => Ok(json!("M")),
        "lajang" => Ok(json!("S")),
        "cerai" => Ok(json!("D")),
        "janda" | "duda" => Ok(json!("W")),
        "" => Ok(Value::Null),
        _ => Err(unsupported(raw)),
    }
}

fn get_contract_code(raw: &Value, ctx: &Context) -> Result<Value, TransformError> {
    let xid = match raw {
        Value::Null => return Ok(Value::Null),
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        other => return Err(unsupported(other)),
    };
    let prefix = ctx
        .lookup_dotted("channeling_loan_config.contract_prefix")
        .and_then(Value::as_str)
        .unwrap_or("JUL");
    Ok(json!(format!("{prefix}{xid}")))
}

fn get_phone_number(raw: &Value, _ctx: &Context) -> Result<Value, TransformError> {
    let Some(text) = raw.as_str() else {
        return if raw.is_null() { Ok(Value::Null) } else { Err(unsupported(raw)) };
    };
    let digits: String = text.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Ok(Value::Null);
    }
    let normalised = if let Some(rest) = digits.strip_prefix('0') {
        format!("62{rest}")
    } else if digits.starts_with("62") {
        digits
    } else {
        format!("62{digits}")
    };
    Ok(json!(normalised))
}

fn get_bank_installment_amount(_raw: &Value, ctx: &Context) -> Result<Value, TransformError> {
    let principal = numeric_field(ctx, "payment.principal_amount")?;
    let interest = numeric_field(ctx, "payment.bank_interest_amount")?;
    Ok(amount(principal + interest))
}

fn get_total_bank_interest_amount(_raw: &Value, ctx: &Context) -> Result<Value, TransformError> {
    sum_over_payments(ctx, "payment.bank_interest_amount")
}

fn get_total_principal_amount(_raw: &Value, ctx: &Context) -> Result<Value, TransformError> {
    sum_over_payments(ctx, "payment.principal_amount")
}

fn get_tenor_in_months(_raw: &Value, ctx: &Context) -> Result<Value, TransformError> {
    let duration = numeric_field(ctx, "loan.loan_duration")?;
    let unit = ctx
        .lookup_dotted("loan.duration_unit")
        .and_then(Value::as_str)
        .unwrap_or("month");
    let months = match unit.to_ascii_lowercase().as_str() {
        "month" | "months" => duration.ceil(),
        // 52 weeks over 12 months, rounded up to whole months
        "week" | "weeks" => (duration * 12.0 / 52.0).ceil(),
        _ => return Err(TransformError::Unsupported { value: unit.to_string() }),
    };
    Ok(json!(months as i64))
}
