//! Named post-mapping transforms, called directly through the registry.

use channeling_core::{context::Context, error::TransformError, transform::TransformId};
use serde_json::{json, Value};

fn apply(id: TransformId, raw: Value, ctx: &Context) -> Result<Value, TransformError> {
    id.apply(&raw, ctx)
}

fn installments(rows: &[(i64, i64)]) -> Context {
    let parent = Context::new().with("loan", json!({ "loan_xid": 99 }));
    let children = rows
        .iter()
        .map(|(principal, interest)| {
            parent.variant(
                "payment",
                json!({ "principal_amount": principal, "bank_interest_amount": interest }),
            )
        })
        .collect();
    parent.with_list("payments", children)
}

// ── Registry ────────────────────────────────────────────────────────────────

#[test]
fn names_parse_and_display() {
    let id: TransformId = "get_phone_number".parse().unwrap();
    assert_eq!(id, TransformId::GetPhoneNumber);
    assert_eq!(id.to_string(), "get_phone_number");
    assert!("format_disk".parse::<TransformId>().is_err());
}

// ── Code tables ─────────────────────────────────────────────────────────────

#[test]
fn gender_codes() {
    let ctx = Context::new();
    assert_eq!(apply(TransformId::GetGender, json!("Pria"), &ctx), Ok(json!("M")));
    assert_eq!(apply(TransformId::GetGender, json!(" wanita "), &ctx), Ok(json!("F")));
    assert_eq!(apply(TransformId::GetGender, Value::Null, &ctx), Ok(Value::Null));
    assert!(matches!(
        apply(TransformId::GetGender, json!("unknown"), &ctx),
        Err(TransformError::Unsupported { .. })
    ));
}

#[test]
fn marital_status_codes() {
    let ctx = Context::new();
    assert_eq!(apply(TransformId::GetMaritalStatus, json!("Menikah"), &ctx), Ok(json!("M")));
    assert_eq!(apply(TransformId::GetMaritalStatus, json!("Lajang"), &ctx), Ok(json!("S")));
    assert_eq!(apply(TransformId::GetMaritalStatus, json!("Cerai"), &ctx), Ok(json!("D")));
    assert_eq!(apply(TransformId::GetMaritalStatus, json!("Janda"), &ctx), Ok(json!("W")));
}

// ── Identifiers ─────────────────────────────────────────────────────────────

#[test]
fn contract_code_uses_configured_prefix() {
    let default = Context::new();
    assert_eq!(
        apply(TransformId::GetContractCode, json!(1000012345), &default),
        Ok(json!("JUL1000012345"))
    );

    let custom = Context::new().with("channeling_loan_config", json!({ "contract_prefix": "BSS-" }));
    assert_eq!(
        apply(TransformId::GetContractCode, json!("77"), &custom),
        Ok(json!("BSS-77"))
    );
}

#[test]
fn phone_numbers_normalise_to_62() {
    let ctx = Context::new();
    assert_eq!(apply(TransformId::GetPhoneNumber, json!("0812 3456 789"), &ctx), Ok(json!("628123456789")));
    assert_eq!(apply(TransformId::GetPhoneNumber, json!("+62 812-3456-789"), &ctx), Ok(json!("628123456789")));
    assert_eq!(apply(TransformId::GetPhoneNumber, json!("8123456789"), &ctx), Ok(json!("628123456789")));
    assert_eq!(apply(TransformId::GetPhoneNumber, json!("--"), &ctx), Ok(Value::Null));
}

// ── Amounts ─────────────────────────────────────────────────────────────────

#[test]
fn installment_amount_adds_principal_and_interest() {
    let ctx = Context::new().with(
        "payment",
        json!({ "principal_amount": "500000", "bank_interest_amount": 12500 }),
    );
    assert_eq!(
        apply(TransformId::GetBankInstallmentAmount, Value::Null, &ctx),
        Ok(json!(512_500))
    );
}

#[test]
fn totals_sum_over_payments() {
    let ctx = installments(&[(1_000_000, 30_000), (1_000_000, 29_000), (1_000_000, 28_000)]);
    assert_eq!(
        apply(TransformId::GetTotalPrincipalAmount, Value::Null, &ctx),
        Ok(json!(3_000_000))
    );
    assert_eq!(
        apply(TransformId::GetTotalBankInterestAmount, Value::Null, &ctx),
        Ok(json!(87_000))
    );
}

#[test]
fn totals_need_a_payments_list() {
    let err = apply(TransformId::GetTotalPrincipalAmount, Value::Null, &Context::new()).unwrap_err();
    assert_eq!(
        err,
        TransformError::MissingField {
            field: "payments".into()
        }
    );
}

#[test]
fn non_numeric_amount_is_reported() {
    let ctx = Context::new().with(
        "payment",
        json!({ "principal_amount": "lots", "bank_interest_amount": 1 }),
    );
    assert_eq!(
        apply(TransformId::GetBankInstallmentAmount, Value::Null, &ctx),
        Err(TransformError::NotNumeric {
            field: "payment.principal_amount".into()
        })
    );
}

#[test]
fn tenor_in_months() {
    let monthly = Context::new().with("loan", json!({ "loan_duration": 6 }));
    assert_eq!(apply(TransformId::GetTenorInMonths, Value::Null, &monthly), Ok(json!(6)));

    let weekly = Context::new().with("loan", json!({ "loan_duration": 26, "duration_unit": "weeks" }));
    assert_eq!(apply(TransformId::GetTenorInMonths, Value::Null, &weekly), Ok(json!(6)));
}
