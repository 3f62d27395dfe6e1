//! Mapping-table compilation and resolution.
//!
//! Covers hardcoded and path fields, null handling, fixed-width lengths,
//! nested and repeated tables, and the guarantee that a failing field aborts
//! the whole document.

use channeling_core::{
    context::Context,
    error::MappingError,
    mapping::{DataType, FieldMapping, MappingNode, MappingTable, OutputMode, Padding, Resolver},
    transform::TransformId,
};
use serde_json::{json, Value};

// ── Test helpers ────────────────────────────────────────────────────────────

fn name_table() -> MappingTable {
    MappingTable::new().field(
        "name",
        FieldMapping::path("customer.fullname").unwrap().required().length(10),
    )
}

fn customer(fullname: Value) -> Context {
    Context::new().with("customer", json!({ "fullname": fullname }))
}

fn loan_context() -> Context {
    let parent = Context::new()
        .with("channeling_loan_config", json!({ "contract_prefix": "JUL" }))
        .with(
            "customer",
            json!({
                "fullname": "Siti Rahayu",
                "gender": "Wanita",
                "phone": "0812-3456-7890",
                "monthly_income": 7_000_000,
                "dob": "1992-11-30",
            }),
        )
        .with(
            "loan",
            json!({ "loan_xid": 1000012345, "loan_amount": "2000000", "loan_duration": 2 }),
        );
    let payments = vec![
        parent.variant("payment", json!({ "principal_amount": 1_000_000, "bank_interest_amount": 25_000 })),
        parent.variant("payment", json!({ "principal_amount": 1_000_000, "bank_interest_amount": 20_000 })),
    ];
    parent.with_list("payments", payments)
}

// ── Scenarios ───────────────────────────────────────────────────────────────

#[test]
fn word_padding_in_fixed_width_mode() {
    let doc = Resolver::fixed_width()
        .resolve_table(&name_table(), &customer(json!("Jonathan")))
        .unwrap();
    assert_eq!(doc["name"], json!("Jonathan  "));
}

#[test]
fn json_mode_passes_short_strings_through() {
    let doc = Resolver::json()
        .resolve_table(&name_table(), &customer(json!("Jonathan")))
        .unwrap();
    assert_eq!(doc["name"], json!("Jonathan"));

    let doc = Resolver::json()
        .resolve_table(&name_table(), &customer(json!("Jonathan Saputra")))
        .unwrap();
    assert_eq!(doc["name"], json!("Jonathan S"));
}

#[test]
fn null_required_field_names_its_source_path() {
    let err = Resolver::fixed_width()
        .resolve_table(&name_table(), &customer(Value::Null))
        .unwrap_err();
    match err {
        MappingError::NullValue { key_path, source_path } => {
            assert_eq!(key_path, "name");
            assert_eq!(source_path, "customer.fullname");
        }
        other => panic!("expected NullValue, got {other:?}"),
    }
}

#[test]
fn whitespace_and_missing_values_count_as_empty() {
    let resolver = Resolver::json();
    assert!(resolver.resolve_table(&name_table(), &customer(json!("   "))).is_err());
    assert!(resolver.resolve_table(&name_table(), &Context::new()).is_err());
}

// ── Hardcoded fields ────────────────────────────────────────────────────────

#[test]
fn hardcoded_values_ignore_the_context() {
    let table = MappingTable::new()
        .field("channel", FieldMapping::hardcode("JULO"))
        .field("version", FieldMapping::hardcode(2))
        .field("flags", FieldMapping::hardcode(json!({ "a": true })));

    for ctx in [Context::new(), loan_context(), customer(json!("x")).with("channel", "other")] {
        let doc = Resolver::json().resolve_table(&table, &ctx).unwrap();
        assert_eq!(doc["channel"], json!("JULO"));
        assert_eq!(doc["version"], json!(2));
        assert_eq!(doc["flags"], json!({ "a": true }));
    }
}

#[test]
fn hardcoded_null_on_required_field_fails_at_compile() {
    let err = MappingTable::from_json(&json!({
        "spouse": { "source": null, "is_hardcode": true, "allow_null": false }
    }))
    .unwrap_err();
    assert!(matches!(err, MappingError::InvalidDescriptor { ref key_path, .. } if key_path == "spouse"));
}

#[test]
fn hardcoded_empty_string_on_required_field_fails_at_resolve() {
    let table = MappingTable::new().field("code", FieldMapping::hardcode("").required());
    let err = Resolver::json().resolve_table(&table, &Context::new()).unwrap_err();
    assert!(matches!(err, MappingError::NullValue { .. }));
}

#[test]
fn explicit_null_node_is_emitted_as_null() {
    let table = MappingTable::from_json(&json!({ "collateral": null })).unwrap();
    assert_eq!(table.get("collateral"), Some(&MappingNode::Null));
    let doc = Resolver::json().resolve_table(&table, &Context::new()).unwrap();
    assert_eq!(doc["collateral"], Value::Null);
}

// ── Compilation ─────────────────────────────────────────────────────────────

#[test]
fn unknown_transform_is_rejected_when_the_table_is_built() {
    let err = MappingTable::from_json(&json!({
        "applicant": {
            "gender": { "source": "customer.gender", "function_post_mapping": "get_gendre" }
        }
    }))
    .unwrap_err();
    assert_eq!(
        err,
        MappingError::UnknownTransform {
            key_path: "applicant.gender".into(),
            name: "get_gendre".into(),
        }
    );
}

#[test]
fn malformed_descriptors_are_rejected() {
    let cases = [
        json!({ "a": { "source": "x.y", "length": 0 } }),
        json!({ "a": { "source": "x.y", "is_padding_word": true, "is_padding_number": true } }),
        json!({ "a": { "source": 12 } }),
        json!({ "a": { "source": "x..y" } }),
        json!({ "a": { "source": "x.y*abc" } }),
        json!({ "a": { "source": "x.y", "output_format": "%Q" } }),
        json!({ "a": { "source": "x.y", "lenght": 3 } }),
        json!({ "a": 5 }),
        json!({ "a": { "repeat": "payments" } }),
    ];
    for case in cases {
        assert!(MappingTable::from_json(&case).is_err(), "accepted {case}");
    }
}

#[test]
fn compiled_table_keeps_declaration_order() {
    let table = MappingTable::from_json(&json!({
        "zeta": { "source": "Z", "is_hardcode": true },
        "alpha": { "source": "A", "is_hardcode": true },
        "mid": { "source": "M", "is_hardcode": true },
    }))
    .unwrap();
    let keys: Vec<&String> = table.keys().collect();
    assert_eq!(keys, ["zeta", "alpha", "mid"]);

    let doc = Resolver::json().resolve_table(&table, &Context::new()).unwrap();
    let out: Vec<&String> = doc.keys().collect();
    assert_eq!(out, ["zeta", "alpha", "mid"]);
}

// ── Paths, multipliers, types and formats ───────────────────────────────────

#[test]
fn multiplier_and_coercion() {
    let table = MappingTable::new()
        .field("annual", FieldMapping::path("customer.monthly_income*12").unwrap())
        .field(
            "amount",
            FieldMapping::path("loan.loan_amount").unwrap().data_type(DataType::Int),
        )
        .field(
            "xid",
            FieldMapping::path("loan.loan_xid").unwrap().data_type(DataType::Str),
        );
    let doc = Resolver::json().resolve_table(&table, &loan_context()).unwrap();
    assert_eq!(doc["annual"], json!(84_000_000));
    assert_eq!(doc["amount"], json!(2_000_000));
    assert_eq!(doc["xid"], json!("1000012345"));
}

#[test]
fn empty_text_under_a_typed_required_field_is_still_empty() {
    let table = MappingTable::from_json(&json!({
        "is_active": { "source": "customer.flag", "allow_null": false, "data_type": "bool" },
        "income": { "source": "customer.income", "allow_null": false, "data_type": "int" }
    }))
    .unwrap();
    let ctx = Context::new().with("customer", json!({ "flag": "", "income": 5 }));
    let err = Resolver::json().resolve_table(&table, &ctx).unwrap_err();
    assert!(matches!(err, MappingError::NullValue { ref key_path, .. } if key_path == "is_active"));

    let ctx = Context::new().with("customer", json!({ "flag": "yes", "income": " " }));
    let err = Resolver::json().resolve_table(&table, &ctx).unwrap_err();
    assert!(matches!(err, MappingError::NullValue { ref key_path, .. } if key_path == "income"));

    let ctx = Context::new().with("customer", json!({ "flag": "0", "income": "7" }));
    let doc = Resolver::json().resolve_table(&table, &ctx).unwrap();
    assert_eq!(doc["is_active"], json!(false));
    assert_eq!(doc["income"], json!(7));
}

#[test]
fn multiplier_on_text_is_not_numeric() {
    let table = MappingTable::new().field("x", FieldMapping::path("customer.fullname*2").unwrap());
    let err = Resolver::json().resolve_table(&table, &loan_context()).unwrap_err();
    assert!(matches!(err, MappingError::NotNumeric { .. }));
}

#[test]
fn output_format_reformats_dates() {
    let table = MappingTable::new().field(
        "dob",
        FieldMapping::path("customer.dob").unwrap().output_format("%d%m%Y"),
    );
    let doc = Resolver::json().resolve_table(&table, &loan_context()).unwrap();
    assert_eq!(doc["dob"], json!("30111992"));
}

#[test]
fn fixed_width_lengths_are_exact() {
    let table = MappingTable::new()
        .field("name", FieldMapping::path("customer.fullname").unwrap().length(5))
        .field("amount", FieldMapping::path("loan.loan_amount").unwrap().data_type(DataType::Int).length(12))
        .field("pad", FieldMapping::path("loan.loan_duration").unwrap().length(4).padding(Padding::Word))
        .field("empty", FieldMapping::path("loan.nothing").unwrap().length(3));
    let doc = Resolver::new(OutputMode::FixedWidth)
        .resolve_table(&table, &loan_context())
        .unwrap();
    assert_eq!(doc["name"], json!("Siti "));
    assert_eq!(doc["amount"], json!("000002000000"));
    assert_eq!(doc["pad"], json!("2   "));
    assert_eq!(doc["empty"], json!("   "));
    for (key, value) in &doc {
        let width = table
            .get(key)
            .and_then(|node| match node {
                MappingNode::Field(f) => f.length,
                _ => None,
            })
            .unwrap();
        assert_eq!(value.as_str().unwrap().chars().count(), width, "{key}");
    }
}

// ── Transforms ──────────────────────────────────────────────────────────────

#[test]
fn transform_output_matches_direct_invocation() {
    let table = MappingTable::new()
        .field("gender", FieldMapping::path("customer.gender").unwrap().transform(TransformId::GetGender))
        .field("phone", FieldMapping::path("customer.phone").unwrap().transform(TransformId::GetPhoneNumber))
        .field("code", FieldMapping::path("loan.loan_xid").unwrap().transform(TransformId::GetContractCode))
        .field(
            "interest",
            FieldMapping::path("loan.loan_xid").unwrap().transform(TransformId::GetTotalBankInterestAmount),
        )
        .field(
            "tenor",
            FieldMapping::path("loan.loan_duration").unwrap().transform(TransformId::GetTenorInMonths),
        );
    let ctx = loan_context();
    let doc = Resolver::json().resolve_table(&table, &ctx).unwrap();

    let direct = |id: TransformId, path: &str| id.apply(ctx.lookup_dotted(path).unwrap(), &ctx).unwrap();
    assert_eq!(doc["gender"], direct(TransformId::GetGender, "customer.gender"));
    assert_eq!(doc["phone"], direct(TransformId::GetPhoneNumber, "customer.phone"));
    assert_eq!(doc["code"], direct(TransformId::GetContractCode, "loan.loan_xid"));
    assert_eq!(doc["interest"], direct(TransformId::GetTotalBankInterestAmount, "loan.loan_xid"));
    assert_eq!(doc["tenor"], direct(TransformId::GetTenorInMonths, "loan.loan_duration"));

    assert_eq!(doc["gender"], json!("F"));
    assert_eq!(doc["phone"], json!("6281234567890"));
    assert_eq!(doc["code"], json!("JUL1000012345"));
    assert_eq!(doc["interest"], json!(45_000));
}

#[test]
fn resolution_is_independent_of_entry_order() {
    let forward = MappingTable::new()
        .field("a", FieldMapping::path("customer.fullname").unwrap())
        .field("b", FieldMapping::path("loan.loan_xid").unwrap().transform(TransformId::GetContractCode))
        .field("c", FieldMapping::hardcode("C"));
    let reversed = MappingTable::new()
        .field("c", FieldMapping::hardcode("C"))
        .field("b", FieldMapping::path("loan.loan_xid").unwrap().transform(TransformId::GetContractCode))
        .field("a", FieldMapping::path("customer.fullname").unwrap());

    let ctx = loan_context();
    let one = Resolver::json().resolve_table(&forward, &ctx).unwrap();
    let two = Resolver::json().resolve_table(&reversed, &ctx).unwrap();
    for key in ["a", "b", "c"] {
        assert_eq!(one[key], two[key]);
    }
}

#[test]
fn failing_transform_reports_the_key() {
    let table = MappingTable::new().field(
        "gender",
        FieldMapping::path("customer.fullname").unwrap().transform(TransformId::GetGender),
    );
    let err = Resolver::json().resolve_table(&table, &loan_context()).unwrap_err();
    assert_eq!(err.key_path(), "gender");
    assert!(matches!(err, MappingError::Transform { .. }));
}

// ── Nested and repeated tables ──────────────────────────────────────────────

#[test]
fn nested_and_repeated_tables() {
    let table = MappingTable::from_json(&json!({
        "applicant": {
            "name": { "source": "customer.fullname", "allow_null": false }
        },
        "installments": {
            "repeat": "payments",
            "table": {
                "principal": { "source": "payment.principal_amount", "data_type": "int" },
                "total": { "source": "payment.principal_amount", "function_post_mapping": "get_bank_installment_amount" }
            }
        }
    }))
    .unwrap();
    let doc = Resolver::json().resolve_table(&table, &loan_context()).unwrap();
    assert_eq!(doc["applicant"]["name"], json!("Siti Rahayu"));
    assert_eq!(
        doc["installments"],
        json!([
            { "principal": 1_000_000, "total": 1_025_000 },
            { "principal": 1_000_000, "total": 1_020_000 },
        ])
    );
}

#[test]
fn failure_inside_a_repeat_names_the_item() {
    let table = MappingTable::new().repeat(
        "installments",
        "payments",
        MappingTable::new().field("due", FieldMapping::path("payment.due_date").unwrap().required()),
    );
    let err = Resolver::json().resolve_table(&table, &loan_context()).unwrap_err();
    assert_eq!(err.key_path(), "installments[0].due");
}

#[test]
fn missing_list_is_an_error() {
    let table = MappingTable::new().repeat("rows", "addresses", MappingTable::new());
    let err = Resolver::json().resolve_table(&table, &Context::new()).unwrap_err();
    assert_eq!(
        err,
        MappingError::MissingList {
            key_path: "rows".into(),
            list: "addresses".into(),
        }
    );
}

#[test]
fn one_bad_field_yields_no_document() {
    let table = MappingTable::new()
        .field("ok", FieldMapping::hardcode("fine"))
        .field("bad", FieldMapping::path("customer.missing").unwrap().required())
        .field("later", FieldMapping::hardcode("never"));
    let result = Resolver::json().resolve_table(&table, &loan_context());
    assert!(result.is_err());

    let many = Resolver::json().resolve_many(&name_table(), &[customer(json!("Ok")), customer(Value::Null)]);
    assert!(many.is_err());
}
