//! Resolve-then-send glue between mapping tables and partner adapters.
//!
//! Each function resolves the whole document before anything goes on the
//! wire. A mapping error returns immediately: nothing is sent and nothing is
//! written to the audit log, because no transmission was attempted.

use crate::{
    clients::{BssClient, DbsClient, Method, PartnerOutcome, SmfClient},
    context::Context,
    error::ChannelingResult,
    files::{BatchExchange, FileLayout},
    mapping::{MappingTable, Resolver},
    types::{ApplicationId, LoanId},
};
use chrono::NaiveDate;
use serde_json::Value;

/// Resolve `table` and send it as the DBS loan-application body.
pub fn submit_dbs(
    client: &DbsClient<'_>,
    table: &MappingTable,
    ctx: &Context,
    application_id: ApplicationId,
    loan_id: Option<LoanId>,
) -> ChannelingResult<Value> {
    let document = Resolver::json().resolve_table(table, ctx)?;
    let body = serde_json::to_string(&document)?;
    client.send_loan_application(&body, application_id, loan_id)
}

/// Resolve `table` and post it to BSS as form data.
pub fn submit_bss(
    client: &BssClient<'_>,
    table: &MappingTable,
    ctx: &Context,
    request_path: &str,
    trxtype: &str,
    application_id: Option<ApplicationId>,
    loan_id: Option<LoanId>,
) -> ChannelingResult<PartnerOutcome> {
    let document = Resolver::json().resolve_table(table, ctx)?;
    client.send_request(request_path, trxtype, &document, application_id, loan_id)
}

/// Resolve `table` and POST it to SMF as signed JSON.
pub fn submit_smf(
    client: &SmfClient<'_>,
    table: &MappingTable,
    ctx: &Context,
    path: &str,
    request_type: &str,
    application_id: Option<ApplicationId>,
    loan_id: Option<LoanId>,
) -> ChannelingResult<PartnerOutcome> {
    let document = Resolver::json().resolve_table(table, ctx)?;
    client.send(
        Method::Post,
        path,
        &[],
        &Value::Object(document),
        request_type,
        application_id,
        loan_id,
    )
}

/// Resolve one record per context and upload them as a single batch file.
/// Returns the remote file name.
pub fn submit_batch(
    exchange: &BatchExchange<'_>,
    layout: &FileLayout,
    table: &MappingTable,
    contexts: &[Context],
    date: NaiveDate,
) -> ChannelingResult<String> {
    let docs = Resolver::new(layout.output_mode()).resolve_many(table, contexts)?;
    exchange.upload_batch(layout, date, &docs)
}
