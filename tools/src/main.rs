//! channeling-runner: offline tooling for partner mapping tables.
//!
//! Usage:
//!   channeling-runner resolve --table dbs_loan_application --context loan.json [--mode json|fixed]
//!   channeling-runner render --layout permata_disbursement --context batch.json [--date 2024-05-01]
//!   channeling-runner submit --partner dbs --table dbs_loan_application --context loan.json --db channeling.db --app 2001
//!   channeling-runner upload --layout permata_disbursement --context batch.json --db channeling.db
//!   channeling-runner approvals --layout permata_disbursement --db channeling.db
//!   channeling-runner logs --db channeling.db [--loan 1001] [--limit 20]
//!
//! Every command accepts `--data-dir` (default `./data`).

use anyhow::{anyhow, Result};
use channeling_core::{
    clients::{BssClient, DbsClient, ReqwestTransport, SftpClient, SmfClient},
    config::ChannelingConfig,
    context::Context,
    files::BatchExchange,
    mapping::{OutputMode, Resolver},
    store::ChannelingStore,
    submission::{submit_batch, submit_bss, submit_dbs, submit_smf},
};
use chrono::NaiveDate;
use serde_json::Value;
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let data_dir = flag(&args, "--data-dir").unwrap_or("./data");

    match args.get(1).map(String::as_str) {
        Some("resolve") => resolve(&args, data_dir),
        Some("render") => render(&args, data_dir),
        Some("submit") => submit(&args, data_dir),
        Some("upload") => upload(&args, data_dir),
        Some("approvals") => approvals(&args, data_dir),
        Some("logs") => logs(&args),
        _ => {
            eprintln!("usage: channeling-runner <resolve|render|submit|upload|approvals|logs> [flags]");
            eprintln!("  resolve   --table NAME --context FILE [--mode json|fixed]");
            eprintln!("  render    --layout NAME --context FILE [--date YYYY-MM-DD]");
            eprintln!("  submit    --partner dbs|bss|smf --table NAME --context FILE --db FILE");
            eprintln!("            [--app ID] [--loan ID] [--path PATH] [--trxtype T] [--request-type T]");
            eprintln!("  upload    --layout NAME --context FILE --db FILE [--date YYYY-MM-DD]");
            eprintln!("  approvals --layout NAME --db FILE");
            eprintln!("  logs      --db FILE [--loan ID] [--limit N]");
            std::process::exit(2);
        }
    }
}

fn resolve(args: &[String], data_dir: &str) -> Result<()> {
    let config = ChannelingConfig::load(data_dir)?;
    let table_name = required(args, "--table")?;
    let table = config.mapping(table_name)?;
    let mode = match flag(args, "--mode").unwrap_or("json") {
        "json" => OutputMode::Json,
        "fixed" => OutputMode::FixedWidth,
        other => return Err(anyhow!("unknown --mode '{other}' (json|fixed)")),
    };

    let contexts = load_contexts(&config, required(args, "--context")?)?;
    let docs = Resolver::new(mode).resolve_many(table, &contexts)?;
    log::info!("resolved {} document(s) with table {table_name}", docs.len());
    for doc in docs {
        println!("{}", serde_json::to_string_pretty(&doc)?);
    }
    Ok(())
}

fn render(args: &[String], data_dir: &str) -> Result<()> {
    let config = ChannelingConfig::load(data_dir)?;
    let layout = config.layout(required(args, "--layout")?)?;
    let table = config.mapping(&layout.table)?;
    let date = match flag(args, "--date") {
        Some(text) => NaiveDate::parse_from_str(text, "%Y-%m-%d")?,
        None => chrono::Local::now().date_naive(),
    };

    let contexts = load_contexts(&config, required(args, "--context")?)?;
    let docs = Resolver::new(layout.output_mode()).resolve_many(table, &contexts)?;
    let name = layout.filename.render(date, 1)?;
    eprintln!("{}/{name}", layout.request_dir);
    print!("{}", layout.render(&docs).map_err(|reason| anyhow!("{name}: {reason}"))?);
    Ok(())
}

fn submit(args: &[String], data_dir: &str) -> Result<()> {
    let config = ChannelingConfig::load(data_dir)?;
    let table = config.mapping(required(args, "--table")?)?;
    let contexts = load_contexts(&config, required(args, "--context")?)?;
    let ctx = contexts
        .first()
        .ok_or_else(|| anyhow!("context file holds no documents"))?;
    let store = open_store(args)?;
    let application_id = flag(args, "--app").map(str::parse::<i64>).transpose()?;
    let loan_id = flag(args, "--loan").map(str::parse::<i64>).transpose()?;
    let transport = Box::new(ReqwestTransport::new()?);

    let partner = required(args, "--partner")?;
    let response = match partner {
        "dbs" => {
            let dbs = config.dbs.clone().ok_or_else(|| anyhow!("no dbs section in partners.json"))?;
            let application_id = application_id.ok_or_else(|| anyhow!("dbs requires --app"))?;
            let client = DbsClient::new(dbs, transport, &store);
            submit_dbs(&client, table, ctx, application_id, loan_id)?
        }
        "bss" => {
            let bss = config.bss.clone().ok_or_else(|| anyhow!("no bss section in partners.json"))?;
            let client = BssClient::new(bss, transport, &store);
            let path = required(args, "--path")?;
            let trxtype = required(args, "--trxtype")?;
            submit_bss(&client, table, ctx, path, trxtype, application_id, loan_id)?.into_legacy_json()
        }
        "smf" => {
            let smf = config.smf.clone().ok_or_else(|| anyhow!("no smf section in partners.json"))?;
            let client = SmfClient::new(smf, transport, &store);
            let path = required(args, "--path")?;
            let request_type = flag(args, "--request-type").unwrap_or(path);
            submit_smf(&client, table, ctx, path, request_type, application_id, loan_id)?.into_legacy_json()
        }
        other => return Err(anyhow!("unknown --partner '{other}' (dbs|bss|smf)")),
    };
    log::info!("{partner} submission finished");
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn upload(args: &[String], data_dir: &str) -> Result<()> {
    let config = ChannelingConfig::load(data_dir)?;
    let layout = config.layout(required(args, "--layout")?)?;
    let table = config.mapping(&layout.table)?;
    let date = match flag(args, "--date") {
        Some(text) => NaiveDate::parse_from_str(text, "%Y-%m-%d")?,
        None => chrono::Local::now().date_naive(),
    };
    let contexts = load_contexts(&config, required(args, "--context")?)?;
    let store = open_store(args)?;
    let remote = SftpClient::new(config.sftp_for(layout.channeling_type)?.clone());

    let exchange = BatchExchange::new(&remote, &store);
    let name = submit_batch(&exchange, layout, table, &contexts, date)?;
    println!("{}/{name}", layout.request_dir);
    Ok(())
}

fn approvals(args: &[String], data_dir: &str) -> Result<()> {
    let config = ChannelingConfig::load(data_dir)?;
    let layout = config.layout(required(args, "--layout")?)?;
    let store = open_store(args)?;
    let remote = SftpClient::new(config.sftp_for(layout.channeling_type)?.clone());

    let exchange = BatchExchange::new(&remote, &store);
    let sweep = exchange.collect_approvals(layout)?;
    for file in &sweep.files {
        println!("{} ({} records)", file.name, file.records.len());
        for record in &file.records {
            println!("  {}", serde_json::to_string(record)?);
        }
    }
    for (name, error) in &sweep.failures {
        eprintln!("{name}: {error}");
    }
    if !sweep.failures.is_empty() {
        return Err(anyhow!("{} approval file(s) failed", sweep.failures.len()));
    }
    Ok(())
}

fn open_store(args: &[String]) -> Result<ChannelingStore> {
    let store = ChannelingStore::open(required(args, "--db")?)?;
    store.migrate()?;
    Ok(store)
}

fn logs(args: &[String]) -> Result<()> {
    let store = open_store(args)?;
    let rows = match flag(args, "--loan") {
        Some(id) => store.api_logs_for_loan(id.parse()?)?,
        None => store.recent_api_logs(parse_arg(args, "--limit", 20usize))?,
    };
    for row in rows {
        println!(
            "#{:<6} {} {:<8} {:<28} status={:<5} loan={:<8} {}",
            row.id,
            row.created_at,
            row.channeling_type,
            row.request_type,
            row.http_status_code.map_or("-".to_string(), |s| s.to_string()),
            row.loan_id.map_or("-".to_string(), |id| id.to_string()),
            row.error_message.as_deref().unwrap_or("ok"),
        );
    }
    Ok(())
}

/// A context file holds one context document or an array of them.
fn load_contexts(config: &ChannelingConfig, path: &str) -> Result<Vec<Context>> {
    let content = std::fs::read_to_string(path).map_err(|e| anyhow!("Cannot read {path}: {e}"))?;
    let document: Value = serde_json::from_str(&content)?;
    let documents = match document {
        Value::Array(items) => items,
        single => vec![single],
    };
    let base = config.base_context();
    documents
        .into_iter()
        .map(|mut doc| {
            if let Value::Object(map) = &mut doc {
                for (name, value) in base.values() {
                    map.entry(name.clone()).or_insert_with(|| value.clone());
                }
            }
            Context::from_json(&doc).map_err(|e| anyhow!("{path}: {e}"))
        })
        .collect()
}

fn flag<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.windows(2).find(|w| w[0] == name).map(|w| w[1].as_str())
}

fn required<'a>(args: &'a [String], name: &str) -> Result<&'a str> {
    flag(args, name).ok_or_else(|| anyhow!("missing required flag {name}"))
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}
