use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use wxscan_core::{OffsetRow, OffsetTable, ScanRequest, VersionReport};

#[derive(Parser)]
#[command(name = "wxscan")]
#[command(about = "Locate WeChat account data offsets in process memory")]
struct Args {
    /// Phone number bound to the account
    #[arg(long)]
    mobile: String,

    /// Display name (nickname)
    #[arg(long)]
    name: String,

    /// Account identifier (wxid)
    #[arg(long)]
    account: String,

    /// Database key, hex-encoded
    #[arg(long)]
    key: String,

    /// Process name substring to match
    #[arg(long, default_value = "WeChat.exe")]
    process: String,

    /// Module name substring for the primary scan span
    #[arg(long, default_value = "WeChatWin.dll")]
    module: String,

    /// Broader module token for the key search span
    #[arg(long, default_value = "WeChat")]
    token: String,

    /// Offset table to merge results into
    #[arg(long, default_value = "version_list.json")]
    table: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("wxscan=info".parse()?)
                .add_directive("wxscan_core=info".parse()?),
        )
        .init();

    let args = Args::parse();

    // Reject a malformed key before touching any process.
    let key = wxscan_core::decode_key_hex(&args.key)?;

    let request = ScanRequest::new(args.mobile, args.name, args.account, key)
        .with_process(args.process)
        .with_module(args.module)
        .with_token(args.token);

    let reports = run_scan(&request)?;

    let mut table = OffsetTable::load_from_path(&args.table)?;
    for report in &reports {
        print_report(report);

        let row = OffsetRow::from(&report.outcome.offsets);
        table.insert(report.version.clone(), row);

        let mut record = serde_json::Map::new();
        record.insert(report.version.clone(), serde_json::to_value(row)?);
        println!("{}", serde_json::to_string_pretty(&record)?);
    }
    table.save_to_path(&args.table)?;

    Ok(())
}

fn print_report(report: &VersionReport) {
    let outcome = &report.outcome;
    info!(
        "pid {} version {} module base {:#x}",
        report.pid, report.version, outcome.span.base
    );

    let describe = |label: &str, offset: Option<u64>| match offset {
        Some(offset) => info!("  {}: {:#x}", label, offset),
        None => warn!("  {}: not found", label),
    };
    describe("name", outcome.offsets.name);
    describe("account", outcome.offsets.account);
    describe("mobile", outcome.offsets.mobile);
    describe("key", outcome.offsets.key);
}

#[cfg(target_os = "windows")]
fn run_scan(request: &ScanRequest) -> Result<Vec<VersionReport>> {
    Ok(wxscan_core::recon::run(request)?)
}

#[cfg(not(target_os = "windows"))]
fn run_scan(_request: &ScanRequest) -> Result<Vec<VersionReport>> {
    anyhow::bail!("process memory scanning is only supported on Windows")
}
