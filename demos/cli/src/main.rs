use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use coverage_core::{diff_policy_versions, CoverageChange, PolicyVersion};
use coverage_json::parse_policy_version_str;

#[derive(Parser, Debug)]
#[command(
    name = "coverage-cli",
    about = "Chuẩn hóa và so sánh bảng quyền lợi từ payload JSON của backend."
)]
struct Args {
    /// Đường dẫn tới file JSON của phiên bản hợp đồng.
    #[arg(short, long)]
    input: PathBuf,

    /// File JSON của phiên bản muốn so sánh (bật chế độ diff).
    #[arg(short, long)]
    target: Option<PathBuf>,

    /// In kết quả dạng JSON thay vì tóm tắt.
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let base = read_version(&args.input)?;

    match args.target {
        Some(path) => {
            let target = read_version(&path)?;
            let diff = diff_policy_versions(&base, &target);

            if args.json {
                println!("{}", serde_json::to_string_pretty(&diff)?);
                return Ok(());
            }

            println!(
                "Policy v{} -> v{}: {} rows",
                diff.from_version,
                diff.to_version,
                diff.rows.len()
            );
            for row in &diff.rows {
                match &row.change {
                    CoverageChange::Added { after } => println!("  + {}: {after}", row.key),
                    CoverageChange::Changed { before, after } => {
                        println!("  ~ {}: {before} -> {after}", row.key)
                    }
                    CoverageChange::Removed { before } => println!("  - {}: {before}", row.key),
                }
            }
        }
        None => {
            if args.json {
                println!("{}", serde_json::to_string_pretty(&base)?);
                return Ok(());
            }

            println!("Version: {}", base.version);
            if let Some(date) = base.effective_date {
                println!("Effective: {date}");
            }
            println!("Items: {}", base.coverage.len());
            for (name, entry) in base.coverage.iter() {
                println!("  {name}: {entry}");
            }
        }
    }

    Ok(())
}

fn read_version(path: &Path) -> anyhow::Result<PolicyVersion> {
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("Không đọc được file {path:?}"))?;
    let version = parse_policy_version_str(&data)
        .with_context(|| format!("Không đọc được phiên bản hợp đồng từ {path:?}"))?;
    Ok(version)
}
