//! Verify command implementation

use anyhow::Result;
use std::path::PathBuf;

use codemap::verify_cache;

pub fn run_verify(root_path: PathBuf, fail_if_stale: bool, json: bool) -> Result<u8> {
    let config = crate::load_config(&root_path)?;
    let report = verify_cache(&root_path, &config)?;

    if json {
        crate::output_json(&report)?;
    } else {
        println!("Cache verification: {}", root_path.display());

        if !report.missing.is_empty() {
            println!("Missing files ({}):", report.missing.len());
            for path in &report.missing {
                println!("  - {}", path);
            }
        }

        if !report.new.is_empty() {
            println!("New files ({}):", report.new.len());
            for path in &report.new {
                println!("  + {}", path);
            }
        }

        if !report.modified.is_empty() {
            println!("Modified files ({}):", report.modified.len());
            for path in &report.modified {
                println!("  ~ {}", path);
            }
        }

        if report.is_clean() {
            println!("All {} cached files up to date", report.unchanged);
        } else {
            println!("Total: {} issues", report.total_issues());
        }
    }

    if fail_if_stale && !report.is_clean() {
        Ok(crate::EXIT_SCAN_ERROR)
    } else {
        Ok(0)
    }
}
