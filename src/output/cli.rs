use crate::model::ScanResult;
use anyhow::Result;
use std::fmt::Write;
use tabled::{settings::Style, Table, Tabled};

#[derive(Tabled)]
struct PackageRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Version")]
    version: String,
}

#[derive(Tabled)]
struct VulnRow {
    #[tabled(rename = "Package")]
    package: String,
    #[tabled(rename = "Installed")]
    installed: String,
    #[tabled(rename = "CVEs")]
    cves: String,
}

#[derive(Tabled)]
struct SkippedRow {
    #[tabled(rename = "Layer")]
    digest: String,
    #[tabled(rename = "Reason")]
    reason: String,
}

pub fn print_cli_table(result: &ScanResult) -> Result<()> {
    print!("{}", render_cli_table(result));
    Ok(())
}

// Writing to a String cannot fail, so the fmt results are dropped.
pub fn render_cli_table(result: &ScanResult) -> String {
    let mut out = String::new();
    let inventory = &result.inventory;

    let _ = writeln!(out);
    let _ = writeln!(out, "Image: {}", result.image);
    let os = if inventory.os_version.is_empty() {
        "unknown".to_string()
    } else {
        format!("Alpine {}", inventory.os_version)
    };
    let _ = writeln!(out, "OS: {}", os);
    let _ = writeln!(
        out,
        "Scan completed at: {}",
        result.scan_time.format("%Y-%m-%d %H:%M:%S UTC")
    );
    let _ = writeln!(out);

    if inventory.packages.is_empty() {
        let _ = writeln!(out, "No Alpine packages found.");
    } else {
        let _ = writeln!(out, "Found {} packages:", inventory.packages.len());
        let _ = writeln!(out);

        let rows: Vec<PackageRow> = inventory
            .packages
            .iter()
            .map(|p| PackageRow {
                name: truncate(&p.name, 40),
                version: truncate(&p.version, 30),
            })
            .collect();
        let _ = writeln!(out, "{}", Table::new(rows).with(Style::rounded()));
    }

    if !result.skipped_layers.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Skipped {} unreadable layers:", result.skipped_layers.len());
        let _ = writeln!(out);

        let rows: Vec<SkippedRow> = result
            .skipped_layers
            .iter()
            .map(|s| SkippedRow {
                digest: truncate(&s.digest, 30),
                reason: truncate(&s.reason, 60),
            })
            .collect();
        let _ = writeln!(out, "{}", Table::new(rows).with(Style::rounded()));
    }

    match &result.report {
        Some(report) if !report.vulnerabilities.is_empty() => {
            let _ = writeln!(out);
            let _ = writeln!(
                out,
                "Found {} vulnerable packages (feed v{}):",
                report.vulnerabilities.len(),
                report.feed_version
            );
            let _ = writeln!(out);

            let rows: Vec<VulnRow> = report
                .vulnerabilities
                .iter()
                .map(|v| VulnRow {
                    package: v.package_name.clone(),
                    installed: v.installed_version.clone(),
                    cves: v.cve_identifiers.join("\n"),
                })
                .collect();
            let _ = writeln!(out, "{}", Table::new(rows).with(Style::rounded()));
        }
        Some(report) => {
            let _ = writeln!(out);
            let _ = writeln!(out, "No known vulnerabilities (feed v{}).", report.feed_version);
        }
        None => {}
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Summary:");
    let _ = writeln!(out, "  Total packages: {}", inventory.packages.len());
    if let Some(report) = &result.report {
        let _ = writeln!(
            out,
            "  Vulnerabilities: {} CVEs across {} packages",
            report.cve_count(),
            report.vulnerabilities.len()
        );
    } else {
        let _ = writeln!(out, "  Vulnerabilities: not checked");
    }

    out
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}
