// file: src/tools/pnputil.rs
// version: 1.0.0
// guid: 443e7cc9-cb43-412c-b409-6f3244865e97

//! Driver packages via pnputil
//!
//! `pnputil /enum-drivers` prints one `Label: value` block per package, separated by
//! blank lines. Both the current labels and the Windows 10 1607 era labels are accepted.

use super::text::clean_terminal_output;
use crate::error::{CoreUpdateError, Result};
use crate::model::{CandidateRecord, RecordKind};
use crate::runner::Invocation;
use regex::Regex;
use std::path::Path;
use tracing::debug;

const TOOL: &str = "pnputil";

/// Query for installed third-party driver packages
pub fn enum_query(exe: &str) -> Invocation {
    Invocation::query(exe)
        .arg("/enum-drivers")
        .labelled("Enumerating driver packages")
}

/// Remove one driver package, uninstalling it from devices that use it
pub fn delete_action(exe: &str, published_name: &str) -> Result<Invocation> {
    if !is_published_name(published_name) {
        return Err(CoreUpdateError::validation(format!(
            "'{}' is not an OEM driver package name (oemNN.inf)",
            published_name
        )));
    }
    Ok(Invocation::action(exe)
        .arg("/delete-driver")
        .arg(published_name)
        .args(["/uninstall", "/force"])
        .labelled(format!("Removing {}", published_name)))
}

/// Export every third-party driver package into `dir`
pub fn export_action(exe: &str, dir: &Path) -> Invocation {
    Invocation::action(exe)
        .args(["/export-driver", "*"])
        .arg(dir.to_string_lossy())
        .labelled(format!("Exporting drivers to {}", dir.display()))
}

pub fn is_published_name(value: &str) -> bool {
    Regex::new(r"(?i)^oem\d+\.inf$")
        .map(|re| re.is_match(value))
        .unwrap_or(false)
}

/// Fields of one driver package block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverPackage {
    pub published_name: String,
    pub original_name: String,
    pub provider: String,
    pub class: String,
    pub date: String,
    pub version: String,
}

impl DriverPackage {
    pub fn into_record(self) -> CandidateRecord {
        CandidateRecord::new(RecordKind::Driver, self.published_name, self.original_name)
            .with_version(self.version)
            .with_detail(format!("{} · {} · {}", self.provider, self.class, self.date))
    }
}

#[derive(Clone, Copy)]
enum Field {
    Published,
    Original,
    Provider,
    Class,
    DateAndVersion,
}

fn field_for(label: &str) -> Option<Field> {
    match label.trim().to_ascii_lowercase().as_str() {
        "published name" => Some(Field::Published),
        "original name" => Some(Field::Original),
        "provider name" | "driver package provider" => Some(Field::Provider),
        "class name" | "class" => Some(Field::Class),
        "driver version" | "driver date and version" => Some(Field::DateAndVersion),
        _ => None,
    }
}

/// Parse `/enum-drivers` output into records
pub fn parse(raw: &str) -> Result<Vec<CandidateRecord>> {
    Ok(parse_packages(raw)?
        .into_iter()
        .map(DriverPackage::into_record)
        .collect())
}

/// Parse `/enum-drivers` output into driver packages
pub fn parse_packages(raw: &str) -> Result<Vec<DriverPackage>> {
    let cleaned = clean_terminal_output(raw);
    let mut packages = Vec::new();
    let mut saw_banner = false;

    for block in blocks(&cleaned) {
        let is_package = block.iter().any(|line| {
            line.split_once(':')
                .and_then(|(label, _)| field_for(label))
                .is_some_and(|field| matches!(field, Field::Published))
        });

        if !is_package {
            if block.iter().any(|line| line.contains("PnP Utility")) {
                saw_banner = true;
                continue;
            }
            return Err(CoreUpdateError::parse(
                TOOL,
                format!("unrecognized block starting '{}'", block[0].trim()),
                raw,
            ));
        }

        packages.push(parse_block(&block).map_err(|reason| {
            CoreUpdateError::parse(TOOL, format!("{} in block '{}'", reason, block[0].trim()), raw)
        })?);
    }

    if packages.is_empty() && !saw_banner {
        return Err(CoreUpdateError::parse(TOOL, "no driver package blocks found", raw));
    }

    debug!("Parsed {} driver packages", packages.len());
    Ok(packages)
}

fn blocks(text: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

fn parse_block(block: &[&str]) -> std::result::Result<DriverPackage, String> {
    let mut package = DriverPackage::default();
    let mut date_and_version = None;

    for line in block {
        let Some((label, value)) = line.split_once(':') else {
            return Err(format!("line without a label: '{}'", line.trim()));
        };
        let value = value.trim().to_string();
        match field_for(label) {
            Some(Field::Published) => package.published_name = value,
            Some(Field::Original) => package.original_name = value,
            Some(Field::Provider) => package.provider = value,
            Some(Field::Class) => package.class = value,
            Some(Field::DateAndVersion) => date_and_version = Some(value),
            // newer builds add fields such as Signer Name and Extension ID
            None => {}
        }
    }

    if !is_published_name(&package.published_name) {
        return Err(format!("invalid published name '{}'", package.published_name));
    }
    for (name, value) in [
        ("original name", &package.original_name),
        ("provider", &package.provider),
        ("class", &package.class),
    ] {
        if value.is_empty() {
            return Err(format!("missing {}", name));
        }
    }

    let date_and_version = date_and_version.ok_or("missing driver version")?;
    let mut parts = date_and_version.split_whitespace();
    match (parts.next(), parts.next(), parts.next()) {
        (Some(date), Some(version), None) => {
            package.date = date.to_string();
            package.version = version.to_string();
        }
        _ => return Err(format!("unexpected driver version '{}'", date_and_version)),
    }

    Ok(package)
}
