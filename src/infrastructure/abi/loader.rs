//! ABI loader - turns ABI JSON documents into function signatures

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use alloy_json_abi::JsonAbi;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::domain::abi::{
    DuplicateSelectorError, FunctionSignature, ParamSpec, ParamType, SelectorRegistry,
    SignatureError,
};

const ORCHESTRATOR_ABI: &str = include_str!("../../../abi/Orchestrator.json");

/// Files above this size are not ABI documents worth parsing
const MAX_ABI_FILE_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum AbiLoadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid ABI JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("document contains no ABI")]
    NoAbi,
    #[error(transparent)]
    Signature(#[from] SignatureError),
    #[error(transparent)]
    Duplicate(#[from] DuplicateSelectorError),
}

/// Result of scanning one or more directories
#[derive(Debug, Default)]
pub struct ScanReport {
    pub functions: Vec<FunctionSignature>,
    pub scanned_files: usize,
    /// `path: error` for every file that looked like an ABI but failed
    pub errors: Vec<String>,
    pub scan_ms: u128,
}

pub struct AbiLoader;

impl AbiLoader {
    /// Functions of the bundled Orchestrator contract
    pub fn orchestrator() -> Result<Vec<FunctionSignature>, AbiLoadError> {
        Self::parse_document(ORCHESTRATOR_ABI)
    }

    /// Parse a raw ABI array, a `{"abi": [...]}` artifact, or solc
    /// standard-JSON output. Non-function entries are skipped.
    pub fn parse_document(content: &str) -> Result<Vec<FunctionSignature>, AbiLoadError> {
        let value: Value = serde_json::from_str(content)?;
        let abis = Self::extract_abis(value);
        if abis.is_empty() {
            return Err(AbiLoadError::NoAbi);
        }

        let mut functions = Vec::new();
        for abi_value in abis {
            let abi: JsonAbi = serde_json::from_value(abi_value)?;
            for function in abi.functions() {
                let inputs = function
                    .inputs
                    .iter()
                    .map(|input| {
                        ParamType::parse(&input.ty)
                            .map(|kind| ParamSpec::new(input.name.clone(), kind))
                            .ok_or_else(|| SignatureError::UnsupportedType {
                                function: function.name.clone(),
                                kind: input.ty.clone(),
                            })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                functions.push(FunctionSignature::new(function.name.clone(), inputs));
            }
        }

        Ok(functions)
    }

    fn extract_abis(value: Value) -> Vec<Value> {
        match value {
            Value::Array(_) => vec![value],
            Value::Object(mut map) => {
                if let Some(abi) = map.remove("abi") {
                    return vec![abi];
                }
                let Some(Value::Object(sources)) = map.remove("contracts") else {
                    return Vec::new();
                };
                sources
                    .into_iter()
                    .filter_map(|(_, contracts)| match contracts {
                        Value::Object(contracts) => Some(contracts),
                        _ => None,
                    })
                    .flat_map(|contracts| contracts.into_iter())
                    .filter_map(|(_, mut contract)| contract.get_mut("abi").map(Value::take))
                    .collect()
            }
            _ => Vec::new(),
        }
    }

    pub fn load_file(path: &Path) -> Result<Vec<FunctionSignature>, AbiLoadError> {
        let content = fs::read_to_string(path).map_err(|source| AbiLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_document(&content)
    }

    /// Scan a file or directory tree for `.json` ABI documents
    pub fn scan(root: impl AsRef<Path>) -> ScanReport {
        let started = Instant::now();
        let root = root.as_ref();
        let mut report = ScanReport::default();

        for entry in WalkDir::new(root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !Self::is_ignored_dir(e.path()))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    report.errors.push(err.to_string());
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.path();
            if path.extension().and_then(|s| s.to_str()) != Some("json") {
                continue;
            }
            match entry.metadata() {
                Ok(meta) if meta.len() > MAX_ABI_FILE_BYTES => continue,
                Ok(_) => {}
                Err(err) => {
                    report.errors.push(format!("{}: {}", path.display(), err));
                    continue;
                }
            }

            report.scanned_files += 1;
            match Self::load_file(path) {
                Ok(functions) => report.functions.extend(functions),
                // package.json, tsconfig.json and friends
                Err(AbiLoadError::NoAbi) => {}
                Err(err) => report.errors.push(format!("{}: {}", path.display(), err)),
            }
        }

        report.scan_ms = started.elapsed().as_millis();
        report
    }

    /// Scan every root, merging the results
    pub fn scan_roots(roots: &[PathBuf]) -> ScanReport {
        let started = Instant::now();
        let mut merged = ScanReport::default();

        for root in roots {
            let report = Self::scan(root);
            merged.functions.extend(report.functions);
            merged.scanned_files += report.scanned_files;
            merged.errors.extend(report.errors);
        }

        merged.scan_ms = started.elapsed().as_millis();
        merged
    }

    /// Embedded Orchestrator ABI plus everything found under `roots`.
    ///
    /// Files that fail to parse are logged and skipped; a selector collision
    /// across the combined set is an error.
    pub fn build_registry(roots: &[PathBuf]) -> Result<SelectorRegistry, AbiLoadError> {
        let mut functions = Self::orchestrator()?;

        if !roots.is_empty() {
            let report = Self::scan_roots(roots);
            for error in &report.errors {
                warn!(error = %error, "skipping ABI file");
            }
            debug!(
                files = report.scanned_files,
                functions = report.functions.len(),
                elapsed_ms = report.scan_ms as u64,
                "scanned ABI paths"
            );
            functions.extend(report.functions);
        }

        Ok(SelectorRegistry::build(functions)?)
    }

    fn is_ignored_dir(path: &Path) -> bool {
        path.file_name()
            .and_then(|n| n.to_str())
            .map(|name| matches!(name, ".git" | "target" | "node_modules" | "cache"))
            .unwrap_or(false)
    }
}
