use serde::Serialize;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use super::OcrCapability;

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Where to look for the tesseract binary, in priority order.
#[derive(Debug, Clone)]
pub enum Candidate {
    Explicit(PathBuf),
    WellKnown(PathBuf),
    SearchPath(OsString),
}

impl Candidate {
    fn strategy(&self) -> &'static str {
        match self {
            Candidate::Explicit(_) => "explicit",
            Candidate::WellKnown(_) => "well_known_path",
            Candidate::SearchPath(_) => "path_lookup",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeAttempt {
    pub strategy: &'static str,
    pub candidate: String,
    pub success: bool,
    pub outcome: String,
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub capability: OcrCapability,
    pub attempts: Vec<ProbeAttempt>,
}

#[derive(Debug, Clone)]
pub struct TesseractLocator {
    candidates: Vec<Candidate>,
    probe_timeout: Duration,
}

impl TesseractLocator {
    /// Explicit configuration first, then well-known install paths, then `PATH`.
    pub fn new(explicit: Option<PathBuf>) -> Self {
        let mut candidates = Vec::new();
        if let Some(path) = explicit {
            candidates.push(Candidate::Explicit(path));
        }
        candidates.extend(well_known_paths().into_iter().map(Candidate::WellKnown));
        if let Some(path) = std::env::var_os("PATH") {
            candidates.push(Candidate::SearchPath(path));
        }
        Self::with_candidates(candidates)
    }

    pub fn with_candidates(candidates: Vec<Candidate>) -> Self {
        Self {
            candidates,
            probe_timeout: PROBE_TIMEOUT,
        }
    }

    pub fn candidates(&self) -> &[Candidate] {
        &self.candidates
    }

    /// Tries each candidate in order; the first one that answers `--version` wins.
    pub async fn resolve(&self) -> Resolution {
        let mut attempts = Vec::new();
        for candidate in &self.candidates {
            let strategy = candidate.strategy();
            let paths = match candidate {
                Candidate::Explicit(path) | Candidate::WellKnown(path) => vec![path.clone()],
                Candidate::SearchPath(search) => std::env::split_paths(search)
                    .map(|dir| dir.join(binary_name()))
                    .filter(|path| path.is_file())
                    .collect(),
            };
            if paths.is_empty() {
                attempts.push(ProbeAttempt {
                    strategy,
                    candidate: binary_name().to_string(),
                    success: false,
                    outcome: "not found on PATH".to_string(),
                });
                continue;
            }

            for path in paths {
                let outcome = if path.is_file() {
                    self.probe(&path).await
                } else {
                    Err("no such file".to_string())
                };
                match outcome {
                    Ok(version) => {
                        tracing::info!("Tesseract found at {} ({})", path.display(), version);
                        attempts.push(ProbeAttempt {
                            strategy,
                            candidate: path.display().to_string(),
                            success: true,
                            outcome: version.clone(),
                        });
                        return Resolution {
                            capability: OcrCapability::Available {
                                binary: path,
                                version,
                                strategy,
                            },
                            attempts,
                        };
                    }
                    Err(outcome) => attempts.push(ProbeAttempt {
                        strategy,
                        candidate: path.display().to_string(),
                        success: false,
                        outcome,
                    }),
                }
            }
        }

        tracing::warn!(
            "Tesseract executable not found after {} attempts, image analysis disabled",
            attempts.len()
        );
        Resolution {
            capability: OcrCapability::Unavailable {
                reason: format!(
                    "tesseract not found (tried {} candidates)",
                    attempts.len()
                ),
            },
            attempts,
        }
    }

    async fn probe(&self, path: &Path) -> Result<String, String> {
        let output = Command::new(path)
            .arg("--version")
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output();
        match tokio::time::timeout(self.probe_timeout, output).await {
            Err(_) => Err(format!("timed out after {:?}", self.probe_timeout)),
            Ok(Err(e)) => Err(e.to_string()),
            Ok(Ok(output)) if !output.status.success() => {
                Err(format!("exited with {}", output.status))
            }
            Ok(Ok(output)) => {
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);
                Ok(stdout
                    .lines()
                    .chain(stderr.lines())
                    .map(str::trim)
                    .find(|line| !line.is_empty())
                    .unwrap_or("unknown version")
                    .to_string())
            }
        }
    }
}

fn binary_name() -> &'static str {
    if cfg!(windows) {
        "tesseract.exe"
    } else {
        "tesseract"
    }
}

#[cfg(windows)]
fn well_known_paths() -> Vec<PathBuf> {
    let mut paths = vec![
        PathBuf::from(r"C:\Program Files\Tesseract-OCR\tesseract.exe"),
        PathBuf::from(r"C:\Program Files (x86)\Tesseract-OCR\tesseract.exe"),
        PathBuf::from(r"C:\Tesseract-OCR\tesseract.exe"),
    ];
    if let Some(user) = std::env::var_os("USERNAME") {
        let user = PathBuf::from(r"C:\Users").join(user);
        paths.push(user.join(r"AppData\Local\Tesseract-OCR\tesseract.exe"));
        paths.push(user.join(r"AppData\Local\Programs\Tesseract-OCR\tesseract.exe"));
    }
    paths
}

#[cfg(not(windows))]
fn well_known_paths() -> Vec<PathBuf> {
    [
        "/usr/bin/tesseract",
        "/usr/local/bin/tesseract",
        "/opt/homebrew/bin/tesseract",
        "/opt/local/bin/tesseract",
    ]
    .into_iter()
    .map(PathBuf::from)
    .collect()
}
