//! LaTeX Compilation - Two Passes, Hard Timeout
//!
//! NotStarted -> FirstPass -> { Failed | SecondPass -> Done }
//!
//! The first pass decides success. The second pass only resolves
//! cross-references (`\pageref{LastPage}` and friends); its exit status is
//! reported but does not fail the build.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::process::{Invocation, ProcessOutput, ProcessRunner};

pub const DEFAULT_ENGINE: &str = "pdflatex";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("compilation failed ({})\n{output}", exit_label(*.exit_code))]
    Failed {
        exit_code: Option<i32>,
        output: String,
    },

    #[error("compilation process timed out after {}s (pass {pass})", .timeout.as_secs())]
    Timeout {
        pass: u8,
        timeout: Duration,
        output: String,
    },

    #[error("failed to create output directory '{}': {source}", .path.display())]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not run '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

pub(crate) fn exit_label(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {code}"),
        None => "terminated by signal".to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PassStrategy {
    /// Stop after the first pass; references stay unresolved.
    SinglePass,
    #[default]
    TwoPass,
}

#[derive(Debug, Clone)]
pub struct CompileSettings {
    pub engine: String,
    pub timeout: Duration,
    pub strategy: PassStrategy,
}

impl Default for CompileSettings {
    fn default() -> Self {
        Self {
            engine: DEFAULT_ENGINE.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            strategy: PassStrategy::TwoPass,
        }
    }
}

/// Where the compiler writes, derived from the requested PDF path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget {
    pub dir: PathBuf,
    pub job_name: String,
}

impl OutputTarget {
    pub fn for_pdf(output_pdf: &Path) -> Self {
        let dir = match output_pdf.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let job_name = output_pdf
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { dir, job_name }
    }

    pub fn pdf_path(&self) -> PathBuf {
        self.dir.join(format!("{}.pdf", self.job_name))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileReport {
    pub pdf: PathBuf,
    pub passes_run: u8,
    /// Exit code of the reference-resolving pass, when it ran.
    pub second_pass_exit: Option<i32>,
    pub elapsed_ms: u64,
}

impl CompileReport {
    pub fn second_pass_failed(&self) -> bool {
        self.passes_run == 2 && self.second_pass_exit != Some(0)
    }
}

pub struct LatexCompiler<R> {
    runner: R,
    settings: CompileSettings,
}

impl<R: ProcessRunner> LatexCompiler<R> {
    pub fn new(runner: R, settings: CompileSettings) -> Self {
        Self { runner, settings }
    }

    /// Engine command line: non-interactive, halt on first error,
    /// `file:line:` error tags, fixed output directory and job name.
    pub fn invocation(&self, input_tex: &Path, target: &OutputTarget) -> Invocation {
        Invocation::new(&self.settings.engine)
            .arg("-interaction=nonstopmode")
            .arg("-halt-on-error")
            .arg("-file-line-error")
            .arg("-output-directory")
            .arg(target.dir.as_os_str())
            .arg(format!("-jobname={}", target.job_name))
            .arg(input_tex.as_os_str())
    }

    fn run_pass(&self, pass: u8, invocation: &Invocation) -> Result<ProcessOutput, CompileError> {
        tracing::info!(op = "compile::pass", pass, command = %invocation, "running typesetting pass");
        let output = self
            .runner
            .run(invocation, self.settings.timeout)
            .map_err(|source| CompileError::Spawn {
                program: self.settings.engine.clone(),
                source,
            })?;

        if output.timed_out {
            return Err(CompileError::Timeout {
                pass,
                timeout: self.settings.timeout,
                output: output.combined(),
            });
        }
        Ok(output)
    }

    /// `compile(input_source_path, output_pdf_path)`; the timeout comes from settings.
    pub fn compile(&self, input_tex: &Path, output_pdf: &Path) -> Result<CompileReport, CompileError> {
        let target = OutputTarget::for_pdf(output_pdf);
        fs::create_dir_all(&target.dir).map_err(|source| CompileError::OutputDir {
            path: target.dir.clone(),
            source,
        })?;

        let invocation = self.invocation(input_tex, &target);

        let first = self.run_pass(1, &invocation)?;
        if !first.success() {
            tracing::warn!(op = "compile::pass", pass = 1, exit_code = ?first.exit_code, "first pass failed");
            return Err(CompileError::Failed {
                exit_code: first.exit_code,
                output: first.combined(),
            });
        }

        let mut report = CompileReport {
            pdf: target.pdf_path(),
            passes_run: 1,
            second_pass_exit: None,
            elapsed_ms: first.elapsed.as_millis() as u64,
        };

        if self.settings.strategy == PassStrategy::TwoPass {
            let second = self.run_pass(2, &invocation)?;
            report.passes_run = 2;
            report.second_pass_exit = second.exit_code;
            report.elapsed_ms += second.elapsed.as_millis() as u64;
            if !second.success() {
                tracing::warn!(
                    op = "compile::pass",
                    pass = 2,
                    exit_code = ?second.exit_code,
                    "second pass exited unsuccessfully; keeping first-pass result"
                );
            }
        }

        Ok(report)
    }
}
