//! Resume Pipeline - The Three Commands
//!
//! validate, generate and compile are independent; `build` only chains them.
//! Every command checks its inputs before doing work and reports its own
//! outcome through the injected `Reporter`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::compile::{exit_label, CompileError, CompileReport, CompileSettings, LatexCompiler};
use crate::loader::{self, LoadError};
use crate::process::ProcessRunner;
use crate::report::Reporter;
use crate::templates::{TemplateError, TemplateRenderer};
use crate::validation::{SchemaError, SchemaValidator, ValidationReport};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("failed to write output file '{}': {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failure taxonomy shared by all commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    InputNotFound,
    ParseError,
    SchemaViolation,
    RenderError,
    CompileFailed,
    CompileTimeout,
    UnexpectedError,
}

impl ErrorClass {
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorClass::InputNotFound | ErrorClass::ParseError | ErrorClass::UnexpectedError => 1,
            ErrorClass::SchemaViolation | ErrorClass::RenderError | ErrorClass::CompileFailed => 2,
            ErrorClass::CompileTimeout => 3,
        }
    }
}

impl PipelineError {
    pub fn class(&self) -> ErrorClass {
        match self {
            PipelineError::Load(e) => match e {
                LoadError::NotFound { .. } | LoadError::BadExtension { .. } => {
                    ErrorClass::InputNotFound
                }
                LoadError::Parse { .. } | LoadError::NotAMapping { .. } => ErrorClass::ParseError,
                LoadError::Read { .. } => ErrorClass::UnexpectedError,
            },
            PipelineError::Schema(e) => match e {
                SchemaError::InvalidSchema(_) => ErrorClass::ParseError,
                SchemaError::Violations(_) => ErrorClass::SchemaViolation,
            },
            PipelineError::Template(e) => match e {
                TemplateError::NotFound(_) => ErrorClass::InputNotFound,
                TemplateError::Syntax { .. } => ErrorClass::ParseError,
                TemplateError::Render { .. } => ErrorClass::RenderError,
                TemplateError::Config(_) => ErrorClass::UnexpectedError,
            },
            PipelineError::Compile(e) => match e {
                CompileError::Failed { .. } => ErrorClass::CompileFailed,
                CompileError::Timeout { .. } => ErrorClass::CompileTimeout,
                CompileError::OutputDir { .. } | CompileError::Spawn { .. } => {
                    ErrorClass::UnexpectedError
                }
            },
            PipelineError::Write { .. } | PipelineError::Serialization(_) => {
                ErrorClass::UnexpectedError
            }
        }
    }
}

/// Paths for a full `build` run.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub resume: PathBuf,
    pub schema: PathBuf,
    pub template: PathBuf,
    pub output_pdf: PathBuf,
    /// Intermediate LaTeX source; defaults to the PDF path with `.tex`.
    pub tex: Option<PathBuf>,
}

impl BuildRequest {
    pub fn tex_path(&self) -> PathBuf {
        self.tex
            .clone()
            .unwrap_or_else(|| self.output_pdf.with_extension("tex"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildReport {
    pub validation: ValidationReport,
    pub tex: PathBuf,
    pub compile: CompileReport,
}

pub struct ResumePipeline<R, P> {
    compiler: LatexCompiler<R>,
    reporter: P,
}

impl<R: ProcessRunner, P: Reporter> ResumePipeline<R, P> {
    pub fn new(runner: R, settings: CompileSettings, reporter: P) -> Self {
        Self {
            compiler: LatexCompiler::new(runner, settings),
            reporter,
        }
    }

    fn finish<T>(&self, result: Result<T, PipelineError>) -> Result<T, PipelineError> {
        if let Err(err) = &result {
            tracing::debug!(op = "pipeline::finish", class = ?err.class(), error = %err, "command failed");
            self.reporter.error(&err.to_string());
        }
        result
    }

    /// Check resume data against a JSON Schema.
    pub fn validate(&self, resume: &Path, schema: &Path) -> Result<ValidationReport, PipelineError> {
        self.reporter.start("Validating YAML data");
        let result = self.run_validate(resume, schema);
        if result.is_ok() {
            self.reporter.success("All validations passed successfully.");
        }
        self.finish(result)
    }

    fn run_validate(&self, resume: &Path, schema: &Path) -> Result<ValidationReport, PipelineError> {
        loader::require_file(resume, "Resume")?;
        loader::require_file(schema, "Schema")?;

        let data = loader::load_yaml(resume)?;
        let schema = loader::load_json(schema)?;

        let report = SchemaValidator::new(&schema)?.check(&data);
        tracing::info!(
            op = "pipeline::validate",
            valid = report.valid,
            violations = report.violations.len(),
            "schema check finished"
        );
        report.clone().into_result()?;
        Ok(report)
    }

    /// Render resume data through a template and write the LaTeX source.
    pub fn generate(&self, resume: &Path, template: &Path, output: &Path) -> Result<PathBuf, PipelineError> {
        self.reporter
            .start("Generating LaTeX resume from template and YAML data");
        let result = self.run_generate(resume, template, output);
        if let Ok(path) = &result {
            self.reporter
                .success(&format!("Resume generated at {}", path.display()));
        }
        self.finish(result)
    }

    fn run_generate(&self, resume: &Path, template: &Path, output: &Path) -> Result<PathBuf, PipelineError> {
        loader::require_file(resume, "Resume")?;
        loader::require_file(template, "Template")?;

        let data = loader::load_resume(resume)?;
        let rendered = TemplateRenderer::new(template)?.render(&data)?;

        fs::write(output, rendered).map_err(|source| PipelineError::Write {
            path: output.to_path_buf(),
            source,
        })?;
        Ok(output.to_path_buf())
    }

    /// Typeset LaTeX source into a PDF.
    pub fn compile(&self, input_tex: &Path, output_pdf: &Path) -> Result<CompileReport, PipelineError> {
        self.reporter.start("Compiling LaTeX files into a PDF");
        let result = self.run_compile(input_tex, output_pdf);
        if let Ok(report) = &result {
            if report.second_pass_failed() {
                self.reporter.warn(&format!(
                    "reference pass ended with {}; cross-references may be stale",
                    exit_label(report.second_pass_exit)
                ));
            }
            self.reporter.success(&format!(
                "Compilation successful: PDF generated at {}",
                output_pdf.display()
            ));
        }
        self.finish(result)
    }

    fn run_compile(&self, input_tex: &Path, output_pdf: &Path) -> Result<CompileReport, PipelineError> {
        loader::require_file(input_tex, "Input")?;
        loader::require_extension(output_pdf, "Output", "pdf")?;

        self.reporter.info(&format!(
            "Compiling '{}' to '{}'...",
            input_tex.display(),
            output_pdf.display()
        ));
        Ok(self.compiler.compile(input_tex, output_pdf)?)
    }

    /// validate -> generate -> compile, stopping at the first failure.
    pub fn build(&self, request: &BuildRequest) -> Result<BuildReport, PipelineError> {
        let validation = self.validate(&request.resume, &request.schema)?;

        let tex = request.tex_path();
        if let Some(dir) = tex.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|source| PipelineError::Write {
                path: tex.clone(),
                source,
            })?;
        }
        let tex = self.generate(&request.resume, &request.template, &tex)?;
        let compile = self.compile(&tex, &request.output_pdf)?;
        Ok(BuildReport {
            validation,
            tex,
            compile,
        })
    }
}
