//! ResumeForge Core - Resume Production Compiler
//!
//! # The Three Steps
//! 1. Validate: resume data must satisfy its JSON Schema
//! 2. Generate: data + template become LaTeX source
//! 3. Compile: LaTeX becomes a PDF, two passes, bounded by a timeout
//!
//! Each step stands alone; nothing is shared between invocations.

pub mod compile;
pub mod filters;
pub mod loader;
pub mod pipeline;
pub mod process;
pub mod report;
pub mod templates;
pub mod validation;

pub use compile::{CompileError, CompileReport, CompileSettings, LatexCompiler, PassStrategy};
pub use filters::{format_date, latex_escape, markdown_to_latex};
pub use pipeline::{BuildReport, BuildRequest, ErrorClass, PipelineError, ResumePipeline};
pub use process::{Invocation, ProcessOutput, ProcessRunner, SystemRunner};
pub use report::{ConsoleReporter, MemoryReporter, Reporter};
pub use templates::{render, TemplateError, TemplateRenderer};
pub use validation::{validate, SchemaError, ValidationReport, ValidationViolation};

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
