//! ResumeForge CLI
//!
//! Commands: validate, generate, compile, build
//! Human-readable output by default, JSON to stdout with --json
//! Exit code: 0 success, 1 input/parse/unexpected, 2 content failure, 3 timeout

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

use resumeforge_core::{
    compile::{DEFAULT_ENGINE, DEFAULT_TIMEOUT_SECS},
    BuildRequest, CompileSettings, ConsoleReporter, MemoryReporter, PassStrategy, PipelineError,
    Reporter, ResumePipeline, SystemRunner, ENGINE_VERSION,
};

#[derive(Parser)]
#[command(name = "resumeforge-cli", version = ENGINE_VERSION)]
#[command(about = "ResumeForge CLI - YAML resume to LaTeX to PDF")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print a JSON result to stdout instead of status lines
    #[arg(long, global = true)]
    json: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR", value_parser = clap::builder::FalseyValueParser::new())]
    no_color: bool,

    /// More log output on stderr (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Args, Clone)]
struct CompileArgs {
    /// LaTeX engine to run
    #[arg(long, env = "RESUMEFORGE_LATEX", default_value = DEFAULT_ENGINE)]
    engine: String,

    /// Seconds before a compiler pass is killed
    #[arg(long, env = "RESUMEFORGE_TIMEOUT", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Run a single pass; cross-references stay unresolved
    #[arg(long)]
    draft: bool,
}

impl CompileArgs {
    fn settings(&self) -> CompileSettings {
        CompileSettings {
            engine: self.engine.clone(),
            timeout: Duration::from_secs(self.timeout),
            strategy: if self.draft {
                PassStrategy::SinglePass
            } else {
                PassStrategy::TwoPass
            },
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a YAML resume against a JSON schema
    Validate {
        /// Path to the YAML resume file
        #[arg(short, long)]
        resume: PathBuf,

        /// Path to the JSON schema file
        #[arg(short, long)]
        schema: PathBuf,
    },

    /// Generate LaTeX source from a YAML resume and a template
    Generate {
        /// Path to the YAML resume file
        #[arg(short, long, default_value = "resume.yml")]
        resume: PathBuf,

        /// Path to the template file
        #[arg(short, long, default_value = "template.jinja")]
        template: PathBuf,

        /// Path to the output LaTeX file
        #[arg(short, long, default_value = "resume.tex")]
        output: PathBuf,
    },

    /// Compile LaTeX source into a PDF
    Compile {
        /// Path to the input LaTeX (.tex) file
        #[arg(short, long)]
        input: PathBuf,

        /// Path to the output PDF file
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        compiler: CompileArgs,
    },

    /// Validate, generate and compile in one go
    Build {
        #[arg(short, long)]
        resume: PathBuf,

        #[arg(short, long)]
        schema: PathBuf,

        #[arg(short, long)]
        template: PathBuf,

        /// Path to the output PDF file
        #[arg(short, long)]
        output: PathBuf,

        /// Where to keep the intermediate LaTeX file (default: next to the PDF)
        #[arg(long)]
        tex: Option<PathBuf>,

        #[command(flatten)]
        compiler: CompileArgs,
    },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        _ => LevelFilter::DEBUG,
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default.into())
        .from_env_lossy();
    let installed = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
    if let Err(err) = installed {
        eprintln!("failed to install log subscriber: {err}");
    }
}

fn run(command: Commands, reporter: &dyn Reporter) -> Result<serde_json::Value, PipelineError> {
    let value = match command {
        Commands::Validate { resume, schema } => {
            let pipeline = ResumePipeline::new(SystemRunner, CompileSettings::default(), reporter);
            serde_json::to_value(pipeline.validate(&resume, &schema)?)?
        }
        Commands::Generate {
            resume,
            template,
            output,
        } => {
            let pipeline = ResumePipeline::new(SystemRunner, CompileSettings::default(), reporter);
            serde_json::json!({ "output": pipeline.generate(&resume, &template, &output)?.display().to_string() })
        }
        Commands::Compile {
            input,
            output,
            compiler,
        } => {
            let pipeline = ResumePipeline::new(SystemRunner, compiler.settings(), reporter);
            serde_json::to_value(pipeline.compile(&input, &output)?)?
        }
        Commands::Build {
            resume,
            schema,
            template,
            output,
            tex,
            compiler,
        } => {
            let pipeline = ResumePipeline::new(SystemRunner, compiler.settings(), reporter);
            let request = BuildRequest {
                resume,
                schema,
                template,
                output_pdf: output,
                tex,
            };
            serde_json::to_value(pipeline.build(&request)?)?
        }
    };
    Ok(value)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if !cli.json {
        let reporter = ConsoleReporter::new(!cli.no_color);
        return match run(cli.command, &reporter) {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => ExitCode::from(e.class().exit_code()),
        };
    }

    // JSON mode: status lines are collected, not printed.
    let reporter = MemoryReporter::new();
    let (output, code) = match run(cli.command, &reporter) {
        Ok(result) => (
            serde_json::json!({
                "success": true,
                "engine_version": ENGINE_VERSION,
                "result": result,
            }),
            ExitCode::SUCCESS,
        ),
        Err(e) => (
            serde_json::json!({
                "success": false,
                "engine_version": ENGINE_VERSION,
                "class": e.class(),
                "error": e.to_string(),
            }),
            ExitCode::from(e.class().exit_code()),
        ),
    };

    match serde_json::to_string_pretty(&output) {
        Ok(text) => {
            println!("{text}");
            code
        }
        Err(e) => {
            eprintln!(r#"{{"success": false, "error": "failed to encode result: {}"}}"#, e);
            ExitCode::FAILURE
        }
    }
}
