mod api;
mod config;
mod server;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde::de::DeserializeOwned;
use tracing::info;

use examloops_core::{
    AttemptCeiling, ExamVerifier, FailureReason, LoopOutcome, RequestValidationError,
};
use examloops_judge::{ExamQuestion, ExamQuestionInput, ModelCorrector, ModelJudge, Verdict};
use examloops_logging::{init_tracing, LogFormat, Logger};
use examloops_model::{create_model, ChatModel, ModelBinding};

use config::{Overrides, ProjectConfig, Settings};

#[derive(Parser, Debug)]
#[command(
    name = "examloops",
    about = "Verify and correct exam questions with a bounded judge/corrector loop",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to config file (default: ./examloops.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty", global = true)]
    log_format: LogFormatChoice,

    /// Tracing level when RUST_LOG is unset
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,

    /// Also append JSON log events to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Reasoning backend
    #[arg(short, long, value_enum, global = true)]
    binding: Option<BindingChoice>,

    /// Model name understood by the backend
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Timeout for each judge or corrector call, in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Output final result as JSON
    #[arg(long, global = true)]
    json_output: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Judge a question once
    Verify {
        /// JSON file with the question
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Correct a question against a given verdict
    Fix {
        /// JSON file with the question
        #[arg(short, long)]
        input: PathBuf,
        /// JSON file with the verdict
        #[arg(long)]
        verdict: PathBuf,
    },
    /// Judge and correct until compliant or out of attempts
    VerifyAndFix {
        /// JSON file with the question
        #[arg(short, long)]
        input: PathBuf,
        /// Maximum judge calls (1-5)
        #[arg(short = 'n', long, default_value_t = 3)]
        max_attempts: i64,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BindingChoice {
    Deepseek,
    Dashscope,
}

impl From<BindingChoice> for ModelBinding {
    fn from(choice: BindingChoice) -> Self {
        match choice {
            BindingChoice::Deepseek => ModelBinding::DeepSeek,
            BindingChoice::Dashscope => ModelBinding::DashScope,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

/// Exit code for a request rejected before the loop starts (EX_USAGE)
const EXIT_INVALID_REQUEST: i32 = 64;
/// Exit code for startup and configuration errors
const EXIT_ERROR: i32 = 2;

/// A CLI request, validated before any backend is built
enum Request {
    Serve,
    Verify(ExamQuestion),
    Fix(ExamQuestion, Verdict),
    VerifyAndFix(ExamQuestion, AttemptCeiling),
}

#[tokio::main]
async fn main() {
    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".bright_red().bold(), e);
            error_exit_code(&e)
        }
    };

    // Exit with appropriate code
    std::process::exit(exit_code);
}

/// Invalid requests get their own code so they never read as an outcome
fn error_exit_code(err: &anyhow::Error) -> i32 {
    if err.downcast_ref::<RequestValidationError>().is_some() {
        EXIT_INVALID_REQUEST
    } else {
        EXIT_ERROR
    }
}

fn prepare_request(command: &Command) -> Result<Request> {
    Ok(match command {
        Command::Serve { .. } => Request::Serve,
        Command::Verify { input } => Request::Verify(read_question(input)?),
        Command::Fix { input, verdict } => {
            Request::Fix(read_question(input)?, read_json(verdict)?)
        }
        Command::VerifyAndFix {
            input,
            max_attempts,
        } => {
            let ceiling = AttemptCeiling::new(*max_attempts)?;
            Request::VerifyAndFix(read_question(input)?, ceiling)
        }
    })
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();

    let log_format: LogFormat = cli.log_format.into();
    init_tracing(&cli.log_level, log_format);

    let request = prepare_request(&cli.command)?;

    let file_config = match &cli.config {
        Some(path) => Some(ProjectConfig::load_file(path)?),
        None => {
            let working_dir = std::env::current_dir().context("Failed to get current directory")?;
            ProjectConfig::load(&working_dir)?
        }
    };

    let (host, port) = match &cli.command {
        Command::Serve { host, port } => (host.clone(), *port),
        _ => (None, None),
    };
    let overrides = Overrides {
        binding: cli.binding.map(Into::into),
        model: cli.model.clone(),
        timeout_secs: cli.timeout_secs,
        host,
        port,
    };
    let settings = Settings::resolve(file_config.as_ref(), |key| std::env::var(key).ok(), &overrides)?;

    let logger = match &cli.log_file {
        Some(path) => Logger::with_file(log_format, path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?,
        None => Logger::new(log_format),
    };

    let model: Arc<dyn ChatModel> =
        Arc::from(create_model(settings.binding, settings.credentials.clone()));
    if !model.is_available() {
        anyhow::bail!(
            "Backend '{}' has no API key. Set API_KEY or [model].api_key in {}.",
            model.binding(),
            config::CONFIG_FILE_NAME
        );
    }
    info!(
        backend = model.name(),
        binding = %model.binding(),
        model = %settings.model.model,
        "Reasoning backend ready"
    );

    let verifier = ExamVerifier::new(
        Arc::new(ModelJudge::new(model.clone(), settings.model.clone())),
        Arc::new(ModelCorrector::new(model, settings.model.clone())),
        Arc::new(logger),
    )
    .with_invocation_timeout(settings.invocation_timeout);

    if let Request::Serve = request {
        server::handle_serve_command(verifier, &settings.host, settings.port).await?;
        return Ok(0);
    }

    // Handle Ctrl+C gracefully
    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupt_handle = interrupted.clone();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted. Stopping before the next call...");
        interrupt_handle.store(true, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;
    let verifier = verifier.with_interrupt(interrupted);

    let exit_code = match request {
        Request::Serve => 0,
        Request::Verify(question) => {
            let outcome = verifier.verify(question).await;
            report_outcome(&outcome, cli.json_output)?;
            outcome.exit_code()
        }
        Request::Fix(question, verdict) => match verifier.fix(question, &verdict).await {
            Ok(revised) => {
                print_question(&revised, cli.json_output)?;
                0
            }
            Err(e) => {
                eprintln!("{} {} ({})", "✗".bright_red(), e, e.cause());
                match e.failure_reason() {
                    FailureReason::Cancelled => 130,
                    _ => EXIT_ERROR,
                }
            }
        },
        Request::VerifyAndFix(question, ceiling) => {
            let outcome = verifier.verify_and_fix(question, ceiling).await;
            report_outcome(&outcome, cli.json_output)?;
            outcome.exit_code()
        }
    };

    Ok(exit_code)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn read_question(path: &Path) -> Result<ExamQuestion> {
    let input: ExamQuestionInput = read_json(path)?;
    let question = input.validate().map_err(RequestValidationError::from)?;
    Ok(question)
}

fn print_question(question: &ExamQuestion, json_output: bool) -> Result<()> {
    if json_output {
        println!("{}", serde_json::to_string_pretty(question)?);
    } else {
        eprintln!();
        eprintln!("{} [{}]", "Question:".bold(), question.question_type.label());
        println!("{}", question.question);
        eprintln!("{}", "Answer:".bold());
        println!("{}", question.answer);
    }
    Ok(())
}

fn report_outcome(outcome: &LoopOutcome, json_output: bool) -> Result<()> {
    if json_output {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }

    print_outcome(outcome);
    if let Some(verdict) = outcome.final_verdict() {
        if !verdict.is_compliant() {
            eprintln!("{}", verdict.feedback());
        }
    }
    print_question(outcome.question(), false)
}

fn print_outcome(outcome: &LoopOutcome) {
    match outcome {
        LoopOutcome::Accepted {
            attempts,
            total_duration_secs,
            ..
        } => {
            eprintln!();
            eprintln!("{}", "=== ACCEPTED ===".bright_green().bold());
            eprintln!("Attempts: {}", attempts);
            eprintln!("Duration: {:.1}s", total_duration_secs);
        }
        LoopOutcome::Exhausted {
            attempts,
            total_duration_secs,
            ..
        } => {
            eprintln!();
            eprintln!("{}", "=== NOT COMPLIANT ===".bright_yellow().bold());
            eprintln!("Still non-compliant after {} attempt(s)", attempts);
            eprintln!("Duration: {:.1}s", total_duration_secs);
        }
        LoopOutcome::Failed {
            attempts,
            reason,
            error,
            total_duration_secs,
            ..
        } => {
            eprintln!();
            eprintln!("{}", "=== FAILED ===".bright_red().bold());
            eprintln!("{} in attempt {}: {}", reason, attempts, error);
            eprintln!("Duration: {:.1}s", total_duration_secs);
        }
    }
}
