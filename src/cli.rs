//! CLI argument parsing for the prompt workflow.
//!
//! Each workflow step is its own subcommand operating on a named session that
//! is loaded from and saved back to the settings store, so a run can be
//! resumed at any point.
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Session used when `--session` is not given.
pub const DEFAULT_SESSION: &str = "default";

/// Base URL suggested for the `local` provider when none is given.
pub const DEFAULT_LOCAL_BASE_URL: &str = "http://localhost:8000";

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "pbust",
    version,
    about = "Craft and refine LLM prompts through a seven-step workflow",
    after_help = "Workflow:\n  1. guide --role <role>                     Prompt engineering guide for the audience\n  2. example add --input <text> --output <text>  Collect at least 3 examples\n  3. generate                                Infer a prompt from the examples\n  4. eval-guide                              Prompt evaluation guide\n  5. evaluate                                Evaluate the generated prompt\n  6. improve                                 Three improved alternatives\n  7. finalize [--choice N | --prompt <text>] Save the final prompt\n\nExamples:\n  pbust config set --provider openai --model gpt-4\n  pbust guide --role \"software developers\"\n  pbust --session review status --json",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Config directory (defaults to $PROMPTBUSTER_HOME or ~/.promptbuster)
    #[arg(long, value_name = "DIR", global = true)]
    pub config_dir: Option<PathBuf>,

    /// Session to operate on
    #[arg(long, value_name = "NAME", default_value = DEFAULT_SESSION, global = true)]
    pub session: String,

    /// Emit debug logging on stderr
    #[arg(long, global = true)]
    pub verbose: bool,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show or change the LM gateway configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Step 1: set the role and generate a prompt engineering guide
    Guide(GuideArgs),
    /// Step 2: manage the session's examples
    #[command(subcommand)]
    Example(ExampleCommand),
    /// Step 3: generate a prompt from the examples
    Generate,
    /// Step 4: generate a prompt evaluation guide
    EvalGuide,
    /// Step 5: evaluate the generated prompt against the guide
    Evaluate,
    /// Step 6: generate three improved alternatives
    Improve,
    /// Step 7: choose or write the final prompt
    Finalize(FinalizeArgs),
    /// Summarize the session and its current step
    Status(OutputArgs),
    /// Manage saved sessions
    #[command(subcommand)]
    Session(SessionCommand),
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Validate and save the gateway configuration (never the API key)
    Set(ConfigSetArgs),
    /// Print the saved configuration
    Show(OutputArgs),
}

/// Inputs for `config set`.
#[derive(Args, Debug)]
pub struct ConfigSetArgs {
    /// Provider tag: openai, anthropic or local
    #[arg(long, value_name = "TAG")]
    pub provider: String,

    /// Model name (defaults per provider)
    #[arg(long, value_name = "NAME")]
    pub model: Option<String>,

    /// Base URL of the endpoint (required for local)
    #[arg(long, value_name = "URL")]
    pub base_url: Option<String>,

    /// Sampling temperature between 0 and 2
    #[arg(long, value_name = "FLOAT")]
    pub temperature: Option<f64>,

    /// Completion token limit
    #[arg(long, value_name = "N")]
    pub max_tokens: Option<u32>,
}

/// Inputs for step 1.
#[derive(Args, Debug)]
pub struct GuideArgs {
    /// Audience or use case the prompt is for
    #[arg(long)]
    pub role: String,
}

#[derive(Subcommand, Debug)]
pub enum ExampleCommand {
    /// Append an input/expected-output pair
    Add(ExampleAddArgs),
    /// List the session's examples
    List(OutputArgs),
    /// Remove every example from the session
    Clear,
}

#[derive(Args, Debug)]
pub struct ExampleAddArgs {
    /// Example input text
    #[arg(long)]
    pub input: String,

    /// Expected output for the input
    #[arg(long)]
    pub output: String,
}

/// Inputs for step 7.
#[derive(Args, Debug)]
pub struct FinalizeArgs {
    /// Pick alternative N (1-based) as the final prompt
    #[arg(long, value_name = "N", conflicts_with = "prompt")]
    pub choice: Option<usize>,

    /// Use this text as the final prompt
    #[arg(long, value_name = "TEXT", conflicts_with = "choice")]
    pub prompt: Option<String>,

    /// Command receiving the final prompt on stdin (e.g. a clipboard tool)
    #[arg(long, value_name = "CMD", env = crate::notify::NOTIFY_ENV)]
    pub notify_command: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// List saved sessions
    List,
    /// Print the full session snapshot
    Show(OutputArgs),
    /// Start the session over from step 1
    Reset,
    /// Delete the saved session
    Delete,
}

#[derive(Args, Debug, Clone, Copy)]
pub struct OutputArgs {
    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}
