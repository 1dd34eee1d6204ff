//! Subcommand handlers.
//!
//! Each workflow step loads the named session, checks the preconditions the
//! step needs, drives the engine, advances the advisory `current_step`, and
//! saves the session back. The engine itself never gates; that is done here.
//! Example edits never touch the LM, so they work without a saved config.
use crate::cli::{
    Command, ConfigCommand, ConfigSetArgs, ExampleAddArgs, ExampleCommand, FinalizeArgs,
    GlobalArgs, GuideArgs, OutputArgs, RootArgs, SessionCommand, DEFAULT_LOCAL_BASE_URL,
};
use crate::gateway::{create_gateway, Gateway};
use crate::model::{Example, LlmConfig, PromptSession, Provider, WorkflowStep};
use crate::notify::{notify_final_prompt, CommandNotifier, FinalPromptNotifier, NotifyOutcome};
use crate::settings::{api_key_from_env, SettingsStore};
use crate::workflow::{PromptWorkflow, MAX_ALTERNATIVES};
use anyhow::{anyhow, Context, Result};
use serde::Serialize;

/// Examples with both sides filled in required before step 3.
pub const MIN_EXAMPLES: usize = 3;

/// Store plus the session a command operates on.
pub(crate) struct CommandContext {
    store: SettingsStore,
    session_name: String,
}

impl CommandContext {
    pub(crate) fn from_args(global: &GlobalArgs) -> Result<Self> {
        let store = SettingsStore::resolve(global.config_dir.as_deref())?;
        Ok(Self {
            store,
            session_name: global.session.clone(),
        })
    }

    fn load_session(&self) -> Result<PromptSession> {
        Ok(self
            .store
            .load_session(&self.session_name)?
            .unwrap_or_default())
    }

    /// Open the engine over the saved session with the configured gateway.
    fn open_workflow(&self) -> Result<PromptWorkflow> {
        let gateway = load_gateway(&self.store)?;
        let workflow = match self.store.load_session(&self.session_name)? {
            Some(session) => PromptWorkflow::with_session(gateway, session),
            None => PromptWorkflow::new(gateway),
        };
        Ok(workflow)
    }

    fn save_workflow(&self, workflow: PromptWorkflow) -> Result<()> {
        self.store
            .save_session(&self.session_name, &workflow.into_session())
    }
}

pub fn run(args: RootArgs) -> Result<()> {
    let ctx = CommandContext::from_args(&args.global)?;
    match args.command {
        Command::Config(ConfigCommand::Set(set)) => run_config_set(&ctx, set),
        Command::Config(ConfigCommand::Show(output)) => run_config_show(&ctx, output),
        Command::Guide(guide) => run_guide(&ctx, guide),
        Command::Example(ExampleCommand::Add(add)) => run_example_add(&ctx, add),
        Command::Example(ExampleCommand::List(output)) => run_example_list(&ctx, output),
        Command::Example(ExampleCommand::Clear) => run_example_clear(&ctx),
        Command::Generate => run_generate(&ctx),
        Command::EvalGuide => run_eval_guide(&ctx),
        Command::Evaluate => run_evaluate(&ctx),
        Command::Improve => run_improve(&ctx),
        Command::Finalize(finalize) => run_finalize(&ctx, finalize),
        Command::Status(output) => run_status(&ctx, output),
        Command::Session(SessionCommand::List) => run_session_list(&ctx),
        Command::Session(SessionCommand::Show(output)) => run_session_show(&ctx, output),
        Command::Session(SessionCommand::Reset) => run_session_reset(&ctx),
        Command::Session(SessionCommand::Delete) => run_session_delete(&ctx),
    }
}

/// Build the gateway from the stored config plus the API key from the env.
fn load_gateway(store: &SettingsStore) -> Result<Box<dyn Gateway>> {
    let config = store.load_config()?.ok_or_else(|| {
        anyhow!(
            "no LM configuration at {} (run `pbust config set --provider <tag>` first)",
            store.config_path().display()
        )
    })?;
    let provider = config.provider()?;
    let config = config.with_api_key(api_key_from_env(provider));
    let gateway = create_gateway(&config).context("configure LM gateway")?;
    Ok(gateway)
}

fn run_config_set(ctx: &CommandContext, args: ConfigSetArgs) -> Result<()> {
    let provider = Provider::from_tag(args.provider.trim()).with_context(|| {
        let tags: Vec<&str> = Provider::ALL.iter().map(|provider| provider.tag()).collect();
        format!("choose a provider from: {}", tags.join(", "))
    })?;
    let model = args
        .model
        .filter(|model| !model.trim().is_empty())
        .unwrap_or_else(|| provider.default_model().to_string());
    let base_url = match (provider, args.base_url) {
        (Provider::Local, None) => Some(DEFAULT_LOCAL_BASE_URL.to_string()),
        (_, base_url) => base_url,
    };
    let mut config = LlmConfig::new(provider.tag(), model).with_base_url(base_url);
    if let Some(temperature) = args.temperature {
        config = config.with_temperature(temperature);
    }
    if let Some(max_tokens) = args.max_tokens {
        config = config.with_max_tokens(max_tokens);
    }
    ctx.store.save_config(&config)?;
    println!("wrote {}", ctx.store.config_path().display());
    if let Some(env_var) = provider.api_key_env() {
        if api_key_from_env(provider).is_none() {
            eprintln!("note: set {env_var} before running workflow steps");
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct ConfigView<'a> {
    provider: &'a str,
    model: &'a str,
    base_url: Option<&'a str>,
    temperature: f64,
    max_tokens: u32,
    api_key_env: Option<&'static str>,
    api_key_present: bool,
}

fn run_config_show(ctx: &CommandContext, output: OutputArgs) -> Result<()> {
    let Some(config) = ctx.store.load_config()? else {
        return Err(anyhow!(
            "no LM configuration at {} (run `pbust config set --provider <tag>` first)",
            ctx.store.config_path().display()
        ));
    };
    let provider = config.provider()?;
    let view = ConfigView {
        provider: config.provider_tag(),
        model: config.model(),
        base_url: config.base_url(),
        temperature: config.temperature(),
        max_tokens: config.max_tokens(),
        api_key_env: provider.api_key_env(),
        api_key_present: api_key_from_env(provider).is_some(),
    };
    if output.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }
    println!("config_dir: {}", ctx.store.root().display());
    println!("provider: {}", view.provider);
    println!("model: {}", view.model);
    println!("base_url: {}", view.base_url.unwrap_or("(default)"));
    println!("temperature: {}", view.temperature);
    println!("max_tokens: {}", view.max_tokens);
    match view.api_key_env {
        Some(env_var) if view.api_key_present => println!("api_key: set ({env_var})"),
        Some(env_var) => println!("api_key: missing (set {env_var})"),
        None => println!("api_key: not required"),
    }
    Ok(())
}

fn run_guide(ctx: &CommandContext, args: GuideArgs) -> Result<()> {
    let role = args.role.trim();
    if role.is_empty() {
        return Err(anyhow!("role must be non-empty"));
    }
    let mut workflow = ctx.open_workflow()?;
    workflow.set_role(role);
    let guide = workflow.generate_initial_prompt_guide(role)?;
    advance_past(&mut workflow, WorkflowStep::InitialPrompt);
    ctx.save_workflow(workflow)?;
    println!("{guide}");
    Ok(())
}

fn run_example_add(ctx: &CommandContext, args: ExampleAddArgs) -> Result<()> {
    let mut session = ctx.load_session()?;
    session.examples.push(Example::new(args.input, args.output));
    let complete = session.complete_examples().len();
    session.current_step = if complete >= MIN_EXAMPLES {
        WorkflowStep::PromptGeneration
    } else {
        WorkflowStep::ExamplesInput
    };
    ctx.store.save_session(&ctx.session_name, &session)?;
    eprintln!(
        "examples: {} ({complete} complete, {MIN_EXAMPLES} needed)",
        session.examples.len()
    );
    Ok(())
}

fn run_example_list(ctx: &CommandContext, output: OutputArgs) -> Result<()> {
    let session = ctx.load_session()?;
    if output.json {
        println!("{}", serde_json::to_string_pretty(&session.examples)?);
        return Ok(());
    }
    if session.examples.is_empty() {
        println!("no examples");
    }
    for (idx, example) in session.examples.iter().enumerate() {
        println!(
            "{}. Input: {}\n   Output: {}",
            idx + 1,
            example.input_text,
            example.expected_output
        );
    }
    Ok(())
}

fn run_example_clear(ctx: &CommandContext) -> Result<()> {
    let mut session = ctx.load_session()?;
    session.examples.clear();
    session.current_step = WorkflowStep::ExamplesInput;
    ctx.store.save_session(&ctx.session_name, &session)
}

fn run_generate(ctx: &CommandContext) -> Result<()> {
    let mut workflow = ctx.open_workflow()?;
    let session = workflow.session();
    let examples = session.complete_examples();
    if examples.len() < MIN_EXAMPLES {
        return Err(anyhow!(
            "provide at least {MIN_EXAMPLES} complete examples (have {}; use `pbust example add`)",
            examples.len()
        ));
    }
    let role = require_role(session)?;
    let prompt = workflow.generate_prompt_from_examples(&role, &examples)?;
    workflow.set_generated_prompt(prompt.clone());
    advance_past(&mut workflow, WorkflowStep::PromptGeneration);
    ctx.save_workflow(workflow)?;
    println!("{prompt}");
    Ok(())
}

fn run_eval_guide(ctx: &CommandContext) -> Result<()> {
    let mut workflow = ctx.open_workflow()?;
    let role = require_role(workflow.session())?;
    let guide = workflow.generate_evaluation_guide(&role)?;
    workflow.set_evaluation_guide(guide.clone());
    advance_past(&mut workflow, WorkflowStep::EvaluationGuide);
    ctx.save_workflow(workflow)?;
    println!("{guide}");
    Ok(())
}

fn run_evaluate(ctx: &CommandContext) -> Result<()> {
    let mut workflow = ctx.open_workflow()?;
    let session = workflow.session();
    let prompt = require_text(&session.generated_prompt, "generate", 3)?;
    let guide = require_text(&session.evaluation_guide, "eval-guide", 4)?;
    let result = workflow.evaluate_prompt(&prompt, &guide)?;
    workflow.set_evaluation_result(result.clone());
    advance_past(&mut workflow, WorkflowStep::PromptEvaluation);
    ctx.save_workflow(workflow)?;
    println!("{result}");
    Ok(())
}

fn run_improve(ctx: &CommandContext) -> Result<()> {
    let mut workflow = ctx.open_workflow()?;
    let session = workflow.session();
    let evaluation = require_text(&session.evaluation_result, "evaluate", 5)?;
    let original = session.generated_prompt.clone();
    let alternatives = workflow.generate_improved_alternatives(&original, &evaluation)?;
    // A rerun without a numbered list must not leave the old pick behind.
    workflow.set_final_prompt(alternatives.first().cloned().unwrap_or_default());
    workflow.set_alternative_prompts(alternatives.clone());
    advance_past(&mut workflow, WorkflowStep::ImprovedAlternatives);
    ctx.save_workflow(workflow)?;

    if alternatives.is_empty() {
        eprintln!("the model did not return a numbered list; rerun `pbust improve` or use `pbust finalize --prompt`");
    } else if alternatives.len() < MAX_ALTERNATIVES {
        eprintln!(
            "the model returned {} of {MAX_ALTERNATIVES} alternatives",
            alternatives.len()
        );
    }
    let blocks: Vec<String> = alternatives
        .iter()
        .enumerate()
        .map(|(idx, alternative)| format!("Alternative {}:\n{alternative}", idx + 1))
        .collect();
    println!("{}", blocks.join("\n\n"));
    Ok(())
}

fn run_finalize(ctx: &CommandContext, args: FinalizeArgs) -> Result<()> {
    let mut workflow = ctx.open_workflow()?;
    let session = workflow.session();
    let chosen = match (args.choice, args.prompt) {
        (Some(choice), _) => session
            .alternative_prompts
            .get(choice.wrapping_sub(1))
            .cloned()
            .ok_or_else(|| {
                anyhow!(
                    "no alternative {choice} (session has {})",
                    session.alternative_prompts.len()
                )
            })?,
        (None, Some(prompt)) => prompt,
        (None, None) => session.final_prompt.clone(),
    };
    let final_prompt = chosen.trim().to_string();
    if final_prompt.is_empty() {
        return Err(anyhow!(
            "no final prompt to save (pass --prompt <text> or --choice <n>)"
        ));
    }
    workflow.set_final_prompt(final_prompt.clone());
    workflow.set_current_step(WorkflowStep::FinalSelection);
    ctx.save_workflow(workflow)?;
    println!("{final_prompt}");

    let notifier = args
        .notify_command
        .as_deref()
        .filter(|command| !command.trim().is_empty())
        .map(CommandNotifier::parse)
        .transpose();
    let notifier = match notifier {
        Ok(notifier) => notifier,
        Err(err) => {
            eprintln!("final prompt saved; notify command ignored: {err:#}");
            return Ok(());
        }
    };
    match notify_final_prompt(
        notifier.as_ref().map(|n| n as &dyn FinalPromptNotifier),
        &final_prompt,
    ) {
        NotifyOutcome::Skipped => {}
        NotifyOutcome::Delivered => eprintln!("final prompt sent to notify command"),
        NotifyOutcome::Failed(err) => eprintln!("final prompt saved; notify failed: {err}"),
    }
    Ok(())
}

#[derive(Serialize)]
struct StepStatus {
    number: usize,
    step: WorkflowStep,
    title: &'static str,
    done: bool,
}

#[derive(Serialize)]
struct StatusReport<'a> {
    session: &'a str,
    current_step: WorkflowStep,
    role: &'a str,
    examples: usize,
    complete_examples: usize,
    alternatives: usize,
    steps: Vec<StepStatus>,
}

fn step_done(session: &PromptSession, step: WorkflowStep) -> bool {
    match step {
        WorkflowStep::InitialPrompt => !session.role.is_empty(),
        WorkflowStep::ExamplesInput => session.complete_examples().len() >= MIN_EXAMPLES,
        WorkflowStep::PromptGeneration => !session.generated_prompt.is_empty(),
        WorkflowStep::EvaluationGuide => !session.evaluation_guide.is_empty(),
        WorkflowStep::PromptEvaluation => !session.evaluation_result.is_empty(),
        WorkflowStep::ImprovedAlternatives => !session.alternative_prompts.is_empty(),
        WorkflowStep::FinalSelection => !session.final_prompt.is_empty(),
    }
}

fn status_report<'a>(name: &'a str, session: &'a PromptSession) -> StatusReport<'a> {
    StatusReport {
        session: name,
        current_step: session.current_step,
        role: &session.role,
        examples: session.examples.len(),
        complete_examples: session.complete_examples().len(),
        alternatives: session.alternative_prompts.len(),
        steps: WorkflowStep::ALL
            .iter()
            .map(|step| StepStatus {
                number: step.number(),
                step: *step,
                title: step.title(),
                done: step_done(session, *step),
            })
            .collect(),
    }
}

fn run_status(ctx: &CommandContext, output: OutputArgs) -> Result<()> {
    let session = ctx.load_session()?;
    let report = status_report(&ctx.session_name, &session);
    if output.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    println!("session: {}", report.session);
    if !report.role.is_empty() {
        println!("role: {}", report.role);
    }
    for step in &report.steps {
        let marker = if step.step == report.current_step {
            ">"
        } else {
            " "
        };
        let done = if step.done { "x" } else { " " };
        println!("{marker} [{done}] {}. {}", step.number, step.title);
    }
    Ok(())
}

fn run_session_list(ctx: &CommandContext) -> Result<()> {
    for name in ctx.store.list_sessions()? {
        let marker = if name == ctx.session_name { "*" } else { " " };
        println!("{marker} {name}");
    }
    Ok(())
}

fn run_session_show(ctx: &CommandContext, output: OutputArgs) -> Result<()> {
    let session = ctx.load_session()?;
    if output.json {
        println!("{}", serde_json::to_string_pretty(&session)?);
        return Ok(());
    }
    let sections = [
        ("Role", session.role.as_str()),
        ("Generated prompt", session.generated_prompt.as_str()),
        ("Evaluation guide", session.evaluation_guide.as_str()),
        ("Evaluation result", session.evaluation_result.as_str()),
        ("Final prompt", session.final_prompt.as_str()),
    ];
    println!("## Current step\n{}\n", session.current_step.title());
    for (title, text) in sections {
        if !text.is_empty() {
            println!("## {title}\n{text}\n");
        }
    }
    for (idx, alternative) in session.alternative_prompts.iter().enumerate() {
        println!("## Alternative {}\n{alternative}\n", idx + 1);
    }
    Ok(())
}

fn run_session_reset(ctx: &CommandContext) -> Result<()> {
    ctx.store
        .save_session(&ctx.session_name, &PromptSession::default())?;
    eprintln!("reset session {}", ctx.session_name);
    Ok(())
}

fn run_session_delete(ctx: &CommandContext) -> Result<()> {
    if ctx.store.delete_session(&ctx.session_name)? {
        eprintln!("deleted session {}", ctx.session_name);
        Ok(())
    } else {
        Err(anyhow!("no saved session named {}", ctx.session_name))
    }
}

/// Mark `completed` as done by moving the progress marker to the next step.
fn advance_past(workflow: &mut PromptWorkflow, completed: WorkflowStep) {
    workflow.set_current_step(completed.next().unwrap_or(completed));
}

fn require_role(session: &PromptSession) -> Result<String> {
    require_text(&session.role, "guide --role <role>", 1)
}

fn require_text(value: &str, command: &str, step: usize) -> Result<String> {
    if value.trim().is_empty() {
        return Err(anyhow!(
            "complete step {step} first (run `pbust {command}`)"
        ));
    }
    Ok(value.to_string())
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
