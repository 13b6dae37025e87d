//! # cgmdse CLI
//!
//! Runs the glucose-monitor design exploration once and prints the report.
//!
//! Usage:
//!   cgmdse
//!   cgmdse --brief brief.json --provider openai
//!   cgmdse prompt
//!
//! Examples:
//!   GROQ_API_KEY=... cgmdse
//!   cgmdse --max-iterations 1 --json > run.json
//!   RUST_LOG=cgmdse_agent=debug cgmdse -v

use cgmdse_agent::{prompt, report, AgentConfig, DesignAgent, DesignBrief};
use cgmdse_error::{Error, ErrorKind, Result};
use cgmdse_llm::{AnthropicProvider, LlmProvider, OpenAIProvider, ProviderConfig, ProviderType};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cgmdse")]
#[command(author, version, about = "Glucose monitor design-space exploration with an LLM")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// JSON file with `requirements` and `constraints` (built-in CGM brief when omitted)
    #[arg(short, long, global = true)]
    brief: Option<PathBuf>,

    /// Chat-completion backend
    #[arg(short, long, value_enum, default_value_t = Backend::Groq)]
    provider: Backend,

    /// Model name (provider default when omitted)
    #[arg(short, long)]
    model: Option<String>,

    /// Override the provider's API base URL
    #[arg(long)]
    base_url: Option<String>,

    /// Refinement rounds
    #[arg(long, default_value_t = 2)]
    max_iterations: usize,

    /// Seed candidates to generate
    #[arg(long, default_value_t = 5, global = true)]
    seed_count: usize,

    /// Candidates carried into each refinement round
    #[arg(long, default_value_t = 3)]
    top_k: usize,

    /// Sampling temperature (0.0 - 2.0)
    #[arg(long)]
    temperature: Option<f32>,

    /// Print the final run state as JSON instead of the text report
    #[arg(long)]
    json: bool,

    /// Log stage progress
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the seed prompt for the brief without calling the LLM
    Prompt,
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    Groq,
    Openai,
    Anthropic,
}

impl From<Backend> for ProviderType {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Groq => ProviderType::Groq,
            Backend::Openai => ProviderType::OpenAI,
            Backend::Anthropic => ProviderType::Anthropic,
        }
    }
}

/// Logs go to stderr so the report (or JSON) on stdout stays clean.
/// `RUST_LOG` wins over the verbosity flags.
fn init_tracing(verbose: bool, quiet: bool) {
    let default = if quiet {
        "error"
    } else if verbose {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load_brief(path: Option<&PathBuf>) -> Result<DesignBrief> {
    match path {
        Some(path) => DesignBrief::from_json_file(path),
        None => Ok(DesignBrief::glucose_monitor()),
    }
}

fn agent_config(cli: &Cli) -> AgentConfig {
    AgentConfig {
        seed_count: cli.seed_count,
        top_k: cli.top_k,
        max_iterations: cli.max_iterations,
        model: cli.model.clone(),
        temperature: cli.temperature,
        ..Default::default()
    }
}

fn provider_config(cli: &Cli) -> Result<ProviderConfig> {
    let mut config = ProviderConfig::from_env(cli.provider.into())?;
    if let Some(model) = &cli.model {
        config = config.with_model(model.clone());
    }
    if let Some(url) = &cli.base_url {
        config = config.with_base_url(url.clone());
    }
    Ok(config)
}

async fn explore<P: LlmProvider>(provider: P, config: AgentConfig, brief: DesignBrief, json: bool) -> Result<()> {
    let agent = DesignAgent::new(provider, config)?;
    info!(provider = agent.provider().name(), "provider ready");

    let state = agent.run(brief).await?;

    if json {
        let text = serde_json::to_string_pretty(&state)
            .map_err(|e| Error::unexpected("failed to serialize run state").set_source(e))?;
        println!("{}", text);
    } else {
        println!("{}", report::render(&state));
    }
    Ok(())
}

/// The seed prompt a run with these flags would send first.
fn seed_prompt(cli: &Cli, brief: &DesignBrief) -> Result<String> {
    agent_config(cli).validate()?;
    brief.validate()?;
    Ok(prompt::seed_prompt(brief, cli.seed_count))
}

async fn run(cli: Cli) -> Result<()> {
    let brief = load_brief(cli.brief.as_ref())?;

    if matches!(cli.command, Some(Commands::Prompt)) {
        println!("{}", seed_prompt(&cli, &brief)?);
        return Ok(());
    }

    let config = agent_config(&cli);
    config.validate()?;
    brief.validate()?;

    let provider_config = provider_config(&cli)?;
    match provider_config.provider_type {
        ProviderType::OpenAI | ProviderType::Groq => {
            explore(OpenAIProvider::new(provider_config)?, config, brief, cli.json).await
        }
        ProviderType::Anthropic => {
            explore(AnthropicProvider::new(provider_config)?, config, brief, cli.json).await
        }
    }
}

fn report_error(e: &Error) {
    eprintln!("Error: {}", e);
    match e.kind() {
        ErrorKind::AuthenticationFailed => {
            eprintln!("hint: the provider rejected the API key; check its value");
        }
        ErrorKind::ConfigInvalid => {
            if let Some((_, var)) = e.context().iter().find(|(k, _)| *k == "env") {
                eprintln!("hint: export {}=<your key> and run again", var);
            }
        }
        ErrorKind::RateLimited => {
            eprintln!("hint: the provider is rate limiting requests; wait and retry");
        }
        _ => {}
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    if let Err(e) = run(cli).await {
        report_error(&e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["cgmdse"]);
        assert!(cli.command.is_none());
        assert!(matches!(cli.provider, Backend::Groq));

        let config = agent_config(&cli);
        assert_eq!(config.seed_count, 5);
        assert_eq!(config.top_k, 3);
        assert_eq!(config.max_iterations, 2);
        assert!(config.model.is_none());
    }

    #[test]
    fn test_flags() {
        let cli = Cli::parse_from([
            "cgmdse",
            "--provider",
            "anthropic",
            "--model",
            "claude-3-5-haiku-latest",
            "--max-iterations",
            "0",
            "--temperature",
            "0.3",
            "--json",
        ]);
        assert_eq!(ProviderType::from(cli.provider), ProviderType::Anthropic);
        assert!(cli.json);

        let config = agent_config(&cli);
        assert_eq!(config.max_iterations, 0);
        assert_eq!(config.temperature, Some(0.3));
        assert_eq!(config.model.as_deref(), Some("claude-3-5-haiku-latest"));
    }

    #[test]
    fn test_prompt_subcommand() {
        let cli = Cli::parse_from(["cgmdse", "prompt", "--seed-count", "3"]);
        assert!(matches!(cli.command, Some(Commands::Prompt)));
        assert_eq!(cli.seed_count, 3);
    }

    #[test]
    fn test_prompt_rejects_invalid_config() {
        let brief = DesignBrief::glucose_monitor();

        let cli = Cli::parse_from(["cgmdse", "prompt", "--seed-count", "0"]);
        let err = seed_prompt(&cli, &brief).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);

        let cli = Cli::parse_from(["cgmdse", "prompt", "--seed-count", "2"]);
        assert_eq!(seed_prompt(&cli, &brief).unwrap_err().kind(), ErrorKind::ConfigInvalid);

        let cli = Cli::parse_from(["cgmdse", "--top-k", "2", "prompt", "--seed-count", "4"]);
        assert!(seed_prompt(&cli, &brief).unwrap().contains("Generate 4 complete"));
    }

    #[test]
    fn test_verbose_and_quiet_conflict() {
        assert!(Cli::try_parse_from(["cgmdse", "-v", "-q"]).is_err());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        assert!(Cli::try_parse_from(["cgmdse", "--provider", "bard"]).is_err());
    }
}
