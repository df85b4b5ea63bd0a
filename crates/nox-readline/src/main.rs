use std::borrow::Cow::{self, Borrowed, Owned};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result, bail};
use clap::Parser;
use colored::Colorize;
use rustyline::completion::{Completer, Pair};
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};

use nox_application::{
    ApplicationService, DecisionService, DeletionScheduler, ProvisionOutcome, sweeper,
};
use nox_core::config::AppConfig;
use nox_core::decision::DecisionInvocation;
use nox_core::{Applicant, MemberId, ServerId, SessionRegistry, SurfaceId};
use nox_infrastructure::{InMemoryPlatform, config_loader, logging};

mod commands;

use commands::{COMMANDS, CommandUsage, ConsoleCommand, StaffGrant};

/// How often the idle sweeper checks for abandoned applications.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(name = "nox")]
#[command(about = "NOX - guild application intake, driven from the console", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ~/.config/nox/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level, overriding LOG_LEVEL and the config file
    #[arg(long)]
    log_level: Option<String>,

    /// Server name used in messages to applicants
    #[arg(long, default_value = "Nox Guild")]
    server_name: String,

    /// Seed a member, an officer and an administrator
    #[arg(long)]
    demo: bool,
}

/// Line editor helper driven by the console's command table.
///
/// Completes command names, colors known commands cyan and unknown ones red,
/// and hints the argument usage of the command being typed.
#[derive(Clone)]
struct CliHelper {
    commands: &'static [CommandUsage],
}

impl CliHelper {
    fn new() -> Self {
        Self { commands: COMMANDS }
    }

    fn find(&self, name: &str) -> Option<&'static CommandUsage> {
        self.commands.iter().find(|c| c.name == name)
    }
}

impl Helper for CliHelper {}

impl Completer for CliHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let typed = &line[..pos];
        if !typed.starts_with('/') || typed.contains(' ') {
            return Ok((pos, vec![]));
        }

        let candidates = self
            .commands
            .iter()
            .filter(|c| c.name.starts_with(typed))
            .map(|c| Pair {
                display: format!("{} {}", c.name, c.args).trim_end().to_string(),
                replacement: if c.args.is_empty() {
                    c.name.to_string()
                } else {
                    format!("{} ", c.name)
                },
            })
            .collect();
        Ok((0, candidates))
    }
}

impl Highlighter for CliHelper {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if !line.starts_with('/') {
            return Borrowed(line);
        }
        let (name, rest) = line.split_at(line.find(' ').unwrap_or(line.len()));
        let name = if self.find(name).is_some() {
            name.bright_cyan()
        } else {
            name.red()
        };
        Owned(format!("{}{}", name, rest))
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Owned(hint.bright_black().to_string())
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

impl Hinter for CliHelper {
    type Hint = String;

    /// While the name is being typed, hints the rest of it plus its arguments.
    /// Right after a complete name and a space, hints just the arguments.
    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        if pos < line.len() || !line.starts_with('/') {
            return None;
        }

        match line.split_once(' ') {
            None => {
                let command = self
                    .commands
                    .iter()
                    .find(|c| c.name.starts_with(line) && c.name.len() > line.len())?;
                let rest = &command.name[line.len()..];
                Some(if command.args.is_empty() {
                    rest.to_string()
                } else {
                    format!("{} {}", rest, command.args)
                })
            }
            Some((name, "")) => self
                .find(name)
                .filter(|c| !c.args.is_empty())
                .map(|c| c.args.to_string()),
            Some(_) => None,
        }
    }
}

impl Validator for CliHelper {}

/// A simulated server: the in-memory platform plus the workflow services.
struct Console {
    platform: Arc<InMemoryPlatform>,
    intake: ApplicationService,
    decisions: DecisionService,
    scheduler: Arc<DeletionScheduler>,
    config: Arc<AppConfig>,
    server: ServerId,
}

impl Console {
    fn applicant(&self, id: &str) -> Result<Applicant> {
        let member = MemberId::new(id);
        match self.platform.member_handle(&member) {
            Some(handle) => Ok(Applicant::new(member, handle)),
            None => bail!("Unknown member '{}'. Add them with /member first.", id),
        }
    }

    /// Prints and clears the direct messages the bot sent to `member`.
    fn flush_inbox(&self, member: &MemberId) {
        let handle = self
            .platform
            .member_handle(member)
            .unwrap_or_else(|| member.to_string());
        for message in self.platform.drain_inbox(member) {
            println!("{}", format!("[DM → {}]", handle).bright_magenta());
            for line in message.lines() {
                println!("{}", line.bright_blue());
            }
            println!();
        }
    }

    async fn execute(&self, command: ConsoleCommand) -> Result<()> {
        match command {
            ConsoleCommand::Member { id, handle } => {
                self.platform.add_member(id.as_str(), handle.as_str());
                println!("{}", format!("Member {} ({}) joined.", handle, id).green());
            }
            ConsoleCommand::Grant { id, grant } => {
                let member = MemberId::new(id);
                let role = match grant {
                    StaffGrant::Officer => self.config.officer_role_id,
                    StaffGrant::Admin => self.config.admin_role_id,
                    StaffGrant::Owner => {
                        self.platform.set_administrator(&member, true);
                        println!("{}", format!("{} is now an administrator.", member).green());
                        return Ok(());
                    }
                };
                let Some(role) = role else {
                    bail!("No {:?} role is configured.", grant);
                };
                self.platform.grant_role(&member, role);
                println!("{}", format!("{} was granted role {}.", member, role).green());
            }
            ConsoleCommand::DirectMessages { id, open } => {
                self.platform.set_direct_messages(&MemberId::new(id), open);
            }
            ConsoleCommand::DenyCreate(deny) => {
                self.platform.deny_surface_creation(deny);
            }
            ConsoleCommand::Apply { id } => {
                let applicant = self.applicant(&id)?;
                let member = applicant.id.clone();
                self.intake.start(applicant, self.server.clone()).await?;
                self.flush_inbox(&member);
            }
            ConsoleCommand::Say { id, text } => {
                let member = MemberId::new(id);
                if !self.intake.handle_message(&member, &text).await {
                    println!("{}", "(no application in progress, message ignored)".bright_black());
                }
                self.flush_inbox(&member);
            }
            ConsoleCommand::Form { id, answers } => {
                let applicant = self.applicant(&id)?;
                let member = applicant.id.clone();
                let outcome = self
                    .intake
                    .submit_form(applicant, self.server.clone(), &answers)
                    .await?;
                if let ProvisionOutcome::Provisioned(surface) = outcome {
                    println!("{}", format!("Review channel {} created.", surface).green());
                }
                self.flush_inbox(&member);
            }
            ConsoleCommand::Decide {
                kind,
                actor,
                surface,
                delete_time,
                message,
            } => {
                let report = self
                    .decisions
                    .decide(DecisionInvocation {
                        actor: MemberId::new(actor),
                        surface: SurfaceId::new(surface),
                        kind,
                        message,
                        delete_time,
                    })
                    .await?;
                println!("{}", report.summary().green());
                if let Some(applicant) = &report.applicant {
                    self.flush_inbox(applicant);
                }
            }
            ConsoleCommand::Surfaces => {
                let surfaces = self.platform.surfaces();
                if surfaces.is_empty() {
                    println!("{}", "No channels.".bright_black());
                }
                for surface in surfaces {
                    println!(
                        "  {} {} ({} messages)",
                        surface.id.to_string().bright_cyan(),
                        surface.name,
                        surface.messages.len()
                    );
                }
            }
            ConsoleCommand::Show { surface } => {
                let Some(snapshot) = self.platform.surface(&SurfaceId::new(surface.as_str())) else {
                    bail!("No channel '{}'.", surface);
                };
                println!("{}", format!("#{}", snapshot.name).bright_magenta());
                for message in snapshot.messages {
                    for line in message.lines() {
                        println!("{}", line.bright_blue());
                    }
                    println!();
                }
            }
            ConsoleCommand::Inbox { id } => {
                for message in self.platform.inbox(&MemberId::new(id)) {
                    println!("{}", message.bright_blue());
                }
            }
            ConsoleCommand::Pending => {
                let pending = self.scheduler.pending().await;
                if pending.is_empty() {
                    println!("{}", "No deletions scheduled.".bright_black());
                }
                for deletion in pending {
                    println!(
                        "  {} at {}",
                        deletion.surface.to_string().bright_cyan(),
                        deletion.due_at.format("%Y-%m-%d %H:%M:%S UTC")
                    );
                }
            }
            ConsoleCommand::CancelDelete { surface } => {
                if self.scheduler.cancel(&SurfaceId::new(surface.as_str())).await {
                    println!("{}", format!("Deletion of {} cancelled.", surface).green());
                } else {
                    println!("{}", format!("No deletion pending for {}.", surface).yellow());
                }
            }
            ConsoleCommand::Help => println!("{}", commands::help_text().bright_black()),
        }
        Ok(())
    }
}

fn seed_demo(platform: &InMemoryPlatform, config: &AppConfig) {
    platform.add_member("1", "Alice");
    platform.add_member("2", "Officer Bob");
    platform.add_member("3", "Root Carol");
    if let Some(role) = config.officer_role_id {
        platform.grant_role(&MemberId::new("2"), role);
    }
    platform.set_administrator(&MemberId::new("3"), true);
}

/// Entry point for the NOX console.
///
/// Loads configuration, builds the workflow against an in-memory platform and
/// runs a rustyline REPL in which every line acts as a member or staff action.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => config_loader::load_from(path)?,
        None => config_loader::load()?,
    };
    let level = cli.log_level.clone().unwrap_or_else(|| config.log_level.clone());
    logging::init(&level);
    tracing::info!("[Main] Configuration loaded (category {})", config.category_id);

    // ===== Workflow Initialization =====
    let config = Arc::new(config);
    let platform = Arc::new(InMemoryPlatform::new(cli.server_name.as_str()));
    if cli.demo {
        seed_demo(&platform, &config);
    }

    let registry = Arc::new(SessionRegistry::default());
    let scheduler = Arc::new(DeletionScheduler::new(platform.clone()));
    let intake = ApplicationService::new(
        registry.clone(),
        platform.clone(),
        platform.clone(),
        config.clone(),
    );
    let decisions = DecisionService::new(
        platform.clone(),
        platform.clone(),
        scheduler.clone(),
        config.clone(),
        cli.server_name.as_str(),
    );

    let sweeper = config
        .idle_timeout()
        .context("Invalid session idle timeout")?
        .map(|timeout| sweeper::spawn(registry.clone(), platform.clone(), timeout, SWEEP_INTERVAL));

    let console = Console {
        platform,
        intake,
        decisions,
        scheduler: scheduler.clone(),
        config,
        server: ServerId::new("console"),
    };

    // ===== REPL Setup =====
    let mut rl = Editor::new()?;
    rl.set_helper(Some(CliHelper::new()));

    println!("{}", "=== NOX Console ===".bright_magenta().bold());
    println!("{}", "Type '/help' for commands, or 'quit' to exit.".bright_black());
    println!();

    // ===== Main REPL Loop =====
    loop {
        match rl.readline(">> ") {
            Ok(line) => {
                let trimmed = line.trim();

                if trimmed == "quit" || trimmed == "exit" {
                    println!("{}", "Goodbye!".bright_green());
                    break;
                }
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(&line);

                if !trimmed.starts_with('/') {
                    println!("{}", "Commands start with '/'. Type /help.".bright_black());
                    continue;
                }

                let result = match commands::parse(trimmed) {
                    Ok(command) => console.execute(command).await,
                    Err(e) => Err(e),
                };
                if let Err(e) = result {
                    eprintln!("{}", format!("Error: {}", e).red());
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("{}", "CTRL-C detected. Type 'quit' to exit.".yellow());
            }
            Err(rustyline::error::ReadlineError::Eof) => {
                println!("{}", "CTRL-D detected. Exiting...".bright_green());
                break;
            }
            Err(err) => {
                eprintln!("{}", format!("Error: {:?}", err).red());
                break;
            }
        }
    }

    if let Some(sweeper) = sweeper {
        sweeper.stop().await;
    }
    let pending = scheduler.pending().await.len();
    if pending > 0 {
        tracing::warn!("[Main] Dropping {} scheduled deletion(s) on shutdown", pending);
    }
    scheduler.cancel_all().await;

    Ok(())
}
