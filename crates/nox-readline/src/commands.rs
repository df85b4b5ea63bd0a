//! Console command parsing.

use anyhow::{Result, bail};
use nox_core::decision::DecisionKind;

/// A console command's name and argument usage, as shown in help and hints.
#[derive(Debug, Clone, Copy)]
pub struct CommandUsage {
    pub name: &'static str,
    pub args: &'static str,
    pub summary: &'static str,
}

pub const COMMANDS: &[CommandUsage] = &[
    CommandUsage { name: "/member", args: "<id> <handle>", summary: "add a server member" },
    CommandUsage { name: "/grant", args: "<id> officer|admin|owner", summary: "give a member a staff role or administrator" },
    CommandUsage { name: "/dms", args: "<id> on|off", summary: "open or close a member's direct messages" },
    CommandUsage { name: "/deny-create", args: "on|off", summary: "make review channel creation fail" },
    CommandUsage { name: "/apply", args: "<id>", summary: "start a DM application" },
    CommandUsage { name: "/say", args: "<id> <text>", summary: "send a DM from a member to the bot" },
    CommandUsage { name: "/form", args: "<id> <a1> | <a2> | ...", summary: "submit every answer at once" },
    CommandUsage { name: "/approve", args: "<actor> <surface> [--delete <t>] [message]", summary: "approve from a review channel" },
    CommandUsage { name: "/reject", args: "<actor> <surface> [--delete <t>] [reason]", summary: "reject from a review channel" },
    CommandUsage { name: "/surfaces", args: "", summary: "list review channels" },
    CommandUsage { name: "/show", args: "<surface>", summary: "print a channel's messages" },
    CommandUsage { name: "/inbox", args: "<id>", summary: "print a member's DMs" },
    CommandUsage { name: "/pending", args: "", summary: "list scheduled channel deletions" },
    CommandUsage { name: "/cancel-delete", args: "<surface>", summary: "cancel a scheduled deletion" },
    CommandUsage { name: "/help", args: "", summary: "show this list" },
];

/// Looks up a command by its exact name.
pub fn usage(name: &str) -> Option<&'static CommandUsage> {
    COMMANDS.iter().find(|c| c.name == name)
}

/// Help text listing every command with its arguments.
pub fn help_text() -> String {
    let width = COMMANDS
        .iter()
        .map(|c| c.name.len() + c.args.len() + 1)
        .max()
        .unwrap_or(0);
    let mut out = String::new();
    for command in COMMANDS {
        let synopsis = format!("{} {}", command.name, command.args);
        out.push_str(&format!("{:width$}  {}\n", synopsis.trim_end(), command.summary));
    }
    out.push_str(&format!("{:width$}  exit", "quit"));
    out
}

fn usage_line(name: &str) -> String {
    match usage(name) {
        Some(c) => format!("{} {}", c.name, c.args).trim_end().to_string(),
        None => name.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaffGrant {
    Officer,
    Admin,
    Owner,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Member { id: String, handle: String },
    Grant { id: String, grant: StaffGrant },
    DirectMessages { id: String, open: bool },
    DenyCreate(bool),
    Apply { id: String },
    Say { id: String, text: String },
    Form { id: String, answers: Vec<String> },
    Decide {
        kind: DecisionKind,
        actor: String,
        surface: String,
        delete_time: Option<String>,
        message: Option<String>,
    },
    Surfaces,
    Show { surface: String },
    Inbox { id: String },
    Pending,
    CancelDelete { surface: String },
    Help,
}

fn on_off(value: Option<&str>) -> Result<bool> {
    match value {
        Some("on") => Ok(true),
        Some("off") => Ok(false),
        _ => bail!("expected 'on' or 'off'"),
    }
}

/// Splits off the first whitespace-delimited word.
fn word(input: &str) -> Option<(&str, &str)> {
    let input = input.trim_start();
    if input.is_empty() {
        return None;
    }
    match input.split_once(char::is_whitespace) {
        Some((head, rest)) => Some((head, rest.trim_start())),
        None => Some((input, "")),
    }
}

fn required<'a>(input: &'a str, what: &str, usage: &str) -> Result<(&'a str, &'a str)> {
    match word(input) {
        Some(split) => Ok(split),
        None => bail!("missing {}. Usage: {}", what, usage),
    }
}

fn parse_decision(kind: DecisionKind, rest: &str) -> Result<ConsoleCommand> {
    let usage = match kind {
        DecisionKind::Approve => usage_line("/approve"),
        DecisionKind::Reject => usage_line("/reject"),
    };
    let (actor, rest) = required(rest, "actor", &usage)?;
    let (surface, mut rest) = required(rest, "surface", &usage)?;

    let mut delete_time = None;
    if let Some(("--delete", after)) = word(rest) {
        let (spec, after) = required(after, "deletion time", &usage)?;
        delete_time = Some(spec.to_string());
        rest = after;
    }

    let message = Some(rest.trim())
        .filter(|m| !m.is_empty())
        .map(str::to_string);

    Ok(ConsoleCommand::Decide {
        kind,
        actor: actor.to_string(),
        surface: surface.to_string(),
        delete_time,
        message,
    })
}

/// Parses one console line starting with `/`.
pub fn parse(line: &str) -> Result<ConsoleCommand> {
    let (name, rest) = word(line).unwrap_or(("", ""));
    let command = match name {
        "/member" => {
            let (id, handle) = required(rest, "member id", &usage_line("/member"))?;
            if handle.trim().is_empty() {
                bail!("missing handle. Usage: {}", usage_line("/member"));
            }
            ConsoleCommand::Member {
                id: id.to_string(),
                handle: handle.trim().to_string(),
            }
        }
        "/grant" => {
            let usage = usage_line("/grant");
            let (id, rest) = required(rest, "member id", &usage)?;
            let grant = match rest.trim() {
                "officer" => StaffGrant::Officer,
                "admin" => StaffGrant::Admin,
                "owner" => StaffGrant::Owner,
                other => bail!("unknown grant '{}'. Usage: {}", other, usage),
            };
            ConsoleCommand::Grant {
                id: id.to_string(),
                grant,
            }
        }
        "/dms" => {
            let (id, rest) = required(rest, "member id", &usage_line("/dms"))?;
            ConsoleCommand::DirectMessages {
                id: id.to_string(),
                open: on_off(word(rest).map(|(w, _)| w))?,
            }
        }
        "/deny-create" => ConsoleCommand::DenyCreate(on_off(word(rest).map(|(w, _)| w))?),
        "/apply" => {
            let (id, _) = required(rest, "member id", &usage_line("/apply"))?;
            ConsoleCommand::Apply { id: id.to_string() }
        }
        "/say" => {
            let (id, text) = required(rest, "member id", &usage_line("/say"))?;
            ConsoleCommand::Say {
                id: id.to_string(),
                text: text.to_string(),
            }
        }
        "/form" => {
            let (id, rest) = required(rest, "member id", &usage_line("/form"))?;
            ConsoleCommand::Form {
                id: id.to_string(),
                answers: rest.split('|').map(|a| a.trim().to_string()).collect(),
            }
        }
        "/approve" => parse_decision(DecisionKind::Approve, rest)?,
        "/reject" => parse_decision(DecisionKind::Reject, rest)?,
        "/surfaces" => ConsoleCommand::Surfaces,
        "/show" => {
            let (surface, _) = required(rest, "surface id", &usage_line("/show"))?;
            ConsoleCommand::Show {
                surface: surface.to_string(),
            }
        }
        "/inbox" => {
            let (id, _) = required(rest, "member id", &usage_line("/inbox"))?;
            ConsoleCommand::Inbox { id: id.to_string() }
        }
        "/pending" => ConsoleCommand::Pending,
        "/cancel-delete" => {
            let (surface, _) = required(rest, "surface id", &usage_line("/cancel-delete"))?;
            ConsoleCommand::CancelDelete {
                surface: surface.to_string(),
            }
        }
        "/help" => ConsoleCommand::Help,
        other => bail!("Unknown command '{}'. Type /help for a list.", other),
    };
    Ok(command)
}
