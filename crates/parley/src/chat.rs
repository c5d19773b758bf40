// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `parley chat` command implementation.
//!
//! A readline client for a running server. Plain text goes to the open
//! chatroom and the reply is polled for; slash commands manage the session.

use std::time::Duration;

use colored::Colorize;
use parley_client::{ApiClient, ChatroomDetail, ClientError, PollConfig, PollOutcome, Poller};
use parley_config::ParleyConfig;
use parley_core::ParleyError;
use parley_core::types::Role;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

/// Per-request HTTP timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Help,
    Signup(String),
    Token(String),
    Me,
    Upgrade,
    New(String),
    List,
    Open(i64),
    Refresh,
    Quit,
    Send(String),
    Invalid(String),
    Empty,
}

fn parse_command(line: &str) -> Command {
    let line = line.trim();
    if line.is_empty() {
        return Command::Empty;
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Send(line.to_string());
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    let needs_arg = |usage: &str, build: fn(String) -> Command| {
        if arg.is_empty() {
            Command::Invalid(format!("usage: {usage}"))
        } else {
            build(arg.to_string())
        }
    };
    match name {
        "help" => Command::Help,
        "signup" => needs_arg("/signup <mobile>", Command::Signup),
        "token" => needs_arg("/token <token>", Command::Token),
        "me" => Command::Me,
        "upgrade" => Command::Upgrade,
        "new" => needs_arg("/new <title>", Command::New),
        "list" => Command::List,
        "open" => match arg.parse() {
            Ok(id) => Command::Open(id),
            Err(_) => Command::Invalid("usage: /open <chatroom id>".to_string()),
        },
        "refresh" => Command::Refresh,
        "quit" | "exit" => Command::Quit,
        other => Command::Invalid(format!("unknown command /{other}; try /help")),
    }
}

fn print_help() {
    println!("  {}     register and sign in", "/signup <mobile>".yellow());
    println!("  {}         use an existing token", "/token <token>".yellow());
    println!("  {}                     show your account and quota", "/me".yellow());
    println!("  {}                upgrade to pro", "/upgrade".yellow());
    println!("  {}           create and open a chatroom", "/new <title>".yellow());
    println!("  {}                   list your chatrooms", "/list".yellow());
    println!("  {}              open a chatroom", "/open <id>".yellow());
    println!("  {}                keep waiting for a pending reply", "/refresh".yellow());
    println!("  {}                   exit", "/quit".yellow());
    println!("  anything else is sent to the open chatroom");
}

fn print_message(role: Role, content: &str) {
    match role {
        Role::User => println!("{} {content}", "you:".cyan().bold()),
        Role::Assistant => println!("{} {content}", "assistant:".green().bold()),
    }
}

fn print_chatroom(detail: &ChatroomDetail) {
    println!("{}", format!("# {} ({})", detail.title, detail.id).bold());
    for msg in &detail.messages {
        print_message(msg.role, &msg.content);
    }
}

fn print_error(e: &ClientError) {
    eprintln!("{}: {e}", "error".red());
}

struct Session {
    poller: Poller<ApiClient>,
    current: Option<i64>,
}

impl Session {
    fn api(&self) -> &ApiClient {
        self.poller.source()
    }

    async fn handle(&mut self, command: Command) -> Result<(), ClientError> {
        match command {
            Command::Help => print_help(),
            Command::Signup(mobile) => {
                let signup = self.poller.source_mut().signup(&mobile).await?;
                println!("signed up as user {}", signup.user_id);
                println!("token: {}", signup.token.dimmed());
            }
            Command::Token(token) => {
                self.poller.source_mut().set_token(token);
                let me = self.api().me().await?;
                println!("signed in as {} ({})", me.mobile, me.tier);
            }
            Command::Me => {
                let me = self.api().me().await?;
                let sub = self.api().subscription().await?;
                println!("{} ({}, {})", me.mobile, sub.tier, sub.status);
                match (sub.daily_limit, sub.used_today) {
                    (Some(limit), Some(used)) => println!("prompts today: {used}/{limit}"),
                    (Some(limit), None) => println!("daily limit: {limit}"),
                    (None, _) => println!("prompts today: unlimited"),
                }
            }
            Command::Upgrade => {
                let url = self.api().subscribe_pro().await?;
                println!("complete checkout at {}", url.cyan());
            }
            Command::New(title) => {
                let room = self.api().create_chatroom(&title).await?;
                self.current = Some(room.id);
                println!("opened chatroom {} \"{}\"", room.id, room.title);
            }
            Command::List => {
                let listing = self.api().list_chatrooms().await?;
                if listing.chatrooms.is_empty() {
                    println!("no chatrooms yet; create one with /new <title>");
                }
                for room in &listing.chatrooms {
                    let marker = if Some(room.id) == self.current { "*" } else { " " };
                    println!("{marker} {:>4}  {}  {}", room.id, room.title, room.created_at.dimmed());
                }
                if listing.cached {
                    println!("{}", "(cached)".dimmed());
                }
            }
            Command::Open(id) => {
                let detail = self.api().chatroom(id).await?;
                self.current = Some(detail.id);
                print_chatroom(&detail);
            }
            Command::Refresh => match self.poller.refresh().await {
                Some(outcome) => report(outcome),
                None => {
                    if let Some(id) = self.current {
                        print_chatroom(&self.api().chatroom(id).await?);
                    }
                }
            },
            Command::Send(text) => {
                let Some(room) = self.current else {
                    println!("open a chatroom first with /new or /open");
                    return Ok(());
                };
                let queued = self.api().send_message(room, &text).await?;
                println!("{}", "waiting for reply...".dimmed());
                report(self.poller.wait_for_reply(room, queued.message_id).await);
            }
            Command::Invalid(message) => println!("{}", message.yellow()),
            Command::Quit | Command::Empty => {}
        }
        Ok(())
    }
}

fn report(outcome: PollOutcome) {
    match outcome {
        PollOutcome::Replied(reply) => print_message(reply.role, &reply.content),
        PollOutcome::StillProcessing => {
            println!("{}", "still processing; use /refresh to keep waiting".yellow())
        }
    }
}

/// Runs the `parley chat` REPL.
pub async fn run_chat(config: ParleyConfig, url: Option<String>) -> Result<(), ParleyError> {
    let base_url = url.unwrap_or_else(|| config.client.base_url.clone());
    let mut api = ApiClient::new(&base_url, REQUEST_TIMEOUT)
        .map_err(|e| ParleyError::Internal(format!("failed to build HTTP client: {e}")))?;
    if let Some(token) = &config.client.token {
        api.set_token(token.clone());
    }

    let mut session = Session {
        poller: Poller::new(api, PollConfig::from(&config.client)),
        current: None,
    };

    let mut rl = DefaultEditor::new()
        .map_err(|e| ParleyError::Internal(format!("failed to initialize readline: {e}")))?;

    println!("{}", "parley chat".bold().green());
    match session.api().ping().await {
        Ok(banner) => println!("connected to {} ({banner})", base_url),
        Err(e) => eprintln!("{}: {base_url} unreachable: {e}", "warning".yellow()),
    }
    println!("Type {} for commands, {} to exit.\n", "/help".yellow(), "/quit".yellow());

    loop {
        let prompt = match session.current {
            Some(id) => format!("{}> ", format!("parley:{id}").green()),
            None => format!("{}> ", "parley".green()),
        };
        match rl.readline(&prompt) {
            Ok(line) => {
                let command = parse_command(&line);
                if command == Command::Quit {
                    break;
                }
                if command != Command::Empty {
                    let _ = rl.add_history_entry(line.as_str());
                }
                if let Err(e) = session.handle(command).await {
                    print_error(&e);
                }
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("{}: {e}", "error".red());
                break;
            }
        }
    }

    println!("{}", "goodbye".dimmed());
    Ok(())
}
