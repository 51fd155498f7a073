//! REPL command parsing and dispatch to the controller.

use clap::{Parser, Subcommand};
use client_core::SessionController;
use shared::domain::{Credentials, PostId};

use crate::display::{render_post, render_view};

#[derive(Parser, Debug)]
#[command(no_binary_name = true, disable_help_flag = true, disable_help_subcommand = true)]
pub struct ReplLine {
    #[command(subcommand)]
    pub command: ReplCommand,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum ReplCommand {
    /// Re-check the session with the backend.
    Status,
    Login {
        username: String,
        #[arg(allow_hyphen_values = true)]
        password: String,
    },
    Register {
        username: String,
        #[arg(allow_hyphen_values = true)]
        password: String,
    },
    Logout,
    /// Reload the post list.
    Posts,
    Show {
        id: i64,
    },
    /// Replace the create-post input.
    Draft {
        #[arg(default_value = "", allow_hyphen_values = true)]
        text: String,
    },
    /// Publish the given text, or the draft when none is given.
    Post {
        #[arg(allow_hyphen_values = true)]
        text: Option<String>,
    },
    Edit {
        id: i64,
        #[arg(allow_hyphen_values = true)]
        text: String,
    },
    Delete {
        id: i64,
    },
    /// Print the current view.
    View,
    Help,
    #[command(alias = "exit")]
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub const HELP: &str = "\
commands:
  status                      re-check session
  login <user> <password>     sign in (quote a user name with spaces)
  register <user> <password>  create an account
  logout                      sign out
  posts                       reload posts
  show <id>                   show one post
  draft <text...>             set the new-post input
  post [text...]              publish text (or the draft)
  edit <id> <text...>         replace a post's content
  delete <id>                 delete a post
  view                        print the current view
  quit                        leave";

/// `Ok(None)` for a blank line.
pub fn parse_line(line: &str) -> Result<Option<ReplCommand>, clap::Error> {
    let tokens = tokenize(line);
    if tokens.is_empty() {
        return Ok(None);
    }
    ReplLine::try_parse_from(tokens).map(|parsed| Some(parsed.command))
}

/// Commands ending in free text: how many words precede it.
fn leading_words(command: &str) -> Option<usize> {
    match command {
        "login" | "register" | "edit" => Some(1),
        "draft" | "post" => Some(0),
        _ => None,
    }
}

/// Next word and the unread rest; a word may be wrapped in double quotes.
fn next_word(input: &str) -> Option<(String, &str)> {
    let input = input.trim_start();
    if input.is_empty() {
        return None;
    }
    if let Some(quoted) = input.strip_prefix('"') {
        if let Some(end) = quoted.find('"') {
            return Some((quoted[..end].to_string(), &quoted[end + 1..]));
        }
    }
    let end = input.find(char::is_whitespace).unwrap_or(input.len());
    Some((input[..end].to_string(), &input[end..]))
}

/// Splits a line into clap arguments. The trailing text of `login`,
/// `register`, `edit`, `draft` and `post` stays one argument, spacing intact.
fn tokenize(line: &str) -> Vec<String> {
    let Some((command, mut rest)) = next_word(line) else {
        return Vec::new();
    };
    let Some(leading) = leading_words(&command) else {
        return line.split_whitespace().map(str::to_string).collect();
    };

    // Everything after `--` is positional, so text may start with a dash.
    let mut tokens = vec![command, "--".to_string()];
    for _ in 0..leading {
        let Some((word, unread)) = next_word(rest) else {
            return tokens;
        };
        tokens.push(word);
        rest = unread;
    }
    let text = rest.trim_start();
    if !text.is_empty() {
        tokens.push(text.to_string());
    }
    tokens
}

pub async fn dispatch(controller: &SessionController, command: ReplCommand) -> Flow {
    let command_name = command_name(&command);
    tracing::debug!(command = command_name, "dispatching repl command");

    // Failures are already logged and turned into notices by the controller.
    match command {
        ReplCommand::Status => {
            let _ = controller.refresh_session().await;
        }
        ReplCommand::Login { username, password } => {
            let _ = controller
                .login(Credentials::new(username, password))
                .await;
        }
        ReplCommand::Register { username, password } => {
            let _ = controller
                .register(Credentials::new(username, password))
                .await;
        }
        ReplCommand::Logout => controller.logout().await,
        ReplCommand::Posts => {
            let _ = controller.refresh_posts().await;
        }
        ReplCommand::Show { id } => {
            if let Ok(post) = controller.show_post(PostId(id)).await {
                println!("{}", render_post(&post));
            }
        }
        ReplCommand::Draft { text } => {
            controller.set_draft(text).await;
        }
        ReplCommand::Post { text: None } => {
            let _ = controller.submit_draft().await;
        }
        ReplCommand::Post { text: Some(text) } => {
            let _ = controller.create_post(&text).await;
        }
        ReplCommand::Edit { id, text } => {
            let _ = controller.update_post(PostId(id), &text).await;
        }
        ReplCommand::Delete { id } => {
            let _ = controller.delete_post(PostId(id)).await;
        }
        ReplCommand::View => println!("{}", render_view(&controller.view().await)),
        ReplCommand::Help => println!("{HELP}"),
        ReplCommand::Quit => return Flow::Quit,
    }
    Flow::Continue
}

fn command_name(command: &ReplCommand) -> &'static str {
    match command {
        ReplCommand::Status => "status",
        ReplCommand::Login { .. } => "login",
        ReplCommand::Register { .. } => "register",
        ReplCommand::Logout => "logout",
        ReplCommand::Posts => "posts",
        ReplCommand::Show { .. } => "show",
        ReplCommand::Draft { .. } => "draft",
        ReplCommand::Post { .. } => "post",
        ReplCommand::Edit { .. } => "edit",
        ReplCommand::Delete { .. } => "delete",
        ReplCommand::View => "view",
        ReplCommand::Help => "help",
        ReplCommand::Quit => "quit",
    }
}
