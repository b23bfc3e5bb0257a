//! Clap argument types and their translation into requests.

use clap::{Parser, ValueEnum};

use userdesk::models::{CreateUser, Role, Status, UpdateUser};
use userdesk::output::{OutputRenderer, json::JsonRenderer, terminal::TerminalRenderer};
use userdesk::search::SearchPatch;

/// Administration console for the users API.
#[derive(Parser, Debug)]
#[command(name = "userdesk", version = userdesk::constants::VERSION)]
pub struct Cli {
    /// Backend base URL (overrides config and USERDESK_API_URL).
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Answer requests from the built-in mock backend.
    #[arg(long, global = true, default_value_t = false)]
    pub mock: bool,

    /// Output format.
    #[arg(long, global = true, default_value = "terminal", env = userdesk::constants::ENV_FORMAT)]
    pub format: OutputFormat,

    /// Disable the request cache.
    #[arg(long, global = true, default_value_t = false)]
    pub no_cache: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// List, inspect, and edit users.
    Users {
        #[command(subcommand)]
        action: UsersAction,
    },

    /// Show backend health and user counts.
    Dashboard,

    /// Show the effective configuration (secrets redacted).
    Settings,

    /// Serve the mock backend over HTTP.
    ServeMock(ServeMockArgs),

    /// Print version information.
    Version,
}

/// User subcommands.
#[derive(clap::Subcommand, Debug)]
pub enum UsersAction {
    /// List users, one page at a time.
    List(ListArgs),
    /// Show a single user.
    Get {
        /// User id.
        id: String,
    },
    /// Create a user.
    Create(CreateArgs),
    /// Change fields of a user.
    Update(UpdateArgs),
    /// Delete a user.
    Delete {
        /// User id.
        id: String,
    },
}

/// Arguments for `users list`.
///
/// Filters are applied on top of `--location`, which resets the page to 1;
/// `--page` is applied last.
#[derive(Parser, Debug, Default)]
pub struct ListArgs {
    /// Starting location, e.g. `/users?role=admin&page=2`.
    #[arg(long, default_value = "/users")]
    pub location: String,

    /// Page number (1-based).
    #[arg(long)]
    pub page: Option<u32>,

    /// Users per page (1-100).
    #[arg(long)]
    pub limit: Option<u32>,

    /// Match name or email, case-insensitively. An empty value clears it.
    #[arg(long)]
    pub search: Option<String>,

    #[arg(long)]
    pub role: Option<Role>,

    #[arg(long)]
    pub status: Option<Status>,
}

impl ListArgs {
    /// The filter edit these flags describe, if any.
    pub fn patch(&self) -> Option<SearchPatch> {
        if self.limit.is_none()
            && self.search.is_none()
            && self.role.is_none()
            && self.status.is_none()
        {
            return None;
        }
        let mut patch = SearchPatch::default();
        if let Some(ref search) = self.search {
            patch = if search.is_empty() {
                patch.clear_search()
            } else {
                patch.search(search.clone())
            };
        }
        if let Some(role) = self.role {
            patch = patch.role(Some(role));
        }
        if let Some(status) = self.status {
            patch = patch.status(Some(status));
        }
        if let Some(limit) = self.limit {
            patch = patch.limit(limit);
        }
        Some(patch)
    }
}

/// Arguments for `users create`.
#[derive(Parser, Debug)]
pub struct CreateArgs {
    #[arg(long)]
    pub name: String,

    #[arg(long)]
    pub email: String,

    /// At least 8 characters. Never echoed back.
    #[arg(long)]
    pub password: String,

    #[arg(long, default_value = "user")]
    pub role: Role,

    #[arg(long, default_value = "active")]
    pub status: Status,

    /// Absolute http(s) URL of an avatar image.
    #[arg(long)]
    pub avatar: Option<String>,
}

impl From<CreateArgs> for CreateUser {
    fn from(args: CreateArgs) -> Self {
        CreateUser {
            name: args.name,
            email: args.email,
            role: args.role,
            status: args.status,
            avatar: args.avatar,
            password: args.password,
        }
    }
}

/// Arguments for `users update`.
#[derive(Parser, Debug)]
pub struct UpdateArgs {
    /// User id.
    pub id: String,

    #[arg(long)]
    pub name: Option<String>,

    #[arg(long)]
    pub email: Option<String>,

    #[arg(long)]
    pub role: Option<Role>,

    #[arg(long)]
    pub status: Option<Status>,

    #[arg(long)]
    pub avatar: Option<String>,
}

impl UpdateArgs {
    pub fn patch(&self) -> UpdateUser {
        UpdateUser {
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            status: self.status,
            avatar: self.avatar.clone(),
        }
    }
}

/// Arguments for `serve-mock`.
#[derive(Parser, Debug)]
pub struct ServeMockArgs {
    /// Interface to bind (default from config).
    #[arg(long)]
    pub host: Option<String>,

    /// Port to bind (default from config).
    #[arg(long)]
    pub port: Option<u16>,
}

/// Output format options.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Terminal,
    Json,
}

impl OutputFormat {
    /// The renderer for this format.
    pub fn renderer(&self) -> Box<dyn OutputRenderer> {
        match self {
            OutputFormat::Terminal => Box::new(TerminalRenderer),
            OutputFormat::Json => Box::new(JsonRenderer),
        }
    }
}
