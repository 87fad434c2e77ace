//! Commands typed at the `bookdesk>` prompt, parsed with clap in multicall
//! mode so the first word names the subcommand.

use bookdesk_core::CatalogQuery;
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(multicall = true)]
struct Line {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Change the service base URLs and save them.
    Config {
        #[arg(long)]
        auth: Option<String>,
        #[arg(long)]
        books: Option<String>,
    },
    /// Probe both services.
    Health,
    /// Create an account; the server logs it in right away.
    Register {
        email: String,
        username: String,
        password: String,
    },
    /// Log in with an email or a username.
    Login { identifier: String, password: String },
    /// Trade the refresh token for a new access token.
    Refresh,
    /// Call the protected profile endpoint.
    Profile,
    /// List the books catalog.
    Books {
        #[command(flatten)]
        filter: CatalogFilter,
    },
    /// Show the session and the last health of each service.
    Status,
    #[command(alias = "exit")]
    Quit,
}

#[derive(Debug, Default, PartialEq, Eq, Args)]
#[group(multiple = false)]
pub struct CatalogFilter {
    #[arg(long)]
    pub isbn: Option<String>,
    #[arg(long)]
    pub author: Option<String>,
    #[arg(long)]
    pub format: Option<String>,
}

impl From<CatalogFilter> for CatalogQuery {
    fn from(filter: CatalogFilter) -> Self {
        match filter {
            CatalogFilter { isbn: Some(isbn), .. } => CatalogQuery::Isbn(isbn),
            CatalogFilter { author: Some(author), .. } => CatalogQuery::Author(author),
            CatalogFilter { format: Some(format), .. } => CatalogQuery::Format(format),
            _ => CatalogQuery::All,
        }
    }
}

/// `Ok(None)` for a blank line. Help requests and usage mistakes come back
/// as clap errors for the caller to print.
pub fn parse_line(line: &str) -> Result<Option<Command>, clap::Error> {
    let words: Vec<&str> = line.split_whitespace().collect();
    if words.is_empty() {
        return Ok(None);
    }
    Line::try_parse_from(words).map(|line| Some(line.command))
}
