use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Post a comment, optionally as a reply to an existing one.
    Add {
        #[arg(required_unless_present = "json")]
        text: Option<String>,
        #[arg(long)]
        reply_to: Option<String>,
        /// Raw `{"text": ..., "parentId": ...}` input instead of arguments.
        #[arg(long, conflicts_with_all = ["text", "reply_to"])]
        json: Option<String>,
    },
    /// Print every comment, newest first.
    List {
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print comments nested under their parents.
    Tree {
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Delete a single comment. Its replies stay.
    Remove { id: String },
    /// Delete a comment and every reply beneath it.
    Delete {
        id: String,
        /// Remove one comment at a time instead of in a single transaction.
        #[arg(long, default_value_t = false)]
        sweep: bool,
    },
    /// Show where the database lives and its schema version.
    Info,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::{Cli, Command};

    #[test]
    fn parse_reply() {
        let cli = Cli::try_parse_from(["threadline", "add", "hi", "--reply-to", "abc"]).unwrap();
        match cli.command {
            Command::Add { text, reply_to, json } => {
                assert_eq!(text.as_deref(), Some("hi"));
                assert_eq!(reply_to.as_deref(), Some("abc"));
                assert!(json.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn add_requires_text_or_json() {
        assert!(Cli::try_parse_from(["threadline", "add"]).is_err());
        assert!(Cli::try_parse_from(["threadline", "add", "--json", "{}"]).is_ok());
        assert!(Cli::try_parse_from(["threadline", "add", "hi", "--json", "{}"]).is_err());
    }

    #[test]
    fn delete_defaults_to_atomic() {
        let cli = Cli::try_parse_from(["threadline", "delete", "abc"]).unwrap();
        assert!(matches!(cli.command, Command::Delete { sweep: false, .. }));
    }
}
