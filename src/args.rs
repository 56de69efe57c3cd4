use std::path::PathBuf;

pub use clap::{Parser, Subcommand};

#[derive(Parser)]
#[clap(version, about)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Commands,

    /// Don't print the final error message
    #[clap(long, short, global = true)]
    pub quiet: bool,
}

impl Args {
    #[must_use]
    pub fn no_errors(&self) -> bool {
        self.quiet
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new project from a template
    New {
        /// Name of the project [default: prompt]
        project_name: Option<String>,

        /// Name of the template [default: prompt]
        #[clap(long, short)]
        template: Option<String>,

        /// Branch, tag or commit to download instead of the template's branch
        #[clap(long, short)]
        branch: Option<String>,

        /// Where to create the project folder
        #[clap(long, short, default_value = ".")]
        path: PathBuf,

        /// Archive host, e.g. a GitHub Enterprise API URL
        #[clap(long)]
        host: Option<String>,

        /// Write into an already existing, non empty project folder
        #[clap(long, short)]
        overwrite: bool,
    },
    /// List available templates
    List {
        /// Only print template names
        #[clap(long, short)]
        short: bool,
    },
    /// Write the default configuration file
    Init,
    /// Remove the configuration directory
    Deinit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_new_with_flags() {
        let args = Args::parse_from([
            "scaffold", "new", "cool-app", "-t", "web", "-b", "v2", "-p", "/tmp", "-o",
        ]);

        match args.command {
            Commands::New {
                project_name,
                template,
                branch,
                path,
                host,
                overwrite,
            } => {
                assert_eq!(project_name.as_deref(), Some("cool-app"));
                assert_eq!(template.as_deref(), Some("web"));
                assert_eq!(branch.as_deref(), Some("v2"));
                assert_eq!(path, PathBuf::from("/tmp"));
                assert!(host.is_none());
                assert!(overwrite);
            }
            _ => panic!("expected new"),
        }
    }

    #[test]
    fn new_defaults_to_prompting() {
        let args = Args::parse_from(["scaffold", "-q", "new"]);

        assert!(args.no_errors());
        assert!(matches!(
            args.command,
            Commands::New {
                project_name: None,
                template: None,
                ..
            }
        ));
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
