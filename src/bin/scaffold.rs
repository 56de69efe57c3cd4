use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::process::ExitCode;
use scaffold::{
    args::{Args, Commands},
    config::{Config, ScaffoldDirs},
    error, info, prompt,
    scaffold::create_project_dir,
    trace, warn, ArchiveRequest, Outcome, RewriteSpec,
};

fn list(dirs: &ScaffoldDirs, config: &Config, short: bool) {
    if short {
        let names: Vec<&str> = config.templates.iter().map(|t| t.name.as_str()).collect();
        println!("{}", names.join(" "));
        return;
    }

    let origin = dirs.config_file();
    println!(
        "Available templates (def at '{}'):",
        if origin.exists() {
            dirs.display_path(&origin)
        } else {
            "built-in".to_string()
        }
    );

    for t in &config.templates {
        println!(
            "    {name}\t{owner}/{repo}@{branch}{description}",
            name = t.name,
            owner = t.owner,
            repo = t.repo,
            branch = t.branch,
            description = t
                .description
                .as_ref()
                .map(|d| format!("\t{d}"))
                .unwrap_or_default()
        );
    }
}

fn app(args: &Args) -> Result<()> {
    let dirs = ScaffoldDirs::default_paths()?;

    trace!("Config dir: {}", dirs.config_dir().display());

    match args.command {
        Commands::List { short } => {
            let config = dirs.load_config()?;
            list(&dirs, &config, short);
            Ok(())
        }
        Commands::Init => {
            if dirs.init()? {
                info!(
                    "Wrote default configuration to {}",
                    dirs.display_path(&dirs.config_file())
                );
            } else {
                println!(
                    "The config file at path {} already exists. Skipping creation.",
                    dirs.display_path(&dirs.config_file())
                );
            }
            Ok(())
        }
        Commands::Deinit => dirs.deinit(),
        Commands::New {
            ref project_name,
            ref template,
            ref branch,
            ref path,
            ref host,
            overwrite,
        } => {
            let config = dirs.load_config()?;
            let templates = config.templates();

            let template = match template {
                Some(name) => templates.get_named(name).ok_or_else(|| {
                    anyhow!("No template named '{name}'. Run `scaffold list` to see them")
                })?,
                None => prompt::template(templates.as_slice())?,
            };

            let name = match project_name {
                Some(name) => name.clone(),
                None => prompt::project_name()?,
            };

            let root = create_project_dir(path, &name, overwrite)?;
            println!("Your new project shall be named {name}");

            let request = ArchiveRequest::new(
                &template.owner,
                &template.repo,
                branch.as_deref().unwrap_or(&template.branch),
            );
            let rewrite = RewriteSpec::new(template.identifier(), &name);
            let fetcher = config.fetcher(host.as_deref())?;

            info!("Downloading {request}");

            let result = scaffold::scaffold(&fetcher, &request, &root, &rewrite)
                .with_context(|| format!("Failed to create project from {request}"))?;

            for failure in result.failures() {
                match failure.error {
                    Some(ref e) => warn!("{}: {e}", failure.path),
                    None => warn!("{}: failed", failure.path),
                }
            }

            info!(
                "{} created, {} skipped, {} failed, {} rewritten",
                result.count(Outcome::Created),
                result.count(Outcome::Skipped),
                result.count(Outcome::Failed),
                result.rewritten()
            );
            info!("Project created successfully at {}", root.display());

            Ok(())
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    match app(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if !args.no_errors() {
                error!("{:#}", e);
            }
            ExitCode::FAILURE
        }
    }
}
