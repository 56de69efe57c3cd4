use anyhow::{anyhow, Context};
use inquire::{validator::Validation, Select, Text};

use crate::{config::Template, scaffold::validate_project_name};

/// Asks for the project name until a valid one is entered.
///
/// # Errors
///
/// Returns an [`Err`] if the prompt is cancelled or the terminal is not interactive.
pub fn project_name() -> anyhow::Result<String> {
    Text::new("What would you like to call your project?")
        .with_validator(|input: &str| {
            Ok(match validate_project_name(input) {
                Ok(()) => Validation::Valid,
                Err(e) => Validation::Invalid(e.to_string().into()),
            })
        })
        .prompt()
        .context("Failed to read project name")
}

/// Lets the user pick one of `templates`. A single template is returned
/// without asking.
///
/// # Errors
///
/// Returns an [`Err`] if there are no templates or the prompt is cancelled.
pub fn template(templates: &[Template]) -> anyhow::Result<&Template> {
    match templates {
        [] => Err(anyhow!(
            "No templates configured. Run `scaffold init` and add one"
        )),
        [only] => Ok(only),
        _ => {
            let index = Select::new("Which template should be used?", templates.to_vec())
                .raw_prompt()
                .context("Failed to read template choice")?
                .index;

            Ok(&templates[index])
        }
    }
}
