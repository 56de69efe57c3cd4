use anyhow::{anyhow, ensure, Context};
use derive_builder::Builder;
use directories::UserDirs;
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::fetch::{Fetcher, DEFAULT_ATTEMPTS, DEFAULT_HOST, DEFAULT_TIMEOUT};

pub const CONFIG_FILE: &str = "scaffold.toml";

#[derive(Builder)]
pub struct ScaffoldDirs {
    user_home: PathBuf,
    config_dir: PathBuf,
}

/// A hosted repository that can be used as a project template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Template {
    pub name: String,
    pub owner: String,
    pub repo: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Text replaced with the project name. Defaults to `repo`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
}

fn default_branch() -> String {
    "main".to_string()
}

impl Template {
    #[must_use]
    pub fn identifier(&self) -> &str {
        self.identifier.as_deref().unwrap_or(&self.repo)
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(ref description) = self.description {
            write!(f, " - {description}")?;
        }
        Ok(())
    }
}

pub struct Templates(Vec<Template>);

impl Templates {
    #[must_use]
    pub fn get_named(&self, name: &str) -> Option<&Template> {
        self.0.iter().find(|t| t.name == name)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[Template] {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    #[serde(default, rename = "template")]
    pub templates: Vec<Template>,
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_attempts() -> u32 {
    DEFAULT_ATTEMPTS
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            attempts: default_attempts(),
            timeout_secs: default_timeout(),
            templates: vec![Template {
                name: "sst-notes".to_string(),
                owner: "smokeyblues".to_string(),
                repo: "aws-sstv4-notes".to_string(),
                branch: default_branch(),
                description: Some("Serverless notes app on SST v4".to_string()),
                identifier: None,
            }],
        }
    }
}

impl Config {
    /// Parse a configuration file's contents.
    ///
    /// # Errors
    ///
    /// Returns an [`Err`] on invalid TOML, unknown keys, `attempts = 0`, or
    /// templates sharing a name.
    pub fn from_toml(contents: &str, origin: &Path) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(contents)
            .with_context(|| format!("Failed to parse {}", origin.display()))?;

        ensure!(
            config.attempts >= 1,
            anyhow!("'attempts' in {} must be at least 1", origin.display())
        );

        for (i, template) in config.templates.iter().enumerate() {
            ensure!(
                !config.templates[..i].iter().any(|t| t.name == template.name),
                anyhow!(
                    "Template '{}' is defined more than once in {}",
                    template.name,
                    origin.display()
                )
            );
        }

        Ok(config)
    }

    /// # Errors
    ///
    /// Returns an [`Err`] if the configuration can not be serialized.
    pub fn to_toml(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }

    #[must_use]
    pub fn templates(&self) -> Templates {
        Templates(self.templates.clone())
    }

    /// A [`Fetcher`] using this configuration's host, timeout and attempts.
    ///
    /// # Errors
    ///
    /// Returns an [`Err`] if the fetcher can not be built.
    pub fn fetcher(&self, host_override: Option<&str>) -> anyhow::Result<Fetcher> {
        Fetcher::builder()
            .host(host_override.unwrap_or(&self.host))
            .timeout(Duration::from_secs(self.timeout_secs))
            .attempts(self.attempts)
            .build()
            .map_err(|e| anyhow!("Failed to configure downloads: {e}"))
    }
}

impl ScaffoldDirs {
    /// Create a new [`ScaffoldDirs`] builder
    #[must_use]
    pub fn builder() -> ScaffoldDirsBuilder {
        ScaffoldDirsBuilder::default()
    }

    /// Attempt to create a new [`ScaffoldDirs`] instance with sane defaults for
    /// path locations
    ///
    /// # Errors
    ///
    /// Returns an [`Err`] if the user's home directory can't be found.
    pub fn default_paths() -> anyhow::Result<Self> {
        let home = Self::get_user_home()?;
        Ok(Self {
            config_dir: Self::get_config_dir(&home),
            user_home: home,
        })
    }

    /// Returns the path for the user home `~/`
    ///
    /// # Errors
    ///
    /// Returns an [`Err`] if a path for the users home can not
    /// be found
    pub fn get_user_home() -> anyhow::Result<PathBuf> {
        Ok(UserDirs::new()
            .context("Failed to get user's home directory")?
            .home_dir()
            .to_owned())
    }

    /// Returns the path where the configuration lives
    ///
    /// Looks for the configuration dir, in order:
    /// - `$XDG_CONFIG_HOME/scaffold`
    /// - `~/.config/scaffold`
    /// - `~/.scaffold`
    #[must_use]
    pub fn get_config_dir(home: &Path) -> PathBuf {
        Self::config_dir_in(std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from), home)
    }

    fn config_dir_in(xdg_config_home: Option<PathBuf>, home: &Path) -> PathBuf {
        let candidates = xdg_config_home.into_iter().chain([home.join(".config")]);

        for config_home in candidates {
            if config_home.is_dir() {
                return config_home.join("scaffold");
            }
        }

        home.join(".scaffold")
    }

    #[must_use]
    pub fn user_home(&self) -> &Path {
        self.user_home.as_path()
    }

    #[must_use]
    pub fn config_dir(&self) -> &Path {
        self.config_dir.as_path()
    }

    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    /// Shortens `path` by replacing the user home with `~`.
    #[must_use]
    pub fn display_path(&self, path: &Path) -> String {
        match path.strip_prefix(self.user_home()) {
            Ok(rest) => Path::new("~").join(rest).display().to_string(),
            Err(_) => path.display().to_string(),
        }
    }

    /// Reads the configuration file, falling back to [`Config::default`] when
    /// there is none.
    ///
    /// # Errors
    ///
    /// Returns an [`Err`] if the file exists but can't be read or parsed.
    pub fn load_config(&self) -> anyhow::Result<Config> {
        let path = self.config_file();

        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        Config::from_toml(&contents, &path)
    }

    /// Creates the configuration directory and writes the default configuration.
    /// Returns `false` if a configuration file was already present.
    ///
    /// # Errors
    ///
    /// Returns an [`Err`] if a non-directory is in the way or any IO error occurs.
    pub fn init(&self) -> anyhow::Result<bool> {
        let dir = self.config_dir();

        ensure!(
            !dir.exists() || dir.is_dir(),
            anyhow!("Path {} exists but is not a directory", dir.display())
        );

        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;

        let file = self.config_file();
        if file.exists() {
            return Ok(false);
        }

        std::fs::write(&file, Config::default().to_toml()?)
            .with_context(|| format!("Failed to write {}", file.display()))?;

        Ok(true)
    }

    /// Removes the configuration directory.
    ///
    /// # Errors
    ///
    /// Returns an [`Err`] if there is nothing to remove or removal fails.
    pub fn deinit(&self) -> anyhow::Result<()> {
        let dir = self.config_dir();

        ensure!(
            dir.is_dir(),
            anyhow!("No configuration at {}", dir.display())
        );

        std::fs::remove_dir_all(dir).with_context(|| format!("Failed to remove {}", dir.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dirs(home: &Path) -> ScaffoldDirs {
        ScaffoldDirs::builder()
            .user_home(home.to_path_buf())
            .config_dir(home.join(".scaffold"))
            .build()
            .unwrap()
    }

    #[test]
    fn missing_file_uses_defaults() {
        let home = tempfile::tempdir().unwrap();

        let config = dirs(home.path()).load_config().unwrap();

        assert_eq!(config, Config::default());
        let templates = config.templates();
        let template = templates.get_named("sst-notes").unwrap();
        assert_eq!(template.identifier(), "aws-sstv4-notes");
    }

    #[test]
    fn init_writes_loadable_config_once() {
        let home = tempfile::tempdir().unwrap();
        let dirs = dirs(home.path());

        assert!(dirs.init().unwrap());
        assert!(!dirs.init().unwrap());
        assert_eq!(dirs.load_config().unwrap(), Config::default());

        dirs.deinit().unwrap();
        assert!(!dirs.config_dir().exists());
        assert!(dirs.deinit().is_err());
    }

    #[test]
    fn parses_templates() {
        let config = Config::from_toml(
            r#"
            host = "https://git.example.com/api/v3"

            [[template]]
            name = "web"
            owner = "acme"
            repo = "web-template"

            [[template]]
            name = "cli"
            owner = "acme"
            repo = "cli-template"
            branch = "v2"
            identifier = "cli_template"
            "#,
            Path::new("scaffold.toml"),
        )
        .unwrap();

        assert_eq!(config.host, "https://git.example.com/api/v3");
        assert_eq!(config.attempts, 1);

        let templates = config.templates();
        let web = templates.get_named("web").unwrap();
        assert_eq!(web.branch, "main");
        assert_eq!(web.identifier(), "web-template");

        let cli = templates.get_named("cli").unwrap();
        assert_eq!(cli.branch, "v2");
        assert_eq!(cli.identifier(), "cli_template");
        assert!(templates.get_named("missing").is_none());
    }

    #[test]
    fn rejects_invalid_config() {
        let origin = Path::new("scaffold.toml");

        assert!(Config::from_toml("attempts = 0", origin).is_err());
        assert!(Config::from_toml("colour = true", origin).is_err());
        assert!(Config::from_toml(
            "[[template]]\nname = \"a\"\nowner = \"o\"\nrepo = \"r\"\n\
             [[template]]\nname = \"a\"\nowner = \"o\"\nrepo = \"s\"\n",
            origin
        )
        .is_err());
    }

    #[test]
    fn config_dir_lookup_order() {
        let home = tempfile::tempdir().unwrap();
        let home = home.path();
        let xdg = home.join("xdg");

        assert_eq!(
            ScaffoldDirs::config_dir_in(Some(xdg.clone()), home),
            home.join(".scaffold")
        );

        std::fs::create_dir(home.join(".config")).unwrap();
        assert_eq!(
            ScaffoldDirs::config_dir_in(Some(xdg.clone()), home),
            home.join(".config/scaffold")
        );
        assert_eq!(
            ScaffoldDirs::config_dir_in(None, home),
            home.join(".config/scaffold")
        );

        std::fs::create_dir(&xdg).unwrap();
        assert_eq!(
            ScaffoldDirs::config_dir_in(Some(xdg.clone()), home),
            xdg.join("scaffold")
        );
    }

    #[test]
    fn shortens_home_paths() {
        let dirs = ScaffoldDirs::builder()
            .user_home(PathBuf::from("/home/user"))
            .config_dir(PathBuf::from("/home/user/.scaffold"))
            .build()
            .unwrap();

        assert_eq!(
            dirs.display_path(Path::new("/home/user/.scaffold/scaffold.toml")),
            Path::new("~/.scaffold/scaffold.toml").display().to_string()
        );
        assert_eq!(dirs.display_path(Path::new("/tmp/x")), "/tmp/x");
    }
}
