use std::path::PathBuf;

use secrecy::SecretString;

use crate::config::FixtureConfig;
use crate::secrets::SecretError;

/// One PDF to push through the suite, with the verdict it should produce.
#[derive(Debug)]
pub struct Fixture {
    /// File name in the shared folder; equals the file name of `path`.
    pub name: String,
    pub path: PathBuf,
    pub password: Option<SecretString>,
    pub expect_printable: bool,
}

impl Fixture {
    /// Takes the name from the file name of `path`.
    pub fn new(path: impl Into<PathBuf>, expect_printable: bool) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name,
            path,
            password: None,
            expect_printable,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(SecretString::from(password.into()));
        self
    }

    pub fn from_config(config: &FixtureConfig) -> Result<Self, SecretError> {
        let password = match &config.password {
            Some(source) => source.resolve_optional()?,
            None => None,
        };
        Ok(Self {
            name: config.name.clone(),
            path: config.path.clone(),
            password,
            expect_printable: config.expect_printable,
        })
    }

    pub fn from_configs(configs: &[FixtureConfig]) -> Result<Vec<Self>, SecretError> {
        configs.iter().map(Self::from_config).collect()
    }
}
