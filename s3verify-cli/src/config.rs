use s3verify::{AwsCredential, ConfigError, ServerConfig, SuiteOptions, TeardownPolicy};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("{name} must be {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Everything a run needs, read from the environment.
#[derive(Debug)]
pub struct Settings {
    pub endpoint: String,
    pub region: Option<String>,
    pub credential: Option<AwsCredential>,
    pub options: SuiteOptions,
}

impl Settings {
    /// Reads settings through `lookup`, which stands in for `std::env::var`.
    ///
    /// `S3_ACCESS` and `S3_SECRET` come as a pair; with neither set, requests
    /// go out unsigned.
    pub fn load(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SettingsError> {
        let endpoint = lookup("S3_URL").ok_or(SettingsError::Missing("S3_URL"))?;
        let credential = match (lookup("S3_ACCESS"), lookup("S3_SECRET")) {
            (Some(key_id), Some(secret_key)) => Some(AwsCredential {
                key_id,
                secret_key,
                token: lookup("S3_SESSION_TOKEN"),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(SettingsError::Missing("S3_SECRET")),
            (None, Some(_)) => return Err(SettingsError::Missing("S3_ACCESS")),
        };

        let mut options = SuiteOptions::default();
        if let Some(value) = lookup("S3VERIFY_CONCURRENCY") {
            options.concurrency = positive("S3VERIFY_CONCURRENCY", value)?;
        }
        if let Some(value) = lookup("S3VERIFY_OBJECTS") {
            options.objects = positive("S3VERIFY_OBJECTS", value)?;
        }
        if let Some(value) = lookup("S3VERIFY_UPLOADS") {
            options.uploads = positive("S3VERIFY_UPLOADS", value)?;
        }
        if let Some(value) = lookup("S3VERIFY_TEARDOWN") {
            options.teardown = match value.to_ascii_lowercase().as_str() {
                "always" => TeardownPolicy::Always,
                "keep-on-failure" => TeardownPolicy::KeepOnFailure,
                "never" => TeardownPolicy::Never,
                _ => {
                    return Err(SettingsError::Invalid {
                        name: "S3VERIFY_TEARDOWN",
                        expected: "always, keep-on-failure or never",
                        value,
                    })
                }
            };
        }

        Ok(Self {
            endpoint,
            region: lookup("S3_REGION").filter(|region| !region.is_empty()),
            credential,
            options,
        })
    }

    pub fn server_config(&self) -> Result<ServerConfig, SettingsError> {
        let mut builder = ServerConfig::builder(self.endpoint.clone());
        if let Some(region) = &self.region {
            builder = builder.region(region.clone());
        }
        if let Some(credential) = &self.credential {
            builder = builder.credential(credential.clone());
        }
        Ok(builder.build()?)
    }
}

fn positive(name: &'static str, value: String) -> Result<usize, SettingsError> {
    match value.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(SettingsError::Invalid {
            name,
            expected: "a positive integer",
            value,
        }),
    }
}
