use std::{fmt, ops::Range};

use thiserror::Error;
use url::Url;

use crate::{
    aws::{AwsCredential, SigV4, Signer, Unsigned},
    http::DynHttpClient,
};

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_USER_AGENT: &str = concat!("s3verify/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("endpoint is required")]
    MissingEndpoint,
    #[error("invalid endpoint {endpoint}: {source}")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        source: url::ParseError,
    },
    #[error("endpoint {0} must use http or https")]
    UnsupportedScheme(String),
    #[error("no http client available, enable the `tokio-http` feature or supply one")]
    MissingClient,
}

/// Target server, identity and transport. Built once per run and shared
/// read-only by every probe.
pub struct ServerConfig {
    pub(crate) endpoint: String,
    pub(crate) region: String,
    pub(crate) user_agent: String,
    pub(crate) signer: Box<dyn Signer>,
    pub(crate) client: Box<dyn DynHttpClient>,
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

impl ServerConfig {
    pub fn builder(endpoint: impl Into<String>) -> ServerConfigBuilder {
        ServerConfigBuilder::new(endpoint)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

pub struct ServerConfigBuilder {
    endpoint: String,
    region: String,
    credential: Option<AwsCredential>,
    user_agent: String,
    signer: Option<Box<dyn Signer>>,
    client: Option<Box<dyn DynHttpClient>>,
}

impl ServerConfigBuilder {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            region: DEFAULT_REGION.into(),
            credential: None,
            user_agent: DEFAULT_USER_AGENT.into(),
            signer: None,
            client: None,
        }
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }

    pub fn credential(mut self, credential: AwsCredential) -> Self {
        self.credential = Some(credential);
        self
    }

    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Overrides the SigV4 signer derived from the credential.
    pub fn signer(mut self, signer: impl Signer + 'static) -> Self {
        self.signer = Some(Box::new(signer));
        self
    }

    pub fn client(mut self, client: Box<dyn DynHttpClient>) -> Self {
        self.client = Some(client);
        self
    }

    pub fn build(self) -> Result<ServerConfig, ConfigError> {
        let trimmed = self.endpoint.trim().trim_end_matches('/');
        if trimmed.is_empty() {
            return Err(ConfigError::MissingEndpoint);
        }
        let url = Url::parse(trimmed).map_err(|source| ConfigError::InvalidEndpoint {
            endpoint: trimmed.to_string(),
            source,
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::UnsupportedScheme(trimmed.to_string()));
        }

        let signer = match (self.signer, self.credential) {
            (Some(signer), _) => signer,
            (None, Some(credential)) => Box::new(SigV4::new(credential, self.region.clone())),
            (None, None) => Box::new(Unsigned),
        };
        let client = match self.client {
            Some(client) => client,
            None => default_client()?,
        };

        Ok(ServerConfig {
            endpoint: trimmed.to_string(),
            region: self.region,
            user_agent: self.user_agent,
            signer,
            client,
        })
    }
}

fn default_client() -> Result<Box<dyn DynHttpClient>, ConfigError> {
    #[cfg(feature = "tokio-http")]
    {
        Ok(Box::new(crate::http::tokio::TokioClient::new()))
    }
    #[cfg(not(feature = "tokio-http"))]
    {
        Err(ConfigError::MissingClient)
    }
}

/// What happens to fixtures that are still alive when the run ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TeardownPolicy {
    /// Release leftovers whether the run passed or failed.
    #[default]
    Always,
    /// Leave everything in place after a failure for inspection.
    KeepOnFailure,
    /// Never release anything the catalogue did not remove itself.
    Never,
}

impl TeardownPolicy {
    pub fn should_release(self, failed: bool) -> bool {
        match self {
            TeardownPolicy::Always => true,
            TeardownPolicy::KeepOnFailure => !failed,
            TeardownPolicy::Never => false,
        }
    }
}

/// Knobs for one pass over the catalogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuiteOptions {
    /// Upper bound of probes in flight at once, per case.
    pub concurrency: usize,
    /// Objects uploaded by the put case and reused by every read case.
    pub objects: usize,
    /// Size range of each uploaded object payload.
    pub object_size: Range<usize>,
    /// Multipart uploads initiated, each receiving one part.
    pub uploads: usize,
    /// Size range of each uploaded part.
    pub part_size: Range<usize>,
    pub teardown: TeardownPolicy,
}

impl Default for SuiteOptions {
    fn default() -> Self {
        Self {
            concurrency: 32,
            objects: 50,
            object_size: 1024..64 * 1024,
            uploads: 2,
            part_size: 4 * 1024 * 1024..5 * 1024 * 1024,
            teardown: TeardownPolicy::Always,
        }
    }
}
