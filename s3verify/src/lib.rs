//! s3verify drives an S3-compatible server through a fixed catalogue of API
//! probes and reports the first response that breaks the protocol contract.
//!
//! Each case fans its probes out over the fixtures earlier cases left in a
//! [`FixtureRegistry`], verifies every response, and records what it created
//! so later cases can use it. Whatever is still alive when the run ends is
//! released according to the [`TeardownPolicy`].
//!
//! # Example
//! ```no_run
//! use s3verify::{AwsCredential, ServerConfig, Suite, SuiteOptions};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig::builder("http://localhost:9000")
//!         .credential(AwsCredential {
//!             key_id: "minioadmin".into(),
//!             secret_key: "minioadmin".into(),
//!             token: None,
//!         })
//!         .build()
//!         .unwrap();
//!     let report = Suite::catalogue()
//!         .run(config, SuiteOptions::default())
//!         .await
//!         .unwrap();
//!     for case in report.cases {
//!         println!("{} passed in {:?}", case.name, case.elapsed);
//!     }
//! }
//! ```

pub mod aws;
pub mod cases;
pub mod config;
pub mod digest;
mod error;
pub mod executor;
pub mod http;
pub mod orchestrator;
pub mod registry;
pub mod request;
pub mod suite;
pub mod verify;

#[cfg(test)]
mod testing;

pub use aws::AwsCredential;
pub use cases::{CaseContext, TestCase};
pub use config::{ConfigError, ServerConfig, SuiteOptions, TeardownPolicy};
pub use digest::Digest;
pub use error::{BoxedError, BuildError, CaseFailure, Error, VerifyError};
pub use orchestrator::{CaseReport, Orchestrator};
pub use registry::{FixtureKind, FixtureRegistry, RegistryError};
pub use suite::{ScheduleError, Suite, SuiteError, SuiteReport, TeardownReport};
pub use verify::{HeaderValidator, StandardHeaders};
