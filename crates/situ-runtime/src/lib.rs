//! # situ-runtime
//!
//! Turn processing for the situational-puzzle experiment.
//!
//! The deterministic pieces (classifier, contracts, sanitizer, session
//! transitions) live in `situ-core`. This crate adds the language-model
//! boundary and the controller that decides, per turn, whether the model
//! is called at all.
//!
//! ## Example
//!
//! ```rust,ignore
//! use situ_runtime::{ProviderRegistry, RuntimeConfig, SessionControllerBuilder, SessionStore};
//! use situ_core::Condition;
//!
//! let config = RuntimeConfig::default().with_env_overrides()?;
//! let controller = SessionControllerBuilder::from_config(&config, &ProviderRegistry::with_defaults())?
//!     .build()?;
//! let store = SessionStore::new(Arc::new(controller));
//!
//! let (id, intro) = store.create(Condition::Sincere)?;
//! let reply = store.submit(id, "Is the river frozen?").await?;
//! ```

pub mod api;
pub mod config;
pub mod controller;
pub mod providers;
pub mod store;

pub use api::{respond, respond_with_cancel, ChatRequest, ChatResponse};
pub use config::{ConfigError, RuntimeConfig};
pub use controller::{SessionController, SessionControllerBuilder, SessionError, SetupError};
pub use providers::{
    ChatMessage, CompletionConfig, CompletionResponse, LlmProvider, ProviderError,
    ProviderFactory, ProviderRegistry, ScriptedProvider,
};
pub use store::{SessionId, SessionStore, StoreError};

pub use tokio_util::sync::CancellationToken;
