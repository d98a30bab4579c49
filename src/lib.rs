//! Runloop: an agent execution engine.
//!
//! A run takes a user turn for a session, streams a model response, dispatches
//! the tool calls the model asks for, feeds the results back and repeats until
//! the model stops asking. Runs are admitted one per session, can be cancelled
//! at any point, and report exactly one terminal event.
//!
//! Model backends, persistence and tools are supplied by the host through the
//! [`provider::ModelProvider`], [`store::MessageStore`] / [`store::SessionStore`]
//! and [`tools::Tool`] traits.
//!
//! # Quick Start
//!
//! ```ignore
//! use runloop::prelude::*;
//!
//! # async fn example(factory: std::sync::Arc<dyn ProviderFactory>) -> runloop::error::Result<()> {
//! let store = std::sync::Arc::new(InMemoryStore::new());
//! let agent = Agent::builder()
//!     .config(EngineConfig::from_env()?)
//!     .provider_factory(factory)
//!     .message_store(store.clone())
//!     .session_store(store.clone())
//!     .build()?;
//!
//! let session = store.create_session("scratch").await?;
//! let mut events = agent.run(&session.id, "Hello!", Vec::new())?;
//! if let Some(event) = events.next().await {
//!     println!("{}", event.kind);
//! }
//! # Ok(())
//! # }
//! ```

pub mod agent;
pub mod agent_loop;
pub mod augment;
pub mod config;
pub mod error;
pub mod models;
pub mod prelude;
pub mod provider;
pub mod pubsub;
pub mod store;
pub mod tools;
pub mod types;
pub mod util;
