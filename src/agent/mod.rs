//! Run coordinator: per-session admission, cancellation, panic supervision
//! and event publication around the conversation loop.
//!
//! ```ignore
//! let agent = Agent::builder()
//!     .provider_factory(factory)
//!     .message_store(store.clone())
//!     .session_store(store)
//!     .tools(tools)
//!     .build()?;
//!
//! let mut events = agent.run(&session.id, "explain main.rs", Vec::new())?;
//! while let Some(event) = events.next().await {
//!     println!("{:?}", event.kind);
//! }
//! ```

mod event;
mod registry;
mod summarize;
pub(crate) mod title;

pub use event::{AgentEvent, AgentEventKind};

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use bon::bon;
use futures::FutureExt;
use parking_lot::RwLock;
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

use self::registry::{summarize_key, ActiveRequests};
use self::summarize::{summarize_session, SummarizeContext};
use crate::agent_loop::conversation::process_generation;
use crate::agent_loop::RunContext;
use crate::augment::{HeuristicAugmenter, PromptAugmenter};
use crate::config::{AgentSettings, EngineConfig};
use crate::error::{EngineError, Result};
use crate::models::{AgentRole, Model, ModelCatalog};
use crate::provider::{ModelProvider, ProviderFactory};
use crate::pubsub::Broker;
use crate::store::{MessageStore, SessionStore};
use crate::tools::Tool;
use crate::types::Attachment;

const PANIC_MESSAGE: &str = "panic while running the agent";

/// Handle to the engine. Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct Agent {
    inner: Arc<AgentInner>,
}

struct AgentInner {
    config: RwLock<EngineConfig>,
    catalog: ModelCatalog,
    factory: Arc<dyn ProviderFactory>,
    coder: RwLock<Arc<dyn ModelProvider>>,
    summarizer: RwLock<Option<Arc<dyn ModelProvider>>>,
    title: RwLock<Option<Arc<dyn ModelProvider>>>,
    tools: Arc<[Arc<dyn Tool>]>,
    messages: Arc<dyn MessageStore>,
    sessions: Arc<dyn SessionStore>,
    augmenter: Arc<dyn PromptAugmenter>,
    active: ActiveRequests,
    broker: Arc<Broker<AgentEvent>>,
    root: CancellationToken,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("model", &self.model().id)
            .field("tools", &self.inner.tools.len())
            .field("busy", &self.is_busy())
            .finish()
    }
}

#[bon]
impl Agent {
    /// Build an agent. Providers for the coder, summarizer and title roles
    /// are created up front from `config`.
    #[builder]
    pub fn new(
        #[builder(default)] config: EngineConfig,
        provider_factory: Arc<dyn ProviderFactory>,
        message_store: Arc<dyn MessageStore>,
        session_store: Arc<dyn SessionStore>,
        #[builder(default)] tools: Vec<Arc<dyn Tool>>,
        augmenter: Option<Arc<dyn PromptAugmenter>>,
    ) -> Result<Self> {
        let catalog = config.catalog();
        config.validate(&catalog)?;

        let coder = create_provider(&config, &catalog, provider_factory.as_ref(), AgentRole::Coder)?
            .ok_or_else(|| EngineError::Configuration("no model configured for the coder agent".into()))?;
        let summarizer =
            create_provider(&config, &catalog, provider_factory.as_ref(), AgentRole::Summarizer)?;
        let title = create_provider(&config, &catalog, provider_factory.as_ref(), AgentRole::Title)?;

        tracing::info!(
            model = %coder.model().id,
            tools = tools.len(),
            summarizer = summarizer.is_some(),
            title = title.is_some(),
            augmentation = config.augmentation.enabled,
            "agent initialized"
        );

        Ok(Self {
            inner: Arc::new(AgentInner {
                config: RwLock::new(config),
                catalog,
                factory: provider_factory,
                coder: RwLock::new(coder),
                summarizer: RwLock::new(summarizer),
                title: RwLock::new(title),
                tools: tools.into(),
                messages: message_store,
                sessions: session_store,
                augmenter: augmenter.unwrap_or_else(|| Arc::new(HeuristicAugmenter::new())),
                active: ActiveRequests::default(),
                broker: Arc::new(Broker::new()),
                root: CancellationToken::new(),
            }),
        })
    }
}

fn create_provider(
    config: &EngineConfig,
    catalog: &ModelCatalog,
    factory: &dyn ProviderFactory,
    role: AgentRole,
) -> Result<Option<Arc<dyn ModelProvider>>> {
    let Some(settings) = config.agent(role) else {
        return Ok(None);
    };
    let model = catalog.resolve(&settings.model)?;
    factory.create(role, &model, settings).map(Some)
}

impl Agent {
    /// Start a run for `session_id`.
    ///
    /// Fails with `SessionBusy` if the session already has a run in flight.
    /// The returned stream yields exactly one terminal event, then ends.
    pub fn run(
        &self,
        session_id: &str,
        content: &str,
        mut attachments: Vec<Attachment>,
    ) -> Result<ReceiverStream<AgentEvent>> {
        let provider = self.inner.coder.read().clone();
        if !attachments.is_empty() && !provider.model().supports_attachments {
            tracing::debug!(
                session_id,
                model = %provider.model().id,
                dropped = attachments.len(),
                "model does not support attachments, dropping them"
            );
            attachments.clear();
        }

        let token = self.inner.root.child_token();
        let request_id = self
            .inner
            .active
            .try_register(session_id, token.clone())
            .ok_or_else(|| EngineError::SessionBusy(session_id.to_string()))?;

        let (augmentation, max_iterations) = {
            let config = self.inner.config.read();
            let augmentation = config.augmentation.enabled.then(|| {
                (
                    self.inner.augmenter.clone(),
                    Duration::from_millis(config.augmentation.timeout_ms),
                )
            });
            (augmentation, config.max_iterations)
        };

        let ctx = RunContext {
            session_id: session_id.to_string(),
            provider,
            title_provider: self.inner.title.read().clone(),
            tools: self.inner.tools.clone(),
            messages: self.inner.messages.clone(),
            sessions: self.inner.sessions.clone(),
            augmentation,
            max_iterations,
            cancel: token.clone(),
        };

        tracing::info!(session_id, "run started");
        let (tx, rx) = mpsc::channel(1);
        let agent = self.clone();
        let content = content.to_string();
        tokio::spawn(async move {
            let outcome = AssertUnwindSafe(process_generation(&ctx, content, attachments))
                .catch_unwind()
                .await;
            let event = match outcome {
                Ok(Ok(message)) => {
                    tracing::info!(
                        session_id = %ctx.session_id,
                        message_id = %message.id,
                        finish_reason = ?message.finish_reason(),
                        "run finished"
                    );
                    AgentEvent::response(&ctx.session_id, message)
                }
                Ok(Err(err)) if err.is_cancellation() => {
                    tracing::info!(session_id = %ctx.session_id, "run cancelled");
                    AgentEvent::error(&ctx.session_id, err)
                }
                Ok(Err(err)) => {
                    tracing::error!(session_id = %ctx.session_id, error = %err, "run failed");
                    AgentEvent::error(&ctx.session_id, err)
                }
                Err(_) => {
                    tracing::error!(session_id = %ctx.session_id, "{PANIC_MESSAGE}");
                    AgentEvent::error(&ctx.session_id, EngineError::Internal(PANIC_MESSAGE.into()))
                }
            };

            agent.inner.active.release(&ctx.session_id, request_id);
            token.cancel();
            agent.inner.broker.publish(event.clone());
            let _ = tx.send(event).await;
        });

        Ok(ReceiverStream::new(rx))
    }

    /// Cancel the session's run and summarization, if any. Idempotent.
    pub fn cancel(&self, session_id: &str) {
        for key in [session_id.to_string(), summarize_key(session_id)] {
            if let Some(token) = self.inner.active.take(&key) {
                tracing::info!(key = %key, "request cancellation initiated");
                token.cancel();
            }
        }
    }

    /// Whether any run or summarization is in flight.
    pub fn is_busy(&self) -> bool {
        !self.inner.active.is_empty()
    }

    pub fn is_session_busy(&self, session_id: &str) -> bool {
        self.inner.active.contains(session_id)
    }

    /// The coder role's current model.
    pub fn model(&self) -> Model {
        self.inner.coder.read().model().clone()
    }

    /// Current configuration snapshot.
    pub fn config(&self) -> EngineConfig {
        self.inner.config.read().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.inner.broker.subscribe()
    }

    /// Swap the model behind `role`. Refused while any request is active.
    pub fn update(&self, role: AgentRole, model_id: &str) -> Result<Model> {
        if self.is_busy() {
            return Err(EngineError::InvalidState(
                "cannot change model while processing requests".into(),
            ));
        }
        let model = self.inner.catalog.resolve(model_id)?;
        let settings = {
            let config = self.inner.config.read();
            let mut settings = config
                .agent(role)
                .cloned()
                .unwrap_or_else(|| AgentSettings::new(model_id));
            settings.model = model_id.to_string();
            settings
        };
        let provider = self.inner.factory.create(role, &model, &settings)?;

        self.inner.config.write().set_agent_model(role, model_id);
        match role {
            AgentRole::Coder => *self.inner.coder.write() = provider,
            AgentRole::Summarizer => *self.inner.summarizer.write() = Some(provider),
            AgentRole::Title => *self.inner.title.write() = Some(provider),
            AgentRole::Task => {}
        }
        tracing::info!(role = %role, model = %model.id, "agent model updated");
        Ok(model)
    }

    /// Start compacting a session's history in the background.
    ///
    /// Progress and success are published to subscribers as `Summarize`
    /// events, a failure as a terminal `Error` event. Only admission
    /// failures are returned here.
    pub fn summarize(&self, session_id: &str) -> Result<()> {
        let provider = self
            .inner
            .summarizer
            .read()
            .clone()
            .ok_or(EngineError::SummarizerUnavailable)?;
        if self.is_session_busy(session_id) {
            return Err(EngineError::SessionBusy(session_id.to_string()));
        }

        let key = summarize_key(session_id);
        let token = self.inner.root.child_token();
        let request_id = self
            .inner
            .active
            .try_register(&key, token.clone())
            .ok_or_else(|| EngineError::SessionBusy(session_id.to_string()))?;

        let ctx = SummarizeContext {
            session_id: session_id.to_string(),
            provider,
            messages: self.inner.messages.clone(),
            sessions: self.inner.sessions.clone(),
            broker: self.inner.broker.clone(),
            cancel: token.clone(),
        };
        let agent = self.clone();
        tokio::spawn(async move {
            let outcome = AssertUnwindSafe(summarize_session(&ctx)).catch_unwind().await;
            let event = match outcome {
                Ok(Ok(summary_id)) => {
                    tracing::info!(session_id = %ctx.session_id, summary_id = %summary_id, "session summarized");
                    AgentEvent::summarize_done(&ctx.session_id, "Summary complete")
                }
                Ok(Err(err)) => {
                    tracing::warn!(session_id = %ctx.session_id, error = %err, "summarization failed");
                    AgentEvent::summarize_error(&ctx.session_id, err)
                }
                Err(_) => {
                    tracing::error!(session_id = %ctx.session_id, "panic while summarizing");
                    AgentEvent::summarize_error(
                        &ctx.session_id,
                        EngineError::Internal("panic while summarizing".into()),
                    )
                }
            };
            agent.inner.active.release(&key, request_id);
            token.cancel();
            agent.inner.broker.publish(event);
        });
        Ok(())
    }

    /// Cancel every in-flight run and summarization.
    pub fn shutdown(&self) {
        tracing::info!("agent shutting down");
        self.inner.root.cancel();
    }
}

