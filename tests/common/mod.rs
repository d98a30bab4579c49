//! Shared test helpers: a scripted provider, a factory that hands it out,
//! and small tools.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use tokio_util::sync::CancellationToken;

use runloop::config::{AgentSettings, EngineConfig};
use runloop::error::{EngineError, Result};
use runloop::models::{AgentRole, Model, ModelCatalog};
use runloop::prelude::*;
use runloop::provider::{ModelProvider, ProviderEvent, ProviderFactory, ProviderResponse};
use runloop::tools::{AgentToolParameters, ToolInfo};
use runloop::types::ModelPricing;

/// One step of a scripted streaming turn.
pub enum Step {
    Event(ProviderEvent),
    /// Block until the stream's token fires, then report cancellation.
    Hang,
    Panic,
}

/// Canned answer for `send_messages`.
pub enum Reply {
    Ok(ProviderResponse),
    Err(EngineError),
    /// Never answer (until cancelled).
    Hang,
    Panic,
}

/// A provider that plays back queued turns and records what it was sent.
pub struct ScriptedProvider {
    model: Model,
    turns: Mutex<VecDeque<Vec<Step>>>,
    replies: Mutex<VecDeque<Reply>>,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedProvider {
    pub fn new(model: Model) -> Self {
        Self {
            model,
            turns: Mutex::new(VecDeque::new()),
            replies: Mutex::new(VecDeque::new()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn builtin(id: &str) -> Self {
        Self::new(ModelCatalog::builtin().resolve(id).unwrap())
    }

    pub fn queue_turn(&self, steps: Vec<Step>) {
        self.turns.lock().unwrap().push_back(steps);
    }

    /// Queue a streamed text turn ending the conversation.
    pub fn queue_text(&self, text: &str, usage: TokenUsage) {
        self.queue_turn(vec![
            Step::Event(ProviderEvent::ContentDelta(text.to_string())),
            Step::Event(ProviderEvent::Complete(ProviderResponse::text(text, usage))),
        ]);
    }

    /// Queue a streamed turn that asks for the given tool calls.
    pub fn queue_tool_calls(&self, calls: Vec<ToolCall>) {
        let mut steps: Vec<Step> = calls
            .iter()
            .cloned()
            .map(|call| Step::Event(ProviderEvent::ToolUseStart(call)))
            .collect();
        steps.push(Step::Event(ProviderEvent::Complete(ProviderResponse {
            content: String::new(),
            tool_calls: calls,
            usage: TokenUsage::default(),
            finish_reason: FinishReason::ToolUse,
        })));
        self.queue_turn(steps);
    }

    pub fn queue_reply(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    /// Histories sent to `stream_response` and `send_messages`, in call order.
    pub fn seen(&self) -> Vec<Vec<Message>> {
        self.seen.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    fn model(&self) -> &Model {
        &self.model
    }

    fn stream_response(
        &self,
        messages: Vec<Message>,
        _tools: Vec<ToolInfo>,
        cancel: CancellationToken,
    ) -> BoxStream<'static, ProviderEvent> {
        self.seen.lock().unwrap().push(messages);
        let steps = self.turns.lock().unwrap().pop_front().unwrap_or_else(|| {
            vec![Step::Event(ProviderEvent::Complete(ProviderResponse::text(
                "Mock streamed response",
                TokenUsage::default(),
            )))]
        });

        Box::pin(async_stream::stream! {
            for step in steps {
                match step {
                    Step::Event(event) => yield event,
                    Step::Hang => {
                        cancel.cancelled().await;
                        yield ProviderEvent::Error(EngineError::RequestCancelled);
                        break;
                    }
                    Step::Panic => panic!("scripted stream panic"),
                }
            }
        })
    }

    async fn send_messages(
        &self,
        messages: Vec<Message>,
        _tools: Vec<ToolInfo>,
        cancel: CancellationToken,
    ) -> Result<ProviderResponse> {
        self.seen.lock().unwrap().push(messages);
        let reply = self.replies.lock().unwrap().pop_front();
        match reply {
            Some(Reply::Ok(response)) => Ok(response),
            Some(Reply::Err(err)) => Err(err),
            Some(Reply::Hang) => {
                cancel.cancelled().await;
                Err(EngineError::RequestCancelled)
            }
            Some(Reply::Panic) => panic!("scripted provider panic"),
            None => Ok(ProviderResponse::text("Mock response", TokenUsage::default())),
        }
    }
}

/// Hands out pre-built providers per role; unknown role/model pairs get a
/// fresh scripted provider.
#[derive(Default)]
pub struct StubFactory {
    providers: Mutex<HashMap<AgentRole, Arc<ScriptedProvider>>>,
}

impl StubFactory {
    pub fn with(self, role: AgentRole, provider: Arc<ScriptedProvider>) -> Self {
        self.providers.lock().unwrap().insert(role, provider);
        self
    }
}

impl ProviderFactory for StubFactory {
    fn create(
        &self,
        role: AgentRole,
        model: &Model,
        _settings: &AgentSettings,
    ) -> Result<Arc<dyn ModelProvider>> {
        let mut providers = self.providers.lock().unwrap();
        let provider = providers
            .entry(role)
            .and_modify(|p| {
                if p.model().id != model.id {
                    *p = Arc::new(ScriptedProvider::new(model.clone()));
                }
            })
            .or_insert_with(|| Arc::new(ScriptedProvider::new(model.clone())));
        let provider: Arc<dyn ModelProvider> = provider.clone();
        Ok(provider)
    }
}

/// A cheap test model: 1 USD per million input tokens, 2 per million output.
pub fn priced_model() -> Model {
    Model {
        id: "test-model".into(),
        provider: "test".into(),
        name: "Test".into(),
        api_model: None,
        pricing: ModelPricing::new(1.0, 2.0),
        context_window: 8_000,
        default_max_tokens: 1_000,
        can_reason: false,
        supports_attachments: false,
    }
}

/// Coder and summarizer on [`priced_model`]; no title agent, augmentation off.
///
/// Titling writes the session concurrently with accounting, so tests that
/// check session counters leave it out.
pub fn test_config() -> EngineConfig {
    let mut config = EngineConfig {
        models: vec![priced_model()],
        ..EngineConfig::default()
    };
    config.agents.clear();
    config.set_agent_model(AgentRole::Coder, "test-model");
    config.set_agent_model(AgentRole::Summarizer, "test-model");
    config.augmentation.enabled = false;
    config
}

pub fn with_title(mut config: EngineConfig) -> EngineConfig {
    config.set_agent_model(AgentRole::Title, "test-model");
    config
}

pub struct Harness {
    pub agent: Agent,
    pub store: Arc<InMemoryStore>,
    pub coder: Arc<ScriptedProvider>,
    pub summarizer: Arc<ScriptedProvider>,
    pub title: Arc<ScriptedProvider>,
    pub session: Session,
}

impl Harness {
    pub async fn new(tools: Vec<Arc<dyn Tool>>) -> Self {
        Self::with_config(test_config(), tools).await
    }

    pub async fn with_config(config: EngineConfig, tools: Vec<Arc<dyn Tool>>) -> Self {
        Self::build(config, tools, None).await
    }

    pub async fn build(
        config: EngineConfig,
        tools: Vec<Arc<dyn Tool>>,
        augmenter: Option<Arc<dyn PromptAugmenter>>,
    ) -> Self {
        let coder = Arc::new(ScriptedProvider::new(priced_model()));
        let summarizer = Arc::new(ScriptedProvider::new(priced_model()));
        let title = Arc::new(ScriptedProvider::new(priced_model()));
        let factory = StubFactory::default()
            .with(AgentRole::Coder, coder.clone())
            .with(AgentRole::Summarizer, summarizer.clone())
            .with(AgentRole::Title, title.clone());

        let store = Arc::new(InMemoryStore::new());
        let session = store.create_session("New Session").await.unwrap();
        let agent = Agent::builder()
            .config(config)
            .provider_factory(Arc::new(factory))
            .message_store(store.clone())
            .session_store(store.clone())
            .tools(tools)
            .maybe_augmenter(augmenter)
            .build()
            .unwrap();

        Self {
            agent,
            store,
            coder,
            summarizer,
            title,
            session,
        }
    }

    /// Start a run and wait for its terminal event.
    pub async fn run(&self, content: &str) -> AgentEvent {
        let mut events = self.agent.run(&self.session.id, content, Vec::new()).unwrap();
        let event = events.next().await.expect("terminal event");
        assert!(events.next().await.is_none(), "exactly one terminal event");
        event
    }

    pub async fn history(&self) -> Vec<Message> {
        self.store.list_messages(&self.session.id).await.unwrap()
    }

    pub async fn session(&self) -> Session {
        self.store.get_session(&self.session.id).await.unwrap()
    }
}

pub fn call(id: &str, name: &str, input: &str) -> ToolCall {
    ToolCall::new(id, name, input)
}

/// Tool that echoes its `text` argument.
pub fn echo_tool() -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        "echo",
        "Echo the input text",
        AgentToolParameters::object()
            .string("text", "Text to echo", true)
            .build(),
        |args, _ctx| async move {
            let text = args["text"].as_str().unwrap_or_default().to_string();
            Ok(ToolResponse::text(text))
        },
    ))
}

/// Tool that always refuses.
pub fn denied_tool() -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        "guarded",
        "Always denied",
        AgentToolParameters::empty(),
        |_args, _ctx| async move { Err(ToolError::PermissionDenied) },
    ))
}

/// Tool that waits far longer than any test.
pub fn slow_tool() -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        "slow",
        "Sleeps",
        AgentToolParameters::empty(),
        |_args, _ctx| async move {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(ToolResponse::text("woke up"))
        },
    ))
}

/// Tool that cancels its own session through `agent`, then succeeds.
pub fn self_cancelling_tool(agent: Arc<OnceLock<Agent>>) -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        "stop",
        "Cancels the session it runs in",
        AgentToolParameters::empty(),
        move |_args, ctx| {
            let agent = agent.clone();
            async move {
                if let Some(agent) = agent.get() {
                    agent.cancel(&ctx.session_id);
                }
                Ok(ToolResponse::text("ran fine"))
            }
        },
    ))
}

/// Tool that panics.
pub fn crashing_tool() -> Arc<dyn Tool> {
    Arc::new(AgentTool::new(
        "crash",
        "Panics",
        AgentToolParameters::empty(),
        |_args, _ctx| async move {
            if true {
                panic!("tool blew up");
            }
            Ok(ToolResponse::text("unreachable"))
        },
    ))
}

/// Poll `check` until it holds, yielding to other tasks between attempts.
pub async fn eventually<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}
