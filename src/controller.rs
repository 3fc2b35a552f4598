//! Conversation state machine.
//!
//! `ConversationController` owns the transcript and the lifecycle of the
//! single in-flight request. The gateway call runs in a spawned task that
//! reports back through a channel; all state changes happen when the owner
//! feeds those events to [`ConversationController::apply_gateway_event`].

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::gateway::{ChunkSink, GatewayEvent, InferenceGateway, RequestId};
use crate::model::ModelOption;
use crate::state::{ChatMessage, ChatRole};

/// Why a submission was refused. Neither case is shown in the error banner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SubmitRejected {
    #[error("message is empty")]
    EmptyInput,
    #[error("a response is still loading")]
    RequestInFlight,
}

#[derive(Debug, Clone, Copy)]
struct InFlight {
    id: RequestId,
    // Transcript index of the assistant message being streamed, once it exists
    reply_index: Option<usize>,
}

pub struct ConversationController {
    messages: Vec<ChatMessage>,
    draft: String,
    last_error: Option<String>,
    selected_model: ModelOption,
    sidebar_visible: bool,

    in_flight: Option<InFlight>,
    next_request: RequestId,
    scroll_pending: bool,
    request_task: Option<JoinHandle<()>>,

    gateway: Arc<dyn InferenceGateway>,
    events_tx: mpsc::UnboundedSender<GatewayEvent>,
    events_rx: mpsc::UnboundedReceiver<GatewayEvent>,
}

impl ConversationController {
    pub fn new(gateway: Arc<dyn InferenceGateway>) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            messages: Vec::new(),
            draft: String::new(),
            last_error: None,
            selected_model: ModelOption::default(),
            sidebar_visible: true,
            in_flight: None,
            next_request: 1,
            scroll_pending: false,
            request_task: None,
            gateway,
            events_tx,
            events_rx,
        }
    }

    pub fn with_model(mut self, model: ModelOption) -> Self {
        self.selected_model = model;
        self
    }

    // Read-only snapshot for views

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn selected_model(&self) -> ModelOption {
        self.selected_model
    }

    pub fn sidebar_visible(&self) -> bool {
        self.sidebar_visible
    }

    // Intents

    pub fn change_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Applies to the next submission; an in-flight request keeps its model.
    pub fn select_model(&mut self, model: ModelOption) {
        if model != self.selected_model {
            info!(model = %model, "model selected");
        }
        self.selected_model = model;
    }

    pub fn toggle_sidebar(&mut self) {
        self.sidebar_visible = !self.sidebar_visible;
    }

    /// Append a user message and start a gateway request for the whole
    /// transcript. Must be called from within a tokio runtime.
    pub fn submit(&mut self, text: &str) -> Result<RequestId, SubmitRejected> {
        if text.trim().is_empty() {
            return Err(SubmitRejected::EmptyInput);
        }
        if self.in_flight.is_some() {
            debug!("submission rejected while a request is in flight");
            return Err(SubmitRejected::RequestInFlight);
        }

        let id = self.next_request;
        self.next_request += 1;

        self.last_error = None;
        self.messages.push(ChatMessage::user(text));
        self.in_flight = Some(InFlight { id, reply_index: None });
        self.draft.clear();
        self.scroll_pending = true;

        let model = self.selected_model;
        let transcript = self.messages.clone();
        let gateway = Arc::clone(&self.gateway);
        let tx = self.events_tx.clone();

        info!(request = id, model = %model, messages = transcript.len(), "submitting message");

        self.request_task = Some(tokio::spawn(async move {
            let chunks = ChunkSink::new(id, tx.clone());
            let event = match gateway.send(&transcript, model, &chunks).await {
                Ok(content) => GatewayEvent::Completed { request: id, content },
                Err(error) => GatewayEvent::Failed { request: id, error },
            };
            // The controller may already be gone; nothing left to update then.
            let _ = tx.send(event);
        }));

        Ok(id)
    }

    /// Wait for the next event from a request task.
    pub async fn next_gateway_event(&mut self) -> Option<GatewayEvent> {
        self.events_rx.recv().await
    }

    pub fn apply_gateway_event(&mut self, event: GatewayEvent) {
        let Some(mut flight) = self.in_flight else {
            debug!(request = event.request(), "dropping event with no request in flight");
            return;
        };
        if flight.id != event.request() {
            debug!(request = event.request(), current = flight.id, "dropping stale event");
            return;
        }

        match event {
            GatewayEvent::Chunk { text, .. } => {
                match flight.reply_index {
                    Some(idx) => self.messages[idx].content.push_str(&text),
                    None => {
                        self.messages.push(ChatMessage::assistant(text));
                        flight.reply_index = Some(self.messages.len() - 1);
                    }
                }
                self.in_flight = Some(flight);
            }
            GatewayEvent::Completed { content, .. } => {
                // Streamed replies are already in the transcript
                if flight.reply_index.is_none() {
                    self.messages.push(ChatMessage::assistant(content));
                }
                self.in_flight = None;
                info!(request = flight.id, "response complete");
            }
            GatewayEvent::Failed { error, .. } => {
                warn!(request = flight.id, error = %error, "chat request failed");
                self.last_error = Some(error.to_string());
                self.in_flight = None;
            }
        }
        self.scroll_pending = true;
    }

    /// Drive the in-flight request to completion.
    pub async fn settle(&mut self) {
        while self.is_loading() {
            match self.next_gateway_event().await {
                Some(event) => self.apply_gateway_event(event),
                None => break,
            }
        }
    }

    /// True once after any transcript or error change.
    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_pending)
    }

    pub fn last_role(&self) -> Option<ChatRole> {
        self.messages.last().map(|m| m.role)
    }
}

impl Drop for ConversationController {
    fn drop(&mut self) {
        // The task finishes on its own; its final send is discarded.
        if self.request_task.as_ref().is_some_and(|task| !task.is_finished()) {
            debug!("controller dropped with a request still running");
        }
    }
}
