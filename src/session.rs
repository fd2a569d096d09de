//! Chat session state: an append-only message log plus the unsent input.
//!
//! Rendering code only reads from [`Session`]; every mutation goes through
//! [`Session::set_pending_input`] or one of the submit operations.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::RequestError;
use crate::tickets::{TicketClient, TicketReceipt};

pub const GREETING: &str = "Hi! Please describe your grievance.";
pub const FAILURE_TEXT: &str = "Oops! Something went wrong.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    User,
    Bot,
}

/// A single chat entry. Position in the log is its only identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    pub text: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self { sender: Sender::User, text: text.into() }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self { sender: Sender::Bot, text: text.into() }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    messages: Vec<Message>,
    pending_input: String,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            messages: vec![Message::bot(GREETING)],
            pending_input: String::new(),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn pending_input(&self) -> &str {
        &self.pending_input
    }

    pub fn set_pending_input(&mut self, text: impl Into<String>) {
        self.pending_input = text.into();
    }

    /// Capture the input and append it as a user message.
    ///
    /// Returns the text to send, or `None` (leaving everything untouched)
    /// when the input is blank.
    pub fn begin_submit(&mut self) -> Option<String> {
        if self.pending_input.trim().is_empty() {
            return None;
        }

        let text = self.pending_input.clone();
        self.messages.push(Message::user(text.clone()));
        debug!(messages = self.messages.len(), "submit started");
        Some(text)
    }

    /// Append the bot reply for a finished request and clear the input.
    pub fn finish_submit(&mut self, outcome: Result<TicketReceipt, RequestError>) {
        let reply = match outcome {
            Ok(receipt) => receipt.reply_text(),
            Err(e) => {
                warn!(error = %e, "ticket request failed");
                FAILURE_TEXT.to_string()
            }
        };
        self.messages.push(Message::bot(reply));
        self.pending_input.clear();
    }

    /// One full submit cycle: append, await the ticket service, append again.
    pub async fn submit(&mut self, client: &TicketClient) {
        let Some(text) = self.begin_submit() else {
            return;
        };
        let outcome = client.create_ticket(&text).await;
        self.finish_submit(outcome);
    }
}
