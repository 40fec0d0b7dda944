//! Agronomy advisor chat and crop scanning.
//!
//! Neither touches the aggregates: both are single gateway round-trips whose
//! answer is shown to the farmer.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    EngineError, Notifier, ResultEngine, TransactionGateway, catalog,
    transactions::{Diagnosis, Outcome, Payload, Transaction},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Ai,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub sender: Sender,
    pub text: String,
    pub time: DateTime<Utc>,
}

impl ChatMessage {
    fn new(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            sender,
            text: text.into(),
            time: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct AdvisorChat {
    history: Vec<ChatMessage>,
}

impl Default for AdvisorChat {
    fn default() -> Self {
        Self {
            history: vec![ChatMessage::new(Sender::Ai, catalog::ADVISOR_GREETING)],
        }
    }
}

impl AdvisorChat {
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Sends `question` and appends both sides of the exchange. On a gateway
    /// failure only the question stays in the history.
    pub async fn ask<G: TransactionGateway>(
        &mut self,
        gateway: &G,
        question: &str,
    ) -> ResultEngine<ChatMessage> {
        let question = question.trim();
        if question.is_empty() {
            return Err(EngineError::validation("question", "question is empty"));
        }
        self.history.push(ChatMessage::new(Sender::User, question));

        let transaction = Transaction::new(Payload::AdvisorQuery {
            question: question.to_string(),
        });
        match gateway.execute(&transaction).await? {
            Outcome::Reply { text } => {
                let reply = ChatMessage::new(Sender::Ai, text);
                self.history.push(reply.clone());
                Ok(reply)
            }
            other => Err(EngineError::TransactionFailed(format!(
                "unexpected advisor outcome: {other:?}"
            ))),
        }
    }
}

/// Runs a crop scan and reports the result as a notification.
pub async fn scan_crop<G: TransactionGateway>(
    gateway: &G,
    notifier: &Notifier,
) -> ResultEngine<Diagnosis> {
    let transaction = Transaction::new(Payload::CropScan);
    let result = match gateway.execute(&transaction).await {
        Ok(Outcome::Diagnosis(diagnosis)) => Ok(diagnosis),
        Ok(other) => Err(EngineError::TransactionFailed(format!(
            "unexpected scan outcome: {other:?}"
        ))),
        Err(err) => Err(err),
    };

    match &result {
        Ok(diagnosis) => {
            tracing::info!("crop scan: {} ({}%)", diagnosis.issue, diagnosis.health);
            notifier.success("Analisis Selesai!").await;
        }
        Err(err) => {
            tracing::warn!("crop scan failed: {err}");
            notifier.error(err.to_string()).await;
        }
    }
    result
}
