//! Message handlers invoked by the channel adapter

use std::sync::Arc;

use crate::alerts::{AlertBatch, AlertComposer, ThresholdEvaluator};
use crate::data::{DecodeError, Reading};
use crate::rules::RuleSet;

/// Handler for channel events.
///
/// Each inbound message is an independent unit of work: an error returned
/// from `on_message` affects only that message.
pub trait MessageHandler: Send + Sync {
    /// Called every time the connection is (re)established
    fn on_connected(&self) {}

    /// Process one inbound payload, returning the batch to publish, if any
    fn on_message(&self, topic: &str, payload: &[u8]) -> Result<Option<AlertBatch>, ProcessError>;
}

/// Decodes readings, evaluates them and composes alert batches
#[derive(Debug, Clone)]
pub struct AlertHandler {
    evaluator: ThresholdEvaluator,
    composer: AlertComposer,
}

impl AlertHandler {
    pub fn new(rules: Arc<RuleSet>) -> Self {
        Self {
            evaluator: ThresholdEvaluator::new(rules),
            composer: AlertComposer::new(),
        }
    }

    pub fn evaluator(&self) -> &ThresholdEvaluator {
        &self.evaluator
    }

    /// Evaluate an already decoded reading
    pub fn handle_reading(&self, reading: &Reading) -> Option<AlertBatch> {
        let violations = self.evaluator.evaluate(reading);
        if violations.is_empty() {
            return None;
        }
        Some(self.composer.compose(reading, violations))
    }
}

impl MessageHandler for AlertHandler {
    fn on_connected(&self) {
        tracing::info!(
            rules = self.evaluator.rules().len(),
            "Alert handler listening for readings"
        );
    }

    fn on_message(&self, _topic: &str, payload: &[u8]) -> Result<Option<AlertBatch>, ProcessError> {
        let reading = Reading::decode(payload)?;
        Ok(self.handle_reading(&reading))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),
}
