//! Confidence gate, the terminal policy check on the voting result.

use iq_protocol::ClassificationResult;

pub const DEFAULT_THRESHOLD: f64 = 0.4;

/// Rejects winners whose confidence is below `threshold`.
///
/// A rejection clears `final_intent_id` but keeps the confidence and the
/// score distribution for reporting.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceGate {
    threshold: f64,
}

impl ConfidenceGate {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn apply(&self, mut result: ClassificationResult) -> ClassificationResult {
        match result.final_intent_id {
            None => {
                tracing::info!("confidence gate: no candidate");
            }
            Some(intent_id) if result.confidence < self.threshold => {
                tracing::info!(
                    intent_id,
                    confidence = result.confidence,
                    threshold = self.threshold,
                    "confidence gate rejected winner"
                );
                result.final_intent_id = None;
            }
            Some(intent_id) => {
                tracing::info!(
                    intent_id,
                    confidence = result.confidence,
                    "confidence gate accepted winner"
                );
            }
        }
        result
    }
}

impl Default for ConfidenceGate {
    fn default() -> Self {
        Self::new(DEFAULT_THRESHOLD)
    }
}
