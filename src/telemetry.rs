//! Fire-and-forget run summaries.

use serde::{Deserialize, Serialize};
use tracing::info;

/// Summary emitted once per successful generation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationEvent {
    pub evolution_names: Vec<String>,
    /// Per-strategy target fraction, in mix order.
    pub evolution_percentages: Vec<f64>,
    pub num_rows: usize,
    pub language: String,
}

/// Sink for run summaries. Observational only: a sink must never fail
/// the run.
pub trait TelemetrySink: Send + Sync {
    fn track(&self, event: GenerationEvent);
}

/// Default sink that logs the summary through `tracing`.
pub struct TracingTelemetry;

impl TelemetrySink for TracingTelemetry {
    fn track(&self, event: GenerationEvent) {
        info!(
            evolutions = ?event.evolution_names,
            percentages = ?event.evolution_percentages,
            rows = event.num_rows,
            language = %event.language,
            "testset generation complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<GenerationEvent>>,
    }

    impl TelemetrySink for RecordingSink {
        fn track(&self, event: GenerationEvent) {
            self.events.lock().push(event);
        }
    }

    #[test]
    fn test_recording_sink_captures_event() {
        let sink = Arc::new(RecordingSink::default());
        sink.track(GenerationEvent {
            evolution_names: vec!["simple".into()],
            evolution_percentages: vec![1.0],
            num_rows: 3,
            language: "english".into(),
        });
        let events = sink.events.lock();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].num_rows, 3);
        assert_eq!(events[0].evolution_names, vec!["simple"]);
    }

    #[test]
    fn test_event_serde_round_trip() {
        let event = GenerationEvent {
            evolution_names: vec!["simple".into(), "reasoning".into()],
            evolution_percentages: vec![0.5, 0.5],
            num_rows: 10,
            language: "english".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let de: GenerationEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(de.evolution_names.len(), 2);
        assert_eq!(de.num_rows, 10);
    }
}
