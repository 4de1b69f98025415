//! Generated rows and the dataset record view.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One generated evaluation record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataRow {
    pub question: String,
    /// Supporting context texts, in accumulation order.
    pub contexts: Vec<String>,
    pub ground_truth: String,
    /// Name of the evolution that produced this row.
    pub evolution_type: String,
}

/// An ordered collection of generated rows.
///
/// Every row held here is a real generated record; failed or filtered
/// generations never reach the dataset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestDataset {
    pub test_data: Vec<DataRow>,
}

impl TestDataset {
    pub fn new(test_data: Vec<DataRow>) -> Self {
        Self { test_data }
    }

    pub fn len(&self) -> usize {
        self.test_data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.test_data.is_empty()
    }

    /// Flat record view. Each record carries an `episode_done` marker.
    pub fn to_records(&self) -> Vec<Value> {
        self.test_data
            .iter()
            .map(|row| {
                let mut record = serde_json::to_value(row).unwrap_or(Value::Null);
                if let Value::Object(map) = &mut record {
                    map.insert("episode_done".into(), Value::Bool(true));
                }
                record
            })
            .collect()
    }
}
