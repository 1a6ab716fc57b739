use serde::{Deserialize, Serialize};
use serde_json::Value;

fn array_len(doc: &Value, field: &str) -> usize {
    doc.get(field).and_then(Value::as_array).map_or(0, Vec::len)
}

/// Phase 1 output, kept exactly as the model returned it.
///
/// Expected shape: `observations[]` (timestamp, end_timestamp, type,
/// description, data_fields, ui_elements, workflow_action, spoken_context),
/// `app_names[]`, `data_sources[]`, `pain_points_visual[]`. Nothing beyond
/// well-formed JSON is enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VisualAnalysis(pub Value);

impl VisualAnalysis {
    pub fn observation_count(&self) -> usize {
        array_len(&self.0, "observations")
    }
}

/// Phase 2 output: pain points, workflows, data sources, personas, stated and
/// implicit requirements, market context, metrics, technical constraints and a
/// visual evidence summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Synthesis(pub Value);

impl Synthesis {
    pub fn pain_point_count(&self) -> usize {
        array_len(&self.0, "pain_points")
    }

    pub fn workflow_count(&self) -> usize {
        array_len(&self.0, "current_workflows")
    }

    pub fn persona_count(&self) -> usize {
        array_len(&self.0, "user_personas")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_visual_observation_count() {
        let visual = VisualAnalysis(json!({
            "observations": [{"timestamp": "00:12"}, {"timestamp": "01:40"}],
            "app_names": ["Excel", "Salesforce"],
        }));
        assert_eq!(visual.observation_count(), 2);
        assert_eq!(VisualAnalysis(json!({"observations": "none"})).observation_count(), 0);
    }

    #[test]
    fn test_counts_tolerate_missing_fields() {
        let synthesis = Synthesis(json!({"pain_points": [1, 2, 3], "user_personas": {}}));
        assert_eq!(synthesis.pain_point_count(), 3);
        assert_eq!(synthesis.workflow_count(), 0);
        assert_eq!(synthesis.persona_count(), 0);
    }

    #[test]
    fn test_transparent_serialization() {
        let doc = json!({"z": 1, "a": [true]});
        let synthesis: Synthesis = serde_json::from_value(doc.clone()).unwrap();
        assert_eq!(serde_json::to_value(&synthesis).unwrap(), doc);
    }
}
