//! Plan model
//!
//! A plan is a goal, the model's reasoning and an ordered list of steps.
//! Step order is execution order: the agent always works on the first
//! pending step.

use serde::{Deserialize, Serialize};

use crate::core::{PlanwiseError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    #[default]
    Pending,
    Completed,
}

/// One unit of plan work
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: StepStatus,
}

impl Step {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            status: StepStatus::Pending,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == StepStatus::Pending
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub thought: String,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// Strip an optional ```` ```json ```` fence.
///
/// When the text contains a `json`-tagged fence, the content between it and
/// the next closing fence is returned trimmed; otherwise the whole text.
pub fn extract_json(text: &str) -> &str {
    const OPEN: &str = "```json";
    match text.split_once(OPEN) {
        Some((_, rest)) => rest.split("```").next().unwrap_or_default().trim(),
        None => text,
    }
}

impl Plan {
    /// Parse model output into a plan
    pub fn parse(text: &str) -> Result<Self> {
        let body = extract_json(text);
        serde_json::from_str(body).map_err(|e| PlanwiseError::plan_parse(e.to_string(), text))
    }

    pub fn to_json(&self) -> String {
        // A plan only holds strings and enums, serialization cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Index of the first pending step
    pub fn next_pending(&self) -> Option<usize> {
        self.steps.iter().position(Step::is_pending)
    }

    pub fn pending_count(&self) -> usize {
        self.steps.iter().filter(|s| s.is_pending()).count()
    }

    pub fn completed_count(&self) -> usize {
        self.steps.len() - self.pending_count()
    }

    /// True when no step is pending (including a plan with no steps)
    pub fn is_complete(&self) -> bool {
        self.next_pending().is_none()
    }

    /// Mark a step completed. Returns whether the status changed; completed
    /// steps never go back to pending.
    pub fn complete_step(&mut self, index: usize) -> bool {
        match self.steps.get_mut(index) {
            Some(step) if step.is_pending() => {
                step.status = StepStatus::Completed;
                true
            }
            _ => false,
        }
    }

    /// Fold a revised plan into this one.
    ///
    /// Completed steps are kept verbatim as the prefix; the revision's
    /// non-completed steps follow as pending. An empty revised goal keeps
    /// the current goal.
    pub fn merge_revision(&mut self, revised: Plan) {
        let mut steps: Vec<Step> = self
            .steps
            .iter()
            .filter(|s| !s.is_pending())
            .cloned()
            .collect();

        steps.extend(revised.steps.into_iter().filter(Step::is_pending));

        if !revised.goal.trim().is_empty() {
            self.goal = revised.goal;
        }
        if !revised.thought.trim().is_empty() {
            self.thought = revised.thought;
        }
        self.steps = steps;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(statuses: &[StepStatus]) -> Plan {
        Plan {
            goal: "G".into(),
            thought: String::new(),
            steps: statuses
                .iter()
                .enumerate()
                .map(|(i, s)| Step {
                    title: format!("S{}", i),
                    description: format!("do {}", i),
                    status: *s,
                })
                .collect(),
        }
    }

    #[test]
    fn test_next_pending_is_first_pending() {
        use StepStatus::*;
        assert_eq!(plan(&[Completed, Pending, Pending]).next_pending(), Some(1));
        assert_eq!(plan(&[Pending, Completed]).next_pending(), Some(0));
        assert_eq!(plan(&[Completed, Completed]).next_pending(), None);
        assert_eq!(plan(&[]).next_pending(), None);
        assert!(plan(&[]).is_complete());
    }

    #[test]
    fn test_complete_step_is_monotonic() {
        let mut p = plan(&[StepStatus::Pending]);
        assert!(p.complete_step(0));
        assert!(!p.complete_step(0));
        assert!(!p.complete_step(7));
        assert_eq!(p.steps[0].status, StepStatus::Completed);
        assert_eq!(p.pending_count(), 0);
        assert_eq!(p.completed_count(), 1);
    }

    #[test]
    fn test_extract_json() {
        let text = "prefix ```json\n{\"goal\":\"x\",\"steps\":[]}\n``` suffix";
        assert_eq!(extract_json(text), "{\"goal\":\"x\",\"steps\":[]}");
        assert_eq!(extract_json("{\"goal\":\"y\"}"), "{\"goal\":\"y\"}");
        assert_eq!(extract_json("```json\n{}"), "{}");
    }

    #[test]
    fn test_parse_defaults_missing_fields() {
        let p = Plan::parse("```json\n{\"goal\":\"x\",\"steps\":[{\"title\":\"A\"}]}\n```").unwrap();
        assert_eq!(p.goal, "x");
        assert_eq!(p.thought, "");
        assert_eq!(p.steps, vec![Step::new("A", "")]);
    }

    #[test]
    fn test_parse_error_keeps_raw_text() {
        let err = Plan::parse("I cannot plan this").unwrap_err();
        match err {
            PlanwiseError::PlanParse { raw, .. } => assert_eq!(raw, "I cannot plan this"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_round_trip_through_fence() {
        let p = plan(&[StepStatus::Completed, StepStatus::Pending]);
        let wrapped = format!("Here you go:\n```json\n{}\n```", p.to_json_pretty());
        assert_eq!(Plan::parse(&wrapped).unwrap(), p);
    }

    #[test]
    fn test_merge_revision_keeps_completed_prefix() {
        let mut current = plan(&[StepStatus::Completed, StepStatus::Pending]);
        let revised = Plan {
            goal: String::new(),
            thought: "adjusted".into(),
            steps: vec![
                // A rewritten completed step must not replace the original
                Step {
                    title: "rewritten".into(),
                    description: "x".into(),
                    status: StepStatus::Completed,
                },
                Step::new("C", "new work"),
                Step::new("D", "more work"),
            ],
        };

        current.merge_revision(revised);

        assert_eq!(current.goal, "G");
        assert_eq!(current.thought, "adjusted");
        let titles: Vec<&str> = current.steps.iter().map(|s| s.title.as_str()).collect();
        assert_eq!(titles, vec!["S0", "C", "D"]);
        assert_eq!(current.steps[0].status, StepStatus::Completed);
        assert_eq!(current.pending_count(), 2);
    }
}
