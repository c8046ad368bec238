// src/health/codec.rs
use super::{CheckDetails, CheckResult, HealthError};
use serde_json::{Map, Value};

/// Response classification handed to the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCategory {
    /// Nothing is registered at all.
    Empty,
    Success,
    /// A check reported its dependency as DOWN.
    Unavailable,
    /// A check could not run correctly (timeout, raised error, panic).
    ExecutionError,
    NotFound,
    InvalidPath,
}

impl StatusCategory {
    pub fn http_status(self) -> u16 {
        match self {
            StatusCategory::Empty => 204,
            StatusCategory::Success => 200,
            StatusCategory::Unavailable => 503,
            StatusCategory::ExecutionError => 500,
            StatusCategory::NotFound => 404,
            StatusCategory::InvalidPath => 400,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatusCategory::Empty => "empty",
            StatusCategory::Success => "success",
            StatusCategory::Unavailable => "unavailable",
            StatusCategory::ExecutionError => "execution_error",
            StatusCategory::NotFound => "not_found",
            StatusCategory::InvalidPath => "invalid_path",
        }
    }

    pub fn has_body(self) -> bool {
        matches!(
            self,
            StatusCategory::Success | StatusCategory::Unavailable | StatusCategory::ExecutionError
        )
    }
}

/// A rendered query: JSON payload (absent for bodiless categories) and its
/// category.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResponse {
    pub payload: Option<Value>,
    pub category: StatusCategory,
}

impl CheckResponse {
    pub fn status_code(&self) -> u16 {
        self.category.http_status()
    }
}

impl From<HealthError> for CheckResponse {
    fn from(err: HealthError) -> Self {
        let category = match err {
            HealthError::NotFound(_) => StatusCategory::NotFound,
            HealthError::InvalidPath(_) | HealthError::InvalidRegistration { .. } => {
                StatusCategory::InvalidPath
            }
        };
        Self {
            payload: None,
            category,
        }
    }
}

pub struct ResultCodec;

impl ResultCodec {
    /// Renders the evaluated query target. `is_absolute_root` is true when
    /// the query addressed the whole tree.
    pub fn render(result: &CheckResult, is_absolute_root: bool) -> CheckResponse {
        if is_absolute_root && result.checks().is_empty() && !result.is_leaf() {
            return CheckResponse {
                payload: None,
                category: StatusCategory::Empty,
            };
        }

        let mut payload = Self::view(result, is_absolute_root);
        payload.insert("outcome".to_string(), Value::from(result.status.as_str()));

        CheckResponse {
            payload: Some(Value::Object(payload)),
            category: Self::categorize(result),
        }
    }

    pub fn categorize(result: &CheckResult) -> StatusCategory {
        if result.is_up() {
            StatusCategory::Success
        } else if result.execution_failure {
            StatusCategory::ExecutionError
        } else {
            StatusCategory::Unavailable
        }
    }

    fn view(result: &CheckResult, is_absolute_root: bool) -> Map<String, Value> {
        let mut view = Map::new();
        if !is_absolute_root {
            if let Some(id) = &result.id {
                view.insert("id".to_string(), Value::from(id.as_str()));
            }
        }
        view.insert("status".to_string(), Value::from(result.status.as_str()));

        match &result.details {
            CheckDetails::Leaf { data } => {
                view.insert("data".to_string(), Value::Object(data.clone()));
            }
            CheckDetails::Composite { checks } => {
                let checks = checks
                    .iter()
                    .map(|check| Value::Object(Self::view(check, false)))
                    .collect();
                view.insert("checks".to_string(), Value::Array(checks));
            }
        }
        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::result::TIMEOUT_CAUSE;
    use crate::health::Status;
    use serde_json::json;

    fn leaf(id: &str, status: Status) -> CheckResult {
        CheckResult::completed(status).named(Some(id.to_string()))
    }

    #[test]
    fn test_empty_root() {
        let response = ResultCodec::render(&CheckResult::composite(Vec::new()), true);
        assert_eq!(response.category, StatusCategory::Empty);
        assert_eq!(response.payload, None);
        assert_eq!(response.status_code(), 204);
    }

    #[test]
    fn test_empty_sub_composite_is_success() {
        let empty = CheckResult::composite(Vec::new()).named(Some("c".into()));
        let response = ResultCodec::render(&empty, false);

        assert_eq!(response.category, StatusCategory::Success);
        assert_eq!(
            response.payload,
            Some(json!({"id": "c", "status": "UP", "outcome": "UP", "checks": []}))
        );
    }

    #[test]
    fn test_root_view() {
        let root = CheckResult::composite(vec![leaf("bar", Status::ok().with("availableMemory", "2Mb"))]);
        let response = ResultCodec::render(&root, true);

        assert_eq!(response.category, StatusCategory::Success);
        assert_eq!(
            response.payload,
            Some(json!({
                "status": "UP",
                "outcome": "UP",
                "checks": [
                    {"id": "bar", "status": "UP", "data": {"availableMemory": "2Mb"}}
                ]
            }))
        );
    }

    #[test]
    fn test_outcome_only_on_target() {
        let c = CheckResult::composite(vec![leaf("C1", Status::ok()), leaf("C2", Status::ko())])
            .named(Some("c".into()));
        let sub2 = CheckResult::composite(vec![c]).named(Some("sub2".into()));
        let response = ResultCodec::render(&sub2, false);

        assert_eq!(response.category, StatusCategory::Unavailable);
        assert_eq!(
            response.payload,
            Some(json!({
                "id": "sub2",
                "status": "DOWN",
                "outcome": "DOWN",
                "checks": [{
                    "id": "c",
                    "status": "DOWN",
                    "checks": [
                        {"id": "C1", "status": "UP", "data": {}},
                        {"id": "C2", "status": "DOWN", "data": {}}
                    ]
                }]
            }))
        );
    }

    #[test]
    fn test_leaf_target() {
        let response = ResultCodec::render(&leaf("A", Status::ok()), false);
        assert_eq!(
            response.payload,
            Some(json!({"id": "A", "status": "UP", "outcome": "UP", "data": {}}))
        );
    }

    #[test]
    fn test_execution_failure_category() {
        let root = CheckResult::composite(vec![
            leaf("ok", Status::ok()),
            CheckResult::execution_failed(TIMEOUT_CAUSE).named(Some("foo".into())),
        ]);
        let response = ResultCodec::render(&root, true);

        assert_eq!(response.category, StatusCategory::ExecutionError);
        assert_eq!(response.status_code(), 500);
        let foo = &response.payload.unwrap()["checks"][1];
        assert_eq!(foo["data"]["cause"], json!("Timeout"));
        assert_eq!(foo["data"]["procedure-execution-failure"], json!(true));
    }

    #[test]
    fn test_business_failure_category() {
        let root = CheckResult::composite(vec![CheckResult::failed("BOOM").named(Some("foo".into()))]);
        let response = ResultCodec::render(&root, true);

        assert_eq!(response.category, StatusCategory::Unavailable);
        assert_eq!(response.status_code(), 503);
    }

    #[test]
    fn test_resolution_errors() {
        let not_found: CheckResponse = HealthError::NotFound("missing".into()).into();
        assert_eq!(not_found.category, StatusCategory::NotFound);
        assert_eq!(not_found.status_code(), 404);

        let invalid: CheckResponse = HealthError::InvalidPath("a/b".into()).into();
        assert_eq!(invalid.category, StatusCategory::InvalidPath);
        assert_eq!(invalid.status_code(), 400);
        assert_eq!(invalid.payload, None);
    }
}
