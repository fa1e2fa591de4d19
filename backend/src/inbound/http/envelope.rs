//! Success envelope shared by every JSON endpoint.
//!
//! ```text
//! {"status":"success","results":2,"data":{"data":[...]}}
//! ```

use serde::Serialize;
use utoipa::ToSchema;

const SUCCESS: &str = "success";

/// `{status, results?, data}` wrapper around a payload.
#[derive(Debug, Serialize, ToSchema)]
pub struct Envelope<T> {
    #[schema(value_type = String, example = "success")]
    pub status: &'static str,
    /// Item count for list responses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<usize>,
    pub data: T,
}

/// Payload nested under `data.data`.
#[derive(Debug, Serialize, ToSchema)]
pub struct Wrapped<T> {
    pub data: T,
}

impl<T> Envelope<T> {
    /// Envelope around an already shaped payload.
    pub fn new(data: T) -> Self {
        Self {
            status: SUCCESS,
            results: None,
            data,
        }
    }

    pub fn with_results(mut self, results: usize) -> Self {
        self.results = Some(results);
        self
    }
}

impl<T> Envelope<Wrapped<T>> {
    /// A single resource under `data.data`.
    pub fn one(value: T) -> Self {
        Self::new(Wrapped { data: value })
    }
}

impl<T> Envelope<Wrapped<Vec<T>>> {
    /// A list under `data.data`, counted in `results`.
    pub fn many(values: Vec<T>) -> Self {
        let results = values.len();
        Self::new(Wrapped { data: values }).with_results(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    fn single_resources_omit_results() {
        let value = serde_json::to_value(Envelope::one("tour")).expect("serialise");
        assert_eq!(value, json!({ "status": "success", "data": { "data": "tour" } }));
    }

    #[rstest]
    fn lists_are_counted() {
        let value = serde_json::to_value(Envelope::many(vec![1, 2])).expect("serialise");
        assert_eq!(
            value,
            json!({ "status": "success", "results": 2, "data": { "data": [1, 2] } })
        );
    }
}
