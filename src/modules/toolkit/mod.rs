//! Toolkit commands: selector, decode and encode

pub mod decode;
pub mod encode;
pub mod selector;

use serde_json::{Map, Value};

/// Result of a toolkit operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolResult {
    pub title: String,
    pub content: Vec<(String, String)>, // (label, value) pairs
}

impl ToolResult {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            content: Vec::new(),
        }
    }

    pub fn add(mut self, label: impl Into<String>, value: impl Into<String>) -> Self {
        self.content.push((label.into(), value.into()));
        self
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.content
            .iter()
            .find(|(k, _)| k == label)
            .map(|(_, v)| v.as_str())
    }

    /// Labels padded to a common width, one pair per line
    pub fn render(&self) -> String {
        let width = self.content.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
        let mut out = format!("{}\n", self.title);
        for (label, value) in &self.content {
            out.push_str(&format!("  {label:<width$}  {value}\n"));
        }
        out
    }

    pub fn to_json(&self) -> Value {
        let fields: Map<String, Value> = self
            .content
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();
        Value::Object(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_aligns_labels() {
        let result = ToolResult::new("Selector")
            .add("signature", "transfer(address,uint256)")
            .add("selector", "0xa9059cbb");
        assert_eq!(
            result.render(),
            "Selector\n  signature  transfer(address,uint256)\n  selector   0xa9059cbb\n"
        );
        assert_eq!(result.get("selector"), Some("0xa9059cbb"));
        assert_eq!(result.to_json()["selector"], "0xa9059cbb");
    }
}
