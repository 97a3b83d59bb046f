use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct FoundryConfig {
    pub max_line_length: usize,
}

impl Default for FoundryConfig {
    fn default() -> Self {
        Self {
            max_line_length: 120,
        }
    }
}
