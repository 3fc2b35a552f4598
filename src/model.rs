use serde::{Deserialize, Serialize};

/// Backend models the user can pick from. The list is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ModelOption {
    #[serde(rename = "gemini-1.5-pro-latest")]
    Gemini15ProLatest,
    #[serde(rename = "gemini-1.5-pro")]
    Gemini15Pro,
    #[default]
    #[serde(rename = "gemini-1.5-flash")]
    Gemini15Flash,
    #[serde(rename = "gemini-1.0-pro")]
    Gemini10Pro,
}

impl ModelOption {
    pub fn id(&self) -> &'static str {
        match self {
            ModelOption::Gemini15ProLatest => "gemini-1.5-pro-latest",
            ModelOption::Gemini15Pro => "gemini-1.5-pro",
            ModelOption::Gemini15Flash => "gemini-1.5-flash",
            ModelOption::Gemini10Pro => "gemini-1.0-pro",
        }
    }

    pub fn from_id(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "gemini-1.5-pro-latest" => Some(ModelOption::Gemini15ProLatest),
            "gemini-1.5-pro" => Some(ModelOption::Gemini15Pro),
            "gemini-1.5-flash" => Some(ModelOption::Gemini15Flash),
            "gemini-1.0-pro" => Some(ModelOption::Gemini10Pro),
            _ => None,
        }
    }

    /// Picker order, matching the header dropdown.
    pub fn all() -> [ModelOption; 4] {
        [
            ModelOption::Gemini15ProLatest,
            ModelOption::Gemini15Pro,
            ModelOption::Gemini15Flash,
            ModelOption::Gemini10Pro,
        ]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            ModelOption::Gemini15ProLatest => "Gemini 1.5 Pro Latest",
            ModelOption::Gemini15Pro => "Gemini 1.5 Pro",
            ModelOption::Gemini15Flash => "Gemini 1.5 Flash",
            ModelOption::Gemini10Pro => "Gemini 1.0 Pro",
        }
    }
}

impl std::fmt::Display for ModelOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_parse_back() {
        for model in ModelOption::all() {
            assert_eq!(ModelOption::from_id(model.id()), Some(model));
        }
    }

    #[test]
    fn test_unknown_id_rejected() {
        assert_eq!(ModelOption::from_id("gpt-4o"), None);
        assert_eq!(ModelOption::from_id(""), None);
    }

    #[test]
    fn test_default_is_flash() {
        assert_eq!(ModelOption::default(), ModelOption::Gemini15Flash);
    }

    #[test]
    fn test_serde_uses_wire_ids() {
        let json = serde_json::to_string(&ModelOption::Gemini10Pro).unwrap();
        assert_eq!(json, "\"gemini-1.0-pro\"");
        let parsed: ModelOption = serde_json::from_str("\"gemini-1.5-pro-latest\"").unwrap();
        assert_eq!(parsed, ModelOption::Gemini15ProLatest);
    }
}
