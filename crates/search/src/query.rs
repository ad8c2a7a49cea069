use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What the question is mostly about; nudges ranking
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    #[default]
    General,
    Formula,
    Data,
    Chart,
}

impl QueryType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Formula => "formula",
            Self::Data => "data",
            Self::Chart => "chart",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "general" => Ok(Self::General),
            "formula" => Ok(Self::Formula),
            "data" => Ok(Self::Data),
            "chart" => Ok(Self::Chart),
            other => Err(format!(
                "unknown query type '{other}' (expected general, formula, data or chart)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

/// One turn of the conversation preceding the query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_type_parse() {
        assert_eq!("Formula".parse::<QueryType>(), Ok(QueryType::Formula));
        assert_eq!(" chart ".parse::<QueryType>(), Ok(QueryType::Chart));
        assert!("pivot".parse::<QueryType>().is_err());
        assert_eq!(QueryType::default().to_string(), "general");
    }

    #[test]
    fn test_chat_message_json() {
        let msg: ChatMessage =
            serde_json::from_str(r#"{"role":"user","content":"Sum of Q1?"}"#).unwrap();
        assert_eq!(msg, ChatMessage::user("Sum of Q1?"));
    }
}
