use serde::{Deserialize, Serialize};

/// A source text with its stable id. Never mutated after loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextRecord {
    pub text_id: String,
    pub text: String,
}

impl TextRecord {
    pub fn new(text_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text_id: text_id.into(),
            text: text.into(),
        }
    }
}

/// Wrap raw strings into records with auto-generated `text_NNNN` ids.
pub fn records_from_strings(texts: impl IntoIterator<Item = String>) -> Vec<TextRecord> {
    texts
        .into_iter()
        .enumerate()
        .map(|(i, text)| TextRecord {
            text_id: format!("text_{:04}", i + 1),
            text,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_ids_are_sequential() {
        let records = records_from_strings(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(records[0].text_id, "text_0001");
        assert_eq!(records[1].text_id, "text_0002");
    }
}
