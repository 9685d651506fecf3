use serde::{Deserialize, Serialize};

/// Closed set of routes a turn can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationLabel {
    /// ME/EPP, MEI and Simples Nacional.
    Simples,
    /// Lucro Real/Presumido, S/A, high-value contracts.
    Corporativo,
    Trabalhista,
    /// Company structure and common business contracts.
    Societario,
    Conversational,
    OutOfScope,
}

impl ClassificationLabel {
    pub const ALL: [ClassificationLabel; 6] = [
        ClassificationLabel::Simples,
        ClassificationLabel::Corporativo,
        ClassificationLabel::Trabalhista,
        ClassificationLabel::Societario,
        ClassificationLabel::Conversational,
        ClassificationLabel::OutOfScope,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ClassificationLabel::Simples => "simples",
            ClassificationLabel::Corporativo => "corporativo",
            ClassificationLabel::Trabalhista => "trabalhista",
            ClassificationLabel::Societario => "societario",
            ClassificationLabel::Conversational => "conversational",
            ClassificationLabel::OutOfScope => "out_of_scope",
        }
    }

    /// Topic labels go through tools, formatting and audit.
    pub fn is_topic(&self) -> bool {
        !matches!(
            self,
            ClassificationLabel::Conversational | ClassificationLabel::OutOfScope
        )
    }

    fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.as_str() == token)
    }
}

impl std::fmt::Display for ClassificationLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        other => other,
    }
}

/// Map raw classifier output onto a label.
///
/// Strips markdown and punctuation, lowercases, folds accents and keeps the
/// first token. Anything unrecognised is `OutOfScope`; classifier noise never
/// fails a turn.
pub fn parse_label_output(raw: &str) -> ClassificationLabel {
    let cleaned: String = raw
        .to_lowercase()
        .chars()
        .map(fold_accent)
        .map(|c| if c == '-' { '_' } else { c })
        .map(|c| if c.is_alphanumeric() || c == '_' { c } else { ' ' })
        .collect();

    cleaned
        .split_whitespace()
        .next()
        .map(|t| t.trim_matches('_'))
        .and_then(ClassificationLabel::from_token)
        .unwrap_or(ClassificationLabel::OutOfScope)
}
