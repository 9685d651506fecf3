use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::common::{AuditRecordId, ConversationId};
use crate::domains::workflow::ClassificationLabel;

/// Minimum score on every dimension for an answer to pass.
pub const PASSING_SCORE: u8 = 4;

/// Raw judge output, exactly as the model returns it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AuditVerdict {
    /// 1-5: cites clear sources (law from the legal base, or a web link).
    pub nota_fundamentacao: i64,
    /// 1-5: the user's question was fully answered.
    pub nota_utilidade: i64,
    /// 1-5: bold amounts, dates, rates and laws; no backticks around numbers.
    pub nota_protocolo_visual: i64,
    /// 1-5: consultative, preventive and professional tone.
    pub nota_tom_de_voz: i64,
    pub aprovado: bool,
    /// Direct instruction for fixing the answer, empty when nothing to fix.
    pub correcao_necessaria: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerdictError {
    #[error("score {field} = {value} is outside 1..=5")]
    ScoreOutOfRange { field: &'static str, value: i64 },
}

/// Validated audit scores for one answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub grounding: u8,
    pub usefulness: u8,
    pub visual_protocol: u8,
    pub tone: u8,
    /// All four scores at or above [`PASSING_SCORE`], and the judge agreed.
    pub approved: bool,
    pub correction: String,
}

fn score(field: &'static str, value: i64) -> Result<u8, VerdictError> {
    match u8::try_from(value) {
        Ok(v @ 1..=5) => Ok(v),
        _ => Err(VerdictError::ScoreOutOfRange { field, value }),
    }
}

impl TryFrom<AuditVerdict> for AuditRecord {
    type Error = VerdictError;

    fn try_from(v: AuditVerdict) -> Result<Self, Self::Error> {
        let grounding = score("nota_fundamentacao", v.nota_fundamentacao)?;
        let usefulness = score("nota_utilidade", v.nota_utilidade)?;
        let visual_protocol = score("nota_protocolo_visual", v.nota_protocolo_visual)?;
        let tone = score("nota_tom_de_voz", v.nota_tom_de_voz)?;

        let scores_pass = [grounding, usefulness, visual_protocol, tone]
            .iter()
            .all(|s| *s >= PASSING_SCORE);

        Ok(Self {
            grounding,
            usefulness,
            visual_protocol,
            tone,
            // The judge's own flag can only make this stricter.
            approved: scores_pass && v.aprovado,
            correction: v.correcao_necessaria.trim().to_string(),
        })
    }
}

impl AuditRecord {
    pub fn passes(&self) -> bool {
        self.approved
    }
}

/// What the audit sink stores.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    pub id: AuditRecordId,
    pub conversation_id: ConversationId,
    pub label: ClassificationLabel,
    pub record: AuditRecord,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(conversation_id: ConversationId, label: ClassificationLabel, record: AuditRecord) -> Self {
        Self {
            id: AuditRecordId::new(),
            conversation_id,
            label,
            record,
            created_at: Utc::now(),
        }
    }
}

/// Where the audit runs relative to the response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuditMode {
    /// Background worker; the response never waits.
    #[default]
    Detached,
    /// Inline; a failing audit sends the draft back for revision.
    Blocking,
}

impl std::fmt::Display for AuditMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuditMode::Detached => write!(f, "detached"),
            AuditMode::Blocking => write!(f, "blocking"),
        }
    }
}

impl std::str::FromStr for AuditMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "detached" => Ok(AuditMode::Detached),
            "blocking" => Ok(AuditMode::Blocking),
            _ => Err(anyhow::anyhow!("Invalid audit mode: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verdict(scores: [i64; 4], aprovado: bool) -> AuditVerdict {
        AuditVerdict {
            nota_fundamentacao: scores[0],
            nota_utilidade: scores[1],
            nota_protocolo_visual: scores[2],
            nota_tom_de_voz: scores[3],
            aprovado,
            correcao_necessaria: "  Faltou negrito no valor  ".into(),
        }
    }

    #[test]
    fn all_fours_pass() {
        let record = AuditRecord::try_from(verdict([4, 4, 4, 5], true)).unwrap();
        assert!(record.passes());
        assert_eq!(record.correction, "Faltou negrito no valor");
    }

    #[test]
    fn low_score_fails_even_if_judge_approves() {
        let record = AuditRecord::try_from(verdict([5, 5, 2, 5], true)).unwrap();
        assert!(!record.passes());
    }

    #[test]
    fn judge_can_reject_good_scores() {
        let record = AuditRecord::try_from(verdict([5, 5, 5, 5], false)).unwrap();
        assert!(!record.passes());
    }

    #[test]
    fn out_of_range_scores_are_rejected() {
        assert_eq!(
            AuditRecord::try_from(verdict([5, 0, 5, 5], true)),
            Err(VerdictError::ScoreOutOfRange {
                field: "nota_utilidade",
                value: 0
            })
        );
        assert!(AuditRecord::try_from(verdict([5, 5, 5, 9], true)).is_err());
    }

    #[test]
    fn audit_mode_parsing() {
        assert_eq!("Blocking".parse::<AuditMode>().unwrap(), AuditMode::Blocking);
        assert_eq!(AuditMode::default().to_string(), "detached");
        assert!("sometimes".parse::<AuditMode>().is_err());
    }
}
