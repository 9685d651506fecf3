//! Canned model outputs and documents.

use juridico_core::domains::audit::AuditVerdict;

pub fn passing_verdict() -> AuditVerdict {
    AuditVerdict {
        nota_fundamentacao: 5,
        nota_utilidade: 5,
        nota_protocolo_visual: 5,
        nota_tom_de_voz: 4,
        aprovado: true,
        correcao_necessaria: String::new(),
    }
}

pub fn failing_verdict(correction: &str) -> AuditVerdict {
    AuditVerdict {
        nota_fundamentacao: 4,
        nota_utilidade: 4,
        nota_protocolo_visual: 2,
        nota_tom_de_voz: 4,
        aprovado: false,
        correcao_necessaria: correction.to_string(),
    }
}

pub const LEASE_CONTRACT: &str = "CONTRATO DE LOCAÇÃO NÃO RESIDENCIAL\n\
Cláusula 3ª: aluguel mensal de R$ 4.500,00.\n\
Cláusula 7ª: em caso de rescisão antecipada, o LOCATÁRIO pagará multa \
equivalente a 12 (doze) aluguéis vigentes, independentemente do prazo cumprido.";

pub const LEASE_ANSWER: &str = "A multa de R 54.000,00 (12 aluguéis) é abusiva. \
Pela Lei 8.245/91, Art. 4º, a multa deve ser proporcional ao prazo restante.";
