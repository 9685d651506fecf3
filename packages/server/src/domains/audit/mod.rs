pub mod judge;
pub mod models;
pub mod sink;
pub mod worker;

pub use judge::Judge;
pub use models::{AuditEntry, AuditMode, AuditRecord, AuditVerdict, VerdictError, PASSING_SCORE};
pub use sink::{PgAuditSink, TracingAuditSink};
pub use worker::{AuditDispatcher, AuditJob, AuditWorker};
