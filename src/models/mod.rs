//! Data models for the filing extraction pipeline.

mod filing;
mod metrics;
mod project;

pub use filing::{DataSource, FilingReference, RegistryId};
pub use metrics::{ExtractedMetrics, GradeUnit, MetricField, CHECKLIST};
pub use project::{Commodity, ProcessingStatus, Project, ProjectStage};
