pub mod metrics;

pub use metrics::{gather_text, init as init_metrics, OperationTimer};
