//! Tip rule engine.
//!
//! Definitions ([`TipDefinition`]) are static; the [`TipEngine`] holds the
//! mutable side (transient parameter values, event donations, display
//! status) and answers eligibility queries against it.

pub mod catalog;
pub mod definition;
pub mod engine;
pub mod rule;
pub mod status;

pub use definition::{ParameterDecl, TipAction, TipCatalog, TipDefinition};
pub use engine::{TipChange, TipEngine};
pub use rule::{Comparison, ParamValue, Rule, RuleContext, Window};
pub use status::{DisplayFrequency, InvalidationReason, TipStatus};

#[derive(Debug, thiserror::Error)]
pub enum TipError {
    #[error("Unknown tip: {0}")]
    UnknownTip(String),

    #[error("Tip {tip} has no parameter named {name}")]
    UnknownParameter { tip: String, name: String },

    #[error("Parameter {name} of tip {tip} expects a {expected} value")]
    ParameterType {
        tip: String,
        name: String,
        expected: &'static str,
    },

    #[error("Tip {tip} has no action named {action}")]
    UnknownAction { tip: String, action: String },

    #[error("Duplicate tip id: {0}")]
    DuplicateTip(String),
}
