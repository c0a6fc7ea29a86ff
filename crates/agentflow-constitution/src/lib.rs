//! Agentflow Constitution
//!
//! Evaluates constitution rules against the output a node produced.
//!
//! Evaluation is a pure function of the rule set and the output. Predicates are
//! plain pattern matches over a lower-cased, flattened text form of the output,
//! so the same input always yields the same violations.

mod evaluator;
mod predicate;

pub use evaluator::{Violation, evaluate, evaluate_text, has_blocking, normalize};
pub use predicate::{MAX_OUTPUT_CHARS, contains_harmful_content, contains_pii, exceeds_length};
