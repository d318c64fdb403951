//! Narrowing a model's application inventory down to one charm action.
//!
//!   inventory  full status -> Vec<Application>
//!   matcher    fuzzy search over name / charm / base
//!   catalog    distinct charms -> descriptors (one fetch each)
//!   prompt     operator input (numbered menus on stdin)
//!   flow       the interactive sequence tying them together

pub mod catalog;
pub mod flow;
pub mod inventory;
pub mod matcher;
pub mod prompt;
