//! Collection transforms: joins, folds, key rewrites and consent handling

pub mod consent;
pub mod fold;
pub mod join;
pub mod keys;

pub use consent::{determine_consent_withdrawn, set_stopped, ConsentRules};
pub use fold::{is_truthy, FoldPlan, FoldPolicy, Folder, CONCAT_SEPARATOR};
pub use join::{JoinCardinality, Joiner, JOINER_ACTOR};
pub use keys::DerivedKey;
