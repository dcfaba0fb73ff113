pub mod catalog;
pub mod condition;
pub mod evaluate;
pub mod parse;
pub mod path;
pub mod records;
pub mod registry;
pub mod value;

pub use facet_lens_common::{FacetLensError, Result};

pub use catalog::{display_key, CatalogEntry, ColumnFilter, ColumnSelections, SelectAll, Selection, BLANK_LABEL};
pub use condition::{
    describe_chain, Connector, FieldKind, FilterCondition, FilterableField, Operator, SavedFilterSet,
};
pub use evaluate::{
    evaluate, evaluate_condition, filter_records, matches_text, matches_value, select_indices,
    DEFAULT_PARALLEL_THRESHOLD,
};
pub use parse::parse_conditions;
pub use path::{resolve_path, Accessors, Bound, Field, FieldSource, Resolve};
pub use records::{infer_fields, load_records, parse_records};
pub use registry::{FilterRegistry, SearchHistoryEntry, DEFAULT_HISTORY_CAPACITY};
pub use value::{parse_date, Value, ValueKind};
