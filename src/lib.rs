//! Headless core for an interactive data grid: a nested boolean filter
//! tree with a regex evaluator, a debounced apply scheduler, tri-state
//! column sorting, a width-conserving linked-pair resize engine, and a
//! CSV exporter, composed by [`TableController`]. Rendering is an
//! external collaborator: it receives derived views and feeds gestures
//! back in.

mod controller;
mod export;
mod layout;
mod models;
mod scheduler;

pub use controller::{RowClassifier, TableController, TableOptions, ViewCallback};
pub use export::{suggested_filename, to_csv, ExportScope};
pub use layout::ColumnLayout;
pub use models::{
    coerce_text, compare_cells, sort_view, Alignment, ColumnDefinition, ColumnWidth,
    CompiledFilter, Condition, ConditionValue, FilterNode, FilterTree, Group, GroupOperator,
    NodeId, Row, SortDirection, SortState, ValueStore,
};
pub use scheduler::{ApplyMode, ApplyScheduler};
