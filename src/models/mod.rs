mod column;
mod filter;
mod row;
mod sort;

pub use column::{Alignment, ColumnDefinition, ColumnWidth};
pub use filter::{
    CompiledFilter, Condition, ConditionValue, FilterNode, FilterTree, Group, GroupOperator,
    NodeId, ValueStore,
};
pub use row::{coerce_text, Row};
pub use sort::{compare_cells, sort_view, SortDirection, SortState};
