use anyhow::{anyhow, Result};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::export::{self, ExportScope};
use crate::layout::ColumnLayout;
use crate::models::{
    sort_view, ColumnDefinition, ConditionValue, FilterTree, NodeId, Row, SortDirection,
    SortState, ValueStore,
};
use crate::scheduler::{ApplyMode, ApplyScheduler};

/// Behavior knobs for a table instance. The debounce delay and minimum
/// column width are policy, not structure, so they live here instead of
/// being hard-coded.
#[derive(Debug, Clone)]
pub struct TableOptions {
    pub enable_export: bool,
    pub enable_resize: bool,
    pub enable_column_selector: bool,
    pub export_base_name: String,
    pub debounce: Duration,
    pub min_column_width: f32,
    pub default_sort: Option<(String, SortDirection)>,
    pub default_visible: Option<Vec<String>>,
    pub auto_apply: bool,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            enable_export: true,
            enable_resize: true,
            enable_column_selector: true,
            export_base_name: "export".to_string(),
            debounce: Duration::from_millis(500),
            min_column_width: 50.0,
            default_sort: None,
            default_visible: None,
            auto_apply: true,
        }
    }
}

/// Invoked with the derived row indices (into the raw row set) on every
/// recompute.
pub type ViewCallback = Box<dyn FnMut(&[usize])>;

/// Optional per-row classification hook, passed through to the rendering
/// layer untouched.
pub type RowClassifier = Box<dyn Fn(&Row) -> Option<String>>;

/// Composes the filter tree, value store, scheduler, sort state, and
/// column layout over a raw row set. On any state change the full view is
/// re-derived from {rows, committed filter, sort state}; there is no
/// incremental patching.
pub struct TableController {
    columns: Vec<ColumnDefinition>,
    rows: Vec<Row>,
    options: TableOptions,

    // Filter editing state: `draft` absorbs edits, `active` is the
    // committed snapshot the view is filtered with.
    draft: FilterTree,
    active: FilterTree,
    values: ValueStore,
    scheduler: ApplyScheduler,

    sort: SortState,
    layout: ColumnLayout,
    visible: Vec<String>,

    view: Vec<usize>,
    on_view_changed: Option<ViewCallback>,
    row_classifier: Option<RowClassifier>,
}

impl TableController {
    pub fn new(columns: Vec<ColumnDefinition>, rows: Vec<Row>, options: TableOptions) -> Result<Self> {
        if columns.is_empty() {
            return Err(anyhow!("a table needs at least one column"));
        }
        let mut seen = HashSet::new();
        for col in &columns {
            if col.key.is_empty() {
                return Err(anyhow!("column keys must be non-empty"));
            }
            if !seen.insert(col.key.as_str()) {
                return Err(anyhow!("duplicate column key: {}", col.key));
            }
        }

        let visible = match &options.default_visible {
            Some(keys) => {
                if keys.is_empty() {
                    return Err(anyhow!("the visible column set must not be empty"));
                }
                for key in keys {
                    if !columns.iter().any(|c| &c.key == key) {
                        return Err(anyhow!("unknown visible column: {key}"));
                    }
                }
                keys.clone()
            }
            None => columns.iter().map(|c| c.key.clone()).collect(),
        };

        let sort = match &options.default_sort {
            Some((column, direction)) => SortState::new(column, *direction),
            None => SortState::none(),
        };

        let first_column = columns[0].key.clone();
        let draft = FilterTree::create_default(&first_column);
        let active = draft.clone();
        let mode = if options.auto_apply {
            ApplyMode::Auto
        } else {
            ApplyMode::Manual
        };
        let scheduler = ApplyScheduler::new(options.debounce, mode);
        let mut layout = ColumnLayout::new(options.min_column_width, options.enable_resize);
        layout.seed(&columns);

        let mut controller = Self {
            columns,
            rows,
            options,
            draft,
            active,
            values: ValueStore::new(),
            scheduler,
            sort,
            layout,
            visible,
            view: Vec::new(),
            on_view_changed: None,
            row_classifier: None,
        };
        controller.recompute();
        Ok(controller)
    }

    // ---- accessors -------------------------------------------------------

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn visible_columns(&self) -> &[String] {
        &self.visible
    }

    pub fn options(&self) -> &TableOptions {
        &self.options
    }

    pub fn layout(&self) -> &ColumnLayout {
        &self.layout
    }

    pub fn sort_state(&self) -> &SortState {
        &self.sort
    }

    /// The filter tree currently being edited.
    pub fn filter_tree(&self) -> &FilterTree {
        &self.draft
    }

    pub fn value_store(&self) -> &ValueStore {
        &self.values
    }

    /// Derived row indices into the raw row set, filtered and sorted.
    pub fn view(&self) -> &[usize] {
        &self.view
    }

    pub fn view_rows(&self) -> impl Iterator<Item = &Row> {
        self.view.iter().map(|&i| &self.rows[i])
    }

    pub fn visible_len(&self) -> usize {
        self.view.len()
    }

    pub fn total_len(&self) -> usize {
        self.rows.len()
    }

    pub fn set_view_callback(&mut self, callback: ViewCallback) {
        self.on_view_changed = Some(callback);
    }

    pub fn set_row_classifier(&mut self, classifier: RowClassifier) {
        self.row_classifier = Some(classifier);
    }

    /// Rendering passthrough; the core never interprets the result.
    pub fn classify_row(&self, row: &Row) -> Option<String> {
        self.row_classifier.as_ref().and_then(|f| f(row))
    }

    // ---- rows ------------------------------------------------------------

    pub fn set_rows(&mut self, rows: Vec<Row>) {
        self.rows = rows;
        self.recompute();
    }

    // ---- filter editing --------------------------------------------------

    fn first_column_key(&self) -> String {
        self.columns[0].key.clone()
    }

    fn note_edit(&mut self) {
        self.scheduler.note_edit(Instant::now());
    }

    pub fn add_condition(&mut self, group: NodeId) {
        let column = self.first_column_key();
        self.draft = self.draft.add_condition(group, &column);
        self.note_edit();
    }

    pub fn add_group(&mut self, group: NodeId) {
        let column = self.first_column_key();
        self.draft = self.draft.add_group(group, &column);
        self.note_edit();
    }

    pub fn remove_child(&mut self, group: NodeId, index: usize) {
        let (next, purged) = self.draft.remove_child(group, index);
        self.draft = next;
        // No orphaned cached values.
        for id in purged {
            self.values.remove(id);
        }
        self.note_edit();
    }

    pub fn toggle_operator(&mut self, group: NodeId) {
        self.draft = self.draft.toggle_operator(group);
        self.note_edit();
    }

    pub fn set_condition(&mut self, id: NodeId, column: &str, pattern: &str, case_sensitive: bool) {
        self.draft = self.draft.set_condition(id, column, pattern, case_sensitive);
        self.values.insert(
            id,
            ConditionValue {
                column: column.to_string(),
                pattern: pattern.to_string(),
                case_sensitive,
            },
        );
        self.note_edit();
    }

    pub fn set_auto_apply(&mut self, auto: bool) {
        let mode = if auto { ApplyMode::Auto } else { ApplyMode::Manual };
        self.scheduler.set_mode(mode, Instant::now());
    }

    /// Host event-loop tick. Applies the pending draft when the debounce
    /// quiet window has elapsed; returns true when a recompute happened.
    pub fn tick(&mut self, now: Instant) -> bool {
        if self.scheduler.poll(now) {
            self.apply_draft();
            true
        } else {
            false
        }
    }

    /// Explicit commit gesture: cancels any pending window and applies
    /// accumulated edits immediately.
    pub fn commit_filter(&mut self) {
        if self.scheduler.take_commit() {
            self.apply_draft();
        }
    }

    /// Bypasses the scheduler and immediately publishes an always-true
    /// filter.
    pub fn reset_filter(&mut self) {
        self.scheduler.cancel();
        self.draft = FilterTree::create_default(&self.first_column_key());
        self.values.clear();
        self.apply_draft();
    }

    fn apply_draft(&mut self) {
        self.active = self.draft.clone();
        debug!(pass_through = self.active.is_pass_through(), "filter committed");
        self.recompute();
    }

    // ---- sorting ---------------------------------------------------------

    /// Header-click gesture. Non-sortable and unknown columns are ignored.
    pub fn toggle_sort(&mut self, column: &str) {
        match self.columns.iter().find(|c| c.key == column) {
            Some(def) if def.sortable => {}
            _ => return,
        }
        self.sort.activate(column);
        self.recompute();
    }

    // ---- visible columns -------------------------------------------------

    /// Shows a declared column, re-inserting it at its declared position.
    pub fn show_column(&mut self, key: &str) -> bool {
        if !self.options.enable_column_selector {
            return false;
        }
        let declared_index = match self.columns.iter().position(|c| c.key == key) {
            Some(i) => i,
            None => return false,
        };
        if self.visible.iter().any(|k| k == key) {
            return false;
        }
        let insert_at = self
            .visible
            .iter()
            .filter(|k| {
                self.columns.iter().position(|c| &c.key == *k).unwrap_or(usize::MAX)
                    < declared_index
            })
            .count();
        self.visible.insert(insert_at, key.to_string());
        self.recompute();
        true
    }

    /// Hides a visible column. Removing the last visible column is
    /// rejected and leaves the state unchanged.
    pub fn hide_column(&mut self, key: &str) -> bool {
        if !self.options.enable_column_selector {
            return false;
        }
        if self.visible.len() <= 1 {
            return false;
        }
        let index = match self.visible.iter().position(|k| k == key) {
            Some(i) => i,
            None => return false,
        };
        self.visible.remove(index);
        self.recompute();
        true
    }

    // ---- resizing --------------------------------------------------------

    /// Starts a drag on the divider between visible column `divider` and
    /// its right neighbor. `rendered` is the renderer-measured pixel width
    /// of each visible column.
    pub fn begin_resize(&mut self, divider: usize, start_x: f32, rendered: &[f32]) -> bool {
        self.layout
            .begin_resize(&self.columns, &self.visible, divider, start_x, rendered)
    }

    pub fn update_resize(&mut self, current_x: f32) -> bool {
        self.layout.update_resize(current_x)
    }

    pub fn end_resize(&mut self) {
        self.layout.end_resize();
    }

    /// External reset of all column widths to declared/equal-share values.
    pub fn reset_widths(&mut self) {
        self.layout.reset(&self.columns);
    }

    // ---- export ----------------------------------------------------------

    pub fn export_csv(&self, scope: ExportScope) -> Result<String> {
        if !self.options.enable_export {
            return Err(anyhow!("export is disabled for this table"));
        }
        let csv = match scope {
            ExportScope::AllRows => {
                export::to_csv(&self.columns, &self.visible, self.rows.iter())
            }
            ExportScope::CurrentView => {
                export::to_csv(&self.columns, &self.visible, self.view_rows())
            }
        };
        debug!(?scope, rows = self.rows.len(), "exported csv");
        Ok(csv)
    }

    pub fn export_filename(&self) -> String {
        export::suggested_filename(&self.options.export_base_name)
    }

    // ---- derivation ------------------------------------------------------

    /// Wholesale recompute: filter with the committed tree, then stable
    /// sort. Identical inputs always produce an identical view.
    fn recompute(&mut self) {
        let predicate = self.active.compile();
        let mut view: Vec<usize> = self
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| predicate.matches(row))
            .map(|(i, _)| i)
            .collect();
        sort_view(&mut view, &self.rows, &self.sort);
        debug!(visible = view.len(), total = self.rows.len(), "view recomputed");
        if let Some(callback) = self.on_view_changed.as_mut() {
            callback(&view);
        }
        self.view = view;
    }
}
