use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::{ColumnDefinition, ColumnWidth};

#[derive(Debug, Clone)]
struct ResizeGesture {
    start_x: f32,
    left_key: String,
    right_key: String,
    left_start: f32,
    right_start: f32,
    left_floor: f32,
    right_floor: f32,
}

/// Column width manager with the width-conserving linked-pair resize
/// algorithm: a drag between column `i` and its right neighbor moves width
/// between exactly those two columns, keeping their combined width fixed
/// and never dropping either below its floor. On gesture start every
/// visible column is locked to its rendered pixel width so unrelated
/// columns cannot reflow mid-drag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnLayout {
    widths: HashMap<String, ColumnWidth>,
    min_width: f32,
    enabled: bool,
    #[serde(skip)]
    gesture: Option<ResizeGesture>,
}

impl ColumnLayout {
    pub fn new(min_width: f32, enabled: bool) -> Self {
        Self {
            widths: HashMap::new(),
            min_width,
            enabled,
            gesture: None,
        }
    }

    /// Seeds widths from the declared definitions; undeclared columns get
    /// an equal share of 100%.
    pub fn seed(&mut self, columns: &[ColumnDefinition]) {
        self.widths.clear();
        let share = if columns.is_empty() {
            100.0
        } else {
            (100.0 / columns.len() as f32).floor()
        };
        for col in columns {
            let width = col.width.unwrap_or(ColumnWidth::Percent(share));
            self.widths.insert(col.key.clone(), width);
        }
    }

    pub fn width_of(&self, key: &str) -> Option<ColumnWidth> {
        self.widths.get(key).copied()
    }

    pub fn set_width(&mut self, key: &str, width: ColumnWidth) {
        self.widths.insert(key.to_string(), width);
    }

    /// External reset back to declared/equal-share widths.
    pub fn reset(&mut self, columns: &[ColumnDefinition]) {
        self.gesture = None;
        self.seed(columns);
    }

    pub fn min_width(&self) -> f32 {
        self.min_width
    }

    pub fn gesture_active(&self) -> bool {
        self.gesture.is_some()
    }

    /// Starts a resize between visible column `divider` and its right
    /// neighbor. `rendered` holds the currently rendered pixel width of
    /// each visible column, in order; all of them are locked into the
    /// width map for the duration of the gesture. Returns false (state
    /// unchanged) when the gesture is rejected.
    pub fn begin_resize(
        &mut self,
        columns: &[ColumnDefinition],
        visible: &[String],
        divider: usize,
        start_x: f32,
        rendered: &[f32],
    ) -> bool {
        if !self.enabled || self.gesture.is_some() {
            return false;
        }
        // No divider after the last column.
        if divider + 1 >= visible.len() || rendered.len() != visible.len() {
            return false;
        }
        let left_key = &visible[divider];
        let right_key = &visible[divider + 1];
        let left_def = columns.iter().find(|c| &c.key == left_key);
        let right_def = columns.iter().find(|c| &c.key == right_key);
        let (left_def, right_def) = match (left_def, right_def) {
            (Some(l), Some(r)) => (l, r),
            _ => return false,
        };
        if !left_def.resizable || !right_def.resizable {
            return false;
        }

        // Lock every visible column to its rendered width.
        for (key, px) in visible.iter().zip(rendered) {
            self.widths.insert(key.clone(), ColumnWidth::Px(*px));
        }

        self.gesture = Some(ResizeGesture {
            start_x,
            left_key: left_key.clone(),
            right_key: right_key.clone(),
            left_start: rendered[divider],
            right_start: rendered[divider + 1],
            left_floor: left_def.min_width.unwrap_or(self.min_width),
            right_floor: right_def.min_width.unwrap_or(self.min_width),
        });
        true
    }

    /// Applies a pointer position to the active gesture. The pair's
    /// combined width is conserved and each side is clamped to its floor.
    pub fn update_resize(&mut self, current_x: f32) -> bool {
        let gesture = match &self.gesture {
            Some(g) => g.clone(),
            None => return false,
        };
        let total = gesture.left_start + gesture.right_start;
        if total < gesture.left_floor + gesture.right_floor {
            // The pair started below the combined floor; leave it alone.
            return false;
        }

        let delta = current_x - gesture.start_x;
        let mut new_left = gesture.left_start + delta;
        let mut new_right = gesture.right_start - delta;
        if new_left < gesture.left_floor {
            new_left = gesture.left_floor;
            new_right = total - gesture.left_floor;
        } else if new_right < gesture.right_floor {
            new_right = gesture.right_floor;
            new_left = total - gesture.right_floor;
        }

        self.widths
            .insert(gesture.left_key.clone(), ColumnWidth::Px(new_left));
        self.widths
            .insert(gesture.right_key.clone(), ColumnWidth::Px(new_right));
        true
    }

    /// Ends the gesture; no resize state persists between gestures.
    pub fn end_resize(&mut self) {
        self.gesture = None;
    }
}
