use serde::{Deserialize, Serialize};

/// A column width, either a percentage of the table or absolute pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ColumnWidth {
    Percent(f32),
    Px(f32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Alignment {
    #[default]
    Left,
    Center,
    Right,
}

/// Declared properties of one table column. Keys are unique and stable
/// for the lifetime of a table instance. `class_name` is passed through
/// untouched to the rendering layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub key: String,
    pub label: String,
    pub width: Option<ColumnWidth>,
    pub min_width: Option<f32>,
    pub align: Alignment,
    pub sortable: bool,
    pub resizable: bool,
    pub class_name: Option<String>,
}

impl ColumnDefinition {
    pub fn new(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            width: None,
            min_width: None,
            align: Alignment::Left,
            sortable: true,
            resizable: true,
            class_name: None,
        }
    }
}
