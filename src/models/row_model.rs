use serde::Serialize;

use super::MediaDescriptor;

#[derive(Debug, Clone, Serialize)]
pub struct RowModel {
    #[serde(skip)]
    pub row_index: u32,
    /// Sum of the items' scaled widths, gap allowance excluded.
    pub width: u32,
    pub items: Vec<MediaDescriptor>,
}

impl RowModel {
    pub fn new(row_index: u32, items: Vec<MediaDescriptor>) -> Self {
        let width = items.iter().map(|i| i.scaled_width).sum();
        Self {
            row_index,
            width,
            items,
        }
    }
}
