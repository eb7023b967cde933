use crate::models::{MediaDescriptor, RowModel};

/// Splits an already-packed sequence into rows the way the page renders it:
/// items flow left-to-right at their scaled width with `gap` between them and
/// wrap once the next item would overflow `row_width`.
///
/// The packer never returns row boundaries; this recovers them for display.
pub fn wrap_rows(items: &[MediaDescriptor], row_width: u32, gap: u32) -> Vec<RowModel> {
    if items.is_empty() {
        return Vec::new();
    }

    let mut rows = Vec::new();
    let mut pending: Vec<MediaDescriptor> = Vec::new();
    let mut used = 0u32;

    for item in items {
        if !pending.is_empty() && used + gap + item.scaled_width > row_width {
            rows.push(RowModel::new(rows.len() as u32, std::mem::take(&mut pending)));
            used = 0;
        }
        if !pending.is_empty() {
            used += gap;
        }
        used += item.scaled_width;
        pending.push(item.clone());
    }

    if !pending.is_empty() {
        rows.push(RowModel::new(rows.len() as u32, pending));
    }

    rows
}
