use crate::layout::pick::PickSource;
use crate::models::{MediaDescriptor, RowModel};

/// Configuration for the tiered best-fit row packer.
///
/// Items keep their precomputed scaled width; the packer only decides the
/// order in which they are laid out so that each row's widths add up close
/// to `row_width`.
#[derive(Debug, Clone)]
pub struct RowPacker {
    /// Target row width in layout units (default: 2000)
    pub row_width: u32,
    /// Per-item gap allowance in layout units (default: 32)
    pub item_gap: u32,
    /// A row closes once its width reaches this fraction of `row_width` (default: 0.9)
    pub close_ratio: f64,
    /// Lower bound of a near-perfect fit, as a fraction of the remaining space (default: 0.9)
    pub perfect_ratio: f64,
    /// Lower bound of an acceptable fit, as a fraction of the remaining space (default: 0.7)
    pub good_ratio: f64,
}

impl Default for RowPacker {
    fn default() -> Self {
        Self {
            row_width: 2000,
            item_gap: 32,
            close_ratio: 0.9,
            perfect_ratio: 0.9,
            good_ratio: 0.7,
        }
    }
}

impl RowPacker {
    pub fn new(row_width: u32, item_gap: u32) -> Self {
        Self {
            row_width,
            item_gap,
            ..Self::default()
        }
    }

    /// Packs `items` into rows and returns them concatenated.
    pub fn pack<P: PickSource>(
        &self,
        items: Vec<MediaDescriptor>,
        picker: &mut P,
    ) -> Vec<MediaDescriptor> {
        self.pack_rows(items, picker)
            .into_iter()
            .flat_map(|row| row.items)
            .collect()
    }

    /// Packs `items` into rows.
    ///
    /// # Algorithm
    /// 1. Seed a row with the first item left in the pool.
    /// 2. Repeatedly take the best fit for the space left after the row's
    ///    widths and one gap allowance per placed item.
    /// 3. Close the row when nothing fits or its width reaches
    ///    `close_ratio * row_width`.
    pub fn pack_rows<P: PickSource>(
        &self,
        items: Vec<MediaDescriptor>,
        picker: &mut P,
    ) -> Vec<RowModel> {
        let Some(min_width) = items.iter().map(|i| i.scaled_width).min() else {
            return Vec::new();
        };

        let close_at = self.row_width as f64 * self.close_ratio;
        let mut pool = items;
        let mut rows = Vec::new();

        while !pool.is_empty() {
            let seed = pool.remove(0);
            let mut row_sum = seed.scaled_width as i64;
            let mut row = vec![seed];

            while !pool.is_empty() {
                let remaining = self.row_width as i64
                    - row_sum
                    - self.item_gap as i64 * row.len() as i64;

                let complete = match self.best_fit(remaining, &pool, min_width, picker) {
                    Some(index) => {
                        let item = pool.remove(index);
                        row_sum += item.scaled_width as i64;
                        row.push(item);
                        false
                    }
                    None => true,
                };

                if complete || row_sum as f64 >= close_at {
                    break;
                }
            }

            rows.push(RowModel::new(rows.len() as u32, row));
        }

        rows
    }

    /// Index into `pool` of the best candidate for `remaining` units of space.
    ///
    /// Near-perfect fits win over acceptable ones, which win over the first
    /// item that fits at all. Ties inside a tier go to `picker`.
    pub fn best_fit<P: PickSource>(
        &self,
        remaining: i64,
        pool: &[MediaDescriptor],
        min_width: u32,
        picker: &mut P,
    ) -> Option<usize> {
        let remaining_f = remaining as f64;
        let fits = |item: &MediaDescriptor| item.scaled_width as i64 <= remaining;

        let perfect: Vec<usize> = candidates(pool, |item| {
            fits(item) && item.scaled_width as f64 >= remaining_f * self.perfect_ratio
        });
        if !perfect.is_empty() {
            return Some(perfect[picker.pick(perfect.len())]);
        }

        let floor = (remaining_f * self.good_ratio).min(min_width as f64);
        let good: Vec<usize> =
            candidates(pool, |item| fits(item) && item.scaled_width as f64 >= floor);
        if !good.is_empty() {
            return Some(good[picker.pick(good.len())]);
        }

        pool.iter().position(fits)
    }
}

fn candidates(
    pool: &[MediaDescriptor],
    pred: impl Fn(&MediaDescriptor) -> bool,
) -> Vec<usize> {
    pool.iter()
        .enumerate()
        .filter(|(_, item)| pred(item))
        .map(|(i, _)| i)
        .collect()
}
