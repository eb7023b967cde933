pub mod flow;
pub mod justified;
pub mod pick;

pub use flow::wrap_rows;
pub use justified::RowPacker;
pub use pick::{FirstPick, PickSource, RandomPick};
