//! Cell addressing and value types

mod address;
mod value;

pub use address::{
    quote_sheet_name, split_sheet_prefix, CellAddress, CellRange, CellRangeIterator, SheetCell,
};
pub use value::{CellError, CellValue, SharedString};
