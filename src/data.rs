//! # Data
//!
//! $$
//! r_{t,i} = \frac{P_{t,i}}{P_{t-1,i}} - 1
//! $$
//!
//! Aligned price tables, the derived return matrix, and the CSV price source.

pub mod calendar;
pub mod loader;
pub mod synthetic;
pub mod table;

pub use calendar::shift_months;
pub use calendar::shift_years;
pub use loader::load_price_table;
pub use loader::price_sources;
pub use synthetic::SyntheticMarket;
pub use table::PriceTable;
pub use table::ReturnSeries;
pub use table::ReturnsTable;
