pub mod analyzer;
pub mod loader;
pub mod utils;

pub use analyzer::analyze_dataframe;
pub use loader::load_csv;
