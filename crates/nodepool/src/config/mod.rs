pub mod cli;
pub mod spec;
pub mod tables;

pub use cli::*;
pub use spec::load_spec;
pub use tables::load_tables;
pub use tables::LookupTables;
