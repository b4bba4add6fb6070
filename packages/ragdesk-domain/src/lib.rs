pub mod intent;
pub mod records;
pub mod similarity;
pub mod sql_extract;
pub mod sql_gate;
