pub mod script;
pub mod trace;
