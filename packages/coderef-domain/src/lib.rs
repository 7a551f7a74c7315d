pub mod chunk;
pub mod language;
pub mod tier;
