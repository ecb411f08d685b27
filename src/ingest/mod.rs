pub mod selection;
pub mod table;
pub mod text;
