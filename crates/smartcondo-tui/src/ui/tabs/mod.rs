pub mod directory;
pub mod statement;
