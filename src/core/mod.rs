// Core modules implementing file reads, tokenizing, geometry loading, and error modeling.
pub mod cursor;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod slurp;
pub mod token;
pub mod tokenize;
