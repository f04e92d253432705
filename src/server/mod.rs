pub mod protocol;
pub mod stdio;
