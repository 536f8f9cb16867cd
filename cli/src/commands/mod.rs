pub mod alias;
pub mod compose;
pub mod serve;
