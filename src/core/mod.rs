pub mod meeting;
pub mod paths;
pub mod tokenizer;
