pub mod generate_content;
pub mod types;
