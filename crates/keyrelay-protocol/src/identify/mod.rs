//! Body of the dedicated `/identify` endpoint and the output schema it asks the model for.

pub mod request;
pub mod schema;
