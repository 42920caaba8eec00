pub mod client;
pub mod creds;
pub mod schema;
