pub mod error;
pub mod filter;
pub mod mcp_api;
pub mod model;
pub mod normalize;
pub mod query;
pub mod redis;
pub mod session;
pub mod solr;
pub mod taxonomy;
