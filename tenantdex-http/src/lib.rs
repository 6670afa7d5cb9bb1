pub mod auth;
pub mod config;
pub mod dto;
pub mod handlers;
pub mod openapi;
pub mod server;

pub use config::{load_dotenv, EnvMode, ServerConfig};
pub use server::{build_router, serve};
