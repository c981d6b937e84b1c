pub mod actions;
pub mod config;
pub mod connection;
pub mod context;
pub mod identity;
pub mod intent;
pub mod llm_client;
pub mod memory;
pub mod packet;
pub mod persona;
pub mod pipeline;
pub mod prompt;
pub mod routines;
pub mod world;
