pub mod bridge;
pub mod connection;
pub mod frame;
pub mod hud;
pub mod input;
pub mod offline;
pub mod scene;
pub mod session;
