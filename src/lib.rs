// Library exports for the sight-snake agent
// The agent binary, the replay tool and the integration tests all drive the core through here

pub mod agent_state;
pub mod bot;
pub mod config;
pub mod debug_logger;
pub mod eating;
pub mod exploration;
pub mod mode;
pub mod replay;
pub mod safety;
pub mod search;
pub mod session;
pub mod survival;
pub mod tile;
pub mod types;
pub mod world;
