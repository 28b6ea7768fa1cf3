//! Plejd Scene - Scene catalog and execution
//!
//! This crate turns the site's scene definitions into an executable catalog
//! and translates a scene activation into device commands on a [`Transport`].

pub mod manager;
pub mod transport;

use plejd_core::DeviceRegistry;
use std::sync::Arc;
use tokio::sync::RwLock;

pub use manager::{ExecutionReport, SceneManager, SceneOptions};
pub use transport::{ChannelTransport, Command, Transport, TurnOnOptions};

/// Registry shared between the scene engine and whoever feeds it state
pub type SharedRegistry = Arc<RwLock<DeviceRegistry>>;
