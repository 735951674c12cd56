pub(crate) mod client;
pub(crate) mod helper;
mod parsers;
mod portal;
mod sensors;
mod site_directory;

pub use client::Client;
pub use portal::{PortalSession, SensorPortal};
pub use sensors::fetch_sensors;
pub use site_directory::resolve;
