pub mod flow_sim;
pub mod leak_monitor;
pub mod notifier;
pub mod resolution;
pub mod usage;
