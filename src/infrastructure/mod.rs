pub mod gateway;
pub mod in_memory;
pub mod notifier;
