// Domain layer: wire models and the ports (interfaces) adapters implement.

pub mod model;
pub mod ports;
