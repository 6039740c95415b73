// Domain layer: core models, ports and pure notification rules.

pub mod model;
pub mod ports;
pub mod services;
