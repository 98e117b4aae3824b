// Domain layer: record types, module output and the module port.

pub mod model;
pub mod ports;
