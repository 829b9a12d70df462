// Domain layer: lead models and ports (interfaces) for the outside world.

pub mod model;
pub mod ports;
