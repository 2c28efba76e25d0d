// Domain layer: product records and the ports every procedure is written against.

pub mod model;
pub mod ports;
