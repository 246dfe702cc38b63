mod src;

pub use src::*;
