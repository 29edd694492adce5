pub mod coupling;
pub mod gearbox;
pub mod pricing;
pub mod pump;
pub mod requirements;
pub mod selection;
