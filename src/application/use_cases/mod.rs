pub mod payments;
pub mod verifier_factory;
