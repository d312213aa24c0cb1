pub mod payment_verifier;
