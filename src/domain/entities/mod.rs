pub mod billing_cycle;
pub mod payment_method;
pub mod payment_record;
pub mod payment_status;
pub mod plan;
pub mod region;
