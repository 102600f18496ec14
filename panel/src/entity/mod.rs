pub mod payment;
pub mod telemetry;
pub mod user;
pub mod whatsapp_number;
