pub mod appointments;
pub mod attendance;
pub mod auth;
pub mod doctors;
pub mod health;
pub mod hospitals;
pub mod leaves;
pub mod patients;
pub mod queue;
pub mod staff;
