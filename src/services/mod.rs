// Services module - API client, session gate and scan workflow

pub mod api_client;
pub mod credential_store;
pub mod encryption;
pub mod scan_controller;
pub mod scan_result;
pub mod session;
pub mod ticket_payload;
pub mod ticket_qr;
