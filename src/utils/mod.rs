pub mod database;
pub mod logging;
pub mod openai;
pub mod request_id;
pub mod storage;
pub mod validation;
