pub mod secrets;
pub mod tool_handler;
pub mod voice;

#[cfg(test)]
mod tool_handler_test;
