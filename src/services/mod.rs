pub mod api;
pub mod collector;
pub mod controller;
pub mod presenter;
pub mod validator;
