mod service;
mod utils;
