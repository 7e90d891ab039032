mod common;
mod polling;
