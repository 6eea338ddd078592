//! Integration tests for the video generation client

mod extend_flow;
mod lifecycle_controller;
mod parameter_derivation;
