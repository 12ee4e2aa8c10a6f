pub mod calibration_controller;
