pub mod google_vision;
