mod session_tests;
mod worker_tests;
