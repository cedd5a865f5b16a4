#![allow(dead_code)]

pub use checkrunner_test_utils::builders;
pub use checkrunner_test_utils::fake_backend;
pub use checkrunner_test_utils::{init_tracing, spawn_fake_queue, with_timeout};
