pub mod prober;

pub use prober::{DEFAULT_MAX_BODY_BYTES, DEFAULT_USER_AGENT, ReqwestProber};
