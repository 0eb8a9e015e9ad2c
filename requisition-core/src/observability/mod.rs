pub mod logging;
pub mod request_id;

pub use logging::init_tracing;
pub use request_id::{
    extract_request_id, inject_request_id, TracedClientExt, TracedRequest, REQUEST_ID_HEADER,
};
