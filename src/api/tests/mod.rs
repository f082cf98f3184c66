//! API Tests
//!
//! - predict_validation: 400 paths (missing container, missing names, bad values)
//! - predict_scoring: 200 path and 500 paths through mock artifacts
//! - service: health and metrics endpoints
